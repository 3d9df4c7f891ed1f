use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// A single machine reading as served by `/get-sensor-data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SensorReading {
    #[serde(deserialize_with = "machine_id_from_wire")]
    pub machine_id: String,
    #[serde(deserialize_with = "timestamp_from_wire")]
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub vibration: f64,
    pub energy_consumption: f64,
}

/// One batch of readings returned by a single paged request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub readings: Vec<SensorReading>,
}

impl Page {
    #[must_use]
    pub fn new(readings: Vec<SensorReading>) -> Self {
        Self { readings }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// A full page means the server may hold more rows past it.
    #[must_use]
    pub fn is_full(&self, page_size: usize) -> bool {
        self.readings.len() == page_size
    }
}

/// Response from `/get-sensor-data`
#[derive(Debug, Clone, Deserialize)]
pub struct SensorDataResponse {
    pub data: Vec<SensorReading>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Success body from `/upload-csv`; every field is optional upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub rows_processed: Option<u64>,
    #[serde(default)]
    pub total_rows: Option<u64>,
}

/// Error body returned by the backend services (`{"detail": "..."}`).
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub detail: serde_json::Value,
}

impl ErrorDetail {
    /// Extract `detail` from a raw error body. Non-string details (e.g. FastAPI
    /// validation lists) are rendered as compact JSON.
    #[must_use]
    pub fn from_body(body: &str) -> Option<String> {
        let parsed: Self = serde_json::from_str(body).ok()?;
        match parsed.detail {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Response from `/get-predictions`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictionsResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub groups: Option<Vec<PredictionGroup>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictionGroup {
    pub data_type: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub prediction: Prediction,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    #[serde(default)]
    pub maintenance_needed: bool,
    /// Confidence in `[0, 1]`
    #[serde(default)]
    pub probability: f64,
    #[serde(default)]
    pub estimated_time_to_maintenance: Option<String>,
    #[serde(default)]
    pub average_readings: AverageReadings,
    #[serde(default)]
    pub issues: Vec<String>,
    /// Forecast timeline for the next hours
    #[serde(default)]
    pub predictions: Option<Vec<PredictionPoint>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AverageReadings {
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub vibration: f64,
    #[serde(default)]
    pub energy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PredictionPoint {
    #[serde(deserialize_with = "timestamp_from_wire")]
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub vibration: f64,
    pub energy: f64,
}

/// Parse a wire timestamp. RFC 3339 is preferred; the data service also emits
/// naive ISO date-times, which are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn timestamp_from_wire<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

/// Raw representation for machine ids, which arrive as strings or bare numbers
#[derive(Deserialize)]
#[serde(untagged)]
enum RawMachineId {
    Text(String),
    Number(serde_json::Number),
}

fn machine_id_from_wire<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawMachineId::deserialize(deserializer)? {
        RawMachineId::Text(s) => s,
        RawMachineId::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_and_naive_timestamps() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T14:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 12:30:00.000"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn reading_accepts_numeric_machine_id() {
        let reading: SensorReading = serde_json::from_str(
            r#"{"machine_id": 7, "timestamp": "2024-03-01T12:30:00",
                "temperature": 70.5, "vibration": 0.2, "energy_consumption": 12.0,
                "id": 99}"#,
        )
        .unwrap();
        assert_eq!(reading.machine_id, "7");
        assert_eq!(reading.temperature, 70.5);
    }

    #[test]
    fn error_detail_extracts_strings_and_structures() {
        assert_eq!(
            ErrorDetail::from_body(r#"{"detail": "Only CSV files are allowed"}"#).as_deref(),
            Some("Only CSV files are allowed")
        );
        assert_eq!(
            ErrorDetail::from_body(r#"{"detail": [{"loc": ["file"]}]}"#).as_deref(),
            Some(r#"[{"loc":["file"]}]"#)
        );
        assert_eq!(ErrorDetail::from_body("<html>boom</html>"), None);
    }
}
