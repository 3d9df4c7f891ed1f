use async_trait::async_trait;
use reqwest::{multipart, Client, Response, StatusCode};
use std::time::Duration;

use crate::api::gateway::FetchGateway;
use crate::api::models::{ErrorDetail, Page, PredictionsResponse, SensorDataResponse, UploadReceipt};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::services::upload::ValidatedUpload;

const PREDICTIONS_FALLBACK: &str = "Failed to load predictions. Please try again later.";
const UPLOAD_FALLBACK: &str = "Error uploading file";

/// HTTP client for the sensor data, prediction and ingestion services.
pub struct DashboardClient {
    http_client: Client,
    base_url: String,
}

impl DashboardClient {
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.api_base_url.clone(),
        })
    }

    /// Get one page of sensor readings, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Network` if the request fails, returns an error status,
    /// or the body cannot be decoded.
    pub async fn get_sensor_data(&self, offset: usize, limit: usize) -> AppResult<Page> {
        let url = format!("{}/get-sensor-data", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await
            .map_err(|e| AppError::Network(format!("Request failed: {e}")))?;

        let response = ensure_success(response, None).await?;

        let text = response
            .text()
            .await
            .map_err(|e| AppError::Network(format!("Failed to get response text: {e}")))?;

        let parsed: SensorDataResponse = serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body_preview = %text.chars().take(500).collect::<String>(),
                "Failed to parse get-sensor-data response"
            );
            AppError::Network(format!("Failed to parse response: {e}"))
        })?;

        tracing::debug!(
            offset,
            limit,
            rows = parsed.data.len(),
            total = ?parsed.total,
            "page_fetched"
        );

        Ok(Page::new(parsed.data))
    }

    /// Get the latest maintenance predictions.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Network` carrying the service's `detail` message, or a
    /// generic message for any other failure.
    pub async fn get_predictions(&self) -> AppResult<PredictionsResponse> {
        let url = format!("{}/get-predictions", self.base_url);

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            tracing::warn!(error = %e, "Predictions request failed");
            AppError::Network(PREDICTIONS_FALLBACK.to_string())
        })?;

        let response = ensure_success(response, Some(PREDICTIONS_FALLBACK)).await?;

        response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse predictions response");
            AppError::Network(PREDICTIONS_FALLBACK.to_string())
        })
    }

    /// Upload a validated CSV dataset with its data type and metadata.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Network` carrying the ingestion service's `detail`
    /// message verbatim, or a generic upload failure message.
    pub async fn upload_csv(&self, upload: ValidatedUpload) -> AppResult<UploadReceipt> {
        let url = format!("{}/upload-csv", self.base_url);

        let metadata = serde_json::to_string(&upload.metadata)
            .map_err(|e| AppError::Internal(format!("Failed to encode metadata: {e}")))?;

        let file_part = multipart::Part::bytes(upload.contents)
            .file_name(upload.file_name.clone())
            .mime_str("text/csv")
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let form = multipart::Form::new()
            .part("file", file_part)
            .text("data_type", upload.data_type.key().to_string())
            .text("metadata", metadata);

        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Upload request failed");
                AppError::Network(UPLOAD_FALLBACK.to_string())
            })?;

        let response = ensure_success(response, Some(UPLOAD_FALLBACK)).await?;

        // The ingestion service does not promise a body shape on success
        let text = response.text().await.unwrap_or_default();
        let receipt = serde_json::from_str(&text).unwrap_or_default();

        tracing::info!(
            file = %upload.file_name,
            data_type = upload.data_type.key(),
            "csv_uploaded"
        );

        Ok(receipt)
    }
}

#[async_trait]
impl FetchGateway for DashboardClient {
    async fn fetch_page(&self, offset: usize, limit: usize) -> AppResult<Page> {
        self.get_sensor_data(offset, limit).await
    }
}

/// Turn a non-2xx response into `AppError::Network`.
///
/// The backend's `detail` is always preferred. Otherwise `fallback` is used if
/// given, else a status line.
async fn ensure_success(response: Response, fallback: Option<&str>) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if let Some(detail) = ErrorDetail::from_body(&body) {
        return Err(AppError::Network(detail));
    }

    tracing::warn!(
        status = %status,
        body_preview = %body.chars().take(200).collect::<String>(),
        "Upstream returned error status"
    );

    let message = match fallback {
        Some(fallback) => fallback.to_string(),
        None if status == StatusCode::TOO_MANY_REQUESTS => "Rate limited (429)".to_string(),
        None => format!("HTTP {status}"),
    };
    Err(AppError::Network(message))
}
