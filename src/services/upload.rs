//! Upload form validation.
//!
//! Each data type carries its own metadata fields. A form is checked here
//! before anything is sent to the ingestion service; the service still
//! performs its own validation and its `detail` message wins on rejection.

use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

pub const REQUIRED_COLUMNS: [&str; 5] = [
    "machine_id",
    "timestamp",
    "temperature",
    "vibration",
    "energy_consumption",
];

const MISSING_FILE_OR_TYPE: &str = "Please select a file and specify the data type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Pressing,
    Machining,
    Assembly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Select(&'static [&'static str]),
    Text,
}

#[derive(Debug, Clone, Copy)]
pub struct MetadataField {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

const PRESSING_FIELDS: &[MetadataField] = &[
    MetadataField {
        key: "material_type",
        label: "Material Type",
        kind: FieldKind::Select(&["Plastic", "Metal", "Composite", "Rubber", "Other"]),
    },
    MetadataField {
        key: "pressure_range",
        label: "Pressure Range (PSI)",
        kind: FieldKind::Select(&["Low (0-1000)", "Medium (1000-5000)", "High (5000+)"]),
    },
    MetadataField {
        key: "material_thickness",
        label: "Material Thickness (mm)",
        kind: FieldKind::Text,
    },
];

const MACHINING_FIELDS: &[MetadataField] = &[
    MetadataField {
        key: "material_type",
        label: "Material Type",
        kind: FieldKind::Select(&["Aluminum", "Steel", "Titanium", "Plastic", "Other"]),
    },
    MetadataField {
        key: "cutting_speed",
        label: "Cutting Speed (RPM)",
        kind: FieldKind::Select(&["Low (0-5000)", "Medium (5000-15000)", "High (15000+)"]),
    },
    MetadataField {
        key: "coolant_type",
        label: "Coolant Type",
        kind: FieldKind::Select(&["Water-based", "Oil-based", "Synthetic", "None"]),
    },
];

const ASSEMBLY_FIELDS: &[MetadataField] = &[
    MetadataField {
        key: "product_type",
        label: "Product Type",
        kind: FieldKind::Select(&["Electronics", "Automotive", "Consumer Goods", "Industrial"]),
    },
    MetadataField {
        key: "line_speed",
        label: "Line Speed",
        kind: FieldKind::Select(&["Slow", "Medium", "Fast"]),
    },
    MetadataField {
        key: "batch_size",
        label: "Batch Size",
        kind: FieldKind::Text,
    },
];

impl DataType {
    pub const ALL: [Self; 3] = [Self::Pressing, Self::Machining, Self::Assembly];

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.key() == key.trim())
    }

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Pressing => "pressing",
            Self::Machining => "machining",
            Self::Assembly => "assembly",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Pressing => "Material Pressing",
            Self::Machining => "CNC Machining",
            Self::Assembly => "Assembly Line",
        }
    }

    #[must_use]
    pub fn fields(self) -> &'static [MetadataField] {
        match self {
            Self::Pressing => PRESSING_FIELDS,
            Self::Machining => MACHINING_FIELDS,
            Self::Assembly => ASSEMBLY_FIELDS,
        }
    }
}

/// Upload form as submitted by the operator.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub file_name: Option<String>,
    pub contents: Vec<u8>,
    pub data_type: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// A form that passed [`UploadForm::validate`].
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub file_name: String,
    pub contents: Vec<u8>,
    pub data_type: DataType,
    pub metadata: BTreeMap<String, String>,
}

impl UploadForm {
    /// # Errors
    ///
    /// Returns `AppError::Validation` with an operator-facing message when the
    /// file, data type, metadata or CSV header is unacceptable.
    pub fn validate(self) -> AppResult<ValidatedUpload> {
        let file_name = self
            .file_name
            .filter(|name| !name.trim().is_empty() && !self.contents.is_empty());
        let data_type_key = self.data_type.filter(|key| !key.trim().is_empty());

        let (Some(file_name), Some(data_type_key)) = (file_name, data_type_key) else {
            return Err(AppError::Validation(MISSING_FILE_OR_TYPE.to_string()));
        };

        let data_type = DataType::from_key(&data_type_key)
            .ok_or_else(|| AppError::Validation(format!("Unknown data type: {data_type_key}")))?;

        if !file_name.to_lowercase().ends_with(".csv") {
            return Err(AppError::Validation(
                "Only CSV files are allowed".to_string(),
            ));
        }

        let metadata = validate_metadata(data_type, self.metadata)?;
        check_columns(&self.contents)?;

        Ok(ValidatedUpload {
            file_name,
            contents: self.contents,
            data_type,
            metadata,
        })
    }
}

fn validate_metadata(
    data_type: DataType,
    metadata: BTreeMap<String, String>,
) -> AppResult<BTreeMap<String, String>> {
    let fields = data_type.fields();
    let mut accepted = BTreeMap::new();

    for (key, value) in metadata {
        let field = fields.iter().find(|f| f.key == key).ok_or_else(|| {
            AppError::Validation(format!(
                "Unknown field '{key}' for {}",
                data_type.display_name()
            ))
        })?;

        let value = value.trim().to_string();
        // Blank fields are treated as not filled in
        if value.is_empty() {
            continue;
        }

        if let FieldKind::Select(options) = field.kind
            && !options.contains(&value.as_str())
        {
            return Err(AppError::Validation(format!(
                "Invalid {}: {value}",
                field.label
            )));
        }

        accepted.insert(key, value);
    }

    Ok(accepted)
}

fn check_columns(contents: &[u8]) -> AppResult<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(contents);

    let headers = reader
        .headers()
        .map_err(|e| AppError::Validation(format!("Unreadable CSV header: {e}")))?;

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|required| {
            !headers
                .iter()
                .any(|h| h.trim_start_matches('\u{feff}').trim() == *required)
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )))
    }
}
