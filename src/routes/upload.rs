use axum::{
    extract::{Multipart, State},
    Json,
};
use std::collections::BTreeMap;

use crate::api::models::UploadReceipt;
use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::services::upload::UploadForm;

/// Validate an upload form and forward it to the ingestion service
///
/// Multipart fields: `file` (CSV), `data_type`, `metadata` (JSON object).
#[utoipa::path(
    post,
    path = "/api/upload",
    responses(
        (status = 200, description = "File uploaded successfully", body = UploadReceipt),
        (status = 400, description = "Invalid form"),
        (status = 502, description = "Ingestion service rejected the upload"),
    ),
    tag = "upload"
)]
pub async fn upload_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadReceipt>> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };

        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(ToString::to_string);
                form.contents = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?
                    .to_vec();
            }
            "data_type" => {
                form.data_type = Some(read_text(field).await?);
            }
            "metadata" => {
                form.metadata = parse_metadata(&read_text(field).await?)?;
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown upload field");
            }
        }
    }

    let upload = form.validate()?;
    let receipt = state.client.upload_csv(upload).await?;
    Ok(Json(receipt))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read form field: {e}")))
}

/// Metadata arrives JSON-encoded. Scalars are kept as text; nulls are dropped.
fn parse_metadata(raw: &str) -> AppResult<BTreeMap<String, String>> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let object: BTreeMap<String, serde_json::Value> = serde_json::from_str(raw)
        .map_err(|e| AppError::Validation(format!("Metadata must be a JSON object: {e}")))?;

    Ok(object
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect())
}
