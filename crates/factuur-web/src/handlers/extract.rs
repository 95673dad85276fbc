use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use std::sync::Arc;

use factuur_core::{InvoiceRecord, content_type_for_extension};

use crate::error::ApiError;
use crate::state::AppState;
use crate::upload;

pub async fn extract(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<InvoiceRecord>, ApiError> {
    // Anything that is not a multipart form carries no file.
    let multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "rejected non-multipart upload");
        ApiError::bad_request("No file uploaded")
    })?;
    let fields = upload::parse_multipart(multipart, state.max_upload_bytes).await?;
    let file = fields.file;
    let content_type = content_type_for_extension(&file.extension);

    tracing::info!(filename = %file.filename, bytes = file.data.len(), content_type, "extracting invoice");

    // The underlying message goes to the client unfiltered.
    let mut record = state
        .gateway
        .extract(&file.data, content_type)
        .await
        .map_err(|e| ApiError::internal(format!("Extraction failed: {}", e)))?;

    record.notes = fields.notes;
    Ok(Json(record))
}
