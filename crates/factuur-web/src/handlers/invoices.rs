use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use std::sync::Arc;

use factuur_store::{InvoiceStore, NewInvoice, StoreError, StoredInvoice};

use crate::error::ApiError;
use crate::models::{ListQuery, SavedResponse};
use crate::state::AppState;

pub async fn create(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewInvoice>, JsonRejection>,
) -> Result<(StatusCode, Json<SavedResponse>), ApiError> {
    let Json(invoice) = body.map_err(|rej| ApiError::new(rej.status(), rej.body_text()))?;
    let path = state.database_path.clone();
    let id = with_store(move || InvoiceStore::open(&path)?.insert(&invoice)).await?;

    Ok((StatusCode::CREATED, Json(SavedResponse { ok: true, id })))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<StoredInvoice>>, ApiError> {
    let path = state.database_path.clone();
    let rows = with_store(move || InvoiceStore::open(&path)?.list(query.limit)).await?;

    Ok(Json(rows))
}

/// Run a blocking store operation on its own connection.
async fn with_store<T, F>(op: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| ApiError::internal(format!("Store task failed: {}", e)))?
        .map_err(|e| {
            tracing::error!(error = %e, "store operation failed");
            ApiError::internal(e.to_string())
        })
}
