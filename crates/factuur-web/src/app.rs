use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::template;

/// Room for the multipart framing and the notes field on top of the document.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes + FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(handlers::index::index))
        .route("/static/app.js", get(template::serve_script))
        .route("/api/extract", post(handlers::extract::extract))
        .route(
            "/api/invoices",
            post(handlers::invoices::create).get(handlers::invoices::list),
        )
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
