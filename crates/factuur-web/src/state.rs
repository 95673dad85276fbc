use std::path::PathBuf;

use factuur_core::ExtractionGateway;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub gateway: ExtractionGateway,
    /// The store is opened per request; only the path is shared.
    pub database_path: PathBuf,
    pub max_upload_bytes: usize,
}
