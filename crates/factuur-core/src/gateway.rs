//! The extraction boundary: one analyzer call, one normalization pass.

use std::sync::Arc;
use std::time::Instant;

use crate::analyzer::DocumentAnalyzer;
use crate::analyzer::azure::AzureAnalyzer;
use crate::{Config, ExtractError, InvoiceRecord, normalize};

/// Wraps the injected [`DocumentAnalyzer`].
///
/// A gateway built without an analyzer (credentials absent) fails every call
/// with [`ExtractError::MissingCredentials`].
#[derive(Clone)]
pub struct ExtractionGateway {
    analyzer: Option<Arc<dyn DocumentAnalyzer>>,
}

impl ExtractionGateway {
    pub fn new(analyzer: Option<Arc<dyn DocumentAnalyzer>>) -> Self {
        Self { analyzer }
    }

    /// Build a gateway backed by Azure Document Intelligence.
    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        match (&config.endpoint, &config.api_key) {
            (Some(endpoint), Some(key)) => {
                let analyzer = AzureAnalyzer::new(
                    endpoint.as_str(),
                    key.as_str(),
                    config.model_id.as_str(),
                    config.api_version.as_str(),
                    client,
                );
                tracing::info!(endpoint = %endpoint, model = %config.model_id, "document analyzer configured");
                Self::new(Some(Arc::new(analyzer)))
            }
            _ => {
                tracing::warn!("AZURE_DI_ENDPOINT or AZURE_DI_KEY not set, extraction disabled");
                Self::new(None)
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.analyzer.is_some()
    }

    /// Analyze a document and normalize the result.
    pub async fn extract(
        &self,
        document: &[u8],
        content_type: &str,
    ) -> Result<InvoiceRecord, ExtractError> {
        let analyzer = self
            .analyzer
            .as_ref()
            .ok_or(ExtractError::MissingCredentials)?;

        let start = Instant::now();
        let result = analyzer
            .analyze(document, content_type)
            .await
            .map_err(|e| {
                tracing::warn!(backend = analyzer.name(), error = %e, "extraction failed");
                ExtractError::Analysis(e.to_string())
            })?;

        let record = normalize(&result);
        tracing::info!(
            backend = analyzer.name(),
            bytes = document.len(),
            content_type,
            documents = result.documents.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "extraction complete"
        );
        Ok(record)
    }
}

/// Upload extensions accepted for analysis.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg"];

/// Largest document accepted for analysis: 20 MiB.
pub const MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

/// Whether `ext` (with or without the leading dot) is on the allow-list.
pub fn is_supported_extension(ext: &str) -> bool {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str())
}

/// MIME type for an upload extension (with or without the leading dot).
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}
