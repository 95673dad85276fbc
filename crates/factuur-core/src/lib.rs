use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod analyzer;
pub mod config_file;
pub mod gateway;
pub mod normalize;

// Re-export for convenience
pub use analyzer::DocumentAnalyzer;
pub use analyzer::azure::AzureAnalyzer;
pub use gateway::{
    ALLOWED_EXTENSIONS, ExtractionGateway, MAX_DOCUMENT_BYTES, content_type_for_extension,
    is_supported_extension,
};
pub use normalize::normalize;

/// Default Document Intelligence model.
pub const DEFAULT_MODEL_ID: &str = "prebuilt-invoice";

/// Default Document Intelligence REST API version.
pub const DEFAULT_API_VERSION: &str = "2024-11-30";

/// Default location of the SQLite invoice store.
pub const DEFAULT_DATABASE_PATH: &str = "invoices.db";

/// Default HTTP port for the web server.
pub const DEFAULT_PORT: u16 = 5000;

/// The normalized invoice fields shown to the user for review.
///
/// Every field is always present; "not found" is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub invoice_date: String,
    pub invoice_amount: String,
    pub btw_amount: String,
    pub btw_number: String,
    pub kvk: String,
    pub supplier: String,
    pub notes: String,
}

/// A single extracted field, as far as the normalizer cares about it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldValue {
    /// The service resolved the field to a typed value (string, date, amount).
    Resolved(String),
    /// Only the raw text span was available.
    Raw(String),
    #[default]
    Absent,
}

impl FieldValue {
    /// Build a field from an optional resolved value and optional raw content.
    /// Empty strings count as missing.
    pub fn from_parts(resolved: Option<String>, content: Option<String>) -> Self {
        match (resolved, content) {
            (Some(v), _) if !v.is_empty() => FieldValue::Resolved(v),
            (_, Some(c)) if !c.is_empty() => FieldValue::Raw(c),
            _ => FieldValue::Absent,
        }
    }

    /// The field's text: resolved value first, then raw content, else `""`.
    pub fn text(&self) -> &str {
        match self {
            FieldValue::Resolved(v) => v,
            FieldValue::Raw(c) => c,
            FieldValue::Absent => "",
        }
    }
}

/// One document found in an analyzed file.
#[derive(Debug, Clone, Default)]
pub struct AnalyzedDocument {
    pub fields: HashMap<String, FieldValue>,
}

impl AnalyzedDocument {
    /// Look up a field by its service-side name.
    pub fn field(&self, name: &str) -> &FieldValue {
        static ABSENT: FieldValue = FieldValue::Absent;
        self.fields.get(name).unwrap_or(&ABSENT)
    }
}

/// The subset of an analysis result the normalizer consumes.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeResult {
    /// Full raw text of the file, in reading order.
    pub content: String,
    pub documents: Vec<AnalyzedDocument>,
}

/// Errors from a [`DocumentAnalyzer`] call.
#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("analyze response has no Operation-Location header")]
    MissingOperationLocation,
    #[error("analysis failed: {0}")]
    Failed(String),
    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by the [`ExtractionGateway`].
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Missing AZURE_DI_ENDPOINT or AZURE_DI_KEY")]
    MissingCredentials,
    #[error("{0}")]
    Analysis(String),
}

/// Runtime configuration, resolved from the config file cascade and the environment.
#[derive(Clone)]
pub struct Config {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model_id: String,
    pub api_version: String,
    pub database_path: PathBuf,
    pub port: u16,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model_id", &self.model_id)
            .field("api_version", &self.api_version)
            .field("database_path", &self.database_path)
            .field("port", &self.port)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model_id: DEFAULT_MODEL_ID.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Load the TOML cascade and apply the process environment on top.
    pub fn load() -> Self {
        Self::from_sources(&config_file::load_config(), |key| std::env::var(key).ok())
    }

    /// Resolve a config from file values and an environment lookup.
    /// Non-empty environment values win over the file; the file wins over defaults.
    pub fn from_sources(
        file: &config_file::ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let azure = file.azure.clone().unwrap_or_default();
        let storage = file.storage.clone().unwrap_or_default();
        let server = file.server.clone().unwrap_or_default();
        let defaults = Config::default();

        let port = match env("PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "ignoring invalid PORT");
                server.port.unwrap_or(defaults.port)
            }),
            None => server.port.unwrap_or(defaults.port),
        };

        Self {
            endpoint: env("AZURE_DI_ENDPOINT").or(azure.endpoint),
            api_key: env("AZURE_DI_KEY").or(azure.key),
            model_id: env("AZURE_DI_MODEL_ID")
                .or(azure.model_id)
                .unwrap_or(defaults.model_id),
            api_version: env("AZURE_DI_API_VERSION")
                .or(azure.api_version)
                .unwrap_or(defaults.api_version),
            database_path: env("FACTUUR_DB_PATH")
                .or(storage.database_path)
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            port,
        }
    }

    /// Whether both the endpoint and the key are set.
    pub fn has_credentials(&self) -> bool {
        self.endpoint.is_some() && self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_file::{AzureConfig, ConfigFile, StorageConfig};

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn field_value_prefers_resolved_over_content() {
        let v = FieldValue::from_parts(Some("2024-03-01".into()), Some("1 maart 2024".into()));
        assert_eq!(v, FieldValue::Resolved("2024-03-01".into()));
        assert_eq!(v.text(), "2024-03-01");
    }

    #[test]
    fn field_value_falls_back_to_content() {
        let v = FieldValue::from_parts(Some(String::new()), Some("ACME B.V.".into()));
        assert_eq!(v, FieldValue::Raw("ACME B.V.".into()));
        assert_eq!(v.text(), "ACME B.V.");
    }

    #[test]
    fn field_value_absent_is_empty() {
        let v = FieldValue::from_parts(None, None);
        assert_eq!(v, FieldValue::Absent);
        assert_eq!(v.text(), "");
    }

    #[test]
    fn missing_field_lookup_is_absent() {
        let doc = AnalyzedDocument::default();
        assert_eq!(doc.field("VendorName"), &FieldValue::Absent);
    }

    #[test]
    fn defaults_without_any_source() {
        let config = Config::from_sources(&ConfigFile::default(), env_from(&[]));
        assert_eq!(config.model_id, "prebuilt-invoice");
        assert_eq!(config.api_version, "2024-11-30");
        assert_eq!(config.database_path, PathBuf::from("invoices.db"));
        assert_eq!(config.port, 5000);
        assert!(!config.has_credentials());
    }

    #[test]
    fn env_overrides_file() {
        let file = ConfigFile {
            azure: Some(AzureConfig {
                endpoint: Some("https://file.example".into()),
                model_id: Some("custom-invoice".into()),
                ..Default::default()
            }),
            storage: Some(StorageConfig {
                database_path: Some("/var/lib/factuur/file.db".into()),
            }),
            ..Default::default()
        };
        let config = Config::from_sources(
            &file,
            env_from(&[
                ("AZURE_DI_ENDPOINT", "https://env.example"),
                ("AZURE_DI_KEY", "secret"),
                ("PORT", "8080"),
            ]),
        );
        assert_eq!(config.endpoint.as_deref(), Some("https://env.example"));
        assert_eq!(config.model_id, "custom-invoice");
        assert_eq!(
            config.database_path,
            PathBuf::from("/var/lib/factuur/file.db")
        );
        assert_eq!(config.port, 8080);
        assert!(config.has_credentials());
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let config = Config::from_sources(
            &ConfigFile::default(),
            env_from(&[("AZURE_DI_KEY", "  "), ("AZURE_DI_MODEL_ID", "")]),
        );
        assert!(config.api_key.is_none());
        assert_eq!(config.model_id, DEFAULT_MODEL_ID);
    }

    #[test]
    fn invalid_port_keeps_default() {
        let config = Config::from_sources(&ConfigFile::default(), env_from(&[("PORT", "http")]));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn debug_redacts_key() {
        let config = Config {
            api_key: Some("super-secret".into()),
            ..Config::default()
        };
        let dbg = format!("{:?}", config);
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("***"));
    }
}
