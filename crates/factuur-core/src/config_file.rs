use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub azure: Option<AzureConfig>,
    pub storage: Option<StorageConfig>,
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AzureConfig {
    pub endpoint: Option<String>,
    pub key: Option<String>,
    pub model_id: Option<String>,
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
}

/// Platform config directory path: `<config_dir>/factuur/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("factuur").join("config.toml"))
}

/// Load config by cascading CWD `.factuur.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".factuur.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let azure_base = base.azure.unwrap_or_default();
    let azure_overlay = overlay.azure.unwrap_or_default();
    let storage_base = base.storage.unwrap_or_default();
    let storage_overlay = overlay.storage.unwrap_or_default();
    let server_base = base.server.unwrap_or_default();
    let server_overlay = overlay.server.unwrap_or_default();

    ConfigFile {
        azure: Some(AzureConfig {
            endpoint: azure_overlay.endpoint.or(azure_base.endpoint),
            key: azure_overlay.key.or(azure_base.key),
            model_id: azure_overlay.model_id.or(azure_base.model_id),
            api_version: azure_overlay.api_version.or(azure_base.api_version),
        }),
        storage: Some(StorageConfig {
            database_path: storage_overlay
                .database_path
                .or(storage_base.database_path),
        }),
        server: Some(ServerConfig {
            port: server_overlay.port.or(server_base.port),
        }),
    }
}
