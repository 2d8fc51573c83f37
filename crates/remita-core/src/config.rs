use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{RemitaError, Result};

/// Top-level configuration for the Remita agent.
///
/// Loaded from `~/.remita/config.toml` by default. Each section corresponds
/// to a bounded context or cross-cutting concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemitaConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    #[serde(default)]
    pub docintel: DocIntelConfig,
}

impl RemitaConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RemitaConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| RemitaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Full path of the embedded ledger database file.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.general.data_dir).join(&self.storage.database_file)
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite ledger database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.remita/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Embedded database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// File name of the SQLite database inside the data directory.
    pub database_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: "remita.db".to_string(),
        }
    }
}

/// Reconciliation behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Tolerance applied when no explicit threshold is given, as a decimal
    /// string (TOML value is quoted, e.g. `"0.01"`).
    pub default_tolerance: Decimal,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            // One cent.
            default_tolerance: Decimal::new(1, 2),
        }
    }
}

/// Document-intelligence client settings.
///
/// Credentials are explicit configuration handed to the client constructor,
/// never read from process-wide defaults at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocIntelConfig {
    /// Base URL of the document-intelligence API.
    pub base_url: String,
    /// Bearer token for the API.
    pub token: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum retry attempts for stage-completion writes.
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds (doubled per attempt).
    pub retry_base_delay_ms: u64,
}

impl Default for DocIntelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            token: String::new(),
            timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::str::FromStr;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = RemitaConfig::default();
        assert_eq!(config.general.data_dir, "~/.remita/data");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.storage.database_file, "remita.db");
        assert_eq!(
            config.reconciliation.default_tolerance,
            Decimal::from_str("0.01").unwrap()
        );
        assert_eq!(config.docintel.timeout_secs, 30);
        assert_eq!(config.docintel.max_retries, 3);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
data_dir = "/custom/data"
log_level = "debug"

[storage]
database_file = "ledger.db"

[reconciliation]
default_tolerance = "0.05"

[docintel]
base_url = "https://docintel.example.com"
token = "secret"
timeout_secs = 10
max_retries = 5
retry_base_delay_ms = 250
"#;
        let file = create_temp_config(content);
        let config = RemitaConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "/custom/data");
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.storage.database_file, "ledger.db");
        assert_eq!(
            config.reconciliation.default_tolerance,
            Decimal::from_str("0.05").unwrap()
        );
        assert_eq!(config.docintel.base_url, "https://docintel.example.com");
        assert_eq!(config.docintel.token, "secret");
        assert_eq!(config.docintel.max_retries, 5);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[general]
log_level = "warn"
"#;
        let file = create_temp_config(content);
        let config = RemitaConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "warn");
        // Remaining fields use defaults
        assert_eq!(config.storage.database_file, "remita.db");
        assert_eq!(config.docintel.timeout_secs, 30);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = RemitaConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.general.data_dir, "~/.remita/data");
    }

    #[test]
    fn test_load_invalid_toml() {
        let content = "this is {{ not valid TOML";
        let file = create_temp_config(content);
        assert!(RemitaConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        let config = RemitaConfig::default();
        config.save(&path).unwrap();

        let reloaded = RemitaConfig::load(&path).unwrap();
        assert_eq!(reloaded.general.data_dir, config.general.data_dir);
        assert_eq!(
            reloaded.reconciliation.default_tolerance,
            config.reconciliation.default_tolerance
        );
        assert_eq!(reloaded.docintel.base_url, config.docintel.base_url);
    }

    #[test]
    fn test_db_path_joins_data_dir_and_file() {
        let mut config = RemitaConfig::default();
        config.general.data_dir = "/var/lib/remita".to_string();
        config.storage.database_file = "ledger.db".to_string();
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/remita/ledger.db"));
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = RemitaConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "~/.remita/data");
        assert_eq!(config.storage.database_file, "remita.db");
    }
}
