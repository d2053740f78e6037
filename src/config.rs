//! Runtime configuration: which store realization to use and how to reach
//! it. Loaded from a YAML file, then overridden by environment variables so
//! deployments can switch modes without editing the file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const ENV_MODE: &str = "SCHEMAFORGE_MODE";
const ENV_DATABASE: &str = "SCHEMAFORGE_DATABASE";
const ENV_API_URL: &str = "SCHEMAFORGE_API_URL";
const ENV_ADMIN_SECRET: &str = "SCHEMAFORGE_ADMIN_SECRET";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Embedded SQLite database on the local filesystem.
    #[default]
    Local,
    /// REST backend holding one schema document per project.
    Remote,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteApiConfig {
    pub base_url: String,
    /// Shared secret for the admin endpoints; optional in local mode.
    pub admin_secret: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: StorageMode,
    /// SQLite path for local mode; `None` uses the default database file.
    pub database: Option<String>,
    pub api: RemoteApiConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus environment, for running without a config file.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(mode) = std::env::var(ENV_MODE) {
            match mode.to_lowercase().as_str() {
                "local" => self.mode = StorageMode::Local,
                "remote" => self.mode = StorageMode::Remote,
                other => tracing::warn!("ignoring unknown {}={}", ENV_MODE, other),
            }
        }
        if let Ok(database) = std::env::var(ENV_DATABASE) {
            self.database = Some(database);
        }
        if let Ok(base_url) = std::env::var(ENV_API_URL) {
            self.api.base_url = base_url;
        }
        if let Ok(secret) = std::env::var(ENV_ADMIN_SECRET) {
            self.api.admin_secret = Some(secret);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_mode() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.mode, StorageMode::Local);
        assert!(config.database.is_none());
        assert!(config.api.base_url.is_empty());
    }

    #[test]
    fn remote_mode_round_trips() {
        let yaml = r#"
mode: remote
api:
  base_url: "https://api.example.com"
  admin_secret: "s3cret"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.mode, StorageMode::Remote);
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.api.admin_secret.as_deref(), Some("s3cret"));

        let serialized = serde_yaml::to_string(&config).unwrap();
        assert!(serialized.contains("remote"));
    }

    #[test]
    fn local_database_path_is_optional() {
        let yaml = "mode: local\ndatabase: schemas.db\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.database.as_deref(), Some("schemas.db"));
    }
}
