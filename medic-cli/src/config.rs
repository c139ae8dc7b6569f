//! CLI configuration file

use anyhow::{Context as _, Result};
use medic_core::context::DEFAULT_RUN_TIMEOUT;
use medic_core::logging::LoggingConfig;
use medic_core::providers::ContaboConfig;
use medic_core::{KubeSettings, ProviderSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bound for the whole run, in seconds
    pub timeout_secs: u64,
    /// Nodes rebooted at the same time during `heal`
    pub concurrency: usize,
    pub kubeconfig: Option<PathBuf>,
    pub kube_context: Option<String>,
    pub hetzner_robot: bool,
    pub log: LoggingConfig,
    pub contabo: ContaboConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_RUN_TIMEOUT.as_secs(),
            concurrency: 1,
            kubeconfig: None,
            kube_context: None,
            hetzner_robot: true,
            log: LoggingConfig::default(),
            contabo: ContaboConfig::default(),
        }
    }
}

impl Config {
    /// Load the config file
    ///
    /// An explicit path must exist. The default path is optional and a
    /// missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(PathBuf::from(home).join(".config/node-medic/config.toml"))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            contabo: self.contabo.clone(),
            hetzner_robot: self.hetzner_robot,
        }
    }

    pub fn kube_settings(&self) -> KubeSettings {
        KubeSettings {
            kubeconfig: self.kubeconfig.clone(),
            context: self.kube_context.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medic_core::providers::contabo::DEFAULT_API_ENDPOINT;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
timeout_secs = 60

[log]
level = "debug"

[contabo]
client_id = "from-file"
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();

        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.concurrency, 1);
        assert!(config.hetzner_robot);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.contabo.client_id, "from-file");
        assert_eq!(config.contabo.api_endpoint, DEFAULT_API_ENDPOINT);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout_secs = \"soon\"").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn test_settings_conversion() {
        let config = Config {
            hetzner_robot: false,
            kube_context: Some("prod".to_string()),
            ..Default::default()
        };

        assert!(!config.provider_settings().hetzner_robot);
        assert_eq!(config.kube_settings().context.as_deref(), Some("prod"));
        assert!(config.kube_settings().kubeconfig.is_none());
    }
}
