use crate::cli::Args;
use crate::error::{AppError, Result};
use plugin_client::{BaseUrlOptions, ClientOptions, DEFAULT_NAMESPACE, PollConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const APP_DIR: &str = "qmcred";
const CONFIG_FILE: &str = "config.toml";
const QR_FILE: &str = "qmcred-qrcode.png";

/// Settings read from `config.toml`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Page the plugin UI is served from; its `ip` parameter or host picks the backend.
    pub page_url: Option<String>,
    /// Backend host, takes precedence over `page_url`.
    pub ip: Option<String>,
    pub scheme: String,
    /// Port appended when the backend host has none.
    pub port: Option<u16>,
    pub namespace: String,
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub poll_timeout_secs: u64,
    /// Pause after a successful login before exiting.
    pub close_delay_ms: u64,
    /// Where the QR code PNG is written.
    pub qr_output: Option<PathBuf>,
    pub user_agent: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            page_url: None,
            ip: None,
            scheme: "http".to_string(),
            port: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            timeout_secs: 10,
            poll_interval_secs: 3,
            poll_timeout_secs: 120,
            close_delay_ms: 1500,
            qr_output: None,
            user_agent: None,
        }
    }
}

impl AppConfig {
    /// Load the configuration, falling back to defaults when the file is missing.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Overwrite the config file with defaults.
    pub fn reset(path: Option<&Path>) -> Result<PathBuf> {
        let path = Self::resolve_path(path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, Self::default().show()?)?;
        Ok(path)
    }

    /// Effective configuration as TOML.
    pub fn show(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
        match path {
            Some(path) => Ok(path.to_path_buf()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
                .ok_or_else(|| AppError::Config("cannot determine config directory".into())),
        }
    }

    /// Apply command-line overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ip) = &args.ip {
            self.ip = Some(ip.clone());
        }
        if let Some(page_url) = &args.page_url {
            self.page_url = Some(page_url.clone());
        }
        if let Some(port) = args.port {
            self.port = Some(port);
        }
        if let Some(timeout) = args.timeout {
            self.timeout_secs = timeout;
        }
    }

    pub fn page_url(&self) -> Result<Option<url::Url>> {
        self.page_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                url::Url::parse(s.trim())
                    .map_err(|e| AppError::Config(format!("invalid page_url '{s}': {e}")))
            })
            .transpose()
    }

    pub fn base_url_options(&self) -> BaseUrlOptions {
        BaseUrlOptions {
            scheme: self.scheme.clone(),
            port: self.port,
            namespace: self.namespace.clone(),
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        let mut options = ClientOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            ..Default::default()
        };
        if let Some(user_agent) = &self.user_agent {
            options.user_agent = user_agent.clone();
        }
        options
    }

    pub fn poll_config(&self) -> Result<PollConfig> {
        if self.poll_interval_secs == 0 {
            return Err(AppError::Config("poll_interval_secs must be positive".into()));
        }
        Ok(PollConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_lifetime: Duration::from_secs(self.poll_timeout_secs),
        })
    }

    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }

    pub fn qr_output(&self) -> PathBuf {
        self.qr_output
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(QR_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.poll_config().unwrap(), PollConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "ip = \"10.0.0.7\"\nport = 8021\npoll_timeout_secs = 60\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(config.base_url_options().port, Some(8021));
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(
            config.poll_config().unwrap().max_lifetime,
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_reset_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        AppConfig::reset(Some(&path)).unwrap();
        assert_eq!(AppConfig::load(Some(&path)).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "port = \"not a number\"").unwrap();
        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(AppError::TomlDe(_))
        ));
    }

    #[test]
    fn test_args_override_file() {
        let mut config = AppConfig {
            ip: Some("10.0.0.7".into()),
            ..Default::default()
        };
        let args = Args::parse_from(["qmcred", "--ip", "192.168.1.2", "--timeout", "3", "status"]);
        config.apply_args(&args);
        assert_eq!(config.ip.as_deref(), Some("192.168.1.2"));
        assert_eq!(config.client_options().timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_page_url_validation() {
        let config = AppConfig {
            page_url: Some("http://bot.lan:8021/?ip=10.0.0.7".into()),
            ..Default::default()
        };
        assert!(config.page_url().unwrap().is_some());

        let config = AppConfig {
            page_url: Some("not a url".into()),
            ..Default::default()
        };
        assert!(matches!(config.page_url(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = AppConfig {
            poll_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.poll_config().is_err());
    }
}
