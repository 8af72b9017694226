//! Configuration loading for signal-relay.
//!
//! Configuration is loaded from a TOML file (default: `relay.toml`).
//! Every section and field is optional.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for signal-relay.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Per-session configuration.
    pub session: SessionConfig,
    /// Stale-session reaper configuration.
    pub reaper: ReaperConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP/WebSocket listener (default: 0.0.0.0:8080).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Path of the WebSocket upgrade endpoint (default: /ws).
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    /// Origins allowed to open a session. Empty trusts every origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Enable metrics endpoint (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

/// Per-session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Seconds between liveness timestamp refreshes (default: 60).
    #[serde(default = "default_liveness_interval")]
    pub liveness_interval_secs: u64,
}

/// Stale-session reaper configuration.
///
/// The liveness task refreshes every registered peer, so an entry only goes
/// stale when its session stopped refreshing without cleaning up. This holds
/// only while `stale_after_secs` exceeds the liveness interval, which
/// [`Config::validate`] enforces.
#[derive(Debug, Clone, Deserialize)]
pub struct ReaperConfig {
    /// Enable the reaper (default: false).
    #[serde(default)]
    pub enabled: bool,
    /// Seconds between sweeps (default: 60).
    #[serde(default = "default_reaper_interval")]
    pub interval_secs: u64,
    /// Entries idle longer than this are evicted (default: 300).
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_liveness_interval() -> u64 {
    60
}

fn default_reaper_interval() -> u64 {
    60
}

fn default_stale_after() -> u64 {
    300 // 5 liveness intervals
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            ws_path: default_ws_path(),
            allowed_origins: Vec::new(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            liveness_interval_secs: default_liveness_interval(),
        }
    }
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_reaper_interval(),
            stale_after_secs: default_stale_after(),
        }
    }
}

impl SessionConfig {
    /// Liveness refresh period. Clamped to at least one second.
    pub fn liveness_interval(&self) -> Duration {
        Duration::from_secs(self.liveness_interval_secs.max(1))
    }
}

impl ReaperConfig {
    /// Sweep period. Clamped to at least one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    /// Idle time after which an entry is considered stale.
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

impl ServerConfig {
    /// Whether a request carrying `origin` may open a session.
    ///
    /// With no allow-list configured every origin, including a missing one,
    /// is accepted.
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        if self.allowed_origins.is_empty() {
            return true;
        }
        origin.is_some_and(|o| self.allowed_origins.iter().any(|allowed| allowed == o))
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that are individually valid but conflict.
    ///
    /// An enabled reaper must wait longer than one liveness interval,
    /// otherwise idle but healthy peers are evicted between refreshes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let liveness = self.session.liveness_interval();
        if self.reaper.enabled && self.reaper.stale_after() <= liveness {
            return Err(ConfigError::Invalid(format!(
                "reaper.stale_after_secs ({}) must exceed session.liveness_interval_secs ({})",
                self.reaper.stale_after_secs,
                liveness.as_secs()
            )));
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Settings conflict with each other.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.server.ws_path, "/ws");
        assert!(config.server.metrics_enabled);
        assert_eq!(config.session.liveness_interval_secs, 60);
        assert!(!config.reaper.enabled);
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[server]
bind_address = "127.0.0.1:5000"
ws_path = "/signal"
allowed_origins = ["https://app.example.com"]
metrics_enabled = false

[session]
liveness_interval_secs = 15

[reaper]
enabled = true
interval_secs = 30
stale_after_secs = 120
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:5000");
        assert_eq!(config.server.ws_path, "/signal");
        assert_eq!(config.server.allowed_origins, vec!["https://app.example.com"]);
        assert!(!config.server.metrics_enabled);
        assert_eq!(config.session.liveness_interval(), Duration::from_secs(15));
        assert!(config.reaper.enabled);
        assert_eq!(config.reaper.interval(), Duration::from_secs(30));
        assert_eq!(config.reaper.stale_after(), Duration::from_secs(120));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.reaper.stale_after_secs, 300);
    }

    #[test]
    fn config_missing_fields_use_defaults() {
        let toml = r#"
[server]
bind_address = "127.0.0.1:9000"
[reaper]
enabled = true
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.ws_path, "/ws");
        assert!(config.server.allowed_origins.is_empty());
        assert_eq!(config.session.liveness_interval_secs, 60);
        assert_eq!(config.reaper.interval_secs, 60);
    }

    #[test]
    fn zero_intervals_are_clamped() {
        let session = SessionConfig {
            liveness_interval_secs: 0,
        };
        assert_eq!(session.liveness_interval(), Duration::from_secs(1));
    }

    #[test]
    fn origin_allow_list() {
        let mut server = ServerConfig::default();
        assert!(server.origin_allowed(None));
        assert!(server.origin_allowed(Some("https://anything.example")));

        server.allowed_origins = vec!["https://trusted.example".into()];
        assert!(server.origin_allowed(Some("https://trusted.example")));
        assert!(!server.origin_allowed(Some("https://evil.example")));
        assert!(!server.origin_allowed(None));
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nliveness_interval_secs = 5").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.session.liveness_interval_secs, 5);
    }

    #[test]
    fn from_file_reports_missing_file() {
        let err = Config::from_file(std::path::Path::new("/nonexistent/relay.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn reaper_must_outlast_liveness_interval() {
        let mut config = Config::default();
        config.session.liveness_interval_secs = 120;
        config.reaper.enabled = true;
        config.reaper.stale_after_secs = 60;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.reaper.stale_after_secs = 120;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.reaper.stale_after_secs = 121;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn disabled_reaper_skips_interval_check() {
        let mut config = Config::default();
        config.session.liveness_interval_secs = 120;
        config.reaper.stale_after_secs = 60;
        assert!(config.validate().is_ok());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn from_file_rejects_reaper_faster_than_liveness() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[session]\nliveness_interval_secs = 120\n[reaper]\nenabled = true\nstale_after_secs = 60"
        )
        .unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn from_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session\nliveness_interval_secs = ").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
