/// Daemon configuration
use crate::errors::{ServerError, ServerResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use swank_core::Encoding;

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub bind: String,
    /// TCP port; 0 lets the kernel pick one
    pub port: u16,
    /// File the chosen port is advertised in, if any
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub port_file: Option<PathBuf>,
    /// Payload encoding: `utf-8`, `latin-1`, or the SLIME coding-system names
    pub encoding: String,
    /// Per-connection read timeout in seconds; 0 disables it
    pub read_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1".to_string(),
            port: 4005,
            port_file: None,
            encoding: "utf-8".to_string(),
            read_timeout_secs: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        DaemonConfig {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> ServerResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| ServerError::Config(format!("failed to parse config: {e}")))
    }

    /// Load from a TOML file or fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> ServerResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ServerResult<()> {
        if self.server.bind.parse::<std::net::IpAddr>().is_err() {
            return Err(ServerError::Config(format!(
                "bind address {:?} is not an IP address",
                self.server.bind
            )));
        }

        if Encoding::from_name(&self.server.encoding).is_none() {
            return Err(ServerError::Config(format!(
                "unknown encoding {:?}",
                self.server.encoding
            )));
        }

        Ok(())
    }

    /// The wire encoding the configuration names. Call after `validate`.
    pub fn encoding(&self) -> Encoding {
        Encoding::from_name(&self.server.encoding).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DaemonConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.encoding(), Encoding::Utf8);
    }

    #[test]
    fn test_config_validation_rejects_bad_bind() {
        let mut config = DaemonConfig::default();
        config.server.bind = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_unknown_encoding() {
        let mut config = DaemonConfig::default();
        config.server.encoding = "ebcdic".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_slime_coding_system_names_are_accepted() {
        let mut config = DaemonConfig::default();
        config.server.encoding = "iso-latin-1-unix".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.encoding(), Encoding::Latin1);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = DaemonConfig::default();
        let text = toml::to_string(&config).unwrap();
        let reloaded: DaemonConfig = toml::from_str(&text).unwrap();
        assert_eq!(reloaded.server.port, config.server.port);
        assert_eq!(reloaded.server.encoding, config.server.encoding);
    }
}
