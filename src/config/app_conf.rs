use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Interface the server binds to
    pub host: String,
    /// TCP port the server listens on
    pub port: u16,
}

impl AppConfig {
    /// Load server configuration from environment variables
    ///
    /// Expected environment variables:
    /// - SERVER_HOST: bind address (defaults to 127.0.0.1)
    /// - SERVER_PORT: listen port (defaults to 8080)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading server configuration from environment variables");

        let host = env::var("SERVER_HOST").unwrap_or_else(|_| {
            warn!("SERVER_HOST not set, defaulting to 127.0.0.1");
            "127.0.0.1".to_string()
        });
        debug!("Server host: {}", host);

        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| {
                warn!("SERVER_PORT not set, defaulting to 8080");
                "8080".to_string()
            })
            .parse::<u16>()
            .map_err(|_| {
                error!("Invalid SERVER_PORT value");
                ConfigError::InvalidValue("Invalid SERVER_PORT value".to_string())
            })?;
        debug!("Server port: {}", port);

        let config = AppConfig { host, port };

        config.validate()?;
        info!("Server configuration loaded successfully");
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            error!("Server host is empty");
            return Err(ConfigError::ValidationError("host cannot be empty".to_string()));
        }
        if self.host.parse::<std::net::IpAddr>().is_err() {
            error!("Server host is not a valid IP address: {}", self.host);
            return Err(ConfigError::ValidationError(
                "host must be a valid IP address".to_string(),
            ));
        }
        if self.port == 0 {
            error!("Server port is 0");
            return Err(ConfigError::ValidationError("port cannot be 0".to_string()));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig { host: "127.0.0.1".to_string(), port: 8080 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_hostname() {
        let config = AppConfig { host: "localhost".to_string(), port: 8080 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_port_zero() {
        let config = AppConfig { host: "0.0.0.0".to_string(), port: 0 };
        assert!(config.validate().is_err());
    }
}
