use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

/// Payment gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    /// Secret API key (sk_...)
    pub secret_key: String,
    /// API base URL; override for test doubles
    pub api_base: String,
    /// ISO currency code used for deposits
    pub currency: String,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl StripeConfig {
    /// Load payment gateway configuration from environment variables
    ///
    /// Expected environment variables:
    /// - STRIPE_SECRET_KEY: API secret key (required)
    /// - STRIPE_API_BASE: API base URL (defaults to https://api.stripe.com)
    /// - STRIPE_CURRENCY: deposit currency (defaults to usd)
    /// - STRIPE_REQUEST_TIMEOUT: request timeout in seconds (defaults to 15)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading payment gateway configuration from environment variables");

        let secret_key = env::var("STRIPE_SECRET_KEY").map_err(|_| {
            error!("STRIPE_SECRET_KEY environment variable not found");
            ConfigError::EnvVarNotFound("STRIPE_SECRET_KEY".to_string())
        })?;
        debug!("Stripe secret key: [REDACTED]");

        let api_base = env::var("STRIPE_API_BASE").unwrap_or_else(|_| {
            warn!("STRIPE_API_BASE not set, defaulting to https://api.stripe.com");
            "https://api.stripe.com".to_string()
        });
        debug!("Stripe API base: {}", api_base);

        let currency = env::var("STRIPE_CURRENCY").unwrap_or_else(|_| {
            warn!("STRIPE_CURRENCY not set, defaulting to usd");
            "usd".to_string()
        });
        debug!("Deposit currency: {}", currency);

        let request_timeout_secs = env::var("STRIPE_REQUEST_TIMEOUT")
            .unwrap_or_else(|_| {
                warn!("STRIPE_REQUEST_TIMEOUT not set, defaulting to 15 seconds");
                "15".to_string()
            })
            .parse::<u64>()
            .map_err(|_| {
                error!("Invalid STRIPE_REQUEST_TIMEOUT value");
                ConfigError::InvalidValue("Invalid STRIPE_REQUEST_TIMEOUT value".to_string())
            })?;
        debug!("Request timeout: {} seconds", request_timeout_secs);

        let config = StripeConfig { secret_key, api_base, currency, request_timeout_secs };

        config.validate()?;
        info!("Payment gateway configuration loaded successfully");
        Ok(config)
    }

    /// Create StripeConfig for testing
    pub fn from_test_env() -> Self {
        StripeConfig {
            secret_key: "sk_test_123".to_string(),
            api_base: "http://localhost:12111".to_string(),
            currency: "usd".to_string(),
            request_timeout_secs: 5,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_key.is_empty() {
            error!("Stripe secret key is empty");
            return Err(ConfigError::ValidationError("secret key cannot be empty".to_string()));
        }
        if self.api_base.is_empty() {
            error!("Stripe API base is empty");
            return Err(ConfigError::ValidationError("API base cannot be empty".to_string()));
        }
        if self.currency.len() != 3 {
            error!("Invalid currency code: {}", self.currency);
            return Err(ConfigError::ValidationError(
                "currency must be a 3-letter ISO code".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            error!("Request timeout is 0");
            return Err(ConfigError::ValidationError(
                "request timeout cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for StripeConfig {
    fn default() -> Self {
        StripeConfig {
            secret_key: "".to_string(),
            api_base: "https://api.stripe.com".to_string(),
            currency: "usd".to_string(),
            request_timeout_secs: 15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_config_is_valid() {
        let config = StripeConfig::from_test_env();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_secret_key() {
        let mut config = StripeConfig::from_test_env();
        config.secret_key = "".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_currency() {
        let mut config = StripeConfig::from_test_env();
        config.currency = "dollars".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = StripeConfig::from_test_env();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
