//! # NOWPayments Configuration
//!
//! Configuration management for the NOWPayments integration.
//! All secrets are loaded from environment variables.

use course_core::MarketError;
use std::env;

/// NOWPayments API configuration
#[derive(Debug, Clone)]
pub struct NowPaymentsConfig {
    /// API key sent in the `x-api-key` header
    pub api_key: String,

    /// IPN secret used to verify webhook signatures.
    /// Verification is mandatory; an unverifiable event is rejected.
    pub ipn_secret: String,

    /// API base URL (overridable for testing/mocking)
    pub api_base_url: String,
}

impl NowPaymentsConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `NOWPAYMENTS_API_KEY`
    /// - `NOWPAYMENTS_IPN_SECRET`
    pub fn from_env() -> Result<Self, MarketError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_key = env::var("NOWPAYMENTS_API_KEY").map_err(|_| {
            MarketError::Configuration("NOWPAYMENTS_API_KEY not set".to_string())
        })?;

        let ipn_secret = env::var("NOWPAYMENTS_IPN_SECRET").map_err(|_| {
            MarketError::Configuration("NOWPAYMENTS_IPN_SECRET not set".to_string())
        })?;

        if api_key.trim().is_empty() {
            return Err(MarketError::Configuration(
                "NOWPAYMENTS_API_KEY must not be empty".to_string(),
            ));
        }

        if ipn_secret.trim().is_empty() {
            return Err(MarketError::Configuration(
                "NOWPAYMENTS_IPN_SECRET must not be empty".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            ipn_secret,
            api_base_url: "https://api.nowpayments.io".to_string(),
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(api_key: impl Into<String>, ipn_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ipn_secret: ipn_secret.into(),
            api_base_url: "https://api.nowpayments.io".to_string(),
        }
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Invoice creation endpoint
    pub fn invoice_url(&self) -> String {
        format!("{}/v1/invoice", self.api_base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_url() {
        let config = NowPaymentsConfig::new("key", "secret");
        assert_eq!(config.invoice_url(), "https://api.nowpayments.io/v1/invoice");

        let config = config.with_api_base_url("http://localhost:9999");
        assert_eq!(config.invoice_url(), "http://localhost:9999/v1/invoice");
    }

    #[test]
    fn test_from_env_missing_key() {
        env::remove_var("NOWPAYMENTS_API_KEY");

        let result = NowPaymentsConfig::from_env();
        assert!(result.is_err());
    }
}
