//! Calculation-service configuration.
//!
//! Read from the environment:
//! - `DASHA_SERVICE_URL`: dasha endpoint (default: "http://localhost:8080/api/dasha")
//! - `DASHA_SERVICE_TIMEOUT_SECS`: per-request timeout (default: 30)
//! - `DASHA_SERVICE_API_KEY`: optional bearer token

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/api/dasha";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where and how to reach the calculation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// URL the dasha request is POSTed to.
    pub endpoint: String,
    /// Upper bound for one request, connect to last byte.
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: std::env::var("DASHA_SERVICE_URL")
                .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string()),
            timeout_secs: std::env::var("DASHA_SERVICE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            api_key: std::env::var("DASHA_SERVICE_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_key: None,
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> ServiceResult<()> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ServiceError::Config("endpoint cannot be empty".to_string()));
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ServiceError::Config(format!(
                "endpoint must be an http(s) URL, got {endpoint:?}"
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ServiceError::Config("timeout must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_bad_values() {
        assert!(ServiceConfig::new("https://astro.example/api/dasha").validate().is_ok());
        assert!(ServiceConfig::new("").validate().is_err());
        assert!(ServiceConfig::new("ftp://astro.example").validate().is_err());
        assert!(
            ServiceConfig::new("http://localhost:8080")
                .with_timeout_secs(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn builder_helpers() {
        let cfg = ServiceConfig::new("http://localhost:8080")
            .with_timeout_secs(7)
            .with_api_key("secret");
        assert_eq!(cfg.timeout(), Duration::from_secs(7));
        assert_eq!(cfg.api_key.as_deref(), Some("secret"));
    }
}
