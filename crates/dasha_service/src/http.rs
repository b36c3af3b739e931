//! HTTP period source backed by `reqwest`.

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::request::DashaRequest;
use crate::source::PeriodSource;

/// Longest error body kept in [`ServiceError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// POSTs each request as JSON to the configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpPeriodSource {
    config: ServiceConfig,
    http: Client,
}

impl HttpPeriodSource {
    pub fn new(config: ServiceConfig) -> ServiceResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ServiceError::Config(e.to_string()))?;

        Ok(Self { config, http })
    }

    pub fn from_env() -> ServiceResult<Self> {
        Self::new(ServiceConfig::from_env())
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn auth_header(&self) -> Option<String> {
        self.config
            .api_key
            .as_ref()
            .map(|key| format!("Bearer {key}"))
    }

    fn classify(&self, err: reqwest::Error) -> ServiceError {
        if err.is_timeout() {
            ServiceError::Timeout(self.config.timeout())
        } else {
            ServiceError::Http(err)
        }
    }
}

impl PeriodSource for HttpPeriodSource {
    #[instrument(skip(self), fields(level = %request.level, system = %request.system))]
    async fn fetch(&self, request: &DashaRequest) -> Result<Value, ServiceError> {
        let mut builder = self.http.post(&self.config.endpoint).json(request);
        if let Some(auth) = self.auth_header() {
            builder = builder.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            let body: String = text.chars().take(MAX_ERROR_BODY).collect();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(bytes = body.len(), "dasha response received");
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_config() {
        let err = HttpPeriodSource::new(ServiceConfig::new("")).unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }

    #[test]
    fn bearer_header_only_with_key() {
        let plain = HttpPeriodSource::new(ServiceConfig::new("http://localhost:9")).unwrap();
        assert_eq!(plain.auth_header(), None);
        let keyed = HttpPeriodSource::new(
            ServiceConfig::new("http://localhost:9").with_api_key("abc"),
        )
        .unwrap();
        assert_eq!(keyed.auth_header().as_deref(), Some("Bearer abc"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_fetch_failure() {
        let source = HttpPeriodSource::new(
            ServiceConfig::new("http://127.0.0.1:9/api/dasha").with_timeout_secs(2),
        )
        .unwrap();
        let req = DashaRequest::root("s", dasha_base::dasha::DashaSystem::Vimshottari);
        let err = source.fetch(&req).await.unwrap_err();
        assert!(err.is_transient(), "{err}");
    }
}
