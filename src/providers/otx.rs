//! AlienVault OTX source adapter.

use super::{SourceAdapter, SourceError, SourceReport};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// OTX API response for the `general` section of an IPv4 indicator.
#[derive(Debug, Deserialize)]
struct OtxResponse {
    #[serde(default)]
    pulse_info: OtxPulseInfo,
}

/// Community threat pulses referencing the address.
#[derive(Debug, Default, Deserialize)]
struct OtxPulseInfo {
    #[serde(default)]
    count: u32,
}

/// AlienVault OTX source adapter.
pub struct OtxAdapter {
    config: ProviderConfig,
    client: Client,
}

impl OtxAdapter {
    /// Create a new OTX adapter.
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Normalize a raw response body into the fixed report shape.
    fn normalize(body: &str) -> Result<SourceReport, SourceError> {
        let response: OtxResponse = serde_json::from_str(body).map_err(|e| {
            SourceError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        Ok(SourceReport::ok().with_pulses(response.pulse_info.count))
    }
}

#[async_trait]
impl SourceAdapter for OtxAdapter {
    fn name(&self) -> &'static str {
        "otx"
    }

    async fn fetch(&self, ip: &str) -> Result<SourceReport, SourceError> {
        let url = format!(
            "https://otx.alienvault.com/api/v1/indicators/IPv4/{}/general",
            ip
        );

        debug!(ip = %ip, "Querying OTX");

        let response = self
            .client
            .get(&url)
            .header("X-OTX-API-KEY", &self.config.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::InvalidResponse(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        let report = Self::normalize(&body)?;

        debug!(ip = %ip, pulses = report.pulses, "OTX lookup complete");

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_full_response() {
        let body = r#"{
            "indicator": "8.8.8.8",
            "reputation": 0,
            "pulse_info": {
                "count": 4,
                "pulses": [{"name": "scanner sweep"}]
            }
        }"#;

        let report = OtxAdapter::normalize(body).unwrap();
        assert!(report.succeeded);
        assert_eq!(report.pulses, 4);
        assert_eq!(report.malicious, 0);
    }

    #[test]
    fn test_normalize_missing_pulse_info_defaults_to_zero() {
        let body = r#"{"indicator": "8.8.8.8"}"#;
        let report = OtxAdapter::normalize(body).unwrap();
        assert_eq!(report.pulses, 0);
        assert!(report.succeeded);
    }

    #[test]
    fn test_normalize_malformed_body_is_invalid_response() {
        let err = OtxAdapter::normalize("[1, 2").unwrap_err();
        assert!(matches!(err, SourceError::InvalidResponse(_)));
    }

    #[test]
    fn test_adapter_name() {
        let adapter = OtxAdapter::new(ProviderConfig::default());
        assert_eq!(adapter.name(), "otx");
    }
}
