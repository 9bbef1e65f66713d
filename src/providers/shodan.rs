//! Shodan source adapter.

use super::{SourceAdapter, SourceError, SourceReport};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Shodan host lookup response.
#[derive(Debug, Deserialize)]
struct ShodanResponse {
    #[serde(default)]
    ports: Vec<u16>,
}

/// Shodan source adapter.
pub struct ShodanAdapter {
    config: ProviderConfig,
    client: Client,
}

impl ShodanAdapter {
    /// Create a new Shodan adapter.
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Normalize a raw response body into the fixed report shape.
    fn normalize(body: &str) -> Result<SourceReport, SourceError> {
        let response: ShodanResponse = serde_json::from_str(body).map_err(|e| {
            SourceError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        let mut ports = response.ports;
        ports.sort_unstable();
        ports.dedup();

        Ok(SourceReport::ok().with_open_ports(ports))
    }
}

#[async_trait]
impl SourceAdapter for ShodanAdapter {
    fn name(&self) -> &'static str {
        "shodan"
    }

    async fn fetch(&self, ip: &str) -> Result<SourceReport, SourceError> {
        let url = format!(
            "https://api.shodan.io/shodan/host/{}?key={}",
            ip, self.config.api_key
        );

        debug!(ip = %ip, "Querying Shodan");

        let response = self.client.get(&url).send().await?;

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

        debug!(
            ip = %ip,
            open_ports = report.open_ports.len(),
            "Shodan lookup complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_full_response() {
        let body = r#"{
            "ip_str": "8.8.8.8",
            "ports": [443, 80, 53],
            "org": "Google LLC"
        }"#;

        let report = ShodanAdapter::normalize(body).unwrap();
        assert!(report.succeeded);
        assert_eq!(report.open_ports, vec![53, 80, 443]);
        assert_eq!(report.abuse_score, 0);
    }

    #[test]
    fn test_normalize_deduplicates_ports() {
        let body = r#"{"ports": [80, 80, 443]}"#;
        let report = ShodanAdapter::normalize(body).unwrap();
        assert_eq!(report.open_ports, vec![80, 443]);
    }

    #[test]
    fn test_normalize_missing_ports_defaults_to_empty() {
        let body = r#"{"ip_str": "8.8.8.8"}"#;
        let report = ShodanAdapter::normalize(body).unwrap();
        assert!(report.open_ports.is_empty());
        assert!(report.succeeded);
    }

    #[test]
    fn test_normalize_malformed_body_is_invalid_response() {
        let err = ShodanAdapter::normalize("no data").unwrap_err();
        assert!(matches!(err, SourceError::InvalidResponse(_)));
    }

    #[test]
    fn test_adapter_name() {
        let adapter = ShodanAdapter::new(ProviderConfig::default());
        assert_eq!(adapter.name(), "shodan");
    }
}
