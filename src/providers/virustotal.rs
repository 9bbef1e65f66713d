//! VirusTotal source adapter.

use super::{SourceAdapter, SourceError, SourceReport};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// VirusTotal API response.
#[derive(Debug, Deserialize)]
struct VtResponse {
    data: VtData,
}

#[derive(Debug, Deserialize)]
struct VtData {
    #[serde(default)]
    attributes: VtAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct VtAttributes {
    #[serde(default)]
    last_analysis_stats: VtAnalysisStats,
}

/// Per-engine verdict tallies for the address.
#[derive(Debug, Default, Deserialize)]
struct VtAnalysisStats {
    #[serde(default)]
    malicious: u32,

    #[serde(default)]
    suspicious: u32,
}

/// VirusTotal source adapter.
pub struct VirusTotalAdapter {
    config: ProviderConfig,
    client: Client,
}

impl VirusTotalAdapter {
    /// Create a new VirusTotal adapter.
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Normalize a raw response body into the fixed report shape.
    fn normalize(body: &str) -> Result<SourceReport, SourceError> {
        let response: VtResponse = serde_json::from_str(body).map_err(|e| {
            SourceError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        let stats = response.data.attributes.last_analysis_stats;
        Ok(SourceReport::ok().with_verdict_counts(stats.malicious, stats.suspicious))
    }
}

#[async_trait]
impl SourceAdapter for VirusTotalAdapter {
    fn name(&self) -> &'static str {
        "virustotal"
    }

    async fn fetch(&self, ip: &str) -> Result<SourceReport, SourceError> {
        let url = format!("https://www.virustotal.com/api/v3/ip_addresses/{}", ip);

        debug!(ip = %ip, "Querying VirusTotal");

        let response = self
            .client
            .get(&url)
            .header("x-apikey", &self.config.api_key)
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

        debug!(
            ip = %ip,
            malicious = report.malicious,
            suspicious = report.suspicious,
            "VirusTotal lookup complete"
        );

        Ok(report)
    }
}
