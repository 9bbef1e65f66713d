//! AbuseIPDB source adapter.

use super::{SourceAdapter, SourceError, SourceReport};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Only consider reports from the last N days.
const MAX_AGE_DAYS: u32 = 90;

/// AbuseIPDB API response.
#[derive(Debug, Deserialize)]
struct AbuseIpDbResponse {
    data: AbuseIpDbData,
}

#[derive(Debug, Default, Deserialize)]
#[allow(dead_code)] // Fields parsed from API response for future use
struct AbuseIpDbData {
    /// Abuse confidence score (0-100).
    #[serde(rename = "abuseConfidenceScore", default)]
    abuse_confidence_score: u32,

    /// Total number of reports.
    #[serde(rename = "totalReports", default)]
    total_reports: u32,
}

/// AbuseIPDB source adapter.
pub struct AbuseIpDbAdapter {
    config: ProviderConfig,
    client: Client,
}

impl AbuseIpDbAdapter {
    /// Create a new AbuseIPDB adapter.
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Normalize a raw response body into the fixed report shape.
    fn normalize(body: &str) -> Result<SourceReport, SourceError> {
        let response: AbuseIpDbResponse = serde_json::from_str(body).map_err(|e| {
            SourceError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        Ok(SourceReport::ok().with_abuse_score(response.data.abuse_confidence_score))
    }
}

#[async_trait]
impl SourceAdapter for AbuseIpDbAdapter {
    fn name(&self) -> &'static str {
        "abuseipdb"
    }

    async fn fetch(&self, ip: &str) -> Result<SourceReport, SourceError> {
        let url = format!(
            "https://api.abuseipdb.com/api/v2/check?ipAddress={}&maxAgeInDays={}",
            ip, MAX_AGE_DAYS
        );

        debug!(ip = %ip, "Querying AbuseIPDB");

        let response = self
            .client
            .get(&url)
            .header("Key", &self.config.api_key)
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
            score = report.abuse_score,
            "AbuseIPDB lookup complete"
        );

        Ok(report)
    }
}
