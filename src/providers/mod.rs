//! Threat intelligence source adapters.

pub mod abuseipdb;
pub mod otx;
pub mod shodan;
pub mod virustotal;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Normalized record produced by one provider lookup.
///
/// Every provider fills only the fields it can supply; the rest stay at
/// their zero defaults, resolved here at the normalization boundary rather
/// than inside the scoring arithmetic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    /// Engines flagging the IP as malicious.
    pub malicious: u32,

    /// Engines flagging the IP as suspicious.
    pub suspicious: u32,

    /// Direct abuse confidence signal (0-100).
    pub abuse_score: u32,

    /// Threat pulse / report count.
    pub pulses: u32,

    /// Open network ports observed on the host.
    pub open_ports: Vec<u16>,

    /// Whether the provider call itself succeeded.
    pub succeeded: bool,
}

impl SourceReport {
    /// Zero record substituted when a provider call fails.
    pub fn fallback() -> Self {
        Self::default()
    }

    /// Empty record for a successful call; fill in fields with the builders.
    pub fn ok() -> Self {
        Self {
            succeeded: true,
            ..Self::default()
        }
    }

    /// Set the malicious/suspicious verdict counts.
    pub fn with_verdict_counts(mut self, malicious: u32, suspicious: u32) -> Self {
        self.malicious = malicious;
        self.suspicious = suspicious;
        self
    }

    /// Set the direct abuse confidence signal.
    pub fn with_abuse_score(mut self, abuse_score: u32) -> Self {
        self.abuse_score = abuse_score;
        self
    }

    /// Set the pulse count.
    pub fn with_pulses(mut self, pulses: u32) -> Self {
        self.pulses = pulses;
        self
    }

    /// Set the observed open ports.
    pub fn with_open_ports(mut self, open_ports: Vec<u16>) -> Self {
        self.open_ports = open_ports;
        self
    }
}

/// Error from a source adapter.
#[derive(Debug)]
pub enum SourceError {
    /// HTTP request failed.
    Http(reqwest::Error),
    /// Timeout.
    Timeout,
    /// Rate limited.
    RateLimited,
    /// Invalid response.
    InvalidResponse(String),
    /// Other error.
    Other(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Http(e) => write!(f, "HTTP error: {}", e),
            SourceError::Timeout => write!(f, "Request timed out"),
            SourceError::RateLimited => write!(f, "Rate limited"),
            SourceError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            SourceError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else {
            SourceError::Http(e)
        }
    }
}

/// Trait for threat intelligence source adapters.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Provider name, used as the key in the aggregate `sources` map.
    fn name(&self) -> &'static str;

    /// Perform the single outbound lookup for `ip` and normalize the
    /// provider's response. At most one attempt per query; no retries.
    async fn fetch(&self, ip: &str) -> Result<SourceReport, SourceError>;
}

/// Run one adapter lookup behind its fault-isolation boundary.
///
/// Any transport error, malformed payload, or elapsed `timeout` becomes
/// the zero fallback record; errors never cross this boundary, so one
/// provider's outage cannot fail the query or contaminate siblings.
pub async fn lookup(adapter: &dyn SourceAdapter, ip: &str, timeout: Duration) -> SourceReport {
    match tokio::time::timeout(timeout, adapter.fetch(ip)).await {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => {
            warn!(
                provider = adapter.name(),
                ip = %ip,
                error = %e,
                "Provider lookup failed"
            );
            SourceReport::fallback()
        }
        Err(_) => {
            warn!(provider = adapter.name(), ip = %ip, "Provider lookup timed out");
            SourceReport::fallback()
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted adapter for aggregator and service tests.
    pub(crate) struct MockAdapter {
        name: &'static str,
        report: Mutex<Option<SourceReport>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl MockAdapter {
        pub(crate) fn returning(name: &'static str, report: SourceReport) -> Self {
            Self {
                name,
                report: Mutex::new(Some(report)),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing(name: &'static str) -> Self {
            Self {
                name,
                report: Mutex::new(None),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Swap the scripted report between calls.
        pub(crate) fn set_report(&self, report: SourceReport) {
            *self.report.lock().unwrap() = Some(report);
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SourceAdapter for MockAdapter {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, _ip: &str) -> Result<SourceReport, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let scripted = self.report.lock().unwrap().clone();
            match scripted {
                Some(report) => Ok(report),
                None => Err(SourceError::Other("scripted failure".to_string())),
            }
        }
    }
}
