//! Concurrent fan-out over all source adapters and result scoring.

use crate::providers::{lookup, SourceAdapter, SourceReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::debug;

/// Score at or above which an IP is classified High Risk.
pub const HIGH_RISK_SCORE: u8 = 70;

/// Score at or above which an IP is classified Medium Risk.
pub const MEDIUM_RISK_SCORE: u8 = 30;

/// Points awarded per returned source record toward the confidence score.
const CONFIDENCE_PER_SOURCE: i64 = 25;

/// Risk verdict for an IP address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "High Risk")]
    High,
}

impl Verdict {
    /// Classify a clamped score; High band is checked first and every
    /// band is inclusive on its lower bound.
    pub fn from_score(score: u8) -> Self {
        if score >= HIGH_RISK_SCORE {
            Verdict::High
        } else if score >= MEDIUM_RISK_SCORE {
            Verdict::Medium
        } else {
            Verdict::Low
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Low => "Low Risk",
            Verdict::Medium => "Medium Risk",
            Verdict::High => "High Risk",
        };
        f.write_str(s)
    }
}

/// Combined, scored answer for one IP query.
///
/// `sources` holds exactly one normalized record per configured adapter,
/// keyed by provider name in stable order; adapters that failed are
/// present with their zero fallback record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub ip: String,
    pub threat_level: Verdict,
    pub threat_score: u8,
    pub confidence: u8,
    pub sources: BTreeMap<String, SourceReport>,
}

/// The fan-out itself could not run to completion.
///
/// Individual provider failures never produce this; they resolve to
/// fallback records inside the adapter boundary.
#[derive(Debug)]
pub struct AggregateError(tokio::task::JoinError);

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fan-out task failed: {}", self.0)
    }
}

impl std::error::Error for AggregateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Runs all configured source adapters concurrently for one query and
/// combines whatever they returned into a scored verdict.
pub struct Aggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    adapter_timeout: Duration,
}

impl Aggregator {
    /// Create an aggregator over the given adapters. `adapter_timeout` is
    /// the hard upper bound on any single lookup, applied on top of each
    /// adapter's own HTTP timeout.
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, adapter_timeout: Duration) -> Self {
        Self {
            adapters,
            adapter_timeout,
        }
    }

    /// Number of configured adapters.
    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Query every adapter for `ip` in parallel, wait for all of them
    /// (join-all, never first-wins), then score the combined reports.
    ///
    /// A slow or failing provider delays the result by at most the
    /// adapter timeout and never aborts its siblings.
    pub async fn run(&self, ip: &str) -> Result<AggregateResult, AggregateError> {
        let mut tasks = JoinSet::new();

        for adapter in &self.adapters {
            let adapter = Arc::clone(adapter);
            let ip = ip.to_string();
            let timeout = self.adapter_timeout;
            tasks.spawn(async move {
                let report = lookup(adapter.as_ref(), &ip, timeout).await;
                (adapter.name(), report)
            });
        }

        let mut sources = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (name, report) = joined.map_err(AggregateError)?;
            sources.insert(name.to_string(), report);
        }

        let threat_score = score(sources.values());
        let threat_level = Verdict::from_score(threat_score);
        let confidence = clamp_100(sources.len() as i64 * CONFIDENCE_PER_SOURCE);

        debug!(
            ip = %ip,
            score = threat_score,
            verdict = %threat_level,
            confidence = confidence,
            "Aggregation complete"
        );

        Ok(AggregateResult {
            ip: ip.to_string(),
            threat_level,
            threat_score,
            confidence,
            sources,
        })
    }
}

/// Weighted contribution of one normalized report. Additive and
/// order-independent; the final clamp is the only nonlinearity.
fn contribution(report: &SourceReport) -> i64 {
    i64::from(report.malicious) * 20
        + i64::from(report.suspicious) * 10
        + i64::from(report.abuse_score)
        + i64::from(report.pulses) * 5
        + report.open_ports.len() as i64 * 2
}

/// Sum all contributions and clamp to the score range.
fn score<'a>(reports: impl Iterator<Item = &'a SourceReport>) -> u8 {
    clamp_100(reports.map(contribution).sum())
}

fn clamp_100(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}
