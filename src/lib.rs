//! IP threat intelligence aggregator.
//!
//! Answers "is this IP address dangerous?" by querying several independent
//! threat intelligence providers concurrently, normalizing their
//! heterogeneous responses into a common shape, combining them into a
//! single risk score and verdict, and caching the result for a bounded
//! time window.
//!
//! # Features
//!
//! - **Concurrent Fan-Out** - All providers are queried in parallel; the
//!   aggregator waits for every one of them (join-all, never first-wins)
//! - **Fault Isolation** - A provider outage resolves to a zero fallback
//!   record and never fails the query or contaminates other providers
//! - **Weighted Scoring** - Additive per-source contributions, clamped to
//!   0-100, banded into Low/Medium/High risk verdicts
//! - **Result Caching** - Aggregate results cached per IP with a uniform
//!   configurable TTL
//!
//! # Example Configuration
//!
//! ```yaml
//! settings:
//!   adapter_timeout_ms: 6000
//!
//! cache:
//!   ttl_seconds: 3600
//!   max_entries: 10000
//!
//! virustotal:
//!   enabled: true
//!   api_key: "${VIRUSTOTAL_API_KEY}"
//!
//! abuseipdb:
//!   enabled: true
//!   api_key: "${ABUSEIPDB_API_KEY}"
//! ```

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod providers;
pub mod service;

pub use aggregator::{AggregateResult, Aggregator, Verdict};
pub use cache::ResultCache;
pub use config::Config;
pub use service::{QueryError, QueryService};
