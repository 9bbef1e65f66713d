//! Query orchestration: cache lookup, aggregation, cache write.

use crate::aggregator::{AggregateError, AggregateResult, Aggregator};
use crate::cache::ResultCache;
use crate::config::Config;
use crate::providers::abuseipdb::AbuseIpDbAdapter;
use crate::providers::otx::OtxAdapter;
use crate::providers::shodan::ShodanAdapter;
use crate::providers::virustotal::VirusTotalAdapter;
use crate::providers::SourceAdapter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Client-visible failure modes of a query.
///
/// Every other condition, including every individual provider failure,
/// resolves to a successful result with degraded data.
#[derive(Debug)]
pub enum QueryError {
    /// Missing or empty IP; a client input error, not a server fault.
    EmptyIp,
    /// The fan-out itself could not run; a rare server fault.
    Scheduling(AggregateError),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::EmptyIp => write!(f, "Missing IP address"),
            QueryError::Scheduling(_) => write!(f, "Internal aggregation failure"),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::EmptyIp => None,
            QueryError::Scheduling(e) => Some(e),
        }
    }
}

/// Answers "is this IP dangerous?" by consulting the cache and, on a
/// miss, fanning out to every configured provider.
pub struct QueryService {
    aggregator: Aggregator,
    cache: Arc<ResultCache>,
}

impl QueryService {
    /// Create a service from pre-built parts.
    pub fn new(aggregator: Aggregator, cache: Arc<ResultCache>) -> Self {
        Self { aggregator, cache }
    }

    /// Build the full service from configuration: one adapter per enabled
    /// provider, the shared result cache, and the fan-out timeout. All
    /// credentials and handles come from `config`; nothing is ambient.
    pub fn from_config(config: &Config) -> Self {
        let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

        if config.virustotal.enabled {
            adapters.push(Arc::new(VirusTotalAdapter::new(config.virustotal.clone())));
            info!("VirusTotal adapter enabled");
        }

        if config.abuseipdb.enabled {
            adapters.push(Arc::new(AbuseIpDbAdapter::new(config.abuseipdb.clone())));
            info!("AbuseIPDB adapter enabled");
        }

        if config.otx.enabled {
            adapters.push(Arc::new(OtxAdapter::new(config.otx.clone())));
            info!("OTX adapter enabled");
        }

        if config.shodan.enabled {
            adapters.push(Arc::new(ShodanAdapter::new(config.shodan.clone())));
            info!("Shodan adapter enabled");
        }

        info!(adapters = adapters.len(), "Query service initialized");

        let aggregator = Aggregator::new(
            adapters,
            Duration::from_millis(config.settings.adapter_timeout_ms),
        );
        let cache = Arc::new(ResultCache::new(
            config.cache.ttl_seconds,
            config.cache.max_entries,
        ));

        Self::new(aggregator, cache)
    }

    /// Handle one query: validate input presence, consult the cache,
    /// aggregate on a miss, then cache the fresh result.
    ///
    /// A cache hit is returned unchanged: no re-scoring, no TTL refresh.
    /// The sequence is not transactional; concurrent duplicate queries
    /// for the same IP may both recompute and the last `put` wins.
    pub async fn handle(&self, ip: &str) -> Result<AggregateResult, QueryError> {
        let ip = ip.trim();
        if ip.is_empty() {
            return Err(QueryError::EmptyIp);
        }

        if let Some(result) = self.cache.get(ip) {
            debug!(ip = %ip, "Cache hit");
            return Ok(result);
        }

        debug!(ip = %ip, "Cache miss, aggregating");
        let result = self
            .aggregator
            .run(ip)
            .await
            .map_err(QueryError::Scheduling)?;

        self.cache.put(ip, result.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockAdapter;
    use crate::providers::SourceReport;
    use crate::aggregator::Verdict;

    fn service_with(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        ttl_seconds: u64,
    ) -> (QueryService, Arc<ResultCache>) {
        let cache = Arc::new(ResultCache::new(ttl_seconds, 100));
        let aggregator = Aggregator::new(adapters, Duration::from_millis(200));
        (QueryService::new(aggregator, Arc::clone(&cache)), cache)
    }

    #[tokio::test]
    async fn test_empty_ip_is_client_error_with_no_adapter_calls() {
        let adapter = Arc::new(MockAdapter::returning(
            "abuseipdb",
            SourceReport::ok().with_abuse_score(50),
        ));
        let (service, _) = service_with(vec![adapter.clone()], 3600);

        assert!(matches!(service.handle("").await, Err(QueryError::EmptyIp)));
        assert!(matches!(
            service.handle("   ").await,
            Err(QueryError::EmptyIp)
        ));
        assert_eq!(adapter.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_returns_identical_result_without_recompute() {
        let adapter = Arc::new(MockAdapter::returning(
            "abuseipdb",
            SourceReport::ok().with_abuse_score(50),
        ));
        let (service, _) = service_with(vec![adapter.clone()], 3600);

        let first = service.handle("8.8.8.8").await.unwrap();
        assert_eq!(first.threat_score, 50);

        // Provider data changes, but the cached answer must not.
        adapter.set_report(SourceReport::ok().with_abuse_score(99));

        let second = service.handle("8.8.8.8").await.unwrap();
        assert_eq!(
            serde_json::to_string(&second).unwrap(),
            serde_json::to_string(&first).unwrap()
        );
        assert_eq!(adapter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_fresh_adapter_calls() {
        let adapter = Arc::new(MockAdapter::returning(
            "abuseipdb",
            SourceReport::ok().with_abuse_score(50),
        ));
        let (service, _) = service_with(vec![adapter.clone()], 0);

        service.handle("8.8.8.8").await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        service.handle("8.8.8.8").await.unwrap();

        assert_eq!(adapter.call_count(), 2);
    }

    #[tokio::test]
    async fn test_untrimmed_ip_hits_same_cache_entry() {
        let adapter = Arc::new(MockAdapter::returning(
            "abuseipdb",
            SourceReport::ok().with_abuse_score(10),
        ));
        let (service, _) = service_with(vec![adapter.clone()], 3600);

        service.handle("8.8.8.8").await.unwrap();
        service.handle("  8.8.8.8  ").await.unwrap();

        assert_eq!(adapter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_queries_may_both_compute() {
        // No single-flight de-duplication: two simultaneous first-time
        // queries are both allowed to aggregate; the cached value must be
        // one of the computed results, never a corrupted merge.
        let adapter = Arc::new(
            MockAdapter::returning("abuseipdb", SourceReport::ok().with_abuse_score(35))
                .with_delay(Duration::from_millis(20)),
        );
        let (service, cache) = service_with(vec![adapter.clone()], 3600);

        let (first, second) = tokio::join!(service.handle("9.9.9.9"), service.handle("9.9.9.9"));
        let first = first.unwrap();
        let second = second.unwrap();

        assert_eq!(adapter.call_count(), 2);

        let cached = cache.get("9.9.9.9").unwrap();
        assert!(cached == first || cached == second);
    }

    #[tokio::test]
    async fn test_all_providers_down_still_succeeds() {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(MockAdapter::failing("virustotal")),
            Arc::new(MockAdapter::failing("abuseipdb")),
            Arc::new(MockAdapter::failing("otx")),
            Arc::new(MockAdapter::failing("shodan")),
        ];
        let (service, cache) = service_with(adapters, 3600);

        let result = service.handle("10.0.0.1").await.unwrap();
        assert_eq!(result.threat_score, 0);
        assert_eq!(result.threat_level, Verdict::Low);
        assert_eq!(result.sources.len(), 4);

        // Degraded answers are cached like any other.
        assert!(cache.get("10.0.0.1").is_some());
    }

    #[tokio::test]
    async fn test_from_config_builds_enabled_adapters_only() {
        let mut config = Config::default();
        config.virustotal.api_key = "vt".to_string();
        config.abuseipdb.api_key = "ab".to_string();
        config.otx.enabled = false;
        config.shodan.enabled = false;

        let service = QueryService::from_config(&config);
        assert_eq!(service.aggregator.adapter_count(), 2);
        assert!(service.cache.is_empty());
    }
}
