//! Configuration types for the threat intelligence aggregator.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Global settings.
    #[serde(default)]
    pub settings: Settings,

    /// Result cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// VirusTotal provider configuration.
    #[serde(default)]
    pub virustotal: ProviderConfig,

    /// AbuseIPDB provider configuration.
    #[serde(default)]
    pub abuseipdb: ProviderConfig,

    /// AlienVault OTX provider configuration.
    #[serde(default)]
    pub otx: ProviderConfig,

    /// Shodan provider configuration.
    #[serde(default)]
    pub shodan: ProviderConfig,
}

/// Global settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Hard upper bound on any single adapter call, in milliseconds.
    /// Applied on top of each provider's own HTTP timeout so a stalled
    /// provider can never hold a query open indefinitely.
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            adapter_timeout_ms: default_adapter_timeout(),
        }
    }
}

fn default_adapter_timeout() -> u64 {
    6000
}

/// Result cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Uniform TTL applied to every cached result, in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,

    /// Maximum number of cached results before eviction.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_max_entries() -> usize {
    10000
}

/// Configuration for one threat intelligence provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Enable lookups against this provider.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API key (supports ${ENV_VAR} syntax in the config file).
    #[serde(default)]
    pub api_key: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            timeout_ms: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let expanded = expand_env_vars(&content);
        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.settings.adapter_timeout_ms == 0 {
            anyhow::bail!("adapter_timeout_ms must be greater than zero");
        }

        if self.cache.max_entries == 0 {
            anyhow::bail!("cache max_entries must be greater than zero");
        }

        for (name, provider) in self.providers() {
            if provider.enabled && provider.api_key.is_empty() {
                anyhow::bail!("{} is enabled but api_key is empty", name);
            }
        }

        Ok(())
    }

    /// Provider configurations with their canonical names.
    pub fn providers(&self) -> [(&'static str, &ProviderConfig); 4] {
        [
            ("virustotal", &self.virustotal),
            ("abuseipdb", &self.abuseipdb),
            ("otx", &self.otx),
            ("shodan", &self.shodan),
        ]
    }

    /// Generate example configuration YAML.
    pub fn example() -> String {
        r#"# Threat intelligence aggregator configuration

settings:
  adapter_timeout_ms: 6000     # Hard bound on any single provider call

# Aggregate results are cached per IP for ttl_seconds; within the window
# repeat queries are served from cache without contacting providers.
cache:
  ttl_seconds: 3600
  max_entries: 10000

virustotal:
  enabled: true
  api_key: "${VIRUSTOTAL_API_KEY}"
  timeout_ms: 5000

abuseipdb:
  enabled: true
  api_key: "${ABUSEIPDB_API_KEY}"
  timeout_ms: 5000

otx:
  enabled: true
  api_key: "${OTX_API_KEY}"
  timeout_ms: 5000

shodan:
  enabled: true
  api_key: "${SHODAN_API_KEY}"
  timeout_ms: 5000
"#
        .to_string()
    }
}

/// Expand environment variables in the format ${VAR_NAME}.
fn expand_env_vars(content: &str) -> String {
    let mut result = content.to_string();
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        let var_value = std::env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
