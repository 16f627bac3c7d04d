use serde::{Deserialize, Serialize};

use crate::domain::extract::ExtractionConfig;
use crate::domain::grammar::SiteGrammar;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    /// Listing sites, in the order their results are reported.
    #[serde(default = "SiteGrammar::builtin")]
    pub sites: Vec<SiteGrammar>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            cache: CacheConfig::default(),
            search: SearchConfig::default(),
            extraction: ExtractionConfig::default(),
            extractor: ExtractorConfig::default(),
            sites: SiteGrammar::builtin(),
        }
    }
}

impl Config {
    pub fn site(&self, id: &str) -> Option<&SiteGrammar> {
        self.sites.iter().find(|s| s.id.eq_ignore_ascii_case(id))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_second: f64,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Extra attempts after a failed request. A 403 or 429 always gets one
    /// more on top.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Linear backoff step between attempts.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_max_listings")]
    pub max_listings_per_site: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            rate_limit_per_second: default_rate_limit(),
            request_timeout_secs: default_timeout(),
            max_retries: default_retries(),
            retry_backoff_ms: default_retry_backoff(),
            max_listings_per_site: default_max_listings(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_page_ttl")]
    pub page_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            page_ttl_secs: default_page_ttl(),
        }
    }
}

/// Fan-out limits for multi-site searches.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_worker_timeout")]
    pub worker_timeout_secs: u64,
    #[serde(default = "default_global_timeout")]
    pub global_timeout_secs: u64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            worker_timeout_secs: default_worker_timeout(),
            global_timeout_secs: default_global_timeout(),
            max_results: default_max_results(),
        }
    }
}

/// Optional HTTP service that proposes query fields as JSON.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractorConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_extractor_timeout")]
    pub timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_extractor_timeout(),
        }
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
}

fn default_rate_limit() -> f64 {
    0.5
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    0
}

fn default_retry_backoff() -> u64 {
    2000
}

fn default_max_listings() -> usize {
    25
}

fn default_max_entries() -> usize {
    500
}

fn default_page_ttl() -> u64 {
    900
}

fn default_max_workers() -> usize {
    2
}

fn default_worker_timeout() -> u64 {
    60
}

fn default_global_timeout() -> u64 {
    90
}

fn default_max_results() -> usize {
    20
}

fn default_extractor_timeout() -> u64 {
    20
}
