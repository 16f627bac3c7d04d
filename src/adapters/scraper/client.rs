use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::adapters::scraper::listing_parser;
use crate::adapters::scraper::rate_limiter::RateLimiter;
use crate::config::types::{CacheConfig, HttpConfig};
use crate::domain::grammar::SiteGrammar;
use crate::domain::listing::PropertyListing;
use crate::error::{RealtyError, Result};
use crate::ports::cache::PageCache;
use crate::ports::listing_source::ListingSource;

/// Listing source for one site grammar: plain HTTP GET of the resolved
/// search URL, then card/JSON-LD parsing.
pub struct SiteScraper {
    http: Client,
    grammar: SiteGrammar,
    rate_limiter: RateLimiter,
    cache: Arc<dyn PageCache>,
    config: HttpConfig,
    page_ttl: Duration,
}

enum Attempt {
    Page(String),
    Retry(RealtyError),
    Fail(RealtyError),
}

impl SiteScraper {
    pub fn new(
        grammar: SiteGrammar,
        config: HttpConfig,
        cache_config: &CacheConfig,
        cache: Arc<dyn PageCache>,
    ) -> std::result::Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .cookie_store(true)
            .build()?;

        let rate_limiter = RateLimiter::new(config.rate_limit_per_second);

        Ok(Self {
            http,
            grammar,
            rate_limiter,
            cache,
            config,
            page_ttl: Duration::from_secs(cache_config.page_ttl_secs),
        })
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(RealtyError::Http(e)),
        };
        let status = response.status();
        if status.is_success() {
            return match response.text().await {
                Ok(html) => Attempt::Page(html),
                Err(e) => Attempt::Retry(RealtyError::Http(e)),
            };
        }
        match status {
            StatusCode::FORBIDDEN => Attempt::Retry(RealtyError::Blocked {
                status: status.as_u16(),
            }),
            StatusCode::TOO_MANY_REQUESTS => Attempt::Retry(RealtyError::RateLimited),
            StatusCode::NOT_FOUND => Attempt::Fail(RealtyError::Parse {
                reason: format!("page not found (404): {url}"),
            }),
            _ => Attempt::Retry(RealtyError::Parse {
                reason: format!("HTTP {status} for {url}"),
            }),
        }
    }

    /// Retries with linear backoff. A 403 or 429 on the last attempt earns
    /// one extra attempt.
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let backoff = Duration::from_millis(self.config.retry_backoff_ms);
        let mut fallback_used = false;
        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                let delay = retry_delay(backoff, attempt);
                debug!(site = %self.grammar.id, attempt, delay = ?delay, "Retrying request");
                tokio::time::sleep(delay).await;
            }
            self.rate_limiter.wait().await;
            debug!(site = %self.grammar.id, url, "Fetching page");

            let error = match self.attempt(url).await {
                Attempt::Page(html) => return Ok(html),
                Attempt::Fail(e) => return Err(e),
                Attempt::Retry(e) => e,
            };
            attempt = attempt.saturating_add(1);
            warn!(site = %self.grammar.id, error = %error, attempt, "Request failed");

            if attempt > self.config.max_retries {
                let blocked = matches!(
                    error,
                    RealtyError::Blocked { .. } | RealtyError::RateLimited
                );
                if !blocked || fallback_used {
                    return Err(error);
                }
                fallback_used = true;
            }
        }
    }
}

/// Linear backoff that saturates instead of overflowing.
fn retry_delay(step: Duration, attempt: u32) -> Duration {
    step.saturating_mul(attempt)
}

#[async_trait]
impl ListingSource for SiteScraper {
    fn grammar(&self) -> &SiteGrammar {
        &self.grammar
    }

    async fn fetch_listings(&self, url: &str) -> Result<Vec<PropertyListing>> {
        let html = if let Some(cached) = self.cache.get(url) {
            debug!(site = %self.grammar.id, url, "Cache hit for results page");
            cached
        } else {
            let html = self.fetch_html(url).await?;
            self.cache.set(url, &html, self.page_ttl);
            html
        };

        listing_parser::parse_listings(
            &html,
            self.grammar.base(),
            &self.grammar.id,
            self.config.max_listings_per_site,
        )
    }
}
