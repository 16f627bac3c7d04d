use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::types::SearchConfig;
use crate::domain::listing::{PropertyListing, dedupe, sort_listings};
use crate::domain::resolver::search_urls;
use crate::domain::search_filter::SearchFilter;
use crate::error::{RealtyError, Result};
use crate::ports::listing_source::ListingSource;

/// How one source fared in an aggregated search.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: String,
    /// The last URL fetched; a broader one than the typed URL when the typed
    /// search came back empty.
    pub url: String,
    /// How many broader URLs were tried after the typed one.
    pub widened: usize,
    pub listings: usize,
    pub error: Option<String>,
    pub elapsed_ms: u64,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    /// Deduplicated and sorted, priced listings first.
    pub listings: Vec<PropertyListing>,
    /// One entry per source, in source order.
    pub reports: Vec<SourceReport>,
    pub timed_out: bool,
}

struct WorkerOutput {
    index: usize,
    attempt: Attempt,
    elapsed: Duration,
    finished_at: DateTime<Utc>,
}

/// Fans a search out to every listing source on a bounded worker pool.
/// A failing or slow source never cancels its peers.
pub struct SearchAggregator {
    sources: Vec<Arc<dyn ListingSource>>,
    max_workers: usize,
    worker_timeout: Duration,
    global_timeout: Duration,
}

impl SearchAggregator {
    pub fn new(sources: Vec<Arc<dyn ListingSource>>, config: &SearchConfig) -> Self {
        Self {
            sources,
            max_workers: config.max_workers.max(1),
            worker_timeout: Duration::from_secs(config.worker_timeout_secs),
            global_timeout: Duration::from_secs(config.global_timeout_secs),
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, worker: Duration, global: Duration) -> Self {
        self.worker_timeout = worker;
        self.global_timeout = global;
        self
    }

    pub fn sources(&self) -> &[Arc<dyn ListingSource>] {
        &self.sources
    }

    pub async fn search(&self, filter: &SearchFilter) -> AggregateResult {
        let started = Instant::now();
        let urls: Vec<Vec<String>> = self
            .sources
            .iter()
            .map(|s| search_urls(filter, s.grammar()))
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut workers = JoinSet::new();
        for (index, (source, candidates)) in self.sources.iter().zip(&urls).enumerate() {
            let source = Arc::clone(source);
            let candidates = candidates.clone();
            let semaphore = Arc::clone(&semaphore);
            let worker_timeout = self.worker_timeout;
            workers.spawn(async move {
                let worker_started = Instant::now();
                let attempt = run_worker(source, candidates, semaphore, worker_timeout).await;
                WorkerOutput {
                    index,
                    attempt,
                    elapsed: worker_started.elapsed(),
                    finished_at: Utc::now(),
                }
            });
        }

        let mut outputs: Vec<Option<WorkerOutput>> = (0..self.sources.len()).map(|_| None).collect();
        let deadline = tokio::time::Instant::now() + self.global_timeout;
        let mut timed_out = false;
        loop {
            match tokio::time::timeout_at(deadline, workers.join_next()).await {
                Ok(Some(Ok(output))) => {
                    let index = output.index;
                    outputs[index] = Some(output);
                }
                Ok(Some(Err(e))) => warn!(error = %e, "Search worker panicked"),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        timeout = ?self.global_timeout,
                        pending = workers.len(),
                        "Global search timeout reached, discarding pending sources"
                    );
                    workers.abort_all();
                    timed_out = true;
                    break;
                }
            }
        }

        let mut merged = Vec::new();
        let mut reports = Vec::with_capacity(self.sources.len());
        for ((source, candidates), output) in self.sources.iter().zip(urls).zip(outputs) {
            let typed_url = candidates.into_iter().next().unwrap_or_default();
            let report = match output {
                Some(WorkerOutput {
                    attempt,
                    elapsed,
                    finished_at,
                    ..
                }) => {
                    let (count, error) = match attempt.outcome {
                        Ok(listings) => {
                            let count = listings.len();
                            merged.extend(listings);
                            (count, None)
                        }
                        Err(e) => {
                            warn!(source = source.id(), error = %e, "Source failed");
                            (0, Some(e.to_string()))
                        }
                    };
                    SourceReport {
                        source: source.id().to_string(),
                        url: attempt.url,
                        widened: attempt.widened,
                        listings: count,
                        error,
                        elapsed_ms: millis(elapsed),
                        finished_at,
                    }
                }
                None => SourceReport {
                    source: source.id().to_string(),
                    url: typed_url,
                    widened: 0,
                    listings: 0,
                    error: Some(if timed_out {
                        "discarded after the global search timeout".into()
                    } else {
                        "worker did not finish".into()
                    }),
                    elapsed_ms: millis(started.elapsed()),
                    finished_at: Utc::now(),
                },
            };
            reports.push(report);
        }

        let mut listings = dedupe(merged);
        sort_listings(&mut listings);
        info!(
            sources = self.sources.len(),
            listings = listings.len(),
            elapsed_ms = millis(started.elapsed()),
            timed_out,
            "Aggregated search finished"
        );

        AggregateResult {
            listings,
            reports,
            timed_out,
        }
    }
}

struct Attempt {
    outcome: Result<Vec<PropertyListing>>,
    url: String,
    widened: usize,
}

/// Walks `urls` until one yields listings. An error ends the walk; the worker
/// timeout covers every URL together.
async fn run_worker(
    source: Arc<dyn ListingSource>,
    urls: Vec<String>,
    semaphore: Arc<Semaphore>,
    worker_timeout: Duration,
) -> Attempt {
    let first = urls.first().cloned().unwrap_or_default();
    let Ok(_permit) = semaphore.acquire_owned().await else {
        return Attempt {
            outcome: Err(RealtyError::Config("search worker pool closed".into())),
            url: first,
            widened: 0,
        };
    };

    let walk = async {
        let mut last = Attempt {
            outcome: Ok(Vec::new()),
            url: first.clone(),
            widened: 0,
        };
        for (widened, url) in urls.into_iter().enumerate() {
            if widened > 0 {
                debug!(source = source.id(), url = %url, "No listings, trying a broader search");
            }
            let outcome = source.fetch_listings(&url).await;
            let done = !matches!(&outcome, Ok(listings) if listings.is_empty());
            last = Attempt {
                outcome,
                url,
                widened,
            };
            if done {
                break;
            }
        }
        last
    };

    let walked = tokio::time::timeout(worker_timeout, walk).await;
    match walked {
        Ok(attempt) => attempt,
        Err(_) => Attempt {
            outcome: Err(RealtyError::Timeout {
                source_name: source.id().to_string(),
            }),
            url: first,
            widened: 0,
        },
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
