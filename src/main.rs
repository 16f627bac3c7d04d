use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

use mcp_uae_realty::adapters::aggregate::SearchAggregator;
use mcp_uae_realty::adapters::cache::memory_cache::MemoryCache;
use mcp_uae_realty::adapters::extractor::http_extractor::HttpFieldExtractor;
use mcp_uae_realty::adapters::scraper::client::SiteScraper;
use mcp_uae_realty::config::load_config;
use mcp_uae_realty::domain::resolver::QueryResolver;
use mcp_uae_realty::mcp::server::RealtyMcpServer;
use mcp_uae_realty::ports::cache::PageCache;
use mcp_uae_realty::ports::field_extractor::{FieldExtractor, NoopExtractor};
use mcp_uae_realty::ports::listing_source::ListingSource;

fn find_config_path() -> PathBuf {
    let candidates = [
        PathBuf::from("config.yaml"),
        exe_dir().join("config.yaml"),
    ];

    for path in &candidates {
        if path.exists() {
            return path.clone();
        }
    }

    candidates[0].clone()
}

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout is reserved for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting mcp-uae-realty server");

    let config_path = find_config_path();
    let config = load_config(&config_path)?;

    let cache: Arc<dyn PageCache> = Arc::new(MemoryCache::new(config.cache.max_entries));

    let mut sources: Vec<Arc<dyn ListingSource>> = Vec::with_capacity(config.sites.len());
    for grammar in &config.sites {
        let scraper = SiteScraper::new(
            grammar.clone(),
            config.http.clone(),
            &config.cache,
            Arc::clone(&cache),
        )?;
        sources.push(Arc::new(scraper));
    }
    tracing::info!(
        sites = sources.len(),
        workers = config.search.max_workers,
        "Listing sources ready"
    );

    let extractor: Arc<dyn FieldExtractor> = match HttpFieldExtractor::from_config(&config.extractor)? {
        Some(extractor) => {
            tracing::info!("Field extraction service enabled");
            Arc::new(extractor)
        }
        None => Arc::new(NoopExtractor),
    };

    let aggregator = SearchAggregator::new(sources, &config.search);
    let resolver = QueryResolver::new(config.extraction.clone());
    let server = RealtyMcpServer::new(resolver, aggregator, extractor)
        .with_max_results(config.search.max_results);

    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
