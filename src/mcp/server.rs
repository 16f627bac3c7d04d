use std::fmt::Write as _;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

use lru::LruCache;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ListResourceTemplatesResult, ListResourcesResult,
        PaginatedRequestParams, ProtocolVersion, RawResource, RawResourceTemplate,
        ReadResourceRequestParams, ReadResourceResult, Resource, ResourceContents,
        ResourceTemplate, ServerCapabilities, ServerInfo,
    },
    schemars,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use tracing::{debug, info};

use crate::adapters::aggregate::{AggregateResult, SearchAggregator};
use crate::domain::grammar::{SiteGrammar, slugify};
use crate::domain::query_guard::{is_property_query, validate_query};
use crate::domain::resolver::{QueryResolver, render_filter};
use crate::domain::search_filter::SearchFilter;
use crate::error::RealtyError;
use crate::ports::field_extractor::FieldExtractor;

const DEFAULT_MAX_RESULTS: usize = 20;
const DEFAULT_STORED_SEARCHES: NonZeroUsize = NonZeroUsize::new(100).unwrap();

// ---------- Resource Store ----------

/// The most recent search outputs, kept for re-reading as MCP resources.
/// Keys are URIs like `realty://search/2-bed-flat-in-jvc`.
#[derive(Clone)]
pub struct ResourceStore {
    entries: Arc<Mutex<LruCache<String, ResourceEntry>>>,
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORED_SEARCHES)
    }
}

#[derive(Clone)]
struct ResourceEntry {
    name: String,
    text: String,
}

impl ResourceStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    async fn insert(&self, uri: impl Into<String>, name: impl Into<String>, text: String) {
        self.entries.lock().await.put(
            uri.into(),
            ResourceEntry {
                name: name.into(),
                text,
            },
        );
    }

    async fn get(&self, uri: &str) -> Option<ResourceEntry> {
        self.entries.lock().await.get(uri).cloned()
    }

    async fn list(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .entries
            .lock()
            .await
            .iter()
            .map(|(uri, entry)| (uri.clone(), entry.name.clone()))
            .collect();
        entries.sort();
        entries
    }
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore").finish()
    }
}

// ---------- Tool parameter types ----------

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ResolveToolParams {
    /// Free-text property search (e.g. "2 bed flat in JVC under 90k")
    pub query: String,
    /// Site id from `list_sites` (e.g. "bayut"). Omit to resolve for every site.
    pub site: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ParseToolParams {
    /// Free-text property search
    pub query: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SearchToolParams {
    /// Free-text property search (e.g. "villa for sale in Arabian Ranches over 3M")
    pub query: String,
    /// Maximum number of listings to return (default: 20)
    pub max_results: Option<usize>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ListSitesToolParams {}

// ---------- MCP Server ----------

#[derive(Clone)]
pub struct RealtyMcpServer {
    resolver: QueryResolver,
    aggregator: Arc<SearchAggregator>,
    extractor: Arc<dyn FieldExtractor>,
    max_results: usize,
    tool_router: ToolRouter<Self>,
    resources: ResourceStore,
}

#[tool_router]
impl RealtyMcpServer {
    pub fn new(
        resolver: QueryResolver,
        aggregator: SearchAggregator,
        extractor: Arc<dyn FieldExtractor>,
    ) -> Self {
        Self {
            resolver,
            aggregator: Arc::new(aggregator),
            extractor,
            max_results: DEFAULT_MAX_RESULTS,
            tool_router: Self::tool_router(),
            resources: ResourceStore::default(),
        }
    }

    #[must_use]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    fn sites(&self) -> impl Iterator<Item = &SiteGrammar> {
        self.aggregator.sources().iter().map(|s| s.grammar())
    }

    fn site(&self, id: &str) -> Option<&SiteGrammar> {
        self.sites().find(|g| g.id.eq_ignore_ascii_case(id))
    }

    fn site_ids(&self) -> String {
        self.sites()
            .map(|g| g.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Regex fields merged with the extractor's proposal. Unparseable
    /// queries fall back to the default filter (rent, any type).
    async fn filter_for(&self, query: &str) -> SearchFilter {
        let hint = self.extractor.extract(query).await;
        self.resolver.parse(query, hint).unwrap_or_else(|e| {
            debug!(error = %e, "Query yielded no fields, searching with the default filter");
            SearchFilter::default()
        })
    }

    #[tool(
        name = "resolve_search_url",
        description = "Turn a free-text UAE property query into the search-results URL of each configured listing site (or only the named site). Never fails: unrecognised queries get the site's generic search page.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn resolve_search_url(
        &self,
        Parameters(params): Parameters<ResolveToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let targets: Vec<&SiteGrammar> = match params.site.as_deref() {
            Some(id) => match self.site(id) {
                Some(grammar) => vec![grammar],
                None => {
                    let error = RealtyError::UnknownSite { id: id.to_string() };
                    return Ok(CallToolResult::error(vec![Content::text(format!(
                        "{error}. Available sites: {}",
                        self.site_ids()
                    ))]));
                }
            },
            None => self.sites().collect(),
        };

        let filter = self.filter_for(&params.query).await;
        let mut text = String::new();
        for grammar in targets {
            let _ = writeln!(text, "{}: {}", grammar.id, render_filter(&filter, grammar));
        }
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        name = "parse_query",
        description = "Show how a free-text property query is understood: intent, property types, bedrooms, bathrooms, price and area bounds, location. Returns JSON.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn parse_query(
        &self,
        Parameters(params): Parameters<ParseToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let hint = self.extractor.extract(&params.query).await;
        match self.resolver.parse(&params.query, hint) {
            Ok(filter) => match serde_json::to_string_pretty(&filter) {
                Ok(json) => Ok(CallToolResult::success(vec![Content::text(json)])),
                Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
                    "Failed to encode the parsed query: {e}"
                ))])),
            },
            Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Could not parse the query: {e}. Mention a property type, bedrooms, a price or a location."
            ))])),
        }
    }

    #[tool(
        name = "search_properties",
        description = "Search every configured UAE listing site for a free-text query (e.g. \"3 bed villa for rent in Dubai Hills under 250k\") and return merged, deduplicated listings with prices, sizes and links, plus a per-site status report.",
        annotations(read_only_hint = true, open_world_hint = true)
    )]
    async fn search_properties(
        &self,
        Parameters(params): Parameters<SearchToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = params.query.trim();
        if let Err(e) = validate_query(query) {
            return Ok(CallToolResult::error(vec![Content::text(e.to_string())]));
        }
        if !is_property_query(query) {
            return Ok(CallToolResult::error(vec![Content::text(
                "This does not look like a property search. Try something like \
                 \"2 bedroom apartment for rent in Dubai Marina\"."
                    .to_string(),
            )]));
        }

        let filter = self.filter_for(query).await;
        let result = self.aggregator.search(&filter).await;
        let limit = params.max_results.unwrap_or(self.max_results).max(1);
        info!(
            query,
            found = result.listings.len(),
            limit,
            "search_properties finished"
        );

        let text = format_search(query, &result, limit);
        let uri = format!("realty://search/{}", slugify(query));
        let name = format!("Search: {query}");
        self.resources.insert(uri, name, text.clone()).await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        name = "list_sites",
        description = "List the configured listing sites with their base URLs, intent paths and location handling.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn list_sites(
        &self,
        Parameters(_params): Parameters<ListSitesToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let mut text = String::new();
        for grammar in self.sites() {
            let intents: Vec<String> = grammar
                .intent_slugs
                .iter()
                .map(|(intent, slug)| match &grammar.query_layout {
                    Some(layout) => format!("{intent:?} → {}={slug}", layout.intent_key),
                    None => format!("{intent:?} → /{slug}/"),
                })
                .collect();
            let _ = writeln!(text, "**{}** ({})", grammar.id, grammar.base());
            if let Some(layout) = &grammar.query_layout {
                let _ = writeln!(text, "   Search page: /{}", layout.path());
            }
            let _ = writeln!(text, "   Intents: {}", intents.join(", "));
            let _ = writeln!(
                text,
                "   Types: {} residential, {} commercial",
                grammar.residential_slugs.len(),
                grammar.commercial_slugs.len()
            );
            if grammar.honor_location {
                let _ = writeln!(
                    text,
                    "   Location: from the query (default '{}')\n",
                    grammar.default_location
                );
            } else {
                let _ = writeln!(text, "   Location: always '{}'\n", grammar.default_location);
            }
        }
        if text.is_empty() {
            text.push_str("No listing sites are configured.\n");
        }
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

fn format_search(query: &str, result: &AggregateResult, limit: usize) -> String {
    let mut text = String::new();
    if result.listings.is_empty() {
        let _ = writeln!(text, "No properties found for \"{query}\".\n");
    } else {
        let shown = result.listings.len().min(limit);
        let _ = writeln!(
            text,
            "Found {} properties for \"{query}\" (showing {shown}):\n",
            result.listings.len()
        );
        for (i, listing) in result.listings.iter().take(limit).enumerate() {
            let _ = writeln!(text, "{}. {listing}", i + 1);
            if !listing.description.is_empty() {
                let _ = writeln!(text, "   {}", listing.description);
            }
            let _ = writeln!(text, "   {} [{}]\n", listing.link, listing.source);
        }
    }

    let _ = writeln!(text, "Sources:");
    for report in &result.reports {
        match &report.error {
            Some(error) => {
                let _ = writeln!(
                    text,
                    "- {}: failed after {} ms ({error})\n  {}",
                    report.source, report.elapsed_ms, report.url
                );
            }
            None if report.widened > 0 => {
                let _ = writeln!(
                    text,
                    "- {}: {} listings in {} ms (broadened search)\n  {}",
                    report.source, report.listings, report.elapsed_ms, report.url
                );
            }
            None => {
                let _ = writeln!(
                    text,
                    "- {}: {} listings in {} ms\n  {}",
                    report.source, report.listings, report.elapsed_ms, report.url
                );
            }
        }
    }
    if result.timed_out {
        let _ = writeln!(
            text,
            "\nSome sites did not answer in time; results may be incomplete."
        );
    }
    text
}

#[tool_handler]
impl ServerHandler for RealtyMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "UAE real-estate search over natural-language queries.\n\
                 \n\
                 ## Tools\n\
                 - search_properties: search every configured site and return merged listings \
                 with a per-site status report\n\
                 - resolve_search_url: build the site search URL for a query without fetching it\n\
                 - parse_query: show the intent, types, rooms, price, area and location read from a query\n\
                 - list_sites: configured listing sites and how their URLs are built\n\
                 \n\
                 ## Resources\n\
                 Each search_properties output is kept as realty://search/{slug} so it can be \
                 re-read without scraping again.\n\
                 \n\
                 ## Tips\n\
                 - Prices like 90k or 1.2M are read as AED; say \"for sale\" or \"buy\" for sale listings.\n\
                 - Use parse_query first when a search returns nothing, to check how the query was read."
                    .into(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let entries = self.resources.list().await;
        let resources: Vec<Resource> = entries
            .into_iter()
            .map(|(uri, name)| Resource {
                annotations: None,
                raw: RawResource {
                    uri,
                    name,
                    title: None,
                    description: None,
                    mime_type: Some("text/plain".into()),
                    size: None,
                    icons: None,
                    meta: None,
                },
            })
            .collect();
        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: None,
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        let resource_templates = vec![ResourceTemplate {
            annotations: None,
            raw: RawResourceTemplate {
                uri_template: "realty://search/{slug}".into(),
                name: "Search Results".into(),
                title: Some("Property search results".into()),
                description: Some(
                    "Merged listings for a query (fetched via search_properties)".into(),
                ),
                mime_type: Some("text/plain".into()),
                icons: None,
            },
        }];
        Ok(ListResourceTemplatesResult {
            resource_templates,
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match self.resources.get(&request.uri).await {
            Some(entry) => Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(entry.text, request.uri)],
            }),
            None => Err(McpError::resource_not_found(
                format!("resource not found: {}", request.uri),
                None,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::SearchConfig;
    use crate::domain::property_type::TypeMention;
    use crate::domain::search_filter::PartialSearchFilter;
    use crate::error::RealtyError;
    use crate::ports::field_extractor::NoopExtractor;
    use crate::ports::listing_source::ListingSource;
    use crate::test_helpers::*;
    use async_trait::async_trait;

    struct FixedExtractor(PartialSearchFilter);

    #[async_trait]
    impl FieldExtractor for FixedExtractor {
        async fn extract(&self, _query: &str) -> PartialSearchFilter {
            self.0.clone()
        }
    }

    fn extract_text(result: &CallToolResult) -> &str {
        result.content[0]
            .raw
            .as_text()
            .expect("expected text content")
            .text
            .as_str()
    }

    fn make_server(sources: Vec<MockListingSource>) -> RealtyMcpServer {
        make_server_with(sources, Arc::new(NoopExtractor))
    }

    fn make_server_with(
        sources: Vec<MockListingSource>,
        extractor: Arc<dyn FieldExtractor>,
    ) -> RealtyMcpServer {
        let sources: Vec<Arc<dyn ListingSource>> = sources
            .into_iter()
            .map(|s| Arc::new(s) as Arc<dyn ListingSource>)
            .collect();
        let aggregator = SearchAggregator::new(sources, &SearchConfig::default());
        RealtyMcpServer::new(QueryResolver::default(), aggregator, extractor)
    }

    fn builtin_sources() -> Vec<MockListingSource> {
        SiteGrammar::builtin()
            .into_iter()
            .map(MockListingSource::new)
            .collect()
    }

    fn search(query: &str, max_results: Option<usize>) -> Parameters<SearchToolParams> {
        Parameters(SearchToolParams {
            query: query.into(),
            max_results,
        })
    }

    #[tokio::test]
    async fn resolve_returns_url_per_site() {
        let server = make_server(builtin_sources());
        let result = server
            .resolve_search_url(Parameters(ResolveToolParams {
                query: "villa for rent in dubai hills".into(),
                site: None,
            }))
            .await
            .unwrap();
        let text = extract_text(&result);
        assert!(text.contains("bayut: https://www.bayut.com/to-rent/villas/uae/"));
        assert!(
            text.contains("find-properties: https://findproperties.ae/for-rent/villas/dubai-hills")
        );
        assert!(text.contains(
            "property-finder: https://www.propertyfinder.ae/en/search?c=2&l=dubai-hills-estate&t=villa"
        ));
    }

    #[tokio::test]
    async fn resolve_for_named_site_only() {
        let server = make_server(builtin_sources());
        let result = server
            .resolve_search_url(Parameters(ResolveToolParams {
                query: "office for sale".into(),
                site: Some("BAYUT".into()),
            }))
            .await
            .unwrap();
        let text = extract_text(&result);
        assert_eq!(text.trim(), "bayut: https://www.bayut.com/for-sale/offices/uae/");
    }

    #[tokio::test]
    async fn resolve_unknown_site_is_error() {
        let server = make_server(builtin_sources());
        let result = server
            .resolve_search_url(Parameters(ResolveToolParams {
                query: "villa".into(),
                site: Some("propertyfinder".into()),
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        let text = extract_text(&result);
        assert!(text.starts_with("Unknown site 'propertyfinder'"));
        assert!(text.contains("bayut, find-properties, property-finder"));
    }

    #[tokio::test]
    async fn resolve_unparseable_query_gets_generic_url() {
        let server = make_server(builtin_sources());
        let result = server
            .resolve_search_url(Parameters(ResolveToolParams {
                query: "hello there".into(),
                site: Some("bayut".into()),
            }))
            .await
            .unwrap();
        assert!(extract_text(&result).contains("https://www.bayut.com/to-rent/property/uae/"));
    }

    #[tokio::test]
    async fn extractor_fills_missing_type() {
        let hint = PartialSearchFilter {
            mentions: vec![TypeMention::Townhouse],
            ..PartialSearchFilter::default()
        };
        let server = make_server_with(builtin_sources(), Arc::new(FixedExtractor(hint)));
        let result = server
            .resolve_search_url(Parameters(ResolveToolParams {
                query: "something family friendly to rent".into(),
                site: Some("bayut".into()),
            }))
            .await
            .unwrap();
        assert!(extract_text(&result).contains("https://www.bayut.com/to-rent/townhouses/uae/"));
    }

    #[tokio::test]
    async fn parse_query_returns_json() {
        let server = make_server(builtin_sources());
        let result = server
            .parse_query(Parameters(ParseToolParams {
                query: "2 bed apartment for sale under 1.5M".into(),
            }))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(extract_text(&result)).unwrap();
        assert_eq!(value["intent"], "sale");
        assert_eq!(value["price_max"], 1_500_000);
        assert_eq!(value["bedrooms"], serde_json::json!(["2"]));
    }

    #[tokio::test]
    async fn parse_query_without_fields_is_error() {
        let server = make_server(builtin_sources());
        let result = server
            .parse_query(Parameters(ParseToolParams {
                query: "hello there".into(),
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(extract_text(&result).contains("Could not parse"));
    }

    #[tokio::test]
    async fn search_merges_sources_and_reports() {
        let alpha = MockListingSource::new(make_grammar("alpha")).with_listings(vec![
            make_listing("Marina View", "AED 95,000", "alpha"),
            make_listing("Palm Residence", "", "alpha"),
        ]);
        let beta = MockListingSource::new(make_grammar("beta"))
            .with_fetch(|_| Err(RealtyError::Blocked { status: 403 }));
        let server = make_server(vec![alpha, beta]);

        let result = server
            .search_properties(search("2 bed flat in dubai marina", None))
            .await
            .unwrap();
        let text = extract_text(&result);
        assert!(text.contains("Found 2 properties"));
        assert!(text.contains("1. Marina View"));
        assert!(text.contains("2. Palm Residence"));
        assert!(text.contains("- alpha: 2 listings"));
        assert!(text.contains("- beta: failed"));
        assert!(text.contains("HTTP 403"));
        assert!(text.contains("https://alpha.example/to-rent/2-bedroom-apartments/uae/"));
    }

    #[tokio::test]
    async fn search_respects_max_results() {
        let listings = (0..5)
            .map(|i| make_listing(&format!("Unit {i}"), "AED 50,000", "alpha"))
            .collect();
        let alpha = MockListingSource::new(make_grammar("alpha")).with_listings(listings);
        let server = make_server(vec![alpha]).with_max_results(3);

        let result = server
            .search_properties(search("studio for rent", None))
            .await
            .unwrap();
        let text = extract_text(&result);
        assert!(text.contains("Found 5 properties"));
        assert!(text.contains("showing 3"));
        assert!(!text.contains("4. Unit"));

        let result = server
            .search_properties(search("studio for rent", Some(1)))
            .await
            .unwrap();
        assert!(!extract_text(&result).contains("2. Unit"));
    }

    #[tokio::test]
    async fn search_rejects_invalid_query() {
        let server = make_server(builtin_sources());
        let result = server.search_properties(search("ab", None)).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(extract_text(&result).contains("at least 3"));
    }

    #[tokio::test]
    async fn search_rejects_non_property_query() {
        let alpha = MockListingSource::new(make_grammar("alpha"));
        let server = make_server(vec![alpha]);
        let result = server
            .search_properties(search("what is the weather today", None))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(extract_text(&result).contains("does not look like a property search"));
    }

    #[tokio::test]
    async fn search_empty_results() {
        let alpha = MockListingSource::new(make_grammar("alpha"));
        let server = make_server(vec![alpha]);
        let result = server
            .search_properties(search("villa in jumeirah", None))
            .await
            .unwrap();
        let text = extract_text(&result);
        assert!(text.contains("No properties found"));
        assert!(text.contains("- alpha: 0 listings"));
    }

    #[tokio::test]
    async fn search_output_is_stored_as_resource() {
        let alpha = MockListingSource::new(make_grammar("alpha"))
            .with_listings(vec![make_listing("Creek Loft", "AED 70,000", "alpha")]);
        let server = make_server(vec![alpha]);
        server
            .search_properties(search("Loft for rent in Creek Harbour", None))
            .await
            .unwrap();

        let entries = server.resources.list().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "realty://search/loft-for-rent-in-creek-harbour");
        assert_eq!(entries[0].1, "Search: Loft for rent in Creek Harbour");
        let entry = server
            .resources
            .get("realty://search/loft-for-rent-in-creek-harbour")
            .await
            .unwrap();
        assert!(entry.text.contains("Creek Loft"));
    }

    #[tokio::test]
    async fn list_sites_describes_grammars() {
        let server = make_server(builtin_sources());
        let result = server
            .list_sites(Parameters(ListSitesToolParams {}))
            .await
            .unwrap();
        let text = extract_text(&result);
        assert!(text.contains("**bayut** (https://www.bayut.com)"));
        assert!(text.contains("to-rent"));
        assert!(text.contains("always 'uae'"));
        assert!(text.contains("**find-properties**"));
        assert!(text.contains("from the query (default 'dubai')"));
    }

    #[tokio::test]
    async fn list_sites_shows_query_layout() {
        let server = make_server(vec![MockListingSource::new(SiteGrammar::property_finder())]);
        let result = server
            .list_sites(Parameters(ListSitesToolParams {}))
            .await
            .unwrap();
        let text = extract_text(&result);
        assert!(text.contains("**property-finder** (https://www.propertyfinder.ae)"));
        assert!(text.contains("Search page: /en/search"));
        assert!(text.contains("Rent → c=2"));
    }

    #[tokio::test]
    async fn resource_store_keeps_most_recent_searches() {
        let store = ResourceStore::new(NonZeroUsize::new(2).unwrap());
        store.insert("realty://search/a", "Search: a", "A".into()).await;
        store.insert("realty://search/b", "Search: b", "B".into()).await;
        assert!(store.get("realty://search/a").await.is_some());
        store.insert("realty://search/c", "Search: c", "C".into()).await;

        let uris: Vec<String> = store.list().await.into_iter().map(|(uri, _)| uri).collect();
        assert_eq!(uris, vec!["realty://search/a", "realty://search/c"]);
        assert!(store.get("realty://search/b").await.is_none());
    }

    #[tokio::test]
    async fn list_sites_empty() {
        let server = make_server(vec![]);
        let result = server
            .list_sites(Parameters(ListSitesToolParams {}))
            .await
            .unwrap();
        assert!(extract_text(&result).contains("No listing sites"));
    }

    #[test]
    fn server_info_correct() {
        let server = make_server(vec![]);
        let info = server.get_info();
        let instructions = info.instructions.unwrap();
        assert!(instructions.contains("search_properties"));
        assert!(instructions.contains("resolve_search_url"));
        assert!(instructions.contains("parse_query"));
        assert!(instructions.contains("list_sites"));
        assert!(instructions.contains("realty://search/"));
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
    }
}
