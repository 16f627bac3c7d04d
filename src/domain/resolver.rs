use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::extract::{ExtractionConfig, extract_fields};
use crate::domain::grammar::SiteGrammar;
use crate::domain::property_type::PropertyType;
use crate::domain::render::{render, render_generic};
use crate::domain::search_filter::{Intent, PartialSearchFilter, SearchFilter};

/// Why a query could not become a typed search URL. Never surfaced to the
/// caller of [`QueryResolver::resolve`]; each one selects a fallback URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no usable field could be extracted from the query")]
    ExtractionFailure,

    #[error("none of the requested property types is listed on this site")]
    NoMatchingType,

    #[error("site '{site}' has a priority but no slug for {property_type}")]
    MissingSlug {
        site: String,
        property_type: PropertyType,
    },

    #[error("site has no path segment for intent {intent:?}")]
    MissingIntentSlug { intent: Intent },
}

/// Turns free-text queries into search URLs for any [`SiteGrammar`].
#[derive(Debug, Clone, Default)]
pub struct QueryResolver {
    config: ExtractionConfig,
}

impl QueryResolver {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Regex extraction merged with `hint`; regex fields win where both are set.
    pub fn parse(
        &self,
        query: &str,
        hint: PartialSearchFilter,
    ) -> Result<SearchFilter, ResolveError> {
        extract_fields(query, &self.config).merge(hint).into_filter()
    }

    /// Always returns a URL on the grammar's domain.
    pub fn resolve(&self, query: &str, grammar: &SiteGrammar) -> String {
        self.resolve_with_hint(query, grammar, PartialSearchFilter::default())
    }

    pub fn resolve_with_hint(
        &self,
        query: &str,
        grammar: &SiteGrammar,
        hint: PartialSearchFilter,
    ) -> String {
        match self.parse(query, hint) {
            Ok(filter) => render_filter(&filter, grammar),
            Err(e) => {
                debug!(error = %e, site = %grammar.id, "Using the generic search URL");
                render_filter(&SearchFilter::default(), grammar)
            }
        }
    }
}

/// Typed URL, else the generic path with the same parameters, else the site root.
pub fn render_filter(filter: &SearchFilter, grammar: &SiteGrammar) -> String {
    match render(filter, grammar) {
        Ok(url) => url,
        Err(e) => {
            match &e {
                ResolveError::NoMatchingType => {
                    debug!(site = %grammar.id, "No listed type, using the generic path");
                }
                _ => warn!(error = %e, site = %grammar.id, "Typed URL failed, using the generic path"),
            }
            render_generic(filter, grammar).unwrap_or_else(|e| {
                warn!(error = %e, site = %grammar.id, "Generic URL failed, using the site root");
                grammar.root_url()
            })
        }
    }
}

/// URLs to try in order when a search comes back empty: the typed URL, the
/// untyped URL with the same filters, then the bare intent search.
pub fn search_urls(filter: &SearchFilter, grammar: &SiteGrammar) -> Vec<String> {
    let broad = SearchFilter {
        intent: filter.intent,
        ..SearchFilter::default()
    };
    let mut urls = vec![render_filter(filter, grammar)];
    let candidates = [
        render_generic(filter, grammar).ok(),
        Some(render_filter(&broad, grammar)),
    ];
    for url in candidates.into_iter().flatten() {
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

/// Resolve with the default extraction settings.
pub fn resolve(query: &str, grammar: &SiteGrammar) -> String {
    QueryResolver::default().resolve(query, grammar)
}
