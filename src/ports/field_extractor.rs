use async_trait::async_trait;

use crate::domain::search_filter::PartialSearchFilter;

/// Natural-language collaborator that proposes fields the regex rules miss.
/// Its output only fills gaps; implementations never fail, they return an
/// empty filter instead.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract(&self, query: &str) -> PartialSearchFilter;
}

/// Used when no extraction service is configured.
pub struct NoopExtractor;

#[async_trait]
impl FieldExtractor for NoopExtractor {
    async fn extract(&self, _query: &str) -> PartialSearchFilter {
        PartialSearchFilter::default()
    }
}
