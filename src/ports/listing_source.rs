use async_trait::async_trait;

use crate::domain::grammar::SiteGrammar;
use crate::domain::listing::PropertyListing;
use crate::error::Result;

/// One listing site. The grammar decides which URL is fetched.
#[async_trait]
pub trait ListingSource: Send + Sync {
    fn grammar(&self) -> &SiteGrammar;

    fn id(&self) -> &str {
        &self.grammar().id
    }

    async fn fetch_listings(&self, url: &str) -> Result<Vec<PropertyListing>>;
}
