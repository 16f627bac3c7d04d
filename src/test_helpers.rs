use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::grammar::SiteGrammar;
use crate::domain::listing::PropertyListing;
use crate::error::Result;
use crate::ports::listing_source::ListingSource;

type FetchFn = Box<dyn Fn(&str) -> Result<Vec<PropertyListing>> + Send + Sync>;

pub struct MockListingSource {
    grammar: SiteGrammar,
    fetch_fn: Mutex<FetchFn>,
    delay: Duration,
    requested: Mutex<Vec<String>>,
}

impl MockListingSource {
    pub fn new(grammar: SiteGrammar) -> Self {
        Self {
            grammar,
            fetch_fn: Mutex::new(Box::new(|_| Ok(vec![]))),
            delay: Duration::ZERO,
            requested: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_fetch(
        self,
        f: impl Fn(&str) -> Result<Vec<PropertyListing>> + Send + Sync + 'static,
    ) -> Self {
        *self.fetch_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_listings(self, listings: Vec<PropertyListing>) -> Self {
        self.with_fetch(move |_| Ok(listings.clone()))
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// URLs passed to `fetch_listings`, in call order.
    pub fn requested_urls(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingSource for MockListingSource {
    fn grammar(&self) -> &SiteGrammar {
        &self.grammar
    }

    async fn fetch_listings(&self, url: &str) -> Result<Vec<PropertyListing>> {
        self.requested.lock().unwrap().push(url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let f = self.fetch_fn.lock().unwrap();
        f(url)
    }
}

/// Grammar with a distinct id and host, for multi-source tests.
pub fn make_grammar(id: &str) -> SiteGrammar {
    let mut grammar = SiteGrammar::bayut();
    grammar.id = id.into();
    grammar.base_url = format!("https://{id}.example");
    grammar
}

pub fn make_listing(title: &str, price: &str, source: &str) -> PropertyListing {
    PropertyListing {
        title: title.into(),
        price: price.into(),
        price_aed: None,
        location: "dubai marina".into(),
        bedrooms: Some(2),
        bathrooms: Some(2),
        area_sqft: Some(1200),
        link: format!("https://{source}.example/p/{}", title.len()),
        image: None,
        description: String::new(),
        source: source.into(),
    }
}
