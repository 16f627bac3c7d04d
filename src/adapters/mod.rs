pub mod aggregate;
pub mod cache;
pub mod extractor;
pub mod scraper;
