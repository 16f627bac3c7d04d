pub mod cache;
pub mod field_extractor;
pub mod listing_source;
