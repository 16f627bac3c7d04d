pub mod extract;
pub mod grammar;
pub mod listing;
pub mod property_type;
pub mod query_guard;
pub mod render;
pub mod resolver;
pub mod search_filter;

pub use grammar::SiteGrammar;
pub use resolver::{QueryResolver, ResolveError, resolve};
pub use search_filter::{PartialSearchFilter, SearchFilter};
