use thiserror::Error;

#[derive(Error, Debug)]
pub enum RealtyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse listing page: {reason}")]
    Parse { reason: String },

    #[error("Invalid query: {reason}")]
    InvalidQuery { reason: String },

    #[error("Request blocked by site (HTTP {status})")]
    Blocked { status: u16 },

    #[error("Rate limit exceeded, try again later")]
    RateLimited,

    #[error("Unknown site '{id}'")]
    UnknownSite { id: String },

    #[error("Source '{source_name}' timed out")]
    Timeout { source_name: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, RealtyError>;
