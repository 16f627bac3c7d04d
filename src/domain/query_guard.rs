use crate::error::{RealtyError, Result};

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 200;

const REJECTED_FRAGMENTS: &[&str] = &[
    "<script",
    "javascript:",
    "select ",
    "union ",
    "insert ",
    "delete ",
];

const PROPERTY_KEYWORDS: &[&str] = &[
    "rent",
    "sale",
    "buy",
    "lease",
    "apartment",
    "villa",
    "studio",
    "penthouse",
    "townhouse",
    "room",
    "bedroom",
    "bathroom",
    "flat",
    "duplex",
    "house",
    "property",
    "real estate",
    "housing",
    "accommodation",
    "office",
    "warehouse",
    "shop",
    "dubai",
    "sharjah",
    "abu dhabi",
    "ajman",
    "ras al khaimah",
    "marina",
    "downtown",
    "jbr",
    "business bay",
    "difc",
];

/// Reject queries that are too short, too long or carry markup/SQL fragments.
pub fn validate_query(query: &str) -> Result<()> {
    let trimmed = query.trim();
    let len = trimmed.chars().count();
    if len < MIN_LEN {
        return Err(RealtyError::InvalidQuery {
            reason: format!("query must be at least {MIN_LEN} characters"),
        });
    }
    if len > MAX_LEN {
        return Err(RealtyError::InvalidQuery {
            reason: format!("query must be at most {MAX_LEN} characters"),
        });
    }
    let lower = trimmed.to_lowercase();
    if let Some(fragment) = REJECTED_FRAGMENTS.iter().find(|f| lower.contains(*f)) {
        return Err(RealtyError::InvalidQuery {
            reason: format!("query contains a disallowed fragment '{}'", fragment.trim()),
        });
    }
    Ok(())
}

/// Whether the query is about property at all.
pub fn is_property_query(query: &str) -> bool {
    let lower = query.to_lowercase();
    PROPERTY_KEYWORDS.iter().any(|k| lower.contains(k))
}
