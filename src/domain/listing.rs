use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// One search result scraped from a listing site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyListing {
    pub title: String,
    /// Price as shown on the site, e.g. "AED 85,000 yearly".
    pub price: String,
    #[serde(default)]
    pub price_aed: Option<u64>,
    pub location: String,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub area_sqft: Option<u64>,
    pub link: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Site id of the grammar that produced the listing.
    pub source: String,
}

impl PropertyListing {
    pub fn has_price(&self) -> bool {
        self.price_aed.is_some()
            || self.price.to_lowercase().contains("aed")
            || self.price.chars().any(|c| c.is_ascii_digit())
    }

    fn signature(&self) -> String {
        let title: String = self.title.trim().to_lowercase().chars().take(30).collect();
        let digits: String = self.price.chars().filter(char::is_ascii_digit).collect();
        let location: String = self
            .location
            .trim()
            .to_lowercase()
            .chars()
            .take(20)
            .collect();
        format!("{title}_{digits}_{location}")
    }
}

impl std::fmt::Display for PropertyListing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {} ({}", self.title, self.location, self.price)?;
        if let Some(beds) = self.bedrooms {
            if beds == 0 {
                write!(f, ", studio")?;
            } else {
                write!(f, ", {beds} bed")?;
            }
        }
        if let Some(baths) = self.bathrooms {
            write!(f, ", {baths} bath")?;
        }
        if let Some(area) = self.area_sqft {
            write!(f, ", {area} sqft")?;
        }
        write!(f, ") [{}]", self.source)
    }
}

/// Collapse whitespace and spell the currency as `AED`.
pub fn clean_price(price: &str) -> String {
    let collapsed = price.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "Price on request".into();
    }
    collapsed
        .split(' ')
        .map(|word| {
            if word.eq_ignore_ascii_case("aed") {
                "AED".to_string()
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

const EMIRATE_CODES: &[(&str, &str)] = &[
    ("dxb", "Dubai"),
    ("auh", "Abu Dhabi"),
    ("shj", "Sharjah"),
    ("ajm", "Ajman"),
];

/// Expand emirate codes, otherwise title-case the location.
pub fn normalize_location(location: &str) -> String {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return "UAE".into();
    }
    let lower = trimmed.to_lowercase();
    for word in lower.split(|c: char| !c.is_ascii_alphanumeric()) {
        if let Some((_, name)) = EMIRATE_CODES.iter().find(|(code, _)| *code == word) {
            return (*name).to_string();
        }
    }
    title_case(trimmed)
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Drop listings whose title, price digits and location match an earlier
/// one. Survivors get a cleaned price and normalized location.
pub fn dedupe(listings: Vec<PropertyListing>) -> Vec<PropertyListing> {
    let mut seen = HashSet::new();
    listings
        .into_iter()
        .filter(|listing| seen.insert(listing.signature()))
        .map(|mut listing| {
            listing.price = clean_price(&listing.price);
            listing.location = normalize_location(&listing.location);
            listing
        })
        .collect()
}

/// Priced listings first, then by title, case-insensitive.
pub fn sort_listings(listings: &mut [PropertyListing]) {
    listings.sort_by_cached_key(|l| (!l.has_price(), l.title.to_lowercase()));
}
