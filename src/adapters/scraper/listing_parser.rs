use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::domain::listing::PropertyListing;
use crate::error::{RealtyError, Result};

static BEDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*(?:beds?|bedrooms?|br)\b").expect("beds pattern is valid")
});
static STUDIO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bstudio\b").expect("studio pattern is valid"));
static BATHS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*(?:baths?|bathrooms?)\b").expect("baths pattern is valid")
});
static AREA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,3}(?:,\d{3})+|\d+)\s*(?:sq\.?\s*ft|sqft|square\s+feet)")
        .expect("area pattern is valid")
});
static PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)aed\s*(\d{1,3}(?:,\d{3})+|\d+)|(\d{1,3}(?:,\d{3})+|\d+)\s*aed")
        .expect("price pattern is valid")
});

struct Selectors {
    card: Selector,
    link: Selector,
    title: Selector,
    price: Selector,
    location: Selector,
    image: Selector,
    json_ld: Selector,
}

impl Selectors {
    fn new() -> Result<Self> {
        Ok(Self {
            card: selector(r#"article[data-testid="property-card"], [class*="card"]"#)?,
            link: selector("a[href]")?,
            title: selector(r#"h2, h3, [aria-label="Title"]"#)?,
            price: selector(r#"[data-testid*="price"], [aria-label="Price"], [class*="price"]"#)?,
            location: selector(r#"[aria-label="Location"], [class*="location"]"#)?,
            image: selector("img")?,
            json_ld: selector(r#"script[type="application/ld+json"]"#)?,
        })
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| RealtyError::Parse {
        reason: format!("invalid selector '{css}': {e}"),
    })
}

/// JSON-LD items of a results page, keyed by absolute listing URL.
struct StructuredData {
    items: Vec<(String, Value)>,
    by_url: HashMap<String, usize>,
}

impl StructuredData {
    fn collect(document: &Html, selectors: &Selectors, base: &Url) -> Self {
        let mut raw = Vec::new();
        for script in document.select(&selectors.json_ld) {
            let text = script.text().collect::<String>();
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => flatten(value, &mut raw, 0),
                Err(e) => debug!(error = %e, "Skipping unreadable JSON-LD block"),
            }
        }

        let mut data = Self {
            items: Vec::new(),
            by_url: HashMap::new(),
        };
        for item in raw {
            let Some(url) = item
                .get("url")
                .and_then(Value::as_str)
                .and_then(|u| base.join(u).ok())
            else {
                continue;
            };
            let url = url.to_string();
            if !data.by_url.contains_key(&url) {
                data.by_url.insert(url.clone(), data.items.len());
                data.items.push((url, item));
            }
        }
        data
    }

    fn get(&self, url: &str) -> Option<&Value> {
        self.by_url.get(url).map(|&i| &self.items[i].1)
    }
}

const MAX_JSON_LD_DEPTH: usize = 8;

fn flatten(value: Value, out: &mut Vec<Value>, depth: usize) {
    if depth > MAX_JSON_LD_DEPTH {
        return;
    }
    match value {
        Value::Array(items) => {
            for item in items {
                flatten(item, out, depth + 1);
            }
        }
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten(graph, out, depth + 1);
            } else if let Some(list) = map.remove("itemListElement") {
                flatten(list, out, depth + 1);
            } else if map.get("item").is_some_and(Value::is_object) {
                if let Some(item) = map.remove("item") {
                    flatten(item, out, depth + 1);
                }
            } else if map.contains_key("url") {
                out.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

/// Parse a search results page into at most `limit` listings. Card markup
/// supplies the link and fallback text; JSON-LD for the same link wins.
pub fn parse_listings(
    html: &str,
    base_url: &str,
    source: &str,
    limit: usize,
) -> Result<Vec<PropertyListing>> {
    let base = Url::parse(base_url)?;
    let selectors = Selectors::new()?;
    let document = Html::parse_document(html);
    let structured = StructuredData::collect(&document, &selectors, &base);

    let mut listings = Vec::new();
    let mut seen = HashSet::new();
    for card in document.select(&selectors.card) {
        if listings.len() >= limit {
            break;
        }
        let Some(listing) = parse_card(card, &selectors, &base, &structured, source) else {
            continue;
        };
        // Nested elements with "card" in their class repeat the outer card's link.
        if seen.insert(listing.link.clone()) {
            listings.push(listing);
        }
    }

    if listings.is_empty() && !structured.items.is_empty() {
        debug!(
            source,
            items = structured.items.len(),
            "No listing cards, using JSON-LD only"
        );
        listings = structured
            .items
            .iter()
            .filter_map(|(link, item)| from_structured(link, item, &base, source))
            .take(limit)
            .collect();
    }

    debug!(source, count = listings.len(), "Parsed listings");
    Ok(listings)
}

fn parse_card(
    card: ElementRef<'_>,
    selectors: &Selectors,
    base: &Url,
    structured: &StructuredData,
    source: &str,
) -> Option<PropertyListing> {
    let href = card.select(&selectors.link).next()?.value().attr("href")?;
    let link = base.join(href).ok()?.to_string();
    let text = collapse(card.text());

    let price = first_text(card, &selectors.price)
        .or_else(|| PRICE.find(&text).map(|m| m.as_str().to_string()))
        .unwrap_or_default();

    let mut listing = PropertyListing {
        title: first_text(card, &selectors.title).unwrap_or_default(),
        price_aed: price_amount(&price),
        price,
        location: first_text(card, &selectors.location).unwrap_or_default(),
        bedrooms: captured(&BEDS, &text).or_else(|| STUDIO.is_match(&text).then_some(0)),
        bathrooms: captured(&BATHS, &text),
        area_sqft: AREA
            .captures(&text)
            .and_then(|c| c.get(1))
            .and_then(|m| amount(m.as_str())),
        link,
        image: card
            .select(&selectors.image)
            .next()
            .and_then(|img| img.value().attr("src").or_else(|| img.value().attr("data-src")))
            .and_then(|src| base.join(src).ok())
            .map(String::from),
        description: String::new(),
        source: source.to_string(),
    };

    if let Some(item) = structured.get(&listing.link) {
        apply_structured(&mut listing, item, base);
    }
    if listing.title.trim().is_empty() {
        return None;
    }
    listing.description = describe(&listing);
    Some(listing)
}

fn from_structured(link: &str, item: &Value, base: &Url, source: &str) -> Option<PropertyListing> {
    let mut listing = PropertyListing {
        title: String::new(),
        price: String::new(),
        price_aed: None,
        location: String::new(),
        bedrooms: None,
        bathrooms: None,
        area_sqft: None,
        link: link.to_string(),
        image: None,
        description: String::new(),
        source: source.to_string(),
    };
    apply_structured(&mut listing, item, base);
    if listing.title.trim().is_empty() {
        return None;
    }
    listing.description = describe(&listing);
    Some(listing)
}

fn apply_structured(listing: &mut PropertyListing, item: &Value, base: &Url) {
    if let Some(name) = item.get("name").and_then(Value::as_str).map(str::trim)
        && !name.is_empty()
    {
        listing.title = name.to_string();
    }

    let locality = match item.get("address") {
        Some(Value::Object(address)) => address.get("addressLocality").and_then(Value::as_str),
        Some(Value::String(address)) => Some(address.as_str()),
        _ => None,
    };
    if let Some(locality) = locality.map(str::trim).filter(|l| !l.is_empty()) {
        listing.location = locality.to_string();
    }

    if let Some(rooms) = item.get("numberOfRooms").and_then(json_count) {
        listing.bedrooms = Some(rooms);
    }
    if let Some(baths) = item.get("numberOfBathroomsTotal").and_then(json_count) {
        listing.bathrooms = Some(baths);
    }
    if let Some(area) = item.get("floorSize").and_then(json_amount) {
        listing.area_sqft = Some(area);
    }

    let image = match item.get("image") {
        Some(Value::String(src)) => Some(src.as_str()),
        Some(Value::Array(items)) => items.iter().find_map(Value::as_str),
        Some(Value::Object(obj)) => obj.get("url").and_then(Value::as_str),
        _ => None,
    };
    if let Some(src) = image.and_then(|src| base.join(src).ok()) {
        listing.image = Some(src.to_string());
    }

    if listing.price_aed.is_none() {
        let offer_price = item.get("offers").and_then(|offers| {
            offers
                .get("price")
                .or_else(|| offers.pointer("/priceSpecification/price"))
                .and_then(json_amount)
        });
        if let Some(price) = offer_price {
            listing.price_aed = Some(price);
            if listing.price.is_empty() {
                listing.price = format!("AED {price}");
            }
        }
    }
}

fn describe(listing: &PropertyListing) -> String {
    let mut parts = Vec::new();
    match listing.bedrooms {
        Some(0) => parts.push("Studio".to_string()),
        Some(n) => parts.push(format!("{n} Bed")),
        None => {}
    }
    if let Some(n) = listing.bathrooms {
        parts.push(format!("{n} Bath"));
    }
    if let Some(n) = listing.area_sqft {
        parts.push(format!("{n} sqft"));
    }
    parts.join(" | ")
}

fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .map(|e| collapse(e.text()))
        .find(|t| !t.is_empty())
}

fn collapse<'a>(text: impl Iterator<Item = &'a str>) -> String {
    text.flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn captured(pattern: &Regex, text: &str) -> Option<u32> {
    pattern.captures(text)?.get(1)?.as_str().parse().ok()
}

fn price_amount(price: &str) -> Option<u64> {
    let caps = PRICE.captures(price)?;
    let number = caps.get(1).or_else(|| caps.get(2))?;
    amount(number.as_str())
}

/// Integer part of a number written with optional thousands separators.
fn amount(text: &str) -> Option<u64> {
    let integer = text.trim().split('.').next()?;
    let digits: String = integer.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn json_amount(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => amount(&n.to_string()),
        Value::String(s) => amount(s),
        Value::Object(obj) => obj.get("value").and_then(json_amount),
        _ => None,
    }
}

fn json_count(value: &Value) -> Option<u32> {
    json_amount(value).and_then(|n| u32::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.bayut.com";

    const CARDS_WITH_JSON_LD: &str = r#"
<html><head>
<script type="application/ld+json">
[
  {"@type": "Apartment", "url": "https://www.bayut.com/property/details-1.html",
   "name": "Marina Gate 2BR", "address": {"addressLocality": "Dubai Marina"},
   "numberOfRooms": {"value": 2}, "numberOfBathroomsTotal": 3,
   "floorSize": {"value": "1,250"}, "image": "https://images.bayut.com/1.jpg"}
]
</script>
</head><body>
<article data-testid="property-card">
  <a href="/property/details-1.html"><h2>Card title</h2></a>
  <span aria-label="Price">AED 150,000 yearly</span>
</article>
<article data-testid="property-card">
  <a href="/property/details-2.html"><h2>Studio in JLT</h2></a>
  <div class="listing-location">JLT Cluster D</div>
  <span>AED 48,000</span><span>Studio</span><span>1 Bath</span><span>420 sqft</span>
  <img src="/thumbs/2.jpg">
</article>
</body></html>"#;

    #[test]
    fn json_ld_overrides_card_text() {
        let listings = parse_listings(CARDS_WITH_JSON_LD, BASE, "bayut", 10).unwrap();
        assert_eq!(listings.len(), 2);
        let first = &listings[0];
        assert_eq!(first.title, "Marina Gate 2BR");
        assert_eq!(first.location, "Dubai Marina");
        assert_eq!(first.bedrooms, Some(2));
        assert_eq!(first.bathrooms, Some(3));
        assert_eq!(first.area_sqft, Some(1250));
        assert_eq!(first.price, "AED 150,000 yearly");
        assert_eq!(first.price_aed, Some(150_000));
        assert_eq!(first.description, "2 Bed | 3 Bath | 1250 sqft");
    }

    #[test]
    fn card_text_fallbacks() {
        let listings = parse_listings(CARDS_WITH_JSON_LD, BASE, "bayut", 10).unwrap();
        let second = &listings[1];
        assert_eq!(second.title, "Studio in JLT");
        assert_eq!(second.link, "https://www.bayut.com/property/details-2.html");
        assert_eq!(second.location, "JLT Cluster D");
        assert_eq!(second.price_aed, Some(48_000));
        assert_eq!(second.bedrooms, Some(0));
        assert_eq!(second.bathrooms, Some(1));
        assert_eq!(second.area_sqft, Some(420));
        assert_eq!(
            second.image.as_deref(),
            Some("https://www.bayut.com/thumbs/2.jpg")
        );
        assert_eq!(second.source, "bayut");
    }

    #[test]
    fn limit_caps_results() {
        let listings = parse_listings(CARDS_WITH_JSON_LD, BASE, "bayut", 1).unwrap();
        assert_eq!(listings.len(), 1);
    }

    #[test]
    fn nested_card_classes_do_not_duplicate() {
        let html = r#"<div class="result-card"><div class="card-body">
            <a href="/p/1"><h3>Villa in Arabian Ranches</h3></a></div></div>"#;
        let listings = parse_listings(html, BASE, "bayut", 10).unwrap();
        assert_eq!(listings.len(), 1);
    }

    #[test]
    fn cards_without_title_are_skipped() {
        let html = r#"<article data-testid="property-card"><a href="/p/1"></a></article>"#;
        assert!(parse_listings(html, BASE, "bayut", 10).unwrap().is_empty());
    }

    #[test]
    fn json_ld_graph_without_cards() {
        let html = r#"<script type="application/ld+json">
        {"@context": "https://schema.org", "@graph": [
          {"@type": "ItemList", "itemListElement": [
            {"@type": "ListItem", "item": {"url": "/p/9", "name": "Office in DIFC",
             "offers": {"price": 320000}}}
          ]}
        ]}</script>"#;
        let listings = parse_listings(html, "https://findproperties.ae", "find-properties", 10).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].link, "https://findproperties.ae/p/9");
        assert_eq!(listings[0].price, "AED 320000");
        assert_eq!(listings[0].price_aed, Some(320_000));
    }

    #[test]
    fn broken_json_ld_is_ignored() {
        let html = r#"<script type="application/ld+json">{not json</script>
            <article data-testid="property-card"><a href="/p/1"><h2>Townhouse</h2></a></article>"#;
        let listings = parse_listings(html, BASE, "bayut", 10).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].title, "Townhouse");
    }

    #[test]
    fn empty_page_yields_no_listings() {
        assert!(parse_listings("<html></html>", BASE, "bayut", 10).unwrap().is_empty());
    }

    #[test]
    fn invalid_base_url_is_an_error() {
        assert!(parse_listings("<html></html>", "not a url", "bayut", 10).is_err());
    }
}
