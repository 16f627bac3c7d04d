use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::property_type::{CommercialType, Family, PropertyType, TypeMention, find_mentions};
use crate::domain::resolver::ResolveError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    #[default]
    Rent,
    Sale,
}

/// Bedroom count. Counts above seven collapse into `EightPlus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Bedroom {
    Studio,
    Count(u8),
    EightPlus,
}

impl Bedroom {
    pub fn from_count(n: u32) -> Self {
        match n {
            0 => Self::Studio,
            // 1..=7 fits in u8
            1..=7 => Self::Count(u8::try_from(n).unwrap_or(7)),
            _ => Self::EightPlus,
        }
    }

    pub fn token(self) -> String {
        match self {
            Self::Studio => "studio".into(),
            Self::Count(n) => n.to_string(),
            Self::EightPlus => "8+".into(),
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_lowercase();
        match token.as_str() {
            "studio" => Some(Self::Studio),
            "8+" => Some(Self::EightPlus),
            other => other.parse::<u32>().ok().map(Self::from_count),
        }
    }
}

impl From<Bedroom> for String {
    fn from(value: Bedroom) -> Self {
        value.token()
    }
}

impl TryFrom<String> for Bedroom {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::from_token(&value).ok_or_else(|| format!("invalid bedroom value '{value}'"))
    }
}

/// Bathroom count. Counts above five collapse into `SixPlus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Bathroom {
    Count(u8),
    SixPlus,
}

impl Bathroom {
    /// `None` for zero, which no listing site accepts.
    pub fn from_count(n: u32) -> Option<Self> {
        match n {
            0 => None,
            1..=5 => Some(Self::Count(u8::try_from(n).unwrap_or(5))),
            _ => Some(Self::SixPlus),
        }
    }

    pub fn token(self) -> String {
        match self {
            Self::Count(n) => n.to_string(),
            Self::SixPlus => "6+".into(),
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        if token == "6+" {
            return Some(Self::SixPlus);
        }
        token.parse::<u32>().ok().and_then(Self::from_count)
    }
}

impl From<Bathroom> for String {
    fn from(value: Bathroom) -> Self {
        value.token()
    }
}

impl TryFrom<String> for Bathroom {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::from_token(&value).ok_or_else(|| format!("invalid bathroom value '{value}'"))
    }
}

/// The resolved form of a query, ready for rendering against a site grammar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub intent: Intent,
    /// Order of first mention, no duplicates, one family only.
    pub property_types: Vec<PropertyType>,
    pub bedrooms: BTreeSet<Bedroom>,
    pub bathrooms: BTreeSet<Bathroom>,
    pub price_min: Option<u64>,
    pub price_max: Option<u64>,
    pub area_min: Option<u64>,
    pub area_max: Option<u64>,
    pub location: Option<String>,
}

impl SearchFilter {
    pub fn push_type(&mut self, property_type: PropertyType) {
        if !self.property_types.contains(&property_type) {
            self.property_types.push(property_type);
        }
    }

    pub fn family(&self) -> Option<Family> {
        self.property_types.first().map(|t| t.family())
    }
}

/// Best-effort fields from one extraction step. Everything is optional and
/// property types are still family-neutral.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialSearchFilter {
    pub intent: Option<Intent>,
    pub family_hint: Option<Family>,
    pub mentions: Vec<TypeMention>,
    pub bedrooms: BTreeSet<Bedroom>,
    pub bathrooms: BTreeSet<Bathroom>,
    pub price_min: Option<u64>,
    pub price_max: Option<u64>,
    pub area_min: Option<u64>,
    pub area_max: Option<u64>,
    pub location: Option<String>,
}

impl PartialSearchFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fill every unset field of `self` from `other`. Mentions from `other`
    /// are appended after the ones already present.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.intent = self.intent.or(other.intent);
        self.family_hint = self.family_hint.or(other.family_hint);
        for mention in other.mentions {
            if !self.mentions.contains(&mention) {
                self.mentions.push(mention);
            }
        }
        if self.bedrooms.is_empty() {
            self.bedrooms = other.bedrooms;
        }
        if self.bathrooms.is_empty() {
            self.bathrooms = other.bathrooms;
        }
        if self.price_min.is_none() && self.price_max.is_none() {
            self.price_min = other.price_min;
            self.price_max = other.price_max;
        }
        if self.area_min.is_none() && self.area_max.is_none() {
            self.area_min = other.area_min;
            self.area_max = other.area_max;
        }
        self.location = self.location.or(other.location);
        self
    }

    /// Pick the family, resolve every mention inside it and produce the
    /// final filter.
    pub fn into_filter(self) -> Result<SearchFilter, ResolveError> {
        if self.is_empty() {
            return Err(ResolveError::ExtractionFailure);
        }

        let family = self
            .family_hint
            .or_else(|| self.mentions.iter().find_map(|m| m.home_family()))
            .unwrap_or(Family::Residential);

        let mut filter = SearchFilter {
            intent: self.intent.unwrap_or_default(),
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            price_min: self.price_min,
            price_max: self.price_max,
            area_min: self.area_min,
            area_max: self.area_max,
            location: self.location,
            ..SearchFilter::default()
        };

        for mention in self.mentions {
            match mention.in_family(family) {
                Some(t) => filter.push_type(t),
                None => debug!(?mention, ?family, "Dropping type outside the query family"),
            }
        }

        if filter.property_types.is_empty() && family == Family::Commercial {
            filter.push_type(PropertyType::Commercial(CommercialType::Other));
        }

        if let (Some(min), Some(max)) = (filter.price_min, filter.price_max)
            && min > max
        {
            debug!(min, max, "Swapping inverted price bounds");
            filter.price_min = Some(max);
            filter.price_max = Some(min);
        }
        if let (Some(min), Some(max)) = (filter.area_min, filter.area_max)
            && min > max
        {
            filter.area_min = Some(max);
            filter.area_max = Some(min);
        }

        Ok(filter)
    }

    /// Decode the reply of an external extraction service. Anything that is
    /// not a JSON object with known keys decodes to an empty filter, and
    /// values outside the known vocabulary are dropped one by one.
    pub fn from_model_output(text: &str) -> Self {
        let Some(body) = json_body(text) else {
            warn!("Extractor reply has no JSON object, ignoring it");
            return Self::default();
        };
        let raw: ModelOutput = match serde_json::from_str(body) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Extractor reply failed schema validation, ignoring it");
                return Self::default();
            }
        };
        raw.into_partial()
    }
}

fn json_body(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelOutput {
    #[serde(default, alias = "purpose", alias = "purpose_property")]
    intent: Option<Value>,
    #[serde(default, alias = "property_type", alias = "types")]
    property_types: Option<Value>,
    #[serde(default, alias = "beds")]
    bedrooms: Option<Value>,
    #[serde(default, alias = "baths")]
    bathrooms: Option<Value>,
    #[serde(default, alias = "min_price")]
    price_min: Option<Value>,
    #[serde(default, alias = "max_price")]
    price_max: Option<Value>,
    #[serde(default, alias = "area_sqft_min")]
    area_min: Option<Value>,
    #[serde(default, alias = "area_sqft_max")]
    area_max: Option<Value>,
    #[serde(default)]
    location: Option<Value>,
}

impl ModelOutput {
    fn into_partial(self) -> PartialSearchFilter {
        let mut partial = PartialSearchFilter {
            intent: self.intent.as_ref().and_then(decode_intent),
            ..PartialSearchFilter::default()
        };

        for name in scalars(self.property_types.as_ref()) {
            let name = name.to_lowercase().replace('-', " ");
            if name.contains("commercial") || name.contains("commerical") {
                partial.family_hint = Some(Family::Commercial);
            }
            for mention in find_mentions(&name) {
                if !partial.mentions.contains(&mention) {
                    partial.mentions.push(mention);
                }
            }
        }

        partial.bedrooms = scalars(self.bedrooms.as_ref())
            .iter()
            .filter_map(|s| Bedroom::from_token(s))
            .collect();
        partial.bathrooms = scalars(self.bathrooms.as_ref())
            .iter()
            .filter_map(|s| Bathroom::from_token(s))
            .collect();
        partial.price_min = self.price_min.as_ref().and_then(decode_amount);
        partial.price_max = self.price_max.as_ref().and_then(decode_amount);
        partial.area_min = self.area_min.as_ref().and_then(decode_amount);
        partial.area_max = self.area_max.as_ref().and_then(decode_amount);
        partial.location = self
            .location
            .as_ref()
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        partial
    }
}

fn decode_intent(value: &Value) -> Option<Intent> {
    let text = value.as_str()?.to_lowercase();
    if text.contains("rent") || text.contains("lease") {
        Some(Intent::Rent)
    } else if text.contains("sale") || text.contains("buy") {
        Some(Intent::Sale)
    } else {
        None
    }
}

/// Accepts a string, a number, or an array of either.
fn scalars(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s.split(',').map(|p| p.trim().to_string()).collect(),
        Some(Value::Number(n)) => vec![n.to_string()],
        Some(Value::Array(items)) => items
            .iter()
            .flat_map(|item| scalars(Some(item)))
            .collect(),
        _ => Vec::new(),
    }
}

fn decode_amount(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.replace(',', "").trim().parse().ok(),
        _ => None,
    }
}
