use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::property_type::{CommercialType, PropertyType, ResidentialType};
use crate::domain::resolver::ResolveError;
use crate::domain::search_filter::Intent;
use crate::error::{RealtyError, Result};

/// URL grammar of one listing site. Adding a site means adding one of these;
/// the resolver itself is site-agnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteGrammar {
    pub id: String,
    pub base_url: String,
    pub intent_slugs: BTreeMap<Intent, String>,
    #[serde(default)]
    pub residential_priority: BTreeMap<ResidentialType, u8>,
    #[serde(default)]
    pub residential_slugs: BTreeMap<ResidentialType, String>,
    #[serde(default)]
    pub commercial_priority: BTreeMap<CommercialType, u8>,
    #[serde(default)]
    pub commercial_slugs: BTreeMap<CommercialType, String>,
    #[serde(default = "default_location")]
    pub default_location: String,
    /// When false every URL uses `default_location`, whatever the query says.
    #[serde(default)]
    pub honor_location: bool,
    /// Path token used when no property type applies.
    #[serde(default = "default_generic_slug")]
    pub generic_slug: String,
    #[serde(default = "default_true")]
    pub trailing_slash: bool,
    /// Set for sites that take every filter as a query parameter on one
    /// search path. `None` means the `/{intent}/{type}/{location}` path shape.
    #[serde(default)]
    pub query_layout: Option<QueryLayout>,
}

/// Parameter names for a query-string search page such as
/// `/en/search?c=2&l=dubai&t=apartment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLayout {
    pub search_path: String,
    #[serde(default = "default_intent_key")]
    pub intent_key: String,
    #[serde(default = "default_location_key")]
    pub location_key: String,
    #[serde(default = "default_type_key")]
    pub type_key: String,
    #[serde(default = "default_bedrooms_key")]
    pub bedrooms_key: String,
}

impl QueryLayout {
    /// Search path without surrounding slashes.
    pub fn path(&self) -> &str {
        self.search_path.trim_matches('/')
    }
}

fn default_intent_key() -> String {
    "purpose".into()
}

fn default_location_key() -> String {
    "location".into()
}

fn default_type_key() -> String {
    "type".into()
}

fn default_bedrooms_key() -> String {
    "beds".into()
}

fn default_location() -> String {
    "uae".into()
}

fn default_generic_slug() -> String {
    "property".into()
}

fn default_true() -> bool {
    true
}

impl SiteGrammar {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(RealtyError::Config("site id must not be empty".into()));
        }
        let parsed = Url::parse(&self.base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RealtyError::Config(format!(
                "site '{}' base_url must be http(s), got '{}'",
                self.id,
                parsed.scheme()
            )));
        }
        if self.intent_slugs.values().any(|s| s.trim().is_empty()) {
            return Err(RealtyError::Config(format!(
                "site '{}' has an empty intent slug",
                self.id
            )));
        }
        if let Some(layout) = &self.query_layout {
            let keys = [
                &layout.intent_key,
                &layout.location_key,
                &layout.type_key,
                &layout.bedrooms_key,
            ];
            if layout.path().is_empty() || keys.iter().any(|k| k.trim().is_empty()) {
                return Err(RealtyError::Config(format!(
                    "site '{}' query layout needs a search path and non-empty keys",
                    self.id
                )));
            }
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn root_url(&self) -> String {
        format!("{}/", self.base())
    }

    pub fn intent_slug(&self, intent: Intent) -> std::result::Result<&str, ResolveError> {
        self.intent_slugs
            .get(&intent)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(ResolveError::MissingIntentSlug { intent })
    }

    pub fn intent_for_slug(&self, slug: &str) -> Option<Intent> {
        self.intent_slugs
            .iter()
            .find(|(_, s)| s.as_str() == slug)
            .map(|(intent, _)| *intent)
    }

    /// `None` when the site has no category for this type.
    pub fn priority(&self, property_type: PropertyType) -> Option<u8> {
        match property_type {
            PropertyType::Residential(t) => self.residential_priority.get(&t).copied(),
            PropertyType::Commercial(t) => self.commercial_priority.get(&t).copied(),
        }
    }

    pub fn slug(&self, property_type: PropertyType) -> Option<&str> {
        let slug = match property_type {
            PropertyType::Residential(t) => self.residential_slugs.get(&t),
            PropertyType::Commercial(t) => self.commercial_slugs.get(&t),
        };
        slug.map(String::as_str)
    }

    pub fn type_for_slug(&self, slug: &str) -> Option<PropertyType> {
        self.residential_slugs
            .iter()
            .find(|(_, s)| s.as_str() == slug)
            .map(|(t, _)| PropertyType::Residential(*t))
            .or_else(|| {
                self.commercial_slugs
                    .iter()
                    .find(|(_, s)| s.as_str() == slug)
                    .map(|(t, _)| PropertyType::Commercial(*t))
            })
    }

    pub fn location_segment(&self, location: Option<&str>) -> String {
        if self.honor_location
            && let Some(slug) = location.map(slugify).filter(|s| !s.is_empty())
        {
            return slug;
        }
        self.default_location.clone()
    }

    pub fn bayut() -> Self {
        use CommercialType as C;
        use ResidentialType as R;

        let residential = [
            (R::Apartment, "apartments"),
            (R::Townhouse, "townhouses"),
            (R::VillaCompound, "villa-compound"),
            (R::Land, "residential-plots"),
            (R::Building, "residential-building"),
            (R::Villa, "villas"),
            (R::Penthouse, "penthouse"),
            (R::HotelApartment, "hotel-apartments"),
            (R::Floor, "residential-floors"),
        ];
        let commercial = [
            (C::Office, "offices"),
            (C::Warehouse, "warehouses"),
            (C::Villa, "commercial-villas"),
            (C::Land, "commercial-plots"),
            (C::Building, "commercial-buildings"),
            (C::IndustrialLand, "industrial-land"),
            (C::Showroom, "showrooms"),
            (C::Shop, "shops"),
            (C::LabourCamp, "labour-camps"),
            (C::BulkUnit, "bulk-units"),
            (C::Floor, "commercial-floors"),
            (C::Factory, "factories"),
            (C::MixedUseLand, "mixed-use-land"),
            (C::Other, "commercial"),
        ];

        let (residential_priority, residential_slugs) = ranked(&residential);
        let (commercial_priority, commercial_slugs) = ranked(&commercial);

        Self {
            id: "bayut".into(),
            base_url: "https://www.bayut.com".into(),
            intent_slugs: intents("to-rent", "for-sale"),
            residential_priority,
            residential_slugs,
            commercial_priority,
            commercial_slugs,
            default_location: "uae".into(),
            honor_location: false,
            generic_slug: "property".into(),
            trailing_slash: true,
            query_layout: None,
        }
    }

    pub fn find_properties() -> Self {
        use CommercialType as C;
        use ResidentialType as R;

        let residential = [
            (R::Apartment, "apartments"),
            (R::Villa, "villas"),
            (R::Townhouse, "townhouses"),
            (R::Penthouse, "penthouses"),
        ];
        let commercial = [
            (C::Office, "offices"),
            (C::Warehouse, "warehouses"),
            (C::Shop, "shops"),
            (C::Other, "commercial"),
        ];

        let (residential_priority, residential_slugs) = ranked(&residential);
        let (commercial_priority, commercial_slugs) = ranked(&commercial);

        Self {
            id: "find-properties".into(),
            base_url: "https://findproperties.ae".into(),
            intent_slugs: intents("for-rent", "for-sale"),
            residential_priority,
            residential_slugs,
            commercial_priority,
            commercial_slugs,
            default_location: "dubai".into(),
            honor_location: true,
            generic_slug: "properties".into(),
            trailing_slash: false,
            query_layout: None,
        }
    }

    /// Query-string grammar: `/en/search?c=2&l=dubai&t=apartment&bdr=2`.
    pub fn property_finder() -> Self {
        use CommercialType as C;
        use ResidentialType as R;

        let residential = [
            (R::Apartment, "apartment"),
            (R::Villa, "villa"),
            (R::Townhouse, "townhouse"),
            (R::Penthouse, "penthouse"),
            (R::HotelApartment, "hotel-apartment"),
            (R::Land, "land"),
        ];
        let commercial = [
            (C::Office, "office"),
            (C::Shop, "shop"),
            (C::Warehouse, "warehouse"),
            (C::Showroom, "showroom"),
            (C::Other, "commercial"),
        ];

        let (residential_priority, residential_slugs) = ranked(&residential);
        let (commercial_priority, commercial_slugs) = ranked(&commercial);

        Self {
            id: "property-finder".into(),
            base_url: "https://www.propertyfinder.ae".into(),
            intent_slugs: intents("2", "1"),
            residential_priority,
            residential_slugs,
            commercial_priority,
            commercial_slugs,
            default_location: "dubai".into(),
            honor_location: true,
            generic_slug: "properties".into(),
            trailing_slash: false,
            query_layout: Some(QueryLayout {
                search_path: "en/search".into(),
                intent_key: "c".into(),
                location_key: "l".into(),
                type_key: "t".into(),
                bedrooms_key: "bdr".into(),
            }),
        }
    }

    pub fn builtin() -> Vec<Self> {
        vec![Self::bayut(), Self::find_properties(), Self::property_finder()]
    }
}

/// Priority follows table order, starting at 1.
fn ranked<T: Ord + Copy>(table: &[(T, &str)]) -> (BTreeMap<T, u8>, BTreeMap<T, String>) {
    let mut priority = BTreeMap::new();
    let mut slugs = BTreeMap::new();
    for (rank, (t, slug)) in (1u8..).zip(table) {
        priority.insert(*t, rank);
        slugs.insert(*t, (*slug).to_string());
    }
    (priority, slugs)
}

fn intents(rent: &str, sale: &str) -> BTreeMap<Intent, String> {
    BTreeMap::from([(Intent::Rent, rent.into()), (Intent::Sale, sale.into())])
}

/// Lowercase ASCII path token: runs of anything else collapse to one `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
