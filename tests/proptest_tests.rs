use std::collections::BTreeSet;
use std::time::Duration;

use proptest::prelude::*;

use mcp_uae_realty::adapters::cache::memory_cache::MemoryCache;
use mcp_uae_realty::domain::grammar::SiteGrammar;
use mcp_uae_realty::domain::listing::{PropertyListing, dedupe, sort_listings};
use mcp_uae_realty::domain::property_type::{CommercialType, PropertyType, ResidentialType};
use mcp_uae_realty::domain::render::decode_url;
use mcp_uae_realty::domain::resolver::{QueryResolver, render_filter, resolve};
use mcp_uae_realty::domain::search_filter::{
    Bathroom, Bedroom, Intent, PartialSearchFilter, SearchFilter,
};
use mcp_uae_realty::ports::cache::PageCache;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

const RESIDENTIAL: [ResidentialType; 9] = [
    ResidentialType::Apartment,
    ResidentialType::Townhouse,
    ResidentialType::VillaCompound,
    ResidentialType::Land,
    ResidentialType::Building,
    ResidentialType::Villa,
    ResidentialType::Penthouse,
    ResidentialType::HotelApartment,
    ResidentialType::Floor,
];

const COMMERCIAL: [CommercialType; 14] = [
    CommercialType::Office,
    CommercialType::Warehouse,
    CommercialType::Villa,
    CommercialType::Land,
    CommercialType::Building,
    CommercialType::IndustrialLand,
    CommercialType::Showroom,
    CommercialType::Shop,
    CommercialType::LabourCamp,
    CommercialType::BulkUnit,
    CommercialType::Floor,
    CommercialType::Factory,
    CommercialType::MixedUseLand,
    CommercialType::Other,
];

const VOCABULARY: &[&str] = &[
    "apartment",
    "flat",
    "villa",
    "townhouse",
    "penthouse",
    "office",
    "shop",
    "warehouse",
    "land",
    "building",
    "floor",
    "commercial",
    "retail",
    "for rent",
    "for sale",
    "in jvc",
    "2 bed",
    "under 90k",
    "or",
    "and",
];

fn arb_types() -> impl Strategy<Value = Vec<PropertyType>> {
    prop_oneof![
        prop::sample::subsequence(RESIDENTIAL.to_vec(), 0..=4).prop_map(|types| types
            .into_iter()
            .map(PropertyType::Residential)
            .collect()),
        prop::sample::subsequence(COMMERCIAL.to_vec(), 0..=4).prop_map(|types| types
            .into_iter()
            .map(PropertyType::Commercial)
            .collect()),
    ]
}

fn arb_filter() -> impl Strategy<Value = SearchFilter> {
    (
        any::<bool>(),
        arb_types(),
        prop::collection::btree_set(0..12_u32, 0..4),
        prop::collection::btree_set(1..9_u32, 0..3),
        prop::option::of(1..10_000_000_u64),
        prop::option::of(1..10_000_000_u64),
        prop::option::of(100..20_000_u64),
        prop::option::of("[a-z]{3,10}( [a-z]{3,10})?"),
    )
        .prop_map(
            |(sale, property_types, beds, baths, price_min, price_max, area_min, location)| {
                SearchFilter {
                    intent: if sale { Intent::Sale } else { Intent::Rent },
                    property_types,
                    bedrooms: beds.into_iter().map(Bedroom::from_count).collect(),
                    bathrooms: baths.into_iter().filter_map(Bathroom::from_count).collect(),
                    price_min,
                    price_max,
                    area_min,
                    area_max: None,
                    location,
                }
            },
        )
}

fn arb_listing() -> impl Strategy<Value = PropertyListing> {
    (
        "[A-Za-z]{1,12}( [A-Za-z]{1,12}){0,2}",
        prop::option::of(1..5_000_000_u64),
        prop::sample::select(vec!["Dubai Marina", "Business Bay", "Al Barsha"]),
    )
        .prop_map(|(title, price, location)| PropertyListing {
            title,
            price: price.map(|p| format!("AED {p}")).unwrap_or_default(),
            price_aed: price,
            location: location.to_string(),
            bedrooms: None,
            bathrooms: None,
            area_sqft: None,
            link: "https://example.com/p".into(),
            image: None,
            description: String::new(),
            source: "test".into(),
        })
}

fn path_segments(url: &str) -> Vec<String> {
    url::Url::parse(url)
        .unwrap()
        .path_segments()
        .unwrap()
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Rendering properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_single_type_uses_its_slug(index in 0..RESIDENTIAL.len(), sale in any::<bool>()) {
        let grammar = SiteGrammar::bayut();
        let property_type = PropertyType::Residential(RESIDENTIAL[index]);
        let filter = SearchFilter {
            intent: if sale { Intent::Sale } else { Intent::Rent },
            property_types: vec![property_type],
            ..SearchFilter::default()
        };
        let url = render_filter(&filter, &grammar);
        let segments = path_segments(&url);
        prop_assert_eq!(segments[1].as_str(), grammar.slug(property_type).unwrap());
        prop_assert!(!url.contains('?'));
    }

    #[test]
    fn prop_highest_priority_type_takes_the_path(types in arb_types()) {
        prop_assume!(!types.is_empty());
        let grammar = SiteGrammar::bayut();
        let filter = SearchFilter {
            property_types: types.clone(),
            ..SearchFilter::default()
        };
        let primary = types
            .iter()
            .min_by_key(|t| grammar.priority(**t).unwrap())
            .copied()
            .unwrap();
        let url = render_filter(&filter, &grammar);
        let segments = path_segments(&url);
        prop_assert_eq!(segments[1].as_str(), grammar.slug(primary).unwrap());
        if types.len() > 1 {
            prop_assert!(url.contains("categories="));
        }
    }

    #[test]
    fn prop_rendered_url_is_stable_under_decoding(filter in arb_filter(), use_bayut in any::<bool>()) {
        let grammar = if use_bayut {
            SiteGrammar::bayut()
        } else {
            SiteGrammar::find_properties()
        };
        let url = render_filter(&filter, &grammar);
        let decoded = decode_url(&url, &grammar);
        prop_assert!(decoded.is_some(), "could not decode {}", url);
        prop_assert_eq!(render_filter(&decoded.unwrap(), &grammar), url);
    }

    #[test]
    fn prop_large_bedroom_counts_render_as_eight_plus(n in 8..1_000_000_u32) {
        prop_assert_eq!(Bedroom::from_count(n), Bedroom::EightPlus);
        let url = resolve(&format!("{n} bedroom villa for sale"), &SiteGrammar::bayut());
        prop_assert_eq!(url, "https://www.bayut.com/for-sale/8+-bedroom-villas/uae/");
    }
}

// ---------------------------------------------------------------------------
// Resolution properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_any_text_resolves_on_the_site(query in any::<String>()) {
        for grammar in SiteGrammar::builtin() {
            let url = resolve(&query, &grammar);
            prop_assert!(url.starts_with(grammar.base()), "{} -> {}", query, url);
        }
    }

    #[test]
    fn prop_families_never_mix(words in prop::collection::vec(prop::sample::select(VOCABULARY), 1..8)) {
        let query = words.join(" ");
        if let Ok(filter) = QueryResolver::default().parse(&query, PartialSearchFilter::default()) {
            let families: BTreeSet<_> = filter.property_types.iter().map(|t| t.family()).collect();
            prop_assert!(families.len() <= 1, "{} mixed families: {:?}", query, filter.property_types);
        }
    }
}

// ---------------------------------------------------------------------------
// Listing merge properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_dedupe_never_grows_and_is_idempotent(
        listings in prop::collection::vec(arb_listing(), 0..30),
    ) {
        let once = dedupe(listings.clone());
        prop_assert!(once.len() <= listings.len());
        let twice = dedupe(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_sort_puts_priced_first(mut listings in prop::collection::vec(arb_listing(), 0..30)) {
        sort_listings(&mut listings);
        let first_unpriced = listings.iter().position(|l| !l.has_price());
        if let Some(pos) = first_unpriced {
            prop_assert!(listings[pos..].iter().all(|l| !l.has_price()));
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryCache properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_set_then_get_returns_value(
        key in "[a-z]{1,20}",
        value in "[a-zA-Z0-9]{1,100}",
    ) {
        let cache = MemoryCache::new(100);
        cache.set(&key, &value, Duration::from_secs(3600));
        let result = cache.get(&key);
        prop_assert_eq!(result, Some(value));
    }

    #[test]
    fn prop_capacity_respected(
        n in 1..200_usize,
    ) {
        let capacity = 50;
        let cache = MemoryCache::new(capacity);
        for i in 0..n {
            cache.set(&format!("k{i}"), &format!("v{i}"), Duration::from_secs(3600));
        }
        let found = (0..n)
            .filter(|i| cache.get(&format!("k{i}")).is_some())
            .count();
        prop_assert!(found <= capacity, "found {found} > capacity {capacity}");
    }
}
