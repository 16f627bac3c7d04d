use std::collections::BTreeSet;

use tracing::debug;
use url::Url;
use url::form_urlencoded::byte_serialize;

use crate::domain::grammar::{QueryLayout, SiteGrammar};
use crate::domain::property_type::PropertyType;
use crate::domain::resolver::ResolveError;
use crate::domain::search_filter::{Bathroom, Bedroom, SearchFilter};

/// Render `filter` as a typed search URL: the highest-priority type takes the
/// path, the others go to `categories` in priority order.
pub fn render(filter: &SearchFilter, grammar: &SiteGrammar) -> Result<String, ResolveError> {
    let intent = grammar.intent_slug(filter.intent)?;

    let mut ranked: Vec<(u8, PropertyType)> = filter
        .property_types
        .iter()
        .filter_map(|t| {
            let priority = grammar.priority(*t);
            if priority.is_none() {
                debug!(site = %grammar.id, property_type = %t, "Site has no category for type");
            }
            priority.map(|p| (p, *t))
        })
        .collect();
    if ranked.is_empty() {
        return Err(ResolveError::NoMatchingType);
    }
    // Stable: equal priorities keep mention order.
    ranked.sort_by_key(|(priority, _)| *priority);

    let mut slugs = ranked
        .iter()
        .map(|(_, t)| {
            grammar.slug(*t).ok_or_else(|| ResolveError::MissingSlug {
                site: grammar.id.clone(),
                property_type: *t,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let primary = slugs.remove(0);

    if let Some(layout) = &grammar.query_layout {
        return Ok(assemble_query(grammar, layout, intent, Some(primary), filter, &slugs));
    }
    let segment = type_segment(&filter.bedrooms, primary);
    Ok(assemble(grammar, intent, &segment, filter, &slugs))
}

/// Render `filter` on the site's untyped path, keeping its query parameters.
pub fn render_generic(filter: &SearchFilter, grammar: &SiteGrammar) -> Result<String, ResolveError> {
    let intent = grammar.intent_slug(filter.intent)?;
    if let Some(layout) = &grammar.query_layout {
        return Ok(assemble_query(grammar, layout, intent, None, filter, &[]));
    }
    Ok(assemble(grammar, intent, &grammar.generic_slug, filter, &[]))
}

fn assemble(
    grammar: &SiteGrammar,
    intent: &str,
    segment: &str,
    filter: &SearchFilter,
    categories: &[&str],
) -> String {
    let location = grammar.location_segment(filter.location.as_deref());
    let mut url = format!("{}/{intent}/{segment}/{location}", grammar.base());
    if grammar.trailing_slash {
        url.push('/');
    }
    let query = encode_pairs(&filter_pairs(filter, categories));
    if !query.is_empty() {
        url.push('?');
        url.push_str(&query);
    }
    url
}

/// Intent, location, type and bedrooms lead, then the shared filter parameters.
fn assemble_query(
    grammar: &SiteGrammar,
    layout: &QueryLayout,
    intent: &str,
    primary: Option<&str>,
    filter: &SearchFilter,
    categories: &[&str],
) -> String {
    let mut pairs: Vec<(&str, String)> = vec![
        (layout.intent_key.as_str(), intent.to_string()),
        (
            layout.location_key.as_str(),
            grammar.location_segment(filter.location.as_deref()),
        ),
    ];
    if let Some(slug) = primary {
        pairs.push((layout.type_key.as_str(), slug.to_string()));
    }
    if !filter.bedrooms.is_empty() {
        let beds = filter
            .bedrooms
            .iter()
            .map(|b| b.token())
            .collect::<Vec<_>>()
            .join(",");
        pairs.push((layout.bedrooms_key.as_str(), beds));
    }
    pairs.extend(filter_pairs(filter, categories));
    format!("{}/{}?{}", grammar.base(), layout.path(), encode_pairs(&pairs))
}

fn type_segment(bedrooms: &BTreeSet<Bedroom>, slug: &str) -> String {
    if bedrooms.is_empty() {
        return slug.to_string();
    }
    if bedrooms.len() == 1 && bedrooms.contains(&Bedroom::Studio) {
        return format!("studio-{slug}");
    }
    let tokens = bedrooms
        .iter()
        .map(|b| b.token())
        .collect::<Vec<_>>()
        .join("%2C");
    format!("{tokens}-bedroom-{slug}")
}

/// Parameters in fixed order: categories, price, baths, area.
fn filter_pairs(filter: &SearchFilter, categories: &[&str]) -> Vec<(&'static str, String)> {
    let mut pairs: Vec<(&'static str, String)> = Vec::new();
    if !categories.is_empty() {
        pairs.push(("categories", categories.join(",")));
    }
    if let Some(min) = filter.price_min {
        pairs.push(("price_min", min.to_string()));
    }
    if let Some(max) = filter.price_max {
        pairs.push(("price_max", max.to_string()));
    }
    if !filter.bathrooms.is_empty() {
        let baths = filter
            .bathrooms
            .iter()
            .map(|b| b.token())
            .collect::<Vec<_>>()
            .join(",");
        pairs.push(("baths_in", baths));
    }
    if let Some(min) = filter.area_min {
        pairs.push(("area_min", min.to_string()));
    }
    if let Some(max) = filter.area_max {
        pairs.push(("area_max", max.to_string()));
    }
    pairs
}

fn encode_pairs(pairs: &[(&str, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{key}={}", byte_serialize(value.as_bytes()).collect::<String>()))
        .collect::<Vec<_>>()
        .join("&")
}

/// Read a URL produced by [`render`] back into a filter. `None` when the URL
/// does not belong to `grammar` or does not follow its path shape.
pub fn decode_url(url: &str, grammar: &SiteGrammar) -> Option<SearchFilter> {
    let parsed = Url::parse(url).ok()?;
    let base = Url::parse(grammar.base()).ok()?;
    if parsed.host_str() != base.host_str() {
        return None;
    }

    let base_depth = base
        .path_segments()
        .map_or(0, |segments| segments.filter(|s| !s.is_empty()).count());
    let segments: Vec<&str> = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .skip(base_depth)
        .collect();

    let mut filter = match &grammar.query_layout {
        Some(layout) => decode_layout(&parsed, &segments, layout, grammar)?,
        None => decode_path(&segments, grammar)?,
    };

    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "categories" => {
                for slug in value.split(',') {
                    if let Some(t) = grammar.type_for_slug(slug)
                        && filter.family().is_none_or(|f| f == t.family())
                    {
                        filter.push_type(t);
                    }
                }
            }
            "price_min" => filter.price_min = value.parse().ok(),
            "price_max" => filter.price_max = value.parse().ok(),
            "area_min" => filter.area_min = value.parse().ok(),
            "area_max" => filter.area_max = value.parse().ok(),
            "baths_in" => {
                filter.bathrooms = value.split(',').filter_map(Bathroom::from_token).collect();
            }
            _ => {}
        }
    }

    Some(filter)
}

fn decode_path(segments: &[&str], grammar: &SiteGrammar) -> Option<SearchFilter> {
    let [intent_slug, type_segment, location] = segments else {
        return None;
    };

    let mut filter = SearchFilter {
        intent: grammar.intent_for_slug(intent_slug)?,
        ..SearchFilter::default()
    };

    if *type_segment != grammar.generic_slug {
        let (bedrooms, slug) = split_type_segment(type_segment);
        filter.bedrooms = bedrooms;
        filter.push_type(grammar.type_for_slug(slug)?);
    }

    if grammar.honor_location && *location != grammar.default_location {
        filter.location = Some((*location).to_string());
    }
    Some(filter)
}

fn decode_layout(
    parsed: &Url,
    segments: &[&str],
    layout: &QueryLayout,
    grammar: &SiteGrammar,
) -> Option<SearchFilter> {
    let expected: Vec<&str> = layout.path().split('/').filter(|s| !s.is_empty()).collect();
    if segments != expected.as_slice() {
        return None;
    }

    let mut intent = None;
    let mut filter = SearchFilter::default();
    for (key, value) in parsed.query_pairs() {
        if key == layout.intent_key.as_str() {
            intent = grammar.intent_for_slug(&value);
        } else if key == layout.location_key.as_str() {
            if grammar.honor_location && value != grammar.default_location.as_str() {
                filter.location = Some(value.into_owned());
            }
        } else if key == layout.type_key.as_str() {
            filter.push_type(grammar.type_for_slug(&value)?);
        } else if key == layout.bedrooms_key.as_str() {
            filter.bedrooms = value.split(',').filter_map(Bedroom::from_token).collect();
        }
    }
    filter.intent = intent?;
    Some(filter)
}

fn split_type_segment(segment: &str) -> (BTreeSet<Bedroom>, &str) {
    if let Some((tokens, slug)) = segment.split_once("-bedroom-") {
        let bedrooms = tokens
            .replace("%2c", "%2C")
            .split("%2C")
            .filter_map(Bedroom::from_token)
            .collect();
        return (bedrooms, slug);
    }
    if let Some(slug) = segment.strip_prefix("studio-") {
        return (BTreeSet::from([Bedroom::Studio]), slug);
    }
    (BTreeSet::new(), segment)
}
