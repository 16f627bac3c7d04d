//! Regex-driven field extraction from free-text queries.
//!
//! Fields are pulled out in a fixed order and every consumed span is blanked,
//! so bedroom, bathroom and area numbers are never read again as prices.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::property_type::{Family, find_mentions};
use crate::domain::search_filter::{Bathroom, Bedroom, Intent, PartialSearchFilter};

/// How far a `k`/`m` suffix reaches when scaling bare numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuffixScope {
    /// Only the number carrying the suffix.
    Number,
    /// The suffixed number and a bare partner of up to three digits in the
    /// same range expression.
    #[default]
    Range,
    /// Any bare number of up to three digits once a suffix appears anywhere
    /// in the query. Misreads unrelated small numbers.
    Query,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub suffix_scope: SuffixScope,
}

const NUM: &str = r"\d{1,3}(?:,\d{3})+|\d+(?:\.\d+)?";
const SUFFIX: &str = r"\s*(?:k|thousand|m|mn|million)\b";
const COUNT_WORD: &str = r"\d{1,2}|one|two|three|four|five|six|seven|eight|nine|ten";
/// A lone count of three or more digits, read as "8+" or "6+".
const BIG_COUNT: &str = r"\d{3,}";
/// Start of a room list: never inside a comma-grouped number like "85,000".
const LIST_START: &str = r"(?:^|[^\w,]|\D,)";
const LIST_SEP: &str = r"\s*(?:,|/|&|-|\band\b|\bor\b|\bto\b)\s*";
const AREA_UNIT: &str = r"(?:sq\.?\s*ft\.?|sqft|sq\.?\s*feet|square\s+(?:feet|foot|ft))";
const CURRENCY: &str = r"(?:aed\s*)?";

const KNOWN_AREAS: &[(&str, &str)] = &[
    ("jvc", "Jumeirah Village Circle"),
    ("jumeirah village circle", "Jumeirah Village Circle"),
    ("marina", "Dubai Marina"),
    ("dubai marina", "Dubai Marina"),
    ("downtown", "Downtown Dubai"),
    ("downtown dubai", "Downtown Dubai"),
    ("jlt", "Jumeirah Lake Towers"),
    ("jumeirah lake towers", "Jumeirah Lake Towers"),
    ("jbr", "Jumeirah Beach Residence"),
    ("jumeirah beach residence", "Jumeirah Beach Residence"),
    ("business bay", "Business Bay"),
    ("deira", "Deira"),
    ("bur dubai", "Bur Dubai"),
    ("jumeirah", "Jumeirah"),
    ("al barsha", "Al Barsha"),
    ("al quoz", "Al Quoz"),
    ("satwa", "Satwa"),
    ("dubai hills", "Dubai Hills Estate"),
    ("dubai hills estate", "Dubai Hills Estate"),
    ("arabian ranches", "Arabian Ranches"),
    ("dubai investment park", "Dubai Investment Park"),
    ("dip", "Dubai Investment Park"),
    ("motor city", "Motor City"),
    ("sports city", "Dubai Sports City"),
    ("silicon oasis", "Dubai Silicon Oasis"),
    ("international city", "International City"),
    ("discovery gardens", "Discovery Gardens"),
    ("difc", "DIFC"),
    ("abu dhabi", "Abu Dhabi"),
    ("sharjah", "Sharjah"),
    ("ajman", "Ajman"),
    ("ras al khaimah", "Ras Al Khaimah"),
    ("dubai", "Dubai"),
];

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("extraction pattern is valid")
}

static AREA_NAMES: LazyLock<Regex> = LazyLock::new(|| {
    let mut aliases: Vec<&str> = KNOWN_AREAS.iter().map(|(alias, _)| *alias).collect();
    aliases.sort_by_key(|alias| std::cmp::Reverse(alias.len()));
    let alternation = aliases
        .iter()
        .map(|alias| regex::escape(alias).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    pattern(&format!(r"\b(?:{alternation})\b"))
});

static COMMERCIAL_CONTEXT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\b(?:commercial|business|retail)\b"));
static RENT_WORDS: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\b(?:rent(?:al|ing|ed)?|leas(?:e|ing)|to\s+let)\b"));
static SALE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"\b(?:buy(?:ing)?|purchas(?:e|ing)|for\s+sale|on\s+sale|invest(?:ment)?)\b")
});
static K_ANYWHERE: LazyLock<Regex> = LazyLock::new(|| pattern(r"\d\s*k\b"));

static BEDROOM_LIST: LazyLock<Regex> = LazyLock::new(|| {
    let word = format!("(?:{COUNT_WORD}|studio)");
    pattern(&format!(
        r"{LIST_START}(?P<a>{BIG_COUNT}|{word}(?:{LIST_SEP}{word})*)\s*-?\s*(?:bedrooms?|beds?|br|bhk)\b"
    ))
});
static STUDIO: LazyLock<Regex> = LazyLock::new(|| pattern(r"\bstudios?\b"));
static BATHROOM_LIST: LazyLock<Regex> = LazyLock::new(|| {
    let word = format!("(?:{COUNT_WORD})");
    pattern(&format!(
        r"{LIST_START}(?P<a>{BIG_COUNT}|{word}(?:{LIST_SEP}{word})*)\s*-?\s*(?:bathrooms?|baths?)\b"
    ))
});
static LIST_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(r"\b(?:\d+|{COUNT_WORD}|studio)\b|-|\bto\b"))
});

static AREA_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r"\b(?:between|from)\s+(?P<a>{NUM})\s*(?:{AREA_UNIT}\s*)?(?:-|to|and)\s*(?P<b>{NUM})\s*{AREA_UNIT}"
    ))
});
static AREA_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r"\b(?P<a>{NUM})\s*(?:{AREA_UNIT}\s*)?(?:-|to)\s*(?P<b>{NUM})\s*{AREA_UNIT}"
    ))
});
static AREA_MAX: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r"\b(?:under|below|less\s+than|max(?:imum)?|up\s*to)\s+(?P<a>{NUM})\s*{AREA_UNIT}"
    ))
});
static AREA_MIN: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r"\b(?:over|above|more\s+than|min(?:imum)?|at\s+least)\s+(?P<a>{NUM})\s*{AREA_UNIT}"
    ))
});
static AREA_BARE: LazyLock<Regex> =
    LazyLock::new(|| pattern(&format!(r"\b(?P<a>{NUM})\s*{AREA_UNIT}")));

static PRICE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r"\b(?:between|from|range(?:\s+of)?|budget(?:\s+of)?|price(?:\s+range)?)\s+{CURRENCY}(?P<a>{NUM})(?P<ak>{SUFFIX})?\s*{CURRENCY}(?:-|to|and)\s*{CURRENCY}(?P<b>{NUM})(?P<bk>{SUFFIX})?"
    ))
});
static PRICE_MAX: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r"\b(?:under|below|less\s+than|max(?:imum)?|up\s*to|within|not\s+more\s+than|budget(?:\s+of)?)\s+(?:(?:price|budget|rent)\s+(?:of\s+)?)?{CURRENCY}(?P<a>{NUM})(?P<ak>{SUFFIX})?"
    ))
});
static PRICE_MIN: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r"\b(?:over|above|more\s+than|min(?:imum)?|at\s+least|starting\s+(?:from|at))\s+(?:(?:price|budget)\s+(?:of\s+)?)?{CURRENCY}(?P<a>{NUM})(?P<ak>{SUFFIX})?"
    ))
});

/// Pull every field the regex rules can see out of `query`.
pub fn extract_fields(query: &str, config: &ExtractionConfig) -> PartialSearchFilter {
    let mut text = query.to_lowercase();
    let suffix_anywhere = K_ANYWHERE.is_match(&text);
    let mut partial = PartialSearchFilter::default();

    // Area names go first so "business bay" never reads as commercial context.
    let areas = find_locations(&text);
    if let Some((_, canonical)) = areas.first() {
        partial.location = Some((*canonical).to_string());
    }
    for (span, _) in areas {
        blank(&mut text, span);
    }

    if COMMERCIAL_CONTEXT.is_match(&text) {
        partial.family_hint = Some(Family::Commercial);
    }
    partial.intent = detect_intent(&text);
    partial.mentions = find_mentions(&text);

    extract_area(&mut text, &mut partial);
    extract_rooms(&mut text, &mut partial);
    extract_price(&mut text, &mut partial, config.suffix_scope, suffix_anywhere);

    debug!(query, ?partial, "Extracted query fields");
    partial
}

fn detect_intent(text: &str) -> Option<Intent> {
    if RENT_WORDS.is_match(text) {
        Some(Intent::Rent)
    } else if SALE_WORDS.is_match(text) {
        Some(Intent::Sale)
    } else {
        None
    }
}

/// Every known area mention in query order, with its canonical name.
fn find_locations(text: &str) -> Vec<(Range<usize>, &'static str)> {
    AREA_NAMES
        .find_iter(text)
        .filter_map(|found| {
            let alias = found.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
            KNOWN_AREAS
                .iter()
                .find(|(known, _)| *known == alias)
                .map(|(_, canonical)| (found.range(), *canonical))
        })
        .collect()
}

struct Hit {
    a: String,
    a_suffix: Option<String>,
    b: Option<String>,
    b_suffix: Option<String>,
}

/// First match of `pattern`, with its span blanked out of `text`.
fn take(pattern: &Regex, text: &mut String) -> Option<Hit> {
    take_span(pattern, text, false)
}

/// Like [`take`], but the text before group `a` stays readable.
fn take_list(pattern: &Regex, text: &mut String) -> Option<Hit> {
    take_span(pattern, text, true)
}

fn take_span(pattern: &Regex, text: &mut String, from_group: bool) -> Option<Hit> {
    let (span, hit) = {
        let caps = pattern.captures(text.as_str())?;
        let hit = Hit {
            a: caps.name("a")?.as_str().to_string(),
            a_suffix: caps.name("ak").map(|m| m.as_str().trim().to_string()),
            b: caps.name("b").map(|m| m.as_str().to_string()),
            b_suffix: caps.name("bk").map(|m| m.as_str().trim().to_string()),
        };
        let whole = caps.get(0)?.range();
        let start = if from_group {
            caps.name("a")?.start()
        } else {
            whole.start
        };
        (start..whole.end, hit)
    };
    blank(text, span);
    Some(hit)
}

fn blank(text: &mut String, span: Range<usize>) {
    let spaces = " ".repeat(span.len());
    text.replace_range(span, &spaces);
}

fn extract_area(text: &mut String, partial: &mut PartialSearchFilter) {
    if let Some(hit) = take(&AREA_RANGE, text).or_else(|| take(&AREA_SPAN, text)) {
        partial.area_min = amount(&hit.a, None, None);
        partial.area_max = hit.b.as_deref().and_then(|b| amount(b, None, None));
    }
    if partial.area_max.is_none()
        && let Some(hit) = take(&AREA_MAX, text)
    {
        partial.area_max = amount(&hit.a, None, None);
    }
    if partial.area_min.is_none()
        && let Some(hit) = take(&AREA_MIN, text)
    {
        partial.area_min = amount(&hit.a, None, None);
    }
    while let Some(hit) = take(&AREA_BARE, text) {
        if partial.area_min.is_none() && partial.area_max.is_none() {
            partial.area_min = amount(&hit.a, None, None);
        }
    }
}

fn extract_rooms(text: &mut String, partial: &mut PartialSearchFilter) {
    while let Some(hit) = take_list(&BEDROOM_LIST, text) {
        partial
            .bedrooms
            .extend(parse_count_list(&hit.a).into_iter().map(Bedroom::from_count));
    }
    if STUDIO.is_match(text) {
        partial.bedrooms.insert(Bedroom::Studio);
    }
    while let Some(hit) = take_list(&BATHROOM_LIST, text) {
        partial.bathrooms.extend(
            parse_count_list(&hit.a)
                .into_iter()
                .filter_map(Bathroom::from_count),
        );
    }
}

fn extract_price(
    text: &mut String,
    partial: &mut PartialSearchFilter,
    scope: SuffixScope,
    suffix_anywhere: bool,
) {
    let query_wide = (scope == SuffixScope::Query && suffix_anywhere).then_some("k");

    if let Some(hit) = take(&PRICE_RANGE, text) {
        let partner = match scope {
            SuffixScope::Number => None,
            SuffixScope::Range => hit.a_suffix.as_deref().or(hit.b_suffix.as_deref()),
            SuffixScope::Query => suffix_anywhere.then_some("k"),
        };
        partial.price_min = amount(&hit.a, hit.a_suffix.as_deref(), partner);
        partial.price_max = hit
            .b
            .as_deref()
            .and_then(|b| amount(b, hit.b_suffix.as_deref(), partner));
    }
    if partial.price_max.is_none()
        && let Some(hit) = take(&PRICE_MAX, text)
    {
        partial.price_max = amount(&hit.a, hit.a_suffix.as_deref(), query_wide);
    }
    if partial.price_min.is_none()
        && let Some(hit) = take(&PRICE_MIN, text)
    {
        partial.price_min = amount(&hit.a, hit.a_suffix.as_deref(), query_wide);
    }
}

fn multiplier(suffix: &str) -> f64 {
    if suffix.starts_with('m') {
        1_000_000.0
    } else {
        1000.0
    }
}

/// Parse a matched number scaled by its own suffix. A bare number of at
/// most three digits takes `bare_suffix` instead, when one is given.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn amount(number: &str, suffix: Option<&str>, bare_suffix: Option<&str>) -> Option<u64> {
    let value: f64 = number.replace(',', "").parse().ok()?;
    let integer_digits = number.split('.').next().map_or(0, str::len);
    let bare_small = !number.contains(',') && integer_digits <= 3;
    let factor = match (suffix, bare_suffix) {
        (Some(suffix), _) => multiplier(suffix),
        (None, Some(partner)) if bare_small => {
            debug!(number, partner, "Scaling bare number by its partner's suffix");
            multiplier(partner)
        }
        _ => 1.0,
    };
    let scaled = (value * factor).round();
    (scaled.is_finite() && scaled >= 0.0).then_some(scaled as u64)
}

/// Expand "1, 2 and 3" or "2 to 4" style lists. Studio counts as zero.
fn parse_count_list(list: &str) -> Vec<u32> {
    let mut counts: Vec<u32> = Vec::new();
    let mut range_open = false;
    for token in LIST_TOKEN.find_iter(list) {
        match token.as_str() {
            "-" | "to" => range_open = true,
            word => {
                let Some(n) = count_word(word) else {
                    continue;
                };
                match counts.last() {
                    Some(&prev) if range_open && n > prev => {
                        counts.extend(prev + 1..=n.min(prev.saturating_add(10)));
                    }
                    _ => counts.push(n),
                }
                range_open = false;
            }
        }
    }
    counts
}

fn count_word(word: &str) -> Option<u32> {
    let n = match word {
        "studio" => 0,
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        // Counts too large for u32 still mean "a lot of rooms".
        digits if digits.bytes().all(|b| b.is_ascii_digit()) => {
            return Some(digits.parse().unwrap_or(u32::MAX));
        }
        _ => return None,
    };
    Some(n)
}
