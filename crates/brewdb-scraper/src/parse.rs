//! Field-level parsing shared by the normalizer and the page extractors.
//!
//! Prices, pack/volume strings, ratings, and HTML text. All functions are
//! total: input that does not parse yields `None` (or the empty string),
//! never an error.

use std::borrow::Cow;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Node};
use serde_json::Value;

static PACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+\s*[x×]\s*(\d+(?:\.\d+)?)\s*(ml|l|litres?|liters?)\b").expect("valid regex")
});

static VOLUME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(ml|l|litres?|liters?)\b").expect("valid regex")
});

static MONEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\s*\d[\d,]*(?:\.\d+)?").expect("valid regex"));

static LEADING_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("valid regex"));

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

/// Parses a dollar amount from a JSON number or string.
///
/// `$`, `,` and whitespace are stripped from strings. Zero and negative
/// amounts are treated as absent.
#[must_use]
pub(crate) fn parse_price(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => decimal_from_number(n),
        Value::String(s) => parse_price_text(s),
        _ => None,
    }
    .filter(|d| d.is_sign_positive() && !d.is_zero())
}

/// Parses a dollar amount from text such as `"$1,299.00"`.
#[must_use]
pub(crate) fn parse_price_text(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .ok()
        .filter(|d| d.is_sign_positive() && !d.is_zero())
}

/// Parses a unit price, which storefronts often send as text such as
/// `"$2.67 per 1L"`. The first dollar amount wins.
#[must_use]
pub(crate) fn parse_unit_price(value: &Value) -> Option<Decimal> {
    parse_price(value).or_else(|| match value {
        Value::String(s) => {
            let m = MONEY_RE.find(s)?;
            parse_price_text(m.as_str())
        }
        _ => None,
    })
}

/// Converts an integer cent amount (Shopify's storefront JSON) to dollars.
#[must_use]
pub(crate) fn parse_cents(value: &Value) -> Option<Decimal> {
    parse_price(value).map(|cents| (cents / Decimal::ONE_HUNDRED).normalize())
}

/// Saving when the regular price is above the current price.
#[must_use]
pub(crate) fn discount(current: Option<Decimal>, regular: Option<Decimal>) -> Option<Decimal> {
    match (current, regular) {
        (Some(current), Some(regular)) if regular > current => Some(regular - current),
        _ => None,
    }
}

fn decimal_from_number(n: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    // Floats go through their shortest string form so 6.5 stays 6.5 rather
    // than picking up binary noise.
    Decimal::from_str(&n.to_string()).ok()
}

// ---------------------------------------------------------------------------
// Pack and volume strings
// ---------------------------------------------------------------------------

/// A pack/size label and the per-container volume parsed out of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitInfo {
    /// The label verbatim (trimmed), e.g. `"24 x 375mL"`, `"Case"`.
    pub unit: Option<String>,
    /// Volume of a single container. Pack counts are not folded in.
    pub volume_ml: Option<u32>,
}

/// Parses a free-text pack or size label.
///
/// Recognized notations, case-insensitive:
/// - `N x Mml` / `N x ML` (the per-container volume is taken)
/// - `Mml`
/// - `N.NL` / `NL` (converted to millilitres)
///
/// Anything else is kept verbatim in `unit` with no volume.
///
/// ```
/// use brewdb_scraper::parse::parse_unit;
///
/// let parsed = parse_unit("24 x 375mL");
/// assert_eq!(parsed.volume_ml, Some(375));
/// assert_eq!(parsed.unit.as_deref(), Some("24 x 375mL"));
/// ```
#[must_use]
pub fn parse_unit(text: &str) -> UnitInfo {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return UnitInfo::default();
    }
    UnitInfo {
        unit: Some(trimmed.to_owned()),
        volume_ml: parse_volume_ml(trimmed),
    }
}

/// Extracts a per-container volume in millilitres from free text.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_volume_ml(text: &str) -> Option<u32> {
    let caps = PACK_RE
        .captures(text)
        .or_else(|| VOLUME_RE.captures(text))?;
    let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_ascii_lowercase();
    let ml = if unit == "ml" { amount } else { amount * 1000.0 };
    let ml = ml.round();
    if ml >= 1.0 && ml <= f64::from(u32::MAX) {
        Some(ml as u32)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

/// Parses a star rating. Values outside `[0, 5]` or non-finite are rejected.
#[must_use]
pub(crate) fn parse_rating(value: &Value) -> Option<f64> {
    let rating = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_rating_text(s),
        _ => None,
    }?;
    (rating.is_finite() && (0.0..=5.0).contains(&rating)).then_some(rating)
}

/// Parses the leading number of rating text such as `"4.5"` or `"4.5 out of 5"`.
#[must_use]
pub(crate) fn parse_rating_text(text: &str) -> Option<f64> {
    let m = LEADING_NUMBER_RE.find(text.trim())?;
    let rating: f64 = m.as_str().replace(',', "").parse().ok()?;
    (rating.is_finite() && (0.0..=5.0).contains(&rating)).then_some(rating)
}

/// Parses a review count from a number or text such as `"1,204 reviews"`.
#[must_use]
pub(crate) fn parse_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => parse_count_text(s),
        _ => None,
    }
}

#[must_use]
pub(crate) fn parse_count_text(text: &str) -> Option<u32> {
    let m = LEADING_NUMBER_RE.find(text)?;
    m.as_str().replace(',', "").parse().ok()
}

// ---------------------------------------------------------------------------
// HTML text
// ---------------------------------------------------------------------------

/// Block-level elements whose boundaries separate words.
const BLOCK_TAGS: &[&str] = &[
    "p", "br", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "td", "th",
    "table", "section", "article", "blockquote",
];

/// Reduces an HTML fragment to plain text: scripts and styles dropped, tags
/// removed (block tags become a space), entities decoded, whitespace
/// collapsed.
#[must_use]
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::with_capacity(html.len());
    push_text(fragment.root_element(), &mut text);
    collapse_whitespace(&text)
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style") {
                    continue;
                }
                let block = BLOCK_TAGS.iter().any(|tag| name.eq_ignore_ascii_case(tag));
                if block {
                    out.push(' ');
                }
                if let Some(inner) = ElementRef::wrap(child) {
                    push_text(inner, out);
                }
                if block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

#[must_use]
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decodes named (the full HTML5 set) and numeric character references.
///
/// Unknown named entities are left as written.
#[must_use]
pub(crate) fn decode_entities(text: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(text)
}
