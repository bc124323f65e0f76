//! HTML extraction for Beer Cartel listing and product pages.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::error::ScraperError;
use crate::parse::{collapse_whitespace, decode_entities, parse_count_text, parse_rating_text};
use crate::types::BeerCartelDetail;

/// Script marker the storefront uses to seed its product cache.
const CACHE_MARKER: &str = "addCachedProductData";

static CACHE_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)addCachedProductData\(\s*(\[.*?\])\s*\);").expect("valid regex")
});

/// Description containers across the storefront's product templates.
const DESCRIPTION_SELECTORS: &[&str] = &[
    ".product__description",
    ".product-single__description",
    ".product-description",
    "[itemprop=\"description\"]",
];

/// Pulls the cached product payload out of a rendered listing page.
///
/// Items are returned untyped so the caller can drop a bad one without
/// losing the page.
///
/// # Errors
///
/// Returns [`ScraperError::Parse`] if the page has no product cache script
/// or its payload is not a JSON array.
pub fn cached_products(html: &str, context: &str) -> Result<Vec<Value>, ScraperError> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("script")
        .map_err(|e| ScraperError::parse(context, format!("invalid selector: {e}")))?;

    let mut found_marker = false;
    let mut products = Vec::new();
    for script in doc.select(&selector) {
        let body: String = script.text().collect();
        if !body.contains(CACHE_MARKER) {
            continue;
        }
        found_marker = true;
        for caps in CACHE_CALL_RE.captures_iter(&body) {
            let payload = decode_entities(&caps[1]);
            let items: Vec<Value> = serde_json::from_str(&payload)
                .map_err(|e| ScraperError::parse(context, format!("product cache is not JSON: {e}")))?;
            products.extend(items);
        }
    }

    if !found_marker {
        return Err(ScraperError::parse(context, "no product cache script on page"));
    }
    Ok(products)
}

/// Reads the fields only a product page shows: rating widget, description
/// block, size row.
#[must_use]
pub fn product_detail(html: &str) -> BeerCartelDetail {
    let doc = Html::parse_document(html);
    let (rating_average, rating_total) = rating(&doc);
    BeerCartelDetail {
        rating_average,
        rating_total,
        description: description(&doc),
        volume_text: size_row(&doc),
    }
}

fn first<'a>(doc: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector).next()
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Native review widget first, then the Judge.me badge.
fn rating(doc: &Html) -> (Option<f64>, Option<u32>) {
    if let Some(value) = first(doc, "span.rating-value") {
        let average = parse_rating_text(&element_text(value));
        let total = first(doc, "span.review-count").and_then(|el| parse_count_text(&element_text(el)));
        return (average, total);
    }
    if let Some(stars) = first(doc, "span.jdgm-prev-badge__stars") {
        let average = stars.value().attr("data-score").and_then(parse_rating_text);
        let total = first(doc, "span.jdgm-prev-badge__text")
            .and_then(|el| parse_count_text(&element_text(el)));
        return (average, total);
    }
    (None, None)
}

fn description(doc: &Html) -> Option<String> {
    DESCRIPTION_SELECTORS
        .iter()
        .filter_map(|sel| first(doc, sel))
        .map(element_text)
        .find(|text| !text.is_empty())
}

/// Value cell of the first specification row labelled size or volume.
fn size_row(doc: &Html) -> Option<String> {
    let rows = Selector::parse("tr").ok()?;
    let cells = Selector::parse("th, td").ok()?;
    doc.select(&rows).find_map(|row| {
        let mut texts = row.select(&cells).map(element_text);
        let label = texts.next()?.to_ascii_lowercase();
        if label.contains("size") || label.contains("volume") {
            texts.next().filter(|v| !v.is_empty())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<html><head>
<script>
  window.ShopifyAnalytics = {};
</script>
<script>
  addCachedProductData([{&quot;id&quot;:7001,&quot;title&quot;:&quot;Hazy IPA&quot;,&quot;handle&quot;:&quot;hazy-ipa&quot;,&quot;price&quot;:2499},
  {"id":7002,"title":"Pilsner","handle":"pilsner","price":1899}]);
</script>
</head><body></body></html>"#;

    #[test]
    fn cached_products_decodes_escaped_payload() {
        let items = cached_products(LISTING, "page 1").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["handle"], "hazy-ipa");
        assert_eq!(items[1]["id"], 7002);
    }

    #[test]
    fn cached_products_decode_accented_names() {
        let html = "<script>addCachedProductData([{&quot;id&quot;:7003,&quot;title&quot;:&quot;K&ouml;stritzer Schwarzbier&quot;,&quot;vendor&quot;:&quot;K&ouml;stritzer&quot;}]);</script>";
        let items = cached_products(html, "page 2").unwrap();
        assert_eq!(items[0]["title"], "Köstritzer Schwarzbier");
        assert_eq!(items[0]["vendor"], "Köstritzer");
    }

    #[test]
    fn missing_cache_script_is_parse_error() {
        let err = cached_products("<html><body>Maintenance</body></html>", "page 4").unwrap_err();
        match err {
            ScraperError::Parse { context, .. } => assert_eq!(context, "page 4"),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn broken_cache_payload_is_parse_error() {
        let html = "<script>addCachedProductData([{\"id\": 1,]);</script>";
        assert!(matches!(
            cached_products(html, "page 1"),
            Err(ScraperError::Parse { .. })
        ));
    }

    #[test]
    fn empty_cache_is_an_empty_page() {
        let html = "<script>addCachedProductData([]);</script>";
        assert!(cached_products(html, "page 9").unwrap().is_empty());
    }

    #[test]
    fn native_rating_widget() {
        let html = r#"<div><span class="rating-value">4.3</span><span class="review-count">1,024 reviews</span></div>"#;
        let detail = product_detail(html);
        assert_eq!(detail.rating_average, Some(4.3));
        assert_eq!(detail.rating_total, Some(1024));
    }

    #[test]
    fn judgeme_rating_badge() {
        let html = r#"<div class="jdgm-prev-badge">
            <span class="jdgm-prev-badge__stars" data-score="4.75"></span>
            <span class="jdgm-prev-badge__text">8 reviews</span></div>"#;
        let detail = product_detail(html);
        assert_eq!(detail.rating_average, Some(4.75));
        assert_eq!(detail.rating_total, Some(8));
    }

    #[test]
    fn page_without_widget_has_no_rating() {
        let detail = product_detail("<html><body><h1>Pilsner</h1></body></html>");
        assert_eq!(detail, BeerCartelDetail::default());
    }

    #[test]
    fn description_and_size_row() {
        let html = r#"<div class="product__description"><p>Crisp and   dry.</p></div>
            <table><tr><th>Style</th><td>Pilsner</td></tr><tr><th>Size</th><td>375mL</td></tr></table>"#;
        let detail = product_detail(html);
        assert_eq!(detail.description.as_deref(), Some("Crisp and dry."));
        assert_eq!(detail.volume_text.as_deref(), Some("375mL"));
    }
}
