//! Normalization from source-native raw items to [`CanonicalProduct`].
//!
//! Field-level parsing lives in [`crate::parse`]; this module maps each
//! source's structure onto the canonical record and decides which fields are
//! mandatory (id and product URL).

use brewdb_core::{CanonicalProduct, CanonicalVariant, SourceId};
use rust_decimal::Decimal;

use crate::error::ScraperError;
use crate::parse::{
    discount, parse_cents, parse_count, parse_price, parse_rating, parse_unit, parse_unit_price,
    parse_volume_ml, strip_html, UnitInfo,
};
use crate::transport::resolve_url;
use crate::types::{BeerCartelItem, ColesItem, ColesPrice, ColesProduct, ColesVariant, RawItem};

/// Shopify's title for the only variant of a product without options.
const SHOPIFY_DEFAULT_VARIANT: &str = "Default Title";

/// Property keys that carry the container size on the Coles-platform API.
const SIZE_PROPERTY_KEYS: &[&str] = &["Liquor Size", "Volume", "Size", "Container Size"];

/// Converts one raw item into a canonical product.
///
/// # Errors
///
/// Returns [`ScraperError::MalformedRawItem`] if the item has no id or no
/// resolvable product URL.
pub fn normalize(item: RawItem) -> Result<CanonicalProduct, ScraperError> {
    match item {
        RawItem::BeerCartel(item) => normalize_beercartel(item),
        RawItem::Liquorland(item) => normalize_coles(SourceId::Liquorland, item),
        RawItem::FirstChoiceLiquor(item) => normalize_coles(SourceId::FirstChoiceLiquor, item),
    }
}

/// Canonical id for a Coles-platform product: the part before the unit of
/// measure suffix (`"2547382_EA"` → `"2547382"`).
#[must_use]
pub fn clean_coles_id(raw: &str) -> &str {
    raw.split_once('_').map_or(raw, |(id, _)| id)
}

fn malformed(source_id: SourceId, item: Option<&str>, reason: &str) -> ScraperError {
    ScraperError::MalformedRawItem {
        source_id,
        item: item.unwrap_or("<unnamed>").to_owned(),
        reason: reason.to_owned(),
    }
}

fn text(value: Option<String>) -> String {
    value.map(|s| s.trim().to_owned()).unwrap_or_default()
}

/// Resolves image links against `origin`, dropping blanks and duplicates
/// while keeping display order.
fn image_urls<'a>(origin: &str, links: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for url in links.into_iter().filter_map(|link| resolve_url(origin, link)) {
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

// ---------------------------------------------------------------------------
// Beer Cartel
// ---------------------------------------------------------------------------

fn normalize_beercartel(item: BeerCartelItem) -> Result<CanonicalProduct, ScraperError> {
    let source = SourceId::BeerCartel;
    let BeerCartelItem {
        card,
        detail,
        origin,
    } = item;

    let label = card.title.as_deref().or(card.handle.as_deref());
    let id = card
        .id
        .clone()
        .ok_or_else(|| malformed(source, label, "missing product id"))?;
    let product_url = card
        .handle
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .and_then(|handle| resolve_url(&origin, &format!("/products/{handle}")))
        .ok_or_else(|| malformed(source, Some(&id), "missing product handle"))?;

    let description = card
        .description
        .as_deref()
        .map(strip_html)
        .filter(|d| !d.is_empty())
        .or(detail.description)
        .unwrap_or_default();

    let price = card.price.as_ref().and_then(parse_cents);
    let compare_at = card.compare_at_price.as_ref().and_then(parse_cents);

    // Pack label of the storefront default (first) variant.
    let default_unit = card
        .variants
        .first()
        .and_then(|v| v.title.as_deref())
        .filter(|t| *t != SHOPIFY_DEFAULT_VARIANT)
        .map(parse_unit)
        .unwrap_or_default();

    let volume_ml = detail
        .volume_text
        .as_deref()
        .and_then(parse_volume_ml)
        .or_else(|| card.title.as_deref().and_then(parse_volume_ml))
        .or(default_unit.volume_ml);

    let variants = card
        .variants
        .iter()
        .map(|v| {
            let unit = v
                .title
                .as_deref()
                .filter(|t| *t != SHOPIFY_DEFAULT_VARIANT)
                .map(parse_unit)
                .unwrap_or_default();
            let price = v.price.as_ref().and_then(parse_cents);
            let compare_at = v.compare_at_price.as_ref().and_then(parse_cents);
            CanonicalVariant {
                product_url: v
                    .id
                    .as_ref()
                    .map(|vid| format!("{product_url}?variant={vid}")),
                id: v.id.clone(),
                volume_ml: unit.volume_ml.or(volume_ml),
                unit: unit.unit,
                price,
                member_price: None,
                discount: discount(price, compare_at),
                unit_price: None,
            }
        })
        .collect();

    let images = card.featured_image.iter().chain(card.images.iter());

    Ok(CanonicalProduct {
        source,
        id,
        name: text(card.title),
        brand: text(card.vendor),
        description,
        price,
        member_price: None,
        discount: discount(price, compare_at),
        unit_price: None,
        volume_ml,
        unit: default_unit.unit,
        rating_average: detail.rating_average,
        rating_total: detail.rating_total,
        image_urls: image_urls(&origin, images),
        product_url,
        variants,
    })
}

// ---------------------------------------------------------------------------
// Liquorland / First Choice Liquor
// ---------------------------------------------------------------------------

/// Normalized price block of a Coles-platform product or variant.
#[derive(Default)]
struct Prices {
    price: Option<Decimal>,
    member_price: Option<Decimal>,
    discount: Option<Decimal>,
    unit_price: Option<Decimal>,
}

impl Prices {
    fn from_raw(raw: Option<&ColesPrice>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        let price = raw.current.as_ref().and_then(parse_price);
        let normal = raw.normal.as_ref().and_then(parse_price);
        Self {
            price,
            member_price: raw.member_only_price.as_ref().and_then(parse_price),
            discount: discount(price, normal),
            unit_price: raw.unit_price.as_ref().and_then(parse_unit_price),
        }
    }
}

fn coles_unit(label: Option<&str>, fallback: Option<&str>) -> UnitInfo {
    label
        .or(fallback)
        .map(parse_unit)
        .unwrap_or_default()
}

fn normalize_coles(source: SourceId, item: ColesItem) -> Result<CanonicalProduct, ScraperError> {
    let ColesItem { product, origin } = item;

    let raw_id = product
        .id
        .as_deref()
        .ok_or_else(|| malformed(source, product.name.as_deref(), "missing product id"))?;
    let id = clean_coles_id(raw_id).to_owned();
    if id.is_empty() {
        return Err(malformed(source, Some(raw_id), "empty product id"));
    }
    let product_url = product
        .product_url
        .as_deref()
        .and_then(|link| resolve_url(&origin, link))
        .ok_or_else(|| malformed(source, Some(raw_id), "missing product url"))?;

    let unit = coles_unit(
        product.unit_of_measure_label.as_deref(),
        product.unit_of_measure.as_deref(),
    );
    let volume_ml = coles_volume(&product).or(unit.volume_ml);
    let prices = Prices::from_raw(product.price.as_ref());
    let (rating_average, rating_total) = product.ratings.as_ref().map_or((None, None), |r| {
        (
            r.average.as_ref().and_then(parse_rating),
            r.total.as_ref().and_then(parse_count),
        )
    });

    let variants = product
        .multi_uom_price
        .iter()
        .map(|v| coles_variant(&origin, v, volume_ml))
        .collect();

    let images = product.image.iter().chain(product.images.iter());

    Ok(CanonicalProduct {
        source,
        id,
        name: text(product.name.clone()),
        brand: text(product.brand.clone()),
        description: product
            .description
            .as_deref()
            .map(strip_html)
            .unwrap_or_default(),
        price: prices.price,
        member_price: prices.member_price,
        discount: prices.discount,
        unit_price: prices.unit_price,
        volume_ml,
        unit: unit.unit,
        rating_average,
        rating_total,
        image_urls: image_urls(&origin, images),
        product_url,
        variants,
    })
}

/// Container volume from the structured size property, else from the name.
fn coles_volume(product: &ColesProduct) -> Option<u32> {
    product
        .property(SIZE_PROPERTY_KEYS)
        .and_then(parse_volume_ml)
        .or_else(|| product.name.as_deref().and_then(parse_volume_ml))
}

fn coles_variant(
    origin: &str,
    variant: &ColesVariant,
    product_volume_ml: Option<u32>,
) -> CanonicalVariant {
    let unit = coles_unit(
        variant.unit_of_measure_label.as_deref(),
        variant.unit_of_measure.as_deref(),
    );
    let prices = Prices::from_raw(variant.price.as_ref());
    // Every pack of a product holds the same container.
    let volume_ml = unit
        .volume_ml
        .or_else(|| variant.product_name.as_deref().and_then(parse_volume_ml))
        .or(product_volume_ml);
    CanonicalVariant {
        id: variant.id.clone(),
        unit: unit.unit,
        volume_ml,
        price: prices.price,
        member_price: prices.member_price,
        discount: prices.discount,
        unit_price: prices.unit_price,
        product_url: variant
            .product_url
            .as_deref()
            .and_then(|link| resolve_url(origin, link)),
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
