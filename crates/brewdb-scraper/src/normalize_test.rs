use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::json;

use super::*;
use crate::types::{BeerCartelCard, BeerCartelDetail};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// -----------------------------------------------------------------------
// Beer Cartel
// -----------------------------------------------------------------------

fn beercartel_card() -> BeerCartelCard {
    serde_json::from_value(json!({
        "id": 7_012_345_678_u64,
        "title": "Range Brewing Hazy IPA 440mL",
        "handle": "range-brewing-hazy-ipa",
        "vendor": "Range Brewing",
        "description": "<p>Juicy &amp; <b>dank</b>.</p>\n<p>Mango,  pine.</p>",
        "price": 2499,
        "compare_at_price": 2999,
        "featured_image": "//beercartel.com.au/cdn/shop/products/hazy.jpg",
        "images": [
            "//beercartel.com.au/cdn/shop/products/hazy.jpg",
            "//beercartel.com.au/cdn/shop/products/hazy-back.jpg"
        ],
        "variants": [
            {"id": 41, "title": "4 Pack", "price": 2499, "compare_at_price": 2999},
            {"id": 42, "title": "Case (16)", "price": 8999, "compare_at_price": null}
        ]
    }))
    .unwrap()
}

fn beercartel_item(card: BeerCartelCard, detail: BeerCartelDetail) -> RawItem {
    RawItem::BeerCartel(BeerCartelItem {
        card,
        detail,
        origin: "https://beercartel.com.au".to_owned(),
    })
}

#[test]
fn beercartel_preserves_identity() {
    let product = normalize(beercartel_item(beercartel_card(), BeerCartelDetail::default())).unwrap();
    assert_eq!(product.source, SourceId::BeerCartel);
    assert_eq!(product.id, "7012345678");
    assert_eq!(
        product.product_url,
        "https://beercartel.com.au/products/range-brewing-hazy-ipa"
    );
}

#[test]
fn beercartel_prices_are_dollars_with_saving() {
    let product = normalize(beercartel_item(beercartel_card(), BeerCartelDetail::default())).unwrap();
    assert_eq!(product.price, Some(dec("24.99")));
    assert_eq!(product.discount, Some(dec("5")));
    assert!(product.member_price.is_none());
}

#[test]
fn beercartel_description_is_plain_text() {
    let product = normalize(beercartel_item(beercartel_card(), BeerCartelDetail::default())).unwrap();
    assert_eq!(product.description, "Juicy & dank. Mango, pine.");
}

#[test]
fn beercartel_images_are_absolute_and_deduplicated() {
    let product = normalize(beercartel_item(beercartel_card(), BeerCartelDetail::default())).unwrap();
    assert_eq!(
        product.image_urls,
        vec![
            "https://beercartel.com.au/cdn/shop/products/hazy.jpg".to_owned(),
            "https://beercartel.com.au/cdn/shop/products/hazy-back.jpg".to_owned(),
        ]
    );
}

#[test]
fn beercartel_variants_keep_order_and_link_to_variant() {
    let product = normalize(beercartel_item(beercartel_card(), BeerCartelDetail::default())).unwrap();
    assert_eq!(product.variants.len(), 2);
    let case = &product.variants[1];
    assert_eq!(case.id.as_deref(), Some("42"));
    assert_eq!(case.unit.as_deref(), Some("Case (16)"));
    assert_eq!(case.price, Some(dec("89.99")));
    assert!(case.discount.is_none());
    assert_eq!(case.volume_ml, Some(440));
    assert_eq!(
        case.product_url.as_deref(),
        Some("https://beercartel.com.au/products/range-brewing-hazy-ipa?variant=42")
    );
    assert_eq!(product.unit.as_deref(), Some("4 Pack"));
}

#[test]
fn beercartel_detail_fields_are_applied() {
    let detail = BeerCartelDetail {
        rating_average: Some(4.5),
        rating_total: Some(12),
        description: Some("From the detail page.".to_owned()),
        volume_text: Some("375mL".to_owned()),
    };
    let mut card = beercartel_card();
    card.description = None;
    let product = normalize(beercartel_item(card, detail)).unwrap();
    assert_eq!(product.rating_average, Some(4.5));
    assert_eq!(product.rating_total, Some(12));
    assert_eq!(product.description, "From the detail page.");
    assert_eq!(product.volume_ml, Some(375));
}

#[test]
fn beercartel_default_variant_title_is_not_a_unit() {
    let mut card = beercartel_card();
    card.variants = serde_json::from_value(json!([
        {"id": 1, "title": "Default Title", "price": 550}
    ]))
    .unwrap();
    let product = normalize(beercartel_item(card, BeerCartelDetail::default())).unwrap();
    assert!(product.unit.is_none());
    assert!(product.variants[0].unit.is_none());
}

#[test]
fn beercartel_zero_price_is_absent() {
    let mut card = beercartel_card();
    card.price = Some(json!(0));
    card.compare_at_price = None;
    let product = normalize(beercartel_item(card, BeerCartelDetail::default())).unwrap();
    assert!(product.price.is_none());
    assert!(product.discount.is_none());
}

#[test]
fn beercartel_missing_id_is_malformed() {
    let mut card = beercartel_card();
    card.id = None;
    let err = normalize(beercartel_item(card, BeerCartelDetail::default())).unwrap_err();
    assert!(
        matches!(
            err,
            ScraperError::MalformedRawItem {
                source_id: SourceId::BeerCartel,
                ..
            }
        ),
        "expected MalformedRawItem, got: {err:?}"
    );
}

#[test]
fn beercartel_missing_handle_is_malformed() {
    let mut card = beercartel_card();
    card.handle = Some("  ".to_owned());
    let err = normalize(beercartel_item(card, BeerCartelDetail::default())).unwrap_err();
    assert!(matches!(err, ScraperError::MalformedRawItem { .. }));
}

// -----------------------------------------------------------------------
// Liquorland / First Choice Liquor
// -----------------------------------------------------------------------

fn coles_product() -> ColesProduct {
    serde_json::from_value(json!({
        "id": "2547382_EA",
        "name": "Stone & Wood Pacific Ale Can 375mL",
        "brand": "Stone & Wood",
        "description": "<p>Cloudy&nbsp;pale ale.</p>",
        "productUrl": "/beer/stone-wood-pacific-ale_2547382",
        "image": "https://media.example.com/2547382.png",
        "price": {"current": 6.5, "normal": 7, "memberOnlyPrice": 6, "unitPrice": "$17.33 per 1L"},
        "ratings": {"average": 4.6, "total": 31},
        "unitOfMeasureLabel": "Can",
        "productProperties": [{"key": "Liquor Size", "value": "375mL"}],
        "multiUOMPrice": [
            {
                "id": "2547382_PK",
                "unitOfMeasureLabel": "6 x 375mL",
                "price": {"current": 22, "normal": 24},
                "productUrl": "/beer/stone-wood-pacific-ale_2547382?uom=PK"
            },
            {
                "id": "2547382_CS",
                "unitOfMeasureLabel": "Case",
                "price": {"current": 72},
                "productUrl": "/beer/stone-wood-pacific-ale_2547382?uom=CS"
            }
        ]
    }))
    .unwrap()
}

fn coles_item(product: ColesProduct) -> ColesItem {
    ColesItem {
        product,
        origin: "https://www.liquorland.com.au".to_owned(),
    }
}

#[test]
fn clean_coles_id_strips_unit_suffix() {
    assert_eq!(clean_coles_id("12345_ABC"), "12345");
    assert_eq!(clean_coles_id("12345"), "12345");
}

#[test]
fn coles_preserves_identity_for_each_source() {
    let liquorland = normalize(RawItem::Liquorland(coles_item(coles_product()))).unwrap();
    assert_eq!(liquorland.source, SourceId::Liquorland);
    assert_eq!(liquorland.id, "2547382");
    assert_eq!(
        liquorland.product_url,
        "https://www.liquorland.com.au/beer/stone-wood-pacific-ale_2547382"
    );

    let first_choice = normalize(RawItem::FirstChoiceLiquor(ColesItem {
        product: coles_product(),
        origin: "https://www.firstchoiceliquor.com.au".to_owned(),
    }))
    .unwrap();
    assert_eq!(first_choice.source, SourceId::FirstChoiceLiquor);
    assert_eq!(first_choice.id, "2547382");
    assert!(first_choice
        .product_url
        .starts_with("https://www.firstchoiceliquor.com.au/"));
}

#[test]
fn coles_prices_and_ratings() {
    let product = normalize(RawItem::Liquorland(coles_item(coles_product()))).unwrap();
    assert_eq!(product.price, Some(dec("6.5")));
    assert_eq!(product.member_price, Some(dec("6")));
    assert_eq!(product.discount, Some(dec("0.5")));
    assert_eq!(product.unit_price, Some(dec("17.33")));
    assert_eq!(product.rating_average, Some(4.6));
    assert_eq!(product.rating_total, Some(31));
    assert_eq!(product.description, "Cloudy pale ale.");
}

#[test]
fn coles_volume_prefers_size_property() {
    let mut raw = coles_product();
    raw.name = Some("Pacific Ale".to_owned());
    let product = normalize(RawItem::Liquorland(coles_item(raw))).unwrap();
    assert_eq!(product.volume_ml, Some(375));
    assert_eq!(product.unit.as_deref(), Some("Can"));
}

#[test]
fn coles_variants_normalize_with_same_rules() {
    let product = normalize(RawItem::Liquorland(coles_item(coles_product()))).unwrap();
    assert_eq!(product.variants.len(), 2);

    let pack = &product.variants[0];
    assert_eq!(pack.id.as_deref(), Some("2547382_PK"));
    assert_eq!(pack.unit.as_deref(), Some("6 x 375mL"));
    assert_eq!(pack.volume_ml, Some(375));
    assert_eq!(pack.price, Some(dec("22")));
    assert_eq!(pack.discount, Some(dec("2")));
    assert_eq!(
        pack.product_url.as_deref(),
        Some("https://www.liquorland.com.au/beer/stone-wood-pacific-ale_2547382?uom=PK")
    );

    let case = &product.variants[1];
    assert_eq!(case.unit.as_deref(), Some("Case"));
    assert_eq!(case.volume_ml, Some(375));
    assert!(case.discount.is_none());
}

#[test]
fn coles_missing_id_is_malformed() {
    let mut raw = coles_product();
    raw.id = None;
    let err = normalize(RawItem::Liquorland(coles_item(raw))).unwrap_err();
    assert!(
        matches!(
            err,
            ScraperError::MalformedRawItem {
                source_id: SourceId::Liquorland,
                ..
            }
        ),
        "expected MalformedRawItem, got: {err:?}"
    );
}

#[test]
fn coles_missing_url_is_malformed() {
    let mut raw = coles_product();
    raw.product_url = None;
    let err = normalize(RawItem::FirstChoiceLiquor(coles_item(raw))).unwrap_err();
    assert!(matches!(
        err,
        ScraperError::MalformedRawItem {
            source_id: SourceId::FirstChoiceLiquor,
            ..
        }
    ));
}

#[test]
fn coles_absent_price_block_leaves_prices_absent() {
    let mut raw = coles_product();
    raw.price = None;
    raw.multi_uom_price.clear();
    let product = normalize(RawItem::Liquorland(coles_item(raw))).unwrap();
    assert!(product.price.is_none());
    assert!(product.member_price.is_none());
    assert!(product.discount.is_none());
    assert!(product.unit_price.is_none());
    assert!(product.variants.is_empty());
}
