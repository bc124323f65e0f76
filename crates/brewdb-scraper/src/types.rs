//! Raw, source-native item shapes.
//!
//! These exist only between extraction and normalization. Every field is
//! optional and defaulted: the storefronts omit fields freely and the
//! normalizer decides what is mandatory.
//!
//! ## Beer Cartel (Shopify storefront)
//! Listing pages embed `addCachedProductData([...])` with Shopify's product
//! JSON. Prices are integer cents; ids are numbers; images are
//! protocol-relative (`//beercartel.com.au/cdn/...`).
//!
//! ## Liquorland / First Choice Liquor
//! Both run on the same retail platform and share one API shape. Prices are
//! JSON numbers in dollars; ids look like `"1234567_EA"` where the suffix is
//! the unit of measure; `productUrl` is site-relative. Pack options are listed
//! in `multiUOMPrice`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A raw item tagged with the source it came from.
#[derive(Debug, Clone)]
pub enum RawItem {
    BeerCartel(BeerCartelItem),
    Liquorland(ColesItem),
    FirstChoiceLiquor(ColesItem),
}

// ---------------------------------------------------------------------------
// Beer Cartel
// ---------------------------------------------------------------------------

/// One listing card plus whatever the detail page added.
#[derive(Debug, Clone)]
pub struct BeerCartelItem {
    pub card: BeerCartelCard,
    /// Default (all `None`) when the detail page could not be loaded.
    pub detail: BeerCartelDetail,
    /// Storefront origin used to build absolute product and image URLs.
    pub origin: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BeerCartelCard {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    /// Raw HTML description.
    #[serde(default)]
    pub description: Option<String>,
    /// Cents.
    #[serde(default)]
    pub price: Option<Value>,
    /// Cents; `null` when not on sale.
    #[serde(default)]
    pub compare_at_price: Option<Value>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub variants: Vec<BeerCartelVariant>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BeerCartelVariant {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    /// Pack label, e.g. `"4 Pack"`, `"Case (16)"`, `"Single"`.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub compare_at_price: Option<Value>,
}

/// Fields only the product detail page exposes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeerCartelDetail {
    pub rating_average: Option<f64>,
    pub rating_total: Option<u32>,
    /// Plain-text description, used when the card has none.
    pub description: Option<String>,
    /// Size text such as `"375mL"` from the product details table.
    pub volume_text: Option<String>,
}

// ---------------------------------------------------------------------------
// Liquorland / First Choice Liquor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ColesItem {
    pub product: ColesProduct,
    pub origin: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColesProduct {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub product_url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub price: Option<ColesPrice>,
    #[serde(default)]
    pub ratings: Option<ColesRatings>,
    #[serde(default)]
    pub unit_of_measure_label: Option<String>,
    #[serde(default)]
    pub unit_of_measure: Option<String>,
    #[serde(default)]
    pub product_properties: Vec<ColesProperty>,
    #[serde(default, rename = "multiUOMPrice")]
    pub multi_uom_price: Vec<ColesVariant>,
}

impl ColesProduct {
    /// Value of the first product property whose key matches one of `keys`
    /// (case-insensitive).
    #[must_use]
    pub fn property(&self, keys: &[&str]) -> Option<&str> {
        self.product_properties
            .iter()
            .find(|p| {
                p.key
                    .as_deref()
                    .is_some_and(|k| keys.iter().any(|want| k.eq_ignore_ascii_case(want)))
            })
            .and_then(|p| p.value.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColesPrice {
    #[serde(default)]
    pub current: Option<Value>,
    #[serde(default)]
    pub normal: Option<Value>,
    #[serde(default)]
    pub member_only_price: Option<Value>,
    #[serde(default)]
    pub unit_price: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColesRatings {
    #[serde(default)]
    pub average: Option<Value>,
    #[serde(default)]
    pub total: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColesProperty {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColesVariant {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub unit_of_measure_label: Option<String>,
    #[serde(default)]
    pub unit_of_measure: Option<String>,
    #[serde(default)]
    pub price: Option<ColesPrice>,
    #[serde(default)]
    pub product_url: Option<String>,
}

/// One page of the product listing API.
#[derive(Debug, Deserialize)]
pub struct ColesListResponse {
    /// Items stay untyped here so one malformed item does not sink the page.
    pub products: Vec<Value>,
    #[serde(default)]
    pub meta: Option<ColesMeta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColesMeta {
    #[serde(default)]
    pub page: Option<ColesPageMeta>,
    #[serde(default)]
    pub total_results: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColesPageMeta {
    #[serde(default)]
    pub current: Option<u32>,
    /// Total number of pages.
    #[serde(default)]
    pub total: Option<u32>,
}

/// Response of the single-product endpoint (`{endpoint}/{id}?catalogue=1`).
#[derive(Debug, Deserialize)]
pub struct ColesDetailResponse {
    pub product: ColesProduct,
}

/// Accepts an id as a JSON string or number; empty strings become `None`.
fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn card_accepts_numeric_id() {
        let card: BeerCartelCard = serde_json::from_value(json!({
            "id": 6_789_012_345_678_i64,
            "title": "Pacific Ale",
            "price": 2499
        }))
        .unwrap();
        assert_eq!(card.id.as_deref(), Some("6789012345678"));
        assert!(card.variants.is_empty());
    }

    #[test]
    fn card_treats_blank_id_as_missing() {
        let card: BeerCartelCard = serde_json::from_value(json!({"id": "  "})).unwrap();
        assert!(card.id.is_none());
    }

    #[test]
    fn coles_product_reads_camel_case_fields() {
        let product: ColesProduct = serde_json::from_value(json!({
            "id": "2547382_EA",
            "name": "Stone & Wood Pacific Ale Can 375mL",
            "productUrl": "/beer/2547382",
            "unitOfMeasureLabel": "Can",
            "price": {"current": 6.5, "normal": 7, "memberOnlyPrice": 6},
            "ratings": {"average": 4.6, "total": 31},
            "multiUOMPrice": [{"id": "2547382_CS", "unitOfMeasureLabel": "Case"}]
        }))
        .unwrap();
        assert_eq!(product.id.as_deref(), Some("2547382_EA"));
        assert_eq!(product.product_url.as_deref(), Some("/beer/2547382"));
        assert_eq!(product.multi_uom_price.len(), 1);
        assert!(product.price.unwrap().member_only_price.is_some());
    }

    #[test]
    fn property_lookup_is_case_insensitive() {
        let product: ColesProduct = serde_json::from_value(json!({
            "productProperties": [
                {"key": "Style", "value": "Pale Ale"},
                {"key": "LIQUOR SIZE", "value": "375mL"}
            ]
        }))
        .unwrap();
        assert_eq!(product.property(&["Liquor Size", "Volume"]), Some("375mL"));
        assert!(product.property(&["Country"]).is_none());
    }

    #[test]
    fn list_response_requires_products_array() {
        let result = serde_json::from_value::<ColesListResponse>(json!({"meta": {}}));
        assert!(result.is_err());
    }
}
