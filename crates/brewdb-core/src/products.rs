use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One of the three storefronts the scraper knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceId {
    #[serde(rename = "beercartel")]
    BeerCartel,
    #[serde(rename = "liquorland")]
    Liquorland,
    #[serde(rename = "firstchoiceliquor")]
    FirstChoiceLiquor,
}

impl SourceId {
    pub const ALL: [SourceId; 3] = [
        SourceId::BeerCartel,
        SourceId::Liquorland,
        SourceId::FirstChoiceLiquor,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::BeerCartel => "beercartel",
            SourceId::Liquorland => "liquorland",
            SourceId::FirstChoiceLiquor => "firstchoiceliquor",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown source '{s}'"))
    }
}

/// Identity of a product across runs: ids are only unique within a source.
pub type ProductKey = (SourceId, String);

/// A product listing normalized from any of the supported storefronts.
///
/// Optional fields are `None` when the storefront does not expose the value.
/// They serialize as `null` rather than a zero or empty string so that
/// downstream readers can tell "missing" apart from a real value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProduct {
    pub source: SourceId,
    /// Source-scoped product identifier. Never empty.
    pub id: String,
    pub name: String,
    pub brand: String,
    /// Plain text, HTML stripped and whitespace collapsed.
    pub description: String,
    /// Current shelf price (AUD).
    pub price: Option<Decimal>,
    pub member_price: Option<Decimal>,
    /// Saving against the normal/compare-at price, when the storefront shows one.
    pub discount: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub volume_ml: Option<u32>,
    /// Free-text pack label, e.g. `"6 Pack"` or `"24 x 375mL"`.
    pub unit: Option<String>,
    pub rating_average: Option<f64>,
    pub rating_total: Option<u32>,
    /// Absolute image URLs in storefront display order.
    pub image_urls: Vec<String>,
    /// Absolute URL of the product page. Never empty.
    pub product_url: String,
    pub variants: Vec<CanonicalVariant>,
}

impl CanonicalProduct {
    #[must_use]
    pub fn key(&self) -> ProductKey {
        (self.source, self.id.clone())
    }
}

/// A pack size or option of a [`CanonicalProduct`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalVariant {
    pub id: Option<String>,
    pub unit: Option<String>,
    pub volume_ml: Option<u32>,
    pub price: Option<Decimal>,
    pub member_price: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub product_url: Option<String>,
}
