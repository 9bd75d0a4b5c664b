use serde::{Deserialize, Serialize};

/// One input line from the cart. Dimensions are millimetres, weight kilograms.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub name: String,
    pub length_mm: f64,
    pub width_mm: f64,
    pub thickness_mm: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty: Option<u32>,
    #[serde(default)]
    pub keep_together: bool,
}

impl Item {
    pub fn effective_qty(&self) -> u32 {
        self.qty.unwrap_or(1).max(1)
    }
}

/// One physical board after quantity expansion; weight is always populated.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitBoard {
    pub name: String,
    pub length_mm: f64,
    pub width_mm: f64,
    pub thickness_mm: f64,
    pub weight_kg: f64,
}

/// A keep-together stack of identical boards. Never expanded into units;
/// the quantity drives height stacking instead.
#[derive(Clone, Debug)]
pub struct Bundle {
    pub board: UnitBoard,
    pub quantity: u32,
}

impl Bundle {
    pub fn total_weight_kg(&self) -> f64 {
        self.board.weight_kg * f64::from(self.quantity)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Destination {
    pub country: String,
    #[serde(rename = "postalCode")]
    pub postal_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QuotePreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    #[serde(default, rename = "allowSplit", skip_serializing_if = "Option::is_none")]
    pub allow_split: Option<bool>,
    #[serde(default, rename = "maxWaitSeconds", skip_serializing_if = "Option::is_none")]
    pub max_wait_seconds: Option<u32>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct QuoteRequest {
    #[serde(default, rename = "cartId")]
    pub cart_id: Option<String>,
    #[serde(default)]
    pub destination: Option<Destination>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub preferences: Option<QuotePreferences>,
}
