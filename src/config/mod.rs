use anyhow::Context;
use once_cell::sync::Lazy;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::env;
use std::path::Path;

use crate::models::PricingBand;
use crate::services::packer::PackingStrategy;

/// Fixed collection point the courier picks parcels up from.
#[derive(Clone, Debug, serde::Serialize)]
pub struct CollectionAddress {
    #[serde(rename = "Address1")]
    pub address1: String,
    #[serde(rename = "Address2")]
    pub address2: String,
    #[serde(rename = "Town")]
    pub town: String,
    #[serde(rename = "County")]
    pub county: String,
    #[serde(rename = "Postcode")]
    pub postcode: String,
    #[serde(rename = "Country")]
    pub country: String,
}

#[derive(Clone, Debug)]
pub struct CourierConfig {
    pub base_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub timeout_secs: u64,
    pub collection: CollectionAddress,
}

impl CourierConfig {
    /// Live quoting is only attempted when credentials are present.
    pub fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct PackingConfig {
    pub padding_mm: f64,
    pub density_kg_m3: f64,
    /// Standard carrier cap, also the keep-together bundle split threshold.
    pub max_weight_kg: f64,
    /// Oversized carrier cap; parcels beyond this are unshippable.
    pub oversized_max_weight_kg: f64,
    /// Girth ceiling for the small-carrier phase and for live-quote
    /// eligibility.
    pub girth_cap_mm: f64,
    pub strategy: PackingStrategy,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub packing: PackingConfig,
    pub courier: CourierConfig,
    pub ladder: Vec<PricingBand>,
}

static DEFAULT_LADDER: Lazy<Vec<PricingBand>> = Lazy::new(|| {
    vec![
        PricingBand {
            name: "Standard".to_string(),
            family: "Standard".to_string(),
            max_girth_mm: Some(3000.0),
            max_weight_kg: None,
            price: dec!(25.00),
        },
        PricingBand {
            name: "DHL Express Medium".to_string(),
            family: "DHL Express".to_string(),
            max_girth_mm: Some(3200.0),
            max_weight_kg: None,
            price: dec!(68.51),
        },
        PricingBand {
            name: "DHL Express Large".to_string(),
            family: "DHL Express".to_string(),
            max_girth_mm: Some(3600.0),
            max_weight_kg: None,
            price: dec!(74.76),
        },
        PricingBand {
            name: "DHL Express XL".to_string(),
            family: "DHL Express".to_string(),
            max_girth_mm: None,
            max_weight_kg: None,
            price: dec!(89.67),
        },
    ]
});

#[derive(Deserialize)]
struct LadderFile {
    ladder: Vec<PricingBand>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let ladder = match env::var("PRICING_LADDER_PATH") {
            Ok(path) => load_ladder(Path::new(&path))?,
            Err(_) => DEFAULT_LADDER.clone(),
        };

        Ok(Config {
            port: env_parsed("PORT", 8787)?,
            packing: PackingConfig {
                padding_mm: env_parsed("PADDING_MM", 30.0)?,
                density_kg_m3: env_parsed("DENSITY_KG_M3", 520.0)?,
                max_weight_kg: env_parsed("MAX_WEIGHT_KG", 30.0)?,
                oversized_max_weight_kg: env_parsed("OVERSIZED_MAX_WEIGHT_KG", 45.0)?,
                girth_cap_mm: env_parsed("GIRTH_CAP_MM", 3000.0)?,
                strategy: env::var("PACKING_STRATEGY")
                    .ok()
                    .map(|s| s.parse())
                    .transpose()
                    .map_err(|e: String| anyhow::anyhow!(e))?
                    .unwrap_or_default(),
            },
            courier: CourierConfig {
                base_url: env::var("COURIER_BASE_URL")
                    .unwrap_or_else(|_| "https://www.parcel2go.com".to_string()),
                client_id: env::var("COURIER_CLIENT_ID").ok(),
                client_secret: env::var("COURIER_CLIENT_SECRET").ok(),
                timeout_secs: env_parsed("COURIER_TIMEOUT_SECS", 10)?,
                collection: CollectionAddress {
                    address1: env::var("COLLECTION_ADDRESS1")
                        .unwrap_or_else(|_| "Unit 1".to_string()),
                    address2: env::var("COLLECTION_ADDRESS2")
                        .unwrap_or_else(|_| "Pine Workshop".to_string()),
                    town: env::var("COLLECTION_TOWN")
                        .unwrap_or_else(|_| "High Wycombe".to_string()),
                    county: env::var("COLLECTION_COUNTY")
                        .unwrap_or_else(|_| "Buckinghamshire".to_string()),
                    postcode: env::var("COLLECTION_POSTCODE")
                        .unwrap_or_else(|_| "HP12 3RL".to_string()),
                    country: env::var("COLLECTION_COUNTRY").unwrap_or_else(|_| "GB".to_string()),
                },
            },
            ladder,
        })
    }

    pub fn default_ladder() -> Vec<PricingBand> {
        DEFAULT_LADDER.clone()
    }
}

fn load_ladder(path: &Path) -> anyhow::Result<Vec<PricingBand>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading pricing ladder from {}", path.display()))?;
    let file: LadderFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing pricing ladder from {}", path.display()))?;
    anyhow::ensure!(!file.ladder.is_empty(), "pricing ladder is empty");
    Ok(file.ladder)
}

fn env_parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw}")),
        Err(_) => Ok(default),
    }
}
