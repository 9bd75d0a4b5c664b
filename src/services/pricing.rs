use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::Config;
use crate::models::parcel::Parcel;
use crate::models::pricing::{round_gbp, PricingBand};

const DISCOUNT_RATE: Decimal = dec!(0.10);

/// Static tier selection plus the multi-package discount rules. Live-quote
/// allocation happens in the orchestrator; this engine only ever sees the
/// parcels the live path did not cover.
pub struct PricingEngine {
    ladder: Vec<PricingBand>,
    oversized_max_weight_kg: f64,
    live_max_weight_kg: f64,
    live_girth_cap_mm: f64,
}

/// Outcome of the discount pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Discount {
    pub amount: Decimal,
    pub family: Option<String>,
    pub parcel_count: usize,
}

impl Discount {
    fn none() -> Self {
        Self {
            amount: Decimal::ZERO,
            family: None,
            parcel_count: 0,
        }
    }
}

impl PricingEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            ladder: config.ladder.clone(),
            oversized_max_weight_kg: config.packing.oversized_max_weight_kg,
            live_max_weight_kg: config.packing.max_weight_kg,
            live_girth_cap_mm: config.packing.girth_cap_mm,
        }
    }

    /// Parcels small and light enough for the live-quote service.
    pub fn is_live_eligible(&self, parcel: &Parcel) -> bool {
        parcel.girth_mm <= self.live_girth_cap_mm && parcel.weight_kg <= self.live_max_weight_kg
    }

    /// Price one parcel from the static ladder. Parcels beyond the oversized
    /// hard ceiling are unshippable: marked OVERWEIGHT at zero price with an
    /// explanatory error, never dropped.
    pub fn price_static(&self, parcel: &mut Parcel) {
        if parcel.weight_kg > self.oversized_max_weight_kg {
            parcel.service = Some("OVERWEIGHT".to_string());
            parcel.price = Some(Decimal::ZERO);
            parcel.error = Some(format!(
                "Package exceeds {}kg carrier limit ({}kg)",
                self.oversized_max_weight_kg, parcel.weight_kg
            ));
            tracing::warn!(
                weight_kg = parcel.weight_kg,
                limit_kg = self.oversized_max_weight_kg,
                "parcel overweight, unshippable"
            );
            return;
        }

        let band = self.band_for(parcel);
        parcel.service = Some(band.name.clone());
        parcel.price = Some(band.price);
        tracing::debug!(
            girth_mm = parcel.girth_mm,
            weight_kg = parcel.weight_kg,
            service = %band.name,
            price = %band.price,
            "static tier selected"
        );
    }

    /// First band whose ceilings are satisfied; the last band is the
    /// catch-all.
    fn band_for(&self, parcel: &Parcel) -> &PricingBand {
        self.ladder
            .iter()
            .find(|band| band.accepts(parcel))
            .unwrap_or_else(|| {
                self.ladder
                    .last()
                    .expect("pricing ladder is never empty")
            })
    }

    /// Flat 10% off when exactly one tier family priced two or more parcels
    /// statically. Live charges and OVERWEIGHT parcels never participate.
    /// Pure over the parcel prices, so recomputing it is idempotent.
    pub fn discount(&self, parcels: &[Parcel]) -> Discount {
        if parcels.len() < 2 {
            return Discount::none();
        }

        let mut families: HashMap<&str, (usize, Decimal)> = HashMap::new();
        for parcel in parcels {
            let Some(service) = parcel.service.as_deref() else {
                continue;
            };
            let Some(price) = parcel.price else {
                continue;
            };
            if price <= Decimal::ZERO {
                continue;
            }
            let Some(band) = self.ladder.iter().find(|b| b.name == service) else {
                // Live service names are not in the ladder.
                continue;
            };
            let entry = families.entry(band.family.as_str()).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += price;
        }

        let mut qualifying = families.iter().filter(|(_, (count, _))| *count >= 2);
        match (qualifying.next(), qualifying.next()) {
            (Some((family, (count, sum))), None) => {
                let amount = round_gbp(sum * DISCOUNT_RATE);
                tracing::info!(
                    family = %family,
                    parcels = count,
                    discount = %amount,
                    "multi-package discount applied"
                );
                Discount {
                    amount,
                    family: Some((*family).to_string()),
                    parcel_count: *count,
                }
            }
            _ => Discount::none(),
        }
    }
}
