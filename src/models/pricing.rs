use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::parcel::Parcel;

/// Round a currency amount to 2 dp. Applied at every aggregation step so
/// totals never drift from the per-parcel figures.
pub fn round_gbp(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// One rung of the static price ladder. Bands are ordered; the first band
/// whose defined ceilings are all satisfied wins, and the final band carries
/// no ceiling at all.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PricingBand {
    pub name: String,
    /// Discount grouping, e.g. "DHL Express". Parcels priced from bands of
    /// the same family count toward the multi-package discount together.
    pub family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_girth_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_weight_kg: Option<f64>,
    pub price: Decimal,
}

impl PricingBand {
    pub fn accepts(&self, parcel: &Parcel) -> bool {
        if let Some(max_girth) = self.max_girth_mm {
            if parcel.girth_mm > max_girth {
                return false;
            }
        }
        if let Some(max_weight) = self.max_weight_kg {
            if parcel.weight_kg > max_weight {
                return false;
            }
        }
        true
    }
}

/// Where the headline price came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    Live,
    Static,
}

/// A live quote that covers the whole eligible shipment as one charge. The
/// covered parcels carry zero marginal price; this total is combined with the
/// statically priced remainder at the end.
#[derive(Clone, Debug, Serialize)]
pub struct ShipmentCharge {
    pub service: String,
    pub total: Decimal,
}

/// Outcome of the pricing pass: per-parcel prices live on the parcels
/// themselves, a shipment-level live charge (if any) is tracked separately.
#[derive(Clone, Debug)]
pub struct PriceAllocation {
    pub shipment: Option<ShipmentCharge>,
    pub source: QuoteSource,
}

#[derive(Clone, Debug, Serialize)]
pub struct ServiceCharge {
    pub service: String,
    pub price: Decimal,
}

/// Human-readable per-parcel summary for the storefront.
#[derive(Clone, Debug, Serialize)]
pub struct PackageDetail {
    #[serde(rename = "packageNumber")]
    pub package_number: usize,
    pub items: Vec<String>,
    #[serde(rename = "totalWeight")]
    pub total_weight: String,
    pub dimensions: String,
    pub service: String,
    pub price: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct QuoteResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,
    pub total: Decimal,
    pub currency: String,
    pub packages: Vec<Parcel>,
    #[serde(rename = "detailedPackages")]
    pub detailed_packages: Vec<PackageDetail>,
    pub breakdown: Vec<ServiceCharge>,
    pub source: QuoteSource,
    pub copy: String,
    #[serde(rename = "discountMessage", skip_serializing_if = "Option::is_none")]
    pub discount_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parcel(girth_mm: f64, weight_kg: f64) -> Parcel {
        let mut p = Parcel::empty();
        p.length_mm = girth_mm / 2.0;
        p.width_mm = girth_mm / 8.0;
        p.height_mm = girth_mm / 8.0;
        p.weight_kg = weight_kg;
        p.update_girth();
        p
    }

    #[test]
    fn round_gbp_half_up() {
        assert_eq!(round_gbp(dec!(137.025)), dec!(137.03));
        assert_eq!(round_gbp(dec!(13.702)), dec!(13.70));
    }

    #[test]
    fn band_rejects_over_girth() {
        let band = PricingBand {
            name: "Standard".to_string(),
            family: "Standard".to_string(),
            max_girth_mm: Some(3000.0),
            max_weight_kg: None,
            price: dec!(25),
        };

        assert!(band.accepts(&parcel(2300.0, 12.0)));
        assert!(!band.accepts(&parcel(3100.0, 12.0)));
    }

    #[test]
    fn unbounded_band_accepts_everything() {
        let band = PricingBand {
            name: "DHL Express XL".to_string(),
            family: "DHL Express".to_string(),
            max_girth_mm: None,
            max_weight_kg: None,
            price: dec!(89.67),
        };

        assert!(band.accepts(&parcel(9000.0, 44.0)));
    }
}
