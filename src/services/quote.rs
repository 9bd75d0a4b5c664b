use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::config::Config;
use crate::models::item::{Item, QuoteRequest};
use crate::models::parcel::Parcel;
use crate::models::pricing::{
    round_gbp, PackageDetail, PriceAllocation, QuoteResponse, QuoteSource, ServiceCharge,
    ShipmentCharge,
};

use super::courier::{self, CourierClient};
use super::expander;
use super::packer::Packer;
use super::pricing::{Discount, PricingEngine};

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("No items provided")]
    NoItems,
    #[error("No destination provided")]
    NoDestination,
}

/// Sequences a quote request: validate, pack, partition by live-quote
/// eligibility, attempt one batched live quote, price the rest statically,
/// apply the discount, assemble the response. Live-quote failures of any
/// kind degrade to static pricing and never fail the request.
pub struct QuoteService {
    packer: Packer,
    pricing: PricingEngine,
    courier: Arc<CourierClient>,
    density_kg_m3: f64,
}

impl QuoteService {
    pub fn new(config: &Config, courier: Arc<CourierClient>) -> Self {
        Self {
            packer: Packer::new(&config.packing),
            pricing: PricingEngine::new(config),
            courier,
            density_kg_m3: config.packing.density_kg_m3,
        }
    }

    pub async fn quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, QuoteError> {
        if request.items.is_empty() {
            return Err(QuoteError::NoItems);
        }
        let destination = request.destination.as_ref().ok_or(QuoteError::NoDestination)?;

        tracing::info!(
            cart_id = request.cart_id.as_deref().unwrap_or("-"),
            country = %destination.country,
            items = request.items.len(),
            "processing quote request"
        );

        let expanded = expander::expand_items(&request.items, self.density_kg_m3);
        let mut parcels = self.packer.pack(&expanded);

        let eligible: Vec<usize> = parcels
            .iter()
            .enumerate()
            .filter(|(_, p)| self.pricing.is_live_eligible(p))
            .map(|(i, _)| i)
            .collect();

        let mut shipment: Option<ShipmentCharge> = None;
        if self.courier.is_configured() && !eligible.is_empty() {
            let eligible_parcels: Vec<Parcel> =
                eligible.iter().map(|&i| parcels[i].clone()).collect();
            match self
                .courier
                .shipment_quotes(&eligible_parcels, destination)
                .await
            {
                Ok(quotes) => match courier::select_shipment_service(&quotes) {
                    Some(selected) => {
                        tracing::info!(
                            service = %selected.name,
                            total = %selected.total,
                            parcels = eligible.len(),
                            "live quote covers eligible shipment"
                        );
                        for &i in &eligible {
                            parcels[i].service = Some(selected.name.clone());
                            parcels[i].price = Some(Decimal::ZERO);
                        }
                        shipment = Some(ShipmentCharge {
                            service: selected.name,
                            total: selected.total,
                        });
                    }
                    None => {
                        tracing::warn!(
                            "no preferred collection service among live quotes, using static pricing"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "live quote failed, falling back to static pricing");
                }
            }
        }

        for parcel in parcels.iter_mut().filter(|p| p.price.is_none()) {
            self.pricing.price_static(parcel);
        }

        let allocation = PriceAllocation {
            source: if shipment.is_some() {
                QuoteSource::Live
            } else {
                QuoteSource::Static
            },
            shipment,
        };

        let discount = self.pricing.discount(&parcels);

        let static_sum: Decimal = parcels.iter().filter_map(|p| p.price).sum();
        let live_total = allocation
            .shipment
            .as_ref()
            .map(|s| s.total)
            .unwrap_or(Decimal::ZERO);
        let subtotal = round_gbp(static_sum + live_total);
        let total = round_gbp(subtotal - discount.amount);

        Ok(assemble_response(
            &request.items,
            parcels,
            discount,
            subtotal,
            total,
            allocation,
        ))
    }
}

fn assemble_response(
    items: &[Item],
    parcels: Vec<Parcel>,
    discount: Discount,
    subtotal: Decimal,
    total: Decimal,
    allocation: PriceAllocation,
) -> QuoteResponse {
    let multi_parcel = parcels.len() >= 2;

    let breakdown = parcels
        .iter()
        .map(|p| ServiceCharge {
            service: p.service.clone().unwrap_or_default(),
            price: p.price.unwrap_or(Decimal::ZERO),
        })
        .collect();

    let detailed_packages = parcels
        .iter()
        .enumerate()
        .map(|(index, parcel)| PackageDetail {
            package_number: index + 1,
            items: parcel
                .items
                .iter()
                .map(|stored| item_display(items, stored))
                .collect(),
            total_weight: format!("{} kg", parcel.weight_kg.round()),
            dimensions: format!(
                "{} x {} x {} cm",
                (parcel.length_mm / 10.0).round(),
                (parcel.width_mm / 10.0).round(),
                (parcel.height_mm / 10.0).round()
            ),
            service: parcel.service.clone().unwrap_or_default(),
            price: parcel.price.unwrap_or(Decimal::ZERO),
        })
        .collect();

    let discount_message = if multi_parcel {
        Some(match (&discount.family, discount.amount > Decimal::ZERO) {
            (Some(family), true) => format!(
                "{} {} packages - 10% discount on {} portion",
                discount.parcel_count, family, family
            ),
            _ => format!("{} packages - no discount applied", parcels.len()),
        })
    } else {
        None
    };

    let copy = match allocation.source {
        QuoteSource::Live => "Live shipping rates from Parcel2Go carriers.".to_string(),
        QuoteSource::Static => {
            "We've checked the best and cheapest option for your order.".to_string()
        }
    };

    QuoteResponse {
        status: "done".to_string(),
        subtotal: multi_parcel.then_some(subtotal),
        discount: multi_parcel.then_some(discount.amount),
        total,
        currency: "GBP".to_string(),
        packages: parcels,
        detailed_packages,
        breakdown,
        source: allocation.source,
        copy,
        discount_message,
    }
}

/// Storefront line for one packed board, matched back to the original cart
/// item for its raw dimensions. Bundle entries carry an " xN" suffix.
fn item_display(items: &[Item], stored: &str) -> String {
    let matched = items.iter().find(|i| i.name == stored).or_else(|| {
        stored
            .rsplit_once(" x")
            .and_then(|(base, _)| items.iter().find(|i| i.name == base))
    });

    match matched {
        Some(item) => {
            let mut line = format!(
                "{} ({} x {} x {} mm)",
                stored, item.length_mm, item.width_mm, item.thickness_mm
            );
            if let Some(weight) = item.weight_kg {
                line.push_str(&format!(" - {} kg", (weight * 10.0).round() / 10.0));
            }
            line
        }
        None => stored.to_string(),
    }
}
