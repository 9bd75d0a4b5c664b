use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::{CollectionAddress, CourierConfig};
use crate::models::item::Destination;
use crate::models::parcel::Parcel;
use crate::models::pricing::round_gbp;

/// Couriers we are willing to book through the quote API. Matching is by
/// slug, never by substring of a display name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Courier {
    Ups,
    Parcelforce,
    Dhl,
}

impl Courier {
    pub fn slug(self) -> &'static str {
        match self {
            Courier::Ups => "ups",
            Courier::Parcelforce => "parcelforce",
            Courier::Dhl => "dhl",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "ups" => Some(Courier::Ups),
            "parcelforce" => Some(Courier::Parcelforce),
            "dhl" => Some(Courier::Dhl),
            _ => None,
        }
    }
}

/// UPS's standard collection service, preferred over every other quote.
const UPS_STANDARD_SLUG: &str = "ups-dap-uk-standard";

#[derive(Debug, Error)]
pub enum CourierError {
    #[error("courier API credentials not configured")]
    NotConfigured,
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("no quotes returned")]
    Empty,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServiceInfo {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "CourierName", default)]
    pub courier_name: Option<String>,
    #[serde(rename = "CourierSlug", default)]
    pub courier_slug: Option<String>,
    #[serde(rename = "CollectionType", default)]
    pub collection_type: Option<String>,
    #[serde(rename = "Slug", default)]
    pub slug: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CourierQuote {
    #[serde(rename = "Service", default)]
    pub service: Option<ServiceInfo>,
    #[serde(rename = "TotalPrice", default)]
    pub total_price: f64,
}

impl CourierQuote {
    fn courier(&self) -> Option<Courier> {
        self.service
            .as_ref()
            .and_then(|s| s.courier_slug.as_deref())
            .and_then(Courier::from_slug)
    }

    fn is_collection(&self) -> bool {
        self.service
            .as_ref()
            .and_then(|s| s.collection_type.as_deref())
            == Some("Collection")
    }

    fn service_slug(&self) -> Option<&str> {
        self.service.as_ref().and_then(|s| s.slug.as_deref())
    }
}

/// The envelope spells its quote list either `Quotes` or `quotes` depending
/// on API version; anything else degrades to fallback pricing.
#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    #[serde(rename = "Quotes", alias = "quotes", default)]
    quotes: Option<Vec<CourierQuote>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Clone, Debug)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// The winning live quote for a whole shipment.
#[derive(Clone, Debug)]
pub struct SelectedService {
    pub name: String,
    pub courier: Courier,
    pub total: Decimal,
}

/// Keep only collection services from allow-listed couriers.
pub fn collection_quotes(quotes: &[CourierQuote]) -> Vec<&CourierQuote> {
    quotes
        .iter()
        .filter(|q| q.is_collection() && q.courier().is_some())
        .collect()
}

/// Preference order: UPS standard service, else any UPS, else the first
/// Parcelforce quote. DHL passes the allow-list filter but is only ever
/// priced statically, so it is never selected here.
pub fn select_shipment_service(quotes: &[CourierQuote]) -> Option<SelectedService> {
    let mut ups_standard = None;
    let mut first_ups = None;
    let mut first_parcelforce = None;

    for quote in collection_quotes(quotes) {
        match quote.courier() {
            Some(Courier::Ups) => {
                if quote.service_slug() == Some(UPS_STANDARD_SLUG) && ups_standard.is_none() {
                    ups_standard = Some(quote);
                }
                if first_ups.is_none() {
                    first_ups = Some(quote);
                }
            }
            Some(Courier::Parcelforce) => {
                if first_parcelforce.is_none() {
                    first_parcelforce = Some(quote);
                }
            }
            _ => {}
        }
    }

    let quote = ups_standard.or(first_ups).or(first_parcelforce)?;
    Some(SelectedService {
        name: quote
            .service
            .as_ref()
            .and_then(|s| s.name.clone())
            .unwrap_or_else(|| "Courier Collection".to_string()),
        courier: quote.courier()?,
        total: round_gbp(Decimal::from_f64_retain(quote.total_price).unwrap_or(Decimal::ZERO)),
    })
}

#[derive(Serialize)]
struct DeliveryAddress {
    #[serde(rename = "Town")]
    town: String,
    #[serde(rename = "Postcode")]
    postcode: String,
    #[serde(rename = "Country")]
    country: String,
}

#[derive(Serialize)]
struct QuoteParcel {
    #[serde(rename = "Weight")]
    weight: u32,
    #[serde(rename = "Length")]
    length: u32,
    #[serde(rename = "Width")]
    width: u32,
    #[serde(rename = "Height")]
    height: u32,
    #[serde(rename = "Value")]
    value: u32,
}

impl QuoteParcel {
    /// The API wants whole kilograms and centimetres, rounded up.
    fn from_parcel(parcel: &Parcel) -> Self {
        Self {
            weight: parcel.weight_kg.ceil() as u32,
            length: (parcel.length_mm / 10.0).ceil() as u32,
            width: (parcel.width_mm / 10.0).ceil() as u32,
            height: (parcel.height_mm / 10.0).ceil() as u32,
            value: 100,
        }
    }
}

#[derive(Serialize)]
struct QuoteRequestBody {
    #[serde(rename = "CollectionAddress")]
    collection_address: CollectionAddress,
    #[serde(rename = "DeliveryAddress")]
    delivery_address: DeliveryAddress,
    #[serde(rename = "Parcels")]
    parcels: Vec<QuoteParcel>,
}

/// Client for the external courier-quote API. Holds the OAuth token cache:
/// read-mostly, replaced atomically on refresh, shared across requests.
pub struct CourierClient {
    http: reqwest::Client,
    config: CourierConfig,
    token: RwLock<Option<CachedToken>>,
}

impl CourierClient {
    pub fn new(config: CourierConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            config,
            token: RwLock::new(None),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Cached token while valid, otherwise a fresh one. Expiry carries a
    /// five-minute safety margin so a token never dies mid-request.
    async fn access_token(&self) -> Result<String, CourierError> {
        if let Some(cached) = self.token.read().as_ref() {
            if Utc::now() < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }
        self.refresh_token().await
    }

    async fn refresh_token(&self) -> Result<String, CourierError> {
        let (client_id, client_secret) =
            match (&self.config.client_id, &self.config.client_secret) {
                (Some(id), Some(secret)) => (id.as_str(), secret.as_str()),
                _ => return Err(CourierError::NotConfigured),
            };

        tracing::debug!("refreshing courier API access token");
        let response = self
            .http
            .post(format!("{}/auth/connect/token", self.config.base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CourierError::Auth(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CourierError::Malformed(e.to_string()))?;

        let expires_at =
            Utc::now() + chrono::Duration::seconds((token.expires_in - 300).max(0));
        *self.token.write() = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at,
        });

        Ok(token.access_token)
    }

    /// One batched quote request covering every eligible parcel. Single
    /// attempt, bounded timeout; every failure mode maps to an error the
    /// orchestrator turns into static fallback.
    pub async fn shipment_quotes(
        &self,
        parcels: &[Parcel],
        destination: &Destination,
    ) -> Result<Vec<CourierQuote>, CourierError> {
        let token = self.access_token().await?;

        let body = QuoteRequestBody {
            collection_address: self.config.collection.clone(),
            delivery_address: DeliveryAddress {
                town: destination
                    .city
                    .clone()
                    .unwrap_or_else(|| "London".to_string()),
                postcode: destination.postal_code.clone(),
                country: destination.country.clone(),
            },
            parcels: parcels.iter().map(QuoteParcel::from_parcel).collect(),
        };

        let response = self
            .http
            .post(format!("{}/api/quotes", self.config.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CourierError::Upstream(format!(
                "quote endpoint returned {}",
                response.status()
            )));
        }

        let envelope: QuoteEnvelope = response
            .json()
            .await
            .map_err(|e| CourierError::Malformed(e.to_string()))?;

        if let Some(message) = envelope.error {
            return Err(CourierError::Upstream(message));
        }

        let quotes = envelope.quotes.unwrap_or_default();
        if quotes.is_empty() {
            return Err(CourierError::Empty);
        }

        tracing::info!(quotes = quotes.len(), "courier quotes received");
        Ok(quotes)
    }
}
