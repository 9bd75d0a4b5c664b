pub mod item;
pub mod parcel;
pub mod pricing;

pub use item::{Bundle, Destination, Item, QuotePreferences, QuoteRequest, UnitBoard};
pub use parcel::{girth_mm, Parcel};
pub use pricing::{
    round_gbp, PackageDetail, PriceAllocation, PricingBand, QuoteResponse, QuoteSource,
    ServiceCharge, ShipmentCharge,
};
