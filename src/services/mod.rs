pub mod courier;
pub mod expander;
pub mod packer;
pub mod pricing;
pub mod quote;

use std::sync::Arc;

use crate::config::Config;

pub struct AppState {
    pub config: Config,
    pub quotes: quote::QuoteService,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let courier = Arc::new(courier::CourierClient::new(config.courier.clone())?);
        let quotes = quote::QuoteService::new(&config, courier);

        Ok(Self { config, quotes })
    }
}
