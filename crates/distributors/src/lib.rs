//! HTTP implementation of the distributor contract.

use std::sync::Arc;
use std::time::Duration;

use offerhub_core::config::AppConfig;
use offerhub_core::gateway::{DistributorClient, DistributorGateway};

pub mod client;
pub mod wire;

pub use client::{HttpClientSettings, HttpDistributorClient};

impl HttpClientSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            request_timeout: Duration::from_secs(config.gateway.request_timeout_secs),
            probe_timeout: Duration::from_secs(config.gateway.probe_timeout_secs),
            accept_invalid_certs: config.gateway.accept_invalid_certs,
        }
    }
}

/// One pooled HTTP client per configured distributor, behind one gateway.
pub fn build_gateway(config: &AppConfig) -> Result<DistributorGateway, reqwest::Error> {
    let settings = HttpClientSettings::from_config(config);
    let clients = config
        .distributors
        .iter()
        .cloned()
        .map(|distributor| {
            HttpDistributorClient::new(distributor, &settings)
                .map(|client| Arc::new(client) as Arc<dyn DistributorClient>)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DistributorGateway::new(clients))
}
