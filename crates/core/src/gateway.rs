//! Distributor gateway: one parameterised path for every configured distributor.
//!
//! [`DistributorClient`] is the per-distributor transport (HTTP in production,
//! scripted fakes in tests). [`DistributorGateway`] fans requests out to all
//! clients concurrently, waits for every call to settle, and isolates failures
//! so one distributor never aborts the batch for the others. Timeouts belong to
//! the client; an expired call surfaces as [`GatewayError::Transport`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::distributor::{Distributor, DistributorId};
use crate::domain::offer::CatalogOffer;
use crate::domain::product::{CatalogProduct, ProductId};
use crate::domain::quote::{QuoteStatus, ReceivedQuote};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("transport failure calling `{distributor}`: {message}")]
    Transport { distributor: DistributorId, message: String },
    #[error("`{distributor}` responded with status {status}: {message}")]
    Remote { distributor: DistributorId, status: u16, message: String },
    #[error("`{distributor}` returned an unexpected payload: {message}")]
    Decode { distributor: DistributorId, message: String },
    #[error("unknown distributor `{0}`")]
    UnknownDistributor(DistributorId),
}

impl GatewayError {
    pub fn distributor(&self) -> &DistributorId {
        match self {
            Self::Transport { distributor, .. }
            | Self::Remote { distributor, .. }
            | Self::Decode { distributor, .. } => distributor,
            Self::UnknownDistributor(distributor) => distributor,
        }
    }

    /// Quote status recorded when a placement fails with this error: the
    /// distributor answered with an error (Failed) or never answered (Error).
    pub fn placement_status(&self) -> QuoteStatus {
        match self {
            Self::Remote { .. } | Self::Decode { .. } => QuoteStatus::Failed,
            Self::Transport { .. } | Self::UnknownDistributor(_) => QuoteStatus::Error,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Remote { .. } => "remote",
            Self::Decode { .. } => "decode",
            Self::UnknownDistributor(_) => "unknown_distributor",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorOrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// A concrete order placed with one distributor for the lines it won.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorOrder {
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub shipping_address: String,
    pub total_amount: Decimal,
    pub order_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub items: Vec<DistributorOrderItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementReceipt {
    pub distributor_order_id: String,
    pub status: String,
    pub message: Option<String>,
    pub estimated_delivery_days: Option<u32>,
    pub delivery_estimate: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub quotation_id: i64,
    pub status: QuoteStatus,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub distributor_id: DistributorId,
    pub url: String,
    pub connected: bool,
    pub response_time_ms: u64,
    pub checked_at: DateTime<Utc>,
    pub detail: String,
}

/// Result of one solicitation round across every distributor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Solicitation {
    pub quotes: Vec<ReceivedQuote>,
    pub failures: Vec<GatewayError>,
}

#[async_trait]
pub trait DistributorClient: Send + Sync {
    fn distributor(&self) -> &Distributor;

    async fn request_quotation(
        &self,
        request: &QuotationRequest,
    ) -> Result<ReceivedQuote, GatewayError>;

    async fn fetch_catalog(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<CatalogProduct>, GatewayError>;

    async fn place_order(&self, order: &DistributorOrder)
        -> Result<PlacementReceipt, GatewayError>;

    async fn update_quotation_status(&self, update: &StatusUpdate) -> Result<(), GatewayError>;

    async fn probe(&self) -> ProbeReport;
}

#[derive(Clone)]
pub struct DistributorGateway {
    clients: Vec<Arc<dyn DistributorClient>>,
}

impl DistributorGateway {
    pub fn new(clients: Vec<Arc<dyn DistributorClient>>) -> Self {
        Self { clients }
    }

    pub fn distributors(&self) -> Vec<&Distributor> {
        self.clients.iter().map(|client| client.distributor()).collect()
    }

    pub fn knows(&self, id: &DistributorId) -> bool {
        self.clients.iter().any(|client| &client.distributor().id == id)
    }

    fn client(&self, id: &DistributorId) -> Result<&Arc<dyn DistributorClient>, GatewayError> {
        self.clients
            .iter()
            .find(|client| &client.distributor().id == id)
            .ok_or_else(|| GatewayError::UnknownDistributor(id.clone()))
    }

    /// One call per distributor per requested product, all in flight at once.
    /// Replies keep distributor-then-request order regardless of arrival order.
    pub async fn solicit(&self, requests: &[QuotationRequest]) -> Solicitation {
        let calls = self.clients.iter().flat_map(|client| {
            requests.iter().map(move |request| async move {
                let result = client.request_quotation(request).await;
                (client.distributor().id.clone(), request.product_id, result)
            })
        });

        let mut solicitation = Solicitation::default();
        for (distributor_id, product_id, result) in join_all(calls).await {
            match result {
                Ok(quote) => {
                    debug!(
                        event_name = "gateway.solicit.received",
                        distributor_id = %distributor_id,
                        product_id = %product_id,
                        unit_price = %quote.unit_price,
                        "quotation received"
                    );
                    solicitation.quotes.push(quote);
                }
                Err(error) => {
                    warn!(
                        event_name = "gateway.solicit.failed",
                        distributor_id = %distributor_id,
                        product_id = %product_id,
                        error_kind = error.kind(),
                        error = %error,
                        "quotation request failed; distributor skipped for this product"
                    );
                    solicitation.failures.push(error);
                }
            }
        }
        solicitation
    }

    /// Catalog slice from every distributor, tagged with who offered it.
    pub async fn fetch_catalog(&self, category: Option<&str>) -> Vec<CatalogOffer> {
        let calls = self.clients.iter().map(|client| async move {
            (client.distributor(), client.fetch_catalog(category).await)
        });

        let mut offers = Vec::new();
        for (distributor, result) in join_all(calls).await {
            match result {
                Ok(products) => offers.extend(products.into_iter().map(|product| CatalogOffer {
                    distributor_id: distributor.id.clone(),
                    distributor_name: distributor.name.clone(),
                    product,
                    delivery_days: distributor.catalog_delivery_days,
                })),
                Err(error) => warn!(
                    event_name = "gateway.catalog.failed",
                    distributor_id = %distributor.id,
                    error_kind = error.kind(),
                    error = %error,
                    "catalog fetch failed; distributor omitted from catalog"
                ),
            }
        }
        offers
    }

    pub async fn place_order(
        &self,
        distributor: &DistributorId,
        order: &DistributorOrder,
    ) -> Result<PlacementReceipt, GatewayError> {
        self.client(distributor)?.place_order(order).await
    }

    pub async fn update_quotation_status(
        &self,
        distributor: &DistributorId,
        update: &StatusUpdate,
    ) -> Result<(), GatewayError> {
        self.client(distributor)?.update_quotation_status(update).await
    }

    pub async fn probe_all(&self) -> Vec<ProbeReport> {
        join_all(self.clients.iter().map(|client| client.probe())).await
    }
}
