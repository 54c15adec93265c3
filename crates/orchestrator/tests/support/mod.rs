#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use offerhub_core::audit::InMemoryAuditSink;
use offerhub_core::domain::distributor::{Distributor, DistributorId};
use offerhub_core::domain::order::{CustomerContact, NewOrder, OrderLineRequest};
use offerhub_core::domain::product::{CatalogProduct, ProductId};
use offerhub_core::domain::quote::ReceivedQuote;
use offerhub_core::gateway::{
    DistributorClient, DistributorGateway, DistributorOrder, GatewayError, PlacementReceipt,
    ProbeReport, QuotationRequest, StatusUpdate,
};
use offerhub_core::pricing::RetailMarkup;
use offerhub_db::{InMemoryOrderRepository, InMemoryQuoteRepository};
use offerhub_orchestrator::{OrchestratorSettings, OrderOrchestrator, QuotationStore};

#[derive(Clone, Copy, Debug)]
pub struct Offer {
    pub cents: i64,
    pub stock: u32,
    pub days: u32,
}

pub fn offer(cents: i64, stock: u32, days: u32) -> Offer {
    Offer { cents, stock, days }
}

#[derive(Clone, Debug)]
pub enum Placement {
    Confirm { delivery: Option<NaiveDate> },
    Reject,
    Unreachable,
}

/// A distributor whose replies are fixed by the test.
pub struct ScriptedDistributor {
    distributor: Distributor,
    offers: Mutex<HashMap<i64, Offer>>,
    quotes_unreachable: Mutex<bool>,
    placement: Mutex<Placement>,
    placed: Mutex<Vec<DistributorOrder>>,
    status_updates: Mutex<Vec<StatusUpdate>>,
}

impl ScriptedDistributor {
    pub fn new(id: &str) -> Self {
        Self {
            distributor: Distributor {
                id: DistributorId::new(id),
                name: id.to_uppercase(),
                base_url: format!("http://{id}.test"),
                catalog_delivery_days: 3,
            },
            offers: Mutex::new(HashMap::new()),
            quotes_unreachable: Mutex::new(false),
            placement: Mutex::new(Placement::Confirm { delivery: None }),
            placed: Mutex::new(Vec::new()),
            status_updates: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> DistributorId {
        self.distributor.id.clone()
    }

    pub fn quoting(self, product: i64, offer: Offer) -> Self {
        self.offers.lock().expect("offers lock").insert(product, offer);
        self
    }

    pub fn set_offer(&self, product: i64, offer: Offer) {
        self.offers.lock().expect("offers lock").insert(product, offer);
    }

    pub fn set_quotes_unreachable(&self, unreachable: bool) {
        *self.quotes_unreachable.lock().expect("quotes lock") = unreachable;
    }

    pub fn set_placement(&self, placement: Placement) {
        *self.placement.lock().expect("placement lock") = placement;
    }

    pub fn placed(&self) -> Vec<DistributorOrder> {
        self.placed.lock().expect("placed lock").clone()
    }

    pub fn status_updates(&self) -> Vec<StatusUpdate> {
        self.status_updates.lock().expect("status lock").clone()
    }

    fn transport(&self) -> GatewayError {
        GatewayError::Transport {
            distributor: self.distributor.id.clone(),
            message: "connection refused".to_string(),
        }
    }
}

#[async_trait]
impl DistributorClient for ScriptedDistributor {
    fn distributor(&self) -> &Distributor {
        &self.distributor
    }

    async fn request_quotation(
        &self,
        request: &QuotationRequest,
    ) -> Result<ReceivedQuote, GatewayError> {
        if *self.quotes_unreachable.lock().expect("quotes lock") {
            return Err(self.transport());
        }
        let offer = self
            .offers
            .lock()
            .expect("offers lock")
            .get(&request.product_id.0)
            .copied()
            .ok_or_else(|| GatewayError::Remote {
                distributor: self.distributor.id.clone(),
                status: 404,
                message: "product not stocked".to_string(),
            })?;
        Ok(ReceivedQuote {
            distributor_id: self.distributor.id.clone(),
            distributor_quotation_id: Some(request.product_id.0 * 1_000 + offer.cents),
            product_id: request.product_id,
            product_name: format!("Product {}", request.product_id),
            quantity: request.quantity,
            unit_price: Decimal::new(offer.cents, 2),
            available_stock: offer.stock,
            estimated_delivery_days: offer.days,
            notes: request.notes.clone(),
            received_at: Utc::now(),
        })
    }

    async fn fetch_catalog(
        &self,
        _category: Option<&str>,
    ) -> Result<Vec<CatalogProduct>, GatewayError> {
        let offers = self.offers.lock().expect("offers lock").clone();
        let mut products: Vec<CatalogProduct> = offers
            .into_iter()
            .map(|(product, offer)| CatalogProduct {
                id: ProductId(product),
                name: format!("Product {product}"),
                description: String::new(),
                price: Decimal::new(offer.cents, 2),
                stock: offer.stock,
                category: "Audio".to_string(),
            })
            .collect();
        products.sort_by_key(|product| product.id);
        Ok(products)
    }

    async fn place_order(
        &self,
        order: &DistributorOrder,
    ) -> Result<PlacementReceipt, GatewayError> {
        self.placed.lock().expect("placed lock").push(order.clone());
        let placement = self.placement.lock().expect("placement lock").clone();
        let count = self.placed.lock().expect("placed lock").len();
        match placement {
            Placement::Confirm { delivery } => Ok(PlacementReceipt {
                distributor_order_id: format!("{}-{count}", self.distributor.name),
                status: "Received".to_string(),
                message: Some("Order confirmed successfully".to_string()),
                estimated_delivery_days: Some(3),
                delivery_estimate: delivery,
            }),
            Placement::Reject => Err(GatewayError::Remote {
                distributor: self.distributor.id.clone(),
                status: 409,
                message: "insufficient stock".to_string(),
            }),
            Placement::Unreachable => Err(self.transport()),
        }
    }

    async fn update_quotation_status(&self, update: &StatusUpdate) -> Result<(), GatewayError> {
        self.status_updates.lock().expect("status lock").push(update.clone());
        Ok(())
    }

    async fn probe(&self) -> ProbeReport {
        ProbeReport {
            distributor_id: self.distributor.id.clone(),
            url: self.distributor.endpoint("api/product"),
            connected: true,
            response_time_ms: 1,
            checked_at: Utc::now(),
            detail: "HTTP 200 OK".to_string(),
        }
    }
}

pub struct Harness {
    pub orchestrator: OrderOrchestrator,
    pub audit: InMemoryAuditSink,
    pub distributors: Vec<Arc<ScriptedDistributor>>,
}

impl Harness {
    pub fn new(distributors: Vec<ScriptedDistributor>) -> Self {
        let distributors: Vec<Arc<ScriptedDistributor>> =
            distributors.into_iter().map(Arc::new).collect();
        let gateway = DistributorGateway::new(
            distributors
                .iter()
                .map(|distributor| distributor.clone() as Arc<dyn DistributorClient>)
                .collect(),
        );
        let audit = InMemoryAuditSink::default();
        let orchestrator = OrderOrchestrator::new(
            gateway,
            QuotationStore::new(
                Arc::new(InMemoryQuoteRepository::default()),
                Arc::new(RetailMarkup::default()),
            ),
            Arc::new(InMemoryOrderRepository::default()),
            Arc::new(audit.clone()),
            OrchestratorSettings::default(),
        );
        Self { orchestrator, audit, distributors }
    }

    pub fn distributor(&self, id: &str) -> &ScriptedDistributor {
        self.distributors
            .iter()
            .find(|distributor| distributor.id() == DistributorId::new(id))
            .expect("scripted distributor")
    }
}

pub fn new_order(lines: &[(i64, u32)]) -> NewOrder {
    NewOrder {
        customer_id: "CUST-42".to_string(),
        contact: CustomerContact {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: Some("+44 20 7946 0000".to_string()),
            shipping_address: "12 Analytical Way".to_string(),
        },
        notes: None,
        lines: lines
            .iter()
            .map(|(product, quantity)| OrderLineRequest {
                product_id: ProductId(*product),
                quantity: *quantity,
            })
            .collect(),
    }
}
