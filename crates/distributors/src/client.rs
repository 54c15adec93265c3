use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use offerhub_core::domain::distributor::Distributor;
use offerhub_core::domain::product::{CatalogProduct, ProductId};
use offerhub_core::domain::quote::ReceivedQuote;
use offerhub_core::gateway::{
    DistributorClient, DistributorOrder, GatewayError, PlacementReceipt, ProbeReport,
    QuotationRequest, StatusUpdate,
};

use crate::wire::{
    CatalogItem, OrderBody, OrderItemBody, OrderReply, QuotationReply, QuotationRequestBody,
    StatusUpdateBody, ORDER_PATH, PRODUCT_PATH, QUOTATION_REQUEST_PATH, QUOTATION_STATUS_PATH,
};

const ERROR_BODY_LIMIT: usize = 200;
/// Upper bound for any price a distributor may quote.
const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

#[derive(Clone, Debug)]
pub struct HttpClientSettings {
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl Default for HttpClientSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(10),
            accept_invalid_certs: false,
        }
    }
}

/// One distributor behind the shared HTTP contract, with its own pooled client.
#[derive(Clone, Debug)]
pub struct HttpDistributorClient {
    distributor: Distributor,
    client: Client,
    probe_timeout: Duration,
}

impl HttpDistributorClient {
    pub fn new(
        distributor: Distributor,
        settings: &HttpClientSettings,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()?;
        Ok(Self { distributor, client, probe_timeout: settings.probe_timeout })
    }

    fn transport(&self, error: reqwest::Error) -> GatewayError {
        let message = if error.is_timeout() {
            format!("request timed out: {error}")
        } else {
            error.to_string()
        };
        GatewayError::Transport { distributor: self.distributor.id.clone(), message }
    }

    fn decode(&self, message: impl Into<String>) -> GatewayError {
        GatewayError::Decode { distributor: self.distributor.id.clone(), message: message.into() }
    }

    fn check_price(
        &self,
        subject: impl std::fmt::Display,
        price: Decimal,
    ) -> Result<(), GatewayError> {
        if price < Decimal::ZERO {
            return Err(self.decode(format!("{subject} has negative price {price}")));
        }
        if price > MAX_PRICE {
            return Err(self.decode(format!("{subject} has price {price} above {MAX_PRICE}")));
        }
        Ok(())
    }

    /// Non-2xx becomes `Remote`; an unreadable body becomes `Transport`.
    async fn read_body(&self, response: Response) -> Result<String, GatewayError> {
        let status = response.status();
        let body = response.text().await.map_err(|error| self.transport(error))?;
        if !status.is_success() {
            return Err(GatewayError::Remote {
                distributor: self.distributor.id.clone(),
                status: status.as_u16(),
                message: truncate(&body),
            });
        }
        Ok(body)
    }

    async fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T, GatewayError> {
        let body = self.read_body(response).await?;
        serde_json::from_str(&body).map_err(|error| self.decode(error.to_string()))
    }
}

#[async_trait]
impl DistributorClient for HttpDistributorClient {
    fn distributor(&self) -> &Distributor {
        &self.distributor
    }

    async fn request_quotation(
        &self,
        request: &QuotationRequest,
    ) -> Result<ReceivedQuote, GatewayError> {
        let url = self.distributor.endpoint(QUOTATION_REQUEST_PATH);
        debug!(
            event_name = "distributor.quotation.request",
            distributor_id = %self.distributor.id,
            product_id = %request.product_id,
            quantity = request.quantity,
            "requesting quotation"
        );

        let response = self
            .client
            .post(&url)
            .json(&QuotationRequestBody {
                product_id: request.product_id.0,
                quantity: request.quantity,
                notes: request.notes.as_deref(),
            })
            .send()
            .await
            .map_err(|error| self.transport(error))?;
        let reply: QuotationReply = self.read_json(response).await?;

        if reply.product_id != request.product_id.0 {
            return Err(self.decode(format!(
                "quotation for product {} answered with product {}",
                request.product_id, reply.product_id
            )));
        }
        self.check_price(
            format_args!("quotation for product {}", request.product_id),
            reply.unit_price,
        )?;

        Ok(ReceivedQuote {
            distributor_id: self.distributor.id.clone(),
            distributor_quotation_id: Some(reply.id),
            product_id: ProductId(reply.product_id),
            product_name: reply.product_name,
            quantity: request.quantity,
            unit_price: reply.unit_price,
            available_stock: reply.available_stock,
            estimated_delivery_days: reply.estimated_delivery_days,
            notes: reply.notes,
            received_at: Utc::now(),
        })
    }

    async fn fetch_catalog(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<CatalogProduct>, GatewayError> {
        let mut request = self.client.get(self.distributor.endpoint(PRODUCT_PATH));
        if let Some(category) = category.map(str::trim).filter(|value| !value.is_empty()) {
            request = request.query(&[("category", category)]);
        }

        let response = request.send().await.map_err(|error| self.transport(error))?;
        let items: Vec<CatalogItem> = self.read_json(response).await?;

        items
            .into_iter()
            .map(|item| {
                self.check_price(format_args!("product {}", item.id), item.price)?;
                Ok(CatalogProduct {
                    id: ProductId(item.id),
                    name: item.name,
                    description: item.description.unwrap_or_default(),
                    price: item.price,
                    stock: item.stock,
                    category: item.category.unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn place_order(
        &self,
        order: &DistributorOrder,
    ) -> Result<PlacementReceipt, GatewayError> {
        let body = OrderBody {
            order_number: &order.order_number,
            customer_name: &order.customer_name,
            customer_email: &order.customer_email,
            customer_phone: order.customer_phone.as_deref(),
            shipping_address: &order.shipping_address,
            total_amount: order.total_amount,
            order_date: order.order_date,
            notes: order.notes.as_deref(),
            order_items: order
                .items
                .iter()
                .map(|item| OrderItemBody {
                    product_id: item.product_id.0,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    total_price: item.total_price,
                })
                .collect(),
        };

        let response = self
            .client
            .post(self.distributor.endpoint(ORDER_PATH))
            .json(&body)
            .send()
            .await
            .map_err(|error| self.transport(error))?;
        let status = response.status().as_u16();
        let reply: OrderReply = self.read_json(response).await?;

        if reply.success == Some(false) {
            return Err(GatewayError::Remote {
                distributor: self.distributor.id.clone(),
                status,
                message: reply.message.unwrap_or_else(|| "order rejected".to_string()),
            });
        }
        let distributor_order_id =
            reply.order_id().ok_or_else(|| self.decode("order reply carries no order id"))?;
        let delivery_estimate = match reply.estimated_delivery_date.as_deref() {
            Some(raw) => Some(parse_delivery_date(raw).ok_or_else(|| {
                self.decode(format!("unreadable estimatedDeliveryDate `{raw}`"))
            })?),
            None => None,
        };

        Ok(PlacementReceipt {
            distributor_order_id,
            status: reply.status.unwrap_or_else(|| "Received".to_string()),
            message: reply.message,
            estimated_delivery_days: reply.estimated_delivery_days,
            delivery_estimate,
        })
    }

    async fn update_quotation_status(&self, update: &StatusUpdate) -> Result<(), GatewayError> {
        let response = self
            .client
            .put(self.distributor.endpoint(QUOTATION_STATUS_PATH))
            .json(&StatusUpdateBody {
                quotation_id: update.quotation_id,
                status: update.status.label(),
                notes: update.notes.as_deref(),
            })
            .send()
            .await
            .map_err(|error| self.transport(error))?;
        self.read_body(response).await.map(|_| ())
    }

    async fn probe(&self) -> ProbeReport {
        let url = self.distributor.endpoint(PRODUCT_PATH);
        let started = Instant::now();
        let outcome = self.client.get(&url).timeout(self.probe_timeout).send().await;
        let response_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (connected, detail) = match outcome {
            Ok(response) if response.status().is_success() => {
                (true, format!("HTTP {}", response.status()))
            }
            Ok(response) => (false, format!("HTTP {}", response.status())),
            Err(error) => {
                warn!(
                    event_name = "distributor.probe.failed",
                    distributor_id = %self.distributor.id,
                    url = %url,
                    error = %error,
                    "distributor probe failed"
                );
                (false, self.transport(error).to_string())
            }
        };

        ProbeReport {
            distributor_id: self.distributor.id.clone(),
            url,
            connected,
            response_time_ms,
            checked_at: Utc::now(),
            detail,
        }
    }
}

/// `yyyy-MM-dd`, or the date part of a full timestamp.
fn parse_delivery_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
