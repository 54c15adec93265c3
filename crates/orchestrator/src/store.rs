use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use offerhub_core::domain::order::OrderId;
use offerhub_core::domain::product::ProductId;
use offerhub_core::domain::quote::{Quote, QuoteId, QuoteStatus, ReceivedQuote};
use offerhub_core::errors::ApplicationError;
use offerhub_core::pricing::{PricingError, PricingTransform};
use offerhub_db::QuoteRepository;

use crate::persistence;

/// Outcome of persisting one solicitation round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SavedBatch {
    /// Stored quotes, markup applied, in the order they were received.
    pub stored: Vec<Quote>,
    /// Replies dropped because their key already holds a Confirmed quote.
    pub kept_confirmed: usize,
    /// Replies dropped because their prices could not be marked up.
    pub rejected: usize,
}

/// Durable record of every quote an order received.
///
/// Prices cross from distributor-side to customer-facing here, once, on the
/// way in. Everything downstream reads the stored, marked-up figures.
#[derive(Clone)]
pub struct QuotationStore {
    repository: Arc<dyn QuoteRepository>,
    pricing: Arc<dyn PricingTransform>,
}

impl QuotationStore {
    pub fn new(repository: Arc<dyn QuoteRepository>, pricing: Arc<dyn PricingTransform>) -> Self {
        Self { repository, pricing }
    }

    /// Upserts each reply by (order, product, distributor). A re-quoted key
    /// goes back to Pending with fresh prices; a Confirmed key is left alone.
    pub async fn save_batch(
        &self,
        order_id: &OrderId,
        replies: &[ReceivedQuote],
    ) -> Result<SavedBatch, ApplicationError> {
        let mut batch = SavedBatch::default();

        for reply in replies {
            let existing = self
                .repository
                .find_by_key(order_id, reply.product_id, &reply.distributor_id)
                .await
                .map_err(persistence("quote.find_by_key"))?;

            if existing.as_ref().is_some_and(|quote| quote.status == QuoteStatus::Confirmed) {
                debug!(
                    event_name = "store.quote.kept_confirmed",
                    order_id = %order_id,
                    product_id = %reply.product_id,
                    distributor_id = %reply.distributor_id,
                    "confirmed quote not overwritten by a later reply"
                );
                batch.kept_confirmed += 1;
                continue;
            }

            let quote = match self.price_reply(order_id, reply, existing) {
                Ok(quote) => quote,
                Err(error) => {
                    warn!(
                        event_name = "store.quote.rejected",
                        order_id = %order_id,
                        product_id = %reply.product_id,
                        distributor_id = %reply.distributor_id,
                        error = %error,
                        "distributor reply could not be priced"
                    );
                    batch.rejected += 1;
                    continue;
                }
            };
            let stored = self.repository.upsert(quote).await.map_err(persistence("quote.upsert"))?;
            batch.stored.push(stored);
        }

        info!(
            event_name = "store.batch.saved",
            order_id = %order_id,
            stored = batch.stored.len(),
            kept_confirmed = batch.kept_confirmed,
            rejected = batch.rejected,
            "quotation batch saved"
        );
        Ok(batch)
    }

    fn price_reply(
        &self,
        order_id: &OrderId,
        reply: &ReceivedQuote,
        existing: Option<Quote>,
    ) -> Result<Quote, PricingError> {
        let unit_price = self.pricing.apply_markup(reply.unit_price)?;
        let total_price = self.pricing.line_total(unit_price, reply.quantity)?;
        let now = Utc::now();
        let (id, notes, created_at) = match existing {
            Some(previous) => (previous.id, previous.notes, previous.created_at),
            None => (QuoteId::generate(), String::new(), now),
        };

        let mut quote = Quote {
            id,
            order_id: order_id.clone(),
            product_id: reply.product_id,
            product_name: reply.product_name.clone(),
            distributor_id: reply.distributor_id.clone(),
            distributor_quotation_id: reply.distributor_quotation_id,
            quantity: reply.quantity,
            quoted_unit_price: reply.unit_price,
            unit_price,
            total_price,
            available_stock: reply.available_stock,
            estimated_delivery_days: reply.estimated_delivery_days,
            status: QuoteStatus::Pending,
            distributor_order_id: None,
            confirmed_at: None,
            delivery_estimate: None,
            notes,
            created_at,
            updated_at: now,
        };
        quote.append_note(format!(
            "quoted {} by {} ({} in stock, {} days)",
            reply.unit_price, reply.distributor_id, reply.available_stock, reply.estimated_delivery_days
        ));
        if let Some(remark) = reply.notes.as_deref() {
            quote.append_note(format!("distributor remark: {remark}"));
        }
        Ok(quote)
    }

    pub async fn get_by_order(&self, order_id: &OrderId) -> Result<Vec<Quote>, ApplicationError> {
        self.repository.list_by_order(order_id).await.map_err(persistence("quote.list_by_order"))
    }

    pub async fn get_by_order_and_product(
        &self,
        order_id: &OrderId,
        product_id: ProductId,
    ) -> Result<Vec<Quote>, ApplicationError> {
        self.repository
            .list_by_order_and_product(order_id, product_id)
            .await
            .map_err(persistence("quote.list_by_order_and_product"))
    }

    pub async fn get_by_id(&self, quote_id: &QuoteId) -> Result<Quote, ApplicationError> {
        self.repository
            .find_by_id(quote_id)
            .await
            .map_err(persistence("quote.find_by_id"))?
            .ok_or_else(|| ApplicationError::NotFound { entity: "quote", id: quote_id.0.clone() })
    }

    /// Moves a quote through the transition table and records why.
    pub async fn update_status(
        &self,
        quote_id: &QuoteId,
        status: QuoteStatus,
        note: Option<&str>,
    ) -> Result<Quote, ApplicationError> {
        let mut quote = self.get_by_id(quote_id).await?;
        quote.transition_to(status)?;
        if let Some(note) = note {
            quote.append_note(note);
        }
        self.record(quote).await
    }

    /// Writes back a quote the orchestrator has already mutated.
    pub async fn record(&self, quote: Quote) -> Result<Quote, ApplicationError> {
        self.repository.upsert(quote).await.map_err(persistence("quote.upsert"))
    }
}
