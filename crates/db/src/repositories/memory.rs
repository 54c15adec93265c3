use std::collections::HashMap;

use tokio::sync::RwLock;

use offerhub_core::domain::distributor::DistributorId;
use offerhub_core::domain::order::{Order, OrderId};
use offerhub_core::domain::product::ProductId;
use offerhub_core::domain::quote::{Quote, QuoteId};

use super::{OrderRepository, QuoteRepository, RepositoryError};

/// Insertion-ordered so listings match the SQL repository's rowid order.
#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: RwLock<Vec<Quote>>,
}

#[async_trait::async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.iter().find(|quote| &quote.id == id).cloned())
    }

    async fn find_by_key(
        &self,
        order_id: &OrderId,
        product_id: ProductId,
        distributor_id: &DistributorId,
    ) -> Result<Option<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes
            .iter()
            .find(|quote| {
                &quote.order_id == order_id
                    && quote.product_id == product_id
                    && &quote.distributor_id == distributor_id
            })
            .cloned())
    }

    async fn list_by_order(&self, order_id: &OrderId) -> Result<Vec<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.iter().filter(|quote| &quote.order_id == order_id).cloned().collect())
    }

    async fn list_by_order_and_product(
        &self,
        order_id: &OrderId,
        product_id: ProductId,
    ) -> Result<Vec<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes
            .iter()
            .filter(|quote| &quote.order_id == order_id && quote.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn upsert(&self, mut quote: Quote) -> Result<Quote, RepositoryError> {
        let mut quotes = self.quotes.write().await;
        let existing = quotes.iter_mut().find(|stored| {
            stored.order_id == quote.order_id
                && stored.product_id == quote.product_id
                && stored.distributor_id == quote.distributor_id
        });

        match existing {
            Some(stored) => {
                quote.id = stored.id.clone();
                quote.created_at = stored.created_at;
                *stored = quote.clone();
            }
            None => quotes.push(quote.clone()),
        }
        Ok(quote)
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id.0).cloned())
    }

    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.values().find(|order| order.order_number == order_number).cloned())
    }

    async fn save(&self, order: Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id.0.clone(), order);
        Ok(())
    }
}
