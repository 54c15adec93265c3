use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use offerhub_core::domain::distributor::DistributorId;
use offerhub_core::domain::order::{Order, OrderId};
use offerhub_core::domain::product::ProductId;
use offerhub_core::domain::quote::{Quote, QuoteId};

pub mod memory;
pub mod order;
pub mod quote;

pub use memory::{InMemoryOrderRepository, InMemoryQuoteRepository};
pub use order::SqlOrderRepository;
pub use quote::SqlQuoteRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Quotes are keyed by id and unique per (order, product, distributor).
/// Listings return quotes in the order they were first stored.
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError>;

    async fn find_by_key(
        &self,
        order_id: &OrderId,
        product_id: ProductId,
        distributor_id: &DistributorId,
    ) -> Result<Option<Quote>, RepositoryError>;

    async fn list_by_order(&self, order_id: &OrderId) -> Result<Vec<Quote>, RepositoryError>;

    async fn list_by_order_and_product(
        &self,
        order_id: &OrderId,
        product_id: ProductId,
    ) -> Result<Vec<Quote>, RepositoryError>;

    /// Inserts, or overwrites the row sharing the quote's natural key. The
    /// stored id and `created_at` of an existing row are kept.
    async fn upsert(&self, quote: Quote) -> Result<Quote, RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;
    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError>;
    async fn save(&self, order: Order) -> Result<(), RepositoryError>;
}

pub(crate) fn decode_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp `{value}`: {error}")))
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|error| RepositoryError::Decode(format!("invalid date `{value}`: {error}")))
}

pub(crate) fn parse_decimal(column: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value)
        .map_err(|error| RepositoryError::Decode(format!("invalid {column} `{value}`: {error}")))
}

pub(crate) fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("{column} out of range: {value}")))
}

pub(crate) fn format_date(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{format_date, parse_date, parse_decimal, parse_timestamp, parse_u32};
    use crate::repositories::RepositoryError;

    #[test]
    fn column_parsers_reject_malformed_values() {
        assert!(matches!(parse_decimal("unit_price", "12,50"), Err(RepositoryError::Decode(_))));
        assert!(matches!(parse_u32("quantity", -1), Err(RepositoryError::Decode(_))));
        assert!(matches!(parse_timestamp("yesterday"), Err(RepositoryError::Decode(_))));
        assert!(matches!(parse_date("19/10/2026"), Err(RepositoryError::Decode(_))));
    }

    #[test]
    fn dates_and_decimals_survive_text_storage() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date");
        assert_eq!(parse_date(&format_date(date)).expect("parse date"), date);
        assert_eq!(
            parse_decimal("total_price", &Decimal::new(59_999, 2).to_string()).expect("decimal"),
            Decimal::new(59_999, 2)
        );
    }
}
