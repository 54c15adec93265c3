use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use offerhub_core::domain::distributor::DistributorId;
use offerhub_core::domain::order::OrderId;
use offerhub_core::domain::product::ProductId;
use offerhub_core::domain::quote::{Quote, QuoteId, QuoteStatus};

use super::{
    decode_error, format_date, parse_date, parse_decimal, parse_timestamp, parse_u32,
    QuoteRepository, RepositoryError,
};
use crate::DbPool;

const QUOTE_COLUMNS: &str = "id, order_id, product_id, product_name, distributor_id,
    distributor_quotation_id, quantity, quoted_unit_price, unit_price, total_price,
    available_stock, estimated_delivery_days, status, distributor_order_id, confirmed_at,
    delivery_estimate, notes, created_at, updated_at";

pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {QUOTE_COLUMNS} FROM quote WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(quote_from_row).transpose()
    }

    async fn find_by_key(
        &self,
        order_id: &OrderId,
        product_id: ProductId,
        distributor_id: &DistributorId,
    ) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quote
             WHERE order_id = ? AND product_id = ? AND distributor_id = ?"
        ))
        .bind(&order_id.0)
        .bind(product_id.0)
        .bind(distributor_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(quote_from_row).transpose()
    }

    async fn list_by_order(&self, order_id: &OrderId) -> Result<Vec<Quote>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quote WHERE order_id = ? ORDER BY rowid ASC"
        ))
        .bind(&order_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(quote_from_row).collect()
    }

    async fn list_by_order_and_product(
        &self,
        order_id: &OrderId,
        product_id: ProductId,
    ) -> Result<Vec<Quote>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quote
             WHERE order_id = ? AND product_id = ?
             ORDER BY rowid ASC"
        ))
        .bind(&order_id.0)
        .bind(product_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(quote_from_row).collect()
    }

    async fn upsert(&self, quote: Quote) -> Result<Quote, RepositoryError> {
        sqlx::query(
            "INSERT INTO quote (id, order_id, product_id, product_name, distributor_id,
                                distributor_quotation_id, quantity, quoted_unit_price,
                                unit_price, total_price, available_stock,
                                estimated_delivery_days, status, distributor_order_id,
                                confirmed_at, delivery_estimate, notes, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(order_id, product_id, distributor_id) DO UPDATE SET
                 product_name = excluded.product_name,
                 distributor_quotation_id = excluded.distributor_quotation_id,
                 quantity = excluded.quantity,
                 quoted_unit_price = excluded.quoted_unit_price,
                 unit_price = excluded.unit_price,
                 total_price = excluded.total_price,
                 available_stock = excluded.available_stock,
                 estimated_delivery_days = excluded.estimated_delivery_days,
                 status = excluded.status,
                 distributor_order_id = excluded.distributor_order_id,
                 confirmed_at = excluded.confirmed_at,
                 delivery_estimate = excluded.delivery_estimate,
                 notes = excluded.notes,
                 updated_at = excluded.updated_at",
        )
        .bind(&quote.id.0)
        .bind(&quote.order_id.0)
        .bind(quote.product_id.0)
        .bind(&quote.product_name)
        .bind(quote.distributor_id.as_str())
        .bind(quote.distributor_quotation_id)
        .bind(i64::from(quote.quantity))
        .bind(quote.quoted_unit_price.to_string())
        .bind(quote.unit_price.to_string())
        .bind(quote.total_price.to_string())
        .bind(i64::from(quote.available_stock))
        .bind(i64::from(quote.estimated_delivery_days))
        .bind(quote.status.as_str())
        .bind(&quote.distributor_order_id)
        .bind(quote.confirmed_at.map(|timestamp| timestamp.to_rfc3339()))
        .bind(quote.delivery_estimate.map(format_date))
        .bind(&quote.notes)
        .bind(quote.created_at.to_rfc3339())
        .bind(quote.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.find_by_key(&quote.order_id, quote.product_id, &quote.distributor_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::Decode(format!("quote `{}` vanished after upsert", quote.id))
            })
    }
}

fn quote_from_row(row: &SqliteRow) -> Result<Quote, RepositoryError> {
    let status: String = row.try_get("status").map_err(decode_error)?;
    let confirmed_at: Option<String> = row.try_get("confirmed_at").map_err(decode_error)?;
    let delivery_estimate: Option<String> =
        row.try_get("delivery_estimate").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_error)?;
    let quoted_unit_price: String = row.try_get("quoted_unit_price").map_err(decode_error)?;
    let unit_price: String = row.try_get("unit_price").map_err(decode_error)?;
    let total_price: String = row.try_get("total_price").map_err(decode_error)?;

    Ok(Quote {
        id: QuoteId(row.try_get("id").map_err(decode_error)?),
        order_id: OrderId(row.try_get("order_id").map_err(decode_error)?),
        product_id: ProductId(row.try_get("product_id").map_err(decode_error)?),
        product_name: row.try_get("product_name").map_err(decode_error)?,
        distributor_id: DistributorId(row.try_get("distributor_id").map_err(decode_error)?),
        distributor_quotation_id: row.try_get("distributor_quotation_id").map_err(decode_error)?,
        quantity: parse_u32("quantity", row.try_get("quantity").map_err(decode_error)?)?,
        quoted_unit_price: parse_decimal("quoted_unit_price", &quoted_unit_price)?,
        unit_price: parse_decimal("unit_price", &unit_price)?,
        total_price: parse_decimal("total_price", &total_price)?,
        available_stock: parse_u32(
            "available_stock",
            row.try_get("available_stock").map_err(decode_error)?,
        )?,
        estimated_delivery_days: parse_u32(
            "estimated_delivery_days",
            row.try_get("estimated_delivery_days").map_err(decode_error)?,
        )?,
        status: QuoteStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown quote status `{status}`")))?,
        distributor_order_id: row.try_get("distributor_order_id").map_err(decode_error)?,
        confirmed_at: confirmed_at.as_deref().map(parse_timestamp).transpose()?,
        delivery_estimate: delivery_estimate.as_deref().map(parse_date).transpose()?,
        notes: row.try_get("notes").map_err(decode_error)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
