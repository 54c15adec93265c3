use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use offerhub_core::domain::order::{CustomerContact, Order, OrderId, OrderLine, OrderStatus};
use offerhub_core::domain::product::ProductId;

use super::{
    decode_error, format_date, parse_date, parse_decimal, parse_timestamp, parse_u32,
    OrderRepository, RepositoryError,
};
use crate::DbPool;

const ORDER_COLUMNS: &str = "id, order_number, customer_id, contact_name, contact_email,
    contact_phone, shipping_address, total_amount, status, notes, order_date, shipped_date,
    delivered_date, updated_at";

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load(&self, row: Option<SqliteRow>) -> Result<Option<Order>, RepositoryError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let mut order = order_from_row(&row)?;

        let lines = sqlx::query(
            "SELECT product_id, quantity, unit_price, total_price
             FROM order_line WHERE order_id = ? ORDER BY line_no ASC",
        )
        .bind(&order.id.0)
        .fetch_all(&self.pool)
        .await?;
        order.lines = lines.iter().map(line_from_row).collect::<Result<Vec<_>, _>>()?;

        Ok(Some(order))
    }
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM customer_order WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        self.load(row).await
    }

    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM customer_order WHERE order_number = ?"
        ))
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;
        self.load(row).await
    }

    async fn save(&self, order: Order) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO customer_order (id, order_number, customer_id, contact_name,
                                         contact_email, contact_phone, shipping_address,
                                         total_amount, status, notes, order_date,
                                         shipped_date, delivered_date, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 contact_name = excluded.contact_name,
                 contact_email = excluded.contact_email,
                 contact_phone = excluded.contact_phone,
                 shipping_address = excluded.shipping_address,
                 total_amount = excluded.total_amount,
                 status = excluded.status,
                 notes = excluded.notes,
                 shipped_date = excluded.shipped_date,
                 delivered_date = excluded.delivered_date,
                 updated_at = excluded.updated_at",
        )
        .bind(&order.id.0)
        .bind(&order.order_number)
        .bind(&order.customer_id)
        .bind(&order.contact.name)
        .bind(&order.contact.email)
        .bind(&order.contact.phone)
        .bind(&order.contact.shipping_address)
        .bind(order.total_amount.to_string())
        .bind(order.status.as_str())
        .bind(&order.notes)
        .bind(order.order_date.to_rfc3339())
        .bind(order.shipped_date.map(format_date))
        .bind(order.delivered_date.map(format_date))
        .bind(order.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for (line_no, line) in order.lines.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_line (order_id, line_no, product_id, quantity, unit_price,
                                         total_price)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT(order_id, product_id) DO UPDATE SET
                     line_no = excluded.line_no,
                     quantity = excluded.quantity,
                     unit_price = excluded.unit_price,
                     total_price = excluded.total_price",
            )
            .bind(&order.id.0)
            .bind(line_no as i64)
            .bind(line.product_id.0)
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.map(|price| price.to_string()))
            .bind(line.total_price.map(|price| price.to_string()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn order_from_row(row: &SqliteRow) -> Result<Order, RepositoryError> {
    let status: String = row.try_get("status").map_err(decode_error)?;
    let total_amount: String = row.try_get("total_amount").map_err(decode_error)?;
    let order_date: String = row.try_get("order_date").map_err(decode_error)?;
    let shipped_date: Option<String> = row.try_get("shipped_date").map_err(decode_error)?;
    let delivered_date: Option<String> = row.try_get("delivered_date").map_err(decode_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_error)?;

    Ok(Order {
        id: OrderId(row.try_get("id").map_err(decode_error)?),
        order_number: row.try_get("order_number").map_err(decode_error)?,
        customer_id: row.try_get("customer_id").map_err(decode_error)?,
        contact: CustomerContact {
            name: row.try_get("contact_name").map_err(decode_error)?,
            email: row.try_get("contact_email").map_err(decode_error)?,
            phone: row.try_get("contact_phone").map_err(decode_error)?,
            shipping_address: row.try_get("shipping_address").map_err(decode_error)?,
        },
        lines: Vec::new(),
        total_amount: parse_decimal("total_amount", &total_amount)?,
        status: OrderStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown order status `{status}`")))?,
        notes: row.try_get("notes").map_err(decode_error)?,
        order_date: parse_timestamp(&order_date)?,
        shipped_date: shipped_date.as_deref().map(parse_date).transpose()?,
        delivered_date: delivered_date.as_deref().map(parse_date).transpose()?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn line_from_row(row: &SqliteRow) -> Result<OrderLine, RepositoryError> {
    let unit_price: Option<String> = row.try_get("unit_price").map_err(decode_error)?;
    let total_price: Option<String> = row.try_get("total_price").map_err(decode_error)?;

    Ok(OrderLine {
        product_id: ProductId(row.try_get("product_id").map_err(decode_error)?),
        quantity: parse_u32("quantity", row.try_get("quantity").map_err(decode_error)?)?,
        unit_price: unit_price.as_deref().map(|value| parse_decimal("unit_price", value)).transpose()?,
        total_price: total_price
            .as_deref()
            .map(|value| parse_decimal("total_price", value))
            .transpose()?,
    })
}
