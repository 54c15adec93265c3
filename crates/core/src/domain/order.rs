use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product::ProductId;
use crate::domain::quote::{Quote, QuoteStatus};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn generate() -> Self {
        Self(format!("ORD-{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Processing,
    PendingQuotations,
    PendingSelection,
    PendingConfirmation,
    Confirmed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::PendingQuotations => "pending_quotations",
            Self::PendingSelection => "pending_selection",
            Self::PendingConfirmation => "pending_confirmation",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "processing" => Some(Self::Processing),
            "pending_quotations" => Some(Self::PendingQuotations),
            "pending_selection" => Some(Self::PendingSelection),
            "pending_confirmation" => Some(Self::PendingConfirmation),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Cancelled)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub shipping_address: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Checkout input for a new order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: String,
    pub contact: CustomerContact,
    #[serde(default)]
    pub notes: Option<String>,
    pub lines: Vec<OrderLineRequest>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: String,
    pub contact: CustomerContact,
    pub lines: Vec<OrderLine>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub notes: String,
    pub order_date: DateTime<Utc>,
    pub shipped_date: Option<NaiveDate>,
    pub delivered_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn create(request: NewOrder, order_number: String) -> Result<Self, DomainError> {
        if request.lines.is_empty() {
            return Err(DomainError::InvariantViolation(
                "an order needs at least one line item".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for line in &request.lines {
            if line.quantity == 0 {
                return Err(DomainError::InvariantViolation(format!(
                    "line item for product {} has zero quantity",
                    line.product_id
                )));
            }
            if !seen.insert(line.product_id) {
                return Err(DomainError::InvariantViolation(format!(
                    "product {} appears on more than one line item",
                    line.product_id
                )));
            }
        }

        if request.customer_id.trim().is_empty() {
            return Err(DomainError::InvariantViolation("customer_id is required".to_string()));
        }

        let now = Utc::now();
        Ok(Self {
            id: OrderId::generate(),
            order_number,
            customer_id: request.customer_id,
            contact: request.contact,
            lines: request
                .lines
                .into_iter()
                .map(|line| OrderLine {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: None,
                    total_price: None,
                })
                .collect(),
            total_amount: Decimal::ZERO,
            status: OrderStatus::Processing,
            notes: request.notes.unwrap_or_default(),
            order_date: now,
            shipped_date: None,
            delivered_date: None,
            updated_at: now,
        })
    }

    pub fn line(&self, product_id: ProductId) -> Option<&OrderLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    /// Re-prices every line from the order's winning quotes and recomputes
    /// the total. A Confirmed quote prices its line ahead of a Selected one;
    /// lines with neither, or whose total overflows, are unpriced.
    pub fn reprice(&mut self, quotes: &[Quote]) {
        for line in &mut self.lines {
            let of_line = |status: QuoteStatus| {
                quotes
                    .iter()
                    .find(|quote| quote.product_id == line.product_id && quote.status == status)
            };
            let priced = of_line(QuoteStatus::Confirmed)
                .or_else(|| of_line(QuoteStatus::Selected))
                .and_then(|quote| {
                    let total = quote.unit_price.checked_mul(Decimal::from(line.quantity))?;
                    Some((quote.unit_price, total))
                });
            line.unit_price = priced.map(|(unit, _)| unit);
            line.total_price = priced.map(|(_, total)| total);
        }
        self.recompute_total();
    }

    pub fn recompute_total(&mut self) {
        self.total_amount = self
            .lines
            .iter()
            .filter_map(|line| line.total_price)
            .fold(Decimal::ZERO, Decimal::saturating_add);
        self.updated_at = Utc::now();
    }
}

/// `{prefix}-{yyyyMMdd}-{8 upper hex}`.
pub fn generate_order_number(prefix: &str, date: NaiveDate) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    format!("{}-{}-{}", prefix.trim(), date.format("%Y%m%d"), suffix.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use crate::domain::distributor::DistributorId;
    use crate::domain::product::ProductId;
    use crate::domain::quote::{Quote, QuoteId, QuoteStatus};

    use super::{
        generate_order_number, CustomerContact, NewOrder, Order, OrderLineRequest, OrderStatus,
    };

    fn new_order(lines: Vec<(i64, u32)>) -> NewOrder {
        NewOrder {
            customer_id: "CUST-1".to_string(),
            contact: CustomerContact {
                name: "Ada Byron".to_string(),
                email: "ada@example.com".to_string(),
                phone: None,
                shipping_address: "1 Analytical Way".to_string(),
            },
            notes: None,
            lines: lines
                .into_iter()
                .map(|(product, quantity)| OrderLineRequest { product_id: ProductId(product), quantity })
                .collect(),
        }
    }

    fn quote(order: &Order, product: i64, unit_price: Decimal, status: QuoteStatus) -> Quote {
        Quote {
            id: QuoteId::generate(),
            order_id: order.id.clone(),
            product_id: ProductId(product),
            product_name: format!("Product {product}"),
            distributor_id: DistributorId::new("north"),
            distributor_quotation_id: None,
            quantity: 1,
            quoted_unit_price: unit_price,
            unit_price,
            total_price: unit_price,
            available_stock: 5,
            estimated_delivery_days: 2,
            status,
            distributor_order_id: None,
            confirmed_at: None,
            delivery_estimate: None,
            notes: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn create_starts_processing_with_unpriced_lines() {
        let order = Order::create(new_order(vec![(1, 2), (2, 1)]), "OH-1".to_string())
            .expect("valid order");

        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.total_amount, Decimal::ZERO);
        assert!(order.lines.iter().all(|line| line.unit_price.is_none()));
    }

    #[test]
    fn create_rejects_empty_zero_quantity_and_duplicate_lines() {
        assert!(Order::create(new_order(vec![]), "OH-1".to_string()).is_err());
        assert!(Order::create(new_order(vec![(1, 0)]), "OH-1".to_string()).is_err());
        assert!(Order::create(new_order(vec![(1, 1), (1, 2)]), "OH-1".to_string()).is_err());
    }

    #[test]
    fn reprice_uses_only_selected_or_confirmed_quotes() {
        let mut order = Order::create(new_order(vec![(1, 2), (2, 3)]), "OH-1".to_string())
            .expect("valid order");
        let quotes = vec![
            quote(&order, 1, Decimal::new(1_200, 2), QuoteStatus::Confirmed),
            quote(&order, 2, Decimal::new(900, 2), QuoteStatus::Failed),
            quote(&order, 2, Decimal::new(800, 2), QuoteStatus::Cancelled),
        ];

        order.reprice(&quotes);

        assert_eq!(order.lines[0].total_price, Some(Decimal::new(2_400, 2)));
        assert_eq!(order.lines[1].total_price, None);
        assert_eq!(order.total_amount, Decimal::new(2_400, 2));
    }

    #[test]
    fn confirmed_quote_prices_the_line_and_overflow_leaves_it_unpriced() {
        let mut order = Order::create(new_order(vec![(1, 1), (2, 4)]), "OH-1".to_string())
            .expect("valid order");
        let quotes = vec![
            quote(&order, 1, Decimal::new(900, 2), QuoteStatus::Selected),
            quote(&order, 1, Decimal::new(1_100, 2), QuoteStatus::Confirmed),
            quote(&order, 2, Decimal::MAX / Decimal::TWO, QuoteStatus::Selected),
        ];

        order.reprice(&quotes);

        assert_eq!(order.lines[0].unit_price, Some(Decimal::new(1_100, 2)));
        assert_eq!(order.lines[1].unit_price, None);
        assert_eq!(order.total_amount, Decimal::new(1_100, 2));
    }

    #[test]
    fn order_numbers_carry_prefix_date_and_hex_suffix() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date");
        let number = generate_order_number("OH", date);
        let parts: Vec<&str> = number.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "OH");
        assert_eq!(parts[1], "20261019");
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            OrderStatus::Processing,
            OrderStatus::PendingQuotations,
            OrderStatus::PendingSelection,
            OrderStatus::PendingConfirmation,
            OrderStatus::Confirmed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert!(OrderStatus::Confirmed.is_terminal());
        assert!(!OrderStatus::PendingConfirmation.is_terminal());
    }
}
