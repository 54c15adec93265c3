//! Read-side views of an order: customer tracking and operator review.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use offerhub_core::domain::distributor::DistributorId;
use offerhub_core::domain::order::{Order, OrderId, OrderStatus};
use offerhub_core::domain::product::ProductId;
use offerhub_core::domain::quote::{Quote, QuoteStatus};
use offerhub_core::scoring::{ScoreBreakdown, ScoringEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TrackedLine {
    pub product_id: ProductId,
    pub product_name: Option<String>,
    pub quantity: u32,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
    pub distributor_id: Option<DistributorId>,
    pub quote_status: Option<QuoteStatus>,
    pub distributor_order_id: Option<String>,
    pub delivery_estimate: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderTracking {
    pub order_id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub order_date: DateTime<Utc>,
    pub shipped_date: Option<NaiveDate>,
    pub delivered_date: Option<NaiveDate>,
    pub confirmed_distributors: Vec<DistributorId>,
    pub cancelled_distributors: Vec<DistributorId>,
    pub lines: Vec<TrackedLine>,
}

impl OrderTracking {
    pub fn build(order: &Order, quotes: &[Quote]) -> Self {
        let confirmed_distributors = distributors_with(quotes, QuoteStatus::Confirmed);
        let cancelled_distributors = distributors_with(quotes, QuoteStatus::Cancelled);

        let lines = order
            .lines
            .iter()
            .map(|line| {
                let winner = quotes
                    .iter()
                    .find(|quote| quote.product_id == line.product_id && quote.status.is_winning());
                TrackedLine {
                    product_id: line.product_id,
                    product_name: quotes
                        .iter()
                        .find(|quote| quote.product_id == line.product_id)
                        .map(|quote| quote.product_name.clone()),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    total_price: line.total_price,
                    distributor_id: winner.map(|quote| quote.distributor_id.clone()),
                    quote_status: winner.map(|quote| quote.status),
                    distributor_order_id: winner.and_then(|quote| quote.distributor_order_id.clone()),
                    delivery_estimate: winner.and_then(|quote| quote.delivery_estimate),
                }
            })
            .collect();

        Self {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            status: order.status,
            total_amount: order.total_amount,
            order_date: order.order_date,
            shipped_date: order.shipped_date,
            delivered_date: order.delivered_date,
            confirmed_distributors,
            cancelled_distributors,
            lines,
        }
    }
}

fn distributors_with(quotes: &[Quote], status: QuoteStatus) -> Vec<DistributorId> {
    quotes
        .iter()
        .filter(|quote| quote.status == status)
        .map(|quote| quote.distributor_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReviewCandidate {
    pub quote: Quote,
    pub score: ScoreBreakdown,
}

/// One product's competing quotes, best score first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProductReview {
    pub product_id: ProductId,
    pub quantity: u32,
    pub has_confirmed_quote: bool,
    pub candidates: Vec<ReviewCandidate>,
}

/// Failed and Error quotes are left out; they cannot win without a new
/// placement attempt.
pub fn build_review(order: &Order, quotes: &[Quote], scoring: &ScoringEngine) -> Vec<ProductReview> {
    order
        .lines
        .iter()
        .map(|line| {
            let group: Vec<Quote> = quotes
                .iter()
                .filter(|quote| {
                    quote.product_id == line.product_id
                        && !matches!(quote.status, QuoteStatus::Failed | QuoteStatus::Error)
                })
                .cloned()
                .collect();

            let mut candidates: Vec<ReviewCandidate> = scoring
                .score_all(&group)
                .into_iter()
                .map(|scored| ReviewCandidate { quote: scored.offer.clone(), score: scored.score })
                .collect();
            candidates.sort_by(|left, right| right.score.total.cmp(&left.score.total));

            ProductReview {
                product_id: line.product_id,
                quantity: line.quantity,
                has_confirmed_quote: group.iter().any(|quote| quote.status == QuoteStatus::Confirmed),
                candidates,
            }
        })
        .collect()
}
