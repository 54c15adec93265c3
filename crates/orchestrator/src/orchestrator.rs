//! Drives an order from checkout through solicitation, selection and
//! per-distributor placement.
//!
//! Distributor failures never fail an operation: they land on the affected
//! quotes as Failed or Error and are reported in the returned summary. Only
//! persistence failures and contract violations propagate.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use offerhub_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use offerhub_core::config::AppConfig;
use offerhub_core::domain::distributor::DistributorId;
use offerhub_core::domain::order::{generate_order_number, NewOrder, Order, OrderId, OrderStatus};
use offerhub_core::domain::product::ProductId;
use offerhub_core::domain::quote::{Quote, QuoteId, QuoteStatus};
use offerhub_core::errors::{ApplicationError, DomainError};
use offerhub_core::flows::{FlowContext, FlowEngine, FlowEvent, OrderLifecycle};
use offerhub_core::gateway::{
    DistributorGateway, DistributorOrder, DistributorOrderItem, GatewayError, QuotationRequest,
    StatusUpdate,
};
use offerhub_core::scoring::{ScoringEngine, ScoringProfile};
use offerhub_db::OrderRepository;

use crate::persistence;
use crate::store::QuotationStore;
use crate::tracking::{build_review, OrderTracking, ProductReview};

const ACTOR: &str = "orchestrator";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub order_number_prefix: String,
    pub shipping_delay_days: u32,
    pub fallback_ship_days: u32,
    pub fallback_delivery_days: u32,
    pub selection: ScoringProfile,
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            order_number_prefix: config.orders.order_number_prefix.clone(),
            shipping_delay_days: config.orders.shipping_delay_days,
            fallback_ship_days: config.orders.fallback_ship_days,
            fallback_delivery_days: config.orders.fallback_delivery_days,
            selection: config.scoring.quotation,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            order_number_prefix: "OH".to_string(),
            shipping_delay_days: 2,
            fallback_ship_days: 3,
            fallback_delivery_days: 7,
            selection: ScoringProfile::quotation(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedPlacement {
    pub distributor_id: DistributorId,
    pub status: QuoteStatus,
    pub message: String,
}

/// Per-distributor result of one placement pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlacementSummary {
    pub order_id: OrderId,
    pub order_number: String,
    pub order_status: OrderStatus,
    pub total_amount: Decimal,
    pub confirmed: Vec<DistributorId>,
    pub failed: Vec<FailedPlacement>,
    pub cancelled: Vec<DistributorId>,
    /// Winners that were already Confirmed and were not placed again.
    pub skipped_already_confirmed: usize,
    pub notification_failures: usize,
}

impl PlacementSummary {
    pub fn confirmed_count(&self) -> usize {
        self.confirmed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn cancelled_count(&self) -> usize {
        self.cancelled.len()
    }
}

/// What checkout or re-solicitation produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderOutcome {
    pub order: Order,
    pub quotes_received: usize,
    pub solicitation_failures: usize,
    pub placement: Option<PlacementSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CancellationSummary {
    pub order: Order,
    pub cancelled: Vec<DistributorId>,
    pub notification_failures: usize,
}

pub struct OrderOrchestrator {
    gateway: DistributorGateway,
    store: QuotationStore,
    orders: Arc<dyn OrderRepository>,
    scoring: ScoringEngine,
    flow: FlowEngine<OrderLifecycle>,
    audit: Arc<dyn AuditSink>,
    settings: OrchestratorSettings,
}

impl OrderOrchestrator {
    pub fn new(
        gateway: DistributorGateway,
        store: QuotationStore,
        orders: Arc<dyn OrderRepository>,
        audit: Arc<dyn AuditSink>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            orders,
            scoring: ScoringEngine::new(settings.selection),
            flow: FlowEngine::default(),
            audit,
            settings,
        }
    }

    pub fn store(&self) -> &QuotationStore {
        &self.store
    }

    pub async fn order(&self, order_id: &OrderId) -> Result<Order, ApplicationError> {
        self.orders
            .find_by_id(order_id)
            .await
            .map_err(persistence("order.find_by_id"))?
            .ok_or_else(|| ApplicationError::NotFound { entity: "order", id: order_id.0.clone() })
    }

    pub async fn quotes(&self, order_id: &OrderId) -> Result<Vec<Quote>, ApplicationError> {
        let order = self.order(order_id).await?;
        self.store.get_by_order(&order.id).await
    }

    /// Checkout: create the order, solicit every distributor, select a
    /// winner per product and place the winning orders.
    pub async fn place_order(&self, request: NewOrder) -> Result<OrderOutcome, ApplicationError> {
        let order_number =
            generate_order_number(&self.settings.order_number_prefix, Utc::now().date_naive());
        let order = Order::create(request, order_number)?;
        self.save_order(&order).await?;

        let audit = self.audit_context(&order.id);
        self.emit(
            &audit,
            "order.created",
            AuditCategory::Ingress,
            AuditOutcome::Success,
            vec![("order_number", order.order_number.clone())],
        );
        info!(
            event_name = "orchestrator.order.created",
            correlation_id = %audit.correlation_id,
            order_id = %order.id,
            order_number = %order.order_number,
            lines = order.lines.len(),
            "order created"
        );

        let products: Vec<ProductId> = order.lines.iter().map(|line| line.product_id).collect();
        self.solicit_and_select(order, &products, &audit).await
    }

    /// Places every winning quote that still awaits placement, one request
    /// per distributor, all in flight at once. Distributors that already
    /// confirmed are never contacted again.
    pub async fn place_orders(
        &self,
        order_id: &OrderId,
    ) -> Result<PlacementSummary, ApplicationError> {
        let order = self.order(order_id).await?;
        let audit = self.audit_context(&order.id);
        self.run_placement(order, &audit).await
    }

    /// Operator override: pick the winning quote per product by id.
    pub async fn select_quotes(
        &self,
        order_id: &OrderId,
        quote_ids: &[QuoteId],
    ) -> Result<PlacementSummary, ApplicationError> {
        let mut order = self.order(order_id).await?;
        let audit = self.audit_context(&order.id);
        self.flow.apply(&order.status, &FlowEvent::WinnersSelected, &FlowContext::default())?;

        let quotes = self.store.get_by_order(&order.id).await?;
        let mut chosen = Vec::with_capacity(quote_ids.len());
        let mut products = HashSet::new();
        for quote_id in quote_ids {
            let quote = quotes
                .iter()
                .find(|quote| &quote.id == quote_id)
                .cloned()
                .ok_or_else(|| invariant(format!("quote {quote_id} does not belong to order {}", order.id)))?;
            if !products.insert(quote.product_id) {
                return Err(invariant(format!(
                    "more than one quote selected for product {}",
                    quote.product_id
                )));
            }
            if quotes.iter().any(|other| {
                other.product_id == quote.product_id && other.status == QuoteStatus::Confirmed
            }) {
                return Err(invariant(format!(
                    "product {} already has a confirmed quote",
                    quote.product_id
                )));
            }
            chosen.push(quote);
        }
        if chosen.is_empty() {
            return Err(invariant("no quotes selected".to_string()));
        }

        let mut notification_failures = 0;
        for mut quote in chosen {
            quote.transition_to(QuoteStatus::Selected)?;
            quote.append_note("selected by operator");
            let winner = self.store.record(quote).await?;
            notification_failures += self.retire_rivals(&winner, &quotes, &audit).await?;
            self.emit(
                &audit,
                "selection.manual",
                AuditCategory::Selection,
                AuditOutcome::Success,
                vec![
                    ("product_id", winner.product_id.to_string()),
                    ("distributor_id", winner.distributor_id.to_string()),
                ],
            );
        }

        let quotes = self.store.get_by_order(&order.id).await?;
        order.reprice(&quotes);
        self.schedule_delivery(&mut order, &quotes);
        self.advance(&mut order, FlowEvent::WinnersSelected, FlowContext::default(), &audit)?;
        self.save_order(&order).await?;

        let mut summary = self.run_placement(order, &audit).await?;
        summary.notification_failures += notification_failures;
        Ok(summary)
    }

    /// Asks every distributor again for products without a Confirmed quote.
    pub async fn resolicit(&self, order_id: &OrderId) -> Result<OrderOutcome, ApplicationError> {
        let mut order = self.order(order_id).await?;
        let audit = self.audit_context(&order.id);
        self.advance(&mut order, FlowEvent::ResolicitRequested, FlowContext::default(), &audit)?;
        self.save_order(&order).await?;

        let quotes = self.store.get_by_order(&order.id).await?;
        let products: Vec<ProductId> = order
            .lines
            .iter()
            .map(|line| line.product_id)
            .filter(|product| {
                !quotes.iter().any(|quote| {
                    quote.product_id == *product && quote.status == QuoteStatus::Confirmed
                })
            })
            .collect();
        self.solicit_and_select(order, &products, &audit).await
    }

    /// Cancels every quote that has not been confirmed and closes the order.
    /// Confirmed quotes stay confirmed.
    pub async fn cancel_order(
        &self,
        order_id: &OrderId,
    ) -> Result<CancellationSummary, ApplicationError> {
        let mut order = self.order(order_id).await?;
        let audit = self.audit_context(&order.id);
        self.flow.apply(&order.status, &FlowEvent::CancelRequested, &FlowContext::default())?;

        let quotes = self.store.get_by_order(&order.id).await?;
        let mut cancelled = BTreeSet::new();
        let mut notification_failures = 0;
        for quote in quotes
            .into_iter()
            .filter(|quote| !matches!(quote.status, QuoteStatus::Confirmed | QuoteStatus::Cancelled))
        {
            let (distributor, failed) =
                self.cancel_quote(quote, "order cancelled", &audit).await?;
            cancelled.insert(distributor);
            notification_failures += usize::from(failed);
        }

        let quotes = self.store.get_by_order(&order.id).await?;
        order.reprice(&quotes);
        self.advance(&mut order, FlowEvent::CancelRequested, FlowContext::default(), &audit)?;
        self.save_order(&order).await?;

        Ok(CancellationSummary {
            order,
            cancelled: cancelled.into_iter().collect(),
            notification_failures,
        })
    }

    /// Applies a distributor-originated status change and re-derives the
    /// order from its quotes. A product keeps at most one Selected or
    /// Confirmed quote.
    pub async fn apply_status_update(
        &self,
        quote_id: &QuoteId,
        status: QuoteStatus,
        notes: Option<&str>,
    ) -> Result<Quote, ApplicationError> {
        let note = match notes.map(str::trim).filter(|note| !note.is_empty()) {
            Some(note) => format!("status set to {} by distributor: {note}", status.label()),
            None => format!("status set to {} by distributor", status.label()),
        };
        let current = self.store.get_by_id(quote_id).await?;
        if status.is_priced() && current.can_transition_to(status) {
            let siblings =
                self.store.get_by_order_and_product(&current.order_id, current.product_id).await?;
            if let Some(rival) =
                siblings.iter().find(|other| other.id != current.id && other.status.is_priced())
            {
                return Err(invariant(format!(
                    "product {} already has a {} quote from {}",
                    current.product_id,
                    rival.status.as_str(),
                    rival.distributor_id
                )));
            }
        }
        let quote = self.store.update_status(quote_id, status, Some(&note)).await?;

        let mut order = self.order(&quote.order_id).await?;
        let audit = self.audit_context(&order.id);
        let quotes = self.store.get_by_order(&order.id).await?;
        order.reprice(&quotes);
        if order.status == OrderStatus::PendingConfirmation {
            let context = FlowContext { all_lines_confirmed: all_lines_confirmed(&order, &quotes) };
            self.advance(&mut order, FlowEvent::PlacementSettled, context, &audit)?;
        }
        self.save_order(&order).await?;

        self.emit(
            &audit,
            "quote.status_updated",
            AuditCategory::Compensation,
            AuditOutcome::Success,
            vec![("quote_id", quote.id.to_string()), ("status", status.as_str().to_string())],
        );
        Ok(quote)
    }

    pub async fn track_order(&self, order_number: &str) -> Result<OrderTracking, ApplicationError> {
        let order = self
            .orders
            .find_by_number(order_number)
            .await
            .map_err(persistence("order.find_by_number"))?
            .ok_or_else(|| ApplicationError::NotFound {
                entity: "order",
                id: order_number.to_string(),
            })?;
        let quotes = self.store.get_by_order(&order.id).await?;
        Ok(OrderTracking::build(&order, &quotes))
    }

    pub async fn pending_review(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<ProductReview>, ApplicationError> {
        let order = self.order(order_id).await?;
        let quotes = self.store.get_by_order(&order.id).await?;
        Ok(build_review(&order, &quotes, &self.scoring))
    }

    async fn solicit_and_select(
        &self,
        mut order: Order,
        products: &[ProductId],
        audit: &AuditContext,
    ) -> Result<OrderOutcome, ApplicationError> {
        let requests: Vec<QuotationRequest> = order
            .lines
            .iter()
            .filter(|line| products.contains(&line.product_id))
            .map(|line| QuotationRequest {
                product_id: line.product_id,
                quantity: line.quantity,
                notes: Some(format!("Order {}", order.order_number)),
            })
            .collect();

        let solicitation = self.gateway.solicit(&requests).await;
        let quotes_received = solicitation.quotes.len();
        let solicitation_failures = solicitation.failures.len();
        self.emit(
            audit,
            "solicitation.completed",
            AuditCategory::Solicitation,
            if quotes_received == 0 { AuditOutcome::Failed } else { AuditOutcome::Success },
            vec![
                ("requests", requests.len().to_string()),
                ("quotes", quotes_received.to_string()),
                ("failures", solicitation_failures.to_string()),
            ],
        );

        if quotes_received == 0 {
            self.advance(&mut order, FlowEvent::SolicitationEmpty, FlowContext::default(), audit)?;
            if order.lines.iter().all(|line| line.total_price.is_none()) {
                let today = Utc::now().date_naive();
                order.shipped_date = Some(add_days(today, self.settings.fallback_ship_days));
                order.delivered_date = Some(add_days(today, self.settings.fallback_delivery_days));
            }
            self.save_order(&order).await?;
            warn!(
                event_name = "orchestrator.solicitation.empty",
                correlation_id = %audit.correlation_id,
                order_id = %order.id,
                failures = solicitation_failures,
                "no distributor quoted; order parked for follow-up"
            );
            return Ok(OrderOutcome { order, quotes_received, solicitation_failures, placement: None });
        }

        let batch = self.store.save_batch(&order.id, &solicitation.quotes).await?;
        self.advance(&mut order, FlowEvent::QuotationsReceived, FlowContext::default(), audit)?;

        let existing = self.store.get_by_order(&order.id).await?;
        let mut selected = 0;
        let mut notification_failures = 0;
        for product in products {
            let round: Vec<Quote> =
                batch.stored.iter().filter(|quote| quote.product_id == *product).cloned().collect();
            if round.is_empty() {
                continue;
            }
            let winner = self.select_winner(round, audit).await?;
            notification_failures += self.retire_rivals(&winner, &existing, audit).await?;
            selected += 1;
        }

        if selected == 0 {
            self.advance(&mut order, FlowEvent::SelectionEmpty, FlowContext::default(), audit)?;
            self.save_order(&order).await?;
            return Ok(OrderOutcome { order, quotes_received, solicitation_failures, placement: None });
        }

        let quotes = self.store.get_by_order(&order.id).await?;
        order.reprice(&quotes);
        self.schedule_delivery(&mut order, &quotes);
        self.advance(&mut order, FlowEvent::WinnersSelected, FlowContext::default(), audit)?;
        self.save_order(&order).await?;

        let mut placement = self.run_placement(order, audit).await?;
        placement.notification_failures += notification_failures;
        let order = self.order(&placement.order_id).await?;
        Ok(OrderOutcome {
            order,
            quotes_received,
            solicitation_failures,
            placement: Some(placement),
        })
    }

    /// Scores one product's fresh quotes. Offers with stock win over offers
    /// without; when nobody has stock the best offer is taken as a backorder.
    async fn select_winner(
        &self,
        round: Vec<Quote>,
        audit: &AuditContext,
    ) -> Result<Quote, ApplicationError> {
        let in_stock: Vec<Quote> =
            round.iter().filter(|quote| quote.available_stock > 0).cloned().collect();
        let backorder = in_stock.is_empty();
        let candidates = if backorder { round } else { in_stock };

        let best = self
            .scoring
            .select_best(&candidates)
            .ok_or_else(|| invariant("selection over an empty quote group".to_string()))?;
        let score = best.score;
        let mut winner = best.offer.clone();

        winner.transition_to(QuoteStatus::Selected)?;
        winner.append_note(format!(
            "selected from {} offers with score {} (price {}, stock {})",
            candidates.len(),
            score.total,
            score.price,
            score.stock
        ));
        if backorder {
            winner.append_note("no distributor has stock; selected as backorder");
        }
        let winner = self.store.record(winner).await?;

        info!(
            event_name = "orchestrator.selection.winner",
            correlation_id = %audit.correlation_id,
            order_id = %winner.order_id,
            product_id = %winner.product_id,
            distributor_id = %winner.distributor_id,
            quote_id = %winner.id,
            score = %score.total,
            backorder,
            "winning quote selected"
        );
        self.emit(
            audit,
            "selection.winner",
            AuditCategory::Selection,
            AuditOutcome::Success,
            vec![
                ("product_id", winner.product_id.to_string()),
                ("distributor_id", winner.distributor_id.to_string()),
                ("score", score.total.to_string()),
            ],
        );
        Ok(winner)
    }

    /// Earlier winners of the same product that were not confirmed give way
    /// to the new winner. Returns how many notifications failed.
    async fn retire_rivals(
        &self,
        winner: &Quote,
        known: &[Quote],
        audit: &AuditContext,
    ) -> Result<usize, ApplicationError> {
        let mut notification_failures = 0;
        for rival in known.iter().filter(|quote| {
            quote.product_id == winner.product_id
                && quote.id != winner.id
                && quote.status.is_winning()
                && quote.status != QuoteStatus::Confirmed
        }) {
            let current = self.store.get_by_id(&rival.id).await?;
            if !current.status.is_winning() || current.status == QuoteStatus::Confirmed {
                continue;
            }
            let (_, failed) =
                self.cancel_quote(current, "superseded by another selection", audit).await?;
            notification_failures += usize::from(failed);
        }
        Ok(notification_failures)
    }

    async fn run_placement(
        &self,
        mut order: Order,
        audit: &AuditContext,
    ) -> Result<PlacementSummary, ApplicationError> {
        let quotes = self.store.get_by_order(&order.id).await?;
        let settled_now = FlowContext { all_lines_confirmed: all_lines_confirmed(&order, &quotes) };
        self.flow.apply(&order.status, &FlowEvent::PlacementSettled, &settled_now)?;

        let won: HashSet<ProductId> = quotes
            .iter()
            .filter(|quote| quote.status.is_winning())
            .map(|quote| quote.product_id)
            .collect();

        let mut cancelled = BTreeSet::new();
        let mut notification_failures = 0;
        for loser in quotes
            .iter()
            .filter(|quote| quote.status == QuoteStatus::Pending && won.contains(&quote.product_id))
        {
            let (distributor, failed) =
                self.cancel_quote(loser.clone(), "another distributor won this product", audit).await?;
            cancelled.insert(distributor);
            notification_failures += usize::from(failed);
        }

        let skipped_already_confirmed =
            quotes.iter().filter(|quote| quote.status == QuoteStatus::Confirmed).count();
        let confirmed_products: HashSet<ProductId> = quotes
            .iter()
            .filter(|quote| quote.status == QuoteStatus::Confirmed)
            .map(|quote| quote.product_id)
            .collect();
        let mut pending: BTreeMap<DistributorId, Vec<Quote>> = BTreeMap::new();
        for quote in quotes.into_iter().filter(|quote| quote.status.awaits_placement()) {
            if confirmed_products.contains(&quote.product_id) {
                let reason = "product already confirmed with another distributor";
                let (distributor, failed) = self.cancel_quote(quote, reason, audit).await?;
                cancelled.insert(distributor);
                notification_failures += usize::from(failed);
                continue;
            }
            pending.entry(quote.distributor_id.clone()).or_default().push(quote);
        }
        if let Some(unknown) = pending.keys().find(|id| !self.gateway.knows(id)) {
            return Err(ApplicationError::UnknownDistributor(unknown.clone()));
        }

        let mut requests = Vec::with_capacity(pending.len());
        for (distributor_id, group) in pending {
            let request = self.distributor_order(&order, &distributor_id, &group)?;
            requests.push((distributor_id, group, request));
        }
        let placements = requests.into_iter().map(|(distributor_id, group, request)| async move {
            let result = self.gateway.place_order(&distributor_id, &request).await;
            (distributor_id, group, result)
        });

        let mut confirmed = Vec::new();
        let mut failed = Vec::new();
        for (distributor_id, group, result) in join_all(placements).await {
            match result {
                Ok(receipt) => {
                    let delivery_estimate = receipt.delivery_estimate.or_else(|| {
                        receipt
                            .estimated_delivery_days
                            .map(|days| add_days(Utc::now().date_naive(), days))
                    });
                    for mut quote in group {
                        quote.transition_to(QuoteStatus::Confirmed)?;
                        quote.distributor_order_id = Some(receipt.distributor_order_id.clone());
                        quote.confirmed_at = Some(Utc::now());
                        quote.delivery_estimate = delivery_estimate;
                        quote.append_note(format!(
                            "placed as distributor order {} ({})",
                            receipt.distributor_order_id, receipt.status
                        ));
                        let quote = self.store.record(quote).await?;
                        notification_failures +=
                            usize::from(!self.notify(&quote, "order placed").await);
                    }
                    info!(
                        event_name = "orchestrator.placement.confirmed",
                        correlation_id = %audit.correlation_id,
                        order_id = %order.id,
                        distributor_id = %distributor_id,
                        distributor_order_id = %receipt.distributor_order_id,
                        "distributor confirmed placement"
                    );
                    self.emit(
                        audit,
                        "placement.distributor_confirmed",
                        AuditCategory::Placement,
                        AuditOutcome::Success,
                        vec![
                            ("distributor_id", distributor_id.to_string()),
                            ("distributor_order_id", receipt.distributor_order_id.clone()),
                        ],
                    );
                    confirmed.push(distributor_id);
                }
                Err(error) => {
                    let status = error.placement_status();
                    for mut quote in group {
                        quote.transition_to(status)?;
                        quote.append_note(format!("placement failed: {error}"));
                        let quote = self.store.record(quote).await?;
                        notification_failures +=
                            usize::from(!self.notify(&quote, "order placement failed").await);
                    }
                    self.report_failed_placement(&order, &distributor_id, &error, audit);
                    failed.push(FailedPlacement {
                        distributor_id,
                        status,
                        message: error.to_string(),
                    });
                }
            }
        }

        let quotes = self.store.get_by_order(&order.id).await?;
        order.reprice(&quotes);
        if let Some(latest) = quotes
            .iter()
            .filter(|quote| quote.status == QuoteStatus::Confirmed)
            .filter_map(|quote| quote.delivery_estimate)
            .max()
        {
            order.delivered_date = Some(latest);
        }
        let context = FlowContext { all_lines_confirmed: all_lines_confirmed(&order, &quotes) };
        self.advance(&mut order, FlowEvent::PlacementSettled, context, audit)?;
        self.save_order(&order).await?;

        let summary = PlacementSummary {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            order_status: order.status,
            total_amount: order.total_amount,
            confirmed,
            failed,
            cancelled: cancelled.into_iter().collect(),
            skipped_already_confirmed,
            notification_failures,
        };
        info!(
            event_name = "orchestrator.placement.settled",
            correlation_id = %audit.correlation_id,
            order_id = %order.id,
            status = order.status.as_str(),
            confirmed = summary.confirmed_count(),
            failed = summary.failed_count(),
            cancelled = summary.cancelled_count(),
            skipped = summary.skipped_already_confirmed,
            "placement settled"
        );
        Ok(summary)
    }

    fn distributor_order(
        &self,
        order: &Order,
        distributor_id: &DistributorId,
        group: &[Quote],
    ) -> Result<DistributorOrder, ApplicationError> {
        let items = group
            .iter()
            .map(|quote| {
                let quantity =
                    order.line(quote.product_id).map(|line| line.quantity).unwrap_or(quote.quantity);
                let total_price =
                    quote.quoted_unit_price.checked_mul(Decimal::from(quantity)).ok_or_else(|| {
                        invariant(format!("line total for product {} overflows", quote.product_id))
                    })?;
                Ok(DistributorOrderItem {
                    product_id: quote.product_id,
                    quantity,
                    unit_price: quote.quoted_unit_price,
                    total_price,
                })
            })
            .collect::<Result<Vec<_>, ApplicationError>>()?;
        let total_amount = items
            .iter()
            .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.total_price))
            .ok_or_else(|| {
                invariant(format!("order total for distributor {distributor_id} overflows"))
            })?;

        Ok(DistributorOrder {
            order_number: format!("{}-{}", order.order_number, distributor_id),
            customer_name: order.contact.name.clone(),
            customer_email: order.contact.email.clone(),
            customer_phone: order.contact.phone.clone(),
            shipping_address: order.contact.shipping_address.clone(),
            total_amount,
            order_date: order.order_date,
            notes: Some(format!("Order {}", order.order_number)),
            items,
        })
    }

    fn report_failed_placement(
        &self,
        order: &Order,
        distributor_id: &DistributorId,
        error: &GatewayError,
        audit: &AuditContext,
    ) {
        warn!(
            event_name = "orchestrator.placement.failed",
            correlation_id = %audit.correlation_id,
            order_id = %order.id,
            distributor_id = %distributor_id,
            error_kind = error.kind(),
            error = %error,
            "distributor placement failed"
        );
        self.emit(
            audit,
            "placement.distributor_failed",
            AuditCategory::Placement,
            AuditOutcome::Failed,
            vec![
                ("distributor_id", distributor_id.to_string()),
                ("error_kind", error.kind().to_string()),
                ("status", error.placement_status().as_str().to_string()),
            ],
        );
    }

    /// Returns the distributor and whether its notification failed.
    async fn cancel_quote(
        &self,
        mut quote: Quote,
        reason: &str,
        audit: &AuditContext,
    ) -> Result<(DistributorId, bool), ApplicationError> {
        quote.transition_to(QuoteStatus::Cancelled)?;
        quote.append_note(format!("cancelled: {reason}"));
        let quote = self.store.record(quote).await?;
        let notified = self.notify(&quote, reason).await;
        self.emit(
            audit,
            "compensation.quote_cancelled",
            AuditCategory::Compensation,
            AuditOutcome::Success,
            vec![
                ("quote_id", quote.id.to_string()),
                ("distributor_id", quote.distributor_id.to_string()),
                ("notified", notified.to_string()),
            ],
        );
        Ok((quote.distributor_id, !notified))
    }

    /// Best-effort status push to the distributor that issued the quote.
    /// Quotes without a distributor-side id have nothing to update.
    async fn notify(&self, quote: &Quote, reason: &str) -> bool {
        let Some(quotation_id) = quote.distributor_quotation_id else {
            return true;
        };
        let update = StatusUpdate {
            quotation_id,
            status: quote.status,
            notes: Some(reason.to_string()),
        };
        match self.gateway.update_quotation_status(&quote.distributor_id, &update).await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    event_name = "orchestrator.notification.failed",
                    order_id = %quote.order_id,
                    quote_id = %quote.id,
                    distributor_id = %quote.distributor_id,
                    status = quote.status.as_str(),
                    error = %error,
                    "distributor status notification failed"
                );
                false
            }
        }
    }

    /// shipped = today + shipping delay; delivered = shipped + mean winning
    /// delivery days, rounded up.
    fn schedule_delivery(&self, order: &mut Order, quotes: &[Quote]) {
        let winning_days: Vec<u32> = quotes
            .iter()
            .filter(|quote| quote.status.is_priced())
            .map(|quote| quote.estimated_delivery_days)
            .collect();
        if winning_days.is_empty() {
            return;
        }
        let total: u64 = winning_days.iter().map(|days| u64::from(*days)).sum();
        let mean = total.div_ceil(winning_days.len() as u64);
        let shipped = add_days(Utc::now().date_naive(), self.settings.shipping_delay_days);
        order.shipped_date = Some(shipped);
        order.delivered_date = Some(add_days(shipped, u32::try_from(mean).unwrap_or(u32::MAX)));
    }

    fn advance(
        &self,
        order: &mut Order,
        event: FlowEvent,
        context: FlowContext,
        audit: &AuditContext,
    ) -> Result<(), ApplicationError> {
        let outcome =
            self.flow.apply_with_audit(&order.status, &event, &context, self.audit.as_ref(), audit)?;
        if outcome.from != outcome.to {
            info!(
                event_name = "orchestrator.order.transitioned",
                correlation_id = %audit.correlation_id,
                order_id = %order.id,
                from = outcome.from.as_str(),
                to = outcome.to.as_str(),
                "order status changed"
            );
        }
        order.status = outcome.to;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn save_order(&self, order: &Order) -> Result<(), ApplicationError> {
        self.orders.save(order.clone()).await.map_err(persistence("order.save"))
    }

    fn audit_context(&self, order_id: &OrderId) -> AuditContext {
        AuditContext::new(Some(order_id.clone()), Uuid::new_v4().to_string(), ACTOR)
    }

    fn emit(
        &self,
        audit: &AuditContext,
        event_type: &str,
        category: AuditCategory,
        outcome: AuditOutcome,
        metadata: Vec<(&str, String)>,
    ) {
        let event = metadata.into_iter().fold(
            AuditEvent::new(
                audit.order_id.clone(),
                audit.correlation_id.clone(),
                event_type,
                category,
                audit.actor.clone(),
                outcome,
            ),
            |event, (key, value)| event.with_metadata(key, value),
        );
        self.audit.emit(event);
    }
}

fn all_lines_confirmed(order: &Order, quotes: &[Quote]) -> bool {
    order.lines.iter().all(|line| {
        quotes
            .iter()
            .any(|quote| quote.product_id == line.product_id && quote.status == QuoteStatus::Confirmed)
    })
}

fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days))).unwrap_or(date)
}

fn invariant(message: String) -> ApplicationError {
    ApplicationError::Domain(DomainError::InvariantViolation(message))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::{add_days, OrchestratorSettings};

    #[test]
    fn default_settings_match_shipping_policy() {
        let settings = OrchestratorSettings::default();
        assert_eq!(settings.shipping_delay_days, 2);
        assert_eq!(settings.fallback_ship_days, 3);
        assert_eq!(settings.fallback_delivery_days, 7);
    }

    #[test]
    fn add_days_crosses_month_boundaries() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 30).expect("valid date");
        assert_eq!(add_days(date, 3), NaiveDate::from_ymd_opt(2026, 11, 2).expect("valid date"));
        let today = Utc::now().date_naive();
        assert_eq!(add_days(today, 0), today);
    }
}
