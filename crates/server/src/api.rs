//! JSON endpoints over the order orchestrator.
//!
//! - `GET  /catalog?category=`          best offer per product
//! - `POST /orders`                     checkout
//! - `GET  /orders/{id}/quotes`         stored quotes of an order
//! - `GET  /orders/{id}/review`         scored candidates per product
//! - `POST /orders/{id}/placement`      retry placement of unconfirmed winners
//! - `POST /orders/{id}/selection`      operator picks winners by quote id
//! - `POST /orders/{id}/resolicit`      ask distributors again
//! - `POST /orders/{id}/cancel`         cancel the order
//! - `PUT  /quotes/{id}/status`         distributor-originated status change
//! - `GET  /tracking/{order_number}`    customer tracking view
//! - `GET  /distributors/probe`         distributor reachability

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use offerhub_core::domain::offer::BestOffer;
use offerhub_core::domain::order::{NewOrder, OrderId};
use offerhub_core::domain::quote::{Quote, QuoteId, QuoteStatus};
use offerhub_core::errors::{ApplicationError, InterfaceError};
use offerhub_core::gateway::{DistributorGateway, ProbeReport};
use offerhub_orchestrator::{
    CancellationSummary, CatalogService, OrderOrchestrator, OrderOutcome, OrderTracking,
    PlacementSummary, ProductReview,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ApiState {
    orchestrator: Arc<OrderOrchestrator>,
    catalog: CatalogService,
    gateway: DistributorGateway,
}

impl ApiState {
    pub fn new(
        orchestrator: Arc<OrderOrchestrator>,
        catalog: CatalogService,
        gateway: DistributorGateway,
    ) -> Self {
        Self { orchestrator, catalog, gateway }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/catalog", get(catalog))
        .route("/orders", post(create_order))
        .route("/orders/{id}/quotes", get(order_quotes))
        .route("/orders/{id}/review", get(order_review))
        .route("/orders/{id}/placement", post(retry_placement))
        .route("/orders/{id}/selection", post(select_quotes))
        .route("/orders/{id}/resolicit", post(resolicit))
        .route("/orders/{id}/cancel", post(cancel_order))
        .route("/quotes/{id}/status", put(update_quote_status))
        .route("/tracking/{order_number}", get(track_order))
        .route("/distributors/probe", get(probe_distributors))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub quote_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self(InterfaceError::BadRequest {
            message: message.into(),
            correlation_id: Uuid::new_v4().to_string(),
        })
    }

    pub fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal details stay in the logs.
        let detail = status.is_client_error().then(|| self.0.to_string());
        let body = ErrorBody {
            error: self.0.user_message(),
            detail,
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Maps an application failure to its HTTP shape and logs it under a fresh
/// correlation id.
fn failed(operation: &'static str) -> impl Fn(ApplicationError) -> ApiError {
    move |source| {
        let correlation_id = Uuid::new_v4().to_string();
        let interface = source.clone().into_interface(correlation_id.clone());
        if matches!(
            interface,
            InterfaceError::ServiceUnavailable { .. } | InterfaceError::Internal { .. }
        ) {
            error!(
                event_name = "server.api.request_failed",
                correlation_id = %correlation_id,
                operation,
                error = %source,
                "request failed"
            );
        } else {
            warn!(
                event_name = "server.api.request_rejected",
                correlation_id = %correlation_id,
                operation,
                error = %source,
                "request rejected"
            );
        }
        ApiError(interface)
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn catalog(
    State(state): State<ApiState>,
    Query(query): Query<CatalogQuery>,
) -> Json<Vec<BestOffer>> {
    Json(state.catalog.best_products(query.category.as_deref()).await)
}

pub async fn create_order(
    State(state): State<ApiState>,
    Json(request): Json<NewOrder>,
) -> Result<(StatusCode, Json<OrderOutcome>), ApiError> {
    let outcome = state.orchestrator.place_order(request).await.map_err(failed("order.create"))?;
    info!(
        event_name = "server.api.order_created",
        order_id = %outcome.order.id,
        order_number = %outcome.order.order_number,
        status = outcome.order.status.as_str(),
        "order accepted"
    );
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn order_quotes(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Quote>> {
    state.orchestrator.quotes(&OrderId(id)).await.map(Json).map_err(failed("order.quotes"))
}

pub async fn order_review(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<ProductReview>> {
    state.orchestrator.pending_review(&OrderId(id)).await.map(Json).map_err(failed("order.review"))
}

pub async fn retry_placement(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<PlacementSummary> {
    state.orchestrator.place_orders(&OrderId(id)).await.map(Json).map_err(failed("order.placement"))
}

pub async fn select_quotes(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<SelectionRequest>,
) -> ApiResult<PlacementSummary> {
    let quote_ids: Vec<QuoteId> = request.quote_ids.into_iter().map(QuoteId).collect();
    state
        .orchestrator
        .select_quotes(&OrderId(id), &quote_ids)
        .await
        .map(Json)
        .map_err(failed("order.selection"))
}

pub async fn resolicit(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<OrderOutcome> {
    state.orchestrator.resolicit(&OrderId(id)).await.map(Json).map_err(failed("order.resolicit"))
}

pub async fn cancel_order(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<CancellationSummary> {
    state.orchestrator.cancel_order(&OrderId(id)).await.map(Json).map_err(failed("order.cancel"))
}

pub async fn update_quote_status(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<StatusChangeRequest>,
) -> ApiResult<Quote> {
    let status = QuoteStatus::parse(&request.status)
        .ok_or_else(|| ApiError::bad_request(format!("unknown quote status `{}`", request.status)))?;
    state
        .orchestrator
        .apply_status_update(&QuoteId(id), status, request.notes.as_deref())
        .await
        .map(Json)
        .map_err(failed("quote.status"))
}

pub async fn track_order(
    State(state): State<ApiState>,
    Path(order_number): Path<String>,
) -> ApiResult<OrderTracking> {
    state.orchestrator.track_order(&order_number).await.map(Json).map_err(failed("order.track"))
}

pub async fn probe_distributors(State(state): State<ApiState>) -> Json<Vec<ProbeReport>> {
    Json(state.gateway.probe_all().await)
}
