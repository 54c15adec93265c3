use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use offerhub_core::domain::distributor::{Distributor, DistributorId};
use offerhub_core::domain::product::ProductId;
use offerhub_core::domain::quote::QuoteStatus;
use offerhub_core::gateway::{
    DistributorClient, DistributorOrder, DistributorOrderItem, GatewayError, QuotationRequest,
    StatusUpdate,
};
use offerhub_distributors::{HttpClientSettings, HttpDistributorClient};

#[derive(Clone, Default)]
struct StubState {
    status_updates: Arc<Mutex<Vec<Value>>>,
    orders: Arc<Mutex<Vec<Value>>>,
}

#[derive(Deserialize)]
struct CategoryQuery {
    category: Option<String>,
}

async fn quotation(Json(body): Json<Value>) -> Result<Json<Value>, (StatusCode, String)> {
    let product_id = body["productId"].as_i64().unwrap_or_default();
    match product_id {
        404 => Err((StatusCode::NOT_FOUND, "product not stocked".to_string())),
        777 => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Err((StatusCode::GATEWAY_TIMEOUT, "too slow".to_string()))
        }
        13 => Ok(Json(json!({
            "id": 1, "productId": 14, "productName": "Wrong", "quantity": 1,
            "unitPrice": 1.0, "availableStock": 1, "estimatedDeliveryDays": 1
        }))),
        99 => Ok(Json(json!({
            "id": 2, "productId": 99, "productName": "Gold Plated", "quantity": 1,
            "unitPrice": 5.0e12, "availableStock": 1, "estimatedDeliveryDays": 1
        }))),
        _ => Ok(Json(json!({
            "id": 500 + product_id,
            "productId": product_id,
            "productName": "Bluetooth Speaker",
            "quantity": body["quantity"],
            "unitPrice": 49.99,
            "availableStock": 6,
            "estimatedDeliveryDays": 2,
            "totalPrice": 99.98,
            "status": "Pending",
            "createdDate": "2026-10-19T08:00:00Z",
            "expiryDate": "2026-10-26T08:00:00Z",
            "notes": body["notes"]
        }))),
    }
}

async fn update_status(State(state): State<StubState>, Json(body): Json<Value>) -> StatusCode {
    state.status_updates.lock().expect("status lock").push(body);
    StatusCode::OK
}

async fn products(Query(query): Query<CategoryQuery>) -> Json<Value> {
    let all = vec![
        json!({"id": 1, "name": "Speaker", "description": "Portable", "price": 49.99, "stock": 6, "category": "Audio"}),
        json!({"id": 2, "name": "Laptop", "price": 899.0, "stock": 2, "category": "Computers"}),
    ];
    let filtered = all
        .into_iter()
        .filter(|item| match query.category.as_deref() {
            Some(category) => item["category"].as_str() == Some(category),
            None => true,
        })
        .collect::<Vec<_>>();
    Json(Value::Array(filtered))
}

async fn order(
    State(state): State<StubState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.orders.lock().expect("orders lock").push(body.clone());
    if body["orderNumber"].as_str().is_some_and(|number| number.contains("REJECT")) {
        return (
            StatusCode::OK,
            Json(json!({"success": false, "message": "credit check failed"})),
        );
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Order confirmed successfully",
            "orderId": 17,
            "orderNumber": body["orderNumber"],
            "status": "Received",
            "totalAmount": body["totalAmount"],
            "estimatedDeliveryDays": 2,
            "estimatedDeliveryDate": "2026-10-21",
            "distributorName": "Stub"
        })),
    )
}

async fn spawn_stub() -> (SocketAddr, StubState) {
    let state = StubState::default();
    let app = Router::new()
        .route("/api/quotation/request", post(quotation))
        .route("/api/quotation/update-status", put(update_status))
        .route("/api/product", get(products))
        .route("/api/order", post(order))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, state)
}

fn client_for(base_url: String, request_timeout: Duration) -> HttpDistributorClient {
    HttpDistributorClient::new(
        Distributor {
            id: DistributorId::new("stub"),
            name: "Stub".to_string(),
            base_url,
            catalog_delivery_days: 3,
        },
        &HttpClientSettings {
            request_timeout,
            probe_timeout: Duration::from_secs(1),
            accept_invalid_certs: false,
        },
    )
    .expect("build client")
}

fn request(product: i64) -> QuotationRequest {
    QuotationRequest {
        product_id: ProductId(product),
        quantity: 2,
        notes: Some("Order OH-20261019-00000001".to_string()),
    }
}

#[tokio::test]
async fn quotation_reply_is_tagged_with_the_distributor() {
    let (addr, _) = spawn_stub().await;
    let client = client_for(format!("http://{addr}"), Duration::from_secs(5));

    let quote = client.request_quotation(&request(3)).await.expect("quotation");

    assert_eq!(quote.distributor_id, DistributorId::new("stub"));
    assert_eq!(quote.distributor_quotation_id, Some(503));
    assert_eq!(quote.unit_price, Decimal::new(4_999, 2));
    assert_eq!(quote.available_stock, 6);
    assert_eq!(quote.notes.as_deref(), Some("Order OH-20261019-00000001"));
}

#[tokio::test]
async fn remote_status_and_schema_mismatch_are_distinguished() {
    let (addr, _) = spawn_stub().await;
    let client = client_for(format!("http://{addr}"), Duration::from_secs(5));

    let remote = client.request_quotation(&request(404)).await.expect_err("404");
    assert!(matches!(remote, GatewayError::Remote { status: 404, .. }));

    let mismatch = client.request_quotation(&request(13)).await.expect_err("mismatch");
    assert!(matches!(mismatch, GatewayError::Decode { .. }));
}

#[tokio::test]
async fn out_of_range_price_is_a_schema_failure() {
    let (addr, _) = spawn_stub().await;
    let client = client_for(format!("http://{addr}"), Duration::from_secs(5));

    let error = client.request_quotation(&request(99)).await.expect_err("price too large");

    match error {
        GatewayError::Decode { message, .. } => assert!(message.contains("above")),
        other => panic!("expected a decode failure, got {other:?}"),
    }
}

#[tokio::test]
async fn timeout_and_refused_connection_are_transport_failures() {
    let (addr, _) = spawn_stub().await;
    let slow = client_for(format!("http://{addr}"), Duration::from_millis(200));
    let timed_out = slow.request_quotation(&request(777)).await.expect_err("timeout");
    assert!(matches!(timed_out, GatewayError::Transport { .. }));
    assert_eq!(timed_out.placement_status(), QuoteStatus::Error);

    let unused = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let dead_addr = unused.local_addr().expect("addr");
    drop(unused);
    let dead = client_for(format!("http://{dead_addr}"), Duration::from_secs(1));
    let refused = dead.request_quotation(&request(1)).await.expect_err("refused");
    assert!(matches!(refused, GatewayError::Transport { .. }));
}

#[tokio::test]
async fn catalog_forwards_category_filter() {
    let (addr, _) = spawn_stub().await;
    let client = client_for(format!("http://{addr}/"), Duration::from_secs(5));

    let audio = client.fetch_catalog(Some("Audio")).await.expect("catalog");
    let everything = client.fetch_catalog(None).await.expect("catalog");

    assert_eq!(audio.len(), 1);
    assert_eq!(audio[0].description, "Portable");
    assert_eq!(everything.len(), 2);
    assert_eq!(everything[1].description, "");
}

fn distributor_order(order_number: &str) -> DistributorOrder {
    DistributorOrder {
        order_number: order_number.to_string(),
        customer_name: "Ada Lovelace".to_string(),
        customer_email: "ada@example.com".to_string(),
        customer_phone: None,
        shipping_address: "12 Analytical Way".to_string(),
        total_amount: Decimal::new(11_998, 2),
        order_date: Utc::now(),
        notes: None,
        items: vec![DistributorOrderItem {
            product_id: ProductId(3),
            quantity: 2,
            unit_price: Decimal::new(5_999, 2),
            total_price: Decimal::new(11_998, 2),
        }],
    }
}

#[tokio::test]
async fn order_placement_reads_id_and_delivery_estimate() {
    let (addr, state) = spawn_stub().await;
    let client = client_for(format!("http://{addr}"), Duration::from_secs(5));

    let receipt =
        client.place_order(&distributor_order("OH-20261019-00000001")).await.expect("placed");

    assert_eq!(receipt.distributor_order_id, "17");
    assert_eq!(receipt.delivery_estimate, NaiveDate::from_ymd_opt(2026, 10, 21));
    let sent = state.orders.lock().expect("orders lock").clone();
    assert_eq!(sent[0]["orderItems"][0]["unitPrice"].as_f64(), Some(59.99));
    assert_eq!(sent[0]["customerEmail"], "ada@example.com");
}

#[tokio::test]
async fn rejected_order_is_a_remote_failure() {
    let (addr, _) = spawn_stub().await;
    let client = client_for(format!("http://{addr}"), Duration::from_secs(5));

    let error = client
        .place_order(&distributor_order("OH-REJECT-1"))
        .await
        .expect_err("distributor said no");

    assert!(
        matches!(error, GatewayError::Remote { ref message, .. } if message == "credit check failed")
    );
    assert_eq!(error.placement_status(), QuoteStatus::Failed);
}

#[tokio::test]
async fn status_update_sends_the_distributor_quotation_id_and_label() {
    let (addr, state) = spawn_stub().await;
    let client = client_for(format!("http://{addr}"), Duration::from_secs(5));

    client
        .update_quotation_status(&StatusUpdate {
            quotation_id: 503,
            status: QuoteStatus::Cancelled,
            notes: Some("another distributor won".to_string()),
        })
        .await
        .expect("status update");

    let updates = state.status_updates.lock().expect("status lock").clone();
    assert_eq!(updates[0]["quotationId"], 503);
    assert_eq!(updates[0]["status"], "Cancelled");
}

#[tokio::test]
async fn probe_reports_reachability() {
    let (addr, _) = spawn_stub().await;
    let live = client_for(format!("http://{addr}"), Duration::from_secs(5));
    let report = live.probe().await;
    assert!(report.connected);
    assert!(report.url.ends_with("/api/product"));

    let unused = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let dead_addr = unused.local_addr().expect("addr");
    drop(unused);
    let dead = client_for(format!("http://{dead_addr}"), Duration::from_secs(5));
    let report = dead.probe().await;
    assert!(!report.connected);
}
