use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use offerhub_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    distributors: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub distributors: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, distributors: usize) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool, distributors })
}

/// Local dependencies only; distributor reachability is reported by
/// `GET /distributors/probe`.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let distributors = if state.distributors > 0 {
        HealthCheck {
            status: "ready",
            detail: format!("{} distributor(s) configured", state.distributors),
        }
    } else {
        HealthCheck { status: "degraded", detail: "no distributors configured".to_string() }
    };
    let ready = database.status == "ready" && distributors.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        database,
        distributors,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customer_order").fetch_one(pool).await
    {
        Ok(orders) => HealthCheck { status: "ready", detail: format!("{orders} order(s) stored") },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}
