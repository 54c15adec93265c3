use std::sync::Arc;

use offerhub_core::audit::TracingAuditSink;
use offerhub_core::config::{AppConfig, ConfigError};
use offerhub_core::gateway::DistributorGateway;
use offerhub_core::scoring::ScoringEngine;
use offerhub_db::{connect_with_settings, migrations, DbPool, SqlOrderRepository, SqlQuoteRepository};
use offerhub_distributors::build_gateway;
use offerhub_orchestrator::{CatalogService, OrchestratorSettings, OrderOrchestrator, QuotationStore};
use thiserror::Error;
use tracing::info;

use crate::api::ApiState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub gateway: DistributorGateway,
    pub orchestrator: Arc<OrderOrchestrator>,
    pub catalog: CatalogService,
}

impl Application {
    pub fn api_state(&self) -> ApiState {
        ApiState::new(self.orchestrator.clone(), self.catalog.clone(), self.gateway.clone())
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("distributor client setup failed: {0}")]
    Gateway(#[source] reqwest::Error),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        distributors = config.distributors.len(),
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let gateway = build_gateway(&config).map_err(BootstrapError::Gateway)?;
    let markup = Arc::new(config.pricing.markup());
    let store = QuotationStore::new(Arc::new(SqlQuoteRepository::new(db_pool.clone())), markup.clone());
    let orchestrator = OrderOrchestrator::new(
        gateway.clone(),
        store,
        Arc::new(SqlOrderRepository::new(db_pool.clone())),
        Arc::new(TracingAuditSink),
        OrchestratorSettings::from_config(&config),
    );
    let catalog =
        CatalogService::new(gateway.clone(), ScoringEngine::new(config.scoring.catalog), markup);

    Ok(Application { config, db_pool, gateway, orchestrator: Arc::new(orchestrator), catalog })
}
