//! Order orchestration over the distributor gateway and the quotation store.

use offerhub_core::errors::ApplicationError;
use offerhub_db::RepositoryError;
use tracing::error;

pub mod catalog;
pub mod orchestrator;
pub mod store;
pub mod tracking;

pub use catalog::{merge_offers, CatalogService};
pub use orchestrator::{
    CancellationSummary, FailedPlacement, OrchestratorSettings, OrderOrchestrator, OrderOutcome,
    PlacementSummary,
};
pub use store::{QuotationStore, SavedBatch};
pub use tracking::{build_review, OrderTracking, ProductReview, ReviewCandidate, TrackedLine};

/// Storage failures abort the current operation; the state machine cannot
/// continue without a durable record.
pub(crate) fn persistence(operation: &'static str) -> impl Fn(RepositoryError) -> ApplicationError {
    move |source| {
        error!(
            event_name = "orchestrator.persistence.failed",
            operation,
            error = %source,
            "persistence failure"
        );
        ApplicationError::Persistence(format!("{operation}: {source}"))
    }
}
