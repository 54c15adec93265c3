pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod gateway;
pub mod pricing;
pub mod scoring;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
pub use domain::distributor::{Distributor, DistributorId};
pub use domain::offer::{BestOffer, CatalogOffer};
pub use domain::order::{
    CustomerContact, NewOrder, Order, OrderId, OrderLine, OrderLineRequest, OrderStatus,
};
pub use domain::product::{CatalogProduct, ProductId};
pub use domain::quote::{Quote, QuoteId, QuoteStatus, ReceivedQuote};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use gateway::{DistributorClient, DistributorGateway, GatewayError};
pub use pricing::{PricingError, PricingTransform, RetailMarkup};
pub use scoring::{ScoreBreakdown, ScoringEngine, ScoringProfile};
