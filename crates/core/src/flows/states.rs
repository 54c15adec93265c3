use serde::{Deserialize, Serialize};

use crate::domain::order::OrderStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    QuotationsReceived,
    SolicitationEmpty,
    SelectionEmpty,
    WinnersSelected,
    PlacementSettled,
    ResolicitRequested,
    CancelRequested,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlowContext {
    /// Every line item has a Confirmed winning quote.
    pub all_lines_confirmed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    SolicitQuotations,
    ScoreQuotations,
    ApplyFallbackDates,
    PriceLineItems,
    PlaceDistributorOrders,
    NotifyDistributors,
    NotifyCustomer,
    FlagManualFollowUp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
}
