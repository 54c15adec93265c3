use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::order::OrderStatus;
use crate::flows::states::{FlowAction, FlowContext, FlowEvent, TransitionOutcome};

pub trait FlowDefinition {
    fn initial_state(&self) -> OrderStatus;
    fn transition(
        &self,
        current: &OrderStatus,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// Order lifecycle from checkout to confirmation or cancellation.
#[derive(Clone, Debug, Default)]
pub struct OrderLifecycle;

impl FlowDefinition for OrderLifecycle {
    fn initial_state(&self) -> OrderStatus {
        OrderStatus::Processing
    }

    fn transition(
        &self,
        current: &OrderStatus,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_order(current, event, context)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> OrderStatus {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &OrderStatus,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &OrderStatus,
        event: &FlowEvent,
        context: &FlowContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit.order_id.clone(),
                        audit.correlation_id.clone(),
                        "flow.transition_applied",
                        AuditCategory::Flow,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", outcome.from.as_str())
                    .with_metadata("to", outcome.to.as_str())
                    .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.order_id.clone(),
                        audit.correlation_id.clone(),
                        "flow.transition_rejected",
                        AuditCategory::Flow,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for FlowEngine<OrderLifecycle> {
    fn default() -> Self {
        Self::new(OrderLifecycle)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("order is already {state:?} and cannot accept {event:?}")]
    TerminalState { state: OrderStatus, event: FlowEvent },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: OrderStatus, event: FlowEvent },
}

fn transition_order(
    current: &OrderStatus,
    event: &FlowEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{
        ApplyFallbackDates, FlagManualFollowUp, NotifyCustomer, NotifyDistributors,
        PlaceDistributorOrders, PriceLineItems, ScoreQuotations, SolicitQuotations,
    };
    use FlowEvent::{
        CancelRequested, PlacementSettled, QuotationsReceived, ResolicitRequested, SelectionEmpty,
        SolicitationEmpty, WinnersSelected,
    };
    use OrderStatus::{
        Cancelled, Confirmed, PendingConfirmation, PendingQuotations, PendingSelection, Processing,
    };

    let (to, actions) = match (current, event) {
        (Cancelled, _) | (Confirmed, CancelRequested) => {
            return Err(FlowTransitionError::TerminalState { state: *current, event: *event });
        }
        (Processing, QuotationsReceived) => (Processing, vec![ScoreQuotations]),
        (Processing, SolicitationEmpty) => {
            (PendingQuotations, vec![ApplyFallbackDates, FlagManualFollowUp])
        }
        (Processing, SelectionEmpty) => (PendingSelection, vec![FlagManualFollowUp]),
        (Processing | PendingSelection | PendingConfirmation, WinnersSelected) => {
            (PendingConfirmation, vec![PriceLineItems, PlaceDistributorOrders, NotifyDistributors])
        }
        (PendingConfirmation, PlacementSettled) if context.all_lines_confirmed => {
            (Confirmed, vec![PriceLineItems, NotifyCustomer])
        }
        (PendingConfirmation, PlacementSettled) => {
            (PendingConfirmation, vec![PriceLineItems, FlagManualFollowUp])
        }
        (Confirmed, PlacementSettled) if context.all_lines_confirmed => (Confirmed, Vec::new()),
        (PendingQuotations | PendingSelection | PendingConfirmation, ResolicitRequested) => {
            (Processing, vec![SolicitQuotations])
        }
        (_, CancelRequested) => (Cancelled, vec![NotifyDistributors]),
        _ => {
            return Err(FlowTransitionError::InvalidTransition { state: *current, event: *event });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: *event, actions })
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::domain::order::{OrderId, OrderStatus};
    use crate::flows::engine::{FlowDefinition, FlowEngine, FlowTransitionError, OrderLifecycle};
    use crate::flows::states::{FlowAction, FlowContext, FlowEvent};

    fn settled(all_lines_confirmed: bool) -> FlowContext {
        FlowContext { all_lines_confirmed }
    }

    #[test]
    fn happy_path_reaches_confirmed() {
        let engine = FlowEngine::default();
        let context = FlowContext::default();
        let mut state = engine.initial_state();

        state = engine
            .apply(&state, &FlowEvent::QuotationsReceived, &context)
            .expect("processing -> processing")
            .to;
        let selected = engine
            .apply(&state, &FlowEvent::WinnersSelected, &context)
            .expect("processing -> pending confirmation");
        assert_eq!(selected.to, OrderStatus::PendingConfirmation);
        assert!(selected.actions.contains(&FlowAction::PlaceDistributorOrders));

        let confirmed = engine
            .apply(&selected.to, &FlowEvent::PlacementSettled, &settled(true))
            .expect("pending confirmation -> confirmed");
        assert_eq!(confirmed.to, OrderStatus::Confirmed);
        assert!(confirmed.actions.contains(&FlowAction::NotifyCustomer));
    }

    #[test]
    fn partial_placement_stays_pending_confirmation() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(&OrderStatus::PendingConfirmation, &FlowEvent::PlacementSettled, &settled(false))
            .expect("partial placement is not an error");

        assert_eq!(outcome.to, OrderStatus::PendingConfirmation);
        assert!(outcome.actions.contains(&FlowAction::FlagManualFollowUp));
    }

    #[test]
    fn empty_solicitation_parks_order_for_follow_up() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(&OrderStatus::Processing, &FlowEvent::SolicitationEmpty, &FlowContext::default())
            .expect("processing -> pending quotations");

        assert_eq!(outcome.to, OrderStatus::PendingQuotations);
        assert_eq!(
            outcome.actions,
            vec![FlowAction::ApplyFallbackDates, FlowAction::FlagManualFollowUp]
        );

        let resolicit = engine
            .apply(&outcome.to, &FlowEvent::ResolicitRequested, &FlowContext::default())
            .expect("pending quotations -> processing");
        assert_eq!(resolicit.to, OrderStatus::Processing);
    }

    #[test]
    fn rerunning_placement_on_confirmed_order_is_idempotent() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(&OrderStatus::Confirmed, &FlowEvent::PlacementSettled, &settled(true))
            .expect("confirmed stays confirmed");

        assert_eq!(outcome.to, OrderStatus::Confirmed);
        assert!(outcome.actions.is_empty());
    }

    #[test]
    fn terminal_orders_reject_further_events() {
        let engine = FlowEngine::default();

        let cancelled = engine
            .apply(&OrderStatus::Cancelled, &FlowEvent::WinnersSelected, &FlowContext::default())
            .expect_err("cancelled is terminal");
        assert!(matches!(cancelled, FlowTransitionError::TerminalState { .. }));

        let confirmed = engine
            .apply(&OrderStatus::Confirmed, &FlowEvent::CancelRequested, &FlowContext::default())
            .expect_err("confirmed orders cannot be cancelled");
        assert!(matches!(confirmed, FlowTransitionError::TerminalState { .. }));
    }

    #[test]
    fn invalid_transition_is_rejected() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(&OrderStatus::PendingQuotations, &FlowEvent::PlacementSettled, &settled(true))
            .expect_err("nothing was placed");

        assert_eq!(
            error,
            FlowTransitionError::InvalidTransition {
                state: OrderStatus::PendingQuotations,
                event: FlowEvent::PlacementSettled
            }
        );
    }

    #[test]
    fn cancellation_is_allowed_before_confirmation() {
        let engine = FlowEngine::new(OrderLifecycle);
        for state in [
            OrderStatus::Processing,
            OrderStatus::PendingQuotations,
            OrderStatus::PendingSelection,
            OrderStatus::PendingConfirmation,
        ] {
            let outcome = engine
                .apply(&state, &FlowEvent::CancelRequested, &FlowContext::default())
                .expect("cancel before confirmation");
            assert_eq!(outcome.to, OrderStatus::Cancelled);
        }
        assert_eq!(OrderLifecycle.initial_state(), OrderStatus::Processing);
    }

    #[test]
    fn flow_transition_emits_audit_event() {
        let engine = FlowEngine::default();
        let sink = InMemoryAuditSink::default();

        let _ = engine
            .apply_with_audit(
                &OrderStatus::Processing,
                &FlowEvent::SelectionEmpty,
                &FlowContext::default(),
                &sink,
                &AuditContext::new(Some(OrderId("ORD-9".to_owned())), "req-42", "orchestrator"),
            )
            .expect("transition should succeed");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].correlation_id, "req-42");
        assert_eq!(events[0].event_type, "flow.transition_applied");
        assert_eq!(events[0].metadata.get("to").map(String::as_str), Some("pending_selection"));
    }
}
