pub mod engine;
pub mod states;

pub use engine::{FlowDefinition, FlowEngine, FlowTransitionError, OrderLifecycle};
pub use states::{FlowAction, FlowContext, FlowEvent, TransitionOutcome};
