//! Batch state transition rules.
//!
//! Every state mutation in the system goes through [`validate_transition`].
//! The stores call it inside their `update_state` implementations, so no code
//! path can write an illegal state.

use super::BatchState;
use crate::error::CoreError;

/// States reachable from `state` in one step.
pub fn allowed_transitions(state: BatchState) -> &'static [BatchState] {
    match state {
        BatchState::Setup => &[BatchState::Seeded],
        BatchState::Seeded => &[BatchState::Scripted],
        BatchState::Scripted => &[BatchState::PromptsBuilt],
        BatchState::PromptsBuilt => &[BatchState::Qa],
        // QA can advance to publish planning or send work back for rework.
        BatchState::Qa => &[
            BatchState::PublishPlan,
            BatchState::Scripted,
            BatchState::PromptsBuilt,
        ],
        BatchState::PublishPlan => &[BatchState::Complete],
        BatchState::Complete => &[],
    }
}

/// Returns true if no transitions leave this state.
pub fn is_terminal(state: BatchState) -> bool {
    allowed_transitions(state).is_empty()
}

/// Check that `current -> target` is a legal transition.
pub fn validate_transition(current: BatchState, target: BatchState) -> Result<(), CoreError> {
    let allowed = allowed_transitions(current);
    if allowed.contains(&target) {
        Ok(())
    } else {
        Err(CoreError::StateTransition {
            current: current.to_string(),
            target: target.to_string(),
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}
