//! Batch domain types and state machine.

mod ops;
mod states;
mod types;

pub use ops::{BatchDetail, BatchOps, BatchStatusSummary, MAX_BATCH_POSTS};
pub use states::{allowed_transitions, is_terminal, validate_transition};
pub use types::{Batch, BatchState, PostTypeCounts};
