//! The bounded Storyteller↔Critic revise loop for a single artifact.

pub mod engine;

pub use engine::{EscalationReason, QaEngine, QaOutcome, QaSessionResult};
