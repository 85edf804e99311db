//! Decision engine
//!
//! Picks the source for each task (local tables, knowledge memory or the
//! web), gathers the matching bundles and fuses them.

pub mod engine;
pub mod fusion;
pub mod rules;

pub use engine::{
    DecisionContext, DecisionEngine, DecisionResult, LearnerState, LocalBundle, MemoryBundle,
    WebSuggestion,
};
pub use fusion::{fuse, FusedBundle};
pub use rules::DecisionRules;
