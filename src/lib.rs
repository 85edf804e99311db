//! Focuspath - adaptive study companion core
//!
//! Learns from a student's feedback and decides where the content of each
//! answer should come from:
//! - **Knowledge memory**: per subject/topic record of what answers keep missing
//! - **Feedback**: form ratings (detail level, duration, difficulty,
//!   satisfaction) and free-text critiques parsed into missing elements
//! - **Personalization**: preferences, duration history and personalized estimates
//! - **Decision**: local tables, memory or web, then fusion of the bundles
//!
//! # Example
//!
//! ```ignore
//! use focuspath_core::{Companion, DecisionContext, FocuspathConfig};
//!
//! #[tokio::main]
//! async fn main() -> focuspath_core::Result<()> {
//!     let mut companion = Companion::open(FocuspathConfig::load(None)?)?;
//!
//!     companion.critique("Il manque les dates importantes", "histoire", Some("ww1"));
//!
//!     let ctx = DecisionContext::new("Réviser la Première Guerre mondiale", "histoire")
//!         .with_topic("ww1");
//!     let result = companion.plan(&ctx).await;
//!     println!("{} -> {:?}", result.chosen_source, result.fused_bundle.elements_to_inject);
//!     Ok(())
//! }
//! ```

pub mod companion;
pub mod config;
pub mod decision;
pub mod error;
pub mod feedback;
pub mod memory;
pub mod personalization;
pub mod services;
pub mod stats;
pub mod storage;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use companion::{Companion, CompletedTask, CompletionReport};
pub use config::FocuspathConfig;
pub use decision::{DecisionContext, DecisionEngine, DecisionResult, DecisionRules, FusedBundle};
pub use error::{FocuspathError, Result};
pub use feedback::{FeedbackEngine, ParsedFeedback, PedagogicalFeedbackParser};
pub use memory::KnowledgeMemory;
pub use personalization::UserPersonalization;
pub use stats::StatsStore;
pub use types::{
    DataSource, DetailVerdict, Difficulty, DurationVerdict, ElementKind, Priority, Sentiment,
    TaskContext,
};
