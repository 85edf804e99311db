//! External collaborators of the decision engine
//!
//! Local content tables, the web search client and the web consent guard.
//! The engine only sees the capability traits; concrete implementations are
//! chosen when the companion is assembled.

pub mod content;
pub mod web_guard;
pub mod web_search;

pub use content::{
    ContentProvider, ContentRegistry, DateEvent, Definition, Figure, FixedContentProvider, Formula,
    StaticContent, TableContentProvider,
};
pub use web_guard::{ConsentGuard, WebGuard};
pub use web_search::{PerplexityClient, WebEnrichment, WebSearchProvider};
