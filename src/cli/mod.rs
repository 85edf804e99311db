//! CLI command handlers
//!
//! Each subcommand is implemented in its own module; they all go through
//! the companion opened by [`helpers::open_companion`].

pub mod complete;
pub mod critique;
pub mod helpers;
pub mod memory;
pub mod plan;
pub mod profile;
pub mod rate;
pub mod suggest;
