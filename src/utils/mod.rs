//! Small shared helpers

pub mod string;
pub mod time;

pub use string::preview;
