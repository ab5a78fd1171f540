//! Terminal front end for the reconciliation engine
//!
//! - `differ` - Plan display and script rendering
//! - `executor` - Progress, confirmation and failure prompts around an apply cycle

pub mod differ;
pub mod executor;

pub use executor::{ExecuteOptions, execute};
