//! jbox kernel - the structured-JSON tools and the machinery they share.
//!
//! This crate contains:
//! - Argument classification (positional values and `-name value` parameters)
//! - JSONPath-style queries used by `grep`, `sort` and `join`
//! - The tool lifecycle runner and exit codes
//! - The tools themselves and the registry that names them

pub mod args;
pub mod commands;
pub mod query;

mod error;

pub use args::Invocation;
pub use commands::runner::{EXIT_FAILURE, EXIT_USAGE};
pub use commands::{CommandRegistry, JboxCommand, RunError};
pub use error::JboxError;
pub use query::PathQuery;
