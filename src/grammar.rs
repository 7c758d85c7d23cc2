//! Grammar model
//!
//! Holds the immutable probabilistic grammar and the loader for its textual
//! description. Everything else in the crate consumes a [`Grammar`] read-only.

pub mod loader;
pub mod model;
pub mod symbol;
pub mod tokens;

pub use loader::{load, load_with_options, parse_probability, LoadOptions};
pub use model::{Grammar, NormalizationIssue, START_SYMBOL};
pub use symbol::{Production, Symbol};
