//! Evaluation runner
//!
//! Drives the parser over message corpora and over randomly sampled messages.
//! Per-message parses are independent, so results do not depend on the order
//! messages are visited in.

pub mod overgeneration;
pub mod runner;

pub use overgeneration::{
    overgeneration_coverage, sample_message, Overgeneration, OvergenerationOptions,
};
pub use runner::{evaluate, evaluate_with, DepthSummary, EvaluationResult, Failure, NO_PARSE};
