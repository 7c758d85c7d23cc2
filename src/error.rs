//! Error types for grammar loading, statistics and corpus reading

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a grammar description. Loading is all or
/// nothing: any of these aborts the load and no partial grammar is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GrammarError {
    /// A line does not have the shape `LHS -> rhs [p] | rhs [p] ...`
    #[error("line {line}, column {column}: {message}")]
    Format {
        line: usize,
        column: usize,
        message: String,
    },

    /// A bracketed probability could not be read or lies outside [0, 1]
    #[error("line {line}: invalid probability annotation [{text}]")]
    Probability { line: usize, text: String },

    /// A production built in code carries a probability outside [0, 1]
    #[error("production of {lhs} has probability {probability} outside [0, 1]")]
    InvalidProbability { lhs: String, probability: f64 },

    /// A production built in code has nothing on its right-hand side
    #[error("production of {lhs} has an empty right-hand side")]
    EmptyRhs { lhs: String },

    /// The description contains no productions at all
    #[error("grammar description contains no productions")]
    EmptyGrammar,

    /// Probabilities of one left-hand side do not sum to 1 (strict loads only)
    #[error("productions of {lhs} sum to {sum} (expected 1.0)")]
    Unnormalized { lhs: String, sum: f64 },
}

/// Errors raised by grammar statistics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    /// The description-length prior takes `log2` of the symbol counts, which is
    /// undefined when either count is zero.
    #[error(
        "description length undefined for grammar with {terminals} terminals and {nonterminals} nonterminals"
    )]
    DegenerateGrammar {
        terminals: usize,
        nonterminals: usize,
    },
}

/// Errors raised while reading a message corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to read corpus {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while exporting analysis records.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to write record to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write csv record: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to serialize record: {0}")]
    Json(#[from] serde_json::Error),
}
