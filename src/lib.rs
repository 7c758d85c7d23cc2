//! # grameval
//!
//! Evaluation of probabilistic context-free grammars induced from message
//! corpora.
//!
//! A grammar is loaded from its textual description ([`grammar::load`]),
//! summarized structurally ([`analysis::analyze`], [`analysis::group`]), and
//! then exercised against corpora with a Viterbi parser
//! ([`parsing::ViterbiParser`]) to measure coverage, likelihood, tree depth and
//! overgeneration ([`evaluation`]). The results of one run are collected into a
//! flat [`record::AnalysisRecord`] for export.
//!
//! ```text
//! text ──load──▶ Grammar ──analyze──▶ GrammarStats
//!                   │
//!                   └──ViterbiParser──▶ evaluate(corpus) ──▶ EvaluationResult
//! ```
//!
//! Probabilities are carried as natural logarithms inside the parser and
//! reported in base 2.

pub mod analysis;
pub mod corpus;
pub mod error;
pub mod evaluation;
pub mod grammar;
pub mod parsing;
pub mod record;

pub use corpus::{parse_corpus, read_corpus, Message};
pub use error::{CorpusError, GrammarError, RecordError, StatsError};
pub use grammar::{load, Grammar, Production, Symbol};
pub use parsing::{Parse, ParseTree, Unparsable, ViterbiParser};
