//! Parsing engine: maximum-probability parses of token sequences

pub mod chart;
pub mod tree;

pub use chart::{best_parse, Parse, ParserOptions, Unparsable, ViterbiParser};
pub use tree::ParseTree;
