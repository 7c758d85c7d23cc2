//! Grammar analysis: structural statistics, the description-length prior and
//! word-class grouping. All functions are pure over a borrowed [`Grammar`].
//!
//! [`Grammar`]: crate::grammar::Grammar

pub mod stats;
pub mod wordclass;

pub use stats::{analyze, description_length, DescriptionLength, GrammarStats};
pub use wordclass::{group, is_group_production, lexicon, GroupRhs, GroupStats, LexiconStats};
