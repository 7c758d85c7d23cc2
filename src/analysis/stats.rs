//! Structural statistics and the description-length prior of a grammar

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::warn;

use crate::error::StatsError;
use crate::grammar::{Grammar, Production};

/// Description-length prior, in bits
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DescriptionLength {
    pub top: f64,
    pub lexical: f64,
    pub nonlexical: f64,
    pub separator: f64,
}

impl DescriptionLength {
    /// The log2 prior: sum of all components
    pub fn total(&self) -> f64 {
        self.top + self.lexical + self.nonlexical + self.separator
    }
}

/// Structural counts of a grammar plus its description-length prior
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarStats {
    pub productions: usize,
    pub top_productions: usize,
    pub lexical_productions: usize,
    pub nonlexical_productions: usize,
    pub terminals: usize,
    pub nonterminals: usize,
    pub preterminals: usize,
    /// Unary rules among non-lexical and start productions
    pub unary: usize,
    /// Binary rules among all productions
    pub binary: usize,
    pub recursive: usize,
    pub description_length: Result<DescriptionLength, StatsError>,
}

impl GrammarStats {
    /// The log2 prior, if the grammar is not degenerate
    pub fn log2_prior(&self) -> Option<f64> {
        self.description_length.as_ref().ok().map(DescriptionLength::total)
    }
}

fn encoded_length(productions: &[&Production]) -> f64 {
    productions
        .iter()
        .map(|production| (production.len() + 1) as f64)
        .sum()
}

/// Compute the description-length prior from symbol counts and the two
/// production groups it charges for.
///
/// With `N` nonterminals and `T` terminals:
/// - top: `log2(N+1) * sum(|rhs|+1)` over start productions
/// - lexical: `(log2(N+1) + log2(T)) * T`
/// - non-lexical: `log2(N+1) * sum(|rhs|+1)` over non-lexical productions
/// - separator: `log2(N+1) * 2`
pub fn description_length(
    nonterminals: usize,
    terminals: usize,
    top: &[&Production],
    nonlexical: &[&Production],
) -> Result<DescriptionLength, StatsError> {
    if nonterminals == 0 || terminals == 0 {
        return Err(StatsError::DegenerateGrammar {
            terminals,
            nonterminals,
        });
    }

    let symbol_bits = ((nonterminals + 1) as f64).log2();
    let terminal_count = terminals as f64;

    Ok(DescriptionLength {
        top: symbol_bits * encoded_length(top),
        lexical: (symbol_bits + terminal_count.log2()) * terminal_count,
        nonlexical: symbol_bits * encoded_length(nonlexical),
        separator: symbol_bits * 2.0,
    })
}

/// Analyse a grammar. Pure; a degenerate grammar is reported in
/// [`GrammarStats::description_length`] and logged, not raised.
pub fn analyze(grammar: &Grammar) -> GrammarStats {
    let top: Vec<&Production> = grammar.top_productions().collect();
    let lexical: Vec<&Production> = grammar.lexical_productions().collect();
    let nonlexical: Vec<&Production> = grammar.nonlexical_productions().collect();

    let preterminals: BTreeSet<&str> = lexical.iter().map(|production| production.lhs()).collect();
    let unary = nonlexical
        .iter()
        .chain(top.iter())
        .filter(|production| production.is_unary())
        .count();
    let binary = grammar
        .productions()
        .iter()
        .filter(|production| production.is_binary())
        .count();
    let recursive = grammar
        .productions()
        .iter()
        .filter(|production| production.is_recursive())
        .count();

    let nonterminals = grammar.nonterminals().len();
    let terminals = grammar.terminals().len();
    let description_length = description_length(nonterminals, terminals, &top, &nonlexical);
    if let Err(error) = &description_length {
        warn!(%error, "skipping description-length prior");
    }

    GrammarStats {
        productions: grammar.productions().len(),
        top_productions: top.len(),
        lexical_productions: lexical.len(),
        nonlexical_productions: nonlexical.len(),
        terminals,
        nonterminals,
        preterminals: preterminals.len(),
        unary,
        binary,
        recursive,
        description_length,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::load;

    const GRAMMAR: &str = "\
TOP -> NP VP [0.7] | VP [0.3]
NP -> Det N [0.6] | NP NP [0.4]
VP -> 'runs' [1.0]
Det -> 'the' [1.0]
N -> 'dog' [0.5] | 'cat' [0.5]";

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_counts() {
        let stats = analyze(&load(GRAMMAR).unwrap());
        assert_eq!(stats.productions, 8);
        assert_eq!(stats.top_productions, 2);
        assert_eq!(stats.lexical_productions, 4);
        assert_eq!(stats.nonlexical_productions, 2);
        assert_eq!(stats.terminals, 4);
        // NP, VP, Det, N
        assert_eq!(stats.nonterminals, 4);
        assert_eq!(stats.preterminals, 3);
        // TOP -> VP
        assert_eq!(stats.unary, 1);
        assert_eq!(stats.binary, 3);
        assert_eq!(stats.recursive, 1);
    }

    #[test]
    fn test_description_length_formula() {
        let stats = analyze(&load(GRAMMAR).unwrap());
        let dl = stats.description_length.clone().unwrap();
        let bits = 5f64.log2();

        // top: (2+1) + (1+1)
        assert!(close(dl.top, bits * 5.0));
        // lexical: (log2(5) + log2(4)) * 4
        assert!(close(dl.lexical, (bits + 2.0) * 4.0));
        // non-lexical: (2+1) + (2+1)
        assert!(close(dl.nonlexical, bits * 6.0));
        assert!(close(dl.separator, bits * 2.0));
        assert!(close(stats.log2_prior().unwrap(), bits * 13.0 + 8.0 + bits * 4.0));
    }

    #[test]
    fn test_grammar_without_nonterminals_is_degenerate() {
        let stats = analyze(&load("TOP -> 'a' [1.0]").unwrap());
        assert_eq!(stats.nonterminals, 0);
        assert_eq!(
            stats.description_length,
            Err(StatsError::DegenerateGrammar {
                terminals: 1,
                nonterminals: 0
            })
        );
        assert_eq!(stats.log2_prior(), None);
    }

    #[test]
    fn test_grammar_without_terminals_is_degenerate() {
        let stats = analyze(&load("TOP -> A B [1.0]\nA -> B [1.0]").unwrap());
        assert_eq!(stats.terminals, 0);
        assert!(stats.description_length.is_err());
    }
}
