//! The immutable grammar value and its derived symbol sets

use super::symbol::{Production, Symbol};
use crate::error::GrammarError;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Reserved name of the start symbol. Every loaded grammar starts here,
/// whatever its first rule says.
pub const START_SYMBOL: &str = "TOP";

/// A left-hand side whose probabilities do not sum to one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizationIssue {
    pub lhs: String,
    pub sum: f64,
}

/// A probabilistic context-free grammar.
///
/// The symbol sets are computed once on construction:
/// - terminals: terminal symbols on the right-hand side of lexical productions
/// - preterminals: left-hand sides of lexical productions
/// - nonterminals: nonterminal symbols on the right-hand side of non-lexical or
///   start productions
#[derive(Debug, Clone)]
pub struct Grammar {
    productions: Vec<Production>,
    start: String,
    terminals: BTreeSet<String>,
    preterminals: BTreeSet<String>,
    nonterminals: BTreeSet<String>,
}

impl Grammar {
    /// Build a grammar rooted at [`START_SYMBOL`].
    pub fn new(productions: Vec<Production>) -> Result<Self, GrammarError> {
        if productions.is_empty() {
            return Err(GrammarError::EmptyGrammar);
        }
        if let Some(production) = productions.iter().find(|production| production.is_empty()) {
            return Err(GrammarError::EmptyRhs {
                lhs: production.lhs().to_owned(),
            });
        }
        if let Some(production) = productions
            .iter()
            .find(|production| !(0.0..=1.0).contains(&production.probability()))
        {
            return Err(GrammarError::InvalidProbability {
                lhs: production.lhs().to_owned(),
                probability: production.probability(),
            });
        }

        let mut terminals = BTreeSet::new();
        let mut preterminals = BTreeSet::new();
        let mut nonterminals = BTreeSet::new();

        for production in &productions {
            if production.is_lexical() {
                preterminals.insert(production.lhs().to_owned());
                terminals.extend(production.rhs().iter().filter_map(|symbol| match symbol {
                    Symbol::Terminal(value) => Some(value.clone()),
                    Symbol::NonTerminal(_) => None,
                }));
            }
            if !production.is_lexical() || production.lhs() == START_SYMBOL {
                nonterminals.extend(production.rhs().iter().filter_map(|symbol| match symbol {
                    Symbol::NonTerminal(name) => Some(name.clone()),
                    Symbol::Terminal(_) => None,
                }));
            }
        }

        Ok(Self {
            productions,
            start: START_SYMBOL.to_owned(),
            terminals,
            preterminals,
            nonterminals,
        })
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    /// Terminal vocabulary, sorted
    pub fn terminals(&self) -> &BTreeSet<String> {
        &self.terminals
    }

    pub fn preterminals(&self) -> &BTreeSet<String> {
        &self.preterminals
    }

    pub fn nonterminals(&self) -> &BTreeSet<String> {
        &self.nonterminals
    }

    pub fn is_terminal(&self, token: &str) -> bool {
        self.terminals.contains(token)
    }

    /// Productions rewriting the start symbol (lexical ones included)
    pub fn top_productions(&self) -> impl Iterator<Item = &Production> {
        self.productions
            .iter()
            .filter(move |production| production.lhs() == self.start)
    }

    pub fn lexical_productions(&self) -> impl Iterator<Item = &Production> {
        self.productions.iter().filter(|production| production.is_lexical())
    }

    /// Everything that is neither a start production nor lexical
    pub fn nonlexical_productions(&self) -> impl Iterator<Item = &Production> {
        self.productions
            .iter()
            .filter(move |production| production.lhs() != self.start && !production.is_lexical())
    }

    pub fn productions_for<'a>(&'a self, lhs: &'a str) -> impl Iterator<Item = &'a Production> {
        self.productions
            .iter()
            .filter(move |production| production.lhs() == lhs)
    }

    /// Left-hand sides whose production probabilities are more than `tolerance`
    /// away from summing to one. Probabilities are reported, never rescaled.
    pub fn normalization_issues(&self, tolerance: f64) -> Vec<NormalizationIssue> {
        let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
        for production in &self.productions {
            *sums.entry(production.lhs()).or_default() += production.probability();
        }

        sums.into_iter()
            .filter(|(_, sum)| (sum - 1.0).abs() > tolerance)
            .map(|(lhs, sum)| NormalizationIssue {
                lhs: lhs.to_owned(),
                sum,
            })
            .collect()
    }
}

/// Renders back into the description format, one line per left-hand side in
/// order of first appearance.
impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut order: Vec<&str> = Vec::new();
        for production in &self.productions {
            if !order.contains(&production.lhs()) {
                order.push(production.lhs());
            }
        }

        for (index, lhs) in order.into_iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{} ->", lhs)?;
            for (alternative, production) in self.productions_for(lhs).enumerate() {
                if alternative > 0 {
                    write!(f, " |")?;
                }
                for symbol in production.rhs() {
                    write!(f, " {}", symbol)?;
                }
                write!(f, " [{}]", production.probability())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nt(name: &str) -> Symbol {
        Symbol::nonterminal(name)
    }

    fn t(value: &str) -> Symbol {
        Symbol::terminal(value)
    }

    fn sample() -> Grammar {
        Grammar::new(vec![
            Production::new("TOP", vec![nt("NP"), nt("VP")], 1.0),
            Production::new("NP", vec![nt("Det"), nt("N")], 1.0),
            Production::new("VP", vec![t("runs")], 1.0),
            Production::new("Det", vec![t("the")], 1.0),
            Production::new("N", vec![t("dog")], 0.5),
            Production::new("N", vec![t("cat")], 0.5),
        ])
        .expect("non-empty grammar")
    }

    #[test]
    fn test_symbol_sets() {
        let grammar = sample();
        let terminals: Vec<_> = grammar.terminals().iter().map(String::as_str).collect();
        assert_eq!(terminals, vec!["cat", "dog", "runs", "the"]);

        let preterminals: Vec<_> = grammar.preterminals().iter().map(String::as_str).collect();
        assert_eq!(preterminals, vec!["Det", "N", "VP"]);

        let nonterminals: Vec<_> = grammar.nonterminals().iter().map(String::as_str).collect();
        assert_eq!(nonterminals, vec!["Det", "N", "NP", "VP"]);
    }

    #[test]
    fn test_production_partitions() {
        let grammar = sample();
        assert_eq!(grammar.top_productions().count(), 1);
        assert_eq!(grammar.lexical_productions().count(), 4);
        assert_eq!(grammar.nonlexical_productions().count(), 1);
    }

    #[test]
    fn test_empty_grammar_is_rejected() {
        assert_eq!(Grammar::new(vec![]).unwrap_err(), GrammarError::EmptyGrammar);
    }

    #[test]
    fn test_out_of_range_probability_is_rejected() {
        let error = Grammar::new(vec![Production::new("TOP", vec![t("a")], 1.5)]).unwrap_err();
        assert!(matches!(error, GrammarError::InvalidProbability { ref lhs, .. } if lhs == "TOP"));
    }

    #[test]
    fn test_empty_right_hand_side_is_rejected() {
        let error = Grammar::new(vec![
            Production::new("TOP", vec![nt("A")], 1.0),
            Production::new("A", vec![], 1.0),
        ])
        .unwrap_err();
        assert_eq!(error, GrammarError::EmptyRhs { lhs: "A".into() });
    }

    #[test]
    fn test_normalization_issues_are_reported_not_fixed() {
        let grammar = Grammar::new(vec![
            Production::new("TOP", vec![nt("A")], 1.0),
            Production::new("A", vec![t("x")], 0.3),
            Production::new("A", vec![t("y")], 0.3),
        ])
        .unwrap();

        let issues = grammar.normalization_issues(1e-6);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].lhs, "A");
        assert!((issues[0].sum - 0.6).abs() < 1e-12);
        assert_eq!(grammar.productions()[1].probability(), 0.3);
    }

    #[test]
    fn test_display_groups_alternatives() {
        let grammar = sample();
        let rendered = grammar.to_string();
        assert_eq!(rendered.lines().count(), 5);
        assert!(rendered.contains("N -> 'dog' [0.5] | 'cat' [0.5]"));
        assert!(rendered.starts_with("TOP -> NP VP [1]"));
    }
}
