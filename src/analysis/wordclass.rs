//! Word-class groups and lexicon statistics
//!
//! A word-class group is a production of length > 1 whose right-hand side
//! consists only of preterminals and terminals, e.g. `NP -> Det N`. How often
//! such groups are shared between left-hand sides says something about how
//! compositional an induced grammar is.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::grammar::{Grammar, Production, Symbol};

/// Right-hand side of a group production. Symbols keep their kind, so a
/// terminal `'N'` and a preterminal `N` are different groups.
pub type GroupRhs = Vec<Symbol>;

/// Word-class group mappings and their summary statistics
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GroupStats {
    /// left-hand side -> distinct right-hand sides it produces
    pub by_lhs: BTreeMap<String, BTreeSet<GroupRhs>>,
    /// right-hand side -> distinct left-hand sides producing it
    pub by_rhs: BTreeMap<GroupRhs, BTreeSet<String>>,
}

impl GroupStats {
    /// Number of distinct group-producing left-hand sides ("nominals")
    pub fn lhs_count(&self) -> usize {
        self.by_lhs.len()
    }

    /// Number of distinct group right-hand sides
    pub fn rhs_count(&self) -> usize {
        self.by_rhs.len()
    }

    /// Mean number of right-hand sides per left-hand side; `None` without groups.
    pub fn mean_rhs_per_lhs(&self) -> Option<f64> {
        mean_len(self.by_lhs.values().map(BTreeSet::len))
    }

    /// Mean number of left-hand sides per right-hand side; `None` without groups.
    pub fn mean_lhs_per_rhs(&self) -> Option<f64> {
        mean_len(self.by_rhs.values().map(BTreeSet::len))
    }
}

fn mean_len(lengths: impl Iterator<Item = usize>) -> Option<f64> {
    let (total, count) = lengths.fold((0usize, 0usize), |(total, count), len| (total + len, count + 1));
    (count > 0).then(|| total as f64 / count as f64)
}

/// True if `production` is a word-class group under `grammar`.
pub fn is_group_production(grammar: &Grammar, production: &Production) -> bool {
    production.len() > 1
        && production.rhs().iter().all(|symbol| match symbol {
            Symbol::NonTerminal(name) => grammar.preterminals().contains(name),
            Symbol::Terminal(value) => grammar.is_terminal(value),
        })
}

/// Collect the word-class groups of a grammar.
pub fn group(grammar: &Grammar) -> GroupStats {
    let mut stats = GroupStats::default();

    for production in grammar
        .productions()
        .iter()
        .filter(|production| is_group_production(grammar, production))
    {
        let rhs: GroupRhs = production.rhs().to_vec();
        stats
            .by_lhs
            .entry(production.lhs().to_owned())
            .or_default()
            .insert(rhs.clone());
        stats
            .by_rhs
            .entry(rhs)
            .or_default()
            .insert(production.lhs().to_owned());
    }

    stats
}

/// How terminals spread over preterminals
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LexiconStats {
    /// preterminal -> terminals it emits
    pub by_preterminal: BTreeMap<String, BTreeSet<String>>,
    /// terminal -> preterminals emitting it
    pub by_terminal: BTreeMap<String, BTreeSet<String>>,
}

impl LexiconStats {
    pub fn mean_terminals_per_preterminal(&self) -> Option<f64> {
        mean_len(self.by_preterminal.values().map(BTreeSet::len))
    }

    pub fn mean_preterminals_per_terminal(&self) -> Option<f64> {
        mean_len(self.by_terminal.values().map(BTreeSet::len))
    }
}

/// Map preterminals to the terminals they emit and back.
pub fn lexicon(grammar: &Grammar) -> LexiconStats {
    let mut stats = LexiconStats::default();

    for production in grammar.lexical_productions() {
        for value in production.rhs().iter().filter_map(|symbol| match symbol {
            Symbol::Terminal(value) => Some(value),
            Symbol::NonTerminal(_) => None,
        }) {
            stats
                .by_preterminal
                .entry(production.lhs().to_owned())
                .or_default()
                .insert(value.clone());
            stats
                .by_terminal
                .entry(value.clone())
                .or_default()
                .insert(production.lhs().to_owned());
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::load;

    #[test]
    fn test_single_group() {
        let grammar = load("NP -> Det N [1.0]\nDet -> 'the' [1.0]\nN -> 'dog' [1.0]").unwrap();
        let stats = group(&grammar);

        assert_eq!(stats.lhs_count(), 1);
        assert_eq!(stats.rhs_count(), 1);
        assert_eq!(
            stats.by_lhs["NP"],
            BTreeSet::from([vec![Symbol::nonterminal("Det"), Symbol::nonterminal("N")]])
        );
        assert_eq!(stats.mean_rhs_per_lhs(), Some(1.0));
        assert_eq!(stats.mean_lhs_per_rhs(), Some(1.0));
    }

    #[test]
    fn test_deep_nonterminals_and_unary_rules_are_not_groups() {
        let grammar = load(
            "TOP -> NP VP [0.5] | A B [0.5]\nNP -> A [1.0]\nVP -> 'v' [1.0]\nA -> 'a' [1.0]\nB -> 'b' [1.0]",
        )
        .unwrap();
        let stats = group(&grammar);

        // TOP -> NP VP mentions NP, which is not a preterminal
        assert_eq!(stats.lhs_count(), 1);
        assert!(stats
            .by_rhs
            .contains_key(&vec![Symbol::nonterminal("A"), Symbol::nonterminal("B")]));
        assert!(!is_group_production(&grammar, &grammar.productions()[2]));
    }

    #[test]
    fn test_shared_groups_average() {
        let grammar = load(
            "TOP -> X [0.5] | Y [0.5]\nX -> A B [0.5] | B A [0.5]\nY -> A B [1.0]\nA -> 'a' [1.0]\nB -> 'b' [1.0]",
        )
        .unwrap();
        let stats = group(&grammar);

        assert_eq!(stats.lhs_count(), 2);
        assert_eq!(stats.rhs_count(), 2);
        // X has two groups, Y one
        assert_eq!(stats.mean_rhs_per_lhs(), Some(1.5));
        // (A B) from X and Y, (B A) from X
        assert_eq!(stats.mean_lhs_per_rhs(), Some(1.5));
    }

    #[test]
    fn test_terminal_and_preterminal_of_same_name_stay_apart() {
        let grammar = load(
            "TOP -> X [0.5] | Y [0.5]\nX -> Det N [1.0]\nY -> Det 'N' [1.0]\nDet -> 'the' [1.0]\nN -> 'N' [1.0]",
        )
        .unwrap();
        let stats = group(&grammar);

        assert_eq!(stats.lhs_count(), 2);
        assert_eq!(stats.rhs_count(), 2);
        assert!(stats
            .by_rhs
            .contains_key(&vec![Symbol::nonterminal("Det"), Symbol::terminal("N")]));
        assert_eq!(stats.mean_lhs_per_rhs(), Some(1.0));
    }

    #[test]
    fn test_no_groups_yields_no_averages() {
        let stats = group(&load("TOP -> 'a' [1.0]").unwrap());
        assert_eq!(stats.lhs_count(), 0);
        assert_eq!(stats.mean_rhs_per_lhs(), None);
    }

    #[test]
    fn test_lexicon_averages() {
        let grammar =
            load("TOP -> A B [1.0]\nA -> '1' [0.5] | '2' [0.5]\nB -> '2' [0.2] | '3' [0.8]").unwrap();
        let stats = lexicon(&grammar);

        assert_eq!(stats.mean_terminals_per_preterminal(), Some(2.0));
        // '1' -> {A}, '2' -> {A, B}, '3' -> {B}
        assert!((stats.mean_preterminals_per_terminal().unwrap() - 4.0 / 3.0).abs() < 1e-12);
    }
}
