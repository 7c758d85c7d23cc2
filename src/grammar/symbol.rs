//! Grammar symbols and productions
//!
//! Terminals and nonterminals are distinguished when the grammar is loaded and
//! carried as a tagged value from then on. Nothing downstream inspects a raw
//! string to decide which kind of symbol it is looking at.

use serde::Serialize;
use std::fmt;

/// A symbol on either side of a production
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Symbol {
    /// A literal token, written quoted in the grammar description
    Terminal(String),
    /// A grammar category, written as a bare identifier
    NonTerminal(String),
}

impl Symbol {
    pub fn terminal(value: impl Into<String>) -> Self {
        Symbol::Terminal(value.into())
    }

    pub fn nonterminal(name: impl Into<String>) -> Self {
        Symbol::NonTerminal(name.into())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    pub fn is_nonterminal(&self) -> bool {
        matches!(self, Symbol::NonTerminal(_))
    }

    /// The bare token or category name, without quoting
    pub fn name(&self) -> &str {
        match self {
            Symbol::Terminal(value) | Symbol::NonTerminal(value) => value,
        }
    }
}

/// Terminals render quoted, nonterminals bare, matching the description format.
impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Terminal(value) if value.contains('\'') => write!(f, "\"{}\"", value),
            Symbol::Terminal(value) => write!(f, "'{}'", value),
            Symbol::NonTerminal(name) => write!(f, "{}", name),
        }
    }
}

/// A weighted rewrite rule `lhs -> rhs [probability]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Production {
    lhs: String,
    rhs: Vec<Symbol>,
    probability: f64,
}

impl Production {
    /// Builds a production. An empty right-hand side is accepted here and
    /// rejected by [`Grammar::new`](crate::grammar::Grammar::new).
    pub fn new(lhs: impl Into<String>, rhs: Vec<Symbol>, probability: f64) -> Self {
        Self {
            lhs: lhs.into(),
            rhs,
            probability,
        }
    }

    /// Name of the left-hand nonterminal
    pub fn lhs(&self) -> &str {
        &self.lhs
    }

    pub fn rhs(&self) -> &[Symbol] {
        &self.rhs
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    /// A production is lexical when its right-hand side starts with a terminal.
    pub fn is_lexical(&self) -> bool {
        self.rhs.first().is_some_and(Symbol::is_terminal)
    }

    pub fn is_unary(&self) -> bool {
        self.rhs.len() == 1
    }

    pub fn is_binary(&self) -> bool {
        self.rhs.len() == 2
    }

    /// True when the left-hand nonterminal reappears on its own right-hand side.
    pub fn is_recursive(&self) -> bool {
        self.rhs
            .iter()
            .any(|symbol| matches!(symbol, Symbol::NonTerminal(name) if *name == self.lhs))
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.lhs)?;
        for symbol in &self.rhs {
            write!(f, " {}", symbol)?;
        }
        write!(f, " [{}]", self.probability)
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

    #[test]
    fn test_lexical_is_decided_by_first_symbol() {
        assert!(Production::new("A", vec![t("x")], 1.0).is_lexical());
        assert!(Production::new("A", vec![t("x"), nt("B")], 1.0).is_lexical());
        assert!(!Production::new("A", vec![nt("B"), t("x")], 1.0).is_lexical());
    }

    #[test]
    fn test_recursion_ignores_terminals_with_same_name() {
        assert!(Production::new("S", vec![nt("S"), nt("A")], 0.5).is_recursive());
        assert!(!Production::new("S", vec![t("S")], 0.5).is_recursive());
    }

    #[test]
    fn test_display_uses_description_format() {
        let production = Production::new("NP", vec![nt("Det"), t("dog")], 0.25);
        assert_eq!(production.to_string(), "NP -> Det 'dog' [0.25]");
        assert_eq!(t("it's").to_string(), "\"it's\"");
    }
}
