//! Grammar description loader using chumsky
//!
//! Each non-blank line declares one left-hand side followed by `|`-separated
//! alternatives, every alternative ending in a bracketed probability:
//!
//! ```text
//! TOP -> NP VP [1.0]
//! NP -> Det N [0.6] | N [0.4]
//! N -> 'dog' [0.5] | 'cat' [5e-1]
//! ```
//!
//! Quoted symbols are terminals, bare identifiers are nonterminals. The parser
//! and the probability syntax are owned here; nothing global is patched to widen
//! what a probability may look like.
//!
//! The start symbol a description would imply (the first left-hand side) is only
//! logged. Loaded grammars always start at [`START_SYMBOL`].

use chumsky::error::SimpleReason;
use chumsky::{prelude::*, Stream};
use std::ops::Range;
use tracing::{debug, warn};

use super::model::{Grammar, START_SYMBOL};
use super::symbol::{Production, Symbol};
use super::tokens::{tokenize_line, Token};
use crate::error::GrammarError;

type ParserError = Simple<Token>;

/// Knobs for loading a grammar description
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Allowed distance from 1.0 for the probabilities of one left-hand side
    pub normalization_tolerance: f64,
    /// Fail the load on unnormalized left-hand sides instead of warning
    pub reject_unnormalized: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            normalization_tolerance: 1e-6,
            reject_unnormalized: false,
        }
    }
}

/// One alternative as written, probability still unparsed
#[derive(Debug, Clone, PartialEq)]
struct Alternative {
    rhs: Vec<Symbol>,
    probability: String,
}

#[derive(Debug, Clone, PartialEq)]
struct RuleLine {
    lhs: String,
    alternatives: Vec<Alternative>,
}

fn symbol() -> impl Parser<Token, Symbol, Error = ParserError> + Clone {
    select! {
        Token::Terminal(value) => Symbol::Terminal(value),
        Token::Ident(name) => Symbol::NonTerminal(name),
    }
}

fn alternative() -> impl Parser<Token, Alternative, Error = ParserError> + Clone {
    symbol()
        .repeated()
        .at_least(1)
        .then(select! { Token::Probability(text) => text })
        .map(|(rhs, probability)| Alternative { rhs, probability })
}

fn rule_line() -> impl Parser<Token, RuleLine, Error = ParserError> {
    select! { Token::Ident(name) => name }
        .then_ignore(just(Token::Arrow))
        .then(alternative().separated_by(just(Token::Pipe)).at_least(1))
        .then_ignore(end())
        .map(|(lhs, alternatives)| RuleLine { lhs, alternatives })
}

/// Read a probability annotation. Decimal and exponent forms are accepted
/// (`0.5`, `.5`, `1.`, `1e-5`, `2.5E+01`); the value must lie in [0, 1].
pub fn parse_probability(text: &str) -> Option<f64> {
    let starts_numeric = text
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '.');
    let well_formed = text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !starts_numeric || !well_formed {
        return None;
    }

    let value: f64 = text.parse().ok()?;
    (0.0..=1.0).contains(&value).then_some(value)
}

fn describe(error: &ParserError) -> String {
    if let SimpleReason::Custom(message) = error.reason() {
        return message.clone();
    }

    let found = error
        .found()
        .map(|token| format!("'{}'", token))
        .unwrap_or_else(|| "end of line".to_string());
    let mut expected: Vec<String> = error
        .expected()
        .map(|token| match token {
            Some(token) => format!("'{}'", token),
            None => "end of line".to_string(),
        })
        .collect();
    expected.sort();
    expected.dedup();

    if expected.is_empty() {
        format!("unexpected {}", found)
    } else {
        format!("unexpected {}, expected {}", found, expected.join(" or "))
    }
}

fn parse_line(line_number: usize, line: &str) -> Result<Option<RuleLine>, GrammarError> {
    let tokens = tokenize_line(line).map_err(|span: Range<usize>| GrammarError::Format {
        line: line_number,
        column: span.start + 1,
        message: format!("unrecognized input '{}'", &line[span]),
    })?;
    if tokens.is_empty() {
        return Ok(None);
    }

    let eoi = line.len()..line.len() + 1;
    rule_line()
        .parse(Stream::from_iter(eoi, tokens.into_iter()))
        .map(Some)
        .map_err(|errors| {
            let first = &errors[0];
            GrammarError::Format {
                line: line_number,
                column: first.span().start + 1,
                message: describe(first),
            }
        })
}

/// Load a grammar with default [`LoadOptions`].
pub fn load(description: &str) -> Result<Grammar, GrammarError> {
    load_with_options(description, &LoadOptions::default())
}

/// Load a grammar description. Any malformed line or probability fails the
/// whole load.
pub fn load_with_options(description: &str, options: &LoadOptions) -> Result<Grammar, GrammarError> {
    let mut productions = Vec::new();
    let mut inferred_start: Option<String> = None;

    for (index, line) in description.lines().enumerate() {
        let line_number = index + 1;
        let Some(rule) = parse_line(line_number, line)? else {
            continue;
        };

        inferred_start.get_or_insert_with(|| rule.lhs.clone());
        for alternative in rule.alternatives {
            let probability = parse_probability(&alternative.probability).ok_or_else(|| {
                GrammarError::Probability {
                    line: line_number,
                    text: alternative.probability.clone(),
                }
            })?;
            productions.push(Production::new(rule.lhs.clone(), alternative.rhs, probability));
        }
    }

    if let Some(inferred) = inferred_start.filter(|lhs| lhs != START_SYMBOL) {
        debug!(inferred = %inferred, start = START_SYMBOL, "overriding inferred start symbol");
    }

    let grammar = Grammar::new(productions)?;

    for issue in grammar.normalization_issues(options.normalization_tolerance) {
        if options.reject_unnormalized {
            return Err(GrammarError::Unnormalized {
                lhs: issue.lhs,
                sum: issue.sum,
            });
        }
        warn!(lhs = %issue.lhs, sum = issue.sum, "production probabilities do not sum to 1");
    }

    debug!(
        productions = grammar.productions().len(),
        terminals = grammar.terminals().len(),
        "loaded grammar"
    );
    Ok(grammar)
}
