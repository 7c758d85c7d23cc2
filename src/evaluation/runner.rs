//! Corpus evaluation: coverage, likelihood and tree depth

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, instrument};

use crate::corpus::Message;
use crate::grammar::Grammar;
use crate::parsing::{Unparsable, ViterbiParser};

/// Placeholder written for messages without a parse
pub const NO_PARSE: &str = "NO_PARSE";

/// A message that could not be parsed and why
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub index: usize,
    pub message: Message,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: Unparsable,
}

fn serialize_reason<S: serde::Serializer>(reason: &Unparsable, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(reason)
}

/// Spread of tree depths over parsed messages
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepthSummary {
    pub mean: f64,
    pub min: usize,
    pub max: usize,
    /// Number of different depths seen
    pub distinct: usize,
}

/// Aggregated outcome of parsing a corpus.
///
/// The per-message vectors are aligned with the corpus; entries for messages
/// without a parse are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub total: usize,
    pub parsed_count: usize,
    pub log2_likelihoods: Vec<Option<f64>>,
    pub tree_depths: Vec<Option<usize>>,
    pub parses: Vec<Option<String>>,
    pub failures: Vec<Failure>,
    /// Percentage of messages parsed; `None` for an empty corpus
    pub coverage: Option<f64>,
    /// Mean log2 likelihood over parsed messages; NaN if none parsed
    pub average_log2likelihood: f64,
}

impl EvaluationResult {
    pub fn unparsed_count(&self) -> usize {
        self.total - self.parsed_count
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// `None` when nothing parsed
    pub fn depth_summary(&self) -> Option<DepthSummary> {
        let depths: Vec<usize> = self.tree_depths.iter().flatten().copied().collect();
        let min = *depths.iter().min()?;
        let max = *depths.iter().max()?;
        let distinct = depths.iter().collect::<BTreeSet<_>>().len();
        let mean = depths.iter().sum::<usize>() as f64 / depths.len() as f64;
        Some(DepthSummary {
            mean,
            min,
            max,
            distinct,
        })
    }

    /// Bracketed parse per message, [`NO_PARSE`] where there is none
    pub fn parse_lines(&self) -> impl Iterator<Item = &str> {
        self.parses
            .iter()
            .map(|parse| parse.as_deref().unwrap_or(NO_PARSE))
    }
}

/// Parse every message of `corpus` with a fresh parser for `grammar`.
pub fn evaluate(grammar: &Grammar, corpus: &[Message]) -> EvaluationResult {
    evaluate_with(&ViterbiParser::new(grammar), corpus)
}

/// Parse every message of `corpus`. Unparsable messages are recorded, never
/// fatal.
#[instrument(skip_all, fields(messages = corpus.len()))]
pub fn evaluate_with(parser: &ViterbiParser<'_>, corpus: &[Message]) -> EvaluationResult {
    let mut log2_likelihoods = Vec::with_capacity(corpus.len());
    let mut tree_depths = Vec::with_capacity(corpus.len());
    let mut parses = Vec::with_capacity(corpus.len());
    let mut failures = Vec::new();

    for (index, message) in corpus.iter().enumerate() {
        match parser.parse(message) {
            Ok(parse) => {
                log2_likelihoods.push(Some(parse.log2_probability));
                tree_depths.push(Some(parse.depth()));
                parses.push(Some(parse.to_bracketed()));
            }
            Err(reason) => {
                debug!(index, %reason, "message did not parse");
                log2_likelihoods.push(None);
                tree_depths.push(None);
                parses.push(None);
                failures.push(Failure {
                    index,
                    message: message.clone(),
                    reason,
                });
            }
        }
    }

    let total = corpus.len();
    let parsed: Vec<f64> = log2_likelihoods.iter().flatten().copied().collect();
    let parsed_count = parsed.len();
    let coverage = (total > 0).then(|| parsed_count as f64 / total as f64 * 100.0);
    let average_log2likelihood = if parsed.is_empty() {
        f64::NAN
    } else {
        parsed.iter().sum::<f64>() / parsed_count as f64
    };

    match coverage {
        Some(coverage) => info!(total, parsed_count, coverage, "evaluated corpus"),
        None => info!("evaluated empty corpus; coverage undefined"),
    }

    EvaluationResult {
        total,
        parsed_count,
        log2_likelihoods,
        tree_depths,
        parses,
        failures,
        coverage,
        average_log2likelihood,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::parse_corpus;
    use crate::grammar::load;

    fn grammar() -> Grammar {
        load("TOP -> A B [1.0]\nA -> 'x' [1.0]\nB -> 'y' [1.0]").unwrap()
    }

    #[test]
    fn test_half_coverage() {
        let result = evaluate(&grammar(), &parse_corpus("x y\ny x"));

        assert_eq!(result.total, 2);
        assert_eq!(result.parsed_count, 1);
        assert_eq!(result.coverage, Some(50.0));
        assert_eq!(result.average_log2likelihood, 0.0);
        assert_eq!(result.log2_likelihoods, vec![Some(0.0), None]);
        assert_eq!(result.tree_depths, vec![Some(2), None]);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].index, 1);
        assert_eq!(result.failures[0].reason, Unparsable::NoDerivation);
    }

    #[test]
    fn test_nothing_parsed_gives_nan_average() {
        let result = evaluate(&grammar(), &parse_corpus("y x\nx z"));
        assert_eq!(result.coverage, Some(0.0));
        assert!(result.average_log2likelihood.is_nan());
        assert_eq!(result.depth_summary(), None);
        assert!(matches!(result.failures[1].reason, Unparsable::UnknownToken { .. }));
    }

    #[test]
    fn test_empty_corpus_has_no_coverage() {
        let result = evaluate(&grammar(), &[]);
        assert!(result.is_empty());
        assert_eq!(result.coverage, None);
        assert!(result.average_log2likelihood.is_nan());
    }

    #[test]
    fn test_parse_lines_mark_failures() {
        let result = evaluate(&grammar(), &parse_corpus("x y\n\nx y"));
        let lines: Vec<&str> = result.parse_lines().collect();
        assert_eq!(lines, vec!["(TOP (A x) (B y))", NO_PARSE, "(TOP (A x) (B y))"]);
        assert_eq!(result.failures[0].reason, Unparsable::EmptyMessage);
    }

    #[test]
    fn test_depth_summary() {
        let grammar = load("TOP -> A B [0.5] | 'z' [0.5]\nA -> 'x' [1.0]\nB -> 'y' [1.0]").unwrap();
        let result = evaluate(&grammar, &parse_corpus("x y\nz\nz\nq"));
        let summary = result.depth_summary().unwrap();
        assert_eq!(summary.min, 1);
        assert_eq!(summary.max, 2);
        assert_eq!(summary.distinct, 2);
        assert!((summary.mean - 4.0 / 3.0).abs() < 1e-12);
    }
}
