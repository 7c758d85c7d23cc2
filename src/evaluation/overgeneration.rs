//! Overgeneration testing
//!
//! Samples messages uniformly from the whole space `|vocabulary|^L`, not from
//! the grammar's own distribution, and measures how many of them the grammar
//! accepts anyway. A permissive grammar accepts many; a tight one few.
//!
//! The random source is always passed in, so a seeded generator gives
//! reproducible estimates.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::corpus::Message;
use crate::grammar::Grammar;
use crate::parsing::ViterbiParser;

/// Settings for an overgeneration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OvergenerationOptions {
    /// Number of messages to sample; 0 disables the test
    pub samples: usize,
    /// Length of every sampled message; the test needs one to run
    pub message_length: Option<usize>,
    /// Seed for the random source; fresh entropy when unset
    pub seed: Option<u64>,
}

impl OvergenerationOptions {
    /// Message length to sample at, if the test is enabled at all
    pub fn enabled_length(&self) -> Option<usize> {
        self.message_length.filter(|_| self.samples > 0)
    }
}

/// Outcome of an overgeneration run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Overgeneration {
    pub message_length: usize,
    pub samples: usize,
    pub matched: usize,
}

impl Overgeneration {
    /// Percentage of samples that parsed; `None` when nothing was sampled.
    pub fn coverage(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.matched as f64 / self.samples as f64 * 100.0)
    }
}

/// Draw `length` tokens uniformly, with replacement, from `vocabulary`.
/// Returns `None` if the vocabulary is empty.
pub fn sample_message<R, S>(vocabulary: &[S], length: usize, rng: &mut R) -> Option<Message>
where
    R: Rng + ?Sized,
    S: AsRef<str>,
{
    (0..length)
        .map(|_| vocabulary.choose(rng).map(|token| token.as_ref().to_owned()))
        .collect::<Option<Vec<String>>>()
        .map(Message::new)
}

/// Sample `samples` messages of fixed `length` from the parser's grammar
/// vocabulary and count how many parse. Any parse failure is a non-match.
#[instrument(skip(parser, rng))]
pub fn run<R: Rng + ?Sized>(
    parser: &ViterbiParser<'_>,
    length: usize,
    samples: usize,
    rng: &mut R,
) -> Overgeneration {
    // BTreeSet order keeps the draw reproducible for a given seed
    let vocabulary: Vec<&str> = parser.grammar().terminals().iter().map(String::as_str).collect();
    let mut outcome = Overgeneration {
        message_length: length,
        samples: 0,
        matched: 0,
    };
    if vocabulary.is_empty() {
        warn!("grammar has no terminals; nothing to sample");
        return outcome;
    }

    for _ in 0..samples {
        let Some(message) = sample_message(&vocabulary, length, rng) else {
            continue;
        };
        outcome.samples += 1;
        if parser.parse(&message).is_ok() {
            outcome.matched += 1;
        }
    }

    info!(
        samples = outcome.samples,
        matched = outcome.matched,
        "estimated overgeneration"
    );
    outcome
}

/// Percentage of `samples` random messages of `length` tokens that `grammar`
/// parses. `None` when `samples` is zero or the grammar has no vocabulary.
pub fn overgeneration_coverage<R: Rng + ?Sized>(
    grammar: &Grammar,
    length: usize,
    samples: usize,
    rng: &mut R,
) -> Option<f64> {
    run(&ViterbiParser::new(grammar), length, samples, rng).coverage()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::load;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_options_need_length_and_samples() {
        let mut options = OvergenerationOptions {
            samples: 10,
            message_length: None,
            seed: None,
        };
        assert_eq!(options.enabled_length(), None);
        options.message_length = Some(4);
        assert_eq!(options.enabled_length(), Some(4));
        options.samples = 0;
        assert_eq!(options.enabled_length(), None);
    }

    #[test]
    fn test_zero_samples_has_no_coverage() {
        let grammar = load("TOP -> 'a' [1.0]").unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(overgeneration_coverage(&grammar, 1, 0, &mut rng), None);
    }

    #[test]
    fn test_grammar_accepting_everything() {
        let grammar = load("TOP -> A A [1.0]\nA -> 'a' [0.5] | 'b' [0.5]").unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(overgeneration_coverage(&grammar, 2, 50, &mut rng), Some(100.0));
    }

    #[test]
    fn test_wrong_length_never_matches() {
        let grammar = load("TOP -> A A [1.0]\nA -> 'a' [0.5] | 'b' [0.5]").unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(overgeneration_coverage(&grammar, 3, 20, &mut rng), Some(0.0));
    }

    #[test]
    fn test_partial_acceptance_is_reproducible() {
        // accepts only "x y" out of {x, y}^2
        let grammar = load("TOP -> A B [1.0]\nA -> 'x' [1.0]\nB -> 'y' [1.0]").unwrap();
        let first = overgeneration_coverage(&grammar, 2, 400, &mut StdRng::seed_from_u64(42)).unwrap();
        let second = overgeneration_coverage(&grammar, 2, 400, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(first, second);
        assert!(first > 10.0 && first < 40.0, "coverage {} far from 25%", first);
    }

    #[test]
    fn test_sample_message_uses_vocabulary() {
        let mut rng = StdRng::seed_from_u64(3);
        let message = sample_message(&["p", "q"], 5, &mut rng).unwrap();
        assert_eq!(message.len(), 5);
        assert!(message.iter().all(|token| token == "p" || token == "q"));

        let empty: [&str; 0] = [];
        assert_eq!(sample_message(&empty, 3, &mut rng), None);
    }
}
