//! Shared configuration loader for grammar evaluation runs.
//!
//! `defaults/grameval.default.toml` is embedded into the binary so that the
//! documented defaults and runtime behavior stay in sync. Callers layer user
//! files and command-line overrides on top via [`Loader`] before deserializing
//! into [`GramevalConfig`]. The analysis core never reads configuration itself;
//! it receives the option structs produced here.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};
use grameval::evaluation::OvergenerationOptions;
use grameval::grammar::LoadOptions;
use grameval::parsing::ParserOptions;
use serde::Deserialize;
use std::path::Path;

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../defaults/grameval.default.toml");

/// Top-level configuration of a run.
#[derive(Debug, Clone, Deserialize)]
pub struct GramevalConfig {
    pub grammar: GrammarConfig,
    pub parser: ParserConfig,
    pub overgeneration: OvergenerationConfig,
    pub output: OutputConfig,
}

/// Grammar loading knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct GrammarConfig {
    pub normalization_tolerance: f64,
    pub reject_unnormalized: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParserConfig {
    /// 0 means unbounded
    pub max_message_len: usize,
}

/// `samples` and `message_length` use 0 for "off"; `seed` is absent unless
/// set, since 0 is a seed like any other.
#[derive(Debug, Clone, Deserialize)]
pub struct OvergenerationConfig {
    pub samples: usize,
    pub message_length: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl GramevalConfig {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            normalization_tolerance: self.grammar.normalization_tolerance,
            reject_unnormalized: self.grammar.reject_unnormalized,
        }
    }

    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            max_message_len: nonzero(self.parser.max_message_len),
        }
    }

    pub fn overgeneration_options(&self) -> OvergenerationOptions {
        OvergenerationOptions {
            samples: self.overgeneration.samples,
            message_length: nonzero(self.overgeneration.message_length),
            seed: self.overgeneration.seed,
        }
    }
}

fn nonzero(value: usize) -> Option<usize> {
    (value != 0).then_some(value)
}

/// Stacks configuration sources, last one wins: embedded defaults, then any
/// files, then single-key overrides.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Only the embedded defaults so far.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Add a TOML file that must exist.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Add a TOML file if it is there; a missing file contributes nothing.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Pin one dotted key, e.g. `overgeneration.seed`, above every file.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Merge the sources and check them against [`GramevalConfig`].
    pub fn build(self) -> Result<GramevalConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// The embedded defaults with nothing layered on top.
pub fn load_defaults() -> Result<GramevalConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.load_options(), LoadOptions::default());
        assert_eq!(config.parser_options().max_message_len, None);
        assert_eq!(config.overgeneration_options(), OvergenerationOptions::default());
        assert_eq!(config.output.format, OutputFormat::Csv);
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("output.format", "json")
            .expect("override to apply")
            .set_override("overgeneration.samples", 500_i64)
            .expect("override to apply")
            .set_override("overgeneration.seed", 9_i64)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.output.format, OutputFormat::Json);

        let options = config.overgeneration_options();
        assert_eq!(options.samples, 500);
        assert_eq!(options.seed, Some(9));
        assert_eq!(options.enabled_length(), None);
    }

    #[test]
    fn seed_zero_is_kept() {
        let config = Loader::new()
            .set_override("overgeneration.seed", 0_u64)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.overgeneration_options().seed, Some(0));
    }

    #[test]
    fn seed_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[overgeneration]\nseed = 0").unwrap();

        let config = Loader::new().with_file(file.path()).build().expect("config to build");
        assert_eq!(config.overgeneration.seed, Some(0));
    }

    #[test]
    fn user_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[parser]\nmax_message_len = 40\n[grammar]\nreject_unnormalized = true").unwrap();

        let config = Loader::new().with_file(file.path()).build().expect("config to build");
        assert_eq!(config.parser_options().max_message_len, Some(40));
        assert!(config.load_options().reject_unnormalized);
        assert_eq!(config.grammar.normalization_tolerance, 1e-6);
    }

    #[test]
    fn missing_optional_file_is_ignored() {
        let config = Loader::new()
            .with_optional_file("/no/such/grameval.toml")
            .build()
            .expect("config to build");
        assert_eq!(config.output.format, OutputFormat::Csv);
    }

    #[test]
    fn missing_required_file_fails() {
        assert!(Loader::new().with_file("/no/such/grameval.toml").build().is_err());
    }
}
