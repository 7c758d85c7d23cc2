//! Command-line interface for grameval
//! Loads an induced grammar, evaluates it against the induction and evaluation
//! corpora, optionally estimates overgeneration, and appends one analysis
//! record to the output file.
//!
//! Usage:
//!   grameval --grammar `<file>` --name `<set>` --type `<baseline>` --parser `<parser>`
//!            --induct `<file>` --eval `<file>` --full `<file>` --output `<file>`
//!            [-L `<length>` --overgeneration `<N>`] [--seed `<seed>`]

mod logging;

use chrono::Local;
use clap::{value_parser, Arg, ArgMatches, Command};
use grameval::analysis::{analyze, group, lexicon};
use grameval::corpus::read_corpus;
use grameval::error::{CorpusError, GrammarError, RecordError};
use grameval::evaluation::{evaluate_with, overgeneration, OvergenerationOptions};
use grameval::grammar::load_with_options;
use grameval::parsing::ViterbiParser;
use grameval::record::{AnalysisRecord, RecordInputs, RunInfo};
use grameval_config::{GramevalConfig, Loader, OutputFormat};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] grameval_config::ConfigError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set up logging: {0}")]
    Logging(#[source] std::io::Error),

    #[error("invalid grammar {path}: {source}")]
    Grammar {
        path: PathBuf,
        #[source]
        source: GrammarError,
    },

    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    Record(#[from] RecordError),
}

fn command() -> Command {
    let path = |name: &'static str, help: &'static str| {
        Arg::new(name)
            .long(name)
            .help(help)
            .required(true)
            .value_parser(value_parser!(PathBuf))
    };
    let label = |name: &'static str, help: &'static str| Arg::new(name).long(name).help(help).required(true);

    Command::new("grameval")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Evaluate an induced probabilistic grammar against message corpora")
        .arg_required_else_help(true)
        .arg(path("grammar", "Path to the induced grammar"))
        .arg(label("name", "Name of the message set the grammar was induced from"))
        .arg(label("type", "Type of data set (e.g. emergent, structured, shuffled, random)"))
        .arg(label("parser", "Constituency parser that produced the grammar"))
        .arg(path("induct", "Corpus the grammar was induced from"))
        .arg(path("eval", "Held-out evaluation corpus"))
        .arg(path("full", "Full message corpus"))
        .arg(path("output", "File the analysis record is appended to"))
        .arg(
            Arg::new("length")
                .short('L')
                .help("Message length used for overgeneration sampling")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("overgeneration")
                .long("overgeneration")
                .help("Number of random messages to sample for overgeneration (0 disables)")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Seed for overgeneration sampling")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML file layered over the built-in defaults")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .help("Record format")
                .value_parser(["csv", "json"]),
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .help("Directory for the per-run log file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("parses")
                .long("parses")
                .help("Write the best parse of every evaluation message to this file")
                .value_parser(value_parser!(PathBuf)),
        )
}

/// Defaults, then the `--config` file, then individual flags.
fn load_config(matches: &ArgMatches) -> Result<GramevalConfig, CliError> {
    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<PathBuf>("config") {
        loader = loader.with_file(path);
    }
    if let Some(format) = matches.get_one::<String>("format") {
        loader = loader.set_override("output.format", format.as_str())?;
    }
    if let Some(samples) = matches.get_one::<usize>("overgeneration") {
        loader = loader.set_override("overgeneration.samples", *samples as u64)?;
    }
    if let Some(length) = matches.get_one::<usize>("length") {
        loader = loader.set_override("overgeneration.message_length", *length as u64)?;
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        loader = loader.set_override("overgeneration.seed", *seed)?;
    }
    Ok(loader.build()?)
}

fn required_path<'a>(matches: &'a ArgMatches, name: &str) -> &'a Path {
    matches
        .get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .unwrap_or_else(|| Path::new(""))
}

fn required_str<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches.get_one::<String>(name).map(String::as_str).unwrap_or_default()
}

fn run(matches: &ArgMatches, config: &GramevalConfig) -> Result<(), CliError> {
    let grammar_path = required_path(matches, "grammar");
    let description = fs::read_to_string(grammar_path).map_err(|source| CliError::Io {
        path: grammar_path.to_path_buf(),
        source,
    })?;
    let grammar =
        load_with_options(&description, &config.load_options()).map_err(|source| CliError::Grammar {
            path: grammar_path.to_path_buf(),
            source,
        })?;
    info!(
        productions = grammar.productions().len(),
        terminals = grammar.terminals().len(),
        "loaded grammar"
    );

    let stats = analyze(&grammar);
    let lexicon = lexicon(&grammar);
    let groups = group(&grammar);
    match stats.log2_prior() {
        Some(prior) => info!(log2_prior = prior, recursive = stats.recursive, "grammar statistics"),
        None => warn!("log2 prior undefined for this grammar"),
    }

    let parser = ViterbiParser::with_options(&grammar, config.parser_options());
    let run_info = RunInfo {
        name: required_str(matches, "name").to_owned(),
        kind: required_str(matches, "type").to_owned(),
        parser: required_str(matches, "parser").to_owned(),
        induct_path: required_path(matches, "induct").to_path_buf(),
        eval_path: required_path(matches, "eval").to_path_buf(),
        full_path: required_path(matches, "full").to_path_buf(),
        timestamp: Local::now(),
    };

    let induct = evaluate_with(&parser, &read_corpus(&run_info.induct_path)?);
    let eval = evaluate_with(&parser, &read_corpus(&run_info.eval_path)?);
    if let Some(depths) = eval.depth_summary() {
        info!(
            mean = depths.mean,
            min = depths.min,
            max = depths.max,
            distinct = depths.distinct,
            "evaluation tree depths"
        );
    }

    if let Some(path) = matches.get_one::<PathBuf>("parses") {
        let mut text = eval.parse_lines().collect::<Vec<_>>().join("\n");
        text.push('\n');
        fs::write(path, text).map_err(|source| CliError::Io {
            path: path.clone(),
            source,
        })?;
    }

    let options = config.overgeneration_options();
    let overgeneration = run_overgeneration(&parser, &options);

    let record = AnalysisRecord::from_inputs(RecordInputs {
        run: &run_info,
        stats: &stats,
        lexicon: &lexicon,
        groups: &groups,
        induct: &induct,
        eval: &eval,
        overgeneration,
        overgeneration_samples: options.samples,
    });
    let output = required_path(matches, "output");
    match config.output.format {
        OutputFormat::Csv => record.append_csv(output)?,
        OutputFormat::Json => record.append_json_line(output)?,
    }
    info!(output = %output.display(), "appended analysis record");
    Ok(())
}

fn run_overgeneration(
    parser: &ViterbiParser<'_>,
    options: &OvergenerationOptions,
) -> Option<overgeneration::Overgeneration> {
    let Some(length) = options.enabled_length() else {
        if options.samples > 0 {
            warn!("overgeneration requested without -L; skipping");
        }
        return None;
    };
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    Some(overgeneration::run(parser, length, options.samples, &mut rng))
}

fn main() {
    let matches = command().get_matches();

    let outcome = load_config(&matches).and_then(|config| {
        let log_dir = matches.get_one::<PathBuf>("log-dir").map(PathBuf::as_path);
        logging::init(log_dir, required_str(&matches, "name")).map_err(CliError::Logging)?;
        run(&matches, &config)
    });

    if let Err(err) = outcome {
        error!("{}", err);
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_well_formed() {
        command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let matches = command().get_matches_from([
            "grameval", "--grammar", "g.txt", "--name", "n", "--type", "emergent", "--parser", "ccl",
            "--induct", "i.txt", "--eval", "e.txt", "--full", "f.txt", "--output", "o.csv", "-L", "3",
            "--overgeneration", "20", "--seed", "11", "--format", "json",
        ]);
        let config = load_config(&matches).unwrap();
        let options = config.overgeneration_options();

        assert_eq!(options.enabled_length(), Some(3));
        assert_eq!(options.samples, 20);
        assert_eq!(options.seed, Some(11));
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn seed_zero_flag_seeds_the_sampler() {
        let matches = command().get_matches_from([
            "grameval", "--grammar", "g.txt", "--name", "n", "--type", "random", "--parser", "ccl",
            "--induct", "i.txt", "--eval", "e.txt", "--full", "f.txt", "--output", "o.csv", "--seed", "0",
        ]);
        let config = load_config(&matches).unwrap();
        assert_eq!(config.overgeneration_options().seed, Some(0));
    }
}
