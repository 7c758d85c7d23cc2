//! Flat analysis records for columnar export
//!
//! One record summarizes one grammar against its induction and evaluation
//! corpora. Column names and order are fixed so rows from different runs line
//! up in the same CSV file. Values that were not computed render as `NaN`.

use chrono::{DateTime, Local};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::analysis::{GrammarStats, GroupStats, LexiconStats};
use crate::error::RecordError;
use crate::evaluation::{EvaluationResult, Overgeneration};

/// A single cell of a record
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Count(usize),
    Real(f64),
    Missing,
}

impl Value {
    fn real(value: Option<f64>) -> Self {
        value.map_or(Value::Missing, Value::Real)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => f.write_str(text),
            Value::Count(count) => write!(f, "{}", count),
            Value::Real(value) => write!(f, "{}", value),
            Value::Missing => f.write_str("NaN"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Text(text) => serializer.serialize_str(text),
            Value::Count(count) => serializer.serialize_u64(*count as u64),
            Value::Real(value) if value.is_finite() => serializer.serialize_f64(*value),
            Value::Real(_) | Value::Missing => serializer.serialize_none(),
        }
    }
}

/// Identifies a run: which message set, which baseline type, which
/// constituency parser produced the grammar, and the corpus files used.
#[derive(Debug, Clone, PartialEq)]
pub struct RunInfo {
    pub name: String,
    pub kind: String,
    pub parser: String,
    pub induct_path: PathBuf,
    pub eval_path: PathBuf,
    pub full_path: PathBuf,
    pub timestamp: DateTime<Local>,
}

/// Everything a record is assembled from
#[derive(Debug, Clone, Copy)]
pub struct RecordInputs<'a> {
    pub run: &'a RunInfo,
    pub stats: &'a GrammarStats,
    pub lexicon: &'a LexiconStats,
    pub groups: &'a GroupStats,
    pub induct: &'a EvaluationResult,
    pub eval: &'a EvaluationResult,
    pub overgeneration: Option<Overgeneration>,
    /// Sample count that was asked for, recorded even when the test was skipped
    pub overgeneration_samples: usize,
}

/// An ordered list of named values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisRecord {
    columns: Vec<(String, Value)>,
}

impl AnalysisRecord {
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.columns.push((name.into(), value));
    }

    pub fn columns(&self) -> &[(String, Value)] {
        &self.columns
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.columns.iter().map(|(_, value)| value)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    /// Assemble the standard record of one analysis run.
    pub fn from_inputs(inputs: RecordInputs<'_>) -> Self {
        let RecordInputs {
            run,
            stats,
            lexicon,
            groups,
            induct,
            eval,
            overgeneration,
            overgeneration_samples,
        } = inputs;
        let path = |path: &Path| Value::Text(path.display().to_string());
        let likelihood = |result: &EvaluationResult| Value::Real(result.average_log2likelihood);

        let mut record = Self::default();
        record.push("name", Value::Text(run.name.clone()));
        record.push("parser", Value::Text(run.parser.clone()));
        record.push("type", Value::Text(run.kind.clone()));
        record.push(
            "date+timestamp",
            Value::Text(run.timestamp.format("%Y-%m-%d %H:%M:%S%.6f").to_string()),
        );
        record.push("induct_fp", path(&run.induct_path));
        record.push("eval_fp", path(&run.eval_path));
        record.push("full_fp", path(&run.full_path));

        record.push("log2prior", Value::real(stats.log2_prior()));
        record.push("terminals", Value::Count(stats.terminals));
        record.push("preterminals", Value::Count(stats.preterminals));
        record.push("recursive", Value::Count(stats.recursive));

        record.push(
            "avg terminals/preterminal",
            Value::real(lexicon.mean_terminals_per_preterminal()),
        );
        record.push(
            "avg preterminals/terminal",
            Value::real(lexicon.mean_preterminals_per_terminal()),
        );

        record.push("induct_average_log2likelihood", likelihood(induct));
        record.push("eval_average_log2likelihood", likelihood(eval));
        record.push("induct_coverage", Value::real(induct.coverage));
        record.push("eval_coverage", Value::real(eval.coverage));

        record.push(
            "overgeneration_coverage",
            Value::real(overgeneration.and_then(|run| run.coverage())),
        );
        record.push("overgeneration_coverage_N", Value::Count(overgeneration_samples));

        record.push("number of nominals", Value::Count(groups.lhs_count()));
        record.push("number of pre-terminal groups", Value::Count(groups.rhs_count()));
        record.push(
            "average number of pre-terminal groups generated by nominal",
            Value::real(groups.mean_rhs_per_lhs()),
        );
        record
    }

    /// Append the record as a CSV row, writing the header first when the file
    /// is new or empty.
    pub fn append_csv(&self, path: impl AsRef<Path>) -> Result<(), RecordError> {
        let path = path.as_ref();
        let io_error = |source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_error)?;
        let is_new = file.metadata().map_err(io_error)?.len() == 0;

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            writer.write_record(self.headers())?;
        }
        writer.write_record(self.values().map(ToString::to_string))?;
        writer.flush().map_err(io_error)?;
        Ok(())
    }

    /// Append the record as one JSON object per line.
    pub fn append_json_line(&self, path: impl AsRef<Path>) -> Result<(), RecordError> {
        let path = path.as_ref();
        let io_error = |source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        };
        let line = serde_json::to_string(self)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_error)?;
        writeln!(file, "{}", line).map_err(io_error)
    }
}

impl Serialize for AnalysisRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
