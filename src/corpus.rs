//! Message corpora
//!
//! A corpus file holds one message per line, tokens separated by whitespace.
//! Every line is a message, including blank ones; a blank line becomes an empty
//! message that counts toward the corpus size and never parses.

use serde::Serialize;
use std::fmt;
use std::fs;
use std::ops::Deref;
use std::path::Path;

use crate::error::CorpusError;

/// An ordered sequence of tokens
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Message(Vec<String>);

impl Message {
    pub fn new(tokens: Vec<String>) -> Self {
        Self(tokens)
    }

    /// Split a corpus line on whitespace
    pub fn from_line(line: &str) -> Self {
        Self(line.split_whitespace().map(str::to_owned).collect())
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }
}

impl Deref for Message {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for Message {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Parse corpus text, one message per line.
pub fn parse_corpus(text: &str) -> Vec<Message> {
    text.lines().map(Message::from_line).collect()
}

/// Read a corpus file.
pub fn read_corpus(path: impl AsRef<Path>) -> Result<Vec<Message>, CorpusError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_corpus(&text))
}
