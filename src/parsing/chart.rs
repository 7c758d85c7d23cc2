//! Viterbi chart parser
//!
//! A bottom-up dynamic program over spans `[i, j)` of the message. Every chart
//! cell keeps, per nonterminal, the best derivation covering exactly that span
//! and a back pointer to rebuild it. Scores are natural-log probabilities summed
//! along the derivation; the reported probability is converted to log base 2.
//!
//! Productions of any length are supported. Length-one lexical productions seed
//! the diagonal, unary productions are closed over inside each cell, and longer
//! right-hand sides are matched against the span with a small split table so
//! no binarization of the grammar is needed.
//!
//! Ties: when two derivations of the same nonterminal over the same span have
//! exactly equal scores, the first one found is kept. Discovery order follows
//! production order in the grammar and left-to-right split points, but callers
//! should not rely on which of two equally probable trees is returned.

use std::collections::HashMap;
use std::f64::consts::LN_2;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tracing::trace;

use super::tree::ParseTree;
use crate::grammar::{Grammar, Symbol};

/// Why a message has no parse
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unparsable {
    #[error("message is empty")]
    EmptyMessage,

    #[error("token '{token}' at position {position} is not in the grammar's vocabulary")]
    UnknownToken { token: String, position: usize },

    #[error("message length {len} exceeds the limit of {max}")]
    TooLong { len: usize, max: usize },

    #[error("no derivation of the start symbol covers the message")]
    NoDerivation,
}

/// Parser limits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// Longer messages are rejected without building a chart
    pub max_message_len: Option<usize>,
}

/// The best derivation of a message
#[derive(Debug, Clone, PartialEq)]
pub struct Parse {
    pub tree: ParseTree,
    /// log2 of the product of all production probabilities used
    pub log2_probability: f64,
}

impl Parse {
    pub fn depth(&self) -> usize {
        self.tree.depth()
    }

    pub fn to_bracketed(&self) -> String {
        self.tree.to_bracketed()
    }
}

#[derive(Debug, Clone)]
enum RhsItem {
    Terminal(String),
    NonTerminal(usize),
}

#[derive(Debug, Clone)]
struct SequenceRule {
    lhs: usize,
    rhs: Vec<RhsItem>,
    score: f64,
}

#[derive(Debug, Clone)]
struct UnaryRule {
    lhs: usize,
    child: usize,
    score: f64,
}

/// The grammar re-indexed for chart parsing. Nonterminals are interned in
/// order of first appearance; zero-probability productions are dropped since
/// they cannot take part in a derivation with non-zero probability.
#[derive(Debug, Clone)]
struct RuleIndex {
    names: Vec<String>,
    start: Option<usize>,
    lexical: HashMap<String, Vec<(usize, f64)>>,
    unary: Vec<UnaryRule>,
    sequences: Vec<SequenceRule>,
}

impl RuleIndex {
    fn build(grammar: &Grammar) -> Self {
        let mut ids: HashMap<String, usize> = HashMap::new();
        let mut names: Vec<String> = Vec::new();
        let mut intern = |name: &str| -> usize {
            if let Some(&id) = ids.get(name) {
                return id;
            }
            let id = names.len();
            ids.insert(name.to_owned(), id);
            names.push(name.to_owned());
            id
        };

        let mut lexical: HashMap<String, Vec<(usize, f64)>> = HashMap::new();
        let mut unary = Vec::new();
        let mut sequences = Vec::new();

        for production in grammar.productions() {
            let lhs = intern(production.lhs());
            if production.probability() <= 0.0 {
                continue;
            }
            let score = production.probability().ln();

            match production.rhs() {
                [Symbol::Terminal(token)] => {
                    lexical.entry(token.clone()).or_default().push((lhs, score));
                }
                [Symbol::NonTerminal(child)] => {
                    let child = intern(child);
                    unary.push(UnaryRule { lhs, child, score });
                }
                rhs => {
                    let rhs = rhs
                        .iter()
                        .map(|symbol| match symbol {
                            Symbol::Terminal(token) => RhsItem::Terminal(token.clone()),
                            Symbol::NonTerminal(name) => RhsItem::NonTerminal(intern(name)),
                        })
                        .collect();
                    sequences.push(SequenceRule { lhs, rhs, score });
                }
            }
        }

        let start = ids.get(grammar.start()).copied();
        Self {
            names,
            start,
            lexical,
            unary,
            sequences,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Part {
    Token(usize),
    Constituent { symbol: usize, start: usize, end: usize },
}

#[derive(Debug, Clone)]
enum Back {
    Lexical,
    Unary { child: usize },
    Sequence { parts: Vec<Part> },
}

#[derive(Debug, Clone)]
struct Entry {
    score: f64,
    back: Back,
}

type Cell = Vec<Option<Entry>>;

/// Offer a candidate derivation; keeps the strictly better one.
fn relax(cell: &mut Cell, symbol: usize, score: f64, back: impl FnOnce() -> Back) -> bool {
    match &cell[symbol] {
        Some(existing) if existing.score >= score => false,
        _ => {
            cell[symbol] = Some(Entry { score, back: back() });
            true
        }
    }
}

struct Chart<'a, S> {
    tokens: &'a [S],
    width: usize,
    cells: Vec<Cell>,
}

impl<'a, S: AsRef<str>> Chart<'a, S> {
    fn new(tokens: &'a [S], symbols: usize) -> Self {
        let width = tokens.len() + 1;
        Self {
            tokens,
            width,
            cells: vec![vec![None; symbols]; width * width],
        }
    }

    fn cell(&self, start: usize, end: usize) -> &Cell {
        &self.cells[start * self.width + end]
    }

    fn entry(&self, symbol: usize, start: usize, end: usize) -> Option<&Entry> {
        self.cell(start, end)[symbol].as_ref()
    }

    /// Best way to cover `[start, end)` with the items of `rhs`, each item
    /// spanning at least one token. Only spans shorter than `end - start` are
    /// consulted, so the caller's cell may still be under construction.
    fn best_split(&self, rhs: &[RhsItem], start: usize, end: usize) -> Option<(f64, Vec<Part>)> {
        let items = rhs.len();
        let positions = end - start + 1;
        // table[k][p]: best score covering [start, start + p) with the first k items
        let mut table = vec![vec![None::<(f64, usize)>; positions]; items + 1];
        table[0][0] = Some((0.0, 0));
        let last = positions - 1;

        for k in 1..=items {
            // every later item needs a token of its own, and the last item
            // must end at the span end
            let highest = last - (items - k);
            let lowest = if k == items { last } else { k };
            for p in lowest..=highest {
                for q in (k - 1)..p {
                    let Some((prefix, _)) = table[k - 1][q] else {
                        continue;
                    };
                    let piece = match &rhs[k - 1] {
                        RhsItem::Terminal(token) => {
                            (p == q + 1 && self.tokens[start + q].as_ref() == token).then_some(0.0)
                        }
                        RhsItem::NonTerminal(symbol) => self
                            .entry(*symbol, start + q, start + p)
                            .map(|entry| entry.score),
                    };
                    let Some(piece) = piece else {
                        continue;
                    };
                    let candidate = prefix + piece;
                    if table[k][p].map_or(true, |(best, _)| candidate > best) {
                        table[k][p] = Some((candidate, q));
                    }
                }
            }
        }

        let (score, _) = table[items][last]?;
        let mut parts = Vec::with_capacity(items);
        let mut p = last;
        for k in (1..=items).rev() {
            let (_, q) = table[k][p]?;
            parts.push(match &rhs[k - 1] {
                RhsItem::Terminal(_) => Part::Token(start + q),
                RhsItem::NonTerminal(symbol) => Part::Constituent {
                    symbol: *symbol,
                    start: start + q,
                    end: start + p,
                },
            });
            p = q;
        }
        parts.reverse();
        Some((score, parts))
    }

    fn fill(&mut self, index: &RuleIndex) {
        let n = self.tokens.len();
        for len in 1..=n {
            for start in 0..=(n - len) {
                let end = start + len;
                let mut cell: Cell = vec![None; index.names.len()];

                if len == 1 {
                    if let Some(rules) = index.lexical.get(self.tokens[start].as_ref()) {
                        for &(lhs, score) in rules {
                            relax(&mut cell, lhs, score, || Back::Lexical);
                        }
                    }
                }

                for rule in index.sequences.iter().filter(|rule| rule.rhs.len() <= len) {
                    if let Some((score, parts)) = self.best_split(&rule.rhs, start, end) {
                        relax(&mut cell, rule.lhs, rule.score + score, || Back::Sequence { parts });
                    }
                }

                // Unary closure. Scores never rise around a cycle, so this
                // settles within one pass per nonterminal.
                for _ in 0..=index.names.len() {
                    let mut changed = false;
                    for rule in &index.unary {
                        let Some(child_score) = cell[rule.child].as_ref().map(|entry| entry.score) else {
                            continue;
                        };
                        let child = rule.child;
                        changed |= relax(&mut cell, rule.lhs, rule.score + child_score, || Back::Unary {
                            child,
                        });
                    }
                    if !changed {
                        break;
                    }
                }

                self.cells[start * self.width + end] = cell;
            }
        }
    }

    /// Rebuild the tree rooted at `symbol` over `[start, end)` without recursion.
    fn tree(&self, index: &RuleIndex, symbol: usize, start: usize, end: usize) -> ParseTree {
        enum Frame {
            Visit { symbol: usize, start: usize, end: usize },
            Leaf(usize),
            Build { symbol: usize, arity: usize },
        }

        let mut built: Vec<ParseTree> = Vec::new();
        let mut stack = vec![Frame::Visit { symbol, start, end }];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Leaf(position) => built.push(ParseTree::leaf(self.tokens[position].as_ref())),
                Frame::Build { symbol, arity } => {
                    let children = built.split_off(built.len() - arity);
                    built.push(ParseTree::node(index.names[symbol].as_str(), children));
                }
                Frame::Visit { symbol, start, end } => {
                    let Some(entry) = self.entry(symbol, start, end) else {
                        continue;
                    };
                    match &entry.back {
                        Back::Lexical => {
                            stack.push(Frame::Build { symbol, arity: 1 });
                            stack.push(Frame::Leaf(start));
                        }
                        Back::Unary { child } => {
                            stack.push(Frame::Build { symbol, arity: 1 });
                            stack.push(Frame::Visit {
                                symbol: *child,
                                start,
                                end,
                            });
                        }
                        Back::Sequence { parts } => {
                            stack.push(Frame::Build {
                                symbol,
                                arity: parts.len(),
                            });
                            for part in parts.iter().rev() {
                                stack.push(match *part {
                                    Part::Token(position) => Frame::Leaf(position),
                                    Part::Constituent { symbol, start, end } => {
                                        Frame::Visit { symbol, start, end }
                                    }
                                });
                            }
                        }
                    }
                }
            }
        }

        built.pop().unwrap_or_else(|| ParseTree::node(index.names[symbol].as_str(), Vec::new()))
    }
}

/// Maximum-probability parser for one grammar.
///
/// Building the parser indexes the grammar once; [`ViterbiParser::parse`] can
/// then be called for any number of messages.
#[derive(Debug)]
pub struct ViterbiParser<'g> {
    grammar: &'g Grammar,
    index: RuleIndex,
    options: ParserOptions,
    charts_built: AtomicUsize,
}

impl<'g> ViterbiParser<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self::with_options(grammar, ParserOptions::default())
    }

    pub fn with_options(grammar: &'g Grammar, options: ParserOptions) -> Self {
        Self {
            grammar,
            index: RuleIndex::build(grammar),
            options,
            charts_built: AtomicUsize::new(0),
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Number of charts this parser has filled. Messages rejected up front
    /// (empty, too long, unknown tokens) never build one.
    pub fn charts_built(&self) -> usize {
        self.charts_built.load(Ordering::Relaxed)
    }

    /// Find the maximum-probability derivation of the start symbol covering
    /// `tokens`.
    pub fn parse<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Parse, Unparsable> {
        if tokens.is_empty() {
            return Err(Unparsable::EmptyMessage);
        }
        if let Some(max) = self.options.max_message_len {
            if tokens.len() > max {
                return Err(Unparsable::TooLong {
                    len: tokens.len(),
                    max,
                });
            }
        }
        if let Some((position, token)) = tokens
            .iter()
            .enumerate()
            .find(|(_, token)| !self.grammar.is_terminal(token.as_ref()))
        {
            return Err(Unparsable::UnknownToken {
                token: token.as_ref().to_owned(),
                position,
            });
        }

        let start = self.index.start.ok_or(Unparsable::NoDerivation)?;

        self.charts_built.fetch_add(1, Ordering::Relaxed);
        let mut chart = Chart::new(tokens, self.index.names.len());
        chart.fill(&self.index);

        let n = tokens.len();
        let score = chart
            .entry(start, 0, n)
            .map(|entry| entry.score)
            .ok_or(Unparsable::NoDerivation)?;
        let tree = chart.tree(&self.index, start, 0, n);
        trace!(tokens = n, score, "parsed message");

        Ok(Parse {
            tree,
            log2_probability: score / LN_2,
        })
    }
}

/// Parse one message with a throwaway parser.
pub fn best_parse<S: AsRef<str>>(grammar: &Grammar, tokens: &[S]) -> Result<Parse, Unparsable> {
    ViterbiParser::new(grammar).parse(tokens)
}
