//! Parse trees produced by the Viterbi parser
//!
//! Trees can be as deep as the message is long times the longest unary chain,
//! so depth and serialization walk them with an explicit stack.

use std::fmt;

use crate::grammar::Symbol;

/// A node labelled with a grammar symbol. Terminal leaves have no children.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseTree {
    label: Symbol,
    children: Vec<ParseTree>,
}

impl ParseTree {
    pub fn leaf(token: impl Into<String>) -> Self {
        Self {
            label: Symbol::Terminal(token.into()),
            children: Vec::new(),
        }
    }

    pub fn node(label: impl Into<String>, children: Vec<ParseTree>) -> Self {
        Self {
            label: Symbol::NonTerminal(label.into()),
            children,
        }
    }

    pub fn label(&self) -> &Symbol {
        &self.label
    }

    pub fn children(&self) -> &[ParseTree] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Leaves have depth 0, every other node `1 + max(child depths)`.
    /// `(TOP a)` therefore has depth 1.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 0usize)];
        while let Some((node, level)) = stack.pop() {
            if node.is_leaf() {
                deepest = deepest.max(level);
            } else {
                stack.extend(node.children.iter().map(|child| (child, level + 1)));
            }
        }
        deepest
    }

    /// Terminal tokens in left-to-right order
    pub fn leaves(&self) -> Vec<&str> {
        let mut leaves = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.is_leaf() {
                leaves.push(node.label.name());
            } else {
                stack.extend(node.children.iter().rev());
            }
        }
        leaves
    }

    /// One-line bracketed form, e.g. `(TOP (A x) (B y))`
    pub fn to_bracketed(&self) -> String {
        enum Step<'a> {
            Enter(&'a ParseTree),
            Exit,
        }

        let mut out = String::new();
        let mut stack = vec![Step::Enter(self)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Exit => out.push(')'),
                Step::Enter(node) => {
                    if !out.is_empty() && !out.ends_with('(') {
                        out.push(' ');
                    }
                    if node.is_leaf() {
                        out.push_str(node.label.name());
                    } else {
                        out.push('(');
                        out.push_str(node.label.name());
                        stack.push(Step::Exit);
                        stack.extend(node.children.iter().rev().map(Step::Enter));
                    }
                }
            }
        }
        out
    }
}

/// Children are moved onto a worklist before they are freed, so releasing a
/// deep tree never recurses.
impl Drop for ParseTree {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

impl fmt::Display for ParseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bracketed())
    }
}
