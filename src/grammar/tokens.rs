//! Token definitions for the grammar description format
//!
//! A description line looks like `NP -> Det N [0.6] | N [0.4]`. The lexer is a
//! plain logos lexer; whitespace and `#` comments are skipped, and newlines never
//! reach it because the loader lexes one line at a time.
use logos::Logos;
use std::fmt;

/// All tokens that can appear in a grammar description line
#[derive(Logos, Debug, PartialEq, Eq, Hash, Clone)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r"#[^\n]*")]
pub enum Token {
    #[token("->")]
    Arrow,

    #[token("|")]
    Pipe,

    /// Probability annotation; holds the text between the brackets, unparsed
    #[regex(r"\[[^\]\n]*\]", |lex| {
        let slice = lex.slice();
        slice[1..slice.len() - 1].trim().to_owned()
    })]
    Probability(String),

    /// Quoted literal; holds the unquoted value
    #[regex(r"'[^'\n]*'", unquote)]
    #[regex(r#""[^"\n]*""#, unquote)]
    Terminal(String),

    /// Bare category name
    #[regex(r"[\w/][\w/^<>+.-]*", |lex| lex.slice().to_owned())]
    Ident(String),
}

fn unquote(lex: &mut logos::Lexer<Token>) -> String {
    let slice = lex.slice();
    slice[1..slice.len() - 1].to_owned()
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Arrow => write!(f, "->"),
            Token::Pipe => write!(f, "|"),
            Token::Probability(text) => write!(f, "[{}]", text),
            Token::Terminal(value) => write!(f, "'{}'", value),
            Token::Ident(name) => write!(f, "{}", name),
        }
    }
}

/// Tokenize one description line, keeping byte spans for error reporting.
///
/// Unrecognized characters come back as `Err(span)` so the loader can point at
/// the offending column.
pub fn tokenize_line(line: &str) -> Result<Vec<(Token, logos::Span)>, logos::Span> {
    let mut lexer = Token::lexer(line);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => return Err(lexer.span()),
        }
    }

    Ok(tokens)
}
