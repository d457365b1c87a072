//! Tokenizer for the element filter syntax.

use winnow::combinator::{alt, delimited};
use winnow::prelude::*;
use winnow::token::take_while;

use super::parser::ParseError;

/// Token types for the filter syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Unquoted run of characters: key, value, number, date or keyword.
    Word(String),
    /// Quoted key or value, quotation marks stripped.
    Quoted(String),

    // Operators
    Eq,       // =
    Ne,       // !=
    Lt,       // <
    Le,       // <=
    Gt,       // >
    Ge,       // >=
    Tilde,    // ~
    NotTilde, // !~
    Bang,     // !

    // Punctuation
    Comma,  // ,
    LParen, // (
    RParen, // )

    // End of input
    Eof,
}

/// A token plus the byte offset it started at, for error reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub offset: usize,
}

// Manually define PResult for resilience against winnow version changes
type PResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

/// Everything that is not whitespace, punctuation, a quote or an operator
/// character belongs to a word. This keeps keys like `addr:street`, regexes
/// like `residential|unclassified` and dates like `2000-11-11` in one piece.
fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | ',' | '"' | '\'' | '=' | '!' | '~' | '<' | '>')
}

fn lex_word(input: &mut &str) -> PResult<Token> {
    take_while(1.., is_word_char)
        .map(|s: &str| Token::Word(s.to_string()))
        .parse_next(input)
}

fn lex_quoted(input: &mut &str) -> PResult<Token> {
    alt((
        delimited('\'', take_while(0.., |c: char| c != '\''), '\''),
        delimited('"', take_while(0.., |c: char| c != '"'), '"'),
    ))
    .map(|s: &str| Token::Quoted(s.to_string()))
    .parse_next(input)
}

fn lex_token(input: &mut &str) -> PResult<Token> {
    alt((
        // Multi-char operators first
        "!=".value(Token::Ne),
        "!~".value(Token::NotTilde),
        "<=".value(Token::Le),
        ">=".value(Token::Ge),
        // Single-char operators
        "=".value(Token::Eq),
        "<".value(Token::Lt),
        ">".value(Token::Gt),
        "~".value(Token::Tilde),
        "!".value(Token::Bang),
        "(".value(Token::LParen),
        ")".value(Token::RParen),
        ",".value(Token::Comma),
        lex_quoted,
        lex_word,
    ))
    .parse_next(input)
}

/// Tokenize the entire input. Newlines count as plain whitespace, so filters
/// may span multiple lines.
pub fn tokenize(input: &str) -> Result<Vec<SpannedToken>, ParseError> {
    let mut remaining = input;
    let mut tokens = Vec::new();

    loop {
        remaining = remaining.trim_start();
        let offset = input.len() - remaining.len();
        if remaining.is_empty() {
            tokens.push(SpannedToken {
                token: Token::Eof,
                offset,
            });
            return Ok(tokens);
        }
        match lex_token(&mut remaining) {
            Ok(token) => tokens.push(SpannedToken { token, offset }),
            Err(_) => {
                let message = if remaining.starts_with('\'') || remaining.starts_with('"') {
                    "Did not close quotation marks".to_string()
                } else {
                    format!(
                        "Unexpected character '{}'",
                        remaining.chars().next().unwrap_or(' ')
                    )
                };
                return Err(ParseError::new(message, offset));
            }
        }
    }
}
