//! Format-neutral token streams.
//!
//! The parser pulls [`Token`]s from a [`TokenSource`], the printer pushes them
//! into a [`TokenSink`]. [`TokenBuffer`] implements both sides in memory.

use std::collections::VecDeque;

use crate::error::{ErrorKind, Result};

/// One lexical element of a document.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    Key(String),
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
}

/// Pulls tokens of one document. `Ok(None)` marks its end.
pub trait TokenSource {
    fn next_token(&mut self) -> Result<Option<Token>>;
}

/// Receives the tokens of one document.
pub trait TokenSink {
    fn emit_null(&mut self) -> Result<()>;

    fn emit_bool(&mut self, value: bool) -> Result<()>;

    fn emit_i64(&mut self, value: i64) -> Result<()>;

    fn emit_u64(&mut self, value: u64) -> Result<()>;

    fn emit_f64(&mut self, value: f64) -> Result<()>;

    fn emit_str(&mut self, value: &str) -> Result<()>;

    fn open_object(&mut self) -> Result<()>;

    /// Starts the next member of the innermost object.
    fn key(&mut self, name: &str) -> Result<()>;

    fn close_object(&mut self) -> Result<()>;

    fn open_array(&mut self) -> Result<()>;

    fn close_array(&mut self) -> Result<()>;
}

// -----------------------------------------------------------------------------
// TokenBuffer

/// A queue of tokens, usable as both a sink and a source.
///
/// ```
/// use vc_graph::token::{Token, TokenBuffer, TokenSink, TokenSource};
///
/// let mut buffer = TokenBuffer::new();
/// buffer.open_array().unwrap();
/// buffer.emit_i64(1).unwrap();
/// buffer.close_array().unwrap();
///
/// assert_eq!(buffer.next_token().unwrap(), Some(Token::BeginArray));
/// assert_eq!(buffer.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenBuffer {
    tokens: VecDeque<Token>,
}

impl TokenBuffer {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn push(&mut self, token: Token) {
        self.tokens.push_back(token);
    }

    #[inline]
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }
}

impl FromIterator<Token> for TokenBuffer {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

impl TokenSource for TokenBuffer {
    #[inline]
    fn next_token(&mut self) -> Result<Option<Token>> {
        Ok(self.tokens.pop_front())
    }
}

impl TokenSink for TokenBuffer {
    fn emit_null(&mut self) -> Result<()> {
        self.push(Token::Null);
        Ok(())
    }

    fn emit_bool(&mut self, value: bool) -> Result<()> {
        self.push(Token::Bool(value));
        Ok(())
    }

    fn emit_i64(&mut self, value: i64) -> Result<()> {
        self.push(Token::I64(value));
        Ok(())
    }

    fn emit_u64(&mut self, value: u64) -> Result<()> {
        self.push(Token::U64(value));
        Ok(())
    }

    fn emit_f64(&mut self, value: f64) -> Result<()> {
        self.push(Token::F64(value));
        Ok(())
    }

    fn emit_str(&mut self, value: &str) -> Result<()> {
        self.push(Token::Str(String::from(value)));
        Ok(())
    }

    fn open_object(&mut self) -> Result<()> {
        self.push(Token::BeginObject);
        Ok(())
    }

    fn key(&mut self, name: &str) -> Result<()> {
        self.push(Token::Key(String::from(name)));
        Ok(())
    }

    fn close_object(&mut self) -> Result<()> {
        self.push(Token::EndObject);
        Ok(())
    }

    fn open_array(&mut self) -> Result<()> {
        self.push(Token::BeginArray);
        Ok(())
    }

    fn close_array(&mut self) -> Result<()> {
        self.push(Token::EndArray);
        Ok(())
    }
}

/// Fails unless `token` is present.
pub(crate) fn require(token: Option<Token>) -> Result<Token> {
    token.ok_or_else(|| ErrorKind::malformed("unexpected end of input").into())
}
