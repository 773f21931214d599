//! JSON text as a token stream, backed by `serde_json`.

use core::str::FromStr;

use serde::Deserialize;
use serde_json::{Map, Number, Value};

use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::{ErrorKind, GraphError, Result};
use crate::token::{Token, TokenBuffer, TokenSink, TokenSource};

// -----------------------------------------------------------------------------
// JsonSource

/// Tokens of a JSON document.
///
/// The text is parsed once by `serde_json`, so syntax errors surface from
/// [`str::parse`] as [`ErrorKind::Parse`]. Member order is kept.
///
/// `serde_json`'s own nesting limit is lifted; the text is checked against a
/// graph depth instead, [`DEFAULT_MAX_DEPTH`] unless built with
/// [`parse_bounded`](Self::parse_bounded).
#[derive(Debug)]
pub struct JsonSource {
    tokens: TokenBuffer,
}

enum Pending<'a> {
    Value(&'a Value),
    Key(&'a str),
    Token(Token),
}

impl JsonSource {
    pub fn from_value(value: &Value) -> Self {
        let mut tokens = TokenBuffer::new();
        let mut stack = vec![Pending::Value(value)];
        while let Some(pending) = stack.pop() {
            let value = match pending {
                Pending::Token(token) => {
                    tokens.push(token);
                    continue;
                }
                Pending::Key(key) => {
                    tokens.push(Token::Key(String::from(key)));
                    continue;
                }
                Pending::Value(value) => value,
            };
            match value {
                Value::Null => tokens.push(Token::Null),
                Value::Bool(value) => tokens.push(Token::Bool(*value)),
                Value::Number(number) => tokens.push(number_token(number)),
                Value::String(value) => tokens.push(Token::Str(value.clone())),
                Value::Array(items) => {
                    tokens.push(Token::BeginArray);
                    stack.push(Pending::Token(Token::EndArray));
                    stack.extend(items.iter().rev().map(Pending::Value));
                }
                Value::Object(members) => {
                    tokens.push(Token::BeginObject);
                    stack.push(Pending::Token(Token::EndObject));
                    for (key, value) in members.iter().rev() {
                        stack.push(Pending::Value(value));
                        stack.push(Pending::Key(key));
                    }
                }
            }
        }
        Self { tokens }
    }
}

impl JsonSource {
    /// Parses `text` for a graph at most `max_depth` levels deep.
    ///
    /// `@items` and `@keys` arrays sit inside their object without adding a
    /// graph level, so the text may nest up to twice as deep. Anything deeper
    /// fails with [`ErrorKind::GraphTooDeep`] before `serde_json` descends.
    pub fn parse_bounded(text: &str, max_depth: usize) -> Result<Self> {
        if nesting_of(text) > max_depth.saturating_mul(2) {
            return Err(ErrorKind::GraphTooDeep { limit: max_depth }.into());
        }
        let mut deserializer = serde_json::Deserializer::from_str(text);
        deserializer.disable_recursion_limit();
        let value = Value::deserialize(&mut deserializer)?;
        deserializer.end()?;
        Ok(Self::from_value(&value))
    }
}

impl FromStr for JsonSource {
    type Err = GraphError;

    #[inline]
    fn from_str(text: &str) -> Result<Self> {
        Self::parse_bounded(text, DEFAULT_MAX_DEPTH)
    }
}

/// The deepest array or object nesting of `text`, brackets in strings aside.
fn nesting_of(text: &str) -> usize {
    let (mut depth, mut deepest) = (0_usize, 0_usize);
    let (mut in_string, mut escaped) = (false, false);
    for byte in text.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

fn number_token(number: &Number) -> Token {
    if let Some(value) = number.as_i64() {
        Token::I64(value)
    } else if let Some(value) = number.as_u64() {
        Token::U64(value)
    } else {
        Token::F64(number.as_f64().unwrap_or(f64::NAN))
    }
}

impl TokenSource for JsonSource {
    #[inline]
    fn next_token(&mut self) -> Result<Option<Token>> {
        self.tokens.next_token()
    }
}

// -----------------------------------------------------------------------------
// JsonSink

enum Frame {
    Object(Map<String, Value>, Option<String>),
    Array(Vec<Value>),
}

/// Builds a JSON document from tokens.
#[derive(Default)]
pub struct JsonSink {
    stack: Vec<Frame>,
    done: Option<Value>,
}

impl JsonSink {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// The finished document.
    pub fn finish(self) -> Result<Value> {
        if !self.stack.is_empty() {
            return Err(ErrorKind::Sink(String::from("unclosed object or array")).into());
        }
        self.done
            .ok_or_else(|| ErrorKind::Sink(String::from("no value was written")).into())
    }

    /// The finished document as text.
    pub fn into_string(self, pretty: bool) -> Result<String> {
        let value = self.finish()?;
        let text = if pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(text)
    }

    fn value(&mut self, value: Value) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Array(items)) => items.push(value),
            Some(Frame::Object(members, key)) => {
                let Some(key) = key.take() else {
                    return Err(ErrorKind::Sink(String::from("object member without key")).into());
                };
                members.insert(key, value);
            }
            None if self.done.is_none() => self.done = Some(value),
            None => return Err(ErrorKind::Sink(String::from("more than one root value")).into()),
        }
        Ok(())
    }
}

impl TokenSink for JsonSink {
    fn emit_null(&mut self) -> Result<()> {
        self.value(Value::Null)
    }

    fn emit_bool(&mut self, value: bool) -> Result<()> {
        self.value(Value::Bool(value))
    }

    fn emit_i64(&mut self, value: i64) -> Result<()> {
        self.value(Value::Number(value.into()))
    }

    fn emit_u64(&mut self, value: u64) -> Result<()> {
        self.value(Value::Number(value.into()))
    }

    fn emit_f64(&mut self, value: f64) -> Result<()> {
        // JSON has no NaN or infinity.
        match Number::from_f64(value) {
            Some(number) => self.value(Value::Number(number)),
            None => self.value(Value::Null),
        }
    }

    fn emit_str(&mut self, value: &str) -> Result<()> {
        self.value(Value::String(String::from(value)))
    }

    fn open_object(&mut self) -> Result<()> {
        self.stack.push(Frame::Object(Map::new(), None));
        Ok(())
    }

    fn key(&mut self, name: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Object(_, key @ None)) => {
                *key = Some(String::from(name));
                Ok(())
            }
            _ => Err(ErrorKind::Sink(format!("key `{name}` outside of an object")).into()),
        }
    }

    fn close_object(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Object(members, None)) => self.value(Value::Object(members)),
            _ => Err(ErrorKind::Sink(String::from("unbalanced close_object")).into()),
        }
    }

    fn open_array(&mut self) -> Result<()> {
        self.stack.push(Frame::Array(Vec::new()));
        Ok(())
    }

    fn close_array(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Array(items)) => self.value(Value::Array(items)),
            _ => Err(ErrorKind::Sink(String::from("unbalanced close_array")).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonSink, JsonSource};
    use crate::error::ErrorKind;
    use crate::token::{Token, TokenSink, TokenSource};

    #[test]
    fn source_keeps_member_order() {
        let mut source = r#"{"b":1,"a":[true,null,-2.5],"c":18446744073709551615}"#
            .parse::<JsonSource>()
            .unwrap();
        let mut tokens = Vec::new();
        while let Some(token) = source.next_token().unwrap() {
            tokens.push(token);
        }
        assert_eq!(
            tokens,
            vec![
                Token::BeginObject,
                Token::Key("b".into()),
                Token::I64(1),
                Token::Key("a".into()),
                Token::BeginArray,
                Token::Bool(true),
                Token::Null,
                Token::F64(-2.5),
                Token::EndArray,
                Token::Key("c".into()),
                Token::U64(u64::MAX),
                Token::EndObject,
            ]
        );
    }

    #[test]
    fn syntax_errors_are_parse_errors() {
        let err = "{\"a\":".parse::<JsonSource>().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Parse(_)));
    }

    #[test]
    fn nesting_is_bounded_by_graph_depth() {
        let deep = |levels: usize| format!("{}{}", "[".repeat(levels), "]".repeat(levels));

        // Deeper than `serde_json`'s own limit of 128.
        let mut source = JsonSource::parse_bounded(&deep(300), 150).unwrap();
        let mut opened = 0;
        while let Some(token) = source.next_token().unwrap() {
            if token == Token::BeginArray {
                opened += 1;
            }
        }
        assert_eq!(opened, 300);

        let err = JsonSource::parse_bounded(&deep(301), 150).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::GraphTooDeep { limit: 150 }));

        // Brackets inside strings do not count.
        let text = r#"{"a":"[[[[\"{{{{"}"#;
        assert!(JsonSource::parse_bounded(text, 1).is_ok());
    }

    #[test]
    fn sink_builds_text() {
        let mut sink = JsonSink::new();
        sink.open_object().unwrap();
        sink.key("z").unwrap();
        sink.emit_str("last").unwrap();
        sink.key("a").unwrap();
        sink.open_array().unwrap();
        sink.emit_u64(1).unwrap();
        sink.emit_f64(f64::NAN).unwrap();
        sink.close_array().unwrap();
        sink.close_object().unwrap();
        assert_eq!(sink.into_string(false).unwrap(), r#"{"z":"last","a":[1,null]}"#);
    }

    #[test]
    fn sink_rejects_unbalanced_tokens() {
        let mut sink = JsonSink::new();
        sink.open_array().unwrap();
        assert!(sink.key("a").is_err());
        assert!(sink.close_object().is_err());
    }
}
