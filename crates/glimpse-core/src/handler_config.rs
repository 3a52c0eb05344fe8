//! Handler identities and configuration strings.
//!
//! A configuration string names a handler followed by flag/value pairs,
//! e.g. `plain-text -tab-width 8 -max-lines 200`. The stores persist these
//! strings verbatim; only the handler factory turns the pairs into a typed
//! option record via [`HandlerConfig::options`].

use std::fmt;
use std::str::FromStr;

use compact_str::CompactString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::error::HandlerError;

/// Stable identifier of a handler type in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(CompactString);

impl HandlerId {
    /// Create a new handler id.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(CompactString::from(id.as_ref()))
    }

    /// Borrow as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HandlerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for HandlerId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl PartialEq<&str> for HandlerId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A handler identifier plus its ordered option pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    id: HandlerId,
    options: Vec<(String, String)>,
}

impl HandlerConfig {
    /// Configuration with default options.
    pub fn new(id: impl Into<HandlerId>) -> Self {
        Self {
            id: id.into(),
            options: Vec::new(),
        }
    }

    /// Set an option, replacing any previous value for the same flag.
    pub fn with_option(mut self, flag: impl Into<String>, value: impl Into<String>) -> Self {
        let flag = flag.into();
        let value = value.into();
        match self.options.iter_mut().find(|(f, _)| *f == flag) {
            Some(slot) => slot.1 = value,
            None => self.options.push((flag, value)),
        }
        self
    }

    /// The handler identifier.
    pub fn id(&self) -> &HandlerId {
        &self.id
    }

    /// Raw value of a flag.
    pub fn option(&self, flag: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(f, _)| f == flag)
            .map(|(_, v)| v.as_str())
    }

    /// All option pairs in order.
    pub fn raw_options(&self) -> &[(String, String)] {
        &self.options
    }

    /// Whether any option is set.
    pub fn has_options(&self) -> bool {
        !self.options.is_empty()
    }

    /// Parse a configuration string.
    pub fn parse(input: &str) -> Result<Self, HandlerError> {
        let tokens = tokenize(input)?;
        let mut iter = tokens.into_iter().peekable();

        let id = match iter.next() {
            Some(token) if !token.text.is_empty() => token.text,
            _ => {
                return Err(HandlerError::Syntax {
                    message: "missing handler identifier".to_string(),
                });
            }
        };

        let mut config = Self::new(id);
        while let Some(token) = iter.next() {
            if !token.is_flag() {
                return Err(HandlerError::Syntax {
                    message: format!("expected a flag, found '{}'", token.text),
                });
            }
            let flag = token.text[1..].to_string();
            let value = match iter.peek() {
                Some(next) if !next.is_flag() => iter.next().map(|t| t.text).unwrap_or_default(),
                _ => "true".to_string(),
            };
            config = config.with_option(flag, value);
        }

        Ok(config)
    }

    /// Convert the option pairs into a typed option record.
    ///
    /// `true`/`false` become booleans and numeric values numbers; anything
    /// else is passed as a string. The record decides what is valid.
    pub fn options<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        let map: Map<String, Value> = self
            .options
            .iter()
            .map(|(flag, value)| (flag.clone(), infer_value(value)))
            .collect();

        serde_json::from_value(Value::Object(map)).map_err(|e| HandlerError::InvalidConfig {
            id: self.id.to_string(),
            message: e.to_string(),
        })
    }

    /// Build a configuration from a typed option record.
    pub fn from_options<T: Serialize>(
        id: impl Into<HandlerId>,
        options: &T,
    ) -> Result<Self, HandlerError> {
        let id = id.into();
        let invalid = |message: String| HandlerError::InvalidConfig {
            id: id.to_string(),
            message,
        };

        let value = serde_json::to_value(options).map_err(|e| invalid(e.to_string()))?;
        let Value::Object(map) = value else {
            return Err(invalid("options must serialize to a record".to_string()));
        };

        let mut config = Self::new(id.clone());
        for (flag, value) in map {
            let text = match value {
                Value::Null => continue,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::String(s) => s,
                Value::Array(_) | Value::Object(_) => {
                    return Err(invalid(format!("option '{flag}' is not a scalar")));
                }
            };
            config = config.with_option(flag, text);
        }
        Ok(config)
    }
}

impl fmt::Display for HandlerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id.as_str())?;
        for (flag, value) in &self.options {
            write!(f, " -{flag}")?;
            if value != "true" {
                write!(f, " {}", quote(value))?;
            }
        }
        Ok(())
    }
}

impl FromStr for HandlerConfig {
    type Err = HandlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct Token {
    text: String,
    quoted: bool,
}

impl Token {
    fn is_flag(&self) -> bool {
        !self.quoted && looks_like_flag(&self.text)
    }
}

fn looks_like_flag(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next() == Some('-') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

fn tokenize(input: &str) -> Result<Vec<Token>, HandlerError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c == '"' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some(escaped) => text.push(escaped),
                        None => break,
                    },
                    '"' => {
                        closed = true;
                        break;
                    }
                    other => text.push(other),
                }
            }
            if !closed {
                return Err(HandlerError::Syntax {
                    message: "unterminated quoted value".to_string(),
                });
            }
            tokens.push(Token { text, quoted: true });
        } else {
            let mut text = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                text.push(c);
                chars.next();
            }
            tokens.push(Token {
                text,
                quoted: false,
            });
        }
    }

    Ok(tokens)
}

fn quote(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || looks_like_flag(value)
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\\');
    if !needs_quotes {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn infer_value(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(raw.to_string())
}
