//! Connection string parsing
//!
//! Connection strings are `;`-separated `key=value` pairs, for example
//! `Data Source=(DESCRIPTION=(ADDRESS=(HOST=db)(PORT=1521)));User Id=app;Password=secret`.
//! Values may be wrapped in single or double quotes, and `;` inside
//! parentheses or quotes does not end a pair. Keys are matched
//! case-insensitively.
//!
//! The string is also the connection cache key, so equality and hashing use
//! the raw text. `Display` and `Debug` redact credentials.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::{ExecError, Result};

const PASSWORD_KEYS: &[&str] = &["password", "pwd"];
const USER_KEYS: &[&str] = &["user id", "userid", "uid", "user"];
const DATA_SOURCE_KEYS: &[&str] = &["data source", "datasource", "server"];

/// A parsed connection string
#[derive(Clone)]
pub struct ConnectionString {
    raw: String,
    pairs: Vec<(String, String)>,
}

impl ConnectionString {
    /// Parse a connection string. Fails with [`ExecError::InvalidArgument`]
    /// on empty input or on a segment without `=`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ExecError::InvalidArgument(
                "connection string is empty".into(),
            ));
        }

        let mut pairs = Vec::new();
        for segment in split_segments(trimmed)? {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                ExecError::InvalidArgument(format!(
                    "connection string segment '{}' is not a key=value pair",
                    redact_segment(segment)
                ))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ExecError::InvalidArgument(
                    "connection string contains an empty key".into(),
                ));
            }
            pairs.push((key.to_string(), unquote(value.trim()).to_string()));
        }

        if pairs.is_empty() {
            return Err(ExecError::InvalidArgument(
                "connection string has no key=value pairs".into(),
            ));
        }

        Ok(Self {
            raw: trimmed.to_string(),
            pairs,
        })
    }

    /// The connection string exactly as supplied (trimmed). Contains secrets.
    pub fn as_raw(&self) -> &str {
        &self.raw
    }

    /// Value for `key`, matched case-insensitively. The last occurrence wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    fn get_any(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }

    pub fn data_source(&self) -> Option<&str> {
        self.get_any(DATA_SOURCE_KEYS)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.get_any(USER_KEYS)
    }

    pub fn password(&self) -> Option<&str> {
        self.get_any(PASSWORD_KEYS)
    }

    /// All pairs in declaration order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Rendering with passwords replaced by `***`, safe for logs
    pub fn redacted(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| {
                if is_secret_key(k) {
                    format!("{}=***", k)
                } else {
                    format!("{}={}", k, v)
                }
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

fn is_secret_key(key: &str) -> bool {
    PASSWORD_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key.trim()))
}

fn redact_segment(segment: &str) -> String {
    match segment.split_once('=') {
        Some((k, _)) if is_secret_key(k) => format!("{}=***", k.trim()),
        _ => segment.to_string(),
    }
}

/// Split on `;` outside of quotes and parentheses
fn split_segments(input: &str) -> Result<Vec<&str>> {
    let mut segments = Vec::new();
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    ExecError::InvalidArgument(
                        "connection string has an unbalanced ')'".into(),
                    )
                })?;
            }
            (None, ';') if depth == 0 => {
                segments.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err(ExecError::InvalidArgument(
            "connection string has an unterminated quote".into(),
        ));
    }
    if depth != 0 {
        return Err(ExecError::InvalidArgument(
            "connection string has an unbalanced '('".into(),
        ));
    }
    segments.push(&input[start..]);
    Ok(segments)
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

impl FromStr for ConnectionString {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialEq for ConnectionString {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for ConnectionString {}

impl Hash for ConnectionString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionString")
            .field(&self.redacted())
            .finish()
    }
}
