//! Core value types

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{ExecError, RefCursor, Result};

/// A parameter or column value
///
/// Scalars are plain variants. Large objects and ref cursors are live
/// handles: a [`LobStream`] can be read once, and a [`RefCursor`] stays
/// bound to the session that opened it.
#[derive(Debug, Clone)]
pub enum Value {
    /// NULL value
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// Decimal/Numeric (stored as string for precision)
    Decimal(String),
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// DATE / TIMESTAMP without timezone
    DateTime(NaiveDateTime),
    /// TIMESTAMP WITH (LOCAL) TIME ZONE
    DateTimeTz(DateTime<FixedOffset>),
    /// Streamed large object
    Lob(LobStream),
    /// Open server-side cursor
    Cursor(RefCursor),
}

impl Value {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            Value::Int16(v) => Some(*v as f64),
            Value::Int32(v) => Some(*v as f64),
            Value::Int64(v) => Some(*v as f64),
            Value::Decimal(s) => s.parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Try to get as a ref cursor
    pub fn as_cursor(&self) -> Option<&RefCursor> {
        match self {
            Value::Cursor(c) => Some(c),
            _ => None,
        }
    }

    /// Try to get as a LOB stream
    pub fn as_lob(&self) -> Option<&LobStream> {
        match self {
            Value::Lob(l) => Some(l),
            _ => None,
        }
    }

    /// Short name of the runtime shape, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::DateTime(_) => "datetime",
            Value::DateTimeTz(_) => "datetime with time zone",
            Value::Lob(l) => match l.kind() {
                LobKind::Character => "character lob",
                LobKind::Binary => "binary lob",
            },
            Value::Cursor(_) => "ref cursor",
        }
    }

    /// Text projection of the value.
    ///
    /// Returns `None` for NULL and for ref cursors, which have no textual
    /// form. Reading a LOB consumes its stream.
    pub fn to_text(&self) -> Result<Option<String>> {
        let text = match self {
            Value::Null | Value::Cursor(_) => return Ok(None),
            Value::Bool(v) => v.to_string(),
            Value::Int16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Float32(v) => v.to_string(),
            Value::Float64(v) => v.to_string(),
            Value::Decimal(v) | Value::String(v) => v.clone(),
            Value::Bytes(v) => BASE64.encode(v),
            Value::DateTime(v) => v.format(DATETIME_FORMAT).to_string(),
            Value::DateTimeTz(v) => v.to_rfc3339(),
            Value::Lob(lob) => match lob.kind() {
                LobKind::Character => lob.read_to_string()?,
                LobKind::Binary => BASE64.encode(lob.read_all()?),
            },
        };
        Ok(Some(text))
    }

    /// JSON projection of the value. Reading a LOB consumes its stream.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        use serde_json::Value as Json;

        let json = match self {
            Value::Null | Value::Cursor(_) => Json::Null,
            Value::Bool(v) => Json::Bool(*v),
            Value::Int16(v) => Json::from(*v),
            Value::Int32(v) => Json::from(*v),
            Value::Int64(v) => Json::from(*v),
            Value::Float32(v) => float_to_json(*v as f64),
            Value::Float64(v) => float_to_json(*v),
            other => match other.to_text()? {
                Some(text) => Json::String(text),
                None => Json::Null,
            },
        };
        Ok(json)
    }
}

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

fn float_to_json(v: f64) -> serde_json::Value {
    serde_json::Number::from_f64(v)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int16(a), Value::Int16(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::DateTimeTz(a), Value::DateTimeTz(b)) => a == b,
            (Value::Lob(a), Value::Lob(b)) => a == b,
            (Value::Cursor(a), Value::Cursor(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::DateTimeTz(v) => write!(f, "{}", v),
            Value::Lob(v) => write!(f, "<{} lob, {} bytes>", v.kind().as_str(), v.len()),
            Value::Cursor(v) => write!(f, "<ref cursor {}>", v.cursor_id()),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Whether a LOB holds text or raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LobKind {
    Character,
    Binary,
}

impl LobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LobKind::Character => "character",
            LobKind::Binary => "binary",
        }
    }
}

/// A single-read large object stream.
///
/// Character LOBs hold UTF-16LE bytes, the encoding the driver delivers.
/// Clones share the same underlying stream, so once any clone has been
/// read every other clone reports it as consumed.
#[derive(Clone)]
pub struct LobStream {
    kind: LobKind,
    len: usize,
    data: Arc<Mutex<Option<Bytes>>>,
}

impl LobStream {
    fn new(kind: LobKind, bytes: Bytes) -> Self {
        Self {
            kind,
            len: bytes.len(),
            data: Arc::new(Mutex::new(Some(bytes))),
        }
    }

    /// Character LOB from already encoded UTF-16LE bytes
    pub fn from_utf16le(bytes: impl Into<Bytes>) -> Self {
        Self::new(LobKind::Character, bytes.into())
    }

    /// Character LOB holding `text`
    pub fn from_text(text: &str) -> Self {
        let encoded: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
        Self::from_utf16le(encoded)
    }

    /// Binary LOB
    pub fn from_binary(bytes: impl Into<Bytes>) -> Self {
        Self::new(LobKind::Binary, bytes.into())
    }

    pub fn kind(&self) -> LobKind {
        self.kind
    }

    /// Length of the stream in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the stream has already been read
    pub fn is_consumed(&self) -> bool {
        self.data.lock().is_none()
    }

    /// Read the whole stream. Fails on every call after the first.
    pub fn read_all(&self) -> Result<Bytes> {
        self.data
            .lock()
            .take()
            .ok_or_else(|| ExecError::ResultProcessing("LOB stream already consumed".into()))
    }

    /// Read and decode a character LOB as text
    pub fn read_to_string(&self) -> Result<String> {
        if self.kind != LobKind::Character {
            return Err(ExecError::ResultProcessing(
                "cannot decode a binary LOB as text".into(),
            ));
        }
        let bytes = self.read_all()?;
        decode_utf16le(&bytes)
    }
}

fn decode_utf16le(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(ExecError::ResultProcessing(format!(
            "character LOB has odd byte length {}",
            bytes.len()
        )));
    }
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    let text = char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| ExecError::ResultProcessing(format!("invalid UTF-16 in character LOB: {}", e)))?;
    // A leading byte order mark is not part of the content
    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

impl PartialEq for LobStream {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for LobStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LobStream")
            .field("kind", &self.kind)
            .field("len", &self.len)
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

/// Column metadata reported by a cursor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ColumnMeta {
    /// Column name
    #[serde(default)]
    pub name: String,
    /// Data type (database-specific string)
    #[serde(default)]
    pub data_type: String,
    /// Whether the column can be NULL
    #[serde(default)]
    pub nullable: bool,
    /// Column ordinal position (0-based)
    #[serde(default)]
    pub ordinal: usize,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, ordinal: usize) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            ordinal,
        }
    }
}
