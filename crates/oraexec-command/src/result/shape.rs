//! Return shapes and payloads

use std::fmt;
use std::str::FromStr;

use oraexec_core::{ExecError, NativeParameter};
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::xml::XmlDocument;
use crate::cursor_reader::RowMap;

/// The output format requested for a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ReturnShape {
    /// Serialized XML text
    #[default]
    XmlString = 0,
    /// Structured XML document
    XmlDocument = 1,
    /// Number of rows the command affected
    AffectedRows = 2,
    /// JSON array of the output parameters
    JsonString = 3,
    /// The output parameters as bound
    RawParameters = 4,
}

impl ReturnShape {
    pub const ALL: [ReturnShape; 5] = [
        ReturnShape::XmlString,
        ReturnShape::XmlDocument,
        ReturnShape::AffectedRows,
        ReturnShape::JsonString,
        ReturnShape::RawParameters,
    ];

    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnShape::XmlString => "XmlString",
            ReturnShape::XmlDocument => "XmlDocument",
            ReturnShape::AffectedRows => "AffectedRows",
            ReturnShape::JsonString => "JsonString",
            ReturnShape::RawParameters => "RawParameters",
        }
    }
}

impl fmt::Display for ReturnShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i32> for ReturnShape {
    type Error = ExecError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        ReturnShape::ALL
            .into_iter()
            .find(|s| s.code() == code)
            .ok_or_else(|| ExecError::UnsupportedReturnShape(code.to_string()))
    }
}

impl FromStr for ReturnShape {
    type Err = ExecError;

    /// Accepts the variant names case-insensitively, plus `XDocument` for
    /// `XmlDocument`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("XDocument") {
            return Ok(ReturnShape::XmlDocument);
        }
        ReturnShape::ALL
            .into_iter()
            .find(|shape| shape.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ExecError::UnsupportedReturnShape(trimmed.to_string()))
    }
}

/// The result of a successful call, tagged by shape
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    AffectedRows(u64),
    Parameters(Vec<NativeParameter>),
    Xml(XmlDocument),
    XmlText(String),
    Json(String),
    /// Rows drained from a ref cursor
    Rows(Vec<RowMap>),
}

impl Payload {
    pub fn as_affected_rows(&self) -> Option<u64> {
        match self {
            Payload::AffectedRows(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_parameters(&self) -> Option<&[NativeParameter]> {
        match self {
            Payload::Parameters(params) => Some(params),
            _ => None,
        }
    }

    pub fn as_xml(&self) -> Option<&XmlDocument> {
        match self {
            Payload::Xml(doc) => Some(doc),
            _ => None,
        }
    }

    /// Serialized text of an `XmlText` or `Json` payload
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::XmlText(text) | Payload::Json(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_rows(&self) -> Option<&[RowMap]> {
        match self {
            Payload::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Short name of the payload shape
    pub fn kind_name(&self) -> &'static str {
        match self {
            Payload::AffectedRows(_) => "affected rows",
            Payload::Parameters(_) => "parameters",
            Payload::Xml(_) => "xml document",
            Payload::XmlText(_) => "xml text",
            Payload::Json(_) => "json",
            Payload::Rows(_) => "rows",
        }
    }
}
