//! Logical parameter data types and their driver wire types
//!
//! [`OracleDbType`] is the closed enumeration callers use to declare a
//! parameter's type. Its numeric codes are part of the caller contract and
//! must never be renumbered. [`NativeType`] is what the driver puts on the
//! wire for that declaration.

use std::fmt;
use std::str::FromStr;

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::ExecError;

/// Logical data type of a command parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum OracleDbType {
    BFile = 101,
    Blob = 102,
    Byte = 103,
    Char = 104,
    Clob = 105,
    Date = 106,
    Decimal = 107,
    Double = 108,
    Long = 109,
    LongRaw = 110,
    Int16 = 111,
    Int32 = 112,
    Int64 = 113,
    IntervalDS = 114,
    IntervalYM = 115,
    NClob = 116,
    NChar = 117,
    NVarchar2 = 119,
    Raw = 120,
    RefCursor = 121,
    Single = 122,
    TimeStamp = 123,
    TimeStampLTZ = 124,
    TimeStampTZ = 125,
    Varchar2 = 126,
    XmlType = 127,
    BinaryDouble = 132,
    BinaryFloat = 133,
}

impl OracleDbType {
    /// Every variant, in code order
    pub const ALL: [OracleDbType; 28] = [
        OracleDbType::BFile,
        OracleDbType::Blob,
        OracleDbType::Byte,
        OracleDbType::Char,
        OracleDbType::Clob,
        OracleDbType::Date,
        OracleDbType::Decimal,
        OracleDbType::Double,
        OracleDbType::Long,
        OracleDbType::LongRaw,
        OracleDbType::Int16,
        OracleDbType::Int32,
        OracleDbType::Int64,
        OracleDbType::IntervalDS,
        OracleDbType::IntervalYM,
        OracleDbType::NClob,
        OracleDbType::NChar,
        OracleDbType::NVarchar2,
        OracleDbType::Raw,
        OracleDbType::RefCursor,
        OracleDbType::Single,
        OracleDbType::TimeStamp,
        OracleDbType::TimeStampLTZ,
        OracleDbType::TimeStampTZ,
        OracleDbType::Varchar2,
        OracleDbType::XmlType,
        OracleDbType::BinaryDouble,
        OracleDbType::BinaryFloat,
    ];

    /// The caller-facing numeric code
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// The variant name as callers spell it
    pub fn as_str(&self) -> &'static str {
        match self {
            OracleDbType::BFile => "BFile",
            OracleDbType::Blob => "Blob",
            OracleDbType::Byte => "Byte",
            OracleDbType::Char => "Char",
            OracleDbType::Clob => "Clob",
            OracleDbType::Date => "Date",
            OracleDbType::Decimal => "Decimal",
            OracleDbType::Double => "Double",
            OracleDbType::Long => "Long",
            OracleDbType::LongRaw => "LongRaw",
            OracleDbType::Int16 => "Int16",
            OracleDbType::Int32 => "Int32",
            OracleDbType::Int64 => "Int64",
            OracleDbType::IntervalDS => "IntervalDS",
            OracleDbType::IntervalYM => "IntervalYM",
            OracleDbType::NClob => "NClob",
            OracleDbType::NChar => "NChar",
            OracleDbType::NVarchar2 => "NVarchar2",
            OracleDbType::Raw => "Raw",
            OracleDbType::RefCursor => "RefCursor",
            OracleDbType::Single => "Single",
            OracleDbType::TimeStamp => "TimeStamp",
            OracleDbType::TimeStampLTZ => "TimeStampLTZ",
            OracleDbType::TimeStampTZ => "TimeStampTZ",
            OracleDbType::Varchar2 => "Varchar2",
            OracleDbType::XmlType => "XmlType",
            OracleDbType::BinaryDouble => "BinaryDouble",
            OracleDbType::BinaryFloat => "BinaryFloat",
        }
    }

    /// Driver wire type for this declaration
    pub fn native_type(&self) -> NativeType {
        use NativeTypeCode as N;
        let code = match self {
            OracleDbType::BFile => N::Bfile,
            OracleDbType::Blob => N::Blob,
            OracleDbType::Byte
            | OracleDbType::Decimal
            | OracleDbType::Double
            | OracleDbType::Int16
            | OracleDbType::Int32
            | OracleDbType::Int64
            | OracleDbType::Single => N::Number,
            OracleDbType::Char | OracleDbType::NChar => N::Char,
            OracleDbType::Clob | OracleDbType::NClob => N::Clob,
            OracleDbType::Date => N::Date,
            OracleDbType::Long => N::Long,
            OracleDbType::LongRaw => N::LongRaw,
            OracleDbType::IntervalDS => N::IntervalDs,
            OracleDbType::IntervalYM => N::IntervalYm,
            OracleDbType::NVarchar2 | OracleDbType::Varchar2 => N::Varchar,
            OracleDbType::Raw => N::Raw,
            OracleDbType::RefCursor => N::Cursor,
            OracleDbType::TimeStamp => N::Timestamp,
            OracleDbType::TimeStampLTZ => N::TimestampLtz,
            OracleDbType::TimeStampTZ => N::TimestampTz,
            OracleDbType::XmlType => N::Object,
            OracleDbType::BinaryDouble => N::BinaryDouble,
            OracleDbType::BinaryFloat => N::BinaryFloat,
        };
        let charset_form = match self {
            OracleDbType::NChar | OracleDbType::NVarchar2 | OracleDbType::NClob => {
                CharsetForm::National
            }
            _ => CharsetForm::Implicit,
        };
        NativeType { code, charset_form }
    }

    /// Character large objects, whose output is delivered as a text stream
    pub fn is_character_lob(&self) -> bool {
        matches!(self, OracleDbType::Clob | OracleDbType::NClob)
    }

    /// Binary large objects and file locators
    pub fn is_binary_lob(&self) -> bool {
        matches!(self, OracleDbType::Blob | OracleDbType::BFile)
    }

    /// Variable-length types: the driver cannot size an output buffer for
    /// these without an explicit `size`.
    pub fn requires_size_for_output(&self) -> bool {
        matches!(
            self,
            OracleDbType::Char
                | OracleDbType::NChar
                | OracleDbType::Varchar2
                | OracleDbType::NVarchar2
                | OracleDbType::Long
                | OracleDbType::Raw
                | OracleDbType::LongRaw
                | OracleDbType::IntervalDS
                | OracleDbType::IntervalYM
                | OracleDbType::XmlType
        )
    }
}

impl fmt::Display for OracleDbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i32> for OracleDbType {
    type Error = ExecError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        OracleDbType::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or_else(|| ExecError::InvalidArgument(format!("unknown data type code: {}", code)))
    }
}

impl FromStr for OracleDbType {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        OracleDbType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ExecError::InvalidArgument(format!("unknown data type: {}", trimmed)))
    }
}

/// Wire type codes understood by the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NativeTypeCode {
    /// VARCHAR2 / NVARCHAR2
    Varchar = 1,
    /// NUMBER
    Number = 2,
    /// LONG
    Long = 8,
    /// DATE
    Date = 12,
    /// RAW
    Raw = 23,
    /// LONG RAW
    LongRaw = 24,
    /// CHAR / NCHAR
    Char = 96,
    BinaryFloat = 100,
    BinaryDouble = 101,
    /// REF CURSOR
    Cursor = 102,
    /// Named object type (XMLTYPE)
    Object = 109,
    /// CLOB / NCLOB
    Clob = 112,
    Blob = 113,
    Bfile = 114,
    Timestamp = 180,
    TimestampTz = 181,
    IntervalYm = 182,
    IntervalDs = 183,
    TimestampLtz = 231,
}

/// Character set form used when binding character data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CharsetForm {
    /// Database character set
    #[default]
    Implicit,
    /// National character set (NCHAR, NVARCHAR2, NCLOB)
    National,
}

/// Driver-native type of a bound parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeType {
    pub code: NativeTypeCode,
    pub charset_form: CharsetForm,
}

impl NativeType {
    /// The raw wire code
    pub fn wire_code(&self) -> u8 {
        self.code as u8
    }
}
