//! Caller-side parameter descriptions

use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use oraexec_core::{ExecError, OracleDbType, Result, Value};
use serde::{Deserialize, Serialize};

/// A parameter as the caller describes it
///
/// Direction is not part of the spec: it follows from whether the spec is
/// passed as an input or an output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    /// Bind name; a leading `:` is ignored
    pub name: String,
    pub data_type: OracleDbType,
    /// Input value; ignored for outputs
    pub value: Value,
    /// Buffer size, required for variable-length outputs
    pub size: Option<u32>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, data_type: OracleDbType, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            data_type,
            value: value.into(),
            size: None,
        }
    }

    /// A spec for an output parameter, which carries no value
    pub fn output(name: impl Into<String>, data_type: OracleDbType) -> Self {
        Self::new(name, data_type, Value::Null)
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// The name the parameter is bound under
    pub fn bind_name(&self) -> &str {
        let name = self.name.trim();
        name.strip_prefix(':').unwrap_or(name)
    }
}

/// A data type given either as its numeric code or by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataTypeRef {
    Code(i32),
    Name(String),
}

impl DataTypeRef {
    pub fn resolve(&self) -> Result<OracleDbType> {
        match self {
            DataTypeRef::Code(code) => OracleDbType::try_from(*code),
            DataTypeRef::Name(name) => OracleDbType::from_str(name),
        }
    }
}

impl From<OracleDbType> for DataTypeRef {
    fn from(data_type: OracleDbType) -> Self {
        DataTypeRef::Code(data_type.code())
    }
}

/// A parameter definition as it appears in configuration or JSON input
///
/// ```json
/// { "name": "p", "value": "x", "data_type": "Varchar2" }
/// { "name": "returnVal", "data_type": 126, "size": 255 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
    pub data_type: DataTypeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl ParameterDef {
    /// Resolve the data type and coerce the JSON value into a typed spec
    pub fn to_spec(&self) -> Result<ParameterSpec> {
        let data_type = self.data_type.resolve()?;
        let value = coerce_json(data_type, &self.value).map_err(|e| match e {
            ExecError::ParameterBinding(msg) => {
                ExecError::ParameterBinding(format!("parameter '{}': {}", self.name, msg))
            }
            other => other,
        })?;
        Ok(ParameterSpec {
            name: self.name.clone(),
            data_type,
            value,
            size: self.size,
        })
    }
}

impl TryFrom<&ParameterDef> for ParameterSpec {
    type Error = ExecError;

    fn try_from(def: &ParameterDef) -> Result<Self> {
        def.to_spec()
    }
}

/// Coerce a JSON value into the [`Value`] shape expected for `data_type`.
///
/// Binary types take base64 text or an array of byte values; date and time
/// types take ISO-8601 text. JSON `null` is always accepted.
pub fn coerce_json(data_type: OracleDbType, json: &serde_json::Value) -> Result<Value> {
    use OracleDbType as T;
    use serde_json::Value as Json;

    if json.is_null() {
        return Ok(Value::Null);
    }

    let mismatch = || {
        ExecError::ParameterBinding(format!(
            "cannot convert JSON {} to {}",
            json_kind(json),
            data_type
        ))
    };

    let value = match data_type {
        T::Byte | T::Int16 | T::Int32 | T::Int64 => {
            let n = match json {
                Json::Number(n) => n.as_i64().ok_or_else(mismatch)?,
                Json::String(s) => s.trim().parse::<i64>().map_err(|_| mismatch())?,
                _ => return Err(mismatch()),
            };
            integer_value(data_type, n).ok_or_else(|| {
                ExecError::ParameterBinding(format!("value {} is out of range for {}", n, data_type))
            })?
        }
        T::Decimal => match json {
            Json::Number(n) => Value::Decimal(n.to_string()),
            Json::String(s) if s.trim().parse::<f64>().is_ok() => Value::Decimal(s.trim().to_string()),
            _ => return Err(mismatch()),
        },
        T::Double | T::BinaryDouble | T::Single | T::BinaryFloat => {
            let f = match json {
                Json::Number(n) => n.as_f64().ok_or_else(mismatch)?,
                Json::String(s) => s.trim().parse::<f64>().map_err(|_| mismatch())?,
                _ => return Err(mismatch()),
            };
            if matches!(data_type, T::Single | T::BinaryFloat) {
                Value::Float32(f as f32)
            } else {
                Value::Float64(f)
            }
        }
        T::Char
        | T::NChar
        | T::Varchar2
        | T::NVarchar2
        | T::Long
        | T::Clob
        | T::NClob
        | T::XmlType
        | T::IntervalDS
        | T::IntervalYM => match json {
            Json::String(s) => Value::String(s.clone()),
            Json::Number(n) => Value::String(n.to_string()),
            Json::Bool(b) => Value::String(b.to_string()),
            _ => return Err(mismatch()),
        },
        T::Raw | T::LongRaw | T::Blob | T::BFile => match json {
            Json::String(s) => Value::Bytes(BASE64.decode(s.trim()).map_err(|e| {
                ExecError::ParameterBinding(format!("invalid base64 for {}: {}", data_type, e))
            })?),
            Json::Array(items) => Value::Bytes(
                items
                    .iter()
                    .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                    .collect::<Option<Vec<u8>>>()
                    .ok_or_else(mismatch)?,
            ),
            _ => return Err(mismatch()),
        },
        T::Date | T::TimeStamp => match json {
            Json::String(s) => Value::DateTime(parse_naive_datetime(s).ok_or_else(mismatch)?),
            _ => return Err(mismatch()),
        },
        T::TimeStampTZ | T::TimeStampLTZ => match json {
            Json::String(s) => match DateTime::parse_from_rfc3339(s.trim()) {
                Ok(dt) => Value::DateTimeTz(dt),
                Err(_) => Value::DateTime(parse_naive_datetime(s).ok_or_else(mismatch)?),
            },
            _ => return Err(mismatch()),
        },
        // cursors only come back from the database
        T::RefCursor => return Err(mismatch()),
    };
    Ok(value)
}

/// Integer value for an integral type, or `None` when out of range
pub(crate) fn integer_value(data_type: OracleDbType, n: i64) -> Option<Value> {
    match data_type {
        OracleDbType::Byte => u8::try_from(n).ok().map(|v| Value::Int16(v as i16)),
        OracleDbType::Int16 => i16::try_from(n).ok().map(Value::Int16),
        OracleDbType::Int32 => i32::try_from(n).ok().map(Value::Int32),
        OracleDbType::Int64 => Some(Value::Int64(n)),
        _ => None,
    }
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

fn parse_naive_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
