//! Conversion between parameter specs and driver-native parameters

use std::collections::HashSet;

use oraexec_core::{
    CommandKind, ExecError, LobKind, NativeCommand, NativeParameter, OracleDbType,
    ParameterDirection, Result, Value,
};

use super::extractor::extract_placeholders;
use super::spec::{ParameterSpec, integer_value};

/// Convert a spec into the driver-native parameter for `direction`.
///
/// Outputs get a `Null` placeholder whatever value the spec carries, and
/// variable-length outputs must declare a size. Inputs must carry a value
/// whose runtime shape fits the declared type.
pub fn to_native(spec: &ParameterSpec, direction: ParameterDirection) -> Result<NativeParameter> {
    let name = spec.bind_name();
    if name.is_empty() {
        return Err(ExecError::ParameterBinding(
            "parameter name must not be empty".into(),
        ));
    }

    let value = match direction {
        ParameterDirection::Output => {
            if spec.data_type.requires_size_for_output() && spec.size.unwrap_or(0) == 0 {
                return Err(ExecError::ParameterBinding(format!(
                    "output parameter '{}' of type {} requires a size",
                    name, spec.data_type
                )));
            }
            Value::Null
        }
        ParameterDirection::Input => {
            check_shape(name, spec.data_type, &spec.value)?;
            spec.value.clone()
        }
    };

    Ok(NativeParameter {
        name: name.to_string(),
        db_type: spec.data_type,
        native_type: spec.data_type.native_type(),
        direction,
        size: spec.size,
        value,
    })
}

/// Convert inputs then outputs, in the order given.
///
/// Fails if two parameters share a name (compared case-insensitively).
pub fn bind_all(inputs: &[ParameterSpec], outputs: &[ParameterSpec]) -> Result<Vec<NativeParameter>> {
    let mut seen: HashSet<String> = HashSet::with_capacity(inputs.len() + outputs.len());
    let mut native = Vec::with_capacity(inputs.len() + outputs.len());

    let tagged = inputs
        .iter()
        .map(|spec| (spec, ParameterDirection::Input))
        .chain(outputs.iter().map(|spec| (spec, ParameterDirection::Output)));

    for (spec, direction) in tagged {
        let param = to_native(spec, direction)?;
        if !seen.insert(param.name.to_lowercase()) {
            return Err(ExecError::ParameterBinding(format!(
                "duplicate parameter name: {}",
                param.name
            )));
        }
        tracing::trace!(
            name = %param.name,
            data_type = %param.db_type,
            wire_code = param.native_type.wire_code(),
            direction = ?direction,
            "parameter bound"
        );
        native.push(param);
    }

    Ok(native)
}

/// The materialized value of a native parameter
pub fn from_native(param: &NativeParameter) -> Value {
    param.value.clone()
}

/// When binding a direct command by name, every placeholder in its text
/// must have a bound parameter.
///
/// Positional binding and stored procedures are not checked: the driver
/// matches those by order or by the procedure signature.
pub fn check_placeholders(command: &NativeCommand) -> Result<()> {
    if !command.bind_by_name || command.kind != CommandKind::DirectCommand {
        return Ok(());
    }
    for placeholder in extract_placeholders(&command.text) {
        let name = placeholder.bind_name();
        if command.parameter(&name).is_none() {
            return Err(ExecError::ParameterBinding(format!("missing parameter: {}", name)));
        }
    }
    Ok(())
}

fn check_shape(name: &str, data_type: OracleDbType, value: &Value) -> Result<()> {
    use OracleDbType as T;

    let fits = match (data_type, value) {
        (_, Value::Null) => true,
        (T::Byte | T::Int16 | T::Int32 | T::Int64, v) => match v.as_i64() {
            Some(n) => {
                if integer_value(data_type, n).is_none() {
                    return Err(ExecError::ParameterBinding(format!(
                        "parameter '{}': value {} is out of range for {}",
                        name, n, data_type
                    )));
                }
                true
            }
            None => false,
        },
        (T::Decimal, Value::Decimal(s)) => s.trim().parse::<f64>().is_ok(),
        (T::Decimal | T::Double | T::Single | T::BinaryDouble | T::BinaryFloat, v) => {
            matches!(
                v,
                Value::Int16(_)
                    | Value::Int32(_)
                    | Value::Int64(_)
                    | Value::Float32(_)
                    | Value::Float64(_)
                    | Value::Decimal(_)
            )
        }
        (
            T::Char
            | T::NChar
            | T::Varchar2
            | T::NVarchar2
            | T::Long
            | T::XmlType
            | T::IntervalDS
            | T::IntervalYM,
            Value::String(_),
        ) => true,
        (T::Clob | T::NClob, Value::String(_)) => true,
        (T::Clob | T::NClob, Value::Lob(lob)) => lob.kind() == LobKind::Character,
        (T::Raw | T::LongRaw | T::Blob | T::BFile, Value::Bytes(_)) => true,
        (T::Blob | T::BFile, Value::Lob(lob)) => lob.kind() == LobKind::Binary,
        (T::Date | T::TimeStamp, Value::DateTime(_)) => true,
        (T::TimeStampTZ | T::TimeStampLTZ, Value::DateTime(_) | Value::DateTimeTz(_)) => true,
        (T::RefCursor, Value::Cursor(cursor)) => {
            if !cursor.is_open() || cursor.is_consumed() {
                return Err(ExecError::ParameterBinding(format!(
                    "parameter '{}': ref cursor {} is no longer open",
                    name,
                    cursor.cursor_id()
                )));
            }
            true
        }
        _ => false,
    };

    if fits {
        Ok(())
    } else {
        Err(ExecError::ParameterBinding(format!(
            "parameter '{}' declared as {} cannot take a {} value",
            name,
            data_type,
            value.kind_name()
        )))
    }
}
