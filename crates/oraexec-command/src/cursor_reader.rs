//! Ref cursor draining
//!
//! Reads every row of a ref cursor returned in an output parameter into
//! ordered column-name to value maps. The session that opened the cursor
//! must still be open, and a cursor can only be drained once.

use indexmap::IndexMap;
use oraexec_core::{ExecError, NativeParameter, OracleDbType, Result, Value};

/// One cursor row: column name to value, in cursor column order
pub type RowMap = IndexMap<String, Value>;

/// Drain the ref cursor held in `value`.
///
/// Fails with [`ExecError::InvalidArgument`] if `value` is not a cursor and
/// with [`ExecError::StaleCursor`] if its session has closed or it was
/// drained before.
pub async fn drain(value: &Value) -> Result<Vec<RowMap>> {
    let cursor = value.as_cursor().ok_or_else(|| {
        ExecError::InvalidArgument(format!("expected a ref cursor, got a {} value", value.kind_name()))
    })?;

    let rows = cursor.fetch_all().await?;
    let columns = cursor.columns();

    let maps = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            if row.len() != columns.len() {
                return Err(ExecError::ResultProcessing(format!(
                    "cursor row {} has {} values for {} columns",
                    index,
                    row.len(),
                    columns.len()
                )));
            }
            Ok(columns
                .iter()
                .map(|column| column.name.clone())
                .zip(row)
                .collect::<RowMap>())
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        cursor_id = cursor.cursor_id(),
        rows = maps.len(),
        columns = columns.len(),
        "ref cursor drained"
    );
    Ok(maps)
}

/// Drain a cursor-typed output parameter
pub async fn drain_parameter(param: &NativeParameter) -> Result<Vec<RowMap>> {
    if param.db_type != OracleDbType::RefCursor {
        return Err(ExecError::InvalidArgument(format!(
            "parameter '{}' is declared as {}, not RefCursor",
            param.name, param.db_type
        )));
    }
    drain(&param.value).await
}

/// Render drained rows as a JSON array of objects
pub fn rows_to_json(rows: &[RowMap]) -> Result<serde_json::Value> {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|(column, value)| Ok((column.clone(), value.to_json()?)))
                .collect::<Result<serde_json::Map<_, _>>>()
                .map(serde_json::Value::Object)
        })
        .collect::<Result<Vec<_>>>()
        .map(serde_json::Value::Array)
}

#[cfg(test)]
mod tests;
