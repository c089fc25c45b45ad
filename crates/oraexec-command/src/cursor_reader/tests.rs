use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use oraexec_core::{
    ColumnMeta, CursorSource, ExecError, NativeParameter, OracleDbType, ParameterDirection,
    RefCursor, Result, Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;

use super::*;

struct Rows {
    open: AtomicBool,
    rows: Vec<Vec<Value>>,
}

#[async_trait]
impl CursorSource for Rows {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn fetch_all(&self, _cursor_id: u32) -> Result<Vec<Vec<Value>>> {
        Ok(self.rows.clone())
    }
}

fn cursor(columns: &[&str], rows: Vec<Vec<Value>>) -> (Value, Arc<Rows>) {
    let source = Arc::new(Rows {
        open: AtomicBool::new(true),
        rows,
    });
    let columns = columns
        .iter()
        .enumerate()
        .map(|(i, name)| ColumnMeta::new(*name, "NUMBER", i))
        .collect();
    let cursor = RefCursor::new(1, Uuid::new_v4(), columns, source.clone());
    (Value::Cursor(cursor), source)
}

#[tokio::test]
async fn test_drain_builds_ordered_rows() {
    let (value, _) = cursor(
        &["ID", "NAME"],
        vec![
            vec![Value::Int32(1), Value::from("a")],
            vec![Value::Int32(2), Value::Null],
        ],
    );

    let rows = drain(&value).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["ID", "NAME"]);
    assert_eq!(rows[1]["NAME"], Value::Null);

    assert_eq!(
        rows_to_json(&rows).unwrap(),
        json!([{ "ID": 1, "NAME": "a" }, { "ID": 2, "NAME": null }])
    );
}

#[tokio::test]
async fn test_drain_empty_cursor() {
    let (value, _) = cursor(&["ID"], Vec::new());
    assert!(drain(&value).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_drain_rejects_non_cursor() {
    let err = drain(&Value::Int32(1)).await.unwrap_err();
    assert!(matches!(err, ExecError::InvalidArgument(_)));
    assert!(err.to_string().contains("int32"));
}

#[tokio::test]
async fn test_drain_twice_is_stale() {
    let (value, _) = cursor(&["ID"], vec![vec![Value::Int32(1)]]);
    drain(&value).await.unwrap();
    assert!(matches!(drain(&value).await.unwrap_err(), ExecError::StaleCursor(_)));
}

#[tokio::test]
async fn test_drain_after_session_closed_is_stale() {
    let (value, source) = cursor(&["ID"], vec![vec![Value::Int32(1)]]);
    source.open.store(false, Ordering::SeqCst);
    assert!(matches!(drain(&value).await.unwrap_err(), ExecError::StaleCursor(_)));
}

#[tokio::test]
async fn test_drain_rejects_ragged_rows() {
    let (value, _) = cursor(&["A", "B"], vec![vec![Value::Int32(1)]]);
    let err = drain(&value).await.unwrap_err();
    assert!(matches!(err, ExecError::ResultProcessing(_)));
}

#[tokio::test]
async fn test_drain_parameter_requires_cursor_type() {
    let (value, _) = cursor(&["ID"], vec![]);
    let mut param = NativeParameter {
        name: "cur".into(),
        db_type: OracleDbType::Int32,
        native_type: OracleDbType::Int32.native_type(),
        direction: ParameterDirection::Output,
        size: None,
        value,
    };
    assert!(matches!(
        drain_parameter(&param).await.unwrap_err(),
        ExecError::InvalidArgument(_)
    ));

    param.db_type = OracleDbType::RefCursor;
    param.native_type = OracleDbType::RefCursor.native_type();
    assert!(drain_parameter(&param).await.unwrap().is_empty());
}
