//! Ref cursor tests
//!
//! A cursor comes back as an output parameter and stays tied to the session
//! that opened it, so most of these tests keep that session alive with
//! `CreateAndKeepAlive` and thread the handle into the next call.

use anyhow::{Context, Result};
use oraexec_command::{
    CommandExecutor, CommandRequest, ConnectionHandle, ConnectionPolicy, ErrorKind,
    ExecutionOptions, OutputSpec, ParameterSpec, ReturnShape, Value, drain_parameter, rows_to_json,
};
use oraexec_core::{ExecError, OracleDbType};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::fixtures::{self, CONNECTION_STRING, commands};

/// Run the cursor-opening block and return the cursor value plus the
/// connection, if the policy kept it
async fn open_cursor(
    executor: &CommandExecutor,
    policy: ConnectionPolicy,
) -> Result<(Value, Option<ConnectionHandle>)> {
    let result = executor
        .execute(
            CommandRequest::new(CONNECTION_STRING, commands::OPEN_CURSOR).with_policy(policy),
            OutputSpec::new(ReturnShape::RawParameters)
                .with_output(ParameterSpec::output("cur", OracleDbType::RefCursor)),
            ExecutionOptions::throwing(),
        )
        .await?;
    let params = result
        .payload
        .as_ref()
        .and_then(|p| p.as_parameters())
        .context("raw parameters")?;
    let cursor = params
        .first()
        .map(|p| p.value.clone())
        .context("cursor output")?;
    Ok((cursor, result.connection))
}

#[tokio::test]
async fn test_drain_cursor_rows() -> Result<()> {
    let (executor, _) = fixtures::executor();
    let (cursor, connection) = open_cursor(&executor, ConnectionPolicy::CreateAndKeepAlive).await?;

    let result = executor.drain_ref_cursor(&cursor, ExecutionOptions::throwing()).await?;
    let rows = result
        .payload
        .as_ref()
        .and_then(|p| p.as_rows())
        .context("row payload")?;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["COL1"], Value::Int32(1));
    assert_eq!(rows_to_json(rows)?, json!([{ "COL1": 1 }]));

    connection.context("connection kept")?.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_cursor_is_stale_after_session_closes() -> Result<()> {
    let (executor, _) = fixtures::executor();
    let (cursor, connection) = open_cursor(&executor, ConnectionPolicy::CreateAndClose).await?;
    assert!(connection.is_none());

    let result = executor.drain_ref_cursor(&cursor, ExecutionOptions::default()).await?;
    assert!(!result.success);
    assert!(
        result.message.as_deref().is_some_and(|m| m.starts_with("Stale cursor")),
        "unexpected message: {:?}",
        result.message
    );

    let err = executor
        .drain_ref_cursor(&cursor, ExecutionOptions::throwing())
        .await
        .expect_err("session is closed");
    assert!(matches!(err, ExecError::StaleCursor(_)));
    assert_eq!(err.kind(), ErrorKind::Connection);
    Ok(())
}

#[tokio::test]
async fn test_cursor_drains_once() -> Result<()> {
    let (executor, _) = fixtures::executor();
    let (cursor, _connection) = open_cursor(&executor, ConnectionPolicy::CreateAndKeepAlive).await?;

    executor.drain_ref_cursor(&cursor, ExecutionOptions::throwing()).await?;
    let err = executor
        .drain_ref_cursor(&cursor, ExecutionOptions::throwing())
        .await
        .expect_err("cursor already drained");
    assert!(matches!(err, ExecError::StaleCursor(_)));
    Ok(())
}

#[tokio::test]
async fn test_cursor_passed_to_procedure_on_same_connection() -> Result<()> {
    let (executor, driver) = fixtures::executor();
    let (cursor, connection) = open_cursor(&executor, ConnectionPolicy::CreateAndKeepAlive).await?;
    let connection = connection.context("connection kept")?;

    let result = executor
        .execute(
            CommandRequest::procedure(CONNECTION_STRING, commands::CONSUME_CURSOR)
                .with_policy(ConnectionPolicy::ReuseExistingAndClose)
                .with_existing_connection(connection.clone())
                .with_input(ParameterSpec::new("p_cur", OracleDbType::RefCursor, cursor)),
            OutputSpec::new(ReturnShape::XmlString)
                .with_output(ParameterSpec::output("p_columns", OracleDbType::Int32)),
            ExecutionOptions::throwing(),
        )
        .await?;

    assert_eq!(
        result.payload.as_ref().and_then(|p| p.as_text()),
        Some("<Root>\r\n  <p_columns>1</p_columns>\r\n</Root>")
    );
    assert!(!connection.is_live());
    assert_eq!(driver.opened(), 1);
    Ok(())
}

#[tokio::test]
async fn test_cursor_from_another_session_is_rejected_by_server() -> Result<()> {
    let (executor, _) = fixtures::executor();
    let (cursor, connection) = open_cursor(&executor, ConnectionPolicy::CreateAndKeepAlive).await?;

    let err = executor
        .execute(
            CommandRequest::procedure(CONNECTION_STRING, commands::CONSUME_CURSOR)
                .with_input(ParameterSpec::new("p_cur", OracleDbType::RefCursor, cursor)),
            OutputSpec::new(ReturnShape::AffectedRows)
                .with_output(ParameterSpec::output("p_columns", OracleDbType::Int32)),
            ExecutionOptions::throwing(),
        )
        .await
        .expect_err("cursor belongs to another session");

    assert_eq!(err.kind(), ErrorKind::Execution);
    assert!(err.to_string().contains("ORA-01001"));
    connection.context("connection kept")?.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_closed_cursor_input_fails_binding() -> Result<()> {
    let (executor, driver) = fixtures::executor();
    let (cursor, _) = open_cursor(&executor, ConnectionPolicy::CreateAndClose).await?;

    let err = executor
        .execute(
            CommandRequest::procedure(CONNECTION_STRING, commands::CONSUME_CURSOR)
                .with_input(ParameterSpec::new("p_cur", OracleDbType::RefCursor, cursor)),
            OutputSpec::new(ReturnShape::AffectedRows),
            ExecutionOptions::throwing(),
        )
        .await
        .expect_err("cursor session closed");

    assert_eq!(err.kind(), ErrorKind::ParameterBinding);
    assert_eq!(driver.executed().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_cursor_output_in_xml_is_empty_element() -> Result<()> {
    let (executor, _) = fixtures::executor();

    let result = executor
        .execute(
            CommandRequest::new(CONNECTION_STRING, commands::OPEN_CURSOR),
            OutputSpec::new(ReturnShape::XmlString)
                .with_output(ParameterSpec::output("cur", OracleDbType::RefCursor)),
            ExecutionOptions::throwing(),
        )
        .await?;

    assert_eq!(
        result.payload.as_ref().and_then(|p| p.as_text()),
        Some("<Root>\r\n  <cur />\r\n</Root>")
    );
    Ok(())
}

#[tokio::test]
async fn test_drain_parameter_checks_declared_type() -> Result<()> {
    let (executor, _) = fixtures::executor();

    let result = executor
        .execute(
            CommandRequest::new(CONNECTION_STRING, commands::OPEN_CURSOR)
                .with_policy(ConnectionPolicy::CreateAndKeepAlive),
            OutputSpec::new(ReturnShape::RawParameters)
                .with_output(ParameterSpec::output("cur", OracleDbType::RefCursor)),
            ExecutionOptions::throwing(),
        )
        .await?;
    let params = result
        .payload
        .as_ref()
        .and_then(|p| p.as_parameters())
        .context("raw parameters")?;

    let mut mislabeled = params[0].clone();
    mislabeled.db_type = OracleDbType::Varchar2;
    let err = drain_parameter(&mislabeled).await.expect_err("not declared as a cursor");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let rows = drain_parameter(&params[0]).await?;
    assert_eq!(rows.len(), 1);
    Ok(())
}
