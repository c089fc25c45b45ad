//! Error reporting tests
//!
//! Covers how failures leave the executor: as errors or as unsuccessful
//! results, depending on the options, and what happens to the connection.

use std::sync::Arc;

use anyhow::{Context, Result};
use indoc::indoc;
use oraexec_command::{
    CommandExecutor, CommandRequest, ConnectionPolicy, ErrorKind, ExecError, ExecutionOptions,
    ExecutorConfig, OutputSpec, ReturnShape,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::fixtures::{self, CONNECTION_STRING, commands};

/// Fails with InvalidArgument before a connection is opened
fn caller_error() -> CommandRequest {
    CommandRequest::new(CONNECTION_STRING, commands::INSERT)
        .with_policy(ConnectionPolicy::ReuseExistingAndKeepAlive)
}

/// Fails with ORA-20001 inside the database
fn operational_error() -> CommandRequest {
    CommandRequest::procedure(CONNECTION_STRING, commands::RAISE)
}

fn options(throw_on_failure: bool, propagate_caller_errors: bool) -> ExecutionOptions {
    ExecutionOptions {
        throw_on_failure,
        propagate_caller_errors,
    }
}

#[rstest]
#[case::caller_captured(caller_error(), options(false, false), false)]
#[case::caller_propagated(caller_error(), options(false, true), true)]
#[case::caller_thrown(caller_error(), options(true, false), true)]
#[case::operational_captured(operational_error(), options(false, false), false)]
#[case::operational_not_a_caller_error(operational_error(), options(false, true), false)]
#[case::operational_thrown(operational_error(), options(true, false), true)]
#[tokio::test]
async fn test_failure_reporting(
    #[case] request: CommandRequest,
    #[case] options: ExecutionOptions,
    #[case] raised: bool,
) -> Result<()> {
    let (executor, _) = fixtures::executor();

    let outcome = executor
        .execute(request, OutputSpec::new(ReturnShape::AffectedRows), options)
        .await;

    match outcome {
        Err(_) => assert!(raised, "error escaped in non-throwing mode"),
        Ok(result) => {
            assert!(!raised, "error was captured in throwing mode");
            assert!(!result.success);
            assert!(result.payload.is_none());
            assert!(result.message.is_some_and(|m| !m.is_empty()));
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_captured_message_is_error_text() -> Result<()> {
    let (executor, driver) = fixtures::executor();

    let result = executor
        .execute(
            operational_error().with_policy(ConnectionPolicy::CreateAndKeepAlive),
            OutputSpec::new(ReturnShape::XmlString),
            ExecutionOptions::default(),
        )
        .await?;

    assert_eq!(
        result.message.as_deref(),
        Some("Execution error: ORA-20001: application error raised by PKG_TEST.RAISE")
    );
    assert!(result.connection.is_none());
    assert_eq!(driver.open_sessions(), 0);
    Ok(())
}

#[tokio::test]
async fn test_unknown_command_is_execution_error() -> Result<()> {
    let (executor, _) = fixtures::executor();

    let err = executor
        .execute(
            CommandRequest::new(CONNECTION_STRING, "DELETE FROM missing"),
            OutputSpec::new(ReturnShape::AffectedRows),
            ExecutionOptions::throwing(),
        )
        .await
        .expect_err("no script for the command");

    assert_eq!(err.kind(), ErrorKind::Execution);
    assert!(err.to_string().contains("ORA-06550"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_timeout_aborts_slow_command() -> Result<()> {
    let (executor, driver) = fixtures::executor();

    let err = executor
        .execute(
            CommandRequest::procedure(CONNECTION_STRING, commands::SLOW).with_timeout_seconds(5),
            OutputSpec::new(ReturnShape::AffectedRows),
            ExecutionOptions::throwing(),
        )
        .await
        .expect_err("command outlives its timeout");

    assert!(matches!(err, ExecError::Timeout { seconds: 5 }));
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(err.to_string(), "Execution error: command timed out after 5 seconds");
    assert_eq!(driver.open_sessions(), 0);
    Ok(())
}

#[rstest]
#[case::no_limit(0)]
#[case::generous(120)]
#[tokio::test(start_paused = true)]
async fn test_slow_command_within_timeout(#[case] timeout_seconds: u64) -> Result<()> {
    let (executor, _) = fixtures::executor();

    let result = executor
        .execute(
            CommandRequest::procedure(CONNECTION_STRING, commands::SLOW)
                .with_timeout_seconds(timeout_seconds),
            OutputSpec::new(ReturnShape::AffectedRows),
            ExecutionOptions::throwing(),
        )
        .await?;

    assert!(result.success);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_configuration_drives_defaults() -> Result<()> {
    fixtures::init_tracing();
    let config = ExecutorConfig::from_toml_str(indoc! {r#"
        command_timeout_seconds = 2
        throw_on_failure = true
    "#})?;
    let driver = Arc::new(fixtures::scripted_driver());
    let executor = CommandExecutor::from_config(driver, &config);

    let err = executor
        .execute(
            executor.request(CONNECTION_STRING, commands::SLOW),
            OutputSpec::new(ReturnShape::AffectedRows),
            executor.default_options(),
        )
        .await
        .expect_err("configured timeout and throw mode apply");
    assert!(matches!(err, ExecError::Timeout { seconds: 2 }));

    let ok = executor
        .execute(
            executor.request(CONNECTION_STRING, commands::GET_GREETING),
            OutputSpec::new(ReturnShape::AffectedRows),
            executor.default_options(),
        )
        .await;
    let err = ok.expect_err("returnVal is not bound");
    assert!(err.to_string().contains("returnVal"));
    Ok(())
}

#[test]
fn test_invalid_configuration() -> Result<()> {
    let err = ExecutorConfig::from_toml_str("[cache]\nmax_idle_ms = -1").expect_err("negative idle");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let config = ExecutorConfig::from_toml_str("")?;
    assert_eq!(config.command_timeout_seconds, 30);
    assert!(config.cache.max_idle().is_none());
    let text = config.to_toml_string()?;
    assert_eq!(ExecutorConfig::from_toml_str(&text)?, config);
    Ok(())
}

#[tokio::test]
async fn test_failed_result_has_no_stray_connection() -> Result<()> {
    let (executor, driver) = fixtures::executor();

    for _ in 0..3 {
        let result = executor
            .execute(operational_error(), OutputSpec::new(ReturnShape::XmlString), ExecutionOptions::default())
            .await?;
        assert!(!result.success);
    }

    assert_eq!(driver.opened(), 3);
    assert_eq!(driver.open_sessions(), 0);
    let first = driver.sessions().first().cloned().context("a session was opened")?;
    assert!(first.is_closed());
    Ok(())
}
