//! Connection cache tests
//!
//! Tests for the string-keyed execution mode: reuse across calls, creation
//! races between concurrent callers, idle expiry and clearing.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use oraexec_command::{
    CacheConfig, CommandExecutor, CommandRequest, ConnectionCache, ConnectionPolicy, ErrorKind,
    ExecError, ExecutionOptions, ExecutionResult, ExecutorConfig, OutputSpec, ParameterSpec,
    ReturnShape,
};
use oraexec_core::OracleDbType;
use pretty_assertions::assert_eq;

use crate::fixtures::{
    self, CONNECTION_STRING, OTHER_CONNECTION_STRING, UNREACHABLE_CONNECTION_STRING, commands,
};

fn insert(connection_string: &str) -> CommandRequest {
    CommandRequest::new(connection_string, commands::INSERT)
        .with_input(ParameterSpec::new("p", OracleDbType::Varchar2, "x"))
}

fn affected_rows() -> OutputSpec {
    OutputSpec::new(ReturnShape::AffectedRows)
}

async fn cached_insert(executor: &CommandExecutor, connection_string: &str) -> Result<ExecutionResult> {
    Ok(executor
        .execute_cached(insert(connection_string), affected_rows(), ExecutionOptions::throwing())
        .await?)
}

#[tokio::test]
async fn test_cached_connection_reused() -> Result<()> {
    let (executor, driver) = fixtures::executor();

    let first = cached_insert(&executor, CONNECTION_STRING).await?;
    let second = cached_insert(&executor, CONNECTION_STRING).await?;
    let third = cached_insert(&executor, CONNECTION_STRING).await?;

    let first = first.connection.context("cached call returns its connection")?;
    assert!(first.same_connection(&second.connection.context("second handle")?));
    assert!(first.same_connection(&third.connection.context("third handle")?));
    assert!(first.is_live());

    let stats = executor.cache().stats();
    assert_eq!(driver.opened(), 1);
    assert_eq!(stats.entries(), 1);
    assert_eq!(stats.opened(), 1);
    assert_eq!(stats.reused(), 2);
    Ok(())
}

#[tokio::test]
async fn test_connection_strings_are_separate_keys() -> Result<()> {
    let (executor, driver) = fixtures::executor();

    let a = cached_insert(&executor, CONNECTION_STRING).await?;
    let b = cached_insert(&executor, OTHER_CONNECTION_STRING).await?;

    assert!(!a.connection.context("a")?.same_connection(&b.connection.context("b")?));
    assert_eq!(executor.cache().len(), 2);
    assert_eq!(driver.opened(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_retain_one_connection() -> Result<()> {
    fixtures::init_tracing();
    let driver = Arc::new(fixtures::scripted_driver().with_connect_delay(Duration::from_millis(50)));
    let executor = CommandExecutor::new(driver.clone());

    let results = join_all((0..8).map(|_| cached_insert(&executor, CONNECTION_STRING))).await;
    let handles = results
        .into_iter()
        .map(|r| r?.connection.context("cached call returns its connection"))
        .collect::<Result<Vec<_>>>()?;

    assert_eq!(executor.cache().len(), 1);
    assert_eq!(driver.open_sessions(), 1);
    assert!(handles.iter().all(|h| h.same_connection(&handles[0]) && h.is_live()));

    let stats = executor.cache().stats();
    assert_eq!(stats.opened(), 1);
    assert_eq!(stats.discarded() as usize, driver.opened() - 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_idle_connection_replaced() -> Result<()> {
    fixtures::init_tracing();
    let driver = Arc::new(fixtures::scripted_driver());
    let config = ExecutorConfig {
        cache: CacheConfig::new().with_max_idle_ms(1_000),
        ..ExecutorConfig::default()
    };
    let executor = CommandExecutor::from_config(driver.clone(), &config);

    let first = cached_insert(&executor, CONNECTION_STRING)
        .await?
        .connection
        .context("first handle")?;
    tokio::time::advance(Duration::from_millis(500)).await;
    cached_insert(&executor, CONNECTION_STRING).await?;
    assert!(first.is_live());

    tokio::time::advance(Duration::from_secs(2)).await;
    let replaced = cached_insert(&executor, CONNECTION_STRING)
        .await?
        .connection
        .context("replacement handle")?;

    assert!(!first.is_live());
    assert!(!replaced.same_connection(&first));
    assert_eq!(driver.opened(), 2);
    assert_eq!(executor.cache().stats().expired(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_connections_never_expire_by_default() -> Result<()> {
    let (executor, driver) = fixtures::executor();

    cached_insert(&executor, CONNECTION_STRING).await?;
    tokio::time::advance(Duration::from_secs(24 * 60 * 60)).await;
    cached_insert(&executor, CONNECTION_STRING).await?;

    assert_eq!(driver.opened(), 1);
    assert_eq!(executor.cache().evict_idle().await, 0);
    assert_eq!(executor.cache().stats().expired(), 0);
    Ok(())
}

#[tokio::test]
async fn test_clear_closes_everything() -> Result<()> {
    let (executor, driver) = fixtures::executor();

    cached_insert(&executor, CONNECTION_STRING).await?;
    cached_insert(&executor, OTHER_CONNECTION_STRING).await?;
    assert_eq!(driver.open_sessions(), 2);

    assert_eq!(executor.clear_connection_cache().await, 2);
    assert!(executor.cache().is_empty());
    assert_eq!(driver.open_sessions(), 0);

    cached_insert(&executor, CONNECTION_STRING).await?;
    assert_eq!(driver.opened(), 3);
    Ok(())
}

#[tokio::test]
async fn test_cache_shared_between_executors() -> Result<()> {
    fixtures::init_tracing();
    let driver = Arc::new(fixtures::scripted_driver());
    let cache = Arc::new(ConnectionCache::new(driver.clone(), CacheConfig::new()));
    let a = CommandExecutor::with_cache(driver.clone(), cache.clone());
    let b = CommandExecutor::with_cache(driver.clone(), cache.clone());

    cached_insert(&a, CONNECTION_STRING).await?;
    cached_insert(&b, CONNECTION_STRING).await?;

    assert_eq!(driver.opened(), 1);
    assert_eq!(cache.stats().reused(), 1);
    Ok(())
}

#[tokio::test]
async fn test_closed_cached_connection_reopened() -> Result<()> {
    let (executor, driver) = fixtures::executor();

    let handle = cached_insert(&executor, CONNECTION_STRING)
        .await?
        .connection
        .context("cached handle")?;
    handle.close().await?;

    let reopened = cached_insert(&executor, CONNECTION_STRING)
        .await?
        .connection
        .context("reopened handle")?;
    assert!(reopened.is_live());
    assert_eq!(driver.opened(), 2);
    assert_eq!(executor.cache().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failures_in_cached_mode() -> Result<()> {
    let (executor, _) = fixtures::executor();

    let result = executor
        .execute_cached(insert(UNREACHABLE_CONNECTION_STRING), affected_rows(), ExecutionOptions::default())
        .await?;
    assert!(!result.success);
    assert!(executor.cache().is_empty());

    let err = executor
        .execute_cached(
            CommandRequest::procedure(CONNECTION_STRING, commands::RAISE),
            affected_rows(),
            ExecutionOptions::throwing(),
        )
        .await
        .expect_err("procedure raises");
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(executor.cache().len(), 1);
    assert!(
        executor
            .cache()
            .get(&CONNECTION_STRING.parse()?)
            .is_some_and(|h| h.is_live())
    );
    Ok(())
}

#[tokio::test]
async fn test_cached_mode_ignores_policy() -> Result<()> {
    let (executor, driver) = fixtures::executor();

    let result = executor
        .execute_cached(
            insert(CONNECTION_STRING).with_policy(ConnectionPolicy::ReuseExistingAndClose),
            affected_rows(),
            ExecutionOptions::throwing(),
        )
        .await?;

    assert!(result.success);
    assert!(result.connection.context("cached handle")?.is_live());
    assert_eq!(driver.open_sessions(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_running_command_survives_idle_expiry() -> Result<()> {
    fixtures::init_tracing();
    let driver = Arc::new(fixtures::scripted_driver());
    let config = ExecutorConfig {
        cache: CacheConfig::new().with_max_idle_ms(1_000),
        ..ExecutorConfig::default()
    };
    let executor = CommandExecutor::from_config(driver.clone(), &config);

    let slow = executor.execute_cached(
        CommandRequest::procedure(CONNECTION_STRING, commands::SLOW).with_timeout_seconds(0),
        affected_rows(),
        ExecutionOptions::throwing(),
    );
    let second = async {
        tokio::time::sleep(Duration::from_secs(2)).await;
        cached_insert(&executor, CONNECTION_STRING).await
    };
    let (slow, second) = tokio::join!(slow, second);

    let slow = slow?.connection.context("slow call returns its connection")?;
    let second = second?.connection.context("second call returns its connection")?;
    assert!(slow.same_connection(&second));
    assert!(slow.is_live());
    assert_eq!(driver.opened(), 1);
    assert_eq!(executor.cache().stats().expired(), 0);

    // once both calls are done the entry idles out as usual
    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(executor.cache().evict_idle().await, 1);
    assert!(!slow.is_live());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_connection_leaves_cache() -> Result<()> {
    let (executor, driver) = fixtures::executor();

    let err = executor
        .execute_cached(
            CommandRequest::procedure(CONNECTION_STRING, commands::SLOW).with_timeout_seconds(5),
            affected_rows(),
            ExecutionOptions::throwing(),
        )
        .await
        .expect_err("command outlives its timeout");
    assert!(matches!(err, ExecError::Timeout { seconds: 5 }));
    assert!(executor.cache().get(&CONNECTION_STRING.parse()?).is_none());
    assert_eq!(driver.open_sessions(), 0);

    let fresh = cached_insert(&executor, CONNECTION_STRING)
        .await?
        .connection
        .context("fresh handle")?;
    assert!(fresh.is_live());
    assert_eq!(driver.opened(), 2);
    Ok(())
}
