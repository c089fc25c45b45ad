//! Command execution
//!
//! A call runs through a fixed sequence: acquire a connection, bind the
//! parameters, execute as a non-query, collect the output parameters,
//! materialize them, and release the connection. Every failure along the
//! way is caught at the entry point and either returned as an error or
//! folded into an unsuccessful [`ExecutionResult`], depending on the
//! [`ExecutionOptions`].

mod stage;

use std::sync::Arc;
use std::time::Duration;

use oraexec_connection::{ConnectionBroker, ConnectionCache, ConnectionHandle};
use oraexec_core::{
    Connection, ConnectionString, DatabaseDriver, ExecError, NativeCommand, NativeParameter, Result,
    Value,
};

pub use stage::ExecutionStage;
use stage::StageTracker;

use crate::config::ExecutorConfig;
use crate::cursor_reader::drain;
use crate::parameters::{bind_all, check_placeholders};
use crate::request::{CommandRequest, ExecutionOptions, ExecutionResult, OutputSpec};
use crate::result::{Payload, materialize};

/// Runs commands through a driver
///
/// Two ways of getting a connection are offered as separate entry points:
/// [`execute`](Self::execute) follows the request's connection policy, and
/// [`execute_cached`](Self::execute_cached) uses the executor's connection
/// cache keyed by connection string.
pub struct CommandExecutor {
    broker: ConnectionBroker,
    cache: Arc<ConnectionCache>,
    config: ExecutorConfig,
}

impl CommandExecutor {
    /// Create an executor with default configuration and its own cache
    pub fn new(driver: Arc<dyn DatabaseDriver>) -> Self {
        Self::from_config(driver, &ExecutorConfig::default())
    }

    /// Create an executor sharing an existing connection cache
    pub fn with_cache(driver: Arc<dyn DatabaseDriver>, cache: Arc<ConnectionCache>) -> Self {
        Self {
            broker: ConnectionBroker::new(driver),
            cache,
            config: ExecutorConfig::default(),
        }
    }

    /// Create an executor from configuration, with a cache configured by it
    pub fn from_config(driver: Arc<dyn DatabaseDriver>, config: &ExecutorConfig) -> Self {
        let cache = Arc::new(ConnectionCache::new(driver.clone(), config.cache.clone()));
        Self {
            broker: ConnectionBroker::new(driver),
            cache,
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Get the connection cache used by [`execute_cached`](Self::execute_cached)
    pub fn cache(&self) -> &Arc<ConnectionCache> {
        &self.cache
    }

    /// A request carrying this executor's configured timeout and binding mode
    pub fn request(
        &self,
        connection_string: impl Into<String>,
        command_text: impl Into<String>,
    ) -> CommandRequest {
        CommandRequest::new(connection_string, command_text)
            .with_timeout_seconds(self.config.command_timeout_seconds)
            .with_bind_by_name(self.config.bind_by_name)
    }

    /// Failure reporting options from this executor's configuration
    pub fn default_options(&self) -> ExecutionOptions {
        ExecutionOptions {
            throw_on_failure: self.config.throw_on_failure,
            propagate_caller_errors: self.config.propagate_caller_errors,
        }
    }

    /// Execute a command on a connection obtained per `request.policy`.
    ///
    /// Create policies open a new connection; reuse policies run on
    /// `request.existing_connection`. Close policies close the connection
    /// afterwards, keep-alive policies return it in the result. On failure a
    /// connection this call opened is always closed, and a timed-out
    /// connection is closed whatever the policy.
    #[tracing::instrument(skip_all, fields(command = %preview(&request.command_text), kind = ?request.command_kind, policy = ?request.policy, shape = %output.return_shape))]
    pub async fn execute(
        &self,
        request: CommandRequest,
        output: OutputSpec,
        options: ExecutionOptions,
    ) -> Result<ExecutionResult> {
        let outcome = self.execute_with_policy(&request, &output).await;
        report(outcome, options)
    }

    async fn execute_with_policy(
        &self,
        request: &CommandRequest,
        output: &OutputSpec,
    ) -> Result<ExecutionResult> {
        let mut stage = StageTracker::new();

        let handle = match self.acquire(request).await {
            Ok(handle) => handle,
            Err(e) => {
                stage.fail();
                return Err(e);
            }
        };
        stage.advance(ExecutionStage::ConnectionAcquired);

        match run(handle.connection(), request, output, &mut stage).await {
            Ok(payload) => {
                // the command already ran; a failed close does not undo it
                let kept = match self.broker.release(handle, request.policy).await {
                    Ok(kept) => kept,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to close connection after success");
                        None
                    }
                };
                stage.advance(ExecutionStage::Released);
                Ok(ExecutionResult::succeeded(payload, kept))
            }
            Err(e) => {
                let failed_in = stage.fail();
                tracing::debug!(stage = %failed_in, error = %e, "command failed");
                if aborted(&e) || request.policy.creates_new() || request.policy.closes_after() {
                    if let Err(close_err) = handle.close().await {
                        tracing::warn!(error = %close_err, "failed to close connection after failure");
                    }
                }
                Err(e)
            }
        }
    }

    async fn acquire(&self, request: &CommandRequest) -> Result<ConnectionHandle> {
        validate(request)?;
        if !request.policy.creates_new() {
            return self
                .broker
                .reuse(request.policy, request.existing_connection.as_ref());
        }
        let connection_string = ConnectionString::parse(&request.connection_string)?;
        self.broker
            .acquire(
                &connection_string,
                request.policy,
                request.existing_connection.as_ref(),
            )
            .await
    }

    /// Execute a command on the cached connection for its connection string.
    ///
    /// The connection is opened on first use and stays in the cache after
    /// the call; the result carries a handle to it. The request's policy and
    /// existing connection are not used. A connection whose command timed
    /// out is closed and dropped from the cache.
    #[tracing::instrument(skip_all, fields(command = %preview(&request.command_text), kind = ?request.command_kind, shape = %output.return_shape))]
    pub async fn execute_cached(
        &self,
        request: CommandRequest,
        output: OutputSpec,
        options: ExecutionOptions,
    ) -> Result<ExecutionResult> {
        let outcome = self.execute_on_cache(&request, &output).await;
        report(outcome, options)
    }

    async fn execute_on_cache(
        &self,
        request: &CommandRequest,
        output: &OutputSpec,
    ) -> Result<ExecutionResult> {
        let mut stage = StageTracker::new();

        if request.existing_connection.is_some() {
            tracing::debug!("existing connection is not used by cached execution");
        }

        let acquired = match validate(request)
            .and_then(|()| ConnectionString::parse(&request.connection_string))
        {
            Ok(connection_string) => self
                .cache
                .checkout(&connection_string)
                .await
                .map(|lease| (connection_string, lease)),
            Err(e) => Err(e),
        };
        let (connection_string, lease) = match acquired {
            Ok(acquired) => acquired,
            Err(e) => {
                stage.fail();
                return Err(e);
            }
        };
        stage.advance(ExecutionStage::ConnectionAcquired);

        let outcome = run(lease.connection(), request, output, &mut stage).await;
        let handle = lease.handle().clone();
        match outcome {
            Ok(payload) => {
                drop(lease);
                stage.advance(ExecutionStage::Released);
                Ok(ExecutionResult::succeeded(payload, Some(handle)))
            }
            Err(e) => {
                let failed_in = stage.fail();
                tracing::debug!(stage = %failed_in, error = %e, "command failed on cached connection");
                if aborted(&e) {
                    self.cache.invalidate(&connection_string, &handle).await;
                }
                drop(lease);
                Err(e)
            }
        }
    }

    /// Drain a ref cursor returned by an earlier call into rows.
    ///
    /// The connection that produced the cursor must still be open.
    #[tracing::instrument(skip_all)]
    pub async fn drain_ref_cursor(
        &self,
        cursor: &Value,
        options: ExecutionOptions,
    ) -> Result<ExecutionResult> {
        let outcome = drain(cursor)
            .await
            .map(|rows| ExecutionResult::succeeded(Payload::Rows(rows), None));
        report(outcome, options)
    }

    /// Close and forget every cached connection. Returns how many were
    /// cached.
    pub async fn clear_connection_cache(&self) -> usize {
        self.cache.clear().await
    }
}

/// A call cut off mid-flight leaves its session in an unknown state
fn aborted(e: &ExecError) -> bool {
    matches!(e, ExecError::Timeout { .. })
}

fn validate(request: &CommandRequest) -> Result<()> {
    if request.command_text.trim().is_empty() {
        return Err(ExecError::InvalidArgument(
            "command text must not be empty".into(),
        ));
    }
    Ok(())
}

/// Bind, execute and materialize on an acquired connection
async fn run(
    connection: &Arc<dyn Connection>,
    request: &CommandRequest,
    output: &OutputSpec,
    stage: &mut StageTracker,
) -> Result<Payload> {
    let mut command = NativeCommand::new(request.command_text.as_str(), request.command_kind)
        .with_timeout_seconds(request.timeout_seconds)
        .with_bind_by_name(request.bind_by_name);
    command.parameters = bind_all(&request.input_parameters, &output.output_parameters)?;
    check_placeholders(&command)?;
    stage.advance(ExecutionStage::ParametersBound);

    let affected_rows = execute_non_query(connection.as_ref(), &mut command).await?;
    stage.advance(ExecutionStage::Executed);
    tracing::info!(
        affected_rows,
        session_id = %connection.session_id(),
        "command executed"
    );

    let outputs: Vec<NativeParameter> = command
        .parameters
        .into_iter()
        .filter(|p| p.is_output())
        .collect();
    let payload = materialize(&outputs, affected_rows, output.return_shape)?;
    stage.advance(ExecutionStage::ResultMaterialized);
    Ok(payload)
}

/// Run the driver call, bounded by the command timeout unless it is 0
async fn execute_non_query(connection: &dyn Connection, command: &mut NativeCommand) -> Result<u64> {
    let seconds = command.timeout_seconds;
    if seconds == 0 {
        return connection.execute_non_query(command).await;
    }
    tokio::time::timeout(
        Duration::from_secs(seconds),
        connection.execute_non_query(command),
    )
    .await
    .map_err(|_| ExecError::Timeout { seconds })?
}

/// Apply the failure reporting options to the outcome of a call
fn report(outcome: Result<ExecutionResult>, options: ExecutionOptions) -> Result<ExecutionResult> {
    match outcome {
        Ok(result) => Ok(result),
        Err(e) if options.throw_on_failure || (options.propagate_caller_errors && e.is_caller_error()) => {
            tracing::error!(error = %e, kind = ?e.kind(), "command failed");
            Err(e)
        }
        Err(e) => {
            tracing::warn!(error = %e, kind = ?e.kind(), "command failed, returning unsuccessful result");
            Ok(ExecutionResult::failed(e.to_string()))
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}
