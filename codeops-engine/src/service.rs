//! Code operations engine - main entry point

use crate::composer::{compose, content_digest};
use crate::config::EngineConfig;
use crate::dispatch::{DispatchTable, ExecutionRecipe};
use crate::error::{OperationError, Result};
use crate::lock_table::LockTable;
use crate::materializer::{Materializer, ResolvedTarget};
use crate::runtime::{ProcessRunner, ToolRunner};
use crate::types::{decode_capture, ExecutionResult, ToolInvocation};
use crate::validator::{Source, ValidatedRequest, Validator};
use codeops_common::{Language, OperationRequest, OperationResponse};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tracing::Instrument;
use uuid::Uuid;

/// Validates, materializes, locks, runs and reports one code operation per
/// call. Cheap to clone; clones share the lock table and runner.
#[derive(Clone)]
pub struct CodeOpsEngine {
    config: Arc<EngineConfig>,
    dispatch: Arc<DispatchTable>,
    locks: LockTable,
    runner: Arc<dyn ToolRunner>,
    materializer: Materializer,
}

impl CodeOpsEngine {
    /// Create an engine with its own lock table, running tools as subprocesses
    pub fn new(config: EngineConfig) -> Self {
        Self::with_lock_table(config, LockTable::new())
    }

    /// Create an engine sharing an existing lock table
    pub fn with_lock_table(config: EngineConfig, locks: LockTable) -> Self {
        Self::with_runner(config, locks, ProcessRunner::new())
    }

    /// Create an engine with a custom runner implementation
    pub fn with_runner(
        config: EngineConfig,
        locks: LockTable,
        runner: impl ToolRunner + 'static,
    ) -> Self {
        let dispatch = DispatchTable::new(&config);
        let materializer = Materializer::new(config.scratch_dir());
        Self {
            config: Arc::new(config),
            dispatch: Arc::new(dispatch),
            locks,
            runner: Arc::new(runner),
            materializer,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dispatch(&self) -> &DispatchTable {
        &self.dispatch
    }

    pub fn lock_table(&self) -> &LockTable {
        &self.locks
    }

    /// Execute one operation. Never fails: every outcome is a response.
    pub async fn execute(&self, request: OperationRequest) -> OperationResponse {
        let started_at = Instant::now();
        let operation_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "operation",
            %operation_id,
            action = %request.action,
            language = request.language.as_deref().unwrap_or("-"),
        );

        let outcome = self
            .execute_inner(operation_id, request)
            .instrument(span.clone())
            .await;
        let response = compose(outcome, started_at);

        span.in_scope(|| match &response {
            OperationResponse::Ok {
                exit_code, duration, ..
            } => tracing::info!(
                exit_code,
                duration_ms = (duration * 1000.0) as u64,
                "Operation finished"
            ),
            OperationResponse::Error { error, duration } => tracing::info!(
                code = %error.code,
                message = %error.message,
                duration_ms = (duration * 1000.0) as u64,
                "Operation failed"
            ),
        });
        response
    }

    async fn execute_inner(
        &self,
        operation_id: Uuid,
        request: OperationRequest,
    ) -> Result<ExecutionResult> {
        let validator = Validator::new(&self.config, &self.dispatch);
        let validated = validator.validate(&request)?;
        tracing::debug!(args = validated.args.len(), "Request validated");

        let content_hash = match &validated.source {
            Source::Content(content) => Some(content_digest(content)),
            Source::Path(_) => None,
        };
        let extension = validated
            .language
            .map(Language::default_extension)
            .unwrap_or("txt");

        let target = self
            .materializer
            .materialize(&validated.source, extension)
            .await?;
        let recipe = validator.resolve_recipe(&validated)?;
        let lock = self.locks.acquire(target.resource_key(), operation_id)?;
        tracing::debug!(
            resource_key = %target.resource_key().display(),
            ephemeral = target.is_ephemeral(),
            "Target locked"
        );

        let result = match recipe {
            Some(recipe) => self.run_tool(&validated, recipe, &target).await,
            None => explain(&target, self.config.max_output_bytes).await,
        };

        self.locks.release(lock);
        drop(target);

        result.map(|result| result.with_content_hash(content_hash))
    }

    async fn run_tool(
        &self,
        validated: &ValidatedRequest,
        recipe: &ExecutionRecipe,
        target: &ResolvedTarget,
    ) -> Result<ExecutionResult> {
        let argv = recipe.argv(&validated.args, target.resource_key());
        let mut invocation =
            ToolInvocation::from_argv(argv, recipe.timeout, self.config.max_output_bytes);
        if let Some(dir) = target.working_dir() {
            invocation = invocation.with_current_dir(dir);
        }

        tracing::debug!(
            runner = self.runner.name(),
            program = %invocation.program_name(),
            timeout = ?recipe.timeout,
            "Running tool"
        );
        let output = self.runner.run(invocation).await?;

        if recipe
            .exit_semantics
            .found_no_tests(output.exit_code, &output.stdout)
        {
            return Err(OperationError::NoTestsFound(format!(
                "No tests were found in {}",
                target.resource_key().display()
            )));
        }

        Ok(ExecutionResult::from_output(output))
    }
}

/// Return the file's text as the operation's output, capped like a tool's stdout
async fn explain(target: &ResolvedTarget, max_output_bytes: usize) -> Result<ExecutionResult> {
    let unreadable = |e: std::io::Error| {
        OperationError::FileNotFound(format!(
            "Cannot read {}: {}",
            target.resource_key().display(),
            e
        ))
    };

    let file = tokio::fs::File::open(target.resource_key())
        .await
        .map_err(unreadable)?;
    let mut bytes = Vec::new();
    file.take((max_output_bytes as u64).saturating_add(1))
        .read_to_end(&mut bytes)
        .await
        .map_err(unreadable)?;

    let truncated = bytes.len() > max_output_bytes;
    bytes.truncate(max_output_bytes);

    Ok(ExecutionResult {
        stdout: decode_capture(&bytes, truncated),
        stderr: String::new(),
        exit_code: 0,
        content_hash: None,
    })
}
