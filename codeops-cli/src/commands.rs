//! CLI command implementations

use anyhow::{Context, Result};
use codeops_common::{Action, Language, OperationRequest};
use codeops_engine::{CodeOpsEngine, DispatchTable, EngineConfig};
use std::fmt::Write as _;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;

/// Install the global subscriber: stderr always, plus an optional log file.
///
/// The returned guard flushes the file writer and must live until exit.
pub fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = if verbose { "debug" } else { "info" };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .context("Log file path has no file name")?;
            let file_appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "codeops_engine={},codeops_cli={}",
                    log_level, log_level
                ))
            }),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

/// Assemble a request from command-line flags
pub fn build_request(
    action: Action,
    language: Option<String>,
    path: Option<String>,
    content: Option<String>,
    args: Vec<String>,
) -> OperationRequest {
    OperationRequest {
        action,
        language,
        path,
        content,
        args: (!args.is_empty()).then_some(args),
    }
}

/// Parse a JSON request from stdin
pub async fn read_request_from_stdin() -> Result<OperationRequest> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read request from stdin")?;
    parse_request(&input)
}

pub fn parse_request(input: &str) -> Result<OperationRequest> {
    serde_json::from_str(input).context("Invalid request JSON")
}

/// Run one request and print the response. Returns whether it succeeded.
pub async fn execute(engine: &CodeOpsEngine, request: OperationRequest, pretty: bool) -> Result<bool> {
    debug!(action = %request.action, "Executing request from CLI");
    let response = engine.execute(request).await;

    let rendered = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{}", rendered);

    Ok(response.is_ok())
}

/// One line per recipe: language, action, command line and allowed flags
pub fn format_recipes(dispatch: &DispatchTable, language: Option<Language>) -> String {
    let mut out = String::new();
    for (lang, action, recipe) in dispatch.entries() {
        if language.is_some_and(|wanted| wanted != lang) {
            continue;
        }

        let mut command = recipe.executable.clone();
        for arg in &recipe.fixed_args {
            command.push(' ');
            command.push_str(arg);
        }

        let _ = writeln!(
            out,
            "{:<10} {:<7} {:<32} timeout={:?}",
            lang.as_str(),
            action.as_str(),
            command,
            recipe.timeout
        );
        if recipe.accepts_user_args {
            let _ = writeln!(out, "    args: {}", recipe.allowed_args_summary());
        }
    }
    out
}

pub fn format_config(config: &EngineConfig) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to render configuration")
}
