mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codeops_common::{Action, Language};
use codeops_engine::{CodeOpsEngine, EngineConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "codeops")]
#[command(about = "Run, lint, test, fix, format and explain source files")]
#[command(version)]
pub struct Cli {
    /// Config file (default: $CODEOPS_CONFIG, then ~/.config/codeops/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute one operation and print the JSON response
    Exec {
        /// Action to perform (run, lint, test, fix, format, explain)
        #[arg(required_unless_present = "json")]
        action: Option<Action>,

        /// Source language (python, javascript, bash, node)
        #[arg(short, long)]
        language: Option<String>,

        /// Target file
        #[arg(short, long)]
        path: Option<String>,

        /// Inline source code, used instead of the file when both are given
        #[arg(short, long)]
        content: Option<String>,

        /// Read the whole request as JSON from stdin
        #[arg(long, conflicts_with_all = ["action", "language", "path", "content"])]
        json: bool,

        /// Pretty-print the response
        #[arg(long)]
        pretty: bool,

        /// Extra tool arguments, after `--`
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// List supported (language, action) pairs and their tools
    Recipes {
        /// Only show recipes for this language
        #[arg(short, long)]
        language: Option<Language>,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _guard = commands::init_tracing(cli.verbose, cli.log_file.as_deref())?;

    let config =
        EngineConfig::resolve(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Exec {
            action,
            language,
            path,
            content,
            json,
            pretty,
            args,
        } => {
            let request = if json {
                commands::read_request_from_stdin().await?
            } else {
                let action = action.context("An action is required")?;
                commands::build_request(action, language, path, content, args)
            };

            let engine = CodeOpsEngine::new(config);
            let succeeded = commands::execute(&engine, request, pretty).await?;
            Ok(if succeeded {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Recipes { language } => {
            let engine = CodeOpsEngine::new(config);
            print!("{}", commands::format_recipes(engine.dispatch(), language));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config => {
            print!("{}", commands::format_config(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
