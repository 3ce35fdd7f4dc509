//! Code operations engine
//!
//! Runs, lints, tests, fixes, formats and explains source files on behalf of
//! an already-authenticated caller. Each request is validated, materialized to
//! a file, locked per resource, dispatched to a fixed tool recipe and run as a
//! subprocess with a timeout. Every outcome is a uniform response.

pub mod composer;
pub mod config;
pub mod dispatch;
mod error;
pub mod lock_table;
pub mod materializer;
mod runtime;
mod service;
mod types;
pub mod validator;

pub use composer::{compose, content_digest};
pub use config::{ActionTimeouts, ConfigError, EngineConfig};
pub use dispatch::{ArgRule, DispatchTable, ExecutionRecipe, ExitSemantics};
pub use error::{OperationError, Result};
pub use lock_table::{LockHandle, LockHolder, LockStats, LockTable};
pub use materializer::{Materializer, ResolvedTarget};
pub use runtime::{ProcessRunner, ToolRunner};
pub use service::CodeOpsEngine;
pub use types::{ExecutionResult, ToolInvocation, ToolOutput, TRUNCATION_MARKER};
pub use validator::{Source, ValidatedRequest, Validator};

pub use codeops_common::{Action, ErrorCode, Language, OperationRequest, OperationResponse};
