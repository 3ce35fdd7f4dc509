//! Builds the uniform response from a stage outcome

use crate::error::Result;
use crate::types::ExecutionResult;
use codeops_common::OperationResponse;
use sha2::{Digest, Sha256};
use std::time::Instant;

/// SHA-256 of the exact bytes written for inline content, lowercase hex
pub fn content_digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Wrap a result or error into a response. `duration` is measured up to now.
pub fn compose(outcome: Result<ExecutionResult>, started_at: Instant) -> OperationResponse {
    let duration = started_at.elapsed().as_secs_f64();
    match outcome {
        Ok(result) => OperationResponse::Ok {
            stdout: result.stdout,
            stderr: result.stderr,
            exit_code: result.exit_code,
            duration,
            content_hash: result.content_hash,
        },
        Err(err) => OperationResponse::Error {
            error: err.to_body(),
            duration,
        },
    }
}
