//! Tool runner trait and implementations

mod process;

use crate::types::{ToolInvocation, ToolOutput};
use crate::Result;
use async_trait::async_trait;

pub use process::ProcessRunner;

/// Runner abstraction for launching an external tool
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the invocation to completion and return its captured output.
    ///
    /// A non-zero exit code is returned as output. Errors are reserved for
    /// tools that could not be started or did not finish within the timeout.
    async fn run(&self, invocation: ToolInvocation) -> Result<ToolOutput>;

    /// Get runner name
    fn name(&self) -> &str;
}
