//! Core types passed between the engine stages

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Marker appended to a stream that hit the capture cap
pub const TRUNCATION_MARKER: &str = "\n[output truncated]\n";

/// Decode captured bytes, marking the text when the capture hit its cap
pub(crate) fn decode_capture(bytes: &[u8], truncated: bool) -> String {
    let mut text = String::from_utf8_lossy(bytes).into_owned();
    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }
    text
}

/// A fully resolved subprocess invocation
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// Program to launch, resolved through `PATH` when not absolute
    pub program: OsString,

    /// Arguments after the program name
    pub args: Vec<OsString>,

    /// Wall-clock limit
    pub timeout: Duration,

    /// Per-stream capture cap in bytes
    pub max_output_bytes: usize,

    /// Working directory for the child (inherited when unset)
    pub current_dir: Option<PathBuf>,
}

impl ToolInvocation {
    /// Build from an argument vector whose first element is the program
    pub fn from_argv(argv: Vec<OsString>, timeout: Duration, max_output_bytes: usize) -> Self {
        let mut argv = argv.into_iter();
        let program = argv.next().unwrap_or_default();
        Self {
            program,
            args: argv.collect(),
            timeout,
            max_output_bytes,
            current_dir: None,
        }
    }

    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Program name for logs and error messages
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }
}

/// Captured output of a finished tool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub elapsed: Duration,
    /// Whether either stream hit the capture cap
    pub truncated: bool,
}

/// Outcome of a successful operation, before it is wrapped in a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    /// Exit code (0 = success); non-zero is a value, not an engine error
    pub exit_code: i32,
    /// SHA-256 of inline content, when content was the source
    pub content_hash: Option<String>,
}

impl ExecutionResult {
    pub fn from_output(output: ToolOutput) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
            content_hash: None,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn with_content_hash(mut self, hash: Option<String>) -> Self {
        self.content_hash = hash;
        self
    }
}
