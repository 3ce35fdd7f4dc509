//! Subprocess-based runner

use crate::error::OperationError;
use crate::types::{decode_capture, ToolInvocation, ToolOutput};
use crate::Result;
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

const READ_CHUNK: usize = 8192;

type Capture = JoinHandle<std::io::Result<(Vec<u8>, bool)>>;

/// Runs tools as direct child processes, never through a shell.
///
/// Each child leads its own process group so a timeout can take down
/// everything it spawned.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl super::ToolRunner for ProcessRunner {
    async fn run(&self, invocation: ToolInvocation) -> Result<ToolOutput> {
        let program = invocation.program_name();
        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + invocation.timeout;

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        if let Some(dir) = &invocation.current_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| spawn_error(&program, e))?;
        let pid = child.id();
        tracing::debug!(program = %program, pid, "Spawned tool");

        let stdout = child
            .stdout
            .take()
            .map(|pipe| tokio::spawn(read_capped(pipe, invocation.max_output_bytes)));
        let stderr = child
            .stderr
            .take()
            .map(|pipe| tokio::spawn(read_capped(pipe, invocation.max_output_bytes)));

        let status = match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                kill_group(pid);
                let _ = child.kill().await;
                abort(stdout);
                abort(stderr);
                return Err(timed_out(&program, invocation.timeout));
            }
        };

        // Pipes stay open while anything the tool left behind still holds them
        let captured = tokio::time::timeout_at(deadline, async {
            let out = collect(stdout).await?;
            let err = collect(stderr).await?;
            Ok::<_, OperationError>((out, err))
        })
        .await;

        let ((stdout, stdout_truncated), (stderr, stderr_truncated)) = match captured {
            Ok(result) => result?,
            Err(_) => {
                kill_group(pid);
                return Err(timed_out(&program, invocation.timeout));
            }
        };

        let exit_code = exit_code_of(status);
        let elapsed = start.elapsed();
        tracing::debug!(
            program = %program,
            exit_code,
            duration_ms = elapsed.as_millis() as u64,
            "Tool finished"
        );

        Ok(ToolOutput {
            stdout,
            stderr,
            exit_code,
            elapsed,
            truncated: stdout_truncated || stderr_truncated,
        })
    }

    fn name(&self) -> &str {
        "process"
    }
}

/// Read a stream to EOF, keeping at most `cap` bytes. The rest is drained.
async fn read_capped<R>(mut reader: R, cap: usize) -> std::io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let mut kept = Vec::new();
    let mut truncated = false;
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = cap.saturating_sub(kept.len());
        if n > room {
            truncated = true;
        }
        kept.extend_from_slice(&chunk[..n.min(room)]);
    }

    Ok((kept, truncated))
}

async fn collect(capture: Option<Capture>) -> Result<(String, bool)> {
    let Some(handle) = capture else {
        return Ok((String::new(), false));
    };
    let (bytes, truncated) = handle.await??;
    Ok((decode_capture(&bytes, truncated), truncated))
}

fn abort(capture: Option<Capture>) {
    if let Some(handle) = capture {
        handle.abort();
    }
}

fn spawn_error(program: &str, err: std::io::Error) -> OperationError {
    if err.kind() == std::io::ErrorKind::NotFound {
        OperationError::ExecutionError(format!(
            "Executable not found: '{}' is not installed or not on PATH",
            program
        ))
    } else {
        OperationError::ExecutionError(format!("Failed to start '{}': {}", program, err))
    }
}

fn timed_out(program: &str, timeout: std::time::Duration) -> OperationError {
    tracing::warn!(program = %program, timeout = ?timeout, "Tool timed out, process group killed");
    OperationError::ExecutionError(format!("'{}' timed out after {:?}", program, timeout))
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        return;
    };
    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(pid, error = %e, "Failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}
