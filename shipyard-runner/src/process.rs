//! External process supervision
//!
//! Every tool the pipeline shells out to (docker, the installer compiler,
//! the signing tool) runs through [`ProcessCommand`]. A supervised process:
//! - has stdout and stderr drained concurrently, line by line, into the log
//! - is bounded by a timeout and by the run's cancellation token
//! - is killed and reaped before control returns, whatever the exit path
//!
//! Arguments added with [`ProcessCommand::secret_arg`] and stdin contents
//! are passed to the child unchanged but never appear in logs or `Debug`.

use std::ffi::OsString;
use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};

/// How long to wait for output readers after the child is gone
const DRAIN_GRACE: Duration = Duration::from_secs(5);

const REDACTED: &str = "****";

/// Captured result of a finished process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_text(&self) -> String {
        self.stdout.join("\n")
    }

    pub fn stderr_text(&self) -> String {
        self.stderr.join("\n")
    }
}

/// Builder for a supervised external command
#[derive(Clone)]
pub struct ProcessCommand {
    program: String,
    args: Vec<OsString>,
    /// Indices into `args` that must not be shown
    secrets: Vec<usize>,
    stdin: Option<String>,
    timeout: Duration,
    echo: bool,
}

impl ProcessCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            secrets: Vec::new(),
            stdin: None,
            timeout: Duration::from_secs(300),
            echo: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// An argument that is shown as `****` wherever the command is logged
    pub fn secret_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.secrets.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    /// Text written to the child's stdin, which is then closed
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = limit;
        self
    }

    /// Logs the child's output at info instead of debug
    ///
    /// For long-running tools whose progress the operator should see.
    pub fn echo_output(mut self) -> Self {
        self.echo = true;
        self
    }

    /// The arguments as they may be displayed, with secrets masked
    pub fn display_args(&self) -> Vec<String> {
        self.args
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                if self.secrets.contains(&i) {
                    REDACTED.to_string()
                } else {
                    arg.to_string_lossy().into_owned()
                }
            })
            .collect()
    }

    /// Runs the process to completion and returns its output
    ///
    /// A non-zero exit is not an error here; see [`Self::run_checked`].
    /// Failing to spawn because the program does not exist maps to
    /// [`PipelineError::ToolchainMissing`].
    pub async fn run(&self, cancel: &CancellationToken) -> Result<ProcessOutput> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = %self.program, args = ?self.display_args(), "spawning process");

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PipelineError::ToolchainMissing(self.program.clone())
            } else {
                PipelineError::Io(e)
            }
        })?;

        if let (Some(input), Some(mut pipe)) = (self.stdin.clone(), child.stdin.take()) {
            // Written from a task so a child that never reads cannot stall us
            tokio::spawn(async move {
                if let Err(e) = pipe.write_all(input.as_bytes()).await {
                    debug!("failed to write process stdin: {}", e);
                }
                // Dropping the pipe closes stdin
            });
        }

        let stdout_task = drain_lines(child.stdout.take(), self.program.clone(), "stdout", self.echo);
        let stderr_task = drain_lines(child.stderr.take(), self.program.clone(), "stderr", self.echo);

        let status = tokio::select! {
            () = cancel.cancelled() => {
                warn!(program = %self.program, "process cancelled, killing");
                terminate(&mut child).await;
                collect(stdout_task).await;
                collect(stderr_task).await;
                return Err(PipelineError::Cancelled);
            }
            result = timeout(self.timeout, child.wait()) => {
                match result {
                    Ok(Ok(status)) => status,
                    Ok(Err(e)) => {
                        terminate(&mut child).await;
                        return Err(PipelineError::Io(e));
                    }
                    Err(_) => {
                        warn!(
                            program = %self.program,
                            timeout_secs = self.timeout.as_secs(),
                            "process timed out, killing"
                        );
                        terminate(&mut child).await;
                        collect(stdout_task).await;
                        collect(stderr_task).await;
                        return Err(PipelineError::Timeout {
                            what: self.program.clone(),
                            limit: self.timeout,
                        });
                    }
                }
            }
        };

        let stdout = collect(stdout_task).await;
        let stderr = collect(stderr_task).await;

        Ok(ProcessOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }

    /// Runs the process and turns a non-zero exit into an error
    pub async fn run_checked(&self, cancel: &CancellationToken) -> Result<ProcessOutput> {
        let output = self.run(cancel).await?;
        if !output.success() {
            let stderr = if output.stderr.is_empty() {
                output.stdout_text()
            } else {
                output.stderr_text()
            };
            return Err(PipelineError::Process {
                program: self.program.clone(),
                exit_code: output.exit_code,
                stderr,
            });
        }
        Ok(output)
    }
}

impl fmt::Debug for ProcessCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessCommand")
            .field("program", &self.program)
            .field("args", &self.display_args())
            .field("stdin", &self.stdin.as_ref().map(|_| REDACTED))
            .field("timeout", &self.timeout)
            .field("echo", &self.echo)
            .finish()
    }
}

/// Reads a pipe line by line, echoing each line to the log
fn drain_lines<R>(
    pipe: Option<R>,
    program: String,
    stream: &'static str,
    echo: bool,
) -> JoinHandle<Vec<String>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = Vec::new();
        if let Some(pipe) = pipe {
            let mut reader = BufReader::new(pipe).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                if echo {
                    info!(program = %program, stream, "{}", line);
                } else {
                    debug!(program = %program, stream, "{}", line);
                }
                lines.push(line);
            }
        }
        lines
    })
}

/// Waits for a reader task, giving up if a grandchild keeps the pipe open
async fn collect(task: JoinHandle<Vec<String>>) -> Vec<String> {
    match timeout(DRAIN_GRACE, task).await {
        Ok(Ok(lines)) => lines,
        _ => Vec::new(),
    }
}

/// Kills the child and reaps it
async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        debug!("kill failed (process may have exited): {}", e);
    }
}
