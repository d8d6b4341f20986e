// Subprocess execution for polyver
//
// Every tool invocation is an argv list plus a working directory and
// timeout; arguments are never concatenated into a shell string. A missing
// executable and an expired timeout are capability signals on the result,
// not errors; exit codes are data.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{PolyverError, ProcessError, Result};
use crate::logging::utils::{log_tool_completion, log_tool_start};

/// A single external command invocation. Value object, built per call.
#[derive(Debug, Clone)]
pub struct Command {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub timeout: Duration,
    pub stdin: Option<String>,
}

impl Command {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: PathBuf::from("."),
            timeout: Duration::from_secs(60),
            stdin: None,
        }
    }

    /// Build a command from a full argv list (first element is the program)
    pub fn from_argv(argv: Vec<String>) -> Option<Self> {
        let mut iter = argv.into_iter();
        let program = iter.next()?;
        Some(Self {
            args: iter.collect(),
            ..Self::new(program)
        })
    }

    pub fn with_args(mut self, args: Vec<impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Human-readable command line for logs and error context
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Outcome of one command invocation. Immutable once returned.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration: Duration,
    pub timed_out: bool,
    pub tool_missing: bool,
}

impl ExecutionResult {
    /// Result representing an executable absent from PATH; nothing was run
    pub fn missing_tool() -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            duration: Duration::ZERO,
            timed_out: false,
            tool_missing: true,
        }
    }

    pub fn success(&self) -> bool {
        !self.timed_out && !self.tool_missing && self.exit_code == Some(0)
    }
}

/// Executes external commands with timeout enforcement and output capture.
/// Holds no cross-call shared mutable state; concurrent invocations are
/// independent.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    default_timeout: Duration,
}

impl CommandRunner {
    pub fn new() -> Self {
        Self {
            default_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_default_timeout(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    /// Synchronous wrapper around [`CommandRunner::run_async`]. Spins a
    /// runtime and blocks; must not be called from inside a tokio runtime.
    pub fn run(&self, command: Command) -> Result<ExecutionResult> {
        tokio::runtime::Runtime::new()
            .map_err(PolyverError::Io)?
            .block_on(self.run_async(command))
    }

    /// Execute a command, capturing stdout/stderr as text and enforcing the
    /// timeout by killing the process. Returns `tool_missing: true` without
    /// spawning when the executable cannot be resolved.
    pub async fn run_async(&self, command: Command) -> Result<ExecutionResult> {
        if !executable_resolves(&command.program, &command.working_dir) {
            debug!(program = %command.program, "Executable not found on PATH, skipping spawn");
            return Ok(ExecutionResult::missing_tool());
        }

        log_tool_start(&command.program, &command.working_dir);
        let start = std::time::Instant::now();

        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.working_dir)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        if command.stdin.is_some() {
            cmd.stdin(std::process::Stdio::piped());
        } else {
            cmd.stdin(std::process::Stdio::null());
        }

        let mut child = cmd.spawn().map_err(|e| {
            PolyverError::Process(Box::new(ProcessError::SpawnFailed {
                command: command.display_line(),
                error: e.to_string(),
            }))
        })?;

        if let Some(input) = &command.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                let _ = stdin.write_all(input.as_bytes()).await;
                // Dropping the handle closes the pipe
            }
        }

        // Readers run independently so partial output survives a timeout kill
        let stdout_task = tokio::spawn(slurp(child.stdout.take()));
        let stderr_task = tokio::spawn(slurp(child.stderr.take()));

        let timeout = if command.timeout.is_zero() {
            self.default_timeout
        } else {
            command.timeout
        };

        let (exit_code, timed_out) =
            match tokio::time::timeout(timeout, child.wait()).await {
                Ok(status) => {
                    let status = status.map_err(|e| {
                        PolyverError::Process(Box::new(ProcessError::OutputCaptureFailed {
                            command: command.display_line(),
                            message: format!("failed to wait for process: {e}"),
                        }))
                    })?;
                    (status.code(), false)
                }
                Err(_) => {
                    warn!(
                        program = %command.program,
                        timeout_secs = timeout.as_secs(),
                        "Command timed out, killing process"
                    );
                    let _ = child.kill().await;
                    let _ = child.wait().await;
                    (None, true)
                }
            };

        // The pipes close once the process is gone, so these complete even
        // after a kill, carrying whatever was captured so far
        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        let duration = start.elapsed();
        log_tool_completion(&command.program, exit_code, duration.as_millis());

        Ok(ExecutionResult {
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
            exit_code,
            duration,
            timed_out,
            tool_missing: false,
        })
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

async fn slurp<R: tokio::io::AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut data = Vec::new();
    if let Some(mut reader) = handle {
        let _ = reader.read_to_end(&mut data).await;
    }
    data
}

/// Resolve the executable: PATH lookup for bare names, file check relative
/// to the working directory for paths (e.g. vendor/bin tooling)
fn executable_resolves(program: &str, working_dir: &Path) -> bool {
    let has_separator = program.contains('/') || program.contains('\\');
    if has_separator {
        let candidate = Path::new(program);
        if candidate.is_absolute() {
            candidate.is_file()
        } else {
            working_dir.join(candidate).is_file()
        }
    } else {
        which::which(program).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let command = Command::new("echo")
            .with_args(vec!["hello", "world"])
            .with_timeout(Duration::from_secs(30))
            .with_working_dir("/tmp");

        assert_eq!(command.program, "echo");
        assert_eq!(command.args.len(), 2);
        assert_eq!(command.timeout, Duration::from_secs(30));
        assert_eq!(command.display_line(), "echo hello world");
    }

    #[test]
    fn test_command_from_argv() {
        let command =
            Command::from_argv(vec!["cargo".to_string(), "test".to_string()]).unwrap();
        assert_eq!(command.program, "cargo");
        assert_eq!(command.args, vec!["test"]);

        assert!(Command::from_argv(vec![]).is_none());
    }

    #[test]
    fn test_missing_tool_result_shape() {
        let result = ExecutionResult::missing_tool();
        assert!(result.tool_missing);
        assert!(!result.timed_out);
        assert!(result.exit_code.is_none());
        assert!(!result.success());
    }

    #[test]
    fn test_executable_resolution() {
        // A bare name that cannot exist on any sane PATH
        assert!(!executable_resolves(
            "definitely-not-a-real-tool-xyz",
            Path::new(".")
        ));
        // Relative paths are resolved against the working directory
        assert!(!executable_resolves("vendor/bin/phpunit", Path::new("/")));
    }
}
