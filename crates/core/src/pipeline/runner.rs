use crate::types::{ExecutionRequest, ExecutionResult};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::time::timeout;

/// Message returned by `validate` when the pipeline parses cleanly
pub const VALID_PIPELINE: &str = "Pipeline syntax is valid";

/// Reasons a process run ended without an exit status
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Pipeline execution timed out after {} seconds", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Failed to communicate with the pipeline process: {0}")]
    Io(#[from] std::io::Error),
}

/// The program used to run pipelines, plus any wrapper arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenzirCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl TenzirCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for TenzirCommand {
    fn default() -> Self {
        Self::new("tenzir")
    }
}

/// Exit status and captured stdout of a finished process
struct ProcessOutput {
    status: ExitStatus,
    stdout: String,
}

/// Runs TQL pipelines through the external `tenzir` binary
///
/// Every call spawns its own process; runs share no state and may overlap.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunner {
    command: TenzirCommand,
    validate_timeout: Option<Duration>,
}

impl PipelineRunner {
    pub fn new(command: TenzirCommand) -> Self {
        Self {
            command,
            validate_timeout: None,
        }
    }

    /// Deadline for `validate`; defaults to the request default of 30 seconds
    pub fn with_validate_timeout(mut self, timeout: Duration) -> Self {
        self.validate_timeout = Some(timeout);
        self
    }

    /// Execute a pipeline and report its trimmed stdout
    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        let start = Instant::now();

        if request.pipeline.trim().is_empty() {
            return ExecutionResult::failure("Pipeline cannot be empty", start.elapsed());
        }

        tracing::debug!(
            "Executing pipeline ({} bytes, timeout {:?})",
            request.pipeline.len(),
            request.timeout
        );

        let outcome = self
            .run(
                &["--dump-diagnostics"],
                &request.pipeline,
                request.input.as_deref(),
                request.timeout,
            )
            .await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(output) if output.status.success() => {
                ExecutionResult::success(output.stdout.trim(), elapsed)
            }
            Ok(output) => {
                tracing::debug!("Pipeline exited with {}", output.status);
                ExecutionResult::failure(output.stdout.trim(), elapsed)
            }
            Err(e) => {
                tracing::warn!("Pipeline execution failed: {}", e);
                ExecutionResult::failure(e.to_string(), elapsed)
            }
        }
    }

    /// Check pipeline syntax without running it
    ///
    /// Diagnostics are returned verbatim when the pipeline does not parse.
    pub async fn validate(&self, pipeline: &str) -> ExecutionResult {
        let start = Instant::now();
        let deadline = self
            .validate_timeout
            .unwrap_or(crate::types::DEFAULT_TIMEOUT);

        let outcome = self
            .run(&["--dump-pipeline", "--dump-diagnostics"], pipeline, None, deadline)
            .await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(output) if output.status.success() => ExecutionResult::success(VALID_PIPELINE, elapsed),
            Ok(output) => ExecutionResult::failure(output.stdout, elapsed),
            Err(e) => {
                tracing::warn!("Pipeline validation failed: {}", e);
                ExecutionResult::failure(e.to_string(), elapsed)
            }
        }
    }

    async fn run(
        &self,
        flags: &[&str],
        pipeline: &str,
        input: Option<&[u8]>,
        deadline: Duration,
    ) -> Result<ProcessOutput, ExecutionError> {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .args(flags)
            .arg(pipeline)
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| ExecutionError::Spawn {
            program: self.command.program.display().to_string(),
            source,
        })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Exit, input and both output pipes share one deadline; a descendant
        // holding a pipe open must not outlive it
        let communicate = async {
            let (status, written, stdout, stderr) = tokio::join!(
                child.wait(),
                write_input(stdin, input),
                drain(stdout),
                drain(stderr),
            );
            match written {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
                _ => {}
            }
            Ok::<_, std::io::Error>((status?, stdout?, stderr?))
        };

        let waited = timeout(deadline, communicate).await;
        let (status, stdout, stderr) = match waited {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!("Pipeline exceeded {:?}, killing process", deadline);
                // kill() also reaps the child; it fails if the child already exited
                if let Err(e) = child.kill().await {
                    tracing::debug!("Failed to kill pipeline process: {}", e);
                }
                return Err(ExecutionError::Timeout(deadline));
            }
        };

        let stderr = String::from_utf8_lossy(&stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!("Pipeline stderr: {}", stderr.trim());
        }

        Ok(ProcessOutput {
            status,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
        })
    }
}

async fn write_input(stdin: Option<ChildStdin>, input: Option<&[u8]>) -> std::io::Result<()> {
    let (Some(mut stdin), Some(input)) = (stdin, input) else {
        return Ok(());
    };
    stdin.write_all(input).await?;
    stdin.shutdown().await?;
    // Dropping the handle closes the pipe and signals end of input
    drop(stdin);
    Ok(())
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// A runner whose "tenzir" is a shell script; the script sees the flags as
    /// `$1..` and the pipeline as the last argument.
    fn shell(script: &str) -> PipelineRunner {
        PipelineRunner::new(TenzirCommand::new("sh").with_args(["-c", script, "tenzir"]))
    }

    #[tokio::test]
    async fn test_execute_success() {
        let runner = shell("printf 'hello\\n'");
        let result = runner.execute(&ExecutionRequest::new("from {}")).await;

        assert!(result.success);
        assert_eq!(result.output, "hello");
    }

    #[tokio::test]
    async fn test_execute_passes_flag_and_pipeline() {
        let runner = shell("echo \"$1|$2\"");
        let result = runner.execute(&ExecutionRequest::new("version")).await;

        assert!(result.success);
        assert_eq!(result.output, "--dump-diagnostics|version");
    }

    #[tokio::test]
    async fn test_execute_forwards_input() {
        let runner = shell("cat");
        let request = ExecutionRequest::new("read_json").with_input("{\"a\": 1}\n");
        let result = runner.execute(&request).await;

        assert!(result.success);
        assert_eq!(result.output, "{\"a\": 1}");
    }

    #[tokio::test]
    async fn test_execute_without_input_closes_stdin() {
        // `cat` would block forever if stdin stayed open
        let runner = shell("cat; echo done");
        let request = ExecutionRequest::new("x").with_timeout(Duration::from_secs(5));
        let result = runner.execute(&request).await;

        assert!(result.success);
        assert_eq!(result.output, "done");
    }

    #[tokio::test]
    async fn test_execute_failure_keeps_stdout() {
        let runner = shell("echo 'error: unknown operator'; echo 'ignored' >&2; exit 1");
        let result = runner.execute(&ExecutionRequest::new("bogus")).await;

        assert!(!result.success);
        assert_eq!(result.output, "error: unknown operator");
    }

    #[tokio::test]
    async fn test_execute_timeout() {
        let runner = shell("exec sleep 30");
        let request = ExecutionRequest::new("x").with_timeout(Duration::from_millis(200));

        let started = Instant::now();
        let result = runner.execute(&request).await;

        assert!(!result.success);
        assert!(result.output.contains("timed out after 0.2 seconds"));
        assert!(result.elapsed >= Duration::from_millis(200));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_timeout_covers_pipes_held_by_descendants() {
        // The shell exits at once but the background sleep keeps stdout open
        let runner = shell("sleep 4 & echo hi");
        let request = ExecutionRequest::new("x").with_timeout(Duration::from_millis(500));

        let started = Instant::now();
        let result = runner.execute(&request).await;

        assert!(!result.success);
        assert!(result.output.contains("timed out after 0.5 seconds"));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_a_result() {
        let runner = PipelineRunner::new(TenzirCommand::new("/nonexistent/tenzir-binary"));
        let result = runner.execute(&ExecutionRequest::new("from {}")).await;

        assert!(!result.success);
        assert!(result.output.contains("Failed to spawn"));
        assert!(result.output.contains("/nonexistent/tenzir-binary"));
    }

    #[tokio::test]
    async fn test_empty_pipeline_rejected() {
        let runner = PipelineRunner::new(TenzirCommand::new("/nonexistent/tenzir-binary"));
        let result = runner.execute(&ExecutionRequest::new("   ")).await;

        assert!(!result.success);
        assert_eq!(result.output, "Pipeline cannot be empty");
    }

    #[tokio::test]
    async fn test_validate() {
        let runner = shell("test \"$1\" = --dump-pipeline && test \"$2\" = --dump-diagnostics");
        let result = runner.validate("from {}").await;
        assert!(result.success);
        assert_eq!(result.output, VALID_PIPELINE);

        let runner = shell("printf 'error: expected expression\\n  --> <input>:1:6\\n'; exit 1");
        let result = runner.validate("from {").await;
        assert!(!result.success);
        assert_eq!(result.output, "error: expected expression\n  --> <input>:1:6\n");
    }

    #[tokio::test]
    async fn test_validate_timeout() {
        let runner = shell("exec sleep 30").with_validate_timeout(Duration::from_millis(100));
        let result = runner.validate("from {}").await;
        assert!(!result.success);
        assert!(result.output.contains("timed out"));
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_independent() {
        let runner = shell("echo \"$2\"");
        let first = ExecutionRequest::new("first");
        let second = ExecutionRequest::new("second");
        let (a, b) = tokio::join!(runner.execute(&first), runner.execute(&second));
        assert_eq!(a.output, "first");
        assert_eq!(b.output, "second");
    }
}
