//! External command execution.
//!
//! The expander only talks to the [`CommandRunner`] capability, so tests can
//! substitute canned tool output for real processes.

use std::ffi::OsString;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use futures::stream::{BoxStream, StreamExt};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use bundlescope_core::ToolError;

/// Type alias for boxed futures returned by runner methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Buffered chunks between a streaming process and its consumer.
const STREAM_CHANNEL_SIZE: usize = 16;

/// Read size for streamed stdout.
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Capability to run external programs.
pub trait CommandRunner: Send + Sync {
    /// Run a program to completion and return its standard output.
    fn run_to_completion<'a>(
        &'a self,
        program: &'a Path,
        args: &'a [OsString],
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<String, ToolError>>;

    /// Run a program and stream its standard output in chunks.
    ///
    /// The stream ends after the last chunk on success, or yields a single
    /// error as its final item. Dropping the stream terminates the process.
    fn run_streaming(
        &self,
        program: &Path,
        args: &[OsString],
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<Vec<u8>, ToolError>>;
}

/// Runs programs as child processes of the current one.
///
/// Children are killed when their future or stream is dropped, when the
/// cancellation token fires, or when they exceed the timeout.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    /// Create a runner killing processes after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl CommandRunner for ProcessRunner {
    fn run_to_completion<'a>(
        &'a self,
        program: &'a Path,
        args: &'a [OsString],
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<String, ToolError>> {
        Box::pin(async move {
            let name = program_name(program);
            let start = Instant::now();
            let child = spawn(program, args, Stdio::piped())?;

            let output = tokio::select! {
                result = tokio::time::timeout(self.timeout, child.wait_with_output()) => match result {
                    Ok(output) => output.map_err(|source| ToolError::Io { program: name.clone(), source })?,
                    Err(_) => return Err(ToolError::Timeout { program: name, timeout: self.timeout }),
                },
                _ = cancel.cancelled() => return Err(ToolError::Cancelled { program: name }),
            };

            tracing::debug!(
                program = %name,
                status = %output.status,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "tool finished"
            );

            if !output.status.success() {
                return Err(non_zero_exit(
                    name,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim().to_string(),
                ));
            }

            String::from_utf8(output.stdout).map_err(|_| ToolError::InvalidUtf8 { program: name })
        })
    }

    fn run_streaming(
        &self,
        program: &Path,
        args: &[OsString],
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<Vec<u8>, ToolError>> {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_SIZE);
        let program = program.to_path_buf();
        let args = args.to_vec();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let name = program_name(&program);
            let outcome = tokio::select! {
                result = tokio::time::timeout(timeout, pump(&program, &args, &tx)) => match result {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ToolError::Timeout { program: name, timeout }),
                },
                _ = cancel.cancelled() => Err(ToolError::Cancelled { program: name }),
            };

            if let Err(error) = outcome {
                let _ = tx.send(Err(error)).await;
            }
        });

        ReceiverStream::new(rx).boxed()
    }
}

/// Copy stdout of a freshly spawned process into the channel.
async fn pump(
    program: &Path,
    args: &[OsString],
    tx: &mpsc::Sender<Result<Vec<u8>, ToolError>>,
) -> Result<(), ToolError> {
    let name = program_name(program);
    let mut child = spawn(program, args, Stdio::null())?;
    let mut stdout = child.stdout.take().ok_or_else(|| ToolError::Io {
        program: name.clone(),
        source: std::io::Error::other("stdout was not captured"),
    })?;

    let mut buffer = vec![0u8; STREAM_CHUNK_SIZE];
    loop {
        let read = stdout
            .read(&mut buffer)
            .await
            .map_err(|source| ToolError::Io { program: name.clone(), source })?;
        if read == 0 {
            break;
        }
        if tx.send(Ok(buffer[..read].to_vec())).await.is_err() {
            // Consumer is gone; dropping the child kills it.
            return Ok(());
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|source| ToolError::Io { program: name.clone(), source })?;
    if !status.success() {
        return Err(non_zero_exit(name, status, String::new()));
    }
    Ok(())
}

fn spawn(program: &Path, args: &[OsString], stderr: Stdio) -> Result<Child, ToolError> {
    tracing::debug!(program = %program.display(), ?args, "launching tool");
    Command::new(program)
        .args(args)
        .env("LANG", "en_US.UTF-8")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(stderr)
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ToolError::Spawn { program: program_name(program), source })
}

fn non_zero_exit(program: String, status: ExitStatus, output: String) -> ToolError {
    ToolError::NonZeroExit {
        program,
        status: status.to_string(),
        output,
    }
}

fn program_name(program: &Path) -> String {
    program.display().to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<OsString> {
        values.iter().map(OsString::from).collect()
    }

    #[tokio::test]
    async fn test_run_to_completion_captures_stdout() {
        let runner = ProcessRunner::default();
        let cancel = CancellationToken::new();
        let output = runner
            .run_to_completion(Path::new("sh"), &args(&["-c", "printf 'a\\tb'"]), &cancel)
            .await
            .unwrap();
        assert_eq!(output, "a\tb");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_typed() {
        let runner = ProcessRunner::default();
        let cancel = CancellationToken::new();
        let err = runner
            .run_to_completion(Path::new("sh"), &args(&["-c", "echo oops >&2; exit 3"]), &cancel)
            .await
            .unwrap_err();
        match err {
            ToolError::NonZeroExit { output, .. } => assert_eq!(output, "oops"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_spawn() {
        let runner = ProcessRunner::default();
        let cancel = CancellationToken::new();
        let err = runner
            .run_to_completion(Path::new("/nonexistent/tool"), &[], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let runner = ProcessRunner::new(Duration::from_millis(100));
        let cancel = CancellationToken::new();
        let err = runner
            .run_to_completion(Path::new("sleep"), &args(&["5"]), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_cancellation() {
        let runner = ProcessRunner::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = runner
            .run_to_completion(Path::new("sleep"), &args(&["5"]), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_streaming_collects_chunks() {
        let runner = ProcessRunner::default();
        let mut stream = runner.run_streaming(
            Path::new("sh"),
            &args(&["-c", "printf '[1,'; printf '2]'"]),
            CancellationToken::new(),
        );
        let mut output = Vec::new();
        while let Some(chunk) = stream.next().await {
            output.extend(chunk.unwrap());
        }
        assert_eq!(output, b"[1,2]");
    }

    #[tokio::test]
    async fn test_streaming_surfaces_failure_last() {
        let runner = ProcessRunner::default();
        let mut stream = runner.run_streaming(
            Path::new("sh"),
            &args(&["-c", "printf partial; exit 1"]),
            CancellationToken::new(),
        );
        let mut items = Vec::new();
        while let Some(item) = stream.next().await {
            items.push(item);
        }
        assert!(matches!(items.last(), Some(Err(ToolError::NonZeroExit { .. }))));
    }
}
