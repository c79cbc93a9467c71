// Subprocess execution with piped stdio and a hard deadline

use crate::error::{FabricError, FabricResult};
use crate::resolver::ResolvedCommand;
use std::ffi::OsString;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};

/// One subprocess call.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: ResolvedCommand,
    pub args: Vec<String>,
    pub input: Option<String>,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new(command: &ResolvedCommand, args: &[&str], timeout: Duration) -> Self {
        Self {
            command: command.clone(),
            args: args.iter().map(|a| a.to_string()).collect(),
            input: None,
            timeout,
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }
}

/// Runs external commands and returns their stdout.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: Invocation) -> FabricResult<String>;
}

/// [`CommandRunner`] backed by real OS processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    search_path: OsString,
}

impl ProcessRunner {
    /// `search_path` becomes the `PATH` of every spawned process.
    pub fn new(search_path: OsString) -> Self {
        Self { search_path }
    }
}

#[async_trait::async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: Invocation) -> FabricResult<String> {
        let Invocation {
            command,
            args,
            input,
            timeout,
        } = invocation;
        let label = command.program.display().to_string();

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .args(&args)
            .env("PATH", &self.search_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(command = %label, ?args, has_input = input.is_some(), "Spawning subprocess");
        let start = Instant::now();

        let mut child = cmd
            .spawn()
            .map_err(|e| FabricError::spawn(label.clone(), "spawn", &e))?;

        let stdin = child.stdin.take();
        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let completed = tokio::time::timeout(timeout, async {
            let (_, out, err) = tokio::join!(
                feed_stdin(stdin, input.as_deref()),
                drain(stdout.as_mut(), &mut stdout_buf),
                drain(stderr.as_mut(), &mut stderr_buf),
            );
            out?;
            err?;
            child.wait().await.map_err(|source| ChildIoError { syscall: "wait", source })
        })
        .await;

        match completed {
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(command = %label, "Failed to kill timed out process: {}", e);
                }
                tracing::warn!(command = %label, "Process timed out after {:?}", timeout);
                Err(FabricError::Timeout {
                    command: label,
                    after: timeout,
                    partial_stdout: lossy(stdout_buf),
                })
            }
            Ok(Err(e)) => Err(FabricError::spawn(label, e.syscall, &e.source)),
            Ok(Ok(status)) => {
                tracing::debug!(
                    command = %label,
                    code = ?status.code(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Subprocess exited"
                );
                classify(label, status, stdout_buf, stderr_buf)
            }
        }
    }
}

fn classify(
    command: String,
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
) -> FabricResult<String> {
    if status.success() {
        Ok(lossy(stdout))
    } else {
        Err(FabricError::NonZeroExit {
            command,
            code: status.code(),
            stderr: lossy(stderr),
            stdout: lossy(stdout),
        })
    }
}

/// Write the input (if any), then close stdin. The engine blocks until it sees EOF.
async fn feed_stdin(stdin: Option<ChildStdin>, input: Option<&str>) {
    let Some(mut stdin) = stdin else {
        return;
    };

    if let Some(text) = input {
        // The child may exit without reading; a broken pipe here is not our failure.
        if let Err(e) = stdin.write_all(text.as_bytes()).await {
            tracing::debug!("Subprocess stopped reading stdin: {}", e);
        }
    }

    drop(stdin);
}

/// I/O failure while driving a running child, tagged with the call that failed.
#[derive(Debug)]
struct ChildIoError {
    syscall: &'static str,
    source: std::io::Error,
}

/// Append everything the stream yields to `buf`, chunk by chunk.
async fn drain<R: AsyncRead + Unpin>(reader: Option<&mut R>, buf: &mut Vec<u8>) -> Result<(), ChildIoError> {
    let Some(reader) = reader else {
        return Ok(());
    };

    let mut chunk = [0u8; 8192];
    loop {
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(|source| ChildIoError { syscall: "read", source })?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn lossy(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::resolver::{Engine, Resolution};
    use std::path::PathBuf;

    fn sh(script: &str) -> ResolvedCommand {
        ResolvedCommand {
            engine: Engine::Fabric,
            program: PathBuf::from("sh"),
            args: vec!["-c".to_string(), script.to_string(), "fabric".to_string()],
            resolution: Resolution::Override,
        }
    }

    fn runner() -> ProcessRunner {
        ProcessRunner::new(std::env::var_os("PATH").unwrap_or_default())
    }

    #[tokio::test]
    async fn test_input_is_written_to_stdin() {
        let invocation = Invocation::new(&sh("cat"), &["--pattern", "summarize"], Duration::from_secs(5))
            .with_input("The quick brown fox");

        let output = runner().run(invocation).await.unwrap();
        assert_eq!(output, "The quick brown fox");
    }

    #[tokio::test]
    async fn test_stdin_closed_without_input() {
        // `cat` only returns once stdin reaches EOF.
        let invocation = Invocation::new(&sh("cat; echo done"), &[], Duration::from_secs(5));

        let started = Instant::now();
        let output = runner().run(invocation).await.unwrap();
        assert_eq!(output, "done\n");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_non_zero_exit_keeps_both_streams() {
        let invocation = Invocation::new(
            &sh("echo partial result; echo missing model >&2; exit 3"),
            &[],
            Duration::from_secs(5),
        );

        match runner().run(invocation).await {
            Err(FabricError::NonZeroExit { code, stdout, stderr, .. }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stdout, "partial result\n");
                assert_eq!(stderr, "missing model\n");
            }
            other => panic!("expected non-zero exit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_and_keeps_partial_output() {
        let invocation = Invocation::new(
            &sh("echo started; exec sleep 10"),
            &[],
            Duration::from_millis(300),
        );

        let started = Instant::now();
        match runner().run(invocation).await {
            Err(FabricError::Timeout { after, partial_stdout, .. }) => {
                assert_eq!(after, Duration::from_millis(300));
                assert_eq!(partial_stdout, "started\n");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_failure() {
        let command = ResolvedCommand {
            engine: Engine::Fabric,
            program: PathBuf::from("/nonexistent/dir/fabric"),
            args: vec![],
            resolution: Resolution::Override,
        };

        let err = runner()
            .run(Invocation::new(&command, &["--version"], Duration::from_secs(5)))
            .await
            .unwrap_err();

        match &err {
            FabricError::Spawn { errno, syscall, .. } => {
                assert_eq!(*errno, Some(2));
                assert_eq!(*syscall, "spawn");
            }
            other => panic!("expected spawn failure, got {other:?}"),
        }
        assert!(err.to_string().contains("Failed to spawn /nonexistent/dir/fabric"));
    }

    #[tokio::test]
    async fn test_search_path_is_passed_to_child() {
        let runner = ProcessRunner::new(OsString::from("/augmented/bin:/usr/bin:/bin"));
        let output = runner
            .run(Invocation::new(&sh("printf %s \"$PATH\""), &[], Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(output, "/augmented/bin:/usr/bin:/bin");
    }

    /// Yields one chunk, then fails.
    struct BrokenPipe {
        sent: bool,
    }

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            if self.sent {
                return std::task::Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "pipe reset",
                )));
            }
            self.sent = true;
            buf.put_slice(b"partial");
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_read_failure_is_tagged_as_read() {
        let mut reader = BrokenPipe { sent: false };
        let mut buf = Vec::new();

        let err = drain(Some(&mut reader), &mut buf).await.unwrap_err();

        assert_eq!(err.syscall, "read");
        assert_eq!(err.source.kind(), std::io::ErrorKind::ConnectionReset);
        assert_eq!(buf, b"partial");
    }
}
