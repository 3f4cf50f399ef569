//! RunUAT process supervision with streaming output

use std::io::{self, BufRead, BufReader, PipeReader, Read};
use std::path::Path;
use std::pin::pin;
use std::process::{ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::types::{ExecutionOutcome, FailureReason, ResolvedCommand};

/// Receives each output line, in order, before the next one is read
pub trait LineSink: Send + FnMut(&str) {}
impl<F: Send + FnMut(&str)> LineSink for F {}

/// Optional limits on a run. The default has neither a timeout nor a
/// cancellation token, so the child runs until it exits on its own.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl RunOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Run the command until the child exits, streaming its merged
/// stdout/stderr to `on_line`.
pub async fn run(command: &ResolvedCommand, on_line: impl LineSink) -> ExecutionOutcome {
    run_with_options(command, on_line, RunOptions::default()).await
}

/// Like [`run`], with an optional timeout and cancellation token. On either,
/// the child is killed and reaped before the outcome is returned.
///
/// Never fails: launch errors, I/O errors and interruptions all become
/// [`ExecutionOutcome::Failure`] carrying the lines captured so far.
pub async fn run_with_options(
    command: &ResolvedCommand,
    mut on_line: impl LineSink,
    options: RunOptions,
) -> ExecutionOutcome {
    let start_time = Instant::now();
    let mut output = Vec::new();

    tracing::info!("Launching {}", command.display_command());

    let (mut child, reader) = match spawn_merged(command) {
        Ok(spawned) => spawned,
        Err(e) => {
            let reason = launch_failure(&command.executable_path, e);
            tracing::error!("{}", reason);
            return ExecutionOutcome::Failure { output, reason };
        }
    };

    // Capacity 1 keeps the reader at most one line ahead of the sink
    let (line_tx, mut line_rx) = mpsc::channel::<io::Result<String>>(1);
    let spawned_reader = thread::Builder::new()
        .name("uat-output".to_string())
        .spawn(move || forward_lines(reader, line_tx));
    if let Err(e) = spawned_reader {
        terminate(&mut child).await;
        return ExecutionOutcome::Failure {
            output,
            reason: FailureReason::Io(format!("failed to start output reader: {}", e)),
        };
    }

    let cancel = options.cancel.unwrap_or_default();
    let timeout = options.timeout;
    let mut deadline = pin!(async move {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending::<()>().await,
        }
    });

    // Stream lines until the child closes its end of the pipe
    let mut interrupted = None;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                interrupted = Some(FailureReason::Cancelled);
                break;
            }
            _ = &mut deadline => {
                interrupted = Some(FailureReason::TimedOut(timeout.unwrap_or_default()));
                break;
            }
            next = line_rx.recv() => next,
        };

        match next {
            Some(Ok(line)) => {
                tracing::debug!("[UAT] {}", line);
                on_line(&line);
                output.push(line);
            }
            Some(Err(e)) => {
                interrupted = Some(FailureReason::Io(format!(
                    "failed to read process output: {}",
                    e
                )));
                break;
            }
            None => break,
        }
    }

    if let Some(reason) = interrupted {
        terminate(&mut child).await;
        tracing::warn!(
            "Run stopped after {:.1}s: {}",
            start_time.elapsed().as_secs_f32(),
            reason
        );
        return ExecutionOutcome::Failure { output, reason };
    }

    let waited = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FailureReason::Cancelled),
        _ = &mut deadline => Err(FailureReason::TimedOut(timeout.unwrap_or_default())),
        status = child.wait() => Ok(status),
    };

    let reason = match waited {
        Ok(Ok(status)) => classify(status),
        Ok(Err(e)) => Some(FailureReason::Io(format!("failed to wait for process: {}", e))),
        Err(reason) => {
            terminate(&mut child).await;
            Some(reason)
        }
    };

    let elapsed = start_time.elapsed().as_secs_f32();
    match reason {
        None => {
            tracing::info!("Process finished successfully in {:.1}s", elapsed);
            ExecutionOutcome::Success { output }
        }
        Some(reason) => {
            tracing::warn!("Process failed after {:.1}s: {}", elapsed, reason);
            ExecutionOutcome::Failure { output, reason }
        }
    }
}

/// Blocking wrapper around [`run_with_options`] for callers without a
/// tokio runtime.
pub fn run_blocking(
    command: &ResolvedCommand,
    on_line: impl LineSink,
    options: RunOptions,
) -> ExecutionOutcome {
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt.block_on(run_with_options(command, on_line, options)),
        Err(e) => ExecutionOutcome::Failure {
            output: Vec::new(),
            reason: FailureReason::Launch(format!("failed to create async runtime: {}", e)),
        },
    }
}

/// Spawn the child with stdout and stderr sharing one pipe, so the reader
/// sees lines in exactly the order the child wrote them.
fn spawn_merged(command: &ResolvedCommand) -> io::Result<(Child, PipeReader)> {
    let (reader, writer) = io::pipe()?;

    let mut cmd = Command::new(&command.executable_path);
    cmd.args(&command.arguments)
        .stdin(Stdio::null())
        .stdout(writer.try_clone()?)
        .stderr(writer)
        .kill_on_drop(true);

    // On Windows, create a new process group for proper termination
    #[cfg(windows)]
    {
        cmd.creation_flags(0x00000200); // CREATE_NEW_PROCESS_GROUP
    }

    let child = cmd.spawn()?;
    // The command still owns the parent's copies of the write end; EOF only
    // arrives once they are closed.
    drop(cmd);

    Ok((child, reader))
}

fn launch_failure(executable: &Path, e: io::Error) -> FailureReason {
    if e.kind() == io::ErrorKind::NotFound {
        FailureReason::ExecutableNotFound(executable.to_path_buf())
    } else {
        FailureReason::Launch(e.to_string())
    }
}

/// Read the merged stream line by line on a plain thread. Stops at EOF, on
/// the first read error (forwarded), or once the receiver is gone.
fn forward_lines(reader: impl Read, tx: mpsc::Sender<io::Result<String>>) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return,
            Ok(_) => {
                let line = decode_line(&buf);
                if line.is_empty() {
                    continue;
                }
                if tx.blocking_send(Ok(line)).is_err() {
                    return;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                return;
            }
        }
    }
}

/// Lossy UTF-8 decode, surrounding whitespace (and the newline) trimmed
fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

fn classify(status: ExitStatus) -> Option<FailureReason> {
    if status.success() {
        None
    } else if let Some(code) = status.code() {
        Some(FailureReason::ExitCode(code))
    } else {
        Some(FailureReason::Terminated {
            signal: exit_signal(&status),
        })
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Kill and reap the child
async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        tracing::warn!("Failed to kill RunUAT process: {}", e);
    }
}
