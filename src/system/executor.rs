// src/system/executor.rs

use crate::{
    CancellationToken,
    constants::DOTNET_HOST,
    context::{OutputFilter, OutputLogger},
    core::arguments::CompiledArguments,
    dev_utils::BlockTimer,
    models::{InvocationResult, OutputLine, OutputType},
};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command as StdCommand, Stdio};
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// How long the wait loop blocks on the output channel before polling the child again.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on reading after the child exited, counted from the exit. Grandchildren
/// that inherited the pipes can keep them open indefinitely; their readers are detached
/// (and their process group killed, when the child had one) after this.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// How running the external process failed. `command` is always the redacted command line.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The process could not be started.
    #[error("Command '{command}' could not be started: {source}")]
    Spawn {
        /// Redacted command line.
        command: String,
        /// Error from the OS.
        #[source]
        source: std::io::Error,
    },
    /// Polling the running process failed; it was killed.
    #[error("Lost track of process '{command}': {source}")]
    Wait {
        /// Redacted command line.
        command: String,
        /// Error from the OS.
        #[source]
        source: std::io::Error,
    },
    /// The process exited with a non-zero code or was terminated by a signal.
    #[error("Process '{command}' {}.", describe_exit(.exit_code))]
    NonZeroExitStatus {
        /// Redacted command line.
        command: String,
        /// Exit code, or `None` when a signal ended the process.
        exit_code: Option<i32>,
        /// Everything captured, in arrival order.
        output: Vec<OutputLine>,
    },
    /// The timeout elapsed; the process was killed.
    #[error("Process '{command}' did not finish within {}s and was killed.", .timeout.as_secs_f64())]
    Timeout {
        /// Redacted command line.
        command: String,
        /// The limit that elapsed.
        timeout: Duration,
        /// Output captured before the kill.
        output: Vec<OutputLine>,
    },
    /// The cancellation token was set; the process was killed.
    #[error("Process '{command}' was cancelled and killed.")]
    Cancelled {
        /// Redacted command line.
        command: String,
        /// Output captured before the kill.
        output: Vec<OutputLine>,
    },
}

impl ExecutionError {
    /// The lines captured before the failure, if the process got to run.
    pub fn output(&self) -> Option<&[OutputLine]> {
        match self {
            Self::NonZeroExitStatus { output, .. }
            | Self::Timeout { output, .. }
            | Self::Cancelled { output, .. } => Some(output),
            Self::Spawn { .. } | Self::Wait { .. } => None,
        }
    }

    /// The exit code of a process that ran to completion and failed.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NonZeroExitStatus { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exited with code {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

/// Everything needed to run the external process once.
pub struct ProcessRequest<'a> {
    /// The resolved executable. A `.dll` is launched through the .NET host.
    pub program: &'a Path,
    /// Passed to the program as-is, one token per argument.
    pub arguments: &'a CompiledArguments,
    /// Defaults to the caller's working directory.
    pub working_directory: Option<&'a Path>,
    /// Merged on top of the inherited environment.
    pub environment: &'a BTreeMap<String, String>,
    /// No limit when `None`.
    pub timeout: Option<Duration>,
    /// Log the redacted command line before starting.
    pub log_invocation: bool,
    /// Forward each captured line to `logger`.
    pub log_output: bool,
    /// Receives captured lines as they arrive.
    pub logger: &'a OutputLogger,
    /// Applied to a line before the logger sees it.
    pub filter: Option<&'a OutputFilter>,
    /// Checked on every poll; when set, the child is killed like on timeout.
    pub cancel: Option<&'a CancellationToken>,
}

impl fmt::Debug for ProcessRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRequest")
            .field("program", &self.program)
            .field("arguments", &self.arguments.redacted())
            .field("working_directory", &self.working_directory)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ProcessRequest<'_> {
    /// The command line as shown in logs and errors, with secrets redacted.
    pub fn display(&self) -> String {
        let arguments = self.arguments.redacted();
        if arguments.is_empty() {
            self.program.display().to_string()
        } else {
            format!("{} {}", self.program.display(), arguments)
        }
    }
}

/// Collects captured lines and forwards them to the logger as they arrive.
struct Capture<'r, 'a> {
    request: &'r ProcessRequest<'a>,
    lines: Vec<OutputLine>,
}

impl Capture<'_, '_> {
    fn record(&mut self, line: OutputLine) {
        if self.request.log_output {
            match self.request.filter {
                Some(filter) => (self.request.logger)(line.kind, &filter(&line.text)),
                None => (self.request.logger)(line.kind, &line.text),
            }
        }
        self.lines.push(line);
    }
}

/// Runs the external process and blocks until it exits or the timeout elapses.
///
/// Standard output and standard error are read by two background threads into one
/// channel, so the captured lines keep the order in which they arrived across both
/// streams. A zero exit code yields the captured output; anything else is an error that
/// carries the output. On timeout the child is killed before the error is returned.
pub fn execute(request: &ProcessRequest<'_>) -> Result<InvocationResult, ExecutionError> {
    let command_line = request.display();
    if request.log_invocation {
        log::info!("> {}", command_line);
    }
    let _timer = BlockTimer::new(command_line.clone());

    let mut command = prepare_command(request);
    let grouped = isolate_process_group(&mut command, request);
    let mut child = command.spawn().map_err(|source| ExecutionError::Spawn {
        command: command_line.clone(),
        source,
    })?;
    log::debug!("Started process {} for '{}'", child.id(), command_line);

    let (tx, rx) = mpsc::channel();
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, OutputType::Std, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, OutputType::Err, tx.clone()));
    }
    drop(tx);

    let mut capture = Capture {
        request,
        lines: Vec::new(),
    };
    let deadline = request.timeout.map(|timeout| Instant::now() + timeout);

    let status = loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(line) => capture.record(line),
            Err(RecvTimeoutError::Timeout) => {}
            // Both pipes are closed but the process may still be running.
            Err(RecvTimeoutError::Disconnected) => thread::sleep(POLL_INTERVAL),
        }

        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(source) => {
                terminate(&mut child, grouped);
                return Err(ExecutionError::Wait {
                    command: command_line,
                    source,
                });
            }
        }

        if let (Some(deadline), Some(timeout)) = (deadline, request.timeout) {
            if Instant::now() >= deadline {
                log::warn!(
                    "Process {} exceeded its {}s timeout, killing it.",
                    child.id(),
                    timeout.as_secs_f64()
                );
                terminate(&mut child, grouped);
                while let Ok(line) = rx.try_recv() {
                    capture.record(line);
                }
                return Err(ExecutionError::Timeout {
                    command: command_line,
                    timeout,
                    output: capture.lines,
                });
            }
        }

        if request.cancel.is_some_and(|token| token.load(Ordering::SeqCst)) {
            log::warn!("Cancelling process {}.", child.id());
            terminate(&mut child, grouped);
            while let Ok(line) = rx.try_recv() {
                capture.record(line);
            }
            return Err(ExecutionError::Cancelled {
                command: command_line,
                output: capture.lines,
            });
        }
    };

    // The process is gone; collect whatever is still buffered in the pipes. The drain is
    // bounded from the moment of exit and by the caller's deadline.
    let exited_at = Instant::now();
    let drain_deadline = deadline.map_or(exited_at + DRAIN_GRACE, |deadline| {
        deadline.clamp(exited_at + POLL_INTERVAL, exited_at + DRAIN_GRACE)
    });
    let drained = loop {
        let now = Instant::now();
        if now >= drain_deadline {
            break false;
        }
        if request.cancel.is_some_and(|token| token.load(Ordering::SeqCst)) {
            break false;
        }
        match rx.recv_timeout(POLL_INTERVAL.min(drain_deadline - now)) {
            Ok(line) => capture.record(line),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break true,
        }
    };

    if drained {
        for reader in readers {
            if reader.join().is_err() {
                log::warn!("An output reader thread panicked.");
            }
        }
    } else {
        log::debug!("Output pipes still open after exit, detaching readers.");
        if grouped {
            kill_process_group(child.id());
        }
        while let Ok(line) = rx.try_recv() {
            capture.record(line);
        }
    }

    match status.code() {
        Some(0) => Ok(InvocationResult {
            output: capture.lines,
            exit_code: 0,
        }),
        exit_code => {
            log::debug!("'{}' {}", command_line, describe_exit(&exit_code));
            Err(ExecutionError::NonZeroExitStatus {
                command: command_line,
                exit_code,
                output: capture.lines,
            })
        }
    }
}

fn prepare_command(request: &ProcessRequest<'_>) -> StdCommand {
    let is_dll = request
        .program
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dll"));

    let mut command = if is_dll {
        let mut host = StdCommand::new(DOTNET_HOST);
        host.arg(request.program);
        host
    } else {
        StdCommand::new(request.program)
    };

    command
        .args(request.arguments.tokens())
        .envs(request.environment)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(dir) = request.working_directory {
        command.current_dir(dunce::simplified(dir));
    }
    command
}

fn spawn_reader<R>(pipe: R, kind: OutputType, tx: Sender<OutputLine>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            match reader.read_until(b'\n', &mut buffer) {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buffer);
                    let line = OutputLine {
                        kind,
                        text: text.trim_end_matches(['\n', '\r']).to_string(),
                    };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::debug!("Stopped reading {:?} output: {}", kind, e);
                    break;
                }
            }
        }
    })
}

/// Puts a killable child in its own process group so that its whole subtree can be
/// terminated. Children that can never be killed stay in the caller's group, where
/// they keep receiving terminal signals such as Ctrl+C.
#[cfg(unix)]
fn isolate_process_group(command: &mut StdCommand, request: &ProcessRequest<'_>) -> bool {
    use std::os::unix::process::CommandExt;

    if request.timeout.is_none() && request.cancel.is_none() {
        return false;
    }
    command.process_group(0);
    true
}

#[cfg(not(unix))]
fn isolate_process_group(_command: &mut StdCommand, _request: &ProcessRequest<'_>) -> bool {
    false
}

/// Kills the child and reaps it. When the child leads its own process group, the
/// group is signalled first so grandchildren go down with it.
fn terminate(child: &mut Child, grouped: bool) {
    if grouped {
        kill_process_group(child.id());
    }
    if let Err(e) = child.kill() {
        log::debug!("Failed to kill child process {}: {}", child.id(), e);
    }
    child.wait().ok();
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    let status = StdCommand::new("kill")
        .args(["-KILL", "--", &format!("-{}", pgid)])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(status) if status.success() => {}
        Ok(status) => log::debug!("kill for process group {} exited with {}", pgid, status),
        Err(e) => log::warn!("Could not signal process group {}: {}", pgid, e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}
