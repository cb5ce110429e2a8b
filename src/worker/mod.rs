pub mod command;
pub mod events;
pub mod request;

use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use crossbeam_channel::Sender;
use uuid::Uuid;

use crate::config::StderrMode;
use crate::error::{AppError, AppResult};

pub use command::{build_invocation, Invocation, ToolCommand};
pub use events::{RunOutcome, WorkerEvent};
pub use request::{Method, RunRequest};

/// Launches the external tool for one request on a background thread.
#[derive(Debug, Clone)]
pub struct ProcessWorker {
    tool: ToolCommand,
}

pub struct WorkerHandle {
    pub run_id: String,
    pub join: thread::JoinHandle<()>,
}

impl ProcessWorker {
    pub fn new(tool: ToolCommand) -> Self {
        Self { tool }
    }

    /// Runs `request` to completion on a dedicated thread. `events` receives
    /// every output line followed by one `Finished`.
    pub fn start(&self, request: RunRequest, events: Sender<WorkerEvent>) -> AppResult<WorkerHandle> {
        let tool = self.tool.clone();
        let run_id = Uuid::new_v4().to_string();
        let span_id = run_id.clone();

        let join = thread::Builder::new()
            .name("deface-run-worker".to_owned())
            .spawn(move || {
                let span = tracing::info_span!("run", run_id = %span_id);
                let _entered = span.enter();

                let outcome = supervise(&tool, &request, &events);
                if outcome.succeeded {
                    tracing::info!("external tool finished");
                } else {
                    tracing::warn!(error = %outcome.error_message, "external tool failed");
                }
                if events.send(WorkerEvent::Finished(outcome)).is_err() {
                    tracing::warn!("run listener dropped before the outcome was delivered");
                }
            })
            .map_err(|error| AppError::Worker(format!("failed to spawn run worker: {error}")))?;

        Ok(WorkerHandle { run_id, join })
    }
}

/// Spawns the tool, forwards its output lines to `events` and returns the
/// outcome once it exits. Never panics and never returns an error; every
/// failure becomes a failed [`RunOutcome`].
pub fn supervise(tool: &ToolCommand, request: &RunRequest, events: &Sender<WorkerEvent>) -> RunOutcome {
    let invocation = build_invocation(tool, request);
    let program = invocation.program.as_str();

    let Some(executable) = resolve_executable(program, &tool.search_path) else {
        return RunOutcome::failure(tool_not_found_message(program));
    };
    tracing::info!(command = %invocation.display_line(), "starting external tool");

    let mut command = Command::new(&executable);
    command
        .args(&invocation.args)
        .env("PATH", &tool.search_path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(match tool.stderr {
            StderrMode::Merge => Stdio::piped(),
            StderrMode::Discard => Stdio::null(),
        });

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return RunOutcome::failure(tool_not_found_message(program));
        }
        Err(error) => return RunOutcome::failure(format!("failed to start {program}: {error}")),
    };

    let stderr_forwarder = match child.stderr.take() {
        Some(stderr) => {
            let stderr_events = events.clone();
            match thread::Builder::new()
                .name("deface-run-stderr".to_owned())
                .spawn(move || forward_lines(stderr, &stderr_events))
            {
                Ok(handle) => Some(handle),
                Err(error) => {
                    tracing::warn!("stderr forwarding unavailable: {error}");
                    None
                }
            }
        }
        None => None,
    };

    let streamed = match child.stdout.take() {
        Some(stdout) => forward_lines(stdout, events),
        None => Ok(()),
    };
    let status = child.wait();

    if let Some(handle) = stderr_forwarder {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(error)) => tracing::warn!("failed to read tool stderr: {error}"),
            Err(_) => tracing::warn!("stderr forwarding thread panicked"),
        }
    }

    if let Err(error) = streamed {
        return RunOutcome::failure(format!("failed to read {program} output: {error}"));
    }

    match status {
        Ok(status) => outcome_from_status(program, status),
        Err(error) => RunOutcome::failure(format!("failed to wait for {program}: {error}")),
    }
}

pub fn tool_not_found_message(program: &str) -> String {
    format!("tool not found: `{program}` is not on the search path")
}

fn resolve_executable(program: &str, search_path: &OsStr) -> Option<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    which::which_in(program, Some(search_path), cwd).ok()
}

/// Sends each line of `reader` as a log event. Line terminators are stripped,
/// blank lines are kept, invalid UTF-8 is replaced.
fn forward_lines<R: Read>(reader: R, events: &Sender<WorkerEvent>) -> io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    let mut listener_gone = false;

    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            return Ok(());
        }
        if listener_gone {
            // keep draining so the child never blocks on a full pipe
            continue;
        }

        let text = String::from_utf8_lossy(&buffer);
        let line = text.trim_end_matches(|c: char| c == '\n' || c == '\r');
        if events.send(WorkerEvent::Log(line.to_owned())).is_err() {
            listener_gone = true;
        }
    }
}

fn outcome_from_status(program: &str, status: ExitStatus) -> RunOutcome {
    if status.success() {
        return RunOutcome::success();
    }
    match status.code() {
        Some(code) => RunOutcome::failure(format!("{program} exited with code {code}")),
        None => RunOutcome::failure(describe_termination(program, status)),
    }
}

#[cfg(unix)]
fn describe_termination(program: &str, status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;

    match status.signal() {
        Some(signal) => format!("{program} terminated by signal {signal}"),
        None => format!("{program} terminated without an exit code"),
    }
}

#[cfg(not(unix))]
fn describe_termination(program: &str, _status: ExitStatus) -> String {
    format!("{program} terminated without an exit code")
}
