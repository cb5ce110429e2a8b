use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Command, Stdio};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
        }
    }

    /// Same command run through `elevation` (e.g. `pkexec apt update`).
    pub fn elevated(self, elevation: &str) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: elevation.to_owned(),
            args,
        }
    }

    pub fn display_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Success { stdout: String },
    Failed { code: Option<i32>, stderr: String },
    Missing,
}

impl CommandStatus {
    pub fn succeeded(&self) -> bool {
        matches!(self, CommandStatus::Success { .. })
    }

    pub fn stdout(&self) -> Option<&str> {
        match self {
            CommandStatus::Success { stdout } => Some(stdout),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            CommandStatus::Success { .. } => "ok".to_owned(),
            CommandStatus::Failed {
                code: Some(code),
                stderr,
            } => format_failure(&format!("exit code {code}"), stderr),
            CommandStatus::Failed { code: None, stderr } => {
                format_failure("terminated without exit code", stderr)
            }
            CommandStatus::Missing => "executable not found".to_owned(),
        }
    }
}

fn format_failure(head: &str, stderr: &str) -> String {
    match stderr.lines().rev().find(|line| !line.trim().is_empty()) {
        Some(last) => format!("{head}: {}", last.trim()),
        None => head.to_owned(),
    }
}

/// Runs short-lived helper commands for probing and installation.
pub trait CommandRunner {
    fn run(&self, spec: &CommandSpec, search_path: &OsStr) -> CommandStatus;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec, search_path: &OsStr) -> CommandStatus {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let Ok(executable) = which::which_in(&spec.program, Some(search_path), cwd) else {
            tracing::debug!(command = %spec.display_line(), "executable not found");
            return CommandStatus::Missing;
        };

        let output = Command::new(executable)
            .args(&spec.args)
            .env("PATH", search_path)
            .stdin(Stdio::null())
            .output();

        match output {
            Ok(output) if output.status.success() => CommandStatus::Success {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            },
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                tracing::debug!(
                    command = %spec.display_line(),
                    code = ?output.status.code(),
                    "helper command failed"
                );
                CommandStatus::Failed {
                    code: output.status.code(),
                    stderr,
                }
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => CommandStatus::Missing,
            Err(error) => CommandStatus::Failed {
                code: None,
                stderr: error.to_string(),
            },
        }
    }
}
