use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

use crate::bootstrap::search_path_contains;
use crate::provision::runner::{CommandRunner, CommandSpec, CommandStatus};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub fn lock_env() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

/// Sets or clears one env var and restores the previous value on drop.
/// Hold [`lock_env`] for as long as the guard lives.
pub struct EnvVarGuard {
    key: &'static str,
    old: Option<String>,
}

impl EnvVarGuard {
    pub fn set(key: &'static str, value: &str) -> Self {
        let old = std::env::var(key).ok();
        std::env::set_var(key, value);
        Self { key, old }
    }

    pub fn clear(key: &'static str) -> Self {
        let old = std::env::var(key).ok();
        std::env::remove_var(key);
        Self { key, old }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match self.old.as_ref() {
            Some(value) => std::env::set_var(self.key, value),
            None => std::env::remove_var(self.key),
        }
    }
}

/// `CommandRunner` answering from a fixed rule list and recording each call.
/// Commands without a matching rule behave as missing executables.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<ScriptedRule>,
    calls: Mutex<Vec<(String, OsString)>>,
}

struct ScriptedRule {
    line: String,
    needs_dir: Option<PathBuf>,
    status: CommandStatus,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, line: &str, status: CommandStatus) -> Self {
        self.rules.push(ScriptedRule {
            line: line.to_owned(),
            needs_dir: None,
            status,
        });
        self
    }

    /// Rule that only matches when `dir` is on the search path.
    pub fn on_with_dir(mut self, line: &str, dir: &Path, status: CommandStatus) -> Self {
        self.rules.push(ScriptedRule {
            line: line.to_owned(),
            needs_dir: Some(dir.to_path_buf()),
            status,
        });
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("lock calls")
            .iter()
            .map(|(line, _)| line.clone())
            .collect()
    }

    pub fn search_paths_for(&self, line: &str) -> Vec<OsString> {
        self.calls
            .lock()
            .expect("lock calls")
            .iter()
            .filter(|(called, _)| called == line)
            .map(|(_, path)| path.clone())
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec, search_path: &OsStr) -> CommandStatus {
        let line = spec.display_line();
        self.calls
            .lock()
            .expect("lock calls")
            .push((line.clone(), search_path.to_os_string()));

        self.rules
            .iter()
            .find(|rule| {
                rule.line == line
                    && rule.needs_dir.as_ref().map_or(true, |dir| {
                        search_path_contains(search_path, dir)
                    })
            })
            .map(|rule| rule.status.clone())
            .unwrap_or(CommandStatus::Missing)
    }
}

pub fn ok(stdout: &str) -> CommandStatus {
    CommandStatus::Success {
        stdout: stdout.to_owned(),
    }
}

pub fn failed(code: i32) -> CommandStatus {
    CommandStatus::Failed {
        code: Some(code),
        stderr: String::new(),
    }
}
