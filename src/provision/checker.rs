use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use serde::Serialize;

use crate::bootstrap::prepend_search_dir;
use crate::config::AppConfig;
use crate::provision::install::{run_install, InstallPlan, InstallReport};
use crate::provision::runner::{CommandRunner, CommandSpec, CommandStatus};
use crate::provision::ToolProvisioner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationState {
    Available,
    Unavailable,
}

/// Result of one availability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub module_import: CommandStatus,
    pub cli: CommandStatus,
    /// Retry of the CLI check after the user-local bin dir joined the search path.
    pub cli_after_fixup: Option<CommandStatus>,
}

impl Probe {
    pub fn cli_succeeded(&self) -> bool {
        self.cli.succeeded()
            || self
                .cli_after_fixup
                .as_ref()
                .is_some_and(CommandStatus::succeeded)
    }

    pub fn state(&self) -> InstallationState {
        if self.module_import.succeeded() && self.cli_succeeded() {
            InstallationState::Available
        } else {
            InstallationState::Unavailable
        }
    }
}

pub struct InstallationChecker<R: CommandRunner> {
    runner: R,
    program: String,
    python: String,
    module: String,
    local_bin_dir: Option<PathBuf>,
    search_path: OsString,
    plan: InstallPlan,
    last_install: Option<InstallReport>,
}

impl<R: CommandRunner> InstallationChecker<R> {
    pub fn new(runner: R, config: &AppConfig, search_path: OsString) -> Self {
        Self {
            runner,
            program: config.tool.program.clone(),
            python: config.tool.python.clone(),
            module: config.tool.module.clone(),
            local_bin_dir: config.tool.local_bin_dir.clone(),
            search_path,
            plan: InstallPlan::from_config(&config.tool, &config.install),
            last_install: None,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn python(&self) -> &str {
        &self.python
    }

    /// Search path every later command should use. Includes the user-local
    /// bin dir once a probe has needed it.
    pub fn search_path(&self) -> &OsStr {
        &self.search_path
    }

    pub fn into_search_path(self) -> OsString {
        self.search_path
    }

    pub fn probe(&mut self) -> Probe {
        let import = format!("import {}", self.module);
        let module_import = self
            .runner
            .run(&CommandSpec::new(&self.python, &["-c", &import]), &self.search_path);

        let help = CommandSpec::new(&self.program, &["--help"]);
        let cli = self.runner.run(&help, &self.search_path);

        let cli_after_fixup = match (&self.local_bin_dir, cli.succeeded()) {
            (Some(dir), false) => {
                self.search_path = prepend_search_dir(&self.search_path, dir);
                tracing::debug!(dir = %dir.display(), "retrying CLI check with user-local bin dir");
                Some(self.runner.run(&help, &self.search_path))
            }
            _ => None,
        };

        let probe = Probe {
            module_import,
            cli,
            cli_after_fixup,
        };
        tracing::debug!(state = ?probe.state(), "probed external tool");
        probe
    }

    pub fn install_report(&self) -> InstallReport {
        run_install(&self.runner, &self.plan, &self.search_path)
    }

    pub fn last_install(&self) -> Option<&InstallReport> {
        self.last_install.as_ref()
    }
}

impl<R: CommandRunner> ToolProvisioner for InstallationChecker<R> {
    fn is_available(&mut self) -> bool {
        self.probe().state() == InstallationState::Available
    }

    fn attempt_install(&mut self) -> bool {
        let report = self.install_report();
        let succeeded = report.succeeded();
        if !succeeded {
            tracing::warn!("installation did not succeed:\n{}", report.render_text());
        }
        self.last_install = Some(report);
        succeeded
    }
}
