use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{InstallConfig, ToolConfig};
use crate::provision::runner::{CommandRunner, CommandSpec};

pub const MARKER_FILE_NAME: &str = "EXTERNALLY-MANAGED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStrategy {
    Plain,
    UserScoped,
    Elevated,
    BreakSystemPackages,
}

impl InstallStrategy {
    /// Order in which strategies are attempted.
    pub const ORDER: [InstallStrategy; 4] = [
        InstallStrategy::Plain,
        InstallStrategy::UserScoped,
        InstallStrategy::Elevated,
        InstallStrategy::BreakSystemPackages,
    ];

    pub fn requires_elevation(self) -> bool {
        matches!(self, InstallStrategy::Elevated)
    }

    pub fn label(self) -> &'static str {
        match self {
            InstallStrategy::Plain => "pip install",
            InstallStrategy::UserScoped => "pip install --user",
            InstallStrategy::Elevated => "elevated pip install",
            InstallStrategy::BreakSystemPackages => "pip install --break-system-packages",
        }
    }

    fn command(self, plan: &InstallPlan) -> CommandSpec {
        let package = plan.package.as_str();
        match self {
            InstallStrategy::Plain => {
                CommandSpec::new(&plan.python, &["-m", "pip", "install", package])
            }
            InstallStrategy::UserScoped => {
                CommandSpec::new(&plan.python, &["-m", "pip", "install", "--user", package])
            }
            InstallStrategy::Elevated => {
                CommandSpec::new(&plan.python, &["-m", "pip", "install", package])
                    .elevated(&plan.elevation_command)
            }
            InstallStrategy::BreakSystemPackages => CommandSpec::new(
                &plan.python,
                &["-m", "pip", "install", "--break-system-packages", package],
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "strategy", rename_all = "snake_case")]
pub enum InstallStep {
    EnsurePip,
    RemoveMarker,
    Install(InstallStrategy),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded(String),
    Failed(String),
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: InstallStep,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub steps: Vec<StepRecord>,
    pub installed_with: Option<InstallStrategy>,
}

impl InstallReport {
    pub fn succeeded(&self) -> bool {
        self.installed_with.is_some()
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for record in &self.steps {
            let step = match record.step {
                InstallStep::EnsurePip => "ensure pip".to_owned(),
                InstallStep::RemoveMarker => "remove install marker".to_owned(),
                InstallStep::Install(strategy) => strategy.label().to_owned(),
            };
            let (label, detail) = match &record.status {
                StepStatus::Succeeded(detail) => ("OK", detail),
                StepStatus::Failed(detail) => ("FAIL", detail),
                StepStatus::Skipped(detail) => ("SKIP", detail),
            };
            out.push_str(&format!("{:<40} {:<5} {}\n", step, label, detail));
        }
        match self.installed_with {
            Some(strategy) => out.push_str(&format!("Installed using {}\n", strategy.label())),
            None => out.push_str("No installation strategy succeeded\n"),
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub python: String,
    pub package: String,
    pub elevation_command: String,
    pub allow_elevation: bool,
    pub marker_file: Option<PathBuf>,
}

impl InstallPlan {
    pub fn from_config(tool: &ToolConfig, install: &InstallConfig) -> Self {
        Self {
            python: tool.python.clone(),
            package: install.package.clone(),
            elevation_command: install.elevation_command.clone(),
            allow_elevation: install.allow_elevation,
            marker_file: install.marker_file.clone(),
        }
    }
}

/// Best-effort installation of the external tool. Each step's failure is
/// recorded and the next step runs; strategies stop at the first success.
/// Steps needing elevated rights are skipped unless the plan allows them.
pub fn run_install<R: CommandRunner + ?Sized>(
    runner: &R,
    plan: &InstallPlan,
    search_path: &OsStr,
) -> InstallReport {
    let mut report = InstallReport::default();

    let pip_status = ensure_pip(runner, plan, search_path);
    record(&mut report, InstallStep::EnsurePip, pip_status);

    let marker_status = remove_marker(runner, plan, search_path);
    record(&mut report, InstallStep::RemoveMarker, marker_status);

    for strategy in InstallStrategy::ORDER {
        if strategy.requires_elevation() && !plan.allow_elevation {
            record(
                &mut report,
                InstallStep::Install(strategy),
                StepStatus::Skipped(elevation_refused()),
            );
            continue;
        }

        let spec = strategy.command(plan);
        let status = runner.run(&spec, search_path);
        if status.succeeded() {
            record(
                &mut report,
                InstallStep::Install(strategy),
                StepStatus::Succeeded(spec.display_line()),
            );
            report.installed_with = Some(strategy);
            break;
        }
        record(
            &mut report,
            InstallStep::Install(strategy),
            StepStatus::Failed(status.describe()),
        );
    }

    report
}

fn record(report: &mut InstallReport, step: InstallStep, status: StepStatus) {
    match &status {
        StepStatus::Succeeded(detail) => tracing::info!(?step, "{detail}"),
        StepStatus::Failed(detail) => tracing::warn!(?step, "{detail}"),
        StepStatus::Skipped(detail) => tracing::info!(?step, "skipped: {detail}"),
    }
    report.steps.push(StepRecord { step, status });
}

fn elevation_refused() -> String {
    "needs elevated rights; rerun with --allow-elevation".to_owned()
}

fn ensure_pip<R: CommandRunner + ?Sized>(
    runner: &R,
    plan: &InstallPlan,
    search_path: &OsStr,
) -> StepStatus {
    let probe = CommandSpec::new(&plan.python, &["-m", "pip", "--version"]);
    if runner.run(&probe, search_path).succeeded() {
        return StepStatus::Succeeded("pip already available".to_owned());
    }
    if !plan.allow_elevation {
        return StepStatus::Skipped(format!("pip missing; {}", elevation_refused()));
    }

    let update = CommandSpec::new("apt", &["update"]).elevated(&plan.elevation_command);
    let update_status = runner.run(&update, search_path);
    if !update_status.succeeded() {
        return StepStatus::Failed(format!("{}: {}", update.display_line(), update_status.describe()));
    }

    let install = CommandSpec::new("apt", &["install", "-y", "python3-pip"])
        .elevated(&plan.elevation_command);
    let install_status = runner.run(&install, search_path);
    if install_status.succeeded() {
        StepStatus::Succeeded(install.display_line())
    } else {
        StepStatus::Failed(format!("{}: {}", install.display_line(), install_status.describe()))
    }
}

fn remove_marker<R: CommandRunner + ?Sized>(
    runner: &R,
    plan: &InstallPlan,
    search_path: &OsStr,
) -> StepStatus {
    let Some(marker) = locate_marker(runner, plan, search_path) else {
        return StepStatus::Skipped("could not determine the interpreter's stdlib path".to_owned());
    };
    if !marker.exists() {
        return StepStatus::Skipped(format!("no marker at {}", marker.display()));
    }
    if !plan.allow_elevation {
        return StepStatus::Skipped(format!("{} present; {}", marker.display(), elevation_refused()));
    }

    let marker_arg = marker.to_string_lossy();
    let remove = CommandSpec::new("rm", &["-f", marker_arg.as_ref()]).elevated(&plan.elevation_command);
    let status = runner.run(&remove, search_path);
    if status.succeeded() {
        StepStatus::Succeeded(format!("removed {}", marker.display()))
    } else {
        StepStatus::Failed(status.describe())
    }
}

fn locate_marker<R: CommandRunner + ?Sized>(
    runner: &R,
    plan: &InstallPlan,
    search_path: &OsStr,
) -> Option<PathBuf> {
    if let Some(marker) = &plan.marker_file {
        return Some(marker.clone());
    }

    let query = CommandSpec::new(
        &plan.python,
        &["-c", "import sysconfig; print(sysconfig.get_path('stdlib'))"],
    );
    let status = runner.run(&query, search_path);
    let stdlib = status.stdout()?.trim();
    if stdlib.is_empty() {
        return None;
    }
    Some(Path::new(stdlib).join(MARKER_FILE_NAME))
}
