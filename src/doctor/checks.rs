use chrono::Utc;
use regex::Regex;

use crate::doctor::report::{CheckResult, CheckStatus, DoctorReport};
use crate::provision::{CommandRunner, CommandSpec, CommandStatus, InstallationChecker};

const MIN_PYTHON_VERSION: &str = "3.8";

pub fn run_doctor<R: CommandRunner>(checker: &mut InstallationChecker<R>) -> DoctorReport {
    let python = checker.python().to_owned();
    let mut checks = vec![
        check_python_version(checker.runner(), &python, checker.search_path()),
        check_pip(checker.runner(), &python, checker.search_path()),
    ];

    let probe = checker.probe();
    checks.push(probe_check(
        "deface_module",
        &probe.module_import,
        true,
        "Run `deface-shell install` to install the deface package.",
    ));
    checks.push(probe_check(
        "deface_cli",
        &probe.cli,
        !probe.cli_succeeded(),
        "Ensure the deface command is on PATH or set tool.program.",
    ));
    checks.push(match &probe.cli_after_fixup {
        Some(status) if status.succeeded() => CheckResult {
            name: "deface_cli_local_bin".to_owned(),
            status: CheckStatus::Warn,
            detail: "found only after adding the user-local bin dir to the search path".to_owned(),
            required: false,
            remediation: Some("Add ~/.local/bin to PATH in your shell profile.".to_owned()),
        },
        Some(status) => probe_check(
            "deface_cli_local_bin",
            status,
            false,
            "Run `deface-shell install` to install the deface package.",
        ),
        None => CheckResult {
            name: "deface_cli_local_bin".to_owned(),
            status: CheckStatus::Skip,
            detail: "not needed".to_owned(),
            required: false,
            remediation: None,
        },
    });

    DoctorReport {
        generated_at_rfc3339: Utc::now().to_rfc3339(),
        state: probe.state(),
        search_path: checker.search_path().to_string_lossy().into_owned(),
        checks,
    }
}

fn probe_check(name: &str, status: &CommandStatus, required: bool, remediation: &str) -> CheckResult {
    if status.succeeded() {
        CheckResult {
            name: name.to_owned(),
            status: CheckStatus::Pass,
            detail: "ok".to_owned(),
            required,
            remediation: None,
        }
    } else {
        CheckResult {
            name: name.to_owned(),
            status: if required { CheckStatus::Fail } else { CheckStatus::Warn },
            detail: status.describe(),
            required,
            remediation: Some(remediation.to_owned()),
        }
    }
}

fn check_python_version<R: CommandRunner>(
    runner: &R,
    python: &str,
    search_path: &std::ffi::OsStr,
) -> CheckResult {
    let remediation = Some(format!("Install python3 >= {MIN_PYTHON_VERSION}."));
    let status = runner.run(&CommandSpec::new(python, &["--version"]), search_path);
    let Some(text) = status.stdout() else {
        return CheckResult {
            name: python.to_owned(),
            status: CheckStatus::Fail,
            detail: status.describe(),
            required: true,
            remediation,
        };
    };

    match parse_version_triplet(text) {
        Some(found) if version_at_least(&found, &parse_target_version(MIN_PYTHON_VERSION)) => {
            CheckResult {
                name: python.to_owned(),
                status: CheckStatus::Pass,
                detail: format!("{} (>= {MIN_PYTHON_VERSION})", version_triplet_string(&found)),
                required: true,
                remediation: None,
            }
        }
        Some(found) => CheckResult {
            name: python.to_owned(),
            status: CheckStatus::Fail,
            detail: format!("{} (< {MIN_PYTHON_VERSION})", version_triplet_string(&found)),
            required: true,
            remediation,
        },
        None => CheckResult {
            name: python.to_owned(),
            status: CheckStatus::Warn,
            detail: "installed, version parse failed".to_owned(),
            required: true,
            remediation,
        },
    }
}

fn check_pip<R: CommandRunner>(runner: &R, python: &str, search_path: &std::ffi::OsStr) -> CheckResult {
    let status = runner.run(&CommandSpec::new(python, &["-m", "pip", "--version"]), search_path);
    match status.stdout().and_then(parse_version_triplet) {
        Some(found) => CheckResult {
            name: "pip".to_owned(),
            status: CheckStatus::Pass,
            detail: version_triplet_string(&found),
            required: false,
            remediation: None,
        },
        None if status.succeeded() => CheckResult {
            name: "pip".to_owned(),
            status: CheckStatus::Pass,
            detail: "installed, version parse failed".to_owned(),
            required: false,
            remediation: None,
        },
        None => CheckResult {
            name: "pip".to_owned(),
            status: CheckStatus::Warn,
            detail: status.describe(),
            required: false,
            remediation: Some(
                "Installation needs pip; rerun install with --allow-elevation to bootstrap it.".to_owned(),
            ),
        },
    }
}

fn parse_version_triplet(text: &str) -> Option<[u32; 3]> {
    let regex = Regex::new(r"(?P<a>\d+)\.(?P<b>\d+)(?:\.(?P<c>\d+))?").ok()?;
    let captures = regex.captures(text)?;

    let major = captures.name("a")?.as_str().parse::<u32>().ok()?;
    let minor = captures.name("b")?.as_str().parse::<u32>().ok()?;
    let patch = captures
        .name("c")
        .map(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(Some(0))?;

    Some([major, minor, patch])
}

fn parse_target_version(text: &str) -> [u32; 3] {
    let mut parts = text
        .split('.')
        .filter_map(|part| part.parse::<u32>().ok())
        .collect::<Vec<_>>();
    parts.resize(3, 0);
    [parts[0], parts[1], parts[2]]
}

fn version_at_least(found: &[u32; 3], required: &[u32; 3]) -> bool {
    found >= required
}

fn version_triplet_string(value: &[u32; 3]) -> String {
    format!("{}.{}.{}", value[0], value[1], value[2])
}
