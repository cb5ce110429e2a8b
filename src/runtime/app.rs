use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use serde::Serialize;

use crate::bootstrap::{inherited_search_path, AppPaths};
use crate::config::AppConfig;
use crate::controller::{ControllerContext, RunController};
use crate::error::{AppError, AppResult};
use crate::history::{HistoryEntry, SettingsStore};
use crate::output::reveal::PlatformOpener;
use crate::output::{OutputReveal, RevealBackend};
use crate::provision::{
    ensure_tool_available, CommandRunner, InstallReport, InstallationChecker, SystemRunner,
};
use crate::ui::{Notifier, RunLog};
use crate::worker::{RunOutcome, RunRequest};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub log_file: Option<PathBuf>,
    pub reveal: bool,
}

/// Probes the external tool, offering to install it through `confirm` when
/// it is missing, and settles the search path runs will use.
pub fn prepare_context<F>(config: AppConfig, paths: AppPaths, confirm: F) -> AppResult<ControllerContext>
where
    F: FnOnce() -> bool,
{
    let checker = InstallationChecker::new(SystemRunner, &config, inherited_search_path());
    settle_context(checker, config, paths, confirm)
}

fn settle_context<R, F>(
    mut checker: InstallationChecker<R>,
    config: AppConfig,
    paths: AppPaths,
    confirm: F,
) -> AppResult<ControllerContext>
where
    R: CommandRunner,
    F: FnOnce() -> bool,
{
    if !ensure_tool_available(&mut checker, confirm) {
        let reason = match checker.last_install() {
            Some(report) => format!(
                "`{}` is still unusable after installation:\n{}",
                config.tool.program,
                report.render_text()
            ),
            None => format!(
                "`{}` cannot be used; run `deface-shell doctor` for details or `deface-shell install`",
                config.tool.program
            ),
        };
        return Err(AppError::ToolUnavailable(reason));
    }

    Ok(ControllerContext {
        search_path: checker.into_search_path(),
        config,
        paths,
    })
}

pub fn run_job(context: ControllerContext, request: RunRequest, options: &RunOptions) -> AppResult<RunOutcome> {
    let mut controller = RunController::new(context);
    run_on_terminal(&mut controller, request, options)
}

/// Repeats the displayed history entry at `index`.
pub fn rerun_job(context: ControllerContext, index: usize, options: &RunOptions) -> AppResult<RunOutcome> {
    let mut controller = RunController::new(context);
    let request = controller.rerun_request(index)?;
    run_on_terminal(&mut controller, request, options)
}

fn run_on_terminal(
    controller: &mut RunController,
    request: RunRequest,
    options: &RunOptions,
) -> AppResult<RunOutcome> {
    let notifier = Notifier::new(controller.context().config.output.enable_notifications);
    let mut log = RunLog::stdout();
    execute_run(controller, request, options, &mut log, &notifier, &PlatformOpener)
}

/// Submits `request`, streams its log into `log` and performs the follow-up
/// actions once the run is over: saving the log, notifying, revealing the
/// output folder on success.
pub fn execute_run<W, B>(
    controller: &mut RunController,
    request: RunRequest,
    options: &RunOptions,
    log: &mut RunLog<W>,
    notifier: &Notifier,
    opener: &B,
) -> AppResult<RunOutcome>
where
    W: Write,
    B: RevealBackend + ?Sized,
{
    let output_path = request.output_path.clone();
    let reveal = options.reveal || controller.context().config.output.reveal_on_success;

    let events = controller.submit(request)?;
    let outcome = controller.drain(&events, |line| log.push(line))?;

    if let Some(path) = &options.log_file {
        match log.save(path) {
            Ok(saved) => tracing::info!(path = %saved.display(), "run log saved"),
            Err(error) => tracing::warn!(path = %path.display(), "failed to save run log: {error}"),
        }
    }

    notifier.run_finished(&outcome, &output_path);

    if outcome.succeeded {
        tracing::info!(output = %output_path.display(), "processing completed");
        if reveal {
            if let Err(error) = OutputReveal::reveal_with(&output_path, opener) {
                tracing::warn!("could not open output folder: {error}");
            }
        }
    }

    Ok(outcome)
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallSummary {
    pub available: bool,
    pub attempted: bool,
    pub report: Option<InstallReport>,
}

impl InstallSummary {
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if let Some(report) = &self.report {
            out.push_str(&report.render_text());
        }
        out.push_str(match (self.available, self.attempted) {
            (true, false) => "deface is already available\n",
            (true, true) => "deface is now available\n",
            (false, false) => "Installation declined\n",
            (false, true) => "deface is still unavailable; see `deface-shell doctor`\n",
        });
        out
    }
}

/// Checks availability and, after `confirm` agrees, installs the tool.
pub fn install_tool<R, F>(checker: &mut InstallationChecker<R>, confirm: F) -> InstallSummary
where
    R: CommandRunner,
    F: FnOnce() -> bool,
{
    let available = ensure_tool_available(checker, confirm);
    let report = checker.last_install().cloned();
    InstallSummary {
        available,
        attempted: report.is_some(),
        report,
    }
}

/// Asks a yes/no question on the terminal. Anything but `y`/`yes` is a no.
pub fn confirm_on_terminal<R: BufRead, W: Write>(prompt: &str, input: &mut R, output: &mut W) -> bool {
    if write!(output, "{prompt} [y/N] ").and_then(|_| output.flush()).is_err() {
        return false;
    }
    let mut answer = String::new();
    if input.read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub fn confirm_install_on_stdin() -> bool {
    confirm_on_terminal(
        "deface is not installed. Install it now?",
        &mut io::stdin().lock(),
        &mut io::stdout(),
    )
}

pub fn history_report(store: &SettingsStore, json: bool) -> AppResult<String> {
    let recent = store.recent_history();
    if json {
        return Ok(serde_json::to_string_pretty(recent)?);
    }

    if recent.is_empty() {
        return Ok("No runs recorded yet.\n".to_owned());
    }

    let mut out = String::new();
    for (index, entry) in recent.iter().enumerate() {
        out.push_str(&format_history_line(index, entry));
    }
    Ok(out)
}

fn format_history_line(index: usize, entry: &HistoryEntry) -> String {
    format!(
        "[{index}] {} -> {} ({})\n",
        entry.label(),
        entry.output_path,
        entry.method
    )
}

pub fn open_store(config: &AppConfig, paths: &AppPaths) -> SettingsStore {
    let settings_path = config
        .history
        .settings_path
        .clone()
        .unwrap_or_else(|| paths.settings_file.clone());
    SettingsStore::open(settings_path, config.history.display_limit)
}

pub fn status_report(config: &AppConfig, paths: &AppPaths) -> String {
    let store = open_store(config, paths);

    let mut output = String::new();
    output.push_str("deface-shell status\n");
    output.push_str(&format!("  config: {}\n", paths.config_file.display()));
    output.push_str(&format!("  settings: {}\n", store.path().display()));
    output.push_str(&format!("  tool: {}\n", config.tool.program));
    output.push_str(&format!(
        "  defaults: method={} threshold={} mosaic_size={} keep_audio={} preview={}\n",
        config.defaults.method,
        config.defaults.threshold,
        config.defaults.mosaic_size,
        config.defaults.keep_audio,
        config.defaults.preview
    ));
    output.push_str(&format!("  runs_recorded: {}\n", store.document().history.len()));
    if let Some(latest) = store.latest() {
        output.push_str(&format!(
            "  last_run: {} -> {} ({})\n",
            latest.label(),
            latest.output_path,
            latest.method
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::{confirm_on_terminal, history_report, install_tool, settle_context, status_report};
    use crate::bootstrap::AppPaths;
    use crate::config::AppConfig;
    use crate::error::AppError;
    use crate::history::{HistoryEntry, SettingsStore};
    use crate::provision::InstallationChecker;
    use crate::test_support::{ok, ScriptedRunner};
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};

    fn make_paths(root: &Path) -> AppPaths {
        AppPaths {
            config_dir: root.join("config"),
            config_file: root.join("config/config.toml"),
            settings_file: root.join("home/.deface_gui_settings.json"),
            local_bin_dir: root.join("home/.local/bin"),
        }
    }

    fn entry(n: usize) -> HistoryEntry {
        HistoryEntry {
            timestamp: format!("2026-04-{:02} 09:30", n + 1),
            input_path: format!("/videos/in-{n}.mp4"),
            output_path: format!("/videos/in-{n}_anonymized.mp4"),
            method: "mosaic".to_owned(),
        }
    }

    #[test]
    fn confirmation_accepts_only_yes() {
        for (answer, expected) in [("y\n", true), ("YES\n", true), ("\n", false), ("nope\n", false), ("", false)] {
            let mut output = Vec::new();
            let confirmed = confirm_on_terminal("Install?", &mut answer.as_bytes(), &mut output);
            assert_eq!(confirmed, expected, "{answer:?}");
            assert_eq!(output, b"Install? [y/N] ");
        }
    }

    #[test]
    fn history_report_lists_window_with_indices() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let mut store = SettingsStore::open(temp.path().join("s.json"), 2);
        assert_eq!(history_report(&store, false).expect("text"), "No runs recorded yet.\n");

        for n in 0..3 {
            store.append_history(entry(n));
        }

        let text = history_report(&store, false).expect("text");
        assert_eq!(
            text,
            "[0] 2026-04-02 09:30 - in-1.mp4 -> /videos/in-1_anonymized.mp4 (mosaic)\n\
             [1] 2026-04-03 09:30 - in-2.mp4 -> /videos/in-2_anonymized.mp4 (mosaic)\n"
        );

        let json: serde_json::Value =
            serde_json::from_str(&history_report(&store, true).expect("json")).expect("parse");
        assert_eq!(json.as_array().map(Vec::len), Some(2));
        assert_eq!(json[0]["date"], "2026-04-02 09:30");
    }

    #[test]
    fn status_report_contains_paths_and_last_run() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let paths = make_paths(temp.path());
        let mut config = AppConfig::default();
        config.history.settings_path = Some(temp.path().join("settings.json"));
        let mut store = SettingsStore::open(temp.path().join("settings.json"), 10);
        store.append_history(entry(0));

        let report = status_report(&config, &paths);
        assert!(report.starts_with("deface-shell status\n"));
        assert!(report.contains("config:"));
        assert!(report.contains("settings:"));
        assert!(report.contains("runs_recorded: 1"));
        assert!(report.contains("last_run: 2026-04-01 09:30 - in-0.mp4"));
    }

    #[test]
    fn install_tool_skips_install_when_available() {
        let runner = ScriptedRunner::new()
            .on("python3 -c import deface", ok(""))
            .on("deface --help", ok("usage"));
        let mut checker =
            InstallationChecker::new(runner, &AppConfig::default(), OsString::from("/usr/bin"));

        let summary = install_tool(&mut checker, || panic!("must not ask"));

        assert!(summary.available);
        assert!(!summary.attempted);
        assert_eq!(summary.render_text(), "deface is already available\n");
    }

    #[test]
    fn install_tool_reports_declined_and_attempted_installs() {
        let mut checker =
            InstallationChecker::new(ScriptedRunner::new(), &AppConfig::default(), OsString::from("/usr/bin"));
        let declined = install_tool(&mut checker, || false);
        assert!(!declined.available);
        assert!(declined.render_text().contains("declined"));

        let mut config = AppConfig::default();
        config.install.marker_file = Some(PathBuf::from("/nonexistent/EXTERNALLY-MANAGED"));
        let mut checker = InstallationChecker::new(ScriptedRunner::new(), &config, OsString::from("/usr/bin"));
        let attempted = install_tool(&mut checker, || true);
        assert!(!attempted.available);
        assert!(attempted.attempted);
        assert!(attempted.render_text().contains("No installation strategy succeeded"));
    }

    #[test]
    fn run_context_is_settled_without_asking_when_tool_works() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let local_bin = temp.path().join("home/.local/bin");
        let runner = ScriptedRunner::new()
            .on("python3 -c import deface", ok(""))
            .on_with_dir("deface --help", &local_bin, ok("usage"));
        let mut config = AppConfig::default();
        config.tool.local_bin_dir = Some(local_bin.clone());
        let checker = InstallationChecker::new(runner, &config, OsString::from("/usr/bin"));

        let context = settle_context(checker, config, make_paths(temp.path()), || panic!("must not ask"))
            .expect("context");

        assert!(std::env::split_paths(&context.search_path).any(|dir| dir == local_bin));
    }

    #[test]
    fn missing_tool_offers_installation_before_running() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let mut asked = 0;
        let checker =
            InstallationChecker::new(ScriptedRunner::new(), &AppConfig::default(), OsString::from("/usr/bin"));
        let declined = settle_context(checker, AppConfig::default(), make_paths(temp.path()), || {
            asked += 1;
            false
        });
        assert_eq!(asked, 1);
        assert!(matches!(declined, Err(AppError::ToolUnavailable(message)) if message.contains("deface-shell install")));

        let mut config = AppConfig::default();
        config.install.marker_file = Some(PathBuf::from("/nonexistent/EXTERNALLY-MANAGED"));
        let checker = InstallationChecker::new(ScriptedRunner::new(), &config, OsString::from("/usr/bin"));
        let attempted = settle_context(checker, config, make_paths(temp.path()), || true);
        assert!(matches!(
            attempted,
            Err(AppError::ToolUnavailable(message)) if message.contains("still unusable after installation")
        ));
    }

    #[cfg(unix)]
    mod unix {
        use super::make_paths;
        use crate::config::AppConfig;
        use crate::controller::{ControllerContext, RunController};
        use crate::output::RevealBackend;
        use crate::runtime::app::{execute_run, RunOptions};
        use crate::ui::{Notifier, RunLog};
        use crate::worker::{Method, RunRequest};
        use std::ffi::OsString;
        use std::path::{Path, PathBuf};
        use std::sync::Mutex;

        #[derive(Default)]
        struct SpyOpener {
            opened: Mutex<Vec<PathBuf>>,
        }

        impl RevealBackend for SpyOpener {
            fn open(&self, target: &Path) -> Result<(), String> {
                self.opened.lock().expect("lock opened").push(target.to_path_buf());
                Ok(())
            }
        }

        fn controller(root: &Path, script_body: &str) -> RunController {
            let script = root.join("fake-deface.sh");
            std::fs::write(&script, script_body).expect("script");
            let mut config = AppConfig::default();
            config.tool.program = "sh".to_owned();
            config.tool.extra_args = vec![script.to_string_lossy().into_owned()];
            config.history.settings_path = Some(root.join("settings.json"));
            RunController::new(ControllerContext {
                config,
                paths: make_paths(root),
                search_path: OsString::from("/usr/bin:/bin"),
            })
        }

        fn request(root: &Path) -> RunRequest {
            let input = root.join("clip.mp4");
            std::fs::write(&input, b"x").expect("input");
            RunRequest {
                input_path: input,
                output_path: root.join("out/clip_anonymized.mp4"),
                method: Method::Mosaic,
                keep_audio: false,
                preview: true,
                detection_threshold: 0.5,
                mosaic_block_size: 10,
            }
        }

        #[test]
        fn successful_run_saves_log_and_reveals_folder() {
            let temp = tempfile::TempDir::new().expect("tempdir");
            std::fs::create_dir_all(temp.path().join("out")).expect("out dir");
            let mut controller = controller(temp.path(), "echo 'processing clip.mp4'\necho done\n");
            let opener = SpyOpener::default();
            let mut log = RunLog::new(Vec::new());
            let options = RunOptions {
                log_file: Some(temp.path().join("run.log")),
                reveal: true,
            };

            let outcome = execute_run(
                &mut controller,
                request(temp.path()),
                &options,
                &mut log,
                &Notifier::new(false),
                &opener,
            )
            .expect("run");

            assert!(outcome.succeeded);
            assert_eq!(
                std::fs::read_to_string(temp.path().join("run.log")).expect("log"),
                "processing clip.mp4\ndone\n"
            );
            assert_eq!(
                opener.opened.lock().expect("lock opened").as_slice(),
                [temp.path().join("out")]
            );
        }

        #[test]
        fn failed_run_does_not_reveal() {
            let temp = tempfile::TempDir::new().expect("tempdir");
            std::fs::create_dir_all(temp.path().join("out")).expect("out dir");
            let mut controller = controller(temp.path(), "echo oops\nexit 3\n");
            let opener = SpyOpener::default();
            let mut log = RunLog::new(Vec::new());

            let outcome = execute_run(
                &mut controller,
                request(temp.path()),
                &RunOptions {
                    log_file: None,
                    reveal: true,
                },
                &mut log,
                &Notifier::new(false),
                &opener,
            )
            .expect("run");

            assert!(!outcome.succeeded);
            assert!(outcome.error_message.contains('3'));
            assert_eq!(log.lines(), ["oops"]);
            assert!(opener.opened.lock().expect("lock opened").is_empty());
        }
    }
}
