pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod controller;
pub mod doctor;
pub mod error;
pub mod history;
pub mod output;
pub mod provision;
pub mod runtime;
#[cfg(test)]
mod test_support;
pub mod ui;
pub mod worker;

use clap::Parser;

use crate::bootstrap::{inherited_search_path, AppPaths};
use crate::cli::{Cli, Command, HistoryAction, RunArgs};
use crate::config::{load_config, AppConfig};
use crate::controller::draft_request;
use crate::doctor::run_doctor;
use crate::error::{AppError, AppResult};
use crate::provision::{InstallationChecker, SystemRunner};
use crate::runtime::{
    confirm_install_on_stdin, history_report, install_tool, open_store, prepare_context, rerun_job,
    run_job, status_report, RunOptions,
};
use crate::worker::{RunOutcome, RunRequest};

trait CommandExecutor {
    fn run(&self, config: AppConfig, paths: AppPaths, args: RunArgs) -> AppResult<()>;
    fn doctor(&self, config: &AppConfig, json: bool) -> AppResult<()>;
    fn install(&self, config: AppConfig, yes: bool, allow_elevation: bool) -> AppResult<()>;
    fn history(&self, config: &AppConfig, paths: &AppPaths, json: bool) -> AppResult<()>;
    fn clear_history(&self, config: &AppConfig, paths: &AppPaths) -> AppResult<()>;
    fn rerun(&self, config: AppConfig, paths: AppPaths, index: usize, options: RunOptions) -> AppResult<()>;
    fn status(&self, config: &AppConfig, paths: &AppPaths) -> AppResult<()>;
}

struct DefaultCommandExecutor;

impl CommandExecutor for DefaultCommandExecutor {
    fn run(&self, config: AppConfig, paths: AppPaths, args: RunArgs) -> AppResult<()> {
        let options = RunOptions {
            log_file: args.log_file.clone(),
            reveal: args.reveal,
        };
        let request = request_from_args(&config, args);
        let context = prepare_context(config, paths, confirm_install_on_stdin)?;
        finish(run_job(context, request, &options)?, &options)
    }

    fn doctor(&self, config: &AppConfig, json: bool) -> AppResult<()> {
        let mut checker = InstallationChecker::new(SystemRunner, config, inherited_search_path());
        let report = run_doctor(&mut checker);
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("{}", report.render_text());
        }
        Ok(())
    }

    fn install(&self, mut config: AppConfig, yes: bool, allow_elevation: bool) -> AppResult<()> {
        config.install.allow_elevation |= allow_elevation;
        let mut checker = InstallationChecker::new(SystemRunner, &config, inherited_search_path());
        let summary = install_tool(&mut checker, || yes || confirm_install_on_stdin());
        print!("{}", summary.render_text());

        match (summary.available, summary.attempted) {
            (true, _) => Ok(()),
            (false, false) => Err(AppError::ToolUnavailable("installation declined".to_owned())),
            (false, true) => Err(AppError::Install(
                "no installation strategy made deface usable".to_owned(),
            )),
        }
    }

    fn history(&self, config: &AppConfig, paths: &AppPaths, json: bool) -> AppResult<()> {
        let store = open_store(config, paths);
        print!("{}", history_report(&store, json)?);
        if json {
            println!();
        }
        Ok(())
    }

    fn clear_history(&self, config: &AppConfig, paths: &AppPaths) -> AppResult<()> {
        let mut store = open_store(config, paths);
        store.clear_history();
        println!("History cleared ({})", store.path().display());
        Ok(())
    }

    fn rerun(&self, config: AppConfig, paths: AppPaths, index: usize, options: RunOptions) -> AppResult<()> {
        let context = prepare_context(config, paths, confirm_install_on_stdin)?;
        finish(rerun_job(context, index, &options)?, &options)
    }

    fn status(&self, config: &AppConfig, paths: &AppPaths) -> AppResult<()> {
        println!("{}", status_report(config, paths));
        Ok(())
    }
}

fn request_from_args(config: &AppConfig, args: RunArgs) -> RunRequest {
    let keep_audio = args.keep_audio_override();
    let mut request = draft_request(&config.defaults, args.input, args.output);
    if let Some(method) = args.method {
        request.method = method;
    }
    if let Some(keep_audio) = keep_audio {
        request.keep_audio = keep_audio;
    }
    request.preview |= args.preview;
    if let Some(threshold) = args.threshold {
        request.detection_threshold = threshold;
    }
    if let Some(mosaic_size) = args.mosaic_size {
        request.mosaic_block_size = mosaic_size;
    }
    request
}

fn finish(outcome: RunOutcome, options: &RunOptions) -> AppResult<()> {
    if let Some(path) = &options.log_file {
        println!("Log: {}", path.display());
    }
    if outcome.succeeded {
        println!("Processing completed");
        Ok(())
    } else {
        Err(AppError::Worker(outcome.error_message))
    }
}

fn execute_command<E: CommandExecutor>(
    command: Command,
    paths: AppPaths,
    config: AppConfig,
    executor: &E,
) -> AppResult<()> {
    match command {
        Command::Run(args) => executor.run(config, paths, args),
        Command::Doctor { json } => executor.doctor(&config, json),
        Command::Install {
            yes,
            allow_elevation,
        } => executor.install(config, yes, allow_elevation),
        Command::History {
            action: Some(HistoryAction::Clear),
            ..
        } => executor.clear_history(&config, &paths),
        Command::History { json, action: None } => executor.history(&config, &paths, json),
        Command::Rerun {
            index,
            log_file,
            reveal,
        } => executor.rerun(config, paths, index, RunOptions { log_file, reveal }),
        Command::Status => executor.status(&config, &paths),
    }
}

fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact()
        .init();
}

pub fn run() -> AppResult<()> {
    let cli = Cli::parse();

    let paths = AppPaths::resolve()?;
    paths.ensure_dirs()?;

    let config = load_config(&paths, &cli.to_overrides())?;
    init_tracing(&config.diagnostics.log_level);
    tracing::debug!(config = %paths.config_file.display(), "configuration loaded");

    execute_command(cli.command, paths, config, &DefaultCommandExecutor)
}
