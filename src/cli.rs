use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::CliOverrides;
use crate::worker::Method;

#[derive(Debug, Parser)]
#[command(name = "deface-shell")]
#[command(about = "Run the deface face-anonymization tool and keep a history of runs")]
pub struct Cli {
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Executable used for runs (default `deface`).
    #[arg(long, global = true)]
    pub program: Option<String>,

    #[arg(long, global = true)]
    pub python: Option<String>,

    #[arg(long, global = true)]
    pub settings_path: Option<PathBuf>,

    #[arg(long, global = true)]
    pub notifications: Option<bool>,

    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Anonymize one media file.
    Run(RunArgs),
    /// Report whether deface and its prerequisites are usable.
    Doctor {
        #[arg(long)]
        json: bool,
    },
    /// Install deface through pip.
    Install {
        /// Do not ask for confirmation.
        #[arg(long)]
        yes: bool,
        /// Permit steps that run through the elevation command (pkexec).
        #[arg(long)]
        allow_elevation: bool,
    },
    /// List recent runs.
    History {
        #[arg(long)]
        json: bool,
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },
    /// Repeat the run shown at INDEX in `history`.
    Rerun {
        index: usize,
        #[arg(long)]
        log_file: Option<PathBuf>,
        #[arg(long)]
        reveal: bool,
    },
    Status,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum HistoryAction {
    /// Remove every recorded run.
    Clear,
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct RunArgs {
    pub input: PathBuf,

    /// Defaults to `<stem>_anonymized.<ext>` next to the input.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    #[arg(long, short, value_enum)]
    pub method: Option<Method>,

    #[arg(long, overrides_with = "no_keep_audio", action = ArgAction::SetTrue)]
    pub keep_audio: bool,

    #[arg(long, overrides_with = "keep_audio", action = ArgAction::SetTrue)]
    pub no_keep_audio: bool,

    #[arg(long)]
    pub preview: bool,

    /// Detection threshold, 0.1 to 1.0.
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Mosaic block size, 5 to 50.
    #[arg(long)]
    pub mosaic_size: Option<u32>,

    /// Save the run's log to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Open the output folder when the run succeeds.
    #[arg(long)]
    pub reveal: bool,
}

impl RunArgs {
    pub fn keep_audio_override(&self) -> Option<bool> {
        match (self.keep_audio, self.no_keep_audio) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

impl Cli {
    pub fn to_overrides(&self) -> CliOverrides {
        CliOverrides {
            config_path: self.config.clone(),
            program: self.program.clone(),
            python: self.python.clone(),
            settings_path: self.settings_path.clone(),
            notifications: self.notifications,
            log_level: self.log_level.clone(),
        }
    }
}
