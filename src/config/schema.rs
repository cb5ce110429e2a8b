use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::history::store::DEFAULT_DISPLAY_LIMIT;
use crate::worker::request::Method;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub tool: ToolConfig,
    pub defaults: RunDefaults,
    pub history: HistoryConfig,
    pub install: InstallConfig,
    pub output: OutputConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolConfig {
    pub program: String,
    pub extra_args: Vec<String>,
    pub python: String,
    pub module: String,
    pub stderr: StderrMode,
    pub local_bin_dir: Option<PathBuf>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: "deface".to_owned(),
            extra_args: Vec::new(),
            python: "python3".to_owned(),
            module: "deface".to_owned(),
            stderr: StderrMode::Merge,
            local_bin_dir: None,
        }
    }
}

/// What happens to the child's standard error during a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StderrMode {
    Merge,
    Discard,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunDefaults {
    pub method: Method,
    pub keep_audio: bool,
    pub preview: bool,
    pub threshold: f64,
    pub mosaic_size: u32,
    pub output_suffix: String,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            method: Method::Blur,
            keep_audio: true,
            preview: false,
            threshold: 0.2,
            mosaic_size: 20,
            output_suffix: "_anonymized".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub settings_path: Option<PathBuf>,
    pub display_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            settings_path: None,
            display_limit: DEFAULT_DISPLAY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InstallConfig {
    pub allow_elevation: bool,
    pub elevation_command: String,
    pub package: String,
    pub marker_file: Option<PathBuf>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            allow_elevation: false,
            elevation_command: "pkexec".to_owned(),
            package: "deface".to_owned(),
            marker_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub enable_notifications: bool,
    pub reveal_on_success: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            enable_notifications: true,
            reveal_on_success: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub log_level: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
        }
    }
}
