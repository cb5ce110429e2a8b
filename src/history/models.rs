use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::worker::request::RunRequest;

pub const HISTORY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One past run as stored under `"history"` in the settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "date")]
    pub timestamp: String,
    #[serde(rename = "input")]
    pub input_path: String,
    #[serde(rename = "output")]
    pub output_path: String,
    pub method: String,
}

impl HistoryEntry {
    pub fn from_request(request: &RunRequest, at: DateTime<Local>) -> Self {
        Self {
            timestamp: at.format(HISTORY_TIMESTAMP_FORMAT).to_string(),
            input_path: request.input_path.to_string_lossy().into_owned(),
            output_path: request.output_path.to_string_lossy().into_owned(),
            method: request.method.as_str().to_owned(),
        }
    }

    /// `date - file name`, the line shown in history listings.
    pub fn label(&self) -> String {
        let name = Path::new(&self.input_path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input_path.clone());
        format!("{} - {}", self.timestamp, name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsDocument {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Top-level keys this program does not interpret; written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
