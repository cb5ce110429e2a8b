use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::AppResult;
use crate::history::models::{HistoryEntry, SettingsDocument};

pub const DEFAULT_DISPLAY_LIMIT: usize = 10;

/// Owns the settings document on disk and its in-memory copy.
///
/// Persistence is best-effort: a missing, empty or corrupt file loads as an
/// empty document and write failures are logged, never returned.
pub struct SettingsStore {
    path: PathBuf,
    display_limit: usize,
    document: SettingsDocument,
}

impl SettingsStore {
    pub fn open(path: PathBuf, display_limit: usize) -> Self {
        let document = load_document(&path);
        Self {
            path,
            display_limit: display_limit.clamp(1, DEFAULT_DISPLAY_LIMIT),
            document,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &SettingsDocument {
        &self.document
    }

    /// Re-reads the file. Falls back to the default document on any error.
    pub fn load(&self) -> SettingsDocument {
        load_document(&self.path)
    }

    pub fn save(&self, document: &SettingsDocument) {
        if let Err(error) = write_document(&self.path, document) {
            tracing::warn!(
                path = %self.path.display(),
                "failed to persist settings: {error}"
            );
        }
    }

    pub fn append_history(&mut self, entry: HistoryEntry) {
        self.document.history.push(entry);
        self.save(&self.document);
    }

    pub fn clear_history(&mut self) {
        self.document.history.clear();
        self.save(&self.document);
    }

    /// The most recent entries, oldest first, capped at the display limit.
    pub fn recent_history(&self) -> &[HistoryEntry] {
        let history = &self.document.history;
        let start = history.len().saturating_sub(self.display_limit);
        &history[start..]
    }

    /// Entry at `index` within [`Self::recent_history`].
    pub fn entry_at(&self, index: usize) -> Option<&HistoryEntry> {
        self.recent_history().get(index)
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.document.history.last()
    }
}

fn load_document(path: &Path) -> SettingsDocument {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return SettingsDocument::default();
        }
        Err(error) => {
            tracing::warn!(path = %path.display(), "settings unreadable, using defaults: {error}");
            return SettingsDocument::default();
        }
    };

    if raw.trim().is_empty() {
        return SettingsDocument::default();
    }

    match serde_json::from_str::<SettingsDocument>(&raw) {
        Ok(document) => document,
        Err(error) => {
            tracing::warn!(path = %path.display(), "settings malformed, using defaults: {error}");
            SettingsDocument::default()
        }
    }
}

fn write_document(path: &Path, document: &SettingsDocument) -> AppResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let data = serde_json::to_vec_pretty(document)?;
    let mut staged = tempfile::NamedTempFile::new_in(&parent)?;
    staged.write_all(&data)?;
    staged.flush()?;
    staged.persist(path).map_err(|error| error.error)?;
    Ok(())
}
