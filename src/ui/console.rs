use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::AppResult;

/// Receives a run's log lines: echoes them to the terminal and keeps a copy
/// that can be saved to a file afterwards.
pub struct RunLog<W: Write> {
    out: W,
    lines: Vec<String>,
}

impl RunLog<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> RunLog<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            lines: Vec::new(),
        }
    }

    pub fn push(&mut self, line: &str) {
        if let Err(error) = writeln!(self.out, "{line}") {
            tracing::debug!("log echo failed: {error}");
        }
        self.lines.push(line.to_owned());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Writes the collected lines to `path`, one per line, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> AppResult<PathBuf> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = BufWriter::new(File::create(path)?);
        for line in &self.lines {
            writeln!(file, "{line}")?;
        }
        file.flush()?;
        Ok(path.to_path_buf())
    }
}
