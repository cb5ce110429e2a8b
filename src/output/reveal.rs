use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{AppError, AppResult};

/// Opens a finished run's output in the desktop file manager: the output
/// itself when it is a directory, otherwise the folder holding it.
pub struct OutputReveal;

pub trait RevealBackend {
    fn open(&self, target: &Path) -> Result<(), String>;
}

/// `xdg-open` on Linux and the BSDs, `open` on macOS.
pub struct PlatformOpener;

impl PlatformOpener {
    fn program() -> &'static str {
        if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        }
    }
}

impl RevealBackend for PlatformOpener {
    fn open(&self, target: &Path) -> Result<(), String> {
        Command::new(Self::program())
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|error| format!("{}: {error}", Self::program()))
    }
}

impl OutputReveal {
    pub fn reveal_with<B: RevealBackend + ?Sized>(output: &Path, backend: &B) -> AppResult<PathBuf> {
        let folder = containing_folder(output);
        if !folder.is_dir() {
            return Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("output folder does not exist: {}", folder.display()),
            )));
        }

        backend
            .open(&folder)
            .map_err(|error| AppError::Io(std::io::Error::other(format!("reveal failed: {error}"))))?;
        tracing::debug!(folder = %folder.display(), "revealed output folder");
        Ok(folder)
    }
}

fn containing_folder(output: &Path) -> PathBuf {
    if output.is_dir() {
        return output.to_path_buf();
    }
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
