use std::path::PathBuf;

use directories::{BaseDirs, ProjectDirs};

use crate::error::{AppError, AppResult};

pub const SETTINGS_FILE_NAME: &str = ".deface_gui_settings.json";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub settings_file: PathBuf,
    pub local_bin_dir: PathBuf,
}

impl AppPaths {
    pub fn resolve() -> AppResult<Self> {
        let project_dirs = ProjectDirs::from("io", "deface-shell", "deface-shell")
            .ok_or_else(|| AppError::Config("unable to resolve project directories".to_owned()))?;
        let base_dirs = BaseDirs::new()
            .ok_or_else(|| AppError::Config("unable to resolve base directories".to_owned()))?;

        let config_dir = project_dirs.config_dir().to_path_buf();
        let config_file = config_dir.join("config.toml");

        // Fixed per-user location, independent of the config directory.
        let home = base_dirs.home_dir();
        let settings_file = home.join(SETTINGS_FILE_NAME);
        let local_bin_dir = home.join(".local").join("bin");

        Ok(Self {
            config_dir,
            config_file,
            settings_file,
            local_bin_dir,
        })
    }

    pub fn ensure_dirs(&self) -> AppResult<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        if let Some(parent) = self.settings_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
