use std::path::{Path, PathBuf};

use crate::bootstrap::AppPaths;
use crate::config::schema::AppConfig;
use crate::error::{AppError, AppResult};
use crate::history::store::DEFAULT_DISPLAY_LIMIT;
use crate::worker::request::{check_mosaic_size, check_threshold, Method};

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub program: Option<String>,
    pub python: Option<String>,
    pub settings_path: Option<PathBuf>,
    pub notifications: Option<bool>,
    pub log_level: Option<String>,
}

pub fn load_config(paths: &AppPaths, overrides: &CliOverrides) -> AppResult<AppConfig> {
    let config_path = overrides
        .config_path
        .clone()
        .unwrap_or_else(|| paths.config_file.clone());

    let mut config = if config_path.exists() {
        let raw = std::fs::read_to_string(&config_path)?;
        toml::from_str::<AppConfig>(&raw)?
    } else {
        let defaults = AppConfig::default();
        write_default_config(&config_path, &defaults)?;
        defaults
    };

    if config.history.settings_path.is_none() {
        config.history.settings_path = Some(paths.settings_file.clone());
    }
    if config.tool.local_bin_dir.is_none() {
        config.tool.local_bin_dir = Some(paths.local_bin_dir.clone());
    }

    apply_env_overrides(&mut config);
    apply_cli_overrides(&mut config, overrides);

    validate(&config)?;
    Ok(config)
}

fn write_default_config(path: &Path, defaults: &AppConfig) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let data = toml::to_string_pretty(defaults)?;
    std::fs::write(path, data)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        std::fs::set_permissions(path, perms)?;
    }

    Ok(())
}

fn validate(config: &AppConfig) -> AppResult<()> {
    if config.tool.program.trim().is_empty() {
        return Err(AppError::Config("tool.program must not be empty".to_owned()));
    }
    if config.tool.python.trim().is_empty() {
        return Err(AppError::Config("tool.python must not be empty".to_owned()));
    }
    if !(1..=DEFAULT_DISPLAY_LIMIT).contains(&config.history.display_limit) {
        return Err(AppError::Config(format!(
            "history.display_limit must be between 1 and {DEFAULT_DISPLAY_LIMIT}"
        )));
    }
    check_threshold(config.defaults.threshold)
        .map_err(|message| AppError::Config(format!("defaults.threshold: {message}")))?;
    check_mosaic_size(config.defaults.mosaic_size)
        .map_err(|message| AppError::Config(format!("defaults.mosaic_size: {message}")))?;

    Ok(())
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(value) = std::env::var("DEFACE_SHELL_PROGRAM") {
        if !value.trim().is_empty() {
            config.tool.program = value;
        }
    }
    if let Ok(value) = std::env::var("DEFACE_SHELL_PYTHON") {
        if !value.trim().is_empty() {
            config.tool.python = value;
        }
    }
    if let Ok(value) = std::env::var("DEFACE_SHELL_METHOD") {
        if let Some(parsed) = Method::parse(&value) {
            config.defaults.method = parsed;
        }
    }
    if let Ok(value) = std::env::var("DEFACE_SHELL_THRESHOLD") {
        if let Ok(parsed) = value.trim().parse::<f64>() {
            config.defaults.threshold = parsed;
        }
    }
    if let Ok(value) = std::env::var("DEFACE_SHELL_MOSAIC_SIZE") {
        if let Ok(parsed) = value.trim().parse::<u32>() {
            config.defaults.mosaic_size = parsed;
        }
    }
    if let Ok(value) = std::env::var("DEFACE_SHELL_KEEP_AUDIO") {
        if let Some(parsed) = parse_bool(&value) {
            config.defaults.keep_audio = parsed;
        }
    }
    if let Ok(value) = std::env::var("DEFACE_SHELL_SETTINGS_PATH") {
        if !value.trim().is_empty() {
            config.history.settings_path = Some(PathBuf::from(value));
        }
    }
    if let Ok(value) = std::env::var("DEFACE_SHELL_ALLOW_ELEVATION") {
        if let Some(parsed) = parse_bool(&value) {
            config.install.allow_elevation = parsed;
        }
    }
    if let Ok(value) = std::env::var("DEFACE_SHELL_NOTIFICATIONS") {
        if let Some(parsed) = parse_bool(&value) {
            config.output.enable_notifications = parsed;
        }
    }
    if let Ok(value) = std::env::var("DEFACE_SHELL_LOG_LEVEL") {
        config.diagnostics.log_level = value;
    }
}

fn apply_cli_overrides(config: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(value) = &overrides.program {
        config.tool.program = value.clone();
    }
    if let Some(value) = &overrides.python {
        config.tool.python = value.clone();
    }
    if let Some(value) = &overrides.settings_path {
        config.history.settings_path = Some(value.clone());
    }
    if let Some(value) = overrides.notifications {
        config.output.enable_notifications = value;
    }
    if let Some(value) = &overrides.log_level {
        config.diagnostics.log_level = value.clone();
    }
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
