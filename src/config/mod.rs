pub mod load;
pub mod schema;

pub use load::{load_config, CliOverrides};
pub use schema::{AppConfig, InstallConfig, RunDefaults, StderrMode, ToolConfig};
