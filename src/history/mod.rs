pub mod models;
pub mod store;

pub use models::{HistoryEntry, SettingsDocument};
pub use store::SettingsStore;
