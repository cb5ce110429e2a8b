pub mod console;
pub mod notify;

pub use console::RunLog;
pub use notify::Notifier;
