pub mod app;

pub use app::{
    confirm_install_on_stdin, execute_run, history_report, install_tool, open_store, prepare_context,
    rerun_job, run_job, status_report, InstallSummary, RunOptions,
};
