pub mod checker;
pub mod install;
pub mod runner;

pub use checker::{InstallationChecker, InstallationState, Probe};
pub use install::{InstallPlan, InstallReport, InstallStrategy, StepStatus};
pub use runner::{CommandRunner, CommandSpec, CommandStatus, SystemRunner};

/// Availability checks and installation of the external tool.
pub trait ToolProvisioner {
    fn is_available(&mut self) -> bool;
    fn attempt_install(&mut self) -> bool;
}

/// Makes sure the external tool can be used. When it is missing, `confirm` is
/// asked once; a yes triggers installation and the probe runs again.
pub fn ensure_tool_available<P, F>(provisioner: &mut P, confirm: F) -> bool
where
    P: ToolProvisioner + ?Sized,
    F: FnOnce() -> bool,
{
    if provisioner.is_available() {
        return true;
    }

    if !confirm() {
        tracing::info!("installation declined");
        return false;
    }

    if !provisioner.attempt_install() {
        tracing::warn!("installation failed");
    }
    provisioner.is_available()
}
