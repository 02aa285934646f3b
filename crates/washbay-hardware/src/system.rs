//! Host power control through configured command lines.

use crate::error::{HardwareError, Result};
use crate::traits::SystemControl;
use std::fmt;
use tracing::info;
use washbay_core::config::SystemConfig;
use washbay_protocol::SystemCommand;

/// Host power action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemAction {
    Reboot,
    Shutdown,
}

impl SystemAction {
    /// Action requested by a privileged QR payload, if any.
    #[must_use]
    pub fn from_command(command: &SystemCommand) -> Option<Self> {
        match command {
            SystemCommand::Reboot => Some(SystemAction::Reboot),
            SystemCommand::Shutdown => Some(SystemAction::Shutdown),
            SystemCommand::Unknown(_) => None,
        }
    }
}

impl fmt::Display for SystemAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SystemAction::Reboot => write!(f, "reboot"),
            SystemAction::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Runs the configured argv for each action.
///
/// The child is spawned and left running; the bridge does not wait for it.
#[derive(Debug, Clone)]
pub struct CommandSystemControl {
    reboot: Vec<String>,
    shutdown: Vec<String>,
}

impl CommandSystemControl {
    pub fn new(reboot: Vec<String>, shutdown: Vec<String>) -> Self {
        Self { reboot, shutdown }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(config.reboot_command.clone(), config.shutdown_command.clone())
    }

    #[must_use]
    pub fn argv(&self, action: SystemAction) -> &[String] {
        match action {
            SystemAction::Reboot => &self.reboot,
            SystemAction::Shutdown => &self.shutdown,
        }
    }
}

impl SystemControl for CommandSystemControl {
    async fn execute(&mut self, action: SystemAction) -> Result<()> {
        let argv = self.argv(action);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| HardwareError::command(action.to_string(), "empty command line"))?;

        info!(%action, command = %argv.join(" "), "Running host command");
        tokio::process::Command::new(program)
            .args(args)
            .spawn()
            .map_err(|e| HardwareError::command(argv.join(" "), e.to_string()))?;
        Ok(())
    }
}
