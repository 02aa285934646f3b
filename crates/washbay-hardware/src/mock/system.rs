//! Mock host power control.

use crate::error::{HardwareError, Result};
use crate::system::SystemAction;
use crate::traits::SystemControl;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Records requested actions instead of running them.
#[derive(Debug)]
pub struct MockSystemControl {
    handle: MockSystemHandle,
}

/// Test-side view of a [`MockSystemControl`].
#[derive(Debug, Clone, Default)]
pub struct MockSystemHandle {
    actions: Arc<Mutex<Vec<SystemAction>>>,
    failing: Arc<AtomicBool>,
}

impl MockSystemControl {
    pub fn new() -> (Self, MockSystemHandle) {
        let handle = MockSystemHandle::default();
        (
            Self {
                handle: handle.clone(),
            },
            handle,
        )
    }
}

impl MockSystemHandle {
    pub fn actions(&self) -> Vec<SystemAction> {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make every subsequent action fail to start.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl SystemControl for MockSystemControl {
    async fn execute(&mut self, action: SystemAction) -> Result<()> {
        if self.handle.failing.load(Ordering::SeqCst) {
            return Err(HardwareError::command(action.to_string(), "simulated failure"));
        }
        self.handle
            .actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_actions() {
        let (mut control, handle) = MockSystemControl::new();
        control.execute(SystemAction::Reboot).await.unwrap();
        assert_eq!(handle.actions(), [SystemAction::Reboot]);
    }

    #[tokio::test]
    async fn test_failing_action() {
        let (mut control, handle) = MockSystemControl::new();
        handle.set_failing(true);
        assert!(control.execute(SystemAction::Shutdown).await.is_err());
        assert!(handle.actions().is_empty());
    }
}
