//! In-memory relay that records transitions.
//!
//! Backs the simulated relay driver as well as tests.

use crate::error::{HardwareError, Result};
use crate::traits::Relay;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Instant;
use tracing::info;

/// One recorded relay transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEvent {
    pub relay: String,
    pub on: bool,
    pub at: Instant,
}

/// Shared event log and fault switch for one or more [`MockRelay`]s.
#[derive(Debug, Clone, Default)]
pub struct MockRelayHandle {
    events: Arc<Mutex<Vec<RelayEvent>>>,
    failing: Arc<AtomicBool>,
}

impl MockRelayHandle {
    /// Transitions recorded so far, oldest first.
    pub fn events(&self) -> Vec<RelayEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make every subsequent transition fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, event: RelayEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Simulated relay output.
#[derive(Debug)]
pub struct MockRelay {
    name: String,
    handle: MockRelayHandle,
}

impl MockRelay {
    pub fn new(name: impl Into<String>) -> (Self, MockRelayHandle) {
        let handle = MockRelayHandle::default();
        (Self::attach(name, &handle), handle)
    }

    /// Create a relay that records into an existing handle.
    pub fn attach(name: impl Into<String>, handle: &MockRelayHandle) -> Self {
        Self {
            name: name.into(),
            handle: handle.clone(),
        }
    }
}

impl Relay for MockRelay {
    async fn set(&mut self, on: bool) -> Result<()> {
        if self.handle.failing.load(Ordering::SeqCst) {
            return Err(HardwareError::relay_fault(&self.name, "simulated fault"));
        }

        info!(relay = %self.name, on, "Simulated relay switched");
        self.handle.record(RelayEvent {
            relay: self.name.clone(),
            on,
            at: Instant::now(),
        });
        Ok(())
    }
}
