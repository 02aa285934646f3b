//! Relay outputs and the named relay bank.
//!
//! Relays are driven through the sysfs GPIO interface:
//!
//! ```text
//! <root>/export              write "<pin>" once
//! <root>/gpio<pin>/direction write "out" once
//! <root>/gpio<pin>/value     write "1" / "0"
//! ```

use crate::devices::AnyRelay;
use crate::error::{HardwareError, Result};
use crate::mock::{MockRelay, MockRelayHandle};
use crate::traits::Relay;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use washbay_core::BridgeConfig;
use washbay_core::config::RelayDriver;

/// One sysfs GPIO output.
///
/// The pin is exported and configured as an output on first use.
#[derive(Debug, Clone)]
pub struct SysfsRelay {
    pin: u32,
    active_low: bool,
    root: PathBuf,
    prepared: bool,
}

impl SysfsRelay {
    pub fn new(pin: u32, active_low: bool, root: impl Into<PathBuf>) -> Self {
        Self {
            pin,
            active_low,
            root: root.into(),
            prepared: false,
        }
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    fn pin_dir(&self) -> PathBuf {
        self.root.join(format!("gpio{}", self.pin))
    }

    async fn prepare(&mut self) -> Result<()> {
        if self.prepared {
            return Ok(());
        }

        let dir = self.pin_dir();
        if !tokio::fs::try_exists(&dir).await? {
            debug!(pin = self.pin, "Exporting GPIO pin");
            tokio::fs::write(self.root.join("export"), self.pin.to_string()).await?;
        }
        tokio::fs::write(dir.join("direction"), "out").await?;
        self.prepared = true;
        Ok(())
    }
}

impl Relay for SysfsRelay {
    async fn set(&mut self, on: bool) -> Result<()> {
        self.prepare().await?;
        let level = if on != self.active_low { "1" } else { "0" };
        tokio::fs::write(self.pin_dir().join("value"), level).await?;
        Ok(())
    }
}

/// Named relays of one bay.
#[derive(Debug, Default)]
pub struct RelayBank {
    relays: BTreeMap<String, AnyRelay>,
    energized: Option<String>,
}

impl RelayBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the bank for the configured driver.
    ///
    /// For the simulated driver the returned handle observes every
    /// transition.
    pub fn from_config(config: &BridgeConfig) -> (Self, Option<MockRelayHandle>) {
        match config.gpio.driver {
            RelayDriver::Sysfs => {
                let mut bank = Self::new();
                for (name, relay) in &config.relays {
                    bank.insert(
                        name.clone(),
                        AnyRelay::Sysfs(SysfsRelay::new(
                            relay.pin,
                            relay.active_low,
                            config.gpio.root.clone(),
                        )),
                    );
                }
                (bank, None)
            }
            RelayDriver::Simulated => {
                let (bank, handle) = Self::simulated(config.relays.keys());
                (bank, Some(handle))
            }
        }
    }

    /// Build a bank of in-memory relays sharing one event log.
    pub fn simulated<I, S>(names: I) -> (Self, MockRelayHandle)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let handle = MockRelayHandle::default();
        let mut bank = Self::new();
        for name in names {
            let name = name.into();
            bank.insert(name.clone(), AnyRelay::Mock(MockRelay::attach(name, &handle)));
        }
        (bank, handle)
    }

    pub fn insert(&mut self, name: impl Into<String>, relay: AnyRelay) {
        self.relays.insert(name.into(), relay);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.relays.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.relays.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    /// Energize `name` for `duration`, then release it.
    ///
    /// Holds the caller for the whole duration. On failure the relay is
    /// left in whatever state the failing call produced. If the returned
    /// future is dropped while the relay is on, the relay stays on until
    /// [`RelayBank::release`] is called.
    ///
    /// # Errors
    /// Returns `HardwareError::UnknownRelay` before touching any output when
    /// `name` is not configured, or `HardwareError::RelayFault` when a
    /// transition fails.
    pub async fn activate(&mut self, name: &str, duration: Duration) -> Result<()> {
        let relay = self
            .relays
            .get_mut(name)
            .ok_or_else(|| HardwareError::unknown_relay(name))?;

        info!(relay = name, ?duration, "Relay on");
        self.energized = Some(name.to_string());
        if let Err(e) = relay.set(true).await {
            self.energized = None;
            return Err(HardwareError::relay_fault(name, e.to_string()));
        }

        tokio::time::sleep(duration).await;

        relay
            .set(false)
            .await
            .map_err(|e| HardwareError::relay_fault(name, e.to_string()))?;
        self.energized = None;
        info!(relay = name, "Relay off");
        Ok(())
    }

    /// Name of the relay an unfinished activation left on, if any.
    pub fn energized(&self) -> Option<&str> {
        self.energized.as_deref()
    }

    /// Switch off the relay an interrupted activation left on.
    ///
    /// Does nothing when no activation was interrupted.
    ///
    /// # Errors
    /// Returns `HardwareError::RelayFault` when the transition fails; the
    /// relay is still reported by [`RelayBank::energized`] afterwards.
    pub async fn release(&mut self) -> Result<()> {
        let Some(name) = self.energized.clone() else {
            return Ok(());
        };
        let relay = self
            .relays
            .get_mut(&name)
            .ok_or_else(|| HardwareError::unknown_relay(&name))?;

        relay
            .set(false)
            .await
            .map_err(|e| HardwareError::relay_fault(&name, e.to_string()))?;
        self.energized = None;
        info!(relay = %name, "Relay released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tokio::time::Instant;
    use washbay_core::config::RelayConfig;

    fn gpio_root_with_pin(pin: u32) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(format!("gpio{pin}"))).unwrap();
        dir
    }

    fn read(dir: &tempfile::TempDir, rel: &str) -> String {
        fs::read_to_string(dir.path().join(rel)).unwrap()
    }

    #[tokio::test]
    async fn test_sysfs_relay_writes_value() {
        let dir = gpio_root_with_pin(17);
        let mut relay = SysfsRelay::new(17, false, dir.path());

        relay.set(true).await.unwrap();
        assert_eq!(read(&dir, "gpio17/direction"), "out");
        assert_eq!(read(&dir, "gpio17/value"), "1");

        relay.set(false).await.unwrap();
        assert_eq!(read(&dir, "gpio17/value"), "0");
        assert!(!dir.path().join("export").exists());
    }

    #[tokio::test]
    async fn test_sysfs_relay_active_low() {
        let dir = gpio_root_with_pin(22);
        let mut relay = SysfsRelay::new(22, true, dir.path());

        relay.set(true).await.unwrap();
        assert_eq!(read(&dir, "gpio22/value"), "0");
        relay.set(false).await.unwrap();
        assert_eq!(read(&dir, "gpio22/value"), "1");
    }

    #[tokio::test]
    async fn test_sysfs_relay_exports_missing_pin() {
        let dir = tempfile::tempdir().unwrap();
        let mut relay = SysfsRelay::new(27, false, dir.path());

        // No kernel behind the tempdir, so the pin directory never appears.
        assert!(relay.set(true).await.is_err());
        assert_eq!(read(&dir, "export"), "27");
    }

    #[tokio::test(start_paused = true)]
    async fn test_bank_activation_holds_for_duration() {
        let (mut bank, handle) = RelayBank::simulated(["yikama", "kopuk"]);
        let started = Instant::now();

        bank.activate("kopuk", Duration::from_secs(30)).await.unwrap();

        let events = handle.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].relay, "kopuk");
        assert!(events[0].on);
        assert!(!events[1].on);
        assert_eq!(events[1].at - events[0].at, Duration::from_secs(30));
        assert_eq!(events[0].at, started);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bank_unknown_relay_touches_nothing() {
        let (mut bank, handle) = RelayBank::simulated(["yikama"]);

        let result = bank.activate("ruzgar", Duration::from_secs(5)).await;
        assert!(matches!(result, Err(HardwareError::UnknownRelay { .. })));
        assert!(handle.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bank_relay_fault() {
        let (mut bank, handle) = RelayBank::simulated(["cila"]);
        handle.set_failing(true);

        let result = bank.activate("cila", Duration::from_secs(5)).await;
        assert!(matches!(result, Err(HardwareError::RelayFault { ref relay, .. }) if relay == "cila"));
    }

    #[tokio::test]
    async fn test_cancelled_activation_is_released() {
        let dir = gpio_root_with_pin(17);
        let mut bank = RelayBank::new();
        bank.insert("yikama", AnyRelay::Sysfs(SysfsRelay::new(17, false, dir.path())));

        let cancelled = tokio::time::timeout(
            Duration::from_millis(200),
            bank.activate("yikama", Duration::from_secs(30)),
        )
        .await;
        assert!(cancelled.is_err());
        assert_eq!(read(&dir, "gpio17/value"), "1");
        assert_eq!(bank.energized(), Some("yikama"));

        bank.release().await.unwrap();
        assert_eq!(read(&dir, "gpio17/value"), "0");
        assert_eq!(bank.energized(), None);

        // Nothing left to release.
        bank.release().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_activation_leaves_nothing_energized() {
        let (mut bank, handle) = RelayBank::simulated(["kopuk"]);

        bank.activate("kopuk", Duration::from_secs(2)).await.unwrap();
        assert_eq!(bank.energized(), None);
        bank.release().await.unwrap();
        assert_eq!(handle.events().len(), 2);
    }

    #[test]
    fn test_bank_from_config() {
        let mut config = BridgeConfig::default();
        let (bank, handle) = RelayBank::from_config(&config);
        assert!(handle.is_none());
        assert_eq!(bank.len(), 4);
        assert!(bank.contains("yikama"));
        assert!(bank.contains("supurge"));

        config.gpio.driver = RelayDriver::Simulated;
        config.relays = [("cila".to_string(), RelayConfig { pin: 5, active_low: false })]
            .into_iter()
            .collect();
        let (bank, handle) = RelayBank::from_config(&config);
        assert!(handle.is_some());
        assert_eq!(bank.names().collect::<Vec<_>>(), ["cila"]);
    }
}
