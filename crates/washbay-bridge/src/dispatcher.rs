//! The bridge control loop.
//!
//! One [`Dispatcher`] owns every piece of mutable state: the scan mode, the
//! session lock, the controller link and the peripherals. Each
//! [`tick`](Dispatcher::tick) runs one bounded step:
//!
//! ```text
//! 1. reconnect the controller link if it is down and the backoff elapsed
//! 2. handle at most one inbound line (mode switch / verdict)
//! 3. locked: time out an expired session, otherwise wait
//! 4. idle: poll the reader selected by the scan mode
//! 5. hit: run a privileged QR command, or send the identifier and lock
//! ```

use crate::session::{SessionOutcome, SessionState, SessionStats};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use washbay_core::{BridgeConfig, DevicePath, Identifier, IdentifierKind, ScanMode};
use washbay_hardware::mock::MockRelayHandle;
use washbay_hardware::{
    AnyReader, AnySystemControl, CommandSystemControl, HardwareError, HidrawReader,
    IdentifierReader, PortClass, PortLocator, RelayBank, SerialQrReader, SystemAction,
    SystemControl,
};
use washbay_link::{ControllerLink, LinkError};
use washbay_protocol::{
    ActivationResponse, FaultReason, Inbound, Outbound, SystemCommand, Verdict,
    parse_system_command,
};

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// No identifier this tick.
    Idle,
    /// Locked, verdict still pending.
    Waiting,
    /// Identifier sent; the session is now locked.
    Sent(Identifier),
    /// A session ended.
    Resolved(SessionOutcome),
    /// A `systemd:` payload was acknowledged without a host action.
    Acknowledged(SystemCommand),
    /// A host power action was started; the loop must stop.
    Terminate(SystemAction),
}

/// Discovery state of one peripheral class.
#[derive(Debug, Clone)]
pub struct PortSlot {
    class: PortClass,
    path: Option<DevicePath>,
    retry_at: Option<Instant>,
}

impl PortSlot {
    pub fn new(class: PortClass) -> Self {
        Self {
            class,
            path: None,
            retry_at: None,
        }
    }

    pub fn path(&self) -> Option<&DevicePath> {
        self.path.as_ref()
    }

    /// Current path, resolving it if unknown and the backoff has elapsed.
    fn resolve(&mut self, locator: &PortLocator, backoff: Duration) -> Option<DevicePath> {
        if let Some(path) = &self.path {
            return Some(path.clone());
        }

        let now = Instant::now();
        if self.retry_at.is_some_and(|at| now < at) {
            return None;
        }

        match locator.locate(self.class) {
            Ok(Some(path)) => {
                info!(class = %self.class, %path, "Device found");
                self.path = Some(path.clone());
                self.retry_at = None;
                Some(path)
            }
            Ok(None) => {
                warn!(class = %self.class, pattern = locator.pattern(self.class), "Device not found, waiting");
                self.retry_at = Some(now + backoff);
                None
            }
            Err(e) => {
                error!(class = %self.class, "Device discovery failed: {}", e);
                self.retry_at = Some(now + backoff);
                None
            }
        }
    }

    /// Forget the path; re-resolve once `backoff` has elapsed.
    fn invalidate(&mut self, backoff: Duration) {
        if let Some(path) = self.path.take() {
            info!(class = %self.class, %path, "Device path invalidated");
        }
        self.retry_at = Some(Instant::now() + backoff);
    }
}

/// Devices the dispatcher drives.
#[derive(Debug)]
pub struct Peripherals {
    pub rfid: AnyReader,
    pub qr: AnyReader,
    pub relays: RelayBank,
    pub system: AnySystemControl,
}

impl Peripherals {
    /// Real devices as configured.
    ///
    /// With the simulated relay driver the returned handle observes the
    /// relay transitions.
    pub fn from_config(config: &BridgeConfig) -> (Self, Option<MockRelayHandle>) {
        let (relays, relay_handle) = RelayBank::from_config(config);
        let peripherals = Self {
            rfid: AnyReader::Hidraw(HidrawReader::new(config.session.duplicate_window)),
            qr: AnyReader::SerialQr(SerialQrReader::new(config.serial.scanner_baud)),
            relays,
            system: AnySystemControl::Command(CommandSystemControl::from_config(&config.system)),
        };
        (peripherals, relay_handle)
    }
}

/// Session dispatcher.
pub struct Dispatcher {
    config: BridgeConfig,
    locator: PortLocator,
    link: ControllerLink,
    peripherals: Peripherals,
    mode: ScanMode,
    session: SessionState,
    stats: SessionStats,
    controller: PortSlot,
    scanner: PortSlot,
    rfid: PortSlot,
}

impl Dispatcher {
    pub fn new(config: BridgeConfig, link: ControllerLink, peripherals: Peripherals) -> Self {
        Self {
            locator: PortLocator::new(config.ports.clone()),
            mode: config.session.initial_mode,
            link,
            peripherals,
            session: SessionState::Idle,
            stats: SessionStats::default(),
            controller: PortSlot::new(PortClass::Controller),
            scanner: PortSlot::new(PortClass::Scanner),
            rfid: PortSlot::new(PortClass::Rfid),
            config,
        }
    }

    /// Dispatcher over the serial controller link and real devices.
    pub fn from_config(config: BridgeConfig) -> (Self, Option<MockRelayHandle>) {
        let link = ControllerLink::serial(
            config.serial.controller_baud,
            config.timing.write_timeout(),
            config.wire.identifier_format,
        );
        let (peripherals, relay_handle) = Peripherals::from_config(&config);
        (Self::new(config, link, peripherals), relay_handle)
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn is_link_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn port(&self, class: PortClass) -> Option<&DevicePath> {
        match class {
            PortClass::Controller => self.controller.path(),
            PortClass::Scanner => self.scanner.path(),
            PortClass::Rfid => self.rfid.path(),
        }
    }

    fn backoff(&self) -> Duration {
        self.config.timing.discovery_backoff()
    }

    /// Wait until the controller and the scanner exist, then open the link.
    ///
    /// The RFID node is resolved lazily on its first poll.
    pub async fn discover(&mut self) {
        let backoff = self.backoff();
        loop {
            let controller = self.controller.resolve(&self.locator, backoff);
            let scanner = self.scanner.resolve(&self.locator, backoff);
            if controller.is_some() && scanner.is_some() {
                break;
            }
            tokio::time::sleep(backoff).await;
        }
        self.maintain_link().await;
    }

    /// Discover devices, then tick until a host action ends the loop.
    pub async fn run(&mut self) -> SystemAction {
        self.discover().await;
        info!(mode = %self.mode, "Bridge running");

        let mut interval = tokio::time::interval(self.config.timing.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Tick::Terminate(action) = self.tick().await {
                info!(%action, stats = ?self.stats, "Bridge stopping");
                return action;
            }
        }
    }

    /// Switch off a relay left on by a cancelled [`Dispatcher::run`] or
    /// [`Dispatcher::tick`].
    pub async fn release_relays(&mut self) {
        let Some(relay) = self.peripherals.relays.energized().map(str::to_string) else {
            return;
        };
        if let Err(e) = self.peripherals.relays.release().await {
            error!(%relay, "Relay release failed: {}", e);
        }
    }

    /// Run one step of the loop.
    pub async fn tick(&mut self) -> Tick {
        self.maintain_link().await;

        if let Some(outcome) = self.drain_inbound().await {
            return Tick::Resolved(outcome);
        }

        if let Some(pending) = self.session.pending() {
            if !pending.is_expired(Instant::now()) {
                return Tick::Waiting;
            }
            warn!(
                identifier = %pending.identifier,
                read_at = %pending.identifier.read_at,
                "No verdict before deadline"
            );
            self.session.take();
            return Tick::Resolved(self.finish(SessionOutcome::TimedOut));
        }

        match self.poll_reader().await {
            Some(identifier) => self.dispatch(identifier).await,
            None => Tick::Idle,
        }
    }

    async fn maintain_link(&mut self) {
        if self.link.is_connected() {
            return;
        }

        let backoff = self.backoff();
        let Some(path) = self.controller.resolve(&self.locator, backoff) else {
            return;
        };
        if let Err(e) = self.link.connect(&path).await {
            warn!(%path, "Controller connect failed: {}", e);
            self.controller.invalidate(backoff);
        }
    }

    async fn drain_inbound(&mut self) -> Option<SessionOutcome> {
        if !self.link.is_connected() {
            return None;
        }

        match self.link.try_receive(Instant::now()).await {
            Ok(Some(inbound)) => self.handle_inbound(inbound).await,
            Ok(None) => None,
            Err(e) => {
                warn!("Controller link lost: {}", e);
                let backoff = self.backoff();
                self.controller.invalidate(backoff);
                None
            }
        }
    }

    async fn handle_inbound(&mut self, inbound: Inbound) -> Option<SessionOutcome> {
        match inbound {
            Inbound::ModeSwitch(mode) => {
                if mode != self.mode {
                    info!(from = %self.mode, to = %mode, "Scan mode changed");
                }
                self.mode = mode;
                None
            }
            Inbound::Activation(response) => {
                let Some(pending) = self.session.take() else {
                    warn!(?response, "Verdict with no pending session ignored");
                    return None;
                };
                if pending.is_expired(Instant::now()) {
                    warn!(
                        identifier = %pending.identifier,
                        read_at = %pending.identifier.read_at,
                        "Verdict arrived after deadline"
                    );
                    return Some(self.finish(SessionOutcome::TimedOut));
                }
                let outcome = self.resolve(&pending.identifier, response).await;
                Some(self.finish(outcome))
            }
            Inbound::Unrecognized(line) => {
                warn!(%line, "Unrecognized controller line ignored");
                None
            }
        }
    }

    async fn resolve(&mut self, identifier: &Identifier, response: ActivationResponse) -> SessionOutcome {
        match response.verdict(self.config.session.default_activation()) {
            Verdict::Deny => {
                info!(%identifier, read_at = %identifier.read_at, "Access denied");
                SessionOutcome::Denied
            }
            Verdict::Malformed(reason) => {
                warn!(%identifier, %reason, "Malformed verdict");
                SessionOutcome::Malformed(reason)
            }
            Verdict::Grant(request) => {
                info!(
                    %identifier,
                    read_at = %identifier.read_at,
                    relay = %request.relay,
                    duration_s = request.duration.as_secs_f64(),
                    "Access granted"
                );
                match self.peripherals.relays.activate(&request.relay, request.duration).await {
                    Ok(()) => SessionOutcome::Activated {
                        relay: request.relay,
                        duration: request.duration,
                    },
                    Err(HardwareError::UnknownRelay { name }) => {
                        warn!(relay = %name, "Verdict names an unknown relay");
                        self.notify_fault(&name, FaultReason::UnknownRelay).await;
                        SessionOutcome::UnknownRelay(name)
                    }
                    Err(e) => {
                        error!(relay = %request.relay, "Relay activation failed: {}", e);
                        self.notify_fault(&request.relay, FaultReason::RelayFault).await;
                        SessionOutcome::ActivationFailed {
                            relay: request.relay,
                            message: e.to_string(),
                        }
                    }
                }
            }
        }
    }

    async fn notify_fault(&mut self, relay: &str, reason: FaultReason) {
        self.send_to_controller(Outbound::RelayFault {
            relay: relay.to_string(),
            reason,
        })
        .await;
    }

    fn finish(&mut self, outcome: SessionOutcome) -> SessionOutcome {
        self.stats.record(&outcome);
        debug!(?outcome, "Session resolved");
        outcome
    }

    async fn poll_reader(&mut self) -> Option<Identifier> {
        let backoff = self.backoff();
        let timing = &self.config.timing;
        let (slot, reader, timeout) = match self.mode {
            ScanMode::Rfid => (
                &mut self.rfid,
                &mut self.peripherals.rfid,
                timing.rfid_read_timeout(),
            ),
            ScanMode::Qr => (
                &mut self.scanner,
                &mut self.peripherals.qr,
                timing.qr_read_timeout(),
            ),
        };

        let path = slot.resolve(&self.locator, backoff)?;
        match reader.read_identifier(&path, timeout).await {
            Ok(Some(identifier)) => {
                info!(%identifier, "Identifier read");
                Some(identifier)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(%path, "Reader failed: {}", e);
                if e.is_device_loss() {
                    slot.invalidate(backoff);
                }
                None
            }
        }
    }

    async fn dispatch(&mut self, identifier: Identifier) -> Tick {
        if identifier.kind == IdentifierKind::Qr {
            if let Some(command) = parse_system_command(&identifier.value) {
                return self.run_system_command(command).await;
            }
        }

        if !self.send_to_controller(Outbound::identifier(&identifier)).await {
            return Tick::Idle;
        }

        self.session.lock(
            identifier.clone(),
            Instant::now(),
            self.config.timing.response_timeout(),
        );
        self.stats.started += 1;
        Tick::Sent(identifier)
    }

    async fn run_system_command(&mut self, command: SystemCommand) -> Tick {
        info!(%command, "Privileged QR command");
        self.send_to_controller(Outbound::Ack(command.clone())).await;

        let Some(action) = SystemAction::from_command(&command) else {
            warn!(%command, "Unknown host command ignored");
            return Tick::Acknowledged(command);
        };

        match self.peripherals.system.execute(action).await {
            Ok(()) => Tick::Terminate(action),
            Err(e) => {
                error!(%action, "Host command failed: {}", e);
                Tick::Acknowledged(command)
            }
        }
    }

    /// Send and report success. Failures are logged, never retried.
    async fn send_to_controller(&mut self, message: Outbound) -> bool {
        match self.link.send(message).await {
            Ok(()) => true,
            Err(LinkError::NotConnected) => {
                warn!("Controller not connected, message dropped");
                false
            }
            Err(e) => {
                warn!("Send to controller failed: {}", e);
                if !self.link.is_connected() {
                    let backoff = self.backoff();
                    self.controller.invalidate(backoff);
                }
                false
            }
        }
    }
}
