//! Controller link messages.
//!
//! Outbound traffic is a mix of tagged text lines (`RFID:<id>`,
//! `QR:<payload>`, `QR:ACK_*`) and compact JSON records. Inbound traffic is
//! either a `MODE:` line or an activation record; everything else surfaces
//! as [`Inbound::Unrecognized`] so a noisy controller never breaks the link.

use crate::command::SystemCommand;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use washbay_core::config::IdentifierFormat;
use washbay_core::constants::{MODE_PREFIX, QR_TAG};
use washbay_core::{ActivationRequest, Error, Identifier, IdentifierKind, Result, ScanMode};

/// Why the bridge could not carry out a granted activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultReason {
    UnknownRelay,
    RelayFault,
}

impl FaultReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultReason::UnknownRelay => "unknown_relay",
            FaultReason::RelayFault => "relay_fault",
        }
    }
}

/// Message sent from the bridge to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A scanned identifier awaiting the controller's verdict.
    Identifier { kind: IdentifierKind, value: String },
    /// Acknowledgement of a `systemd:` QR payload.
    Ack(SystemCommand),
    /// Sent once after the link opens.
    Handshake,
    /// A granted activation could not be performed.
    RelayFault { relay: String, reason: FaultReason },
}

#[derive(Serialize)]
struct CardRecord<'a> {
    kart_id: &'a str,
    status: bool,
}

#[derive(Serialize)]
struct TicketRecord<'a> {
    qr_id: &'a str,
    status: bool,
}

#[derive(Serialize)]
struct HandshakeRecord {
    status: bool,
    start: bool,
}

#[derive(Serialize)]
struct FaultRecord<'a> {
    status: bool,
    rele: &'a str,
    error: &'a str,
}

impl Outbound {
    pub fn identifier(identifier: &Identifier) -> Self {
        Outbound::Identifier {
            kind: identifier.kind,
            value: identifier.value.clone(),
        }
    }

    /// Render the message as one line, without the trailing newline.
    ///
    /// # Errors
    /// Returns `Error::Serialization` if a JSON record cannot be produced.
    ///
    /// # Examples
    ///
    /// ```
    /// use washbay_core::{config::IdentifierFormat, IdentifierKind};
    /// use washbay_protocol::Outbound;
    ///
    /// let msg = Outbound::Identifier { kind: IdentifierKind::Rfid, value: "abc".into() };
    /// assert_eq!(msg.encode(IdentifierFormat::Tagged).unwrap(), "RFID:abc");
    /// assert_eq!(
    ///     msg.encode(IdentifierFormat::Record).unwrap(),
    ///     r#"{"kart_id":"abc","status":true}"#
    /// );
    /// ```
    pub fn encode(&self, format: IdentifierFormat) -> Result<String> {
        match self {
            Outbound::Identifier { kind, value } => match format {
                IdentifierFormat::Tagged => Ok(format!("{}:{value}", kind.tag())),
                IdentifierFormat::Record => match kind {
                    IdentifierKind::Rfid => to_json(&CardRecord {
                        kart_id: value,
                        status: true,
                    }),
                    IdentifierKind::Qr => to_json(&TicketRecord {
                        qr_id: value,
                        status: true,
                    }),
                },
            },
            Outbound::Ack(command) => Ok(format!("{QR_TAG}:{}", command.ack_code())),
            Outbound::Handshake => to_json(&HandshakeRecord {
                status: true,
                start: true,
            }),
            Outbound::RelayFault { relay, reason } => to_json(&FaultRecord {
                status: false,
                rele: relay,
                error: reason.as_str(),
            }),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Serialization(e.to_string()))
}

/// Activation record as sent by the controller.
///
/// `rele` and `time` are optional on the wire; whether their absence is
/// acceptable depends on `status` and is decided by [`verdict`](Self::verdict).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActivationResponse {
    pub status: bool,
    #[serde(default)]
    pub rele: Option<String>,
    #[serde(default)]
    pub time: Option<f64>,
}

/// Interpretation of an [`ActivationResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Grant(ActivationRequest),
    Deny,
    Malformed(String),
}

impl ActivationResponse {
    /// Decide what the response asks for.
    ///
    /// A missing `time` falls back to `default_duration`. A granted response
    /// without a relay name, or with a negative or non-finite time, is
    /// malformed.
    pub fn verdict(&self, default_duration: Duration) -> Verdict {
        if !self.status {
            return Verdict::Deny;
        }

        let relay = match self.rele.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => return Verdict::Malformed("granted without a relay name".to_string()),
        };

        match self.time {
            None => Verdict::Grant(ActivationRequest::new(relay, default_duration)),
            Some(secs) => match ActivationRequest::from_secs_f64(relay, secs) {
                Ok(request) => Verdict::Grant(request),
                Err(e) => Verdict::Malformed(e.to_string()),
            },
        }
    }
}

/// Message received from the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    ModeSwitch(ScanMode),
    Activation(ActivationResponse),
    Unrecognized(String),
}

/// Classify one trimmed inbound line.
///
/// # Examples
///
/// ```
/// use washbay_core::ScanMode;
/// use washbay_protocol::{parse_inbound, Inbound};
///
/// assert_eq!(parse_inbound("MODE:qr"), Inbound::ModeSwitch(ScanMode::Qr));
/// assert!(matches!(
///     parse_inbound(r#"{"status":true,"rele":"yikama","time":30}"#),
///     Inbound::Activation(_)
/// ));
/// assert!(matches!(parse_inbound("MODE:NFC"), Inbound::Unrecognized(_)));
/// ```
#[must_use]
pub fn parse_inbound(line: &str) -> Inbound {
    let line = line.trim();

    if let Some(mode) = line.strip_prefix(MODE_PREFIX) {
        return match mode.parse::<ScanMode>() {
            Ok(mode) => Inbound::ModeSwitch(mode),
            Err(_) => Inbound::Unrecognized(line.to_string()),
        };
    }

    if line.starts_with('{') {
        if let Ok(response) = serde_json::from_str::<ActivationResponse>(line) {
            return Inbound::Activation(response);
        }
    }

    Inbound::Unrecognized(line.to_string())
}
