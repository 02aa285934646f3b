//! ControllerLink over in-memory duplex transports.

use std::io;
use std::sync::mpsc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::time::Instant;
use washbay_core::config::IdentifierFormat;
use washbay_core::{DevicePath, IdentifierKind, ScanMode};
use washbay_link::{BoxedTransport, ControllerLink, LinkError, Opener};
use washbay_protocol::{Inbound, Outbound};

const HANDSHAKE: &str = "{\"status\":true,\"start\":true}\n";

/// Opener handing out pre-made duplex ends; fails once they run out.
fn duplex_opener(ends: mpsc::Receiver<DuplexStream>) -> Opener {
    Box::new(move |_path: &DevicePath| -> io::Result<BoxedTransport> {
        ends.try_recv()
            .map(|end| Box::new(end) as BoxedTransport)
            .map_err(|_| io::Error::from(io::ErrorKind::NotFound))
    })
}

/// Link plus the controller side of its first transport.
fn linked(buffer: usize, format: IdentifierFormat) -> (ControllerLink, DuplexStream, mpsc::Sender<DuplexStream>) {
    let (tx, rx) = mpsc::channel();
    let (bridge, controller) = tokio::io::duplex(buffer);
    tx.send(bridge).unwrap();
    let link = ControllerLink::with_opener(duplex_opener(rx), Duration::from_secs(1), format);
    (link, controller, tx)
}

async fn read_text(controller: &mut DuplexStream, len: usize) -> String {
    let mut buf = vec![0u8; len];
    controller.read_exact(&mut buf).await.unwrap();
    String::from_utf8(buf).unwrap()
}

fn port() -> DevicePath {
    DevicePath::new("/dev/ttyUSB0")
}

#[tokio::test]
async fn test_connect_sends_handshake() {
    let (mut link, mut controller, _tx) = linked(1024, IdentifierFormat::Tagged);

    link.connect(&port()).await.unwrap();
    assert!(link.is_connected());
    assert_eq!(link.path(), Some(&port()));
    assert_eq!(read_text(&mut controller, HANDSHAKE.len()).await, HANDSHAKE);
}

#[tokio::test]
async fn test_send_identifier_and_receive_verdict() {
    let (mut link, mut controller, _tx) = linked(1024, IdentifierFormat::Tagged);
    link.connect(&port()).await.unwrap();
    read_text(&mut controller, HANDSHAKE.len()).await;

    link.send(Outbound::Identifier {
        kind: IdentifierKind::Rfid,
        value: "abc".into(),
    })
    .await
    .unwrap();
    assert_eq!(read_text(&mut controller, 9).await, "RFID:abc\n");

    controller
        .write_all(b"{\"status\":true,\"rele\":\"yikama\",\"time\":30}\n")
        .await
        .unwrap();
    let inbound = link
        .try_receive(Instant::now() + Duration::from_secs(7))
        .await
        .unwrap();
    assert!(matches!(inbound, Some(Inbound::Activation(ref r)) if r.status));
}

#[tokio::test(start_paused = true)]
async fn test_try_receive_times_out_quietly() {
    let (mut link, _controller, _tx) = linked(1024, IdentifierFormat::Tagged);
    link.connect(&port()).await.unwrap();

    let started = Instant::now();
    let inbound = link
        .try_receive(started + Duration::from_secs(7))
        .await
        .unwrap();
    assert_eq!(inbound, None);
    assert_eq!(started.elapsed(), Duration::from_secs(7));
    assert!(link.is_connected());
}

#[tokio::test]
async fn test_past_deadline_polls_buffered_line() {
    let (mut link, mut controller, _tx) = linked(1024, IdentifierFormat::Tagged);
    link.connect(&port()).await.unwrap();

    controller.write_all(b"MODE:QR\n").await.unwrap();
    let inbound = link.try_receive(Instant::now()).await.unwrap();
    assert_eq!(inbound, Some(Inbound::ModeSwitch(ScanMode::Qr)));

    let inbound = link.try_receive(Instant::now()).await.unwrap();
    assert_eq!(inbound, None);
}

#[tokio::test]
async fn test_controller_hangup_disconnects() {
    let (mut link, controller, _tx) = linked(1024, IdentifierFormat::Tagged);
    link.connect(&port()).await.unwrap();
    drop(controller);

    let result = link
        .try_receive(Instant::now() + Duration::from_secs(1))
        .await;
    assert!(matches!(result, Err(LinkError::ConnectionLost(_))));
    assert!(!link.is_connected());
    assert!(link.path().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_stalled_write_times_out_and_disconnects() {
    let (mut link, mut controller, _tx) = linked(64, IdentifierFormat::Tagged);
    link.connect(&port()).await.unwrap();
    read_text(&mut controller, HANDSHAKE.len()).await;

    // Controller stops reading; the payload does not fit the pipe.
    let result = link
        .send(Outbound::Identifier {
            kind: IdentifierKind::Qr,
            value: "x".repeat(200),
        })
        .await;
    assert!(matches!(result, Err(LinkError::WriteTimeout(1000))));
    assert!(!link.is_connected());

    let result = link.send(Outbound::Handshake).await;
    assert!(matches!(result, Err(LinkError::NotConnected)));
}

#[tokio::test]
async fn test_reconnect_uses_new_transport() {
    let (mut link, controller, tx) = linked(1024, IdentifierFormat::Record);
    link.connect(&port()).await.unwrap();
    drop(controller);
    assert!(link.try_receive(Instant::now() + Duration::from_secs(1)).await.is_err());

    let (bridge, mut controller) = tokio::io::duplex(1024);
    tx.send(bridge).unwrap();
    link.connect(&DevicePath::new("/dev/ttyUSB1")).await.unwrap();
    assert_eq!(read_text(&mut controller, HANDSHAKE.len()).await, HANDSHAKE);

    link.send(Outbound::Identifier {
        kind: IdentifierKind::Rfid,
        value: "k1".into(),
    })
    .await
    .unwrap();
    let expected = "{\"kart_id\":\"k1\",\"status\":true}\n";
    assert_eq!(read_text(&mut controller, expected.len()).await, expected);
}

#[tokio::test]
async fn test_connect_fails_when_no_device() {
    let (tx, rx) = mpsc::channel::<DuplexStream>();
    drop(tx);
    let mut link = ControllerLink::with_opener(
        duplex_opener(rx),
        Duration::from_secs(1),
        IdentifierFormat::Tagged,
    );
    let result = link.connect(&port()).await;
    assert!(matches!(result, Err(LinkError::ConnectFailed { .. })));
}
