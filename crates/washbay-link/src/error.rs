use thiserror::Error;
use washbay_core::DevicePath;

/// Errors that can occur on the controller link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// No transport is open.
    #[error("Controller link not connected")]
    NotConnected,

    /// The transport could not be opened.
    #[error("Failed to open controller link on {path}: {source}")]
    ConnectFailed {
        path: DevicePath,
        #[source]
        source: std::io::Error,
    },

    /// A write did not complete in time.
    #[error("Write timeout after {0}ms")]
    WriteTimeout(u64),

    /// The controller closed the link or the transport failed.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Encoding or decoding failed.
    #[error("Protocol error: {0}")]
    Protocol(#[from] washbay_core::Error),

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;
