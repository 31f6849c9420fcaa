use std::net::SocketAddr;

/// Errors that can occur in SRDP transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// An I/O error occurred on the underlying socket or device.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A datagram transport has no peer to send to yet.
    #[error("no peer address known (nothing received and no host configured)")]
    NoPeer,

    /// Failed to open or configure a serial port.
    #[cfg(feature = "serial")]
    #[error("serial port {path}: {source}")]
    Serial {
        path: String,
        source: serialport::Error,
    },

    /// The transport has been shut down.
    #[error("transport shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TransportError>;
