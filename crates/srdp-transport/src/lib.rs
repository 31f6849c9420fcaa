//! Transport abstraction for SRDP channels.
//!
//! An SRDP channel never touches sockets or devices directly. It pulls bytes
//! through a [`Transport`] and pushes whole frames back out through the same
//! object. Implementations provided here:
//! - [`UdpTransport`]: one frame per datagram, replies go to the last sender
//!   unless a fixed host address is configured
//! - [`StreamTransport`]: any `Read + Write` byte stream (socket pairs, TCP,
//!   character devices)
//! - `serial::open` (feature `serial`): a serial port wrapped in a
//!   [`StreamTransport`]

pub mod error;
pub mod traits;
pub mod udp;

#[cfg(feature = "serial")]
pub mod serial;

pub use error::{Result, TransportError};
pub use traits::{StreamTransport, Transport};
pub use udp::{UdpTransport, SRDP_UDP_PORT};
