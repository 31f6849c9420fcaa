//! SRDP: a small register-access protocol between a host and resource
//! constrained devices.
//!
//! Every message is a 12-octet header followed by an optional payload. The
//! host reads and writes addressable registers; the device acknowledges and
//! pushes change notifications of its own.
//!
//! # Crate Structure
//!
//! - [`transport`] - Byte transports (UDP datagrams, byte streams, serial ports)
//! - [`frame`] - Header codec, stream reassembly and frame writing
//! - [`channel`] - Device-side protocol engine and host client

/// Re-export transport types.
pub mod transport {
    pub use srdp_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use srdp_frame::*;
}

/// Re-export channel types.
pub mod channel {
    pub use srdp_channel::*;
}
