//! SRDP protocol engine.
//!
//! A [`Channel`] is the device side of one host connection: it reassembles
//! inbound frames, dispatches register reads and writes to a
//! [`RegisterAccess`] implementation, answers with acknowledgements that echo
//! the host's sequence number, and sends change notifications with its own
//! outbound sequence. [`Host`] is the other end.

pub mod builtin;
pub mod channel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod registers;
pub mod sequence;
pub mod stats;

pub use builtin::{DriverInfo, BUILTIN_DEVICE};
pub use channel::Channel;
pub use config::ChannelConfig;
pub use dispatch::{Dispatcher, Reply};
pub use error::{ChannelError, HostError, HostResult, Result};
pub use host::Host;
pub use registers::{MemoryRegisters, RegisterAccess, RegisterAddress};
pub use sequence::SequenceNumbers;
pub use stats::ChannelStats;

pub use srdp_frame::RegisterError;
