//! SRDP frame codec, stream reassembly and frame writing.
//!
//! Every SRDP frame is a fixed 12-octet header followed by `len` payload
//! octets. All header fields are 16-bit little-endian words:
//!
//! ```text
//! ┌────────┬──────┬──────┬──────┬──────┬────────┬──────────────────┐
//! │ opdev  │ seq  │ reg  │ pos  │ len  │ crc16  │ payload          │
//! │ (2B)   │ (2B) │ (2B) │ (2B) │ (2B) │ (2B)   │ (len bytes)      │
//! └────────┴──────┴──────┴──────┴──────┴────────┴──────────────────┘
//!
//! opdev = type (2 bits) | operation (2 bits) | device (12 bits)
//! ```
//!
//! `crc16` is reserved and always zero on the wire.

pub mod codec;
pub mod error;
pub mod reassembler;
pub mod types;
pub mod writer;

pub use codec::{
    decode_frame, decode_header, encode_frame, encode_header, Frame, FrameConfig, FrameHeader,
    DEFAULT_MAX_PAYLOAD, HEADER_LEN, MAX_PAYLOAD_LIMIT, PROTOCOL_VERSION,
};
pub use error::{FrameError, Result};
pub use reassembler::Reassembler;
pub use types::{FrameType, Operation, RegisterError};
pub use writer::FrameWriter;
