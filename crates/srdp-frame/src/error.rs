use std::time::Duration;

/// Errors that can occur during frame encoding, decoding and reassembly.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Fewer bytes than a full header were supplied to the decoder.
    #[error("truncated frame header ({len} bytes, need {need})")]
    Truncated { len: usize, need: usize },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The transport failed while reading or writing frames.
    #[error("transport error: {0}")]
    Transport(#[from] srdp_transport::TransportError),

    /// No complete frame arrived before the read timeout.
    #[error("no complete frame within {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, FrameError>;
