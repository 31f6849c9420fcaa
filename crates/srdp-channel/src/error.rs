use std::time::Duration;

use srdp_frame::RegisterError;

/// Errors surfaced by [`Channel::poll`](crate::Channel::poll) and
/// [`Channel::notify`](crate::Channel::notify).
///
/// Malformed inbound frames are not errors: the channel drops them, counts
/// them and keeps going. Transport failures arrive wrapped in
/// [`FrameError::Transport`](srdp_frame::FrameError::Transport).
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Frame-level error (includes transport failures).
    #[error("frame error: {0}")]
    Frame(#[from] srdp_frame::FrameError),
}

pub type Result<T> = std::result::Result<T, ChannelError>;

/// Errors returned by [`Host`](crate::Host) requests.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Frame-level error (includes transport failures).
    #[error("frame error: {0}")]
    Frame(#[from] srdp_frame::FrameError),

    /// The adapter answered with an Error frame.
    #[error("adapter rejected request: {}", describe_code(*.code))]
    Remote { code: i32 },

    /// No matching reply arrived in time.
    #[error("no reply within {0:?}")]
    Timeout(Duration),
}

impl HostError {
    /// The register error carried by a [`HostError::Remote`], if it is a known code.
    pub fn register_error(&self) -> Option<RegisterError> {
        match self {
            Self::Remote { code } => RegisterError::from_code(*code),
            _ => None,
        }
    }
}

fn describe_code(code: i32) -> String {
    match RegisterError::from_code(code) {
        Some(err) => format!("{err} ({code})"),
        None => format!("SRDP error {code}"),
    }
}

pub type HostResult<T> = std::result::Result<T, HostError>;
