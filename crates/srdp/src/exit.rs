use std::fmt;
use std::io;

use srdp_channel::{ChannelError, HostError};
use srdp_frame::FrameError;
use srdp_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::AddrInUse
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Io(source) => io_error(context, source),
        TransportError::Shutdown => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        FrameError::PayloadTooLarge { .. } | FrameError::Truncated { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn channel_error(context: &str, err: ChannelError) -> CliError {
    match err {
        ChannelError::Frame(err) => frame_error(context, err),
    }
}

pub fn host_error(context: &str, err: HostError) -> CliError {
    match err {
        HostError::Frame(err) => frame_error(context, err),
        HostError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        HostError::Remote { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn host_timeout_maps_to_timeout_code() {
        let err = host_error("read failed", HostError::Timeout(Duration::from_secs(1)));
        assert_eq!(err.code, TIMEOUT);
        assert!(err.message.starts_with("read failed: "));
    }

    #[test]
    fn remote_rejection_is_failure() {
        let err = host_error("write failed", HostError::Remote { code: -5 });
        assert_eq!(err.code, FAILURE);
        assert!(err.message.contains("invalid register operation"));
    }

    #[test]
    fn nested_transport_errors_keep_io_classification() {
        let io = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = channel_error(
            "poll failed",
            ChannelError::Frame(FrameError::Transport(TransportError::Io(io))),
        );
        assert_eq!(err.code, PERMISSION_DENIED);
    }

    #[test]
    fn oversized_payload_is_data_invalid() {
        let err = frame_error("encode failed", FrameError::PayloadTooLarge { size: 80, max: 69 });
        assert_eq!(err.code, DATA_INVALID);
    }
}
