//! Frame types, operations and register error codes.
//!
//! Protocol version 1 operation table: Sync=0, Read=1, Write=2, Change=3.

/// Frame type carried in the top two bits of `opdev`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameType {
    /// Code 0 is not assigned. Frames carrying it are dropped.
    #[default]
    Reserved,
    /// A request that expects an acknowledgement or error.
    Request,
    /// Positive acknowledgement of a request.
    Ack,
    /// Negative acknowledgement of a request.
    Error,
}

impl FrameType {
    /// Decode from the low two bits of `bits`.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            1 => Self::Request,
            2 => Self::Ack,
            3 => Self::Error,
            _ => Self::Reserved,
        }
    }

    /// Wire code of this frame type.
    pub fn bits(self) -> u8 {
        match self {
            Self::Reserved => 0,
            Self::Request => 1,
            Self::Ack => 2,
            Self::Error => 3,
        }
    }

    /// Short name used in logs and CLI output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Reserved => "RSV",
            Self::Request => "REQ",
            Self::Ack => "ACK",
            Self::Error => "ERR",
        }
    }
}

/// Operation carried in bits 12-13 of `opdev`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operation {
    #[default]
    Sync,
    Read,
    Write,
    Change,
}

impl Operation {
    /// Decode from the low two bits of `bits`.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            1 => Self::Read,
            2 => Self::Write,
            3 => Self::Change,
            _ => Self::Sync,
        }
    }

    /// Wire code of this operation.
    pub fn bits(self) -> u8 {
        match self {
            Self::Sync => 0,
            Self::Read => 1,
            Self::Write => 2,
            Self::Change => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sync => "SYNC",
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::Change => "CHANGE",
        }
    }
}

/// Negative result of a register access.
///
/// The numeric codes are part of the protocol: they travel as a signed
/// 32-bit little-endian integer in the payload of Error frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum RegisterError {
    #[error("not implemented")]
    NotImplemented,
    #[error("no such device")]
    NoSuchDevice,
    #[error("no such register")]
    NoSuchRegister,
    #[error("invalid register position and/or length")]
    InvalidPositionOrLength,
    #[error("invalid register operation")]
    InvalidOperation,
}

impl RegisterError {
    /// Size of an encoded error code in an Error frame payload.
    pub const ENCODED_LEN: usize = 4;

    /// Protocol error code (always negative).
    pub fn code(self) -> i32 {
        match self {
            Self::NotImplemented => -1,
            Self::NoSuchDevice => -2,
            Self::NoSuchRegister => -3,
            Self::InvalidPositionOrLength => -4,
            Self::InvalidOperation => -5,
        }
    }

    /// Map a protocol error code back to a known error.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::NotImplemented),
            -2 => Some(Self::NoSuchDevice),
            -3 => Some(Self::NoSuchRegister),
            -4 => Some(Self::InvalidPositionOrLength),
            -5 => Some(Self::InvalidOperation),
            _ => None,
        }
    }

    /// Encode as an Error frame payload.
    pub fn to_payload(self) -> [u8; Self::ENCODED_LEN] {
        self.code().to_le_bytes()
    }

    /// Decode the error code from an Error frame payload.
    ///
    /// Returns `None` if the payload is shorter than four octets.
    pub fn code_from_payload(payload: &[u8]) -> Option<i32> {
        let bytes: [u8; Self::ENCODED_LEN] = payload.get(..Self::ENCODED_LEN)?.try_into().ok()?;
        Some(i32::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_type_codes() {
        assert_eq!(FrameType::Request.bits(), 1);
        assert_eq!(FrameType::Ack.bits(), 2);
        assert_eq!(FrameType::Error.bits(), 3);
        assert_eq!(FrameType::from_bits(0), FrameType::Reserved);
        assert_eq!(FrameType::from_bits(0b110), FrameType::Ack);
    }

    #[test]
    fn operation_codes() {
        for bits in 0..4u8 {
            assert_eq!(Operation::from_bits(bits).bits(), bits);
        }
        assert_eq!(Operation::from_bits(3).name(), "CHANGE");
    }

    #[test]
    fn register_error_codes() {
        let all = [
            RegisterError::NotImplemented,
            RegisterError::NoSuchDevice,
            RegisterError::NoSuchRegister,
            RegisterError::InvalidPositionOrLength,
            RegisterError::InvalidOperation,
        ];
        for (i, err) in all.iter().enumerate() {
            assert_eq!(err.code(), -(i as i32) - 1);
            assert_eq!(RegisterError::from_code(err.code()), Some(*err));
        }
        assert_eq!(RegisterError::from_code(-42), None);
        assert_eq!(RegisterError::from_code(0), None);
    }

    #[test]
    fn error_payload_is_little_endian_i32() {
        let payload = RegisterError::NoSuchRegister.to_payload();
        assert_eq!(payload, [0xFD, 0xFF, 0xFF, 0xFF]);
        assert_eq!(RegisterError::code_from_payload(&payload), Some(-3));
        assert_eq!(RegisterError::code_from_payload(&payload[..2]), None);
    }

    #[test]
    fn error_descriptions() {
        assert_eq!(
            RegisterError::InvalidPositionOrLength.to_string(),
            "invalid register position and/or length"
        );
    }
}
