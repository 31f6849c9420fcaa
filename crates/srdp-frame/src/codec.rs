use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::types::{FrameType, Operation};

/// Frame header length: six 16-bit words.
pub const HEADER_LEN: usize = 12;

/// Default maximum payload: an 81-octet link MTU minus the header.
pub const DEFAULT_MAX_PAYLOAD: usize = 81 - HEADER_LEN;

/// Largest payload any configuration may allow.
pub const MAX_PAYLOAD_LIMIT: usize = u16::MAX as usize - HEADER_LEN;

/// Version of the operation table implemented by this crate.
pub const PROTOCOL_VERSION: u8 = 1;

const DEVICE_MASK: u16 = 0x0FFF;
const LEN_OFFSET: usize = 8;

/// Decoded SRDP frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameHeader {
    pub frame_type: FrameType,
    pub operation: Operation,
    /// Device index (12 bits). 0 addresses the adapter's built-in registers.
    pub device: u16,
    pub register: u16,
    /// Byte offset within the register value.
    pub position: u16,
    /// Payload length in octets.
    pub length: u16,
    pub sequence: u16,
    /// Reserved integrity field. Encoded as zero, kept as received on decode.
    pub crc16: u16,
}

impl FrameHeader {
    /// Build a header. `device` is truncated to 12 bits on the wire.
    pub fn new(
        frame_type: FrameType,
        operation: Operation,
        device: u16,
        register: u16,
        position: u16,
        length: u16,
        sequence: u16,
    ) -> Self {
        Self {
            frame_type,
            operation,
            device,
            register,
            position,
            length,
            sequence,
            crc16: 0,
        }
    }

    /// Packed `type | operation | device` word.
    pub fn opdev(&self) -> u16 {
        (u16::from(self.frame_type.bits()) << 14)
            | (u16::from(self.operation.bits()) << 12)
            | (self.device & DEVICE_MASK)
    }

    /// Encode into a fresh header array.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        encode_header(self, &mut out);
        out
    }

    /// Total wire size of a frame carrying this header.
    pub fn frame_len(&self) -> usize {
        HEADER_LEN + usize::from(self.length)
    }
}

/// Encode `header` into `dst`. The crc16 word is always written as zero.
pub fn encode_header(header: &FrameHeader, dst: &mut [u8; HEADER_LEN]) {
    let mut out = &mut dst[..];
    out.put_u16_le(header.opdev());
    out.put_u16_le(header.sequence);
    out.put_u16_le(header.register);
    out.put_u16_le(header.position);
    out.put_u16_le(header.length);
    out.put_u16_le(0);
}

/// Decode a header from the first [`HEADER_LEN`] bytes of `src`.
///
/// Does not allocate. Extra bytes after the header are ignored.
pub fn decode_header(src: &[u8]) -> Result<FrameHeader> {
    if src.len() < HEADER_LEN {
        return Err(FrameError::Truncated {
            len: src.len(),
            need: HEADER_LEN,
        });
    }

    let mut cur = &src[..HEADER_LEN];
    let opdev = cur.get_u16_le();
    let sequence = cur.get_u16_le();
    let register = cur.get_u16_le();
    let position = cur.get_u16_le();
    let length = cur.get_u16_le();
    let crc16 = cur.get_u16_le();

    Ok(FrameHeader {
        frame_type: FrameType::from_bits((opdev >> 14) as u8),
        operation: Operation::from_bits((opdev >> 12) as u8),
        device: opdev & DEVICE_MASK,
        register,
        position,
        length,
        sequence,
        crc16,
    })
}

/// Read only the `len` word of a buffered header.
pub(crate) fn peek_length(src: &[u8]) -> Option<u16> {
    let bytes = src.get(LEN_OFFSET..LEN_OFFSET + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// An owned frame: header plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame. The header's `length` is set from the payload.
    ///
    /// Fails with [`FrameError::PayloadTooLarge`] if the payload cannot be
    /// described by a header.
    pub fn new(mut header: FrameHeader, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        header.length = u16::try_from(payload.len())
            .ok()
            .filter(|len| usize::from(*len) <= MAX_PAYLOAD_LIMIT)
            .ok_or(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_LIMIT,
            })?;
        Ok(Self { header, payload })
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }
}

/// Encode a header and payload into `dst`.
///
/// The header's `length` is replaced by the payload length. Fails without
/// touching `dst` if the payload exceeds `max_payload`.
pub fn encode_frame(
    header: &FrameHeader,
    payload: &[u8],
    dst: &mut BytesMut,
    max_payload: usize,
) -> Result<()> {
    let max = max_payload.min(MAX_PAYLOAD_LIMIT);
    if payload.len() > max {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max,
        });
    }

    let header = FrameHeader {
        length: payload.len() as u16,
        ..*header
    };
    dst.reserve(HEADER_LEN + payload.len());
    dst.put_slice(&header.to_bytes());
    dst.put_slice(payload);
    Ok(())
}

/// Decode one frame from the front of `src`.
///
/// Returns `Ok(None)` if `src` does not hold a complete frame yet. On success
/// the frame bytes are consumed from `src`.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_LEN {
        return Ok(None);
    }

    let header = decode_header(&src[..])?;
    let payload_len = usize::from(header.length);
    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    if src.len() < header.frame_len() {
        return Ok(None);
    }

    src.advance(HEADER_LEN);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame { header, payload }))
}

/// Configuration for frame encoding and reassembly.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: [`DEFAULT_MAX_PAYLOAD`].
    pub max_payload_size: usize,
    /// How long a blocking [`Reassembler::read_frame`](crate::Reassembler::read_frame)
    /// waits for a complete frame.
    pub read_timeout: Duration,
}

impl FrameConfig {
    /// Configuration with a custom payload limit, capped at [`MAX_PAYLOAD_LIMIT`].
    pub fn with_max_payload(max_payload_size: usize) -> Self {
        Self {
            max_payload_size: max_payload_size.min(MAX_PAYLOAD_LIMIT),
            ..Self::default()
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: Duration::from_secs(5),
        }
    }
}
