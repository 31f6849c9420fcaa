use bytes::BytesMut;
use srdp_transport::Transport;
use tracing::trace;

use crate::codec::{encode_frame, Frame, FrameConfig, FrameHeader, HEADER_LEN};
use crate::error::Result;

/// Encodes frames into a reusable buffer and transmits them whole.
///
/// The writer does not own the transport: a channel reads and writes through
/// the same transport object, so it is passed in per call.
pub struct FrameWriter {
    buf: BytesMut,
    config: FrameConfig,
}

impl FrameWriter {
    /// Create a frame writer with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a frame writer with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(HEADER_LEN + config.max_payload_size),
            config,
        }
    }

    /// Encode `header` + `payload` and send it as one unit.
    ///
    /// The header's `length` is taken from `payload`. Returns the number of
    /// octets transmitted.
    pub fn send<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        header: &FrameHeader,
        payload: &[u8],
    ) -> Result<usize> {
        self.buf.clear();
        encode_frame(header, payload, &mut self.buf, self.config.max_payload_size)?;
        let sent = transport.send(&self.buf)?;
        trace!(
            frame_type = header.frame_type.name(),
            operation = header.operation.name(),
            sequence = header.sequence,
            octets = sent,
            "frame sent"
        );
        Ok(sent)
    }

    /// Send an owned frame.
    pub fn write_frame<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        frame: &Frame,
    ) -> Result<usize> {
        self.send(transport, &frame.header, frame.payload.as_ref())
    }

    /// Bytes of the most recently encoded frame.
    pub fn last_frame(&self) -> &[u8] {
        &self.buf
    }

    /// Update maximum payload size for subsequent frames.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use srdp_transport::{StreamTransport, TransportError};

    use super::*;
    use crate::codec::{decode_frame, DEFAULT_MAX_PAYLOAD};
    use crate::error::FrameError;
    use crate::types::{FrameType, Operation};

    #[derive(Default)]
    struct CaptureTransport {
        sent: Vec<Vec<u8>>,
    }

    impl Transport for CaptureTransport {
        fn recv(&mut self, _buf: &mut [u8]) -> srdp_transport::Result<usize> {
            Ok(0)
        }

        fn send(&mut self, data: &[u8]) -> srdp_transport::Result<usize> {
            self.sent.push(data.to_vec());
            Ok(data.len())
        }

        fn name(&self) -> &'static str {
            "capture"
        }
    }

    fn ack(sequence: u16) -> FrameHeader {
        FrameHeader::new(FrameType::Ack, Operation::Read, 1, 5, 0, 0, sequence)
    }

    #[test]
    fn each_frame_is_one_send() {
        let mut transport = CaptureTransport::default();
        let mut writer = FrameWriter::new();

        writer.send(&mut transport, &ack(1), b"one").unwrap();
        writer.send(&mut transport, &ack(2), b"").unwrap();

        assert_eq!(transport.sent.len(), 2);
        assert_eq!(transport.sent[0].len(), HEADER_LEN + 3);
        assert_eq!(transport.sent[1].len(), HEADER_LEN);
        assert_eq!(writer.last_frame(), transport.sent[1].as_slice());
    }

    #[test]
    fn length_field_follows_payload() {
        let mut transport = CaptureTransport::default();
        let mut writer = FrameWriter::new();
        let mut header = ack(9);
        header.length = 60;

        writer.send(&mut transport, &header, &[0x00, 0x01]).unwrap();

        let mut wire = BytesMut::from(transport.sent[0].as_slice());
        let frame = decode_frame(&mut wire, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(frame.header.length, 2);
        assert_eq!(frame.payload.as_ref(), &[0x00, 0x01]);
    }

    #[test]
    fn payload_too_large_rejected() {
        let mut transport = CaptureTransport::default();
        let mut writer = FrameWriter::with_config(FrameConfig::with_max_payload(4));

        let err = writer.send(&mut transport, &ack(1), b"oversized").unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn write_frame_over_stream() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut tx = StreamTransport::new(left);
        let mut rx = StreamTransport::new(right);
        let mut writer = FrameWriter::new();

        let frame = Frame::new(ack(3), b"ping".to_vec()).unwrap();
        let sent = writer.write_frame(&mut tx, &frame).unwrap();
        assert_eq!(sent, frame.wire_size());

        let mut reassembler = crate::Reassembler::new(DEFAULT_MAX_PAYLOAD);
        let got = reassembler
            .read_frame(&mut rx, std::time::Duration::from_secs(1))
            .unwrap();
        assert_eq!(got, frame);
    }

    #[test]
    fn transport_failure_surfaces() {
        let mut transport = StreamTransport::new(std::io::Cursor::new([0u8; 4]));
        let mut writer = FrameWriter::new();
        let err = writer.send(&mut transport, &ack(1), b"").unwrap_err();
        assert!(matches!(err, FrameError::Transport(TransportError::Shutdown)));
    }
}
