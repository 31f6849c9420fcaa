use std::time::{Duration, Instant};

use bytes::Bytes;
use srdp_transport::Transport;
use tracing::{trace, warn};

use crate::codec::{decode_header, peek_length, Frame, FrameConfig, FrameHeader, HEADER_LEN};
use crate::error::{FrameError, Result};

/// Rebuilds complete frames out of arbitrary transport reads.
///
/// Reads may deliver part of a frame, exactly one frame, or one frame plus
/// the start of the next. The buffer is allocated once at
/// `HEADER_LEN + max_payload` and leftover bytes are shifted to the front
/// after each frame is handed out.
pub struct Reassembler {
    buf: Box<[u8]>,
    received: usize,
    max_payload: usize,
}

impl Reassembler {
    /// Create a reassembler for frames of up to `max_payload` payload bytes.
    pub fn new(max_payload: usize) -> Self {
        let config = FrameConfig::with_max_payload(max_payload);
        Self::with_config(&config)
    }

    /// Create a reassembler from a frame configuration.
    pub fn with_config(config: &FrameConfig) -> Self {
        let max_payload = config.max_payload_size;
        Self {
            buf: vec![0u8; HEADER_LEN + max_payload].into_boxed_slice(),
            received: 0,
            max_payload,
        }
    }

    /// Number of bytes buffered toward the next frame.
    pub fn buffered(&self) -> usize {
        self.received
    }

    /// Size of the receive buffer (one maximum-size frame).
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Largest payload this reassembler accepts.
    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Discard everything buffered.
    pub fn reset(&mut self) {
        self.received = 0;
    }

    /// Pull bytes from `transport` into the free tail of the buffer.
    ///
    /// Returns the number of bytes obtained; `0` means nothing arrived this
    /// cycle.
    pub fn fill<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<usize> {
        if self.received >= self.buf.len() {
            return Ok(0);
        }
        let got = transport.recv(&mut self.buf[self.received..])?;
        let got = got.min(self.buf.len() - self.received);
        self.received += got;
        if got > 0 {
            trace!(got, buffered = self.received, "bytes received");
        }
        Ok(got)
    }

    /// Hand every complete buffered frame to `on_frame`, in arrival order.
    ///
    /// Returns the number of frames handed out. A frame is consumed from the
    /// buffer even if `on_frame` fails; the error is returned and any frames
    /// behind it stay buffered for the next call.
    ///
    /// A header that declares more payload than the limit cannot be framed:
    /// the buffer is discarded and [`FrameError::PayloadTooLarge`] returned.
    pub fn drain<F, E>(&mut self, mut on_frame: F) -> std::result::Result<usize, E>
    where
        F: FnMut(&FrameHeader, &[u8]) -> std::result::Result<(), E>,
        E: From<FrameError>,
    {
        let mut count = 0usize;
        while let Some(total) = self.complete_frame_len()? {
            let header = decode_header(&self.buf[..HEADER_LEN])?;
            let outcome = on_frame(&header, &self.buf[HEADER_LEN..total]);
            self.consume(total);
            count += 1;
            outcome?;
        }
        Ok(count)
    }

    /// Block until one complete frame is available, or `timeout` passes.
    ///
    /// Host-side convenience; the device side polls with [`fill`](Self::fill)
    /// and [`drain`](Self::drain).
    pub fn read_frame<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        timeout: Duration,
    ) -> Result<Frame> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(total) = self.complete_frame_len()? {
                let header = decode_header(&self.buf[..HEADER_LEN])?;
                let payload = Bytes::copy_from_slice(&self.buf[HEADER_LEN..total]);
                self.consume(total);
                return Ok(Frame { header, payload });
            }

            if self.fill(transport)? == 0 {
                if Instant::now() >= deadline {
                    return Err(FrameError::Timeout(timeout));
                }
                std::thread::yield_now();
            }
        }
    }

    fn complete_frame_len(&mut self) -> Result<Option<usize>> {
        if self.received < HEADER_LEN {
            return Ok(None);
        }

        let declared = usize::from(peek_length(&self.buf[..HEADER_LEN]).unwrap_or_default());
        if declared > self.max_payload {
            warn!(
                declared,
                max = self.max_payload,
                discarded = self.received,
                "malformed frame header, discarding buffered bytes"
            );
            self.received = 0;
            return Err(FrameError::PayloadTooLarge {
                size: declared,
                max: self.max_payload,
            });
        }

        let total = HEADER_LEN + declared;
        if self.received < total {
            return Ok(None);
        }
        Ok(Some(total))
    }

    fn consume(&mut self, total: usize) {
        let rest = self.received - total;
        if rest > 0 {
            self.buf.copy_within(total..self.received, 0);
        }
        self.received = rest;
    }
}

impl std::fmt::Debug for Reassembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reassembler")
            .field("capacity", &self.buf.len())
            .field("received", &self.received)
            .field("max_payload", &self.max_payload)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use bytes::BytesMut;
    use srdp_transport::TransportError;

    use super::*;
    use crate::codec::{encode_frame, DEFAULT_MAX_PAYLOAD};
    use crate::types::{FrameType, Operation};

    /// Delivers one scripted chunk per `recv`, then reports no data.
    struct ScriptedTransport {
        chunks: VecDeque<Vec<u8>>,
    }

    impl ScriptedTransport {
        fn new(chunks: Vec<Vec<u8>>) -> Self {
            Self {
                chunks: chunks.into(),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn recv(&mut self, buf: &mut [u8]) -> srdp_transport::Result<usize> {
            let Some(mut chunk) = self.chunks.pop_front() else {
                return Ok(0);
            };
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                self.chunks.push_front(chunk.split_off(n));
            }
            Ok(n)
        }

        fn send(&mut self, data: &[u8]) -> srdp_transport::Result<usize> {
            Ok(data.len())
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    struct FailingTransport;

    impl Transport for FailingTransport {
        fn recv(&mut self, _buf: &mut [u8]) -> srdp_transport::Result<usize> {
            Err(TransportError::Shutdown)
        }

        fn send(&mut self, _data: &[u8]) -> srdp_transport::Result<usize> {
            Err(TransportError::Shutdown)
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn wire(sequence: u16, payload: &[u8]) -> Vec<u8> {
        let header = FrameHeader::new(FrameType::Request, Operation::Write, 1, 7, 0, 0, sequence);
        let mut buf = BytesMut::new();
        encode_frame(&header, payload, &mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        buf.to_vec()
    }

    fn collect(reassembler: &mut Reassembler) -> Vec<(u16, Vec<u8>)> {
        let mut out = Vec::new();
        reassembler
            .drain(|header, payload| -> Result<()> {
                out.push((header.sequence, payload.to_vec()));
                Ok(())
            })
            .unwrap();
        out
    }

    #[test]
    fn single_frame_in_one_read() {
        let mut transport = ScriptedTransport::new(vec![wire(1, b"abc")]);
        let mut reassembler = Reassembler::new(DEFAULT_MAX_PAYLOAD);

        assert_eq!(reassembler.fill(&mut transport).unwrap(), HEADER_LEN + 3);
        assert_eq!(collect(&mut reassembler), vec![(1, b"abc".to_vec())]);
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn header_split_across_reads() {
        let bytes = wire(2, b"xy");
        let mut transport =
            ScriptedTransport::new(vec![bytes[..5].to_vec(), bytes[5..].to_vec()]);
        let mut reassembler = Reassembler::new(DEFAULT_MAX_PAYLOAD);

        reassembler.fill(&mut transport).unwrap();
        assert!(collect(&mut reassembler).is_empty());
        assert_eq!(reassembler.buffered(), 5);

        reassembler.fill(&mut transport).unwrap();
        assert_eq!(collect(&mut reassembler), vec![(2, b"xy".to_vec())]);
    }

    #[test]
    fn payload_split_across_reads() {
        let bytes = wire(3, b"payload");
        let mut transport = ScriptedTransport::new(vec![
            bytes[..HEADER_LEN + 1].to_vec(),
            bytes[HEADER_LEN + 1..].to_vec(),
        ]);
        let mut reassembler = Reassembler::new(DEFAULT_MAX_PAYLOAD);

        reassembler.fill(&mut transport).unwrap();
        assert!(collect(&mut reassembler).is_empty());

        reassembler.fill(&mut transport).unwrap();
        assert_eq!(collect(&mut reassembler), vec![(3, b"payload".to_vec())]);
    }

    #[test]
    fn two_frames_in_one_read_leave_nothing_behind() {
        let mut both = wire(10, b"one");
        both.extend(wire(11, b""));
        let mut transport = ScriptedTransport::new(vec![both]);
        let mut reassembler = Reassembler::new(DEFAULT_MAX_PAYLOAD);

        reassembler.fill(&mut transport).unwrap();
        assert_eq!(
            collect(&mut reassembler),
            vec![(10, b"one".to_vec()), (11, Vec::new())]
        );
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn leftover_bytes_carry_into_next_cycle() {
        let first = wire(20, b"aa");
        let second = wire(21, b"bbbb");
        let mut chunk = first.clone();
        chunk.extend_from_slice(&second[..4]);
        let mut transport = ScriptedTransport::new(vec![chunk, second[4..].to_vec()]);
        let mut reassembler = Reassembler::new(DEFAULT_MAX_PAYLOAD);

        reassembler.fill(&mut transport).unwrap();
        assert_eq!(collect(&mut reassembler), vec![(20, b"aa".to_vec())]);
        assert_eq!(reassembler.buffered(), 4);

        reassembler.fill(&mut transport).unwrap();
        assert_eq!(collect(&mut reassembler), vec![(21, b"bbbb".to_vec())]);
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn fill_never_reads_past_one_frame() {
        let mut big = Vec::new();
        for seq in 0..4 {
            big.extend(wire(seq, b"0123456789"));
        }
        let mut transport = ScriptedTransport::new(vec![big]);
        let mut reassembler = Reassembler::new(10);
        assert_eq!(reassembler.capacity(), HEADER_LEN + 10);

        let mut seen = Vec::new();
        for _ in 0..4 {
            reassembler.fill(&mut transport).unwrap();
            seen.extend(collect(&mut reassembler).into_iter().map(|(s, _)| s));
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn oversized_declared_length_discards_buffer() {
        let header = FrameHeader::new(FrameType::Request, Operation::Write, 1, 1, 0, 1000, 9);
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(b"junk");
        let mut transport = ScriptedTransport::new(vec![bytes, wire(5, b"ok")]);
        let mut reassembler = Reassembler::new(DEFAULT_MAX_PAYLOAD);

        reassembler.fill(&mut transport).unwrap();
        let err = reassembler
            .drain(|_, _| -> Result<()> { Ok(()) })
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 1000, .. }));
        assert_eq!(reassembler.buffered(), 0);

        reassembler.fill(&mut transport).unwrap();
        assert_eq!(collect(&mut reassembler), vec![(5, b"ok".to_vec())]);
    }

    #[test]
    fn handler_error_consumes_frame_and_keeps_the_rest() {
        let mut both = wire(1, b"a");
        both.extend(wire(2, b"b"));
        let mut transport = ScriptedTransport::new(vec![both]);
        let mut reassembler = Reassembler::new(DEFAULT_MAX_PAYLOAD);

        reassembler.fill(&mut transport).unwrap();
        let err = reassembler
            .drain(|_, _| -> Result<()> { Err(FrameError::Timeout(Duration::ZERO)) })
            .unwrap_err();
        assert!(matches!(err, FrameError::Timeout(_)));
        assert_eq!(collect(&mut reassembler), vec![(2, b"b".to_vec())]);
    }

    #[test]
    fn no_data_is_not_an_error() {
        let mut transport = ScriptedTransport::new(Vec::new());
        let mut reassembler = Reassembler::new(DEFAULT_MAX_PAYLOAD);
        assert_eq!(reassembler.fill(&mut transport).unwrap(), 0);
        assert!(collect(&mut reassembler).is_empty());
    }

    #[test]
    fn transport_error_propagates() {
        let mut reassembler = Reassembler::new(DEFAULT_MAX_PAYLOAD);
        let err = reassembler.fill(&mut FailingTransport).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Transport(TransportError::Shutdown)
        ));
    }

    #[test]
    fn read_frame_collects_byte_by_byte() {
        let bytes = wire(77, b"slow");
        let chunks = bytes.iter().map(|b| vec![*b]).collect();
        let mut transport = ScriptedTransport::new(chunks);
        let mut reassembler = Reassembler::new(DEFAULT_MAX_PAYLOAD);

        let frame = reassembler
            .read_frame(&mut transport, Duration::from_secs(1))
            .unwrap();
        assert_eq!(frame.header.sequence, 77);
        assert_eq!(frame.payload.as_ref(), b"slow");
    }

    #[test]
    fn read_frame_times_out() {
        let mut transport = ScriptedTransport::new(Vec::new());
        let mut reassembler = Reassembler::new(DEFAULT_MAX_PAYLOAD);
        let err = reassembler
            .read_frame(&mut transport, Duration::from_millis(5))
            .unwrap_err();
        assert!(matches!(err, FrameError::Timeout(_)));
    }

    #[test]
    fn reset_discards_partial_frame() {
        let bytes = wire(1, b"abc");
        let mut transport = ScriptedTransport::new(vec![bytes[..6].to_vec()]);
        let mut reassembler = Reassembler::new(DEFAULT_MAX_PAYLOAD);
        reassembler.fill(&mut transport).unwrap();
        assert_eq!(reassembler.buffered(), 6);
        reassembler.reset();
        assert_eq!(reassembler.buffered(), 0);
    }
}
