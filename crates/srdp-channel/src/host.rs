use std::collections::VecDeque;
use std::time::{Duration, Instant};

use bytes::Bytes;
use srdp_frame::{
    Frame, FrameConfig, FrameError, FrameHeader, FrameType, FrameWriter, Operation, Reassembler,
    RegisterError,
};
use srdp_transport::Transport;
use tracing::{debug, trace, warn};

use crate::error::{HostError, HostResult};
use crate::registers::RegisterAddress;
use crate::stats::ChannelStats;

/// Host side of an SRDP link.
///
/// Requests are synchronous: each one takes a fresh sequence number and waits
/// for the Ack or Error frame that echoes it. Change notifications that
/// arrive meanwhile are acknowledged immediately and queued for
/// [`take_changes`](Self::take_changes).
pub struct Host<T: Transport> {
    transport: T,
    reassembler: Reassembler,
    writer: FrameWriter,
    timeout: Duration,
    sequence: u16,
    changes: VecDeque<Frame>,
    stats: ChannelStats,
}

impl<T: Transport> Host<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, FrameConfig::default())
    }

    pub fn with_config(transport: T, config: FrameConfig) -> Self {
        Self {
            transport,
            reassembler: Reassembler::with_config(&config),
            timeout: config.read_timeout,
            writer: FrameWriter::with_config(config),
            sequence: 0,
            changes: VecDeque::new(),
            stats: ChannelStats::default(),
        }
    }

    /// Read a register window. `addr.length == 0` asks for the whole value.
    pub fn read_register(&mut self, addr: RegisterAddress) -> HostResult<Bytes> {
        let reply = self.request(Operation::Read, addr, &[])?;
        Ok(reply.payload)
    }

    /// Write `data` at `addr.position`.
    pub fn write_register(&mut self, addr: RegisterAddress, data: &[u8]) -> HostResult<()> {
        self.request(Operation::Write, addr, data)?;
        Ok(())
    }

    /// Send one request and wait for its reply.
    ///
    /// A read with an empty `payload` is sent with `addr.length` zero octets
    /// so that the header `len` names the requested window.
    pub fn request(
        &mut self,
        operation: Operation,
        addr: RegisterAddress,
        payload: &[u8],
    ) -> HostResult<Frame> {
        let window;
        let payload = if operation == Operation::Read && payload.is_empty() {
            window = vec![0u8; usize::from(addr.length)];
            window.as_slice()
        } else {
            payload
        };

        self.sequence = self.sequence.wrapping_add(1);
        let sequence = self.sequence;
        let header = FrameHeader::new(
            FrameType::Request,
            operation,
            addr.device,
            addr.register,
            addr.position,
            payload.len() as u16,
            sequence,
        );

        let sent = self.writer.send(&mut self.transport, &header, payload)?;
        self.stats.record_sent(sent);
        debug!(
            operation = operation.name(),
            device = addr.device,
            register = addr.register,
            sequence,
            "request sent"
        );

        self.await_reply(sequence)
    }

    fn await_reply(&mut self, sequence: u16) -> HostResult<Frame> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(HostError::Timeout(self.timeout));
            }

            let frame = match self.reassembler.read_frame(&mut self.transport, remaining) {
                Ok(frame) => frame,
                Err(FrameError::Timeout(_)) => return Err(HostError::Timeout(self.timeout)),
                Err(FrameError::PayloadTooLarge { size, max }) => {
                    self.record_malformed(size, max);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            self.stats.record_received(frame.wire_size());

            match (frame.header.frame_type, frame.header.operation) {
                (FrameType::Request, Operation::Change) => self.accept_change(frame)?,
                (FrameType::Ack, _) if frame.header.sequence == sequence => return Ok(frame),
                (FrameType::Error, _) if frame.header.sequence == sequence => {
                    let code = RegisterError::code_from_payload(&frame.payload)
                        .unwrap_or(RegisterError::NotImplemented.code());
                    return Err(HostError::Remote { code });
                }
                _ => trace!(
                    frame_type = frame.header.frame_type.name(),
                    sequence = frame.header.sequence,
                    expected = sequence,
                    "ignoring unmatched frame"
                ),
            }
        }
    }

    fn accept_change(&mut self, frame: Frame) -> HostResult<()> {
        let header = &frame.header;
        let ack = FrameHeader::new(
            FrameType::Ack,
            Operation::Change,
            header.device,
            header.register,
            header.position,
            0,
            header.sequence,
        );
        let sent = self.writer.send(&mut self.transport, &ack, &[])?;
        self.stats.record_sent(sent);
        self.stats.record_change_ack();
        debug!(
            device = header.device,
            register = header.register,
            sequence = header.sequence,
            "change acknowledged"
        );
        self.changes.push_back(frame);
        Ok(())
    }

    fn record_malformed(&mut self, size: usize, max: usize) {
        self.stats.record_malformed();
        warn!(size, max, "dropped malformed frame from adapter");
    }

    /// Wait up to `timeout` for the next change notification.
    ///
    /// Returns a queued change first if there is one. Replies to earlier
    /// requests that arrive late are discarded.
    pub fn next_change(&mut self, timeout: Duration) -> HostResult<Option<Frame>> {
        if let Some(frame) = self.changes.pop_front() {
            return Ok(Some(frame));
        }

        let frame = match self.reassembler.read_frame(&mut self.transport, timeout) {
            Ok(frame) => frame,
            Err(FrameError::Timeout(_)) => return Ok(None),
            Err(FrameError::PayloadTooLarge { size, max }) => {
                self.record_malformed(size, max);
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        self.stats.record_received(frame.wire_size());

        if frame.header.frame_type == FrameType::Request
            && frame.header.operation == Operation::Change
        {
            self.accept_change(frame)?;
            return Ok(self.changes.pop_front());
        }
        trace!(
            frame_type = frame.header.frame_type.name(),
            sequence = frame.header.sequence,
            "ignoring frame while waiting for a change"
        );
        Ok(None)
    }

    /// Drain the change notifications received so far.
    pub fn take_changes(&mut self) -> Vec<Frame> {
        self.changes.drain(..).collect()
    }

    /// Sequence number of the most recent request.
    pub fn last_sequence(&self) -> u16 {
        self.sequence
    }

    /// Traffic seen by this host. Change acks count notifications acknowledged.
    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}
