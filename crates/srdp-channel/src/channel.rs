use srdp_frame::{
    FrameError, FrameHeader, FrameType, FrameWriter, Operation, Reassembler, HEADER_LEN,
};
use srdp_transport::Transport;
use tracing::{debug, warn};

use crate::config::ChannelConfig;
use crate::dispatch::Dispatcher;
use crate::error::{ChannelError, Result};
use crate::registers::RegisterAccess;
use crate::sequence::SequenceNumbers;
use crate::stats::ChannelStats;

/// Device side of one SRDP host connection.
///
/// A channel owns its transport, its register collaborator, one inbound
/// buffer and one outbound buffer. It never spawns threads or blocks beyond
/// what the transport does: the caller drives it by calling
/// [`poll`](Self::poll) repeatedly and [`notify`](Self::notify) when a
/// register value changes.
pub struct Channel<T: Transport, R: RegisterAccess> {
    transport: T,
    registers: R,
    config: ChannelConfig,
    reassembler: Reassembler,
    writer: FrameWriter,
    payload: Box<[u8]>,
    sequence: SequenceNumbers,
    stats: ChannelStats,
}

impl<T: Transport, R: RegisterAccess> Channel<T, R> {
    /// Create a channel with zeroed counters and sequence numbers.
    pub fn new(transport: T, registers: R, config: ChannelConfig) -> Self {
        let frame_config = config.frame_config();
        Self {
            reassembler: Reassembler::with_config(&frame_config),
            payload: vec![0u8; frame_config.max_payload_size].into_boxed_slice(),
            writer: FrameWriter::with_config(frame_config),
            transport,
            registers,
            config,
            sequence: SequenceNumbers::new(),
            stats: ChannelStats::default(),
        }
    }

    /// Run one receive-and-dispatch cycle.
    ///
    /// Reads whatever the transport has, then handles every complete frame
    /// buffered so far, transmitting replies as they are decided. Frames
    /// left behind by an earlier failed reply are handled even when no new
    /// bytes arrive. Returns the number of frames dispatched.
    ///
    /// On a transport that preserves datagram boundaries, bytes left over
    /// after the last complete frame are discarded and counted as malformed.
    pub fn poll(&mut self) -> Result<usize> {
        let got = self.reassembler.fill(&mut self.transport)?;
        if got == 0 && self.reassembler.buffered() < HEADER_LEN {
            return Ok(0);
        }
        if got > 0 {
            self.stats.record_poll();
        }

        let Self {
            transport,
            registers,
            config,
            reassembler,
            writer,
            payload,
            sequence,
            stats,
        } = self;

        let mut dispatched = 0usize;
        let outcome = reassembler.drain(|header: &FrameHeader, body: &[u8]| -> Result<()> {
            dispatched += 1;
            stats.record_received(header.frame_len());
            if header.frame_type == FrameType::Request {
                sequence.observe(header.sequence);
            }

            let reply = Dispatcher {
                registers: &mut *registers,
                driver: &config.driver,
                stats: &mut *stats,
                error_replies: config.error_replies,
            }
            .dispatch(header, body, payload);

            if let Some(reply) = reply {
                let reply_header = reply.header(sequence.reply());
                let sent = writer.send(&mut *transport, &reply_header, &payload[..reply.payload_len])?;
                stats.record_sent(sent);
                debug!(
                    frame_type = reply_header.frame_type.name(),
                    operation = reply_header.operation.name(),
                    sequence = reply_header.sequence,
                    len = reply.payload_len,
                    "reply sent"
                );
            }
            Ok(())
        });

        match outcome {
            Ok(_) => {
                if transport.preserves_boundaries() && reassembler.buffered() > 0 {
                    stats.record_malformed();
                    warn!(
                        discarded = reassembler.buffered(),
                        transport = transport.name(),
                        "dropped trailing bytes after last frame"
                    );
                    reassembler.reset();
                }
                Ok(dispatched)
            }
            Err(ChannelError::Frame(FrameError::PayloadTooLarge { size, max })) => {
                stats.record_malformed();
                warn!(size, max, "dropped malformed frame");
                Ok(dispatched)
            }
            Err(err) => Err(err),
        }
    }

    /// Send a change notification for a register value.
    ///
    /// Returns the outbound sequence number used, which the host echoes in
    /// its acknowledgement.
    pub fn notify(&mut self, device: u16, register: u16, position: u16, value: &[u8]) -> Result<u16> {
        let max = self.config.max_payload_size;
        if value.len() > max {
            return Err(FrameError::PayloadTooLarge {
                size: value.len(),
                max,
            }
            .into());
        }

        let sequence = self.sequence.next_outbound();
        let header = FrameHeader::new(
            FrameType::Request,
            Operation::Change,
            device,
            register,
            position,
            value.len() as u16,
            sequence,
        );
        let sent = self.writer.send(&mut self.transport, &header, value)?;
        self.stats.record_sent(sent);
        self.stats.record_change_sent();
        debug!(device, register, position, sequence, len = value.len(), "change notified");
        Ok(sequence)
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    pub fn sequence(&self) -> &SequenceNumbers {
        &self.sequence
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn registers(&self) -> &R {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.registers
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Bytes received but not yet framed.
    pub fn buffered(&self) -> usize {
        self.reassembler.buffered()
    }

    /// Give back the transport and register collaborator.
    pub fn into_parts(self) -> (T, R) {
        (self.transport, self.registers)
    }
}

impl<T: Transport, R: RegisterAccess> std::fmt::Debug for Channel<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("transport", &self.transport.name())
            .field("config", &self.config)
            .field("sequence", &self.sequence)
            .field("stats", &self.stats)
            .field("buffered", &self.reassembler.buffered())
            .finish()
    }
}
