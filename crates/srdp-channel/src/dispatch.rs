use srdp_frame::{FrameHeader, FrameType, Operation, RegisterError};
use tracing::{debug, warn};

use crate::builtin::{self, DriverInfo};
use crate::registers::{RegisterAccess, RegisterAddress};
use crate::stats::ChannelStats;

/// A reply decided by the dispatcher.
///
/// The payload has already been written to the front of the outbound payload
/// buffer; `payload_len` says how much of it belongs to this reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub frame_type: FrameType,
    pub operation: Operation,
    pub device: u16,
    pub register: u16,
    pub position: u16,
    pub payload_len: usize,
}

impl Reply {
    fn to(request: &FrameHeader, frame_type: FrameType, payload_len: usize) -> Self {
        Self {
            frame_type,
            operation: request.operation,
            device: request.device,
            register: request.register,
            position: request.position,
            payload_len,
        }
    }

    /// Header for transmitting this reply under `sequence`.
    pub fn header(&self, sequence: u16) -> FrameHeader {
        FrameHeader::new(
            self.frame_type,
            self.operation,
            self.device,
            self.register,
            self.position,
            self.payload_len as u16,
            sequence,
        )
    }
}

/// Decides how a channel answers one inbound frame.
///
/// Borrowed per frame from the channel's parts; holds no state of its own.
pub struct Dispatcher<'a, R: RegisterAccess + ?Sized> {
    pub registers: &'a mut R,
    pub driver: &'a DriverInfo,
    pub stats: &'a mut ChannelStats,
    pub error_replies: bool,
}

impl<R: RegisterAccess + ?Sized> Dispatcher<'_, R> {
    /// Handle one frame, writing any reply payload into `out`.
    ///
    /// Returns `None` when nothing is to be sent back.
    pub fn dispatch(&mut self, header: &FrameHeader, payload: &[u8], out: &mut [u8]) -> Option<Reply> {
        debug!(
            frame_type = header.frame_type.name(),
            operation = header.operation.name(),
            device = header.device,
            register = header.register,
            position = header.position,
            sequence = header.sequence,
            len = payload.len(),
            "dispatching frame"
        );

        match (header.frame_type, header.operation) {
            (FrameType::Request, Operation::Read) => self.read(header, out),
            (FrameType::Request, Operation::Write) => self.write(header, payload, out),
            (FrameType::Request, op) => {
                debug!(operation = op.name(), "unsupported request from host");
                self.reject(header, RegisterError::InvalidOperation, out)
            }
            (FrameType::Ack, Operation::Change) => {
                self.stats.record_change_ack();
                None
            }
            (FrameType::Error, Operation::Change) => {
                self.stats.record_change_error();
                debug!(
                    sequence = header.sequence,
                    code = RegisterError::code_from_payload(payload),
                    "host rejected change notification"
                );
                None
            }
            (frame_type, op) => {
                debug!(
                    frame_type = frame_type.name(),
                    operation = op.name(),
                    "ignoring frame"
                );
                None
            }
        }
    }

    fn read(&mut self, header: &FrameHeader, out: &mut [u8]) -> Option<Reply> {
        let addr = RegisterAddress::from_header(header);
        let result = if builtin::is_builtin(addr.device, addr.register) {
            builtin::read(self.driver, self.stats, addr, out)
        } else {
            self.registers.read(addr, out)
        };

        match result {
            Ok(n) => Some(Reply::to(header, FrameType::Ack, n.min(out.len()))),
            Err(err) => self.reject(header, err, out),
        }
    }

    fn write(&mut self, header: &FrameHeader, payload: &[u8], out: &mut [u8]) -> Option<Reply> {
        let addr = RegisterAddress::from_header(header);
        let result = if builtin::is_builtin(addr.device, addr.register) {
            Err(RegisterError::InvalidOperation)
        } else {
            self.registers.write(addr, payload)
        };

        match result {
            Ok(_) => Some(Reply::to(header, FrameType::Ack, 0)),
            Err(err) => self.reject(header, err, out),
        }
    }

    fn reject(&mut self, header: &FrameHeader, err: RegisterError, out: &mut [u8]) -> Option<Reply> {
        warn!(
            operation = header.operation.name(),
            device = header.device,
            register = header.register,
            code = err.code(),
            error = %err,
            "register access failed"
        );
        if !self.error_replies {
            return None;
        }

        let encoded = err.to_payload();
        match out.get_mut(..encoded.len()) {
            Some(dst) => {
                dst.copy_from_slice(&encoded);
                Some(Reply::to(header, FrameType::Error, encoded.len()))
            }
            None => {
                warn!(max = out.len(), "payload limit too small for an error reply, dropping");
                None
            }
        }
    }
}
