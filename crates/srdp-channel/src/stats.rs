use serde::Serialize;

/// Traffic counters for one channel.
///
/// Counters only grow (frame counts wrap at `u32::MAX`). Octet counts are
/// the wire size of each frame, header included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    pub sent_frames: u32,
    pub received_frames: u32,
    pub sent_octets: u64,
    pub received_octets: u64,
    /// Change notifications sent.
    pub sent_changes: u32,
    /// Change notifications acknowledged by the host.
    pub change_acks: u32,
    /// Change notifications rejected by the host.
    pub change_errors: u32,
    /// Poll cycles that received at least one byte.
    pub polls: u64,
    /// Frames discarded because their header could not be framed.
    pub malformed_frames: u32,
}

/// Encoded size of [`ChannelStats::change_block`].
pub const CHANGE_BLOCK_LEN: usize = 12;

/// Encoded size of [`ChannelStats::wire_block`].
pub const WIRE_BLOCK_LEN: usize = 24;

impl ChannelStats {
    pub(crate) fn record_sent(&mut self, octets: usize) {
        self.sent_frames = self.sent_frames.wrapping_add(1);
        self.sent_octets = self.sent_octets.saturating_add(octets as u64);
    }

    pub(crate) fn record_received(&mut self, octets: usize) {
        self.received_frames = self.received_frames.wrapping_add(1);
        self.received_octets = self.received_octets.saturating_add(octets as u64);
    }

    pub(crate) fn record_change_sent(&mut self) {
        self.sent_changes = self.sent_changes.wrapping_add(1);
    }

    pub(crate) fn record_change_ack(&mut self) {
        self.change_acks = self.change_acks.wrapping_add(1);
    }

    pub(crate) fn record_change_error(&mut self) {
        self.change_errors = self.change_errors.wrapping_add(1);
    }

    pub(crate) fn record_poll(&mut self) {
        self.polls = self.polls.saturating_add(1);
    }

    pub(crate) fn record_malformed(&mut self) {
        self.malformed_frames = self.malformed_frames.wrapping_add(1);
    }

    /// Change-notification counters as served by the built-in statistics
    /// register: sent, acknowledged and rejected, each a little-endian `u32`.
    pub fn change_block(&self) -> [u8; CHANGE_BLOCK_LEN] {
        let mut out = [0u8; CHANGE_BLOCK_LEN];
        out[0..4].copy_from_slice(&self.sent_changes.to_le_bytes());
        out[4..8].copy_from_slice(&self.change_acks.to_le_bytes());
        out[8..12].copy_from_slice(&self.change_errors.to_le_bytes());
        out
    }

    /// Wire counters: frames sent and received (`u32`), then octets sent
    /// and received (`u64`), little-endian.
    pub fn wire_block(&self) -> [u8; WIRE_BLOCK_LEN] {
        let mut out = [0u8; WIRE_BLOCK_LEN];
        out[0..4].copy_from_slice(&self.sent_frames.to_le_bytes());
        out[4..8].copy_from_slice(&self.received_frames.to_le_bytes());
        out[8..16].copy_from_slice(&self.sent_octets.to_le_bytes());
        out[16..24].copy_from_slice(&self.received_octets.to_le_bytes());
        out
    }
}
