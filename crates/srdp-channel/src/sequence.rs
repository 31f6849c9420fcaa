/// Per-channel sequence numbers.
///
/// Replies echo the last sequence number seen on a host request. Notifications
/// draw from an independent outbound counter that wraps at `u16::MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceNumbers {
    inbound: u16,
    outbound: u16,
}

impl SequenceNumbers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the sequence number of a request from the host.
    pub fn observe(&mut self, sequence: u16) {
        self.inbound = sequence;
    }

    /// Sequence number for a reply to the most recent request.
    pub fn reply(&self) -> u16 {
        self.inbound
    }

    /// Advance and return the outbound sequence. The first call yields 1.
    pub fn next_outbound(&mut self) -> u16 {
        self.outbound = self.outbound.wrapping_add(1);
        self.outbound
    }

    /// Last observed inbound sequence number.
    pub fn inbound(&self) -> u16 {
        self.inbound
    }

    /// Last outbound sequence number used.
    pub fn outbound(&self) -> u16 {
        self.outbound
    }
}
