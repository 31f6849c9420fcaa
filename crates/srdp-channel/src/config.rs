use srdp_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD, MAX_PAYLOAD_LIMIT};

use crate::builtin::DriverInfo;

/// Configuration for a device-side [`Channel`](crate::Channel).
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Largest payload accepted or sent, in octets. Capped at
    /// [`MAX_PAYLOAD_LIMIT`].
    pub max_payload_size: usize,
    /// Answer failed requests with Error frames instead of dropping them.
    pub error_replies: bool,
    /// Identity served through the device-0 built-in registers.
    pub driver: DriverInfo,
}

impl ChannelConfig {
    pub fn with_max_payload(mut self, max_payload_size: usize) -> Self {
        self.max_payload_size = max_payload_size.min(MAX_PAYLOAD_LIMIT);
        self
    }

    pub fn with_error_replies(mut self, enabled: bool) -> Self {
        self.error_replies = enabled;
        self
    }

    pub fn with_driver(mut self, driver: DriverInfo) -> Self {
        self.driver = driver;
        self
    }

    /// Frame-layer view of this configuration.
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig::with_max_payload(self.max_payload_size)
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            error_replies: false,
            driver: DriverInfo::default(),
        }
    }
}
