//! Serial-port transport (feature `serial`).

use std::time::Duration;

use tracing::info;

use crate::error::{Result, TransportError};
use crate::traits::StreamTransport;

/// Default baud rate of the reference adapters.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// A serial port driven as an SRDP byte stream.
pub type SerialTransport = StreamTransport<Box<dyn serialport::SerialPort>>;

/// Open `path` at `baud_rate` (8N1, no flow control).
///
/// `timeout` bounds each read; an expired read is reported as "no data".
pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<SerialTransport> {
    let port = serialport::new(path, baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(timeout)
        .open()
        .map_err(|source| TransportError::Serial {
            path: path.to_string(),
            source,
        })?;

    info!(path, baud_rate, "opened serial port");
    Ok(StreamTransport::with_name(port, "serial"))
}
