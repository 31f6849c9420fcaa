use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Subcommand};
use srdp_channel::{Host, RegisterAddress};
use srdp_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD};
use srdp_transport::UdpTransport;

use crate::exit::{transport_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod adapter;
pub mod decode;
pub mod envinfo;
pub mod list;
pub mod read;
pub mod version;
pub mod write;

/// How often a blocked host socket wakes up to check its reply deadline.
const HOST_RECV_SLICE: Duration = Duration::from_millis(20);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a device-side adapter backed by in-memory registers.
    Adapter(AdapterArgs),
    /// Read a register from an adapter.
    Read(ReadArgs),
    /// Write a register on an adapter.
    Write(WriteArgs),
    /// Show an adapter's identity and connected devices.
    List(ListArgs),
    /// Decode one frame given as hex and print its fields.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Adapter(args) => adapter::run(args, format),
        Command::Read(args) => read::run(args, format),
        Command::Write(args) => write::run(args, format),
        Command::List(args) => list::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Envinfo(args) => envinfo::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct AdapterArgs {
    #[command(subcommand)]
    pub transport: AdapterTransport,
}

#[derive(Subcommand, Debug)]
pub enum AdapterTransport {
    /// Serve over UDP.
    Udp(UdpAdapterArgs),
    /// Serve over a serial port.
    #[cfg(feature = "serial")]
    Serial(SerialAdapterArgs),
}

#[derive(Args, Debug)]
pub struct UdpAdapterArgs {
    /// Local address to bind.
    #[arg(env = "SRDP_BIND", default_value = "0.0.0.0:1910")]
    pub bind: SocketAddr,
    /// Send replies and notifications to this host instead of the last sender.
    #[arg(long, env = "SRDP_HOST")]
    pub host: Option<SocketAddr>,
    #[command(flatten)]
    pub channel: ChannelArgs,
}

#[cfg(feature = "serial")]
#[derive(Args, Debug)]
pub struct SerialAdapterArgs {
    /// Serial device path (e.g. /dev/ttyUSB0).
    pub path: String,
    /// Baud rate (8N1).
    #[arg(long, env = "SRDP_SERIAL_BAUD", default_value_t = srdp_transport::serial::DEFAULT_BAUD_RATE)]
    pub baud: u32,
    #[command(flatten)]
    pub channel: ChannelArgs,
}

#[derive(Args, Debug)]
pub struct ChannelArgs {
    /// Seed a register as DEVICE:REGISTER=HEX (repeatable).
    #[arg(long = "register", value_name = "DEV:REG=HEX")]
    pub registers: Vec<String>,
    /// Maximum payload size in octets.
    #[arg(long, env = "SRDP_MAX_PAYLOAD", default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
    /// Adapter UUID served from device 0. Random when omitted.
    #[arg(long, env = "SRDP_UUID")]
    pub uuid: Option<uuid::Uuid>,
    /// Descriptor URI served from device 0.
    #[arg(long, env = "SRDP_DESCRIPTOR_URI", default_value = "")]
    pub descriptor_uri: String,
    /// Hardware version string served from device 0.
    #[arg(long)]
    pub hardware_version: Option<String>,
    /// Answer failed requests with Error frames.
    #[arg(long, env = "SRDP_ERROR_REPLIES")]
    pub error_replies: bool,
    /// Send a change notification after every accepted write.
    #[arg(long)]
    pub notify_writes: bool,
    /// How long one poll waits for data (e.g. 50ms).
    #[arg(long, default_value = "50ms")]
    pub poll_timeout: String,
    /// Exit after dispatching N frames.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Adapter address.
    pub adapter: SocketAddr,
    /// Device index.
    #[arg(long, short = 'd')]
    pub device: u16,
    /// Register index.
    #[arg(long, short = 'r')]
    pub register: u16,
    /// Byte offset into the register value.
    #[arg(long, short = 'p', default_value_t = 0)]
    pub position: u16,
    /// Maximum time to wait for the reply (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub timeout: String,
    /// Maximum payload size in octets.
    #[arg(long, env = "SRDP_MAX_PAYLOAD", default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
}

impl TargetArgs {
    pub fn address(&self) -> RegisterAddress {
        RegisterAddress::new(self.device, self.register).with_window(self.position, 0)
    }

    pub fn connect(&self) -> CliResult<Host<UdpTransport>> {
        connect(self.adapter, &self.timeout, self.max_payload)
    }
}

fn connect(adapter: SocketAddr, timeout: &str, max_payload: usize) -> CliResult<Host<UdpTransport>> {
    let timeout = parse_duration(timeout)?;
    let transport =
        UdpTransport::connect(adapter).map_err(|err| transport_error("connect failed", err))?;
    transport
        .set_read_timeout(Some(HOST_RECV_SLICE))
        .map_err(|err| transport_error("socket setup failed", err))?;

    let config = FrameConfig {
        read_timeout: timeout,
        ..FrameConfig::with_max_payload(max_payload)
    };
    Ok(Host::with_config(transport, config))
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Adapter address.
    pub adapter: SocketAddr,
    /// Maximum time to wait for each reply (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub timeout: String,
    /// Maximum payload size in octets.
    #[arg(long, env = "SRDP_MAX_PAYLOAD", default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
}

impl ListArgs {
    pub fn connect(&self) -> CliResult<Host<UdpTransport>> {
        connect(self.adapter, &self.timeout, self.max_payload)
    }
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Number of octets to read. 0 reads to the end of the value.
    #[arg(long, short = 'l', default_value_t = 0)]
    pub length: u16,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Bytes to write, as hex.
    #[arg(long)]
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex (whitespace allowed).
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Parse hex, ignoring whitespace and an optional `0x` prefix.
pub(crate) fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let compact: String = input.split_whitespace().collect();
    let digits = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
        .unwrap_or(&compact);
    hex::decode(digits).map_err(|err| CliError::usage(format!("invalid hex {input:?}: {err}")))
}

/// Parse a `DEVICE:REGISTER=HEX` register seed.
pub(crate) fn parse_register_seed(input: &str) -> CliResult<(u16, u16, Vec<u8>)> {
    let bad = || CliError::usage(format!("register seed must be DEV:REG=HEX, got {input:?}"));

    let (address, value) = input.split_once('=').ok_or_else(bad)?;
    let (device, register) = address.split_once(':').ok_or_else(bad)?;
    let device: u16 = device.trim().parse().map_err(|_| bad())?;
    let register: u16 = register.trim().parse().map_err(|_| bad())?;
    if device > 0x0FFF {
        return Err(CliError::usage(format!(
            "device index {device} does not fit in 12 bits"
        )));
    }
    Ok((device, register, parse_hex(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn parse_hex_accepts_prefix_and_spaces() {
        assert_eq!(parse_hex("0x0a0B").unwrap(), vec![0x0A, 0x0B]);
        assert_eq!(parse_hex("01 50 2a 00").unwrap(), vec![0x01, 0x50, 0x2A, 0x00]);
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
        assert!(parse_hex("abc").is_err());
    }

    #[test]
    fn register_seed() {
        assert_eq!(
            parse_register_seed("1:5=0001").unwrap(),
            (1, 5, vec![0x00, 0x01])
        );
        assert_eq!(parse_register_seed("2:0=").unwrap(), (2, 0, Vec::new()));
        assert!(parse_register_seed("1=00").is_err());
        assert!(parse_register_seed("x:1=00").is_err());
        assert!(parse_register_seed("4096:1=00").is_err());
    }
}
