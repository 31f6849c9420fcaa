use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use srdp_channel::{
    Channel, ChannelConfig, ChannelStats, DriverInfo, MemoryRegisters, RegisterAccess,
    RegisterAddress, RegisterError,
};
use srdp_transport::{Transport, UdpTransport};

use crate::cmd::{parse_duration, parse_register_seed, AdapterArgs, AdapterTransport, ChannelArgs};
use crate::exit::{channel_error, transport_error, CliError, CliResult, SUCCESS};
use crate::output::{print_stats, OutputFormat};

/// In-memory registers that remember accepted writes until the adapter
/// turns them into change notifications.
struct WatchedRegisters {
    inner: MemoryRegisters,
    record_writes: bool,
    written: Vec<(RegisterAddress, Vec<u8>)>,
}

impl RegisterAccess for WatchedRegisters {
    fn read(&mut self, addr: RegisterAddress, out: &mut [u8]) -> Result<usize, RegisterError> {
        self.inner.read(addr, out)
    }

    fn write(&mut self, addr: RegisterAddress, data: &[u8]) -> Result<usize, RegisterError> {
        let accepted = self.inner.write(addr, data)?;
        if self.record_writes {
            self.written.push((addr, data.to_vec()));
        }
        Ok(accepted)
    }
}

pub fn run(args: AdapterArgs, format: OutputFormat) -> CliResult<i32> {
    match args.transport {
        AdapterTransport::Udp(udp) => {
            let poll_timeout = parse_duration(&udp.channel.poll_timeout)?;
            let mut transport =
                UdpTransport::bind(udp.bind).map_err(|err| transport_error("bind failed", err))?;
            if let Some(host) = udp.host {
                transport = transport.with_host(host);
            }
            transport
                .set_read_timeout(Some(poll_timeout))
                .map_err(|err| transport_error("socket setup failed", err))?;
            tracing::info!(local_addr = %transport.local_addr(), host = ?udp.host, "udp adapter ready");
            serve(transport, &udp.channel, format)
        }
        #[cfg(feature = "serial")]
        AdapterTransport::Serial(serial) => {
            let poll_timeout = parse_duration(&serial.channel.poll_timeout)?;
            let transport = srdp_transport::serial::open(&serial.path, serial.baud, poll_timeout)
                .map_err(|err| transport_error("open failed", err))?;
            tracing::info!(path = %serial.path, baud = serial.baud, "serial adapter ready");
            serve(transport, &serial.channel, format)
        }
    }
}

fn serve<T: Transport>(transport: T, args: &ChannelArgs, format: OutputFormat) -> CliResult<i32> {
    let (registers, config) = build_channel(args)?;
    let mut channel = Channel::new(transport, registers, config);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut dispatched = 0u64;
    while running.load(Ordering::SeqCst) {
        let frames = channel
            .poll()
            .map_err(|err| channel_error("poll failed", err))?;
        dispatched = dispatched.saturating_add(frames as u64);

        let written = std::mem::take(&mut channel.registers_mut().written);
        for (addr, value) in written {
            channel
                .notify(addr.device, addr.register, addr.position, &value)
                .map_err(|err| channel_error("notify failed", err))?;
        }

        if args.count.is_some_and(|count| dispatched >= count) {
            break;
        }
    }

    let stats: ChannelStats = *channel.stats();
    tracing::info!(
        received = stats.received_frames,
        sent = stats.sent_frames,
        malformed = stats.malformed_frames,
        "adapter stopped"
    );
    print_stats(&stats, format);
    Ok(SUCCESS)
}

fn build_channel(args: &ChannelArgs) -> CliResult<(WatchedRegisters, ChannelConfig)> {
    let mut registers = MemoryRegisters::new();
    for seed in &args.registers {
        let (device, register, value) = parse_register_seed(seed)?;
        if value.len() > args.max_payload {
            return Err(CliError::usage(format!(
                "register {device}:{register} value is {} octets, larger than the {}-octet payload limit",
                value.len(),
                args.max_payload
            )));
        }
        registers.insert(device, register, value);
    }

    let driver = DriverInfo {
        uuid: args.uuid.unwrap_or_else(uuid::Uuid::new_v4),
        descriptor_uri: args.descriptor_uri.clone(),
        hardware_version: args.hardware_version.clone(),
        devices: registers.devices(),
        ..DriverInfo::default()
    };
    tracing::debug!(uuid = %driver.uuid, devices = ?driver.devices, registers = registers.len(), "register bank seeded");

    let config = ChannelConfig::default()
        .with_max_payload(args.max_payload)
        .with_error_replies(args.error_replies)
        .with_driver(driver);

    let registers = WatchedRegisters {
        inner: registers,
        record_writes: args.notify_writes,
        written: Vec::new(),
    };
    Ok((registers, config))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
