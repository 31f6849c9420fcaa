//! Minimal UDP adapter: one device with a counter register that changes
//! every second and is pushed to the host as a change notification.
//!
//! Run with:
//!   cargo run --example udp-adapter
//!
//! In another terminal:
//!   cargo run --features cli -- read 127.0.0.1:1910 --device 1 --register 1

use std::time::{Duration, Instant};

use srdp::channel::{Channel, ChannelConfig, DriverInfo, MemoryRegisters};
use srdp::transport::{UdpTransport, SRDP_UDP_PORT};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let transport = UdpTransport::bind(([127, 0, 0, 1], SRDP_UDP_PORT).into())?;
    transport.set_read_timeout(Some(Duration::from_millis(50)))?;
    eprintln!("Listening on {}", transport.local_addr());

    let mut registers = MemoryRegisters::new();
    registers.insert(1, 1, 0u32.to_le_bytes().to_vec());
    registers.insert(1, 2, b"demo counter".to_vec());

    let config = ChannelConfig::default()
        .with_error_replies(true)
        .with_driver(DriverInfo {
            descriptor_uri: "srdp://demo/counter".to_string(),
            devices: registers.devices(),
            ..DriverInfo::default()
        });
    let mut channel = Channel::new(transport, registers, config);

    let mut counter = 0u32;
    let mut next_tick = Instant::now() + Duration::from_secs(1);
    loop {
        let frames = channel.poll()?;
        if frames > 0 {
            eprintln!("Dispatched {frames} frame(s)");
        }

        if Instant::now() >= next_tick {
            next_tick += Duration::from_secs(1);
            counter = counter.wrapping_add(1);
            let value = counter.to_le_bytes();
            channel.registers_mut().insert(1, 1, value.to_vec());

            // No host has spoken yet: nowhere to send the notification.
            if channel.transport().peer().is_some() {
                let seq = channel.notify(1, 1, 0, &value)?;
                eprintln!("Notified counter={counter} seq={seq}");
            }
        }
    }
}
