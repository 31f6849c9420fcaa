//! Read the built-in identity registers of an adapter.
//!
//! Run the adapter first (see `udp-adapter`), then:
//!   cargo run --example host-read -- 127.0.0.1:1910

use std::net::SocketAddr;
use std::time::Duration;

use srdp::channel::builtin::index;
use srdp::channel::{Host, RegisterAddress, BUILTIN_DEVICE};
use srdp::transport::UdpTransport;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let adapter: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:1910".to_string())
        .parse()?;

    let transport = UdpTransport::connect(adapter)?;
    transport.set_read_timeout(Some(Duration::from_millis(20)))?;
    let mut host = Host::new(transport);

    let uuid = host.read_register(RegisterAddress::new(BUILTIN_DEVICE, index::UUID))?;
    println!("uuid:        {}", uuid::Uuid::from_slice(&uuid)?);

    let uri = host.read_register(RegisterAddress::new(BUILTIN_DEVICE, index::DESCRIPTOR_URI))?;
    println!("descriptor:  {}", String::from_utf8_lossy(uri.get(2..).unwrap_or_default()));

    let devices = host.read_register(RegisterAddress::new(BUILTIN_DEVICE, index::DEVICE_LIST))?;
    let list: Vec<u16> = devices
        .get(2..)
        .unwrap_or_default()
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    println!("devices:     {list:?}");

    let counter = host.read_register(RegisterAddress::new(1, 1))?;
    println!("counter:     {}", hex_string(&counter));

    for change in host.take_changes() {
        println!(
            "change:      dev={} reg={} seq={}",
            change.header.device, change.header.register, change.header.sequence
        );
    }
    Ok(())
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
