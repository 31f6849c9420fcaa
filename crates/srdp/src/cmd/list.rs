use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use srdp_channel::builtin::{decode_devices, decode_string, index, BUILTIN_DEVICE};
use srdp_channel::{Host, HostError, RegisterAddress};
use srdp_transport::Transport;

use crate::cmd::ListArgs;
use crate::exit::{host_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_raw, OutputFormat};

pub fn run(args: ListArgs, format: OutputFormat) -> CliResult<i32> {
    let mut host = args.connect()?;
    let listing = collect(&mut host)?;
    print_listing(&listing, format);
    Ok(SUCCESS)
}

#[derive(Debug, Serialize)]
struct AdapterListing {
    uuid: String,
    descriptor_uri: String,
    hardware_version: Option<String>,
    software_version: Option<String>,
    devices: Vec<DeviceEntry>,
    #[serde(skip)]
    device_block: Vec<u8>,
}

#[derive(Debug, Serialize)]
struct DeviceEntry {
    device: u16,
    uuid: Option<String>,
    descriptor_uri: Option<String>,
}

fn collect<T: Transport>(host: &mut Host<T>) -> CliResult<AdapterListing> {
    let uuid = read_required(host, BUILTIN_DEVICE, index::UUID)?;
    let descriptor = read_required(host, BUILTIN_DEVICE, index::DESCRIPTOR_URI)?;
    let device_block = read_required(host, BUILTIN_DEVICE, index::DEVICE_LIST)?;

    let descriptor_uri = decode_string(&descriptor)
        .ok_or_else(|| CliError::new(DATA_INVALID, "list failed: malformed descriptor URI"))?;
    let indices = decode_devices(&device_block)
        .ok_or_else(|| CliError::new(DATA_INVALID, "list failed: malformed device list"))?;

    let hardware_version = read_optional(host, BUILTIN_DEVICE, index::HARDWARE_VERSION)?
        .and_then(|value| decode_string(&value));
    let software_version = read_optional(host, BUILTIN_DEVICE, index::SOFTWARE_VERSION)?
        .and_then(|value| decode_string(&value));

    let mut devices = Vec::with_capacity(indices.len());
    for device in indices {
        let uuid = read_optional(host, device, index::UUID)?.map(|value| format_uuid(&value));
        let descriptor_uri = read_optional(host, device, index::DESCRIPTOR_URI)?
            .map(|value| decode_string(&value).unwrap_or_else(|| hex::encode(&value)));
        devices.push(DeviceEntry {
            device,
            uuid,
            descriptor_uri,
        });
    }

    Ok(AdapterListing {
        uuid: format_uuid(&uuid),
        descriptor_uri,
        hardware_version,
        software_version,
        devices,
        device_block,
    })
}

fn read_required<T: Transport>(host: &mut Host<T>, device: u16, register: u16) -> CliResult<Vec<u8>> {
    host.read_register(RegisterAddress::new(device, register))
        .map(|value| value.to_vec())
        .map_err(|err| host_error("list failed", err))
}

/// A rejected or unanswered read leaves the field empty; adapters without
/// error replies drop requests for registers they do not have.
fn read_optional<T: Transport>(
    host: &mut Host<T>,
    device: u16,
    register: u16,
) -> CliResult<Option<Vec<u8>>> {
    match host.read_register(RegisterAddress::new(device, register)) {
        Ok(value) => Ok(Some(value.to_vec())),
        Err(err @ (HostError::Remote { .. } | HostError::Timeout(_))) => {
            tracing::debug!(device, register, error = %err, "register unavailable");
            Ok(None)
        }
        Err(err) => Err(host_error("list failed", err)),
    }
}

fn format_uuid(value: &[u8]) -> String {
    uuid::Uuid::from_slice(value)
        .map(|uuid| uuid.to_string())
        .unwrap_or_else(|_| hex::encode(value))
}

fn print_listing(listing: &AdapterListing, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(listing).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut adapter = Table::new();
            adapter
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (field, value) in adapter_rows(listing) {
                adapter.add_row(vec![field.to_string(), value]);
            }
            println!("{adapter}");

            let mut devices = Table::new();
            devices
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "UUID", "DESCRIPTOR URI"]);
            for entry in &listing.devices {
                devices.add_row(vec![
                    entry.device.to_string(),
                    cell(entry.uuid.as_deref()),
                    cell(entry.descriptor_uri.as_deref()),
                ]);
            }
            println!("{devices}");
        }
        OutputFormat::Pretty => {
            for (field, value) in adapter_rows(listing) {
                println!("{field:<18}: {value}");
            }
            for entry in &listing.devices {
                println!(
                    "  device {:<5} uuid={} uri={}",
                    entry.device,
                    cell(entry.uuid.as_deref()),
                    cell(entry.descriptor_uri.as_deref())
                );
            }
        }
        OutputFormat::Raw => print_raw(&listing.device_block),
    }
}

fn adapter_rows(listing: &AdapterListing) -> [(&'static str, String); 5] {
    [
        ("Adapter UUID", listing.uuid.clone()),
        ("Descriptor URI", cell(Some(listing.descriptor_uri.as_str()))),
        ("Hardware version", cell(listing.hardware_version.as_deref())),
        ("Software version", cell(listing.software_version.as_deref())),
        ("Devices", listing.devices.len().to_string()),
    ]
}

fn cell(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => "-".to_string(),
    }
}
