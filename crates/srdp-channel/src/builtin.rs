//! Read-only registers that device 0 serves on behalf of the adapter itself.

use srdp_frame::{RegisterError, PROTOCOL_VERSION};
use uuid::Uuid;

use crate::registers::{copy_window, RegisterAddress};
use crate::stats::{ChannelStats, CHANGE_BLOCK_LEN, WIRE_BLOCK_LEN};

/// Device index reserved for the adapter.
pub const BUILTIN_DEVICE: u16 = 0;

/// Built-in register indices on [`BUILTIN_DEVICE`].
pub mod index {
    pub const UUID: u16 = 1;
    pub const DESCRIPTOR_URI: u16 = 2;
    pub const HARDWARE_VERSION: u16 = 3;
    pub const SOFTWARE_VERSION: u16 = 4;
    pub const DEVICE_LIST: u16 = 5;
    pub const CHANGE_STATS: u16 = 6;
    pub const WIRE_STATS: u16 = 7;
}

/// Identity the adapter reports through its built-in registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverInfo {
    pub uuid: Uuid,
    pub descriptor_uri: String,
    pub hardware_version: Option<String>,
    pub software_version: Option<String>,
    /// Indices of the devices behind this adapter.
    pub devices: Vec<u16>,
}

impl Default for DriverInfo {
    fn default() -> Self {
        Self {
            uuid: Uuid::nil(),
            descriptor_uri: String::new(),
            hardware_version: None,
            software_version: Some(format!(
                "srdp-rs {} (protocol {PROTOCOL_VERSION})",
                env!("CARGO_PKG_VERSION")
            )),
            devices: Vec::new(),
        }
    }
}

/// Whether `(device, register)` names a built-in register.
pub fn is_builtin(device: u16, register: u16) -> bool {
    device == BUILTIN_DEVICE && (index::UUID..=index::WIRE_STATS).contains(&register)
}

/// Serve a read of a built-in register into `out`.
///
/// Callers check [`is_builtin`] first; any other register reads as
/// [`RegisterError::NoSuchRegister`].
pub fn read(
    info: &DriverInfo,
    stats: &ChannelStats,
    addr: RegisterAddress,
    out: &mut [u8],
) -> Result<usize, RegisterError> {
    let value = match addr.register {
        index::UUID => info.uuid.as_bytes().to_vec(),
        index::DESCRIPTOR_URI => encode_string(&info.descriptor_uri)?,
        index::HARDWARE_VERSION => optional_string(info.hardware_version.as_deref())?,
        index::SOFTWARE_VERSION => optional_string(info.software_version.as_deref())?,
        index::DEVICE_LIST => encode_devices(&info.devices)?,
        index::CHANGE_STATS => {
            let block: [u8; CHANGE_BLOCK_LEN] = stats.change_block();
            block.to_vec()
        }
        index::WIRE_STATS => {
            let block: [u8; WIRE_BLOCK_LEN] = stats.wire_block();
            block.to_vec()
        }
        _ => return Err(RegisterError::NoSuchRegister),
    };
    copy_window(&value, addr.position, addr.length, out)
}

fn optional_string(value: Option<&str>) -> Result<Vec<u8>, RegisterError> {
    value
        .map(encode_string)
        .unwrap_or(Err(RegisterError::NoSuchRegister))
}

// u16 little-endian length prefix, then the UTF-8 bytes.
fn encode_string(value: &str) -> Result<Vec<u8>, RegisterError> {
    let len = u16::try_from(value.len()).map_err(|_| RegisterError::InvalidPositionOrLength)?;
    let mut out = Vec::with_capacity(2 + value.len());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(value.as_bytes());
    Ok(out)
}

fn encode_devices(devices: &[u16]) -> Result<Vec<u8>, RegisterError> {
    let count = u16::try_from(devices.len()).map_err(|_| RegisterError::InvalidPositionOrLength)?;
    let mut out = Vec::with_capacity(2 + 2 * devices.len());
    out.extend_from_slice(&count.to_le_bytes());
    for device in devices {
        out.extend_from_slice(&device.to_le_bytes());
    }
    Ok(out)
}

/// Decode a length-prefixed string register value as read by a host.
///
/// Returns `None` if the prefix overruns the value or the text is not UTF-8.
pub fn decode_string(value: &[u8]) -> Option<String> {
    let (len, rest) = value.split_first_chunk::<2>()?;
    let text = rest.get(..usize::from(u16::from_le_bytes(*len)))?;
    String::from_utf8(text.to_vec()).ok()
}

/// Decode the device-list register value as read by a host.
pub fn decode_devices(value: &[u8]) -> Option<Vec<u16>> {
    let (count, rest) = value.split_first_chunk::<2>()?;
    let list = rest.get(..2 * usize::from(u16::from_le_bytes(*count)))?;
    Some(
        list.chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> DriverInfo {
        DriverInfo {
            uuid: Uuid::from_bytes([0xAB; 16]),
            descriptor_uri: "srdp://demo".to_string(),
            hardware_version: None,
            software_version: Some("1.2".to_string()),
            devices: vec![1, 7],
        }
    }

    fn read_all(register: u16) -> Result<Vec<u8>, RegisterError> {
        let mut out = [0u8; 64];
        let n = read(
            &info(),
            &ChannelStats::default(),
            RegisterAddress::new(BUILTIN_DEVICE, register),
            &mut out,
        )?;
        Ok(out[..n].to_vec())
    }

    #[test]
    fn host_side_decoders_invert_builtin_encoding() {
        let uri = read_all(index::DESCRIPTOR_URI).unwrap();
        assert_eq!(decode_string(&uri).as_deref(), Some("srdp://demo"));
        let devices = read_all(index::DEVICE_LIST).unwrap();
        assert_eq!(decode_devices(&devices), Some(vec![1, 7]));
    }

    #[test]
    fn host_side_decoders_reject_short_values() {
        assert_eq!(decode_string(&[5, 0, b'a']), None);
        assert_eq!(decode_string(&[0xFF]), None);
        assert_eq!(decode_devices(&[2, 0, 1, 0]), None);
        assert_eq!(decode_devices(&[0, 0]), Some(Vec::new()));
    }

    #[test]
    fn builtin_range() {
        assert!(is_builtin(0, index::UUID));
        assert!(is_builtin(0, index::WIRE_STATS));
        assert!(!is_builtin(0, 0));
        assert!(!is_builtin(0, 8));
        assert!(!is_builtin(1, index::UUID));
    }

    #[test]
    fn uuid_is_raw_bytes() {
        assert_eq!(read_all(index::UUID).unwrap(), vec![0xAB; 16]);
    }

    #[test]
    fn strings_are_length_prefixed() {
        assert_eq!(
            read_all(index::DESCRIPTOR_URI).unwrap(),
            b"\x0b\x00srdp://demo".to_vec()
        );
        assert_eq!(
            read_all(index::SOFTWARE_VERSION).unwrap(),
            b"\x03\x001.2".to_vec()
        );
    }

    #[test]
    fn missing_hardware_version() {
        assert_eq!(
            read_all(index::HARDWARE_VERSION),
            Err(RegisterError::NoSuchRegister)
        );
    }

    #[test]
    fn device_list() {
        assert_eq!(
            read_all(index::DEVICE_LIST).unwrap(),
            vec![2, 0, 1, 0, 7, 0]
        );
    }

    #[test]
    fn stats_blocks() {
        assert_eq!(read_all(index::CHANGE_STATS).unwrap().len(), 12);
        assert_eq!(read_all(index::WIRE_STATS).unwrap().len(), 24);
    }

    #[test]
    fn windowed_read() {
        let mut out = [0u8; 8];
        let addr = RegisterAddress::new(0, index::DESCRIPTOR_URI).with_window(2, 4);
        let n = read(&info(), &ChannelStats::default(), addr, &mut out).unwrap();
        assert_eq!(&out[..n], b"srdp");

        let addr = RegisterAddress::new(0, index::UUID).with_window(17, 0);
        assert_eq!(
            read(&info(), &ChannelStats::default(), addr, &mut out),
            Err(RegisterError::InvalidPositionOrLength)
        );
    }

    #[test]
    fn default_reports_protocol_version() {
        let info = DriverInfo::default();
        assert!(info.uuid.is_nil());
        assert!(info
            .software_version
            .as_deref()
            .is_some_and(|v| v.ends_with("(protocol 1)")));
    }
}
