use std::collections::VecDeque;

use srdp_channel::builtin::index;
use srdp_channel::{
    Channel, ChannelConfig, DriverInfo, MemoryRegisters, RegisterAccess, RegisterAddress,
    RegisterError,
};
use srdp_frame::{decode_header, FrameHeader, FrameType, Operation, HEADER_LEN};
use srdp_transport::Transport;

#[derive(Default)]
struct Loopback {
    inbound: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
}

impl Transport for Loopback {
    fn recv(&mut self, buf: &mut [u8]) -> srdp_transport::Result<usize> {
        let Some(mut chunk) = self.inbound.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.inbound.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    fn send(&mut self, data: &[u8]) -> srdp_transport::Result<usize> {
        self.sent.push(data.to_vec());
        Ok(data.len())
    }

    fn name(&self) -> &'static str {
        "loopback"
    }
}

fn encoded(mut header: FrameHeader, payload: &[u8]) -> Vec<u8> {
    header.length = payload.len() as u16;
    let mut bytes = header.to_bytes().to_vec();
    bytes.extend_from_slice(payload);
    bytes
}

/// Register collaborator that answers device 1 register 5 with two fixed octets.
struct FixedValue;

impl RegisterAccess for FixedValue {
    fn read(&mut self, addr: RegisterAddress, out: &mut [u8]) -> Result<usize, RegisterError> {
        if (addr.device, addr.register) != (1, 5) {
            return Err(RegisterError::NoSuchRegister);
        }
        out[..2].copy_from_slice(&[0x00, 0x01]);
        Ok(2)
    }
}

#[test]
fn read_request_scenario() {
    let mut channel = Channel::new(Loopback::default(), FixedValue, ChannelConfig::default());
    let request = FrameHeader::new(FrameType::Request, Operation::Read, 1, 5, 0, 0, 42);
    channel.transport_mut().inbound.push_back(encoded(request, &[]));

    assert_eq!(channel.poll().unwrap(), 1);

    let sent = &channel.transport().sent;
    assert_eq!(sent.len(), 1);
    let reply = decode_header(&sent[0]).unwrap();
    assert_eq!(
        reply,
        FrameHeader::new(FrameType::Ack, Operation::Read, 1, 5, 0, 2, 42)
    );
    assert_eq!(&sent[0][HEADER_LEN..], &[0x00, 0x01]);
}

#[test]
fn change_statistics_register_scenario() {
    let mut channel = Channel::new(Loopback::default(), (), ChannelConfig::default());

    for value in 0..3u8 {
        channel.notify(1, 5, 0, &[value]).unwrap();
    }
    let ack1 = FrameHeader::new(FrameType::Ack, Operation::Change, 1, 5, 0, 0, 1);
    let ack2 = FrameHeader::new(FrameType::Ack, Operation::Change, 1, 5, 0, 0, 2);
    let err3 = FrameHeader::new(FrameType::Error, Operation::Change, 1, 5, 0, 0, 3);
    let mut bytes = encoded(ack1, &[]);
    bytes.extend(encoded(ack2, &[]));
    bytes.extend(encoded(err3, &RegisterError::InvalidOperation.to_payload()));
    channel.transport_mut().inbound.push_back(bytes);
    assert_eq!(channel.poll().unwrap(), 3);

    let read = FrameHeader::new(FrameType::Request, Operation::Read, 0, index::CHANGE_STATS, 0, 0, 10);
    channel.transport_mut().inbound.push_back(encoded(read, &[]));
    assert_eq!(channel.poll().unwrap(), 1);

    let reply = channel.transport().sent.last().unwrap();
    let header = decode_header(reply).unwrap();
    assert_eq!(header.frame_type, FrameType::Ack);
    assert_eq!(header.sequence, 10);
    assert_eq!(header.length, 12);
    assert_eq!(
        &reply[HEADER_LEN..],
        &[3, 0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0]
    );
}

#[test]
fn builtin_identity_registers() {
    let driver = DriverInfo {
        uuid: uuid::Uuid::from_bytes([7; 16]),
        descriptor_uri: "eds://thermo".to_string(),
        hardware_version: Some("rev-b".to_string()),
        software_version: None,
        devices: vec![1, 2],
    };
    let config = ChannelConfig::default().with_driver(driver);
    let mut channel = Channel::new(Loopback::default(), MemoryRegisters::new(), config);

    let reads = [
        index::UUID,
        index::DESCRIPTOR_URI,
        index::HARDWARE_VERSION,
        index::DEVICE_LIST,
    ];
    for (seq, register) in reads.iter().enumerate() {
        let req = FrameHeader::new(FrameType::Request, Operation::Read, 0, *register, 0, 0, seq as u16);
        channel.transport_mut().inbound.push_back(encoded(req, &[]));
        channel.poll().unwrap();
    }

    let payloads: Vec<&[u8]> = channel
        .transport()
        .sent
        .iter()
        .map(|frame| &frame[HEADER_LEN..])
        .collect();
    assert_eq!(payloads[0], &[7u8; 16]);
    assert_eq!(payloads[1], b"\x0c\x00eds://thermo");
    assert_eq!(payloads[2], b"\x05\x00rev-b");
    assert_eq!(payloads[3], &[2, 0, 1, 0, 2, 0]);
}

#[test]
fn error_replies_carry_code_and_echo_sequence() {
    let config = ChannelConfig::default().with_error_replies(true);
    let mut channel = Channel::new(Loopback::default(), MemoryRegisters::new(), config);

    let read = FrameHeader::new(FrameType::Request, Operation::Read, 0, index::SOFTWARE_VERSION + 100, 0, 0, 55);
    let write = FrameHeader::new(FrameType::Request, Operation::Write, 0, index::UUID, 0, 0, 56);
    let mut bytes = encoded(read, &[]);
    bytes.extend(encoded(write, &[1, 2, 3]));
    channel.transport_mut().inbound.push_back(bytes);
    assert_eq!(channel.poll().unwrap(), 2);

    let sent = &channel.transport().sent;
    let first = decode_header(&sent[0]).unwrap();
    assert_eq!(first.frame_type, FrameType::Error);
    assert_eq!(first.sequence, 55);
    assert_eq!(
        RegisterError::code_from_payload(&sent[0][HEADER_LEN..]),
        Some(RegisterError::NoSuchDevice.code())
    );

    let second = decode_header(&sent[1]).unwrap();
    assert_eq!(second.frame_type, FrameType::Error);
    assert_eq!(second.operation, Operation::Write);
    assert_eq!(second.sequence, 56);
    assert_eq!(
        RegisterError::code_from_payload(&sent[1][HEADER_LEN..]),
        Some(RegisterError::InvalidOperation.code())
    );
}

#[test]
fn wire_statistics_count_every_frame() {
    let mut registers = MemoryRegisters::new();
    registers.insert(1, 1, vec![1, 2, 3, 4]);
    let mut channel = Channel::new(Loopback::default(), registers, ChannelConfig::default());

    let read = FrameHeader::new(FrameType::Request, Operation::Read, 1, 1, 1, 0, 1);
    channel.transport_mut().inbound.push_back(encoded(read, &[]));
    channel.poll().unwrap();
    channel.notify(1, 1, 0, &[9, 9]).unwrap();

    let stats = *channel.stats();
    assert_eq!(stats.received_frames, 1);
    assert_eq!(stats.received_octets, 12);
    assert_eq!(stats.sent_frames, 2);
    assert_eq!(stats.sent_octets, (12 + 3) + (12 + 2));

    let read = FrameHeader::new(FrameType::Request, Operation::Read, 0, index::WIRE_STATS, 0, 0, 2);
    channel.transport_mut().inbound.push_back(encoded(read, &[]));
    channel.poll().unwrap();

    // The block is captured before this reply is counted.
    let reply = channel.transport().sent.last().unwrap();
    let block = &reply[HEADER_LEN..];
    assert_eq!(block.len(), 24);
    assert_eq!(&block[0..4], &2u32.to_le_bytes());
    assert_eq!(&block[4..8], &2u32.to_le_bytes());
    assert_eq!(&block[8..16], &29u64.to_le_bytes());
    assert_eq!(&block[16..24], &24u64.to_le_bytes());
}
