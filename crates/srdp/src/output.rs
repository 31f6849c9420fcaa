use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use srdp_channel::ChannelStats;
use srdp_frame::{Frame, FrameType, RegisterError};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    frame_type: &'a str,
    operation: &'a str,
    device: u16,
    register: u16,
    position: u16,
    length: u16,
    sequence: u16,
    payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorOutput>,
}

#[derive(Serialize)]
struct ErrorOutput {
    code: i32,
    message: String,
}

impl<'a> FrameOutput<'a> {
    fn from_frame(frame: &'a Frame) -> Self {
        let header = &frame.header;
        Self {
            frame_type: header.frame_type.name(),
            operation: header.operation.name(),
            device: header.device,
            register: header.register,
            position: header.position,
            length: header.length,
            sequence: header.sequence,
            payload: hex::encode(&frame.payload),
            error: error_detail(frame),
        }
    }
}

fn error_detail(frame: &Frame) -> Option<ErrorOutput> {
    if frame.header.frame_type != FrameType::Error {
        return None;
    }
    let code = RegisterError::code_from_payload(&frame.payload)?;
    let message = RegisterError::from_code(code)
        .map(|err| err.to_string())
        .unwrap_or_else(|| "unknown error".to_string());
    Some(ErrorOutput { code, message })
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    let out = FrameOutput::from_frame(frame);
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "TYPE", "OP", "DEVICE", "REGISTER", "POS", "LEN", "SEQ", "PAYLOAD",
                ])
                .add_row(vec![
                    out.frame_type.to_string(),
                    out.operation.to_string(),
                    out.device.to_string(),
                    out.register.to_string(),
                    out.position.to_string(),
                    out.length.to_string(),
                    out.sequence.to_string(),
                    payload_cell(&out),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} {} dev={} reg={} pos={} len={} seq={} payload={}",
                out.frame_type,
                out.operation,
                out.device,
                out.register,
                out.position,
                out.length,
                out.sequence,
                payload_cell(&out)
            );
        }
        OutputFormat::Raw => {
            print_raw(frame.payload.as_ref());
        }
    }
}

fn payload_cell(out: &FrameOutput<'_>) -> String {
    match &out.error {
        Some(err) => format!("{} ({})", err.message, err.code),
        None if out.payload.is_empty() => "-".to_string(),
        None => out.payload.clone(),
    }
}

pub fn print_stats(stats: &ChannelStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(stats).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COUNTER", "VALUE"]);
            for (name, value) in stat_rows(stats) {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line: Vec<String> = stat_rows(stats)
                .into_iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            println!("{}", line.join(" "));
        }
        OutputFormat::Raw => {
            print_raw(&stats.change_block());
            print_raw(&stats.wire_block());
        }
    }
}

fn stat_rows(stats: &ChannelStats) -> [(&'static str, u64); 9] {
    [
        ("sent_frames", u64::from(stats.sent_frames)),
        ("received_frames", u64::from(stats.received_frames)),
        ("sent_octets", stats.sent_octets),
        ("received_octets", stats.received_octets),
        ("sent_changes", u64::from(stats.sent_changes)),
        ("change_acks", u64::from(stats.change_acks)),
        ("change_errors", u64::from(stats.change_errors)),
        ("polls", stats.polls),
        ("malformed_frames", u64::from(stats.malformed_frames)),
    ]
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use srdp_frame::{FrameHeader, Operation};

    use super::*;

    #[test]
    fn frame_output_hex_encodes_payload() {
        let header = FrameHeader::new(FrameType::Ack, Operation::Read, 1, 5, 0, 2, 42);
        let frame = Frame::new(header, vec![0x00, 0x01]).unwrap();
        let json = serde_json::to_value(FrameOutput::from_frame(&frame)).unwrap();
        assert_eq!(json["frame_type"], "ACK");
        assert_eq!(json["operation"], "READ");
        assert_eq!(json["sequence"], 42);
        assert_eq!(json["payload"], "0001");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn error_frames_carry_decoded_code() {
        let header = FrameHeader::new(FrameType::Error, Operation::Write, 1, 5, 0, 4, 7);
        let frame = Frame::new(header, RegisterError::NoSuchRegister.to_payload().to_vec()).unwrap();
        let out = FrameOutput::from_frame(&frame);
        let err = out.error.as_ref().unwrap();
        assert_eq!(err.code, -3);
        assert_eq!(err.message, "no such register");
        assert_eq!(payload_cell(&out), "no such register (-3)");
    }

    #[test]
    fn stat_rows_cover_every_counter() {
        let stats = ChannelStats {
            sent_octets: 99,
            ..ChannelStats::default()
        };
        let rows = stat_rows(&stats);
        assert_eq!(rows.len(), 9);
        assert!(rows.contains(&("sent_octets", 99)));
    }
}
