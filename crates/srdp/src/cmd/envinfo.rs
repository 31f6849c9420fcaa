use std::collections::BTreeMap;

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use srdp_frame::{DEFAULT_MAX_PAYLOAD, HEADER_LEN, MAX_PAYLOAD_LIMIT, PROTOCOL_VERSION};
use srdp_transport::SRDP_UDP_PORT;

use crate::cmd::EnvinfoArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

/// Environment variables the CLI reads.
const ENV_VARS: [&str; 9] = [
    "SRDP_BIND",
    "SRDP_HOST",
    "SRDP_MAX_PAYLOAD",
    "SRDP_UUID",
    "SRDP_DESCRIPTOR_URI",
    "SRDP_ERROR_REPLIES",
    "SRDP_SERIAL_BAUD",
    "SRDP_LOG_LEVEL",
    "RUST_LOG",
];

#[derive(Serialize)]
struct ProtocolInfo {
    version: u8,
    header_len: usize,
    default_max_payload: usize,
    max_payload_limit: usize,
    udp_port: u16,
}

#[derive(Serialize)]
struct EnvInfoOutput {
    version: String,
    target: String,
    platform: String,
    features: Vec<&'static str>,
    protocol: ProtocolInfo,
    environment: BTreeMap<&'static str, Option<String>>,
}

pub fn run(_args: EnvinfoArgs, format: OutputFormat) -> CliResult<i32> {
    let output = EnvInfoOutput {
        version: env!("CARGO_PKG_VERSION").to_string(),
        target: option_env!("SRDP_BUILD_TARGET")
            .unwrap_or("unknown")
            .to_string(),
        platform: format!("{} ({})", std::env::consts::OS, std::env::consts::ARCH),
        features: active_features(),
        protocol: ProtocolInfo {
            version: PROTOCOL_VERSION,
            header_len: HEADER_LEN,
            default_max_payload: DEFAULT_MAX_PAYLOAD,
            max_payload_limit: MAX_PAYLOAD_LIMIT,
            udp_port: SRDP_UDP_PORT,
        },
        environment: ENV_VARS
            .iter()
            .map(|name| (*name, std::env::var(name).ok()))
            .collect(),
    };

    print_envinfo(&output, format);
    Ok(SUCCESS)
}

fn print_envinfo(output: &EnvInfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KEY", "VALUE"]);
            for (key, value) in rows(output) {
                table.add_row(vec![key, value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (key, value) in rows(output) {
                println!("{key:<22} {value}");
            }
        }
        OutputFormat::Raw => println!("{}", output.version),
    }
}

fn rows(output: &EnvInfoOutput) -> Vec<(String, String)> {
    let mut rows = vec![
        ("version".to_string(), output.version.clone()),
        ("target".to_string(), output.target.clone()),
        ("platform".to_string(), output.platform.clone()),
        ("features".to_string(), output.features.join(", ")),
        (
            "protocol".to_string(),
            format!(
                "v{} header={} payload={} (limit {}) udp/{}",
                output.protocol.version,
                output.protocol.header_len,
                output.protocol.default_max_payload,
                output.protocol.max_payload_limit,
                output.protocol.udp_port
            ),
        ),
    ];
    for (name, value) in &output.environment {
        rows.push((
            name.to_string(),
            value.clone().unwrap_or_else(|| "(not set)".to_string()),
        ));
    }
    rows
}

fn active_features() -> Vec<&'static str> {
    let mut features = vec!["cli"];
    if cfg!(feature = "serial") {
        features.push("serial");
    }
    features
}
