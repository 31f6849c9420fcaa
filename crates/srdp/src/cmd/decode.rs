use srdp_frame::{decode_header, Frame, HEADER_LEN};

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{frame_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.hex)?;
    let frame = decode_bytes(&bytes)?;
    print_frame(&frame, format);
    Ok(SUCCESS)
}

fn decode_bytes(bytes: &[u8]) -> CliResult<Frame> {
    let header = decode_header(bytes).map_err(|err| frame_error("decode failed", err))?;

    let declared = usize::from(header.length);
    let available = bytes.len() - HEADER_LEN;
    if available < declared {
        return Err(CliError::new(
            DATA_INVALID,
            format!("decode failed: header declares {declared} payload octets, {available} present"),
        ));
    }
    if available > declared {
        tracing::warn!(
            trailing = available - declared,
            "ignoring octets after the declared payload"
        );
    }

    let payload = bytes[HEADER_LEN..HEADER_LEN + declared].to_vec();
    Frame::new(header, payload).map_err(|err| frame_error("decode failed", err))
}
