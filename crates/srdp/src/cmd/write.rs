use srdp_frame::Operation;

use crate::cmd::{parse_hex, WriteArgs};
use crate::exit::{host_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: WriteArgs, format: OutputFormat) -> CliResult<i32> {
    let data = parse_hex(&args.hex)?;
    if data.len() > args.target.max_payload {
        return Err(CliError::new(
            DATA_INVALID,
            format!(
                "value is {} octets, larger than the {}-octet payload limit",
                data.len(),
                args.target.max_payload
            ),
        ));
    }

    let mut host = args.target.connect()?;
    let reply = host
        .request(Operation::Write, args.target.address(), &data)
        .map_err(|err| host_error("write failed", err))?;

    for change in host.take_changes() {
        tracing::info!(
            device = change.header.device,
            register = change.header.register,
            sequence = change.header.sequence,
            "change notification received"
        );
    }

    print_frame(&reply, format);
    Ok(SUCCESS)
}
