use srdp_frame::Operation;

use crate::cmd::ReadArgs;
use crate::exit::{host_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: ReadArgs, format: OutputFormat) -> CliResult<i32> {
    let mut host = args.target.connect()?;
    let addr = args
        .target
        .address()
        .with_window(args.target.position, args.length);

    let reply = host
        .request(Operation::Read, addr, &[])
        .map_err(|err| host_error("read failed", err))?;

    tracing::debug!(
        device = addr.device,
        register = addr.register,
        octets = reply.payload.len(),
        "register read"
    );
    print_frame(&reply, format);
    Ok(SUCCESS)
}
