//! `esc last`: replay cached output without touching the backend.

use crate::cli::LastArgs;
use crate::context::Context;
use crate::error::CliError;
use crate::output;

pub fn handle(ctx: &Context, args: &LastArgs) -> Result<(), CliError> {
    let rendered = ctx
        .cache()
        .get::<String>(&args.slot)
        .ok_or_else(|| CliError::NothingCached {
            slot: args.slot.clone(),
        })?;
    output::print_output(&rendered, ctx.global().quiet);
    Ok(())
}
