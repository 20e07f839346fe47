//! Shared helpers for command handlers.

use std::io::IsTerminal;

use esc_core::CoreError;

use crate::context::Context;
use crate::error::CliError;
use crate::output;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to ask on, the command fails instead of guessing.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Unwrap a backend result, printing an unexpected payload instead of
/// failing.
///
/// Returns `None` when the payload was printed; the command then ends
/// successfully.
pub fn or_payload<T>(ctx: &Context, result: Result<T, CoreError>) -> Result<Option<T>, CliError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(CoreError::Backend { payload }) => {
            tracing::debug!("backend returned an unexpected payload");
            output::print_output(&output::render_payload(&payload), ctx.global().quiet);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
