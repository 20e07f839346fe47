//! Command dispatch: routes parsed subcommands to their handlers.

mod config_cmd;
mod groups;
mod last;
mod lines;
pub mod util;

use std::io;

use clap::CommandFactory;

use crate::cli::{Cli, Command};
use crate::context::Context;
use crate::error::CliError;

/// Run one command, aborting with [`CliError::Interrupted`] on Ctrl-C.
///
/// Dropping the handler future closes any open control session.
pub async fn run(cmd: Command, ctx: &mut Context) -> Result<(), CliError> {
    tokio::select! {
        result = dispatch(cmd, ctx) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::debug!("interrupted by Ctrl-C");
            Err(CliError::Interrupted)
        }
    }
}

async fn dispatch(cmd: Command, ctx: &mut Context) -> Result<(), CliError> {
    match cmd {
        Command::Config(args) => config_cmd::handle(ctx, args),
        Command::Lines(args) => {
            let ctx = &*ctx;
            let client = ctx.lighting_client()?;
            lines::handle(ctx, &client, || ctx.control_endpoint(), args).await
        }
        Command::Groups(args) => {
            let client = ctx.lighting_client()?;
            groups::handle(ctx, &client, args).await
        }
        Command::Last(args) => last::handle(ctx, &args),
        Command::Completions(args) => {
            print_completions(args.shell);
            Ok(())
        }
    }
}

pub fn print_completions(shell: clap_complete::Shell) {
    clap_complete::generate(shell, &mut Cli::command(), "esc", &mut io::stdout());
}
