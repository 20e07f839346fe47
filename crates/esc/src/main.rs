mod cli;
mod commands;
mod context;
mod error;
mod output;
mod shell;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::context::Context;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // stderr keeps stdout clean for piping rendered output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match (cli.command, cli.interactive) {
        // Needs neither config nor cache
        (Some(Command::Completions(args)), _) => {
            commands::print_completions(args.shell);
            Ok(())
        }

        (Some(cmd), _) => {
            let mut ctx = Context::new(cli.global)?;
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::run(cmd, &mut ctx).await
        }

        (None, true) => {
            let mut ctx = Context::new(cli.global)?;
            shell::run(&mut ctx).await
        }

        (None, false) => Cli::command()
            .error(
                clap::error::ErrorKind::MissingSubcommand,
                "a command or --interactive is required",
            )
            .exit(),
    }
}
