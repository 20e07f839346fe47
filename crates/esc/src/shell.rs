//! Interactive shell (`esc -i`).
//!
//! Each line is split like a POSIX shell would and parsed as one `esc`
//! command. Global flags given on the process command line apply to every
//! line; errors are printed and the loop keeps going.

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

use crate::cli::ShellLine;
use crate::commands;
use crate::context::Context;
use crate::error::CliError;

const PROMPT: &str = "esc> ";

pub async fn run(ctx: &mut Context) -> Result<(), CliError> {
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut editor: Editor<(), DefaultHistory> = Editor::with_config(config)
        .map_err(|e| CliError::Io(std::io::Error::other(e.to_string())))?;

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                eprintln!("(type exit or press Ctrl-D to leave)");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(CliError::Io(std::io::Error::other(e.to_string()))),
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_exit(line) {
            break;
        }

        let Some(words) = tokenize(line) else {
            eprintln!("error: unbalanced quotes");
            continue;
        };
        let parsed = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };

        tracing::debug!(command = ?parsed.command, "shell command");
        if let Err(err) = commands::run(parsed.command, ctx).await {
            eprintln!("{:?}", miette::Report::new(err));
        }
    }

    Ok(())
}

fn is_exit(line: &str) -> bool {
    matches!(line, "exit" | "quit" | "\\q")
}

fn tokenize(line: &str) -> Option<Vec<String>> {
    shlex::split(line)
}
