//! Config command handlers.

use std::collections::BTreeMap;

use tabled::Tabled;

use esc_config::ConfigKey;
use esc_core::slot;

use crate::cli::{ConfigArgs, ConfigCommand, OutputFormat};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ConfigRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

pub fn handle(ctx: &mut Context, args: ConfigArgs) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::List => list(ctx),

        ConfigCommand::Get { key } => {
            let key = ConfigKey::parse(&key)?;
            output::print_output(ctx.config().get(key), ctx.global().quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let key = ConfigKey::parse(&key)?;
            ctx.config_mut().set(key, &value)?;
            if !ctx.global().quiet {
                eprintln!(
                    "{key} = {value} (saved to {})",
                    ctx.config().path().display()
                );
            }
            Ok(())
        }
    }
}

fn list(ctx: &Context) -> Result<(), CliError> {
    let mut entries: Vec<(String, String)> = ctx
        .config()
        .entries()
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    entries.push((
        "config.path".into(),
        ctx.config().path().display().to_string(),
    ));

    let out = match ctx.output() {
        OutputFormat::Table => {
            let rows: Vec<ConfigRow> = entries
                .into_iter()
                .map(|(key, value)| ConfigRow { key, value })
                .collect();
            tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string()
        }
        OutputFormat::Plain => entries
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("\n"),
        format => {
            let map: BTreeMap<String, String> = entries.into_iter().collect();
            output::render_single(format, &map, |_| String::new(), |_| String::new())?
        }
    };
    ctx.emit(slot::CONFIG_LIST, &out)
}
