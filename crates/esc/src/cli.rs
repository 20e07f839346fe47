//! Clap derive structures for the `esc` CLI.
//!
//! Defines the command tree, global flags, and the per-line parser used by
//! the interactive shell.

use std::path::PathBuf;

use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand, ValueEnum};

use esc_core::{ControlMode, FilterSpec, RelayState, SortKey, slot};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// esc -- console client for the ESC lighting-control backend
#[derive(Debug, Parser)]
#[command(
    name = "esc",
    version,
    about = "Query and control ESC lighting lines from the command line",
    long_about = "Lists, filters and sorts lighting lines and line groups, shows their\n\
        live status, and sends relay and mode commands to the lines you last\n\
        listed.",
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    /// Start an interactive command shell
    #[arg(long, short = 'i')]
    pub interactive: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// One line typed into the interactive shell.
#[derive(Debug, Parser)]
#[command(
    name = "esc",
    no_binary_name = true,
    disable_version_flag = true,
    subcommand_required = true
)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Clone, Args)]
pub struct GlobalOpts {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, env = "ESC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Result cache file (defaults to the platform cache directory)
    #[arg(long, env = "ESC_CACHE_FILE", global = true)]
    pub cache_file: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ESC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "ESC_INSECURE", global = true)]
    pub insecure: bool,

    /// Request and control-reply timeout in seconds
    #[arg(
        long,
        env = "ESC_TIMEOUT",
        default_value = "30",
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    pub timeout: u64,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show or change the client configuration
    Config(ConfigArgs),

    /// Query and control lighting lines
    #[command(name = "ll")]
    Lines(LinesArgs),

    /// Query lighting line groups
    #[command(name = "lg")]
    Groups(GroupsArgs),

    /// Print the output a previous command rendered
    Last(LastArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show every setting and the config file path
    List,

    /// Show one setting
    Get {
        /// Dotted key, e.g. api.url
        key: String,
    },

    /// Change one setting (validated before it is written)
    Set {
        /// Dotted key, e.g. api.url
        key: String,
        value: String,
    },
}

// ── Lines ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LinesArgs {
    #[command(subcommand)]
    pub command: LinesCommand,
}

#[derive(Debug, Subcommand)]
pub enum LinesCommand {
    /// List lines and remember them as the current selection
    List(QueryArgs),

    /// List lines with their relay, mode and parameters
    Status(QueryArgs),

    /// Show one line in detail, by id or unique id prefix
    Show {
        /// Line id or id prefix
        id: String,
    },

    /// Create a line
    Add {
        name: String,

        /// Latitude
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude
        #[arg(long, allow_negative_numbers = true)]
        lng: Option<f64>,
    },

    /// Send a control command to the current selection
    #[command(name = "command")]
    Control(ControlArgs),
}

/// Filtering and ordering shared by `ll list` and `ll status`.
#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    /// Filter as field:value (id and name match substrings, m:t / m:f the maintenance flag)
    #[arg(long, short = 'f')]
    pub filter: Option<FilterSpec>,

    /// Only lines belonging to this group id
    #[arg(long, short = 'g')]
    pub group: Option<i64>,

    /// Sort field: id, name, lat, lng or m
    #[arg(long, short = 's', default_value = "id")]
    pub sort: SortKey,
}

#[derive(Debug, Args)]
pub struct ControlArgs {
    #[command(subcommand)]
    pub command: ControlCommand,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ControlCommand {
    /// Switch the relay of the selected lines
    Relay {
        /// on or off
        state: RelayState,
    },

    /// Set the control mode of the selected lines
    Mode {
        /// auto:sch or manual
        mode: ControlMode,
    },
}

// ── Groups ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GroupsArgs {
    #[command(subcommand)]
    pub command: GroupsCommand,
}

#[derive(Debug, Subcommand)]
pub enum GroupsCommand {
    /// List line groups
    List,
}

// ── Last / Completions ───────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LastArgs {
    /// Which output to show
    #[arg(default_value = slot::LAST, value_parser = PossibleValuesParser::new(slot::RENDERED.iter().copied()))]
    pub slot: String,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
        ShellLine::command().debug_assert();
    }

    #[test]
    fn nested_subcommand_wins_over_parent() {
        let cli = Cli::try_parse_from(["esc", "config", "set", "api.url", "http://h"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigArgs {
                command: ConfigCommand::Set { .. }
            }))
        ));

        let cli = Cli::try_parse_from(["esc", "ll", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Lines(LinesArgs {
                command: LinesCommand::List(_)
            }))
        ));
    }

    #[test]
    fn query_args_parse_into_core_types() {
        let cli = Cli::try_parse_from(["esc", "ll", "list", "-f", "m:t", "-g", "3", "-s", "name"])
            .unwrap();
        let Some(Command::Lines(LinesArgs {
            command: LinesCommand::List(query),
        })) = cli.command
        else {
            panic!("expected ll list");
        };
        assert_eq!(query.filter, Some(FilterSpec::Maintenance(true)));
        assert_eq!(query.group, Some(3));
        assert_eq!(query.sort, SortKey::Name);
    }

    #[test]
    fn bad_filter_is_a_usage_error() {
        let err = Cli::try_parse_from(["esc", "ll", "list", "-f", "m:maybe"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn control_values_are_checked_by_the_parser() {
        let cli = Cli::try_parse_from(["esc", "ll", "command", "relay", "ON"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Lines(LinesArgs {
                command: LinesCommand::Control(ControlArgs {
                    command: ControlCommand::Relay {
                        state: RelayState::On
                    }
                })
            }))
        ));

        assert!(Cli::try_parse_from(["esc", "ll", "command", "relay", "dim"]).is_err());
        assert!(Cli::try_parse_from(["esc", "ll", "command", "mode", "auto:sch"]).is_ok());
        assert!(Cli::try_parse_from(["esc", "ll", "command", "mode", "eco"]).is_err());
    }

    #[test]
    fn shell_line_parses_without_binary_name() {
        let line = ShellLine::try_parse_from(["lg", "list"]).unwrap();
        assert!(matches!(
            line.command,
            Command::Groups(GroupsArgs {
                command: GroupsCommand::List
            })
        ));
    }

    #[test]
    fn last_accepts_known_slots_only() {
        assert!(Cli::try_parse_from(["esc", "last", "ll.status"]).is_ok());
        assert!(Cli::try_parse_from(["esc", "last", "ll.selection"]).is_err());
    }

    #[test]
    fn timeout_must_be_positive() {
        let err = Cli::try_parse_from(["esc", "--timeout", "0", "lg", "list"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let cli = Cli::try_parse_from(["esc", "--timeout", "5", "lg", "list"]).unwrap();
        assert_eq!(cli.global.timeout, 5);
    }
}
