#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error};
use potluck_core::config::{CliOverrides, EnvOverrides, resolve_config};
use potluck_core::error::ErrorCode;
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "potluck: plan events that live inside their share link",
    long_about = None
)]
struct Cli {
    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Event store file (overrides `POTLUCK_STORE` and the config file).
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            json: self.json,
            format: self.format.map(|mode| mode.as_str().to_string()),
            store: self.store.clone(),
        }
    }

    /// Output mode before the config file is consulted; used to report
    /// config errors.
    fn early_output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            self.format.unwrap_or(OutputMode::Pretty)
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Events",
        about = "Create a new event",
        long_about = "Create a new event and print its first share link.",
        after_help = "EXAMPLES:\n    # Single-day event\n    potluck create --name Sommerfest --date 2025-08-01T18:00\n\n    # Let guests vote on the date\n    potluck create --name Ausflug --propose 2025-09-06 --propose 2025-09-13"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Events",
        about = "Show an event",
        long_about = "Show items, activities and date votes of an event given by code or link.",
        after_help = "EXAMPLES:\n    # By code (reads the local store)\n    potluck show K7Q2M9XA\n\n    # By link\n    potluck show 'https://potluck.example#/event/K7Q2M9XA?data=…'"
    )]
    Show(cmd::show::ShowArgs),

    #[command(next_help_heading = "Items", about = "Add or remove items")]
    Item {
        #[command(subcommand)]
        command: cmd::item::ItemCommand,
    },

    #[command(
        next_help_heading = "Items",
        about = "Assign an item to a person",
        after_help = "EXAMPLES:\n    potluck assign K7Q2M9XA Grill Lea"
    )]
    Assign(cmd::item::AssignArgs),

    #[command(next_help_heading = "Items", about = "Clear an item's assignment")]
    Unassign(cmd::item::UnassignArgs),

    #[command(next_help_heading = "Voting", about = "Propose activities and vote on them")]
    Activity {
        #[command(subcommand)]
        command: cmd::activity::ActivityCommand,
    },

    #[command(next_help_heading = "Voting", about = "Vote on candidate dates")]
    Date {
        #[command(subcommand)]
        command: cmd::date::DateCommand,
    },

    #[command(
        next_help_heading = "Sharing",
        about = "Print a fresh share link",
        long_about = "Re-encode an event, mirror it into the store and print its share link."
    )]
    Link(cmd::link::LinkArgs),

    #[command(
        next_help_heading = "Sharing",
        about = "Decode a link token",
        long_about = "Decode a share link or its data token without reading or writing the store."
    )]
    Decode(cmd::decode::DecodeArgs),

    #[command(
        next_help_heading = "Sharing",
        about = "Open a share link",
        long_about = "Adopt the snapshot a share link carries, replacing the stored copy, and report what the stored copy had that the link lacks."
    )]
    Open(cmd::open::OpenArgs),

    #[command(
        next_help_heading = "Sharing",
        about = "Re-publish an event periodically",
        after_help = "EXAMPLES:\n    # Re-publish every 30 seconds until Ctrl-C\n    potluck watch K7Q2M9XA --interval 30"
    )]
    Watch(cmd::watch::WatchArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Remove expired events from the store"
    )]
    Cleanup,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("POTLUCK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "potluck=debug,potluck_core=debug,info"
        } else {
            "potluck=info,potluck_core=info,warn"
        })
    });

    let format = env::var("POTLUCK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match resolve_config(&cli.overrides(), &EnvOverrides::from_env()) {
        Ok(config) => config,
        Err(err) => {
            render_error(
                cli.early_output_mode(),
                &CliError::with_code(format!("{err:#}"), ErrorCode::ConfigParseError),
            )?;
            return Err(err);
        }
    };
    let output = OutputMode::from_resolved(&config.resolved_output);
    debug!(store = %config.store_path.display(), origin = %config.origin, "resolved config");

    let session = cmd::Session::new(config, output);
    match cli.command {
        Commands::Create(ref args) => cmd::create::run_create(args, &session),
        Commands::Show(ref args) => cmd::show::run_show(args, &session),
        Commands::Item { ref command } => cmd::item::run_item(command, &session),
        Commands::Assign(ref args) => cmd::item::run_assign(args, &session),
        Commands::Unassign(ref args) => cmd::item::run_unassign(args, &session),
        Commands::Activity { ref command } => cmd::activity::run_activity(command, &session),
        Commands::Date { ref command } => cmd::date::run_date(command, &session),
        Commands::Link(ref args) => cmd::link::run_link(args, &session),
        Commands::Decode(ref args) => cmd::decode::run_decode(args, output),
        Commands::Open(ref args) => cmd::open::run_open(args, &session),
        Commands::Watch(ref args) => cmd::watch::run_watch(args, &session),
        Commands::Cleanup => cmd::cleanup::run_cleanup(&session),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_before_subcommand() {
        let cli = Cli::parse_from(["potluck", "--json", "cleanup"]);
        assert!(cli.json);
        assert!(cli.overrides().json);
        assert_eq!(cli.early_output_mode(), OutputMode::Json);
    }

    #[test]
    fn json_flag_after_subcommand() {
        let cli = Cli::parse_from(["potluck", "show", "ABCD1234", "--json"]);
        assert!(cli.json);
    }

    #[test]
    fn format_flag_is_passed_through() {
        let cli = Cli::parse_from(["potluck", "--format", "text", "cleanup"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
        assert_eq!(cli.overrides().format.as_deref(), Some("text"));
    }

    #[test]
    fn store_flag_is_global() {
        let cli = Cli::parse_from(["potluck", "cleanup", "--store", "/tmp/events.json"]);
        assert_eq!(cli.overrides().store, Some(PathBuf::from("/tmp/events.json")));
    }

    #[test]
    fn nested_subcommands_parse() {
        let cli = Cli::parse_from(["potluck", "item", "add", "ABCD1234", "Grill"]);
        assert!(matches!(
            cli.command,
            Commands::Item {
                command: cmd::item::ItemCommand::Add { .. }
            }
        ));

        let cli = Cli::parse_from(["potluck", "activity", "vote", "ABCD1234", "Volleyball", "Max"]);
        assert!(matches!(
            cli.command,
            Commands::Activity {
                command: cmd::activity::ActivityCommand::Vote { .. }
            }
        ));
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["potluck", "create", "--name", "x"],
            vec!["potluck", "show", "x"],
            vec!["potluck", "item", "add", "x", "Grill"],
            vec!["potluck", "item", "remove", "x", "Grill"],
            vec!["potluck", "assign", "x", "Grill", "Lea"],
            vec!["potluck", "unassign", "x", "Grill"],
            vec!["potluck", "activity", "add", "x", "Volleyball"],
            vec!["potluck", "activity", "remove", "x", "Volleyball"],
            vec!["potluck", "activity", "vote", "x", "Volleyball", "Max"],
            vec!["potluck", "activity", "unvote", "x", "Volleyball", "Max"],
            vec!["potluck", "date", "vote", "x", "1", "Max"],
            vec!["potluck", "date", "unvote", "x", "1", "Max"],
            vec!["potluck", "date", "toggle", "x", "1", "Max"],
            vec!["potluck", "link", "x"],
            vec!["potluck", "decode", "eyJhIjoieCJ9"],
            vec!["potluck", "open", "https://potluck.example#/event/x"],
            vec!["potluck", "watch", "x"],
            vec!["potluck", "cleanup"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(
                result.is_ok(),
                "Failed to parse: {:?} — error: {:?}",
                args,
                result.err()
            );
        }
    }
}
