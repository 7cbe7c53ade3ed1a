#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tsh: multi-year timesheet with versioned local storage",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Data directory (overrides TIMESHEET_DATA_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "Show recorded years",
        long_about = "Show an overview of every recorded year, or one year in detail.",
        after_help = "EXAMPLES:\n    # Overview of all years\n    tsh show\n\n    # One year with months and vacation\n    tsh show --year 2025\n\n    # Emit machine-readable output\n    tsh show --year 2025 --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Book hours on a day",
        long_about = "Book hours on one day. Zero or blank hours clear the day.",
        after_help = "EXAMPLES:\n    # Book 8.4 hours on 1 September 2025\n    tsh set 2025 9 1 8.4\n\n    # Comma decimals are accepted\n    tsh set 2025 9 2 7,5\n\n    # Clear a day\n    tsh set 2025 9 2 0"
    )]
    Set(cmd::edit::SetArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Set the carry-in from the previous year",
        after_help = "EXAMPLES:\n    tsh carry 2025 -4.46"
    )]
    Carry(cmd::edit::CarryArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Set the target hours of a workday",
        after_help = "EXAMPLES:\n    tsh workday 2025 8.4"
    )]
    Workday(cmd::edit::WorkdayArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Manage the vacation ledger",
        after_help = "EXAMPLES:\n    # Record five days taken\n    tsh vacation add 2025 summer -5\n\n    # Remove a row\n    tsh vacation rm 2025 k3j9x0aa\n\n    # Set the HR-reported remaining hours\n    tsh vacation remaining 2025 87.5"
    )]
    Vacation {
        #[command(subcommand)]
        command: cmd::vacation::VacationCommand,
    },

    #[command(
        next_help_heading = "Interoperability",
        about = "Export the timesheet as JSON",
        after_help = "EXAMPLES:\n    # Print to stdout\n    tsh export\n\n    # Write a timestamped file into a directory\n    tsh export --output ~/backups"
    )]
    Export(cmd::transfer::ExportArgs),

    #[command(
        next_help_heading = "Interoperability",
        about = "Import an export from any app version",
        long_about = "Replace the timesheet with the contents of an export file. Older layouts are migrated.",
        after_help = "EXAMPLES:\n    # Import a backup\n    tsh import timesheet-2025-09-01T12-30-00-000Z.json\n\n    # Replace data even if the file is not recognized\n    tsh import odd.json --force"
    )]
    Import(cmd::transfer::ImportArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Show storage locations and health"
    )]
    Status,

    #[command(
        next_help_heading = "Maintenance",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    tsh completions bash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("TIMESHEET_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "timesheet_core=debug,timesheet_cli=debug,info"
        } else {
            "timesheet_core=info,timesheet_cli=info,warn"
        })
    });

    let format = env::var("TIMESHEET_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

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

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }
    timesheet_core::init();

    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let ctx = cmd::Context::resolve(cli.data_dir.as_deref(), cli.json)?;

    match &cli.command {
        Commands::Show(args) => cmd::show::run_show(args, &ctx).await,
        Commands::Set(args) => cmd::edit::run_set(args, &ctx).await,
        Commands::Carry(args) => cmd::edit::run_carry(args, &ctx).await,
        Commands::Workday(args) => cmd::edit::run_workday(args, &ctx).await,
        Commands::Vacation { command } => cmd::vacation::run_vacation(command, &ctx).await,
        Commands::Export(args) => cmd::transfer::run_export(args, &ctx).await,
        Commands::Import(args) => cmd::transfer::run_import(args, &ctx).await,
        Commands::Status => cmd::status::run_status(&ctx).await,
        Commands::Completions(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["tsh", "show", "--json"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Show(_)));
    }

    #[test]
    fn data_dir_flag_is_global() {
        let cli = Cli::parse_from(["tsh", "status", "--data-dir", "/tmp/ts"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/ts")));
    }

    #[test]
    fn set_parses_comma_hours() {
        let cli = Cli::parse_from(["tsh", "set", "2025", "9", "1", "7,5"]);
        let Commands::Set(args) = cli.command else {
            panic!("expected set");
        };
        assert_eq!((args.year, args.month, args.day), (2025, 9, 1));
        assert!((args.hours - 7.5).abs() < f64::EPSILON);
    }

    #[test]
    fn set_rejects_month_out_of_range() {
        assert!(Cli::try_parse_from(["tsh", "set", "2025", "13", "1", "8"]).is_err());
        assert!(Cli::try_parse_from(["tsh", "set", "2025", "0", "1", "8"]).is_err());
    }

    #[test]
    fn carry_accepts_negative_hours() {
        let cli = Cli::parse_from(["tsh", "carry", "2025", "-4.46"]);
        let Commands::Carry(args) = cli.command else {
            panic!("expected carry");
        };
        assert!((args.hours + 4.46).abs() < f64::EPSILON);
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["tsh", "show"],
            vec!["tsh", "show", "--year", "2025"],
            vec!["tsh", "set", "2025", "1", "2", "8"],
            vec!["tsh", "carry", "2025", "1.5"],
            vec!["tsh", "workday", "2025", "8"],
            vec!["tsh", "vacation", "add", "2025", "summer", "-5"],
            vec!["tsh", "vacation", "rm", "2025", "abc"],
            vec!["tsh", "vacation", "remaining", "2025", "87.5"],
            vec!["tsh", "export", "--output", "out.json"],
            vec!["tsh", "import", "in.json", "--force"],
            vec!["tsh", "status"],
            vec!["tsh", "completions", "zsh"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "failed to parse {args:?}: {:?}", result.err());
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
