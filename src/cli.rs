//! Command-line arguments for `tabload`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "tabload",
    version,
    about = "Load CSV and spreadsheet files into SQLite with inferred, reviewable schemas"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load a file into a table, replacing any table of the same name.
    Load(LoadArgs),

    /// Print the inferred schema and detected problems as JSON.
    Inspect(SourceArgs),

    /// Print the first rows of a file, normalized, as CSV.
    Preview(PreviewArgs),

    /// List the tables of a database.
    Tables {
        /// SQLite database file.
        #[arg(value_name = "DATABASE")]
        database: PathBuf,
    },
}

#[derive(Args)]
pub struct SourceArgs {
    /// CSV or spreadsheet file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Sheet to read from a workbook (default: the first sheet).
    #[arg(long = "sheet", value_name = "NAME")]
    pub sheet: Option<String>,
}

#[derive(Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Rows to show.
    #[arg(long = "rows", default_value_t = 100)]
    pub rows: usize,
}

#[derive(Args)]
pub struct LoadArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// SQLite database file (created if missing).
    #[arg(long = "db", value_name = "DATABASE")]
    pub database: PathBuf,

    /// Destination table (default: the file stem).
    #[arg(long = "table", value_name = "NAME")]
    pub table: Option<String>,

    /// Load with this schema (JSON, as printed by `inspect`) instead of the inferred one.
    #[arg(long = "schema", value_name = "PATH", conflicts_with = "apply_suggestions")]
    pub schema: Option<PathBuf>,

    /// Apply every detected problem's suggested type before loading.
    #[arg(long = "apply-suggestions")]
    pub apply_suggestions: bool,

    /// Loader options as JSON (batch policy, SQLite pragmas).
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Do not print progress.
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn load_arguments_parse() {
        let cli = Cli::parse_from([
            "tabload", "load", "ventas.csv", "--db", "out.db", "--table", "ventas", "-vv",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Load(args) => {
                assert_eq!(args.source.file, PathBuf::from("ventas.csv"));
                assert_eq!(args.table.as_deref(), Some("ventas"));
                assert!(!args.apply_suggestions);
            }
            _ => panic!("expected load"),
        }
    }
}
