use clap::{Args, Parser, Subcommand};
use keystone::{commands, TextFormat};
use keystone_admin::init_logging;
use keystone_base::Result;
use keystone_dict::TableIdentifier;
use std::{path::PathBuf, process::ExitCode};

#[derive(Parser)]
#[command(name = "keystone")]
#[command(about = "Build and check column dictionaries")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TableArgs {
    /// Store root directory
    #[arg(long)]
    store: PathBuf,

    #[arg(long)]
    database: String,

    #[arg(long)]
    table: String,
}

impl TableArgs {
    fn identifier(&self) -> TableIdentifier {
        TableIdentifier::new(&self.database, &self.table)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Add the distinct values of delimited text files to the table's dictionaries
    Load {
        #[command(flatten)]
        table: TableArgs,

        /// Column declaration NAME=TYPE, once per column in row order
        #[arg(long = "column", required = true)]
        columns: Vec<String>,

        /// Nesting delimiter, once per depth (default: '$' then ':')
        #[arg(long = "delimiter")]
        delimiters: Vec<String>,

        #[arg(long, default_value = ",")]
        field_delimiter: String,

        /// Cell text that stands for null
        #[arg(long, default_value = "\\N")]
        null_marker: String,

        /// Properties file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Input files, one partition each
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print a column's ledger and dictionary values
    Inspect {
        #[command(flatten)]
        table: TableArgs,

        /// Also hexdump the dictionary and metadata files
        #[arg(long)]
        hexdump: bool,

        column: String,
    },

    /// Check a column's dictionary file against its ledger without repairing it
    Verify {
        #[command(flatten)]
        table: TableArgs,

        column: String,
    },
}

fn run(cli: Cli) -> Result<bool> {
    let mut out = std::io::stdout().lock();
    match cli.command {
        Commands::Load {
            table,
            columns,
            delimiters,
            field_delimiter,
            null_marker,
            config,
            files,
        } => {
            let opts = commands::LoadOptions {
                columns,
                delimiters,
                format: TextFormat::new(field_delimiter, null_marker)?,
                config,
                files,
            };
            commands::load(&table.store, table.identifier(), opts, &mut out)
        }
        Commands::Inspect {
            table,
            hexdump,
            column,
        } => {
            commands::inspect(&table.store, table.identifier(), &column, hexdump, &mut out)?;
            Ok(true)
        }
        Commands::Verify { table, column } => {
            commands::verify(&table.store, table.identifier(), &column, &mut out)
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("keystone: {}", e);
            ExitCode::FAILURE
        }
    }
}
