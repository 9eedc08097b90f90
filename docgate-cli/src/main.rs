//! docgate CLI - Command-line interface
//!
//! This binary provides a command-line interface to the docgate library.

mod commands;
mod error;
mod renderer;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docgate::document::DocumentType;

use commands::batch::BatchArgs;
use commands::common::{FallbackArgs, OptionArgs};
use commands::config::ConfigCommands;
use commands::fallback::FallbackCommandArgs;
use commands::generate::GenerateArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "docgate")]
#[command(version = docgate::VERSION)]
#[command(about = "Generate documents one at a time with classified failures and text fallback", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Also print log lines to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one JSON record to a file
    Generate {
        /// Document type: report, result or process
        #[arg(long = "type")]
        document_type: DocumentType,

        /// JSON record to render
        #[arg(long)]
        record: PathBuf,

        /// Output file path
        #[arg(long)]
        output: PathBuf,

        #[command(flatten)]
        options: OptionArgs,

        #[command(flatten)]
        fallback: FallbackArgs,

        /// Render deadline in seconds (overrides the configuration)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Apply the sub-document size limit
        #[arg(long)]
        subdocument: bool,
    },

    /// Render every *.json record in a directory
    Batch {
        /// Document type: report, result or process
        #[arg(long = "type")]
        document_type: DocumentType,

        /// Directory with JSON records
        #[arg(long)]
        input_dir: PathBuf,

        /// Directory for rendered documents
        #[arg(long)]
        output_dir: PathBuf,

        #[command(flatten)]
        options: OptionArgs,

        #[command(flatten)]
        fallback: FallbackArgs,
    },

    /// Show how a failure message is classified
    Classify {
        /// Failure message to classify
        message: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the simplified text document for a record
    Fallback {
        /// Document type: report, result or process
        #[arg(long = "type")]
        document_type: DocumentType,

        /// JSON record to lay out
        #[arg(long)]
        record: PathBuf,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Show current memory use against the per-job ceiling
    Memory,

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli) {
        e.exit();
    }
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Generate {
            document_type,
            record,
            output,
            options,
            fallback,
            timeout_secs,
            subdocument,
        } => {
            let runner = CliRunner::with_logging(cli.debug, cli.verbose)?;
            commands::generate::run(
                &runner,
                GenerateArgs {
                    document_type,
                    record,
                    output,
                    options,
                    fallback,
                    timeout_secs,
                    subdocument,
                },
            )
        }
        Commands::Batch {
            document_type,
            input_dir,
            output_dir,
            options,
            fallback,
        } => {
            let runner = CliRunner::with_logging(cli.debug, cli.verbose)?;
            commands::batch::run(
                &runner,
                BatchArgs {
                    document_type,
                    input_dir,
                    output_dir,
                    options,
                    fallback,
                },
            )
        }
        Commands::Classify { message, json } => commands::classify::run(&message, json),
        Commands::Fallback {
            document_type,
            record,
            output,
            options,
        } => commands::fallback::run(FallbackCommandArgs {
            document_type,
            record,
            output,
            options,
        }),
        Commands::Memory => {
            let runner = CliRunner::with_logging(cli.debug, cli.verbose)?;
            commands::memory::run(&runner)
        }
        Commands::Config(command) => commands::config::run(command),
    }
}
