//! qtiex CLI: extract quizzes from IMS Common Cartridge packages.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use qtiex_core::ExtractError;

mod commands;

#[derive(Parser)]
#[command(
    name = "qtiex",
    version,
    about = "Extract quizzes from IMS Common Cartridge packages"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every quiz in a cartridge as JSON
    Extract {
        /// Path to the .imscc / .zip archive
        #[arg(long)]
        archive: Option<PathBuf>,

        /// Write JSON to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Emit compact JSON
        #[arg(long)]
        compact: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Summarize the quizzes in a cartridge
    Inspect {
        /// Path to the .imscc / .zip archive
        #[arg(long)]
        archive: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Extract every archive in a directory
    Batch {
        /// Directory containing .imscc / .zip archives
        #[arg(long)]
        input: PathBuf,

        /// Directory for the JSON results
        #[arg(long)]
        output: PathBuf,

        /// Max archives processed concurrently
        #[arg(long)]
        parallelism: Option<usize>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config
    Init,
}

/// Exit status for bad caller input (missing or unreadable archive).
const EXIT_INPUT_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "qtiex=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            archive,
            output,
            compact,
            config,
        } => commands::extract::execute(archive, output, compact, config),
        Commands::Inspect { archive, config } => commands::inspect::execute(archive, config),
        Commands::Batch {
            input,
            output,
            parallelism,
            config,
        } => commands::batch::execute(input, output, parallelism, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(exit_code(&e));
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    let input_error = error.chain().any(|cause| {
        cause
            .downcast_ref::<ExtractError>()
            .is_some_and(ExtractError::is_input_error)
    });
    if input_error {
        EXIT_INPUT_ERROR
    } else {
        1
    }
}
