mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "depa",
    version,
    about = "Content extraction for financial documents (PDF, XLSX, CSV)"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a document into text, tables and securities
    Extract {
        /// Path to the document
        input_file: PathBuf,

        /// Output format: summary (default) or json
        #[arg(short, long, default_value = "summary")]
        output: String,

        /// Write the full result to a JSON file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,

        /// Override the format sniffed from the extension (pdf, csv, xlsx, xls)
        #[arg(short, long)]
        format: Option<String>,

        /// Extraction timeout in seconds
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,
    },
    /// Show the tables detected in a document
    Tables {
        /// Path to the document
        input_file: PathBuf,

        /// Output format: summary (default) or json
        #[arg(short, long, default_value = "summary")]
        output: String,
    },
    /// List the securities identified in a document
    Securities {
        /// Path to the document
        input_file: PathBuf,

        /// Output format: summary (default) or json
        #[arg(short, long, default_value = "summary")]
        output: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            input_file,
            output,
            out,
            format,
            timeout,
        } => commands::extract::run(input_file, &output, out, format.as_deref(), timeout),
        Commands::Tables { input_file, output } => commands::tables::run(input_file, &output),
        Commands::Securities { input_file, output } => {
            commands::securities::run(input_file, &output)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
