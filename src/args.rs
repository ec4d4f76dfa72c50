use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "webvisits",
    about = "Extract website visit statistics from saved analytics pages into dated time series",
    version,
    long_about = None
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Number of worker threads
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse saved analytics pages into a csv file
    Extract {
        /// Directory containing the *.html pages
        #[arg(long, env = "HTML_DIR", default_value = "./source_html")]
        html_dir: PathBuf,

        /// Csv file to write
        #[arg(long)]
        csv: PathBuf,
    },

    /// Load a csv file of snapshots into a SQLite database
    Load {
        /// Csv file to read
        #[arg(long)]
        csv: PathBuf,

        /// SQLite database file to write into
        #[arg(long)]
        sqlite: PathBuf,

        /// Abort without storing anything if any snapshot is invalid
        #[arg(long)]
        strict: bool,
    },

    /// Rank websites by their relative growth
    Rank {
        /// SQLite database file to read
        #[arg(long)]
        sqlite: PathBuf,

        /// Number of top websites to display
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Extract, load and rank in one go
    Run {
        /// Directory containing the *.html pages
        #[arg(long, env = "HTML_DIR", default_value = "./source_html")]
        html_dir: PathBuf,

        /// Directory where the csv and database files are written
        #[arg(long, env = "RESULTS_DIR", default_value = "./results")]
        results_dir: PathBuf,
    },
}
