use anyhow::Result;
use clap::Parser;
use tracing::error;

use webvisits::{utils, workflow, Args, Command};

fn execute(args: &Args) -> Result<()> {
    match &args.command {
        Command::Extract { html_dir, csv } => {
            let count = workflow::extract_csv(html_dir, csv, args.workers)?;
            println!(
                "Extracted {} snapshots into {}",
                utils::format_number(count as u64),
                csv.display()
            );
        }
        Command::Load {
            csv,
            sqlite,
            strict,
        } => {
            let summary = workflow::load_sqlite(csv, sqlite, args.workers, *strict)?;
            workflow::print_load_summary(&summary);
        }
        Command::Rank { sqlite, top } => {
            let ranks = workflow::rank_sqlite(sqlite)?;
            workflow::print_rank_results(&ranks, *top);
        }
        Command::Run {
            html_dir,
            results_dir,
        } => {
            let ranks = workflow::run(html_dir, results_dir, args.workers)?;
            workflow::print_rank_results(&ranks, None);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    utils::setup_logging(args.verbose);
    utils::validate_args(&args)?;

    match execute(&args) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(action = "exit", component = "main", error = ?e, "Error");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}
