use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use crate::chart::{ChartDecoder, HighchartsDecoder};
use crate::interchange::ImportedRow;
use crate::model::Snapshot;
use crate::rank::{rank_websites, DomainRank};
use crate::snapshot::expand;
use crate::sqlite::FactStore;
use crate::{extract, interchange};

pub const CSV_FILE_NAME: &str = "webvisits.csv";
pub const SQLITE_FILE_NAME: &str = "webvisits.db";

/// What a load did with the snapshots it read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub snapshots_loaded: usize,
    /// `(domain, date, reason)` of each snapshot left out.
    pub snapshots_skipped: Vec<(String, String, String)>,
    pub facts_written: usize,
}

pub fn default_workers() -> usize {
    std::cmp::min(num_cpus::get(), 8)
}

fn thread_pool(workers: Option<usize>) -> Result<rayon::ThreadPool> {
    let workers = workers.unwrap_or_else(default_workers);
    info!(action = "configure", component = "workflow", worker_count = workers, "Using workers for processing");
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("Failed to build worker pool")
}

fn html_files(html_dir: &Path) -> Result<Vec<PathBuf>> {
    if !html_dir.is_dir() {
        anyhow::bail!("HTML directory not found at {:?}", html_dir);
    }
    let mut files: Vec<PathBuf> = fs::read_dir(html_dir)
        .with_context(|| format!("Failed to list {html_dir:?}"))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "html"))
        .collect();
    files.sort();
    Ok(files)
}

/// Parses every `*.html` page of a directory into snapshots, in file name
/// order.
pub fn extract_snapshots(
    html_dir: &Path,
    decoder: &dyn ChartDecoder,
    workers: Option<usize>,
) -> Result<Vec<Snapshot>> {
    let start_time = Instant::now();
    let files = html_files(html_dir)?;
    info!(action = "start", component = "extraction", file_count = files.len(), html_dir = ?html_dir, "Extracting snapshots from pages");

    let pool = thread_pool(workers)?;
    let snapshots = pool.install(|| {
        files
            .par_iter()
            .map(|path| {
                let html = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read page {path:?}"))?;
                extract::parse_page(&html, decoder)
                    .with_context(|| format!("Failed to extract page {path:?}"))
            })
            .collect::<Result<Vec<Snapshot>>>()
    })?;

    info!(
        action = "complete",
        component = "extraction",
        snapshot_count = snapshots.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Extraction completed"
    );
    Ok(snapshots)
}

/// Extracts a directory of pages into a CSV file.
pub fn extract_csv(html_dir: &Path, csv_file: &Path, workers: Option<usize>) -> Result<usize> {
    let snapshots = extract_snapshots(html_dir, &HighchartsDecoder, workers)?;
    interchange::write_csv(&snapshots, csv_file)?;
    Ok(snapshots.len())
}

/// Expands imported rows and stores all their facts in one unit of work.
///
/// A row whose list columns didn't decode, or whose snapshot fails to
/// expand, is reported and left out, unless `strict` is set, in which case
/// nothing is stored.
pub fn load_snapshots(
    rows: &[ImportedRow],
    store: &mut FactStore,
    workers: Option<usize>,
    strict: bool,
) -> Result<LoadSummary> {
    let start_time = Instant::now();
    let pool = thread_pool(workers)?;
    let expanded: Vec<_> = pool.install(|| {
        rows.par_iter()
            .map(|row| match &row.snapshot {
                Ok(snapshot) => expand(snapshot),
                Err(e) => Err(e.clone()),
            })
            .collect()
    });

    let mut summary = LoadSummary::default();
    let mut work = store.unit_of_work()?;
    for (row, facts) in rows.iter().zip(expanded) {
        match facts {
            Ok(facts) => {
                work.add_facts(&facts)?;
                summary.snapshots_loaded += 1;
            }
            Err(e) if strict => {
                return Err(e).with_context(|| {
                    format!(
                        "Snapshot of {} for {:?} (line {}) is invalid",
                        row.domain, row.date, row.line
                    )
                });
            }
            Err(e) => {
                warn!(
                    action = "expand",
                    component = "snapshot",
                    domain = %row.domain,
                    date = %row.date,
                    line = row.line,
                    error = %e,
                    "Skipping snapshot"
                );
                summary
                    .snapshots_skipped
                    .push((row.domain.clone(), row.date.clone(), e.to_string()));
            }
        }
    }
    summary.facts_written = work.commit()?;

    info!(
        action = "complete",
        component = "load",
        snapshots_loaded = summary.snapshots_loaded,
        snapshots_skipped = summary.snapshots_skipped.len(),
        facts_written = summary.facts_written,
        duration_ms = start_time.elapsed().as_millis(),
        "Load completed"
    );
    Ok(summary)
}

/// Loads a CSV file of snapshots into a SQLite database file.
pub fn load_sqlite(
    csv_file: &Path,
    sqlite_file: &Path,
    workers: Option<usize>,
    strict: bool,
) -> Result<LoadSummary> {
    let rows = interchange::read_csv(csv_file)?;
    let mut store = FactStore::open(sqlite_file)?;
    load_snapshots(&rows, &mut store, workers, strict)
}

pub fn rank_sqlite(sqlite_file: &Path) -> Result<Vec<DomainRank>> {
    if !sqlite_file.exists() {
        anyhow::bail!("Database not found at {:?}", sqlite_file);
    }
    let store = FactStore::open(sqlite_file)?;
    rank_websites(&store)
}

/// Runs extraction, loading and ranking end to end, writing the CSV and
/// the database under `results_dir`. An existing database is replaced.
pub fn run(html_dir: &Path, results_dir: &Path, workers: Option<usize>) -> Result<Vec<DomainRank>> {
    let total_start_time = Instant::now();
    fs::create_dir_all(results_dir)
        .with_context(|| format!("Failed to create {results_dir:?}"))?;
    let csv_file = results_dir.join(CSV_FILE_NAME);
    let sqlite_file = results_dir.join(SQLITE_FILE_NAME);

    info!(action = "start", component = "workflow", csv_file = ?csv_file, "Extracting website visits into csv");
    extract_csv(html_dir, &csv_file, workers)?;

    if sqlite_file.exists() {
        info!(action = "delete", component = "workflow", sqlite_file = ?sqlite_file, "Deleting existing database");
        fs::remove_file(&sqlite_file)
            .with_context(|| format!("Failed to delete {sqlite_file:?}"))?;
    }
    info!(action = "load", component = "workflow", sqlite_file = ?sqlite_file, "Loading csv data into database");
    load_sqlite(&csv_file, &sqlite_file, workers, false)?;

    let ranks = rank_sqlite(&sqlite_file)?;
    info!(
        action = "complete",
        component = "workflow",
        duration_ms = total_start_time.elapsed().as_millis(),
        "Done"
    );
    Ok(ranks)
}

pub fn print_load_summary(summary: &LoadSummary) {
    println!("\n--- Load Summary ---");
    println!(
        "Snapshots loaded: {}",
        crate::utils::format_number(summary.snapshots_loaded as u64)
    );
    println!(
        "Facts written: {}",
        crate::utils::format_number(summary.facts_written as u64)
    );
    if !summary.snapshots_skipped.is_empty() {
        println!("Snapshots skipped: {}", summary.snapshots_skipped.len());
        for (domain, date, reason) in &summary.snapshots_skipped {
            println!("- {} ({}): {}", domain, date, reason);
        }
    }
}

pub fn print_rank_results(ranks: &[DomainRank], top: Option<usize>) {
    println!("\n--- Websites Rank ---");
    let shown = top.unwrap_or(ranks.len());
    for (position, rank) in ranks.iter().take(shown).enumerate() {
        println!("{:>3}. {}: {:.2}", position + 1, rank.domain, rank.score);
    }
}
