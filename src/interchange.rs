//! CSV exchange of snapshots between the extraction and loading stages.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::error::FormatError;
use crate::literal;
use crate::model::Snapshot;

/// Total visits text of pages too small to carry a usable history.
pub const UNDER_THRESHOLD_VISITS: &str = "< 5K";

/// One CSV row: the snapshot's scalars verbatim, list columns as literals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub global_rank: String,
    #[serde(default)]
    pub total_visits: String,
    #[serde(default)]
    pub bounce_rate: String,
    #[serde(default)]
    pub avg_visit_duration: String,
    #[serde(default)]
    pub past_category_ranks: String,
    #[serde(default)]
    pub past_total_visits: String,
    #[serde(default)]
    pub top_countries: String,
    #[serde(default)]
    pub age_distribution: String,
}

impl From<&Snapshot> for SnapshotRow {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            domain: snapshot.domain.clone(),
            date: snapshot.date.clone(),
            global_rank: snapshot.global_rank.clone(),
            total_visits: snapshot.total_visits.clone(),
            bounce_rate: snapshot.bounce_rate.clone(),
            avg_visit_duration: snapshot.avg_visit_duration.clone(),
            past_category_ranks: literal::encode_int_list(&snapshot.past_category_ranks),
            past_total_visits: literal::encode_str_list(&snapshot.past_total_visits),
            top_countries: literal::encode_pair_list(&snapshot.top_countries),
            age_distribution: literal::encode_str_list(&snapshot.age_distribution),
        }
    }
}

impl TryFrom<SnapshotRow> for Snapshot {
    type Error = FormatError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        Ok(Self {
            past_category_ranks: literal::int_list(&row.past_category_ranks)?,
            past_total_visits: literal::str_list(&row.past_total_visits)?,
            top_countries: literal::pair_list(&row.top_countries)?,
            age_distribution: literal::str_list(&row.age_distribution)?,
            domain: row.domain,
            date: row.date,
            global_rank: row.global_rank,
            total_visits: row.total_visits,
            bounce_rate: row.bounce_rate,
            avg_visit_duration: row.avg_visit_duration,
        })
    }
}

pub fn write_snapshots<W: Write>(snapshots: &[Snapshot], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for snapshot in snapshots {
        writer.serialize(SnapshotRow::from(snapshot))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes snapshots to a CSV file, header included.
pub fn write_csv(snapshots: &[Snapshot], csv_file: &Path) -> Result<()> {
    let start_time = Instant::now();
    let file = File::create(csv_file)
        .with_context(|| format!("Failed to create csv file {csv_file:?}"))?;
    write_snapshots(snapshots, file)?;
    info!(
        action = "complete",
        component = "csv_export",
        row_count = snapshots.len(),
        file_path = ?csv_file,
        duration_ms = start_time.elapsed().as_millis(),
        "Snapshots written"
    );
    Ok(())
}

/// A CSV row after its list columns were decoded.
///
/// `domain` and `date` are copied out of the row so a snapshot whose list
/// columns are malformed can still be reported.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedRow {
    /// Line in the file, header being line 1. Zero when not read from a file.
    pub line: usize,
    pub domain: String,
    pub date: String,
    pub snapshot: Result<Snapshot, FormatError>,
}

impl From<Snapshot> for ImportedRow {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            line: 0,
            domain: snapshot.domain.clone(),
            date: snapshot.date.clone(),
            snapshot: Ok(snapshot),
        }
    }
}

/// Reads snapshots, skipping pages under the reporting threshold.
///
/// A list column that doesn't hold a well-formed literal of the expected
/// shape only fails its own row; a file that isn't valid CSV fails the read.
pub fn read_snapshots<R: Read>(reader: R) -> Result<Vec<ImportedRow>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (index, row) in reader.deserialize::<SnapshotRow>().enumerate() {
        let line = index + 2;
        let row = row.with_context(|| format!("Failed to read csv row at line {line}"))?;
        if row.total_visits == UNDER_THRESHOLD_VISITS {
            skipped += 1;
            continue;
        }
        rows.push(ImportedRow {
            line,
            domain: row.domain.clone(),
            date: row.date.clone(),
            snapshot: Snapshot::try_from(row),
        });
    }

    info!(
        action = "complete",
        component = "csv_import",
        row_count = rows.len(),
        malformed_rows = rows.iter().filter(|row| row.snapshot.is_err()).count(),
        skipped_under_threshold = skipped,
        "Snapshots read"
    );
    Ok(rows)
}

pub fn read_csv(csv_file: &Path) -> Result<Vec<ImportedRow>> {
    let file =
        File::open(csv_file).with_context(|| format!("Failed to open csv file {csv_file:?}"))?;
    read_snapshots(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HEADER: &str = "domain,date,global_rank,total_visits,bounce_rate,avg_visit_duration,past_category_ranks,past_total_visits,top_countries,age_distribution";

    fn sample() -> Snapshot {
        Snapshot {
            domain: "crunchbase.com".to_string(),
            date: "December 2022".to_string(),
            global_rank: "3,912".to_string(),
            total_visits: "12.1M".to_string(),
            bounce_rate: "45.10%".to_string(),
            avg_visit_duration: "00:03:21".to_string(),
            past_category_ranks: vec![8, 8, 9],
            past_total_visits: vec!["13.0M".into(), "12.6M".into(), "12.1M".into()],
            top_countries: vec![
                ("United States".into(), "35.2%".into()),
                ("Others".into(), "64.8%".into()),
            ],
            age_distribution: vec![
                "20%".into(),
                "30%".into(),
                "20%".into(),
                "15%".into(),
                "10%".into(),
                "5%".into(),
            ],
        }
    }

    #[test]
    fn writes_header_and_literal_columns() {
        let mut out = Vec::new();
        write_snapshots(&[sample()], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(HEADER));
        let row = lines.next().unwrap();
        assert!(row.contains("\"[8, 8, 9]\""));
        assert!(row.contains("\"[('United States', '35.2%'), ('Others', '64.8%')]\""));
    }

    #[test]
    fn reads_back_what_it_writes() {
        let mut out = Vec::new();
        write_snapshots(&[sample()], &mut out).unwrap();
        assert_eq!(
            read_snapshots(out.as_slice()).unwrap(),
            vec![ImportedRow {
                line: 2,
                ..ImportedRow::from(sample())
            }]
        );
    }

    #[test]
    fn skips_rows_under_the_threshold() {
        let csv = format!(
            "{HEADER}\n\
             tiny.io,December 2022,,< 5K,,,,,,\n\
             big.com,December 2022,\"1,234\",1.0M,50%,00:01:00,\"[1, 2, 3]\",\"['1M', '1M', '1M']\",[],[]\n"
        );
        let rows = read_snapshots(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].line, 3);
        let snapshot = rows[0].snapshot.as_ref().unwrap();
        assert_eq!(snapshot.domain, "big.com");
        assert_eq!(snapshot.global_rank, "1,234");
        assert_eq!(snapshot.past_category_ranks, vec![1, 2, 3]);
    }

    #[test]
    fn refuses_expressions_in_list_columns() {
        let csv = format!(
            "{HEADER}\n\
             evil.com,December 2022,1,1M,1%,00:00:01,\"__import__('os')\",[],[],[]\n\
             fine.com,December 2022,1,1M,1%,00:00:01,\"[1, 2, 3]\",[],[],[]\n"
        );
        let rows = read_snapshots(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].domain, "evil.com");
        assert!(matches!(rows[0].snapshot, Err(FormatError::Literal { .. })));
        assert!(rows[1].snapshot.is_ok());
    }

    #[test]
    fn broken_csv_fails_the_read() {
        let csv = format!("{HEADER}\nshort.com,December 2022,\"unterminated\n");
        assert!(read_snapshots(csv.as_bytes()).is_err());
    }
}
