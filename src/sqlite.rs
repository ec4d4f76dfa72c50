use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Result as SqliteResult, Transaction};
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::model::{AgeShareFact, CountryShareFact, SnapshotFacts, VisitFact};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS webvisits (
    domain TEXT NOT NULL,
    date TEXT NOT NULL,
    total_visits INTEGER NOT NULL,
    category_rank INTEGER NOT NULL,
    global_rank INTEGER,
    bounce_rate REAL,
    avg_visit_duration INTEGER,
    PRIMARY KEY (domain, date)
);
CREATE TABLE IF NOT EXISTS visits_by_age (
    domain TEXT NOT NULL,
    date TEXT NOT NULL,
    min_age INTEGER NOT NULL,
    visits REAL NOT NULL,
    PRIMARY KEY (domain, date, min_age)
);
CREATE TABLE IF NOT EXISTS country_visits_share (
    domain TEXT NOT NULL,
    date TEXT NOT NULL,
    country TEXT NOT NULL,
    share REAL NOT NULL,
    PRIMARY KEY (domain, date, country)
);
";

/// Monthly `webvisits` columns that can be read back as a time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesColumn {
    TotalVisits,
    CategoryRank,
}

impl SeriesColumn {
    fn column(self) -> &'static str {
        match self {
            Self::TotalVisits => "total_visits",
            Self::CategoryRank => "category_rank",
        }
    }
}

/// One point of a per-domain series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub domain: String,
    pub date: NaiveDate,
    pub value: f64,
}

/// SQLite-backed store for the three fact tables.
pub struct FactStore {
    conn: Connection,
}

impl FactStore {
    pub fn open(sqlite_file: &Path) -> Result<Self> {
        let conn = Connection::open(sqlite_file)
            .with_context(|| format!("Failed to open database {sqlite_file:?}"))?;
        info!(action = "open", component = "fact_store", path = ?sqlite_file, "Connected to database");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create fact tables")?;
        Ok(Self { conn })
    }

    /// Starts a unit of work; nothing it adds is visible until
    /// [`UnitOfWork::commit`].
    pub fn unit_of_work(&mut self) -> Result<UnitOfWork<'_>> {
        let tx = self
            .conn
            .transaction()
            .context("Failed to begin transaction")?;
        Ok(UnitOfWork { tx, added: 0 })
    }

    /// Values of one `webvisits` column for every domain, oldest first.
    pub fn visit_series(&self, column: SeriesColumn) -> Result<Vec<SeriesPoint>> {
        let start_time = Instant::now();
        let query = format!(
            "SELECT domain, date, {} FROM webvisits ORDER BY date, domain",
            column.column()
        );
        let points = self
            .conn
            .prepare(&query)?
            .query_map([], |row| {
                Ok(SeriesPoint {
                    domain: row.get(0)?,
                    date: row.get(1)?,
                    value: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<SeriesPoint>>>()
            .with_context(|| format!("Failed to query {} series", column.column()))?;

        info!(
            action = "query",
            component = "fact_store",
            column = column.column(),
            point_count = points.len(),
            duration_ms = start_time.elapsed().as_millis(),
            "Series loaded"
        );
        Ok(points)
    }

    pub fn visits(&self) -> Result<Vec<VisitFact>> {
        let facts = self
            .conn
            .prepare(
                "SELECT domain, date, total_visits, category_rank, global_rank, bounce_rate, avg_visit_duration
                 FROM webvisits ORDER BY domain, date",
            )?
            .query_map([], |row| {
                Ok(VisitFact {
                    domain: row.get(0)?,
                    date: row.get(1)?,
                    total_visits: row.get(2)?,
                    category_rank: row.get(3)?,
                    global_rank: row.get(4)?,
                    bounce_rate: row.get(5)?,
                    avg_visit_duration: row.get(6)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(facts)
    }

    /// Row counts of the `(webvisits, visits_by_age, country_visits_share)`
    /// tables.
    pub fn counts(&self) -> Result<(usize, usize, usize)> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .with_context(|| format!("Failed to count {table}"))?;
            Ok(n as usize)
        };
        Ok((
            count("webvisits")?,
            count("visits_by_age")?,
            count("country_visits_share")?,
        ))
    }
}

/// A batch of facts written in one transaction. Dropping it without
/// committing discards everything it added.
pub struct UnitOfWork<'a> {
    tx: Transaction<'a>,
    added: usize,
}

impl UnitOfWork<'_> {
    pub fn add_visit(&mut self, fact: &VisitFact) -> Result<()> {
        self.tx
            .prepare_cached(
                "INSERT INTO webvisits
                 (domain, date, total_visits, category_rank, global_rank, bounce_rate, avg_visit_duration)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?
            .execute(params![
                fact.domain,
                fact.date,
                fact.total_visits,
                fact.category_rank,
                fact.global_rank,
                fact.bounce_rate,
                fact.avg_visit_duration,
            ])
            .with_context(|| format!("Failed to store visits of {} on {}", fact.domain, fact.date))?;
        self.added += 1;
        Ok(())
    }

    pub fn add_age_share(&mut self, fact: &AgeShareFact) -> Result<()> {
        self.tx
            .prepare_cached(
                "INSERT INTO visits_by_age (domain, date, min_age, visits) VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![fact.domain, fact.date, fact.min_age, fact.visits])
            .with_context(|| {
                format!(
                    "Failed to store age {}+ share of {} on {}",
                    fact.min_age, fact.domain, fact.date
                )
            })?;
        self.added += 1;
        Ok(())
    }

    pub fn add_country_share(&mut self, fact: &CountryShareFact) -> Result<()> {
        self.tx
            .prepare_cached(
                "INSERT INTO country_visits_share (domain, date, country, share) VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![fact.domain, fact.date, fact.country, fact.share])
            .with_context(|| {
                format!(
                    "Failed to store {} share of {} on {}",
                    fact.country, fact.domain, fact.date
                )
            })?;
        self.added += 1;
        Ok(())
    }

    pub fn add_facts(&mut self, facts: &SnapshotFacts) -> Result<()> {
        for fact in &facts.visits {
            self.add_visit(fact)?;
        }
        for fact in &facts.ages {
            self.add_age_share(fact)?;
        }
        for fact in &facts.countries {
            self.add_country_share(fact)?;
        }
        Ok(())
    }

    /// Commits and returns how many facts were written.
    pub fn commit(self) -> Result<usize> {
        let start_time = Instant::now();
        let added = self.added;
        self.tx.commit().context("Failed to commit facts")?;
        info!(
            action = "commit",
            component = "fact_store",
            fact_count = added,
            duration_ms = start_time.elapsed().as_millis(),
            "Facts committed"
        );
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn visit(domain: &str, date: NaiveDate, total_visits: i64, category_rank: i64) -> VisitFact {
        VisitFact {
            domain: domain.to_string(),
            date,
            total_visits,
            category_rank,
            global_rank: None,
            bounce_rate: None,
            avg_visit_duration: None,
        }
    }

    fn sample_facts() -> SnapshotFacts {
        let date = ymd(2022, 12, 31);
        SnapshotFacts {
            visits: vec![
                visit("a.com", ymd(2022, 11, 30), 100, 5),
                VisitFact {
                    global_rank: Some(1200),
                    bounce_rate: Some(0.41),
                    avg_visit_duration: Some(95),
                    ..visit("a.com", date, 150, 4)
                },
            ],
            ages: vec![AgeShareFact {
                domain: "a.com".to_string(),
                date,
                min_age: 18,
                visits: 0.25,
            }],
            countries: vec![CountryShareFact {
                domain: "a.com".to_string(),
                date,
                country: "France".to_string(),
                share: 0.6,
            }],
        }
    }

    #[test]
    fn committed_facts_read_back() {
        let mut store = FactStore::open_in_memory().unwrap();
        let mut work = store.unit_of_work().unwrap();
        work.add_facts(&sample_facts()).unwrap();
        assert_eq!(work.commit().unwrap(), 4);

        assert_eq!(store.counts().unwrap(), (2, 1, 1));
        assert_eq!(store.visits().unwrap(), sample_facts().visits);
    }

    #[test]
    fn dropped_unit_of_work_rolls_back() {
        let mut store = FactStore::open_in_memory().unwrap();
        {
            let mut work = store.unit_of_work().unwrap();
            work.add_facts(&sample_facts()).unwrap();
        }
        assert_eq!(store.counts().unwrap(), (0, 0, 0));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut store = FactStore::open_in_memory().unwrap();
        let mut work = store.unit_of_work().unwrap();
        let fact = visit("a.com", ymd(2022, 12, 31), 1, 1);
        work.add_visit(&fact).unwrap();
        assert!(work.add_visit(&fact).is_err());
    }

    #[test]
    fn series_are_ordered_by_date() {
        let mut store = FactStore::open_in_memory().unwrap();
        let mut work = store.unit_of_work().unwrap();
        work.add_visit(&visit("b.com", ymd(2022, 12, 31), 30, 3)).unwrap();
        work.add_visit(&visit("b.com", ymd(2022, 10, 31), 10, 1)).unwrap();
        work.add_visit(&visit("a.com", ymd(2022, 11, 30), 20, 2)).unwrap();
        work.commit().unwrap();

        let values: Vec<(String, f64)> = store
            .visit_series(SeriesColumn::TotalVisits)
            .unwrap()
            .into_iter()
            .map(|p| (p.domain, p.value))
            .collect();
        assert_eq!(
            values,
            vec![
                ("b.com".to_string(), 10.0),
                ("a.com".to_string(), 20.0),
                ("b.com".to_string(), 30.0),
            ]
        );
        let ranks = store.visit_series(SeriesColumn::CategoryRank).unwrap();
        assert_eq!(ranks[0].value, 1.0);
    }
}
