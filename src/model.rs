use chrono::NaiveDate;

/// Visitor age brackets, by minimum age, in the order pages list them.
pub const AGE_BRACKETS: [i64; 6] = [18, 25, 35, 45, 55, 65];

/// Number of monthly points in the rank and visits histories.
pub const HISTORY_MONTHS: usize = 3;

/// Aggregate country bucket that is never stored.
pub const OTHERS_COUNTRY: &str = "Others";

/// One scraped analytics page for one domain.
///
/// Every scalar is the literal text found on the page; an empty string means
/// the page didn't show it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub domain: String,
    pub date: String,
    pub global_rank: String,
    pub total_visits: String,
    pub bounce_rate: String,
    pub avg_visit_duration: String,
    /// Chart-decoded category ranks: two months ago, last month, current.
    pub past_category_ranks: Vec<i64>,
    /// Total visits texts: two months ago, last month, current.
    pub past_total_visits: Vec<String>,
    /// `(country, share)` pairs, usually ending with the "Others" bucket.
    pub top_countries: Vec<(String, String)>,
    /// Visit shares aligned with [`AGE_BRACKETS`].
    pub age_distribution: Vec<String>,
}

/// Visit statistics of a domain for one month.
///
/// Only the snapshot's own month carries the global rank, bounce rate and
/// visit duration.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitFact {
    pub domain: String,
    pub date: NaiveDate,
    pub total_visits: i64,
    pub category_rank: i64,
    pub global_rank: Option<i64>,
    pub bounce_rate: Option<f64>,
    /// Seconds.
    pub avg_visit_duration: Option<i64>,
}

/// Share of a domain's visits coming from one age bracket.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeShareFact {
    pub domain: String,
    pub date: NaiveDate,
    pub min_age: i64,
    pub visits: f64,
}

/// Share of a domain's visits coming from one country.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryShareFact {
    pub domain: String,
    pub date: NaiveDate,
    pub country: String,
    pub share: f64,
}

/// Every fact derived from a single snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotFacts {
    pub visits: Vec<VisitFact>,
    pub ages: Vec<AgeShareFact>,
    pub countries: Vec<CountryShareFact>,
}

impl SnapshotFacts {
    pub fn len(&self) -> usize {
        self.visits.len() + self.ages.len() + self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
