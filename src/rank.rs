//! Relative growth ranking of the stored domains.

use anyhow::Result;
use std::collections::BTreeMap;

use crate::sqlite::{FactStore, SeriesColumn, SeriesPoint};

#[derive(Debug, Clone, PartialEq)]
pub struct DomainRank {
    pub domain: String,
    /// Share of the total relative growth, rounded to 2 decimals.
    pub score: f64,
}

/// Sum of the month-on-month relative changes of each domain's series.
///
/// Points must be ordered by date. A change from zero is skipped.
pub fn summed_changes(points: &[SeriesPoint]) -> BTreeMap<String, f64> {
    let mut previous: BTreeMap<&str, f64> = BTreeMap::new();
    let mut sums: BTreeMap<String, f64> = BTreeMap::new();

    for point in points {
        let sum = sums.entry(point.domain.clone()).or_insert(0.0);
        if let Some(before) = previous.insert(point.domain.as_str(), point.value) {
            if before != 0.0 {
                *sum += (point.value - before) / before;
            }
        }
    }
    sums
}

/// Min-max normalizes growth values, then scales them to sum to one.
///
/// With no spread between domains every domain gets an equal share.
pub fn relative_growth(growth: &BTreeMap<String, f64>) -> Vec<DomainRank> {
    if growth.is_empty() {
        return Vec::new();
    }

    let min = growth.values().copied().fold(f64::INFINITY, f64::min);
    let max = growth.values().copied().fold(f64::NEG_INFINITY, f64::max);
    let interval = max - min;

    let normalized: Vec<(&String, f64)> = growth
        .iter()
        .map(|(domain, value)| {
            let relative = if interval > 0.0 {
                (value - min) / interval
            } else {
                1.0
            };
            (domain, relative)
        })
        .collect();
    let total: f64 = normalized.iter().map(|(_, relative)| relative).sum();

    let mut ranks: Vec<DomainRank> = normalized
        .into_iter()
        .map(|(domain, relative)| DomainRank {
            domain: domain.clone(),
            score: ((relative / total) * 100.0).round() / 100.0,
        })
        .collect();
    ranks.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.domain.cmp(&b.domain)));
    ranks
}

/// Ranks domains by the combined growth of their total visits and category
/// rank series.
pub fn rank_websites(store: &FactStore) -> Result<Vec<DomainRank>> {
    let visits = summed_changes(&store.visit_series(SeriesColumn::TotalVisits)?);
    let category_ranks = summed_changes(&store.visit_series(SeriesColumn::CategoryRank)?);

    let mut growth = visits;
    for (domain, change) in category_ranks {
        *growth.entry(domain).or_insert(0.0) += change;
    }
    Ok(relative_growth(&growth))
}
