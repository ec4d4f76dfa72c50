//! Expansion of a scraped [`Snapshot`] into dated, keyed fact records.
//!
//! Expansion is all-or-nothing: the first field that fails to normalize
//! aborts the whole snapshot and no facts are returned for it.

use chrono::NaiveDate;

use crate::calendar::{anchor_date, months_before};
use crate::error::FormatError;
use crate::fields::{as_float, as_int, as_seconds, optional};
use crate::model::{
    AgeShareFact, CountryShareFact, Snapshot, SnapshotFacts, VisitFact, AGE_BRACKETS,
    HISTORY_MONTHS, OTHERS_COUNTRY,
};

fn expect_len(field: &'static str, found: usize, expected: usize) -> Result<(), FormatError> {
    if found == expected {
        Ok(())
    } else {
        Err(FormatError::Cardinality {
            field,
            expected,
            found,
        })
    }
}

/// Monthly visit facts: two historical months (visits and category rank only)
/// followed by the snapshot's own month.
pub fn visit_facts(snapshot: &Snapshot, anchor: NaiveDate) -> Result<Vec<VisitFact>, FormatError> {
    expect_len(
        "category rank history",
        snapshot.past_category_ranks.len(),
        HISTORY_MONTHS,
    )?;
    expect_len(
        "total visits history",
        snapshot.past_total_visits.len(),
        HISTORY_MONTHS,
    )?;

    let mut facts = Vec::with_capacity(HISTORY_MONTHS);
    for ((months, category_rank), total_visits) in [2, 1]
        .into_iter()
        .zip(&snapshot.past_category_ranks)
        .zip(&snapshot.past_total_visits)
    {
        facts.push(VisitFact {
            domain: snapshot.domain.clone(),
            date: months_before(anchor, months)?,
            total_visits: as_int(total_visits)?,
            category_rank: *category_rank,
            global_rank: None,
            bounce_rate: None,
            avg_visit_duration: None,
        });
    }

    facts.push(VisitFact {
        domain: snapshot.domain.clone(),
        date: anchor,
        total_visits: as_int(&snapshot.total_visits)?,
        category_rank: snapshot.past_category_ranks[HISTORY_MONTHS - 1],
        global_rank: optional(&snapshot.global_rank, as_int)?,
        bounce_rate: optional(&snapshot.bounce_rate, as_float)?,
        avg_visit_duration: optional(&snapshot.avg_visit_duration, as_seconds)?,
    });
    Ok(facts)
}

/// Visit shares per age bracket. A page without demographics yields none.
pub fn age_share_facts(
    snapshot: &Snapshot,
    anchor: NaiveDate,
) -> Result<Vec<AgeShareFact>, FormatError> {
    if snapshot.age_distribution.is_empty() {
        return Ok(Vec::new());
    }
    expect_len(
        "age distribution",
        snapshot.age_distribution.len(),
        AGE_BRACKETS.len(),
    )?;

    AGE_BRACKETS
        .iter()
        .zip(&snapshot.age_distribution)
        .map(|(min_age, visits)| {
            Ok(AgeShareFact {
                domain: snapshot.domain.clone(),
                date: anchor,
                min_age: *min_age,
                visits: as_float(visits)?,
            })
        })
        .collect()
}

/// Visit shares per top country, without the "Others" bucket and without
/// renormalizing what's left.
pub fn country_share_facts(
    snapshot: &Snapshot,
    anchor: NaiveDate,
) -> Result<Vec<CountryShareFact>, FormatError> {
    snapshot
        .top_countries
        .iter()
        .filter(|(country, _)| country != OTHERS_COUNTRY)
        .map(|(country, share)| {
            Ok(CountryShareFact {
                domain: snapshot.domain.clone(),
                date: anchor,
                country: country.clone(),
                share: as_float(share)?,
            })
        })
        .collect()
}

/// Derives the snapshot's month-end date and all three fact streams.
pub fn expand(snapshot: &Snapshot) -> Result<SnapshotFacts, FormatError> {
    let anchor = anchor_date(&snapshot.date)?;
    Ok(SnapshotFacts {
        visits: visit_facts(snapshot, anchor)?,
        ages: age_share_facts(snapshot, anchor)?,
        countries: country_share_facts(snapshot, anchor)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn pitchbook() -> Snapshot {
        Snapshot {
            domain: "pitchbook.com".to_string(),
            date: "December 2022".to_string(),
            global_rank: "18,054".to_string(),
            total_visits: "2.5M".to_string(),
            bounce_rate: "36.03%".to_string(),
            avg_visit_duration: "00:04:08".to_string(),
            past_category_ranks: vec![47, 43, 51],
            past_total_visits: strings(&["2.8M", "3.0M", "2.5M"]),
            top_countries: [
                ("United States", "48.83%"),
                ("India", "8.87%"),
                ("United Kingdom", "6.66%"),
                ("Canada", "3.48%"),
                ("Germany", "2.29%"),
                ("Others", "29.88%"),
            ]
            .iter()
            .map(|(c, s)| (c.to_string(), s.to_string()))
            .collect(),
            age_distribution: strings(&["19.45%", "34.57%", "21.40%", "12.86%", "7.43%", "4.29%"]),
        }
    }

    #[test]
    fn visit_facts_cover_three_months() {
        let facts = expand(&pitchbook()).unwrap();
        let history = |date, total_visits, category_rank| VisitFact {
            domain: "pitchbook.com".to_string(),
            date,
            total_visits,
            category_rank,
            global_rank: None,
            bounce_rate: None,
            avg_visit_duration: None,
        };
        assert_eq!(
            facts.visits,
            vec![
                history(ymd(2022, 10, 31), 2_800_000, 47),
                history(ymd(2022, 11, 30), 3_000_000, 43),
                VisitFact {
                    domain: "pitchbook.com".to_string(),
                    date: ymd(2022, 12, 31),
                    total_visits: 2_500_000,
                    category_rank: 51,
                    global_rank: Some(18054),
                    bounce_rate: Some(0.3603),
                    avg_visit_duration: Some(248),
                },
            ]
        );
    }

    #[test]
    fn age_facts_follow_bracket_order() {
        let facts = expand(&pitchbook()).unwrap();
        let observed: Vec<(i64, f64)> = facts.ages.iter().map(|f| (f.min_age, f.visits)).collect();
        assert_eq!(
            observed,
            vec![
                (18, 0.1945),
                (25, 0.3457),
                (35, 0.2140),
                (45, 0.1286),
                (55, 0.0743),
                (65, 0.0429),
            ]
        );
        assert!(facts.ages.iter().all(|f| f.date == ymd(2022, 12, 31)));
    }

    #[test]
    fn country_facts_drop_others_anywhere() {
        let mut snapshot = pitchbook();
        snapshot.top_countries.rotate_right(1);
        let facts = expand(&snapshot).unwrap();
        let observed: Vec<(&str, f64)> = facts
            .countries
            .iter()
            .map(|f| (f.country.as_str(), f.share))
            .collect();
        assert_eq!(
            observed,
            vec![
                ("United States", 0.4883),
                ("India", 0.0887),
                ("United Kingdom", 0.0666),
                ("Canada", 0.0348),
                ("Germany", 0.0229),
            ]
        );
        let total: f64 = observed.iter().map(|(_, share)| share).sum();
        assert!(total < 1.0);
    }

    #[test]
    fn blank_optional_fields_stay_absent() {
        let mut snapshot = pitchbook();
        snapshot.global_rank.clear();
        snapshot.bounce_rate.clear();
        snapshot.avg_visit_duration.clear();
        snapshot.age_distribution.clear();
        snapshot.top_countries.clear();

        let facts = expand(&snapshot).unwrap();
        let current = &facts.visits[2];
        assert_eq!(current.global_rank, None);
        assert_eq!(current.bounce_rate, None);
        assert_eq!(current.avg_visit_duration, None);
        assert!(facts.ages.is_empty());
        assert!(facts.countries.is_empty());
        assert_eq!(facts.len(), 3);
    }

    #[test]
    fn any_bad_field_aborts_the_snapshot() {
        let mut under_threshold = pitchbook();
        under_threshold.past_total_visits[0] = "< 5K".to_string();

        let mut bad_country = pitchbook();
        bad_country.top_countries[4].1 = "lots".to_string();

        let mut missing_visits = pitchbook();
        missing_visits.total_visits.clear();

        let mut bad_date = pitchbook();
        bad_date.date = "someday".to_string();

        let mut bad_duration = pitchbook();
        bad_duration.avg_visit_duration = "4 min".to_string();

        for snapshot in [
            under_threshold,
            bad_country,
            missing_visits,
            bad_date,
            bad_duration,
        ] {
            assert!(expand(&snapshot).is_err());
        }
    }

    #[test]
    fn history_must_span_three_months() {
        let mut no_chart = pitchbook();
        no_chart.past_category_ranks.clear();
        assert_eq!(
            expand(&no_chart),
            Err(FormatError::Cardinality {
                field: "category rank history",
                expected: 3,
                found: 0,
            })
        );

        let mut short_ages = pitchbook();
        short_ages.age_distribution.pop();
        assert!(matches!(
            expand(&short_ages),
            Err(FormatError::Cardinality { .. })
        ));
    }
}
