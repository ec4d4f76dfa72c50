//! Month-end anchoring of snapshot dates.

use chrono::{Datelike, Months, NaiveDate};

use crate::error::FormatError;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%m/%d/%Y",
];

// Formats naming only a month; parsed with a day of 1 prepended.
const MONTH_FORMATS: &[&str] = &["%d %B %Y", "%d %b %Y", "%d %Y-%m"];

/// Parses the snapshot date as printed on the page ("December 2022",
/// "2022-12-15", "Dec 15, 2022", ...).
pub fn parse_date(date_repr: &str) -> Result<NaiveDate, FormatError> {
    let trimmed = date_repr.trim();
    if trimmed.is_empty() {
        return Err(FormatError::Empty);
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            let with_day = format!("1 {trimmed}");
            MONTH_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(&with_day, format).ok())
        })
        .ok_or_else(|| FormatError::NotADate(date_repr.to_string()))
}

/// Last calendar day of the month `date` falls in.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Month-end date of a raw snapshot date.
pub fn anchor_date(date_repr: &str) -> Result<NaiveDate, FormatError> {
    parse_date(date_repr).map(month_end)
}

/// Month-end date `months` calendar months before `anchor`.
pub fn months_before(anchor: NaiveDate, months: u32) -> Result<NaiveDate, FormatError> {
    anchor
        .checked_sub_months(Months::new(months))
        .map(month_end)
        .ok_or_else(|| FormatError::NotADate(format!("{anchor} minus {months} months")))
}
