use thiserror::Error;

/// The one error kind raised while turning scraped strings into facts.
///
/// Variants only say *why* a value was rejected; callers treat every one of
/// them the same way (the snapshot or chart being processed is unusable).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("value is empty")]
    Empty,

    #[error("{0:?} is below the reporting threshold")]
    UnderThreshold(String),

    #[error("{0:?} doesn't represent a number")]
    NotANumber(String),

    #[error("{0:?} doesn't represent a duration")]
    NotADuration(String),

    #[error("{0:?} doesn't represent a date")]
    NotADate(String),

    #[error("invalid chart geometry: {0}")]
    Chart(String),

    #[error("expected {expected} {field} values, found {found}")]
    Cardinality {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("malformed literal at offset {offset}: {reason}")]
    Literal { offset: usize, reason: String },
}
