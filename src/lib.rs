pub mod args;
pub mod calendar;
pub mod chart;
pub mod domain;
pub mod error;
pub mod extract;
pub mod fields;
pub mod interchange;
pub mod literal;
pub mod model;
pub mod rank;
pub mod snapshot;
pub mod sqlite;
pub mod utils;
pub mod workflow;

pub use args::{Args, Command};
pub use chart::{ChartDecoder, ChartGeometry, HighchartsDecoder};
pub use error::FormatError;
pub use model::{AgeShareFact, CountryShareFact, Snapshot, SnapshotFacts, VisitFact};
pub use snapshot::expand;
pub use sqlite::{FactStore, UnitOfWork};
