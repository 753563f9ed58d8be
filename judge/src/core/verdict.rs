//! Classification of test results and the submission-level aggregate

use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict of a single test or of a whole submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Accepted,
    Denied,
    Error,
}

impl Classification {
    /// Ranking used when aggregating; the highest severity wins
    fn severity(self) -> u8 {
        match self {
            Classification::Accepted => 0,
            Classification::Denied => 1,
            Classification::Error => 2,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::Accepted => "accepted",
            Classification::Denied => "denied",
            Classification::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Aggregate per-test classifications into the submission verdict.
///
/// `Error` outranks `Denied`, which outranks `Accepted`. An empty sequence is
/// `Accepted`; callers guarantee at least one graded test.
pub fn classify<I>(classifications: I) -> Classification
where
    I: IntoIterator<Item = Classification>,
{
    classifications
        .into_iter()
        .max_by_key(|c| c.severity())
        .unwrap_or(Classification::Accepted)
}
