//! Shared primitive types used across the analysis.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A simulated calendar year (e.g. 2025..=2125).
pub type Year = i32;

/// The identifier token shared by an `<id>_input.csv` / `<id>_output.csv` pair.
pub type BatchId = String;

/// A scenario identifier as read from the `Scenario` column.
///
/// Carried as text. Ordering is numeric when both sides are integers,
/// integers sort before anything else, and the rest is lexicographic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(String);

impl ScenarioId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn as_integer(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl Ord for ScenarioId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.as_integer(), other.as_integer()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ScenarioId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ScenarioId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<u32> for ScenarioId {
    fn from(raw: u32) -> Self {
        Self(raw.to_string())
    }
}
