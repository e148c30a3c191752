//! Conditional tail expectation: per-year means of db and mb top-ups
//! over a selected set of scenarios.
//!
//! The mean for a year divides by the number of included records that
//! actually carry that year. A record missing a year does not count
//! toward that year's denominator.

use crate::{
    error::{AnalysisError, AnalysisResult},
    loader::ScenarioRecord,
    types::{ScenarioId, Year},
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Which scenarios feed a tail expectation.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioSelection {
    /// Every scenario present in the records (CTE0).
    All,
    /// Only the winner scenarios of a ranking (CTE80).
    Winners(BTreeSet<ScenarioId>),
}

impl ScenarioSelection {
    pub fn label(&self) -> &'static str {
        match self {
            ScenarioSelection::All        => "all",
            ScenarioSelection::Winners(_) => "winner",
        }
    }

    fn includes(&self, scenario: &ScenarioId) -> bool {
        match self {
            ScenarioSelection::All => true,
            ScenarioSelection::Winners(ids) => ids.contains(scenario),
        }
    }
}

/// One row of a CTE artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyTailExpectation {
    pub year:          Year,
    pub mean_db_topup: f64,
    pub mean_mb_topup: f64,
    /// Records that supplied this year.
    pub contributors:  usize,
}

#[derive(Default)]
struct YearAccumulator {
    db:    f64,
    mb:    f64,
    count: usize,
}

/// Mean db and mb top-ups per year over the selected scenarios,
/// ascending by year.
pub fn tail_expectation(
    records: &[ScenarioRecord],
    selection: &ScenarioSelection,
) -> AnalysisResult<Vec<YearlyTailExpectation>> {
    if let ScenarioSelection::Winners(ids) = selection {
        if ids.is_empty() {
            return Err(AnalysisError::NoWinners);
        }
    }

    let mut years: BTreeMap<Year, YearAccumulator> = BTreeMap::new();
    let mut included = 0usize;

    for record in records.iter().filter(|r| selection.includes(&r.scenario_id)) {
        included += 1;
        for entry in &record.yearly_entries {
            let acc = years.entry(entry.year).or_default();
            acc.db += entry.db_topup;
            acc.mb += entry.mb_topup;
            acc.count += 1;
        }
    }

    if included == 0 {
        return Err(AnalysisError::EmptySelection { selection: selection.label() });
    }

    let rows: Vec<YearlyTailExpectation> = years
        .into_iter()
        .map(|(year, acc)| {
            let n = acc.count as f64;
            YearlyTailExpectation {
                year,
                mean_db_topup: acc.db / n,
                mean_mb_topup: acc.mb / n,
                contributors: acc.count,
            }
        })
        .collect();

    for row in &rows {
        log::debug!(
            "tail[{}]: year {} db={:.6} mb={:.6} from {} record(s)",
            selection.label(),
            row.year,
            row.mean_db_topup,
            row.mean_mb_topup,
            row.contributors
        );
    }
    log::info!(
        "Tail expectation over {} scenario(s): {} record(s), {} year(s)",
        selection.label(),
        included,
        rows.len()
    );

    Ok(rows)
}

/// First and last year covered, if any.
pub fn year_range(rows: &[YearlyTailExpectation]) -> Option<(Year, Year)> {
    Some((rows.first()?.year, rows.last()?.year))
}
