//! Run summary written next to the CSV artifacts.

use crate::{
    ranking::Ranking,
    tail::{year_range, YearlyTailExpectation},
    types::{ScenarioId, Year},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSpan {
    pub first: Year,
    pub last:  Year,
    pub years: usize,
}

impl YearSpan {
    pub fn of(rows: &[YearlyTailExpectation]) -> Option<Self> {
        year_range(rows).map(|(first, last)| Self { first, last, years: rows.len() })
    }
}

/// Everything a reader needs to judge a run without opening the CSVs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub generated_at:     DateTime<Utc>,
    pub winner_fraction:  f64,
    pub pairs_loaded:     usize,
    pub records:          usize,
    pub scenarios:        usize,
    pub winners:          Vec<ScenarioId>,
    pub cte0_years:       Option<YearSpan>,
    pub cte80_years:      Option<YearSpan>,
    pub warnings:         Vec<String>,
}

impl AnalysisSummary {
    pub fn new(
        pairs_loaded: usize,
        records: usize,
        ranking: &Ranking,
        cte0: &[YearlyTailExpectation],
        cte80: &[YearlyTailExpectation],
        warnings: Vec<String>,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            winner_fraction: ranking.winner_fraction,
            pairs_loaded,
            records,
            scenarios: ranking.entries.len(),
            winners: ranking.winners().into_iter().collect(),
            cte0_years: YearSpan::of(cte0),
            cte80_years: YearSpan::of(cte80),
            warnings,
        }
    }
}
