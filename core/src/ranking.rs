//! Scenario ranking and winner selection.
//!
//! Rank 1 is the most negative total. Ties on total fall back to
//! ascending `ScenarioId` so the same input always ranks the same way.
//! NaN totals rank after everything else whatever their sign bit.

use crate::{
    aggregate::ScenarioAggregate,
    error::{AnalysisError, AnalysisResult},
    types::ScenarioId,
};
use serde::Serialize;
use std::collections::BTreeSet;

pub const DEFAULT_WINNER_FRACTION: f64 = 0.2;

/// One row of the ranking artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub scenario_id: ScenarioId,
    pub total:       f64,
    pub rank:        usize,
    pub is_winner:   bool,
}

/// Rank-ordered entries for every scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub entries:         Vec<RankingEntry>,
    pub winner_fraction: f64,
}

impl Ranking {
    pub fn winner_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_winner).count()
    }

    pub fn winners(&self) -> BTreeSet<ScenarioId> {
        winner_ids(&self.entries)
    }
}

/// Scenario ids flagged as winners.
pub fn winner_ids(entries: &[RankingEntry]) -> BTreeSet<ScenarioId> {
    entries
        .iter()
        .filter(|e| e.is_winner)
        .map(|e| e.scenario_id.clone())
        .collect()
}

/// Reject fractions outside (0, 1].
pub fn validate_winner_fraction(fraction: f64) -> AnalysisResult<f64> {
    if fraction.is_finite() && fraction > 0.0 && fraction <= 1.0 {
        Ok(fraction)
    } else {
        Err(AnalysisError::InvalidWinnerFraction(fraction))
    }
}

/// `max(1, floor(n * fraction))`, never more than `n`.
pub fn winner_count(n: usize, fraction: f64) -> usize {
    let floor = (n as f64 * fraction).floor() as usize;
    floor.max(1).min(n)
}

/// Sort ascending by total, assign ranks 1..=N and flag the winners.
pub fn rank_scenarios(aggregates: &[ScenarioAggregate], winner_fraction: f64) -> AnalysisResult<Ranking> {
    let winner_fraction = validate_winner_fraction(winner_fraction)?;
    if aggregates.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }

    let mut ordered: Vec<&ScenarioAggregate> = aggregates.iter().collect();
    ordered.sort_by(|a, b| {
        a.total
            .is_nan()
            .cmp(&b.total.is_nan())
            .then_with(|| a.total.total_cmp(&b.total))
            .then_with(|| a.scenario_id.cmp(&b.scenario_id))
    });

    let winners = winner_count(ordered.len(), winner_fraction);
    let entries: Vec<RankingEntry> = ordered
        .into_iter()
        .enumerate()
        .map(|(idx, agg)| RankingEntry {
            scenario_id: agg.scenario_id.clone(),
            total: agg.total,
            rank: idx + 1,
            is_winner: idx < winners,
        })
        .collect();

    log::info!(
        "Ranked {} scenario(s); top {} at fraction {} are winners",
        entries.len(),
        winners,
        winner_fraction
    );
    for entry in entries.iter().filter(|e| e.is_winner) {
        log::debug!("rank: winner {} rank={} total={:.6}", entry.scenario_id, entry.rank, entry.total);
    }

    Ok(Ranking { entries, winner_fraction })
}
