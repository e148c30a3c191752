//! Per-scenario aggregation of db + mb top-ups.

use crate::{loader::ScenarioRecord, types::ScenarioId};
use serde::Serialize;
use std::collections::BTreeMap;

/// One row per scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioAggregate {
    pub scenario_id:  ScenarioId,
    /// Sum of db_topup + mb_topup over every year of every permutation.
    /// NaN or infinite inputs propagate into the total unchanged.
    pub total:        f64,
    pub permutations: usize,
}

/// Group records by scenario and sum their combined top-ups.
///
/// Output is ordered by `ScenarioId`; callers needing rank order use
/// `ranking::rank_scenarios`.
pub fn aggregate_scenarios(records: &[ScenarioRecord]) -> Vec<ScenarioAggregate> {
    let mut totals: BTreeMap<&ScenarioId, (f64, usize)> = BTreeMap::new();

    for record in records {
        let permutation_total = record.total();
        let slot = totals.entry(&record.scenario_id).or_insert((0.0, 0));
        slot.0 += permutation_total;
        slot.1 += 1;
        log::debug!(
            "aggregate: scenario {} permutation {} combined={:.6} running={:.6}",
            record.scenario_id,
            record.permutation_id,
            permutation_total,
            slot.0
        );
    }

    log::info!(
        "Aggregation complete: {} record(s) across {} scenario(s)",
        records.len(),
        totals.len()
    );

    totals
        .into_iter()
        .map(|(scenario_id, (total, permutations))| ScenarioAggregate {
            scenario_id: scenario_id.clone(),
            total,
            permutations,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::YearlyEntry;
    use std::collections::BTreeMap;

    fn record(scenario: &str, permutation: u32, years: &[(i32, f64, f64)]) -> ScenarioRecord {
        ScenarioRecord {
            scenario_id: scenario.into(),
            permutation_id: permutation,
            batch_id: "unit".into(),
            attributes: BTreeMap::new(),
            yearly_entries: years
                .iter()
                .map(|&(year, db_topup, mb_topup)| YearlyEntry { year, db_topup, mb_topup })
                .collect(),
        }
    }

    #[test]
    fn sums_every_permutation_of_a_scenario() {
        let aggregates = aggregate_scenarios(&[
            record("2", 0, &[(2025, 1.0, 0.5)]),
            record("1", 0, &[(2025, -10.0, 0.0), (2026, -5.0, 0.0)]),
            record("2", 1, &[(2025, 0.5, 0.0)]),
        ]);
        let totals: Vec<(&str, f64, usize)> = aggregates
            .iter()
            .map(|a| (a.scenario_id.as_str(), a.total, a.permutations))
            .collect();
        assert_eq!(totals, vec![("1", -15.0, 1), ("2", 2.0, 2)]);
    }

    #[test]
    fn non_finite_values_propagate_into_the_total() {
        let aggregates = aggregate_scenarios(&[
            record("1", 0, &[(2025, f64::NAN, 0.0)]),
            record("1", 1, &[(2025, -3.0, 0.0)]),
            record("2", 0, &[(2025, f64::INFINITY, 0.0), (2026, f64::NEG_INFINITY, 0.0)]),
            record("3", 0, &[(2025, f64::INFINITY, 1.0)]),
        ]);
        assert!(aggregates[0].total.is_nan());
        assert!(aggregates[1].total.is_nan(), "inf + -inf is NaN");
        assert_eq!(aggregates[2].total, f64::INFINITY);
    }
}
