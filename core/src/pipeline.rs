//! The analysis pipeline.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   1. Load:      pair files, decode records, collect warnings
//!   2. Aggregate: one total per scenario
//!   3. Rank:      order by total, flag winners, publish ranking
//!   4. CTE0:      per-year means over all scenarios, publish
//!   5. CTE80:     per-year means over winners only, publish
//!
//! RULES:
//!   - Recoverable loader errors are carried as warnings, never fatal.
//!   - A failing stage stops the run before any artifact is written.
//!   - Every artifact is published atomically.

use crate::{
    aggregate::aggregate_scenarios,
    artifact,
    config::AnalysisConfig,
    error::{AnalysisError, PipelineResult, Stage, StageContext},
    loader::{load_records, LoadedRecords},
    ranking::{rank_scenarios, winner_ids, Ranking},
    report::AnalysisSummary,
    tail::{tail_expectation, ScenarioSelection, YearlyTailExpectation},
};
use std::path::Path;

/// In-memory results of a full run.
#[derive(Debug)]
pub struct AnalysisRun {
    pub loaded:  LoadedRecords,
    pub ranking: Ranking,
    pub cte0:    Vec<YearlyTailExpectation>,
    pub cte80:   Vec<YearlyTailExpectation>,
    pub summary: AnalysisSummary,
}

fn load(input_dir: &Path) -> PipelineResult<LoadedRecords> {
    log::info!("Loading scenario results from {}", input_dir.display());
    load_records(input_dir).stage(Stage::Load)
}

fn rank(loaded: &LoadedRecords, winner_fraction: f64) -> PipelineResult<Ranking> {
    let aggregates = aggregate_scenarios(&loaded.records);
    rank_scenarios(&aggregates, winner_fraction).stage(Stage::Rank)
}

/// Compute every result without touching the export directory.
pub fn analyse(input_dir: &Path, winner_fraction: f64) -> PipelineResult<AnalysisRun> {
    crate::ranking::validate_winner_fraction(winner_fraction).stage(Stage::Config)?;

    let loaded = load(input_dir)?;
    let ranking = rank(&loaded, winner_fraction)?;
    let cte0 = tail_expectation(&loaded.records, &ScenarioSelection::All).stage(Stage::Cte0)?;
    let cte80 = tail_expectation(&loaded.records, &ScenarioSelection::Winners(ranking.winners()))
        .stage(Stage::Cte80)?;

    let summary = AnalysisSummary::new(
        loaded.pairs_loaded,
        loaded.records.len(),
        &ranking,
        &cte0,
        &cte80,
        loaded.warnings.iter().map(ToString::to_string).collect(),
    );
    Ok(AnalysisRun { loaded, ranking, cte0, cte80, summary })
}

/// Full run: every stage, every artifact, plus the summary.
///
/// All results are computed by `analyse` first, so a failing stage
/// leaves the export directory untouched.
pub fn run_all(config: &AnalysisConfig) -> PipelineResult<AnalysisRun> {
    config.validate().stage(Stage::Config)?;
    log::info!("Starting analysis pipeline");

    let run = analyse(&config.input_dir, config.winner_fraction)?;
    publish(config, &run)?;

    log::info!(
        "Pipeline complete: {} scenario(s), {} winner(s), {} warning(s)",
        run.ranking.entries.len(),
        run.ranking.winner_count(),
        run.summary.warnings.len()
    );
    Ok(run)
}

fn publish(config: &AnalysisConfig, run: &AnalysisRun) -> PipelineResult<()> {
    artifact::write_ranking(&config.ranking_path(), &run.ranking.entries).stage(Stage::Publish)?;
    artifact::write_tail(&config.cte0_path(), &run.cte0).stage(Stage::Publish)?;
    artifact::write_tail(&config.cte80_path(), &run.cte80).stage(Stage::Publish)?;
    artifact::write_json(&config.summary_path(), &run.summary).stage(Stage::Publish)
}

/// Load, aggregate, rank and publish the ranking artifact only.
pub fn run_ranking(config: &AnalysisConfig) -> PipelineResult<Ranking> {
    config.validate().stage(Stage::Config)?;
    let loaded = load(&config.input_dir)?;
    let ranking = rank(&loaded, config.winner_fraction)?;
    artifact::write_ranking(&config.ranking_path(), &ranking.entries).stage(Stage::Publish)?;
    Ok(ranking)
}

/// Load and publish the all-scenario tail expectation only.
pub fn run_cte0(config: &AnalysisConfig) -> PipelineResult<Vec<YearlyTailExpectation>> {
    let loaded = load(&config.input_dir)?;
    let cte0 = tail_expectation(&loaded.records, &ScenarioSelection::All).stage(Stage::Cte0)?;
    artifact::write_tail(&config.cte0_path(), &cte0).stage(Stage::Publish)?;
    Ok(cte0)
}

/// Read winners back from a published ranking artifact, then publish
/// the winner-only tail expectation.
pub fn run_cte80(config: &AnalysisConfig, ranking_file: &Path) -> PipelineResult<Vec<YearlyTailExpectation>> {
    log::info!("Loading ranking file from {}", ranking_file.display());
    let entries = artifact::read_ranking(ranking_file).stage(Stage::Cte80)?;
    let winners = winner_ids(&entries);
    if winners.is_empty() {
        log::error!("No winner scenarios in {}", ranking_file.display());
        return Err(AnalysisError::NoWinners).stage(Stage::Cte80);
    }
    log::info!("Found {} winner scenario(s)", winners.len());

    let loaded = load(&config.input_dir)?;
    let cte80 = tail_expectation(&loaded.records, &ScenarioSelection::Winners(winners)).stage(Stage::Cte80)?;
    artifact::write_tail(&config.cte80_path(), &cte80).stage(Stage::Publish)?;
    Ok(cte80)
}
