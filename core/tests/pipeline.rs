//! End-to-end pipeline tests: load, rank, CTE0, CTE80, publish.

mod common;

use common::{assert_close, row, write_input, write_pair, write_two_scenarios};
use scenario_core::{
    artifact::{self, CTE0_FILE, CTE80_FILE, RANKING_FILE, SUMMARY_FILE},
    config::AnalysisConfig,
    error::{AnalysisError, Stage},
    pipeline,
    report::AnalysisSummary,
};
use std::fs;
use tempfile::tempdir;

fn config_for(input: &std::path::Path, export: &std::path::Path, fraction: f64) -> AnalysisConfig {
    AnalysisConfig {
        input_dir: input.to_path_buf(),
        export_dir: export.to_path_buf(),
        winner_fraction: fraction,
    }
}

/// Two scenarios, one permutation each, two years, half are winners.
#[test]
fn two_scenario_run_matches_hand_computed_values() {
    let input = tempdir().unwrap();
    let export = tempdir().unwrap();
    write_two_scenarios(input.path());

    let run = pipeline::run_all(&config_for(input.path(), export.path(), 0.5)).unwrap();

    let ranking: Vec<(&str, usize, bool)> = run
        .ranking
        .entries
        .iter()
        .map(|e| (e.scenario_id.as_str(), e.rank, e.is_winner))
        .collect();
    assert_eq!(ranking, vec![("1", 1, true), ("2", 2, false)]);
    assert_close(run.ranking.entries[0].total, -15.0, "scenario A total");
    assert_close(run.ranking.entries[1].total, 3.0, "scenario B total");

    assert_eq!(run.cte0.len(), 2);
    assert_close(run.cte0[0].mean_db_topup, -4.0, "CTE0 2025");
    assert_close(run.cte0[1].mean_db_topup, -2.0, "CTE0 2026");

    assert_eq!(run.cte80.len(), 2);
    assert_close(run.cte80[0].mean_db_topup, -10.0, "CTE80 2025");
    assert_close(run.cte80[1].mean_db_topup, -5.0, "CTE80 2026");
}

#[test]
fn artifacts_are_written_with_expected_layout() {
    let input = tempdir().unwrap();
    let export = tempdir().unwrap();
    write_two_scenarios(input.path());

    pipeline::run_all(&config_for(input.path(), export.path(), 0.5)).unwrap();

    let ranking = fs::read_to_string(export.path().join(RANKING_FILE)).unwrap();
    assert_eq!(
        ranking,
        "Scenario,DB+MB Total,Rank,Winner\n1,-15.0,1,True\n2,3.0,2,False\n"
    );

    let cte0 = fs::read_to_string(export.path().join(CTE0_FILE)).unwrap();
    assert_eq!(cte0, "Year,DB Top-Ups,MB Top-Ups\n2025,-4.0,0.0\n2026,-2.0,0.0\n");

    let cte80 = fs::read_to_string(export.path().join(CTE80_FILE)).unwrap();
    assert_eq!(cte80, "Year,DB Top-Ups,MB Top-Ups\n2025,-10.0,0.0\n2026,-5.0,0.0\n");

    let summary: AnalysisSummary =
        serde_json::from_str(&fs::read_to_string(export.path().join(SUMMARY_FILE)).unwrap()).unwrap();
    assert_eq!(summary.scenarios, 2);
    assert_eq!(summary.records, 2);
    assert_eq!(summary.winners.len(), 1);
    assert_eq!(summary.cte0_years.map(|s| (s.first, s.last)), Some((2025, 2026)));

    let leftovers: Vec<_> = fs::read_dir(export.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
        .collect();
    assert!(leftovers.is_empty(), "temporary files left behind: {leftovers:?}");
}

/// An id with only an input file is skipped and reported, not fatal.
#[test]
fn missing_pair_is_excluded_and_reported() {
    let input = tempdir().unwrap();
    let export = tempdir().unwrap();
    write_two_scenarios(input.path());
    write_input(input.path(), "orphan", &["3"]);

    let run = pipeline::run_all(&config_for(input.path(), export.path(), 0.5)).unwrap();

    assert!(run.ranking.entries.iter().all(|e| e.scenario_id.as_str() != "3"));
    assert!(run
        .loaded
        .warnings
        .iter()
        .any(|w| matches!(w, AnalysisError::MissingPair { id, .. } if id == "orphan")));
    assert_eq!(run.summary.warnings.len(), 1);
}

#[test]
fn empty_directory_fails_in_load_stage_without_artifacts() {
    let input = tempdir().unwrap();
    let export = tempdir().unwrap();

    let err = pipeline::run_all(&config_for(input.path(), export.path(), 0.2)).unwrap_err();

    assert_eq!(err.stage, Stage::Load);
    assert!(matches!(err.source, AnalysisError::NoResults { .. }));
    assert!(err.to_string().starts_with("load stage failed"));
    assert!(!export.path().join(RANKING_FILE).exists());
}

#[test]
fn invalid_fraction_fails_before_loading() {
    let input = tempdir().unwrap();
    let export = tempdir().unwrap();
    write_two_scenarios(input.path());

    let err = pipeline::run_all(&config_for(input.path(), export.path(), 1.5)).unwrap_err();
    assert_eq!(err.stage, Stage::Config);
    assert!(matches!(err.source, AnalysisError::InvalidWinnerFraction(_)));
}

/// The standalone CTE80 step reads winners back from the ranking file.
#[test]
fn cte80_step_uses_published_ranking() {
    let input = tempdir().unwrap();
    let export = tempdir().unwrap();
    write_two_scenarios(input.path());
    let config = config_for(input.path(), export.path(), 0.5);

    pipeline::run_ranking(&config).unwrap();
    let rows = pipeline::run_cte80(&config, &config.ranking_path()).unwrap();

    assert_close(rows[0].mean_db_topup, -10.0, "CTE80 2025");
    assert!(export.path().join(CTE80_FILE).exists());
    assert!(!export.path().join(CTE0_FILE).exists(), "cte80 step must not write cte0");
}

#[test]
fn cte80_step_without_winners_names_the_ranking_artifact() {
    let input = tempdir().unwrap();
    let export = tempdir().unwrap();
    write_two_scenarios(input.path());
    let config = config_for(input.path(), export.path(), 0.5);

    let ranking_path = export.path().join(RANKING_FILE);
    fs::write(&ranking_path, "Scenario,DB+MB Total,Rank,Winner\n1,-15.0,1,False\n2,3.0,2,False\n").unwrap();

    let err = pipeline::run_cte80(&config, &ranking_path).unwrap_err();
    assert_eq!(err.stage, Stage::Cte80);
    assert!(matches!(err.source, AnalysisError::NoWinners));
    assert!(err.to_string().contains("check the ranking artifact"));
    assert!(!export.path().join(CTE80_FILE).exists());
}

#[test]
fn cte80_step_rejects_malformed_ranking() {
    let input = tempdir().unwrap();
    let export = tempdir().unwrap();
    write_two_scenarios(input.path());
    let config = config_for(input.path(), export.path(), 0.5);

    let ranking_path = export.path().join(RANKING_FILE);
    fs::write(&ranking_path, "Scenario,Rank\n1,1\n").unwrap();

    let err = pipeline::run_cte80(&config, &ranking_path).unwrap_err();
    assert!(matches!(err.source, AnalysisError::RankingArtifact { .. }));
}

#[test]
fn cte0_step_writes_only_cte0() {
    let input = tempdir().unwrap();
    let export = tempdir().unwrap();
    write_two_scenarios(input.path());

    let rows = pipeline::run_cte0(&config_for(input.path(), export.path(), 0.2)).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(export.path().join(CTE0_FILE).exists());
    assert!(!export.path().join(RANKING_FILE).exists());
}

/// Published ranking round-trips through the reader.
#[test]
fn ranking_artifact_reads_back() {
    let input = tempdir().unwrap();
    let export = tempdir().unwrap();
    write_pair(
        input.path(),
        "batch",
        &[
            row("4", &[(2025, 1.0, 1.0)]),
            row("5", &[(2025, -1.0, -1.0)]),
            row("6", &[(2025, 0.0, 0.5)]),
        ],
    );
    let config = config_for(input.path(), export.path(), 0.2);

    let ranking = pipeline::run_ranking(&config).unwrap();
    let read_back = artifact::read_ranking(&config.ranking_path()).unwrap();
    assert_eq!(read_back, ranking.entries);
}

#[test]
fn analyse_does_not_touch_the_filesystem_outputs() {
    let input = tempdir().unwrap();
    write_two_scenarios(input.path());

    let run = pipeline::analyse(input.path(), 0.5).unwrap();
    assert_eq!(run.ranking.winner_count(), 1);
    assert_eq!(run.cte0.len(), 2);
    let files: Vec<_> = fs::read_dir(input.path()).unwrap().collect();
    assert_eq!(files.len(), 2, "only the fixture pair should exist");
}

#[test]
fn full_run_publishes_what_analyse_computes() {
    let input = tempdir().unwrap();
    let export = tempdir().unwrap();
    write_two_scenarios(input.path());
    let config = config_for(input.path(), export.path(), 0.5);

    let computed = pipeline::analyse(input.path(), 0.5).unwrap();
    let run = pipeline::run_all(&config).unwrap();

    assert_eq!(run.ranking, computed.ranking);
    assert_eq!(run.cte0, computed.cte0);
    assert_eq!(run.cte80, computed.cte80);
    assert_eq!(artifact::read_ranking(&config.ranking_path()).unwrap(), computed.ranking.entries);
    assert_eq!(
        fs::read(config.cte80_path()).unwrap(),
        artifact::tail_csv(&computed.cte80).unwrap()
    );
}
