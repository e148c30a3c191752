//! Output artifacts: the ranking CSV, the two CTE CSVs and the run summary.
//!
//! Every artifact is published atomically: the bytes go to a temporary file
//! next to the destination, are synced, then renamed over the final path.
//! Readers see either the previous file or the complete new one.

use crate::{
    error::{AnalysisError, AnalysisResult},
    ranking::RankingEntry,
    tail::YearlyTailExpectation,
    types::ScenarioId,
};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

pub const RANKING_FILE: &str = "scenarios_ranking.csv";
pub const CTE0_FILE: &str = "final_cte0.csv";
pub const CTE80_FILE: &str = "final_cte80.csv";
pub const SUMMARY_FILE: &str = "analysis_summary.json";

pub const RANKING_HEADER: [&str; 4] = ["Scenario", "DB+MB Total", "Rank", "Winner"];
pub const CTE_HEADER: [&str; 3] = ["Year", "DB Top-Ups", "MB Top-Ups"];

/// Shortest round-trip text, keeping `.0` on integral values.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

fn format_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "True" | "true" | "TRUE" | "1" => Some(true),
        "False" | "false" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Temp file beside `path`, unique per process and per call.
fn temp_path_for(parent: &Path, path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sequence = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    parent.join(format!(".{file_name}.tmp-{}-{sequence}", std::process::id()))
}

/// Write `bytes` to `path` via temp file + rename.
pub fn publish_atomic(path: &Path, bytes: &[u8]) -> AnalysisResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let temp_path = temp_path_for(&parent, path);

    let written = (|| -> std::io::Result<()> {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        AnalysisError::Io(e)
    })?;
    log::debug!("Published {}", path.display());
    Ok(())
}

fn csv_bytes<F>(header: &[&str], fill: F) -> AnalysisResult<Vec<u8>>
where
    F: FnOnce(&mut csv::Writer<Vec<u8>>) -> AnalysisResult<()>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    fill(&mut writer)?;
    writer
        .into_inner()
        .map_err(|e| AnalysisError::Io(e.into_error()))
}

/// Serialize the ranking in rank order.
pub fn ranking_csv(entries: &[RankingEntry]) -> AnalysisResult<Vec<u8>> {
    csv_bytes(&RANKING_HEADER, |writer| {
        for entry in entries {
            writer.write_record([
                entry.scenario_id.as_str(),
                format_float(entry.total).as_str(),
                entry.rank.to_string().as_str(),
                format_bool(entry.is_winner),
            ])?;
        }
        Ok(())
    })
}

/// Serialize a CTE table in year order.
pub fn tail_csv(rows: &[YearlyTailExpectation]) -> AnalysisResult<Vec<u8>> {
    csv_bytes(&CTE_HEADER, |writer| {
        for row in rows {
            writer.write_record([
                row.year.to_string(),
                format_float(row.mean_db_topup),
                format_float(row.mean_mb_topup),
            ])?;
        }
        Ok(())
    })
}

pub fn write_ranking(path: &Path, entries: &[RankingEntry]) -> AnalysisResult<()> {
    publish_atomic(path, &ranking_csv(entries)?)?;
    log::info!("Exported {} scenario(s) to {}", entries.len(), path.display());
    Ok(())
}

pub fn write_tail(path: &Path, rows: &[YearlyTailExpectation]) -> AnalysisResult<()> {
    publish_atomic(path, &tail_csv(rows)?)?;
    log::info!("Exported {} year(s) to {}", rows.len(), path.display());
    Ok(())
}

pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> AnalysisResult<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    publish_atomic(path, &bytes)
}

/// Read a ranking artifact back, in file order.
pub fn read_ranking(path: &Path) -> AnalysisResult<Vec<RankingEntry>> {
    let malformed = |reason: String| AnalysisError::RankingArtifact {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| malformed(format!("cannot open: {e}")))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}') == name)
            .ok_or_else(|| malformed(format!("missing column '{name}'")))
    };
    let scenario_col = column(RANKING_HEADER[0])?;
    let total_col = column(RANKING_HEADER[1])?;
    let rank_col = column(RANKING_HEADER[2])?;
    let winner_col = column(RANKING_HEADER[3])?;

    let mut entries = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result?;
        let field = |col: usize| record.get(col).unwrap_or_default();

        let total = field(total_col)
            .parse::<f64>()
            .map_err(|_| malformed(format!("line {line}: bad total '{}'", field(total_col))))?;
        let rank = field(rank_col)
            .parse::<usize>()
            .map_err(|_| malformed(format!("line {line}: bad rank '{}'", field(rank_col))))?;
        let is_winner = parse_bool(field(winner_col))
            .ok_or_else(|| malformed(format!("line {line}: bad winner flag '{}'", field(winner_col))))?;

        entries.push(RankingEntry {
            scenario_id: ScenarioId::new(field(scenario_col)),
            total,
            rank,
            is_winner,
        });
    }
    log::debug!("Read {} ranking row(s) from {}", entries.len(), path.display());
    Ok(entries)
}
