//! Record loader: turns a directory of UUID-paired batch files into
//! one `ScenarioRecord` per scenario/permutation.
//!
//! RULES:
//!   - `<id>_input.csv` pairs with `<id>_output.csv`; anything else is ignored.
//!   - Pairs are read in ascending id order, rows in file order.
//!   - A bad pair or a bad row is a warning, never an abort.
//!   - A (scenario, permutation) identity loads at most once; repeats are
//!     malformed records.
//!   - Zero usable records across the whole directory is fatal.

use crate::{
    error::{AnalysisError, AnalysisResult},
    payload::{decode_yearly_report, YearlyEntry},
    types::{BatchId, ScenarioId, Year},
};
use csv::StringRecord;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};

pub const INPUT_SUFFIX: &str = "_input.csv";
pub const OUTPUT_SUFFIX: &str = "_output.csv";

pub const SCENARIO_COLUMN: &str = "Scenario";
pub const PERMUTATION_COLUMN: &str = "Permutation";
pub const YEARLY_REPORT_COLUMN: &str = "YearlyReport";

/// One permutation of one scenario, with its full yearly series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioRecord {
    pub scenario_id:    ScenarioId,
    pub permutation_id: u32,
    pub batch_id:       BatchId,
    /// Remaining input columns (TaxType, Gender, IssueAge, ...).
    pub attributes:     BTreeMap<String, String>,
    /// Never empty, ascending by year, no repeated year.
    pub yearly_entries: Vec<YearlyEntry>,
}

impl ScenarioRecord {
    /// Sum of db + mb top-ups over every year of this permutation.
    pub fn total(&self) -> f64 {
        self.yearly_entries.iter().map(YearlyEntry::combined).sum()
    }

    pub fn entry_for(&self, year: Year) -> Option<&YearlyEntry> {
        self.yearly_entries
            .binary_search_by_key(&year, |e| e.year)
            .ok()
            .map(|idx| &self.yearly_entries[idx])
    }
}

/// Input and output file sharing one identifier token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePair {
    pub id:     BatchId,
    pub input:  PathBuf,
    pub output: PathBuf,
}

/// Result of pairing a directory listing.
#[derive(Debug, Default)]
pub struct FilePairing {
    /// Complete pairs, ascending by id.
    pub pairs:   Vec<FilePair>,
    /// One `MissingPair` per id that has only one of its two files.
    pub missing: Vec<AnalysisError>,
}

/// Everything the loader produced for one directory.
#[derive(Debug)]
pub struct LoadedRecords {
    pub records:      Vec<ScenarioRecord>,
    pub warnings:     Vec<AnalysisError>,
    pub pairs_loaded: usize,
}

fn split_name(path: &Path) -> Option<(BatchId, bool)> {
    let name = path.file_name()?.to_str()?;
    if let Some(id) = name.strip_suffix(INPUT_SUFFIX) {
        return (!id.is_empty()).then(|| (id.to_string(), true));
    }
    if let Some(id) = name.strip_suffix(OUTPUT_SUFFIX) {
        return (!id.is_empty()).then(|| (id.to_string(), false));
    }
    None
}

/// Pair files by naming convention. Pure: only file names are inspected.
pub fn pair_files<I, P>(paths: I) -> FilePairing
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut slots: BTreeMap<BatchId, (Option<PathBuf>, Option<PathBuf>)> = BTreeMap::new();
    for path in paths {
        let path = path.as_ref();
        let Some((id, is_input)) = split_name(path) else {
            continue;
        };
        let slot = slots.entry(id).or_default();
        if is_input {
            slot.0 = Some(path.to_path_buf());
        } else {
            slot.1 = Some(path.to_path_buf());
        }
    }

    let mut pairing = FilePairing::default();
    for (id, slot) in slots {
        match slot {
            (Some(input), Some(output)) => pairing.pairs.push(FilePair { id, input, output }),
            (Some(_), None) => pairing.missing.push(AnalysisError::MissingPair {
                id,
                present: "input file",
                missing: "output file",
            }),
            (None, Some(_)) => pairing.missing.push(AnalysisError::MissingPair {
                id,
                present: "output file",
                missing: "input file",
            }),
            (None, None) => {}
        }
    }
    pairing
}

/// List the regular files directly inside `dir`.
pub fn list_directory(dir: &Path) -> AnalysisResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Load every valid record from `dir`.
///
/// Fails only when the directory cannot be listed or yields no records.
pub fn load_records(dir: &Path) -> AnalysisResult<LoadedRecords> {
    let pairing = pair_files(list_directory(dir)?);
    log::debug!(
        "loader: {} pair(s), {} unpaired id(s) in {}",
        pairing.pairs.len(),
        pairing.missing.len(),
        dir.display()
    );

    let mut warnings = pairing.missing;
    let mut records = Vec::new();
    let mut pairs_loaded = 0usize;
    let mut permutations = PermutationCounter::default();

    for pair in &pairing.pairs {
        match load_pair(pair, &mut permutations, &mut warnings) {
            Ok(mut pair_records) => {
                log::debug!("loader: {} yielded {} record(s)", pair.id, pair_records.len());
                pairs_loaded += 1;
                records.append(&mut pair_records);
            }
            Err(e @ AnalysisError::UnreadablePair { .. }) => warnings.push(e),
            Err(e) => warnings.push(AnalysisError::UnreadablePair {
                id: pair.id.clone(),
                reason: e.to_string(),
            }),
        }
    }

    for warning in &warnings {
        log::warn!("loader: {warning}");
    }

    if records.is_empty() {
        return Err(AnalysisError::NoResults { dir: dir.to_path_buf() });
    }

    log::info!(
        "Loaded {} record(s) from {} pair(s) in {} ({} warning(s))",
        records.len(),
        pairs_loaded,
        dir.display(),
        warnings.len()
    );
    Ok(LoadedRecords { records, warnings, pairs_loaded })
}

/// Permutation identities across one load.
///
/// Hands out 0-based ids per scenario when the input file carries no
/// explicit `Permutation` column, and tracks every identity already
/// loaded. Generated ids skip identities that are already taken.
#[derive(Default)]
struct PermutationCounter {
    next:    HashMap<ScenarioId, u32>,
    claimed: HashSet<(ScenarioId, u32)>,
}

impl PermutationCounter {
    fn next_for(&mut self, scenario: &ScenarioId) -> u32 {
        let slot = self.next.entry(scenario.clone()).or_insert(0);
        while self.claimed.contains(&(scenario.clone(), *slot)) {
            *slot += 1;
        }
        let id = *slot;
        *slot += 1;
        id
    }

    /// Record an identity as loaded. False when it was already taken.
    fn claim(&mut self, scenario: &ScenarioId, permutation: u32) -> bool {
        self.claimed.insert((scenario.clone(), permutation))
    }
}

fn header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header(name), idx))
        .collect()
}

fn normalize_header(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn open_csv(path: &Path) -> AnalysisResult<csv::Reader<File>> {
    let file = File::open(path)?;
    Ok(csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

fn require_column(
    columns: &HashMap<String, usize>,
    name: &str,
    pair: &FilePair,
    path: &Path,
) -> AnalysisResult<usize> {
    columns
        .get(&normalize_header(name))
        .copied()
        .ok_or_else(|| AnalysisError::UnreadablePair {
            id: pair.id.clone(),
            reason: format!("{} has no '{name}' column", file_label(path)),
        })
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Identity of one input row.
struct InputRow {
    scenario_id:    ScenarioId,
    permutation_id: u32,
    attributes:     BTreeMap<String, String>,
}

fn read_inputs(
    pair: &FilePair,
    permutations: &mut PermutationCounter,
    warnings: &mut Vec<AnalysisError>,
) -> AnalysisResult<Vec<Option<InputRow>>> {
    let label = file_label(&pair.input);
    let mut reader = open_csv(&pair.input)?;
    let headers = reader.headers()?.clone();
    let columns = header_map(&headers);
    let scenario_col = require_column(&columns, SCENARIO_COLUMN, pair, &pair.input)?;
    let permutation_col = columns.get(&normalize_header(PERMUTATION_COLUMN)).copied();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let row = idx + 1;
        let malformed = |reason: String| AnalysisError::MalformedRecord {
            file: label.clone(),
            row,
            reason,
        };

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warnings.push(malformed(format!("CSV parse error: {e}")));
                rows.push(None);
                continue;
            }
        };

        let scenario = record.get(scenario_col).unwrap_or_default();
        if scenario.is_empty() {
            warnings.push(malformed("empty Scenario value".to_string()));
            rows.push(None);
            continue;
        }
        let scenario_id = ScenarioId::new(scenario);

        let permutation_id = match permutation_col {
            Some(col) => {
                let raw = record.get(col).unwrap_or_default();
                match raw.parse::<u32>() {
                    Ok(id) => id,
                    Err(_) => {
                        warnings.push(malformed(format!("Permutation '{raw}' is not an integer")));
                        rows.push(None);
                        continue;
                    }
                }
            }
            None => permutations.next_for(&scenario_id),
        };

        let attributes = headers
            .iter()
            .enumerate()
            .filter(|(col, _)| *col != scenario_col && Some(*col) != permutation_col)
            .filter_map(|(col, name)| {
                record.get(col).map(|value| (name.trim().to_string(), value.to_string()))
            })
            .collect();

        rows.push(Some(InputRow { scenario_id, permutation_id, attributes }));
    }
    Ok(rows)
}

fn read_outputs(pair: &FilePair, warnings: &mut Vec<AnalysisError>) -> AnalysisResult<Vec<Option<String>>> {
    let label = file_label(&pair.output);
    let mut reader = open_csv(&pair.output)?;
    let columns = header_map(&reader.headers()?.clone());
    let report_col = require_column(&columns, YEARLY_REPORT_COLUMN, pair, &pair.output)?;

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        match result {
            Ok(record) => match record.get(report_col) {
                Some(cell) => rows.push(Some(cell.to_string())),
                None => {
                    warnings.push(AnalysisError::MalformedRecord {
                        file: label.clone(),
                        row: idx + 1,
                        reason: format!("no {YEARLY_REPORT_COLUMN} value"),
                    });
                    rows.push(None);
                }
            },
            Err(e) => {
                warnings.push(AnalysisError::MalformedRecord {
                    file: label.clone(),
                    row: idx + 1,
                    reason: format!("CSV parse error: {e}"),
                });
                rows.push(None);
            }
        }
    }
    Ok(rows)
}

fn load_pair(
    pair: &FilePair,
    permutations: &mut PermutationCounter,
    warnings: &mut Vec<AnalysisError>,
) -> AnalysisResult<Vec<ScenarioRecord>> {
    let inputs = read_inputs(pair, permutations, warnings)?;
    let outputs = read_outputs(pair, warnings)?;
    let output_label = file_label(&pair.output);

    if inputs.len() != outputs.len() {
        warnings.push(AnalysisError::MalformedRecord {
            file: output_label.clone(),
            row: inputs.len().min(outputs.len()) + 1,
            reason: format!(
                "input has {} row(s) but output has {}; unmatched rows skipped",
                inputs.len(),
                outputs.len()
            ),
        });
    }

    let mut records = Vec::new();
    for (idx, (input, output)) in inputs.into_iter().zip(outputs).enumerate() {
        let (Some(input), Some(report)) = (input, output) else {
            continue;
        };
        let yearly_entries = match decode_yearly_report(&report) {
            Ok(entries) => entries,
            Err(e) => {
                warnings.push(AnalysisError::MalformedRecord {
                    file: output_label.clone(),
                    row: idx + 1,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if !permutations.claim(&input.scenario_id, input.permutation_id) {
            warnings.push(AnalysisError::MalformedRecord {
                file: file_label(&pair.input),
                row: idx + 1,
                reason: format!(
                    "scenario {} permutation {} already loaded",
                    input.scenario_id, input.permutation_id
                ),
            });
            continue;
        }
        records.push(ScenarioRecord {
            scenario_id: input.scenario_id,
            permutation_id: input.permutation_id,
            batch_id: pair.id.clone(),
            attributes: input.attributes,
            yearly_entries,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_by_identifier_token() {
        let pairing = pair_files([
            "dir/b_output.csv",
            "dir/a_input.csv",
            "dir/b_input.csv",
            "dir/a_output.csv",
            "dir/notes.txt",
        ]);
        let ids: Vec<&str> = pairing.pairs.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(pairing.pairs[0].input, PathBuf::from("dir/a_input.csv"));
        assert_eq!(pairing.pairs[0].output, PathBuf::from("dir/a_output.csv"));
        assert!(pairing.missing.is_empty());
    }

    #[test]
    fn unpaired_ids_become_warnings() {
        let pairing = pair_files(["x_input.csv", "y_output.csv", "z_input.csv", "z_output.csv"]);
        assert_eq!(pairing.pairs.len(), 1);
        assert_eq!(pairing.missing.len(), 2);
        assert!(matches!(
            &pairing.missing[0],
            AnalysisError::MissingPair { id, missing: "output file", .. } if id == "x"
        ));
        assert!(matches!(
            &pairing.missing[1],
            AnalysisError::MissingPair { id, missing: "input file", .. } if id == "y"
        ));
    }

    #[test]
    fn bare_suffix_is_not_a_pair() {
        let pairing = pair_files(["_input.csv", "_output.csv"]);
        assert!(pairing.pairs.is_empty());
        assert!(pairing.missing.is_empty());
    }

    #[test]
    fn permutation_counter_is_per_scenario() {
        let mut counter = PermutationCounter::default();
        let a = ScenarioId::from("1");
        let b = ScenarioId::from("2");
        assert_eq!(counter.next_for(&a), 0);
        assert_eq!(counter.next_for(&b), 0);
        assert_eq!(counter.next_for(&a), 1);
    }

    #[test]
    fn generated_ids_skip_claimed_identities() {
        let mut counter = PermutationCounter::default();
        let a = ScenarioId::from("1");
        assert!(counter.claim(&a, 0));
        assert!(counter.claim(&a, 1));
        assert!(!counter.claim(&a, 1));
        assert_eq!(counter.next_for(&a), 2);
    }
}
