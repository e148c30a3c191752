use crate::{error::AnalysisResult, ranking::{validate_winner_fraction, DEFAULT_WINNER_FRACTION}};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where to read batch files, where to publish artifacts, and how
/// many scenarios count as winners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub input_dir:       PathBuf,
    pub export_dir:      PathBuf,
    pub winner_fraction: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input_dir:       PathBuf::from("outputs"),
            export_dir:      PathBuf::from("final"),
            winner_fraction: DEFAULT_WINNER_FRACTION,
        }
    }
}

impl AnalysisConfig {
    /// Load from a JSON file. Missing keys fall back to the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: AnalysisConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {}: {e}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        validate_winner_fraction(self.winner_fraction).map(|_| ())
    }

    pub fn ranking_path(&self) -> PathBuf {
        self.export_dir.join(crate::artifact::RANKING_FILE)
    }

    pub fn cte0_path(&self) -> PathBuf {
        self.export_dir.join(crate::artifact::CTE0_FILE)
    }

    pub fn cte80_path(&self) -> PathBuf {
        self.export_dir.join(crate::artifact::CTE80_FILE)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.export_dir.join(crate::artifact::SUMMARY_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: AnalysisConfig = serde_json::from_str(r#"{"winner_fraction": 0.5}"#).unwrap();
        assert_eq!(config.winner_fraction, 0.5);
        assert_eq!(config.input_dir, PathBuf::from("outputs"));
        assert_eq!(config.ranking_path(), PathBuf::from("final/scenarios_ranking.csv"));
    }

    #[test]
    fn validate_rejects_zero_fraction() {
        let config = AnalysisConfig { winner_fraction: 0.0, ..AnalysisConfig::default() };
        assert!(config.validate().is_err());
    }
}
