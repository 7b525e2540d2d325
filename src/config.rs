//! Pipeline configuration for the trial table builder.
//!
//! [`PipelineConfig`] carries everything the pipeline needs to know about an
//! experiment's column layout: which columns hold file paths, which raw
//! response columns collapse into a single concept, the canonical output
//! order, and the tokens that count as a missing cell. `Default` yields the
//! layout of the ERM (emotion regulation with music) PsychoPy experiment.
//!
//! Configurations are persisted as YAML:
//!
//! ```yaml
//! trial_column: trial
//! path_columns: [image_file, music_file]
//! priority_columns: [participant, trial, valence]
//! merge:
//!   - target: valence
//!     sources: [valence_resp.keys, practice_valence_resp.keys]
//! ```

use std::{collections::HashSet, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::yaml_provider;

pub const DEFAULT_OUTPUT_FILENAME: &str = "ERM_cleaned_data.csv";
pub const DEFAULT_TRIAL_COLUMN: &str = "trial";
pub const DEFAULT_RESPONSE_PREFIX: &str = "num_";

/// Text a missing path cell turns into when coerced to a string.
pub const MISSING_TEXT: &str = "nan";

const DEFAULT_PATH_COLUMNS: &[&str] = &["image_file", "music_file"];

const DEFAULT_PRIORITY_COLUMNS: &[&str] = &[
    "participant",
    "order",
    "set",
    "trial",
    "block",
    "trial_block",
    "picture_type",
    "image_file",
    "music_type",
    "music_file",
    "iti_duration",
    "probed_trial",
    "probed_iti",
    "probe_start_trial",
    "probe_start_iti",
    "valence",
    "arousal",
    "fear",
    "anger",
    "sadness",
];

const DEFAULT_MERGE_CONCEPTS: &[&str] = &["valence", "arousal", "fear", "anger", "sadness"];

// Cells the session loader treats as missing, matched verbatim.
const DEFAULT_MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// One entry of the merge map: `target` takes the first non-missing value
/// among `sources`, scanned in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRule {
    pub target: String,
    pub sources: Vec<String>,
}

impl MergeRule {
    pub fn new(target: impl Into<String>, sources: &[&str]) -> Self {
        Self {
            target: target.into(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub trial_column: String,
    pub path_columns: Vec<String>,
    pub priority_columns: Vec<String>,
    pub merge: Vec<MergeRule>,
    pub response_prefix: String,
    pub missing_tokens: Vec<String>,
    /// Keep the literal `nan` text for missing path cells instead of leaving
    /// them empty in the output.
    pub preserve_missing_path_text: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let merge = DEFAULT_MERGE_CONCEPTS
            .iter()
            .map(|concept| MergeRule {
                target: concept.to_string(),
                sources: vec![
                    format!("{concept}_resp.keys"),
                    format!("practice_{concept}_resp.keys"),
                ],
            })
            .collect();
        Self {
            trial_column: DEFAULT_TRIAL_COLUMN.to_string(),
            path_columns: to_owned(DEFAULT_PATH_COLUMNS),
            priority_columns: to_owned(DEFAULT_PRIORITY_COLUMNS),
            merge,
            response_prefix: DEFAULT_RESPONSE_PREFIX.to_string(),
            missing_tokens: to_owned(DEFAULT_MISSING_TOKENS),
            preserve_missing_path_text: true,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config: PipelineConfig = yaml_provider::load_from_path(path)?;
        config
            .validate()
            .with_context(|| format!("Validating pipeline config {path:?}"))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        yaml_provider::save_to_path(path, self)
    }

    pub fn to_yaml(&self) -> Result<String> {
        yaml_provider::to_string(self)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.trial_column.trim().is_empty(),
            "trial_column must not be empty"
        );
        let mut targets = HashSet::new();
        for rule in &self.merge {
            ensure!(
                !rule.target.trim().is_empty(),
                "merge rule target must not be empty"
            );
            ensure!(
                !rule.sources.is_empty(),
                "merge rule '{}' must list at least one source column",
                rule.target
            );
            ensure!(
                targets.insert(rule.target.as_str()),
                "merge target '{}' is declared more than once",
                rule.target
            );
        }
        let mut seen = HashSet::new();
        for column in &self.priority_columns {
            ensure!(
                seen.insert(column.as_str()),
                "priority column '{column}' is listed more than once"
            );
        }
        Ok(())
    }

    pub fn is_missing(&self, value: &str) -> bool {
        self.missing_tokens.iter().any(|token| token == value)
    }

    pub fn is_priority(&self, column: &str) -> bool {
        self.priority_columns.iter().any(|c| c == column)
    }
}

fn to_owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
