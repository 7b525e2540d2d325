//! The trial table builder.
//!
//! Every session file goes through the same straight-line transform:
//!
//! 1. **Path normalization** – path-valued columns keep only their final
//!    segment (`images\sub\cat.png` → `cat.png`).
//! 2. **Response merging** – each merge concept takes the first non-missing
//!    value among its candidate columns, minus the `num_` key prefix.
//! 3. **Row filtering** – rows without a trial value are instruction or
//!    welcome screens and are dropped.
//! 4. **Column selection** – priority columns first; in full mode every other
//!    column follows in file order.
//!
//! Kept frames are then concatenated, aligned by column name. A file that
//! fails any step is recorded as a [`FileError`] and skipped; the batch only
//! fails when nothing at all survives.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use itertools::Itertools;
use log::{debug, info, warn};
use regex::Regex;

use crate::{
    cli::OutputMode,
    config::{MISSING_TEXT, PipelineConfig},
    error::BuildError,
    frame::{Cell, TrialFrame},
    io_utils,
    report::{BuildReport, FileError},
};

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub directory: Option<PathBuf>,
    pub mode: OutputMode,
    pub encoding: &'static Encoding,
    /// Output destination; never read back as a session file.
    pub exclude: Option<PathBuf>,
}

impl BuildRequest {
    pub fn new(directory: impl Into<PathBuf>, mode: OutputMode) -> Self {
        Self {
            directory: Some(directory.into()),
            mode,
            encoding: UTF_8,
            exclude: None,
        }
    }

    pub fn excluding(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclude = Some(path.into());
        self
    }
}

#[derive(Debug)]
pub struct TrialTableBuilder {
    config: PipelineConfig,
    prefix: Option<Regex>,
}

impl TrialTableBuilder {
    pub fn new(config: PipelineConfig) -> Result<Self, BuildError> {
        config
            .validate()
            .map_err(|err| BuildError::InvalidConfig(format!("{err:#}")))?;
        let prefix = if config.response_prefix.is_empty() {
            None
        } else {
            let pattern = format!("(?i)^{}", regex::escape(&config.response_prefix));
            Some(Regex::new(&pattern).map_err(|err| BuildError::InvalidConfig(err.to_string()))?)
        };
        Ok(Self { config, prefix })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn build(&self, request: &BuildRequest) -> Result<BuildReport, BuildError> {
        let directory = request
            .directory
            .as_deref()
            .filter(|dir| dir.is_dir())
            .ok_or(BuildError::DirectoryNotSelected)?;
        let mut files = io_utils::list_csv_files(directory).map_err(|err| {
            warn!("Cannot read directory {directory:?}: {err:#}");
            BuildError::DirectoryNotSelected
        })?;
        if let Some(output) = request
            .exclude
            .as_deref()
            .and_then(|path| fs::canonicalize(path).ok())
        {
            files.retain(|path| {
                let is_output = fs::canonicalize(path).is_ok_and(|p| p == output);
                if is_output {
                    warn!("Skipping {path:?}: it is the output file of this run");
                }
                !is_output
            });
        }
        info!(
            "Found {} CSV file(s) in {:?} ({} mode)",
            files.len(),
            directory,
            request.mode
        );

        let mut frames = Vec::with_capacity(files.len());
        let mut errors = Vec::new();
        for path in &files {
            match self.process_file(path, request.mode, request.encoding) {
                Ok(frame) => {
                    info!("✓ {:?}: kept {} trial row(s)", path, frame.row_count());
                    frames.push(frame);
                }
                Err(err) => {
                    warn!("Error processing {path:?}: {err:#}");
                    errors.push(FileError {
                        path: path.clone(),
                        message: format!("{err:#}"),
                    });
                }
            }
        }

        let table = concat(&frames, &self.config.priority_columns);
        if table.row_count() == 0 {
            return Err(BuildError::NoDataProcessed {
                attempted: files.len(),
                errors,
            });
        }
        Ok(BuildReport {
            table,
            attempted_files: files.len(),
            processed_files: frames.len(),
            errors,
        })
    }

    pub fn process_file(
        &self,
        path: &Path,
        mode: OutputMode,
        encoding: &'static Encoding,
    ) -> Result<TrialFrame> {
        let frame = TrialFrame::load(path, encoding, &self.config)?;
        self.transform(frame, mode)
            .with_context(|| format!("Processing {path:?}"))
    }

    /// Runs the per-file steps on an already loaded frame.
    pub fn transform(&self, mut frame: TrialFrame, mode: OutputMode) -> Result<TrialFrame> {
        self.normalize_paths(&mut frame);
        self.merge_responses(&mut frame);
        self.drop_non_trial_rows(&mut frame)?;
        Ok(self.select_columns(&frame, mode))
    }

    pub fn normalize_paths(&self, frame: &mut TrialFrame) {
        let preserve = self.config.preserve_missing_path_text;
        for column in &self.config.path_columns {
            let rewritten = frame.map_column(column, |value| match value {
                Some(text) => Some(file_name_segment(text).to_string()),
                None if preserve => Some(MISSING_TEXT.to_string()),
                None => None,
            });
            if rewritten {
                debug!("Normalized paths in column '{column}'");
            }
        }
    }

    pub fn merge_responses(&self, frame: &mut TrialFrame) {
        let columns = frame.column_set();
        for rule in &self.config.merge {
            let candidates = columns.present(&rule.sources);
            if candidates.is_empty() {
                debug!("No source column for '{}'", rule.target);
                continue;
            }
            let sources: Vec<Vec<Option<&str>>> = candidates
                .iter()
                .filter_map(|name| frame.column_values(name))
                .collect();
            let merged: Vec<Cell> = (0..frame.row_count())
                .map(|row| {
                    sources
                        .iter()
                        .find_map(|values| values[row])
                        .and_then(|value| self.clean_response(value))
                })
                .collect();
            debug!("Merged {:?} into '{}'", candidates, rule.target);
            frame.set_column(&rule.target, merged);
        }
    }

    /// Strips the response-key prefix; the `nan` text and empty leftovers
    /// become missing.
    pub fn clean_response(&self, value: &str) -> Cell {
        let stripped = match &self.prefix {
            Some(prefix) => prefix.replace(value, ""),
            None => value.into(),
        };
        if stripped.is_empty() || stripped == MISSING_TEXT {
            None
        } else {
            Some(stripped.into_owned())
        }
    }

    pub fn drop_non_trial_rows(&self, frame: &mut TrialFrame) -> Result<()> {
        let trial = &self.config.trial_column;
        let idx = frame
            .column_index(trial)
            .ok_or_else(|| anyhow!("Missing required '{trial}' column"))?;
        let before = frame.row_count();
        frame.retain_rows(|row| row.get(idx).is_some_and(Option::is_some));
        debug!(
            "Dropped {} non-trial row(s)",
            before.saturating_sub(frame.row_count())
        );
        Ok(())
    }

    pub fn select_columns(&self, frame: &TrialFrame, mode: OutputMode) -> TrialFrame {
        let columns = frame.column_set();
        let mut selected = columns.present(&self.config.priority_columns);
        if mode == OutputMode::Full {
            selected.extend(
                frame
                    .headers()
                    .iter()
                    .map(String::as_str)
                    .filter(|h| !self.config.is_priority(h)),
            );
        }
        frame.select(&selected)
    }
}

/// Final path segment of `value`: everything after the last backslash, then
/// everything after the last forward slash.
pub fn file_name_segment(value: &str) -> &str {
    let value = value.rsplit_once('\\').map_or(value, |(_, tail)| tail);
    value.rsplit_once('/').map_or(value, |(_, tail)| tail)
}

/// Concatenates frames aligned by column name.
///
/// Priority columns seen in any frame come first in priority order, then the
/// remaining columns in order of first appearance. Cells for columns a frame
/// lacks are missing.
pub fn concat(frames: &[TrialFrame], priority: &[String]) -> TrialFrame {
    let present: HashSet<&str> = frames
        .iter()
        .flat_map(|f| f.headers())
        .map(String::as_str)
        .collect();
    let mut headers: Vec<String> = priority
        .iter()
        .filter(|c| present.contains(c.as_str()))
        .cloned()
        .collect();
    headers.extend(
        frames
            .iter()
            .flat_map(|f| f.headers())
            .filter(|h| !priority.contains(*h))
            .unique()
            .cloned(),
    );

    let mut rows = Vec::with_capacity(frames.iter().map(TrialFrame::row_count).sum());
    for frame in frames {
        let positions: Vec<Option<usize>> =
            headers.iter().map(|h| frame.column_index(h)).collect();
        rows.extend(frame.rows().iter().map(|row| {
            positions
                .iter()
                .map(|pos| pos.and_then(|i| row[i].clone()))
                .collect::<Vec<Cell>>()
        }));
    }
    TrialFrame::new(headers, rows)
}
