//! Build results and the payload handed to whatever presents them.

use std::{fmt, path::PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::{error::BuildError, frame::TrialFrame};

/// A session file that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub table: TrialFrame,
    pub attempted_files: usize,
    pub processed_files: usize,
    pub errors: Vec<FileError>,
}

impl BuildReport {
    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }
}

/// End-of-run summary: `(success, message, output_path)` plus counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Presentation {
    pub success: bool,
    pub cancelled: bool,
    pub message: String,
    pub output_path: Option<PathBuf>,
    pub processed_files: usize,
    pub rows_written: usize,
    pub errors: Vec<FileError>,
}

impl Presentation {
    pub fn written(report: &BuildReport, output_path: PathBuf, rows_written: usize) -> Self {
        Self {
            success: true,
            cancelled: false,
            message: format!(
                "Processing complete. File saved as: {}",
                output_path.display()
            ),
            output_path: Some(output_path),
            processed_files: report.processed_files,
            rows_written,
            errors: report.errors.clone(),
        }
    }

    pub fn from_error(err: &BuildError) -> Self {
        let errors = match err {
            BuildError::NoDataProcessed { errors, .. } => errors.clone(),
            _ => Vec::new(),
        };
        Self {
            success: false,
            cancelled: err.is_cancellation(),
            message: err.to_string(),
            output_path: None,
            processed_files: 0,
            rows_written: 0,
            errors,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn tag(&self) -> &'static str {
        match (self.success, self.cancelled) {
            (true, _) => "SUCCESS",
            (false, true) => "CANCELLED",
            (false, false) => "ERROR",
        }
    }
}

impl fmt::Display for Presentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.tag(), self.message)?;
        if self.success {
            write!(
                f,
                " ({} row(s) from {} file(s))",
                self.rows_written, self.processed_files
            )?;
        }
        if !self.errors.is_empty() {
            write!(f, "; {} file(s) skipped", self.errors.len())?;
        }
        Ok(())
    }
}
