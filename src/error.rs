//! Run-level error taxonomy and exit-code mapping.
//!
//! Per-file failures never surface here; they are collected as
//! [`FileError`](crate::report::FileError) entries on the build report. Only
//! outcomes that end the whole run become a [`BuildError`].

use std::path::PathBuf;

use thiserror::Error;

use crate::report::FileError;

/// Exit code for a successful (or cancelled) run.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code when no input produced data or the output could not be written.
pub const EXIT_NO_INPUT: i32 = 1;
/// Exit code for configuration problems detected before any file I/O.
pub const EXIT_INVALID_CONFIG: i32 = 2;

#[derive(Debug, Error)]
pub enum BuildError {
    /// No input directory was supplied, or it is not an accessible directory.
    #[error("No directory selected")]
    DirectoryNotSelected,

    #[error("Invalid output file name '{0}'")]
    InvalidOutputName(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No valid data found to process ({attempted} file(s) attempted, {} failed)", .errors.len())]
    NoDataProcessed {
        attempted: usize,
        errors: Vec<FileError>,
    },

    #[error("Failed to write output to {path:?}: {message}")]
    Write { path: PathBuf, message: String },
}

impl BuildError {
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::DirectoryNotSelected => EXIT_SUCCESS,
            BuildError::InvalidOutputName(_) | BuildError::InvalidConfig(_) => {
                EXIT_INVALID_CONFIG
            }
            BuildError::NoDataProcessed { .. } | BuildError::Write { .. } => EXIT_NO_INPUT,
        }
    }

    /// A cancelled run is reported to the presenter but is not a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, BuildError::DirectoryNotSelected)
    }
}

/// Exit code for an arbitrary error bubbling out of [`crate::run`].
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<BuildError>() {
        Some(build) => build.exit_code(),
        None => EXIT_NO_INPUT,
    }
}
