//! Output file naming and persistence of the combined table.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use crate::{error::BuildError, frame::TrialFrame, io_utils};

const CSV_SUFFIX: &str = ".csv";

/// Validates the requested output name and appends `.csv` when missing.
/// The result is joined onto `output_dir` when one is given.
pub fn resolve_output_path(name: &str, output_dir: Option<&Path>) -> Result<PathBuf, BuildError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(CSV_SUFFIX) {
        return Err(BuildError::InvalidOutputName(name.to_string()));
    }
    let has_suffix = trimmed.len() > CSV_SUFFIX.len()
        && trimmed
            .get(trimmed.len() - CSV_SUFFIX.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(CSV_SUFFIX));
    let file_name = if has_suffix {
        trimmed.to_string()
    } else {
        format!("{trimmed}{CSV_SUFFIX}")
    };
    Ok(match output_dir {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    })
}

/// Writes `table` as a BOM-prefixed CSV and returns the number of data rows.
/// Missing cells become empty fields.
pub fn write_table(table: &TrialFrame, path: &Path) -> Result<usize> {
    let mut writer = io_utils::open_csv_writer(path)?;
    writer
        .write_record(table.headers())
        .with_context(|| "Writing output headers")?;
    for (idx, row) in table.rows().iter().enumerate() {
        writer
            .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
            .with_context(|| format!("Writing row {} to {:?}", idx + 2, path))?;
    }
    writer
        .flush()
        .with_context(|| format!("Flushing output file {path:?}"))?;
    info!(
        "Wrote {} row(s) across {} column(s) to {:?}",
        table.row_count(),
        table.headers().len(),
        path
    );
    Ok(table.row_count())
}

/// [`write_table`] with failures mapped onto [`BuildError::Write`].
pub fn persist(table: &TrialFrame, path: &Path) -> Result<usize, BuildError> {
    write_table(table, path).map_err(|err| BuildError::Write {
        path: path.to_path_buf(),
        message: format!("{err:#}"),
    })
}
