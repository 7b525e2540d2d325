//! Per-file column report.
//!
//! Lists, for every session file the builder would read, whether it carries
//! the trial column, how many of the priority columns it provides, and which
//! candidate each merge concept would draw from first.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::info;

use crate::{
    cli::InspectArgs,
    config::PipelineConfig,
    error::BuildError,
    frame::TrialFrame,
    io_utils, table,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProfile {
    pub path: PathBuf,
    pub rows: usize,
    pub trial_rows: Option<usize>,
    pub priority_present: usize,
    pub merges: Vec<(String, String)>,
}

pub fn profile_file(
    path: &Path,
    encoding: &'static Encoding,
    config: &PipelineConfig,
) -> Result<FileProfile> {
    let frame = TrialFrame::load(path, encoding, config)?;
    let columns = frame.column_set();
    let trial_rows = frame.column_values(&config.trial_column).map(|values| {
        values.iter().filter(|v| v.is_some()).count()
    });
    let merges = config
        .merge
        .iter()
        .filter_map(|rule| {
            columns
                .present(&rule.sources)
                .first()
                .map(|source| (rule.target.clone(), source.to_string()))
        })
        .collect();
    Ok(FileProfile {
        path: path.to_path_buf(),
        rows: frame.row_count(),
        trial_rows,
        priority_present: columns.present(&config.priority_columns).len(),
        merges,
    })
}

pub fn execute(args: &InspectArgs, config: &PipelineConfig) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())
        .map_err(|err| BuildError::InvalidConfig(format!("{err:#}")))?;
    if !args.dir.is_dir() {
        return Err(BuildError::DirectoryNotSelected.into());
    }
    let files = io_utils::list_csv_files(&args.dir)
        .with_context(|| format!("Inspecting {:?}", args.dir))?;
    if files.is_empty() {
        info!("No CSV files found in {:?}", args.dir);
        return Ok(());
    }

    let priority_total = config.priority_columns.len();
    let mut rows = Vec::with_capacity(files.len());
    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match profile_file(path, encoding, config) {
            Ok(profile) => rows.push(vec![
                name,
                profile.rows.to_string(),
                profile
                    .trial_rows
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "missing".to_string()),
                format!("{}/{}", profile.priority_present, priority_total),
                profile
                    .merges
                    .iter()
                    .map(|(target, source)| format!("{target}<-{source}"))
                    .collect::<Vec<_>>()
                    .join(" "),
            ]),
            Err(err) => rows.push(vec![
                name,
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                format!("error: {err:#}"),
            ]),
        }
    }

    let headers = ["file", "rows", "trials", "priority", "merges"]
        .map(String::from)
        .to_vec();
    table::print_table(&headers, &rows);
    info!("Inspected {} file(s) in {:?}", files.len(), args.dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn profile_reports_first_present_candidate() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("p01.csv");
        fs::write(
            &path,
            "participant,trial,practice_valence_resp.keys,arousal_resp.keys\n\
             p01,,,\n\
             p01,1,num_3,num_4\n",
        )
        .unwrap();
        let profile = profile_file(&path, UTF_8, &PipelineConfig::default()).expect("profile");
        assert_eq!(profile.rows, 2);
        assert_eq!(profile.trial_rows, Some(1));
        assert_eq!(profile.priority_present, 2);
        assert_eq!(
            profile.merges,
            vec![
                ("valence".to_string(), "practice_valence_resp.keys".to_string()),
                ("arousal".to_string(), "arousal_resp.keys".to_string()),
            ]
        );
    }

    #[test]
    fn profile_flags_missing_trial_column() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("bad.csv");
        fs::write(&path, "participant\np01\n").unwrap();
        let profile = profile_file(&path, UTF_8, &PipelineConfig::default()).expect("profile");
        assert_eq!(profile.trial_rows, None);
        assert!(profile.merges.is_empty());
    }
}
