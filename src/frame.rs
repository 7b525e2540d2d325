//! In-memory table for a single session file.
//!
//! A [`TrialFrame`] holds ordered column names and rows of optional cells
//! (`None` = missing). Each frame is built once per file, transformed in place
//! by the pipeline, then appended to the combined output.

use std::{collections::HashSet, path::Path};

use anyhow::{Context, Result, bail};
use encoding_rs::Encoding;

use crate::{config::PipelineConfig, io_utils};

pub type Cell = Option<String>;

/// Set of column names present in one file, computed once and consulted for
/// every selection decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet {
    names: HashSet<String>,
}

impl ColumnSet {
    pub fn from_headers(headers: &[String]) -> Self {
        Self {
            names: headers.iter().cloned().collect(),
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.names.contains(column)
    }

    /// Members of `candidates` present in this set, in the order given.
    pub fn present<'a>(&self, candidates: &'a [String]) -> Vec<&'a str> {
        candidates
            .iter()
            .map(String::as_str)
            .filter(|c| self.contains(c))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrialFrame {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl TrialFrame {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    /// Loads a session file, mapping configured missing tokens to `None`.
    ///
    /// Rows shorter than the header are padded with missing cells; a row
    /// longer than the header makes the file unparsable.
    pub fn load(
        path: &Path,
        encoding: &'static Encoding,
        config: &PipelineConfig,
    ) -> Result<Self> {
        let mut reader = io_utils::open_csv_reader_from_path(path)?;
        let headers = io_utils::reader_headers(&mut reader, encoding)
            .with_context(|| format!("Reading header row of {path:?}"))?;
        let headers = dedupe_headers(headers);
        let width = headers.len();
        let mut rows = Vec::new();
        for (row_idx, record) in reader.byte_records().enumerate() {
            let line = row_idx + 2;
            let record = record.with_context(|| format!("Reading row {line} in {path:?}"))?;
            if record.len() > width {
                bail!(
                    "Row {line} in {path:?} has {} fields but the header has {width}",
                    record.len()
                );
            }
            let decoded = io_utils::decode_record(&record, encoding)
                .with_context(|| format!("Decoding row {line} in {path:?}"))?;
            let mut row: Vec<Cell> = decoded
                .into_iter()
                .map(|value| (!config.is_missing(&value)).then_some(value))
                .collect();
            row.resize(width, None);
            rows.push(row);
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_set(&self) -> ColumnSet {
        ColumnSet::from_headers(&self.headers)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
    }

    pub fn column_values(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).and_then(|c| c.as_deref()))
                .collect(),
        )
    }

    /// Rewrites every cell of `column` through `f`. Returns `false` when the
    /// column does not exist.
    pub fn map_column<F>(&mut self, column: &str, mut f: F) -> bool
    where
        F: FnMut(Option<&str>) -> Cell,
    {
        let Some(idx) = self.column_index(column) else {
            return false;
        };
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(idx) {
                *cell = f(cell.as_deref());
            }
        }
        true
    }

    /// Writes `values` into `column`, replacing an existing column in place or
    /// appending a new one at the end.
    pub fn set_column(&mut self, column: &str, values: Vec<Cell>) {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.column_index(column) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.headers.push(column.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }

    /// New frame holding only `columns`, in that order. Unknown names are
    /// skipped.
    pub fn select(&self, columns: &[&str]) -> TrialFrame {
        let indices: Vec<usize> = columns
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect();
        let headers = indices.iter().map(|&i| self.headers[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        TrialFrame { headers, rows }
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Cell]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }
}

/// Blank header names become `Unnamed: <position>`; repeated names then get a
/// `.1`, `.2`, ... suffix so that every column stays addressable by name.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut out = Vec::with_capacity(headers.len());
    for (idx, header) in headers.into_iter().enumerate() {
        let header = if header.is_empty() {
            format!("Unnamed: {idx}")
        } else {
            header
        };
        let mut name = header.clone();
        let mut counter = 0usize;
        while seen.contains(&name) {
            counter += 1;
            name = format!("{header}.{counter}");
        }
        seen.insert(name.clone());
        out.push(name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn frame(headers: &[&str], rows: &[&[Option<&str>]]) -> TrialFrame {
        TrialFrame::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.map(str::to_string)).collect())
                .collect(),
        )
    }

    #[test]
    fn load_maps_missing_tokens_to_none() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "trial,image_file,note").unwrap();
        writeln!(file, "1,img/a.png,NA").unwrap();
        writeln!(file, ",,0").unwrap();
        let config = PipelineConfig::default();

        let frame = TrialFrame::load(file.path(), UTF_8, &config).expect("load");
        assert_eq!(frame.headers(), &["trial", "image_file", "note"]);
        assert_eq!(frame.row_count(), 2);
        assert_eq!(frame.cell(0, 1), Some("img/a.png"));
        assert_eq!(frame.cell(0, 2), None);
        assert_eq!(frame.cell(1, 0), None);
        assert_eq!(frame.cell(1, 2), Some("0"));
    }

    #[test]
    fn load_rejects_rows_longer_than_header() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "trial,block").unwrap();
        writeln!(file, "1,2,3").unwrap();
        let err = TrialFrame::load(file.path(), UTF_8, &PipelineConfig::default()).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("Row 2"), "{message}");
        assert!(message.contains("3 fields"), "{message}");
    }

    #[test]
    fn load_pads_short_rows_with_missing_cells() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "participant,trial,valence_resp.keys,rt").unwrap();
        writeln!(file, "p01,1,num_3,0.5").unwrap();
        write!(file, "p01,2,num_4").unwrap();
        let frame = TrialFrame::load(file.path(), UTF_8, &PipelineConfig::default()).expect("load");
        assert_eq!(frame.row_count(), 2);
        assert_eq!(frame.rows()[1].len(), 4);
        assert_eq!(frame.cell(1, 2), Some("num_4"));
        assert_eq!(frame.cell(1, 3), None);
    }

    #[test]
    fn duplicate_headers_are_suffixed() {
        let headers = ["key", "key", "rt", "key"].map(String::from).to_vec();
        assert_eq!(dedupe_headers(headers), vec!["key", "key.1", "rt", "key.2"]);
    }

    #[test]
    fn blank_headers_are_named_by_position() {
        let headers = ["participant", "", "trial", ""].map(String::from).to_vec();
        assert_eq!(
            dedupe_headers(headers),
            vec!["participant", "Unnamed: 1", "trial", "Unnamed: 3"]
        );
    }

    #[test]
    fn trailing_comma_column_gets_a_name() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "participant,trial,frameRate,").unwrap();
        writeln!(file, "p01,1,60,").unwrap();
        let frame = TrialFrame::load(file.path(), UTF_8, &PipelineConfig::default()).expect("load");
        assert_eq!(
            frame.headers(),
            &["participant", "trial", "frameRate", "Unnamed: 3"]
        );
        assert_eq!(frame.cell(0, 3), None);
    }

    #[test]
    fn set_column_replaces_in_place_or_appends() {
        let mut f = frame(&["trial", "valence"], &[&[Some("1"), Some("old")]]);
        f.set_column("valence", vec![Some("new".into())]);
        f.set_column("arousal", vec![None]);
        assert_eq!(f.headers(), &["trial", "valence", "arousal"]);
        assert_eq!(f.cell(0, 1), Some("new"));
        assert_eq!(f.cell(0, 2), None);
    }

    #[test]
    fn select_reorders_and_skips_unknown() {
        let f = frame(&["a", "b", "c"], &[&[Some("1"), Some("2"), Some("3")]]);
        let selected = f.select(&["c", "missing", "a"]);
        assert_eq!(selected.headers(), &["c", "a"]);
        assert_eq!(
            selected.rows()[0],
            vec![Some("3".to_string()), Some("1".to_string())]
        );
    }

    #[test]
    fn column_set_present_keeps_candidate_order() {
        let f = frame(&["practice_valence_resp.keys", "valence_resp.keys"], &[]);
        let set = f.column_set();
        let candidates = vec![
            "valence_resp.keys".to_string(),
            "absent".to_string(),
            "practice_valence_resp.keys".to_string(),
        ];
        assert_eq!(
            set.present(&candidates),
            vec!["valence_resp.keys", "practice_valence_resp.keys"]
        );
        assert_eq!(set.len(), 2);
    }
}
