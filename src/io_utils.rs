//! I/O utilities for CSV reading, writing, and encoding resolution.
//!
//! All file I/O in trial-merge flows through this module:
//!
//! - **Encoding**: session files are decoded via `encoding_rs`, defaulting to
//!   UTF-8. A UTF-8 byte-order mark is dropped from the first header field.
//! - **Reader construction**: flexible readers; field counts are checked
//!   against the header by [`TrialFrame::load`](crate::frame::TrialFrame::load)
//!   so that truncated rows can be padded.
//! - **Writer construction**: UTF-8 output prefixed with a byte-order mark so
//!   spreadsheet tools detect the encoding, minimal quoting.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

pub const CSV_DELIMITER: u8 = b',';
pub const CSV_EXTENSION: &str = "csv";
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(CSV_EXTENSION))
}

/// Regular files directly inside `dir` carrying a `.csv` extension, sorted by
/// path so that repeated runs see the same order.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Listing directory {dir:?}"))? {
        let entry = entry.with_context(|| format!("Reading entry in {dir:?}"))?;
        let path = entry.path();
        if path.is_file() && has_csv_extension(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    Ok(open_csv_reader(BufReader::new(file), CSV_DELIMITER))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    headers
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let field = if idx == 0 && encoding == UTF_8 {
                field.strip_prefix(UTF8_BOM).unwrap_or(field)
            } else {
                field
            };
            decode_bytes(field, encoding)
        })
        .collect()
}

/// Creates `path` (and its parent directory), writes the UTF-8 byte-order
/// mark, and hands back a CSV writer positioned after it.
pub fn open_csv_writer(path: &Path) -> Result<csv::Writer<BufWriter<File>>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Creating output directory {parent:?}"))?;
    }
    let file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
    let mut base = BufWriter::new(file);
    base.write_all(UTF8_BOM)
        .with_context(|| format!("Writing byte-order mark to {path:?}"))?;

    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(CSV_DELIMITER)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(base))
}
