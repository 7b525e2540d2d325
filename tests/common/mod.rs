#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

pub const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Scratch session directory that cleans up on drop.
pub struct SessionDir {
    temp_dir: TempDir,
}

impl SessionDir {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the session directory.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write session file");
        path
    }
}

/// Reads a BOM-prefixed CSV written by the tool into header + rows.
pub fn read_output(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let bytes = fs::read(path).expect("read output");
    assert!(bytes.starts_with(BOM), "output must start with a byte-order mark");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(&bytes[BOM.len()..]);
    let headers = reader
        .headers()
        .expect("headers")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.expect("record").iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}

/// Session with a welcome screen, a practice trial, and two main trials.
pub const SESSION_P01: &str = "\
participant,session,trial,block,image_file,music_file,practice_valence_resp.keys,valence_resp.keys,arousal_resp.keys,frameRate
p01,1,,,,,,,,60
p01,1,0,practice,images\\practice\\calm.png,music/ambient.wav,num_5,,num_2,60
p01,1,1,main,images\\main\\sad.png,music/sad.wav,,num_3,num_7,60
p01,1,2,main,images/main/happy.png,,,NUM_8,,60
";

/// Session with a different column layout: no image column, practice-only
/// responses, an extra metadata column.
pub const SESSION_P02: &str = "\
trial,participant,practice_valence_resp.keys,expName
1,p02,num_4,ERM
,p02,,ERM
2,p02,num_6,ERM
";
