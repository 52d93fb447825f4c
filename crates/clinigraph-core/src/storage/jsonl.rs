//! JSONL record store
//!
//! The knowledge base ships as two JSON Lines files, one record per line:
//!
//! ```text
//! records/
//! ├── concepts.jsonl
//! └── associations.jsonl
//! ```
//!
//! Blank lines are ignored. A malformed line aborts the read with the file
//! name and the 1-based line number.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::Result;
use crate::domain::knowledge::{Association, Concept};
use crate::error::Error;

/// Default file name of the concept table
pub const CONCEPTS_FILE: &str = "concepts.jsonl";

/// Default file name of the association table
pub const ASSOCIATIONS_FILE: &str = "associations.jsonl";

/// Read every record of a JSONL file
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::RecordsNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(Error::Io(e)),
    };
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(Error::Io)?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            Error::Parse(format!("{}:{}: invalid JSON: {}", path.display(), index + 1, e))
        })?;
        records.push(record);
    }

    debug!(path = %path.display(), records = records.len(), "Read JSONL file");
    Ok(records)
}

/// Write records as JSONL, one per line, creating parent directories
pub fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writeln!(writer).map_err(Error::Io)?;
    }
    writer.flush()?;

    Ok(records.len())
}

/// Both record tables, loaded into memory
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub concepts: Vec<Concept>,
    pub associations: Vec<Association>,
}

impl RecordSet {
    /// Load `dir/concepts_file` and `dir/associations_file`
    pub fn from_dir(dir: &Path, concepts_file: &str, associations_file: &str) -> Result<Self> {
        let concepts = read_jsonl(&dir.join(concepts_file))?;
        let associations = read_jsonl(&dir.join(associations_file))?;

        let set = Self {
            concepts,
            associations,
        };
        info!(
            dir = %dir.display(),
            concepts = set.concepts.len(),
            associations = set.associations.len(),
            "Loaded record set"
        );
        Ok(set)
    }

    /// Load a directory laid out with the default file names
    pub fn from_default_dir(dir: &Path) -> Result<Self> {
        Self::from_dir(dir, CONCEPTS_FILE, ASSOCIATIONS_FILE)
    }

    /// Write both tables into `dir` under the default file names
    pub fn write_to_dir(&self, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        let concepts_path = dir.join(CONCEPTS_FILE);
        let associations_path = dir.join(ASSOCIATIONS_FILE);
        write_jsonl(&concepts_path, &self.concepts)?;
        write_jsonl(&associations_path, &self.associations)?;
        Ok((concepts_path, associations_path))
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty() || self.associations.is_empty()
    }
}
