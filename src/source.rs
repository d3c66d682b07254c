use std::path::{Path, PathBuf};

use crate::models::AttendanceRecord;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read attendance data from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse attendance data in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn load_records(path: &Path) -> Result<Vec<AttendanceRecord>, SourceError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_records(&raw).map_err(|source| SourceError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), count = records.len(), "loaded attendance records");
    Ok(records)
}

pub fn parse_records(raw: &str) -> Result<Vec<AttendanceRecord>, serde_json::Error> {
    serde_json::from_str(raw)
}
