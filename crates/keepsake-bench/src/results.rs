//! Crash-safe result log.
//!
//! The log is one JSON array of [`ResultRecord`]s. Every append pushes the
//! record and rewrites the whole file under one mutex, through a temp file
//! and a rename, so the file on disk is always a complete snapshot of the
//! completed jobs. A failed write is logged and the in-memory collection
//! stays authoritative for the rest of the run.

use crate::record::ResultRecord;
use keepsake::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct ResultLog {
    path: PathBuf,
    records: Mutex<Vec<ResultRecord>>,
}

impl ResultLog {
    /// Start an empty log at `path` without reading it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Load an existing log. A missing file is an empty log; a malformed
    /// file is an error so a run never silently overwrites results.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => Vec::new(),
            Ok(text) => serde_json::from_str::<Vec<ResultRecord>>(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!("Loaded {} records from {}", records.len(), path.display());
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `(strategy, scenario)` pairs already recorded.
    pub async fn completed_pairs(&self) -> HashSet<(String, String)> {
        self.records.lock().await.iter().map(ResultRecord::key).collect()
    }

    /// Record a completed job and rewrite the file.
    ///
    /// Returns `false` if the write failed; the record is kept in memory
    /// either way.
    pub async fn append(&self, record: ResultRecord) -> bool {
        let mut records = self.records.lock().await;
        records.push(record);
        match write_json_atomic(&self.path, &*records).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Failed to persist {} results to {}: {e}",
                    records.len(),
                    self.path.display()
                );
                false
            }
        }
    }

    pub async fn snapshot(&self) -> Vec<ResultRecord> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

/// Serialize `value` to a sibling temp file, then rename it over `path`.
pub(crate) async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results.json".to_string());
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let json = serde_json::to_string_pretty(value)?;
    tokio::fs::write(&tmp_path, json).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}
