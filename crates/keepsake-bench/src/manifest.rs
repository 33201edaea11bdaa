//! Run-level metadata written once when a run finishes.

use crate::results::write_json_atomic;
use keepsake::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunManifest {
    /// RFC 3339.
    pub started_at: String,
    /// RFC 3339.
    pub finished_at: String,
    pub output_path: String,
    pub strategy_filter: Vec<String>,
    pub scenario_filter: Option<String>,
    pub sample: Option<usize>,
    pub concurrency: usize,
    pub sequential: bool,
    /// Strategies that took part after filtering.
    pub strategies: Vec<String>,
    pub planned_runs: usize,
    pub cached_runs: usize,
    pub executed_runs: usize,
    pub failed_runs: usize,
    /// Records in the log at the end of the run, cached ones included.
    pub total_records: usize,
}

impl RunManifest {
    pub async fn write(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self).await
    }
}

/// `results.json` → `results.manifest.json`, next to the result log.
pub fn manifest_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results".to_string());
    output.with_file_name(format!("{stem}.manifest.json"))
}
