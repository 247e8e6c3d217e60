use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::store::error::StoreError;
use crate::store::models::SensorId;

pub const FETCH_STATE_FILE: &str = "fetch_state.json";

/// Retrieval status of one sensor for one month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Pending,
    /// Every window answered and the cache file was written
    Completed,
    /// Cache file written, but at least one window failed
    Partial,
    /// No readings in any window; no cache file
    Empty,
}

impl FetchStatus {
    /// Whether a cache file is expected to exist for this status
    pub fn has_cache(self) -> bool {
        matches!(self, FetchStatus::Completed | FetchStatus::Partial)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchStateRecord {
    pub sensor_id: SensorId,
    pub year: i32,
    pub month: u32,
    pub status: FetchStatus,
    pub reading_count: usize,
    pub failed_windows: usize,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FetchStateDocument {
    records: Vec<FetchStateRecord>,
}

/// JSON-file record of which sensor/month retrievals have finished
#[derive(Debug)]
pub struct FetchStateRepository {
    path: PathBuf,
    records: Vec<FetchStateRecord>,
}

impl FetchStateRepository {
    /// Load the state file from `dir`; a missing file is an empty store
    #[instrument]
    pub fn load(dir: &Path) -> Result<Self, StoreError> {
        let path = dir.join(FETCH_STATE_FILE);

        let records = if path.is_file() {
            let text = std::fs::read_to_string(&path)?;
            let document: FetchStateDocument = serde_json::from_str(&text)?;
            debug!("Loaded {} fetch state records", document.records.len());
            document.records
        } else {
            debug!("No fetch state file at {}, starting empty", path.display());
            Vec::new()
        };

        Ok(Self { path, records })
    }

    pub fn records(&self) -> &[FetchStateRecord] {
        &self.records
    }

    pub fn get(&self, sensor_id: &SensorId, year: i32, month: u32) -> Option<&FetchStateRecord> {
        self.records
            .iter()
            .find(|r| &r.sensor_id == sensor_id && r.year == year && r.month == month)
    }

    pub fn mark_pending(&mut self, sensor_id: &SensorId, year: i32, month: u32) {
        self.upsert(sensor_id, year, month, FetchStatus::Pending, 0, 0);
    }

    pub fn record_outcome(
        &mut self,
        sensor_id: &SensorId,
        year: i32,
        month: u32,
        status: FetchStatus,
        reading_count: usize,
        failed_windows: usize,
    ) {
        self.upsert(sensor_id, year, month, status, reading_count, failed_windows);
    }

    fn upsert(
        &mut self,
        sensor_id: &SensorId,
        year: i32,
        month: u32,
        status: FetchStatus,
        reading_count: usize,
        failed_windows: usize,
    ) {
        let updated_at = Utc::now();
        match self
            .records
            .iter_mut()
            .find(|r| &r.sensor_id == sensor_id && r.year == year && r.month == month)
        {
            Some(record) => {
                record.status = status;
                record.reading_count = reading_count;
                record.failed_windows = failed_windows;
                record.updated_at = updated_at;
            }
            None => self.records.push(FetchStateRecord {
                sensor_id: sensor_id.clone(),
                year,
                month,
                status,
                reading_count,
                failed_windows,
                updated_at,
            }),
        }
    }

    /// Write the store through a temp file and rename it over the old one
    #[instrument(skip(self), fields(path = %self.path.display(), records = self.records.len()))]
    pub fn save(&self) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let document = FetchStateDocument {
            records: self.records.clone(),
        };
        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut temp, &document)?;
        temp.flush()?;
        temp.persist(&self.path)?;

        debug!("Saved fetch state");
        Ok(())
    }
}
