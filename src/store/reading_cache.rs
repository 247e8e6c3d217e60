use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::store::error::StoreError;
use crate::store::models::{RawRecord, SensorId, SENSOR_ID_COLUMN};
use crate::utils;

/// Per-sensor, per-month CSV cache of raw reading records
#[derive(Debug, Clone)]
pub struct ReadingCache {
    dir: PathBuf,
}

impl ReadingCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the cache file, e.g. `sensor_10_2024_12.csv`
    pub fn path_for(&self, sensor_id: &SensorId, year: i32, month: u32) -> PathBuf {
        self.dir.join(format!(
            "sensor_{}_{year}_{month:02}.csv",
            utils::file_token(sensor_id.as_str())
        ))
    }

    pub fn exists(&self, sensor_id: &SensorId, year: i32, month: u32) -> bool {
        self.path_for(sensor_id, year, month).is_file()
    }

    #[instrument(skip(self), fields(sensor_id = %sensor_id))]
    pub fn load(
        &self,
        sensor_id: &SensorId,
        year: i32,
        month: u32,
    ) -> Result<Vec<RawRecord>, StoreError> {
        let path = self.path_for(sensor_id, year, month);
        debug!("Loading cached readings from {}", path.display());

        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(&path)?;
        let headers = reader.headers()?.clone();

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let mut record = RawRecord::new();
            for (key, value) in headers.iter().zip(row.iter()) {
                record.set(key, value);
            }
            records.push(record);
        }

        debug!("Loaded {} cached records", records.len());
        Ok(records)
    }

    /// Delete the cache file for one sensor/month; returns whether one existed
    #[instrument(skip(self), fields(sensor_id = %sensor_id))]
    pub fn remove(&self, sensor_id: &SensorId, year: i32, month: u32) -> Result<bool, StoreError> {
        let path = self.path_for(sensor_id, year, month);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed cache file {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Write all records for one sensor/month, replacing any previous file
    #[instrument(skip(self, records), fields(sensor_id = %sensor_id, records = records.len()))]
    pub fn write(
        &self,
        sensor_id: &SensorId,
        year: i32,
        month: u32,
        records: &[RawRecord],
    ) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(sensor_id, year, month);

        let columns = union_columns(records);
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(&columns)?;
        for record in records {
            writer.write_record(columns.iter().map(|c| record.get(c).unwrap_or("")))?;
        }
        writer.flush()?;

        debug!("Wrote {} records to {}", records.len(), path.display());
        Ok(path)
    }
}

/// Union of record fields in first-seen order, sensor identifier last
fn union_columns(records: &[RawRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for key in records.iter().flat_map(|r| r.keys()) {
        if key != SENSOR_ID_COLUMN && !columns.iter().any(|c| c == key) {
            columns.push(key.to_string());
        }
    }
    columns.push(SENSOR_ID_COLUMN.to_string());
    columns
}
