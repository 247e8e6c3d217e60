use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::store::{coerce_numeric, SensorId, SensorLimits};

#[derive(Error, Debug)]
pub enum LimitsError {
    #[error("Failed to read limits file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed limits file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Limits file is missing column '{0}'")]
    MissingColumn(&'static str),
}

const ID_COLUMN: &str = "SensorID";
const MIN_COLUMN: &str = "Min";
const MAX_COLUMN: &str = "Max";
const AVG_COLUMN: &str = "Avg";
const UOM_COLUMN: &str = "UOM";
const NAME_COLUMN: &str = "SensorName";

/// Compliance thresholds keyed by sensor identifier
#[derive(Debug, Clone, Default)]
pub struct LimitsTable {
    limits: HashMap<SensorId, SensorLimits>,
}

impl LimitsTable {
    /// Load a semicolon-delimited limits file
    ///
    /// Expected header: `SensorID;Min;Max;Avg;UOM;SensorName`. Extra columns are
    /// ignored; bounds are not checked for ordering.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self, LimitsError> {
        info!("Loading limits file {}", path.display());
        let file = std::fs::File::open(path).map_err(|source| LimitsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, LimitsError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let column = |name: &'static str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or(LimitsError::MissingColumn(name))
        };
        let id_idx = column(ID_COLUMN)?;
        let min_idx = column(MIN_COLUMN)?;
        let max_idx = column(MAX_COLUMN)?;
        let avg_idx = column(AVG_COLUMN)?;
        let uom_idx = column(UOM_COLUMN)?;
        let name_idx = column(NAME_COLUMN)?;

        let mut limits = HashMap::new();
        for row in reader.records() {
            let row = row?;
            let text = |idx: usize| {
                row.get(idx)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            };

            let Some(raw_id) = text(id_idx) else {
                debug!("Skipping limits row without a sensor id");
                continue;
            };
            let sensor_id = SensorId::new(raw_id);

            let entry = SensorLimits {
                sensor_id: sensor_id.clone(),
                lim_min: row.get(min_idx).and_then(coerce_numeric),
                lim_max: row.get(max_idx).and_then(coerce_numeric),
                lim_avg: row.get(avg_idx).and_then(coerce_numeric),
                uom: text(uom_idx),
                sensor_name: text(name_idx),
            };

            if limits.insert(sensor_id.clone(), entry).is_some() {
                warn!("Duplicate limits for sensor {}, keeping the last row", sensor_id);
            }
        }

        debug!("Loaded limits for {} sensors", limits.len());
        Ok(Self { limits })
    }

    pub fn get(&self, sensor_id: &SensorId) -> Option<&SensorLimits> {
        self.limits.get(sensor_id)
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}
