use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::limits::LimitsTable;
use crate::store::{
    Compliance, ComplianceSummary, RawRecord, Reading, SensorId, SensorLimits, SENSOR_ID_COLUMN,
    TIMESTAMP_COLUMN, VALUE_COLUMN,
};

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("'{0}' column is missing in monthly data. Please check the input data structure.")]
    MissingColumn(&'static str),
}

#[derive(Debug, Default)]
struct SensorAccumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
    excursions: usize,
    excursion_sum: f64,
    excursion_days: BTreeSet<NaiveDate>,
}

impl SensorAccumulator {
    fn push(&mut self, value: f64, reading: &Reading, out_of_range: bool) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;

        if out_of_range {
            self.excursions += 1;
            self.excursion_sum += value;
            if let Some(ts) = reading.timestamp {
                self.excursion_days.insert(ts.date_naive());
            }
        }
    }
}

/// Whether a value lies outside the configured bounds; a missing bound never trips
pub fn is_out_of_range(value: f64, limits: Option<&SensorLimits>) -> bool {
    let Some(limits) = limits else {
        return false;
    };
    limits.lim_min.is_some_and(|min| value < min) || limits.lim_max.is_some_and(|max| value > max)
}

/// Joins readings with the limits table and summarises compliance per sensor
#[derive(Debug, Clone)]
pub struct ComplianceService {
    limits: LimitsTable,
}

impl ComplianceService {
    pub fn new(limits: LimitsTable) -> Self {
        Self { limits }
    }

    /// One summary per sensor, ordered by sensor identifier
    ///
    /// Records whose value is missing or not numeric are dropped first. Records
    /// without a sensor identifier cannot be grouped and are dropped as well.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub fn aggregate(
        &self,
        records: &[RawRecord],
    ) -> Result<Vec<ComplianceSummary>, AggregateError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        for column in [SENSOR_ID_COLUMN, VALUE_COLUMN, TIMESTAMP_COLUMN] {
            if !records.iter().any(|r| r.contains(column)) {
                return Err(AggregateError::MissingColumn(column));
            }
        }

        let mut groups: BTreeMap<SensorId, SensorAccumulator> = BTreeMap::new();
        let mut dropped = 0;

        for reading in records.iter().filter_map(Reading::from_raw) {
            let Some(value) = reading.value else {
                dropped += 1;
                continue;
            };
            let out_of_range = is_out_of_range(value, self.limits.get(&reading.sensor_id));
            groups
                .entry(reading.sensor_id.clone())
                .or_default()
                .push(value, &reading, out_of_range);
        }

        if dropped > 0 {
            debug!("Dropped {} readings without a numeric value", dropped);
        }

        let mut unlisted = 0;
        let summaries: Vec<ComplianceSummary> = groups
            .into_iter()
            .map(|(sensor_id, acc)| {
                let limits = self.limits.get(&sensor_id);
                if limits.is_none() {
                    warn!(
                        "Sensor {} has no limits configured; it cannot be marked non-compliant",
                        sensor_id
                    );
                    unlisted += 1;
                }
                summarise(sensor_id, acc, limits)
            })
            .collect();

        let non_compliant = summaries
            .iter()
            .filter(|s| !s.compliant.is_compliant())
            .count();
        info!(
            "Aggregated {} sensors: {} non-compliant, {} without limits",
            summaries.len(),
            non_compliant,
            unlisted
        );
        Ok(summaries)
    }
}

fn summarise(
    sensor_id: SensorId,
    acc: SensorAccumulator,
    limits: Option<&SensorLimits>,
) -> ComplianceSummary {
    let avg_out_of_spec = if acc.excursions > 0 {
        Some(acc.excursion_sum / acc.excursions as f64)
    } else {
        None
    };

    ComplianceSummary {
        sensor_id,
        sensor_name: limits.and_then(|l| l.sensor_name.clone()),
        uom: limits.and_then(|l| l.uom.clone()),
        min: acc.min,
        max: acc.max,
        mean: acc.sum / acc.count as f64,
        lim_min: limits.and_then(|l| l.lim_min),
        lim_max: limits.and_then(|l| l.lim_max),
        lim_avg: limits.and_then(|l| l.lim_avg),
        avg_out_of_spec,
        non_compliant_hours: acc.excursions,
        non_compliant_days: acc.excursion_days.len(),
        compliant: Compliance::from_excursions(acc.excursions),
    }
}
