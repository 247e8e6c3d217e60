use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils;

/// Column carrying the sensor identifier in API records and cache files
pub const SENSOR_ID_COLUMN: &str = "SensorID";
/// Column carrying the reading value
pub const VALUE_COLUMN: &str = "PlotValue";
/// Column carrying the wrapped `/Date(...)/` timestamp
pub const TIMESTAMP_COLUMN: &str = "MessageDate";

/// Opaque sensor identifier as issued by the sensor API
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorId(String);

impl SensorId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SensorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One reading record exactly as the API returned it, field order preserved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: Vec<(String, String)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a JSON object into textual fields
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let fields = object
            .iter()
            .map(|(key, value)| (key.clone(), json_to_text(value)))
            .collect();
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replace a field in place, or append it if absent
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(field) => field.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Stamp the record with its sensor, always as the last column
    pub fn with_sensor_id(mut self, sensor_id: &SensorId) -> Self {
        self.remove(SENSOR_ID_COLUMN);
        self.fields
            .push((SENSOR_ID_COLUMN.to_string(), sensor_id.to_string()));
        self
    }

    pub fn sensor_id(&self) -> Option<SensorId> {
        self.get(SENSOR_ID_COLUMN)
            .filter(|v| !v.trim().is_empty())
            .map(SensorId::new)
    }
}

fn json_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Typed projection of a [`RawRecord`] used by the aggregator
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub sensor_id: SensorId,
    pub timestamp: Option<DateTime<Utc>>,
    pub value: Option<f64>,
}

impl Reading {
    /// Project a raw record; returns `None` when it has no sensor identifier
    pub fn from_raw(record: &RawRecord) -> Option<Self> {
        let sensor_id = record.sensor_id()?;
        let timestamp = record
            .get(TIMESTAMP_COLUMN)
            .and_then(utils::decode_wrapped_timestamp);
        let value = record.get(VALUE_COLUMN).and_then(coerce_numeric);

        Some(Self {
            sensor_id,
            timestamp,
            value,
        })
    }
}

/// Lenient numeric coercion: anything unparseable or non-finite is no value
pub fn coerce_numeric(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Compliance thresholds and display metadata for one sensor
#[derive(Debug, Clone, PartialEq)]
pub struct SensorLimits {
    pub sensor_id: SensorId,
    pub lim_min: Option<f64>,
    pub lim_max: Option<f64>,
    pub lim_avg: Option<f64>,
    pub uom: Option<String>,
    pub sensor_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compliance {
    #[serde(rename = "Yes")]
    Compliant,
    #[serde(rename = "No")]
    NonCompliant,
}

impl Compliance {
    pub fn from_excursions(non_compliant_readings: usize) -> Self {
        if non_compliant_readings == 0 {
            Compliance::Compliant
        } else {
            Compliance::NonCompliant
        }
    }

    pub fn is_compliant(self) -> bool {
        self == Compliance::Compliant
    }

    /// Value shown in the "Compliant Yes/No" report column
    pub fn yes_no(self) -> &'static str {
        match self {
            Compliance::Compliant => "Yes",
            Compliance::NonCompliant => "No",
        }
    }
}

impl fmt::Display for Compliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compliance::Compliant => f.write_str("Compliant"),
            Compliance::NonCompliant => f.write_str("Non-compliant"),
        }
    }
}

/// One row of the monthly compliance report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceSummary {
    #[serde(rename = "SensorID")]
    pub sensor_id: SensorId,
    #[serde(rename = "SensorName")]
    pub sensor_name: Option<String>,
    #[serde(rename = "UOM")]
    pub uom: Option<String>,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub lim_min: Option<f64>,
    pub lim_max: Option<f64>,
    pub lim_avg: Option<f64>,
    pub avg_out_of_spec: Option<f64>,
    pub non_compliant_hours: usize,
    pub non_compliant_days: usize,
    #[serde(rename = "Compliant Yes/No")]
    pub compliant: Compliance,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_record_from_json_object() {
        let value = json!({
            "PlotValue": "4.5",
            "MessageDate": "/Date(1700000000000)/",
            "SignalStrength": 84,
            "Battery": null,
            "PlotValues": [4.5, 40.1]
        });
        let record = RawRecord::from_json_object(value.as_object().unwrap());

        assert_eq!(record.get("PlotValue"), Some("4.5"));
        assert_eq!(record.get("SignalStrength"), Some("84"));
        assert_eq!(record.get("Battery"), Some(""));
        assert_eq!(record.get("PlotValues"), Some("[4.5,40.1]"));
        assert_eq!(record.get("Missing"), None);
    }

    #[test]
    fn test_with_sensor_id_is_last_column() {
        let mut record = RawRecord::new();
        record.set("SensorID", "99");
        record.set("PlotValue", "1");
        let record = record.with_sensor_id(&SensorId::new("10"));

        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["PlotValue", "SensorID"]);
        assert_eq!(record.sensor_id(), Some(SensorId::new("10")));
    }

    #[test]
    fn test_reading_from_raw() {
        let mut record = RawRecord::new();
        record.set("PlotValue", " 7.25 ");
        record.set("MessageDate", "/Date(1700000000000)/");
        let record = record.with_sensor_id(&SensorId::new("10"));

        let reading = Reading::from_raw(&record).unwrap();
        assert_eq!(reading.value, Some(7.25));
        assert_eq!(reading.timestamp.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_reading_without_sensor_id() {
        let mut record = RawRecord::new();
        record.set("PlotValue", "1");
        assert!(Reading::from_raw(&record).is_none());
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(coerce_numeric("3"), Some(3.0));
        assert_eq!(coerce_numeric("-1.5"), Some(-1.5));
        assert_eq!(coerce_numeric(""), None);
        assert_eq!(coerce_numeric("abc"), None);
        assert_eq!(coerce_numeric("NaN"), None);
        assert_eq!(coerce_numeric("inf"), None);
    }

    #[test]
    fn test_compliance_from_excursions() {
        assert_eq!(Compliance::from_excursions(0), Compliance::Compliant);
        assert_eq!(Compliance::from_excursions(3), Compliance::NonCompliant);
        assert_eq!(Compliance::NonCompliant.yes_no(), "No");
        assert_eq!(Compliance::NonCompliant.to_string(), "Non-compliant");
    }
}
