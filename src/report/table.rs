use std::cmp::Ordering;

use crate::store::ComplianceSummary;

pub const REMARKS_HEADER: &str = "Remarks";

const FULL_HEADERS: [&str; 9] = [
    "SensorName",
    "UOM",
    "min",
    "max",
    "mean",
    "avg_out_of_spec",
    "non_compliant_hours",
    "non_compliant_days",
    "Compliant Yes/No",
];

const NON_COMPLIANT_HEADERS: [&str; 6] = [
    "SensorName",
    "UOM",
    "avg_out_of_spec",
    "non_compliant_hours",
    "non_compliant_days",
    REMARKS_HEADER,
];

/// Rendered (already formatted) table ready for layout
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One decimal place; missing values render as an empty cell
pub fn format_number(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.1}")).unwrap_or_default()
}

fn format_count(value: usize) -> String {
    format!("{:.1}", value as f64)
}

/// Summaries ordered by display name, unnamed sensors last
fn sorted_by_name(summaries: &[ComplianceSummary]) -> Vec<&ComplianceSummary> {
    let mut sorted: Vec<&ComplianceSummary> = summaries.iter().collect();
    sorted.sort_by(|a, b| match (&a.sensor_name, &b.sensor_name) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    sorted
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|h| h.to_string()).collect()
}

/// Every sensor, without the identifier column
pub fn full_table(summaries: &[ComplianceSummary]) -> ReportTable {
    let rows = sorted_by_name(summaries)
        .into_iter()
        .map(|s| {
            vec![
                s.sensor_name.clone().unwrap_or_default(),
                s.uom.clone().unwrap_or_default(),
                format_number(Some(s.min)),
                format_number(Some(s.max)),
                format_number(Some(s.mean)),
                format_number(s.avg_out_of_spec),
                format_count(s.non_compliant_hours),
                format_count(s.non_compliant_days),
                s.compliant.yes_no().to_string(),
            ]
        })
        .collect();

    ReportTable {
        headers: headers(&FULL_HEADERS),
        rows,
    }
}

/// Non-compliant sensors only, with a blank remarks column to fill in by hand
pub fn non_compliant_table(summaries: &[ComplianceSummary]) -> ReportTable {
    let rows = sorted_by_name(summaries)
        .into_iter()
        .filter(|s| !s.compliant.is_compliant())
        .map(|s| {
            vec![
                s.sensor_name.clone().unwrap_or_default(),
                s.uom.clone().unwrap_or_default(),
                format_number(s.avg_out_of_spec),
                format_count(s.non_compliant_hours),
                format_count(s.non_compliant_days),
                String::new(),
            ]
        })
        .collect();

    ReportTable {
        headers: headers(&NON_COMPLIANT_HEADERS),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Compliance, SensorId};

    fn summary(id: &str, name: Option<&str>, hours: usize) -> ComplianceSummary {
        ComplianceSummary {
            sensor_id: SensorId::new(id),
            sensor_name: name.map(str::to_string),
            uom: Some("C".to_string()),
            min: 1.0,
            max: 9.0,
            mean: 5.0,
            lim_min: Some(2.0),
            lim_max: Some(8.0),
            lim_avg: Some(5.0),
            avg_out_of_spec: if hours > 0 { Some(5.0) } else { None },
            non_compliant_hours: hours,
            non_compliant_days: hours.min(1),
            compliant: Compliance::from_excursions(hours),
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(Some(5.0)), "5.0");
        assert_eq!(format_number(Some(-18.46)), "-18.5");
        assert_eq!(format_number(None), "");
    }

    #[test]
    fn test_full_table_sorted_by_name_without_id() {
        let summaries = vec![
            summary("1", Some("Walk-in"), 0),
            summary("2", None, 0),
            summary("3", Some("Fridge"), 2),
        ];
        let table = full_table(&summaries);

        assert_eq!(table.headers.len(), 9);
        assert!(!table.headers.iter().any(|h| h == "SensorID"));
        let names: Vec<&str> = table.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(names, vec!["Fridge", "Walk-in", ""]);
        assert_eq!(table.rows[0][6], "2.0");
        assert_eq!(table.rows[0][8], "No");
        assert_eq!(table.rows[1][5], "");
    }

    #[test]
    fn test_non_compliant_table_filters_and_adds_remarks() {
        let summaries = vec![
            summary("1", Some("Walk-in"), 0),
            summary("3", Some("Fridge"), 2),
        ];
        let table = non_compliant_table(&summaries);

        assert_eq!(table.headers.last().map(String::as_str), Some(REMARKS_HEADER));
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], "Fridge");
        assert_eq!(table.rows[0][5], "");
    }

    #[test]
    fn test_non_compliant_table_empty_when_all_compliant() {
        let table = non_compliant_table(&[summary("1", Some("A"), 0)]);
        assert!(table.is_empty());
    }
}
