use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::report::ReportError;
use crate::store::ComplianceSummary;

/// `processed_analysis_<YYYY>_<MM>.<extension>` inside `dir`
pub fn report_path(dir: &Path, year: i32, month: u32, extension: &str) -> PathBuf {
    dir.join(format!("processed_analysis_{year}_{month:02}.{extension}"))
}

/// Write the summary CSV, replacing any earlier report for the same period
#[instrument(skip(path, summaries), fields(path = %path.display(), rows = summaries.len()))]
pub fn write_summary_csv(path: &Path, summaries: &[ComplianceSummary]) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for summary in summaries {
        writer.serialize(summary)?;
    }
    writer.flush()?;

    info!("Processed analysis saved to {}", path.display());
    Ok(())
}

/// Read a summary CSV written by [`write_summary_csv`]
#[instrument(skip(path), fields(path = %path.display()))]
pub fn read_summary_csv(path: &Path) -> Result<Vec<ComplianceSummary>, ReportError> {
    if !path.is_file() {
        return Err(ReportError::MissingSummary(path.display().to_string()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let summaries = reader
        .deserialize()
        .collect::<Result<Vec<ComplianceSummary>, csv::Error>>()?;

    debug!("Loaded {} summary rows", summaries.len());
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Compliance, SensorId};

    fn summary() -> ComplianceSummary {
        ComplianceSummary {
            sensor_id: SensorId::new("10"),
            sensor_name: Some("Fridge".to_string()),
            uom: Some("C".to_string()),
            min: 1.0,
            max: 9.0,
            mean: 5.0,
            lim_min: Some(2.0),
            lim_max: Some(8.0),
            lim_avg: Some(5.0),
            avg_out_of_spec: Some(5.0),
            non_compliant_hours: 2,
            non_compliant_days: 1,
            compliant: Compliance::NonCompliant,
        }
    }

    #[test]
    fn test_report_path() {
        let path = report_path(Path::new("/out"), 2024, 9, "csv");
        assert_eq!(path, PathBuf::from("/out/processed_analysis_2024_09.csv"));
    }

    #[test]
    fn test_csv_header_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = report_path(dir.path(), 2024, 12, "csv");
        let mut unlisted = summary();
        unlisted.sensor_id = SensorId::new("99");
        unlisted.sensor_name = None;
        unlisted.uom = None;
        unlisted.lim_min = None;
        unlisted.lim_max = None;
        unlisted.lim_avg = None;
        unlisted.avg_out_of_spec = None;
        unlisted.non_compliant_hours = 0;
        unlisted.non_compliant_days = 0;
        unlisted.compliant = Compliance::Compliant;

        write_summary_csv(&path, &[summary(), unlisted]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("SensorID,SensorName,UOM,min,max,mean,lim_min,lim_max,lim_avg,avg_out_of_spec,non_compliant_hours,non_compliant_days,Compliant Yes/No")
        );
        assert_eq!(lines.next(), Some("10,Fridge,C,1.0,9.0,5.0,2.0,8.0,5.0,5.0,2,1,No"));
        assert_eq!(lines.next(), Some("99,,,1.0,9.0,5.0,,,,,0,0,Yes"));

        let loaded = read_summary_csv(&path).unwrap();
        assert_eq!(loaded[0], summary());
        assert_eq!(loaded[1].sensor_name, None);
        assert_eq!(loaded[1].compliant, Compliance::Compliant);
    }

    #[test]
    fn test_rewrite_overwrites_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = report_path(dir.path(), 2024, 12, "csv");

        write_summary_csv(&path, &[summary(), summary()]).unwrap();
        write_summary_csv(&path, &[summary()]).unwrap();

        assert_eq!(read_summary_csv(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_read_missing_summary() {
        let result = read_summary_csv(Path::new("/nonexistent/processed_analysis_2024_01.csv"));
        assert!(matches!(result, Err(ReportError::MissingSummary(_))));
    }
}
