use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::fetcher::SensorApiClient;
use crate::limits::{LimitsError, LimitsTable};
use crate::report::{self, ReportError};
use crate::sensor_directory;
use crate::services::compliance_service::{AggregateError, ComplianceService};
use crate::services::retrieval_service::{RetrievalService, RetrievalStats};
use crate::store::{ComplianceSummary, ReadingCache, StoreError};
use crate::utils;

/// Error types for a full analysis run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid reporting period {year}-{month}")]
    InvalidPeriod { year: i32, month: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache error: {0}")]
    Store(#[from] StoreError),

    #[error("Limits error: {0}")]
    Limits(#[from] LimitsError),

    #[error("Aggregation error: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisOptions {
    pub render_pdf: bool,
    /// Ignore cached sensor files and fetch everything again
    pub refresh: bool,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub summaries: Vec<ComplianceSummary>,
    pub csv_path: PathBuf,
    pub pdf_path: Option<PathBuf>,
    pub retrieval: RetrievalStats,
}

pub fn validate_period(year: i32, month: u32) -> Result<(), PipelineError> {
    match utils::month_bounds(year, month) {
        Some(_) => Ok(()),
        None => Err(PipelineError::InvalidPeriod { year, month }),
    }
}

/// Fetch -> cache -> join -> aggregate -> report, for one calendar month
#[derive(Clone)]
pub struct AnalysisService {
    client: SensorApiClient,
    retrieval: RetrievalService,
    limits_file: PathBuf,
    output_dir: PathBuf,
    cache_dir: PathBuf,
}

impl AnalysisService {
    pub fn new(
        client: SensorApiClient,
        limits_file: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        let cache_dir = cache_dir.into();
        Self {
            retrieval: RetrievalService::new(client.clone(), ReadingCache::new(&cache_dir)),
            client,
            limits_file: limits_file.into(),
            output_dir: output_dir.into(),
            cache_dir,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let client = SensorApiClient::new(config.base_url.clone(), config.credentials());
        Self::new(
            client,
            config.limits_file.clone(),
            config.output_dir.clone(),
            config.cache_dir.clone(),
        )
    }

    /// Run the whole pipeline
    ///
    /// Returns `Ok(None)` when there is nothing to report: no sensors, or no
    /// readings for any sensor in the period.
    #[instrument(skip(self))]
    pub async fn full_analysis(
        &self,
        year: i32,
        month: u32,
        options: AnalysisOptions,
    ) -> Result<Option<AnalysisOutcome>, PipelineError> {
        validate_period(year, month)?;
        info!("Starting full analysis for {}-{:02}", year, month);

        std::fs::create_dir_all(&self.output_dir)?;
        std::fs::create_dir_all(&self.cache_dir)?;

        let sensor_ids = sensor_directory::fetch_sensor_ids(&self.client).await;
        if sensor_ids.is_empty() {
            warn!("No sensors found. Exiting analysis.");
            return Ok(None);
        }

        let monthly = self
            .retrieval
            .get_monthly_data(&sensor_ids, year, month, options.refresh)
            .await?;
        if monthly.is_empty() {
            warn!("No data available for processing.");
            return Ok(None);
        }

        info!("Processing the retrieved monthly data...");
        let limits = LimitsTable::load(&self.limits_file)?;
        let summaries = ComplianceService::new(limits).aggregate(&monthly.records)?;

        let csv_path = report::report_path(&self.output_dir, year, month, "csv");
        report::write_summary_csv(&csv_path, &summaries)?;

        let pdf_path = if options.render_pdf {
            let path = report::report_path(&self.output_dir, year, month, "pdf");
            report::write_pdf_report(&path, &utils::month_label(year, month), &summaries)?;
            Some(path)
        } else {
            None
        };

        info!("Data processing complete.");
        Ok(Some(AnalysisOutcome {
            summaries,
            csv_path,
            pdf_path,
            retrieval: monthly.stats,
        }))
    }
}

/// Render the PDF for a period from its existing summary CSV
#[instrument]
pub fn render_pdf_from_csv(output_dir: &Path, year: i32, month: u32) -> Result<PathBuf, PipelineError> {
    validate_period(year, month)?;

    let csv_path = report::report_path(output_dir, year, month, "csv");
    let summaries = report::read_summary_csv(&csv_path)?;

    let pdf_path = report::report_path(output_dir, year, month, "pdf");
    report::write_pdf_report(&pdf_path, &utils::month_label(year, month), &summaries)?;
    Ok(pdf_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_period() {
        assert!(validate_period(2024, 12).is_ok());
        assert!(matches!(
            validate_period(2024, 13),
            Err(PipelineError::InvalidPeriod { year: 2024, month: 13 })
        ));
        assert!(validate_period(2024, 0).is_err());
    }
}
