pub mod analysis_service;
pub mod compliance_service;
pub mod retrieval_service;

pub use analysis_service::{AnalysisOptions, AnalysisOutcome, AnalysisService, PipelineError};
pub use compliance_service::{AggregateError, ComplianceService};
pub use retrieval_service::{MonthlyData, RetrievalService, RetrievalStats};
