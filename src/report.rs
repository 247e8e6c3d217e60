// Monthly compliance report output
//
// - csv_report: the processed_analysis_<YYYY>_<MM>.csv summary
// - pdf: A4 landscape PDF with the full and non-compliant tables
// - console: fixed-width table for the terminal
// - layout/table: shared column sizing, pagination and cell formatting

pub mod console;
pub mod csv_report;
pub mod layout;
pub mod pdf;
pub mod table;

pub use console::render_text_table;
pub use csv_report::{read_summary_csv, report_path, write_summary_csv};
pub use pdf::write_pdf_report;
pub use table::{full_table, non_compliant_table, ReportTable};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("PDF rendering failed: {0}")]
    Pdf(String),
    #[error("Summary file not found: {0}")]
    MissingSummary(String),
}
