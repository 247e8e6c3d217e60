use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sensor_compliance::config::Config;
use sensor_compliance::fetcher::SensorApiClient;
use sensor_compliance::report;
use sensor_compliance::sensor_directory;
use sensor_compliance::services::analysis_service::render_pdf_from_csv;
use sensor_compliance::services::{AnalysisOptions, AnalysisService};

#[derive(Parser)]
#[command(name = "sensor-compliance")]
#[command(about = "Monthly sensor compliance reports from the sensor API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a month of readings, aggregate compliance and write the reports
    Run {
        #[command(flatten)]
        period: Period,

        /// Also render the PDF report
        #[arg(long)]
        pdf: bool,

        /// Ignore cached sensor files and fetch everything again
        #[arg(long)]
        refresh: bool,

        /// Semicolon-delimited limits file (overrides LIMITS_FILE)
        #[arg(long)]
        limits_file: Option<PathBuf>,

        /// Directory for the summary CSV/PDF (overrides OUTPUT_DIR)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Directory for per-sensor cache files (overrides CACHE_DIR)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },

    /// Render the PDF from an existing summary CSV
    Report {
        #[command(flatten)]
        period: Period,

        /// Directory holding processed_analysis_<YYYY>_<MM>.csv
        #[arg(long, env = "OUTPUT_DIR", default_value = "./output")]
        output_dir: PathBuf,
    },

    /// List the sensor identifiers known to the API
    Sensors,
}

#[derive(Args)]
struct Period {
    /// Year (e.g., 2024)
    #[arg(long)]
    year: i32,

    /// Month (1-12, e.g., 9 for September)
    #[arg(long)]
    month: u32,
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing with environment filter support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sensor_compliance=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            period,
            pdf,
            refresh,
            limits_file,
            output_dir,
            cache_dir,
        } => {
            let mut config = Config::from_env()?;
            config.override_paths(limits_file, output_dir, cache_dir);
            info!("Starting sensor compliance run with config: {:?}", config);

            let service = AnalysisService::from_config(&config);
            let options = AnalysisOptions {
                render_pdf: pdf,
                refresh,
            };

            match service.full_analysis(period.year, period.month, options).await? {
                Some(outcome) => {
                    println!("\nFinal results:");
                    print!(
                        "{}",
                        report::render_text_table(&report::full_table(&outcome.summaries))
                    );
                    println!("\nSummary CSV: {}", outcome.csv_path.display());
                    if let Some(path) = outcome.pdf_path {
                        println!("PDF report: {}", path.display());
                    }
                }
                None => println!("Nothing to report for {}-{:02}", period.year, period.month),
            }
        }
        Command::Report { period, output_dir } => {
            let path = render_pdf_from_csv(&output_dir, period.year, period.month)?;
            println!("PDF saved successfully: {}", path.display());
        }
        Command::Sensors => {
            let config = Config::from_env()?;
            let client = SensorApiClient::new(config.base_url.clone(), config.credentials());
            let ids = sensor_directory::fetch_sensor_ids(&client).await;

            println!("Total sensors found: {}", ids.len());
            for id in &ids {
                println!("  {id}");
            }
        }
    }

    Ok(())
}
