// Entry point.
//
// Reads the wide factor table and the optional AIS position log from the
// working directory, joins them hour by hour and writes
// `consolidated_ship_data.json`. Diagnostics go to stderr through `tracing`
// (tune with `RUST_LOG`); the run summary goes to stdout.
mod aggregate;
mod config;
mod error;
mod loader;
mod output;
mod pipeline;
mod types;
mod util;

use config::{PipelineConfig, PREVIEW_ROWS};
use error::PipelineError;
use pipeline::RunSummary;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Successfully created '{}' with {} time periods.",
        summary.output.display(),
        util::format_int(summary.hourly_records)
    );
    println!(
        "({} factor records, {} final scores, {} AIS rows, {} warnings)\n",
        util::format_int(summary.factor_records),
        util::format_int(summary.final_scores),
        util::format_int(summary.event_rows),
        util::format_int(summary.warnings)
    );
    println!("Sample output structure:\n");
    output::preview_table_rows(&summary.preview, PREVIEW_ROWS);
}

fn main() -> ExitCode {
    init_logging();

    let config = PipelineConfig::default();
    match pipeline::run(&config) {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(PipelineError::MissingInput { path }) => {
            eprintln!("Error: could not find a required file.");
            eprintln!(
                "Please make sure '{}' is in the working directory.",
                path.display()
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("An unexpected error occurred: {}", e);
            ExitCode::FAILURE
        }
    }
}
