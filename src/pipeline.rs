//! One pass from the two input tables to the consolidated JSON document.

use std::path::PathBuf;
use tracing::info;

use crate::aggregate::build_hourly_records;
use crate::config::{PipelineConfig, PREVIEW_ROWS};
use crate::error::PipelineError;
use crate::loader::{load_event_log, load_factor_table};
use crate::output::write_json;
use crate::types::HourlyPreviewRow;

/// Counts reported to the user after a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub factor_records: usize,
    pub final_scores: usize,
    pub event_rows: usize,
    pub hourly_records: usize,
    pub warnings: usize,
    pub output: PathBuf,
    pub preview: Vec<HourlyPreviewRow>,
}

/// Load, aggregate and write. Any fatal error returns before the output
/// file is created or touched.
#[tracing::instrument(skip_all, fields(factor_table = %config.factor_table.display()))]
pub fn run(config: &PipelineConfig) -> Result<RunSummary, PipelineError> {
    let factors = load_factor_table(&config.factor_table)?;
    let events = load_event_log(&config.event_log)?;

    let table = &factors.value;
    info!(
        columns = table.columns.len(),
        time_columns = table.time_columns.len(),
        rows = table.rows_read,
        empty_rows_dropped = table.empty_rows_dropped,
        "factor table loaded"
    );
    let hourly = build_hourly_records(&table.records, &table.final_scores, &events.value);

    write_json(&config.output, &hourly.value)?;

    let warnings = factors.warnings.len() + events.warnings.len() + hourly.warnings.len();
    info!(
        records = hourly.value.len(),
        warnings,
        output = %config.output.display(),
        "consolidated document written"
    );

    Ok(RunSummary {
        factor_records: table.records.len(),
        final_scores: table.final_scores.len(),
        event_rows: events.value.len(),
        hourly_records: hourly.value.len(),
        warnings,
        output: config.output.clone(),
        preview: hourly
            .value
            .iter()
            .take(PREVIEW_ROWS)
            .map(HourlyPreviewRow::from)
            .collect(),
    })
}
