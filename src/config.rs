// Fixed input/output locations for a run.
//
// The tool takes no flags; everything it reads and writes sits next to the
// working directory. Tests build their own config pointing at temp files.
use std::path::PathBuf;

pub const FACTOR_TABLE_PATH: &str = "4-21-day-result.csv";
pub const EVENT_LOG_PATH: &str = "AIS.csv";
pub const OUTPUT_PATH: &str = "consolidated_ship_data.json";

/// Number of hourly records shown in the console preview table.
pub const PREVIEW_ROWS: usize = 3;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub factor_table: PathBuf,
    pub event_log: PathBuf,
    pub output: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            factor_table: PathBuf::from(FACTOR_TABLE_PATH),
            event_log: PathBuf::from(EVENT_LOG_PATH),
            output: PathBuf::from(OUTPUT_PATH),
        }
    }
}
