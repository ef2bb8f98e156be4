use crate::error::{PipelineError, Staged, Warning};
use crate::types::{EventRecord, FactorRecord, FinalScoreMap};
use crate::util::{
    infer_cell_value, is_missing, looks_like_time_column, normalize_time_range, parse_f64_safe,
    parse_timestamp_dayfirst,
};
use csv::{ReaderBuilder, StringRecord};
use serde_json::Map;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

pub const CATEGORY_COLUMN: &str = "Factor Category";
pub const FACTOR_COLUMN: &str = "Factor";
pub const TIMESTAMP_COLUMN: &str = "Timestamp";

const FINAL_SCORE_LABEL: &str = "final score";

/// Melted factor table plus the final-score lookup pulled from it.
#[derive(Debug, Clone, Default)]
pub struct FactorTable {
    pub columns: Vec<String>,
    pub time_columns: Vec<String>,
    pub records: Vec<FactorRecord>,
    pub final_scores: FinalScoreMap,
    pub rows_read: usize,
    pub empty_rows_dropped: usize,
}

type Row = Vec<Option<String>>;

fn open_required(path: &Path) -> Result<File, PipelineError> {
    File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => PipelineError::MissingInput {
            path: path.to_path_buf(),
        },
        _ => PipelineError::Io(e),
    })
}

fn to_row(record: &StringRecord, width: usize) -> Row {
    (0..width)
        .map(|i| {
            let cell = record.get(i);
            if is_missing(cell) {
                None
            } else {
                cell.map(str::to_string)
            }
        })
        .collect()
}

/// Load the wide factor table and reshape it into one record per
/// (category, factor, time range) cell.
///
/// Line 1 is a banner and is discarded; line 2 holds the real header.
/// The first two columns are the category and factor labels, whatever
/// they are called; blank ones are given their canonical names.
pub fn load_factor_table(path: &Path) -> Result<Staged<FactorTable>, PipelineError> {
    let file = open_required(path)?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);
    let mut lines = rdr.records();

    let empty = || PipelineError::EmptyTable {
        path: path.to_path_buf(),
    };
    lines.next().ok_or_else(empty)??;
    let header_record = lines.next().ok_or_else(empty)??;

    let mut columns: Vec<String> = header_record.iter().map(|h| h.trim().to_string()).collect();
    if columns.len() < 2 {
        return Err(PipelineError::MissingColumn {
            path: path.to_path_buf(),
            column: FACTOR_COLUMN.to_string(),
        });
    }
    for (idx, name) in [CATEGORY_COLUMN, FACTOR_COLUMN].into_iter().enumerate() {
        if columns[idx].is_empty() {
            columns[idx] = name.to_string();
        }
    }
    info!(?columns, "factor table columns");

    let mut rows: Vec<Row> = Vec::new();
    for result in lines {
        rows.push(to_row(&result?, columns.len()));
    }
    let rows_read = rows.len();

    forward_fill(&mut rows, 0);
    rows.retain(|row| row.iter().any(Option::is_some));
    let empty_rows_dropped = rows_read - rows.len();

    let time_columns: Vec<usize> = (2..columns.len())
        .filter(|&i| looks_like_time_column(&columns[i]))
        .collect();
    info!(
        time_columns = ?time_columns.iter().map(|&i| &columns[i]).collect::<Vec<_>>(),
        "time columns found"
    );

    let mut staged = Staged::new(FactorTable::default());
    let records = melt(&rows, &columns, &time_columns, &mut staged);
    info!(records = records.len(), "factor records found");

    let final_scores = extract_final_scores(&rows, &columns, &time_columns, &mut staged);
    debug!(keys = ?final_scores.keys().collect::<Vec<_>>(), "final score map");

    staged.value = FactorTable {
        time_columns: time_columns.iter().map(|&i| columns[i].clone()).collect(),
        columns,
        records,
        final_scores,
        rows_read,
        empty_rows_dropped,
    };
    Ok(staged)
}

/// Fill gaps in one column with the nearest non-empty value above.
fn forward_fill(rows: &mut [Row], col: usize) {
    let mut last_seen: Option<String> = None;
    for row in rows.iter_mut() {
        if row[col].is_some() {
            last_seen = row[col].clone();
        } else {
            row[col] = last_seen.clone();
        }
    }
}

/// Wide -> long, column by column. Cells without a factor name or value are
/// dropped; non-numeric values are dropped with a warning.
fn melt(
    rows: &[Row],
    columns: &[String],
    time_columns: &[usize],
    staged: &mut Staged<FactorTable>,
) -> Vec<FactorRecord> {
    let mut out = Vec::new();
    for &col in time_columns {
        let time_range = &columns[col];
        for row in rows {
            let (Some(factor), Some(raw)) = (&row[1], &row[col]) else {
                continue;
            };
            let Some(value) = parse_f64_safe(Some(raw.as_str())) else {
                staged.warn(Warning::NonNumericValue {
                    factor: factor.trim().to_string(),
                    time_range: time_range.clone(),
                    raw: raw.clone(),
                });
                continue;
            };
            out.push(FactorRecord {
                category: row[0].clone().unwrap_or_default(),
                factor: factor.clone(),
                time_range: time_range.clone(),
                value,
            });
        }
    }
    out
}

fn extract_final_scores(
    rows: &[Row],
    columns: &[String],
    time_columns: &[usize],
    staged: &mut Staged<FactorTable>,
) -> FinalScoreMap {
    let mut scores = FinalScoreMap::new();
    let score_row = rows.iter().find(|row| {
        row[0]
            .as_deref()
            .is_some_and(|c| c.trim().to_lowercase() == FINAL_SCORE_LABEL)
    });
    let Some(score_row) = score_row else {
        staged.warn(Warning::MissingFinalScoreRow);
        return scores;
    };

    for &col in time_columns {
        let Some(raw) = &score_row[col] else {
            continue;
        };
        match parse_f64_safe(Some(raw.as_str())) {
            Some(score) => {
                scores.insert(normalize_time_range(&columns[col]), score);
            }
            None => staged.warn(Warning::NonNumericValue {
                factor: "Final Score".to_string(),
                time_range: columns[col].clone(),
                raw: raw.clone(),
            }),
        }
    }
    scores
}

/// Load the position-report log. A missing file yields an empty log.
///
/// Rows whose `Timestamp` does not parse are dropped. Every other column is
/// kept as-is, in file order.
pub fn load_event_log(path: &Path) -> Result<Staged<Vec<EventRecord>>, PipelineError> {
    let mut staged = Staged::new(Vec::new());
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            staged.warn(Warning::EventLogMissing {
                path: path.to_path_buf(),
            });
            return Ok(staged);
        }
        Err(e) => return Err(e.into()),
    };

    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(file);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if headers.is_empty() {
        info!(path = %path.display(), "event log is empty");
        return Ok(staged);
    }
    let ts_idx = headers
        .iter()
        .position(|h| h == TIMESTAMP_COLUMN)
        .ok_or_else(|| PipelineError::MissingColumn {
            path: path.to_path_buf(),
            column: TIMESTAMP_COLUMN.to_string(),
        })?;

    let mut total_rows = 0usize;
    for (idx, result) in rdr.records().enumerate() {
        let record = result?;
        total_rows += 1;
        let raw_ts = record.get(ts_idx).unwrap_or_default();
        let Some(timestamp) = parse_timestamp_dayfirst(raw_ts) else {
            staged.warn(Warning::UnparseableTimestamp {
                row: idx + 1,
                raw: raw_ts.to_string(),
            });
            continue;
        };

        let mut fields = Map::new();
        for (col, name) in headers.iter().enumerate() {
            let value = record
                .get(col)
                .map(infer_cell_value)
                .unwrap_or(serde_json::Value::Null);
            fields.insert(name.clone(), value);
        }
        staged.value.push(EventRecord { timestamp, fields });
    }

    info!(
        kept = staged.value.len(),
        dropped = total_rows - staged.value.len(),
        "event records loaded"
    );
    Ok(staged)
}
