use crate::error::{Staged, Warning};
use crate::loader::TIMESTAMP_COLUMN;
use crate::types::{Category, EventRecord, FactorRecord, FinalScoreMap, HourlyRecord};
use crate::util::{canonical_category, format_timestamp, normalize_time_range, parse_start_hour};
use chrono::Timelike;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Build one record per distinct time range, in label order.
///
/// Labels are sorted as plain strings, so `10:00 - 11:00` sorts before
/// `2:00 - 3:00`. Buckets whose leading hour does not parse are skipped;
/// buckets with no matching factors or events are still emitted.
pub fn build_hourly_records(
    factors: &[FactorRecord],
    final_scores: &FinalScoreMap,
    events: &[EventRecord],
) -> Staged<Vec<HourlyRecord>> {
    let mut by_range: BTreeMap<&str, Vec<&FactorRecord>> = BTreeMap::new();
    for f in factors {
        by_range.entry(f.time_range.as_str()).or_default().push(f);
    }
    info!(
        count = by_range.len(),
        time_ranges = ?by_range.keys().collect::<Vec<_>>(),
        "processing time ranges"
    );

    let mut staged = Staged::new(Vec::with_capacity(by_range.len()));
    for (time_range, in_range) in by_range {
        let Some(start_hour) = parse_start_hour(time_range) else {
            staged.warn(Warning::InvalidTimeRange {
                label: time_range.to_string(),
            });
            continue;
        };

        let key = normalize_time_range(time_range);
        let final_score = final_scores.get(&key).copied();
        debug!(time_range, normalized = %key, ?final_score, "time range");

        let mut record = HourlyRecord::new(time_range.to_string(), final_score);
        record.ais_data = events
            .iter()
            .filter(|e| i64::from(e.timestamp.hour()) == start_hour)
            .map(event_json)
            .collect();

        for f in in_range {
            match Category::from_label(&f.category) {
                Some(category) => {
                    record
                        .bucket_mut(category)
                        .insert(f.factor.trim().to_string(), Value::from(f.value));
                }
                None => {
                    let category = canonical_category(&f.category);
                    staged.warn(Warning::UnknownCategory {
                        time_range: time_range.to_string(),
                        category: if category.is_empty() {
                            "unknown".to_string()
                        } else {
                            category
                        },
                    });
                }
            }
        }

        debug!(
            time_range,
            factors = record.factor_count(),
            ais_rows = record.ais_data.len(),
            "added hourly record"
        );
        staged.value.push(record);
    }
    staged
}

/// Event fields as emitted, with the timestamp in display form.
fn event_json(event: &EventRecord) -> Map<String, Value> {
    let mut fields = event.fields.clone();
    fields.insert(
        TIMESTAMP_COLUMN.to_string(),
        Value::String(format_timestamp(&event.timestamp)),
    );
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn factor(category: &str, name: &str, time_range: &str, value: f64) -> FactorRecord {
        FactorRecord {
            category: category.to_string(),
            factor: name.to_string(),
            time_range: time_range.to_string(),
            value,
        }
    }

    fn event(hour: u32, minute: u32, mmsi: i64) -> EventRecord {
        let timestamp = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap();
        let mut fields = Map::new();
        fields.insert("Timestamp".to_string(), json!("raw"));
        fields.insert("MMSI".to_string(), json!(mmsi));
        EventRecord { timestamp, fields }
    }

    #[test]
    fn builds_record_with_final_score() {
        let factors = vec![factor("Ship Factors", "Speed", "0:00 - 1:00", 12.5)];
        let scores = FinalScoreMap::from([("0:00-1:00".to_string(), 0.82)]);
        let out = build_hourly_records(&factors, &scores, &[]);
        assert!(out.warnings.is_empty());
        let record = &out.value[0];
        assert_eq!(record.time_range, "0:00 - 1:00");
        assert_eq!(record.ship_factors["Speed"], json!(12.5));
        assert_eq!(record.final_score, Some(0.82));
        assert!(record.ais_data.is_empty());
    }

    #[test]
    fn final_score_matches_across_dash_glyphs() {
        let factors = vec![factor("Human Factors", "Fatigue", "3:00 \u{2013} 4:00", 0.3)];
        let scores = FinalScoreMap::from([("3:00-4:00".to_string(), 0.5)]);
        let out = build_hourly_records(&factors, &scores, &[]);
        assert_eq!(out.value[0].final_score, Some(0.5));
    }

    #[test]
    fn one_record_per_distinct_range_in_label_order() {
        let factors = vec![
            factor("Ship Factors", "Speed", "2:00 - 3:00", 1.0),
            factor("Ship Factors", "Speed", "10:00 - 11:00", 2.0),
            factor("Human Factors", "Fatigue", "2:00 - 3:00", 3.0),
            factor("Ship Factors", "Speed", "0:00 - 1:00", 4.0),
        ];
        let out = build_hourly_records(&factors, &FinalScoreMap::new(), &[]);
        let labels: Vec<&str> = out.value.iter().map(|r| r.time_range.as_str()).collect();
        assert_eq!(labels, vec!["0:00 - 1:00", "10:00 - 11:00", "2:00 - 3:00"]);
        assert!(out.value.iter().all(|r| r.final_score.is_none()));
    }

    #[test]
    fn events_join_on_start_hour() {
        let factors = vec![
            factor("Ship Factors", "Speed", "0:00 - 1:00", 1.0),
            factor("Ship Factors", "Speed", "1:00 - 2:00", 1.0),
        ];
        let events = vec![event(0, 45, 1), event(1, 5, 2), event(0, 10, 3), event(5, 0, 4)];
        let out = build_hourly_records(&factors, &FinalScoreMap::new(), &events);
        let first = &out.value[0];
        assert_eq!(first.ais_data.len(), 2);
        assert_eq!(first.ais_data[0]["Timestamp"], json!("2024-01-01 00:45:00"));
        assert_eq!(first.ais_data[0]["MMSI"], json!(1));
        assert_eq!(first.ais_data[1]["MMSI"], json!(3));
        let keys: Vec<&String> = first.ais_data[0].keys().collect();
        assert_eq!(keys, vec!["Timestamp", "MMSI"]);
        assert_eq!(out.value[1].ais_data.len(), 1);
    }

    #[test]
    fn invalid_leading_hour_drops_bucket() {
        let factors = vec![
            factor("Ship Factors", "Speed", "0:00 - 1:00", 1.0),
            factor("Ship Factors", "Speed", "noon: - 1pm", 1.0),
        ];
        let out = build_hourly_records(&factors, &FinalScoreMap::new(), &[]);
        assert_eq!(out.value.len(), 1);
        assert_eq!(
            out.warnings,
            vec![Warning::InvalidTimeRange {
                label: "noon: - 1pm".to_string()
            }]
        );
    }

    #[test]
    fn unknown_categories_are_dropped_with_warning() {
        let factors = vec![
            factor("Final Score", "", "0:00 - 1:00", 0.8),
            factor("Weather", "Wind", "0:00 - 1:00", 3.0),
            factor("External Environment Factors", "Wind", "0:00 - 1:00", 4.0),
        ];
        let out = build_hourly_records(&factors, &FinalScoreMap::new(), &[]);
        let record = &out.value[0];
        assert_eq!(record.factor_count(), 1);
        assert_eq!(record.external_environment_factors["Wind"], json!(4.0));
        assert_eq!(out.warnings.len(), 2);
        assert!(out.warnings.iter().all(|w| w.kind() == "unknown_category"));
    }

    #[test]
    fn factor_names_are_trimmed_and_last_value_wins() {
        let factors = vec![
            factor("Ship Factors", " Speed ", "0:00 - 1:00", 1.0),
            factor("Ship Factors", "Draft", "0:00 - 1:00", 2.0),
            factor("Ship Factors", "Speed", "0:00 - 1:00", 3.0),
        ];
        let out = build_hourly_records(&factors, &FinalScoreMap::new(), &[]);
        let bucket = &out.value[0].ship_factors;
        let keys: Vec<&String> = bucket.keys().collect();
        assert_eq!(keys, vec!["Speed", "Draft"]);
        assert_eq!(bucket["Speed"], json!(3.0));
    }

    #[test]
    fn sparse_buckets_are_still_emitted() {
        let factors = vec![factor("Unknown Stuff", "X", "4:00 - 5:00", 1.0)];
        let out = build_hourly_records(&factors, &FinalScoreMap::new(), &[]);
        assert_eq!(out.value.len(), 1);
        assert_eq!(out.value[0].factor_count(), 0);
        assert!(out.value[0].ais_data.is_empty());
    }
}
