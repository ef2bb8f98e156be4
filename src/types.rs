use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tabled::Tabled;

use crate::util::canonical_category;

/// The four factor buckets every hourly record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    ExternalEnvironment,
    Human,
    InternalEnvironment,
    Ship,
}

static CATEGORY_KEYS: Lazy<HashMap<&'static str, Category>> =
    Lazy::new(|| Category::ALL.iter().map(|c| (c.key(), *c)).collect());

impl Category {
    pub const ALL: [Category; 4] = [
        Category::ExternalEnvironment,
        Category::Human,
        Category::InternalEnvironment,
        Category::Ship,
    ];

    /// Output key of the bucket, e.g. `ship_factors`.
    pub const fn key(self) -> &'static str {
        match self {
            Category::ExternalEnvironment => "external_environment_factors",
            Category::Human => "human_factors",
            Category::InternalEnvironment => "internal_environment_factors",
            Category::Ship => "ship_factors",
        }
    }

    /// Resolve a raw table label ("Human Factors") to its bucket.
    pub fn from_label(label: &str) -> Option<Category> {
        CATEGORY_KEYS.get(canonical_category(label).as_str()).copied()
    }
}

/// One cell of the wide factor table after melting.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorRecord {
    pub category: String,
    pub factor: String,
    pub time_range: String,
    pub value: f64,
}

/// Normalized time range -> score, taken from the "Final Score" row.
pub type FinalScoreMap = HashMap<String, f64>;

/// One position report. `fields` keeps every column in source order,
/// `Timestamp` included as it appeared in the file.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub timestamp: NaiveDateTime,
    pub fields: Map<String, Value>,
}

/// Factor name -> value, in the order factors were found.
pub type FactorBucket = Map<String, Value>;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HourlyRecord {
    pub time_range: String,
    pub external_environment_factors: FactorBucket,
    pub human_factors: FactorBucket,
    pub internal_environment_factors: FactorBucket,
    pub ship_factors: FactorBucket,
    pub ais_data: Vec<Map<String, Value>>,
    pub final_score: Option<f64>,
}

impl HourlyRecord {
    pub fn new(time_range: String, final_score: Option<f64>) -> Self {
        Self {
            time_range,
            external_environment_factors: Map::new(),
            human_factors: Map::new(),
            internal_environment_factors: Map::new(),
            ship_factors: Map::new(),
            ais_data: Vec::new(),
            final_score,
        }
    }

    pub fn bucket(&self, category: Category) -> &FactorBucket {
        match category {
            Category::ExternalEnvironment => &self.external_environment_factors,
            Category::Human => &self.human_factors,
            Category::InternalEnvironment => &self.internal_environment_factors,
            Category::Ship => &self.ship_factors,
        }
    }

    pub fn bucket_mut(&mut self, category: Category) -> &mut FactorBucket {
        match category {
            Category::ExternalEnvironment => &mut self.external_environment_factors,
            Category::Human => &mut self.human_factors,
            Category::InternalEnvironment => &mut self.internal_environment_factors,
            Category::Ship => &mut self.ship_factors,
        }
    }

    pub fn factor_count(&self) -> usize {
        Category::ALL.iter().map(|c| self.bucket(*c).len()).sum()
    }
}

/// Console preview line for one hourly record.
#[derive(Debug, Tabled, Clone)]
pub struct HourlyPreviewRow {
    #[tabled(rename = "TimeRange")]
    pub time_range: String,
    #[tabled(rename = "External")]
    pub external: usize,
    #[tabled(rename = "Human")]
    pub human: usize,
    #[tabled(rename = "Internal")]
    pub internal: usize,
    #[tabled(rename = "Ship")]
    pub ship: usize,
    #[tabled(rename = "AisRows")]
    pub ais_rows: usize,
    #[tabled(rename = "FinalScore")]
    pub final_score: String,
}

impl From<&HourlyRecord> for HourlyPreviewRow {
    fn from(r: &HourlyRecord) -> Self {
        Self {
            time_range: r.time_range.clone(),
            external: r.external_environment_factors.len(),
            human: r.human_factors.len(),
            internal: r.internal_environment_factors.len(),
            ship: r.ship_factors.len(),
            ais_rows: r.ais_data.len(),
            final_score: r
                .final_score
                .map(|s| s.to_string())
                .unwrap_or_else(|| "null".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Human Factors", Some(Category::Human))]
    #[case("  ship factors ", Some(Category::Ship))]
    #[case("External Environment Factors", Some(Category::ExternalEnvironment))]
    #[case("INTERNAL ENVIRONMENT FACTORS", Some(Category::InternalEnvironment))]
    #[case("Final Score", None)]
    #[case("Ship  Factors", None)]
    fn category_from_label(#[case] label: &str, #[case] expected: Option<Category>) {
        assert_eq!(Category::from_label(label), expected);
    }

    #[test]
    fn serialized_field_order_is_stable() {
        let record = HourlyRecord::new("0:00 - 1:00".to_string(), None);
        let json = serde_json::to_string(&record).unwrap();
        let keys = [
            "time_range",
            "external_environment_factors",
            "human_factors",
            "internal_environment_factors",
            "ship_factors",
            "ais_data",
            "final_score",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(json.contains("\"final_score\":null"));
        assert!(json.contains("\"ais_data\":[]"));
    }

    #[test]
    fn preview_row_counts_buckets() {
        let mut record = HourlyRecord::new("1:00 - 2:00".to_string(), Some(0.5));
        record
            .bucket_mut(Category::Ship)
            .insert("Speed".to_string(), Value::from(12.5));
        let row = HourlyPreviewRow::from(&record);
        assert_eq!(row.ship, 1);
        assert_eq!(row.human, 0);
        assert_eq!(row.final_score, "0.5");
        assert_eq!(record.factor_count(), 1);
    }
}
