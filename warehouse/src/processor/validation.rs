use super::table::MaterializedTable;
use crate::schema::{REQUIRED_TEXT_COLUMNS, WarehouseTable, get_schema};
use crate::utils::arrow::batches_to_json;
use arrow::array::{Array, BooleanArray, StringArray};
use arrow::compute::filter_record_batch;
use arrow::record_batch::RecordBatch;
use common::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Rows with blank fields kept in a report; the counts stay exact.
pub const DEFAULT_BLANK_SAMPLE_LIMIT: usize = 20;

/// Advisory findings over the raw feed. Never blocks a rebuild.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub total_records: u64,
    pub null_counts: BTreeMap<String, u64>,
    pub blank_counts: BTreeMap<String, u64>,
    /// Rows holding at least one blank required field.
    pub blank_record_count: u64,
    /// The first of those rows, in feed order.
    pub blank_records: Vec<Value>,
}

impl ValidationReport {
    pub fn total_nulls(&self) -> u64 {
        self.null_counts.values().sum()
    }

    pub fn has_findings(&self) -> bool {
        self.total_nulls() > 0 || self.blank_record_count > 0
    }
}

pub struct DataValidator {
    sample_limit: usize,
}

impl DataValidator {
    pub fn new() -> Self {
        Self::with_sample_limit(DEFAULT_BLANK_SAMPLE_LIMIT)
    }

    pub fn with_sample_limit(sample_limit: usize) -> Self {
        Self { sample_limit }
    }

    pub fn validate(&self, raw: &MaterializedTable) -> Result<ValidationReport> {
        let raw_schema = get_schema(WarehouseTable::RawOrders);
        let mut report = ValidationReport {
            total_records: raw.num_rows() as u64,
            ..Default::default()
        };

        for field in raw_schema.fields() {
            report.null_counts.insert(field.name().clone(), 0);
        }
        for column in REQUIRED_TEXT_COLUMNS {
            report.blank_counts.insert(column.to_string(), 0);
        }

        let mut sampled_batches = Vec::new();
        let mut sample_room = self.sample_limit;
        for batch in raw.batches() {
            for (column, count) in report.null_counts.iter_mut() {
                let idx = batch.schema().index_of(column)?;
                *count += batch.column(idx).null_count() as u64;
            }

            let flagged = self.flag_blank_rows(batch, &mut report.blank_counts)?;
            let flagged_rows = flagged.true_count();
            report.blank_record_count += flagged_rows as u64;

            if flagged_rows > 0 && sample_room > 0 {
                let blank_rows = filter_record_batch(batch, &flagged)?;
                let taken = flagged_rows.min(sample_room);
                sampled_batches.push(blank_rows.slice(0, taken));
                sample_room -= taken;
            }
        }

        report.blank_records = batches_to_json(&sampled_batches)?;
        self.log_report(&report);

        Ok(report)
    }

    /// Marks rows holding at least one blank required field and tallies
    /// blanks per field.
    fn flag_blank_rows(
        &self,
        batch: &RecordBatch,
        blank_counts: &mut BTreeMap<String, u64>,
    ) -> Result<BooleanArray> {
        let mut flags = vec![false; batch.num_rows()];

        for column_name in REQUIRED_TEXT_COLUMNS {
            let idx = batch.schema().index_of(column_name)?;
            let values = batch
                .column(idx)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| {
                    Error::SchemaMismatch(format!("Column '{}' is not Utf8", column_name))
                })?;

            let mut blanks = 0u64;
            for (row, value) in values.iter().enumerate() {
                if value.is_some_and(|v| v.trim().is_empty()) {
                    flags[row] = true;
                    blanks += 1;
                }
            }

            if let Some(count) = blank_counts.get_mut(column_name) {
                *count += blanks;
            }
        }

        Ok(BooleanArray::from(flags))
    }

    fn log_report(&self, report: &ValidationReport) {
        if report.has_findings() {
            warn!(
                total_records = report.total_records,
                total_nulls = report.total_nulls(),
                blank_records = report.blank_record_count,
                null_counts = ?report.null_counts,
                "Raw feed has validation findings"
            );
        } else {
            info!(total_records = report.total_records, "Raw feed passed validation");
        }
    }
}

impl Default for DataValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawOrder;
    use crate::test_support::{order, staged_table};

    #[test]
    fn test_counts_nulls_per_column() {
        let mut missing_date = order("TX", "Austin", "L1", "R1", "Pizza", "Margherita", "2024-01-01", 200.0);
        missing_date.order_date = None;
        missing_date.rating = None;
        let raw = staged_table(&[
            order("TX", "Austin", "L1", "R1", "Pizza", "Margherita", "2024-01-01", 200.0),
            missing_date,
        ]);

        let report = DataValidator::new().validate(&raw).unwrap();

        assert_eq!(report.total_records, 2);
        assert_eq!(report.null_counts["order_date"], 1);
        assert_eq!(report.null_counts["rating"], 1);
        assert_eq!(report.null_counts["state"], 0);
        assert_eq!(report.total_nulls(), 2);
        assert!(report.blank_records.is_empty());
    }

    #[test]
    fn test_collects_blank_required_fields() {
        let raw = staged_table(&[
            order("TX", "  ", "L1", "R1", "Pizza", "Margherita", "2024-01-01", 200.0),
            order("TX", "Austin", "L1", "", "Pizza", "", "2024-01-02", 120.0),
            order("TX", "Austin", "L1", "R1", "Pizza", "Margherita", "2024-01-03", 90.0),
        ]);

        let report = DataValidator::new().validate(&raw).unwrap();

        assert_eq!(report.blank_counts["city"], 1);
        assert_eq!(report.blank_counts["restaurant_name"], 1);
        assert_eq!(report.blank_counts["dish_name"], 1);
        assert_eq!(report.blank_counts["state"], 0);
        assert_eq!(report.blank_records.len(), 2);
        assert_eq!(report.blank_records[1]["order_date"], "2024-01-02");
        assert!(report.has_findings());
    }

    #[test]
    fn test_null_text_is_not_blank() {
        let raw = staged_table(&[RawOrder {
            city: None,
            ..order("TX", "Austin", "L1", "R1", "Pizza", "Margherita", "2024-01-01", 200.0)
        }]);

        let report = DataValidator::new().validate(&raw).unwrap();

        assert_eq!(report.null_counts["city"], 1);
        assert_eq!(report.blank_counts["city"], 0);
        assert!(report.blank_records.is_empty());
    }

    #[test]
    fn test_null_counts_cover_only_feed_columns() {
        let raw = staged_table(&[order(
            "TX", "Austin", "L1", "R1", "Pizza", "Margherita", "2024-01-01", 200.0,
        )]);

        let report = DataValidator::new().validate(&raw).unwrap();

        let columns: Vec<&str> = report.null_counts.keys().map(|k| k.as_str()).collect();
        assert_eq!(columns.len(), 10);
        assert!(!report.null_counts.contains_key("ingest_seq"));
        assert!(report.null_counts.contains_key("rating_count"));
    }

    #[test]
    fn test_blank_rows_are_sampled_but_counted_exactly() {
        let orders: Vec<RawOrder> = (1..=5)
            .map(|day| {
                order("TX", " ", "L1", "R1", "Pizza", "Margherita", &format!("2024-01-0{day}"), 100.0)
            })
            .collect();
        let raw = staged_table(&orders);

        let report = DataValidator::with_sample_limit(2).validate(&raw).unwrap();

        assert_eq!(report.blank_record_count, 5);
        assert_eq!(report.blank_counts["city"], 5);
        assert_eq!(report.blank_records.len(), 2);
        assert_eq!(report.blank_records[0]["order_date"], "2024-01-01");
        assert_eq!(report.blank_records[1]["order_date"], "2024-01-02");
    }
}
