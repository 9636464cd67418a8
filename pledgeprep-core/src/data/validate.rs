//! Split reports and partition checks.

use crate::data::source::{DataBatch, DataSourceInfo};
use crate::data::split::{SplitPlan, SplitSets};
use crate::data::transform::TransformRecord;
use crate::error::PrepError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Row count and label distribution of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartStats {
    pub rows: usize,
    pub labels: BTreeMap<String, usize>,
}

impl PartStats {
    pub fn of(batch: &DataBatch, label_idx: usize) -> Self {
        let mut labels = BTreeMap::new();
        for row in &batch.rows {
            *labels.entry(row[label_idx].clone()).or_insert(0) += 1;
        }
        Self {
            rows: batch.row_count(),
            labels,
        }
    }

    /// Share of rows carrying `label`, 0.0 for an empty table.
    pub fn share(&self, label: &str) -> f64 {
        if self.rows == 0 {
            return 0.0;
        }
        self.labels.get(label).copied().unwrap_or(0) as f64 / self.rows as f64
    }
}

/// Summary of a completed split run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitReport {
    pub source: DataSourceInfo,
    pub source_sha256: String,
    pub plan: SplitPlan,
    pub train: PartStats,
    pub val: PartStats,
    pub test: PartStats,
    pub skipped_rows: usize,
    pub transforms: Vec<TransformRecord>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl SplitReport {
    /// Observed `|val| / (|train| + |val|)`.
    pub fn val_ratio(&self) -> f64 {
        let pool = self.train.rows + self.val.rows;
        if pool == 0 {
            0.0
        } else {
            self.val.rows as f64 / pool as f64
        }
    }

    pub fn log(&self) {
        tracing::info!(
            train = self.train.rows,
            val = self.val.rows,
            test = self.test.rows,
            skipped = self.skipped_rows,
            val_ratio = self.val_ratio(),
            seed = self.plan.seed,
            "Split report"
        );
        for (name, part) in [("train", &self.train), ("val", &self.val), ("test", &self.test)] {
            for (label, count) in &part.labels {
                tracing::info!(split = name, label = %label, count, "Label count");
            }
        }
    }
}

/// Per split tag, per label row counts of a mapped dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    pub by_tag: BTreeMap<String, PartStats>,
}

impl DatasetSummary {
    pub fn of(batch: &DataBatch, label_idx: usize, split_idx: usize) -> Self {
        let mut by_tag: BTreeMap<String, PartStats> = BTreeMap::new();
        for row in &batch.rows {
            let stats = by_tag.entry(row[split_idx].clone()).or_default();
            stats.rows += 1;
            *stats.labels.entry(row[label_idx].clone()).or_insert(0) += 1;
        }
        Self {
            rows: batch.row_count(),
            columns: batch.columns.clone(),
            by_tag,
        }
    }
}

/// Check that the splits partition the tagged rows of `source`.
///
/// Every row tagged for training appears exactly once across train and val,
/// every row tagged for testing exactly once in test, and nothing else
/// appears anywhere. Rows are compared by content, so duplicate rows in the
/// source are counted as a multiset.
pub fn verify_partition(
    source: &DataBatch,
    sets: &SplitSets,
    split_idx: usize,
    plan: &SplitPlan,
) -> Result<(), PrepError> {
    let mut expected_pool: HashMap<&[String], isize> = HashMap::new();
    let mut expected_test: HashMap<&[String], isize> = HashMap::new();
    for row in &source.rows {
        let tag = &row[split_idx];
        if *tag == plan.train_tag {
            *expected_pool.entry(row.as_slice()).or_insert(0) += 1;
        } else if *tag == plan.test_tag {
            *expected_test.entry(row.as_slice()).or_insert(0) += 1;
        }
    }

    for row in sets.train.rows.iter().chain(&sets.val.rows) {
        *expected_pool.entry(row.as_slice()).or_insert(0) -= 1;
    }
    for row in &sets.test.rows {
        *expected_test.entry(row.as_slice()).or_insert(0) -= 1;
    }

    let pool_off = expected_pool.values().filter(|&&c| c != 0).count();
    let test_off = expected_test.values().filter(|&&c| c != 0).count();
    if pool_off > 0 || test_off > 0 {
        return Err(PrepError::dataset(format!(
            "splits do not partition the source rows ({pool_off} train/val and {test_off} test rows differ)"
        )));
    }
    Ok(())
}
