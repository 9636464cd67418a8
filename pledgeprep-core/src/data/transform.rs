//! Row and column transformations applied between loading and splitting.

use crate::config::UnknownLabelPolicy;
use crate::data::labels;
use crate::data::schema::require_column;
use crate::data::source::DataBatch;
use crate::error::PrepError;
use serde::{Deserialize, Serialize};

/// A transformation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformStep {
    /// Replace integer class codes in `column` with label names.
    MapLabels {
        column: String,
        policy: UnknownLabelPolicy,
    },
}

/// A pipeline of transformation steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformPipeline {
    pub steps: Vec<TransformStep>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn add_step(mut self, step: TransformStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Apply the pipeline and return a record per step.
    pub fn apply_recorded(
        &self,
        mut batch: DataBatch,
    ) -> Result<(DataBatch, Vec<TransformRecord>), PrepError> {
        let mut records = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let rows_before = batch.row_count();
            batch = apply_step(batch, step)?;
            records.push(TransformRecord {
                step: step.clone(),
                applied_at: chrono::Utc::now(),
                rows_before,
                rows_after: batch.row_count(),
            });
        }
        Ok((batch, records))
    }
}

fn apply_step(batch: DataBatch, step: &TransformStep) -> Result<DataBatch, PrepError> {
    match step {
        TransformStep::MapLabels { column, policy } => map_labels(batch, column, *policy),
    }
}

/// Replace every cell of `column` with its label name.
///
/// Only that column changes. A cell that is not a known class code is either
/// rejected (naming the 1-based data row) or blanked, depending on `policy`.
pub fn map_labels(
    mut batch: DataBatch,
    column: &str,
    policy: UnknownLabelPolicy,
) -> Result<DataBatch, PrepError> {
    let idx = require_column(&batch, column)?;
    let mut blanked = 0usize;

    for (row_idx, row) in batch.rows.iter_mut().enumerate() {
        let cell = &mut row[idx];
        match labels::map_cell(cell) {
            Some(name) => *cell = name.to_string(),
            None => match policy {
                UnknownLabelPolicy::Reject => {
                    return Err(PrepError::label(format!(
                        "row {}: '{}' in column '{column}' is not a known class code",
                        row_idx + 1,
                        cell
                    )));
                }
                UnknownLabelPolicy::Blank => {
                    cell.clear();
                    blanked += 1;
                }
            },
        }
    }

    if blanked > 0 {
        tracing::warn!(blanked, column, "Blanked labels outside the class mapping");
    }
    Ok(batch)
}

/// Record of a transform applied, kept for the split report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformRecord {
    pub step: TransformStep,
    pub applied_at: chrono::DateTime<chrono::Utc>,
    pub rows_before: usize,
    pub rows_after: usize,
}
