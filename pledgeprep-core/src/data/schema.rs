//! Column resolution for the labeled dataset.

use crate::data::source::DataBatch;
use crate::error::PrepError;

/// Positions of the columns the pipeline reads. Every other column is an
/// opaque feature column and is carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetSchema {
    pub label: usize,
    pub split: usize,
}

impl DatasetSchema {
    /// Locate `label_column` and `split_column` in the batch header.
    pub fn resolve(
        batch: &DataBatch,
        label_column: &str,
        split_column: &str,
    ) -> Result<Self, PrepError> {
        let label = require_column(batch, label_column)?;
        let split = require_column(batch, split_column)?;
        Ok(Self { label, split })
    }
}

/// Index of `name` in the header, or a schema error listing what is there.
pub fn require_column(batch: &DataBatch, name: &str) -> Result<usize, PrepError> {
    batch.column_index(name).ok_or_else(|| {
        PrepError::schema(format!(
            "missing required column '{name}' (found: {})",
            batch.columns.join(", ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(columns: &[&str]) -> DataBatch {
        DataBatch::new(columns.iter().map(|c| c.to_string()).collect(), Vec::new())
    }

    #[test]
    fn test_resolve_finds_columns() {
        let b = batch(&["text", "metadata__split", "label"]);
        let schema = DatasetSchema::resolve(&b, "label", "metadata__split").unwrap();
        assert_eq!(schema, DatasetSchema { label: 2, split: 1 });
    }

    #[test]
    fn test_resolve_missing_label() {
        let b = batch(&["text", "metadata__split"]);
        let err = DatasetSchema::resolve(&b, "label", "metadata__split").unwrap_err();
        match err {
            PrepError::Schema(msg) => {
                assert!(msg.contains("'label'"));
                assert!(msg.contains("text, metadata__split"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_missing_split_column() {
        let b = batch(&["text", "label"]);
        assert!(matches!(
            DatasetSchema::resolve(&b, "label", "metadata__split"),
            Err(PrepError::Schema(_))
        ));
    }
}
