//! Train / validation / test split construction.
//!
//! The test set is every row carrying the test tag, in source order. The rows
//! carrying the train tag form a pool that is divided by a stratified random
//! draw: `ceil(val_fraction * n)` rows go to validation, the rest to training,
//! and every label class keeps its share of the pool in both parts.

use crate::data::schema::DatasetSchema;
use crate::data::source::DataBatch;
use crate::error::PrepError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Parameters of a split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitPlan {
    pub label_column: String,
    pub split_column: String,
    pub test_tag: String,
    pub train_tag: String,
    pub val_fraction: f64,
    pub seed: u64,
}

impl From<&crate::config::PrepConfig> for SplitPlan {
    fn from(config: &crate::config::PrepConfig) -> Self {
        Self {
            label_column: config.label_column.clone(),
            split_column: config.split_column.clone(),
            test_tag: config.test_tag.clone(),
            train_tag: config.train_tag.clone(),
            val_fraction: config.val_fraction,
            seed: config.seed,
        }
    }
}

/// The three output partitions.
#[derive(Debug, Clone)]
pub struct SplitSets {
    pub train: DataBatch,
    pub val: DataBatch,
    pub test: DataBatch,
    /// Rows whose tag matched neither the train nor the test tag.
    pub skipped: usize,
}

/// Partition `batch` into train, val and test according to `plan`.
pub fn build_splits(batch: DataBatch, plan: &SplitPlan) -> Result<SplitSets, PrepError> {
    let schema = DatasetSchema::resolve(&batch, &plan.label_column, &plan.split_column)?;

    let mut pool = batch.empty_like();
    let mut test = batch.empty_like();
    let mut skipped = 0usize;
    for row in batch.rows {
        let tag = row[schema.split].as_str();
        if tag == plan.test_tag {
            test.rows.push(row);
        } else if tag == plan.train_tag {
            pool.rows.push(row);
        } else {
            skipped += 1;
        }
    }

    if skipped > 0 {
        tracing::warn!(
            skipped,
            train_tag = %plan.train_tag,
            test_tag = %plan.test_tag,
            "Rows with an unrecognised split tag are left out of every split"
        );
    }

    if pool.is_empty() {
        return Err(PrepError::stratification(format!(
            "no rows tagged '{}' in column '{}' to split into train and val",
            plan.train_tag, plan.split_column
        )));
    }

    let (train, val) = stratified_split(pool, schema.label, plan.val_fraction, plan.seed)?;
    tracing::info!(
        train = train.row_count(),
        val = val.row_count(),
        test = test.row_count(),
        "Built splits"
    );

    Ok(SplitSets {
        train,
        val,
        test,
        skipped,
    })
}

/// Stratified split of `pool` by the values in column `label_idx`.
///
/// Returns `(train, val)`. Fails when the pool cannot be stratified: it is
/// empty, a class has fewer than two rows, or either side would be smaller
/// than the number of classes.
pub fn stratified_split(
    pool: DataBatch,
    label_idx: usize,
    val_fraction: f64,
    seed: u64,
) -> Result<(DataBatch, DataBatch), PrepError> {
    let n = pool.row_count();
    if n == 0 {
        return Err(PrepError::stratification("cannot split an empty pool"));
    }

    let classes = group_by_class(&pool, label_idx);
    if let Some((label, members)) = classes.iter().min_by_key(|(_, members)| members.len()) {
        if members.len() < 2 {
            return Err(PrepError::stratification(format!(
                "the least populated class '{label}' has only {} member, at least 2 are required",
                members.len()
            )));
        }
    }

    let (n_train, n_val) = split_sizes(n, val_fraction)?;
    if n_val < classes.len() || n_train < classes.len() {
        return Err(PrepError::stratification(format!(
            "train size {n_train} and val size {n_val} must each be at least the number of classes ({})",
            classes.len()
        )));
    }

    let counts: Vec<usize> = classes.iter().map(|(_, m)| m.len()).collect();
    let train_alloc = approximate_mode(&counts, n_train);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_idx = Vec::with_capacity(n_train);
    let mut val_idx = Vec::with_capacity(n_val);
    for ((label, mut members), take_train) in classes.into_iter().zip(train_alloc) {
        members.shuffle(&mut rng);
        let (train_part, val_part) = members.split_at(take_train);
        tracing::debug!(
            label = %label,
            train = train_part.len(),
            val = val_part.len(),
            "Class allocation"
        );
        train_idx.extend_from_slice(train_part);
        val_idx.extend_from_slice(val_part);
    }
    train_idx.shuffle(&mut rng);
    val_idx.shuffle(&mut rng);

    Ok((take_rows(&pool, &train_idx), take_rows(&pool, &val_idx)))
}

/// `(n_train, n_val)` for a pool of `n` rows: the val side is rounded up.
pub fn split_sizes(n: usize, val_fraction: f64) -> Result<(usize, usize), PrepError> {
    let n_val = (val_fraction * n as f64).ceil() as usize;
    if n_val == 0 || n_val >= n {
        return Err(PrepError::stratification(format!(
            "val_fraction {val_fraction} of {n} rows leaves an empty train or val set"
        )));
    }
    Ok((n - n_val, n_val))
}

/// Distribute `n_draws` over classes in proportion to `counts`.
///
/// Each class first gets the floor of its exact share. Remaining draws go to
/// the classes with the largest fractional remainder, ties broken by larger
/// class, then by earlier class. Never allocates more than a class holds.
pub fn approximate_mode(counts: &[usize], n_draws: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0; counts.len()];
    }

    let mut alloc: Vec<usize> = counts.iter().map(|&c| c * n_draws / total).collect();
    let remainders: Vec<usize> = counts.iter().map(|&c| c * n_draws % total).collect();
    let mut need = n_draws.saturating_sub(alloc.iter().sum());

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        remainders[b]
            .cmp(&remainders[a])
            .then(counts[b].cmp(&counts[a]))
            .then(a.cmp(&b))
    });
    for idx in order {
        if need == 0 {
            break;
        }
        if alloc[idx] < counts[idx] {
            alloc[idx] += 1;
            need -= 1;
        }
    }
    alloc
}

/// Row indices per distinct label, in order of first appearance.
fn group_by_class(batch: &DataBatch, label_idx: usize) -> Vec<(String, Vec<usize>)> {
    let mut classes: Vec<(String, Vec<usize>)> = Vec::new();
    for (i, row) in batch.rows.iter().enumerate() {
        let label = &row[label_idx];
        match classes.iter_mut().find(|(l, _)| l == label) {
            Some((_, members)) => members.push(i),
            None => classes.push((label.clone(), vec![i])),
        }
    }
    classes
}

fn take_rows(batch: &DataBatch, indices: &[usize]) -> DataBatch {
    DataBatch {
        columns: batch.columns.clone(),
        rows: indices.iter().map(|&i| batch.rows[i].clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(labels: &[(&str, usize)]) -> DataBatch {
        let mut rows = Vec::new();
        for (label, count) in labels {
            for i in 0..*count {
                rows.push(vec![format!("{label}-{i}"), label.to_string()]);
            }
        }
        DataBatch::new(vec!["text".into(), "label".into()], rows)
    }

    fn count(batch: &DataBatch, label: &str) -> usize {
        batch.rows.iter().filter(|r| r[1] == label).count()
    }

    #[test]
    fn test_approximate_mode_exact_shares() {
        assert_eq!(approximate_mode(&[70, 30], 90), vec![63, 27]);
        assert_eq!(approximate_mode(&[70, 30], 10), vec![7, 3]);
    }

    #[test]
    fn test_approximate_mode_distributes_remainder() {
        // 5 * 3/7 = 2.14, 5 * 4/7 = 2.86 -> the larger remainder gets the extra draw.
        assert_eq!(approximate_mode(&[3, 4], 5), vec![2, 3]);
        // Equal remainders: the larger class wins, then the earlier one.
        assert_eq!(approximate_mode(&[2, 6], 2), vec![0, 2]);
        let alloc = approximate_mode(&[5, 5, 5], 7);
        assert_eq!(alloc.iter().sum::<usize>(), 7);
        assert_eq!(alloc, vec![3, 2, 2]);
    }

    #[test]
    fn test_split_sizes_round_val_up() {
        assert_eq!(split_sizes(100, 0.1).unwrap(), (90, 10));
        assert_eq!(split_sizes(25, 0.1).unwrap(), (22, 3));
        assert!(split_sizes(1, 0.5).is_err());
    }

    #[test]
    fn test_stratified_split_preserves_ratio() {
        let (train, val) = stratified_split(pool(&[("0", 70), ("1", 30)]), 1, 0.1, 42).unwrap();
        assert_eq!(train.row_count(), 90);
        assert_eq!(val.row_count(), 10);
        assert_eq!(count(&val, "0"), 7);
        assert_eq!(count(&val, "1"), 3);
        assert_eq!(count(&train, "0"), 63);
        assert_eq!(count(&train, "1"), 27);
    }

    #[test]
    fn test_stratified_split_is_deterministic() {
        let a = stratified_split(pool(&[("a", 40), ("b", 20)]), 1, 0.1, 42).unwrap();
        let b = stratified_split(pool(&[("a", 40), ("b", 20)]), 1, 0.1, 42).unwrap();
        assert_eq!(a.0, b.0);
        assert_eq!(a.1, b.1);

        let c = stratified_split(pool(&[("a", 40), ("b", 20)]), 1, 0.1, 7).unwrap();
        assert_eq!(c.1.row_count(), a.1.row_count());
    }

    #[test]
    fn test_stratified_split_rejects_singleton_class() {
        let err = stratified_split(pool(&[("a", 10), ("b", 1)]), 1, 0.1, 42).unwrap_err();
        assert!(matches!(err, PrepError::Stratification(msg) if msg.contains("'b'")));
    }

    #[test]
    fn test_stratified_split_rejects_empty_pool() {
        let err = stratified_split(pool(&[]), 1, 0.1, 42).unwrap_err();
        assert!(matches!(err, PrepError::Stratification(_)));
    }

    #[test]
    fn test_stratified_split_rejects_val_smaller_than_class_count() {
        // ceil(0.1 * 6) = 1 val row for 2 classes.
        let err = stratified_split(pool(&[("a", 3), ("b", 3)]), 1, 0.1, 42).unwrap_err();
        assert!(matches!(err, PrepError::Stratification(_)));
    }

    #[test]
    fn test_build_splits_routes_by_tag() {
        let batch = DataBatch::new(
            vec!["text".into(), "label".into(), "metadata__split".into()],
            (0..24)
                .map(|i| {
                    let tag = match i % 4 {
                        0 => "dev",
                        3 if i == 23 => "other",
                        _ => "trn",
                    };
                    let label = if i % 2 == 0 { "pledge" } else { "no pledge" };
                    vec![format!("row {i}"), label.to_string(), tag.to_string()]
                })
                .collect(),
        );
        let plan = SplitPlan::from(&crate::config::PrepConfig::default());
        let sets = build_splits(batch, &plan).unwrap();
        assert_eq!(sets.test.row_count(), 6);
        assert!(sets.test.rows.iter().all(|r| r[2] == "dev"));
        assert_eq!(sets.skipped, 1);
        assert_eq!(sets.train.row_count() + sets.val.row_count(), 17);
        assert_eq!(sets.val.row_count(), 2);
        assert!(sets.train.rows.iter().chain(&sets.val.rows).all(|r| r[2] == "trn"));
    }

    #[test]
    fn test_build_splits_without_train_rows() {
        let batch = DataBatch::new(
            vec!["label".into(), "metadata__split".into()],
            vec![vec!["pledge".into(), "dev".into()]],
        );
        let plan = SplitPlan::from(&crate::config::PrepConfig::default());
        let err = build_splits(batch, &plan).unwrap_err();
        assert!(matches!(err, PrepError::Stratification(_)));
    }
}
