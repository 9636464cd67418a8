//! Writing tables and split files to disk.

use crate::data::source::DataBatch;
use crate::data::split::SplitSets;
use crate::error::PrepError;
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};

pub const TRAIN_FILE: &str = "train.csv";
pub const VAL_FILE: &str = "val.csv";
pub const TEST_FILE: &str = "test.csv";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Serialize a batch as delimited text: header row, then data rows, no index
/// column. Fields are quoted only when they contain the delimiter, a quote or
/// a line break.
pub fn to_delimited(batch: &DataBatch, delimiter: u8) -> Result<Vec<u8>, PrepError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());
    writer.write_record(&batch.columns)?;
    for row in &batch.rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| PrepError::Io(io::Error::other(e.to_string())))
}

/// Write a batch to `path`, replacing any existing file.
pub fn write_delimited(path: &Path, batch: &DataBatch, delimiter: u8) -> Result<(), PrepError> {
    let bytes = to_delimited(batch, delimiter)?;
    atomic_write(path, &bytes)?;
    tracing::debug!(path = %path.display(), rows = batch.row_count(), "Wrote table");
    Ok(())
}

/// Write the three split files as CSV into `dir`, creating it if needed.
/// Returns the written paths in train, val, test order.
pub fn write_splits(dir: &Path, sets: &SplitSets) -> Result<Vec<PathBuf>, PrepError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(3);
    for (name, batch) in [
        (TRAIN_FILE, &sets.train),
        (VAL_FILE, &sets.val),
        (TEST_FILE, &sets.test),
    ] {
        let path = dir.join(name);
        write_delimited(&path, batch, b',')?;
        written.push(path);
    }
    tracing::info!(dir = %dir.display(), "Wrote split files");
    Ok(written)
}

/// Atomically write raw bytes to a file.
///
/// Writes to a `.tmp` sibling file, then renames over the target path.
/// Creates parent directories if they don't exist.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Atomically write pretty-printed JSON to a file.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<(), PrepError> {
    let json = serde_json::to_string_pretty(data)?;
    atomic_write(path, json.as_bytes())?;
    Ok(())
}

/// Compute SHA-256 hash of file contents.
pub fn hash_file(path: &Path) -> Result<String, PrepError> {
    let content = std::fs::read(path)?;
    Ok(hash_bytes(&content))
}

/// Compute SHA-256 hash of arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::{TAB, parse_delimited};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn batch() -> DataBatch {
        DataBatch::new(
            vec!["text".into(), "label".into()],
            vec![
                vec!["plain".into(), "pledge".into()],
                vec!["has, comma".into(), "no pledge".into()],
                vec!["say \"hi\"".into(), "pledge".into()],
            ],
        )
    }

    #[test]
    fn test_csv_layout() {
        let bytes = to_delimited(&batch(), b',').unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "text,label\nplain,pledge\n\"has, comma\",no pledge\n\"say \"\"hi\"\"\",pledge\n"
        );
    }

    #[test]
    fn test_tsv_survives_reparse() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("data.tsv");
        write_delimited(&path, &batch(), TAB).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(parse_delimited(&bytes, TAB).unwrap(), batch());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_write_splits_overwrites() {
        let dir = TempDir::new().unwrap();
        let split_dir = dir.path().join("splits");
        std::fs::create_dir_all(&split_dir).unwrap();
        std::fs::write(split_dir.join(TRAIN_FILE), "stale").unwrap();

        let sets = SplitSets {
            train: batch(),
            val: batch().empty_like(),
            test: batch(),
            skipped: 0,
        };
        let written = write_splits(&split_dir, &sets).unwrap();
        assert_eq!(
            written,
            vec![
                split_dir.join(TRAIN_FILE),
                split_dir.join(VAL_FILE),
                split_dir.join(TEST_FILE)
            ]
        );
        let train = std::fs::read_to_string(split_dir.join(TRAIN_FILE)).unwrap();
        assert!(train.starts_with("text,label\n"));
        let val = std::fs::read_to_string(split_dir.join(VAL_FILE)).unwrap();
        assert_eq!(val, "text,label\n");
    }

    #[test]
    fn test_hash_bytes_is_stable() {
        assert_eq!(
            hash_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
