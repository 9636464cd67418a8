//! Data source abstraction for loading delimited tables from disk or HTTP.

use crate::error::PrepError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Field delimiter of the dataset cache and the remote file.
pub const TAB: u8 = b'\t';

/// An in-memory table. Every cell is kept as the exact text that was read so
/// feature columns survive the pipeline unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DataBatch {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// A batch with the same header and no rows.
    pub fn empty_like(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Information about a data source, recorded in the split report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceInfo {
    pub source_type: String,
    pub location: String,
    pub accessed_at: chrono::DateTime<chrono::Utc>,
    pub row_count: Option<usize>,
}

/// Trait for loading a table from a source.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Load the complete table.
    async fn load(&self) -> Result<DataBatch, PrepError>;

    /// Return metadata about this source.
    fn source_info(&self) -> DataSourceInfo;
}

/// Parse delimited text with a header row.
///
/// Quoted fields follow the usual double-quote rules. A row whose width differs
/// from the header is a schema violation rather than a parse error.
pub fn parse_delimited(bytes: &[u8], delimiter: u8) -> Result<DataBatch, PrepError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if columns.is_empty() || (columns.len() == 1 && columns[0].is_empty()) {
        return Err(PrepError::dataset("table has no header row"));
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != columns.len() {
            return Err(PrepError::schema(format!(
                "row {} has {} fields, header has {}",
                idx + 1,
                record.len(),
                columns.len()
            )));
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(DataBatch { columns, rows })
}

// ---------------------------------------------------------------------------
// TsvFileSource
// ---------------------------------------------------------------------------

/// Tab-separated file on the local filesystem.
pub struct TsvFileSource {
    pub path: PathBuf,
}

impl TsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for TsvFileSource {
    async fn load(&self) -> Result<DataBatch, PrepError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let batch = parse_delimited(&bytes, TAB)?;
        tracing::debug!(
            path = %self.path.display(),
            rows = batch.row_count(),
            columns = batch.column_count(),
            "Loaded local dataset"
        );
        Ok(batch)
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "tsv".to_string(),
            location: self.path.display().to_string(),
            accessed_at: chrono::Utc::now(),
            row_count: None,
        }
    }
}

// ---------------------------------------------------------------------------
// RemoteTsvSource
// ---------------------------------------------------------------------------

/// Tab-separated file served over HTTP(S). One GET per load, no retries.
pub struct RemoteTsvSource {
    pub url: String,
    client: reqwest::Client,
}

impl RemoteTsvSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DataSource for RemoteTsvSource {
    async fn load(&self) -> Result<DataBatch, PrepError> {
        tracing::info!(url = %self.url, "Downloading dataset");
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(PrepError::remote(format!(
                "GET {} returned status {}",
                self.url,
                response.status()
            )));
        }

        let body = response.bytes().await?;
        let batch = parse_delimited(&body, TAB)?;
        tracing::info!(
            rows = batch.row_count(),
            bytes = body.len(),
            "Downloaded dataset"
        );
        Ok(batch)
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "http".to_string(),
            location: self.url.clone(),
            accessed_at: chrono::Utc::now(),
            row_count: None,
        }
    }
}
