//! The preparation run: acquire, map labels, split, persist.

use crate::config::PrepConfig;
use crate::data::schema::DatasetSchema;
use crate::data::source::{
    DataBatch, DataSource, DataSourceInfo, RemoteTsvSource, TAB, TsvFileSource,
};
use crate::data::split::{SplitPlan, build_splits};
use crate::data::storage;
use crate::data::transform::{TransformPipeline, TransformRecord, TransformStep};
use crate::data::validate::{DatasetSummary, PartStats, SplitReport, verify_partition};
use crate::error::PrepError;
use std::path::{Path, PathBuf};

/// Result of the acquisition stage.
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub batch: DataBatch,
    pub info: DataSourceInfo,
    /// Whether the remote source was contacted on this run.
    pub downloaded: bool,
    pub sha256: String,
}

/// Return the dataset at `path`, downloading it from `remote` first if the file
/// does not exist.
///
/// An existing file is never touched and the remote is never contacted. After a
/// download the table is written to `path` as TSV (parents created) and read
/// back from there, so a first run and later runs see the same bytes.
pub async fn acquire(path: &Path, remote: &dyn DataSource) -> Result<Acquisition, PrepError> {
    let downloaded = if path.exists() {
        tracing::info!(path = %path.display(), "Using cached dataset");
        false
    } else {
        let fetched = remote.load().await?;
        storage::write_delimited(path, &fetched, TAB)?;
        tracing::info!(
            path = %path.display(),
            rows = fetched.row_count(),
            "Cached downloaded dataset"
        );
        true
    };

    let local = TsvFileSource::new(path);
    let batch = local.load().await?;
    let mut info = if downloaded {
        remote.source_info()
    } else {
        local.source_info()
    };
    info.row_count = Some(batch.row_count());

    Ok(Acquisition {
        batch,
        info,
        downloaded,
        sha256: storage::hash_file(path)?,
    })
}

/// Output of a full run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: SplitReport,
    pub files: Vec<PathBuf>,
}

/// A configured preparation pipeline.
pub struct Pipeline {
    config: PrepConfig,
    remote: Box<dyn DataSource>,
}

impl Pipeline {
    /// Pipeline fetching from `config.dataset_url` when the cache is missing.
    pub fn new(config: PrepConfig) -> Self {
        let remote = Box::new(RemoteTsvSource::new(config.dataset_url.clone()));
        Self { config, remote }
    }

    /// Pipeline with a caller-supplied remote source.
    pub fn with_remote(config: PrepConfig, remote: Box<dyn DataSource>) -> Self {
        Self { config, remote }
    }

    pub fn config(&self) -> &PrepConfig {
        &self.config
    }

    /// Acquisition only.
    pub async fn fetch(&self) -> Result<Acquisition, PrepError> {
        acquire(&self.config.dataset_path, self.remote.as_ref()).await
    }

    /// Acquire and map labels, then summarise rows per split tag and label.
    /// Writes nothing besides the dataset cache.
    pub async fn inspect(&self) -> Result<DatasetSummary, PrepError> {
        let acquisition = self.fetch().await?;
        let (mapped, _) = self.map_labels(acquisition.batch)?;
        let schema = self.schema(&mapped)?;
        Ok(DatasetSummary::of(&mapped, schema.label, schema.split))
    }

    /// Full run. Split files are replaced on every call.
    pub async fn run(&self) -> Result<RunOutcome, PrepError> {
        self.config.validate()?;
        let acquisition = self.fetch().await?;
        // Fail on a missing column before any per-row work.
        self.schema(&acquisition.batch)?;

        let (mapped, transforms) = self.map_labels(acquisition.batch)?;
        let schema = self.schema(&mapped)?;
        tracing::info!(rows = mapped.row_count(), "Mapped labels");

        let plan = SplitPlan::from(&self.config);
        let sets = build_splits(mapped.clone(), &plan)?;
        verify_partition(&mapped, &sets, schema.split, &plan)?;

        let split_dir = self.config.resolved_split_dir();
        let mut files = storage::write_splits(&split_dir, &sets)?;

        let report = SplitReport {
            source: acquisition.info,
            source_sha256: acquisition.sha256,
            plan,
            train: PartStats::of(&sets.train, schema.label),
            val: PartStats::of(&sets.val, schema.label),
            test: PartStats::of(&sets.test, schema.label),
            skipped_rows: sets.skipped,
            transforms,
            created_at: chrono::Utc::now(),
        };
        report.log();

        if self.config.write_manifest {
            let manifest = split_dir.join(storage::MANIFEST_FILE);
            storage::atomic_write_json(&manifest, &report)?;
            files.push(manifest);
        }

        Ok(RunOutcome { report, files })
    }

    fn schema(&self, batch: &DataBatch) -> Result<DatasetSchema, PrepError> {
        DatasetSchema::resolve(batch, &self.config.label_column, &self.config.split_column)
    }

    fn map_labels(
        &self,
        batch: DataBatch,
    ) -> Result<(DataBatch, Vec<TransformRecord>), PrepError> {
        TransformPipeline::new()
            .add_step(TransformStep::MapLabels {
                column: self.config.label_column.clone(),
                policy: self.config.unknown_labels,
            })
            .apply_recorded(batch)
    }
}
