//! Data pipeline stages: load, map labels, split, persist.

pub mod labels;
pub mod schema;
pub mod source;
pub mod split;
pub mod storage;
pub mod transform;
pub mod validate;

pub use schema::DatasetSchema;
pub use source::{DataBatch, DataSource, DataSourceInfo, RemoteTsvSource, TsvFileSource};
pub use split::{SplitPlan, SplitSets};
pub use transform::{TransformPipeline, TransformStep};
pub use validate::{DatasetSummary, PartStats, SplitReport};
