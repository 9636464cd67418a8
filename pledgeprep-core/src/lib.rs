//! # pledgeprep-core: dataset preparation for the pledge classifier
//!
//! Fetches the Fornaciari et al. (2021) pledge dataset once, maps its integer
//! class codes to label names, and writes reproducible train / val / test
//! splits:
//!
//! 1. **Acquire** - read the local TSV cache, downloading it first if missing
//! 2. **Map** - `0 -> "no pledge"`, `1 -> "pledge"`
//! 3. **Split** - `dev` rows become test; `trn` rows are divided 90/10 into
//!    train and val, stratified by label with a fixed seed
//! 4. **Persist** - `train.csv`, `val.csv`, `test.csv` in `splits/`

pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;

pub use config::{PrepConfig, PrepOverrides, UnknownLabelPolicy, load_config};
pub use error::PrepError;
pub use pipeline::{Acquisition, Pipeline, RunOutcome, acquire};
