//! Configuration for the preparation pipeline.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment -> explicit overrides. With no file and
//! no `PLEDGEPREP_*` variables the defaults reproduce the published splits.

use crate::error::PrepError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Location of the published dataset.
pub const DEFAULT_DATASET_URL: &str = "https://cta-text-datasets.s3.eu-central-1.amazonaws.com/labeled/fornaciari_we_2021/fornaciari_we_2021-pledge_binary.tsv";

/// Local cache file name, relative to the workspace.
pub const DEFAULT_DATASET_FILE: &str = "fornaciari_we_2021-pledge_binary.tsv";

/// Name of the workspace-level config file.
pub const WORKSPACE_CONFIG_FILE: &str = "pledgeprep.toml";

/// Environment variable prefix (`PLEDGEPREP_SEED`, `PLEDGEPREP_VAL_FRACTION`, ...).
pub const ENV_PREFIX: &str = "PLEDGEPREP_";

/// What to do with a `label` cell that is not one of the known class codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownLabelPolicy {
    /// Abort the run with a [`PrepError::Label`].
    #[default]
    Reject,
    /// Write an empty cell, as a missing value would be written.
    Blank,
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepConfig {
    /// Remote TSV fetched when the local cache is missing.
    #[serde(default = "default_dataset_url")]
    pub dataset_url: String,
    /// Local cache of the dataset (tab-separated).
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,
    /// Output directory; defaults to `splits/` next to the dataset file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_dir: Option<PathBuf>,
    #[serde(default = "default_label_column")]
    pub label_column: String,
    #[serde(default = "default_split_column")]
    pub split_column: String,
    /// Split tag of rows that form the test set.
    #[serde(default = "default_test_tag")]
    pub test_tag: String,
    /// Split tag of rows that are divided into train and val.
    #[serde(default = "default_train_tag")]
    pub train_tag: String,
    /// Share of the train pool drawn into val.
    #[serde(default = "default_val_fraction")]
    pub val_fraction: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub unknown_labels: UnknownLabelPolicy,
    /// Also write `manifest.json` next to the split files.
    #[serde(default)]
    pub write_manifest: bool,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            dataset_url: default_dataset_url(),
            dataset_path: default_dataset_path(),
            split_dir: None,
            label_column: default_label_column(),
            split_column: default_split_column(),
            test_tag: default_test_tag(),
            train_tag: default_train_tag(),
            val_fraction: default_val_fraction(),
            seed: default_seed(),
            unknown_labels: UnknownLabelPolicy::default(),
            write_manifest: false,
        }
    }
}

fn default_dataset_url() -> String {
    DEFAULT_DATASET_URL.to_string()
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATASET_FILE)
}

fn default_label_column() -> String {
    "label".to_string()
}

fn default_split_column() -> String {
    "metadata__split".to_string()
}

fn default_test_tag() -> String {
    "dev".to_string()
}

fn default_train_tag() -> String {
    "trn".to_string()
}

fn default_val_fraction() -> f64 {
    0.1
}

fn default_seed() -> u64 {
    42
}

impl PrepConfig {
    /// Directory the split files are written to.
    pub fn resolved_split_dir(&self) -> PathBuf {
        match &self.split_dir {
            Some(dir) => dir.clone(),
            None => self
                .dataset_path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join("splits"),
        }
    }

    /// Resolve relative paths against `workspace`.
    pub fn rooted_at(mut self, workspace: &Path) -> Self {
        if self.dataset_path.is_relative() {
            self.dataset_path = workspace.join(&self.dataset_path);
        }
        if let Some(dir) = &self.split_dir {
            if dir.is_relative() {
                self.split_dir = Some(workspace.join(dir));
            }
        }
        self
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), PrepError> {
        if !(self.val_fraction > 0.0 && self.val_fraction < 1.0) {
            return Err(PrepError::config(format!(
                "val_fraction must be in (0, 1), got {}",
                self.val_fraction
            )));
        }
        if self.label_column.trim().is_empty() || self.split_column.trim().is_empty() {
            return Err(PrepError::config("column names must not be empty"));
        }
        if self.label_column == self.split_column {
            return Err(PrepError::config(format!(
                "label_column and split_column are both '{}'",
                self.label_column
            )));
        }
        if self.test_tag == self.train_tag {
            return Err(PrepError::config(format!(
                "test_tag and train_tag are both '{}'",
                self.test_tag
            )));
        }
        if self.dataset_url.trim().is_empty() {
            return Err(PrepError::config("dataset_url must not be empty"));
        }
        Ok(())
    }
}

/// Path of the user-level config file, if a home directory can be resolved.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "pledgeprep", "pledgeprep")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `PLEDGEPREP_`)
/// 3. `config_file`, or `<workspace>/pledgeprep.toml` when none is given
/// 4. User config (`~/.config/pledgeprep/config.toml`)
/// 5. Built-in defaults
///
/// Relative paths in the result are resolved against `workspace`.
pub fn load_config(
    workspace: &Path,
    config_file: Option<&Path>,
    overrides: Option<&PrepOverrides>,
) -> Result<PrepConfig, PrepError> {
    let mut figment = Figment::from(Serialized::defaults(PrepConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    match config_file {
        Some(path) => {
            if !path.exists() {
                return Err(PrepError::config(format!(
                    "config file '{}' does not exist",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        None => {
            let ws_config = workspace.join(WORKSPACE_CONFIG_FILE);
            if ws_config.exists() {
                figment = figment.merge(Toml::file(&ws_config));
            }
        }
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: PrepConfig = figment.extract().map_err(Box::new)?;
    config.validate()?;
    Ok(config.rooted_at(workspace))
}

/// Values set explicitly on the command line. Unset fields leave lower layers
/// untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PrepOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub val_fraction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_manifest: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_published_pipeline() {
        let config = PrepConfig::default();
        assert_eq!(config.label_column, "label");
        assert_eq!(config.split_column, "metadata__split");
        assert_eq!(config.test_tag, "dev");
        assert_eq!(config.train_tag, "trn");
        assert_eq!(config.seed, 42);
        assert!((config.val_fraction - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.unknown_labels, UnknownLabelPolicy::Reject);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_split_dir_defaults_next_to_dataset() {
        let config = PrepConfig {
            dataset_path: PathBuf::from("data/pledge.tsv"),
            ..Default::default()
        };
        assert_eq!(
            config.resolved_split_dir(),
            PathBuf::from("data").join("splits")
        );

        let bare = PrepConfig::default();
        assert_eq!(bare.resolved_split_dir(), PathBuf::from("splits"));
    }

    #[test]
    fn test_validate_rejects_bad_fraction() {
        for fraction in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let config = PrepConfig {
                val_fraction: fraction,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(PrepError::Config(_))));
        }
    }

    #[test]
    fn test_validate_rejects_equal_tags() {
        let config = PrepConfig {
            test_tag: "trn".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PrepError::Config(_))));
    }

    #[test]
    fn test_rooted_at_keeps_absolute_paths() {
        let workspace = Path::new("/work");
        let config = PrepConfig {
            dataset_path: PathBuf::from("/data/pledge.tsv"),
            split_dir: Some(PathBuf::from("out")),
            ..Default::default()
        }
        .rooted_at(workspace);
        assert_eq!(config.dataset_path, PathBuf::from("/data/pledge.tsv"));
        assert_eq!(config.split_dir, Some(workspace.join("out")));
    }

    #[test]
    fn test_load_config_layers() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                WORKSPACE_CONFIG_FILE,
                r#"
                    seed = 7
                    val_fraction = 0.2
                    unknown_labels = "blank"
                "#,
            )?;
            jail.set_env("PLEDGEPREP_SEED", "9");

            let workspace = jail.directory().to_path_buf();
            let config = load_config(&workspace, None, None).expect("config loads");
            assert_eq!(config.seed, 9);
            assert!((config.val_fraction - 0.2).abs() < f64::EPSILON);
            assert_eq!(config.unknown_labels, UnknownLabelPolicy::Blank);
            assert_eq!(config.dataset_path, workspace.join(DEFAULT_DATASET_FILE));

            let overrides = PrepOverrides {
                seed: Some(11),
                ..Default::default()
            };
            let config =
                load_config(&workspace, None, Some(&overrides)).expect("config loads");
            assert_eq!(config.seed, 11);
            Ok(())
        });
    }

    #[test]
    fn test_load_config_missing_explicit_file() {
        figment::Jail::expect_with(|jail| {
            let workspace = jail.directory().to_path_buf();
            let result = load_config(&workspace, Some(&workspace.join("nope.toml")), None);
            assert!(matches!(result, Err(PrepError::Config(_))));
            Ok(())
        });
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(WORKSPACE_CONFIG_FILE, "val_fraction = 2.0")?;
            let workspace = jail.directory().to_path_buf();
            let result = load_config(&workspace, None, None);
            assert!(matches!(result, Err(PrepError::Config(_))));
            Ok(())
        });
    }
}
