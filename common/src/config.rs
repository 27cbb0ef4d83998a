//! Job configuration for the pairs computation.

use crate::error::{CommonError, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Ratings strictly above this value qualify unless configured otherwise.
pub const DEFAULT_QUALITY_THRESHOLD: i32 = 3;

/// Layout of the ratings input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DatasetVariant {
    /// MovieLens 100K: `user\titem\trating\ttimestamp`
    #[default]
    Ml100k,
    /// MovieLens 1M/10M: `user::item::rating::timestamp`
    Ml1m,
}

impl DatasetVariant {
    /// Resolve a dataset name given on the command line.
    ///
    /// `100K` (any case) selects the tab-separated layout; every other name
    /// selects the `::` layout.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("100k") {
            DatasetVariant::Ml100k
        } else {
            DatasetVariant::Ml1m
        }
    }

    pub fn separator(&self) -> &'static str {
        match self {
            DatasetVariant::Ml100k => "\t",
            DatasetVariant::Ml1m => "::",
        }
    }
}

/// How the reduce side forms aggregation groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMode {
    /// One group per exact `(low, high)` pair.
    #[default]
    ExactPair,
    /// One group per low item, all of its high items together.
    LowItem,
}

/// Configuration for a pairs job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Application name used in logs
    pub app_name: String,
    /// Ratings strictly above this value qualify
    pub quality_threshold: i32,
    /// Input layout
    pub dataset: DatasetVariant,
    /// Explicit field separator, overrides the dataset layout
    pub separator: Option<String>,
    /// Number of map partitions the input is split into
    pub num_map_tasks: usize,
    /// Number of reduce workers the routing function targets
    pub num_reducers: u32,
    /// Run the local combine pass before routing
    pub combine: bool,
    pub grouping: GroupingMode,
    /// Size of the worker thread pool, rayon's default when unset
    pub num_threads: Option<usize>,
    /// Seed mixed into the routing hash
    pub hash_seed: u64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            app_name: "copairs".to_string(),
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            dataset: DatasetVariant::default(),
            separator: None,
            num_map_tasks: num_cpus::get(),
            num_reducers: num_cpus::get() as u32,
            combine: true,
            grouping: GroupingMode::default(),
            num_threads: None,
            hash_seed: 0,
        }
    }
}

impl JobConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_io_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: JobConfig = serde_json::from_str(&raw)
            .with_config_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!(path = %path.display(), ?config, "Loaded job configuration");
        config.validate()?;
        Ok(config)
    }

    /// The field separator in effect for this job.
    pub fn effective_separator(&self) -> &str {
        self.separator
            .as_deref()
            .unwrap_or_else(|| self.dataset.separator())
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_map_tasks == 0 {
            return Err(CommonError::configuration_error(
                "num_map_tasks must be positive",
            ));
        }
        if self.num_reducers == 0 {
            return Err(CommonError::configuration_error(
                "num_reducers must be positive",
            ));
        }
        if self.effective_separator().is_empty() {
            return Err(CommonError::configuration_error(
                "separator must not be empty",
            ));
        }
        if self.num_threads == Some(0) {
            return Err(CommonError::configuration_error(
                "num_threads must be positive when set",
            ));
        }
        Ok(())
    }
}
