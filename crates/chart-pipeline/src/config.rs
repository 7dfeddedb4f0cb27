// File: crates/chart-pipeline/src/config.rs
// Summary: Per-chart pipeline configuration (JSON5, every field defaulted) and tracing setup.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bucket::{time_buckets, Granularity, TimeBucket};
use crate::error::{PipelineError, Result};
use crate::graph_filter::{
    DEFAULT_ADJUST_START, DEFAULT_ADJUST_STEP, DEFAULT_MIN_LINK_STRENGTH, DEFAULT_MIN_NODE_CLUSTER_SIZE,
};

/// Heuristic constants of the stacked and graph pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Field under which row totals are stored.
    #[serde(default = "default_row_total_key")]
    pub row_total_key: String,

    /// Auto-grouping picks the first bucket spanning the data in fewer steps than this.
    #[serde(default = "default_auto_group_threshold")]
    pub auto_group_threshold: usize,

    /// Bucket functions, finest first.
    #[serde(default = "default_granularities")]
    pub granularities: Vec<Granularity>,

    /// Permanent lower clamp of the row total axis.
    #[serde(default)]
    pub clamp_min: f64,

    /// Percentile choices offered to users, as fractions.
    #[serde(default = "default_percentile_options")]
    pub percentile_options: Vec<f64>,

    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    pub fn time_buckets(&self) -> Vec<TimeBucket> { time_buckets(&self.granularities) }

    pub fn validate(&self) -> Result<()> {
        if self.granularities.is_empty() {
            return Err(PipelineError::Config("granularities must not be empty".into()));
        }
        if self.auto_group_threshold == 0 {
            return Err(PipelineError::Config("auto_group_threshold must be positive".into()));
        }
        if let Some(p) = self.percentile_options.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(PipelineError::Config(format!("percentile option {p} is outside [0, 1]")));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            row_total_key: default_row_total_key(),
            auto_group_threshold: default_auto_group_threshold(),
            granularities: default_granularities(),
            clamp_min: 0.0,
            percentile_options: default_percentile_options(),
            graph: GraphConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_row_total_key() -> String { "_row_total_".to_string() }

fn default_auto_group_threshold() -> usize { 100 }

fn default_granularities() -> Vec<Granularity> { vec![Granularity::Day, Granularity::Week, Granularity::Month] }

/// 100% down to 95% in half-percent steps.
pub fn default_percentile_options() -> Vec<f64> { (0..=10).map(|i| (1000 - i * 5) as f64 / 1000.0).collect() }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_min_node_cluster_size")]
    pub min_node_cluster_size: usize,

    #[serde(default = "default_min_link_strength")]
    pub min_link_strength: f64,

    /// First minimum link strength tried when shrinking a graph.
    #[serde(default = "default_adjust_start")]
    pub adjust_start: f64,

    #[serde(default = "default_adjust_step")]
    pub adjust_step: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            min_node_cluster_size: default_min_node_cluster_size(),
            min_link_strength: default_min_link_strength(),
            adjust_start: default_adjust_start(),
            adjust_step: default_adjust_step(),
        }
    }
}

fn default_min_node_cluster_size() -> usize { DEFAULT_MIN_NODE_CLUSTER_SIZE }

fn default_min_link_strength() -> f64 { DEFAULT_MIN_LINK_STRENGTH }

fn default_adjust_start() -> f64 { DEFAULT_ADJUST_START }

fn default_adjust_step() -> f64 { DEFAULT_ADJUST_STEP }

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// "trace", "debug", "info", "warn" or "error"; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self { Self { level: default_log_level(), format: LogFormat::default() } }
}

/// Load and validate a JSON5 configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate JSON5 configuration text.
pub fn parse_config(content: &str) -> Result<PipelineConfig> {
    let config: PipelineConfig =
        json5::from_str(content).map_err(|e| PipelineError::Config(format!("failed to parse config: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// Install a global tracing subscriber. Fails if one is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let installed = match config.format {
        LogFormat::Text => tracing_subscriber::registry().with(fmt::layer()).with(filter).try_init(),
        LogFormat::Json => tracing_subscriber::registry().with(fmt::layer().json()).with(filter).try_init(),
    };
    installed.map_err(|e| PipelineError::Config(format!("failed to initialize tracing: {e}")))
}
