// File: crates/chart-pipeline/src/error.rs
// Summary: Error taxonomy for pipeline construction, configuration and input parsing.

use thiserror::Error;

use crate::bucket::TimeBucket;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no matching group function for: {0:?}")]
    UnknownBucket(TimeBucket),

    #[error("group index {index} out of range (available: {len})")]
    GroupIndexOutOfRange { index: usize, len: usize },

    #[error("data source index {index} out of range (available: {len})")]
    DataSourceIndexOutOfRange { index: usize, len: usize },

    #[error("category '{0}' is not present in the update")]
    UnknownCategory(String),

    /// A consumer asked for min/max values that no upstream stage computed.
    #[error("no min/max values for '{field}'; compose a min/max stage upstream")]
    MissingExtent { field: String },

    #[error("update carries no grouping functions; compose a grouping stage upstream")]
    MissingGrouping,

    #[error("update carries no stacked data; compose a stacking stage upstream")]
    MissingStackedData,

    #[error("csv input has no header row")]
    MissingKeyColumn,

    #[error("row {row}: cannot parse '{value}' as a dd/mm/yyyy date")]
    InvalidDate { row: usize, value: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
