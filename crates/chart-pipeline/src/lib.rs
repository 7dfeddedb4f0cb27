// File: crates/chart-pipeline/src/lib.rs
// Summary: Library entry point; exports the reactive aggregation stages, time buckets and graph filters.

pub mod annotate;
pub mod bucket;
pub mod channel;
pub mod config;
pub mod error;
pub mod filter;
pub mod graph;
pub mod graph_filter;
pub mod grouping;
pub mod moving_average;
pub mod pipeline;
pub mod record;
pub mod scale;
pub mod series;
pub mod source;
pub mod stack;
pub mod stage;
pub mod switcher;
pub mod union_find;
pub mod update;
pub mod view;

pub use annotate::{clamped_min, WithMinMax, WithMinMaxKey, WithMinMaxOfRow, WithRowTotal, ROW_VALUE_FIELD};
pub use bucket::{default_time_buckets, time_buckets, Granularity, TimeBucket};
pub use channel::{listener, Channel, Listener};
pub use config::{init_tracing, load_config, parse_config, GraphConfig, LogFormat, LoggingConfig, PipelineConfig};
pub use error::{PipelineError, Result};
pub use filter::{FilteredByPercentile, WithCategoryExclusion, WithFirstCategories};
pub use graph::{GraphData, GraphSource, GraphStage, Link, Node, NodeId, SearchIndex};
pub use graph_filter::{
    adjust_filtering_till_node_amount_is_less_than, SelectionMode, WithLinkStrengthFilter, WithNodeClusterSizeFilter,
    WithNodeSelection, WithRemovedNodes,
};
pub use grouping::{AutoGroupOnFirstUpdate, GroupedBy};
pub use moving_average::{layer_moving_average, moving_average, MeanPoint};
pub use pipeline::{pre_grouped_pipeline, stacked_pipeline, StackedPipeline};
pub use record::{Record, Value};
pub use scale::{TimeScale, ValueScale};
pub use series::{CategorySeries, SeriesPoint, WithSeriesData};
pub use source::{parse_date_based_csv, DataSource, ParsedCsv};
pub use stack::{Layer, StackedPoint, WithStackedData};
pub use stage::{DataStage, GroupSelector, Groupable, LoggedStage, Stage};
pub use switcher::{DataSourceSwitcher, WithDataSourceIndexAsGroup};
pub use union_find::QuickFind;
pub use update::{DataUpdate, Extent, Grouping};
pub use view::ViewState;
