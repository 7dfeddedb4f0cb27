// File: crates/chart-pipeline/src/pipeline.rs
// Summary: Builders composing the standard stacked-bar chains from raw CSV text.

use std::rc::Rc;

use tracing::info;

use crate::annotate::{clamped_min, WithMinMax, WithMinMaxKey, WithRowTotal};
use crate::bucket::TimeBucket;
use crate::channel::Listener;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::filter::FilteredByPercentile;
use crate::grouping::{AutoGroupOnFirstUpdate, GroupedBy};
use crate::source::DataSource;
use crate::stack::WithStackedData;
use crate::stage::{DataStage, GroupSelector, Groupable, Stage};
use crate::switcher::{DataSourceSwitcher, WithDataSourceIndexAsGroup};
use crate::update::DataUpdate;

/// Handles onto a composed stacked chain. Listen to it like any stage.
pub struct StackedPipeline {
    pub row_total_key: String,
    pub switcher: Option<Rc<DataSourceSwitcher>>,
    pub grouping: Rc<dyn Groupable>,
    pub percentile: Rc<FilteredByPercentile>,
    pub total_min_max: Rc<WithMinMax>,
    output: Rc<WithStackedData>,
}

impl StackedPipeline {
    pub fn group_by(&self, selector: impl Into<GroupSelector>) -> Result<bool> { self.grouping.group_by(selector.into()) }

    pub fn set_percentile(&self, value: f64) -> Result<()> { self.percentile.set_percentile(value) }

    /// Fails when the pipeline was built from a single data set.
    pub fn set_data_source_index(&self, index: usize) -> Result<()> {
        match &self.switcher {
            Some(s) => s.set_data_source_index(index),
            None if index == 0 => self.send_update(),
            None => Err(PipelineError::DataSourceIndexOutOfRange { index, len: 1 }),
        }
    }
}

impl Stage for StackedPipeline {
    type Output = DataUpdate;

    fn on_update(&self, listeners: Vec<Listener<DataUpdate>>) { self.output.on_update(listeners); }

    fn send_update(&self) -> Result<()> { self.output.send_update() }
}

fn data_sources(raw_csvs: &[&str]) -> Result<Vec<DataStage>> {
    raw_csvs
        .iter()
        .map(|raw| DataSource::from_csv(raw).map(|s| s as DataStage))
        .collect()
}

/// `group -> row total -> percentile -> key min/max -> total min/max -> auto-group -> stack`.
///
/// With more than one CSV the data sets sit behind a switcher that feeds the
/// same chain.
pub fn stacked_pipeline(raw_csvs: &[&str], config: &PipelineConfig) -> Result<StackedPipeline> {
    config.validate()?;
    let mut sources = data_sources(raw_csvs)?;
    let (source, switcher) = match sources.len() {
        0 => return Err(PipelineError::Config("stacked pipeline requires at least one csv".into())),
        1 => (sources.remove(0), None),
        _ => {
            let switcher = DataSourceSwitcher::new(sources)?;
            let source: DataStage = switcher.clone();
            (source, Some(switcher))
        }
    };
    let grouped = GroupedBy::new(config.time_buckets(), source)?;
    let grouping: Rc<dyn Groupable> = grouped.clone();
    info!(datasets = raw_csvs.len(), "built stacked pipeline");
    Ok(assemble(grouped, grouping, switcher, config))
}

/// Like [`stacked_pipeline`] but for CSVs already grouped by `functions`
/// (one per CSV, finest first); grouping switches between them.
pub fn pre_grouped_pipeline(
    raw_csvs: &[&str],
    functions: Vec<TimeBucket>,
    config: &PipelineConfig,
) -> Result<StackedPipeline> {
    config.validate()?;
    let switcher = DataSourceSwitcher::new(data_sources(raw_csvs)?)?;
    let as_group = WithDataSourceIndexAsGroup::new(functions, Rc::clone(&switcher))?;
    let grouping: Rc<dyn Groupable> = as_group.clone();
    info!(datasets = raw_csvs.len(), "built pre-grouped pipeline");
    Ok(assemble(as_group, grouping, Some(switcher), config))
}

fn assemble(
    grouped: DataStage,
    grouping: Rc<dyn Groupable>,
    switcher: Option<Rc<DataSourceSwitcher>>,
    config: &PipelineConfig,
) -> StackedPipeline {
    let total_key = config.row_total_key.clone();
    let with_total = WithRowTotal::new(total_key.clone(), grouped);
    let percentile = FilteredByPercentile::new(total_key.clone(), with_total);
    let key_min_max = WithMinMaxKey::new(percentile.clone());
    let total_min_max = clamped_min(config.clamp_min, WithMinMax::new(total_key.clone(), key_min_max));
    let auto_group =
        AutoGroupOnFirstUpdate::new(config.auto_group_threshold, Rc::clone(&grouping), total_min_max.clone());
    let output = WithStackedData::new(auto_group);
    StackedPipeline { row_total_key: total_key, switcher, grouping, percentile, total_min_max, output }
}
