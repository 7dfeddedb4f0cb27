// File: crates/chart-pipeline/tests/pipeline.rs
// Purpose: End-to-end stacked chains built from CSV text: grouping, percentile, switching, auto-grouping.

use std::cell::RefCell;
use std::rc::Rc;

use chart_pipeline::{
    listener, pre_grouped_pipeline, stacked_pipeline, DataUpdate, PipelineConfig, PipelineError, Stage, TimeBucket,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};

const SAMPLE: &str = "date,java,xml,txt\n18/01/2013,1,11,111\n19/01/2013,2,22,222\n20/01/2013,3,33,333\n";
const OTHER: &str = "date,java,xml,txt\n01/02/2013,5,5,5\n";

fn at(d: u32, m: u32, y: i32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

fn capture(stage: &dyn Stage<Output = DataUpdate>) -> Rc<RefCell<Vec<DataUpdate>>> {
    let seen: Rc<RefCell<Vec<DataUpdate>>> = Rc::default();
    let sink = Rc::clone(&seen);
    stage.on_update(vec![listener(move |u: &DataUpdate| {
        sink.borrow_mut().push(u.clone());
        Ok(())
    })]);
    seen
}

#[test]
fn sample_is_stacked_per_day() {
    let config = PipelineConfig::default();
    let pipeline = stacked_pipeline(&[SAMPLE], &config).unwrap();
    let seen = capture(&pipeline);
    pipeline.send_update().unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    let update = &seen[0];
    assert_eq!(update.grouping().unwrap().bucket(), TimeBucket::DAY);
    assert_eq!(update.layer("xml").unwrap().points[0].y0, 1.0);
    assert_eq!(update.layer("txt").unwrap().points[0].y0, 12.0);
    assert_eq!(update.range_of(&config.row_total_key).unwrap(), (0.0, 369.0));
    assert_eq!(update.extent.as_ref().unwrap().key, Some((at(18, 1, 2013), at(20, 1, 2013))));
    assert_eq!(update.percentile, Some(1.0));
}

#[test]
fn grouping_by_week_sums_the_sample() {
    let config = PipelineConfig::default();
    let pipeline = stacked_pipeline(&[SAMPLE], &config).unwrap();
    let seen = capture(&pipeline);
    pipeline.send_update().unwrap();
    assert!(pipeline.group_by(TimeBucket::WEEK).unwrap());
    assert!(!pipeline.group_by(TimeBucket::WEEK).unwrap());

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    let week = &seen[1];
    assert_eq!(week.data.len(), 1);
    assert_eq!(week.data[0].key, at(14, 1, 2013));
    assert_eq!(week.data[0].number(&config.row_total_key), Some(738.0));
    let txt = week.layer("txt").unwrap();
    assert_eq!(txt.points[0].y0, 72.0);
    assert_eq!(txt.points[0].top(), 738.0);
    assert_eq!(week.range_of(&config.row_total_key).unwrap(), (0.0, 738.0));
}

#[test]
fn percentile_hides_the_largest_totals() {
    let pipeline = stacked_pipeline(&[SAMPLE], &PipelineConfig::default()).unwrap();
    let seen = capture(&pipeline);
    pipeline.send_update().unwrap();
    pipeline.set_percentile(0.5).unwrap();
    pipeline.set_percentile(1.0).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[1].data.len(), 2);
    assert_eq!(seen[1].percentile, Some(0.5));
    assert_eq!(seen[1].extent.as_ref().unwrap().key_max(), Some(at(19, 1, 2013)));
    assert_eq!(seen[2].data.len(), 3);
}

#[test]
fn several_csvs_switch_through_the_same_chain() {
    let pipeline = stacked_pipeline(&[SAMPLE, OTHER], &PipelineConfig::default()).unwrap();
    let seen = capture(&pipeline);
    pipeline.send_update().unwrap();
    pipeline.set_data_source_index(1).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].data_source_index, Some(0));
    assert_eq!(seen[1].data_source_index, Some(1));
    assert_eq!(seen[1].data.len(), 1);
    assert_eq!(seen[1].layer("txt").unwrap().points[0].y0, 10.0);
    assert!(matches!(
        pipeline.set_data_source_index(2),
        Err(PipelineError::DataSourceIndexOutOfRange { index: 2, len: 2 })
    ));
}

#[test]
fn single_csv_only_accepts_index_zero() {
    let pipeline = stacked_pipeline(&[SAMPLE], &PipelineConfig::default()).unwrap();
    let seen = capture(&pipeline);
    pipeline.set_data_source_index(0).unwrap();
    assert_eq!(seen.borrow().len(), 1);
    assert!(pipeline.switcher.is_none());
    assert!(matches!(
        pipeline.set_data_source_index(1),
        Err(PipelineError::DataSourceIndexOutOfRange { index: 1, len: 1 })
    ));
}

#[test]
fn builders_reject_bad_input() {
    let config = PipelineConfig::default();
    assert!(matches!(stacked_pipeline(&[], &config), Err(PipelineError::Config(_))));
    assert!(matches!(
        stacked_pipeline(&["date,a\nnot a date,1\n"], &config),
        Err(PipelineError::InvalidDate { row: 1, .. })
    ));
    let no_buckets = PipelineConfig { granularities: Vec::new(), ..PipelineConfig::default() };
    assert!(matches!(stacked_pipeline(&[SAMPLE], &no_buckets), Err(PipelineError::Config(_))));
    assert!(matches!(
        pre_grouped_pipeline(&[SAMPLE], vec![TimeBucket::DAY, TimeBucket::WEEK], &config),
        Err(PipelineError::Config(_))
    ));
}

#[test]
fn pre_grouped_csvs_are_grouping_choices() {
    let weekly = "date,java,xml,txt\n14/01/2013,6,66,666\n";
    let pipeline =
        pre_grouped_pipeline(&[SAMPLE, weekly], vec![TimeBucket::DAY, TimeBucket::WEEK], &PipelineConfig::default())
            .unwrap();
    let seen = capture(&pipeline);
    pipeline.send_update().unwrap();
    assert!(pipeline.group_by(TimeBucket::WEEK).unwrap());

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].data.len(), 3);
    assert_eq!(seen[0].grouping().unwrap().bucket(), TimeBucket::DAY);
    assert_eq!(seen[1].grouping().unwrap().bucket(), TimeBucket::WEEK);
    assert_eq!(seen[1].layer("txt").unwrap().points[0].y0, 72.0);
    assert_eq!(pipeline.switcher.as_ref().unwrap().data_source_index(), 1);
}

#[test]
fn long_ranges_are_auto_grouped_on_first_update() {
    let mut csv = String::from("date,java,xml\n");
    for i in 0..400 {
        let day = at(1, 1, 2013) + Duration::days(i);
        csv.push_str(&format!("{},1,2\n", day.format("%d/%m/%Y")));
    }
    let config = PipelineConfig::default();
    let pipeline = stacked_pipeline(&[csv.as_str()], &config).unwrap();
    let seen = capture(&pipeline);
    pipeline.send_update().unwrap();
    pipeline.send_update().unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    for update in seen.iter() {
        assert_eq!(update.grouping().unwrap().bucket(), TimeBucket::WEEK);
        assert!(update.data.len() < config.auto_group_threshold);
        let total: f64 = update.data.iter().map(|r| r.number_or_zero(&config.row_total_key)).sum();
        assert_eq!(total, 1200.0);
    }
    assert_eq!(seen[0].data[0].key, at(31, 12, 2012));
}
