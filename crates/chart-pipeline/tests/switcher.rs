// File: crates/chart-pipeline/tests/switcher.rs
// Purpose: Active-source isolation of the switcher and grouping by data source index.

use std::cell::RefCell;
use std::rc::Rc;

use chart_pipeline::{
    listener, DataSource, DataSourceSwitcher, DataStage, DataUpdate, GroupSelector, Groupable, PipelineError, Stage,
    TimeBucket, WithDataSourceIndexAsGroup,
};

const DAILY: &str = "date,a,b\n18/01/2013,1,10\n19/01/2013,2,20\n20/01/2013,3,30\n";
const WEEKLY: &str = "date,a,b\n14/01/2013,6,60\n";

fn sources() -> Vec<DataStage> {
    let daily: DataStage = DataSource::from_csv(DAILY).unwrap();
    let weekly: DataStage = DataSource::from_csv(WEEKLY).unwrap();
    vec![daily, weekly]
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
fn only_the_active_source_is_relayed() {
    let switcher = DataSourceSwitcher::new(sources()).unwrap();
    let seen = capture(switcher.as_ref());

    switcher.send_update().unwrap();
    switcher.set_data_source_index(1).unwrap();
    switcher.send_update().unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0].data_source_index, Some(0));
    assert_eq!(seen[0].data.len(), 3);
    for update in &seen[1..] {
        assert_eq!(update.data_source_index, Some(1));
        assert_eq!(update.data.len(), 1);
        assert_eq!(update.data[0].number("a"), Some(6.0));
    }
}

#[test]
fn switcher_rejects_bad_indices_and_empty_input() {
    let switcher = DataSourceSwitcher::new(sources()).unwrap();
    assert!(matches!(
        switcher.set_data_source_index(2),
        Err(PipelineError::DataSourceIndexOutOfRange { index: 2, len: 2 })
    ));
    assert_eq!(switcher.data_source_index(), 0);
    assert!(matches!(DataSourceSwitcher::new(Vec::new()), Err(PipelineError::Config(_))));
}

#[test]
fn grouping_switches_the_data_source() {
    let switcher = DataSourceSwitcher::new(sources()).unwrap();
    let stage = WithDataSourceIndexAsGroup::new(vec![TimeBucket::DAY, TimeBucket::WEEK], switcher.clone()).unwrap();
    let seen = capture(stage.as_ref());

    stage.send_update().unwrap();
    assert!(stage.group_by(TimeBucket::WEEK.into()).unwrap());
    assert!(!stage.group_by(GroupSelector::Index(1)).unwrap());

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].grouping().unwrap().bucket(), TimeBucket::DAY);
    assert_eq!(seen[1].grouping().unwrap().index, 1);
    assert_eq!(seen[1].grouping().unwrap().bucket(), TimeBucket::WEEK);
    assert_eq!(seen[1].data.len(), 1);
    assert_eq!(switcher.data_source_index(), 1);
    assert_eq!(stage.group_functions().len(), 2);
}

#[test]
fn grouping_by_source_validates_configuration() {
    let switcher = DataSourceSwitcher::new(sources()).unwrap();
    assert!(matches!(
        WithDataSourceIndexAsGroup::new(vec![TimeBucket::DAY], switcher.clone()),
        Err(PipelineError::Config(_))
    ));

    let stage = WithDataSourceIndexAsGroup::new(vec![TimeBucket::DAY, TimeBucket::WEEK], switcher).unwrap();
    assert!(matches!(stage.group_by(TimeBucket::MONTH.into()), Err(PipelineError::UnknownBucket(_))));
    assert!(matches!(
        stage.group_by(GroupSelector::Index(3)),
        Err(PipelineError::DataSourceIndexOutOfRange { index: 3, len: 2 })
    ));
}
