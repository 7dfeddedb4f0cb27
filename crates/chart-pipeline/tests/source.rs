// File: crates/chart-pipeline/tests/source.rs
// Purpose: Date-keyed CSV parsing (numeric fallback, errors) and the root data source.

use std::cell::RefCell;
use std::rc::Rc;

use chart_pipeline::{listener, parse_date_based_csv, DataSource, DataUpdate, PipelineError, Record, Stage, Value};
use chrono::{NaiveDate, NaiveDateTime};

const CSV: &str = "
date,java,xml,txt
18/01/2013,1,11,111
19/01/2013,2,22,222
20/01/2013,3,33,333
";

fn at(d: u32, m: u32, y: i32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

#[test]
fn parses_key_and_numeric_fields() {
    let parsed = parse_date_based_csv(CSV).unwrap();
    assert_eq!(parsed.key, "date");
    assert_eq!(parsed.records.len(), 3);

    let first = &parsed.records[0];
    assert_eq!(first.key, at(18, 1, 2013));
    assert_eq!(first.field_names().collect::<Vec<_>>(), vec!["java", "xml", "txt"]);
    assert_eq!(first.number("xml"), Some(11.0));
    assert_eq!(parsed.records[2].number("txt"), Some(333.0));
}

#[test]
fn unparseable_cells_keep_their_text() {
    let parsed = parse_date_based_csv("date,a,b\n01/02/2013, 4.5 ,n/a\n").unwrap();
    let row = &parsed.records[0];
    assert_eq!(row.get("a"), Some(&Value::Number(4.5)));
    assert_eq!(row.get("b"), Some(&Value::Text("n/a".to_string())));
    assert_eq!(row.number("b"), None);
    assert_eq!(row.number_or_zero("b"), 0.0);
}

#[test]
fn bad_date_reports_row() {
    let err = parse_date_based_csv("date,a\n01/01/2013,1\n2013-01-02,2\n").unwrap_err();
    match err {
        PipelineError::InvalidDate { row, value } => {
            assert_eq!(row, 2);
            assert_eq!(value, "2013-01-02");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_input_has_no_key_column() {
    assert!(matches!(parse_date_based_csv(""), Err(PipelineError::MissingKeyColumn)));
}

#[test]
fn header_only_input_yields_no_rows() {
    let parsed = parse_date_based_csv("date,a,b\n").unwrap();
    assert_eq!(parsed.key, "date");
    assert!(parsed.records.is_empty());
}

#[test]
fn source_broadcasts_data_key_and_categories() {
    let source = DataSource::from_csv(CSV).unwrap();
    assert_eq!(source.categories(), ["java", "xml", "txt"]);

    let seen: Rc<RefCell<Vec<DataUpdate>>> = Rc::default();
    let sink = Rc::clone(&seen);
    source.on_update(vec![listener(move |u: &DataUpdate| {
        sink.borrow_mut().push(u.clone());
        Ok(())
    })]);
    source.send_update().unwrap();
    source.send_update().unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].key, "date");
    assert_eq!(seen[0].categories, vec!["java", "xml", "txt"]);
    assert_eq!(seen[0].data.len(), 3);
    assert!(seen[0].grouping.is_none());
    assert!(seen[0].extent.is_none());
    assert_eq!(seen[0], seen[1]);
}

#[test]
fn empty_source_has_no_categories() {
    let source = DataSource::new(Vec::<Record>::new(), "date");
    assert!(source.categories().is_empty());
    source.send_update().unwrap();
}
