// File: crates/chart-pipeline/src/source.rs
// Summary: Date-keyed CSV parsing and the root data source of every chain.

use std::rc::Rc;

use chrono::NaiveDate;
use tracing::debug;

use crate::channel::{Channel, Listener};
use crate::error::{PipelineError, Result};
use crate::record::{Record, Value};
use crate::stage::Stage;
use crate::update::DataUpdate;

/// Text format of the key column.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Rows parsed from csv text, together with the key column name.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedCsv {
    pub key: String,
    pub records: Vec<Record>,
}

/// Parse comma-delimited text whose first column is a `dd/mm/yyyy` date.
/// Remaining cells become numbers where they parse, text otherwise.
pub fn parse_date_based_csv(raw: &str) -> Result<ParsedCsv> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(raw.trim().as_bytes());

    let headers = rdr.headers()?.clone();
    let key = headers
        .get(0)
        .filter(|h| !h.is_empty())
        .ok_or(PipelineError::MissingKeyColumn)?
        .to_string();

    let mut records = Vec::new();
    for (row, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let raw_date = rec.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT)
            .map_err(|_| PipelineError::InvalidDate { row: row + 1, value: raw_date.to_string() })?;
        let mut record = Record::new(date.and_hms_opt(0, 0, 0).unwrap_or_default());
        for (name, cell) in headers.iter().zip(rec.iter()).skip(1) {
            record.set(name, Value::parse(cell));
        }
        records.push(record);
    }
    debug!(key = %key, rows = records.len(), "parsed csv");
    Ok(ParsedCsv { key, records })
}

/// Root stage: broadcasts a fixed record set.
pub struct DataSource {
    data: Rc<[Record]>,
    key: String,
    categories: Vec<String>,
    channel: Channel<DataUpdate>,
}

impl DataSource {
    /// Categories are taken from the first record's fields.
    pub fn new(data: Vec<Record>, key: impl Into<String>) -> Rc<Self> {
        let key = key.into();
        let categories = data
            .first()
            .map(|r| r.field_names().filter(|f| *f != key).map(str::to_string).collect())
            .unwrap_or_default();
        Rc::new(Self { data: Rc::from(data), key, categories, channel: Channel::new() })
    }

    pub fn from_csv(raw: &str) -> Result<Rc<Self>> {
        let parsed = parse_date_based_csv(raw)?;
        Ok(Self::new(parsed.records, parsed.key))
    }

    pub fn key(&self) -> &str { &self.key }

    pub fn categories(&self) -> &[String] { &self.categories }
}

impl Stage for DataSource {
    type Output = DataUpdate;

    fn on_update(&self, listeners: Vec<Listener<DataUpdate>>) { self.channel.subscribe(listeners); }

    fn send_update(&self) -> Result<()> {
        let update = DataUpdate::new(Rc::clone(&self.data), self.key.clone(), self.categories.clone());
        self.channel.emit(&update)
    }
}
