//! CSV decoding into tagged record types.
//!
//! A record type declares which CSV column feeds each field with
//! `#[derive(CsvRecord)]` and `#[csv(column = "...")]`. The header row is
//! matched against those names; unknown columns are skipped and unmatched
//! fields keep their zero value.

use std::io::Read;
use std::marker::PhantomData;
use std::ops::ControlFlow;

use time::format_description::{self, OwnedFormatItem};
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub use crate::error::{DecodeError, FieldKind};
pub use alphavantage_macros::CsvRecord;

/// Layout used for time fields that do not declare one.
pub const DEFAULT_TIME_LAYOUT: &str = "[year]-[month]-[day]";

/// A type whose values can be decoded from CSV rows.
///
/// Implemented by `#[derive(CsvRecord)]`.
pub trait CsvRecord: Sized {
    fn schema() -> Result<&'static RecordSchema, DecodeError>;

    /// A record with every field at its zero value.
    fn empty() -> Self;

    /// Stores a decoded value into the field at `index` of the schema.
    fn assign(&mut self, index: usize, value: FieldValue);
}

/// A decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Time(OffsetDateTime),
}

/// Field types a record may use.
pub trait CsvValue: Sized {
    const KIND: FieldKind;

    fn zero() -> Self;

    fn from_value(value: FieldValue) -> Option<Self>;
}

impl CsvValue for String {
    const KIND: FieldKind = FieldKind::String;

    fn zero() -> Self {
        String::new()
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::String(value) => Some(value),
            _ => None,
        }
    }
}

impl CsvValue for i64 {
    const KIND: FieldKind = FieldKind::Int;

    fn zero() -> Self {
        0
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Int(value) => Some(value),
            _ => None,
        }
    }
}

impl CsvValue for f64 {
    const KIND: FieldKind = FieldKind::Float;

    fn zero() -> Self {
        0.0
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Float(value) => Some(value),
            _ => None,
        }
    }
}

impl CsvValue for OffsetDateTime {
    const KIND: FieldKind = FieldKind::Time;

    fn zero() -> Self {
        OffsetDateTime::UNIX_EPOCH
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Time(value) => Some(value),
            _ => None,
        }
    }
}

/// Declaration of one tagged field, as emitted by the derive.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    field: &'static str,
    column: &'static str,
    kind: FieldKind,
    layout: Option<&'static str>,
}

impl FieldSpec {
    pub const fn new(
        field: &'static str,
        column: &'static str,
        kind: FieldKind,
        layout: Option<&'static str>,
    ) -> Self {
        Self {
            field,
            column,
            kind,
            layout,
        }
    }
}

#[derive(Debug)]
struct SchemaField {
    column: &'static str,
    kind: FieldKind,
    layout: Option<OwnedFormatItem>,
}

/// Validated field table of a record type, built once per type.
#[derive(Debug)]
pub struct RecordSchema {
    fields: Vec<SchemaField>,
}

impl RecordSchema {
    /// Parses time layouts and rejects columns mapped twice.
    pub fn build(specs: Vec<FieldSpec>) -> Result<Self, DecodeError> {
        let mut fields: Vec<SchemaField> = Vec::with_capacity(specs.len());
        for spec in specs {
            if fields.iter().any(|field| field.column == spec.column) {
                return Err(DecodeError::DuplicateColumn {
                    column: spec.column.to_owned(),
                });
            }
            let layout = match spec.kind {
                FieldKind::Time => {
                    let layout = spec.layout.unwrap_or(DEFAULT_TIME_LAYOUT);
                    let parsed = format_description::parse_owned::<2>(layout).map_err(|e| {
                        DecodeError::InvalidLayout {
                            field: spec.field.to_owned(),
                            layout: layout.to_owned(),
                            message: e.to_string(),
                        }
                    })?;
                    Some(parsed)
                }
                _ => None,
            };
            fields.push(SchemaField {
                column: spec.column,
                kind: spec.kind,
                layout,
            });
        }
        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.column)
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.column == column)
    }
}

/// Eagerly decodes every row of `reader`.
///
/// Stops at the first failure. Times without an explicit offset are read in
/// `offset`, or UTC when `None`.
pub fn collect<T: CsvRecord, R: Read>(
    reader: R,
    offset: Option<UtcOffset>,
) -> Result<Vec<T>, DecodeError> {
    records::<T, R>(reader, offset)?.collect()
}

/// Lazily decodes rows of `reader`.
///
/// A header failure is returned immediately. Row failures go to `on_error`;
/// [`ControlFlow::Continue`] skips the row and [`ControlFlow::Break`] ends
/// the iteration.
pub fn iterate<T, R, F>(
    reader: R,
    offset: Option<UtcOffset>,
    on_error: F,
) -> Result<RecordIter<T, R, F>, DecodeError>
where
    T: CsvRecord,
    R: Read,
    F: FnMut(DecodeError) -> ControlFlow<()>,
{
    Ok(RecordIter {
        records: records(reader, offset)?,
        on_error,
        done: false,
    })
}

/// Iterator of decode results; the building block of [`collect`] and [`iterate`].
pub fn records<T: CsvRecord, R: Read>(
    reader: R,
    offset: Option<UtcOffset>,
) -> Result<Records<T, R>, DecodeError> {
    let schema = T::schema()?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers = reader.headers().map_err(|e| DecodeError::Header {
        message: e.to_string(),
    })?;
    let plan = headers
        .iter()
        .map(|name| schema.position(name.trim()))
        .collect::<Vec<_>>();

    Ok(Records {
        rows: reader.into_records(),
        schema,
        plan,
        offset: offset.unwrap_or(UtcOffset::UTC),
        _marker: PhantomData,
    })
}

pub struct Records<T, R> {
    rows: csv::StringRecordsIntoIter<R>,
    schema: &'static RecordSchema,
    /// Schema field index per CSV column, `None` for skipped columns.
    plan: Vec<Option<usize>>,
    offset: UtcOffset,
    _marker: PhantomData<fn() -> T>,
}

impl<T: CsvRecord, R: Read> Records<T, R> {
    fn decode(&self, row: &csv::StringRecord) -> Result<T, DecodeError> {
        let line = row.position().map_or(0, csv::Position::line);
        let mut record = T::empty();
        for (raw, index) in row.iter().zip(&self.plan) {
            let Some(index) = *index else {
                continue;
            };
            let field = &self.schema.fields[index];
            let value = parse_cell(raw, field, self.offset).map_err(|message| DecodeError::Field {
                line,
                column: field.column.to_owned(),
                value: raw.to_owned(),
                kind: field.kind,
                message,
            })?;
            record.assign(index, value);
        }
        Ok(record)
    }
}

impl<T: CsvRecord, R: Read> Iterator for Records<T, R> {
    type Item = Result<T, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.rows.next()? {
            Ok(row) => row,
            Err(e) => {
                let line = e.position().map_or(0, csv::Position::line);
                return Some(Err(DecodeError::Row {
                    line,
                    message: e.to_string(),
                }));
            }
        };
        Some(self.decode(&row))
    }
}

pub struct RecordIter<T, R, F> {
    records: Records<T, R>,
    on_error: F,
    done: bool,
}

impl<T, R, F> Iterator for RecordIter<T, R, F>
where
    T: CsvRecord,
    R: Read,
    F: FnMut(DecodeError) -> ControlFlow<()>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.done {
            return None;
        }
        loop {
            match self.records.next()? {
                Ok(record) => return Some(record),
                Err(error) => {
                    if (self.on_error)(error).is_break() {
                        self.done = true;
                        return None;
                    }
                }
            }
        }
    }
}

fn parse_cell(raw: &str, field: &SchemaField, offset: UtcOffset) -> Result<FieldValue, String> {
    match field.kind {
        FieldKind::String => Ok(FieldValue::String(raw.to_owned())),
        FieldKind::Int => raw
            .trim()
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|e| e.to_string()),
        FieldKind::Float => raw
            .trim()
            .parse::<f64>()
            .map(FieldValue::Float)
            .map_err(|e| e.to_string()),
        FieldKind::Time => {
            let Some(layout) = &field.layout else {
                return Err(String::from("time field without layout"));
            };
            parse_time(raw.trim(), layout, offset).map(FieldValue::Time)
        }
    }
}

/// Parses a date or date-time and pins it to `offset`.
fn parse_time(raw: &str, layout: &OwnedFormatItem, offset: UtcOffset) -> Result<OffsetDateTime, String> {
    match PrimitiveDateTime::parse(raw, layout) {
        Ok(value) => Ok(value.assume_offset(offset)),
        Err(datetime_error) => Date::parse(raw, layout)
            .map(|date| date.midnight().assume_offset(offset))
            .map_err(|_| datetime_error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[derive(Debug, Clone, PartialEq, CsvRecord)]
    struct Bar {
        #[csv(column = "timestamp")]
        timestamp: OffsetDateTime,
        #[csv(column = "close")]
        close: f64,
        #[csv(column = "volume")]
        volume: i64,
        note: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, CsvRecord)]
    struct Intraday {
        #[csv(column = "time", layout = "[year]-[month]-[day][optional [ [hour]:[minute]]]")]
        time: OffsetDateTime,
        #[csv(column = "SMA")]
        sma: f64,
    }

    #[derive(Debug, CsvRecord)]
    struct BadLayout {
        #[csv(column = "when", layout = "[not-a-component]")]
        when: OffsetDateTime,
    }

    #[derive(Debug, CsvRecord)]
    struct DuplicateColumns {
        #[csv(column = "close")]
        close: f64,
        #[csv(column = "close")]
        again: f64,
    }

    const DAILY: &str = "timestamp,open,close,volume\n2024-01-03,1.5,2.5,100\n2024-01-02,1.0,2.0,200\n";

    #[test]
    fn collect_maps_columns_by_name() {
        let bars = collect::<Bar, _>(DAILY.as_bytes(), None).expect("decode");

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, datetime!(2024-01-03 0:00 UTC));
        assert_eq!(bars[0].close, 2.5);
        assert_eq!(bars[1].volume, 200);
        assert_eq!(bars[1].note, None, "untagged fields keep their default");
    }

    #[test]
    fn missing_columns_leave_zero_values() {
        let bars = collect::<Bar, _>("timestamp\n2024-01-03\n".as_bytes(), None).expect("decode");
        assert_eq!(bars[0].close, 0.0);
        assert_eq!(bars[0].volume, 0);
    }

    #[test]
    fn offset_is_applied_to_naive_times() {
        let bars = collect::<Bar, _>(DAILY.as_bytes(), Some(offset!(-5))).expect("decode");
        assert_eq!(bars[0].timestamp, datetime!(2024-01-03 0:00 -5));
    }

    #[test]
    fn optional_layout_parts_accept_dates_and_datetimes() {
        let rows = collect::<Intraday, _>(
            "time,SMA\n2024-01-02 16:00,181.25\n2024-01-01,180.5\n".as_bytes(),
            None,
        )
        .expect("decode");

        assert_eq!(rows[0].time, datetime!(2024-01-02 16:00 UTC));
        assert_eq!(rows[1].time, datetime!(2024-01-01 0:00 UTC));
    }

    #[test]
    fn bad_cell_reports_line_and_column() {
        let error = collect::<Bar, _>(
            "timestamp,close,volume\n2024-01-03,abc,1\n".as_bytes(),
            None,
        )
        .expect_err("bad float must fail");

        match error {
            DecodeError::Field {
                line,
                column,
                value,
                kind,
                ..
            } => {
                assert_eq!(line, 2);
                assert_eq!(column, "close");
                assert_eq!(value, "abc");
                assert_eq!(kind, FieldKind::Float);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let error = collect::<Bar, _>("timestamp,close\n2024-01-03,1,extra\n".as_bytes(), None)
            .expect_err("row length mismatch must fail");
        assert!(matches!(error, DecodeError::Row { .. }));
    }

    #[test]
    fn iterate_can_skip_bad_rows() {
        let input = "timestamp,close,volume\n2024-01-03,1,1\nbad,row,here\n2024-01-01,3,3\n";
        let mut failures = 0;
        let bars = iterate::<Bar, _, _>(input.as_bytes(), None, |_| {
            failures += 1;
            ControlFlow::Continue(())
        })
        .expect("header")
        .collect::<Vec<_>>();

        assert_eq!(bars.len(), 2);
        assert_eq!(failures, 1);
    }

    #[test]
    fn iterate_can_stop_at_first_bad_row() {
        let input = "timestamp,close,volume\nbad,row,here\n2024-01-01,3,3\n";
        let bars = iterate::<Bar, _, _>(input.as_bytes(), None, |_| ControlFlow::Break(()))
            .expect("header")
            .collect::<Vec<_>>();
        assert!(bars.is_empty());
    }

    #[test]
    fn empty_input_decodes_to_no_records() {
        let bars = collect::<Bar, _>("".as_bytes(), None).expect("empty input");
        assert!(bars.is_empty());
    }

    #[test]
    fn schema_errors_are_reported_on_every_call() {
        for _ in 0..2 {
            let error = collect::<BadLayout, _>("when\n2024\n".as_bytes(), None)
                .expect_err("bad layout must fail");
            assert!(matches!(error, DecodeError::InvalidLayout { .. }));
        }
        let error = collect::<DuplicateColumns, _>("close\n1\n".as_bytes(), None)
            .expect_err("duplicate column must fail");
        assert!(matches!(error, DecodeError::DuplicateColumn { .. }));
    }
}
