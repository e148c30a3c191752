//! Typed decode of the `YearlyReport` cell carried by every output row.
//!
//! The upstream writes a JSON table: a header row followed by value rows,
//!   [["Year","DB Top-Ups","MB Top-Ups"],[2025,-1.5,0.0],...]
//! An array of objects keyed by the same names is accepted too.
//! Column names are matched case-insensitively, in any order.
//! Extra columns are ignored.

use crate::types::Year;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;

pub const YEAR_COLUMN: &str = "Year";
pub const DB_TOPUP_COLUMN: &str = "DB Top-Ups";
pub const MB_TOPUP_COLUMN: &str = "MB Top-Ups";

/// One simulated year of one permutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearlyEntry {
    pub year: Year,
    pub db_topup: f64,
    pub mb_topup: f64,
}

impl YearlyEntry {
    pub fn combined(&self) -> f64 {
        self.db_topup + self.mb_topup
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("payload must be a JSON array of rows, got {0}")]
    NotAnArray(&'static str),

    #[error("header row must be an array of column names")]
    BadHeader,

    #[error("missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row} has {found} values, expected at least {expected}")]
    ShortRow { row: usize, found: usize, expected: usize },

    #[error("row {row}: '{column}' is not numeric ({value})")]
    NotNumeric { row: usize, column: &'static str, value: String },

    #[error("row {row}: year {value} is not an integer")]
    NonIntegralYear { row: usize, value: f64 },

    #[error("row {row} is neither an array nor an object")]
    BadRow { row: usize },

    #[error("report contains no yearly rows")]
    Empty,

    #[error("year {0} appears more than once")]
    DuplicateYear(Year),
}

fn same_column(name: &str, wanted: &str) -> bool {
    name.trim().eq_ignore_ascii_case(wanted)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null      => "null",
        Value::Bool(_)   => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_)  => "an array",
        Value::Object(_) => "an object",
    }
}

fn numeric(value: &Value, row: usize, column: &'static str) -> Result<f64, DecodeError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| DecodeError::NotNumeric {
        row,
        column,
        value: value.to_string(),
    })
}

fn year(value: &Value, row: usize) -> Result<Year, DecodeError> {
    let raw = numeric(value, row, YEAR_COLUMN)?;
    if raw.fract() != 0.0 || raw < Year::MIN as f64 || raw > Year::MAX as f64 {
        return Err(DecodeError::NonIntegralYear { row, value: raw });
    }
    Ok(raw as Year)
}

/// Column positions resolved from a header row.
struct Columns {
    year: usize,
    db: usize,
    mb: usize,
}

impl Columns {
    fn resolve(header: &[Value]) -> Result<Self, DecodeError> {
        let names = header
            .iter()
            .map(|v| v.as_str().ok_or(DecodeError::BadHeader))
            .collect::<Result<Vec<_>, _>>()?;
        let find = |wanted: &'static str| {
            names
                .iter()
                .position(|name| same_column(name, wanted))
                .ok_or(DecodeError::MissingColumn(wanted))
        };
        Ok(Self {
            year: find(YEAR_COLUMN)?,
            db: find(DB_TOPUP_COLUMN)?,
            mb: find(MB_TOPUP_COLUMN)?,
        })
    }

    fn width(&self) -> usize {
        self.year.max(self.db).max(self.mb) + 1
    }
}

fn table_row(values: &[Value], columns: &Columns, row: usize) -> Result<YearlyEntry, DecodeError> {
    if values.len() < columns.width() {
        return Err(DecodeError::ShortRow {
            row,
            found: values.len(),
            expected: columns.width(),
        });
    }
    Ok(YearlyEntry {
        year: year(&values[columns.year], row)?,
        db_topup: numeric(&values[columns.db], row, DB_TOPUP_COLUMN)?,
        mb_topup: numeric(&values[columns.mb], row, MB_TOPUP_COLUMN)?,
    })
}

fn object_row(map: &serde_json::Map<String, Value>, row: usize) -> Result<YearlyEntry, DecodeError> {
    let field = |wanted: &'static str| {
        map.iter()
            .find(|(key, _)| same_column(key, wanted))
            .map(|(_, v)| v)
            .ok_or(DecodeError::MissingColumn(wanted))
    };
    Ok(YearlyEntry {
        year: year(field(YEAR_COLUMN)?, row)?,
        db_topup: numeric(field(DB_TOPUP_COLUMN)?, row, DB_TOPUP_COLUMN)?,
        mb_topup: numeric(field(MB_TOPUP_COLUMN)?, row, MB_TOPUP_COLUMN)?,
    })
}

/// Decode one `YearlyReport` cell into chronologically ordered entries.
///
/// The result is never empty and never repeats a year.
pub fn decode_yearly_report(text: &str) -> Result<Vec<YearlyEntry>, DecodeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    let rows = match value {
        Value::Array(rows) => rows,
        other => return Err(DecodeError::NotAnArray(json_kind(&other))),
    };

    let entries = match rows.first() {
        None => return Err(DecodeError::Empty),
        Some(Value::Array(header)) => {
            let columns = Columns::resolve(header)?;
            rows[1..]
                .iter()
                .enumerate()
                .map(|(idx, row)| match row {
                    Value::Array(values) => table_row(values, &columns, idx + 1),
                    _ => Err(DecodeError::BadRow { row: idx + 1 }),
                })
                .collect::<Result<Vec<_>, _>>()?
        }
        Some(Value::Object(_)) => rows
            .iter()
            .enumerate()
            .map(|(idx, row)| match row {
                Value::Object(map) => object_row(map, idx),
                _ => Err(DecodeError::BadRow { row: idx }),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(DecodeError::BadRow { row: 0 }),
    };

    if entries.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut seen = BTreeSet::new();
    for entry in &entries {
        if !seen.insert(entry.year) {
            return Err(DecodeError::DuplicateYear(entry.year));
        }
    }

    let mut entries = entries;
    entries.sort_by_key(|e| e.year);
    Ok(entries)
}
