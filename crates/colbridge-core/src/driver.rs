//! Driver collaborator interface.
//!
//! The traits mirror what a JDBC-style driver offers: a result cursor with per-column typed
//! extraction followed by a separate "was the last value null" query, a prepared statement that
//! queues parameter rows and executes them as a batch, and a handle that runs literal SQL.
//!
//! Typed getters return the type's default (`0`, `false`, empty) for SQL `NULL`; callers must
//! consult [`ResultCursor::was_null`] after every extraction.

use crate::decimal::SqlDecimal;
use crate::temporal::{self, HostZone};
use serde_json::Value as JsonValue;
use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("column {column} out of range ({count} columns)")]
    ColumnOutOfRange { column: usize, count: usize },

    #[error("cannot read {found} as {expected} (column {column})")]
    Conversion {
        column: usize,
        expected: &'static str,
        found: String,
    },

    #[error("parameter {column} is not bound")]
    UnboundParameter { column: usize },

    #[error("parameter {column} out of range ({count} parameters)")]
    ParameterOutOfRange { column: usize, count: usize },

    #[error("{0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),
}

impl DriverError {
    pub fn backend(err: impl StdError + Send + Sync + 'static) -> Self {
        DriverError::Backend(Box::new(err))
    }

    pub fn conversion(column: usize, expected: &'static str, found: &DriverValue) -> Self {
        DriverError::Conversion {
            column,
            expected,
            found: format!("{found:?}"),
        }
    }
}

pub type DriverResult<T> = Result<T, DriverError>;

/// A driver-level value, used both for bound parameters and for buffered result cells.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverValue {
    Null,
    Boolean(bool),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(SqlDecimal),
    String(String),
    Bytes(Vec<u8>),
    /// Instant (epoch millis) of local midnight in the session zone.
    Date(i64),
    /// Time of day as millis on the UTC epoch day.
    Time(i64),
    /// Epoch millis.
    Timestamp(i64),
    Array(Vec<DriverValue>),
}

impl DriverValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DriverValue::Null)
    }

    /// JSON form used by engines that store arrays as text.
    pub fn to_json(&self, zone: HostZone) -> JsonValue {
        match self {
            DriverValue::Null => JsonValue::Null,
            DriverValue::Boolean(v) => JsonValue::Bool(*v),
            DriverValue::Long(v) => JsonValue::from(*v),
            DriverValue::Float(v) => float_json(f64::from(*v)),
            DriverValue::Double(v) => float_json(*v),
            DriverValue::Decimal(v) => JsonValue::String(v.to_string()),
            DriverValue::String(v) => JsonValue::String(v.clone()),
            DriverValue::Bytes(v) => {
                JsonValue::Array(v.iter().map(|b| JsonValue::from(*b)).collect())
            }
            DriverValue::Date(v) => text_json(temporal::format_date_text(*v, zone)),
            DriverValue::Time(v) => text_json(temporal::format_time_text(*v)),
            DriverValue::Timestamp(v) => text_json(temporal::format_timestamp_text(*v)),
            DriverValue::Array(items) => {
                JsonValue::Array(items.iter().map(|item| item.to_json(zone)).collect())
            }
        }
    }

    pub fn from_json(value: &JsonValue) -> DriverValue {
        match value {
            JsonValue::Null => DriverValue::Null,
            JsonValue::Bool(v) => DriverValue::Boolean(*v),
            JsonValue::Number(n) => match n.as_i64() {
                Some(v) => DriverValue::Long(v),
                None => DriverValue::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(v) => DriverValue::String(v.clone()),
            JsonValue::Array(items) => {
                DriverValue::Array(items.iter().map(DriverValue::from_json).collect())
            }
            JsonValue::Object(_) => DriverValue::String(value.to_string()),
        }
    }
}

fn float_json(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

fn text_json(value: Option<String>) -> JsonValue {
    value.map(JsonValue::String).unwrap_or(JsonValue::Null)
}

/// Positioned result row with typed extraction. Column indexes are 0-based.
pub trait ResultCursor {
    fn column_count(&self) -> usize;
    /// Session zone used by the driver for date/timestamp values.
    fn host_zone(&self) -> HostZone;

    fn get_boolean(&mut self, column: usize) -> DriverResult<bool>;
    fn get_byte(&mut self, column: usize) -> DriverResult<i8>;
    fn get_short(&mut self, column: usize) -> DriverResult<i16>;
    fn get_int(&mut self, column: usize) -> DriverResult<i32>;
    fn get_long(&mut self, column: usize) -> DriverResult<i64>;
    fn get_float(&mut self, column: usize) -> DriverResult<f32>;
    fn get_double(&mut self, column: usize) -> DriverResult<f64>;
    fn get_decimal(&mut self, column: usize) -> DriverResult<SqlDecimal>;
    fn get_string(&mut self, column: usize) -> DriverResult<String>;
    fn get_bytes(&mut self, column: usize) -> DriverResult<Vec<u8>>;
    /// Instant of local midnight in [`ResultCursor::host_zone`].
    fn get_date(&mut self, column: usize) -> DriverResult<i64>;
    fn get_time(&mut self, column: usize) -> DriverResult<i64>;
    fn get_timestamp(&mut self, column: usize) -> DriverResult<i64>;
    fn get_array(&mut self, column: usize) -> DriverResult<Vec<DriverValue>>;
    fn get_object(&mut self, column: usize) -> DriverResult<DriverValue>;

    /// Whether the value read by the most recent getter was SQL `NULL`.
    fn was_null(&self) -> bool;
}

pub trait ResultSet {
    fn column_count(&self) -> usize;
    /// Advance to the next row; the returned cursor is positioned on it.
    fn next_row(&mut self) -> DriverResult<Option<&mut dyn ResultCursor>>;
}

pub trait PreparedBatch {
    fn host_zone(&self) -> HostZone;
    fn bind(&mut self, column: usize, value: DriverValue) -> DriverResult<()>;
    /// Queue the currently bound parameters as one row.
    fn add(&mut self) -> DriverResult<()>;
    /// Number of queued rows.
    fn size(&self) -> usize;
    /// Execute all queued rows and clear the queue; returns the number of rows executed.
    fn execute(&mut self) -> DriverResult<usize>;
}

/// One open connection. Not safe for concurrent use.
pub trait Handle {
    fn host_zone(&self) -> HostZone;
    /// Run statements that produce no rows (DDL, pragmas).
    fn execute(&mut self, sql: &str) -> DriverResult<()>;
    fn prepare_batch(&mut self, sql: &str) -> DriverResult<Box<dyn PreparedBatch + '_>>;
    /// Run literal SQL text without parameter binding or templating of any kind.
    fn query(&mut self, sql: &str) -> DriverResult<Box<dyn ResultSet + '_>>;
}

/// A [`ResultCursor`] over already fetched values, with JDBC-like coercions.
#[derive(Debug, Clone)]
pub struct ValueRow {
    values: Vec<DriverValue>,
    zone: HostZone,
    was_null: bool,
}

impl ValueRow {
    pub fn new(values: Vec<DriverValue>, zone: HostZone) -> Self {
        Self {
            values,
            zone,
            was_null: false,
        }
    }

    pub fn values(&self) -> &[DriverValue] {
        &self.values
    }

    fn value(&mut self, column: usize) -> DriverResult<&DriverValue> {
        let count = self.values.len();
        let value = self
            .values
            .get(column)
            .ok_or(DriverError::ColumnOutOfRange { column, count })?;
        self.was_null = value.is_null();
        Ok(value)
    }
}

impl ResultCursor for ValueRow {
    fn column_count(&self) -> usize {
        self.values.len()
    }

    fn host_zone(&self) -> HostZone {
        self.zone
    }

    fn get_boolean(&mut self, column: usize) -> DriverResult<bool> {
        to_boolean(column, self.value(column)?)
    }

    fn get_byte(&mut self, column: usize) -> DriverResult<i8> {
        let value = self.value(column)?;
        i8::try_from(to_long(column, value)?)
            .map_err(|_| DriverError::conversion(column, "tinyint", value))
    }

    fn get_short(&mut self, column: usize) -> DriverResult<i16> {
        let value = self.value(column)?;
        i16::try_from(to_long(column, value)?)
            .map_err(|_| DriverError::conversion(column, "smallint", value))
    }

    fn get_int(&mut self, column: usize) -> DriverResult<i32> {
        let value = self.value(column)?;
        i32::try_from(to_long(column, value)?)
            .map_err(|_| DriverError::conversion(column, "integer", value))
    }

    fn get_long(&mut self, column: usize) -> DriverResult<i64> {
        to_long(column, self.value(column)?)
    }

    fn get_float(&mut self, column: usize) -> DriverResult<f32> {
        to_float(column, self.value(column)?)
    }

    fn get_double(&mut self, column: usize) -> DriverResult<f64> {
        to_double(column, self.value(column)?)
    }

    fn get_decimal(&mut self, column: usize) -> DriverResult<SqlDecimal> {
        to_decimal(column, self.value(column)?)
    }

    fn get_string(&mut self, column: usize) -> DriverResult<String> {
        let zone = self.zone;
        to_text(column, self.value(column)?, zone)
    }

    fn get_bytes(&mut self, column: usize) -> DriverResult<Vec<u8>> {
        to_bytes(column, self.value(column)?)
    }

    fn get_date(&mut self, column: usize) -> DriverResult<i64> {
        let zone = self.zone;
        to_date(column, self.value(column)?, zone)
    }

    fn get_time(&mut self, column: usize) -> DriverResult<i64> {
        to_time(column, self.value(column)?)
    }

    fn get_timestamp(&mut self, column: usize) -> DriverResult<i64> {
        to_timestamp(column, self.value(column)?)
    }

    fn get_array(&mut self, column: usize) -> DriverResult<Vec<DriverValue>> {
        to_array(column, self.value(column)?)
    }

    fn get_object(&mut self, column: usize) -> DriverResult<DriverValue> {
        self.value(column).cloned()
    }

    fn was_null(&self) -> bool {
        self.was_null
    }
}

fn to_boolean(column: usize, value: &DriverValue) -> DriverResult<bool> {
    match value {
        DriverValue::Null => Ok(false),
        DriverValue::Boolean(v) => Ok(*v),
        DriverValue::Long(v) => Ok(*v != 0),
        DriverValue::Double(v) => Ok(*v != 0.0),
        DriverValue::Decimal(v) => Ok(v.unscaled() != 0),
        DriverValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(true),
            "false" | "f" | "0" => Ok(false),
            _ => Err(DriverError::conversion(column, "boolean", value)),
        },
        _ => Err(DriverError::conversion(column, "boolean", value)),
    }
}

fn to_long(column: usize, value: &DriverValue) -> DriverResult<i64> {
    let err = || DriverError::conversion(column, "bigint", value);
    match value {
        DriverValue::Null => Ok(0),
        DriverValue::Boolean(v) => Ok(i64::from(*v)),
        DriverValue::Long(v) => Ok(*v),
        DriverValue::Float(v) => integral_f64(f64::from(*v)).ok_or_else(err),
        DriverValue::Double(v) => integral_f64(*v).ok_or_else(err),
        DriverValue::Decimal(v) => integral_decimal(*v).ok_or_else(err),
        DriverValue::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<SqlDecimal>().ok().and_then(integral_decimal))
                .ok_or_else(err)
        }
        _ => Err(err()),
    }
}

fn integral_f64(value: f64) -> Option<i64> {
    // i64::MAX is not representable as f64; the bound is exclusive.
    let in_range = value >= -9_223_372_036_854_775_808.0 && value < 9_223_372_036_854_775_808.0;
    (value.fract() == 0.0 && in_range).then_some(value as i64)
}

fn integral_decimal(value: SqlDecimal) -> Option<i64> {
    i64::try_from(value.rescale_exact(0)?.unscaled()).ok()
}

fn to_double(column: usize, value: &DriverValue) -> DriverResult<f64> {
    match value {
        DriverValue::Null => Ok(0.0),
        DriverValue::Boolean(v) => Ok(if *v { 1.0 } else { 0.0 }),
        DriverValue::Long(v) => Ok(*v as f64),
        DriverValue::Float(v) => Ok(f64::from(*v)),
        DriverValue::Double(v) => Ok(*v),
        DriverValue::Decimal(v) => Ok(v.to_f64()),
        DriverValue::String(s) => s
            .trim()
            .parse()
            .map_err(|_| DriverError::conversion(column, "double", value)),
        _ => Err(DriverError::conversion(column, "double", value)),
    }
}

fn to_float(column: usize, value: &DriverValue) -> DriverResult<f32> {
    match value {
        DriverValue::Float(v) => Ok(*v),
        DriverValue::String(s) => s
            .trim()
            .parse()
            .map_err(|_| DriverError::conversion(column, "real", value)),
        other => to_double(column, other).map(|v| v as f32),
    }
}

fn to_decimal(column: usize, value: &DriverValue) -> DriverResult<SqlDecimal> {
    let err = || DriverError::conversion(column, "decimal", value);
    match value {
        DriverValue::Null => Ok(SqlDecimal::new(0, 0)),
        DriverValue::Boolean(v) => Ok(SqlDecimal::new(i128::from(*v), 0)),
        DriverValue::Long(v) => Ok(SqlDecimal::new(i128::from(*v), 0)),
        // Shortest round-trip rendering keeps the digits the engine intended.
        DriverValue::Float(v) if v.is_finite() => v.to_string().parse().map_err(|_| err()),
        DriverValue::Double(v) if v.is_finite() => v.to_string().parse().map_err(|_| err()),
        DriverValue::Decimal(v) => Ok(*v),
        DriverValue::String(s) => s.parse().map_err(|_| err()),
        _ => Err(err()),
    }
}

fn to_text(column: usize, value: &DriverValue, zone: HostZone) -> DriverResult<String> {
    let err = || DriverError::conversion(column, "varchar", value);
    match value {
        DriverValue::Null => Ok(String::new()),
        DriverValue::Boolean(v) => Ok(v.to_string()),
        DriverValue::Long(v) => Ok(v.to_string()),
        DriverValue::Float(v) => Ok(v.to_string()),
        DriverValue::Double(v) => Ok(v.to_string()),
        DriverValue::Decimal(v) => Ok(v.to_string()),
        DriverValue::String(v) => Ok(v.clone()),
        DriverValue::Bytes(v) => String::from_utf8(v.clone()).map_err(|_| err()),
        DriverValue::Date(v) => temporal::format_date_text(*v, zone).ok_or_else(err),
        DriverValue::Time(v) => temporal::format_time_text(*v).ok_or_else(err),
        DriverValue::Timestamp(v) => temporal::format_timestamp_text(*v).ok_or_else(err),
        DriverValue::Array(_) => Ok(value.to_json(zone).to_string()),
    }
}

fn to_bytes(column: usize, value: &DriverValue) -> DriverResult<Vec<u8>> {
    match value {
        DriverValue::Null => Ok(Vec::new()),
        DriverValue::Bytes(v) => Ok(v.clone()),
        DriverValue::String(v) => Ok(v.clone().into_bytes()),
        DriverValue::Array(items) => items
            .iter()
            .map(|item| match item {
                DriverValue::Long(b) => u8::try_from(*b).ok(),
                _ => None,
            })
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(|| DriverError::conversion(column, "varbinary", value)),
        _ => Err(DriverError::conversion(column, "varbinary", value)),
    }
}

fn to_date(column: usize, value: &DriverValue, zone: HostZone) -> DriverResult<i64> {
    let err = || DriverError::conversion(column, "date", value);
    match value {
        DriverValue::Null => Ok(0),
        DriverValue::Date(v) => Ok(*v),
        DriverValue::Timestamp(v) => {
            // Truncate to local midnight of the same local day.
            let local = zone.instant_to_local(*v).ok_or_else(err)?;
            let midnight = local.date().and_hms_opt(0, 0, 0).ok_or_else(err)?;
            Ok(zone.local_to_instant_millis(&midnight))
        }
        DriverValue::String(s) => temporal::parse_date_text(s, zone).ok_or_else(err),
        _ => Err(err()),
    }
}

fn to_time(column: usize, value: &DriverValue) -> DriverResult<i64> {
    match value {
        DriverValue::Null => Ok(0),
        DriverValue::Time(v) => Ok(*v),
        DriverValue::String(s) => temporal::parse_time_text(s)
            .ok_or_else(|| DriverError::conversion(column, "time", value)),
        _ => Err(DriverError::conversion(column, "time", value)),
    }
}

fn to_timestamp(column: usize, value: &DriverValue) -> DriverResult<i64> {
    match value {
        DriverValue::Null => Ok(0),
        DriverValue::Timestamp(v) | DriverValue::Date(v) => Ok(*v),
        DriverValue::String(s) => temporal::parse_timestamp_text(s)
            .ok_or_else(|| DriverError::conversion(column, "timestamp", value)),
        _ => Err(DriverError::conversion(column, "timestamp", value)),
    }
}

fn to_array(column: usize, value: &DriverValue) -> DriverResult<Vec<DriverValue>> {
    match value {
        DriverValue::Null => Ok(Vec::new()),
        DriverValue::Array(items) => Ok(items.clone()),
        DriverValue::String(s) => match serde_json::from_str::<JsonValue>(s) {
            Ok(JsonValue::Array(items)) => Ok(items.iter().map(DriverValue::from_json).collect()),
            _ => Err(DriverError::conversion(column, "array", value)),
        },
        _ => Err(DriverError::conversion(column, "array", value)),
    }
}

/// Fully fetched result rows exposed through [`ResultSet`].
#[derive(Debug)]
pub struct BufferedResultSet {
    column_count: usize,
    rows: std::vec::IntoIter<Vec<DriverValue>>,
    current: Option<ValueRow>,
    zone: HostZone,
}

impl BufferedResultSet {
    pub fn new(column_count: usize, rows: Vec<Vec<DriverValue>>, zone: HostZone) -> Self {
        Self {
            column_count,
            rows: rows.into_iter(),
            current: None,
            zone,
        }
    }
}

impl ResultSet for BufferedResultSet {
    fn column_count(&self) -> usize {
        self.column_count
    }

    fn next_row(&mut self) -> DriverResult<Option<&mut dyn ResultCursor>> {
        self.current = self.rows.next().map(|values| ValueRow::new(values, self.zone));
        Ok(self.current.as_mut().map(|row| row as &mut dyn ResultCursor))
    }
}
