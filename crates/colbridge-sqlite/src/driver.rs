//! [`Handle`] implementation over an owned `rusqlite::Connection`.
//!
//! SQLite has no native temporal, decimal or array storage. Those values are bound as TEXT
//! (wire formats from [`colbridge_core::temporal`], decimal literals and JSON arrays) and come
//! back through the coercions of [`colbridge_core::ValueRow`]. Timestamps are stored as UTC
//! wall clock text.

use crate::config::{SqliteConfig, SqliteLocation};
use colbridge_core::temporal;
use colbridge_core::{
    BufferedResultSet, DriverError, DriverResult, DriverValue, Handle, HostZone, PreparedBatch,
    ResultSet,
};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::time::Duration;

fn backend(err: rusqlite::Error) -> DriverError {
    DriverError::backend(err)
}

#[derive(Debug)]
pub struct SqliteHandle {
    conn: Connection,
    zone: HostZone,
}

impl SqliteHandle {
    pub fn open(config: &SqliteConfig) -> rusqlite::Result<Self> {
        let conn = match &config.location {
            SqliteLocation::Memory => Connection::open_in_memory()?,
            SqliteLocation::Path { path } => Connection::open(path)?,
            SqliteLocation::Uri { uri } => {
                let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI;
                Connection::open_with_flags(uri, flags)?
            }
        };
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        Ok(Self::from_connection(conn, config.host_zone))
    }

    pub fn from_connection(conn: Connection, zone: HostZone) -> Self {
        Self { conn, zone }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Close the connection, surfacing any error SQLite reports.
    pub fn close(self) -> rusqlite::Result<()> {
        self.conn.close().map_err(|(_, err)| err)
    }
}

impl Handle for SqliteHandle {
    fn host_zone(&self) -> HostZone {
        self.zone
    }

    fn execute(&mut self, sql: &str) -> DriverResult<()> {
        self.conn.execute_batch(sql).map_err(backend)
    }

    fn prepare_batch(&mut self, sql: &str) -> DriverResult<Box<dyn PreparedBatch + '_>> {
        let parameters = self.conn.prepare_cached(sql).map_err(backend)?.parameter_count();
        Ok(Box::new(SqliteBatch {
            conn: &self.conn,
            sql: sql.to_string(),
            zone: self.zone,
            bound: vec![None; parameters],
            queued: Vec::new(),
        }))
    }

    fn query(&mut self, sql: &str) -> DriverResult<Box<dyn ResultSet + '_>> {
        let mut statement = self.conn.prepare(sql).map_err(backend)?;
        let column_count = statement.column_count();
        let mut rows = statement.query([]).map_err(backend)?;

        let mut buffered = Vec::new();
        while let Some(row) = rows.next().map_err(backend)? {
            let values = (0..column_count)
                .map(|i| row.get_ref(i).map(from_sqlite))
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(backend)?;
            buffered.push(values);
        }
        log::debug!("sqlite query returned {} rows", buffered.len());
        Ok(Box::new(BufferedResultSet::new(column_count, buffered, self.zone)))
    }
}

fn from_sqlite(value: ValueRef<'_>) -> DriverValue {
    match value {
        ValueRef::Null => DriverValue::Null,
        ValueRef::Integer(v) => DriverValue::Long(v),
        ValueRef::Real(v) => DriverValue::Double(v),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => DriverValue::String(text.to_string()),
            Err(_) => DriverValue::Bytes(bytes.to_vec()),
        },
        ValueRef::Blob(bytes) => DriverValue::Bytes(bytes.to_vec()),
    }
}

fn to_sqlite(column: usize, value: DriverValue, zone: HostZone) -> DriverResult<Value> {
    let text = |rendered: Option<String>, expected: &'static str, value: &DriverValue| {
        rendered
            .map(Value::Text)
            .ok_or_else(|| DriverError::conversion(column, expected, value))
    };
    Ok(match value {
        DriverValue::Null => Value::Null,
        DriverValue::Boolean(v) => Value::Integer(i64::from(v)),
        DriverValue::Long(v) => Value::Integer(v),
        DriverValue::Float(v) => Value::Real(f64::from(v)),
        DriverValue::Double(v) => Value::Real(v),
        DriverValue::Decimal(v) => Value::Text(v.to_string()),
        DriverValue::String(v) => Value::Text(v),
        DriverValue::Bytes(v) => Value::Blob(v),
        DriverValue::Date(v) => text(temporal::format_date_text(v, zone), "date", &value)?,
        DriverValue::Time(v) => text(temporal::format_time_text(v), "time", &value)?,
        DriverValue::Timestamp(v) => {
            text(temporal::format_timestamp_text(v), "timestamp", &value)?
        }
        DriverValue::Array(_) => Value::Text(value.to_json(zone).to_string()),
    })
}

/// Queues parameter rows and runs them in one transaction per execute.
struct SqliteBatch<'c> {
    conn: &'c Connection,
    sql: String,
    zone: HostZone,
    bound: Vec<Option<Value>>,
    queued: Vec<Vec<Value>>,
}

impl PreparedBatch for SqliteBatch<'_> {
    fn host_zone(&self) -> HostZone {
        self.zone
    }

    fn bind(&mut self, column: usize, value: DriverValue) -> DriverResult<()> {
        let count = self.bound.len();
        if column >= count {
            return Err(DriverError::ParameterOutOfRange { column, count });
        }
        self.bound[column] = Some(to_sqlite(column, value, self.zone)?);
        Ok(())
    }

    fn add(&mut self) -> DriverResult<()> {
        let row = self
            .bound
            .iter_mut()
            .enumerate()
            .map(|(column, slot)| slot.take().ok_or(DriverError::UnboundParameter { column }))
            .collect::<DriverResult<Vec<_>>>()?;
        self.queued.push(row);
        Ok(())
    }

    fn size(&self) -> usize {
        self.queued.len()
    }

    fn execute(&mut self) -> DriverResult<usize> {
        let tx = self.conn.unchecked_transaction().map_err(backend)?;
        {
            let mut statement = tx.prepare_cached(&self.sql).map_err(backend)?;
            for row in &self.queued {
                statement.execute(params_from_iter(row.iter())).map_err(backend)?;
            }
        }
        tx.commit().map_err(backend)?;

        let executed = self.queued.len();
        self.queued.clear();
        Ok(executed)
    }
}
