#![allow(dead_code)]

use colbridge_core::{
    BufferedResultSet, DriverError, DriverResult, DriverValue, Handle, HostZone, PreparedBatch,
    ResultSet,
};

/// In-memory driver that records every statement it sees.
///
/// Inserted rows are kept in order; queries return them (or `canned` when set) so loads can be
/// read back without a real engine.
#[derive(Debug, Default)]
pub struct RecordingHandle {
    pub zone: HostZone,
    pub executed: Vec<String>,
    pub prepared: Vec<String>,
    pub queries: Vec<String>,
    /// Row count of every batch execute.
    pub executes: Vec<usize>,
    pub rows: Vec<Vec<DriverValue>>,
    pub width: usize,
    pub canned: Option<(usize, Vec<Vec<DriverValue>>)>,
}

impl RecordingHandle {
    pub fn new(zone: HostZone) -> Self {
        Self {
            zone,
            ..Self::default()
        }
    }

    pub fn with_result(zone: HostZone, width: usize, rows: Vec<Vec<DriverValue>>) -> Self {
        Self {
            zone,
            canned: Some((width, rows)),
            ..Self::default()
        }
    }
}

impl Handle for RecordingHandle {
    fn host_zone(&self) -> HostZone {
        self.zone
    }

    fn execute(&mut self, sql: &str) -> DriverResult<()> {
        self.executed.push(sql.to_string());
        Ok(())
    }

    fn prepare_batch(&mut self, sql: &str) -> DriverResult<Box<dyn PreparedBatch + '_>> {
        let parameters = sql.matches('?').count();
        self.prepared.push(sql.to_string());
        self.width = parameters;
        Ok(Box::new(RecordingBatch {
            handle: self,
            bound: vec![None; parameters],
            queued: Vec::new(),
        }))
    }

    fn query(&mut self, sql: &str) -> DriverResult<Box<dyn ResultSet + '_>> {
        self.queries.push(sql.to_string());
        let (width, rows) = match &self.canned {
            Some((width, rows)) => (*width, rows.clone()),
            None => (self.width, self.rows.clone()),
        };
        Ok(Box::new(BufferedResultSet::new(width, rows, self.zone)))
    }
}

struct RecordingBatch<'a> {
    handle: &'a mut RecordingHandle,
    bound: Vec<Option<DriverValue>>,
    queued: Vec<Vec<DriverValue>>,
}

impl PreparedBatch for RecordingBatch<'_> {
    fn host_zone(&self) -> HostZone {
        self.handle.zone
    }

    fn bind(&mut self, column: usize, value: DriverValue) -> DriverResult<()> {
        let count = self.bound.len();
        let slot = self
            .bound
            .get_mut(column)
            .ok_or(DriverError::ParameterOutOfRange { column, count })?;
        *slot = Some(value);
        Ok(())
    }

    fn add(&mut self) -> DriverResult<()> {
        let mut row = Vec::with_capacity(self.bound.len());
        for (column, slot) in self.bound.iter_mut().enumerate() {
            row.push(slot.take().ok_or(DriverError::UnboundParameter { column })?);
        }
        self.queued.push(row);
        Ok(())
    }

    fn size(&self) -> usize {
        self.queued.len()
    }

    fn execute(&mut self) -> DriverResult<usize> {
        let count = self.queued.len();
        self.handle.executes.push(count);
        self.handle.rows.append(&mut self.queued);
        Ok(count)
    }
}
