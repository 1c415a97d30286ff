use crate::config::SqliteConfig;
use crate::driver::SqliteHandle;
use colbridge_core::{
    load_table, run_query, BridgeError, DriverError, Handle, HostZone, LoadOptions, LoadSummary,
    MaterializedResult, RecordCursor, SemanticType, TableMetadata,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

pub type Result<T> = std::result::Result<T, RunnerError>;

/// Loads fixture tables into SQLite and runs literal SQL against them.
///
/// The runner owns a single connection; dropping it releases the connection, and
/// [`SqliteQueryRunner::close`] does the same while reporting close errors.
#[derive(Debug)]
pub struct SqliteQueryRunner {
    handle: SqliteHandle,
    load: LoadOptions,
}

impl SqliteQueryRunner {
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let handle = SqliteHandle::open(config)?;
        log::debug!(
            "opened sqlite runner ({:?}, zone {})",
            config.location,
            config.host_zone
        );
        Ok(Self {
            handle,
            load: config.load,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(&SqliteConfig::default())
    }

    pub fn host_zone(&self) -> HostZone {
        self.handle.host_zone()
    }

    /// Run schema statements; several may be separated by `;`.
    pub fn execute_ddl(&mut self, sql: &str) -> Result<()> {
        self.handle.execute(sql)?;
        Ok(())
    }

    pub fn load_table(
        &mut self,
        table: &TableMetadata,
        source: &mut dyn RecordCursor,
    ) -> Result<LoadSummary> {
        Ok(load_table(&mut self.handle, table, source, &self.load)?)
    }

    pub fn execute(
        &mut self,
        sql: &str,
        expected_types: &[SemanticType],
    ) -> Result<MaterializedResult> {
        Ok(run_query(&mut self.handle, sql, expected_types)?)
    }

    pub fn handle_mut(&mut self) -> &mut SqliteHandle {
        &mut self.handle
    }

    pub fn close(self) -> Result<()> {
        self.handle.close()?;
        Ok(())
    }
}
