//! SQLite reference engine for `colbridge-core`.
//!
//! [`SqliteHandle`] adapts a `rusqlite` connection to the core driver traits and
//! [`SqliteQueryRunner`] wraps it for fixture loading and literal query execution.
//!
//! Engine caveats: SQLite stores NaN as NULL, does not keep `-0.0` in REAL columns, and NUMERIC
//! affinity converts decimal text to REAL. Decimals with more than 15 significant digits belong
//! in TEXT-affinity columns; read back from REAL they fail with `PrecisionOverflow`.

#![forbid(unsafe_code)]

mod config;
mod driver;
mod runner;

pub use crate::config::{SqliteConfig, SqliteLocation, DEFAULT_BUSY_TIMEOUT_MS};
pub use crate::driver::SqliteHandle;
pub use crate::runner::{Result, RunnerError, SqliteQueryRunner};
