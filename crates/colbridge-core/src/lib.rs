//! Type-directed codecs between an internal columnar encoding and relational drivers.
//!
//! This crate focuses on:
//! - A closed catalog of semantic SQL types and their fixed internal encodings.
//! - Read mappings that decode driver cursor values (honoring null, timezone and precision rules).
//! - Write mappings plus a batch load pipeline for bulk-loading fixture tables.
//! - Materialization of decoded values into canonical, directly comparable forms.
//!
//! The database itself is reached through the small driver traits in [`driver`]; concrete
//! engines live in sibling crates.

#![forbid(unsafe_code)]

pub mod decimal;
pub mod driver;
mod error;
pub mod load;
pub mod materialize;
pub mod query;
pub mod read;
pub mod record;
pub mod temporal;
pub mod types;
mod value;
pub mod write;

pub use crate::decimal::{DecimalRounding, SqlDecimal};
pub use crate::driver::{
    BufferedResultSet, DriverError, DriverResult, DriverValue, Handle, PreparedBatch,
    ResultCursor, ResultSet, ValueRow,
};
pub use crate::error::{BridgeError, Result};
pub use crate::load::{load_table, ColumnMetadata, LoadOptions, LoadSummary, TableMetadata};
pub use crate::materialize::{
    decode, MaterializedResult, MaterializedRow, MaterializedValue, RowMaterializer,
};
pub use crate::query::run_query;
pub use crate::read::{read_mapping, read_mapping_with, ReadMapping, ReadOptions};
pub use crate::record::{InMemoryRecordCursor, InMemoryRecordSet, RecordCursor};
pub use crate::temporal::HostZone;
pub use crate::types::{classify, DecimalType, InternalKind, SemanticType, TypeCategory};
pub use crate::value::InternalValue;
pub use crate::write::{write_mapping, WriteMapping};
