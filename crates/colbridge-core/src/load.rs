//! Bulk loading of fixture tables through prepared batches.

use crate::driver::{Handle, PreparedBatch};
use crate::error::{BridgeError, Result};
use crate::record::RecordCursor;
use crate::types::SemanticType;
use crate::write::{write_mapping, WriteMapping};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

pub const DEFAULT_BATCH_SIZE: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(size) => size,
    None => panic!("batch size must be non-zero"),
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub semantic_type: SemanticType,
    /// Hidden columns exist in the source rows but are never loaded.
    #[serde(default)]
    pub hidden: bool,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic_type,
            hidden: false,
        }
    }

    pub fn hidden(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        Self {
            hidden: true,
            ..Self::new(name, semantic_type)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    pub columns: Vec<ColumnMetadata>,
}

impl TableMetadata {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnMetadata>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Visible columns with their position in the full column list.
    pub fn visible_columns(&self) -> impl Iterator<Item = (usize, &ColumnMetadata)> {
        self.columns.iter().enumerate().filter(|(_, c)| !c.hidden)
    }

    pub fn insert_sql(&self) -> String {
        let names: Vec<&str> = self.visible_columns().map(|(_, c)| c.name.as_str()).collect();
        let placeholders = vec!["?"; names.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            names.join(", "),
            placeholders
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadOptions {
    /// Rows queued before the batch is executed.
    pub batch_size: NonZeroUsize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub rows: u64,
    /// Row count of every executed batch, in execution order.
    pub batch_sizes: Vec<usize>,
}

/// Fixed-capacity view of a prepared batch owned by one load loop.
struct RecordBatch<'h> {
    statement: Box<dyn PreparedBatch + 'h>,
    capacity: usize,
}

impl RecordBatch<'_> {
    fn is_full(&self) -> bool {
        self.statement.size() >= self.capacity
    }

    /// Execute queued rows; an empty batch is never sent.
    fn flush(&mut self, table: &str, summary: &mut LoadSummary) -> Result<()> {
        let queued = self.statement.size();
        if queued == 0 {
            return Ok(());
        }
        log::debug!("flushing {queued} rows into {table}");
        self.statement.execute()?;
        summary.batch_sizes.push(queued);
        Ok(())
    }
}

/// Load every row of `source` into `table`.
///
/// Write mappings for all visible columns are resolved, and the source's field count checked
/// against the full column list, before anything is prepared or executed.
pub fn load_table(
    handle: &mut dyn Handle,
    table: &TableMetadata,
    source: &mut dyn RecordCursor,
    options: &LoadOptions,
) -> Result<LoadSummary> {
    let columns = table
        .visible_columns()
        .map(|(field, column)| {
            write_mapping(&column.semantic_type)
                .map(|mapping| (field, mapping))
                .map_err(|err| match err {
                    BridgeError::UnsupportedType { semantic_type } => {
                        BridgeError::UnsupportedColumnType {
                            column: column.name.clone(),
                            semantic_type,
                        }
                    }
                    other => other,
                })
        })
        .collect::<Result<Vec<(usize, WriteMapping)>>>()?;
    if source.field_count() != table.columns.len() {
        return Err(BridgeError::SchemaMismatch {
            expected: table.columns.len(),
            actual: source.field_count(),
        });
    }

    let sql = table.insert_sql();
    let mut batch = RecordBatch {
        statement: handle.prepare_batch(&sql)?,
        capacity: options.batch_size.get(),
    };
    let mut summary = LoadSummary::default();

    while source.advance_next_position() {
        for (parameter, (field, mapping)) in columns.iter().enumerate() {
            mapping.bind(batch.statement.as_mut(), parameter, source.value(*field))?;
        }
        batch.statement.add()?;
        summary.rows += 1;
        if batch.is_full() {
            batch.flush(&table.name, &mut summary)?;
        }
    }
    batch.flush(&table.name, &mut summary)?;

    log::info!(
        "loaded {} rows into {} in {} batches",
        summary.rows,
        table.name,
        summary.batch_sizes.len()
    );
    Ok(summary)
}
