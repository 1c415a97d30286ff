//! Sequential row sources for fixture loading.

use crate::error::{BridgeError, Result};
use crate::types::SemanticType;
use crate::value::InternalValue;

/// Forward-only cursor over typed rows.
pub trait RecordCursor {
    /// Move to the next row; `false` once the source is exhausted.
    fn advance_next_position(&mut self) -> bool;
    /// Number of fields in every row.
    fn field_count(&self) -> usize;
    /// Field `field` of the current row; `None` is SQL `NULL`.
    fn value(&self, field: usize) -> Option<&InternalValue>;
}

/// An in-memory table of internal values, addressed by field position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryRecordSet {
    types: Vec<SemanticType>,
    rows: Vec<Vec<Option<InternalValue>>>,
}

impl InMemoryRecordSet {
    pub fn new(types: Vec<SemanticType>) -> Self {
        Self {
            types,
            rows: Vec::new(),
        }
    }

    pub fn types(&self) -> &[SemanticType] {
        &self.types
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn push_row(&mut self, row: Vec<Option<InternalValue>>) -> Result<()> {
        if row.len() != self.types.len() {
            return Err(BridgeError::SchemaMismatch {
                expected: self.types.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn cursor(&self) -> InMemoryRecordCursor<'_> {
        InMemoryRecordCursor {
            rows: &self.rows,
            field_count: self.types.len(),
            position: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryRecordCursor<'a> {
    rows: &'a [Vec<Option<InternalValue>>],
    field_count: usize,
    position: Option<usize>,
}

impl RecordCursor for InMemoryRecordCursor<'_> {
    fn advance_next_position(&mut self) -> bool {
        let next = self.position.map_or(0, |p| p + 1);
        self.position = Some(next.min(self.rows.len()));
        next < self.rows.len()
    }

    fn field_count(&self) -> usize {
        self.field_count
    }

    fn value(&self, field: usize) -> Option<&InternalValue> {
        self.rows.get(self.position?)?.get(field)?.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_row_checks_arity() {
        let mut records = InMemoryRecordSet::new(vec![SemanticType::BigInt, SemanticType::Double]);
        records
            .push_row(vec![Some(InternalValue::Long(1)), None])
            .unwrap();
        let err = records.push_row(vec![None]).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::SchemaMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert_eq!(records.row_count(), 1);
    }

    #[test]
    fn cursor_walks_rows_once() {
        let mut records = InMemoryRecordSet::new(vec![SemanticType::BigInt]);
        for i in 0..3 {
            records.push_row(vec![Some(InternalValue::Long(i))]).unwrap();
        }
        let mut cursor = records.cursor();
        assert_eq!(cursor.field_count(), 1);
        assert_eq!(cursor.value(0), None);
        let mut seen = Vec::new();
        while cursor.advance_next_position() {
            seen.push(cursor.value(0).and_then(InternalValue::as_long));
        }
        assert_eq!(seen, vec![Some(0), Some(1), Some(2)]);
        assert!(!cursor.advance_next_position());
        assert_eq!(cursor.value(0), None);
    }
}
