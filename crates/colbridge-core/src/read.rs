//! Read mappings: per-type decoders from a driver cursor column into the internal encoding.
//!
//! A [`ReadMapping`] pairs a [`SemanticType`] with a read function whose output shape matches
//! the type's internal kind. Every mapping consults [`ResultCursor::was_null`] after extracting
//! the raw value, so driver defaults (`0`, `false`, empty) never leak through as real values.

use crate::decimal::{self, DecimalRounding, SqlDecimal};
use crate::driver::{DriverValue, ResultCursor, ValueRow};
use crate::error::{BridgeError, Result};
use crate::temporal;
use crate::types::{DecimalType, InternalKind, SemanticType};
use crate::value::{real_to_bits, InternalValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub type ReadFn<T> = Arc<dyn Fn(&mut dyn ResultCursor, usize) -> Result<T> + Send + Sync>;

#[derive(Clone)]
pub enum ReadFunction {
    Boolean(ReadFn<bool>),
    Long(ReadFn<i64>),
    Double(ReadFn<f64>),
    Slice(ReadFn<Vec<u8>>),
    /// Element-wise decode of an array column.
    Array(Box<ReadMapping>),
    /// Only null is acceptable.
    Null,
}

impl ReadFunction {
    pub fn internal_kind(&self) -> InternalKind {
        match self {
            ReadFunction::Boolean(_) | ReadFunction::Long(_) => InternalKind::Long,
            ReadFunction::Double(_) => InternalKind::Double,
            ReadFunction::Slice(_) => InternalKind::Slice,
            ReadFunction::Array(_) => InternalKind::Array,
            ReadFunction::Null => InternalKind::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadOptions {
    pub decimal_rounding: DecimalRounding,
}

#[derive(Clone)]
pub struct ReadMapping {
    semantic_type: SemanticType,
    read: ReadFunction,
}

impl fmt::Debug for ReadMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadMapping")
            .field("semantic_type", &self.semantic_type)
            .field("internal_kind", &self.read.internal_kind())
            .finish()
    }
}

impl ReadMapping {
    pub fn new(semantic_type: SemanticType, read: ReadFunction) -> Self {
        Self {
            semantic_type,
            read,
        }
    }

    pub fn semantic_type(&self) -> &SemanticType {
        &self.semantic_type
    }

    pub fn read_function(&self) -> &ReadFunction {
        &self.read
    }

    pub fn internal_kind(&self) -> InternalKind {
        self.read.internal_kind()
    }

    /// Decode one column of the cursor's current row. `None` means SQL `NULL`.
    pub fn read(
        &self,
        cursor: &mut dyn ResultCursor,
        column: usize,
    ) -> Result<Option<InternalValue>> {
        let value = match &self.read {
            ReadFunction::Boolean(read) => InternalValue::boolean(read(cursor, column)?),
            ReadFunction::Long(read) => InternalValue::Long(read(cursor, column)?),
            ReadFunction::Double(read) => InternalValue::Double(read(cursor, column)?),
            ReadFunction::Slice(read) => InternalValue::Slice(read(cursor, column)?),
            ReadFunction::Array(element) => {
                let items = cursor.get_array(column)?;
                if cursor.was_null() {
                    return Ok(None);
                }
                let mut elements = ValueRow::new(items, cursor.host_zone());
                let count = elements.column_count();
                let values = (0..count)
                    .map(|index| element.read(&mut elements, index))
                    .collect::<Result<Vec<_>>>()?;
                InternalValue::Array(values)
            }
            ReadFunction::Null => {
                let value = cursor.get_object(column)?;
                if cursor.was_null() {
                    return Ok(None);
                }
                return Err(BridgeError::ExpectedNull {
                    value: format!("{value:?}"),
                });
            }
        };
        if cursor.was_null() {
            return Ok(None);
        }
        Ok(Some(value))
    }
}

fn long_mapping<F>(semantic_type: SemanticType, read: F) -> ReadMapping
where
    F: Fn(&mut dyn ResultCursor, usize) -> Result<i64> + Send + Sync + 'static,
{
    ReadMapping::new(semantic_type, ReadFunction::Long(Arc::new(read)))
}

fn slice_mapping<F>(semantic_type: SemanticType, read: F) -> ReadMapping
where
    F: Fn(&mut dyn ResultCursor, usize) -> Result<Vec<u8>> + Send + Sync + 'static,
{
    ReadMapping::new(semantic_type, ReadFunction::Slice(Arc::new(read)))
}

pub fn boolean_read_mapping() -> ReadMapping {
    ReadMapping::new(
        SemanticType::Boolean,
        ReadFunction::Boolean(Arc::new(
            |cursor: &mut dyn ResultCursor, column: usize| -> Result<bool> {
                Ok(cursor.get_boolean(column)?)
            },
        )),
    )
}

pub fn tinyint_read_mapping() -> ReadMapping {
    long_mapping(SemanticType::TinyInt, |cursor, column| {
        Ok(i64::from(cursor.get_byte(column)?))
    })
}

pub fn smallint_read_mapping() -> ReadMapping {
    long_mapping(SemanticType::SmallInt, |cursor, column| {
        Ok(i64::from(cursor.get_short(column)?))
    })
}

pub fn integer_read_mapping() -> ReadMapping {
    long_mapping(SemanticType::Integer, |cursor, column| {
        Ok(i64::from(cursor.get_int(column)?))
    })
}

pub fn bigint_read_mapping() -> ReadMapping {
    long_mapping(SemanticType::BigInt, |cursor, column| Ok(cursor.get_long(column)?))
}

/// `real` is kept as the float's raw bit pattern.
pub fn real_read_mapping() -> ReadMapping {
    long_mapping(SemanticType::Real, |cursor, column| {
        Ok(real_to_bits(cursor.get_float(column)?))
    })
}

pub fn double_read_mapping() -> ReadMapping {
    ReadMapping::new(
        SemanticType::Double,
        ReadFunction::Double(Arc::new(
            |cursor: &mut dyn ResultCursor, column: usize| -> Result<f64> {
                Ok(cursor.get_double(column)?)
            },
        )),
    )
}

pub fn decimal_read_mapping(declared: DecimalType, rounding: DecimalRounding) -> ReadMapping {
    let semantic_type = SemanticType::Decimal(declared);
    if declared.is_short() {
        long_mapping(semantic_type, move |cursor, column| {
            match read_decimal(cursor, column, declared, rounding)? {
                Some(value) => decimal::to_compact(value, declared, DecimalRounding::Exact),
                None => Ok(0),
            }
        })
    } else {
        slice_mapping(semantic_type, move |cursor, column| {
            match read_decimal(cursor, column, declared, rounding)? {
                Some(value) => decimal::to_extended(value, declared, DecimalRounding::Exact),
                None => Ok(Vec::new()),
            }
        })
    }
}

/// The driver decimal at the declared scale, or `None` on null.
///
/// A floating point driver value only carries `f64::DIGITS` exact significant digits, so a
/// wider unscaled value read from one is a [`BridgeError::PrecisionOverflow`].
fn read_decimal(
    cursor: &mut dyn ResultCursor,
    column: usize,
    declared: DecimalType,
    rounding: DecimalRounding,
) -> Result<Option<SqlDecimal>> {
    let value = cursor.get_decimal(column)?;
    if cursor.was_null() {
        return Ok(None);
    }
    let rescaled = decimal::to_declared_scale(value, declared, rounding)?;
    if rescaled.precision() > f64::DIGITS {
        if let DriverValue::Float(_) | DriverValue::Double(_) = cursor.get_object(column)? {
            return Err(BridgeError::PrecisionOverflow {
                semantic_type: SemanticType::Decimal(declared),
                value: value.to_string(),
            });
        }
    }
    Ok(Some(rescaled))
}

/// Fixed-width text comes back space padded; only trailing U+0020 is removed.
pub fn char_read_mapping(length: u32) -> ReadMapping {
    slice_mapping(SemanticType::char(length), |cursor, column| {
        let text = cursor.get_string(column)?;
        Ok(text.trim_end_matches(' ').as_bytes().to_vec())
    })
}

pub fn varchar_read_mapping(length: Option<u32>) -> ReadMapping {
    slice_mapping(SemanticType::Varchar { length }, |cursor, column| {
        Ok(cursor.get_string(column)?.into_bytes())
    })
}

pub fn varbinary_read_mapping() -> ReadMapping {
    slice_mapping(SemanticType::Varbinary, |cursor, column| {
        Ok(cursor.get_bytes(column)?)
    })
}

pub fn date_read_mapping() -> ReadMapping {
    long_mapping(SemanticType::Date, |cursor, column| {
        let millis = cursor.get_date(column)?;
        temporal::date_to_days(millis, cursor.host_zone()).ok_or_else(|| {
            BridgeError::invalid(&SemanticType::Date, format!("instant {millis} out of range"))
        })
    })
}

pub fn time_read_mapping() -> ReadMapping {
    long_mapping(SemanticType::Time, |cursor, column| {
        Ok(temporal::time_to_millis_of_day(cursor.get_time(column)?))
    })
}

pub fn timestamp_read_mapping() -> ReadMapping {
    long_mapping(SemanticType::Timestamp, |cursor, column| {
        Ok(cursor.get_timestamp(column)?)
    })
}

pub fn array_read_mapping(element: ReadMapping) -> ReadMapping {
    ReadMapping::new(
        SemanticType::array(element.semantic_type.clone()),
        ReadFunction::Array(Box::new(element)),
    )
}

pub fn unknown_read_mapping() -> ReadMapping {
    ReadMapping::new(SemanticType::Unknown, ReadFunction::Null)
}

/// Read mapping for `semantic_type` with strict decimal handling.
pub fn read_mapping(semantic_type: &SemanticType) -> Result<ReadMapping> {
    read_mapping_with(semantic_type, ReadOptions::default())
}

pub fn read_mapping_with(
    semantic_type: &SemanticType,
    options: ReadOptions,
) -> Result<ReadMapping> {
    Ok(match semantic_type {
        SemanticType::Boolean => boolean_read_mapping(),
        SemanticType::TinyInt => tinyint_read_mapping(),
        SemanticType::SmallInt => smallint_read_mapping(),
        SemanticType::Integer => integer_read_mapping(),
        SemanticType::BigInt => bigint_read_mapping(),
        SemanticType::Real => real_read_mapping(),
        SemanticType::Double => double_read_mapping(),
        SemanticType::Decimal(decimal) => decimal_read_mapping(*decimal, options.decimal_rounding),
        SemanticType::Char { length } => char_read_mapping(*length),
        SemanticType::Varchar { length } => varchar_read_mapping(*length),
        SemanticType::Varbinary => varbinary_read_mapping(),
        SemanticType::Date => date_read_mapping(),
        SemanticType::Time => time_read_mapping(),
        SemanticType::Timestamp => timestamp_read_mapping(),
        SemanticType::Array(element) => array_read_mapping(read_mapping_with(element, options)?),
        SemanticType::Unknown => unknown_read_mapping(),
        SemanticType::TimeWithTimeZone | SemanticType::TimestampWithTimeZone => {
            return Err(BridgeError::unsupported(semantic_type))
        }
    })
}
