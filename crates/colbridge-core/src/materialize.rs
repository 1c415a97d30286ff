//! Canonical, directly comparable forms of decoded values for test assertions.

use crate::decimal::{self, DecimalRounding, SqlDecimal};
use crate::driver::ResultCursor;
use crate::error::{BridgeError, Result};
use crate::read::{read_mapping_with, ReadMapping, ReadOptions};
use crate::temporal::{self, HostZone};
use crate::types::SemanticType;
use crate::value::{real_from_bits, InternalValue};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum MaterializedValue {
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    Decimal(SqlDecimal),
    String(String),
    Binary(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    /// Wall clock in the driver session's zone.
    Timestamp(NaiveDateTime),
    Array(Vec<Option<MaterializedValue>>),
}

impl fmt::Display for MaterializedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaterializedValue::Boolean(v) => write!(f, "{v}"),
            MaterializedValue::TinyInt(v) => write!(f, "{v}"),
            MaterializedValue::SmallInt(v) => write!(f, "{v}"),
            MaterializedValue::Integer(v) => write!(f, "{v}"),
            MaterializedValue::BigInt(v) => write!(f, "{v}"),
            MaterializedValue::Real(v) => write!(f, "{v}"),
            MaterializedValue::Double(v) => write!(f, "{v}"),
            MaterializedValue::Decimal(v) => write!(f, "{v}"),
            MaterializedValue::String(v) => f.write_str(v),
            MaterializedValue::Binary(bytes) => {
                f.write_str("0x")?;
                bytes.iter().try_for_each(|b| write!(f, "{b:02x}"))
            }
            MaterializedValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            MaterializedValue::Time(v) => write!(f, "{}", v.format("%H:%M:%S%.3f")),
            MaterializedValue::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.3f")),
            MaterializedValue::Array(items) => {
                f.write_str("[")?;
                write_values(f, items)?;
                f.write_str("]")
            }
        }
    }
}

fn write_values(f: &mut fmt::Formatter<'_>, values: &[Option<MaterializedValue>]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        match value {
            Some(value) => write!(f, "{value}")?,
            None => f.write_str("NULL")?,
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedRow {
    values: Vec<Option<MaterializedValue>>,
}

impl MaterializedRow {
    pub fn new(values: Vec<Option<MaterializedValue>>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Option<MaterializedValue>] {
        &self.values
    }

    pub fn get(&self, column: usize) -> Option<&MaterializedValue> {
        self.values.get(column)?.as_ref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for MaterializedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_values(f, &self.values)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedResult {
    types: Vec<SemanticType>,
    rows: Vec<MaterializedRow>,
}

impl MaterializedResult {
    pub fn new(types: Vec<SemanticType>, rows: Vec<MaterializedRow>) -> Self {
        Self { types, rows }
    }

    pub fn types(&self) -> &[SemanticType] {
        &self.types
    }

    pub fn rows(&self) -> &[MaterializedRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The single value of a one-row, one-column result.
    pub fn only_value(&self) -> Option<&MaterializedValue> {
        match (self.types.len(), self.rows.as_slice()) {
            (1, [row]) => row.get(0),
            _ => None,
        }
    }

    /// All values of a one-column result, or `None` for wider results.
    pub fn only_column(&self) -> Option<Vec<Option<&MaterializedValue>>> {
        (self.types.len() == 1).then(|| self.rows.iter().map(|row| row.get(0)).collect())
    }
}

impl fmt::Display for MaterializedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}

fn materializing_options() -> ReadOptions {
    ReadOptions {
        decimal_rounding: DecimalRounding::HalfUp,
    }
}

/// Decode one cursor column straight into its materialized form.
pub fn decode(
    semantic_type: &SemanticType,
    cursor: &mut dyn ResultCursor,
    column: usize,
) -> Result<Option<MaterializedValue>> {
    let mapping = read_mapping_with(semantic_type, materializing_options())?;
    let value = mapping.read(cursor, column)?;
    materialize(semantic_type, value.as_ref(), cursor.host_zone())
}

/// Project an internal value into its canonical comparable form.
pub fn materialize(
    semantic_type: &SemanticType,
    value: Option<&InternalValue>,
    zone: HostZone,
) -> Result<Option<MaterializedValue>> {
    let Some(value) = value else {
        return match semantic_type {
            SemanticType::TimeWithTimeZone | SemanticType::TimestampWithTimeZone => {
                Err(BridgeError::unsupported(semantic_type))
            }
            _ => Ok(None),
        };
    };
    let out_of_range =
        |what: i64| BridgeError::invalid(semantic_type, format!("{what} out of range"));

    let materialized = match semantic_type {
        SemanticType::Boolean => MaterializedValue::Boolean(value.expect_long(semantic_type)? != 0),
        SemanticType::TinyInt => {
            let v = value.expect_long(semantic_type)?;
            MaterializedValue::TinyInt(i8::try_from(v).map_err(|_| out_of_range(v))?)
        }
        SemanticType::SmallInt => {
            let v = value.expect_long(semantic_type)?;
            MaterializedValue::SmallInt(i16::try_from(v).map_err(|_| out_of_range(v))?)
        }
        SemanticType::Integer => {
            let v = value.expect_long(semantic_type)?;
            MaterializedValue::Integer(i32::try_from(v).map_err(|_| out_of_range(v))?)
        }
        SemanticType::BigInt => MaterializedValue::BigInt(value.expect_long(semantic_type)?),
        SemanticType::Real => {
            let bits = value.expect_long(semantic_type)?;
            MaterializedValue::Real(real_from_bits(bits).ok_or_else(|| out_of_range(bits))?)
        }
        SemanticType::Double => MaterializedValue::Double(value.expect_double(semantic_type)?),
        SemanticType::Decimal(declared) => {
            let exact = decimal::from_internal(value, *declared)?;
            MaterializedValue::Decimal(decimal::round_to_declared(exact, *declared)?)
        }
        SemanticType::Char { length } => {
            let text = value.expect_text(semantic_type)?;
            let width = *length as usize;
            MaterializedValue::String(format!("{text:<width$}"))
        }
        SemanticType::Varchar { .. } => {
            MaterializedValue::String(value.expect_text(semantic_type)?.to_string())
        }
        SemanticType::Varbinary => {
            MaterializedValue::Binary(value.expect_slice(semantic_type)?.to_vec())
        }
        SemanticType::Date => {
            let days = value.expect_long(semantic_type)?;
            let date = temporal::days_to_naive_date(days).ok_or_else(|| out_of_range(days))?;
            MaterializedValue::Date(date)
        }
        SemanticType::Time => {
            let millis = value.expect_long(semantic_type)?;
            let time = temporal::millis_of_day_to_naive_time(millis)
                .ok_or_else(|| out_of_range(millis))?;
            MaterializedValue::Time(time)
        }
        SemanticType::Timestamp => {
            let millis = value.expect_long(semantic_type)?;
            let local = zone
                .instant_to_local(millis)
                .ok_or_else(|| out_of_range(millis))?;
            MaterializedValue::Timestamp(local)
        }
        SemanticType::Array(element) => MaterializedValue::Array(
            value
                .expect_array(semantic_type)?
                .iter()
                .map(|item| materialize(element, item.as_ref(), zone))
                .collect::<Result<Vec<_>>>()?,
        ),
        SemanticType::Unknown => {
            return Err(BridgeError::ExpectedNull {
                value: format!("{value:?}"),
            })
        }
        SemanticType::TimeWithTimeZone | SemanticType::TimestampWithTimeZone => {
            return Err(BridgeError::unsupported(semantic_type))
        }
    };
    Ok(Some(materialized))
}

/// Decodes whole rows against a fixed list of expected column types.
#[derive(Debug, Clone)]
pub struct RowMaterializer {
    types: Vec<SemanticType>,
    mappings: Vec<ReadMapping>,
}

impl RowMaterializer {
    pub fn new(types: Vec<SemanticType>) -> Result<Self> {
        let mappings = types
            .iter()
            .map(|ty| read_mapping_with(ty, materializing_options()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { types, mappings })
    }

    pub fn types(&self) -> &[SemanticType] {
        &self.types
    }

    pub fn check_column_count(&self, actual: usize) -> Result<()> {
        if actual != self.types.len() {
            return Err(BridgeError::SchemaMismatch {
                expected: self.types.len(),
                actual,
            });
        }
        Ok(())
    }

    pub fn materialize_row(&self, cursor: &mut dyn ResultCursor) -> Result<MaterializedRow> {
        self.check_column_count(cursor.column_count())?;
        let zone = cursor.host_zone();
        let values = self
            .types
            .iter()
            .zip(&self.mappings)
            .enumerate()
            .map(|(column, (ty, mapping))| {
                let value = mapping.read(cursor, column)?;
                materialize(ty, value.as_ref(), zone)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MaterializedRow::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverValue, ValueRow};
    use pretty_assertions::assert_eq;

    fn ty(signature: &str) -> SemanticType {
        signature.parse().unwrap()
    }

    #[test]
    fn char_is_padded_back_to_declared_length() {
        let value = materialize(&ty("char(5)"), Some(&"ab".into()), HostZone::Utc).unwrap();
        assert_eq!(value, Some(MaterializedValue::String("ab   ".into())));
    }

    #[test]
    fn compact_decimal_materializes_at_declared_scale() {
        let internal = InternalValue::Long(12345);
        let value = materialize(&ty("decimal(12,2)"), Some(&internal), HostZone::Utc)
            .unwrap()
            .unwrap();
        assert_eq!(value, MaterializedValue::Decimal(SqlDecimal::new(12345, 2)));
        assert_eq!(value.to_string(), "123.45");
    }

    #[test]
    fn decode_rounds_half_up_but_keeps_precision_bound() {
        let mut cursor = ValueRow::new(
            vec![
                DriverValue::String("1.005".into()),
                DriverValue::String("12345.6".into()),
            ],
            HostZone::Utc,
        );
        assert_eq!(
            decode(&ty("decimal(5,2)"), &mut cursor, 0).unwrap(),
            Some(MaterializedValue::Decimal(SqlDecimal::new(101, 2)))
        );
        assert!(matches!(
            decode(&ty("decimal(5,2)"), &mut cursor, 1),
            Err(BridgeError::PrecisionOverflow { .. })
        ));
    }

    #[test]
    fn temporal_values_become_calendar_types() {
        let date = materialize(&ty("date"), Some(&InternalValue::Long(19_782)), HostZone::Utc)
            .unwrap()
            .unwrap();
        assert_eq!(
            date,
            MaterializedValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );

        let time = materialize(&ty("time"), Some(&InternalValue::Long(49_510_250)), HostZone::Utc)
            .unwrap()
            .unwrap();
        assert_eq!(time.to_string(), "13:45:10.250");

        let zone: HostZone = "+02:00".parse().unwrap();
        let ts = materialize(&ty("timestamp"), Some(&InternalValue::Long(0)), zone)
            .unwrap()
            .unwrap();
        assert_eq!(ts.to_string(), "1970-01-01 02:00:00.000");
    }

    #[test]
    fn arrays_materialize_element_wise() {
        let value = InternalValue::Array(vec![Some(InternalValue::Long(1)), None]);
        let materialized = materialize(&ty("array(smallint)"), Some(&value), HostZone::Utc)
            .unwrap()
            .unwrap();
        assert_eq!(
            materialized,
            MaterializedValue::Array(vec![Some(MaterializedValue::SmallInt(1)), None])
        );
        assert_eq!(materialized.to_string(), "[1, NULL]");
    }

    #[test]
    fn row_width_must_match_expected_types() {
        let materializer = RowMaterializer::new(vec![SemanticType::BigInt]).unwrap();
        let mut cursor =
            ValueRow::new(vec![DriverValue::Long(1), DriverValue::Long(2)], HostZone::Utc);
        assert!(matches!(
            materializer.materialize_row(&mut cursor),
            Err(BridgeError::SchemaMismatch {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn only_value_requires_single_cell() {
        let result = MaterializedResult::new(
            vec![SemanticType::BigInt],
            vec![MaterializedRow::new(vec![Some(MaterializedValue::BigInt(42))])],
        );
        assert_eq!(result.only_value(), Some(&MaterializedValue::BigInt(42)));
        assert_eq!(result.only_column(), Some(vec![Some(&MaterializedValue::BigInt(42))]));
        assert_eq!(result.to_string(), "42\n");
    }
}
