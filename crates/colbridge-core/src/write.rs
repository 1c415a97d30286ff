//! Write mappings: encode internal values into driver parameters for fixture loading.
//!
//! Each mapping is the inverse of the matching read mapping in [`crate::read`].

use crate::decimal;
use crate::driver::{DriverValue, PreparedBatch};
use crate::error::{BridgeError, Result};
use crate::temporal::{self, HostZone, MILLIS_PER_DAY};
use crate::types::SemanticType;
use crate::value::{real_from_bits, InternalValue};
use std::fmt;
use std::sync::Arc;

pub type EncodeFn = Arc<dyn Fn(&InternalValue, HostZone) -> Result<DriverValue> + Send + Sync>;

#[derive(Clone)]
pub struct WriteMapping {
    semantic_type: SemanticType,
    /// `None` for types whose only value is null.
    encode: Option<EncodeFn>,
}

impl fmt::Debug for WriteMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteMapping")
            .field("semantic_type", &self.semantic_type)
            .finish_non_exhaustive()
    }
}

impl WriteMapping {
    fn new<F>(semantic_type: SemanticType, encode: F) -> Self
    where
        F: Fn(&InternalValue, HostZone) -> Result<DriverValue> + Send + Sync + 'static,
    {
        Self {
            semantic_type,
            encode: Some(Arc::new(encode)),
        }
    }

    pub fn semantic_type(&self) -> &SemanticType {
        &self.semantic_type
    }

    pub fn encode(&self, value: Option<&InternalValue>, zone: HostZone) -> Result<DriverValue> {
        let Some(value) = value else {
            return Ok(DriverValue::Null);
        };
        match &self.encode {
            Some(encode) => encode(value, zone),
            None => Err(BridgeError::ExpectedNull {
                value: format!("{value:?}"),
            }),
        }
    }

    /// Encode and bind one parameter of the batch's current row.
    pub fn bind(
        &self,
        batch: &mut dyn PreparedBatch,
        column: usize,
        value: Option<&InternalValue>,
    ) -> Result<()> {
        let encoded = self.encode(value, batch.host_zone())?;
        batch.bind(column, encoded)?;
        Ok(())
    }
}

fn narrow_long<T>(semantic_type: SemanticType) -> WriteMapping
where
    T: TryFrom<i64> + Into<i64> + 'static,
{
    let ty = semantic_type.clone();
    WriteMapping::new(semantic_type, move |value, _| {
        let long = value.expect_long(&ty)?;
        let narrowed = T::try_from(long)
            .map_err(|_| BridgeError::invalid(&ty, format!("{long} out of range")))?;
        Ok(DriverValue::Long(narrowed.into()))
    })
}

fn text_mapping(semantic_type: SemanticType, max_length: Option<u32>) -> WriteMapping {
    let ty = semantic_type.clone();
    WriteMapping::new(semantic_type, move |value, _| {
        let text = value.expect_text(&ty)?;
        if let Some(max) = max_length {
            let length = text.chars().count();
            if length > max as usize {
                return Err(BridgeError::invalid(
                    &ty,
                    format!("length {length} exceeds {max}"),
                ));
            }
        }
        Ok(DriverValue::String(text.to_string()))
    })
}

pub fn write_mapping(semantic_type: &SemanticType) -> Result<WriteMapping> {
    let ty = semantic_type.clone();
    Ok(match semantic_type {
        SemanticType::Boolean => WriteMapping::new(ty.clone(), move |value, _| {
            match value.expect_long(&ty)? {
                0 => Ok(DriverValue::Boolean(false)),
                1 => Ok(DriverValue::Boolean(true)),
                other => Err(BridgeError::invalid(&ty, format!("{other} is not 0 or 1"))),
            }
        }),
        SemanticType::TinyInt => narrow_long::<i8>(ty),
        SemanticType::SmallInt => narrow_long::<i16>(ty),
        SemanticType::Integer => narrow_long::<i32>(ty),
        SemanticType::BigInt => narrow_long::<i64>(ty),
        SemanticType::Real => WriteMapping::new(ty.clone(), move |value, _| {
            let bits = value.expect_long(&ty)?;
            real_from_bits(bits)
                .map(DriverValue::Float)
                .ok_or_else(|| BridgeError::invalid(&ty, format!("{bits} is not a 32-bit pattern")))
        }),
        SemanticType::Double => WriteMapping::new(ty.clone(), move |value, _| {
            Ok(DriverValue::Double(value.expect_double(&ty)?))
        }),
        SemanticType::Decimal(declared) => {
            let declared = *declared;
            WriteMapping::new(ty, move |value, _| {
                decimal::from_internal(value, declared).map(DriverValue::Decimal)
            })
        }
        SemanticType::Char { length } => text_mapping(ty, Some(*length)),
        SemanticType::Varchar { length } => text_mapping(ty, *length),
        SemanticType::Varbinary => WriteMapping::new(ty.clone(), move |value, _| {
            Ok(DriverValue::Bytes(value.expect_slice(&ty)?.to_vec()))
        }),
        SemanticType::Date => WriteMapping::new(ty.clone(), move |value, zone| {
            let days = value.expect_long(&ty)?;
            temporal::days_to_date(days, zone)
                .map(DriverValue::Date)
                .ok_or_else(|| BridgeError::invalid(&ty, format!("day {days} out of range")))
        }),
        SemanticType::Time => WriteMapping::new(ty.clone(), move |value, _| {
            let millis = value.expect_long(&ty)?;
            if !(0..MILLIS_PER_DAY).contains(&millis) {
                return Err(BridgeError::invalid(
                    &ty,
                    format!("{millis} is not a millisecond of day"),
                ));
            }
            Ok(DriverValue::Time(millis))
        }),
        SemanticType::Timestamp => WriteMapping::new(ty.clone(), move |value, _| {
            Ok(DriverValue::Timestamp(value.expect_long(&ty)?))
        }),
        SemanticType::Array(element) => {
            let element = write_mapping(element)?;
            WriteMapping::new(ty.clone(), move |value, zone| {
                value
                    .expect_array(&ty)?
                    .iter()
                    .map(|item| element.encode(item.as_ref(), zone))
                    .collect::<Result<Vec<_>>>()
                    .map(DriverValue::Array)
            })
        }
        SemanticType::Unknown => WriteMapping {
            semantic_type: ty,
            encode: None,
        },
        SemanticType::TimeWithTimeZone | SemanticType::TimestampWithTimeZone => {
            return Err(BridgeError::unsupported(semantic_type))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::SqlDecimal;
    use pretty_assertions::assert_eq;

    fn encode(signature: &str, value: InternalValue) -> Result<DriverValue> {
        let ty: SemanticType = signature.parse().unwrap();
        write_mapping(&ty)?.encode(Some(&value), HostZone::Utc)
    }

    #[test]
    fn null_encodes_as_driver_null_for_every_type() {
        for signature in ["boolean", "real", "decimal(30,4)", "char(2)", "array(date)", "unknown"] {
            let ty: SemanticType = signature.parse().unwrap();
            assert_eq!(
                write_mapping(&ty).unwrap().encode(None, HostZone::Utc).unwrap(),
                DriverValue::Null
            );
        }
    }

    #[test]
    fn encodes_scalars() {
        assert_eq!(encode("boolean", InternalValue::Long(1)).unwrap(), DriverValue::Boolean(true));
        assert_eq!(encode("tinyint", InternalValue::Long(-7)).unwrap(), DriverValue::Long(-7));
        assert_eq!(encode("real", InternalValue::real(1.25)).unwrap(), DriverValue::Float(1.25));
        assert_eq!(
            encode("decimal(12,2)", InternalValue::Long(12345)).unwrap(),
            DriverValue::Decimal(SqlDecimal::new(12345, 2))
        );
        assert_eq!(encode("char(5)", "ab".into()).unwrap(), DriverValue::String("ab".into()));
        assert_eq!(
            encode("date", InternalValue::Long(1)).unwrap(),
            DriverValue::Date(MILLIS_PER_DAY)
        );
    }

    #[test]
    fn rejects_values_outside_declared_width() {
        assert!(matches!(
            encode("tinyint", InternalValue::Long(200)),
            Err(BridgeError::InvalidValue { .. })
        ));
        assert!(matches!(
            encode("boolean", InternalValue::Long(2)),
            Err(BridgeError::InvalidValue { .. })
        ));
        assert!(matches!(
            encode("varchar(2)", "abc".into()),
            Err(BridgeError::InvalidValue { .. })
        ));
        assert!(matches!(
            encode("time", InternalValue::Long(MILLIS_PER_DAY)),
            Err(BridgeError::InvalidValue { .. })
        ));
        assert!(matches!(
            encode("bigint", InternalValue::Double(1.0)),
            Err(BridgeError::InvalidValue { .. })
        ));
    }

    #[test]
    fn unknown_accepts_only_null() {
        assert!(matches!(
            encode("unknown", InternalValue::Long(0)),
            Err(BridgeError::ExpectedNull { .. })
        ));
    }

    #[test]
    fn arrays_encode_element_wise() {
        let value = InternalValue::Array(vec![Some("x".into()), None]);
        assert_eq!(
            encode("array(varchar)", value).unwrap(),
            DriverValue::Array(vec![DriverValue::String("x".into()), DriverValue::Null])
        );
    }

    #[test]
    fn zone_aware_types_are_rejected() {
        assert!(matches!(
            write_mapping(&SemanticType::TimestampWithTimeZone),
            Err(BridgeError::UnsupportedType { .. })
        ));
    }
}
