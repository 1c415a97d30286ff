//! Semantic type catalog.
//!
//! [`SemanticType`] is a closed tagged union compared structurally. Every other module
//! dispatches on it with exhaustive `match`es, so adding a variant is a compile error until
//! every codec handles it.

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest declared precision accepted for `decimal(p, s)`.
pub const MAX_PRECISION: u8 = 38;
/// Largest precision stored in the compact (`i64` unscaled) form.
pub const MAX_SHORT_PRECISION: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeParseError {
    #[error("unknown type signature: {0}")]
    UnknownType(String),
    #[error("invalid decimal precision/scale: ({precision}, {scale})")]
    InvalidDecimal { precision: u32, scale: u32 },
    #[error("invalid type parameter in {0}")]
    InvalidParameter(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecimalType {
    precision: u8,
    scale: u8,
}

impl DecimalType {
    pub fn new(precision: u8, scale: u8) -> std::result::Result<Self, TypeParseError> {
        if precision == 0 || precision > MAX_PRECISION || scale > precision {
            return Err(TypeParseError::InvalidDecimal {
                precision: precision.into(),
                scale: scale.into(),
            });
        }
        Ok(Self { precision, scale })
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Whether values of this type use the compact `i64` unscaled form.
    pub fn is_short(&self) -> bool {
        self.precision <= MAX_SHORT_PRECISION
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SemanticType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    /// Single precision float, stored internally as its raw bit pattern.
    Real,
    Double,
    Decimal(DecimalType),
    Char { length: u32 },
    Varchar { length: Option<u32> },
    Varbinary,
    Date,
    Time,
    TimeWithTimeZone,
    Timestamp,
    TimestampWithTimeZone,
    Array(Box<SemanticType>),
    /// Type of an untyped `NULL` literal.
    Unknown,
}

impl SemanticType {
    pub fn decimal(precision: u8, scale: u8) -> std::result::Result<Self, TypeParseError> {
        DecimalType::new(precision, scale).map(SemanticType::Decimal)
    }

    pub fn char(length: u32) -> Self {
        SemanticType::Char { length }
    }

    pub fn varchar(length: u32) -> Self {
        SemanticType::Varchar {
            length: Some(length),
        }
    }

    pub fn unbounded_varchar() -> Self {
        SemanticType::Varchar { length: None }
    }

    pub fn array(element: SemanticType) -> Self {
        SemanticType::Array(Box::new(element))
    }

    pub fn category(&self) -> Result<TypeCategory> {
        classify(self)
    }
}

/// Encoding family of a semantic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    Boolean,
    Integer,
    FloatBits,
    Double,
    CompactDecimal,
    ExtendedDecimal,
    FixedCharacter,
    VariableCharacter,
    Binary,
    Temporal,
    Array,
    Unknown,
}

/// Physical shape of the internal value for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternalKind {
    Long,
    Double,
    Slice,
    Array,
    Null,
}

impl TypeCategory {
    pub fn internal_kind(self) -> InternalKind {
        match self {
            TypeCategory::Boolean
            | TypeCategory::Integer
            | TypeCategory::FloatBits
            | TypeCategory::CompactDecimal
            | TypeCategory::Temporal => InternalKind::Long,
            TypeCategory::Double => InternalKind::Double,
            TypeCategory::ExtendedDecimal
            | TypeCategory::FixedCharacter
            | TypeCategory::VariableCharacter
            | TypeCategory::Binary => InternalKind::Slice,
            TypeCategory::Array => InternalKind::Array,
            TypeCategory::Unknown => InternalKind::Null,
        }
    }
}

/// Classify a type into its encoding family.
///
/// Zone-aware temporal types, and arrays of them, fail with
/// [`BridgeError::UnsupportedType`].
pub fn classify(semantic_type: &SemanticType) -> Result<TypeCategory> {
    Ok(match semantic_type {
        SemanticType::Boolean => TypeCategory::Boolean,
        SemanticType::TinyInt
        | SemanticType::SmallInt
        | SemanticType::Integer
        | SemanticType::BigInt => TypeCategory::Integer,
        SemanticType::Real => TypeCategory::FloatBits,
        SemanticType::Double => TypeCategory::Double,
        SemanticType::Decimal(decimal) if decimal.is_short() => TypeCategory::CompactDecimal,
        SemanticType::Decimal(_) => TypeCategory::ExtendedDecimal,
        SemanticType::Char { .. } => TypeCategory::FixedCharacter,
        SemanticType::Varchar { .. } => TypeCategory::VariableCharacter,
        SemanticType::Varbinary => TypeCategory::Binary,
        SemanticType::Date | SemanticType::Time | SemanticType::Timestamp => {
            TypeCategory::Temporal
        }
        SemanticType::TimeWithTimeZone | SemanticType::TimestampWithTimeZone => {
            return Err(BridgeError::unsupported(semantic_type))
        }
        SemanticType::Array(element) => {
            classify(element)?;
            TypeCategory::Array
        }
        SemanticType::Unknown => TypeCategory::Unknown,
    })
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticType::Boolean => f.write_str("boolean"),
            SemanticType::TinyInt => f.write_str("tinyint"),
            SemanticType::SmallInt => f.write_str("smallint"),
            SemanticType::Integer => f.write_str("integer"),
            SemanticType::BigInt => f.write_str("bigint"),
            SemanticType::Real => f.write_str("real"),
            SemanticType::Double => f.write_str("double"),
            SemanticType::Decimal(d) => write!(f, "decimal({},{})", d.precision, d.scale),
            SemanticType::Char { length } => write!(f, "char({length})"),
            SemanticType::Varchar { length: Some(length) } => write!(f, "varchar({length})"),
            SemanticType::Varchar { length: None } => f.write_str("varchar"),
            SemanticType::Varbinary => f.write_str("varbinary"),
            SemanticType::Date => f.write_str("date"),
            SemanticType::Time => f.write_str("time"),
            SemanticType::TimeWithTimeZone => f.write_str("time with time zone"),
            SemanticType::Timestamp => f.write_str("timestamp"),
            SemanticType::TimestampWithTimeZone => f.write_str("timestamp with time zone"),
            SemanticType::Array(element) => write!(f, "array({element})"),
            SemanticType::Unknown => f.write_str("unknown"),
        }
    }
}

impl FromStr for SemanticType {
    type Err = TypeParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();

        let Some(open) = normalized.find('(') else {
            return simple_type(&normalized);
        };
        if !normalized.ends_with(')') {
            return Err(TypeParseError::UnknownType(s.to_string()));
        }
        let name = normalized[..open].trim();
        let args = normalized[open + 1..normalized.len() - 1].trim();

        match name {
            "array" => Ok(SemanticType::array(args.parse()?)),
            "decimal" | "numeric" => {
                let mut parts = args.split(',').map(str::trim);
                let precision = parse_param(parts.next(), s)?;
                let scale = match parts.next() {
                    Some(scale) => parse_param(Some(scale), s)?,
                    None => 0,
                };
                if parts.next().is_some() {
                    return Err(TypeParseError::InvalidParameter(s.to_string()));
                }
                let precision = u8::try_from(precision)
                    .map_err(|_| TypeParseError::InvalidDecimal { precision, scale })?;
                let scale = u8::try_from(scale).map_err(|_| TypeParseError::InvalidDecimal {
                    precision: precision.into(),
                    scale,
                })?;
                SemanticType::decimal(precision, scale)
            }
            "char" => Ok(SemanticType::char(parse_param(Some(args), s)?)),
            "varchar" => Ok(SemanticType::varchar(parse_param(Some(args), s)?)),
            _ => Err(TypeParseError::UnknownType(s.to_string())),
        }
    }
}

fn simple_type(name: &str) -> std::result::Result<SemanticType, TypeParseError> {
    Ok(match name {
        "boolean" => SemanticType::Boolean,
        "tinyint" => SemanticType::TinyInt,
        "smallint" => SemanticType::SmallInt,
        "integer" | "int" => SemanticType::Integer,
        "bigint" => SemanticType::BigInt,
        "real" => SemanticType::Real,
        "double" | "double precision" => SemanticType::Double,
        "decimal" => SemanticType::decimal(MAX_PRECISION, 0)?,
        "char" => SemanticType::char(1),
        "varchar" => SemanticType::unbounded_varchar(),
        "varbinary" => SemanticType::Varbinary,
        "date" => SemanticType::Date,
        "time" => SemanticType::Time,
        "time with time zone" => SemanticType::TimeWithTimeZone,
        "timestamp" => SemanticType::Timestamp,
        "timestamp with time zone" => SemanticType::TimestampWithTimeZone,
        "unknown" => SemanticType::Unknown,
        other => return Err(TypeParseError::UnknownType(other.to_string())),
    })
}

fn parse_param(param: Option<&str>, signature: &str) -> std::result::Result<u32, TypeParseError> {
    param
        .and_then(|p| p.parse::<u32>().ok())
        .ok_or_else(|| TypeParseError::InvalidParameter(signature.to_string()))
}

impl From<SemanticType> for String {
    fn from(value: SemanticType) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for SemanticType {
    type Error = TypeParseError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}
