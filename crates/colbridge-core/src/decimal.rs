//! Exact decimals and the compact/extended decimal codec.
//!
//! A `decimal(p, s)` with `p <= 18` is stored internally as its unscaled `i64`; wider
//! precisions are stored as the 16-byte little-endian two's-complement unscaled `i128`.
//! The scale is always the declared one, never the scale the driver happened to return.

use crate::error::{BridgeError, Result};
use crate::types::{DecimalType, SemanticType};
use crate::value::InternalValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Width of the extended-form encoding.
pub const LONG_DECIMAL_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal literal: {0:?}")]
pub struct DecimalParseError(String);

/// How a driver decimal is brought to the declared scale when it carries more digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DecimalRounding {
    /// Dropping non-zero digits is a [`BridgeError::PrecisionOverflow`].
    #[default]
    Exact,
    /// Round half away from zero.
    HalfUp,
}

/// An exact decimal number: `unscaled * 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SqlDecimal {
    unscaled: i128,
    scale: u8,
}

impl SqlDecimal {
    pub const fn new(unscaled: i128, scale: u8) -> Self {
        Self { unscaled, scale }
    }

    pub fn unscaled(&self) -> i128 {
        self.unscaled
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Number of digits in the unscaled value (zero has one digit).
    pub fn precision(&self) -> u32 {
        let mut value = self.unscaled.unsigned_abs();
        let mut digits = 1;
        while value >= 10 {
            value /= 10;
            digits += 1;
        }
        digits
    }

    /// Change the scale without losing information, or `None`.
    pub fn rescale_exact(self, scale: u8) -> Option<Self> {
        if scale >= self.scale {
            let factor = pow10(scale - self.scale)?;
            return Some(Self::new(self.unscaled.checked_mul(factor)?, scale));
        }
        match pow10(self.scale - scale) {
            Some(divisor) if self.unscaled % divisor == 0 => {
                Some(Self::new(self.unscaled / divisor, scale))
            }
            Some(_) => None,
            None if self.unscaled == 0 => Some(Self::new(0, scale)),
            None => None,
        }
    }

    /// Change the scale rounding half away from zero; `None` only on overflow.
    pub fn rescale_half_up(self, scale: u8) -> Option<Self> {
        if scale >= self.scale {
            return self.rescale_exact(scale);
        }
        // |unscaled| < 10^39, so dropping 39+ digits always rounds to zero.
        let Some(divisor) = pow10(self.scale - scale) else {
            return Some(Self::new(0, scale));
        };
        let quotient = self.unscaled / divisor;
        let remainder = self.unscaled % divisor;
        let rounded = if remainder.unsigned_abs() * 2 >= divisor.unsigned_abs() {
            quotient + self.unscaled.signum()
        } else {
            quotient
        };
        Some(Self::new(rounded, scale))
    }

    pub fn fits(&self, decimal: DecimalType) -> bool {
        self.scale == decimal.scale() && self.precision() <= u32::from(decimal.precision())
    }

    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }
}

fn pow10(exponent: u8) -> Option<i128> {
    10_i128.checked_pow(u32::from(exponent))
}

impl fmt::Display for SqlDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.unscaled < 0 { "-" } else { "" };
        let digits = self.unscaled.unsigned_abs().to_string();
        let scale = usize::from(self.scale);
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let digits = format!("{digits:0>width$}", width = scale + 1);
        let (int_part, frac_part) = digits.split_at(digits.len() - scale);
        write!(f, "{sign}{int_part}.{frac_part}")
    }
}

impl FromStr for SqlDecimal {
    type Err = DecimalParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = || DecimalParseError(s.to_string());
        let text = s.trim();
        let (mantissa, exponent) = match text.find(['e', 'E']) {
            Some(idx) => (
                &text[..idx],
                text[idx + 1..].parse::<i32>().map_err(|_| err())?,
            ),
            None => (text, 0),
        };
        let (negative, mantissa) = match mantissa.as_bytes().first() {
            Some(b'-') => (true, &mantissa[1..]),
            Some(b'+') => (false, &mantissa[1..]),
            _ => (false, mantissa),
        };
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }

        let mut unscaled: i128 = 0;
        for ch in int_part.chars().chain(frac_part.chars()) {
            let digit = ch.to_digit(10).ok_or_else(err)?;
            unscaled = unscaled
                .checked_mul(10)
                .and_then(|v| v.checked_add(i128::from(digit)))
                .ok_or_else(err)?;
        }
        if negative {
            unscaled = -unscaled;
        }

        let scale = i32::try_from(frac_part.len()).map_err(|_| err())? - exponent;
        if scale < 0 {
            let factor = u8::try_from(-scale).ok().and_then(pow10).ok_or_else(err)?;
            let unscaled = unscaled.checked_mul(factor).ok_or_else(err)?;
            return Ok(Self::new(unscaled, 0));
        }
        let scale = u8::try_from(scale).map_err(|_| err())?;
        Ok(Self::new(unscaled, scale))
    }
}

fn overflow(decimal: DecimalType, value: impl fmt::Display) -> BridgeError {
    BridgeError::PrecisionOverflow {
        semantic_type: SemanticType::Decimal(decimal),
        value: value.to_string(),
    }
}

/// Bring a driver value to the declared scale and check it against the declared precision.
pub fn to_declared_scale(
    value: SqlDecimal,
    decimal: DecimalType,
    rounding: DecimalRounding,
) -> Result<SqlDecimal> {
    let rescaled = match rounding {
        DecimalRounding::Exact => value.rescale_exact(decimal.scale()),
        DecimalRounding::HalfUp => value.rescale_half_up(decimal.scale()),
    }
    .ok_or_else(|| overflow(decimal, value))?;
    if !rescaled.fits(decimal) {
        return Err(overflow(decimal, value));
    }
    Ok(rescaled)
}

/// Compact form: the unscaled value at the declared scale, exactness-checked into `i64`.
pub fn to_compact(
    value: SqlDecimal,
    decimal: DecimalType,
    rounding: DecimalRounding,
) -> Result<i64> {
    let rescaled = to_declared_scale(value, decimal, rounding)?;
    i64::try_from(rescaled.unscaled()).map_err(|_| overflow(decimal, value))
}

/// Extended form: the unscaled value at the declared scale as 16 little-endian bytes.
pub fn to_extended(
    value: SqlDecimal,
    decimal: DecimalType,
    rounding: DecimalRounding,
) -> Result<Vec<u8>> {
    let rescaled = to_declared_scale(value, decimal, rounding)?;
    Ok(encode_long_decimal(rescaled.unscaled()))
}

pub fn encode_long_decimal(unscaled: i128) -> Vec<u8> {
    unscaled.to_le_bytes().to_vec()
}

pub fn decode_long_decimal(bytes: &[u8]) -> Option<i128> {
    <[u8; LONG_DECIMAL_BYTES]>::try_from(bytes)
        .ok()
        .map(i128::from_le_bytes)
}

/// Internal form for `decimal`: compact or extended depending only on the declared precision.
pub fn to_internal(
    value: SqlDecimal,
    decimal: DecimalType,
    rounding: DecimalRounding,
) -> Result<InternalValue> {
    if decimal.is_short() {
        to_compact(value, decimal, rounding).map(InternalValue::Long)
    } else {
        to_extended(value, decimal, rounding).map(InternalValue::Slice)
    }
}

/// Inverse of [`to_internal`]: the decimal at the declared scale.
pub fn from_internal(value: &InternalValue, decimal: DecimalType) -> Result<SqlDecimal> {
    let semantic_type = SemanticType::Decimal(decimal);
    let unscaled = if decimal.is_short() {
        i128::from(value.expect_long(&semantic_type)?)
    } else {
        let bytes = value.expect_slice(&semantic_type)?;
        decode_long_decimal(bytes).ok_or_else(|| {
            BridgeError::invalid(
                &semantic_type,
                format!("expected {LONG_DECIMAL_BYTES} bytes, got {}", bytes.len()),
            )
        })?
    };
    let result = SqlDecimal::new(unscaled, decimal.scale());
    if !result.fits(decimal) {
        return Err(overflow(decimal, result));
    }
    Ok(result)
}

/// Round half-up to the declared scale, then bound to the declared precision.
pub fn round_to_declared(value: SqlDecimal, decimal: DecimalType) -> Result<SqlDecimal> {
    to_declared_scale(value, decimal, DecimalRounding::HalfUp)
}
