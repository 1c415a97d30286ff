use crate::error::{BridgeError, Result};
use crate::types::{InternalKind, SemanticType};

/// Internal (columnar) encoding of a single non-null value.
///
/// Null is modelled as `Option::None` by every API that can observe it, never as a sentinel.
/// The variant used for a given [`SemanticType`] is fixed by the type alone (see
/// [`crate::types::TypeCategory::internal_kind`]).
#[derive(Debug, Clone, PartialEq)]
pub enum InternalValue {
    /// Booleans (0/1), exact integers, REAL bit patterns, dates (days since epoch), times
    /// (millis of day), timestamps (epoch millis) and compact decimals (unscaled).
    Long(i64),
    Double(f64),
    /// UTF-8 text, raw binary and extended decimals.
    Slice(Vec<u8>),
    Array(Vec<Option<InternalValue>>),
}

impl InternalValue {
    pub fn boolean(value: bool) -> Self {
        InternalValue::Long(i64::from(value))
    }

    /// Store the raw IEEE-754 bit pattern of `value`, sign-extended from 32 bits.
    pub fn real(value: f32) -> Self {
        InternalValue::Long(real_to_bits(value))
    }

    pub fn text(value: impl Into<String>) -> Self {
        InternalValue::Slice(value.into().into_bytes())
    }

    pub fn kind(&self) -> InternalKind {
        match self {
            InternalValue::Long(_) => InternalKind::Long,
            InternalValue::Double(_) => InternalKind::Double,
            InternalValue::Slice(_) => InternalKind::Slice,
            InternalValue::Array(_) => InternalKind::Array,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            InternalValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            InternalValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[u8]> {
        match self {
            InternalValue::Slice(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Option<InternalValue>]> {
        match self {
            InternalValue::Array(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn expect_long(&self, semantic_type: &SemanticType) -> Result<i64> {
        self.as_long()
            .ok_or_else(|| self.kind_mismatch(semantic_type, InternalKind::Long))
    }

    pub(crate) fn expect_double(&self, semantic_type: &SemanticType) -> Result<f64> {
        self.as_double()
            .ok_or_else(|| self.kind_mismatch(semantic_type, InternalKind::Double))
    }

    pub(crate) fn expect_slice(&self, semantic_type: &SemanticType) -> Result<&[u8]> {
        self.as_slice()
            .ok_or_else(|| self.kind_mismatch(semantic_type, InternalKind::Slice))
    }

    pub(crate) fn expect_text(&self, semantic_type: &SemanticType) -> Result<&str> {
        std::str::from_utf8(self.expect_slice(semantic_type)?)
            .map_err(|err| BridgeError::invalid(semantic_type, format!("not UTF-8: {err}")))
    }

    pub(crate) fn expect_array(
        &self,
        semantic_type: &SemanticType,
    ) -> Result<&[Option<InternalValue>]> {
        self.as_array()
            .ok_or_else(|| self.kind_mismatch(semantic_type, InternalKind::Array))
    }

    fn kind_mismatch(&self, semantic_type: &SemanticType, expected: InternalKind) -> BridgeError {
        BridgeError::invalid(
            semantic_type,
            format!("expected {expected:?} internal value, got {:?}", self.kind()),
        )
    }
}

impl From<i64> for InternalValue {
    fn from(value: i64) -> Self {
        InternalValue::Long(value)
    }
}

impl From<f64> for InternalValue {
    fn from(value: f64) -> Self {
        InternalValue::Double(value)
    }
}

impl From<&str> for InternalValue {
    fn from(value: &str) -> Self {
        InternalValue::text(value)
    }
}

impl From<String> for InternalValue {
    fn from(value: String) -> Self {
        InternalValue::text(value)
    }
}

impl From<Vec<u8>> for InternalValue {
    fn from(value: Vec<u8>) -> Self {
        InternalValue::Slice(value)
    }
}

pub(crate) fn real_to_bits(value: f32) -> i64 {
    i64::from(value.to_bits() as i32)
}

pub(crate) fn real_from_bits(bits: i64) -> Option<f32> {
    i32::try_from(bits).ok().map(|bits| f32::from_bits(bits as u32))
}
