use super::value_type::ValueType;
use crate::errors::{AxialError, AxialResult};
use crate::{dispatch_scalar, for_each_value_kind};
use std::fmt;

/// A single storable value, tagged with its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Str(String),
}

macro_rules! scalar_conversions {
    ($(($variant:ident, $ty:ty)),+ $(,)?) => {
        $(
            impl From<$ty> for ScalarValue {
                fn from(value: $ty) -> Self {
                    ScalarValue::$variant(value)
                }
            }
        )+
        paste::paste! {
            impl ScalarValue {
                $(
                    pub fn [<as_ $variant:lower>](&self) -> Option<&$ty> {
                        match self {
                            ScalarValue::$variant(value) => Some(value),
                            _ => None,
                        }
                    }
                )+
            }
        }
    };
}

for_each_value_kind!(scalar_conversions);

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Str(value.to_string())
    }
}

macro_rules! parse_literal {
    ($text:expr, $variant:ident, $kind:expr) => {
        $text.trim().parse().map(ScalarValue::$variant).map_err(|_| {
            AxialError::type_mismatch(format!(
                "invalid {} literal: {}",
                $kind.name(),
                $text
            ))
        })
    };
}

impl ScalarValue {
    pub fn kind(&self) -> ValueType {
        match self {
            ScalarValue::I8(_) => ValueType::I8,
            ScalarValue::I16(_) => ValueType::I16,
            ScalarValue::I32(_) => ValueType::I32,
            ScalarValue::I64(_) => ValueType::I64,
            ScalarValue::U8(_) => ValueType::U8,
            ScalarValue::U16(_) => ValueType::U16,
            ScalarValue::U32(_) => ValueType::U32,
            ScalarValue::U64(_) => ValueType::U64,
            ScalarValue::F32(_) => ValueType::F32,
            ScalarValue::F64(_) => ValueType::F64,
            ScalarValue::Bool(_) => ValueType::Bool,
            ScalarValue::Str(_) => ValueType::Str,
        }
    }

    /// The kind's neutral value: numeric zero, `false`, or the empty string.
    pub fn default_of(kind: ValueType) -> ScalarValue {
        match kind {
            ValueType::I8 => ScalarValue::I8(0),
            ValueType::I16 => ScalarValue::I16(0),
            ValueType::I32 => ScalarValue::I32(0),
            ValueType::I64 => ScalarValue::I64(0),
            ValueType::U8 => ScalarValue::U8(0),
            ValueType::U16 => ScalarValue::U16(0),
            ValueType::U32 => ScalarValue::U32(0),
            ValueType::U64 => ScalarValue::U64(0),
            ValueType::F32 => ScalarValue::F32(0.0),
            ValueType::F64 => ScalarValue::F64(0.0),
            ValueType::Bool => ScalarValue::Bool(false),
            ValueType::Str => ScalarValue::Str(String::new()),
        }
    }

    /// Parses a textual literal into the given kind.
    ///
    /// Used for comparison literals in queries, so failures are type
    /// mismatches naming both the kind and the offending text.
    pub fn parse_as(kind: ValueType, text: &str) -> AxialResult<ScalarValue> {
        match kind {
            ValueType::I8 => parse_literal!(text, I8, kind),
            ValueType::I16 => parse_literal!(text, I16, kind),
            ValueType::I32 => parse_literal!(text, I32, kind),
            ValueType::I64 => parse_literal!(text, I64, kind),
            ValueType::U8 => parse_literal!(text, U8, kind),
            ValueType::U16 => parse_literal!(text, U16, kind),
            ValueType::U32 => parse_literal!(text, U32, kind),
            ValueType::U64 => parse_literal!(text, U64, kind),
            ValueType::F32 => parse_literal!(text, F32, kind),
            ValueType::F64 => parse_literal!(text, F64, kind),
            ValueType::Bool => parse_literal!(text, Bool, kind),
            ValueType::Str => Ok(ScalarValue::Str(text.to_string())),
        }
    }

    /// Numeric value widened to `f64`; `None` for booleans and strings.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::I8(v) => Some(*v as f64),
            ScalarValue::I16(v) => Some(*v as f64),
            ScalarValue::I32(v) => Some(*v as f64),
            ScalarValue::I64(v) => Some(*v as f64),
            ScalarValue::U8(v) => Some(*v as f64),
            ScalarValue::U16(v) => Some(*v as f64),
            ScalarValue::U32(v) => Some(*v as f64),
            ScalarValue::U64(v) => Some(*v as f64),
            ScalarValue::F32(v) => Some(*v as f64),
            ScalarValue::F64(v) => Some(*v),
            ScalarValue::Bool(_) | ScalarValue::Str(_) => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch_scalar!(self, v => write!(f, "{}", v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(ScalarValue::from(1i64).kind(), ValueType::I64);
        assert_eq!(ScalarValue::from(true).kind(), ValueType::Bool);
        assert_eq!(ScalarValue::from("x").kind(), ValueType::Str);
    }

    #[test]
    fn test_parse_as() {
        assert_eq!(
            ScalarValue::parse_as(ValueType::I32, "15").unwrap(),
            ScalarValue::I32(15)
        );
        assert_eq!(
            ScalarValue::parse_as(ValueType::F64, "2.5").unwrap(),
            ScalarValue::F64(2.5)
        );
        assert_eq!(
            ScalarValue::parse_as(ValueType::Str, "red").unwrap(),
            ScalarValue::Str("red".to_string())
        );
        assert!(ScalarValue::parse_as(ValueType::U8, "-1").is_err());
        assert!(ScalarValue::parse_as(ValueType::I64, "abc").is_err());
    }

    #[test]
    fn test_accessors() {
        assert_eq!(ScalarValue::I8(3).as_i8(), Some(&3));
        assert_eq!(ScalarValue::I8(3).as_f64(), None);
        assert_eq!(ScalarValue::U64(7).to_f64(), Some(7.0));
        assert_eq!(ScalarValue::Str("x".into()).to_f64(), None);
    }
}
