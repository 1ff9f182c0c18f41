//! Per-kind dispatch macros for the storage unions.
//!
//! The storable element kinds form a closed set, so operations generic over
//! kinds are expressed as per-kind monomorphizations selected at dispatch
//! time. These macros expand one match arm per kind; the body is compiled
//! once per element type.

/// Expand a callback macro once per storable kind as `(Variant, rust_type)`.
#[macro_export]
macro_rules! for_each_value_kind {
    ($callback:ident) => {
        $callback!(
            (I8, i8),
            (I16, i16),
            (I32, i32),
            (I64, i64),
            (U8, u8),
            (U16, u16),
            (U32, u32),
            (U64, u64),
            (F32, f32),
            (F64, f64),
            (Bool, bool),
            (Str, String)
        );
    };
}

/// Dispatch over every [`ScalarValue`] variant, binding the payload.
///
/// [`ScalarValue`]: crate::types::ScalarValue
#[macro_export]
macro_rules! dispatch_scalar {
    ($value:expr, $v:ident => $body:expr) => {
        match $value {
            $crate::types::ScalarValue::I8($v) => $body,
            $crate::types::ScalarValue::I16($v) => $body,
            $crate::types::ScalarValue::I32($v) => $body,
            $crate::types::ScalarValue::I64($v) => $body,
            $crate::types::ScalarValue::U8($v) => $body,
            $crate::types::ScalarValue::U16($v) => $body,
            $crate::types::ScalarValue::U32($v) => $body,
            $crate::types::ScalarValue::U64($v) => $body,
            $crate::types::ScalarValue::F32($v) => $body,
            $crate::types::ScalarValue::F64($v) => $body,
            $crate::types::ScalarValue::Bool($v) => $body,
            $crate::types::ScalarValue::Str($v) => $body,
        }
    };
}

/// Dispatch over every [`VectorData`] variant, binding the element vector.
///
/// [`VectorData`]: crate::types::VectorData
#[macro_export]
macro_rules! dispatch_vector {
    ($value:expr, $data:ident => $body:expr) => {
        match $value {
            $crate::types::VectorData::I8($data) => $body,
            $crate::types::VectorData::I16($data) => $body,
            $crate::types::VectorData::I32($data) => $body,
            $crate::types::VectorData::I64($data) => $body,
            $crate::types::VectorData::U8($data) => $body,
            $crate::types::VectorData::U16($data) => $body,
            $crate::types::VectorData::U32($data) => $body,
            $crate::types::VectorData::U64($data) => $body,
            $crate::types::VectorData::F32($data) => $body,
            $crate::types::VectorData::F64($data) => $body,
            $crate::types::VectorData::Bool($data) => $body,
            $crate::types::VectorData::Str($data) => $body,
        }
    };
}

/// Like [`dispatch_vector!`] but rebuilds the same variant from the body.
#[macro_export]
macro_rules! map_vector {
    ($value:expr, $data:ident => $body:expr) => {
        match $value {
            $crate::types::VectorData::I8($data) => $crate::types::VectorData::I8($body),
            $crate::types::VectorData::I16($data) => $crate::types::VectorData::I16($body),
            $crate::types::VectorData::I32($data) => $crate::types::VectorData::I32($body),
            $crate::types::VectorData::I64($data) => $crate::types::VectorData::I64($body),
            $crate::types::VectorData::U8($data) => $crate::types::VectorData::U8($body),
            $crate::types::VectorData::U16($data) => $crate::types::VectorData::U16($body),
            $crate::types::VectorData::U32($data) => $crate::types::VectorData::U32($body),
            $crate::types::VectorData::U64($data) => $crate::types::VectorData::U64($body),
            $crate::types::VectorData::F32($data) => $crate::types::VectorData::F32($body),
            $crate::types::VectorData::F64($data) => $crate::types::VectorData::F64($body),
            $crate::types::VectorData::Bool($data) => $crate::types::VectorData::Bool($body),
            $crate::types::VectorData::Str($data) => $crate::types::VectorData::Str($body),
        }
    };
}

/// Dispatch two [`VectorData`] values that must share a kind.
///
/// [`VectorData`]: crate::types::VectorData
#[macro_export]
macro_rules! zip_vectors {
    ($a:expr, $b:expr, $x:ident, $y:ident => $body:expr, else => $mismatch:expr) => {
        match ($a, $b) {
            ($crate::types::VectorData::I8($x), $crate::types::VectorData::I8($y)) => $body,
            ($crate::types::VectorData::I16($x), $crate::types::VectorData::I16($y)) => $body,
            ($crate::types::VectorData::I32($x), $crate::types::VectorData::I32($y)) => $body,
            ($crate::types::VectorData::I64($x), $crate::types::VectorData::I64($y)) => $body,
            ($crate::types::VectorData::U8($x), $crate::types::VectorData::U8($y)) => $body,
            ($crate::types::VectorData::U16($x), $crate::types::VectorData::U16($y)) => $body,
            ($crate::types::VectorData::U32($x), $crate::types::VectorData::U32($y)) => $body,
            ($crate::types::VectorData::U64($x), $crate::types::VectorData::U64($y)) => $body,
            ($crate::types::VectorData::F32($x), $crate::types::VectorData::F32($y)) => $body,
            ($crate::types::VectorData::F64($x), $crate::types::VectorData::F64($y)) => $body,
            ($crate::types::VectorData::Bool($x), $crate::types::VectorData::Bool($y)) => $body,
            ($crate::types::VectorData::Str($x), $crate::types::VectorData::Str($y)) => $body,
            _ => $mismatch,
        }
    };
}

/// Dispatch a [`VectorData`] against a [`ScalarValue`] of the same kind.
///
/// [`VectorData`]: crate::types::VectorData
/// [`ScalarValue`]: crate::types::ScalarValue
#[macro_export]
macro_rules! zip_vector_scalar {
    ($vec:expr, $scalar:expr, $data:ident, $v:ident => $body:expr, else => $mismatch:expr) => {
        match ($vec, $scalar) {
            ($crate::types::VectorData::I8($data), $crate::types::ScalarValue::I8($v)) => $body,
            ($crate::types::VectorData::I16($data), $crate::types::ScalarValue::I16($v)) => $body,
            ($crate::types::VectorData::I32($data), $crate::types::ScalarValue::I32($v)) => $body,
            ($crate::types::VectorData::I64($data), $crate::types::ScalarValue::I64($v)) => $body,
            ($crate::types::VectorData::U8($data), $crate::types::ScalarValue::U8($v)) => $body,
            ($crate::types::VectorData::U16($data), $crate::types::ScalarValue::U16($v)) => $body,
            ($crate::types::VectorData::U32($data), $crate::types::ScalarValue::U32($v)) => $body,
            ($crate::types::VectorData::U64($data), $crate::types::ScalarValue::U64($v)) => $body,
            ($crate::types::VectorData::F32($data), $crate::types::ScalarValue::F32($v)) => $body,
            ($crate::types::VectorData::F64($data), $crate::types::ScalarValue::F64($v)) => $body,
            ($crate::types::VectorData::Bool($data), $crate::types::ScalarValue::Bool($v)) => $body,
            ($crate::types::VectorData::Str($data), $crate::types::ScalarValue::Str($v)) => $body,
            _ => $mismatch,
        }
    };
}
