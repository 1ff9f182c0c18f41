//! Human-readable names and value formatting for logs and errors.

use crate::types::{MatrixData, ScalarValue, VectorData};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::collections::HashMap;

lazy_static! {
    static ref USED_NAMES: Mutex<HashMap<String, u64>> = Mutex::new(HashMap::new());
}

/// Returns `base` the first time it is requested, then `base.1`, `base.2`, …
///
/// The allocation is per-process; there is no way to release a name.
pub fn unique_name(base: &str) -> String {
    let mut used = USED_NAMES.lock();
    let count = used.entry(base.to_string()).or_insert(0);
    *count += 1;
    if *count == 1 {
        base.to_string()
    } else {
        format!("{}.{}", base, *count - 1)
    }
}

/// Snapshot of the unique-name counters, for tests.
pub fn unique_names_snapshot() -> HashMap<String, u64> {
    USED_NAMES.lock().clone()
}

/// Restores a previously taken snapshot, for tests.
pub fn restore_unique_names(snapshot: HashMap<String, u64>) {
    *USED_NAMES.lock() = snapshot;
}

/// Formats a scalar for human display: strings quoted, floats with six
/// significant digits, everything else as-is.
pub fn present(value: &ScalarValue) -> String {
    match value {
        ScalarValue::F32(v) => present_float(*v as f64),
        ScalarValue::F64(v) => present_float(*v),
        ScalarValue::Str(v) => {
            serde_json::to_string(v).unwrap_or_else(|_| format!("{:?}", v))
        }
        other => other.to_string(),
    }
}

/// Summarizes a vector as its shape and element kind.
pub fn present_vector(values: &VectorData) -> String {
    format!("{} x {}", values.len(), values.kind())
}

/// Summarizes a matrix as its shape, element kind and layout.
pub fn present_matrix(matrix: &MatrixData) -> String {
    let (rows, cols) = matrix.shape();
    format!("{} x {} x {} ({})", rows, cols, matrix.kind(), matrix.layout())
}

fn present_float(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    let magnitude = value.abs();
    if (1e-4..1e15).contains(&magnitude) {
        let digits = (5.0 - magnitude.log10().floor()).max(0.0) as usize;
        let mut text = format!("{:.*}", digits, value);
        if text.contains('.') {
            text = text
                .trim_end_matches('0')
                .trim_end_matches('.')
                .to_string();
        }
        text
    } else {
        format!("{:e}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DenseMatrix, VectorData};

    #[test]
    fn test_unique_name_suffixes() {
        let snapshot = unique_names_snapshot();
        let base = "query-context";
        assert_eq!(unique_name(base), "query-context");
        assert_eq!(unique_name(base), "query-context.1");
        assert_eq!(unique_name(base), "query-context.2");
        restore_unique_names(snapshot);
    }

    #[test]
    fn test_present_scalars() {
        assert_eq!(present(&ScalarValue::I64(42)), "42");
        assert_eq!(present(&ScalarValue::Bool(true)), "true");
        assert_eq!(present(&ScalarValue::Str("red".into())), "\"red\"");
        assert_eq!(present(&ScalarValue::F64(0.0)), "0");
        assert_eq!(present(&ScalarValue::F64(2.5)), "2.5");
        assert_eq!(present(&ScalarValue::F64(1.0 / 3.0)), "0.333333");
    }

    #[test]
    fn test_present_arrays() {
        let vector = VectorData::from(vec![1i64, 2, 3]);
        assert_eq!(present_vector(&vector), "3 x i64");
        let matrix = crate::types::MatrixData::Dense(
            DenseMatrix::row_major(VectorData::from(vec![0i32; 6]), 2, 3).unwrap(),
        );
        assert_eq!(present_matrix(&matrix), "2 x 3 x i32 (row-major)");
    }
}
