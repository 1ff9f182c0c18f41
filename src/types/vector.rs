use super::scalar::ScalarValue;
use super::value_type::ValueType;
use crate::errors::{AxialError, AxialResult};
use crate::{dispatch_vector, for_each_value_kind, map_vector, zip_vectors};

/// Dense per-kind element storage shared by vectors and matrices.
///
/// A `VectorData` is just the values; the repository binds it to an axis
/// (vectors) or an axis pair plus a layout (matrices).
#[derive(Debug, Clone, PartialEq)]
pub enum VectorData {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

macro_rules! vector_conversions {
    ($(($variant:ident, $ty:ty)),+ $(,)?) => {
        $(
            impl From<Vec<$ty>> for VectorData {
                fn from(values: Vec<$ty>) -> Self {
                    VectorData::$variant(values)
                }
            }
        )+
        paste::paste! {
            impl VectorData {
                $(
                    pub fn [<as_ $variant:lower _slice>](&self) -> Option<&[$ty]> {
                        match self {
                            VectorData::$variant(values) => Some(values),
                            _ => None,
                        }
                    }
                )+
            }
        }
    };
}

for_each_value_kind!(vector_conversions);

impl VectorData {
    pub fn kind(&self) -> ValueType {
        match self {
            VectorData::I8(_) => ValueType::I8,
            VectorData::I16(_) => ValueType::I16,
            VectorData::I32(_) => ValueType::I32,
            VectorData::I64(_) => ValueType::I64,
            VectorData::U8(_) => ValueType::U8,
            VectorData::U16(_) => ValueType::U16,
            VectorData::U32(_) => ValueType::U32,
            VectorData::U64(_) => ValueType::U64,
            VectorData::F32(_) => ValueType::F32,
            VectorData::F64(_) => ValueType::F64,
            VectorData::Bool(_) => ValueType::Bool,
            VectorData::Str(_) => ValueType::Str,
        }
    }

    pub fn len(&self) -> usize {
        dispatch_vector!(self, data => data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value_at(&self, index: usize) -> ScalarValue {
        match self {
            VectorData::I8(data) => ScalarValue::I8(data[index]),
            VectorData::I16(data) => ScalarValue::I16(data[index]),
            VectorData::I32(data) => ScalarValue::I32(data[index]),
            VectorData::I64(data) => ScalarValue::I64(data[index]),
            VectorData::U8(data) => ScalarValue::U8(data[index]),
            VectorData::U16(data) => ScalarValue::U16(data[index]),
            VectorData::U32(data) => ScalarValue::U32(data[index]),
            VectorData::U64(data) => ScalarValue::U64(data[index]),
            VectorData::F32(data) => ScalarValue::F32(data[index]),
            VectorData::F64(data) => ScalarValue::F64(data[index]),
            VectorData::Bool(data) => ScalarValue::Bool(data[index]),
            VectorData::Str(data) => ScalarValue::Str(data[index].clone()),
        }
    }

    /// A vector of `len` copies of the kind's neutral value.
    pub fn filled_default(kind: ValueType, len: usize) -> VectorData {
        VectorData::broadcast(&ScalarValue::default_of(kind), len)
    }

    /// A vector of `len` copies of `value`.
    pub fn broadcast(value: &ScalarValue, len: usize) -> VectorData {
        match value {
            ScalarValue::I8(v) => VectorData::I8(vec![*v; len]),
            ScalarValue::I16(v) => VectorData::I16(vec![*v; len]),
            ScalarValue::I32(v) => VectorData::I32(vec![*v; len]),
            ScalarValue::I64(v) => VectorData::I64(vec![*v; len]),
            ScalarValue::U8(v) => VectorData::U8(vec![*v; len]),
            ScalarValue::U16(v) => VectorData::U16(vec![*v; len]),
            ScalarValue::U32(v) => VectorData::U32(vec![*v; len]),
            ScalarValue::U64(v) => VectorData::U64(vec![*v; len]),
            ScalarValue::F32(v) => VectorData::F32(vec![*v; len]),
            ScalarValue::F64(v) => VectorData::F64(vec![*v; len]),
            ScalarValue::Bool(v) => VectorData::Bool(vec![*v; len]),
            ScalarValue::Str(v) => VectorData::Str(vec![v.clone(); len]),
        }
    }

    /// The entries at positions where `keep` is true.
    ///
    /// `keep` must be exactly as long as the vector.
    pub fn subset(&self, keep: &[bool]) -> VectorData {
        debug_assert_eq!(keep.len(), self.len());
        map_vector!(self, data => data
            .iter()
            .zip(keep)
            .filter(|(_, keep)| **keep)
            .map(|(value, _)| value.clone())
            .collect())
    }

    /// The entries at the given positions, in the given order.
    pub fn take(&self, indices: &[usize]) -> VectorData {
        map_vector!(self, data => indices.iter().map(|index| data[*index].clone()).collect())
    }

    pub fn as_bools(&self) -> Option<&[bool]> {
        self.as_bool_slice()
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        self.as_str_slice()
    }

    /// Numeric entries widened to `f64`.
    pub fn to_f64_vec(&self) -> AxialResult<Vec<f64>> {
        if !self.kind().is_numeric() {
            return Err(AxialError::type_mismatch(format!(
                "expected a numeric vector, got: {}",
                self.kind()
            )));
        }
        Ok(match self {
            VectorData::I8(data) => data.iter().map(|v| *v as f64).collect(),
            VectorData::I16(data) => data.iter().map(|v| *v as f64).collect(),
            VectorData::I32(data) => data.iter().map(|v| *v as f64).collect(),
            VectorData::I64(data) => data.iter().map(|v| *v as f64).collect(),
            VectorData::U8(data) => data.iter().map(|v| *v as f64).collect(),
            VectorData::U16(data) => data.iter().map(|v| *v as f64).collect(),
            VectorData::U32(data) => data.iter().map(|v| *v as f64).collect(),
            VectorData::U64(data) => data.iter().map(|v| *v as f64).collect(),
            VectorData::F32(data) => data.iter().map(|v| *v as f64).collect(),
            VectorData::F64(data) => data.clone(),
            VectorData::Bool(_) | VectorData::Str(_) => unreachable!(),
        })
    }

    /// Narrows `f64` values back into the given numeric or boolean kind.
    pub fn from_f64_vec(kind: ValueType, values: Vec<f64>) -> AxialResult<VectorData> {
        Ok(match kind {
            ValueType::I8 => VectorData::I8(values.into_iter().map(|v| v as i8).collect()),
            ValueType::I16 => VectorData::I16(values.into_iter().map(|v| v as i16).collect()),
            ValueType::I32 => VectorData::I32(values.into_iter().map(|v| v as i32).collect()),
            ValueType::I64 => VectorData::I64(values.into_iter().map(|v| v as i64).collect()),
            ValueType::U8 => VectorData::U8(values.into_iter().map(|v| v as u8).collect()),
            ValueType::U16 => VectorData::U16(values.into_iter().map(|v| v as u16).collect()),
            ValueType::U32 => VectorData::U32(values.into_iter().map(|v| v as u32).collect()),
            ValueType::U64 => VectorData::U64(values.into_iter().map(|v| v as u64).collect()),
            ValueType::F32 => VectorData::F32(values.into_iter().map(|v| v as f32).collect()),
            ValueType::F64 => VectorData::F64(values),
            ValueType::Bool => VectorData::Bool(values.into_iter().map(|v| v != 0.0).collect()),
            ValueType::Str => {
                return Err(AxialError::type_mismatch(
                    "cannot build a str vector from numeric values",
                ))
            }
        })
    }

    /// Converts the elements to another kind.
    ///
    /// Numeric and boolean kinds convert freely (booleans as 0/1, numbers to
    /// booleans by non-zero); strings only convert to strings.
    pub fn cast_to(&self, kind: ValueType) -> AxialResult<VectorData> {
        if self.kind() == kind {
            return Ok(self.clone());
        }
        if self.kind() == ValueType::Str || kind == ValueType::Str {
            return Err(AxialError::type_mismatch(format!(
                "cannot cast {} to {}",
                self.kind(),
                kind
            )));
        }
        let widened = match self {
            VectorData::Bool(data) => data.iter().map(|v| if *v { 1.0 } else { 0.0 }).collect(),
            _ => self.to_f64_vec()?,
        };
        VectorData::from_f64_vec(kind, widened)
    }

    /// Elementwise equality against another vector of the same kind.
    pub fn elementwise_equals(&self, other: &VectorData) -> bool {
        zip_vectors!(self, other, a, b => a == b, else => false)
    }

    /// Overwrites one entry with a scalar of the same kind.
    pub fn set_value(&mut self, index: usize, value: &ScalarValue) -> AxialResult<()> {
        let vector_kind = self.kind();
        let value_kind = value.kind();
        crate::zip_vector_scalar!(self, value, data, v => {
            data[index] = v.clone();
            Ok(())
        }, else => Err(AxialError::type_mismatch(format!(
            "cannot store a {} value in a {} vector",
            value_kind, vector_kind
        ))))
    }

    /// Collects scalars of a uniform kind into a vector.
    pub fn from_scalars(kind: ValueType, values: Vec<ScalarValue>) -> AxialResult<VectorData> {
        let mut out = VectorData::filled_default(kind, values.len());
        for (index, value) in values.iter().enumerate() {
            out.set_value(index, value)?;
        }
        Ok(out)
    }
}

/// A sparse vector: explicit entries at `indices`, neutral values elsewhere.
///
/// Backends may store vectors in this form; queries always observe the dense
/// materialization.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVector {
    length: usize,
    indices: Vec<usize>,
    values: VectorData,
}

impl SparseVector {
    pub fn new(length: usize, indices: Vec<usize>, values: VectorData) -> AxialResult<SparseVector> {
        if indices.len() != values.len() {
            return Err(AxialError::shape_mismatch(format!(
                "sparse vector with {} indices but {} values",
                indices.len(),
                values.len()
            )));
        }
        if let Some(out_of_range) = indices.iter().find(|index| **index >= length) {
            return Err(AxialError::shape_mismatch(format!(
                "sparse vector index {} is out of range for length {}",
                out_of_range, length
            )));
        }
        Ok(SparseVector {
            length,
            indices,
            values,
        })
    }

    /// Zeroed storage for `nnz` entries, to be populated by the caller.
    pub fn with_capacity(kind: ValueType, length: usize, nnz: usize) -> SparseVector {
        SparseVector {
            length,
            indices: vec![0; nnz],
            values: VectorData::filled_default(kind, nnz),
        }
    }

    pub fn kind(&self) -> ValueType {
        self.values.kind()
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn values(&self) -> &VectorData {
        &self.values
    }

    pub fn indices_mut(&mut self) -> &mut [usize] {
        &mut self.indices
    }

    pub fn values_mut(&mut self) -> &mut VectorData {
        &mut self.values
    }

    /// Scatters the stored entries into a dense vector.
    pub fn to_dense(&self) -> VectorData {
        let mut dense = VectorData::filled_default(self.kind(), self.length);
        zip_vectors!(&self.values, &mut dense, values, dense_values => {
            for (position, index) in self.indices.iter().enumerate() {
                dense_values[*index] = values[position].clone();
            }
        }, else => unreachable!("sparse values and their dense image share a kind"));
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_and_subset() {
        let values = VectorData::broadcast(&ScalarValue::I64(7), 4);
        assert_eq!(values, VectorData::from(vec![7i64, 7, 7, 7]));
        let kept = values.subset(&[true, false, false, true]);
        assert_eq!(kept, VectorData::from(vec![7i64, 7]));
    }

    #[test]
    fn test_take_reorders() {
        let values = VectorData::from(vec!["a".to_string(), "b".into(), "c".into()]);
        let taken = values.take(&[2, 0, 2]);
        assert_eq!(
            taken,
            VectorData::from(vec!["c".to_string(), "a".into(), "c".into()])
        );
    }

    #[test]
    fn test_cast() {
        let values = VectorData::from(vec![1i64, 0, 3]);
        assert_eq!(
            values.cast_to(ValueType::F64).unwrap(),
            VectorData::from(vec![1.0f64, 0.0, 3.0])
        );
        assert_eq!(
            values.cast_to(ValueType::Bool).unwrap(),
            VectorData::from(vec![true, false, true])
        );
        assert!(values.cast_to(ValueType::Str).is_err());
    }

    #[test]
    fn test_sparse_to_dense() {
        let sparse =
            SparseVector::new(5, vec![1, 3], VectorData::from(vec![10i32, 30])).unwrap();
        assert_eq!(
            sparse.to_dense(),
            VectorData::from(vec![0i32, 10, 0, 30, 0])
        );
    }

    #[test]
    fn test_sparse_rejects_bad_shape() {
        assert!(SparseVector::new(2, vec![0, 1, 5], VectorData::from(vec![1i8, 2, 3])).is_err());
        assert!(SparseVector::new(2, vec![0], VectorData::from(vec![1i8, 2])).is_err());
    }
}
