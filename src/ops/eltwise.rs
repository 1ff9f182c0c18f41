//! Built-in element-wise operations.

use super::{EltwiseOperation, OperationEntry, ParamKind, ParamSpec, ParamValue};
use crate::errors::{AxialError, AxialResult};
use crate::layout::{relayout, AxisSide};
use crate::types::{DenseMatrix, MatrixData, SparseMatrix, ValueType, VectorData};
use std::collections::HashMap;
use std::sync::Arc;

fn require_numeric(operation: &str, values: &VectorData) -> AxialResult<()> {
    if values.kind().is_numeric() {
        Ok(())
    } else {
        Err(AxialError::type_mismatch(format!(
            "expected a numeric vector, got: {}",
            values.kind()
        ))
        .for_context("operation", operation))
    }
}

pub(crate) struct Abs;

impl EltwiseOperation for Abs {
    fn name(&self) -> &str {
        "Abs"
    }

    fn apply_vector(&self, values: &VectorData) -> AxialResult<VectorData> {
        require_numeric("Abs", values)?;
        Ok(match values {
            VectorData::I8(data) => VectorData::I8(data.iter().map(|v| v.wrapping_abs()).collect()),
            VectorData::I16(data) => {
                VectorData::I16(data.iter().map(|v| v.wrapping_abs()).collect())
            }
            VectorData::I32(data) => {
                VectorData::I32(data.iter().map(|v| v.wrapping_abs()).collect())
            }
            VectorData::I64(data) => {
                VectorData::I64(data.iter().map(|v| v.wrapping_abs()).collect())
            }
            VectorData::F32(data) => VectorData::F32(data.iter().map(|v| v.abs()).collect()),
            VectorData::F64(data) => VectorData::F64(data.iter().map(|v| v.abs()).collect()),
            unsigned => unsigned.clone(),
        })
    }
}

macro_rules! float_rounding_operation {
    ($name:ident, $label:literal, $method:ident) => {
        pub(crate) struct $name;

        impl EltwiseOperation for $name {
            fn name(&self) -> &str {
                $label
            }

            fn apply_vector(&self, values: &VectorData) -> AxialResult<VectorData> {
                require_numeric($label, values)?;
                Ok(match values {
                    VectorData::F32(data) => {
                        VectorData::F32(data.iter().map(|v| v.$method()).collect())
                    }
                    VectorData::F64(data) => {
                        VectorData::F64(data.iter().map(|v| v.$method()).collect())
                    }
                    integral => integral.clone(),
                })
            }
        }
    };
}

float_rounding_operation!(Round, "Round", round);
float_rounding_operation!(Ceil, "Ceil", ceil);
float_rounding_operation!(Floor, "Floor", floor);

pub(crate) struct Clamp {
    min: Option<f64>,
    max: Option<f64>,
}

impl EltwiseOperation for Clamp {
    fn name(&self) -> &str {
        "Clamp"
    }

    fn apply_vector(&self, values: &VectorData) -> AxialResult<VectorData> {
        require_numeric("Clamp", values)?;
        let mut raw = values.to_f64_vec()?;
        for value in &mut raw {
            if let Some(min) = self.min {
                *value = value.max(min);
            }
            if let Some(max) = self.max {
                *value = value.min(max);
            }
        }
        VectorData::from_f64_vec(values.kind(), raw)
    }
}

pub(crate) struct Cast {
    kind: ValueType,
}

impl EltwiseOperation for Cast {
    fn name(&self) -> &str {
        "Cast"
    }

    fn apply_vector(&self, values: &VectorData) -> AxialResult<VectorData> {
        values
            .cast_to(self.kind)
            .map_err(|error| error.for_context("operation", "Cast"))
    }
}

pub(crate) struct Log {
    base: f64,
    eps: f64,
}

impl EltwiseOperation for Log {
    fn name(&self) -> &str {
        "Log"
    }

    fn apply_vector(&self, values: &VectorData) -> AxialResult<VectorData> {
        require_numeric("Log", values)?;
        let raw = values.to_f64_vec()?;
        Ok(VectorData::F64(
            raw.into_iter().map(|v| (v + self.eps).log(self.base)).collect(),
        ))
    }
}

/// Each entry divided by the total of its vector (or matrix column).
///
/// Totals of zero leave the entries at zero rather than dividing by zero.
pub(crate) struct Fraction;

impl Fraction {
    fn fractions(raw: Vec<f64>) -> Vec<f64> {
        let total: f64 = raw.iter().sum();
        if total == 0.0 {
            return vec![0.0; raw.len()];
        }
        raw.into_iter().map(|v| v / total).collect()
    }
}

impl EltwiseOperation for Fraction {
    fn name(&self) -> &str {
        "Fraction"
    }

    fn apply_vector(&self, values: &VectorData) -> AxialResult<VectorData> {
        require_numeric("Fraction", values)?;
        Ok(VectorData::F64(Self::fractions(values.to_f64_vec()?)))
    }

    fn apply_matrix(&self, matrix: &MatrixData) -> AxialResult<MatrixData> {
        require_numeric("Fraction", matrix.values_data())?;
        let by_columns = relayout(matrix, AxisSide::Columns);
        let result = match &by_columns {
            MatrixData::Dense(m) => {
                let raw = m.data().to_f64_vec()?;
                let rows = m.rows();
                let mut out = Vec::with_capacity(raw.len());
                for column in raw.chunks(rows.max(1)) {
                    out.extend(Self::fractions(column.to_vec()));
                }
                MatrixData::Dense(DenseMatrix::new(
                    VectorData::F64(out),
                    m.rows(),
                    m.cols(),
                    AxisSide::Columns,
                )?)
            }
            MatrixData::Sparse(m) => {
                let raw = m.values().to_f64_vec()?;
                let mut out = Vec::with_capacity(raw.len());
                for slot in 0..m.major_len() {
                    let column = raw[m.offsets()[slot]..m.offsets()[slot + 1]].to_vec();
                    out.extend(Self::fractions(column));
                }
                MatrixData::Sparse(SparseMatrix::new(
                    m.rows(),
                    m.cols(),
                    AxisSide::Columns,
                    m.offsets().to_vec(),
                    m.indices().to_vec(),
                    VectorData::F64(out),
                )?)
            }
        };
        Ok(relayout(&result, matrix.major_axis()))
    }
}

pub(crate) fn install_builtins(operations: &mut HashMap<String, Arc<OperationEntry>>) {
    super::install(
        operations,
        OperationEntry::eltwise("Abs", vec![], |_params| Ok(Box::new(Abs))),
    );
    super::install(
        operations,
        OperationEntry::eltwise("Round", vec![], |_params| Ok(Box::new(Round))),
    );
    super::install(
        operations,
        OperationEntry::eltwise("Ceil", vec![], |_params| Ok(Box::new(Ceil))),
    );
    super::install(
        operations,
        OperationEntry::eltwise("Floor", vec![], |_params| Ok(Box::new(Floor))),
    );
    super::install(
        operations,
        OperationEntry::eltwise(
            "Clamp",
            vec![
                ParamSpec::optional("min", ParamKind::Float, None),
                ParamSpec::optional("max", ParamKind::Float, None),
            ],
            |params| {
                let min = params.float("min");
                let max = params.float("max");
                if min.is_none() && max.is_none() {
                    return Err(AxialError::invalid_parameter(
                        "missing parameter: min or max",
                    )
                    .for_context("operation", "Clamp"));
                }
                Ok(Box::new(Clamp { min, max }))
            },
        ),
    );
    super::install(
        operations,
        OperationEntry::eltwise(
            "Cast",
            vec![ParamSpec::required("dtype", ParamKind::Dtype)],
            |params| {
                let kind = params.dtype("dtype").ok_or_else(|| {
                    AxialError::invalid_parameter("missing parameter: dtype")
                        .for_context("operation", "Cast")
                })?;
                Ok(Box::new(Cast { kind }))
            },
        ),
    );
    super::install(
        operations,
        OperationEntry::eltwise(
            "Log",
            vec![
                ParamSpec::optional(
                    "base",
                    ParamKind::Float,
                    Some(ParamValue::Float(std::f64::consts::E)),
                ),
                ParamSpec::optional("eps", ParamKind::Float, Some(ParamValue::Float(0.0))),
            ],
            |params| {
                Ok(Box::new(Log {
                    base: params.float("base").unwrap_or(std::f64::consts::E),
                    eps: params.float("eps").unwrap_or(0.0),
                }))
            },
        ),
    );
    super::install(
        operations,
        OperationEntry::eltwise("Fraction", vec![], |_params| Ok(Box::new(Fraction))),
    );
}
