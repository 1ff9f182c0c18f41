//! Built-in reduction operations.

use super::{OperationEntry, ParamKind, ParamSpec, ReduceOperation};
use crate::errors::{AxialError, AxialResult};
use crate::layout::AxisSide;
use crate::types::{ScalarValue, ValueType, VectorData};
use std::collections::HashMap;
use std::sync::Arc;

fn axis_schema() -> Vec<ParamSpec> {
    vec![ParamSpec::optional(
        "axis",
        ParamKind::Enum(&["Rows", "Columns"]),
        None,
    )]
}

pub(crate) struct Sum {
    axis: Option<AxisSide>,
}

impl ReduceOperation for Sum {
    fn name(&self) -> &str {
        "Sum"
    }

    fn survivor(&self) -> Option<AxisSide> {
        self.axis
    }

    fn result_kind(&self, input: ValueType) -> AxialResult<ValueType> {
        if input.is_signed() {
            Ok(ValueType::I64)
        } else if input.is_unsigned() {
            Ok(ValueType::U64)
        } else if input.is_float() {
            Ok(ValueType::F64)
        } else {
            Err(AxialError::type_mismatch(format!(
                "expected a numeric vector, got: {}",
                input
            ))
            .for_context("operation", "Sum"))
        }
    }

    fn reduce_vector(&self, values: &VectorData) -> AxialResult<ScalarValue> {
        self.result_kind(values.kind())?;
        Ok(match values {
            VectorData::I8(data) => ScalarValue::I64(data.iter().map(|v| *v as i64).sum()),
            VectorData::I16(data) => ScalarValue::I64(data.iter().map(|v| *v as i64).sum()),
            VectorData::I32(data) => ScalarValue::I64(data.iter().map(|v| *v as i64).sum()),
            VectorData::I64(data) => ScalarValue::I64(data.iter().sum()),
            VectorData::U8(data) => ScalarValue::U64(data.iter().map(|v| *v as u64).sum()),
            VectorData::U16(data) => ScalarValue::U64(data.iter().map(|v| *v as u64).sum()),
            VectorData::U32(data) => ScalarValue::U64(data.iter().map(|v| *v as u64).sum()),
            VectorData::U64(data) => ScalarValue::U64(data.iter().sum()),
            VectorData::F32(data) => ScalarValue::F64(data.iter().map(|v| *v as f64).sum()),
            VectorData::F64(data) => ScalarValue::F64(data.iter().sum()),
            VectorData::Bool(_) | VectorData::Str(_) => unreachable!(),
        })
    }
}

macro_rules! extremum_operation {
    ($name:ident, $label:literal, $int_pick:ident, $float_pick:ident) => {
        pub(crate) struct $name {
            axis: Option<AxisSide>,
        }

        impl ReduceOperation for $name {
            fn name(&self) -> &str {
                $label
            }

            fn survivor(&self) -> Option<AxisSide> {
                self.axis
            }

            fn result_kind(&self, input: ValueType) -> AxialResult<ValueType> {
                Ok(input)
            }

            fn reduce_vector(&self, values: &VectorData) -> AxialResult<ScalarValue> {
                let picked = match values {
                    VectorData::I8(data) => data.iter().$int_pick().map(|v| ScalarValue::I8(*v)),
                    VectorData::I16(data) => data.iter().$int_pick().map(|v| ScalarValue::I16(*v)),
                    VectorData::I32(data) => data.iter().$int_pick().map(|v| ScalarValue::I32(*v)),
                    VectorData::I64(data) => data.iter().$int_pick().map(|v| ScalarValue::I64(*v)),
                    VectorData::U8(data) => data.iter().$int_pick().map(|v| ScalarValue::U8(*v)),
                    VectorData::U16(data) => data.iter().$int_pick().map(|v| ScalarValue::U16(*v)),
                    VectorData::U32(data) => data.iter().$int_pick().map(|v| ScalarValue::U32(*v)),
                    VectorData::U64(data) => data.iter().$int_pick().map(|v| ScalarValue::U64(*v)),
                    VectorData::Bool(data) => {
                        data.iter().$int_pick().map(|v| ScalarValue::Bool(*v))
                    }
                    VectorData::Str(data) => {
                        data.iter().$int_pick().map(|v| ScalarValue::Str(v.clone()))
                    }
                    VectorData::F32(data) => {
                        data.iter().copied().reduce(f32::$float_pick).map(ScalarValue::F32)
                    }
                    VectorData::F64(data) => {
                        data.iter().copied().reduce(f64::$float_pick).map(ScalarValue::F64)
                    }
                };
                picked.ok_or_else(|| {
                    AxialError::shape_mismatch(concat!(
                        "reducing an empty vector with: ",
                        $label
                    ))
                })
            }
        }
    };
}

extremum_operation!(Min, "Min", min, min);
extremum_operation!(Max, "Max", max, max);

fn variance(raw: &[f64]) -> f64 {
    let mean = raw.iter().sum::<f64>() / raw.len() as f64;
    raw.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / raw.len() as f64
}

fn median(mut raw: Vec<f64>) -> f64 {
    raw.sort_by(f64::total_cmp);
    let middle = raw.len() / 2;
    if raw.len() % 2 == 1 {
        raw[middle]
    } else {
        (raw[middle - 1] + raw[middle]) / 2.0
    }
}

macro_rules! float_reduction {
    ($name:ident, $label:literal, |$data:ident| $compute:expr) => {
        pub(crate) struct $name {
            axis: Option<AxisSide>,
        }

        impl ReduceOperation for $name {
            fn name(&self) -> &str {
                $label
            }

            fn survivor(&self) -> Option<AxisSide> {
                self.axis
            }

            fn result_kind(&self, input: ValueType) -> AxialResult<ValueType> {
                if input.is_numeric() {
                    Ok(ValueType::F64)
                } else {
                    Err(AxialError::type_mismatch(format!(
                        "expected a numeric vector, got: {}",
                        input
                    ))
                    .for_context("operation", $label))
                }
            }

            fn reduce_vector(&self, values: &VectorData) -> AxialResult<ScalarValue> {
                self.result_kind(values.kind())?;
                let $data = values.to_f64_vec()?;
                if $data.is_empty() {
                    return Err(AxialError::shape_mismatch(concat!(
                        "reducing an empty vector with: ",
                        $label
                    )));
                }
                Ok(ScalarValue::F64($compute))
            }
        }
    };
}

float_reduction!(Mean, "Mean", |data| data.iter().sum::<f64>() / data.len() as f64);
float_reduction!(Var, "Var", |data| variance(&data));
float_reduction!(Std, "Std", |data| variance(&data).sqrt());
float_reduction!(Median, "Median", |data| median(data));

macro_rules! install_reduction {
    ($operations:expr, $label:literal, $name:ident) => {
        super::install(
            $operations,
            OperationEntry::reduce($label, axis_schema(), |params| {
                Ok(Box::new($name {
                    axis: params.axis(),
                }))
            }),
        );
    };
}

pub(crate) fn install_builtins(operations: &mut HashMap<String, Arc<OperationEntry>>) {
    install_reduction!(operations, "Sum", Sum);
    install_reduction!(operations, "Min", Min);
    install_reduction!(operations, "Max", Max);
    install_reduction!(operations, "Mean", Mean);
    install_reduction!(operations, "Var", Var);
    install_reduction!(operations, "Std", Std);
    install_reduction!(operations, "Median", Median);
}
