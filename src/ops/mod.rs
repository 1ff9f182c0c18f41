//! The element-wise and reduction operation registry.
//!
//! Operations are named, parameterizable values installed in a process-wide
//! registry. Registration installs the factory, the parameter schema and the
//! schema-driven parameter parser in one step; the registry is append-only
//! within a process. Operations must be pure functions of their inputs and
//! parameters.

pub mod eltwise;
pub mod reduce;

use crate::errors::{AxialError, AxialResult};
use crate::layout::AxisSide;
use crate::types::{MatrixData, ScalarValue, ValueType, VectorData};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// The type of one named operation parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    Int,
    Float,
    Dtype,
    Enum(&'static [&'static str]),
}

/// A parsed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Dtype(ValueType),
    Enum(&'static str),
}

/// Schema of one named parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<ParamValue>,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamKind) -> ParamSpec {
        ParamSpec {
            name,
            kind,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &'static str, kind: ParamKind, default: Option<ParamValue>) -> ParamSpec {
        ParamSpec {
            name,
            kind,
            required: false,
            default,
        }
    }
}

/// Parameters parsed against a schema; absent optional parameters without a
/// default are simply missing.
#[derive(Debug, Clone, Default)]
pub struct ParsedParams {
    values: HashMap<&'static str, ParamValue>,
}

impl ParsedParams {
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ParamValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(ParamValue::Float(value)) => Some(*value),
            Some(ParamValue::Int(value)) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn dtype(&self, name: &str) -> Option<ValueType> {
        match self.values.get(name) {
            Some(ParamValue::Dtype(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn enum_value(&self, name: &str) -> Option<&'static str> {
        match self.values.get(name) {
            Some(ParamValue::Enum(value)) => Some(value),
            _ => None,
        }
    }

    /// The `axis` parameter as an axis side, if present.
    pub fn axis(&self) -> Option<AxisSide> {
        match self.enum_value("axis") {
            Some("Rows") => Some(AxisSide::Rows),
            Some("Columns") => Some(AxisSide::Columns),
            _ => None,
        }
    }
}

/// Parses `name = value` pairs against a schema.
pub fn parse_params(
    operation: &str,
    schema: &[ParamSpec],
    raw: &[(String, String)],
) -> AxialResult<ParsedParams> {
    let mut values = HashMap::new();
    for (name, text) in raw {
        let spec = schema
            .iter()
            .find(|spec| spec.name == name.as_str())
            .ok_or_else(|| {
                let recognized: Vec<&str> = schema.iter().map(|spec| spec.name).collect();
                AxialError::invalid_parameter(format!(
                    "unknown parameter: {} (recognized: {})",
                    name,
                    if recognized.is_empty() {
                        "none".to_string()
                    } else {
                        recognized.join(", ")
                    }
                ))
                .for_context("operation", operation)
            })?;
        if values.contains_key(spec.name) {
            return Err(
                AxialError::invalid_parameter(format!("repeated parameter: {}", name))
                    .for_context("operation", operation),
            );
        }
        values.insert(spec.name, parse_param_value(operation, spec, text)?);
    }
    for spec in schema {
        if !values.contains_key(spec.name) {
            if let Some(default) = &spec.default {
                values.insert(spec.name, default.clone());
            } else if spec.required {
                return Err(
                    AxialError::invalid_parameter(format!("missing parameter: {}", spec.name))
                        .for_context("operation", operation),
                );
            }
        }
    }
    Ok(ParsedParams { values })
}

fn parse_param_value(operation: &str, spec: &ParamSpec, text: &str) -> AxialResult<ParamValue> {
    let bad = |expected: &str| {
        AxialError::invalid_parameter(format!(
            "invalid {} value for the parameter: {}: {}",
            expected, spec.name, text
        ))
        .for_context("operation", operation)
    };
    match spec.kind {
        ParamKind::Int => text
            .trim()
            .parse()
            .map(ParamValue::Int)
            .map_err(|_| bad("integer")),
        ParamKind::Float => text
            .trim()
            .parse()
            .map(ParamValue::Float)
            .map_err(|_| bad("float")),
        ParamKind::Dtype => ValueType::parse(text.trim())
            .map(ParamValue::Dtype)
            .ok_or_else(|| bad("dtype")),
        ParamKind::Enum(options) => options
            .iter()
            .find(|option| **option == text.trim())
            .map(|option| ParamValue::Enum(*option))
            .ok_or_else(|| bad("enum")),
    }
}

/// An element-wise operation: array in, array of the same shape out.
pub trait EltwiseOperation: Send + Sync {
    fn name(&self) -> &str;

    fn apply_vector(&self, values: &VectorData) -> AxialResult<VectorData>;

    fn apply_scalar(&self, value: &ScalarValue) -> AxialResult<ScalarValue> {
        let vector = VectorData::broadcast(value, 1);
        Ok(self.apply_vector(&vector)?.value_at(0))
    }

    /// Element-wise application over a matrix. The default transforms the
    /// stored value buffer, so sparse matrices keep their structure and
    /// implicit zeros stay implicit.
    fn apply_matrix(&self, matrix: &MatrixData) -> AxialResult<MatrixData> {
        matrix.with_values(self.apply_vector(matrix.values_data())?)
    }
}

/// A reduction: vector to scalar, or matrix to a vector along an axis.
pub trait ReduceOperation: Send + Sync {
    fn name(&self) -> &str;

    /// The surviving axis for matrix reduction, from the `axis` parameter.
    fn survivor(&self) -> Option<AxisSide>;

    /// The element kind of the reduced result for a given input kind.
    fn result_kind(&self, input: ValueType) -> AxialResult<ValueType>;

    fn reduce_vector(&self, values: &VectorData) -> AxialResult<ScalarValue>;

    /// Reduces each line of the surviving axis into one entry.
    ///
    /// Callers are expected to re-layout the matrix so its major axis is the
    /// surviving one; the default then only slices along the major axis.
    fn reduce_matrix(&self, matrix: &MatrixData) -> AxialResult<VectorData> {
        let survivor = self.survivor().ok_or_else(|| {
            AxialError::invalid_parameter(format!(
                "missing parameter: axis for reducing a matrix with: {}",
                self.name()
            ))
        })?;
        let slots = match survivor {
            AxisSide::Rows => matrix.rows(),
            AxisSide::Columns => matrix.cols(),
        };
        let mut reduced = Vec::with_capacity(slots);
        for slot in 0..slots {
            let line = match survivor {
                AxisSide::Rows => matrix.row_slice(slot),
                AxisSide::Columns => matrix.col_slice(slot),
            };
            reduced.push(self.reduce_vector(&line)?);
        }
        VectorData::from_scalars(self.result_kind(matrix.kind())?, reduced)
    }
}

/// How the query parsers classify a registered operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Eltwise,
    Reduce,
}

pub type EltwiseFactory = fn(&ParsedParams) -> AxialResult<Box<dyn EltwiseOperation>>;
pub type ReduceFactory = fn(&ParsedParams) -> AxialResult<Box<dyn ReduceOperation>>;

#[derive(Clone, Copy)]
enum OperationFactory {
    Eltwise(EltwiseFactory),
    Reduce(ReduceFactory),
}

/// One registry slot: the name, the parameter schema and the factory.
pub struct OperationEntry {
    name: String,
    schema: Vec<ParamSpec>,
    factory: OperationFactory,
}

impl OperationEntry {
    pub fn eltwise(
        name: impl Into<String>,
        schema: Vec<ParamSpec>,
        factory: EltwiseFactory,
    ) -> OperationEntry {
        OperationEntry {
            name: name.into(),
            schema,
            factory: OperationFactory::Eltwise(factory),
        }
    }

    pub fn reduce(
        name: impl Into<String>,
        schema: Vec<ParamSpec>,
        factory: ReduceFactory,
    ) -> OperationEntry {
        OperationEntry {
            name: name.into(),
            schema,
            factory: OperationFactory::Reduce(factory),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OperationKind {
        match self.factory {
            OperationFactory::Eltwise(_) => OperationKind::Eltwise,
            OperationFactory::Reduce(_) => OperationKind::Reduce,
        }
    }

    pub fn schema(&self) -> &[ParamSpec] {
        &self.schema
    }

    /// Parses raw `name = value` pairs against this operation's schema.
    pub fn parse_params(&self, raw: &[(String, String)]) -> AxialResult<ParsedParams> {
        parse_params(&self.name, &self.schema, raw)
    }

    pub fn eltwise_instance(
        &self,
        raw: &[(String, String)],
    ) -> AxialResult<Box<dyn EltwiseOperation>> {
        let params = self.parse_params(raw)?;
        match self.factory {
            OperationFactory::Eltwise(factory) => factory(&params),
            OperationFactory::Reduce(_) => Err(AxialError::invalid_parameter(format!(
                "not an element-wise operation: {}",
                self.name
            ))),
        }
    }

    pub fn reduce_instance(&self, raw: &[(String, String)]) -> AxialResult<Box<dyn ReduceOperation>> {
        let params = self.parse_params(raw)?;
        match self.factory {
            OperationFactory::Reduce(factory) => factory(&params),
            OperationFactory::Eltwise(_) => Err(AxialError::invalid_parameter(format!(
                "not a reduction operation: {}",
                self.name
            ))),
        }
    }
}

lazy_static! {
    static ref OPERATION_REGISTRY: RwLock<HashMap<String, Arc<OperationEntry>>> =
        RwLock::new(builtin_operations());
}

fn builtin_operations() -> HashMap<String, Arc<OperationEntry>> {
    let mut operations = HashMap::new();
    eltwise::install_builtins(&mut operations);
    reduce::install_builtins(&mut operations);
    operations
}

/// Installs an operation. Names are global; re-registering a name fails.
pub fn register_operation(entry: OperationEntry) -> AxialResult<()> {
    let mut registry = OPERATION_REGISTRY.write();
    if registry.contains_key(entry.name()) {
        return Err(AxialError::already_exists(format!(
            "existing operation: {}",
            entry.name()
        )));
    }
    registry.insert(entry.name().to_string(), Arc::new(entry));
    Ok(())
}

/// Looks up a registered operation by name.
pub fn operation(name: &str) -> Option<Arc<OperationEntry>> {
    OPERATION_REGISTRY.read().get(name).cloned()
}

/// All registered operation names, sorted.
pub fn operation_names() -> Vec<String> {
    let mut names: Vec<String> = OPERATION_REGISTRY.read().keys().cloned().collect();
    names.sort();
    names
}

/// Snapshot of the registry, for tests.
pub fn registry_snapshot() -> HashMap<String, Arc<OperationEntry>> {
    OPERATION_REGISTRY.read().clone()
}

/// Restores a previously taken snapshot, for tests.
pub fn restore_registry(snapshot: HashMap<String, Arc<OperationEntry>>) {
    *OPERATION_REGISTRY.write() = snapshot;
}

pub(crate) fn install(
    operations: &mut HashMap<String, Arc<OperationEntry>>,
    entry: OperationEntry,
) {
    operations.insert(entry.name().to_string(), Arc::new(entry));
}

/// Installs the factory, parameter schema and parser for an operation in one
/// registry insert.
///
/// ```ignore
/// register_operation!(eltwise "Square", [], |_params| Ok(Box::new(Square)))?;
/// ```
#[macro_export]
macro_rules! register_operation {
    (eltwise $name:expr, [$($spec:expr),* $(,)?], $factory:expr) => {
        $crate::ops::register_operation($crate::ops::OperationEntry::eltwise(
            $name,
            vec![$($spec),*],
            $factory,
        ))
    };
    (reduce $name:expr, [$($spec:expr),* $(,)?], $factory:expr) => {
        $crate::ops::register_operation($crate::ops::OperationEntry::reduce(
            $name,
            vec![$($spec),*],
            $factory,
        ))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis_schema() -> Vec<ParamSpec> {
        vec![ParamSpec::optional(
            "axis",
            ParamKind::Enum(&["Rows", "Columns"]),
            None,
        )]
    }

    #[test]
    fn test_parse_known_params() {
        let raw = vec![("axis".to_string(), "Columns".to_string())];
        let params = parse_params("Sum", &axis_schema(), &raw).unwrap();
        assert_eq!(params.axis(), Some(AxisSide::Columns));
    }

    #[test]
    fn test_unknown_param_lists_recognized() {
        let raw = vec![("axes".to_string(), "Columns".to_string())];
        let error = parse_params("Sum", &axis_schema(), &raw).unwrap_err();
        assert!(error.to_string().contains("unknown parameter: axes"));
        assert!(error.to_string().contains("recognized: axis"));
    }

    #[test]
    fn test_missing_required_param() {
        let schema = vec![ParamSpec::required("dtype", ParamKind::Dtype)];
        let error = parse_params("Cast", &schema, &[]).unwrap_err();
        assert!(error.to_string().contains("missing parameter: dtype"));
    }

    #[test]
    fn test_defaults_fill_in() {
        let schema = vec![ParamSpec::optional(
            "base",
            ParamKind::Float,
            Some(ParamValue::Float(std::f64::consts::E)),
        )];
        let params = parse_params("Log", &schema, &[]).unwrap();
        assert_eq!(params.float("base"), Some(std::f64::consts::E));
    }

    #[test]
    fn test_builtins_are_classified() {
        assert_eq!(operation("Abs").unwrap().kind(), OperationKind::Eltwise);
        assert_eq!(operation("Sum").unwrap().kind(), OperationKind::Reduce);
        assert!(operation("NoSuchOperation").is_none());
    }

    #[test]
    fn test_registry_is_append_only() {
        let error = register_operation(OperationEntry::eltwise("Abs", vec![], |_| {
            unreachable!("never instantiated")
        }))
        .unwrap_err();
        assert_eq!(error.kind(), crate::errors::ErrorKind::AlreadyExists);
    }
}
