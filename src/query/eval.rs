//! Maps query trees against a repository to produce scalars, vectors or
//! matrices.
//!
//! Empty subsetting is a legitimate result and comes back as
//! [`QueryResult::Absent`]; type mismatches, missing names and bad literals
//! raise errors carrying the offending value and its domain context.

use super::ast::{
    AxisEntry, AxisLookup, CompareOp, FilterOp, FilteredAxis, MatrixQuery, OperationCall,
    PropertyComparison, Query, ScalarQuery, ScalarSource, VectorQuery, VectorSource,
};
use crate::errors::{AxialError, AxialResult};
use crate::layout::{check_efficiency, relayout, AxisSide};
use crate::ops::{self, EltwiseOperation, ReduceOperation};
use crate::storage::repository::Repository;
use crate::types::{MatrixData, ScalarValue, VectorData};
use crate::zip_vector_scalar;
use regex::Regex;

/// A vector answer: the surviving axis, its entry names and the values.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorAnswer {
    pub axis: String,
    pub names: Vec<String>,
    pub values: VectorData,
}

/// A matrix answer: both surviving axes, their entry names and the values.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixAnswer {
    pub rows_axis: String,
    pub cols_axis: String,
    pub row_names: Vec<String>,
    pub col_names: Vec<String>,
    pub values: MatrixData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Scalar(ScalarValue),
    Vector(VectorAnswer),
    Matrix(MatrixAnswer),
}

/// A query's outcome: a value, or the distinguished empty-subset sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Present(Answer),
    Absent,
}

impl QueryResult {
    pub fn is_absent(&self) -> bool {
        matches!(self, QueryResult::Absent)
    }

    pub fn answer(&self) -> Option<&Answer> {
        match self {
            QueryResult::Present(answer) => Some(answer),
            QueryResult::Absent => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self.answer() {
            Some(Answer::Scalar(value)) => Some(value),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&VectorAnswer> {
        match self.answer() {
            Some(Answer::Vector(answer)) => Some(answer),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&MatrixAnswer> {
        match self.answer() {
            Some(Answer::Matrix(answer)) => Some(answer),
            _ => None,
        }
    }
}

/// Evaluates a typed query against a repository.
pub fn evaluate(repository: &Repository, query: &Query) -> AxialResult<QueryResult> {
    match query {
        Query::Scalar(scalar) => Ok(match evaluate_scalar(repository, scalar)? {
            Some(value) => QueryResult::Present(Answer::Scalar(value)),
            None => QueryResult::Absent,
        }),
        Query::Vector(vector) => Ok(match evaluate_vector(repository, vector)? {
            Some(answer) => QueryResult::Present(Answer::Vector(answer)),
            None => QueryResult::Absent,
        }),
        Query::Matrix(matrix) => Ok(match evaluate_matrix(repository, matrix)? {
            Some(answer) => QueryResult::Present(Answer::Matrix(answer)),
            None => QueryResult::Absent,
        }),
    }
}

fn eltwise_instance(call: &OperationCall) -> AxialResult<Box<dyn EltwiseOperation>> {
    let entry = ops::operation(&call.name)
        .ok_or_else(|| AxialError::parse_error(format!("unknown operation: {}", call.name)))?;
    entry.eltwise_instance(&call.params)
}

fn reduce_instance(call: &OperationCall) -> AxialResult<Box<dyn ReduceOperation>> {
    let entry = ops::operation(&call.name)
        .ok_or_else(|| AxialError::parse_error(format!("unknown operation: {}", call.name)))?;
    entry.reduce_instance(&call.params)
}

fn evaluate_matrix(
    repository: &Repository,
    query: &MatrixQuery,
) -> AxialResult<Option<MatrixAnswer>> {
    let stored = repository.get_matrix(&query.rows.axis, &query.cols.axis, &query.property)?;
    let row_mask = evaluate_filtered_axis(repository, &query.rows)?;
    let col_mask = evaluate_filtered_axis(repository, &query.cols)?;
    if mask_is_empty(&row_mask) || mask_is_empty(&col_mask) {
        return Ok(None);
    }
    let row_mask = nontrivial(row_mask);
    let col_mask = nontrivial(col_mask);
    if stored.is_sparse() {
        let minor_masked = match stored.minor_axis() {
            AxisSide::Rows => row_mask.is_some(),
            AxisSide::Columns => col_mask.is_some(),
        };
        if minor_masked {
            check_efficiency(
                "masking a compressed matrix along its minor axis",
                &format!(
                    "for the matrix: {} in the repository: {}",
                    query.property,
                    repository.name()
                ),
            )?;
        }
    }
    let mut values = if row_mask.is_none() && col_mask.is_none() {
        (*stored).clone()
    } else {
        stored.subset(row_mask.as_deref(), col_mask.as_deref())
    };
    for call in &query.eltwise {
        values = eltwise_instance(call)?.apply_matrix(&values)?;
    }
    let row_names = subset_names(&repository.get_axis(&query.rows.axis)?, row_mask.as_deref());
    let col_names = subset_names(&repository.get_axis(&query.cols.axis)?, col_mask.as_deref());
    Ok(Some(MatrixAnswer {
        rows_axis: query.rows.axis.clone(),
        cols_axis: query.cols.axis.clone(),
        row_names,
        col_names,
        values,
    }))
}

fn evaluate_vector(
    repository: &Repository,
    query: &VectorQuery,
) -> AxialResult<Option<VectorAnswer>> {
    let answer = match &query.source {
        VectorSource::Property { axis, lookup } => {
            evaluate_vector_property(repository, axis, lookup)?
        }
        VectorSource::MatrixSlice {
            filtered,
            filtered_side,
            entry,
            property,
        } => evaluate_matrix_slice(repository, filtered, *filtered_side, entry, property)?,
        VectorSource::ReduceMatrix { operation, matrix } => {
            evaluate_matrix_reduction(repository, operation, matrix)?
        }
    };
    let Some(mut answer) = answer else {
        return Ok(None);
    };
    for call in &query.eltwise {
        answer.values = eltwise_instance(call)?.apply_vector(&answer.values)?;
    }
    Ok(Some(answer))
}

fn evaluate_vector_property(
    repository: &Repository,
    axis: &FilteredAxis,
    lookup: &AxisLookup,
) -> AxialResult<Option<VectorAnswer>> {
    let axis_mask = evaluate_filtered_axis(repository, axis)?;
    if mask_is_empty(&axis_mask) {
        return Ok(None);
    }
    let mut values = evaluate_property_lookup(repository, &axis.axis, &lookup.lookup.names)?;
    let comparison_mask = match &lookup.comparison {
        Some(comparison) => {
            let mut mask = compare_values(&values, comparison)
                .map_err(|error| error.for_context("property", lookup.lookup.canonical()))?;
            if lookup.inverse {
                invert(&mut mask);
            }
            Some(mask)
        }
        None => {
            if lookup.inverse {
                let inverted: Vec<bool> = values
                    .as_bools()
                    .ok_or_else(|| {
                        AxialError::type_mismatch(format!(
                            "inverting a non-boolean vector of: {}",
                            values.kind()
                        ))
                        .for_context("property", lookup.lookup.canonical())
                    })?
                    .iter()
                    .map(|value| !value)
                    .collect();
                values = VectorData::Bool(inverted);
            }
            None
        }
    };
    let combined = combine_masks(axis_mask, comparison_mask);
    if mask_is_empty(&combined) {
        return Ok(None);
    }
    let combined = nontrivial(combined);
    let names = subset_names(&repository.get_axis(&axis.axis)?, combined.as_deref());
    let values = match combined.as_deref() {
        Some(mask) => values.subset(mask),
        None => values,
    };
    Ok(Some(VectorAnswer {
        axis: axis.axis.clone(),
        names,
        values,
    }))
}

fn evaluate_matrix_slice(
    repository: &Repository,
    filtered: &FilteredAxis,
    filtered_side: AxisSide,
    entry: &AxisEntry,
    property: &str,
) -> AxialResult<Option<VectorAnswer>> {
    let (rows_axis, cols_axis) = match filtered_side {
        AxisSide::Rows => (filtered.axis.as_str(), entry.axis.as_str()),
        AxisSide::Columns => (entry.axis.as_str(), filtered.axis.as_str()),
    };
    let matrix = repository.get_matrix(rows_axis, cols_axis, property)?;
    let entry_index = repository
        .entry_index(&entry.axis, &entry.entry)
        .map_err(|error| error.for_context("matrix", property))?;
    let context = format!(
        "for the matrix: {} in the repository: {}",
        property,
        repository.name()
    );
    let slice = match filtered_side {
        AxisSide::Rows => {
            // The surviving axis is rows, so this extracts one column.
            if matrix.major_axis() == AxisSide::Rows {
                check_efficiency("slicing a column of a row-major matrix", &context)?;
            }
            matrix.col_slice(entry_index)
        }
        AxisSide::Columns => {
            if matrix.major_axis() == AxisSide::Columns {
                check_efficiency("slicing a row of a column-major matrix", &context)?;
            }
            matrix.row_slice(entry_index)
        }
    };
    let mask = evaluate_filtered_axis(repository, filtered)?;
    if mask_is_empty(&mask) {
        return Ok(None);
    }
    let mask = nontrivial(mask);
    let names = subset_names(&repository.get_axis(&filtered.axis)?, mask.as_deref());
    let values = match mask.as_deref() {
        Some(mask) => slice.subset(mask),
        None => slice,
    };
    Ok(Some(VectorAnswer {
        axis: filtered.axis.clone(),
        names,
        values,
    }))
}

fn evaluate_matrix_reduction(
    repository: &Repository,
    operation: &OperationCall,
    query: &MatrixQuery,
) -> AxialResult<Option<VectorAnswer>> {
    let reduction = reduce_instance(operation)?;
    let survivor = reduction.survivor().ok_or_else(|| {
        AxialError::invalid_parameter(format!(
            "missing parameter: axis for reducing a matrix with: {}",
            operation.name
        ))
    })?;
    // An unfiltered, untransformed matrix can reuse the facade's re-layout
    // cache; anything else re-layouts its private copy.
    let pristine = query.rows.filters.is_empty()
        && query.cols.filters.is_empty()
        && query.eltwise.is_empty();
    let (answer_names, axis_name, aligned) = if pristine {
        let aligned = repository.relayout_matrix(
            &query.rows.axis,
            &query.cols.axis,
            &query.property,
            survivor,
        )?;
        let axis_name = match survivor {
            AxisSide::Rows => query.rows.axis.clone(),
            AxisSide::Columns => query.cols.axis.clone(),
        };
        let names = repository.get_axis(&axis_name)?.as_ref().clone();
        (names, axis_name, (*aligned).clone())
    } else {
        let Some(answer) = evaluate_matrix(repository, query)? else {
            return Ok(None);
        };
        let (axis_name, names) = match survivor {
            AxisSide::Rows => (answer.rows_axis.clone(), answer.row_names),
            AxisSide::Columns => (answer.cols_axis.clone(), answer.col_names),
        };
        let aligned = if answer.values.major_axis() == survivor {
            answer.values
        } else {
            relayout(&answer.values, survivor)
        };
        (names, axis_name, aligned)
    };
    let values = reduction
        .reduce_matrix(&aligned)
        .map_err(|error| error.for_context("matrix", query.property.clone()))?;
    Ok(Some(VectorAnswer {
        axis: axis_name,
        names: answer_names,
        values,
    }))
}

fn evaluate_scalar(
    repository: &Repository,
    query: &ScalarQuery,
) -> AxialResult<Option<ScalarValue>> {
    let value = match &query.source {
        ScalarSource::Property { name } => Some(repository.get_scalar(name)?),
        ScalarSource::VectorEntry { entry, lookup } => {
            let values = evaluate_property_lookup(repository, &entry.axis, &lookup.names)?;
            let index = repository.entry_index(&entry.axis, &entry.entry)?;
            Some(values.value_at(index))
        }
        ScalarSource::MatrixEntry { row, col, property } => {
            let matrix = repository.get_matrix(&row.axis, &col.axis, property)?;
            let row_index = repository.entry_index(&row.axis, &row.entry)?;
            let col_index = repository.entry_index(&col.axis, &col.entry)?;
            Some(matrix.get(row_index, col_index))
        }
        ScalarSource::ReduceVector { operation, vector } => {
            match evaluate_vector(repository, vector)? {
                None => None,
                Some(answer) => Some(reduce_instance(operation)?.reduce_vector(&answer.values)?),
            }
        }
    };
    let Some(mut value) = value else {
        return Ok(None);
    };
    for call in &query.eltwise {
        value = eltwise_instance(call)?.apply_scalar(&value)?;
    }
    Ok(Some(value))
}

/// Computes the mask of a filtered axis; `None` means "keep all".
fn evaluate_filtered_axis(
    repository: &Repository,
    axis: &FilteredAxis,
) -> AxialResult<Option<Vec<bool>>> {
    if axis.filters.is_empty() {
        return Ok(None);
    }
    let length = repository.axis_length(&axis.axis)?;
    let mut mask = vec![true; length];
    for filter in &axis.filters {
        let filter_mask = evaluate_lookup_mask(repository, &axis.axis, &filter.lookup)
            .map_err(|error| error.for_context("axis", axis.axis.clone()))?;
        for (accumulated, value) in mask.iter_mut().zip(&filter_mask) {
            *accumulated = match filter.op {
                FilterOp::And => *accumulated && *value,
                FilterOp::Or => *accumulated || *value,
                FilterOp::Xor => *accumulated != *value,
            };
        }
    }
    Ok(Some(mask))
}

/// Evaluates an axis lookup to a boolean mask (for filters).
fn evaluate_lookup_mask(
    repository: &Repository,
    axis: &str,
    lookup: &AxisLookup,
) -> AxialResult<Vec<bool>> {
    let values = evaluate_property_lookup(repository, axis, &lookup.lookup.names)?;
    let mut mask = match &lookup.comparison {
        Some(comparison) => compare_values(&values, comparison)
            .map_err(|error| error.for_context("property", lookup.lookup.canonical()))?,
        None => values
            .as_bools()
            .map(|bools| bools.to_vec())
            .ok_or_else(|| {
                AxialError::type_mismatch(format!(
                    "filter is not a boolean vector, got: {}",
                    values.kind()
                ))
                .for_context("property", lookup.lookup.canonical())
            })?,
    };
    if lookup.inverse {
        invert(&mut mask);
    }
    Ok(mask)
}

/// Resolves a `.`-chained property lookup to a dense vector.
fn evaluate_property_lookup(
    repository: &Repository,
    axis: &str,
    chain: &[String],
) -> AxialResult<VectorData> {
    let mut values = (*repository.get_vector(axis, &chain[0])?).clone();
    let mut previous = chain[0].clone();
    for next_property in &chain[1..] {
        let target_axis = chain_axis_of(repository, &previous)?;
        let entry_names = values.as_strings().ok_or_else(|| {
            AxialError::type_mismatch(format!(
                "chained property is not a string vector: {}",
                previous
            ))
        })?;
        let mut indices = Vec::with_capacity(entry_names.len());
        for entry in entry_names {
            let index = repository
                .entry_index(&target_axis, entry)
                .map_err(|error| error.for_context("chained property", previous.clone()))?;
            indices.push(index);
        }
        let next_values = repository.get_vector(&target_axis, next_property)?;
        values = next_values.take(&indices);
        previous = next_property.clone();
    }
    Ok(values)
}

/// The axis a chained property resolves through: the property name itself if
/// it names an axis, otherwise its prefix before the first `.`.
fn chain_axis_of(repository: &Repository, property: &str) -> AxialResult<String> {
    if repository.has_axis(property) {
        return Ok(property.to_string());
    }
    if let Some(prefix) = property.split('.').next() {
        if repository.has_axis(prefix) {
            return Ok(prefix.to_string());
        }
    }
    Err(AxialError::not_found(format!(
        "no axis implied by the chained property: {}",
        property
    )))
}

/// Elementwise comparison of a vector against a parsed literal.
fn compare_values(
    values: &VectorData,
    comparison: &PropertyComparison,
) -> AxialResult<Vec<bool>> {
    if comparison.op.is_match() {
        let strings = values.as_strings().ok_or_else(|| {
            AxialError::type_mismatch(format!(
                "regex match on a non-string vector of: {}",
                values.kind()
            ))
        })?;
        // Patterns match whole entries, anchored or not.
        let pattern = Regex::new(&format!("^(?:{})$", comparison.value)).map_err(|error| {
            AxialError::parse_error(format!("invalid regex: {}: {}", comparison.value, error))
        })?;
        let negate = comparison.op == CompareOp::NotMatch;
        return Ok(strings
            .iter()
            .map(|entry| pattern.is_match(entry) != negate)
            .collect());
    }
    let literal = ScalarValue::parse_as(values.kind(), &comparison.value)?;
    let op = comparison.op;
    zip_vector_scalar!(values, &literal, data, v => Ok(data
        .iter()
        .map(|item| match op {
            CompareOp::Equal => item == v,
            CompareOp::NotEqual => item != v,
            CompareOp::Less => item < v,
            CompareOp::LessOrEqual => item <= v,
            CompareOp::Greater => item > v,
            CompareOp::GreaterOrEqual => item >= v,
            CompareOp::Match | CompareOp::NotMatch => unreachable!(),
        })
        .collect()), else => Err(AxialError::type_mismatch(format!(
            "cannot compare a {} vector with: {}",
            values.kind(),
            comparison.value
        ))))
}

fn combine_masks(a: Option<Vec<bool>>, b: Option<Vec<bool>>) -> Option<Vec<bool>> {
    match (a, b) {
        (None, None) => None,
        (Some(mask), None) | (None, Some(mask)) => Some(mask),
        (Some(a), Some(b)) => Some(a.iter().zip(&b).map(|(x, y)| *x && *y).collect()),
    }
}

fn invert(mask: &mut [bool]) {
    for value in mask.iter_mut() {
        *value = !*value;
    }
}

fn mask_is_empty(mask: &Option<Vec<bool>>) -> bool {
    match mask {
        Some(mask) => !mask.iter().any(|kept| *kept),
        None => false,
    }
}

/// Collapses an all-true mask to the "keep all" sentinel.
fn nontrivial(mask: Option<Vec<bool>>) -> Option<Vec<bool>> {
    match mask {
        Some(mask) if mask.iter().all(|kept| *kept) => None,
        other => other,
    }
}

fn subset_names(names: &[String], mask: Option<&[bool]>) -> Vec<String> {
    match mask {
        None => names.to_vec(),
        Some(mask) => names
            .iter()
            .zip(mask)
            .filter(|(_, kept)| **kept)
            .map(|(name, _)| name.clone())
            .collect(),
    }
}
