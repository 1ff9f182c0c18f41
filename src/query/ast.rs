//! Typed query trees and the grammar parsers that build them from the
//! operator-precedence expression tree.
//!
//! Three top-level query kinds exist: matrix, vector and scalar. The surface
//! grammar is shared; the pipe chain can lower a matrix query to a vector
//! query (matrix reduction) and a vector query to a scalar query (vector
//! reduction). `canonical` renders a normalized string form that re-parses
//! to an equal tree and keys the query cache.

use super::tokens::{escape_query, parse_expression, Expression, Token, TokenKind};
use crate::errors::{AxialError, AxialResult};
use crate::layout::AxisSide;
use crate::ops::{self, OperationKind};

/// A comparison operator; `~` and `!~` are anchored regex matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Match,
    NotMatch,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Equal => "=",
            CompareOp::NotEqual => "!=",
            CompareOp::Less => "<",
            CompareOp::LessOrEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterOrEqual => ">=",
            CompareOp::Match => "~",
            CompareOp::NotMatch => "!~",
        }
    }

    fn from_symbol(symbol: &str) -> Option<CompareOp> {
        Some(match symbol {
            "=" => CompareOp::Equal,
            "!=" => CompareOp::NotEqual,
            "<" => CompareOp::Less,
            "<=" => CompareOp::LessOrEqual,
            ">" => CompareOp::Greater,
            ">=" => CompareOp::GreaterOrEqual,
            "~" => CompareOp::Match,
            "!~" => CompareOp::NotMatch,
            _ => return None,
        })
    }

    pub fn is_match(self) -> bool {
        matches!(self, CompareOp::Match | CompareOp::NotMatch)
    }
}

/// A comparison against a literal value.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyComparison {
    pub op: CompareOp,
    pub value: String,
}

/// A `.`-chained property lookup; each hop resolves entry names through the
/// axis implied by the previous property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyLookup {
    pub names: Vec<String>,
}

impl PropertyLookup {
    pub fn canonical(&self) -> String {
        self.names
            .iter()
            .map(|name| fmt_name(name))
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// A property lookup with optional inversion and comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisLookup {
    pub lookup: PropertyLookup,
    pub inverse: bool,
    pub comparison: Option<PropertyComparison>,
}

impl AxisLookup {
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        if self.inverse {
            out.push_str("! ");
        }
        out.push_str(&self.lookup.canonical());
        if let Some(comparison) = &self.comparison {
            out.push(' ');
            out.push_str(comparison.op.symbol());
            out.push(' ');
            out.push_str(&fmt_name(&comparison.value));
        }
        out
    }
}

/// How one filter combines with the accumulated mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    And,
    Or,
    Xor,
}

impl FilterOp {
    pub fn symbol(self) -> &'static str {
        match self {
            FilterOp::And => "&",
            FilterOp::Or => "|",
            FilterOp::Xor => "^",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisFilter {
    pub op: FilterOp,
    pub lookup: AxisLookup,
}

/// An axis with zero or more mask filters.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredAxis {
    pub axis: String,
    pub filters: Vec<AxisFilter>,
}

impl FilteredAxis {
    pub fn canonical(&self) -> String {
        let mut out = fmt_name(&self.axis);
        for filter in &self.filters {
            out.push(' ');
            out.push_str(filter.op.symbol());
            out.push(' ');
            out.push_str(&filter.lookup.canonical());
        }
        out
    }
}

/// One fixed entry of an axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisEntry {
    pub axis: String,
    pub entry: String,
}

impl AxisEntry {
    pub fn canonical(&self) -> String {
        format!("{} = {}", fmt_name(&self.axis), fmt_name(&self.entry))
    }
}

/// A mention of a registered operation, with raw parameter pairs sorted by
/// name.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationCall {
    pub name: String,
    pub params: Vec<(String, String)>,
}

impl OperationCall {
    pub fn canonical(&self) -> String {
        if self.params.is_empty() {
            return fmt_name(&self.name);
        }
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(key, value)| format!("{} = {}", fmt_name(key), fmt_name(value)))
            .collect();
        format!("{}({})", fmt_name(&self.name), params.join(", "))
    }
}

/// A matrix property lookup with per-side filters and an element-wise chain.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixQuery {
    pub rows: FilteredAxis,
    pub cols: FilteredAxis,
    pub property: String,
    pub eltwise: Vec<OperationCall>,
}

impl MatrixQuery {
    pub fn parse(text: &str) -> AxialResult<MatrixQuery> {
        match Query::parse(text)? {
            Query::Matrix(query) => Ok(query),
            _ => Err(AxialError::parse_error("not a matrix query").for_context("query", text)),
        }
    }

    pub fn canonical(&self) -> String {
        let mut out = format!(
            "{} , {} @ {}",
            self.rows.canonical(),
            self.cols.canonical(),
            fmt_name(&self.property)
        );
        push_pipes(&mut out, &self.eltwise);
        out
    }
}

/// Where a vector query's data comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorSource {
    /// A (possibly chained, possibly compared) vector property of one axis.
    Property {
        axis: FilteredAxis,
        lookup: AxisLookup,
    },
    /// One row or column sliced out of a matrix.
    MatrixSlice {
        filtered: FilteredAxis,
        /// The side of the matrix the filtered (surviving) axis occupies.
        filtered_side: AxisSide,
        entry: AxisEntry,
        property: String,
    },
    /// A matrix query reduced along an axis.
    ReduceMatrix {
        operation: OperationCall,
        matrix: MatrixQuery,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    pub source: VectorSource,
    pub eltwise: Vec<OperationCall>,
}

impl VectorQuery {
    pub fn parse(text: &str) -> AxialResult<VectorQuery> {
        match Query::parse(text)? {
            Query::Vector(query) => Ok(query),
            _ => Err(AxialError::parse_error("not a vector query").for_context("query", text)),
        }
    }

    pub fn canonical(&self) -> String {
        let mut out = match &self.source {
            VectorSource::Property { axis, lookup } => {
                format!("{} @ {}", axis.canonical(), lookup.canonical())
            }
            VectorSource::MatrixSlice {
                filtered,
                filtered_side,
                entry,
                property,
            } => match filtered_side {
                AxisSide::Rows => format!(
                    "{} , {} @ {}",
                    filtered.canonical(),
                    entry.canonical(),
                    fmt_name(property)
                ),
                AxisSide::Columns => format!(
                    "{} , {} @ {}",
                    entry.canonical(),
                    filtered.canonical(),
                    fmt_name(property)
                ),
            },
            VectorSource::ReduceMatrix { operation, matrix } => {
                format!("{} %> {}", matrix.canonical(), operation.canonical())
            }
        };
        push_pipes(&mut out, &self.eltwise);
        out
    }
}

/// Where a scalar query's data comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarSource {
    /// A named scalar property of the repository.
    Property { name: String },
    /// One entry of a vector property (with chaining).
    VectorEntry {
        entry: AxisEntry,
        lookup: PropertyLookup,
    },
    /// One entry of a matrix property.
    MatrixEntry {
        row: AxisEntry,
        col: AxisEntry,
        property: String,
    },
    /// A vector query reduced to a single value.
    ReduceVector {
        operation: OperationCall,
        vector: VectorQuery,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarQuery {
    pub source: ScalarSource,
    pub eltwise: Vec<OperationCall>,
}

impl ScalarQuery {
    pub fn parse(text: &str) -> AxialResult<ScalarQuery> {
        match Query::parse(text)? {
            Query::Scalar(query) => Ok(query),
            _ => Err(AxialError::parse_error("not a scalar query").for_context("query", text)),
        }
    }

    pub fn canonical(&self) -> String {
        let mut out = match &self.source {
            ScalarSource::Property { name } => fmt_name(name),
            ScalarSource::VectorEntry { entry, lookup } => {
                format!("{} @ {}", entry.canonical(), lookup.canonical())
            }
            ScalarSource::MatrixEntry { row, col, property } => format!(
                "{} , {} @ {}",
                row.canonical(),
                col.canonical(),
                fmt_name(property)
            ),
            ScalarSource::ReduceVector { operation, vector } => {
                format!("{} %> {}", vector.canonical(), operation.canonical())
            }
        };
        push_pipes(&mut out, &self.eltwise);
        out
    }
}

/// Any of the three query kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Scalar(ScalarQuery),
    Vector(VectorQuery),
    Matrix(MatrixQuery),
}

impl Query {
    /// Parses query text into a typed tree.
    pub fn parse(text: &str) -> AxialResult<Query> {
        let expression = parse_expression(text).map_err(|error| error.for_context("query", text))?;
        Query::from_expression(&expression).map_err(|error| error.for_context("query", text))
    }

    pub fn canonical(&self) -> String {
        match self {
            Query::Scalar(query) => query.canonical(),
            Query::Vector(query) => query.canonical(),
            Query::Matrix(query) => query.canonical(),
        }
    }

    fn from_expression(expression: &Expression) -> AxialResult<Query> {
        let (base, operations) = unroll_pipes(expression)?;
        let mut query = parse_base(base)?;
        for call in operations {
            query = query.apply_operation(call)?;
        }
        Ok(query)
    }

    /// Extends the query with one piped operation, lowering the kind when the
    /// operation is a reduction.
    fn apply_operation(self, call: OperationCall) -> AxialResult<Query> {
        let entry = ops::operation(&call.name).ok_or_else(|| {
            AxialError::parse_error(format!("unknown operation: {}", call.name))
        })?;
        entry.parse_params(&call.params)?;
        match (self, entry.kind()) {
            (Query::Matrix(mut query), OperationKind::Eltwise) => {
                query.eltwise.push(call);
                Ok(Query::Matrix(query))
            }
            (Query::Vector(mut query), OperationKind::Eltwise) => {
                query.eltwise.push(call);
                Ok(Query::Vector(query))
            }
            (Query::Scalar(mut query), OperationKind::Eltwise) => {
                query.eltwise.push(call);
                Ok(Query::Scalar(query))
            }
            (Query::Matrix(query), OperationKind::Reduce) => {
                let reduction = entry.reduce_instance(&call.params)?;
                if reduction.survivor().is_none() {
                    return Err(AxialError::invalid_parameter(format!(
                        "missing parameter: axis for reducing a matrix with: {}",
                        call.name
                    )));
                }
                Ok(Query::Vector(VectorQuery {
                    source: VectorSource::ReduceMatrix {
                        operation: call,
                        matrix: query,
                    },
                    eltwise: Vec::new(),
                }))
            }
            (Query::Vector(query), OperationKind::Reduce) => Ok(Query::Scalar(ScalarQuery {
                source: ScalarSource::ReduceVector {
                    operation: call,
                    vector: query,
                },
                eltwise: Vec::new(),
            })),
            (Query::Scalar(_), OperationKind::Reduce) => Err(AxialError::parse_error(format!(
                "cannot reduce a scalar with: {}",
                call.name
            ))),
        }
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn fmt_name(name: &str) -> String {
    if name.is_empty() {
        "''".to_string()
    } else {
        escape_query(name)
    }
}

fn push_pipes(out: &mut String, operations: &[OperationCall]) {
    for operation in operations {
        out.push_str(" %> ");
        out.push_str(&operation.canonical());
    }
}

fn unroll_pipes(expression: &Expression) -> AxialResult<(&Expression, Vec<OperationCall>)> {
    let mut calls = Vec::new();
    let mut current = expression;
    while let Expression::Binary {
        operator,
        left,
        right,
        ..
    } = current
    {
        if operator.symbol != "%>" {
            break;
        }
        calls.push(operation_call(right)?);
        current = left;
    }
    calls.reverse();
    Ok((current, calls))
}

fn operation_call(expression: &Expression) -> AxialResult<OperationCall> {
    match expression {
        Expression::Leaf(Token {
            kind: TokenKind::Name(name),
            ..
        }) => Ok(OperationCall {
            name: name.clone(),
            params: Vec::new(),
        }),
        Expression::Leaf(Token {
            kind: TokenKind::Call { name, params },
            ..
        }) => {
            let mut params = params.clone();
            params.sort();
            Ok(OperationCall {
                name: name.clone(),
                params,
            })
        }
        _ => Err(AxialError::parse_error("expected an operation after %>")),
    }
}

fn parse_base(expression: &Expression) -> AxialResult<Query> {
    match expression {
        Expression::Leaf(Token {
            kind: TokenKind::Name(name),
            ..
        }) => Ok(Query::Scalar(ScalarQuery {
            source: ScalarSource::Property { name: name.clone() },
            eltwise: Vec::new(),
        })),
        Expression::Binary {
            operator,
            left,
            right,
            ..
        } if operator.symbol == "@" => parse_lookup(left, right),
        _ => Err(AxialError::parse_error(
            "expected a property lookup or a scalar name",
        )),
    }
}

enum AxisSideSpec {
    Filtered(FilteredAxis),
    Entry(AxisEntry),
}

fn parse_lookup(left: &Expression, right: &Expression) -> AxialResult<Query> {
    if let Expression::Binary {
        operator,
        left: first,
        right: second,
        ..
    } = left
    {
        if operator.symbol == "," {
            let first_side = parse_axis_side(first)?;
            let second_side = parse_axis_side(second)?;
            let property = plain_name(right, "a property name")?;
            return Ok(match (first_side, second_side) {
                (AxisSideSpec::Filtered(rows), AxisSideSpec::Filtered(cols)) => {
                    Query::Matrix(MatrixQuery {
                        rows,
                        cols,
                        property,
                        eltwise: Vec::new(),
                    })
                }
                (AxisSideSpec::Filtered(filtered), AxisSideSpec::Entry(entry)) => {
                    Query::Vector(VectorQuery {
                        source: VectorSource::MatrixSlice {
                            filtered,
                            filtered_side: AxisSide::Rows,
                            entry,
                            property,
                        },
                        eltwise: Vec::new(),
                    })
                }
                (AxisSideSpec::Entry(entry), AxisSideSpec::Filtered(filtered)) => {
                    Query::Vector(VectorQuery {
                        source: VectorSource::MatrixSlice {
                            filtered,
                            filtered_side: AxisSide::Columns,
                            entry,
                            property,
                        },
                        eltwise: Vec::new(),
                    })
                }
                (AxisSideSpec::Entry(row), AxisSideSpec::Entry(col)) => {
                    Query::Scalar(ScalarQuery {
                        source: ScalarSource::MatrixEntry { row, col, property },
                        eltwise: Vec::new(),
                    })
                }
            });
        }
    }
    match parse_axis_side(left)? {
        AxisSideSpec::Entry(entry) => {
            let lookup = parse_property_chain(right)?;
            Ok(Query::Scalar(ScalarQuery {
                source: ScalarSource::VectorEntry { entry, lookup },
                eltwise: Vec::new(),
            }))
        }
        AxisSideSpec::Filtered(axis) => {
            let lookup = parse_axis_lookup(right)?;
            Ok(Query::Vector(VectorQuery {
                source: VectorSource::Property { axis, lookup },
                eltwise: Vec::new(),
            }))
        }
    }
}

fn parse_axis_side(expression: &Expression) -> AxialResult<AxisSideSpec> {
    if let Expression::Binary {
        operator,
        left,
        right,
        ..
    } = expression
    {
        if operator.symbol == "=" {
            let axis = plain_name(left, "an axis name")?;
            let entry = plain_name(right, "an axis entry name")?;
            return Ok(AxisSideSpec::Entry(AxisEntry { axis, entry }));
        }
    }
    Ok(AxisSideSpec::Filtered(parse_filtered_axis(expression)?))
}

fn parse_filtered_axis(expression: &Expression) -> AxialResult<FilteredAxis> {
    let mut filters = Vec::new();
    let mut current = expression;
    while let Expression::Binary {
        operator,
        left,
        right,
        ..
    } = current
    {
        let op = match operator.symbol {
            "&" => FilterOp::And,
            "|" => FilterOp::Or,
            "^" => FilterOp::Xor,
            _ => break,
        };
        filters.push(AxisFilter {
            op,
            lookup: parse_axis_lookup(right)?,
        });
        current = left;
    }
    filters.reverse();
    let axis = plain_name(current, "an axis name")?;
    Ok(FilteredAxis { axis, filters })
}

fn parse_axis_lookup(expression: &Expression) -> AxialResult<AxisLookup> {
    if let Expression::Binary {
        operator,
        left,
        right,
        ..
    } = expression
    {
        if let Some(op) = CompareOp::from_symbol(operator.symbol) {
            let (inverse, chain) = strip_inverse(left);
            let lookup = parse_property_chain(chain)?;
            let value = plain_name(right, "a literal value")?;
            return Ok(AxisLookup {
                lookup,
                inverse,
                comparison: Some(PropertyComparison { op, value }),
            });
        }
    }
    let (inverse, chain) = strip_inverse(expression);
    let lookup = parse_property_chain(chain)?;
    Ok(AxisLookup {
        lookup,
        inverse,
        comparison: None,
    })
}

fn strip_inverse(expression: &Expression) -> (bool, &Expression) {
    match expression {
        Expression::Unary {
            operator, operand, ..
        } if operator.symbol == "!" => (true, operand.as_ref()),
        _ => (false, expression),
    }
}

fn parse_property_chain(expression: &Expression) -> AxialResult<PropertyLookup> {
    let mut names = Vec::new();
    let mut current = expression;
    while let Expression::Binary {
        operator,
        left,
        right,
        ..
    } = current
    {
        if operator.symbol != "." {
            break;
        }
        names.push(plain_name(right, "a property name")?);
        current = left;
    }
    names.push(plain_name(current, "a property name")?);
    names.reverse();
    Ok(PropertyLookup { names })
}

fn plain_name(expression: &Expression, expected: &str) -> AxialResult<String> {
    match expression {
        Expression::Leaf(Token {
            kind: TokenKind::Name(name),
            ..
        }) => Ok(name.clone()),
        Expression::Leaf(Token { position, .. }) => Err(AxialError::parse_error(format!(
            "expected {}, got an operation at position {}",
            expected, position
        ))),
        Expression::Unary { position, .. } | Expression::Binary { position, .. } => {
            Err(AxialError::parse_error(format!(
                "expected {} at position {}",
                expected, position
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trips(text: &str) -> Query {
        let query = Query::parse(text).unwrap();
        let canonical = query.canonical();
        let reparsed = Query::parse(&canonical).unwrap();
        assert_eq!(reparsed, query, "canonical form re-parses: {}", canonical);
        assert_eq!(reparsed.canonical(), canonical, "canonical is idempotent");
        query
    }

    #[test]
    fn test_scalar_property() {
        let query = round_trips("version");
        assert!(matches!(
            query,
            Query::Scalar(ScalarQuery {
                source: ScalarSource::Property { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_vector_property_with_comparison() {
        let query = round_trips("cell @ age > 15");
        let Query::Vector(vector) = query else {
            panic!("expected a vector query");
        };
        let VectorSource::Property { axis, lookup } = &vector.source else {
            panic!("expected a property source");
        };
        assert_eq!(axis.axis, "cell");
        assert!(axis.filters.is_empty());
        assert_eq!(lookup.lookup.names, vec!["age".to_string()]);
        assert_eq!(
            lookup.comparison,
            Some(PropertyComparison {
                op: CompareOp::Greater,
                value: "15".to_string(),
            })
        );
    }

    #[test]
    fn test_chained_lookup() {
        let query = round_trips("cell @ type.color");
        let Query::Vector(vector) = query else {
            panic!("expected a vector query");
        };
        let VectorSource::Property { lookup, .. } = &vector.source else {
            panic!("expected a property source");
        };
        assert_eq!(
            lookup.lookup.names,
            vec!["type".to_string(), "color".to_string()]
        );
    }

    #[test]
    fn test_filters_fold_left_to_right() {
        let query = round_trips("cell & age > 15 | marker ^ ! outlier @ age");
        let Query::Vector(vector) = query else {
            panic!("expected a vector query");
        };
        let VectorSource::Property { axis, .. } = &vector.source else {
            panic!("expected a property source");
        };
        let ops: Vec<FilterOp> = axis.filters.iter().map(|filter| filter.op).collect();
        assert_eq!(ops, vec![FilterOp::And, FilterOp::Or, FilterOp::Xor]);
        assert!(axis.filters[2].lookup.inverse);
    }

    #[test]
    fn test_matrix_query_with_reduction() {
        let query = round_trips("cell, cell @ umi %> Sum(axis = Columns)");
        let Query::Vector(vector) = query else {
            panic!("expected a vector query after reduction");
        };
        let VectorSource::ReduceMatrix { operation, matrix } = &vector.source else {
            panic!("expected a matrix reduction");
        };
        assert_eq!(operation.name, "Sum");
        assert_eq!(matrix.property, "umi");
    }

    #[test]
    fn test_matrix_reduction_requires_axis() {
        let error = Query::parse("cell, cell @ umi %> Sum").unwrap_err();
        assert!(error.to_string().contains("missing parameter: axis"));
    }

    #[test]
    fn test_vector_reduction_makes_scalar() {
        let query = round_trips("cell @ age %> Sum");
        assert!(matches!(
            query,
            Query::Scalar(ScalarQuery {
                source: ScalarSource::ReduceVector { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_matrix_slice_sides() {
        let query = round_trips("cell, gene = FOXA1 @ umi");
        let Query::Vector(vector) = query else {
            panic!("expected a vector query");
        };
        let VectorSource::MatrixSlice {
            filtered_side,
            entry,
            ..
        } = &vector.source
        else {
            panic!("expected a matrix slice");
        };
        assert_eq!(*filtered_side, AxisSide::Rows);
        assert_eq!(entry.axis, "gene");
        assert_eq!(entry.entry, "FOXA1");

        let flipped = round_trips("gene = FOXA1, cell @ umi");
        let Query::Vector(vector) = flipped else {
            panic!("expected a vector query");
        };
        let VectorSource::MatrixSlice { filtered_side, .. } = &vector.source else {
            panic!("expected a matrix slice");
        };
        assert_eq!(*filtered_side, AxisSide::Columns);
    }

    #[test]
    fn test_entry_lookups() {
        assert!(matches!(
            round_trips("cell = c2 @ age"),
            Query::Scalar(ScalarQuery {
                source: ScalarSource::VectorEntry { .. },
                ..
            })
        ));
        assert!(matches!(
            round_trips("cell = c2, gene = FOXA1 @ umi"),
            Query::Scalar(ScalarQuery {
                source: ScalarSource::MatrixEntry { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_operation_fails() {
        let error = Query::parse("cell @ age %> NoSuchOperation").unwrap_err();
        assert!(error.to_string().contains("unknown operation"));
    }

    #[test]
    fn test_scalar_reduction_fails() {
        let error = Query::parse("version %> Sum").unwrap_err();
        assert!(error.to_string().contains("cannot reduce a scalar"));
    }

    #[test]
    fn test_canonical_sorts_params() {
        let query = Query::parse("cell @ age %> Log(eps = 1, base = 2)").unwrap();
        assert_eq!(
            query.canonical(),
            "cell @ age %> Log(base = 2, eps = 1)"
        );
    }

    #[test]
    fn test_quoted_names_round_trip() {
        let query = round_trips("'T cell' @ 'full name'");
        let Query::Vector(vector) = query else {
            panic!("expected a vector query");
        };
        let VectorSource::Property { axis, lookup } = &vector.source else {
            panic!("expected a property source");
        };
        assert_eq!(axis.axis, "T cell");
        assert_eq!(lookup.lookup.names, vec!["full name".to_string()]);
    }
}
