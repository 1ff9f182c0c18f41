//! End-to-end query scenarios: parsing, evaluation, operations, caching.

use anyhow::Result;
use axial::errors::{AxialError, AxialResult, ErrorKind};
use axial::layout::{with_inefficient_action_policy, InefficientActionPolicy};
use axial::ops::EltwiseOperation;
use axial::types::DenseMatrix;
use axial::{register_operation, Query, Repository, ScalarValue, VectorData};

fn cells() -> Result<Repository> {
    let repo = Repository::memory("cells!");
    repo.add_axis("cell", ["c1", "c2", "c3"])?;
    repo.set_vector("cell", "age", vec![10i64, 20, 30])?;
    Ok(repo)
}

fn typed_cells() -> Result<Repository> {
    let repo = cells()?;
    repo.add_axis("type", ["T", "B"])?;
    repo.set_vector(
        "cell",
        "type",
        vec!["T".to_string(), "B".into(), "T".into()],
    )?;
    repo.set_vector(
        "type",
        "color",
        vec!["red".to_string(), "blue".into()],
    )?;
    Ok(repo)
}

#[test]
fn test_comparison_filters_vector_values() -> Result<()> {
    let repo = cells()?;
    let result = repo.query("cell @ age > 15")?;
    let answer = result.as_vector().expect("a present vector");
    assert_eq!(answer.values, VectorData::from(vec![20i64, 30]));
    assert_eq!(answer.names, vec!["c2".to_string(), "c3".to_string()]);
    assert_eq!(answer.axis, "cell");
    Ok(())
}

#[test]
fn test_chained_lookup() -> Result<()> {
    let repo = typed_cells()?;
    let result = repo.query("cell @ type.color")?;
    let answer = result.as_vector().expect("a present vector");
    assert_eq!(
        answer.values,
        VectorData::from(vec!["red".to_string(), "blue".into(), "red".into()])
    );
    Ok(())
}

#[test]
fn test_matrix_reduction_to_per_column_sums() -> Result<()> {
    let repo = cells()?;
    repo.set_matrix(
        "cell",
        "cell",
        "umi",
        DenseMatrix::row_major(VectorData::from((1..=9).collect::<Vec<i64>>()), 3, 3)?,
    )?;
    let result = repo.query("cell, cell @ umi %> Sum(axis = Columns)")?;
    let answer = result.as_vector().expect("a present vector");
    assert_eq!(answer.values, VectorData::from(vec![12i64, 15, 18]));
    assert_eq!(answer.names.len(), 3);
    Ok(())
}

#[test]
fn test_empty_filter_is_absent_not_error() -> Result<()> {
    let repo = cells()?;
    let result = repo.query("cell @ age > 1000")?;
    assert!(result.is_absent());
    assert!(result.as_vector().is_none());
    Ok(())
}

#[test]
fn test_frozen_round_trip() -> Result<()> {
    let repo = cells()?;
    repo.freeze();
    let error = repo.set_scalar("k", 1i64).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Frozen);
    repo.unfreeze();
    repo.set_scalar("k", 1i64)?;
    assert_eq!(
        repo.query("k")?.as_scalar(),
        Some(&ScalarValue::I64(1))
    );
    Ok(())
}

struct Square;

impl EltwiseOperation for Square {
    fn name(&self) -> &str {
        "Square"
    }

    fn apply_vector(&self, values: &VectorData) -> AxialResult<VectorData> {
        match values {
            VectorData::I64(data) => Ok(VectorData::I64(data.iter().map(|v| v * v).collect())),
            VectorData::F64(data) => Ok(VectorData::F64(data.iter().map(|v| v * v).collect())),
            other => Err(AxialError::type_mismatch(format!(
                "cannot square a vector of: {}",
                other.kind()
            ))),
        }
    }
}

#[test]
fn test_registered_operation_and_append_only_registry() -> Result<()> {
    register_operation!(eltwise "Square", [], |_params| Ok(Box::new(Square)))
        .expect("first registration succeeds");
    let repo = cells()?;
    let result = repo.query("cell @ age %> Square")?;
    let answer = result.as_vector().expect("a present vector");
    assert_eq!(answer.values, VectorData::from(vec![100i64, 400, 900]));
    // The registry is append-only within a process.
    let error = register_operation!(eltwise "Square", [], |_params| Ok(Box::new(Square)))
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::AlreadyExists);
    Ok(())
}

#[test]
fn test_filters_combine_and_invert() -> Result<()> {
    let repo = typed_cells()?;
    repo.set_vector("cell", "marked", vec![true, true, false])?;
    let result = repo.query("cell & marked @ age")?;
    let answer = result.as_vector().expect("a present vector");
    assert_eq!(answer.values, VectorData::from(vec![10i64, 20]));

    let result = repo.query("cell & ! marked @ age")?;
    let answer = result.as_vector().expect("a present vector");
    assert_eq!(answer.values, VectorData::from(vec![30i64]));

    let result = repo.query("cell & marked | type = B @ age")?;
    let answer = result.as_vector().expect("a present vector");
    assert_eq!(answer.values, VectorData::from(vec![10i64, 20]));

    // marked = [t, t, f] folded with xor of (type = T) = [t, f, t].
    let result = repo.query("cell & marked ^ type = T @ age")?;
    let answer = result.as_vector().expect("a present vector");
    assert_eq!(answer.values, VectorData::from(vec![20i64, 30]));
    Ok(())
}

#[test]
fn test_non_boolean_filter_is_a_type_error() -> Result<()> {
    let repo = cells()?;
    let error = repo.query("cell & age @ age").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TypeMismatch);
    assert!(error.to_string().contains("for the query"));
    Ok(())
}

#[test]
fn test_match_is_anchored() -> Result<()> {
    let repo = typed_cells()?;
    // "r" does not match "red": the pattern is anchored on both ends.
    assert!(repo.query("type @ color ~ r")?.is_absent());
    let result = repo.query("type @ color ~ re.")?;
    let answer = result.as_vector().expect("a present vector");
    assert_eq!(answer.values, VectorData::from(vec!["red".to_string()]));
    let result = repo.query("type @ color !~ red")?;
    let answer = result.as_vector().expect("a present vector");
    assert_eq!(answer.values, VectorData::from(vec!["blue".to_string()]));
    // Regex on numbers is a type error.
    let error = repo.query("cell @ age ~ 1.*").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TypeMismatch);
    Ok(())
}

#[test]
fn test_bad_literal_is_a_type_error() -> Result<()> {
    let repo = cells()?;
    let error = repo.query("cell @ age > fifteen").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TypeMismatch);
    Ok(())
}

#[test]
fn test_chained_lookup_through_missing_entry() -> Result<()> {
    let repo = cells()?;
    repo.add_axis("type", ["T", "B"])?;
    repo.set_vector(
        "cell",
        "type",
        vec!["T".to_string(), "B".into(), "Q".into()],
    )?;
    repo.set_vector(
        "type",
        "color",
        vec!["red".to_string(), "blue".into()],
    )?;
    let error = repo.query("cell @ type.color").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
    let message = error.to_string();
    assert!(message.contains("missing entry: Q"));
    assert!(message.contains("for the axis: type"));
    assert!(message.contains("for the chained property: type"));
    Ok(())
}

#[test]
fn test_entry_lookups() -> Result<()> {
    let repo = typed_cells()?;
    repo.set_matrix(
        "cell",
        "cell",
        "umi",
        DenseMatrix::row_major(VectorData::from((1..=9).collect::<Vec<i64>>()), 3, 3)?,
    )?;
    assert_eq!(
        repo.query("cell = c2 @ age")?.as_scalar(),
        Some(&ScalarValue::I64(20))
    );
    assert_eq!(
        repo.query("cell = c2 @ type.color")?.as_scalar(),
        Some(&ScalarValue::Str("blue".into()))
    );
    assert_eq!(
        repo.query("cell = c1, cell = c3 @ umi")?.as_scalar(),
        Some(&ScalarValue::I64(3))
    );
    let error = repo.query("cell = c9 @ age").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
    Ok(())
}

#[test]
fn test_matrix_slice_with_filter() -> Result<()> {
    let repo = typed_cells()?;
    repo.set_matrix(
        "cell",
        "cell",
        "umi",
        DenseMatrix::row_major(VectorData::from((1..=9).collect::<Vec<i64>>()), 3, 3)?,
    )?;
    with_inefficient_action_policy(InefficientActionPolicy::Ignore, || -> Result<()> {
        // Row c1 over the filtered column axis.
        let result = repo.query("cell = c1, cell & age > 15 @ umi")?;
        let answer = result.as_vector().expect("a present vector");
        assert_eq!(answer.values, VectorData::from(vec![2i64, 3]));
        assert_eq!(answer.names, vec!["c2".to_string(), "c3".to_string()]);
        Ok(())
    })?;
    Ok(())
}

#[test]
fn test_vector_reduction_and_eltwise_chain() -> Result<()> {
    let repo = cells()?;
    assert_eq!(
        repo.query("cell @ age %> Sum")?.as_scalar(),
        Some(&ScalarValue::I64(60))
    );
    assert_eq!(
        repo.query("cell @ age %> Mean")?.as_scalar(),
        Some(&ScalarValue::F64(20.0))
    );
    let result = repo.query("cell @ age %> Cast(dtype = f64) %> Log(base = 10)")?;
    let answer = result.as_vector().expect("a present vector");
    let raw = answer.values.as_f64_slice().expect("f64 values");
    assert!((raw[0] - 1.0).abs() < 1e-12);
    // Reducing an absent result stays absent.
    assert!(repo.query("cell @ age > 1000 %> Sum")?.is_absent());
    Ok(())
}

#[test]
fn test_matrix_eltwise_then_reduce() -> Result<()> {
    let repo = cells()?;
    repo.set_matrix(
        "cell",
        "cell",
        "umi",
        DenseMatrix::row_major(VectorData::from(vec![-1i64, 0, 0, 0, -2, 0, 0, 0, -3]), 3, 3)?,
    )?;
    let result = repo.query("cell, cell @ umi %> Abs %> Sum(axis = Rows)")?;
    let answer = result.as_vector().expect("a present vector");
    assert_eq!(answer.values, VectorData::from(vec![1i64, 2, 3]));
    Ok(())
}

#[test]
fn test_filtered_matrix_query() -> Result<()> {
    let repo = cells()?;
    repo.set_matrix(
        "cell",
        "cell",
        "umi",
        DenseMatrix::row_major(VectorData::from((1..=9).collect::<Vec<i64>>()), 3, 3)?,
    )?;
    let result = repo.query("cell & age > 15, cell @ umi")?;
    let answer = result.as_matrix().expect("a present matrix");
    assert_eq!(answer.values.shape(), (2, 3));
    assert_eq!(answer.row_names, vec!["c2".to_string(), "c3".to_string()]);
    assert_eq!(answer.col_names.len(), 3);
    assert_eq!(answer.values.get(0, 0), ScalarValue::I64(4));
    // An all-false mask on either side is absent.
    assert!(repo.query("cell & age > 1000, cell @ umi")?.is_absent());
    Ok(())
}

#[test]
fn test_query_cache_returns_shared_results() -> Result<()> {
    let repo = cells()?;
    let first = repo.query("cell @ age")?;
    let second = repo.query("cell  @  age")?;
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    // Mutation invalidates the cache.
    repo.set_scalar("touch", 1i64)?;
    let third = repo.query("cell @ age")?;
    assert!(!std::sync::Arc::ptr_eq(&first, &third));
    assert_eq!(first.as_ref(), third.as_ref());
    Ok(())
}

#[test]
fn test_canonical_round_trip_through_parse() -> Result<()> {
    for text in [
        "version",
        "cell @ age",
        "cell @ age > 15",
        "cell & marked | type = B @ age",
        "cell @ type.color",
        "cell, gene @ umi",
        "cell, gene = FOXA1 @ umi",
        "cell = c1 @ age",
        "cell = c1, gene = g1 @ umi",
        "cell, cell @ umi %> Sum(axis = Columns)",
        "cell @ age %> Abs %> Log(base = 2, eps = 1)",
    ] {
        let node = Query::parse(text)?;
        let canonical = node.canonical();
        assert_eq!(Query::parse(&canonical)?, node, "round trip of {}", text);
        assert_eq!(Query::parse(&canonical)?.canonical(), canonical);
    }
    Ok(())
}

#[test]
fn test_operation_parameter_errors() -> Result<()> {
    let repo = cells()?;
    let error = repo.query("cell @ age %> Log(bases = 2)").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidParameter);
    assert!(error.to_string().contains("recognized: base, eps"));
    let error = repo.query("cell @ age %> Cast").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidParameter);
    let error = repo.query("cell @ age %> Nope").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ParseError);
    Ok(())
}

#[test]
fn test_operations_are_pure() -> Result<()> {
    let repo = cells()?;
    let first = repo.query("cell @ age %> Abs")?.as_ref().clone();
    repo.set_scalar("touch", 1i64)?;
    let second = repo.query("cell @ age %> Abs")?.as_ref().clone();
    assert_eq!(first, second);
    Ok(())
}
