//! End-to-end repository scenarios over the memory backend.

use anyhow::Result;
use axial::errors::ErrorKind;
use axial::layout::{with_inefficient_action_policy, AxisSide, InefficientActionPolicy};
use axial::types::{DenseMatrix, MatrixLayout, SparseMatrix, SparseVector};
use axial::{MatrixData, Repository, ScalarValue, ValueType, VectorData};

fn seeded() -> Result<Repository> {
    let repo = Repository::memory("test!");
    repo.add_axis("cell", ["c1", "c2", "c3"])?;
    repo.set_vector("cell", "age", vec![10i64, 20, 30])?;
    Ok(repo)
}

#[test]
fn test_scalars_round_trip() -> Result<()> {
    let repo = Repository::memory("test!");
    assert!(!repo.has_scalar("version"));
    repo.set_scalar("version", 1i64)?;
    assert_eq!(repo.get_scalar("version")?, ScalarValue::I64(1));
    assert_eq!(repo.scalar_names(), vec!["version".to_string()]);
    let error = repo.set_scalar("version", 2i64).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::AlreadyExists);
    repo.delete_scalar("version")?;
    let error = repo.delete_scalar("version").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
    Ok(())
}

#[test]
fn test_reserved_name_aliases_repository() -> Result<()> {
    let repo = seeded()?;
    assert!(repo.has_scalar("name"));
    assert_eq!(repo.get_scalar("name")?, ScalarValue::Str("test!".into()));
    assert_eq!(
        repo.set_scalar("name", "other").unwrap_err().kind(),
        ErrorKind::ReservedName
    );
    assert_eq!(
        repo.delete_scalar("name").unwrap_err().kind(),
        ErrorKind::ReservedName
    );
    // As a vector, `name` reads as the axis entry names.
    assert_eq!(
        *repo.get_vector("cell", "name")?,
        VectorData::from(vec!["c1".to_string(), "c2".into(), "c3".into()])
    );
    assert_eq!(
        repo.set_vector("cell", "name", vec![1i64, 2, 3])
            .unwrap_err()
            .kind(),
        ErrorKind::ReservedName
    );
    Ok(())
}

#[test]
fn test_vector_length_must_match_axis() -> Result<()> {
    let repo = seeded()?;
    let error = repo
        .set_vector("cell", "weight", vec![1.0f64, 2.0])
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ShapeMismatch);
    let error = repo.set_vector("nucleus", "age", vec![1i64]).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
    assert_eq!(
        repo.set_vector("cell", "age", vec![1i64, 2, 3])
            .unwrap_err()
            .kind(),
        ErrorKind::AlreadyExists
    );
    Ok(())
}

#[test]
fn test_broadcast_writes() -> Result<()> {
    let repo = seeded()?;
    repo.set_vector("cell", "marked", ScalarValue::Bool(false))?;
    assert_eq!(
        *repo.get_vector("cell", "marked")?,
        VectorData::from(vec![false, false, false])
    );
    repo.set_matrix("cell", "cell", "ones", ScalarValue::I32(1))?;
    let ones = repo.get_matrix("cell", "cell", "ones")?;
    assert_eq!(ones.shape(), (3, 3));
    assert_eq!(ones.get(2, 1), ScalarValue::I32(1));
    Ok(())
}

#[test]
fn test_matrix_shape_and_layout_checks() -> Result<()> {
    let repo = seeded()?;
    repo.add_axis("gene", ["g1", "g2"])?;
    let bad_shape = DenseMatrix::row_major(VectorData::from(vec![0i64; 4]), 2, 2)?;
    assert_eq!(
        repo.set_matrix("cell", "gene", "umi", bad_shape)
            .unwrap_err()
            .kind(),
        ErrorKind::ShapeMismatch
    );
    // A compressed-by-row matrix is a derived layout, not a storable one.
    let by_rows = axial::relayout(
        &MatrixData::Sparse(SparseMatrix::by_columns(
            3,
            2,
            vec![0, 1, 2],
            vec![0, 2],
            VectorData::from(vec![1i64, 2]),
        )?),
        AxisSide::Rows,
    );
    assert_eq!(
        repo.set_matrix("cell", "gene", "umi", by_rows)
            .unwrap_err()
            .kind(),
        ErrorKind::TypeMismatch
    );
    Ok(())
}

#[test]
fn test_matrix_orientation_views_are_transposes() -> Result<()> {
    let repo = seeded()?;
    repo.add_axis("gene", ["g1", "g2"])?;
    // 3 x 2, row-major:
    //   1 2
    //   3 4
    //   5 6
    repo.set_matrix(
        "cell",
        "gene",
        "umi",
        DenseMatrix::row_major(VectorData::from(vec![1i64, 2, 3, 4, 5, 6]), 3, 2)?,
    )?;
    assert!(repo.has_matrix("gene", "cell", "umi"));
    let flipped = repo.get_matrix("gene", "cell", "umi")?;
    assert_eq!(flipped.shape(), (2, 3));
    assert_eq!(flipped.get(1, 2), ScalarValue::I64(6));
    assert_eq!(flipped.layout(), MatrixLayout::DenseColumns);
    let stored = repo.get_matrix("cell", "gene", "umi")?;
    assert!(stored.transposed().elementwise_equals(&flipped));
    Ok(())
}

#[test]
fn test_relayout_matrix_is_cached_and_pure() -> Result<()> {
    let repo = seeded()?;
    repo.set_matrix(
        "cell",
        "cell",
        "umi",
        DenseMatrix::row_major(VectorData::from((1..=9).collect::<Vec<i64>>()), 3, 3)?,
    )?;
    let stored = repo.get_matrix("cell", "cell", "umi")?;
    let relaid = repo.relayout_matrix("cell", "cell", "umi", AxisSide::Columns)?;
    assert_eq!(relaid.layout(), MatrixLayout::DenseColumns);
    assert!(stored.elementwise_equals(&relaid));
    assert_eq!(stored.layout(), MatrixLayout::DenseRows);
    let again = repo.relayout_matrix("cell", "cell", "umi", AxisSide::Columns)?;
    assert!(std::sync::Arc::ptr_eq(&relaid, &again));
    Ok(())
}

#[test]
fn test_delete_axis_cascades() -> Result<()> {
    let repo = seeded()?;
    repo.add_axis("gene", ["g1", "g2"])?;
    repo.set_matrix(
        "cell",
        "gene",
        "umi",
        DenseMatrix::row_major(VectorData::from(vec![0i64; 6]), 3, 2)?,
    )?;
    repo.delete_axis("cell")?;
    assert!(!repo.has_axis("cell"));
    assert!(!repo.has_vector("cell", "age"));
    assert!(!repo.has_matrix("cell", "gene", "umi"));
    assert!(!repo.has_matrix("gene", "cell", "umi"));
    assert_eq!(
        repo.delete_axis("cell").unwrap_err().kind(),
        ErrorKind::NotFound
    );
    Ok(())
}

#[test]
fn test_freeze_rejects_mutations() -> Result<()> {
    let repo = seeded()?;
    repo.freeze();
    assert!(repo.is_frozen());
    let error = repo.set_scalar("k", 1i64).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Frozen);
    assert_eq!(
        repo.delete_vector("cell", "age").unwrap_err().kind(),
        ErrorKind::Frozen
    );
    assert_eq!(
        repo.add_axis("gene", ["g1"]).unwrap_err().kind(),
        ErrorKind::Frozen
    );
    // Reads still work on a frozen repository.
    assert_eq!(
        *repo.get_vector("cell", "age")?,
        VectorData::from(vec![10i64, 20, 30])
    );
    repo.unfreeze();
    repo.set_scalar("k", 1i64)?;
    assert_eq!(repo.get_scalar("k")?, ScalarValue::I64(1));
    Ok(())
}

#[test]
fn test_read_only_view_exposes_reads() -> Result<()> {
    let repo = seeded()?;
    let view = repo.read_only();
    assert_eq!(view.name(), "test!");
    assert_eq!(view.axis_names(), vec!["cell".to_string()]);
    assert_eq!(
        *view.get_vector("cell", "age")?,
        VectorData::from(vec![10i64, 20, 30])
    );
    assert!(view.query("cell @ age")?.as_vector().is_some());
    Ok(())
}

#[test]
fn test_empty_dense_vector_population() -> Result<()> {
    let repo = seeded()?;
    repo.empty_dense_vector("cell", "rank", ValueType::I32, |values| {
        for index in 0..values.len() {
            values.set_value(index, &ScalarValue::I32(index as i32))?;
        }
        Ok(())
    })?;
    assert_eq!(
        *repo.get_vector("cell", "rank")?,
        VectorData::from(vec![0i32, 1, 2])
    );
    Ok(())
}

#[test]
fn test_empty_sparse_vector_population() -> Result<()> {
    let repo = seeded()?;
    repo.empty_sparse_vector("cell", "hits", ValueType::I64, 2, ValueType::U32, |values| {
        values.indices_mut().copy_from_slice(&[0, 2]);
        values.values_mut().set_value(0, &ScalarValue::I64(7))?;
        values.values_mut().set_value(1, &ScalarValue::I64(9))?;
        Ok(())
    })?;
    assert_eq!(
        *repo.get_vector("cell", "hits")?,
        VectorData::from(vec![7i64, 0, 9])
    );
    // A signed index kind is rejected.
    let error = repo
        .empty_sparse_vector("cell", "more", ValueType::I64, 1, ValueType::I32, |_| Ok(()))
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidParameter);
    Ok(())
}

#[test]
fn test_empty_sparse_matrix_population() -> Result<()> {
    let repo = seeded()?;
    repo.add_axis("gene", ["g1", "g2"])?;
    repo.empty_sparse_matrix(
        "cell",
        "gene",
        "umi",
        ValueType::I32,
        2,
        ValueType::U64,
        |matrix| {
            matrix.offsets_mut().copy_from_slice(&[0, 1, 2]);
            matrix.indices_mut().copy_from_slice(&[0, 2]);
            matrix.values_mut().set_value(0, &ScalarValue::I32(4))?;
            matrix.values_mut().set_value(1, &ScalarValue::I32(6))?;
            Ok(())
        },
    )?;
    let stored = repo.get_matrix("cell", "gene", "umi")?;
    assert_eq!(stored.layout(), MatrixLayout::SparseColumns);
    assert_eq!(stored.get(0, 0), ScalarValue::I32(4));
    assert_eq!(stored.get(2, 1), ScalarValue::I32(6));
    assert_eq!(stored.get(1, 0), ScalarValue::I32(0));
    Ok(())
}

#[test]
fn test_zero_length_axis() -> Result<()> {
    let repo = Repository::memory("empty");
    repo.add_axis("void", Vec::<String>::new())?;
    repo.add_axis("cell", ["c1", "c2"])?;
    repo.set_vector("void", "nothing", VectorData::from(Vec::<i64>::new()))?;
    assert_eq!(repo.get_vector("void", "nothing")?.len(), 0);
    repo.set_matrix(
        "void",
        "cell",
        "umi",
        DenseMatrix::row_major(VectorData::from(Vec::<i64>::new()), 0, 2)?,
    )?;
    assert_eq!(repo.get_matrix("void", "cell", "umi")?.shape(), (0, 2));
    Ok(())
}

#[test]
fn test_sparse_vector_storage_reads_dense() -> Result<()> {
    let repo = seeded()?;
    let sparse = SparseVector::new(3, vec![1], VectorData::from(vec![5i64]))?;
    repo.set_vector("cell", "spikes", sparse)?;
    assert_eq!(
        *repo.get_vector("cell", "spikes")?,
        VectorData::from(vec![0i64, 5, 0])
    );
    Ok(())
}

#[test]
fn test_description_is_deterministic() -> Result<()> {
    let repo = seeded()?;
    repo.add_axis("gene", ["g1", "g2"])?;
    repo.set_scalar("version", "1.0")?;
    repo.set_matrix(
        "cell",
        "gene",
        "umi",
        DenseMatrix::row_major(VectorData::from(vec![0i64; 6]), 3, 2)?,
    )?;
    let description = repo.description();
    assert_eq!(
        description,
        "repository: test!\n\
         axes:\n\
         \x20 cell: 3 entries\n\
         \x20 gene: 2 entries\n\
         scalars:\n\
         \x20 version: \"1.0\"\n\
         vectors:\n\
         \x20 cell:\n\
         \x20   age: 3 x i64\n\
         matrices:\n\
         \x20 cell , gene:\n\
         \x20   umi: 3 x 2 x i64 (row-major)\n"
    );
    assert_eq!(repo.description(), description);
    Ok(())
}

#[test]
fn test_inefficient_policy_gates_slices() -> Result<()> {
    let repo = seeded()?;
    repo.set_matrix(
        "cell",
        "cell",
        "umi",
        DenseMatrix::row_major(VectorData::from((1..=9).collect::<Vec<i64>>()), 3, 3)?,
    )?;
    // Fixing a column of a row-major matrix traverses the minor axis.
    with_inefficient_action_policy(InefficientActionPolicy::Error, || {
        let error = repo.query("cell, cell = c2 @ umi").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InefficientAction);
    });
    with_inefficient_action_policy(InefficientActionPolicy::Ignore, || {
        let result = repo.query("cell, cell = c2 @ umi").unwrap();
        let answer = result.as_vector().unwrap();
        assert_eq!(answer.values, VectorData::from(vec![2i64, 5, 8]));
    });
    Ok(())
}
