use linkern::{LinalgError, Matrix, MatrixKind, Operand, SparseVector, Vector};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Dense matrix with roughly `density` of its entries non-zero
fn random_dense(rng: &mut StdRng, rows: usize, cols: usize, density: f64) -> Matrix<f64> {
    let values = (0..rows * cols)
        .map(|_| {
            if rng.gen_bool(density) {
                rng.gen_range(-10.0..10.0)
            } else {
                0.0
            }
        })
        .collect();
    Matrix::dense_from_column_major(rows, cols, values).unwrap()
}

#[test]
fn dense_to_csr_round_trip_is_exact() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let rows = rng.gen_range(1..12);
        let cols = rng.gen_range(1..12);
        let dense = random_dense(&mut rng, rows, cols, 0.3);
        let csr = dense.to_csr();
        assert_eq!(csr.kind(), MatrixKind::Csr);
        assert_eq!(csr.to_dense(), dense);
    }
}

#[test]
fn writing_zero_removes_the_structural_entry() {
    let mut csr = Matrix::csr_from_triplets(3, 3, &[(0, 1, 2.0), (2, 2, 5.0)]).unwrap();
    csr.set(0, 1, 0.0).unwrap();
    assert_eq!(csr.non_zero_count(), 1);
    assert_eq!(csr.get(0, 1).unwrap(), 0.0);

    let mut vector = Vector::sparse_from_slice(&[0.0, 1.0, 2.0]).unwrap();
    vector.set(1, 0.0).unwrap();
    assert_eq!(vector.non_zero_count(), 1);
    assert_eq!(vector.get(1).unwrap(), 0.0);
}

#[test]
fn sparse_vector_insert_then_clear_scenario() {
    let mut vector = Vector::<f64>::sparse(5).unwrap();
    vector.set(2, 5.0).unwrap();
    vector.set(2, 0.0).unwrap();
    assert_eq!(vector.non_zero_count(), 0);
    assert_eq!(vector.get(2).unwrap(), 0.0);
}

#[test]
fn symmetric_reads_mirror_after_upper_writes() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut symmetric = Matrix::<f64>::symmetric(6).unwrap();
    for _ in 0..40 {
        let row = rng.gen_range(0..6);
        let col = rng.gen_range(row..6);
        symmetric.set(row, col, rng.gen_range(-1.0..1.0)).unwrap();
    }
    for row in 0..6 {
        for col in 0..6 {
            assert_eq!(symmetric.get(row, col).unwrap(), symmetric.get(col, row).unwrap());
        }
    }
}

#[test]
fn diagonal_rejects_off_diagonal_writes() {
    let mut diagonal = Matrix::diagonal_from_values(3, 3, vec![1.0, 2.0, 3.0]).unwrap();
    let before = diagonal.clone();
    assert!(matches!(
        diagonal.set(0, 2, 4.0),
        Err(LinalgError::StructuralViolation { kind: MatrixKind::Diagonal, .. })
    ));
    assert_eq!(diagonal, before);

    let dense = Matrix::dense_from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
    let mut diagonal = Matrix::<f64>::diagonal(2, 2).unwrap();
    assert!(dense.add_into(&dense, &mut diagonal).is_err());
    assert_eq!(diagonal.non_zero_count(), 0);
}

#[test]
fn self_aliasing_add_matches_copy_through_temporary() {
    let mut rng = StdRng::seed_from_u64(3);
    let dense = random_dense(&mut rng, 5, 4, 0.5);
    for original in [dense.clone(), dense.to_csr()] {
        let mut aliased = original.clone();
        aliased.add_in_place(Operand::This).unwrap();

        let mut temporary = original.create_matrix(5, 4).unwrap();
        original.add_into(&original.clone(), &mut temporary).unwrap();
        let mut expected = original.clone();
        temporary.copy_to(&mut expected).unwrap();

        assert_eq!(aliased, expected);
    }
}

#[test]
fn dense_and_csr_products_agree() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..10 {
        let (m, k, n) = (rng.gen_range(1..10), rng.gen_range(1..10), rng.gen_range(1..10));
        let a = random_dense(&mut rng, m, k, 0.4);
        let b = random_dense(&mut rng, k, n, 0.4);
        let dense = a.multiply(&b).unwrap();
        let sparse = a.to_csr().multiply(&b.to_csr()).unwrap();
        assert_eq!(sparse.kind(), MatrixKind::Csr);
        assert!(sparse.to_dense().almost_equal(&dense, 1e-9));

        let mixed = a.multiply(&b.to_csr()).unwrap();
        assert!(mixed.almost_equal(&dense, 1e-9));
    }
}

#[test]
fn csr_times_own_transpose_is_squared_diagonal() {
    let csr = Matrix::csr_from_triplets(3, 3, &[(0, 0, 2.0), (1, 1, 3.0), (2, 2, 4.0)]).unwrap();
    let product = csr.multiply(&csr.transpose()).unwrap();
    let expected = Matrix::diagonal_from_values(3, 3, vec![4.0, 9.0, 16.0]).unwrap();
    assert!(product.almost_equal(&expected, 0.0));
    assert_eq!(product.non_zero_count(), 3);
}

#[test]
fn matrix_vector_products_agree_across_kinds() {
    let mut rng = StdRng::seed_from_u64(5);
    let a = random_dense(&mut rng, 6, 4, 0.5);
    let x = Vector::dense_from_vec((0..4).map(|i| i as f64 - 1.5).collect()).unwrap();
    let expected = a.multiply_vector(&x).unwrap().to_vec();
    for v in [x.clone(), x.to_sparse()] {
        let actual = a.to_csr().multiply_vector(&v).unwrap().to_vec();
        for (want, got) in expected.iter().zip(&actual) {
            assert!((want - got).abs() < 1e-12);
        }
    }
}

#[test]
fn failed_operations_leave_results_untouched() {
    let a = Matrix::dense_from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
    let mut wrong_shape = Matrix::csr_from_triplets(3, 3, &[(1, 1, 9.0)]).unwrap();
    let before = wrong_shape.clone();
    assert!(matches!(
        a.add_into(&a, &mut wrong_shape),
        Err(LinalgError::DimensionMismatch { .. })
    ));
    assert_eq!(wrong_shape, before);

    let mut symmetric = Matrix::<f64>::symmetric(2).unwrap();
    assert!(a.multiply_into(&a, &mut symmetric).is_err());
    assert_eq!(symmetric.non_zero_count(), 0);
}

proptest! {
    #[test]
    fn ascending_inserts_keep_indices_sorted(
        count in 1usize..200,
        picks in proptest::collection::vec((0usize..200, -100.0f64..100.0), 0..80),
    ) {
        let mut indices: Vec<usize> = picks.iter().map(|&(i, _)| i % count).collect();
        indices.sort_unstable();
        let mut vector = SparseVector::new(count).unwrap();
        for (&index, &(_, value)) in indices.iter().zip(&picks) {
            vector.set(index, value).unwrap();
            prop_assert!(vector.check_invariants().is_ok());
        }
    }

    #[test]
    fn arbitrary_writes_match_a_dense_model(
        count in 1usize..64,
        writes in proptest::collection::vec((0usize..64, prop_oneof![Just(0.0f64), -5.0f64..5.0]), 0..120),
    ) {
        let mut sparse = Vector::sparse(count).unwrap();
        let mut model = vec![0.0; count];
        for &(index, value) in &writes {
            let index = index % count;
            sparse.set(index, value).unwrap();
            model[index] = value;
        }
        prop_assert_eq!(sparse.to_vec(), model.clone());
        prop_assert_eq!(sparse.non_zero_count(), model.iter().filter(|v| **v != 0.0).count());
    }

    #[test]
    fn csr_writes_match_a_dense_model(
        writes in proptest::collection::vec((0usize..5, 0usize..7, prop_oneof![Just(0.0f64), -5.0f64..5.0]), 0..80),
    ) {
        let mut csr = Matrix::csr(5, 7).unwrap();
        let mut model = Matrix::dense(5, 7).unwrap();
        for &(row, col, value) in &writes {
            csr.set(row, col, value).unwrap();
            model.set(row, col, value).unwrap();
        }
        prop_assert_eq!(csr.to_dense(), model.clone());
        prop_assert_eq!(csr.non_zero_count(), model.non_zero_count());
    }
}

#[cfg(feature = "serde")]
#[test]
fn matrices_and_vectors_serialize() {
    let csr = Matrix::csr_from_triplets(2, 3, &[(0, 2, 1.5), (1, 0, -2.0)]).unwrap();
    let json = serde_json::to_string(&csr).unwrap();
    let back: Matrix<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, csr);

    let vector = Vector::sparse_from_slice(&[0.0, 3.0]).unwrap();
    let json = serde_json::to_string(&vector).unwrap();
    let back: Vector<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, vector);
}
