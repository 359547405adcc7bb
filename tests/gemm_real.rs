//! Blocked real GEMM against a naive triple loop.
//!
//! Small test policies make every blocking level kick in on matrices of a few dozen
//! elements: `MR = NR = 4`, `MC = NC = 8`, `KC = 4`.

use blockgemm::{
    gemm, gemm_default, try_gemm, ugemm, ugemm_scalar, validate, BlockSize, F32Blocks, F64Blocks,
    StridedMut, StridedRef,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

struct Small;
impl BlockSize for Small {
    const MC: usize = 8;
    const NC: usize = 8;
    const KC: usize = 4;
    const MR: usize = 4;
    const NR: usize = 4;
    const VECTOR_LENGTH: usize = 4;
    const ALIGN: usize = 64;
}

/// Same tiles as [`Small`], but one K slice covers every test size.
struct LongK;
impl BlockSize for LongK {
    const MC: usize = 8;
    const NC: usize = 8;
    const KC: usize = 64;
    const MR: usize = 4;
    const NR: usize = 4;
    const VECTOR_LENGTH: usize = 4;
    const ALIGN: usize = 64;
}

/// Scalar micro-kernel only.
struct Scalar;
impl BlockSize for Scalar {
    const MC: usize = 6;
    const NC: usize = 10;
    const KC: usize = 5;
    const MR: usize = 3;
    const NR: usize = 5;
    const VECTOR_LENGTH: usize = 1;
    const ALIGN: usize = 16;
}

const SIZES: [usize; 6] = [1, 3, 4, 5, 16, 17];

fn random_matrix(rng: &mut StdRng, len: usize) -> Vec<f64> {
    (0..len).map(|_| rng.random_range(-1.0..1.0)).collect()
}

/// Column-major `C = alpha·A·B + beta·C`, overwriting C when beta is zero.
#[allow(clippy::too_many_arguments)]
fn naive(m: usize, n: usize, k: usize, alpha: f64, a: &[f64], b: &[f64], beta: f64, c: &mut [f64]) {
    for j in 0..n {
        for i in 0..m {
            let dot: f64 = (0..k).map(|l| a[i + l * m] * b[l + j * k]).sum();
            c[i + j * m] = if beta == 0.0 {
                alpha * dot
            } else {
                alpha * dot + beta * c[i + j * m]
            };
        }
    }
}

fn assert_close(actual: &[f64], expected: &[f64], tol: f64, context: &str) {
    assert_eq!(actual.len(), expected.len());
    for (idx, (x, y)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (x - y).abs() <= tol * (1.0 + y.abs()),
            "{context}: mismatch at {idx}: {x} vs {y}"
        );
    }
}

#[test]
fn test_matches_naive_over_block_boundaries() {
    let mut rng = StdRng::seed_from_u64(42);

    for &m in &SIZES {
        for &n in &SIZES {
            for &k in &SIZES {
                let a = random_matrix(&mut rng, m * k);
                let b = random_matrix(&mut rng, k * n);
                let mut c = random_matrix(&mut rng, m * n);
                let mut expected = c.clone();
                naive(m, n, k, 0.75, &a, &b, -1.25, &mut expected);

                gemm(
                    0.75,
                    &StridedRef::col_major(&a, m, k),
                    &StridedRef::col_major(&b, k, n),
                    -1.25,
                    &mut StridedMut::col_major(&mut c, m, n),
                    Small,
                );
                assert_close(&c, &expected, 1e-12, &format!("m={m} n={n} k={k}"));
            }
        }
    }
}

#[test]
fn test_scalar_policy_matches_naive() {
    let mut rng = StdRng::seed_from_u64(7);
    for &(m, n, k) in &[(1, 1, 1), (2, 4, 6), (7, 11, 13), (13, 21, 9)] {
        let a = random_matrix(&mut rng, m * k);
        let b = random_matrix(&mut rng, k * n);
        let mut c = vec![0.0; m * n];
        let mut expected = c.clone();
        naive(m, n, k, 1.0, &a, &b, 0.0, &mut expected);

        gemm(
            1.0,
            &StridedRef::col_major(&a, m, k),
            &StridedRef::col_major(&b, k, n),
            0.0,
            &mut StridedMut::col_major(&mut c, m, n),
            Scalar,
        );
        assert_close(&c, &expected, 1e-12, &format!("m={m} n={n} k={k}"));
    }
}

#[test]
fn test_exact_5x5_integer_product() {
    let a: Vec<f64> = (0..25).map(|x| (x % 7) as f64).collect();
    let b: Vec<f64> = (0..25).map(|x| (x % 3) as f64 - 1.0).collect();
    let mut c = vec![0.0; 25];
    let mut expected = c.clone();
    naive(5, 5, 5, 1.0, &a, &b, 0.0, &mut expected);

    gemm(
        1.0,
        &StridedRef::col_major(&a, 5, 5),
        &StridedRef::col_major(&b, 5, 5),
        0.0,
        &mut StridedMut::col_major(&mut c, 5, 5),
        Small,
    );
    assert_eq!(c, expected);
}

#[test]
fn test_alpha_zero_equals_beta_scaling() {
    let (m, n, k) = (9, 6, 5);
    let a = vec![f64::NAN; m * k];
    let b = vec![f64::INFINITY; k * n];
    let mut c: Vec<f64> = (0..m * n).map(|x| x as f64).collect();
    let expected: Vec<f64> = c.iter().map(|x| x * -2.0).collect();

    gemm(
        0.0,
        &StridedRef::col_major(&a, m, k),
        &StridedRef::col_major(&b, k, n),
        -2.0,
        &mut StridedMut::col_major(&mut c, m, n),
        Small,
    );
    assert_eq!(c, expected);

    // beta = 0 as well: C is cleared, NaNs included
    let mut c = vec![f64::NAN; m * n];
    gemm(
        0.0,
        &StridedRef::col_major(&a, m, k),
        &StridedRef::col_major(&b, k, n),
        0.0,
        &mut StridedMut::col_major(&mut c, m, n),
        Small,
    );
    assert!(c.iter().all(|&x| x == 0.0));
}

#[test]
fn test_beta_zero_overwrites_nan() {
    let mut rng = StdRng::seed_from_u64(3);
    for &(m, n, k) in &[(4, 4, 4), (5, 17, 3), (16, 3, 9)] {
        let a = random_matrix(&mut rng, m * k);
        let b = random_matrix(&mut rng, k * n);
        let mut c = vec![f64::NAN; m * n];
        let mut expected = vec![0.0; m * n];
        naive(m, n, k, 2.0, &a, &b, 0.0, &mut expected);

        gemm(
            2.0,
            &StridedRef::col_major(&a, m, k),
            &StridedRef::col_major(&b, k, n),
            0.0,
            &mut StridedMut::col_major(&mut c, m, n),
            Small,
        );
        assert!(c.iter().all(|x| x.is_finite()), "m={m} n={n} k={k}");
        assert_close(&c, &expected, 1e-12, &format!("m={m} n={n} k={k}"));
    }
}

#[test]
fn test_k_slicing_does_not_change_result() {
    let mut rng = StdRng::seed_from_u64(11);
    let (m, n, k) = (17, 13, 37);
    let a = random_matrix(&mut rng, m * k);
    let b = random_matrix(&mut rng, k * n);
    let c0 = random_matrix(&mut rng, m * n);

    let mut c_sliced = c0.clone();
    let mut c_whole = c0.clone();
    gemm(
        1.5,
        &StridedRef::col_major(&a, m, k),
        &StridedRef::col_major(&b, k, n),
        0.5,
        &mut StridedMut::col_major(&mut c_sliced, m, n),
        Small,
    );
    gemm(
        1.5,
        &StridedRef::col_major(&a, m, k),
        &StridedRef::col_major(&b, k, n),
        0.5,
        &mut StridedMut::col_major(&mut c_whole, m, n),
        LongK,
    );
    assert_close(&c_sliced, &c_whole, 1e-12, "KC 4 vs KC 64");
}

#[test]
fn test_ragged_equals_zero_padded() {
    let mut rng = StdRng::seed_from_u64(5);
    let (m, n, k) = (6, 7, 5);
    let (mp, np) = (8, 8);
    let a = random_matrix(&mut rng, m * k);
    let b = random_matrix(&mut rng, k * n);

    // Embed A and B in zero-padded operands whose extents are tile multiples
    let mut a_pad = vec![0.0; mp * k];
    let mut b_pad = vec![0.0; k * np];
    for l in 0..k {
        a_pad[l * mp..l * mp + m].copy_from_slice(&a[l * m..(l + 1) * m]);
    }
    for j in 0..n {
        b_pad[j * k..(j + 1) * k].copy_from_slice(&b[j * k..(j + 1) * k]);
    }

    let mut c = vec![0.0; m * n];
    let mut c_pad = vec![0.0; mp * np];
    gemm(
        1.0,
        &StridedRef::col_major(&a, m, k),
        &StridedRef::col_major(&b, k, n),
        0.0,
        &mut StridedMut::col_major(&mut c, m, n),
        Small,
    );
    gemm(
        1.0,
        &StridedRef::col_major(&a_pad, mp, k),
        &StridedRef::col_major(&b_pad, k, np),
        0.0,
        &mut StridedMut::col_major(&mut c_pad, mp, np),
        Small,
    );

    for j in 0..np {
        for i in 0..mp {
            let padded = c_pad[i + j * mp];
            if i < m && j < n {
                assert_eq!(c[i + j * m], padded, "({i}, {j})");
            } else {
                assert_eq!(padded, 0.0, "padding ({i}, {j})");
            }
        }
    }
}

#[test]
fn test_strided_layouts() {
    let mut rng = StdRng::seed_from_u64(19);
    let (m, n, k) = (9, 10, 11);
    let a = random_matrix(&mut rng, m * k);
    let b = random_matrix(&mut rng, k * n);
    let mut expected = vec![0.0; m * n];
    naive(m, n, k, 1.0, &a, &b, 0.0, &mut expected);

    // A handed over as a row-major copy
    let a_rm: Vec<f64> = (0..m)
        .flat_map(|i| (0..k).map(move |l| (i, l)))
        .map(|(i, l)| a[i + l * m])
        .collect();

    // C written row-major inside a larger buffer with padding between rows
    let ld = n + 3;
    let mut c_buf = vec![f64::NAN; m * ld];
    let mut c_view = StridedMut::new(&mut c_buf, 0, m, n, ld as isize, 1).unwrap();
    gemm(
        1.0,
        &StridedRef::row_major(&a_rm, m, k),
        &StridedRef::col_major(&b, k, n),
        0.0,
        &mut c_view,
        Small,
    );
    for i in 0..m {
        for j in 0..n {
            let x = c_buf[i * ld + j];
            let y = expected[i + j * m];
            assert!((x - y).abs() <= 1e-12 * (1.0 + y.abs()), "({i}, {j}): {x} vs {y}");
        }
        assert!(c_buf[i * ld + n..(i + 1) * ld].iter().all(|x| x.is_nan()));
    }

    // C walked backwards in both directions
    let mut c_rev = vec![0.0; m * n];
    let last = m * n - 1;
    let mut view = StridedMut::new(&mut c_rev, last, m, n, -1, -(m as isize)).unwrap();
    gemm(
        1.0,
        &StridedRef::col_major(&a, m, k),
        &StridedRef::col_major(&b, k, n),
        0.0,
        &mut view,
        Small,
    );
    for (idx, &y) in expected.iter().enumerate() {
        let x = c_rev[last - idx];
        assert!((x - y).abs() <= 1e-12 * (1.0 + y.abs()), "reversed {idx}: {x} vs {y}");
    }
}

#[test]
fn test_mixed_precision_operands() {
    let a: Vec<f32> = (0..12).map(|x| x as f32 * 0.5).collect();
    let b: Vec<f32> = (0..12).map(|x| 1.0 - x as f32).collect();
    let a64: Vec<f64> = a.iter().map(|&x| f64::from(x)).collect();
    let b64: Vec<f64> = b.iter().map(|&x| f64::from(x)).collect();

    let mut c = vec![0.0f64; 9];
    let mut expected = c.clone();
    naive(3, 3, 4, 1.0, &a64, &b64, 0.0, &mut expected);
    gemm(
        1.0,
        &StridedRef::col_major(&a, 3, 4),
        &StridedRef::col_major(&b, 4, 3),
        0.0,
        &mut StridedMut::col_major(&mut c, 3, 3),
        Small,
    );
    assert_eq!(c, expected);
}

#[test]
fn test_simd_and_scalar_microkernels_agree() {
    let mut rng = StdRng::seed_from_u64(23);
    let kc = 29;
    let a: Vec<f32> = (0..kc * F32Blocks::MR).map(|_| rng.random_range(-1.0..1.0)).collect();
    let b: Vec<f32> = (0..kc * F32Blocks::NR).map(|_| rng.random_range(-1.0..1.0)).collect();
    let tile = F32Blocks::MR * F32Blocks::NR;
    let c0: Vec<f32> = (0..tile).map(|_| rng.random_range(-1.0..1.0)).collect();

    let mut c_simd = c0.clone();
    let mut c_scalar = c0;
    ugemm::<F32Blocks, f32>(
        kc,
        0.5,
        &a,
        &b,
        2.0,
        &mut StridedMut::col_major(&mut c_simd, F32Blocks::MR, F32Blocks::NR),
    );
    ugemm_scalar::<F32Blocks, f32>(
        kc,
        0.5,
        &a,
        &b,
        2.0,
        &mut StridedMut::col_major(&mut c_scalar, F32Blocks::MR, F32Blocks::NR),
    );
    for (x, y) in c_simd.iter().zip(&c_scalar) {
        assert!((x - y).abs() <= 1e-5 * (1.0 + y.abs()), "{x} vs {y}");
    }
}

#[test]
fn test_default_policies() {
    assert!(validate::<F32Blocks, f32>().is_ok());
    assert!(validate::<F64Blocks, f64>().is_ok());

    let mut rng = StdRng::seed_from_u64(99);
    let (m, n, k) = (37, 29, 600);
    let a = random_matrix(&mut rng, m * k);
    let b = random_matrix(&mut rng, k * n);
    let mut expected = vec![0.0; m * n];
    naive(m, n, k, 1.0, &a, &b, 0.0, &mut expected);

    let mut c = vec![0.0; m * n];
    gemm_default(
        1.0,
        &StridedRef::col_major(&a, m, k),
        &StridedRef::col_major(&b, k, n),
        0.0,
        &mut StridedMut::col_major(&mut c, m, n),
    );
    assert_close(&c, &expected, 1e-10, "F64Blocks");

    let a32: Vec<f32> = a.iter().map(|&x| x as f32).collect();
    let b32: Vec<f32> = b.iter().map(|&x| x as f32).collect();
    let mut c32 = vec![0.0f32; m * n];
    try_gemm(
        1.0f32,
        &StridedRef::col_major(&a32, m, k),
        &StridedRef::col_major(&b32, k, n),
        0.0,
        &mut StridedMut::col_major(&mut c32, m, n),
        F32Blocks,
    )
    .unwrap();
    for (x, y) in c32.iter().zip(&expected) {
        assert!((f64::from(*x) - y).abs() <= 1e-3 * (1.0 + y.abs()), "{x} vs {y}");
    }
}
