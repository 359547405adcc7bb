//! The frame routine: cache blocking around the macro-kernel.
//!
//! `gemm_` walks C in `NC`-wide column blocks, the reduction dimension in `KC`
//! slices and A in `MC`-tall row blocks:
//!
//! ```text
//! for each column block j            (nc ≤ NC columns of B and C)
//!   for each K slice l               (kc ≤ KC)
//!     pack B[l, j]                   once, reused by every row block
//!     for each row block i           (mc ≤ MC rows of A and C)
//!       pack A[i, l]
//!       C[i, j] = alpha·A[i, l]·B[l, j] + (l == 0 ? beta : 1)·C[i, j]
//! ```
//!
//! Beta is only applied by the first K slice; later slices accumulate on top of it.

use std::cmp::min;
use std::marker::PhantomData;

use crate::block_size::{fits_simd_register, BlockSize, Checked};
use crate::error::{same, Result};
use crate::linalg::blas::scal::gescal;
use crate::matrix::{Matrix, MatrixMut, StridedMut, SubMatrix};
use crate::scalar::Element;
use crate::simd::SimdTile;
use crate::utils::AlignedBuf;

/// Runs the blocked loop nest with caller-provided pack buffers.
///
/// This is the engine behind [`gemm`]: no dimension checks beyond assertions, no
/// degenerate-case shortcuts, no allocation. `a` is `m × k`, `b` is `k × n` and `c`
/// is `m × n`; `buf_a` and `buf_b` must hold at least `PLANES · MC · KC` and
/// `PLANES · NC · KC` reals.
///
/// # Panics
///
/// Panics if the shapes disagree or a buffer is too short.
#[allow(clippy::too_many_arguments)]
pub fn gemm_<B, T, MA, MB>(
    alpha: T,
    a: &MA,
    b: &MB,
    beta: T,
    c: &mut StridedMut<'_, T>,
    buf_a: &mut [T::Real],
    buf_b: &mut [T::Real],
) where
    B: BlockSize,
    T: Element,
    MA: Matrix,
    MB: Matrix,
    MA::Elem: Into<T>,
    MB::Elem: Into<T>,
{
    let () = Checked::<B, T::Real>::POLICY;

    let (m, k, n) = (a.rows(), a.cols(), b.cols());
    assert_eq!(b.rows(), k, "inner dimensions of A and B differ");
    assert!(c.rows() == m && c.cols() == n, "C must be {m}x{n}");
    assert!(
        buf_a.len() >= T::PLANES * B::MC * B::KC,
        "A pack buffer too short: {}",
        buf_a.len()
    );
    assert!(
        buf_b.len() >= T::PLANES * B::NC * B::KC,
        "B pack buffer too short: {}",
        buf_b.len()
    );

    let (mb, nb, kb) = (m.div_ceil(B::MC), n.div_ceil(B::NC), k.div_ceil(B::KC));

    for j in 0..nb {
        let nc = min(B::NC, n - j * B::NC);

        for l in 0..kb {
            let kc = min(B::KC, k - l * B::KC);
            let beta_l = if l == 0 { beta } else { T::one() };
            log::trace!("gemm: column block {j}/{nb}, K slice {l}/{kb} ({kc}x{nc})");

            T::pack_b::<B, _>(&SubMatrix::new(b, l * B::KC, j * B::NC, kc, nc), buf_b);

            for i in 0..mb {
                let mc = min(B::MC, m - i * B::MC);
                T::pack_a::<B, _>(&SubMatrix::new(a, i * B::MC, l * B::KC, mc, kc), buf_a);

                let mut c_block = c.sub_mut(i * B::MC, j * B::NC, mc, nc);
                T::mgemm::<B>(mc, nc, kc, alpha, buf_a, buf_b, beta_l, &mut c_block);
            }
        }
    }
}

/// Checks `A (m × k) · B (k × n) → C (m × n)` and returns `(m, n, k)`.
pub(crate) fn check_dims<MA: Matrix, MB: Matrix, MC: Matrix>(
    a: &MA,
    b: &MB,
    c: &MC,
) -> Result<(usize, usize, usize)> {
    let k = same("columns of A vs rows of B", a.cols(), b.rows())?;
    let m = same("rows of A vs rows of C", a.rows(), c.rows())?;
    let n = same("columns of B vs columns of C", b.cols(), c.cols())?;
    Ok((m, n, k))
}

/// Handles the cases that need no packing; returns `true` if `c` is final.
pub(crate) fn shortcut<T: Element>(
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    beta: T,
    c: &mut StridedMut<'_, T>,
) -> bool {
    if m == 0 || n == 0 {
        log::debug!("gemm: empty output {m}x{n}, nothing to do");
        true
    } else if alpha.is_zero() || k == 0 {
        log::debug!(
            "gemm: degenerate product (k = {k}, alpha zero: {}), scaling C by beta",
            alpha.is_zero()
        );
        gescal(m, n, beta, c);
        true
    } else {
        false
    }
}

fn log_blocked<B: BlockSize, T: Element>(m: usize, n: usize, k: usize) {
    let kernel = if fits_simd_register::<B, T::Real>(<T::Real as SimdTile>::LANES) {
        "simd"
    } else {
        "scalar"
    };
    log::debug!(
        "gemm: blocked {m}x{n}x{k} with {kernel} micro-kernel \
         ({}x{}x{} blocks of MCxNCxKC = {}x{}x{}, tile {}x{})",
        m.div_ceil(B::MC),
        n.div_ceil(B::NC),
        k.div_ceil(B::KC),
        B::MC,
        B::NC,
        B::KC,
        B::MR,
        B::NR
    );
}

/// Checks shapes, handles the trivial cases, then runs [`gemm_`] with fresh buffers.
pub(crate) fn blocked<B, T, MA, MB, MC>(
    alpha: T,
    a: &MA,
    b: &MB,
    beta: T,
    c: &mut MC,
) -> Result<()>
where
    B: BlockSize,
    T: Element,
    MA: Matrix,
    MB: Matrix,
    MC: MatrixMut<Elem = T>,
    MA::Elem: Into<T>,
    MB::Elem: Into<T>,
{
    let () = Checked::<B, T::Real>::POLICY;

    let (m, n, k) = check_dims(a, b, &*c)?;
    let mut c = c.strided_mut();
    if shortcut(m, n, k, alpha, beta, &mut c) {
        return Ok(());
    }

    let mut buf_a = AlignedBuf::<T::Real>::zeroed(T::PLANES * B::MC * B::KC, B::ALIGN)?;
    let mut buf_b = AlignedBuf::<T::Real>::zeroed(T::PLANES * B::NC * B::KC, B::ALIGN)?;

    log_blocked::<B, T>(m, n, k);
    gemm_::<B, T, MA, MB>(alpha, a, b, beta, &mut c, &mut buf_a, &mut buf_b);
    Ok(())
}

/// Fallible form of [`gemm`].
///
/// # Errors
///
/// * [`GemmError::DimensionMismatch`](crate::GemmError::DimensionMismatch) if the
///   operand shapes do not compose.
/// * [`GemmError::LayoutError`](crate::GemmError::LayoutError) or
///   [`GemmError::AllocationError`](crate::GemmError::AllocationError) if the pack
///   buffers cannot be allocated.
pub fn try_gemm<B, T, MA, MB, MC>(
    alpha: T,
    a: &MA,
    b: &MB,
    beta: T,
    c: &mut MC,
    _policy: B,
) -> Result<()>
where
    B: BlockSize,
    T: Element,
    MA: Matrix,
    MB: Matrix,
    MC: MatrixMut<Elem = T>,
    MA::Elem: Into<T>,
    MB::Elem: Into<T>,
{
    blocked::<B, T, MA, MB, MC>(alpha, a, b, beta, c)
}

/// Computes `C := alpha·A·B + beta·C` with the blocking policy `B`.
///
/// `A` is `m × k`, `B` is `k × n` and `C` is `m × n`; A and B elements are converted
/// into C's element type while packing. When `alpha` is zero or `k` is zero the
/// operands are not read at all and the call reduces to `C := beta·C`. A zero `beta`
/// overwrites C, so NaNs already stored there do not propagate.
///
/// For complex elements a non-unit `alpha` scales the real part of the product by
/// `alpha.re` and the imaginary part by `alpha.im` independently, rather than
/// multiplying by `alpha` as a complex number. Pass `alpha = 1` and scale one operand
/// beforehand when a true complex scaling is needed.
///
/// # Panics
///
/// Panics if the shapes do not compose or the pack buffers cannot be allocated; use
/// [`try_gemm`] to get these as errors instead. Policies that violate the
/// [`BlockSize`] invariants are rejected at compile time.
pub fn gemm<B, T, MA, MB, MC>(alpha: T, a: &MA, b: &MB, beta: T, c: &mut MC, policy: B)
where
    B: BlockSize,
    T: Element,
    MA: Matrix,
    MB: Matrix,
    MC: MatrixMut<Elem = T>,
    MA::Elem: Into<T>,
    MB::Elem: Into<T>,
{
    if let Err(err) = try_gemm(alpha, a, b, beta, c, policy) {
        panic!("gemm: {err}");
    }
}

/// Pack buffers kept alive across many products with the same policy and element type.
///
/// ```
/// use blockgemm::{F32Blocks, GemmWorkspace, StridedMut, StridedRef};
///
/// let mut ws = GemmWorkspace::<F32Blocks, f32>::new()?;
/// let a = [1.0f32; 6];
/// let b = [2.0f32; 6];
/// let mut c = [0.0f32; 4];
/// for _ in 0..3 {
///     ws.gemm(
///         1.0,
///         &StridedRef::col_major(&a, 2, 3),
///         &StridedRef::col_major(&b, 3, 2),
///         1.0,
///         &mut StridedMut::col_major(&mut c, 2, 2),
///     )?;
/// }
/// assert_eq!(c, [18.0; 4]);
/// # Ok::<(), blockgemm::GemmError>(())
/// ```
pub struct GemmWorkspace<B: BlockSize, T: Element> {
    buf_a: AlignedBuf<T::Real>,
    buf_b: AlignedBuf<T::Real>,
    _policy: PhantomData<B>,
}

impl<B: BlockSize, T: Element> GemmWorkspace<B, T> {
    /// Allocates both pack buffers.
    ///
    /// # Errors
    ///
    /// Returns a layout or allocation error if a buffer cannot be allocated.
    pub fn new() -> Result<Self> {
        let () = Checked::<B, T::Real>::POLICY;
        Ok(GemmWorkspace {
            buf_a: AlignedBuf::zeroed(T::PLANES * B::MC * B::KC, B::ALIGN)?,
            buf_b: AlignedBuf::zeroed(T::PLANES * B::NC * B::KC, B::ALIGN)?,
            _policy: PhantomData,
        })
    }

    /// [`try_gemm`] using this workspace's buffers.
    ///
    /// # Errors
    ///
    /// Returns a dimension mismatch if the operand shapes do not compose.
    pub fn gemm<MA, MB, MC>(
        &mut self,
        alpha: T,
        a: &MA,
        b: &MB,
        beta: T,
        c: &mut MC,
    ) -> Result<()>
    where
        MA: Matrix,
        MB: Matrix,
        MC: MatrixMut<Elem = T>,
        MA::Elem: Into<T>,
        MB::Elem: Into<T>,
    {
        let (m, n, k) = check_dims(a, b, &*c)?;
        let mut c = c.strided_mut();
        if shortcut(m, n, k, alpha, beta, &mut c) {
            return Ok(());
        }

        log_blocked::<B, T>(m, n, k);
        gemm_::<B, T, MA, MB>(alpha, a, b, beta, &mut c, &mut self.buf_a, &mut self.buf_b);
        Ok(())
    }
}

impl<B: BlockSize, T: Element> std::fmt::Debug for GemmWorkspace<B, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GemmWorkspace")
            .field("buf_a", &self.buf_a.len())
            .field("buf_b", &self.buf_b.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GemmError;
    use crate::matrix::StridedRef;
    use num::Complex;

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

    #[test]
    fn test_gemm_5x5_integers() {
        // A(i, j) = i + j, B(i, j) = i - j, both column-major
        let a: Vec<f64> = (0..25).map(|x| ((x % 5) + (x / 5)) as f64).collect();
        let b: Vec<f64> = (0..25).map(|x| (x % 5) as f64 - (x / 5) as f64).collect();
        let mut c = vec![f64::NAN; 25];
        gemm(
            1.0,
            &StridedRef::col_major(&a, 5, 5),
            &StridedRef::col_major(&b, 5, 5),
            0.0,
            &mut StridedMut::col_major(&mut c, 5, 5),
            Small,
        );
        for j in 0..5 {
            for i in 0..5 {
                let expected: i64 = (0..5).map(|l| (i + l) as i64 * (l as i64 - j as i64)).sum();
                assert_eq!(c[i + 5 * j], expected as f64, "({i}, {j})");
            }
        }
    }

    #[test]
    fn test_try_gemm_dimension_mismatch() {
        let a = [1.0f32; 6];
        let b = [1.0f32; 6];
        let mut c = [0.0f32; 4];
        let err = try_gemm(
            1.0,
            &StridedRef::col_major(&a, 2, 3),
            &StridedRef::col_major(&b, 2, 3),
            0.0,
            &mut StridedMut::col_major(&mut c, 2, 2),
            Small,
        )
        .unwrap_err();
        assert_eq!(
            err,
            GemmError::DimensionMismatch {
                what: "columns of A vs rows of B",
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    #[should_panic(expected = "gemm: Dimension mismatch: rows of A vs rows of C")]
    fn test_gemm_panics_on_mismatch() {
        let a = [1.0f64; 6];
        let b = [1.0f64; 6];
        let mut c = [0.0f64; 6];
        gemm(
            1.0,
            &StridedRef::col_major(&a, 2, 3),
            &StridedRef::col_major(&b, 3, 2),
            0.0,
            &mut StridedMut::col_major(&mut c, 3, 2),
            Small,
        );
    }

    #[test]
    fn test_alpha_zero_never_reads_operands() {
        let a = [f64::NAN; 12];
        let b = [f64::NAN; 12];
        let mut c = vec![2.0; 9];
        gemm(
            0.0,
            &StridedRef::col_major(&a, 3, 4),
            &StridedRef::col_major(&b, 4, 3),
            0.5,
            &mut StridedMut::col_major(&mut c, 3, 3),
            Small,
        );
        assert!(c.iter().all(|&x| x == 1.0));
    }

    #[test]
    fn test_empty_k_applies_beta() {
        let a: [f64; 0] = [];
        let b: [f64; 0] = [];
        let mut c = vec![f64::NAN, 3.0];
        gemm(
            1.0,
            &StridedRef::col_major(&a, 2, 0),
            &StridedRef::col_major(&b, 0, 1),
            0.0,
            &mut StridedMut::col_major(&mut c, 2, 1),
            Small,
        );
        assert_eq!(c, vec![0.0, 0.0]);
    }

    #[test]
    fn test_empty_output_is_untouched() {
        let a = [1.0f64; 3];
        let b: [f64; 0] = [];
        let mut c: Vec<f64> = vec![];
        try_gemm(
            1.0,
            &StridedRef::col_major(&a, 0, 3),
            &StridedRef::col_major(&b, 3, 0),
            0.0,
            &mut StridedMut::col_major(&mut c, 0, 0),
            Small,
        )
        .unwrap();
    }

    #[test]
    fn test_k_blocks_accumulate_after_beta() {
        // k = 9 spans three K slices of 4; beta must be applied exactly once
        let a = vec![1.0f64; 2 * 9];
        let b = vec![1.0f64; 9 * 2];
        let mut c = vec![10.0; 4];
        gemm(
            1.0,
            &StridedRef::col_major(&a, 2, 9),
            &StridedRef::col_major(&b, 9, 2),
            3.0,
            &mut StridedMut::col_major(&mut c, 2, 2),
            Small,
        );
        assert_eq!(c, vec![39.0; 4]);
    }

    #[test]
    fn test_workspace_matches_gemm() {
        let a: Vec<Complex<f64>> = (0..30).map(|x| Complex::new(x as f64, -(x as f64))).collect();
        let b: Vec<Complex<f64>> = (0..30).map(|x| Complex::new(1.0, (x % 3) as f64)).collect();
        let mut c_ws = vec![Complex::new(1.0, 0.0); 25];
        let mut c_gemm = c_ws.clone();

        let mut ws = GemmWorkspace::<Small, Complex<f64>>::new().unwrap();
        for _ in 0..2 {
            ws.gemm(
                Complex::new(1.0, 0.0),
                &StridedRef::col_major(&a, 5, 6),
                &StridedRef::col_major(&b, 6, 5),
                Complex::new(0.0, 1.0),
                &mut StridedMut::col_major(&mut c_ws, 5, 5),
            )
            .unwrap();
            gemm(
                Complex::new(1.0, 0.0),
                &StridedRef::col_major(&a, 5, 6),
                &StridedRef::col_major(&b, 6, 5),
                Complex::new(0.0, 1.0),
                &mut StridedMut::col_major(&mut c_gemm, 5, 5),
                Small,
            );
        }
        assert_eq!(c_ws, c_gemm);
    }

    #[test]
    fn test_gemm_with_caller_buffers() {
        let a = [1.0f32, 2.0, 3.0, 4.0];
        let b = [1.0f32, 0.0, 0.0, 1.0];
        let mut c = [0.0f32; 4];
        let mut buf_a = vec![0.0f32; Small::MC * Small::KC];
        let mut buf_b = vec![0.0f32; Small::NC * Small::KC];
        gemm_::<Small, f32, _, _>(
            1.0,
            &StridedRef::col_major(&a, 2, 2),
            &StridedRef::col_major(&b, 2, 2),
            0.0,
            &mut StridedMut::col_major(&mut c, 2, 2),
            &mut buf_a,
            &mut buf_b,
        );
        assert_eq!(c, a);
    }
}
