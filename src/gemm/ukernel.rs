//! The micro-kernel: one `MR × NR` tile of C from two packed panels.
//!
//! The product of an `MR × kc` A panel and a `kc × NR` B panel is accumulated in a
//! 64-byte aligned stack tile, scaled by `alpha` and merged into C:
//! `beta == 0` overwrites C without reading it, otherwise `C = beta·C + P`.
//!
//! When the policy and the element type allow it (see [`fits_simd_register`]) the
//! accumulation runs through [`SimdTile::accumulate_tile`], which treats every run
//! of `LANES` tile columns as one vector register. [`ugemm_scalar`] and
//! [`ugemm_complex_scalar`] are the plain-loop versions; both paths agree up to
//! floating-point reassociation.
//!
//! [`SimdTile::accumulate_tile`]: crate::simd::SimdTile::accumulate_tile

use num::{Complex, One, Zero};

use crate::block_size::{fits_simd_register, BlockSize, Checked};
use crate::gemm::pack::ComplexPanel;
use crate::matrix::{Matrix, StridedMut};
use crate::scalar::Real;
use crate::simd::accumulate_scalar;
use crate::MAX_TILE;

/// Stack accumulator, aligned like the pack buffers.
#[repr(C, align(64))]
pub(crate) struct Tile<T>(pub(crate) [T; MAX_TILE]);

impl<T: Copy + Zero> Tile<T> {
    #[inline(always)]
    pub(crate) fn zeroed() -> Self {
        Tile([T::zero(); MAX_TILE])
    }
}

#[inline(always)]
fn check_operands<B: BlockSize, T: Copy>(
    kc: usize,
    a_len: usize,
    b_len: usize,
    c: &StridedMut<'_, T>,
) {
    assert!(a_len >= kc * B::MR, "A panel too short: {a_len} < {}", kc * B::MR);
    assert!(b_len >= kc * B::NR, "B panel too short: {b_len} < {}", kc * B::NR);
    assert!(
        c.rows() == B::MR && c.cols() == B::NR,
        "micro-kernel output must be {}x{}, got {}x{}",
        B::MR,
        B::NR,
        c.rows(),
        c.cols()
    );
}

/// Scales `p` by `alpha` and merges it into `c` with `beta`.
#[inline(always)]
fn merge_real<B: BlockSize, T: Real>(alpha: T, p: &mut [T], beta: T, c: &mut StridedMut<'_, T>) {
    if alpha != T::one() {
        p.iter_mut().for_each(|x| *x *= alpha);
    }

    let rows = p.chunks_exact(B::NR).enumerate();
    if beta.is_zero() {
        for (i, p_row) in rows {
            for (j, &p_ij) in p_row.iter().enumerate() {
                c.set(i, j, p_ij);
            }
        }
    } else {
        for (i, p_row) in rows {
            for (j, &p_ij) in p_row.iter().enumerate() {
                let c_ij = c.get_mut(i, j);
                *c_ij = beta * *c_ij + p_ij;
            }
        }
    }
}

/// Computes `C = alpha·A·B + beta·C` for one `MR × NR` tile.
///
/// `a` is an `MR`-row panel and `b` an `NR`-column panel of length `kc`, laid out
/// by [`pack_a`](crate::pack_a) and [`pack_b`](crate::pack_b); `c` is the `MR × NR`
/// output tile with arbitrary strides. The vectorized accumulation is used when
/// [`fits_simd_register`] holds for `B` and `T`.
///
/// # Panics
///
/// Panics if a panel is shorter than `kc` steps or `c` is not `MR × NR`.
pub fn ugemm<B: BlockSize, T: Real>(
    kc: usize,
    alpha: T,
    a: &[T],
    b: &[T],
    beta: T,
    c: &mut StridedMut<'_, T>,
) {
    let () = Checked::<B, T>::POLICY;
    check_operands::<B, T>(kc, a.len(), b.len(), c);

    let mut tile = Tile::<T>::zeroed();
    let p = &mut tile.0[..B::MR * B::NR];

    if fits_simd_register::<B, T>(T::LANES) {
        T::accumulate_tile(kc, B::MR, B::NR, a, b, p);
    } else {
        accumulate_scalar(kc, B::MR, B::NR, a, b, p);
    }

    merge_real::<B, T>(alpha, p, beta, c);
}

/// [`ugemm`] that never takes the vector path.
///
/// # Panics
///
/// Same conditions as [`ugemm`].
pub fn ugemm_scalar<B: BlockSize, T: Real>(
    kc: usize,
    alpha: T,
    a: &[T],
    b: &[T],
    beta: T,
    c: &mut StridedMut<'_, T>,
) {
    let () = Checked::<B, T>::POLICY;
    check_operands::<B, T>(kc, a.len(), b.len(), c);

    let mut tile = Tile::<T>::zeroed();
    let p = &mut tile.0[..B::MR * B::NR];
    accumulate_scalar(kc, B::MR, B::NR, a, b, p);

    merge_real::<B, T>(alpha, p, beta, c);
}

/// Applies alpha plane by plane and merges the complex tile into `c`.
///
/// A non-unit `alpha` scales the real plane by `alpha.re` and the imaginary plane by
/// `alpha.im`; this is not a complex multiplication.
#[inline(always)]
fn merge_complex<B: BlockSize, R: Real>(
    alpha: Complex<R>,
    pr: &mut [R],
    pi: &mut [R],
    beta: Complex<R>,
    c: &mut StridedMut<'_, Complex<R>>,
) {
    if alpha != Complex::one() {
        pr.iter_mut().for_each(|x| *x *= alpha.re);
        pi.iter_mut().for_each(|x| *x *= alpha.im);
    }

    for i in 0..B::MR {
        for j in 0..B::NR {
            let p_ij = Complex::new(pr[i * B::NR + j], pi[i * B::NR + j]);
            if beta.is_zero() {
                c.set(i, j, p_ij);
            } else {
                let c_ij = c.get_mut(i, j);
                *c_ij = beta * *c_ij + p_ij;
            }
        }
    }
}

/// Complex micro-kernel over split real and imaginary panels.
///
/// Accumulates `Pr += Ar·Br − Ai·Bi` and `Pi += Ar·Bi + Ai·Br`, then merges like
/// [`ugemm`], with the plane-wise alpha described on [`gemm`](fn@crate::gemm).
///
/// # Panics
///
/// Panics if a plane is shorter than `kc` steps or `c` is not `MR × NR`.
pub fn ugemm_complex<B: BlockSize, R: Real>(
    kc: usize,
    alpha: Complex<R>,
    a: ComplexPanel<'_, R>,
    b: ComplexPanel<'_, R>,
    beta: Complex<R>,
    c: &mut StridedMut<'_, Complex<R>>,
) {
    if !fits_simd_register::<B, R>(R::LANES) {
        return ugemm_complex_scalar::<B, R>(kc, alpha, a, b, beta, c);
    }

    let () = Checked::<B, R>::POLICY;
    check_operands::<B, Complex<R>>(kc, a.len(), b.len(), c);

    let len = B::MR * B::NR;
    let (mut re, mut im, mut cross) = (
        Tile::<R>::zeroed(),
        Tile::<R>::zeroed(),
        Tile::<R>::zeroed(),
    );
    let (pr, pi, ai_bi) = (&mut re.0[..len], &mut im.0[..len], &mut cross.0[..len]);

    R::accumulate_tile(kc, B::MR, B::NR, a.re, b.re, pr);
    R::accumulate_tile(kc, B::MR, B::NR, a.im, b.im, ai_bi);
    R::accumulate_tile(kc, B::MR, B::NR, a.re, b.im, pi);
    R::accumulate_tile(kc, B::MR, B::NR, a.im, b.re, pi);

    pr.iter_mut().zip(ai_bi.iter()).for_each(|(r, &x)| *r -= x);

    merge_complex::<B, R>(alpha, pr, pi, beta, c);
}

/// [`ugemm_complex`] with a plain-loop accumulation.
///
/// # Panics
///
/// Same conditions as [`ugemm_complex`].
pub fn ugemm_complex_scalar<B: BlockSize, R: Real>(
    kc: usize,
    alpha: Complex<R>,
    a: ComplexPanel<'_, R>,
    b: ComplexPanel<'_, R>,
    beta: Complex<R>,
    c: &mut StridedMut<'_, Complex<R>>,
) {
    let () = Checked::<B, R>::POLICY;
    check_operands::<B, Complex<R>>(kc, a.len(), b.len(), c);

    let (mr, nr) = (B::MR, B::NR);
    let (mut re, mut im) = (Tile::<R>::zeroed(), Tile::<R>::zeroed());
    let (pr, pi) = (&mut re.0[..mr * nr], &mut im.0[..mr * nr]);

    for l in 0..kc {
        let (ar, ai) = (&a.re[l * mr..(l + 1) * mr], &a.im[l * mr..(l + 1) * mr]);
        let (br, bi) = (&b.re[l * nr..(l + 1) * nr], &b.im[l * nr..(l + 1) * nr]);

        for i in 0..mr {
            for j in 0..nr {
                pr[i * nr + j] += ar[i] * br[j] - ai[i] * bi[j];
                pi[i * nr + j] += ar[i] * bi[j] + ai[i] * br[j];
            }
        }
    }

    merge_complex::<B, R>(alpha, pr, pi, beta, c);
}
