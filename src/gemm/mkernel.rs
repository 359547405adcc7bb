//! The macro-kernel: one `mc × nc` block of C from packed A and B buffers.
//!
//! Tiles are visited column panel by column panel. Full `MR × NR` tiles are written
//! by the micro-kernel directly; ragged tiles on the bottom and right edges are
//! computed into a scratch tile with `beta = 0` and merged with
//! [`gescal`] followed by [`geaxpy`], so nothing outside the block is touched.

use std::cmp::min;

use num::{Complex, One, Zero};

use crate::block_size::BlockSize;
use crate::gemm::pack::ComplexPanel;
use crate::gemm::ukernel::{ugemm, ugemm_complex, Tile};
use crate::linalg::blas::{axpy::geaxpy, scal::gescal};
use crate::matrix::{Matrix, StridedMut};
use crate::scalar::Real;

#[inline(always)]
fn check_block<B: BlockSize, T: Copy>(
    mc: usize,
    nc: usize,
    kc: usize,
    a_len: usize,
    b_len: usize,
    c: &StridedMut<'_, T>,
) {
    assert!(
        c.rows() == mc && c.cols() == nc,
        "output block must be {mc}x{nc}, got {}x{}",
        c.rows(),
        c.cols()
    );
    assert!(
        a_len >= mc.div_ceil(B::MR) * B::MR * kc,
        "packed A too short for a {mc}x{kc} block"
    );
    assert!(
        b_len >= nc.div_ceil(B::NR) * B::NR * kc,
        "packed B too short for a {kc}x{nc} block"
    );
}

/// Computes `C = alpha·A·B + beta·C` for an `mc × nc` block with packed operands.
///
/// `a` holds `⌈mc / MR⌉` panels and `b` holds `⌈nc / NR⌉` panels of length `kc`,
/// as written by [`pack_a`](crate::pack_a) and [`pack_b`](crate::pack_b).
///
/// # Panics
///
/// Panics if `c` is not `mc × nc` or a packed buffer is too short.
#[allow(clippy::too_many_arguments)]
pub fn mgemm<B: BlockSize, T: Real>(
    mc: usize,
    nc: usize,
    kc: usize,
    alpha: T,
    a: &[T],
    b: &[T],
    beta: T,
    c: &mut StridedMut<'_, T>,
) {
    check_block::<B, T>(mc, nc, kc, a.len(), b.len(), c);

    let (mp, np) = (mc.div_ceil(B::MR), nc.div_ceil(B::NR));
    let mut scratch = Tile::<T>::zeroed();

    for j in 0..np {
        let nr = min(B::NR, nc - j * B::NR);
        let b_panel = &b[j * kc * B::NR..(j + 1) * kc * B::NR];

        for i in 0..mp {
            let mr = min(B::MR, mc - i * B::MR);
            let a_panel = &a[i * kc * B::MR..(i + 1) * kc * B::MR];

            if mr == B::MR && nr == B::NR {
                let mut c_tile = c.sub_mut(i * B::MR, j * B::NR, B::MR, B::NR);
                ugemm::<B, T>(kc, alpha, a_panel, b_panel, beta, &mut c_tile);
            } else {
                let tile = &mut scratch.0[..B::MR * B::NR];
                tile.fill(T::zero());
                let mut tmp = StridedMut::row_major(tile, B::MR, B::NR);
                ugemm::<B, T>(kc, alpha, a_panel, b_panel, T::zero(), &mut tmp);

                let mut c_tile = c.sub_mut(i * B::MR, j * B::NR, mr, nr);
                gescal(mr, nr, beta, &mut c_tile);
                geaxpy(mr, nr, T::one(), &tmp.as_view(), &mut c_tile);
            }
        }
    }
}

/// Complex [`mgemm`] over split-plane packed buffers.
///
/// # Panics
///
/// Panics if `c` is not `mc × nc` or a packed plane is too short.
#[allow(clippy::too_many_arguments)]
pub fn mgemm_complex<B: BlockSize, R: Real>(
    mc: usize,
    nc: usize,
    kc: usize,
    alpha: Complex<R>,
    a: ComplexPanel<'_, R>,
    b: ComplexPanel<'_, R>,
    beta: Complex<R>,
    c: &mut StridedMut<'_, Complex<R>>,
) {
    check_block::<B, Complex<R>>(mc, nc, kc, a.len(), b.len(), c);

    let (mp, np) = (mc.div_ceil(B::MR), nc.div_ceil(B::NR));
    let mut scratch = Tile::<Complex<R>>::zeroed();

    for j in 0..np {
        let nr = min(B::NR, nc - j * B::NR);
        let b_panel = b.window(j * kc * B::NR, kc * B::NR);

        for i in 0..mp {
            let mr = min(B::MR, mc - i * B::MR);
            let a_panel = a.window(i * kc * B::MR, kc * B::MR);

            if mr == B::MR && nr == B::NR {
                let mut c_tile = c.sub_mut(i * B::MR, j * B::NR, B::MR, B::NR);
                ugemm_complex::<B, R>(kc, alpha, a_panel, b_panel, beta, &mut c_tile);
            } else {
                let tile = &mut scratch.0[..B::MR * B::NR];
                tile.fill(Complex::zero());
                let mut tmp = StridedMut::row_major(tile, B::MR, B::NR);
                ugemm_complex::<B, R>(kc, alpha, a_panel, b_panel, Complex::zero(), &mut tmp);

                let mut c_tile = c.sub_mut(i * B::MR, j * B::NR, mr, nr);
                gescal(mr, nr, beta, &mut c_tile);
                geaxpy(mr, nr, Complex::one(), &tmp.as_view(), &mut c_tile);
            }
        }
    }
}
