//! Unblocked product and the size-dispatching front end.
//!
//! Packing only pays off once the operands are larger than a few register tiles.
//! [`gemm_default`] picks the element type's default policy and sends products whose
//! extents are all below that policy's `LIMIT` through the triple loop of
//! [`gemm_reference`] instead.

use crate::block_size::BlockSize;
use crate::gemm::frame::{blocked, check_dims, shortcut};
use crate::matrix::{Matrix, MatrixMut};
use crate::scalar::Element;

/// Computes `C := alpha·A·B + beta·C` with a plain triple loop.
///
/// Follows the same rules as [`gemm`](fn@crate::gemm): zero `alpha` or `k` only
/// scales C, zero `beta` overwrites C, and a complex `alpha` is applied plane by
/// plane. Each entry is one dot product accumulated in reduction order.
///
/// # Panics
///
/// Panics if the shapes do not compose.
pub fn gemm_reference<T, MA, MB, MC>(alpha: T, a: &MA, b: &MB, beta: T, c: &mut MC)
where
    T: Element,
    MA: Matrix,
    MB: Matrix,
    MC: MatrixMut<Elem = T>,
    MA::Elem: Into<T>,
    MB::Elem: Into<T>,
{
    let (m, n, k) = match check_dims(a, b, &*c) {
        Ok(dims) => dims,
        Err(err) => panic!("gemm_reference: {err}"),
    };
    let mut c = c.strided_mut();
    if shortcut(m, n, k, alpha, beta, &mut c) {
        return;
    }

    for j in 0..n {
        for i in 0..m {
            let mut dot = T::zero();
            for l in 0..k {
                let (a_il, b_lj): (T, T) = (a.at(i, l).into(), b.at(l, j).into());
                dot += a_il * b_lj;
            }

            let p = T::scale_product(alpha, dot);
            if beta.is_zero() {
                c.set(i, j, p);
            } else {
                let c_ij = c.get_mut(i, j);
                *c_ij = beta * *c_ij + p;
            }
        }
    }
}

/// [`gemm`](fn@crate::gemm) with the element's default policy, or [`gemm_reference`]
/// when `m`, `n` and `k` are all below the policy's `LIMIT`.
///
/// ```
/// use blockgemm::{gemm_default, StridedMut, StridedRef};
///
/// let a = [1.0f32, 2.0, 3.0];
/// let b = [4.0f32, 5.0, 6.0];
/// let mut c = [0.0f32];
/// gemm_default(
///     1.0,
///     &StridedRef::row_major(&a, 1, 3),
///     &StridedRef::col_major(&b, 3, 1),
///     0.0,
///     &mut StridedMut::col_major(&mut c, 1, 1),
/// );
/// assert_eq!(c, [32.0]);
/// ```
///
/// # Panics
///
/// Panics if the shapes do not compose or the pack buffers cannot be allocated.
pub fn gemm_default<T, MA, MB, MC>(alpha: T, a: &MA, b: &MB, beta: T, c: &mut MC)
where
    T: Element,
    MA: Matrix,
    MB: Matrix,
    MC: MatrixMut<Elem = T>,
    MA::Elem: Into<T>,
    MB::Elem: Into<T>,
{
    let limit = <T::Blocks as BlockSize>::LIMIT;
    let largest = a.rows().max(a.cols()).max(b.cols());

    if largest < limit {
        log::debug!("gemm: {largest} below the blocking limit {limit}, using the reference loop");
        gemm_reference(alpha, a, b, beta, c);
    } else if let Err(err) = blocked::<T::Blocks, T, MA, MB, MC>(alpha, a, b, beta, c) {
        panic!("gemm: {err}");
    }
}
