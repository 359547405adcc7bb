use num::{One, Zero};
use std::ops::MulAssign;

use crate::matrix::StridedMut;

/// Scales the leading `m × n` region of a strided matrix `x` by a scalar `alpha`.
///
/// This performs `x(i, j) = alpha * x(i, j)` for every `i < m`, `j < n`, walking the
/// view's row and column strides. It is the general-matrix counterpart of the BLAS
/// `scal` routine and implements the `beta·C` half of the GEMM update.
///
/// # Arguments
///
/// * `m`: Rows to scale.
/// * `n`: Columns to scale.
/// * `alpha`: The scalar multiplier.
/// * `x`: Strided view holding at least `m × n` elements.
///
/// When `alpha` is zero the region is overwritten with zeros instead of multiplied,
/// so NaN or infinite entries already in `x` do not survive. When `alpha` is one the
/// region is left untouched.
///
/// # Panics
///
/// Panics if `m` or `n` exceeds the extents of `x`.
///
/// # Examples
///
/// ```
/// use blockgemm::{gescal, StridedMut};
///
/// let mut c = [1.0, f64::NAN, 3.0, 4.0];
/// gescal(2, 2, 0.0, &mut StridedMut::col_major(&mut c, 2, 2));
/// assert_eq!(c, [0.0; 4]);
/// ```
pub fn gescal<T>(m: usize, n: usize, alpha: T, x: &mut StridedMut<'_, T>)
where
    T: Copy + Zero + One + PartialEq + MulAssign,
{
    if m == 0 || n == 0 {
        return;
    }

    let mut x = x.sub_mut(0, 0, m, n);

    if alpha.is_zero() {
        for j in 0..n {
            for i in 0..m {
                x.set(i, j, T::zero());
            }
        }
    } else if alpha != T::one() {
        for j in 0..n {
            for i in 0..m {
                *x.get_mut(i, j) *= alpha;
            }
        }
    }
}
