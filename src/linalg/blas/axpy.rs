use num::Zero;
use std::ops::{AddAssign, Mul};

use crate::matrix::{StridedMut, StridedRef};

/// Computes `y = alpha * x + y` over the leading `m × n` region of two strided matrices.
///
/// This is the general-matrix counterpart of the BLAS `axpy` routine. The two
/// operands carry independent row and column strides, which is how the macro-kernel
/// merges a row-major scratch tile into a column-major (or any other) block of C.
///
/// # Arguments
///
/// * `m`: Rows to update.
/// * `n`: Columns to update.
/// * `alpha`: The scalar multiplier for `x`.
/// * `x`: Strided source view holding at least `m × n` elements.
/// * `y`: Strided destination view holding at least `m × n` elements.
///   On output, its leading region is replaced by `y + alpha * x`.
///
/// A zero `alpha` returns without touching either operand.
///
/// # Panics
///
/// Panics if `m` or `n` exceeds the extents of `x` or `y`.
///
/// # Examples
///
/// ```
/// use blockgemm::{geaxpy, StridedMut, StridedRef};
///
/// let x = [1.0, 2.0, 3.0, 4.0]; // row-major
/// let mut y = [10.0; 4]; // column-major
/// geaxpy(
///     2,
///     2,
///     2.0,
///     &StridedRef::row_major(&x, 2, 2),
///     &mut StridedMut::col_major(&mut y, 2, 2),
/// );
/// assert_eq!(y, [12.0, 16.0, 14.0, 18.0]);
/// ```
pub fn geaxpy<T>(m: usize, n: usize, alpha: T, x: &StridedRef<'_, T>, y: &mut StridedMut<'_, T>)
where
    T: Copy + Zero + Mul<Output = T> + AddAssign,
{
    if m == 0 || n == 0 || alpha.is_zero() {
        return;
    }

    let x = x.sub(0, 0, m, n);
    let mut y = y.sub_mut(0, 0, m, n);

    for j in 0..n {
        for i in 0..m {
            *y.get_mut(i, j) += alpha * x.get(i, j);
        }
    }
}
