use std::ops::{AddAssign, Mul};

/// Element types with a vectorized accumulation loop for the micro-kernel.
///
/// `accumulate_tile` adds the product of a packed `mr × kc` A panel and a packed
/// `kc × nr` B panel into the row-major `mr × nr` tile `p`:
///
/// ```text
/// p[i * nr + j] += Σ_l a[l * mr + i] * b[l * nr + j]
/// ```
///
/// Implementations with `LANES > 1` treat each run of `LANES` consecutive columns
/// as one hardware vector and require `nr % LANES == 0`. A `LANES` of 1 means no
/// vector unit was compiled in; the micro-kernel then always takes its scalar path.
pub trait SimdTile: Copy {
    /// Elements per vector register.
    const LANES: usize;

    /// Adds `A · B` into `p`, see the trait documentation for the layouts.
    ///
    /// # Panics
    ///
    /// Panics if a slice is shorter than its layout requires, or if `nr` is not a
    /// multiple of `LANES`.
    fn accumulate_tile(kc: usize, mr: usize, nr: usize, a: &[Self], b: &[Self], p: &mut [Self]);
}

/// Scalar form of [`SimdTile::accumulate_tile`], always available.
#[inline]
pub fn accumulate_scalar<T>(kc: usize, mr: usize, nr: usize, a: &[T], b: &[T], p: &mut [T])
where
    T: Copy + Mul<Output = T> + AddAssign,
{
    let a = &a[..kc * mr];
    let b = &b[..kc * nr];
    let p = &mut p[..mr * nr];

    for (a_col, b_row) in a.chunks_exact(mr).zip(b.chunks_exact(nr)) {
        for (p_row, &a_il) in p.chunks_exact_mut(nr).zip(a_col) {
            for (p_ij, &b_lj) in p_row.iter_mut().zip(b_row) {
                *p_ij += a_il * b_lj;
            }
        }
    }
}

#[cfg(not(all(avx2, target_arch = "x86_64")))]
macro_rules! scalar_tile {
    ($($ty:ty),*) => {
        $(
            impl SimdTile for $ty {
                const LANES: usize = 1;

                #[inline]
                fn accumulate_tile(
                    kc: usize,
                    mr: usize,
                    nr: usize,
                    a: &[Self],
                    b: &[Self],
                    p: &mut [Self],
                ) {
                    accumulate_scalar(kc, mr, nr, a, b, p)
                }
            }
        )*
    };
}

#[cfg(not(all(avx2, target_arch = "x86_64")))]
scalar_tile!(f32, f64);
