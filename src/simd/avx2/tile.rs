#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use crate::simd::traits::{accumulate_scalar, SimdTile};

/// Number of f32 elements that fit in an AVX2 256-bit vector.
pub(crate) const F32_LANES: usize = 8;

/// Number of f64 elements that fit in an AVX2 256-bit vector.
pub(crate) const F64_LANES: usize = 4;

#[inline(always)]
fn cpu_supports_kernel() -> bool {
    is_x86_feature_detected!("avx2") && (!cfg!(fma) || is_x86_feature_detected!("fma"))
}

#[inline(always)]
fn check_panels<T>(kc: usize, mr: usize, nr: usize, lanes: usize, a: &[T], b: &[T], p: &[T]) {
    assert_eq!(nr % lanes, 0, "nr ({nr}) must be a multiple of {lanes} lanes");
    assert!(a.len() >= kc * mr, "A panel too short: {} < {}", a.len(), kc * mr);
    assert!(b.len() >= kc * nr, "B panel too short: {} < {}", b.len(), kc * nr);
    assert!(p.len() >= mr * nr, "tile too short: {} < {}", p.len(), mr * nr);
}

impl SimdTile for f32 {
    const LANES: usize = F32_LANES;

    fn accumulate_tile(kc: usize, mr: usize, nr: usize, a: &[f32], b: &[f32], p: &mut [f32]) {
        check_panels(kc, mr, nr, F32_LANES, a, b, p);

        if cpu_supports_kernel() {
            // SAFETY: the CPU supports the enabled target features (checked above) and
            // every pointer offset stays inside the lengths asserted by `check_panels`.
            unsafe { accumulate_f32(kc, mr, nr, a.as_ptr(), b.as_ptr(), p.as_mut_ptr()) }
        } else {
            accumulate_scalar(kc, mr, nr, a, b, p)
        }
    }
}

impl SimdTile for f64 {
    const LANES: usize = F64_LANES;

    fn accumulate_tile(kc: usize, mr: usize, nr: usize, a: &[f64], b: &[f64], p: &mut [f64]) {
        check_panels(kc, mr, nr, F64_LANES, a, b, p);

        if cpu_supports_kernel() {
            // SAFETY: see the f32 implementation.
            unsafe { accumulate_f64(kc, mr, nr, a.as_ptr(), b.as_ptr(), p.as_mut_ptr()) }
        } else {
            accumulate_scalar(kc, mr, nr, a, b, p)
        }
    }
}

/// One 8-wide accumulator per (row, column run), kept in a register across `kc`.
///
/// # Safety
///
/// `a`, `b` and `p` must be valid for `kc * mr`, `kc * nr` and `mr * nr` elements,
/// `nr` must be a multiple of 8, and the CPU must support AVX2 (and FMA under `cfg(fma)`).
#[cfg_attr(fma, target_feature(enable = "avx2,fma"))]
#[cfg_attr(not(fma), target_feature(enable = "avx2"))]
unsafe fn accumulate_f32(
    kc: usize,
    mr: usize,
    nr: usize,
    a: *const f32,
    b: *const f32,
    p: *mut f32,
) {
    for i in 0..mr {
        for jv in (0..nr).step_by(F32_LANES) {
            let p_ij = p.add(i * nr + jv);
            let mut acc = _mm256_loadu_ps(p_ij);

            for l in 0..kc {
                let a_il = _mm256_broadcast_ss(&*a.add(l * mr + i));
                let b_lj = _mm256_loadu_ps(b.add(l * nr + jv));

                #[cfg(fma)]
                {
                    acc = _mm256_fmadd_ps(a_il, b_lj, acc);
                }
                #[cfg(not(fma))]
                {
                    acc = _mm256_add_ps(acc, _mm256_mul_ps(a_il, b_lj));
                }
            }

            _mm256_storeu_ps(p_ij, acc);
        }
    }
}

/// 4-wide f64 twin of [`accumulate_f32`].
///
/// # Safety
///
/// As for [`accumulate_f32`], with `nr` a multiple of 4.
#[cfg_attr(fma, target_feature(enable = "avx2,fma"))]
#[cfg_attr(not(fma), target_feature(enable = "avx2"))]
unsafe fn accumulate_f64(
    kc: usize,
    mr: usize,
    nr: usize,
    a: *const f64,
    b: *const f64,
    p: *mut f64,
) {
    for i in 0..mr {
        for jv in (0..nr).step_by(F64_LANES) {
            let p_ij = p.add(i * nr + jv);
            let mut acc = _mm256_loadu_pd(p_ij);

            for l in 0..kc {
                let a_il = _mm256_broadcast_sd(&*a.add(l * mr + i));
                let b_lj = _mm256_loadu_pd(b.add(l * nr + jv));

                #[cfg(fma)]
                {
                    acc = _mm256_fmadd_pd(a_il, b_lj, acc);
                }
                #[cfg(not(fma))]
                {
                    acc = _mm256_add_pd(acc, _mm256_mul_pd(a_il, b_lj));
                }
            }

            _mm256_storeu_pd(p_ij, acc);
        }
    }
}
