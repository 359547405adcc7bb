//! Element types the blocked GEMM understands.
//!
//! [`Real`] covers the arithmetic types with a micro-kernel of their own (`f32`,
//! `f64`). [`Element`] adds `Complex<R>` and routes packing and the macro-kernel to
//! the real or the split-plane complex implementation, which is how `gemm` picks
//! its specialization at compile time.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul, MulAssign};

use num::traits::NumAssign;
use num::{Complex, Float, One, Zero};

use crate::block_size::{BlockSize, C32Blocks, C64Blocks, F32Blocks, F64Blocks};
use crate::gemm::mkernel::{mgemm, mgemm_complex};
use crate::gemm::pack::{
    pack_a, pack_a_complex, pack_b, pack_b_complex, ComplexPanel, ComplexPanelMut,
};
use crate::matrix::{Matrix, StridedMut};
use crate::simd::SimdTile;

/// Floating-point types stored in pack buffers and accumulator tiles.
pub trait Real:
    Float + NumAssign + SimdTile + Debug + Send + Sync + 'static
{
    /// Default policy for `Complex<Self>`.
    type ComplexBlocks: BlockSize;
}

impl Real for f32 {
    type ComplexBlocks = C32Blocks;
}

impl Real for f64 {
    type ComplexBlocks = C64Blocks;
}

/// Element type of C, i.e. the common type A and B are converted to while packing.
pub trait Element:
    Copy
    + PartialEq
    + Zero
    + One
    + Add<Output = Self>
    + Mul<Output = Self>
    + AddAssign
    + MulAssign
    + Debug
    + 'static
{
    /// Scalar type of one plane of a packed buffer.
    type Real: Real;
    /// Policy used by `gemm_default`.
    type Blocks: BlockSize;
    /// Planes per packed element: 1 for real, 2 for complex (real and imaginary).
    const PLANES: usize;

    /// Packs an `mc × kc` slice of A into `buf` (`PLANES · MC · KC` reals at least).
    fn pack_a<B, M>(a: &M, buf: &mut [Self::Real])
    where
        B: BlockSize,
        M: Matrix,
        M::Elem: Into<Self>;

    /// Packs a `kc × nc` slice of B into `buf` (`PLANES · NC · KC` reals at least).
    fn pack_b<B, M>(b: &M, buf: &mut [Self::Real])
    where
        B: BlockSize,
        M: Matrix,
        M::Elem: Into<Self>;

    /// Applies `alpha` to an accumulated product `p` the way the micro-kernels do:
    /// `alpha · p` for reals, plane by plane for complex values.
    fn scale_product(alpha: Self, p: Self) -> Self;

    /// Runs the macro-kernel of this element kind over buffers filled by `pack_a`/`pack_b`.
    #[allow(clippy::too_many_arguments)]
    fn mgemm<B: BlockSize>(
        mc: usize,
        nc: usize,
        kc: usize,
        alpha: Self,
        a: &[Self::Real],
        b: &[Self::Real],
        beta: Self,
        c: &mut StridedMut<'_, Self>,
    );
}

macro_rules! real_element {
    ($ty:ty, $blocks:ty) => {
        impl Element for $ty {
            type Real = $ty;
            type Blocks = $blocks;
            const PLANES: usize = 1;

            #[inline]
            fn pack_a<B, M>(a: &M, buf: &mut [$ty])
            where
                B: BlockSize,
                M: Matrix,
                M::Elem: Into<$ty>,
            {
                pack_a::<B, $ty, M>(a, buf)
            }

            #[inline]
            fn pack_b<B, M>(b: &M, buf: &mut [$ty])
            where
                B: BlockSize,
                M: Matrix,
                M::Elem: Into<$ty>,
            {
                pack_b::<B, $ty, M>(b, buf)
            }

            #[inline(always)]
            fn scale_product(alpha: $ty, p: $ty) -> $ty {
                alpha * p
            }

            #[inline]
            fn mgemm<B: BlockSize>(
                mc: usize,
                nc: usize,
                kc: usize,
                alpha: $ty,
                a: &[$ty],
                b: &[$ty],
                beta: $ty,
                c: &mut StridedMut<'_, $ty>,
            ) {
                mgemm::<B, $ty>(mc, nc, kc, alpha, a, b, beta, c)
            }
        }
    };
}

real_element!(f32, F32Blocks);
real_element!(f64, F64Blocks);

impl<R: Real> Element for Complex<R> {
    type Real = R;
    type Blocks = R::ComplexBlocks;
    const PLANES: usize = 2;

    #[inline]
    fn pack_a<B, M>(a: &M, buf: &mut [R])
    where
        B: BlockSize,
        M: Matrix,
        M::Elem: Into<Complex<R>>,
    {
        pack_a_complex::<B, R, M>(a, ComplexPanelMut::split(buf))
    }

    #[inline]
    fn pack_b<B, M>(b: &M, buf: &mut [R])
    where
        B: BlockSize,
        M: Matrix,
        M::Elem: Into<Complex<R>>,
    {
        pack_b_complex::<B, R, M>(b, ComplexPanelMut::split(buf))
    }

    #[inline(always)]
    fn scale_product(alpha: Complex<R>, p: Complex<R>) -> Complex<R> {
        if alpha == Complex::one() {
            p
        } else {
            Complex::new(p.re * alpha.re, p.im * alpha.im)
        }
    }

    #[inline]
    fn mgemm<B: BlockSize>(
        mc: usize,
        nc: usize,
        kc: usize,
        alpha: Complex<R>,
        a: &[R],
        b: &[R],
        beta: Complex<R>,
        c: &mut StridedMut<'_, Complex<R>>,
    ) {
        mgemm_complex::<B, R>(
            mc,
            nc,
            kc,
            alpha,
            ComplexPanel::split(a),
            ComplexPanel::split(b),
            beta,
            c,
        )
    }
}
