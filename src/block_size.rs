//! Compile-time blocking policies.
//!
//! A policy is a zero-sized type whose associated constants fix the cache tiles
//! (`MC`, `NC`, `KC`), the register tile (`MR`, `NR`), the SIMD vector length, the
//! pack buffer alignment and the size below which [`gemm_default`] skips blocking.
//!
//! Policies are checked when `gemm` is instantiated: an inconsistent policy is a
//! compile error, e.g. `MC = 10` with `MR = 4`:
//!
//! ```compile_fail
//! use blockgemm::{gemm, BlockSize, StridedMut, StridedRef};
//!
//! struct Broken;
//! impl BlockSize for Broken {
//!     const MC: usize = 10;
//!     const NC: usize = 8;
//!     const KC: usize = 8;
//!     const MR: usize = 4;
//!     const NR: usize = 4;
//!     const VECTOR_LENGTH: usize = 1;
//!     const ALIGN: usize = 64;
//! }
//!
//! let a = [1.0f64; 4];
//! let b = [1.0f64; 4];
//! let mut c = [0.0f64; 4];
//! gemm(
//!     1.0,
//!     &StridedRef::col_major(&a, 2, 2),
//!     &StridedRef::col_major(&b, 2, 2),
//!     0.0,
//!     &mut StridedMut::col_major(&mut c, 2, 2),
//!     Broken,
//! );
//! ```
//!
//! [`gemm_default`]: crate::gemm_default

use std::marker::PhantomData;

use crate::error::{validation_error, Result};
use crate::{MAX_TILE, SIMD_REGISTER_BYTES};

/// Blocking parameters of the GEMM loop nest.
pub trait BlockSize {
    /// Rows of A packed per cache block.
    const MC: usize;
    /// Columns of B packed per cache block.
    const NC: usize;
    /// Length of the reduction slice (stripe length).
    const KC: usize;
    /// Register tile rows (stripe width of A).
    const MR: usize;
    /// Register tile columns (stripe width of B).
    const NR: usize;
    /// Elements per vector register, 1 selects the scalar micro-kernel.
    const VECTOR_LENGTH: usize;
    /// Byte alignment of the pack buffers.
    const ALIGN: usize;
    /// `gemm_default` uses the naive product when every extent is below this.
    const LIMIT: usize = 14;
}

/// Returns the first violated invariant of policy `B` for real type `R`.
pub const fn violation<B: BlockSize, R>() -> Option<&'static str> {
    if B::MC == 0 || B::NC == 0 || B::KC == 0 || B::MR == 0 || B::NR == 0 {
        Some("Invalid block size: all extents must be positive")
    } else if B::MC % B::MR != 0 {
        Some("MC must be a multiple of MR")
    } else if B::NC % B::NR != 0 {
        Some("NC must be a multiple of NR")
    } else if B::VECTOR_LENGTH == 0 {
        Some("VECTOR_LENGTH must be at least 1")
    } else if B::VECTOR_LENGTH > 1 && B::NR % B::VECTOR_LENGTH != 0 {
        Some("NR must be a multiple of the vector length")
    } else if !B::ALIGN.is_power_of_two() {
        Some("ALIGN must be a power of two")
    } else if B::ALIGN < std::mem::align_of::<R>() {
        Some("ALIGN must not be below the natural alignment of the element")
    } else if B::MR * B::NR > MAX_TILE {
        Some("MR * NR exceeds the accumulator tile capacity")
    } else if B::LIMIT < 2 {
        Some("Minimum matrix size for gemm is 2*2")
    } else {
        None
    }
}

/// Runtime form of the policy check performed at compile time by `gemm`.
pub fn validate<B: BlockSize, R>() -> Result<()> {
    match violation::<B, R>() {
        Some(message) => Err(validation_error(message)),
        None => Ok(()),
    }
}

/// Whether policy `B` fits `lanes` elements of `R` into one SIMD register.
pub const fn fits_simd_register<B: BlockSize, R>(lanes: usize) -> bool {
    lanes > 1
        && B::VECTOR_LENGTH > 1
        && B::VECTOR_LENGTH * std::mem::size_of::<R>() <= SIMD_REGISTER_BYTES
        && B::NR % lanes == 0
}

pub(crate) struct Checked<B, R>(PhantomData<(B, R)>);

impl<B: BlockSize, R> Checked<B, R> {
    /// Evaluated during monomorphization, so a bad policy fails the build.
    pub(crate) const POLICY: () = assert!(
        violation::<B, R>().is_none(),
        "invalid BlockSize policy (see blockgemm::validate for the reason)"
    );
}

/// Default policy for `f32`.
#[derive(Debug, Clone, Copy, Default)]
pub struct F32Blocks;

impl BlockSize for F32Blocks {
    const MC: usize = 256;
    const NC: usize = 4096;
    const KC: usize = 512;
    const MR: usize = 4;
    const NR: usize = 16;
    const VECTOR_LENGTH: usize = SIMD_REGISTER_BYTES / 4;
    const ALIGN: usize = 64;
}

/// Default policy for `f64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct F64Blocks;

impl BlockSize for F64Blocks {
    const MC: usize = 256;
    const NC: usize = (4096 / (3 * Self::VECTOR_LENGTH)) * (3 * Self::VECTOR_LENGTH);
    const KC: usize = 512;
    const MR: usize = 4;
    const NR: usize = 3 * Self::VECTOR_LENGTH;
    const VECTOR_LENGTH: usize = SIMD_REGISTER_BYTES / 8;
    const ALIGN: usize = 64;
}

/// Default policy for `Complex<f32>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct C32Blocks;

impl BlockSize for C32Blocks {
    const MC: usize = 255;
    const NC: usize = 4096;
    const KC: usize = 512;
    const MR: usize = 3;
    const NR: usize = Self::VECTOR_LENGTH;
    const VECTOR_LENGTH: usize = SIMD_REGISTER_BYTES / 4;
    const ALIGN: usize = 64;
    const LIMIT: usize = 23;
}

/// Default policy for `Complex<f64>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct C64Blocks;

impl BlockSize for C64Blocks {
    const MC: usize = 255;
    const NC: usize = 4096;
    const KC: usize = 512;
    const MR: usize = 3;
    const NR: usize = Self::VECTOR_LENGTH;
    const VECTOR_LENGTH: usize = SIMD_REGISTER_BYTES / 8;
    const ALIGN: usize = 64;
    const LIMIT: usize = 23;
}
