//! Cache-blocked, register-tiled general matrix multiply.
//!
//! `blockgemm` computes `C := alpha·A·B + beta·C` the way BLIS and GotoBLAS do:
//! operands are packed into contiguous, zero-padded panels sized by a compile-time
//! [`BlockSize`] policy, a macro-kernel walks the packed panels tile by tile, and a
//! micro-kernel accumulates each `MR × NR` register tile (vectorized with AVX2 when
//! the build machine has it). Complex products keep real and imaginary parts in
//! separate planes so the same real micro-kernel does all the arithmetic.
//!
//! ```
//! use blockgemm::{gemm, F64Blocks, StridedMut, StridedRef};
//!
//! let a = [1.0, 2.0, 3.0, 4.0]; // column-major 2×2
//! let b = [5.0, 6.0, 7.0, 8.0];
//! let mut c = [0.0; 4];
//! gemm(
//!     1.0,
//!     &StridedRef::col_major(&a, 2, 2),
//!     &StridedRef::col_major(&b, 2, 2),
//!     0.0,
//!     &mut StridedMut::col_major(&mut c, 2, 2),
//!     F64Blocks,
//! );
//! assert_eq!(c, [23.0, 34.0, 31.0, 46.0]);
//! ```

pub mod block_size;
pub mod error;
pub mod gemm;
pub mod linalg;
pub mod matrix;
pub mod scalar;
pub mod simd;
pub mod utils;

/// Width of one SIMD register in bytes (256-bit AVX2).
pub const SIMD_REGISTER_BYTES: usize = 32;

/// Capacity of the stack accumulator tile, bounds `MR * NR` of every policy.
pub const MAX_TILE: usize = 256;

pub use block_size::{
    fits_simd_register, validate, violation, BlockSize, C32Blocks, C64Blocks, F32Blocks,
    F64Blocks,
};
pub use error::{GemmError, Result};
pub use gemm::{
    gemm, gemm_, gemm_default, gemm_reference, mgemm, mgemm_complex, pack_a, pack_a_complex,
    pack_b, pack_b_complex, try_gemm, ugemm, ugemm_complex, ugemm_complex_scalar, ugemm_scalar,
    ComplexPanel, ComplexPanelMut, GemmWorkspace,
};
pub use linalg::blas::{axpy::geaxpy, scal::gescal};
pub use matrix::{Matrix, MatrixMut, StridedMut, StridedRef, SubMatrix};
pub use scalar::{Element, Real};
pub use utils::AlignedBuf;
