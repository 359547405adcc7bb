//! Level-1 style kernels lifted to strided matrices.
//!
//! These are the scalar building blocks of the blocked GEMM: `gescal` applies
//! `beta` to an output region and `geaxpy` merges a scratch tile into it.

pub mod axpy;
pub mod scal;
