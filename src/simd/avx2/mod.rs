//! AVX2 micro-kernel accumulation for 256-bit vectors.
//!
//! Compiled only when the build script detected AVX2 on a native x86_64 build
//! (`cfg(avx2)`). Each call additionally checks the running CPU with
//! `is_x86_feature_detected!` and falls back to the scalar loop when the
//! instructions are missing, so a binary copied to an older machine stays correct.
//!
//! - **Vector Width**: 256 bits (8 × f32, 4 × f64)
//! - **FMA**: used when the build script also detected `fma` (`cfg(fma)`)

pub mod tile;
