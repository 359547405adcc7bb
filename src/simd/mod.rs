#[cfg(all(avx2, target_arch = "x86_64"))]
pub mod avx2;

pub mod traits;

pub use traits::{accumulate_scalar, SimdTile};
