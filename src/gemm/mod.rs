//! The blocked GEMM, layer by layer.
//!
//! - [`frame`]: the `NC`/`KC`/`MC` loop nest, buffer ownership and the public entry
//!   points [`gemm`], [`try_gemm`] and [`GemmWorkspace`].
//! - [`pack`]: copies operand slices into zero-padded micro-panels.
//! - [`mkernel`]: walks one packed block tile by tile, including ragged edges.
//! - [`ukernel`]: accumulates one `MR × NR` register tile.
//! - [`reference`]: the unblocked loop and the size-dispatching [`gemm_default`].

pub mod frame;
pub mod mkernel;
pub mod pack;
pub mod reference;
pub mod ukernel;

pub use frame::{gemm, gemm_, try_gemm, GemmWorkspace};
pub use mkernel::{mgemm, mgemm_complex};
pub use pack::{pack_a, pack_a_complex, pack_b, pack_b_complex, ComplexPanel, ComplexPanelMut};
pub use reference::{gemm_default, gemm_reference};
pub use ukernel::{ugemm, ugemm_complex, ugemm_complex_scalar, ugemm_scalar};
