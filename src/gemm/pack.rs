//! Packing of operand slices into micro-kernel order.
//!
//! `pack_a` turns an `mc × kc` slice of A into `⌈mc / MR⌉` panels of `MR` rows; in
//! each panel the `MR` entries of one column are contiguous, column after column:
//!
//! ```text
//! dest[l·MR·kc + j·MR + i0] = A(l·MR + i0, j)
//! ```
//!
//! `pack_b` does the transpose job for a `kc × nc` slice of B, `NR` columns per panel:
//!
//! ```text
//! dest[l·NR·kc + i·NR + j0] = B(i, l·NR + j0)
//! ```
//!
//! Rows (columns) past the end of the last partial panel are written as zeros, so the
//! micro-kernel always sees full `MR × kc` and `kc × NR` panels. The complex variants
//! write the real and imaginary parts into two separate planes with the same layout.

use num::{Complex, Zero};

use crate::block_size::BlockSize;
use crate::matrix::Matrix;
use crate::scalar::Real;

/// Read-only pair of real and imaginary planes of a packed complex buffer.
#[derive(Debug, Clone, Copy)]
pub struct ComplexPanel<'a, R> {
    /// Real parts.
    pub re: &'a [R],
    /// Imaginary parts.
    pub im: &'a [R],
}

impl<'a, R> ComplexPanel<'a, R> {
    /// Splits a packed buffer into its two equally sized planes.
    #[inline]
    pub fn split(buf: &'a [R]) -> Self {
        let (re, im) = buf.split_at(buf.len() / 2);
        ComplexPanel { re, im }
    }

    /// The `len` elements starting at `start` in both planes.
    #[inline(always)]
    pub fn window(&self, start: usize, len: usize) -> ComplexPanel<'a, R> {
        ComplexPanel {
            re: &self.re[start..start + len],
            im: &self.im[start..start + len],
        }
    }

    /// Elements per plane.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.re.len().min(self.im.len())
    }

    /// Whether the planes are empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutable pair of real and imaginary planes, the destination of complex packing.
#[derive(Debug)]
pub struct ComplexPanelMut<'a, R> {
    /// Real parts.
    pub re: &'a mut [R],
    /// Imaginary parts.
    pub im: &'a mut [R],
}

impl<'a, R> ComplexPanelMut<'a, R> {
    /// Splits a pack buffer into its two equally sized planes.
    #[inline]
    pub fn split(buf: &'a mut [R]) -> Self {
        let half = buf.len() / 2;
        let (re, im) = buf.split_at_mut(half);
        ComplexPanelMut {
            re,
            im: &mut im[..half],
        }
    }

    /// Elements per plane.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.re.len().min(self.im.len())
    }

    /// Whether the planes are empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Elements written by packing `extent` rows (or columns) in panels of `tile`.
#[inline(always)]
pub(crate) fn packed_len(extent: usize, tile: usize, kc: usize) -> usize {
    extent.div_ceil(tile) * tile * kc
}

/// Visits every destination slot of the A packing order with its source element,
/// or `None` for padding rows.
#[inline(always)]
fn walk_a<B: BlockSize, M: Matrix>(a: &M, mut write: impl FnMut(usize, Option<M::Elem>)) {
    let (mc, kc) = (a.rows(), a.cols());
    let mut dest = 0;

    for row0 in (0..mc).step_by(B::MR) {
        for j in 0..kc {
            for i0 in 0..B::MR {
                let i = row0 + i0;
                write(dest, (i < mc).then(|| a.at(i, j)));
                dest += 1;
            }
        }
    }
}

/// Visits every destination slot of the B packing order with its source element,
/// or `None` for padding columns.
#[inline(always)]
fn walk_b<B: BlockSize, M: Matrix>(b: &M, mut write: impl FnMut(usize, Option<M::Elem>)) {
    let (kc, nc) = (b.rows(), b.cols());
    let mut dest = 0;

    for col0 in (0..nc).step_by(B::NR) {
        for i in 0..kc {
            for j0 in 0..B::NR {
                let j = col0 + j0;
                write(dest, (j < nc).then(|| b.at(i, j)));
                dest += 1;
            }
        }
    }
}

/// Packs the `mc × kc` matrix `a` (a slice of A) into `buf` in `MR`-row panels.
///
/// # Panics
///
/// Panics if `buf` holds fewer than `⌈mc / MR⌉ · MR · kc` elements.
pub fn pack_a<B, T, M>(a: &M, buf: &mut [T])
where
    B: BlockSize,
    T: Zero + Copy,
    M: Matrix,
    M::Elem: Into<T>,
{
    let needed = packed_len(a.rows(), B::MR, a.cols());
    assert!(
        buf.len() >= needed,
        "A pack buffer too short: {} < {needed}",
        buf.len()
    );

    walk_a::<B, M>(a, |dest, value| {
        buf[dest] = value.map_or_else(T::zero, Into::into);
    });
}

/// Packs the `kc × nc` matrix `b` (a slice of B) into `buf` in `NR`-column panels.
///
/// # Panics
///
/// Panics if `buf` holds fewer than `⌈nc / NR⌉ · NR · kc` elements.
pub fn pack_b<B, T, M>(b: &M, buf: &mut [T])
where
    B: BlockSize,
    T: Zero + Copy,
    M: Matrix,
    M::Elem: Into<T>,
{
    let needed = packed_len(b.cols(), B::NR, b.rows());
    assert!(
        buf.len() >= needed,
        "B pack buffer too short: {} < {needed}",
        buf.len()
    );

    walk_b::<B, M>(b, |dest, value| {
        buf[dest] = value.map_or_else(T::zero, Into::into);
    });
}

/// [`pack_a`] into separate real and imaginary planes.
///
/// # Panics
///
/// Panics if either plane holds fewer than `⌈mc / MR⌉ · MR · kc` elements.
pub fn pack_a_complex<B, R, M>(a: &M, dest: ComplexPanelMut<'_, R>)
where
    B: BlockSize,
    R: Real,
    M: Matrix,
    M::Elem: Into<Complex<R>>,
{
    let needed = packed_len(a.rows(), B::MR, a.cols());
    assert!(
        dest.len() >= needed,
        "A pack planes too short: {} < {needed}",
        dest.len()
    );

    let ComplexPanelMut { re, im } = dest;
    walk_a::<B, M>(a, |slot, value| {
        let z: Complex<R> = value.map_or_else(Complex::zero, Into::into);
        re[slot] = z.re;
        im[slot] = z.im;
    });
}

/// [`pack_b`] into separate real and imaginary planes.
///
/// # Panics
///
/// Panics if either plane holds fewer than `⌈nc / NR⌉ · NR · kc` elements.
pub fn pack_b_complex<B, R, M>(b: &M, dest: ComplexPanelMut<'_, R>)
where
    B: BlockSize,
    R: Real,
    M: Matrix,
    M::Elem: Into<Complex<R>>,
{
    let needed = packed_len(b.cols(), B::NR, b.rows());
    assert!(
        dest.len() >= needed,
        "B pack planes too short: {} < {needed}",
        dest.len()
    );

    let ComplexPanelMut { re, im } = dest;
    walk_b::<B, M>(b, |slot, value| {
        let z: Complex<R> = value.map_or_else(Complex::zero, Into::into);
        re[slot] = z.re;
        im[slot] = z.im;
    });
}
