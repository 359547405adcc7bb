//! Matrix-like views consumed by the GEMM.
//!
//! The kernels only need three capabilities from their operands: the extents,
//! element access at `(i, j)`, and, for the output, a strided address map they can
//! write through. [`Matrix`] and [`MatrixMut`] express those; the strided views wrap
//! plain slices the way BLAS callers describe matrices (`offset`, row stride, column
//! stride), and `ndarray` arrays plug in directly.
//!
//! Views built from slices are checked against the slice when constructed, and every
//! element access is checked against the view's extents, so a bad stride or index
//! panics instead of touching foreign memory.

use std::marker::PhantomData;

use ndarray::{ArrayBase, Data, DataMut, Ix2};

use crate::error::{validation_error, Result};

/// Read access to a rectangular matrix.
pub trait Matrix {
    /// Element type returned by [`Matrix::at`].
    type Elem: Copy;

    /// Number of rows.
    fn rows(&self) -> usize;

    /// Number of columns.
    fn cols(&self) -> usize;

    /// Element at row `i`, column `j`.
    fn at(&self, i: usize, j: usize) -> Self::Elem;
}

/// A matrix the GEMM can write its result into.
pub trait MatrixMut: Matrix {
    /// Strided mutable view over all of `self`.
    fn strided_mut(&mut self) -> StridedMut<'_, Self::Elem>;
}

impl<M: Matrix + ?Sized> Matrix for &M {
    type Elem = M::Elem;

    #[inline(always)]
    fn rows(&self) -> usize {
        (**self).rows()
    }

    #[inline(always)]
    fn cols(&self) -> usize {
        (**self).cols()
    }

    #[inline(always)]
    fn at(&self, i: usize, j: usize) -> M::Elem {
        (**self).at(i, j)
    }
}

impl<M: Matrix + ?Sized> Matrix for &mut M {
    type Elem = M::Elem;

    #[inline(always)]
    fn rows(&self) -> usize {
        (**self).rows()
    }

    #[inline(always)]
    fn cols(&self) -> usize {
        (**self).cols()
    }

    #[inline(always)]
    fn at(&self, i: usize, j: usize) -> M::Elem {
        (**self).at(i, j)
    }
}

impl<M: MatrixMut + ?Sized> MatrixMut for &mut M {
    #[inline(always)]
    fn strided_mut(&mut self) -> StridedMut<'_, M::Elem> {
        (**self).strided_mut()
    }
}

/// Checks that every corner of a `rows × cols` strided map lands inside `len`.
fn check_span(
    len: usize,
    offset: usize,
    rows: usize,
    cols: usize,
    rs: isize,
    cs: isize,
) -> Result<()> {
    if rows == 0 || cols == 0 {
        return if offset <= len {
            Ok(())
        } else {
            Err(validation_error(format!(
                "offset {offset} is past the end of a slice of length {len}"
            )))
        };
    }

    let last_row = (rows - 1) as isize;
    let last_col = (cols - 1) as isize;
    let corners = [
        0,
        last_row * rs,
        last_col * cs,
        last_row * rs + last_col * cs,
    ];

    for corner in corners {
        let index = offset as isize + corner;
        if index < 0 || index as usize >= len {
            return Err(validation_error(format!(
                "strided view {rows}x{cols} (offset {offset}, strides {rs}, {cs}) \
                 escapes a slice of length {len}"
            )));
        }
    }
    Ok(())
}

/// Distance in elements from `(0, 0)` to `(i, j)`.
#[inline(always)]
fn element_offset(i: usize, j: usize, row_stride: isize, col_stride: isize) -> isize {
    i as isize * row_stride + j as isize * col_stride
}

#[inline(always)]
fn check_index(i: usize, j: usize, rows: usize, cols: usize) {
    assert!(
        i < rows && j < cols,
        "index ({i}, {j}) out of bounds for a {rows}x{cols} view"
    );
}

/// Read-only strided view of a matrix.
///
/// Holds a pointer to element `(0, 0)` and the two strides, the way an ndarray view
/// does. Every `(i, j)` inside the extents is readable for `'a`; the constructors
/// establish that and element access checks the extents.
#[derive(Debug, Clone, Copy)]
pub struct StridedRef<'a, T> {
    ptr: *const T,
    rows: usize,
    cols: usize,
    row_stride: isize,
    col_stride: isize,
    _marker: PhantomData<&'a T>,
}

// SAFETY: a `StridedRef` is a shared borrow of `T`s, like `&[T]`.
unsafe impl<T: Sync> Send for StridedRef<'_, T> {}
unsafe impl<T: Sync> Sync for StridedRef<'_, T> {}

impl<'a, T: Copy> StridedRef<'a, T> {
    /// View with element `(i, j)` at `data[offset + i * row_stride + j * col_stride]`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if any element of the view lies outside `data`.
    pub fn new(
        data: &'a [T],
        offset: usize,
        rows: usize,
        cols: usize,
        row_stride: isize,
        col_stride: isize,
    ) -> Result<Self> {
        check_span(data.len(), offset, rows, cols, row_stride, col_stride)?;
        Ok(StridedRef {
            ptr: data[offset..].as_ptr(),
            rows,
            cols,
            row_stride,
            col_stride,
            _marker: PhantomData,
        })
    }

    /// Column-major view of a dense `rows × cols` slice.
    ///
    /// # Panics
    ///
    /// Panics if `data` holds fewer than `rows * cols` elements.
    pub fn col_major(data: &'a [T], rows: usize, cols: usize) -> Self {
        assert!(
            data.len() >= rows * cols,
            "slice of length {} cannot hold a {rows}x{cols} matrix",
            data.len()
        );
        StridedRef {
            ptr: data.as_ptr(),
            rows,
            cols,
            row_stride: 1,
            col_stride: rows as isize,
            _marker: PhantomData,
        }
    }

    /// Row-major view of a dense `rows × cols` slice.
    ///
    /// # Panics
    ///
    /// Panics if `data` holds fewer than `rows * cols` elements.
    pub fn row_major(data: &'a [T], rows: usize, cols: usize) -> Self {
        assert!(
            data.len() >= rows * cols,
            "slice of length {} cannot hold a {rows}x{cols} matrix",
            data.len()
        );
        StridedRef {
            ptr: data.as_ptr(),
            rows,
            cols,
            row_stride: cols as isize,
            col_stride: 1,
            _marker: PhantomData,
        }
    }

    /// Row and column strides, in elements.
    #[inline(always)]
    pub fn strides(&self) -> (isize, isize) {
        (self.row_stride, self.col_stride)
    }

    /// Element `(i, j)`.
    ///
    /// # Panics
    ///
    /// Panics if `(i, j)` is outside the view.
    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> T {
        check_index(i, j, self.rows, self.cols);
        // SAFETY: `(i, j)` is inside the extents, which the constructor mapped into
        // memory borrowed for `'a`.
        unsafe { *self.ptr.offset(element_offset(i, j, self.row_stride, self.col_stride)) }
    }

    /// The `rows × cols` sub-view starting at `(row0, col0)`.
    ///
    /// # Panics
    ///
    /// Panics if the sub-view does not fit inside `self`.
    pub fn sub(&self, row0: usize, col0: usize, rows: usize, cols: usize) -> StridedRef<'a, T> {
        assert!(
            row0 + rows <= self.rows && col0 + cols <= self.cols,
            "sub-view {rows}x{cols} at ({row0}, {col0}) exceeds {}x{}",
            self.rows,
            self.cols
        );
        let ptr = if rows == 0 || cols == 0 {
            self.ptr
        } else {
            self.ptr
                .wrapping_offset(element_offset(row0, col0, self.row_stride, self.col_stride))
        };
        StridedRef {
            ptr,
            rows,
            cols,
            row_stride: self.row_stride,
            col_stride: self.col_stride,
            _marker: PhantomData,
        }
    }
}

impl<T: Copy> Matrix for StridedRef<'_, T> {
    type Elem = T;

    #[inline(always)]
    fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    fn at(&self, i: usize, j: usize) -> T {
        self.get(i, j)
    }
}

/// Mutable strided view of a matrix.
///
/// This is what the scalar kernels, the micro-kernel and the macro-kernel write
/// through: a pointer to `(0, 0)` with a row and a column stride, playing the role of
/// a raw output pointer with `incRowC`/`incColC`, but tied to an exclusive borrow of
/// the underlying storage. Only the elements inside the extents are ever touched, so
/// a view may have gaps that belong to someone else.
#[derive(Debug)]
pub struct StridedMut<'a, T> {
    ptr: *mut T,
    rows: usize,
    cols: usize,
    row_stride: isize,
    col_stride: isize,
    _marker: PhantomData<&'a mut T>,
}

// SAFETY: a `StridedMut` is an exclusive borrow of `T`s, like `&mut [T]`.
unsafe impl<T: Send> Send for StridedMut<'_, T> {}
unsafe impl<T: Sync> Sync for StridedMut<'_, T> {}

impl<'a, T: Copy> StridedMut<'a, T> {
    /// Mutable view with element `(i, j)` at `data[offset + i * row_stride + j * col_stride]`.
    ///
    /// Strides must not make distinct elements alias; aliasing is not detected and
    /// leads to wrong results (never to memory unsafety).
    ///
    /// # Errors
    ///
    /// Returns a validation error if any element of the view lies outside `data`.
    pub fn new(
        data: &'a mut [T],
        offset: usize,
        rows: usize,
        cols: usize,
        row_stride: isize,
        col_stride: isize,
    ) -> Result<Self> {
        check_span(data.len(), offset, rows, cols, row_stride, col_stride)?;
        Ok(StridedMut {
            ptr: data[offset..].as_mut_ptr(),
            rows,
            cols,
            row_stride,
            col_stride,
            _marker: PhantomData,
        })
    }

    /// Column-major view of a dense `rows × cols` slice.
    ///
    /// # Panics
    ///
    /// Panics if `data` holds fewer than `rows * cols` elements.
    pub fn col_major(data: &'a mut [T], rows: usize, cols: usize) -> Self {
        assert!(
            data.len() >= rows * cols,
            "slice of length {} cannot hold a {rows}x{cols} matrix",
            data.len()
        );
        StridedMut {
            ptr: data.as_mut_ptr(),
            rows,
            cols,
            row_stride: 1,
            col_stride: rows as isize,
            _marker: PhantomData,
        }
    }

    /// Row-major view of a dense `rows × cols` slice.
    ///
    /// # Panics
    ///
    /// Panics if `data` holds fewer than `rows * cols` elements.
    pub fn row_major(data: &'a mut [T], rows: usize, cols: usize) -> Self {
        assert!(
            data.len() >= rows * cols,
            "slice of length {} cannot hold a {rows}x{cols} matrix",
            data.len()
        );
        StridedMut {
            ptr: data.as_mut_ptr(),
            rows,
            cols,
            row_stride: cols as isize,
            col_stride: 1,
            _marker: PhantomData,
        }
    }

    /// View over raw strided storage.
    ///
    /// # Safety
    ///
    /// For every `i < rows` and `j < cols`, `ptr + i * row_stride + j * col_stride`
    /// must be valid for reads and writes and not accessed through any other path
    /// for `'a`.
    pub unsafe fn from_raw_parts(
        ptr: *mut T,
        rows: usize,
        cols: usize,
        row_stride: isize,
        col_stride: isize,
    ) -> Self {
        StridedMut {
            ptr,
            rows,
            cols,
            row_stride,
            col_stride,
            _marker: PhantomData,
        }
    }

    /// Row and column strides, in elements.
    #[inline(always)]
    pub fn strides(&self) -> (isize, isize) {
        (self.row_stride, self.col_stride)
    }

    #[inline(always)]
    fn element(&self, i: usize, j: usize) -> *mut T {
        check_index(i, j, self.rows, self.cols);
        // SAFETY: `(i, j)` is inside the extents, so the offset stays within the
        // storage the constructor vouched for.
        unsafe { self.ptr.offset(element_offset(i, j, self.row_stride, self.col_stride)) }
    }

    /// Element `(i, j)`.
    ///
    /// # Panics
    ///
    /// Panics if `(i, j)` is outside the view, as do [`set`](Self::set) and
    /// [`get_mut`](Self::get_mut).
    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> T {
        // SAFETY: `element` only returns in-bounds pointers into borrowed storage.
        unsafe { *self.element(i, j) }
    }

    /// Overwrites element `(i, j)`.
    #[inline(always)]
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        // SAFETY: as in `get`, and `&mut self` makes the write exclusive.
        unsafe { *self.element(i, j) = value }
    }

    /// Mutable reference to element `(i, j)`.
    #[inline(always)]
    pub fn get_mut(&mut self, i: usize, j: usize) -> &mut T {
        // SAFETY: as in `set`; the reference keeps `self` borrowed.
        unsafe { &mut *self.element(i, j) }
    }

    /// Mutable `rows × cols` sub-view starting at `(row0, col0)`.
    ///
    /// # Panics
    ///
    /// Panics if the sub-view does not fit inside `self`.
    pub fn sub_mut(
        &mut self,
        row0: usize,
        col0: usize,
        rows: usize,
        cols: usize,
    ) -> StridedMut<'_, T> {
        assert!(
            row0 + rows <= self.rows && col0 + cols <= self.cols,
            "sub-view {rows}x{cols} at ({row0}, {col0}) exceeds {}x{}",
            self.rows,
            self.cols
        );
        let ptr = if rows == 0 || cols == 0 {
            self.ptr
        } else {
            self.element(row0, col0)
        };
        StridedMut {
            ptr,
            rows,
            cols,
            row_stride: self.row_stride,
            col_stride: self.col_stride,
            _marker: PhantomData,
        }
    }

    /// Read-only view of the same elements.
    #[inline]
    pub fn as_view(&self) -> StridedRef<'_, T> {
        StridedRef {
            ptr: self.ptr.cast_const(),
            rows: self.rows,
            cols: self.cols,
            row_stride: self.row_stride,
            col_stride: self.col_stride,
            _marker: PhantomData,
        }
    }
}

impl<T: Copy> Matrix for StridedMut<'_, T> {
    type Elem = T;

    #[inline(always)]
    fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    fn at(&self, i: usize, j: usize) -> T {
        self.get(i, j)
    }
}

impl<T: Copy> MatrixMut for StridedMut<'_, T> {
    #[inline]
    fn strided_mut(&mut self) -> StridedMut<'_, T> {
        let (rows, cols) = (self.rows, self.cols);
        self.sub_mut(0, 0, rows, cols)
    }
}

/// Read-only window `[row0, row0 + rows) × [col0, col0 + cols)` of another matrix.
#[derive(Debug, Clone, Copy)]
pub struct SubMatrix<'a, M: ?Sized> {
    inner: &'a M,
    row0: usize,
    col0: usize,
    rows: usize,
    cols: usize,
}

impl<'a, M: Matrix + ?Sized> SubMatrix<'a, M> {
    /// # Panics
    ///
    /// Panics if the window does not fit inside `inner`.
    pub fn new(inner: &'a M, row0: usize, col0: usize, rows: usize, cols: usize) -> Self {
        assert!(
            row0 + rows <= inner.rows() && col0 + cols <= inner.cols(),
            "window {rows}x{cols} at ({row0}, {col0}) exceeds {}x{}",
            inner.rows(),
            inner.cols()
        );
        SubMatrix {
            inner,
            row0,
            col0,
            rows,
            cols,
        }
    }
}

impl<M: Matrix + ?Sized> Matrix for SubMatrix<'_, M> {
    type Elem = M::Elem;

    #[inline(always)]
    fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    fn at(&self, i: usize, j: usize) -> M::Elem {
        debug_assert!(i < self.rows && j < self.cols);
        self.inner.at(self.row0 + i, self.col0 + j)
    }
}

impl<A, S> Matrix for ArrayBase<S, Ix2>
where
    A: Copy,
    S: Data<Elem = A>,
{
    type Elem = A;

    #[inline(always)]
    fn rows(&self) -> usize {
        self.nrows()
    }

    #[inline(always)]
    fn cols(&self) -> usize {
        self.ncols()
    }

    #[inline(always)]
    fn at(&self, i: usize, j: usize) -> A {
        self[[i, j]]
    }
}

impl<A, S> MatrixMut for ArrayBase<S, Ix2>
where
    A: Copy,
    S: DataMut<Elem = A>,
{
    /// Writes go through the array's own strides, so sliced, transposed and
    /// axis-inverted arrays are all valid outputs.
    fn strided_mut(&mut self) -> StridedMut<'_, A> {
        let (rows, cols) = self.dim();
        let (row_stride, col_stride) = (self.strides()[0], self.strides()[1]);
        let ptr = self.as_mut_ptr();

        // SAFETY: `as_mut_ptr` points at element [0, 0] of uniquely owned storage and
        // ndarray guarantees every in-bounds index is valid under these strides. The
        // view borrows `self` mutably for its whole lifetime.
        unsafe { StridedMut::from_raw_parts(ptr, rows, cols, row_stride, col_stride) }
    }
}
