use std::alloc::{self, Layout};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::slice;

use crate::error::{allocation_error, layout_error, Result};
use crate::scalar::Real;

/// Heap buffer of `len` zeroed reals aligned to a caller-chosen boundary.
///
/// Backs the packed panels of the blocked GEMM. The buffer is released with the
/// same layout it was allocated with when dropped, and only ever exposed as a
/// slice, so packing and the kernels stay bounds-checked.
pub struct AlignedBuf<T: Real> {
    ptr: NonNull<T>,
    len: usize,
    layout: Layout,
    _marker: PhantomData<T>,
}

impl<T: Real> AlignedBuf<T> {
    /// Allocates `len` elements aligned to `max(align, align_of::<T>())`, all set to zero.
    ///
    /// # Errors
    ///
    /// * [`GemmError::LayoutError`](crate::GemmError::LayoutError) if `len` is zero,
    ///   `align` is not a power of two, or the byte size overflows.
    /// * [`GemmError::AllocationError`](crate::GemmError::AllocationError) if the
    ///   allocator returns null.
    pub fn zeroed(len: usize, align: usize) -> Result<Self> {
        let elem_size = std::mem::size_of::<T>();
        let size_bytes = len
            .checked_mul(elem_size)
            .ok_or_else(|| layout_error(usize::MAX, align, "buffer size overflows usize"))?;

        if size_bytes == 0 {
            return Err(layout_error(size_bytes, align, "buffer must not be empty"));
        }
        if !align.is_power_of_two() {
            return Err(layout_error(size_bytes, align, "alignment must be power of two"));
        }

        let layout = Layout::from_size_align(size_bytes, align.max(std::mem::align_of::<T>()))
            .map_err(|err| layout_error(size_bytes, align, err.to_string()))?;

        // SAFETY: the layout has a non-zero size (checked above).
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw.cast::<T>())
            .ok_or_else(|| {
                allocation_error(size_bytes, layout.align(), "allocator returned null")
            })?;

        Ok(AlignedBuf {
            ptr,
            len,
            layout,
            _marker: PhantomData,
        })
    }

    /// Alignment of the underlying allocation in bytes.
    #[inline]
    pub fn alignment(&self) -> usize {
        self.layout.align()
    }
}

impl<T: Real> Deref for AlignedBuf<T> {
    type Target = [T];

    #[inline(always)]
    fn deref(&self) -> &[T] {
        // SAFETY: `ptr` owns `len` initialized elements (all-zero bits are 0.0 for the
        // floating-point `Real` types) for as long as `self` lives.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Real> DerefMut for AlignedBuf<T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: as in `deref`, and `&mut self` guarantees exclusive access.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Real> Drop for AlignedBuf<T> {
    fn drop(&mut self) {
        // SAFETY: `ptr` was allocated by `alloc_zeroed` with exactly `layout`.
        unsafe { alloc::dealloc(self.ptr.as_ptr().cast::<u8>(), self.layout) }
    }
}

// SAFETY: the buffer uniquely owns its allocation, like a `Box<[T]>`.
unsafe impl<T: Real + Send> Send for AlignedBuf<T> {}
unsafe impl<T: Real + Sync> Sync for AlignedBuf<T> {}

impl<T: Real> std::fmt::Debug for AlignedBuf<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuf")
            .field("len", &self.len)
            .field("align", &self.layout.align())
            .finish()
    }
}
