//! Error types for blockgemm operations.
//!
//! `gemm` treats every error as a programmer error and panics with the error's
//! message; `try_gemm` and the view constructors hand the same errors back to the
//! caller instead.

use std::fmt;

/// Errors that can occur while preparing or running a GEMM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GemmError {
    /// Pack buffer allocation failed.
    AllocationError {
        /// The size that was requested to be allocated.
        requested_size: usize,
        /// The alignment that was requested.
        requested_alignment: usize,
        /// Human-readable error message.
        message: String,
    },
    /// Invalid layout parameters were provided.
    LayoutError {
        /// The size parameter that caused the error.
        size: usize,
        /// The alignment parameter that caused the error.
        alignment: usize,
        /// Human-readable error message.
        message: String,
    },
    /// Operand shapes do not agree.
    DimensionMismatch {
        /// Which pair of extents was compared.
        what: &'static str,
        /// Extent required by the other operand.
        expected: usize,
        /// Extent actually found.
        found: usize,
    },
    /// Input validation error (strided views, block size policies).
    ValidationError {
        /// Human-readable error message.
        message: String,
    },
}

impl fmt::Display for GemmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GemmError::AllocationError {
                requested_size,
                requested_alignment,
                message,
            } => write!(
                f,
                "Memory allocation failed: {} (requested {} bytes with {} byte alignment)",
                message, requested_size, requested_alignment
            ),
            GemmError::LayoutError {
                size,
                alignment,
                message,
            } => write!(
                f,
                "Invalid memory layout: {} (size: {}, alignment: {})",
                message, size, alignment
            ),
            GemmError::DimensionMismatch {
                what,
                expected,
                found,
            } => write!(
                f,
                "Dimension mismatch: {} (expected {}, found {})",
                what, expected, found
            ),
            GemmError::ValidationError { message } => {
                write!(f, "Validation error: {}", message)
            }
        }
    }
}

impl std::error::Error for GemmError {}

/// Result type alias for blockgemm operations.
pub type Result<T> = std::result::Result<T, GemmError>;

/// Creates an allocation error.
pub fn allocation_error(size: usize, alignment: usize, message: impl Into<String>) -> GemmError {
    GemmError::AllocationError {
        requested_size: size,
        requested_alignment: alignment,
        message: message.into(),
    }
}

/// Creates a layout error.
pub fn layout_error(size: usize, alignment: usize, message: impl Into<String>) -> GemmError {
    GemmError::LayoutError {
        size,
        alignment,
        message: message.into(),
    }
}

/// Creates a dimension mismatch error.
pub fn dimension_mismatch(what: &'static str, expected: usize, found: usize) -> GemmError {
    GemmError::DimensionMismatch {
        what,
        expected,
        found,
    }
}

/// Creates a validation error.
pub fn validation_error(message: impl Into<String>) -> GemmError {
    GemmError::ValidationError {
        message: message.into(),
    }
}

/// Returns `a` if both extents agree, a [`GemmError::DimensionMismatch`] otherwise.
#[inline]
pub fn same(what: &'static str, a: usize, b: usize) -> Result<usize> {
    if a == b {
        Ok(a)
    } else {
        Err(dimension_mismatch(what, a, b))
    }
}
