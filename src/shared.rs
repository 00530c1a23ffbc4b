//! Zero-copy matrix views shared across worker tasks.
//!
//! An attack hands every byte worker the same trace and plaintext data. To
//! avoid per-task serialization of potentially large matrices, the data lives
//! in a reference-counted buffer described by a [`MatrixDescriptor`]; workers
//! borrow read-only [`ArrayView2`]s reconstructed from the buffer and the
//! descriptor, and never copy or mutate the elements.

use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::{Error, error::Result};

/// Element type declared by a [`MatrixDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
    U8,
    F32,
    F64,
}

/// Types that can back a [`SharedMatrix`].
pub trait Element: Copy + Send + Sync + 'static {
    const ELEMENT_TYPE: ElementType;
}

impl Element for u8 {
    const ELEMENT_TYPE: ElementType = ElementType::U8;
}

impl Element for f32 {
    const ELEMENT_TYPE: ElementType = ElementType::F32;
}

impl Element for f64 {
    const ELEMENT_TYPE: ElementType = ElementType::F64;
}

/// Shape and element type of a shared buffer, sufficient to reconstruct a
/// matrix view without copying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixDescriptor {
    /// Number of rows (one per measurement)
    pub rows: usize,
    /// Number of columns (time samples, or key-byte positions)
    pub cols: usize,
    pub element_type: ElementType,
}

/// A read-only matrix shared between worker tasks.
///
/// Cloning is cheap: clones share the same underlying buffer.
#[derive(Debug, Clone)]
pub struct SharedMatrix<T> {
    data: Arc<[T]>,
    rows: usize,
    cols: usize,
}

impl<T: Element> SharedMatrix<T> {
    /// Wrap a row-major element buffer described by `descriptor`.
    ///
    /// Fails if the descriptor's element type does not match `T` or if the
    /// buffer length is not `rows * cols`. A malformed descriptor is a
    /// precondition violation, detected here before any task is scheduled.
    pub fn new(data: Arc<[T]>, descriptor: MatrixDescriptor) -> Result<Self> {
        if descriptor.element_type != T::ELEMENT_TYPE {
            return Err(Error::ElementTypeMismatch {
                declared: descriptor.element_type,
                actual: T::ELEMENT_TYPE,
            });
        }
        if data.len() != descriptor.rows * descriptor.cols {
            return Err(Error::ShapeMismatch {
                rows: descriptor.rows,
                cols: descriptor.cols,
                len: data.len(),
            });
        }

        Ok(Self {
            data,
            rows: descriptor.rows,
            cols: descriptor.cols,
        })
    }

    /// Move an owned matrix into a shared buffer.
    pub fn from_array(array: Array2<T>) -> Self {
        let (rows, cols) = array.dim();
        // Iteration is in logical order, so the buffer ends up row-major
        // whatever the source layout.
        let data: Arc<[T]> = array.into_iter().collect();

        Self { data, rows, cols }
    }

    pub fn descriptor(&self) -> MatrixDescriptor {
        MatrixDescriptor {
            rows: self.rows,
            cols: self.cols,
            element_type: T::ELEMENT_TYPE,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Reconstruct the matrix view over the shared buffer.
    ///
    /// Never copies; the shape was validated at construction so the
    /// reconstruction cannot fail.
    pub fn view(&self) -> ArrayView2<'_, T> {
        ArrayView2::from_shape((self.rows, self.cols), &self.data).unwrap()
    }
}
