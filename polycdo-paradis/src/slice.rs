use std::marker::PhantomData;
use std::ops::Range;

/// Shared mutable access to the elements of a slice from several threads.
///
/// Obtaining an access borrows the slice mutably, so no safe reference to its elements can
/// coexist with it. It is up to the holder to never touch the same element from two threads.
pub struct ParallelSliceAccess<'a, T> {
    ptr: *mut T,
    len: usize,
    marker: PhantomData<&'a mut T>,
}

impl<'a, T> ParallelSliceAccess<'a, T> {
    pub fn new(slice: &'a mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Safety
    ///
    /// `index` must be in bounds, and no other thread may access the same element concurrently.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_unchecked_mut(&self, index: usize) -> &'a mut T {
        debug_assert!(index < self.len);
        &mut *self.ptr.add(index)
    }

    /// Construct a subslice for the given range.
    ///
    /// # Safety
    ///
    /// The range must be valid for the slice.
    ///
    /// Multiple threads must not call this function with overlapping ranges without synchronization.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn subslice_mut(&self, range: Range<usize>) -> &'a mut [T] {
        let Range { start, end } = range;
        debug_assert!(end >= start);
        debug_assert!(end <= self.len);
        std::slice::from_raw_parts_mut(self.ptr.add(start), end - start)
    }
}

unsafe impl<'a, T: Sync> Sync for ParallelSliceAccess<'a, T> {}
unsafe impl<'a, T: Send> Send for ParallelSliceAccess<'a, T> {}
