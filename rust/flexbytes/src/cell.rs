//! The shared, reallocatable allocation behind every byte window.
//!
//! A `ByteCell` is reached through `Arc<ByteCell>` by every window that views
//! it. Reallocation replaces the cell's pointer and capacity in place, never
//! its identity, so outstanding windows observe the new memory the next time
//! they go through the cell. Never exposed outside the crate.

use std::cell::UnsafeCell;
use std::sync::Arc;

use crate::flex::ResizeMode;

/// One contiguous byte allocation with interior-mutable pointer/capacity.
///
/// The raw pointer makes the cell (and everything holding it) `!Send` and
/// `!Sync`, which is the intended contract: sharing across threads requires
/// external synchronization this crate does not provide.
pub(crate) struct ByteCell {
    state: UnsafeCell<CellState>,
}

struct CellState {
    data: *mut u8,
    capacity: usize,
    owner: Owner,
}

enum Owner {
    /// Heap block allocated by the cell, freed on drop.
    Owned,
    /// Shared allocation kept alive for the cell's lifetime.
    #[allow(dead_code)]
    Shared(Arc<Vec<u8>>),
    /// Caller-managed memory, nothing to release.
    External,
}

impl ByteCell {
    /// Creates a cell with no memory at all (the backing of a default window).
    pub(crate) fn empty() -> ByteCell {
        ByteCell {
            state: UnsafeCell::new(CellState {
                data: std::ptr::null_mut(),
                capacity: 0,
                owner: Owner::External,
            }),
        }
    }

    /// Allocates a fresh zero-initialized block of `capacity` bytes owned by
    /// the cell.
    pub(crate) fn with_capacity(capacity: usize) -> ByteCell {
        ByteCell {
            state: UnsafeCell::new(CellState {
                data: alloc_zeroed(capacity),
                capacity,
                owner: Owner::Owned,
            }),
        }
    }

    /// References `size` bytes of `source` starting at `offset`, keeping the
    /// allocation alive through the refcount. The memory is never written
    /// through a cell created this way.
    ///
    /// # Panics
    ///
    /// Panics if `offset + size` exceeds `source.len()`.
    pub(crate) fn from_shared(source: Arc<Vec<u8>>, offset: usize, size: usize) -> ByteCell {
        assert!(
            offset
                .checked_add(size)
                .is_some_and(|end| end <= source.len()),
            "shared range {offset}..{offset}+{size} exceeds source length {}",
            source.len()
        );
        let data = unsafe { source.as_ptr().add(offset) }.cast_mut();
        ByteCell {
            state: UnsafeCell::new(CellState {
                data,
                capacity: size,
                owner: Owner::Shared(source),
            }),
        }
    }

    /// References `size` bytes of caller-managed memory starting at
    /// `data + offset`.
    ///
    /// # Safety
    ///
    /// The caller must ensure the memory stays valid for `size` bytes at
    /// `data + offset` for as long as any window over this cell exists.
    pub(crate) unsafe fn from_raw(data: *mut u8, offset: usize, size: usize) -> ByteCell {
        ByteCell {
            state: UnsafeCell::new(CellState {
                data: data.wrapping_add(offset),
                capacity: size,
                owner: Owner::External,
            }),
        }
    }

    #[inline]
    pub(crate) fn data(&self) -> *mut u8 {
        unsafe { (*self.state.get()).data }
    }

    /// The live capacity: windows bounds-check against this on every access,
    /// not against a capacity frozen at window creation.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        unsafe { (*self.state.get()).capacity }
    }

    /// Replaces the cell's allocation with a fresh zeroed block of
    /// `new_capacity` bytes. With [`ResizeMode::KeepData`], the first
    /// `min(old, new)` bytes are carried over; with
    /// [`ResizeMode::IgnoreData`] the new block stays zeroed.
    ///
    /// Pointer, capacity and ownership swap together; the cell's identity is
    /// untouched, so every window holding this cell sees the new memory.
    pub(crate) fn resize(&self, mode: ResizeMode, new_capacity: usize) {
        let new_data = alloc_zeroed(new_capacity);
        // No references into the old block are live here: windows only hold
        // the cell, and all access re-derives the pointer per call.
        let state = unsafe { &mut *self.state.get() };
        if mode == ResizeMode::KeepData && !state.data.is_null() {
            let preserved = state.capacity.min(new_capacity);
            unsafe {
                std::ptr::copy_nonoverlapping(state.data, new_data, preserved);
            }
        }
        *state = CellState {
            data: new_data,
            capacity: new_capacity,
            owner: Owner::Owned,
        };
    }
}

impl Drop for CellState {
    fn drop(&mut self) {
        if let Owner::Owned = self.owner {
            unsafe {
                free_block(self.data, self.capacity);
            }
        }
    }
}

/// Allocates a zeroed heap block. Allocation exhaustion aborts the process;
/// it is not a recoverable error anywhere in this crate.
fn alloc_zeroed(capacity: usize) -> *mut u8 {
    let block = vec![0u8; capacity].into_boxed_slice();
    Box::into_raw(block).cast::<u8>()
}

/// # Safety
///
/// `data`/`capacity` must come from [`alloc_zeroed`] and not have been freed.
unsafe fn free_block(data: *mut u8, capacity: usize) {
    let slice = std::ptr::slice_from_raw_parts_mut(data, capacity);
    drop(unsafe { Box::from_raw(slice) });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_capacity_zeroed() {
        let cell = ByteCell::with_capacity(32);
        assert_eq!(cell.capacity(), 32);
        let bytes = unsafe { std::slice::from_raw_parts(cell.data(), 32) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_empty_cell() {
        let cell = ByteCell::empty();
        assert_eq!(cell.capacity(), 0);
        assert!(cell.data().is_null());
    }

    #[test]
    fn test_from_shared_offsets_into_source() {
        let source = Arc::new(b"abcde".to_vec());
        let cell = ByteCell::from_shared(source.clone(), 1, 3);
        assert_eq!(Arc::strong_count(&source), 2);
        assert_eq!(cell.capacity(), 3);
        assert_eq!(unsafe { *cell.data() }, b'b');
    }

    #[test]
    #[should_panic(expected = "exceeds source length")]
    fn test_from_shared_rejects_oversized_range() {
        let source = Arc::new(b"abc".to_vec());
        let _ = ByteCell::from_shared(source, 1, 3);
    }

    #[test]
    fn test_resize_keep_data_preserves_prefix() {
        let cell = ByteCell::with_capacity(4);
        unsafe {
            std::ptr::copy_nonoverlapping(b"wxyz".as_ptr(), cell.data(), 4);
        }
        cell.resize(ResizeMode::KeepData, 8);
        assert_eq!(cell.capacity(), 8);
        let bytes = unsafe { std::slice::from_raw_parts(cell.data(), 8) };
        assert_eq!(bytes, b"wxyz\0\0\0\0");
    }

    #[test]
    fn test_resize_ignore_data_zeroes() {
        let cell = ByteCell::with_capacity(4);
        unsafe {
            std::ptr::copy_nonoverlapping(b"wxyz".as_ptr(), cell.data(), 4);
        }
        cell.resize(ResizeMode::IgnoreData, 8);
        let bytes = unsafe { std::slice::from_raw_parts(cell.data(), 8) };
        assert_eq!(bytes, &[0u8; 8]);
    }

    #[test]
    fn test_resize_visible_through_shared_handle() {
        let cell = Arc::new(ByteCell::with_capacity(4));
        let alias = cell.clone();
        cell.resize(ResizeMode::KeepData, 16);
        assert_eq!(alias.capacity(), 16);
        assert_eq!(alias.data(), cell.data());
    }
}
