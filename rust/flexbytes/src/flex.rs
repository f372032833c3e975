//! Growable byte buffers that reallocate in place, keeping outstanding
//! windows valid.

use std::ops::{Deref, DerefMut, RangeBounds};
use std::sync::Arc;

use flexbytes_common::Result;

use crate::buffer::ByteBuf;
use crate::cell::ByteCell;
use crate::view::ByteView;

/// Controls whether a reallocation carries the existing bytes over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResizeMode {
    /// Copy `min(old, new)` bytes into the new allocation (the default).
    #[default]
    KeepData,
    /// Skip the copy; the new allocation starts zeroed. Use when the caller
    /// overwrites the contents anyway.
    IgnoreData,
}

/// A growable buffer that always owns its memory.
///
/// `FlexBuf` tracks a logical size separately from the physical capacity of
/// its cell. Capacity grows and shrinks by powers of two, never dropping
/// below the floor fixed at construction (`initial_capacity`). Reallocation
/// happens in place on the shared cell, so windows previously handed out by
/// [`FlexBuf::reserve`] or [`ByteBuf::subspan`] observe the post-resize
/// memory immediately.
///
/// `Clone` is deep and preserves both the current capacity and the floor.
/// All fixed-window operations are available through `Deref`/`DerefMut`.
pub struct FlexBuf {
    buf: ByteBuf,
    initial_capacity: usize,
}

impl FlexBuf {
    /// The floor used by [`FlexBuf::new`]: the default allocation alignment
    /// on mainstream 64-bit platforms.
    pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

    /// Creates an empty buffer with the default floor capacity.
    pub fn new() -> FlexBuf {
        FlexBuf::with_initial_capacity(Self::DEFAULT_INITIAL_CAPACITY)
    }

    /// Creates an empty buffer, pre-allocating exactly `initial_capacity`
    /// bytes. The buffer never reallocates below this floor.
    pub fn with_initial_capacity(initial_capacity: usize) -> FlexBuf {
        FlexBuf::with_allocation(initial_capacity, initial_capacity)
    }

    /// Returns the floor capacity fixed at construction.
    #[inline]
    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// Returns the current physical capacity: the largest size this buffer
    /// reaches without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.view.cell.capacity()
    }

    /// Sets the logical size, growing or shrinking the allocation by powers
    /// of two as needed. Growth measures from the current capacity; shrink
    /// re-measures from the floor. Reallocation occurs only when the target
    /// capacity differs from the current one, and it is the sole place this
    /// buffer's cell is ever reallocated.
    pub fn resize(&mut self, new_size: usize, mode: ResizeMode) {
        let cell = &self.buf.view.cell;
        let new_capacity = if new_size > self.buf.view.len {
            Self::capacity_for(new_size, cell.capacity())
        } else {
            Self::capacity_for(new_size, self.initial_capacity)
        };
        if new_capacity != cell.capacity() {
            cell.resize(mode, new_capacity);
        }
        self.buf.view.len = new_size;
    }

    /// Extends the logical size by `additional` bytes and returns a writable
    /// window over the newly added region, aliasing this buffer's cell.
    ///
    /// Existing data is preserved, so windows returned by earlier `reserve`
    /// calls stay valid and keep addressing their region.
    pub fn reserve(&mut self, additional: usize) -> ByteBuf {
        let offset = self.buf.view.len;
        self.resize(offset + additional, ResizeMode::KeepData);
        ByteBuf::from_cell(self.buf.view.cell.clone(), offset, additional)
    }

    /// Appends a slice to the buffer, growing as needed. Amortized O(len)
    /// across repeated appends thanks to capacity doubling.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        let dest = self.reserve(bytes.len());
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), dest.raw_mut(), bytes.len());
        }
    }

    /// Appends the raw bytes of a fixed-width value.
    pub fn push_typed<T: bytemuck::NoUninit>(&mut self, value: T) {
        self.extend_from_slice(bytemuck::bytes_of(&value));
    }

    /// Appends another window's visible bytes. The source is validated
    /// before the buffer grows; a window over this very buffer is fine.
    pub fn append_view(&mut self, source: &ByteView) -> Result<()> {
        source.check_bounds(0, source.len())?;
        let len = source.len();
        let dest = self.reserve(len);
        // Re-derive the source pointer after reserve: a reallocation moves
        // the bytes when the source aliases this buffer's cell.
        unsafe {
            std::ptr::copy(source.raw(), dest.raw_mut(), len);
        }
        Ok(())
    }

    /// Allocates an independent growable copy of the given range. The copy
    /// keeps this buffer's floor and takes the smallest valid capacity for
    /// its length above that floor.
    pub fn flex_copy(&self, range: impl RangeBounds<usize>) -> Result<FlexBuf> {
        let range = self.buf.view.resolve_range(range)?;
        let len = range.end - range.start;
        let mut copy = FlexBuf::with_allocation(
            self.initial_capacity,
            Self::capacity_for(len, self.initial_capacity),
        );
        copy.buf.view.len = len;
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.buf.view.raw().add(range.start),
                copy.buf.view.raw_mut(),
                len,
            );
        }
        Ok(copy)
    }

    /// Zeroes the entire physical capacity, not just the logical size
    /// (contrast [`ByteBuf::clear`], reachable through deref, which zeroes
    /// only the visible range).
    pub fn clear_all(&mut self) {
        let cell = &self.buf.view.cell;
        unsafe {
            cell.data().write_bytes(0, cell.capacity());
        }
    }

    /// The read-only view of the logical contents.
    pub fn as_view(&self) -> &ByteView {
        self.buf.as_view()
    }
}

impl FlexBuf {
    fn with_allocation(initial_capacity: usize, allocation: usize) -> FlexBuf {
        FlexBuf {
            buf: ByteBuf::from_cell(Arc::new(ByteCell::with_capacity(allocation)), 0, 0),
            initial_capacity,
        }
    }

    /// Doubles `min_capacity` (at least 1) until it reaches `size`. Once
    /// doubling can no longer represent a larger power of two, the capacity
    /// becomes exactly `size`.
    fn capacity_for(size: usize, min_capacity: usize) -> usize {
        let mut capacity = min_capacity.max(1);
        while capacity < size {
            match capacity.checked_mul(2) {
                Some(doubled) => capacity = doubled,
                None => return size,
            }
        }
        capacity
    }
}

impl Clone for FlexBuf {
    /// Deep copy preserving the current capacity and the floor.
    fn clone(&self) -> FlexBuf {
        let mut copy = FlexBuf::with_allocation(self.initial_capacity, self.capacity());
        copy.buf.view.len = self.buf.view.len;
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.buf.view.raw(),
                copy.buf.view.raw_mut(),
                self.buf.view.len,
            );
        }
        copy
    }
}

impl Default for FlexBuf {
    fn default() -> Self {
        FlexBuf::new()
    }
}

impl Deref for FlexBuf {
    type Target = ByteBuf;

    #[inline]
    fn deref(&self) -> &ByteBuf {
        &self.buf
    }
}

impl DerefMut for FlexBuf {
    #[inline]
    fn deref_mut(&mut self) -> &mut ByteBuf {
        &mut self.buf
    }
}

impl std::io::Write for FlexBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Display for FlexBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.buf, f)
    }
}

impl std::fmt::Debug for FlexBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlexBuf")
            .field("len", &self.buf.view.len)
            .field("capacity", &self.capacity())
            .field("initial_capacity", &self.initial_capacity)
            .field("bytes", &format_args!("{self}"))
            .finish()
    }
}
