//! Fixed-size mutable byte windows with deep-copy-on-clone semantics.

use std::ops::{Deref, RangeBounds};
use std::sync::Arc;

use flexbytes_common::Result;

use crate::cell::ByteCell;
use crate::view::ByteView;

/// A fixed-size writable window over a [`ByteCell`].
///
/// `Clone` is a **deep copy**: it allocates a fresh cell sized to this
/// buffer's length and duplicates the bytes. This is the copy law that
/// distinguishes `ByteBuf` from [`ByteView`], whose clone aliases. Explicit
/// [`ByteBuf::subspan`] still produces an O(1) aliasing window when sharing
/// is what the caller wants.
///
/// All read operations of [`ByteView`] are available through `Deref`.
pub struct ByteBuf {
    pub(crate) view: ByteView,
}

impl ByteBuf {
    /// Allocates a fresh owned buffer of `size` zeroed bytes.
    pub fn allocate(size: usize) -> ByteBuf {
        ByteBuf::from_cell(Arc::new(ByteCell::with_capacity(size)), 0, size)
    }

    /// Allocates a new buffer holding a copy of `data`.
    pub fn copy_from_slice(data: &[u8]) -> ByteBuf {
        let buf = ByteBuf::allocate(data.len());
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), buf.view.raw_mut(), data.len());
        }
        buf
    }

    /// Allocates a new buffer holding a copy of a contiguous run of
    /// fixed-width elements.
    pub fn copy_from_typed_slice<T: bytemuck::NoUninit>(values: &[T]) -> ByteBuf {
        ByteBuf::copy_from_slice(bytemuck::cast_slice(values))
    }

    /// Allocates a new buffer holding a copy of the view's visible bytes.
    pub fn copy_of(source: &ByteView) -> Result<ByteBuf> {
        source.check_bounds(0, source.len())?;
        let buf = ByteBuf::allocate(source.len());
        unsafe {
            std::ptr::copy_nonoverlapping(source.raw(), buf.view.raw_mut(), source.len());
        }
        Ok(buf)
    }

    /// Wraps `len` bytes of caller-managed mutable memory starting at
    /// `data + offset`, zero-copy.
    ///
    /// # Safety
    ///
    /// The caller must keep the memory valid and exclusively writable through
    /// this buffer (and windows derived from it) for their whole lifetime.
    pub unsafe fn wrap_raw(data: *mut u8, offset: usize, len: usize) -> ByteBuf {
        ByteBuf::from_cell(
            Arc::new(unsafe { ByteCell::from_raw(data, offset, len) }),
            0,
            len,
        )
    }

    /// Writes one byte at `index`.
    pub fn set(&mut self, index: usize, value: u8) -> Result<()> {
        self.view.check_bounds(index, 1)?;
        unsafe {
            *self.view.raw_mut().add(index) = value;
        }
        Ok(())
    }

    /// Copies `bytes` into the buffer starting at `index`. Fully validated
    /// before any byte moves.
    pub fn put_slice(&mut self, index: usize, bytes: &[u8]) -> Result<()> {
        self.view.check_bounds(index, bytes.len())?;
        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                self.view.raw_mut().add(index),
                bytes.len(),
            );
        }
        Ok(())
    }

    /// Writes the raw bytes of a fixed-width value at `index`. No alignment
    /// is assumed.
    pub fn put_typed<T: bytemuck::NoUninit>(&mut self, index: usize, value: T) -> Result<()> {
        self.put_slice(index, bytemuck::bytes_of(&value))
    }

    /// Writes a contiguous run of fixed-width elements at `index`.
    pub fn put_typed_slice<T: bytemuck::NoUninit>(
        &mut self,
        index: usize,
        values: &[T],
    ) -> Result<()> {
        self.put_slice(index, bytemuck::cast_slice(values))
    }

    /// Copies another window's visible bytes into the buffer at `index`.
    /// Both source and destination ranges are validated first; the copy
    /// handles overlapping windows over the same cell.
    pub fn put_view(&mut self, index: usize, source: &ByteView) -> Result<()> {
        source.check_bounds(0, source.len())?;
        self.view.check_bounds(index, source.len())?;
        unsafe {
            std::ptr::copy(source.raw(), self.view.raw_mut().add(index), source.len());
        }
        Ok(())
    }

    /// Returns a mutable window aliasing the same cell for the given range,
    /// O(1). The returned buffer may outlive this one.
    pub fn subspan(&self, range: impl RangeBounds<usize>) -> Result<ByteBuf> {
        let range = self.view.resolve_range(range)?;
        Ok(ByteBuf::from_cell(
            self.view.cell.clone(),
            self.view.offset + range.start,
            range.end - range.start,
        ))
    }

    /// Allocates an independent buffer holding a copy of the given range.
    /// Always deep, regardless of the caller.
    pub fn copy(&self, range: impl RangeBounds<usize>) -> Result<ByteBuf> {
        let range = self.view.resolve_range(range)?;
        let buf = ByteBuf::allocate(range.end - range.start);
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.view.raw().add(range.start),
                buf.view.raw_mut(),
                range.end - range.start,
            );
        }
        Ok(buf)
    }

    /// Zeroes all bytes in the visible range.
    pub fn clear(&mut self) -> Result<()> {
        self.view.check_bounds(0, self.view.len)?;
        unsafe {
            self.view.raw_mut().write_bytes(0, self.view.len);
        }
        Ok(())
    }

    /// Returns the base address of the visible range for writing, after a
    /// zero-length bounds check against the live cell capacity.
    pub fn as_mut_ptr(&mut self) -> Result<*mut u8> {
        self.view.check_bounds(0, 0)?;
        Ok(self.view.raw_mut())
    }

    /// Borrows the visible bytes as a mutable slice.
    ///
    /// # Safety
    ///
    /// As for [`ByteView::as_slice`], plus exclusivity: no other window over
    /// the same cell may access the memory while the slice is borrowed.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.view.raw_mut(), self.view.len) }
    }

    /// The read-only view of this buffer.
    pub fn as_view(&self) -> &ByteView {
        &self.view
    }

    /// Consumes the buffer, keeping the window as a read-only view.
    pub fn into_view(self) -> ByteView {
        self.view
    }
}

impl ByteBuf {
    #[inline]
    pub(crate) fn from_cell(cell: Arc<ByteCell>, offset: usize, len: usize) -> ByteBuf {
        ByteBuf {
            view: ByteView { cell, offset, len },
        }
    }
}

impl Clone for ByteBuf {
    /// Deep copy: allocates a brand-new cell sized to this buffer's length
    /// and duplicates the bytes.
    ///
    /// # Panics
    ///
    /// Panics if the underlying cell has shrunk beneath this window (a stale
    /// window cannot be duplicated, and `Clone` has no error channel).
    fn clone(&self) -> ByteBuf {
        ByteBuf::copy_of(&self.view).expect("deep copy of stale buffer")
    }
}

impl Default for ByteBuf {
    fn default() -> Self {
        ByteBuf {
            view: ByteView::new(),
        }
    }
}

impl Deref for ByteBuf {
    type Target = ByteView;

    #[inline]
    fn deref(&self) -> &ByteView {
        &self.view
    }
}

impl std::fmt::Display for ByteBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.view, f)
    }
}

impl std::fmt::Debug for ByteBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteBuf")
            .field("offset", &self.view.offset)
            .field("len", &self.view.len)
            .field("bytes", &format_args!("{self}"))
            .finish()
    }
}
