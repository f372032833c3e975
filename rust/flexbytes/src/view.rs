//! Read-only byte windows with shared-on-copy semantics.

use std::ops::{Range, RangeBounds};
use std::sync::Arc;

use flexbytes_common::{Result, error::Error};

use crate::cell::ByteCell;
use crate::fmt::hex_string;

/// A read-only `(offset, len)` window over a shared [`ByteCell`].
///
/// Cloning a `ByteView` is O(1) and aliases the same memory; mutation of the
/// underlying cell through any other window is visible through every clone.
/// A view holds its own reference to the cell, so it may outlive the buffer
/// that produced it.
///
/// `len()` is fixed at creation; *access* is bounds-checked on every call
/// against the cell's live capacity, so a view over a buffer that has since
/// shrunk fails with an out-of-bounds error instead of returning stale data.
#[derive(Clone)]
pub struct ByteView {
    pub(crate) cell: Arc<ByteCell>,
    pub(crate) offset: usize,
    pub(crate) len: usize,
}

impl ByteView {
    /// Creates an empty view over no memory.
    pub fn new() -> ByteView {
        ByteView {
            cell: Arc::new(ByteCell::empty()),
            offset: 0,
            len: 0,
        }
    }

    /// Wraps `len` bytes of a shared allocation starting at `offset`,
    /// zero-copy. The allocation is kept alive by the refcount for as long
    /// as any view derived from this one exists.
    ///
    /// # Panics
    ///
    /// Panics if `offset + len` exceeds `source.len()`.
    pub fn wrap_shared(source: Arc<Vec<u8>>, offset: usize, len: usize) -> ByteView {
        ByteView {
            cell: Arc::new(ByteCell::from_shared(source, offset, len)),
            offset: 0,
            len,
        }
    }

    /// Wraps `len` bytes of raw memory starting at `data + offset`,
    /// zero-copy.
    ///
    /// # Safety
    ///
    /// The caller must keep the memory valid for the lifetime of this view
    /// and every view derived from it. Prefer [`ByteView::wrap_shared`] when
    /// shared ownership is available.
    pub unsafe fn wrap_raw(data: *const u8, offset: usize, len: usize) -> ByteView {
        ByteView {
            cell: Arc::new(unsafe { ByteCell::from_raw(data.cast_mut(), offset, len) }),
            offset: 0,
            len,
        }
    }

    /// Wraps a contiguous run of fixed-width elements as their raw bytes,
    /// zero-copy.
    ///
    /// # Safety
    ///
    /// As for [`ByteView::wrap_raw`]: the elements must outlive every view
    /// derived from this one.
    pub unsafe fn wrap_typed<T: bytemuck::NoUninit>(elements: &[T]) -> ByteView {
        let bytes: &[u8] = bytemuck::cast_slice(elements);
        unsafe { ByteView::wrap_raw(bytes.as_ptr(), 0, bytes.len()) }
    }

    /// Creates a view over a fresh owned allocation holding a copy of `data`.
    pub fn copy_from_slice(data: &[u8]) -> ByteView {
        let cell = ByteCell::with_capacity(data.len());
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), cell.data(), data.len());
        }
        ByteView {
            cell: Arc::new(cell),
            offset: 0,
            len: data.len(),
        }
    }

    /// Returns the window's fixed length. Not reduced when the underlying
    /// cell shrinks; only access is re-validated.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the base address of the visible range, after a zero-length
    /// bounds check against the live cell capacity (guards against a cell
    /// that has shrunk beneath this view).
    pub fn as_ptr(&self) -> Result<*const u8> {
        self.check_bounds(0, 0)?;
        Ok(self.raw())
    }

    /// Reads the byte at `index`.
    pub fn get(&self, index: usize) -> Result<u8> {
        self.check_bounds(index, 1)?;
        Ok(unsafe { *self.raw().add(index) })
    }

    /// Copies `size_of::<T>()` bytes at `index` into a value of `T`. No
    /// alignment is assumed.
    pub fn read_typed<T: bytemuck::AnyBitPattern>(&self, index: usize) -> Result<T> {
        self.check_bounds(index, size_of::<T>())?;
        Ok(unsafe { std::ptr::read_unaligned(self.raw().add(index).cast::<T>()) })
    }

    /// Returns a sub-view aliasing the same cell, O(1). The sub-view may
    /// outlive this view.
    pub fn subview(&self, range: impl RangeBounds<usize>) -> Result<ByteView> {
        let range = self.resolve_range(range)?;
        Ok(ByteView {
            cell: self.cell.clone(),
            offset: self.offset + range.start,
            len: range.end - range.start,
        })
    }

    /// Copies the visible bytes into a `Vec`.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        self.check_bounds(0, self.len)?;
        let mut bytes = vec![0u8; self.len];
        unsafe {
            std::ptr::copy_nonoverlapping(self.raw(), bytes.as_mut_ptr(), self.len);
        }
        Ok(bytes)
    }

    /// Renders the visible bytes as a string, replacing invalid UTF-8.
    pub fn to_utf8_lossy(&self) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.to_vec()?).into_owned())
    }

    /// Renders the visible bytes as `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> Result<String> {
        Ok(hex_string(&self.to_vec()?))
    }

    /// Borrows the visible bytes as a slice.
    ///
    /// # Safety
    ///
    /// The caller must ensure the window is within the live cell capacity
    /// (e.g. [`ByteView::as_ptr`] succeeded) and that no window over the same
    /// cell mutates it while the slice is borrowed.
    pub unsafe fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.raw(), self.len) }
    }
}

impl ByteView {
    #[inline]
    pub(crate) fn raw(&self) -> *const u8 {
        self.cell.data().wrapping_add(self.offset)
    }

    #[inline]
    pub(crate) fn raw_mut(&self) -> *mut u8 {
        self.cell.data().wrapping_add(self.offset)
    }

    /// Validates an access of `len` bytes at `index`: the range must lie
    /// within this window *and* within the live capacity of the cell. The
    /// second clause tracks the cell as it stands now, not as it stood when
    /// the window was created.
    pub(crate) fn check_bounds(&self, index: usize, len: usize) -> Result<()> {
        flexbytes_common::result::verify_bounds(index, len, self.len)?;
        let end = index + len;
        let capacity = self.cell.capacity();
        match self.offset.checked_add(end) {
            Some(abs_end) if abs_end <= capacity => Ok(()),
            _ => Err(Error::out_of_bounds(
                index,
                len,
                capacity.saturating_sub(self.offset),
            )),
        }
    }

    /// Resolves a `RangeBounds` against this window's length and validates
    /// it against the live capacity.
    pub(crate) fn resolve_range(&self, range: impl RangeBounds<usize>) -> Result<Range<usize>> {
        use std::ops::Bound;

        let start = match range.start_bound() {
            Bound::Included(&n) => n,
            Bound::Excluded(&n) => match n.checked_add(1) {
                Some(n) => n,
                None => return Err(Error::out_of_bounds(n, 1, self.len)),
            },
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&n) => match n.checked_add(1) {
                Some(n) => n,
                None => return Err(Error::out_of_bounds(n, 1, self.len)),
            },
            Bound::Excluded(&n) => n,
            Bound::Unbounded => self.len,
        };
        if start > end {
            return Err(Error::out_of_bounds(start, 0, end));
        }
        self.check_bounds(start, end - start)?;
        Ok(start..end)
    }
}

impl Default for ByteView {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ByteView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_vec() {
            Ok(bytes) => f.write_str(&hex_string(&bytes)),
            Err(_) => f.write_str("<out of bounds>"),
        }
    }
}

impl std::fmt::Debug for ByteView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteView")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("bytes", &format_args!("{self}"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexbytes_common::error::ErrorKind;

    #[test]
    fn test_new_is_empty() {
        let view = ByteView::new();
        assert_eq!(view.len(), 0);
        assert!(view.is_empty());
        assert!(view.as_ptr().is_ok());
        assert!(view.get(0).is_err());
    }

    #[test]
    fn test_wrap_shared_refcount_and_contents() {
        let source = Arc::new(b"abcde".to_vec());
        let view = ByteView::wrap_shared(source.clone(), 1, 3);
        assert_eq!(Arc::strong_count(&source), 2);
        assert_eq!(view.to_vec().unwrap(), b"bcd");
        assert_eq!(view.to_utf8_lossy().unwrap(), "bcd");
    }

    #[test]
    fn test_wrap_raw() {
        let data = b"hello world!";
        let view = unsafe { ByteView::wrap_raw(data.as_ptr(), 0, data.len()) };
        assert_eq!(view.len(), 12);
        assert_eq!(view.get(0).unwrap(), b'h');
        assert_eq!(view.get(2).unwrap(), b'l');
        assert_eq!(view.get(11).unwrap(), b'!');
    }

    #[test]
    fn test_wrap_typed_spans_element_bytes() {
        let elements = [257u16, 258u16];
        let view = unsafe { ByteView::wrap_typed(&elements) };
        assert_eq!(view.len(), 4);
        let lo = view.get(0).unwrap() as u32 + view.get(1).unwrap() as u32;
        let hi = view.get(2).unwrap() as u32 + view.get(3).unwrap() as u32;
        assert_eq!(lo, 2);
        assert_eq!(hi, 3);
    }

    #[test]
    fn test_read_typed_unaligned() {
        let view = ByteView::copy_from_slice(&[255, 1, 1]);
        assert_eq!(view.read_typed::<u16>(1).unwrap(), 257);
        assert!(view.read_typed::<u16>(2).is_err());
    }

    #[test]
    fn test_clone_is_shallow() {
        let source = Arc::new(b"abc".to_vec());
        let v1 = ByteView::wrap_shared(source, 0, 3);
        let v2 = v1.clone();
        assert_eq!(v1.to_vec().unwrap(), v2.to_vec().unwrap());
        assert!(std::ptr::eq(v1.raw(), v2.raw()));
    }

    #[test]
    fn test_subview_aliases_parent() {
        let view = ByteView::copy_from_slice(&[1, 7, 10, 33]);
        let sub1 = view.subview(1..3).unwrap();
        let sub2 = sub1.subview(1..2).unwrap();
        assert_eq!(sub1.get(0).unwrap(), 7);
        assert_eq!(sub1.get(1).unwrap(), 10);
        assert_eq!(sub2.get(0).unwrap(), 10);
        for k in 0..sub1.len() {
            assert_eq!(sub1.get(k).unwrap(), view.get(1 + k).unwrap());
        }
    }

    #[test]
    fn test_subview_to_end() {
        let view = ByteView::copy_from_slice(b"hello world!");
        let tail = view.subview(6..).unwrap();
        assert_eq!(tail.to_vec().unwrap(), b"world!");
    }

    #[test]
    fn test_subview_outlives_parent() {
        let view = ByteView::copy_from_slice(b"hello world!");
        let tail = view.subview(6..).unwrap();
        drop(view);
        assert_eq!(tail.to_vec().unwrap(), b"world!");
    }

    #[test]
    fn test_subview_out_of_bounds() {
        let view = ByteView::copy_from_slice(b"hello");
        let err = view.subview(2..7).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OutOfBounds { .. }));
        assert!(view.subview(3..2).is_err());
    }

    #[test]
    fn test_hex_rendering() {
        let view = ByteView::copy_from_slice(&[1, 7, 10, 33]);
        assert_eq!(view.to_hex().unwrap(), "0x01070a21");
        assert_eq!(format!("{view}"), "0x01070a21");
    }
}
