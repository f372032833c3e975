//! Sequential cursors over byte windows.

use flexbytes_common::{Result, error::Error};

use crate::buffer::ByteBuf;
use crate::view::ByteView;

/// A forward-reading cursor over a [`ByteView`].
///
/// Consuming reads hand back sub-views aliasing the source, so reading is
/// O(1) per call regardless of length.
#[derive(Clone)]
pub struct ByteReader {
    view: ByteView,
    position: usize,
}

impl ByteReader {
    pub fn new(view: ByteView) -> ByteReader {
        ByteReader { view, position: 0 }
    }

    /// Bytes left between the cursor and the end of the window.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.view.len().saturating_sub(self.position)
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the cursor to an absolute offset. A position at or past the end
    /// is allowed; subsequent reads simply fail.
    #[inline]
    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Returns the next `len` bytes without advancing.
    pub fn peek(&self, len: usize) -> Result<ByteView> {
        self.view.subview(self.position..self.checked_end(len)?)
    }

    /// Returns the next `len` bytes and advances past them.
    pub fn next(&mut self, len: usize) -> Result<ByteView> {
        let taken = self.peek(len)?;
        self.position += len;
        Ok(taken)
    }

    /// Reads a fixed-width value at the cursor without advancing.
    pub fn peek_typed<T: bytemuck::AnyBitPattern>(&self) -> Result<T> {
        self.view.read_typed(self.position)
    }

    /// Reads a fixed-width value at the cursor and advances past it.
    pub fn next_typed<T: bytemuck::AnyBitPattern>(&mut self) -> Result<T> {
        let value = self.peek_typed()?;
        self.position += size_of::<T>();
        Ok(value)
    }

    /// The window this reader walks over.
    pub fn as_view(&self) -> &ByteView {
        &self.view
    }

    fn checked_end(&self, len: usize) -> Result<usize> {
        match self.position.checked_add(len) {
            Some(end) if end <= self.view.len() => Ok(end),
            _ => Err(Error::out_of_bounds(self.position, len, self.view.len())),
        }
    }
}

impl std::io::Read for ByteReader {
    /// Copies up to `buf.len()` bytes and advances; returns `Ok(0)` at the
    /// end of the window. A window gone stale reports an error instead.
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let len = buf.len().min(self.remaining());
        let taken = self.next(len).map_err(std::io::Error::other)?;
        buf[..len].copy_from_slice(&taken.to_vec().map_err(std::io::Error::other)?);
        Ok(len)
    }
}

/// A forward-writing cursor over a borrowed [`ByteBuf`].
///
/// The buffer's size is fixed; a write that does not fit fails whole, moving
/// neither the cursor nor any byte of the buffer.
pub struct ByteWriter<'a> {
    buf: &'a mut ByteBuf,
    position: usize,
}

impl<'a> ByteWriter<'a> {
    pub fn new(buf: &'a mut ByteBuf) -> ByteWriter<'a> {
        ByteWriter { buf, position: 0 }
    }

    /// Bytes left between the cursor and the end of the buffer.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.position)
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the cursor to an absolute offset.
    #[inline]
    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Copies `bytes` at the cursor and advances past them. All-or-nothing.
    pub fn write_slice(&mut self, bytes: &[u8]) -> Result<()> {
        self.checked_end(bytes.len())?;
        self.buf.put_slice(self.position, bytes)?;
        self.position += bytes.len();
        Ok(())
    }

    /// Writes the raw bytes of a fixed-width value at the cursor and
    /// advances past them.
    pub fn write_typed<T: bytemuck::NoUninit>(&mut self, value: T) -> Result<()> {
        self.write_slice(bytemuck::bytes_of(&value))
    }

    /// Copies another window's visible bytes at the cursor and advances
    /// past them.
    pub fn write_view(&mut self, source: &ByteView) -> Result<()> {
        self.checked_end(source.len())?;
        self.buf.put_view(self.position, source)?;
        self.position += source.len();
        Ok(())
    }

    /// Returns a writable window over the next `len` bytes, aliasing the
    /// buffer, without advancing.
    pub fn peek(&self, len: usize) -> Result<ByteBuf> {
        let end = self.checked_end(len)?;
        self.buf.subspan(self.position..end)
    }

    /// Returns a writable window over the next `len` bytes, aliasing the
    /// buffer, and advances past them.
    pub fn next(&mut self, len: usize) -> Result<ByteBuf> {
        let end = self.checked_end(len)?;
        let span = self.buf.subspan(self.position..end)?;
        self.position = end;
        Ok(span)
    }

    fn checked_end(&self, len: usize) -> Result<usize> {
        match self.position.checked_add(len) {
            Some(end) if end <= self.buf.len() => Ok(end),
            _ => Err(Error::out_of_bounds(self.position, len, self.buf.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_sequential() {
        let view = ByteView::copy_from_slice(b"hello world!");
        let mut reader = ByteReader::new(view);
        assert_eq!(reader.remaining(), 12);
        assert_eq!(reader.next(6).unwrap().to_vec().unwrap(), b"hello ");
        assert_eq!(reader.remaining(), 6);
        assert_eq!(reader.next(6).unwrap().to_vec().unwrap(), b"world!");
        assert_eq!(reader.remaining(), 0);
        assert!(reader.next(1).is_err());
    }

    #[test]
    fn test_reader_peek_does_not_advance() {
        let view = ByteView::copy_from_slice(b"hello");
        let mut reader = ByteReader::new(view);
        assert_eq!(reader.peek(2).unwrap().to_vec().unwrap(), b"he");
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.next(2).unwrap().to_vec().unwrap(), b"he");
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn test_reader_typed() {
        let mut buf = ByteBuf::allocate(6);
        buf.put_typed::<u16>(0, 257).unwrap();
        buf.put_typed::<u32>(2, 123456789).unwrap();
        let mut reader = ByteReader::new(buf.into_view());
        assert_eq!(reader.peek_typed::<u16>().unwrap(), 257);
        assert_eq!(reader.next_typed::<u16>().unwrap(), 257);
        assert_eq!(reader.next_typed::<u32>().unwrap(), 123456789);
        assert!(reader.next_typed::<u8>().is_err());
    }

    #[test]
    fn test_reader_views_alias_source() {
        let mut buf = ByteBuf::copy_from_slice(b"hello world!");
        let mut reader = ByteReader::new(buf.as_view().clone());
        let head = reader.next(5).unwrap();
        buf.set(0, b'H').unwrap();
        assert_eq!(head.to_vec().unwrap(), b"Hello");
    }

    #[test]
    fn test_reader_set_position() {
        let view = ByteView::copy_from_slice(b"hello world!");
        let mut reader = ByteReader::new(view);
        reader.set_position(6);
        assert_eq!(reader.next(6).unwrap().to_vec().unwrap(), b"world!");
        reader.set_position(100);
        assert_eq!(reader.remaining(), 0);
        assert!(reader.next(1).is_err());
    }

    #[test]
    fn test_reader_io_read() {
        use std::io::Read;
        let view = ByteView::copy_from_slice(b"hello world!");
        let mut reader = ByteReader::new(view);
        let mut head = [0u8; 6];
        reader.read_exact(&mut head).unwrap();
        assert_eq!(&head, b"hello ");
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"world!");
    }

    #[test]
    fn test_writer_sequential_and_full() {
        let mut buf = ByteBuf::allocate(12);
        let mut writer = ByteWriter::new(&mut buf);
        assert_eq!(writer.remaining(), 12);
        writer.write_slice(b"hello").unwrap();
        assert_eq!(writer.remaining(), 7);
        writer.write_typed::<u8>(b' ').unwrap();
        assert_eq!(writer.remaining(), 6);
        writer.write_slice(b"world!").unwrap();
        assert_eq!(writer.remaining(), 0);
        assert!(writer.write_slice(b"x").is_err());
        assert_eq!(writer.remaining(), 0);
        assert_eq!(buf.to_vec().unwrap(), b"hello world!");
    }

    #[test]
    fn test_writer_failed_write_moves_nothing() {
        let mut buf = ByteBuf::copy_from_slice(b"hello");
        let mut writer = ByteWriter::new(&mut buf);
        writer.write_slice(b"HEL").unwrap();
        assert!(writer.write_slice(b"LO!").is_err());
        assert_eq!(writer.position(), 3);
        assert_eq!(buf.to_vec().unwrap(), b"HELlo");
    }

    #[test]
    fn test_writer_write_view() {
        let src = ByteView::copy_from_slice(b"world!");
        let mut buf = ByteBuf::allocate(12);
        let mut writer = ByteWriter::new(&mut buf);
        writer.write_slice(b"hello ").unwrap();
        writer.write_view(&src).unwrap();
        assert_eq!(buf.to_vec().unwrap(), b"hello world!");
    }

    #[test]
    fn test_writer_peek_does_not_advance() {
        let mut buf = ByteBuf::allocate(4);
        let mut writer = ByteWriter::new(&mut buf);
        let mut window = writer.peek(2).unwrap();
        assert_eq!(writer.position(), 0);
        window.put_slice(0, b"hi").unwrap();
        assert_eq!(writer.next(2).unwrap().to_vec().unwrap(), b"hi");
    }

    #[test]
    fn test_writer_next_aliases_buffer() {
        let mut buf = ByteBuf::allocate(4);
        {
            let mut writer = ByteWriter::new(&mut buf);
            let mut head = writer.next(2).unwrap();
            let mut tail = writer.next(2).unwrap();
            assert!(writer.next(1).is_err());
            head.put_slice(0, b"ab").unwrap();
            tail.put_slice(0, b"cd").unwrap();
        }
        assert_eq!(buf.to_vec().unwrap(), b"abcd");
    }
}
