pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Fails with an out-of-bounds error unless `end <= valid`.
#[inline]
pub fn verify_bounds(offset: usize, len: usize, valid: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= valid => Ok(()),
        _ => Err(crate::error::Error::out_of_bounds(offset, len, valid)),
    }
}
