use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Constructs an out-of-bounds error for a range request of `len` bytes
    /// at `offset`, where only `valid` bytes were accessible.
    #[cold]
    pub fn out_of_bounds(offset: usize, len: usize, valid: usize) -> Error {
        Error(ErrorKind::OutOfBounds { offset, len, valid }.into())
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("range out of bounds: {len} bytes at offset {offset} exceed {valid} valid bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        valid: usize,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_display() {
        let err = Error::out_of_bounds(6, 7, 12);
        assert_eq!(
            err.to_string(),
            "range out of bounds: 7 bytes at offset 6 exceed 12 valid bytes"
        );
        assert!(matches!(
            err.kind(),
            ErrorKind::OutOfBounds {
                offset: 6,
                len: 7,
                valid: 12
            }
        ));
    }
}
