//! Shared byte windows and growable buffers with precise aliasing semantics.
//!
//! All windows over the same allocation go through one shared cell, so a
//! reallocation by a [`FlexBuf`] is immediately visible to every window:
//! nothing dangles, and a window left beyond a shrunk buffer fails its next
//! access instead of reading stale memory.
//!
//! The copy laws, by type:
//! - [`ByteView`]: read-only; `Clone` is a shallow O(1) alias.
//! - [`ByteBuf`]: writable, fixed size; `Clone` is a deep copy. Aliasing is
//!   explicit through [`ByteBuf::subspan`].
//! - [`FlexBuf`]: writable and growable; `Clone` is a deep copy preserving
//!   capacity. Grows and shrinks by powers of two above a per-buffer floor.
//!
//! [`ByteReader`] and [`ByteWriter`] walk a window sequentially.
//!
//! None of the types are `Send` or `Sync`: windows over one cell must stay
//! on one thread.

mod cell;

pub mod buffer;
pub mod cursor;
pub mod flex;
pub mod fmt;
pub mod view;

pub use buffer::ByteBuf;
pub use cursor::{ByteReader, ByteWriter};
pub use flex::{FlexBuf, ResizeMode};
pub use view::ByteView;

pub use flexbytes_common::{Result, error};
