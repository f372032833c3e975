//! Common definitions (errors and results) relied upon by the flexbytes crates.

pub mod error;
pub mod result;

pub use result::Result;
