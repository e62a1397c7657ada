//! Byte sources and low-level readers.
//!
//! Parsing a PE image requires random access driven by pointers embedded in the image
//! itself, so every input is made fully addressable before the first header is decoded.
//! This module abstracts over where those bytes live and provides the bounds-checked
//! primitives every higher-level decoder is built on.
//!
//! # Key Components
//!
//! - [`crate::file::Backend`] - Trait for different data sources (disk files, memory buffers)
//! - [`crate::file::physical::Physical`] - Memory-mapped file backend for disk access
//! - [`crate::file::memory::Memory`] - In-memory buffer backend
//! - [`crate::file::parser::Parser`] - Cursor for decoding fixed-layout records
//! - [`crate::file::io`] - Little-endian primitive reads
//!
//! # Thread Safety
//!
//! Backends are `Send + Sync` and immutable once created, so a loaded image can be shared
//! across threads for concurrent read-only analysis.

pub mod io;
pub mod parser;

mod memory;
mod physical;

pub use memory::Memory;
pub use physical::Physical;

use crate::Result;

/// Backend trait for file data sources.
///
/// This trait abstracts over the source of PE data, allowing for both in-memory and on-disk
/// representations. All implementations must be thread-safe.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Arguments
    ///
    /// * `offset` - The starting offset within the data.
    /// * `len` - The length of the slice in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Truncated`] if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;

    /// Returns `true` if the backend holds no data.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
