//! Cursor-based little-endian reader for PE structures.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a bounds-checked cursor over a
//! byte slice. Each parser knows which structure it is decoding and the absolute file offset
//! its slice starts at, so a failed read reports where in the file the data ran out.
//!
//! # Usage Examples
//!
//! ```rust
//! use pescope::Parser;
//!
//! let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
//! let mut parser = Parser::new(&data);
//!
//! let first = parser.read_le::<u32>()?;
//! assert_eq!(first, 0x04030201);
//!
//! parser.seek(6)?;
//! let last_bytes = parser.read_le::<u16>()?;
//! assert_eq!(last_bytes, 0x0807);
//! # Ok::<(), pescope::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, PeIO},
    Error, Result,
};

/// A binary data parser for reading PE structures.
///
/// `Parser` maintains an internal position cursor and provides bounds checking
/// to prevent buffer overruns when reading malformed or truncated data. Errors
/// are reported as [`crate::Error::Truncated`] carrying the structure name given
/// to [`Parser::at`] and the absolute offset of the failed read.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
    /// Absolute file offset of `data[0]`, used for error reporting
    base: u64,
    /// Name of the structure being decoded, used for error reporting
    what: &'static str,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pescope::Parser;
    /// let data = [0x01, 0x02, 0x03, 0x04];
    /// let parser = Parser::new(&data);
    /// assert_eq!(parser.len(), 4);
    /// ```
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0, "data")
    }

    /// Create a parser over `data`, which starts at file offset `base` and holds `what`.
    #[must_use]
    pub fn at(data: &'a [u8], base: u64, what: &'static str) -> Self {
        Parser {
            data,
            position: 0,
            base,
            what,
        }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of bytes between the cursor and the end of the buffer.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Move the current position to the specified index.
    ///
    /// Seeking to exactly the end of the buffer is allowed.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(self.truncated(pos, 0));
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        if step > self.remaining() {
            return Err(self.truncated(self.position, step));
        }

        self.position += step;
        Ok(())
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Get access to the underlying data buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Read a type `T` in little-endian format and advance the cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if reading `T` would exceed the data length.
    pub fn read_le<T: PeIO>(&mut self) -> Result<T> {
        let position = self.position;
        read_le_at::<T>(self.data, &mut self.position)
            .map_err(|_| self.truncated(position, std::mem::size_of::<T>()))
    }

    /// Borrow the next `len` bytes and advance the cursor past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(self.truncated(self.position, len));
        }

        let bytes = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    /// Read a fixed-size byte array and advance the cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if fewer than `N` bytes remain.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let position = self.position;
        let bytes = self.read_bytes(N)?;
        bytes
            .try_into()
            .map_err(|_| self.truncated(position, N))
    }

    /// Consume every remaining byte.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let bytes = &self.data[self.position..];
        self.position = self.data.len();
        bytes
    }

    fn truncated(&self, position: usize, len: usize) -> Error {
        truncated_error!(
            self.what,
            self.base + position as u64,
            len,
            self.data.len()
        )
    }
}

/// Decode a NUL-terminated string from `data`.
///
/// Everything up to the first NUL (or the whole slice if there is none) is decoded as
/// UTF-8, replacing invalid sequences.
#[must_use]
pub fn parse_cstr(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_reads() {
        #[rustfmt::skip]
        let data = [
            0x4D, 0x5A,             // u16
            0x80, 0x00, 0x00, 0x00, // u32
            0xAA,                   // u8
        ];

        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_le::<u16>().unwrap(), 0x5A4D);
        assert_eq!(parser.read_le::<u32>().unwrap(), 0x80);
        assert_eq!(parser.read_le::<u8>().unwrap(), 0xAA);
        assert!(!parser.has_more_data());
        assert_eq!(parser.remaining(), 0);
    }

    #[test]
    fn truncation_reports_absolute_offset() {
        let data = [0x01, 0x02, 0x03];
        let mut parser = Parser::at(&data, 0x400, "debug directory");
        parser.advance_by(2).unwrap();

        match parser.read_le::<u32>() {
            Err(Error::Truncated {
                what,
                offset,
                len,
                available,
            }) => {
                assert_eq!(what, "debug directory");
                assert_eq!(offset, 0x402);
                assert_eq!(len, 4);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }

        assert_eq!(parser.pos(), 2);
    }

    #[test]
    fn seek_bounds() {
        let data = [0u8; 4];
        let mut parser = Parser::new(&data);
        assert!(parser.seek(4).is_ok());
        assert!(!parser.has_more_data());
        assert!(parser.seek(5).is_err());
    }

    #[test]
    fn bytes_and_arrays() {
        let data = *b".text\0\0\0rest";
        let mut parser = Parser::new(&data);
        let name = parser.read_array::<8>().unwrap();
        assert_eq!(&name, b".text\0\0\0");
        assert_eq!(parser.read_bytes(2).unwrap(), b"re");
        assert!(parser.read_bytes(3).is_err());
        assert_eq!(parser.read_remaining(), b"st");
    }

    #[test]
    fn cstr() {
        assert_eq!(parse_cstr(b"KERNEL32.dll\0junk"), "KERNEL32.dll");
        assert_eq!(parse_cstr(b"no-terminator"), "no-terminator");
        assert_eq!(parse_cstr(b"\0"), "");
    }
}
