use thiserror::Error;

use crate::headers::DataDirectoryKind;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// Builds an [`crate::Error::Format`] from the structure name and the expected / actual values.
///
/// ```rust, ignore
/// return Err(format_error!("PE signature", format!("{:02X?}", SIGNATURE), format!("{:02X?}", found)));
/// ```
macro_rules! format_error {
    ($what:expr, $expected:expr, $actual:expr) => {
        crate::Error::Format {
            what: $what,
            expected: $expected.to_string(),
            actual: $actual.to_string(),
        }
    };
}

/// Builds an [`crate::Error::Truncated`] for a read of `len` bytes at `offset` out of `available`.
macro_rules! truncated_error {
    ($what:expr, $offset:expr, $len:expr, $available:expr) => {
        crate::Error::Truncated {
            what: $what,
            offset: $offset as u64,
            len: $len as u64,
            available: $available as u64,
        }
    };
}

/// A populated structure that was recognized but has no decoder.
///
/// Depending on the [`crate::ParseConfig`] in use, these are either raised as
/// [`Error::Unsupported`] or collected on the [`crate::Image`] so the caller can decide
/// whether to treat them as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsupported {
    /// A data directory with a non-zero `(rva, size)` entry and no decoder.
    Directory {
        /// Which directory slot was populated
        kind: DataDirectoryKind,
        /// RVA stored in the directory entry
        rva: u32,
        /// Size stored in the directory entry
        size: u32,
    },
    /// A debug directory descriptor whose type tag has no decoder.
    DebugType {
        /// Position of the descriptor within the debug directory
        index: usize,
        /// The raw type tag
        raw: u32,
    },
}

impl std::fmt::Display for Unsupported {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unsupported::Directory { kind, rva, size } => write!(
                f,
                "data directory {} ({}) at RVA 0x{:08X}, size {}",
                *kind as usize, kind, rva, size
            ),
            Unsupported::DebugType { index, raw } => {
                write!(f, "debug record #{} with type tag {}", index, raw)
            }
        }
    }
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every load stage fails the entire parse on its first error; callers either receive a
/// fully built [`crate::Image`] or exactly one of these. Each variant names the structure
/// that was being decoded together with the offset, RVA or index involved.
///
/// # Error Categories
///
/// ## Format Errors
/// - [`Error::Format`] - A signature, magic value or size field does not hold an allowed value
/// - [`Error::Truncated`] - A read would exceed the available content
/// - [`Error::AddressResolution`] - An RVA does not map to exactly one section
/// - [`Error::Unsupported`] - A populated directory or debug record has no decoder
/// - [`Error::Malformed`] - Internal consistency failure
///
/// ## Input Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::Empty`] - Empty input provided
///
/// # Examples
///
/// ```rust,no_run
/// use pescope::{Error, Image};
/// use std::path::Path;
///
/// match Image::from_file(Path::new("kernel32.dll")) {
///     Ok(image) => println!("{} sections", image.sections().len()),
///     Err(Error::Format { what, expected, actual }) => {
///         eprintln!("bad {}: expected {}, got {}", what, expected, actual);
///     }
///     Err(Error::Truncated { what, offset, len, available }) => {
///         eprintln!("{} truncated: {} bytes at 0x{:X}, {} available", what, len, offset, available);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A field did not hold one of its allowed values.
    ///
    /// Raised for a bad PE signature, an unknown optional-header magic, an impossible
    /// relocation block size, or a data directory count above the format maximum.
    #[error("Invalid {what} - expected {expected}, got {actual}")]
    Format {
        /// The structure or field being validated
        what: &'static str,
        /// The accepted value(s)
        expected: String,
        /// The value found in the input
        actual: String,
    },

    /// A read would have exceeded the available content.
    ///
    /// `available` is the length of the region being read from: the whole file, a
    /// section's on-disk extent, or a directory's declared byte range.
    #[error("Truncated {what} - {len} bytes at offset 0x{offset:X} exceed the {available} bytes available")]
    Truncated {
        /// The structure being read
        what: &'static str,
        /// Start of the requested range
        offset: u64,
        /// Length of the requested range
        len: u64,
        /// Length of the region that was read from
        available: u64,
    },

    /// An RVA did not fall inside exactly one section.
    #[error("Could not resolve {what} RVA 0x{rva:08X} - {matches} containing sections, expected 1")]
    AddressResolution {
        /// The structure whose address was being resolved
        what: &'static str,
        /// The RVA that failed to resolve
        rva: u64,
        /// Number of sections whose virtual range contains `rva`
        matches: usize,
    },

    /// A recognized structure with data present has no decoder.
    #[error("Unsupported {0}")]
    Unsupported(Unsupported),

    /// The file is damaged and could not be parsed.
    ///
    /// This error indicates an internal consistency failure. The error includes the source
    /// location where it was detected for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while opening, mapping or reading the input.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_message_names_both_values() {
        let error = format_error!("optional header magic", "0x010B or 0x020B", "0x0000");
        let message = error.to_string();
        assert!(message.contains("0x010B or 0x020B"));
        assert!(message.contains("0x0000"));
    }

    #[test]
    fn truncated_message() {
        let error = truncated_error!("section header", 0x178, 40, 0x180);
        assert_eq!(
            error.to_string(),
            "Truncated section header - 40 bytes at offset 0x178 exceed the 384 bytes available"
        );
    }

    #[test]
    fn unsupported_display() {
        let error = Error::Unsupported(Unsupported::Directory {
            kind: DataDirectoryKind::TlsTable,
            rva: 0x3000,
            size: 0x28,
        });
        assert_eq!(
            error.to_string(),
            "Unsupported data directory 9 (TlsTable) at RVA 0x00003000, size 40"
        );

        let error = Error::Unsupported(Unsupported::DebugType { index: 2, raw: 13 });
        assert_eq!(error.to_string(), "Unsupported debug record #2 with type tag 13");
    }
}
