//! Fixed-layout PE headers and the signature / layout resolver.
//!
//! Everything in this module is decoded at fixed offsets before any address translation is
//! possible: the `e_lfanew` pointer at `0x3C`, the `PE\0\0` signature it points at, the COFF
//! file header, the optional header whose magic selects the PE32 or PE32+ layout, the data
//! directory table and the section table.
//!
//! # Layout
//!
//! | Structure | Offset | Size |
//! |---|---|---|
//! | PE header pointer | `0x3C` | 4 |
//! | Signature | pointer | 4 |
//! | [`FileHeader`] | signature + 4 | 20 |
//! | [`OptionalHeader`] | file header + 20 | 96 (PE32) / 112 (PE32+) |
//! | [`DataDirectory`] table | optional header end | 8 x `number_of_rva_and_sizes` |
//! | [`SectionHeader`] table | directory table end | 40 x `number_of_sections` |

mod coff;
mod directory;
mod optional;
mod section;

pub use coff::{Characteristics, FileHeader, Machine};
pub use directory::{DataDirectory, DataDirectoryKind};
pub use optional::{DllCharacteristics, Magic, OptionalHeader, Subsystem};
pub use section::{SectionFlags, SectionHeader};

use crate::{file::parser::Parser, Result};

/// File offset of the 4-byte pointer to the PE signature.
pub const PE_POINTER_OFFSET: usize = 0x3C;

/// The PE signature, `"PE\0\0"`.
pub const PE_SIGNATURE: [u8; 4] = *b"PE\0\0";

/// Maximum number of data directories the format defines.
pub const MAX_DATA_DIRECTORIES: usize = 16;

/// Follow the pointer at `0x3C`, validate the signature and return the file offset of the
/// COFF file header that follows it.
///
/// # Errors
/// Returns [`crate::Error::Truncated`] if the pointer or signature lie past the end of `data`,
/// or [`crate::Error::Format`] if the signature does not match.
pub fn locate_file_header(data: &[u8]) -> Result<usize> {
    let mut parser = Parser::at(data, 0, "PE header pointer");
    parser.seek(PE_POINTER_OFFSET.min(data.len()))?;
    if parser.remaining() < 4 {
        return Err(truncated_error!(
            "PE header pointer",
            PE_POINTER_OFFSET,
            4,
            data.len()
        ));
    }
    let pointer = parser.read_le::<u32>()? as usize;

    let Some(signature) = pointer
        .checked_add(PE_SIGNATURE.len())
        .and_then(|end| data.get(pointer..end))
    else {
        return Err(truncated_error!(
            "PE signature",
            pointer,
            PE_SIGNATURE.len(),
            data.len()
        ));
    };

    if signature != PE_SIGNATURE {
        return Err(format_error!(
            "PE signature",
            hex(&PE_SIGNATURE),
            hex(signature)
        ));
    }

    Ok(pointer + PE_SIGNATURE.len())
}

/// Space-separated upper-case hex rendering used in error messages.
fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn stub(pointer: u32, signature: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; pointer as usize + signature.len()];
        data[0] = b'M';
        data[1] = b'Z';
        data[PE_POINTER_OFFSET..PE_POINTER_OFFSET + 4].copy_from_slice(&pointer.to_le_bytes());
        data[pointer as usize..].copy_from_slice(signature);
        data
    }

    #[test]
    fn valid_signature() {
        let data = stub(0x80, b"PE\0\0");
        assert_eq!(locate_file_header(&data).unwrap(), 0x84);
    }

    #[test]
    fn invalid_signature() {
        let data = stub(0x80, b"NE\0\0");
        match locate_file_header(&data) {
            Err(Error::Format {
                what,
                expected,
                actual,
            }) => {
                assert_eq!(what, "PE signature");
                assert_eq!(expected, "50 45 00 00");
                assert_eq!(actual, "4E 45 00 00");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn pointer_past_end() {
        let mut data = stub(0x80, b"PE\0\0");
        data[PE_POINTER_OFFSET..PE_POINTER_OFFSET + 4].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        assert!(matches!(
            locate_file_header(&data),
            Err(Error::Truncated {
                what: "PE signature",
                ..
            })
        ));
    }

    #[test]
    fn too_small_for_pointer() {
        let data = [0x4D, 0x5A, 0x90, 0x00];
        assert!(matches!(
            locate_file_header(&data),
            Err(Error::Truncated {
                what: "PE header pointer",
                offset: 0x3C,
                ..
            })
        ));
    }
}
