//! CodeView debug information.
//!
//! Every CodeView payload starts with a 4-byte signature. The `NB10` (PDB 2.0) layout
//! follows it with an offset, a timestamp and an age, then the PDB path. The `RSDS`
//! (PDB 7.0) layout, emitted by every modern toolchain, carries a GUID and an age instead.

use uguid::Guid;

use crate::{
    file::parser::{parse_cstr, Parser},
    Result,
};

/// `"RSDS"` read as a little-endian `u32`.
pub const CV_SIGNATURE_RSDS: u32 = u32::from_le_bytes(*b"RSDS");

/// `"NB10"` read as a little-endian `u32`.
pub const CV_SIGNATURE_NB10: u32 = u32::from_le_bytes(*b"NB10");

/// Decoded CodeView payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeViewInfo {
    /// The 16-byte header layout used by `NB10` and any non-`RSDS` signature
    Pdb20 {
        /// Raw signature
        signature: u32,
        /// CodeView offset, zero when the information lives in a separate PDB
        offset: u32,
        /// PDB creation time, seconds since the Unix epoch
        time_date_stamp: u32,
        /// Incremented on each partial rewrite of the PDB
        age: u32,
        /// Path of the PDB file
        path: String,
    },
    /// The `RSDS` layout
    Pdb70 {
        /// Raw signature, always [`CV_SIGNATURE_RSDS`]
        signature: u32,
        /// Identity of the matching PDB
        guid: Guid,
        /// Incremented on each partial rewrite of the PDB
        age: u32,
        /// Path of the PDB file
        path: String,
    },
}

impl CodeViewInfo {
    /// Size of the fixed `NB10` header that precedes the path.
    pub const HEADER_SIZE: usize = 16;

    /// Decode a CodeView payload starting at file offset `base`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if the payload is shorter than its fixed header.
    pub fn parse(data: &[u8], base: u64) -> Result<CodeViewInfo> {
        let mut parser = Parser::at(data, base, "CodeView header");
        let signature = parser.read_le::<u32>()?;

        if signature == CV_SIGNATURE_RSDS {
            let guid = Guid::from_bytes(parser.read_array::<16>()?);
            let age = parser.read_le::<u32>()?;
            return Ok(CodeViewInfo::Pdb70 {
                signature,
                guid,
                age,
                path: parse_cstr(parser.read_remaining()),
            });
        }

        let offset = parser.read_le::<u32>()?;
        let time_date_stamp = parser.read_le::<u32>()?;
        let age = parser.read_le::<u32>()?;
        Ok(CodeViewInfo::Pdb20 {
            signature,
            offset,
            time_date_stamp,
            age,
            path: parse_cstr(parser.read_remaining()),
        })
    }

    /// Path of the PDB file.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            CodeViewInfo::Pdb20 { path, .. } | CodeViewInfo::Pdb70 { path, .. } => path,
        }
    }

    /// PDB age.
    #[must_use]
    pub fn age(&self) -> u32 {
        match self {
            CodeViewInfo::Pdb20 { age, .. } | CodeViewInfo::Pdb70 { age, .. } => *age,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn nb10() {
        #[rustfmt::skip]
        let data = [
            b'N', b'B', b'1', b'0',     // signature
            0x00, 0x00, 0x00, 0x00,     // offset
            0x78, 0x56, 0x34, 0x12,     // time_date_stamp
            0x02, 0x00, 0x00, 0x00,     // age
            b'a', b'.', b'p', b'd', b'b', 0x00,
            0xCC, 0xCC,                 // padding after the terminator
        ];

        let info = CodeViewInfo::parse(&data, 0).unwrap();
        assert_eq!(
            info,
            CodeViewInfo::Pdb20 {
                signature: CV_SIGNATURE_NB10,
                offset: 0,
                time_date_stamp: 0x1234_5678,
                age: 2,
                path: "a.pdb".to_string(),
            }
        );
        assert_eq!(info.path(), "a.pdb");
        assert_eq!(info.age(), 2);
    }

    #[test]
    fn rsds() {
        #[rustfmt::skip]
        let data = [
            b'R', b'S', b'D', b'S',
            0x8E, 0x90, 0x37, 0xD4, 0xE6, 0x65, 0x7C, 0x48, // guid
            0x97, 0x35, 0x7B, 0xDF, 0xF6, 0x99, 0xBE, 0xA5,
            0x01, 0x00, 0x00, 0x00,                         // age
            b'C', b':', b'\\', b'x', b'.', b'p', b'd', b'b', 0x00,
        ];

        match CodeViewInfo::parse(&data, 0).unwrap() {
            CodeViewInfo::Pdb70 {
                signature,
                guid,
                age,
                path,
            } => {
                assert_eq!(signature, CV_SIGNATURE_RSDS);
                assert_eq!(guid, uguid::guid!("d437908e-65e6-487c-9735-7bdff699bea5"));
                assert_eq!(age, 1);
                assert_eq!(path, "C:\\x.pdb");
            }
            other => panic!("unexpected layout: {:?}", other),
        }
    }

    #[test]
    fn short_header() {
        let data = *b"NB10\0\0\0\0";
        assert!(matches!(
            CodeViewInfo::parse(&data, 0x500),
            Err(Error::Truncated {
                what: "CodeView header",
                offset: 0x508,
                ..
            })
        ));
    }
}
