//! Debug directory.
//!
//! Unlike the import directory there is no terminating record: the directory is an array of
//! 28-byte [`DebugDirectory`] descriptors filling exactly the declared size. Each descriptor
//! points at its payload twice, by RVA and by file offset. The RVA is used when it is
//! non-zero; a zero RVA means the payload is not mapped into any section and only the file
//! offset is meaningful.
//!
//! Payloads are decoded by type tag into a [`DebugRecord`].

pub mod codeview;
pub mod fpo;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{trace, warn};
use strum::{Display, FromRepr};

use crate::{
    config::ParseConfig,
    file::parser::Parser,
    headers::DataDirectory,
    image::AddressSpace,
    Error, Result, Unsupported,
};

pub use codeview::CodeViewInfo;
pub use fpo::{FpoData, FrameType};

/// Debug information formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u32)]
pub enum DebugType {
    /// Unknown value, ignored by all tools
    Unknown = 0,
    /// COFF debug information
    Coff = 1,
    /// Visual C++ debug information
    CodeView = 2,
    /// Frame pointer omission information
    Fpo = 3,
    /// Location of a DBG file
    Misc = 4,
    /// Copy of the `.pdata` section
    Exception = 5,
    /// Reserved
    Fixup = 6,
    /// Mapping from an RVA in the image to an RVA in the source image
    OmapToSrc = 7,
    /// Mapping from an RVA in the source image to an RVA in the image
    OmapFromSrc = 8,
    /// Reserved for Borland
    Borland = 9,
    /// Reserved
    Reserved10 = 10,
    /// Reserved
    Clsid = 11,
    /// Visual C++ feature counts
    VcFeature = 12,
    /// Profile guided optimization data
    Pogo = 13,
    /// Incremental link-time code generation
    Iltcg = 14,
    /// Intel MPX
    Mpx = 15,
    /// Deterministic build hash
    Repro = 16,
    /// Embedded portable PDB
    EmbeddedPortablePdb = 17,
    /// Hash of the matching PDB
    PdbChecksum = 19,
    /// Extended DLL characteristics
    ExDllCharacteristics = 20,
}

/// One debug directory descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugDirectory {
    /// Reserved, must be zero
    pub characteristics: u32,
    /// Creation time of the debug data, seconds since the Unix epoch
    pub time_date_stamp: u32,
    /// Major version of the debug data format
    pub major_version: u16,
    /// Minor version of the debug data format
    pub minor_version: u16,
    /// Raw format tag
    pub kind: u32,
    /// Size of the payload in bytes
    pub size_of_data: u32,
    /// RVA of the payload, zero if it is not mapped
    pub address_of_raw_data: u32,
    /// File offset of the payload
    pub pointer_to_raw_data: u32,
}

impl DebugDirectory {
    /// Size of one descriptor on disk.
    pub const SIZE: usize = 28;

    /// Decode one descriptor at the parser's current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if fewer than 28 bytes remain.
    pub fn read(parser: &mut Parser) -> Result<DebugDirectory> {
        Ok(DebugDirectory {
            characteristics: parser.read_le::<u32>()?,
            time_date_stamp: parser.read_le::<u32>()?,
            major_version: parser.read_le::<u16>()?,
            minor_version: parser.read_le::<u16>()?,
            kind: parser.read_le::<u32>()?,
            size_of_data: parser.read_le::<u32>()?,
            address_of_raw_data: parser.read_le::<u32>()?,
            pointer_to_raw_data: parser.read_le::<u32>()?,
        })
    }

    /// The format tag, if it is a known one.
    #[must_use]
    pub fn debug_type(&self) -> Option<DebugType> {
        DebugType::from_repr(self.kind)
    }

    /// Creation time as a [`SystemTime`].
    #[must_use]
    pub fn timestamp(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(u64::from(self.time_date_stamp))
    }
}

/// A debug descriptor and its decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugRecord {
    /// [`DebugType::CodeView`]
    CodeView {
        /// The descriptor
        directory: DebugDirectory,
        /// Decoded payload
        info: CodeViewInfo,
    },
    /// [`DebugType::Fpo`]
    Fpo {
        /// The descriptor
        directory: DebugDirectory,
        /// One record per function
        entries: Vec<FpoData>,
    },
    /// [`DebugType::Misc`], application defined and kept verbatim
    Misc {
        /// The descriptor
        directory: DebugDirectory,
        /// Raw payload
        data: Vec<u8>,
    },
    /// Any other type tag; the payload is not read
    Unsupported {
        /// The descriptor, `kind` holds the tag
        directory: DebugDirectory,
    },
}

impl DebugRecord {
    /// The descriptor this record was decoded from.
    #[must_use]
    pub fn directory(&self) -> &DebugDirectory {
        match self {
            DebugRecord::CodeView { directory, .. }
            | DebugRecord::Fpo { directory, .. }
            | DebugRecord::Misc { directory, .. }
            | DebugRecord::Unsupported { directory } => directory,
        }
    }
}

/// Decode the debug directory described by `directory`.
///
/// Unknown type tags either fail the parse or are recorded in `unsupported`, depending on
/// `config`.
pub(crate) fn parse(
    space: &AddressSpace,
    directory: &DataDirectory,
    config: &ParseConfig,
    unsupported: &mut Vec<Unsupported>,
) -> Result<Vec<DebugRecord>> {
    let rva = u64::from(directory.virtual_address);
    let bytes = space.resolve(rva, u64::from(directory.size), "debug directory")?;
    let base = space.rva_to_offset(rva, "debug directory")?;
    let mut parser = Parser::at(bytes, base, "debug directory");

    let mut records = Vec::new();
    while parser.has_more_data() {
        let index = records.len();
        let descriptor = DebugDirectory::read(&mut parser)?;

        let record = match descriptor.debug_type() {
            Some(DebugType::CodeView) => {
                let (data, offset) = payload(space, &descriptor)?;
                DebugRecord::CodeView {
                    directory: descriptor,
                    info: CodeViewInfo::parse(data, offset)?,
                }
            }
            Some(DebugType::Fpo) => {
                let (data, offset) = payload(space, &descriptor)?;
                DebugRecord::Fpo {
                    directory: descriptor,
                    entries: fpo::parse_entries(data, offset)?,
                }
            }
            Some(DebugType::Misc) => {
                let (data, _) = payload(space, &descriptor)?;
                DebugRecord::Misc {
                    directory: descriptor,
                    data: data.to_vec(),
                }
            }
            _ => {
                let skipped = Unsupported::DebugType {
                    index,
                    raw: descriptor.kind,
                };
                if config.fail_on_unsupported_debug {
                    return Err(Error::Unsupported(skipped));
                }

                warn!("{} has no decoder, skipped", skipped);
                unsupported.push(skipped);
                DebugRecord::Unsupported {
                    directory: descriptor,
                }
            }
        };

        trace!("debug record #{}: type {}", index, descriptor.kind);
        records.push(record);
    }

    Ok(records)
}

/// The payload bytes of `descriptor` and the file offset they start at.
fn payload<'a>(space: &AddressSpace<'a>, descriptor: &DebugDirectory) -> Result<(&'a [u8], u64)> {
    let len = u64::from(descriptor.size_of_data);

    if descriptor.address_of_raw_data != 0 {
        let rva = u64::from(descriptor.address_of_raw_data);
        let data = space.resolve(rva, len, "debug data")?;
        Ok((data, space.rva_to_offset(rva, "debug data")?))
    } else {
        let offset = u64::from(descriptor.pointer_to_raw_data);
        Ok((space.read_at(offset, len, "debug data")?, offset))
    }
}
