//! Section table entries.

use bitflags::bitflags;

use crate::{
    file::parser::{parse_cstr, Parser},
    Result,
};

bitflags! {
    /// Section characteristics.
    ///
    /// Bits 20-23 hold an encoded alignment rather than independent flags; use
    /// [`SectionFlags::alignment`] to decode them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SectionFlags: u32 {
        /// Section should not be padded to the next boundary (obsolete)
        const TYPE_NO_PAD = 0x0000_0008;
        /// Section contains executable code
        const CNT_CODE = 0x0000_0020;
        /// Section contains initialized data
        const CNT_INITIALIZED_DATA = 0x0000_0040;
        /// Section contains uninitialized data
        const CNT_UNINITIALIZED_DATA = 0x0000_0080;
        /// Reserved
        const LNK_OTHER = 0x0000_0100;
        /// Section contains comments or other information (object files)
        const LNK_INFO = 0x0000_0200;
        /// Section will not become part of the image (object files)
        const LNK_REMOVE = 0x0000_0800;
        /// Section contains COMDAT data (object files)
        const LNK_COMDAT = 0x0000_1000;
        /// Section contains data referenced through the global pointer
        const GPREL = 0x0000_8000;
        /// Reserved
        const MEM_PURGEABLE = 0x0002_0000;
        /// Reserved
        const MEM_LOCKED = 0x0004_0000;
        /// Reserved
        const MEM_PRELOAD = 0x0008_0000;
        /// Section contains extended relocations
        const LNK_NRELOC_OVFL = 0x0100_0000;
        /// Section can be discarded as needed
        const MEM_DISCARDABLE = 0x0200_0000;
        /// Section cannot be cached
        const MEM_NOT_CACHED = 0x0400_0000;
        /// Section is not pageable
        const MEM_NOT_PAGED = 0x0800_0000;
        /// Section can be shared in memory
        const MEM_SHARED = 0x1000_0000;
        /// Section can be executed as code
        const MEM_EXECUTE = 0x2000_0000;
        /// Section can be read
        const MEM_READ = 0x4000_0000;
        /// Section can be written to
        const MEM_WRITE = 0x8000_0000;
    }
}

impl SectionFlags {
    /// Mask of the encoded alignment field.
    pub const ALIGN_MASK: u32 = 0x00F0_0000;

    /// Decode the alignment field: 1 through 8192 bytes, `None` when unset or reserved.
    #[must_use]
    pub fn alignment(&self) -> Option<u32> {
        match (self.bits() & Self::ALIGN_MASK) >> 20 {
            0 | 15 => None,
            n => Some(1 << (n - 1)),
        }
    }
}

/// One entry of the section table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    /// Section name up to the first NUL
    pub name: String,
    /// The name field as stored on disk
    pub raw_name: [u8; 8],
    /// Size of the section when loaded into memory
    pub virtual_size: u32,
    /// RVA of the section
    pub virtual_address: u32,
    /// Size of the section data on disk
    pub size_of_raw_data: u32,
    /// File offset of the section data
    pub pointer_to_raw_data: u32,
    /// File offset of COFF relocations (legacy)
    pub pointer_to_relocations: u32,
    /// File offset of COFF line numbers (legacy)
    pub pointer_to_linenumbers: u32,
    /// Number of COFF relocations (legacy)
    pub number_of_relocations: u16,
    /// Number of COFF line numbers (legacy)
    pub number_of_linenumbers: u16,
    /// Section characteristics
    pub characteristics: SectionFlags,
}

impl SectionHeader {
    /// Size of one entry on disk.
    pub const SIZE: usize = 40;

    /// Decode one section header at the parser's current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if fewer than 40 bytes remain.
    pub fn read(parser: &mut Parser) -> Result<SectionHeader> {
        let raw_name = parser.read_array::<8>()?;

        Ok(SectionHeader {
            name: parse_cstr(&raw_name),
            raw_name,
            virtual_size: parser.read_le::<u32>()?,
            virtual_address: parser.read_le::<u32>()?,
            size_of_raw_data: parser.read_le::<u32>()?,
            pointer_to_raw_data: parser.read_le::<u32>()?,
            pointer_to_relocations: parser.read_le::<u32>()?,
            pointer_to_linenumbers: parser.read_le::<u32>()?,
            number_of_relocations: parser.read_le::<u16>()?,
            number_of_linenumbers: parser.read_le::<u16>()?,
            characteristics: SectionFlags::from_bits_retain(parser.read_le::<u32>()?),
        })
    }

    /// Returns `true` if `rva` lies in `[virtual_address, virtual_address + virtual_size)`.
    #[must_use]
    pub fn contains_rva(&self, rva: u64) -> bool {
        let start = u64::from(self.virtual_address);
        let end = start + u64::from(self.virtual_size);
        rva >= start && rva < end
    }

    /// Returns `true` if file offset `offset` lies within the section's on-disk data.
    #[must_use]
    pub fn contains_offset(&self, offset: u64) -> bool {
        let start = u64::from(self.pointer_to_raw_data);
        let end = start + u64::from(self.size_of_raw_data);
        offset >= start && offset < end
    }
}
