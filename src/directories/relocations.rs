//! Base relocation table.
//!
//! The table is a run of blocks filling the directory's declared size exactly. Each block
//! covers one 4 KiB page: an 8-byte header (page RVA, block size including the header)
//! followed by `(block_size - 8) / 2` packed 16-bit entries. An entry holds the in-page
//! offset in its low 12 bits and the relocation type in its high 4 bits.

use log::trace;
use strum::{Display, FromRepr};

use crate::{
    file::parser::Parser,
    headers::DataDirectory,
    image::AddressSpace,
    Result,
};

/// Base relocation types.
///
/// Values 5, 7 and 8 are shared between architectures; the variant names follow the most
/// common meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u8)]
pub enum BaseRelocationType {
    /// Padding entry, skipped by the loader
    Absolute = 0,
    /// High 16 bits of the delta applied to a 16-bit field
    High = 1,
    /// Low 16 bits of the delta applied to a 16-bit field
    Low = 2,
    /// Full 32-bit delta applied to a 32-bit field
    HighLow = 3,
    /// High 16 bits adjusted using the following entry
    HighAdj = 4,
    /// MIPS jump, ARM `MOVW`/`MOVT` pair or RISC-V high 20 bits
    MipsJmpAddr = 5,
    /// Reserved
    Reserved = 6,
    /// Thumb `MOVW`/`MOVT` pair or RISC-V low 12 bits (I-type)
    ThumbMov32 = 7,
    /// RISC-V low 12 bits (S-type) or LoongArch address
    RiscvLow12S = 8,
    /// MIPS16 jump
    MipsJmpAddr16 = 9,
    /// Full 64-bit delta applied to a 64-bit field
    Dir64 = 10,
}

/// One packed relocation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BaseRelocation {
    /// Offset from the block's page RVA, 12 bits
    pub offset: u16,
    /// Raw relocation type, 4 bits
    pub kind: u8,
}

impl BaseRelocation {
    /// Split a packed entry into offset and type.
    #[must_use]
    pub fn from_raw(value: u16) -> Self {
        BaseRelocation {
            offset: value & 0x0FFF,
            kind: (value >> 12) as u8,
        }
    }

    /// The relocation type, if it is a defined one.
    #[must_use]
    pub fn relocation_type(&self) -> Option<BaseRelocationType> {
        BaseRelocationType::from_repr(self.kind)
    }

    /// RVA this entry patches, given its block's page RVA.
    #[must_use]
    pub fn rva(&self, page_rva: u32) -> u32 {
        page_rva.wrapping_add(u32::from(self.offset))
    }
}

/// One page worth of relocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseRelocBlock {
    /// RVA of the page the entries apply to
    pub page_rva: u32,
    /// Size of the block in bytes, header included
    pub block_size: u32,
    /// Entries in file order, padding entries included
    pub entries: Vec<BaseRelocation>,
}

impl BaseRelocBlock {
    /// Size of the block header.
    pub const HEADER_SIZE: u32 = 8;

    /// The patched RVA and type of each entry, padding entries excluded.
    pub fn targets(&self) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.entries
            .iter()
            .filter(|entry| entry.kind != BaseRelocationType::Absolute as u8)
            .map(|entry| (entry.rva(self.page_rva), entry.kind))
    }
}

/// Decode the base relocation directory described by `directory`.
pub(crate) fn parse(space: &AddressSpace, directory: &DataDirectory) -> Result<Vec<BaseRelocBlock>> {
    let rva = u64::from(directory.virtual_address);
    let bytes = space.resolve(rva, u64::from(directory.size), "base relocation table")?;
    let base = space.rva_to_offset(rva, "base relocation table")?;

    parse_blocks(bytes, base)
}

/// Decode relocation blocks filling all of `data`, which starts at file offset `base`.
///
/// # Errors
/// Returns [`crate::Error::Format`] for a block smaller than its header or with an odd
/// number of entry bytes, and [`crate::Error::Truncated`] for a block that runs past the
/// end of `data`.
pub fn parse_blocks(data: &[u8], base: u64) -> Result<Vec<BaseRelocBlock>> {
    let mut parser = Parser::at(data, base, "base relocation block");
    let mut blocks = Vec::new();

    while parser.has_more_data() {
        let page_rva = parser.read_le::<u32>()?;
        let block_size = parser.read_le::<u32>()?;

        if block_size < BaseRelocBlock::HEADER_SIZE {
            return Err(format_error!(
                "base relocation block size",
                format!("at least {}", BaseRelocBlock::HEADER_SIZE),
                block_size
            ));
        }

        let payload = block_size - BaseRelocBlock::HEADER_SIZE;
        if payload % 2 != 0 {
            return Err(format_error!(
                "base relocation block size",
                "8 plus a multiple of 2",
                block_size
            ));
        }

        let entry_bytes = parser.read_bytes(payload as usize)?;
        let mut entries_parser = Parser::new(entry_bytes);
        let mut entries = Vec::with_capacity(entry_bytes.len() / 2);
        while entries_parser.has_more_data() {
            entries.push(BaseRelocation::from_raw(entries_parser.read_le::<u16>()?));
        }

        trace!(
            "relocation block: page 0x{:08X}, {} entries",
            page_rva,
            entries.len()
        );

        blocks.push(BaseRelocBlock {
            page_rva,
            block_size,
            entries,
        });
    }

    Ok(blocks)
}
