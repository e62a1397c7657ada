//! COFF file header.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bitflags::bitflags;
use strum::{Display, FromRepr};

use crate::{file::parser::Parser, Result};

bitflags! {
    /// Image characteristics stored in the COFF file header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Characteristics: u16 {
        /// Image does not contain base relocations and must be loaded at its preferred base
        const RELOCS_STRIPPED = 0x0001;
        /// Image is valid and can be run
        const EXECUTABLE_IMAGE = 0x0002;
        /// COFF line numbers have been removed (deprecated)
        const LINE_NUMS_STRIPPED = 0x0004;
        /// COFF symbol table entries for local symbols have been removed (deprecated)
        const LOCAL_SYMS_STRIPPED = 0x0008;
        /// Aggressively trim working set (obsolete)
        const AGGRESSIVE_WS_TRIM = 0x0010;
        /// Application can handle addresses above 2 GB
        const LARGE_ADDRESS_AWARE = 0x0020;
        /// Reserved for future use
        const RESERVED_0040 = 0x0040;
        /// Little endian (deprecated)
        const BYTES_REVERSED_LO = 0x0080;
        /// Machine is based on a 32-bit-word architecture
        const MACHINE_32BIT = 0x0100;
        /// Debugging information is removed from the image file
        const DEBUG_STRIPPED = 0x0200;
        /// If the image is on removable media, fully load it and copy it to the swap file
        const REMOVABLE_RUN_FROM_SWAP = 0x0400;
        /// If the image is on network media, fully load it and copy it to the swap file
        const NET_RUN_FROM_SWAP = 0x0800;
        /// The image file is a system file, not a user program
        const SYSTEM = 0x1000;
        /// The image file is a dynamic-link library
        const DLL = 0x2000;
        /// The file should be run only on a uniprocessor machine
        const UP_SYSTEM_ONLY = 0x4000;
        /// Big endian (deprecated)
        const BYTES_REVERSED_HI = 0x8000;
    }
}

/// Known target machine types.
///
/// The header keeps the raw value; [`FileHeader::machine_type`] maps it onto this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum Machine {
    Unknown = 0x0000,
    I386 = 0x014C,
    R4000 = 0x0166,
    WceMipsV2 = 0x0169,
    Sh3 = 0x01A2,
    Sh3Dsp = 0x01A3,
    Sh4 = 0x01A6,
    Sh5 = 0x01A8,
    Arm = 0x01C0,
    Thumb = 0x01C2,
    ArmNt = 0x01C4,
    Am33 = 0x01D3,
    PowerPc = 0x01F0,
    PowerPcFp = 0x01F1,
    Ia64 = 0x0200,
    Mips16 = 0x0266,
    MipsFpu = 0x0366,
    MipsFpu16 = 0x0466,
    Ebc = 0x0EBC,
    RiscV32 = 0x5032,
    RiscV64 = 0x5064,
    RiscV128 = 0x5128,
    LoongArch32 = 0x6232,
    LoongArch64 = 0x6264,
    Amd64 = 0x8664,
    M32R = 0x9041,
    Arm64 = 0xAA64,
}

/// The COFF file header that follows the `PE\0\0` signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Raw target machine type
    pub machine: u16,
    /// Number of entries in the section table
    pub number_of_sections: u16,
    /// Creation time, seconds since the Unix epoch
    pub time_date_stamp: u32,
    /// File offset of the COFF symbol table (legacy, not decoded)
    pub pointer_to_symbol_table: u32,
    /// Number of symbol table entries (legacy, not decoded)
    pub number_of_symbols: u32,
    /// Size of the optional header in bytes
    pub size_of_optional_header: u16,
    /// Image characteristics
    pub characteristics: Characteristics,
}

impl FileHeader {
    /// Size of the header on disk.
    pub const SIZE: usize = 20;

    /// Decode a COFF file header at the parser's current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if fewer than 20 bytes remain.
    pub fn read(parser: &mut Parser) -> Result<FileHeader> {
        Ok(FileHeader {
            machine: parser.read_le::<u16>()?,
            number_of_sections: parser.read_le::<u16>()?,
            time_date_stamp: parser.read_le::<u32>()?,
            pointer_to_symbol_table: parser.read_le::<u32>()?,
            number_of_symbols: parser.read_le::<u32>()?,
            size_of_optional_header: parser.read_le::<u16>()?,
            characteristics: Characteristics::from_bits_retain(parser.read_le::<u16>()?),
        })
    }

    /// The machine type, if it is one of the known values.
    #[must_use]
    pub fn machine_type(&self) -> Option<Machine> {
        Machine::from_repr(self.machine)
    }

    /// The creation timestamp as a [`SystemTime`].
    #[must_use]
    pub fn timestamp(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(u64::from(self.time_date_stamp))
    }

    /// Returns `true` if the image is a DLL.
    #[must_use]
    pub fn is_dll(&self) -> bool {
        self.characteristics.contains(Characteristics::DLL)
    }
}
