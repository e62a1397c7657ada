//! Optional header, unified over the PE32 and PE32+ layouts.

use bitflags::bitflags;
use strum::{Display, FromRepr};

use crate::{file::parser::Parser, Result};

/// Optional header magic values, selecting the on-disk layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u16)]
pub enum Magic {
    /// PE32, 32-bit layout
    Pe32 = 0x010B,
    /// PE32+, 64-bit layout
    Pe32Plus = 0x020B,
}

impl Magic {
    /// Width in bytes of pointer-sized fields and import thunks for this layout.
    #[must_use]
    pub fn pointer_width(self) -> usize {
        match self {
            Magic::Pe32 => 4,
            Magic::Pe32Plus => 8,
        }
    }
}

/// Windows subsystems an image can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum Subsystem {
    Unknown = 0,
    Native = 1,
    WindowsGui = 2,
    WindowsCui = 3,
    Os2Cui = 5,
    PosixCui = 7,
    NativeWindows = 8,
    WindowsCeGui = 9,
    EfiApplication = 10,
    EfiBootServiceDriver = 11,
    EfiRuntimeDriver = 12,
    EfiRom = 13,
    Xbox = 14,
    WindowsBootApplication = 16,
}

bitflags! {
    /// DLL characteristics stored in the optional header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DllCharacteristics: u16 {
        /// Image can handle a high entropy 64-bit virtual address space
        const HIGH_ENTROPY_VA = 0x0020;
        /// DLL can be relocated at load time
        const DYNAMIC_BASE = 0x0040;
        /// Code integrity checks are enforced
        const FORCE_INTEGRITY = 0x0080;
        /// Image is NX compatible
        const NX_COMPAT = 0x0100;
        /// Isolation aware, but do not isolate the image
        const NO_ISOLATION = 0x0200;
        /// Does not use structured exception handling
        const NO_SEH = 0x0400;
        /// Do not bind the image
        const NO_BIND = 0x0800;
        /// Image must execute in an AppContainer
        const APPCONTAINER = 0x1000;
        /// A WDM driver
        const WDM_DRIVER = 0x2000;
        /// Image supports Control Flow Guard
        const GUARD_CF = 0x4000;
        /// Terminal Server aware
        const TERMINAL_SERVER_AWARE = 0x8000;
    }
}

/// The optional header of a PE image.
///
/// Both on-disk layouts are decoded into this one representation. Pointer-width fields are
/// widened to `u64`; `base_of_data` only exists in the 32-bit layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalHeader {
    /// Layout tag read from the first two bytes
    pub magic: Magic,
    /// Major linker version
    pub major_linker_version: u8,
    /// Minor linker version
    pub minor_linker_version: u8,
    /// Combined size of all code sections
    pub size_of_code: u32,
    /// Combined size of all initialized data sections
    pub size_of_initialized_data: u32,
    /// Combined size of all uninitialized data sections
    pub size_of_uninitialized_data: u32,
    /// RVA of the entry point
    pub address_of_entry_point: u32,
    /// RVA of the start of the code section
    pub base_of_code: u32,
    /// RVA of the start of the data section, PE32 only
    pub base_of_data: Option<u32>,
    /// Preferred load address
    pub image_base: u64,
    /// Alignment of sections in memory
    pub section_alignment: u32,
    /// Alignment of section data in the file
    pub file_alignment: u32,
    /// Major operating system version
    pub major_operating_system_version: u16,
    /// Minor operating system version
    pub minor_operating_system_version: u16,
    /// Major image version
    pub major_image_version: u16,
    /// Minor image version
    pub minor_image_version: u16,
    /// Major subsystem version
    pub major_subsystem_version: u16,
    /// Minor subsystem version
    pub minor_subsystem_version: u16,
    /// Reserved, must be zero
    pub win32_version_value: u32,
    /// Size of the image in memory
    pub size_of_image: u32,
    /// Combined size of all headers, rounded up to `file_alignment`
    pub size_of_headers: u32,
    /// Image checksum
    pub check_sum: u32,
    /// Raw subsystem value
    pub subsystem: u16,
    /// DLL characteristics
    pub dll_characteristics: DllCharacteristics,
    /// Stack reserve size
    pub size_of_stack_reserve: u64,
    /// Stack commit size
    pub size_of_stack_commit: u64,
    /// Heap reserve size
    pub size_of_heap_reserve: u64,
    /// Heap commit size
    pub size_of_heap_commit: u64,
    /// Reserved, must be zero
    pub loader_flags: u32,
    /// Number of data directory entries that follow the header
    pub number_of_rva_and_sizes: u32,
}

impl OptionalHeader {
    /// Read the magic value and decode the layout it selects.
    ///
    /// # Errors
    /// Returns [`crate::Error::Format`] if the magic is neither `0x010B` nor `0x020B`,
    /// or [`crate::Error::Truncated`] if the header runs past the end of the data.
    pub fn read(parser: &mut Parser) -> Result<OptionalHeader> {
        let raw_magic = parser.read_le::<u16>()?;
        let Some(magic) = Magic::from_repr(raw_magic) else {
            return Err(format_error!(
                "optional header magic",
                format!(
                    "0x{:04X} or 0x{:04X}",
                    Magic::Pe32 as u16,
                    Magic::Pe32Plus as u16
                ),
                format!("0x{:04X}", raw_magic)
            ));
        };

        let wide = magic == Magic::Pe32Plus;

        let major_linker_version = parser.read_le::<u8>()?;
        let minor_linker_version = parser.read_le::<u8>()?;
        let size_of_code = parser.read_le::<u32>()?;
        let size_of_initialized_data = parser.read_le::<u32>()?;
        let size_of_uninitialized_data = parser.read_le::<u32>()?;
        let address_of_entry_point = parser.read_le::<u32>()?;
        let base_of_code = parser.read_le::<u32>()?;
        let base_of_data = if wide {
            None
        } else {
            Some(parser.read_le::<u32>()?)
        };
        let image_base = read_pointer(parser, wide)?;

        Ok(OptionalHeader {
            magic,
            major_linker_version,
            minor_linker_version,
            size_of_code,
            size_of_initialized_data,
            size_of_uninitialized_data,
            address_of_entry_point,
            base_of_code,
            base_of_data,
            image_base,
            section_alignment: parser.read_le::<u32>()?,
            file_alignment: parser.read_le::<u32>()?,
            major_operating_system_version: parser.read_le::<u16>()?,
            minor_operating_system_version: parser.read_le::<u16>()?,
            major_image_version: parser.read_le::<u16>()?,
            minor_image_version: parser.read_le::<u16>()?,
            major_subsystem_version: parser.read_le::<u16>()?,
            minor_subsystem_version: parser.read_le::<u16>()?,
            win32_version_value: parser.read_le::<u32>()?,
            size_of_image: parser.read_le::<u32>()?,
            size_of_headers: parser.read_le::<u32>()?,
            check_sum: parser.read_le::<u32>()?,
            subsystem: parser.read_le::<u16>()?,
            dll_characteristics: DllCharacteristics::from_bits_retain(parser.read_le::<u16>()?),
            size_of_stack_reserve: read_pointer(parser, wide)?,
            size_of_stack_commit: read_pointer(parser, wide)?,
            size_of_heap_reserve: read_pointer(parser, wide)?,
            size_of_heap_commit: read_pointer(parser, wide)?,
            loader_flags: parser.read_le::<u32>()?,
            number_of_rva_and_sizes: parser.read_le::<u32>()?,
        })
    }

    /// Size in bytes of the fixed part of the header for `magic`, including the magic itself.
    #[must_use]
    pub fn size_for(magic: Magic) -> usize {
        match magic {
            Magic::Pe32 => 96,
            Magic::Pe32Plus => 112,
        }
    }

    /// Returns `true` for PE32+ images.
    #[must_use]
    pub fn is_64bit(&self) -> bool {
        self.magic == Magic::Pe32Plus
    }

    /// The subsystem, if it is one of the known values.
    #[must_use]
    pub fn subsystem_type(&self) -> Option<Subsystem> {
        Subsystem::from_repr(self.subsystem)
    }
}

/// Read a pointer-width field, widening 32-bit values.
fn read_pointer(parser: &mut Parser, wide: bool) -> Result<u64> {
    if wide {
        parser.read_le::<u64>()
    } else {
        Ok(u64::from(parser.read_le::<u32>()?))
    }
}
