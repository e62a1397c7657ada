//! Data directory table entries.

use strum::{Display, EnumCount, EnumIter, FromRepr};

use crate::{file::parser::Parser, Result};

/// The sixteen fixed-purpose data directory slots, in table order.
///
/// The discriminant is the slot's index in the table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumCount, EnumIter, FromRepr,
)]
#[repr(u8)]
pub enum DataDirectoryKind {
    /// Export table (`.edata`)
    ExportTable = 0,
    /// Import table (`.idata`)
    ImportTable = 1,
    /// Resource table (`.rsrc`)
    ResourceTable = 2,
    /// Exception table (`.pdata`)
    ExceptionTable = 3,
    /// Attribute certificate table, addressed by file offset
    CertificateTable = 4,
    /// Base relocation table (`.reloc`)
    BaseRelocationTable = 5,
    /// Debug directory
    Debug = 6,
    /// Reserved, must be zero
    Architecture = 7,
    /// RVA of the value stored in the global pointer register
    GlobalPtr = 8,
    /// Thread local storage table
    TlsTable = 9,
    /// Load configuration table
    LoadConfigTable = 10,
    /// Bound import table
    BoundImport = 11,
    /// Import address table
    ImportAddressTable = 12,
    /// Delay-load import descriptors
    DelayImportDescriptor = 13,
    /// CLR runtime header
    ClrRuntimeHeader = 14,
    /// Reserved, must be zero
    Reserved = 15,
}

impl DataDirectoryKind {
    /// Map a table index onto its slot, `None` for indices past the last slot.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index).ok().and_then(Self::from_repr)
    }
}

/// One `(rva, size)` entry of the data directory table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DataDirectory {
    /// RVA of the table (a file offset for the certificate table)
    pub virtual_address: u32,
    /// Size of the table in bytes
    pub size: u32,
}

impl DataDirectory {
    /// Size of one entry on disk.
    pub const SIZE: usize = 8;

    /// Decode one entry at the parser's current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if fewer than 8 bytes remain.
    pub fn read(parser: &mut Parser) -> Result<DataDirectory> {
        Ok(DataDirectory {
            virtual_address: parser.read_le::<u32>()?,
            size: parser.read_le::<u32>()?,
        })
    }

    /// An entry with both fields zero marks an absent directory.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.virtual_address == 0 && self.size == 0
    }
}
