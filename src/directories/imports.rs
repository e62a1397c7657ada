//! Import directory: descriptors and their name / address tables.
//!
//! The import directory is an array of 20-byte descriptors ending in an all-zero record.
//! Each descriptor names one DLL and points at two parallel thunk arrays of pointer width,
//! each ending in a zero thunk:
//!
//! - the import name table (INT, also called the lookup table), which may be absent
//! - the import address table (IAT), which is always present
//!
//! A thunk with its most significant bit set imports by ordinal; otherwise its low 31 bits
//! are the RVA of a [`HintName`] record.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pescope::Image;
//! use std::path::Path;
//!
//! let image = Image::from_file(Path::new("app.exe"))?;
//! for import in image.imports() {
//!     println!("{}", import.descriptor.name);
//!     for thunk in import.symbols() {
//!         match image.hint_name(thunk)? {
//!             Some(hint_name) => println!("  {}", hint_name.name),
//!             None => println!("  #{}", thunk.ordinal().unwrap_or_default()),
//!         }
//!     }
//! }
//! # Ok::<(), pescope::Error>(())
//! ```

use log::trace;

use crate::{
    file::parser::Parser,
    headers::{DataDirectory, Magic},
    image::AddressSpace,
    Result,
};

/// One import descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDescriptor {
    /// RVA of the import name table, zero if absent
    pub import_lookup_table: u32,
    /// Zero until bound, then the bound DLL's timestamp (`0xFFFFFFFF` for new-style binding)
    pub time_date_stamp: u32,
    /// Index of the first forwarder reference
    pub forwarder_chain: u32,
    /// RVA of the NUL-terminated DLL name
    pub name_rva: u32,
    /// RVA of the import address table
    pub import_address_table: u32,
    /// The DLL name read from `name_rva`
    pub name: String,
}

impl ImportDescriptor {
    /// Size of one descriptor on disk.
    pub const SIZE: usize = 20;
}

/// Interpretation of a non-zero thunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThunkTarget {
    /// Import by ordinal, the low 16 bits of the thunk
    Ordinal(u16),
    /// Import by name, the RVA of a [`HintName`] record
    HintName(u32),
}

/// One entry of an import name or address table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImportThunk {
    /// The thunk exactly as stored, zero-extended to 64 bits
    pub raw: u64,
    /// The decoded meaning of `raw`
    pub target: ThunkTarget,
}

impl ImportThunk {
    /// Decode a raw thunk of the width selected by `magic`.
    #[must_use]
    pub fn decode(raw: u64, magic: Magic) -> Self {
        let ordinal_flag = match magic {
            Magic::Pe32 => 1u64 << 31,
            Magic::Pe32Plus => 1u64 << 63,
        };

        let target = if raw & ordinal_flag != 0 {
            ThunkTarget::Ordinal((raw & 0xFFFF) as u16)
        } else {
            ThunkTarget::HintName((raw & 0x7FFF_FFFF) as u32)
        };

        ImportThunk { raw, target }
    }

    /// The ordinal, if this thunk imports by ordinal.
    #[must_use]
    pub fn ordinal(&self) -> Option<u16> {
        match self.target {
            ThunkTarget::Ordinal(ordinal) => Some(ordinal),
            ThunkTarget::HintName(_) => None,
        }
    }

    /// The hint/name record RVA, if this thunk imports by name.
    #[must_use]
    pub fn hint_name_rva(&self) -> Option<u32> {
        match self.target {
            ThunkTarget::HintName(rva) => Some(rva),
            ThunkTarget::Ordinal(_) => None,
        }
    }
}

/// A hint/name record: export table index hint and the symbol name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintName {
    /// Index into the exporting DLL's name pointer table, tried first
    pub hint: u16,
    /// Symbol name
    pub name: String,
}

/// One imported DLL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    /// The descriptor with the DLL name resolved
    pub descriptor: ImportDescriptor,
    /// Thunks of the import name table, `None` if the descriptor has no INT
    pub name_table: Option<Vec<ImportThunk>>,
    /// Thunks of the import address table
    pub address_table: Vec<ImportThunk>,
}

impl ImportEntry {
    /// The thunks describing the imported symbols.
    ///
    /// The name table is preferred because a bound image overwrites its address table with
    /// resolved addresses.
    #[must_use]
    pub fn symbols(&self) -> &[ImportThunk] {
        self.name_table
            .as_deref()
            .unwrap_or(self.address_table.as_slice())
    }
}

/// Decode the import directory described by `directory`.
pub(crate) fn parse(
    space: &AddressSpace,
    directory: &DataDirectory,
    magic: Magic,
) -> Result<Vec<ImportEntry>> {
    let rva = u64::from(directory.virtual_address);
    let bytes = space.resolve(rva, u64::from(directory.size), "import directory")?;
    let base = space.rva_to_offset(rva, "import directory")?;
    let mut parser = Parser::at(bytes, base, "import descriptor");

    let mut entries = Vec::new();
    while parser.has_more_data() {
        let start = base + parser.pos() as u64;
        let raw = parser.read_bytes(ImportDescriptor::SIZE)?;
        if raw.iter().all(|&b| b == 0) {
            break;
        }

        let mut record = Parser::at(raw, start, "import descriptor");
        let import_lookup_table = record.read_le::<u32>()?;
        let time_date_stamp = record.read_le::<u32>()?;
        let forwarder_chain = record.read_le::<u32>()?;
        let name_rva = record.read_le::<u32>()?;
        let import_address_table = record.read_le::<u32>()?;

        let descriptor = ImportDescriptor {
            import_lookup_table,
            time_date_stamp,
            forwarder_chain,
            name_rva,
            import_address_table,
            name: space.read_cstr(u64::from(name_rva), "import DLL name")?,
        };

        let name_table = if import_lookup_table != 0 {
            Some(read_thunks(space, import_lookup_table, magic, "import name table")?)
        } else {
            None
        };
        let address_table =
            read_thunks(space, import_address_table, magic, "import address table")?;

        trace!("import {}: {} thunks", descriptor.name, address_table.len());

        entries.push(ImportEntry {
            descriptor,
            name_table,
            address_table,
        });
    }

    Ok(entries)
}

/// Read pointer-width thunks at `rva` up to, not including, the zero terminator.
fn read_thunks(
    space: &AddressSpace,
    rva: u32,
    magic: Magic,
    what: &'static str,
) -> Result<Vec<ImportThunk>> {
    let width = magic.pointer_width() as u64;
    let mut thunks = Vec::new();
    let mut cursor = u64::from(rva);

    loop {
        let bytes = space.resolve(cursor, width, what)?;
        let mut parser = Parser::new(bytes);
        let raw = match magic {
            Magic::Pe32 => u64::from(parser.read_le::<u32>()?),
            Magic::Pe32Plus => parser.read_le::<u64>()?,
        };
        if raw == 0 {
            break;
        }

        thunks.push(ImportThunk::decode(raw, magic));
        cursor += width;
    }

    Ok(thunks)
}

/// Decode the hint/name record at `rva`.
pub(crate) fn read_hint_name(space: &AddressSpace, rva: u32) -> Result<HintName> {
    let rva = u64::from(rva);
    let hint_bytes = space.resolve(rva, 2, "import hint")?;
    let hint = Parser::new(hint_bytes).read_le::<u16>()?;
    let name = space.read_cstr(rva + 2, "import name")?;

    Ok(HintName { hint, name })
}
