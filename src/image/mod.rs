//! The loaded PE image.
//!
//! [`Image`] owns the raw bytes together with everything decoded from them. Loading runs the
//! staged pipeline in [`loader`] to completion before an `Image` exists, so a caller either
//! receives a fully built image or a single [`crate::Error`].
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use pescope::Image;
//! use std::path::Path;
//!
//! let image = Image::from_file(Path::new("C:/Windows/System32/kernel32.dll"))?;
//!
//! println!("{} image, base 0x{:X}", image.optional_header().magic, image.image_base());
//! for section in image.sections() {
//!     println!("{:8} 0x{:08X} {:>8}", section.name, section.virtual_address, section.virtual_size);
//! }
//!
//! let entry = u64::from(image.optional_header().address_of_entry_point);
//! let code = image.resolve(entry, 16)?;
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! An `Image` is immutable after loading and is `Send + Sync`.

mod address;
mod loader;

pub use address::AddressSpace;

use std::{io::Read, path::Path};

use log::debug;

use crate::{
    config::ParseConfig,
    directories::{
        debug::DebugRecord,
        imports::{self, HintName, ImportEntry, ImportThunk},
        relocations::BaseRelocBlock,
    },
    file::{Backend, Memory, Physical},
    headers::{DataDirectory, DataDirectoryKind, FileHeader, OptionalHeader, SectionHeader},
    Error, Result, Unsupported,
};

/// A parsed PE image.
pub struct Image {
    data: Box<dyn Backend>,
    config: ParseConfig,
    file_header: FileHeader,
    optional_header: OptionalHeader,
    directories: Vec<DataDirectory>,
    sections: Vec<SectionHeader>,
    imports: Vec<ImportEntry>,
    relocations: Vec<BaseRelocBlock>,
    debug: Vec<DebugRecord>,
    unsupported: Vec<Unsupported>,
}

impl Image {
    /// Memory-map and parse the file at `path` with the default policy.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped, or any
    /// parse error.
    pub fn from_file(path: &Path) -> Result<Image> {
        Self::from_file_with_config(path, ParseConfig::default())
    }

    /// Memory-map and parse the file at `path`.
    ///
    /// # Errors
    /// See [`Image::from_file`].
    pub fn from_file_with_config(path: &Path, config: ParseConfig) -> Result<Image> {
        let input = Physical::new(path)?;
        Self::load(input, config)
    }

    /// Read `reader` to the end and parse the bytes with the default policy.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if reading fails, or any parse error.
    pub fn from_reader<R: Read>(reader: R) -> Result<Image> {
        Self::from_reader_with_config(reader, ParseConfig::default())
    }

    /// Read `reader` to the end and parse the bytes.
    ///
    /// # Errors
    /// See [`Image::from_reader`].
    pub fn from_reader_with_config<R: Read>(mut reader: R, config: ParseConfig) -> Result<Image> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_mem_with_config(data, config)
    }

    /// Parse an in-memory buffer with the default policy.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] for an empty buffer, or any parse error.
    pub fn from_mem(data: Vec<u8>) -> Result<Image> {
        Self::from_mem_with_config(data, ParseConfig::default())
    }

    /// Parse an in-memory buffer.
    ///
    /// # Errors
    /// See [`Image::from_mem`].
    pub fn from_mem_with_config(data: Vec<u8>, config: ParseConfig) -> Result<Image> {
        Self::load(Memory::new(data), config)
    }

    fn load<T: Backend + 'static>(input: T, config: ParseConfig) -> Result<Image> {
        if input.is_empty() {
            return Err(Error::Empty);
        }

        let loaded = loader::load(input.data(), &config)?;
        debug!(
            "loaded {} bytes: {} imports, {} relocation blocks, {} debug records, {} unsupported",
            input.len(),
            loaded.contents.imports.len(),
            loaded.contents.relocations.len(),
            loaded.contents.debug.len(),
            loaded.contents.unsupported.len()
        );

        Ok(Image {
            data: Box::new(input),
            config,
            file_header: loaded.file_header,
            optional_header: loaded.optional_header,
            directories: loaded.directories,
            sections: loaded.sections,
            imports: loaded.contents.imports,
            relocations: loaded.contents.relocations,
            debug: loaded.contents.debug,
            unsupported: loaded.contents.unsupported,
        })
    }

    /// The complete file content.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// The policy the image was loaded with.
    #[must_use]
    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// The COFF file header.
    #[must_use]
    pub fn file_header(&self) -> &FileHeader {
        &self.file_header
    }

    /// The optional header.
    #[must_use]
    pub fn optional_header(&self) -> &OptionalHeader {
        &self.optional_header
    }

    /// The data directory table, `number_of_rva_and_sizes` entries in slot order.
    #[must_use]
    pub fn data_directories(&self) -> &[DataDirectory] {
        &self.directories
    }

    /// The directory entry in slot `kind`, `None` if the table is shorter or the entry is empty.
    #[must_use]
    pub fn data_directory(&self, kind: DataDirectoryKind) -> Option<&DataDirectory> {
        self.directories
            .get(kind as usize)
            .filter(|directory| !directory.is_empty())
    }

    /// The section table in file order.
    #[must_use]
    pub fn sections(&self) -> &[SectionHeader] {
        &self.sections
    }

    /// Imported DLLs in descriptor order.
    #[must_use]
    pub fn imports(&self) -> &[ImportEntry] {
        &self.imports
    }

    /// Base relocation blocks in table order.
    #[must_use]
    pub fn relocations(&self) -> &[BaseRelocBlock] {
        &self.relocations
    }

    /// Debug records in descriptor order.
    #[must_use]
    pub fn debug(&self) -> &[DebugRecord] {
        &self.debug
    }

    /// Populated directories and debug records that were skipped for lack of a decoder.
    #[must_use]
    pub fn unsupported(&self) -> &[Unsupported] {
        &self.unsupported
    }

    /// Fail if anything was skipped for lack of a decoder.
    ///
    /// # Errors
    /// Returns the first entry of [`Image::unsupported`] as [`crate::Error::Unsupported`].
    pub fn ensure_supported(&self) -> Result<()> {
        match self.unsupported.first() {
            Some(unsupported) => Err(Error::Unsupported(*unsupported)),
            None => Ok(()),
        }
    }

    /// Returns `true` for a PE32+ image.
    #[must_use]
    pub fn is_64bit(&self) -> bool {
        self.optional_header.is_64bit()
    }

    /// Preferred load address.
    #[must_use]
    pub fn image_base(&self) -> u64 {
        self.optional_header.image_base
    }

    /// Address translator over this image's content and section table.
    #[must_use]
    pub fn address_space(&self) -> AddressSpace<'_> {
        AddressSpace::new(
            self.data.data(),
            &self.sections,
            self.config.check_section_overlap,
        )
    }

    /// The `len` bytes mapped at `rva`.
    ///
    /// # Errors
    /// Returns [`crate::Error::AddressResolution`] if `rva` does not map to exactly one
    /// section, or [`crate::Error::Truncated`] if the range leaves the section's on-disk
    /// data or the file.
    pub fn resolve(&self, rva: u64, len: u64) -> Result<&[u8]> {
        self.address_space().resolve(rva, len, "data")
    }

    /// The `len` bytes at file offset `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if the range runs past the end of the file.
    pub fn read_at(&self, offset: u64, len: u64) -> Result<&[u8]> {
        self.address_space().read_at(offset, len, "data")
    }

    /// Translate `rva` to a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::AddressResolution`] if `rva` does not map to exactly one section.
    pub fn rva_to_offset(&self, rva: u64) -> Result<u64> {
        self.address_space().rva_to_offset(rva, "data")
    }

    /// Translate file offset `offset` to an RVA.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section's on-disk data contains `offset`.
    pub fn offset_to_rva(&self, offset: u64) -> Result<u64> {
        self.address_space().offset_to_rva(offset)
    }

    /// The section containing `rva`.
    ///
    /// # Errors
    /// Returns [`crate::Error::AddressResolution`] if `rva` does not map to exactly one section.
    pub fn section_for_rva(&self, rva: u64) -> Result<&SectionHeader> {
        self.address_space().section_for_rva(rva, "data")
    }

    /// The on-disk bytes of `section`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if the section's raw data extends past the file.
    pub fn section_data(&self, section: &SectionHeader) -> Result<&[u8]> {
        self.address_space().read_at(
            u64::from(section.pointer_to_raw_data),
            u64::from(section.size_of_raw_data),
            "section data",
        )
    }

    /// The NUL-terminated string at `rva`.
    ///
    /// # Errors
    /// Returns [`crate::Error::AddressResolution`] if `rva` is unmapped, or
    /// [`crate::Error::Truncated`] if the string is not terminated inside its section.
    pub fn read_cstr_at_rva(&self, rva: u64) -> Result<String> {
        self.address_space().read_cstr(rva, "string")
    }

    /// Decode the hint/name record a thunk points at; `None` for ordinal imports.
    ///
    /// # Errors
    /// Returns an address or truncation error if the record cannot be read.
    pub fn hint_name(&self, thunk: &ImportThunk) -> Result<Option<HintName>> {
        match thunk.hint_name_rva() {
            Some(rva) => Ok(Some(imports::read_hint_name(&self.address_space(), rva)?)),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("len", &self.data.len())
            .field("file_header", &self.file_header)
            .field("optional_header", &self.optional_header)
            .field("sections", &self.sections.len())
            .field("imports", &self.imports.len())
            .field("relocations", &self.relocations.len())
            .field("debug", &self.debug.len())
            .field("unsupported", &self.unsupported)
            .finish()
    }
}
