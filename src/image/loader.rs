//! Staged construction of an [`crate::Image`].
//!
//! Each stage is its own type and only offers the step that may follow it:
//!
//! 1. [`HeaderStage`] - signature, COFF file header, optional header
//! 2. [`DirectoryStage`] - data directory table
//! 3. [`MappedStage`] - section table; the only stage that hands out an [`AddressSpace`]
//! 4. [`Loaded`] - decoded directory contents, ready to become an image
//!
//! Address translation before the section table exists is therefore unrepresentable.

use log::debug;

use crate::{
    config::ParseConfig,
    directories::{self, DirectoryContents},
    file::parser::Parser,
    headers::{
        locate_file_header, DataDirectory, FileHeader, OptionalHeader, SectionHeader,
        MAX_DATA_DIRECTORIES,
    },
    image::address::AddressSpace,
    Result,
};

/// Parser over `data` starting at `offset`, an empty one if `offset` is past the end.
fn parser_at<'a>(data: &'a [u8], offset: usize, what: &'static str) -> Parser<'a> {
    let start = offset.min(data.len());
    Parser::at(&data[start..], offset as u64, what)
}

/// Headers decoded; the cursor sits right after the optional header.
pub(crate) struct HeaderStage<'a> {
    data: &'a [u8],
    file_header: FileHeader,
    optional_header: OptionalHeader,
    cursor: usize,
}

impl<'a> HeaderStage<'a> {
    /// Validate the signature and decode the COFF and optional headers.
    pub(crate) fn read(data: &'a [u8]) -> Result<Self> {
        let file_header_offset = locate_file_header(data)?;

        let mut parser = parser_at(data, file_header_offset, "COFF file header");
        let file_header = FileHeader::read(&mut parser)?;

        let optional_offset = file_header_offset + FileHeader::SIZE;
        let mut parser = parser_at(data, optional_offset, "optional header");
        let optional_header = OptionalHeader::read(&mut parser)?;

        debug!(
            "headers: machine 0x{:04X}, {} sections, {} layout",
            file_header.machine, file_header.number_of_sections, optional_header.magic
        );

        Ok(HeaderStage {
            data,
            file_header,
            optional_header,
            cursor: optional_offset + parser.pos(),
        })
    }

    /// Decode the `number_of_rva_and_sizes` entries of the data directory table.
    pub(crate) fn read_directories(self) -> Result<DirectoryStage<'a>> {
        let count = self.optional_header.number_of_rva_and_sizes as usize;
        if count > MAX_DATA_DIRECTORIES {
            return Err(format_error!(
                "data directory count",
                format!("at most {}", MAX_DATA_DIRECTORIES),
                count
            ));
        }

        let mut parser = parser_at(self.data, self.cursor, "data directory table");
        let mut directories = Vec::with_capacity(count);
        for _ in 0..count {
            directories.push(DataDirectory::read(&mut parser)?);
        }

        debug!(
            "directories: {} entries, {} populated",
            directories.len(),
            directories.iter().filter(|d| !d.is_empty()).count()
        );

        Ok(DirectoryStage {
            data: self.data,
            file_header: self.file_header,
            optional_header: self.optional_header,
            directories,
            cursor: self.cursor + parser.pos(),
        })
    }
}

/// Directory table decoded; the cursor sits at the start of the section table.
pub(crate) struct DirectoryStage<'a> {
    data: &'a [u8],
    file_header: FileHeader,
    optional_header: OptionalHeader,
    directories: Vec<DataDirectory>,
    cursor: usize,
}

impl<'a> DirectoryStage<'a> {
    /// Decode `number_of_sections` section headers directly after the directory table.
    pub(crate) fn read_sections(self) -> Result<MappedStage<'a>> {
        let count = usize::from(self.file_header.number_of_sections);
        let mut parser = parser_at(self.data, self.cursor, "section table");

        let mut sections = Vec::with_capacity(count);
        for _ in 0..count {
            sections.push(SectionHeader::read(&mut parser)?);
        }

        debug!(
            "sections: {}",
            sections
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(MappedStage {
            data: self.data,
            file_header: self.file_header,
            optional_header: self.optional_header,
            directories: self.directories,
            sections,
        })
    }
}

/// Section table decoded; RVAs can now be translated.
pub(crate) struct MappedStage<'a> {
    data: &'a [u8],
    file_header: FileHeader,
    optional_header: OptionalHeader,
    directories: Vec<DataDirectory>,
    sections: Vec<SectionHeader>,
}

impl<'a> MappedStage<'a> {
    /// Translator over the file content and the decoded section table.
    pub(crate) fn space(&self, check_overlap: bool) -> AddressSpace<'_> {
        AddressSpace::new(self.data, &self.sections, check_overlap)
    }

    /// Dispatch every populated data directory to its decoder.
    pub(crate) fn decode_directories(self, config: &ParseConfig) -> Result<Loaded> {
        let contents = {
            let space = self.space(config.check_section_overlap);
            directories::decode(&space, self.optional_header.magic, &self.directories, config)?
        };

        Ok(Loaded {
            file_header: self.file_header,
            optional_header: self.optional_header,
            directories: self.directories,
            sections: self.sections,
            contents,
        })
    }
}

/// Fully decoded headers and directory contents, detached from the input bytes.
pub(crate) struct Loaded {
    pub(crate) file_header: FileHeader,
    pub(crate) optional_header: OptionalHeader,
    pub(crate) directories: Vec<DataDirectory>,
    pub(crate) sections: Vec<SectionHeader>,
    pub(crate) contents: DirectoryContents,
}

/// Run every stage over `data`.
pub(crate) fn load(data: &[u8], config: &ParseConfig) -> Result<Loaded> {
    HeaderStage::read(data)?
        .read_directories()?
        .read_sections()?
        .decode_directories(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        headers::Magic,
        test::builder::{PeBuilder, SectionSpec},
        Error,
    };

    #[test]
    fn stages_in_order() {
        let data = PeBuilder::new()
            .section(SectionSpec::new(".text", 0x1000, vec![0xC3; 0x20]))
            .section(SectionSpec::new(".data", 0x2000, vec![0x00; 0x10]))
            .build();

        let headers = HeaderStage::read(&data).unwrap();
        assert_eq!(headers.optional_header.magic, Magic::Pe32);
        assert_eq!(headers.file_header.number_of_sections, 2);

        let directories = headers.read_directories().unwrap();
        assert_eq!(directories.directories.len(), 16);

        let mapped = directories.read_sections().unwrap();
        assert_eq!(mapped.sections.len(), 2);
        assert_eq!(mapped.sections[1].name, ".data");

        let space = mapped.space(true);
        assert_eq!(space.resolve(0x1000, 2, "test").unwrap(), &[0xC3, 0xC3]);
    }

    #[test]
    fn too_many_directories() {
        let data = PeBuilder::new().directory_count(17).build();
        match HeaderStage::read(&data).unwrap().read_directories() {
            Err(Error::Format { what, actual, .. }) => {
                assert_eq!(what, "data directory count");
                assert_eq!(actual, "17");
            }
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("17 directories accepted"),
        }
    }

    #[test]
    fn fewer_directories_moves_section_table() {
        let data = PeBuilder::new()
            .directory_count(2)
            .section(SectionSpec::new(".text", 0x1000, vec![0x90; 8]))
            .build();

        let loaded = load(&data, &ParseConfig::default()).unwrap();
        assert_eq!(loaded.directories.len(), 2);
        assert_eq!(loaded.sections[0].name, ".text");
    }

    #[test]
    fn truncated_section_table() {
        let mut data = PeBuilder::new()
            .section(SectionSpec::new(".text", 0x1000, vec![0x90; 8]))
            .build();
        let table = PeBuilder::section_table_offset(&data);
        data.truncate(table + 20);

        assert!(matches!(
            load(&data, &ParseConfig::default()),
            Err(Error::Truncated {
                what: "section table",
                ..
            })
        ));
    }
}
