//! Data directory dispatch and the per-directory decoders.
//!
//! The directory table has at most sixteen fixed slots. [`decode`] walks it in index order,
//! skips absent entries and routes each populated one by its [`DataDirectoryKind`]:
//!
//! | Slot | Handling |
//! |---|---|
//! | [`DataDirectoryKind::ImportTable`] | [`imports`] |
//! | [`DataDirectoryKind::BaseRelocationTable`] | [`relocations`] |
//! | [`DataDirectoryKind::Debug`] | [`debug`] |
//! | [`DataDirectoryKind::ImportAddressTable`] | nothing, already covered by [`imports`] |
//! | [`DataDirectoryKind::ResourceTable`] | skipped, resource decoding is not provided |
//! | anything else | [`crate::Unsupported::Directory`] |

pub mod debug;
pub mod imports;
pub mod relocations;

use log::{debug, warn};
use strum::EnumCount;

use crate::{
    config::ParseConfig,
    directories::{debug::DebugRecord, imports::ImportEntry, relocations::BaseRelocBlock},
    headers::{DataDirectory, DataDirectoryKind, Magic},
    image::AddressSpace,
    Error, Result, Unsupported,
};

/// Decoded contents of the supported directories.
#[derive(Debug, Default)]
pub(crate) struct DirectoryContents {
    pub(crate) imports: Vec<ImportEntry>,
    pub(crate) relocations: Vec<BaseRelocBlock>,
    pub(crate) debug: Vec<DebugRecord>,
    pub(crate) unsupported: Vec<Unsupported>,
}

/// Decode every populated entry of `directories`.
///
/// # Errors
/// Propagates the first decoder error. Under a policy with
/// [`ParseConfig::fail_on_unsupported_directory`] set, a populated slot without a decoder
/// is returned as [`crate::Error::Unsupported`].
pub(crate) fn decode(
    space: &AddressSpace,
    magic: Magic,
    directories: &[DataDirectory],
    config: &ParseConfig,
) -> Result<DirectoryContents> {
    let mut contents = DirectoryContents::default();

    for (index, directory) in directories.iter().enumerate() {
        if directory.is_empty() {
            continue;
        }

        let Some(kind) = DataDirectoryKind::from_index(index) else {
            return Err(malformed_error!(
                "Data directory index {} exceeds the {} defined slots",
                index,
                DataDirectoryKind::COUNT
            ));
        };

        match kind {
            DataDirectoryKind::ImportTable => {
                contents.imports = imports::parse(space, directory, magic)?;
                debug!("imports: {} modules", contents.imports.len());
            }
            DataDirectoryKind::BaseRelocationTable => {
                contents.relocations = relocations::parse(space, directory)?;
                debug!("relocations: {} blocks", contents.relocations.len());
            }
            DataDirectoryKind::Debug => {
                contents.debug = debug::parse(space, directory, config, &mut contents.unsupported)?;
                debug!("debug: {} records", contents.debug.len());
            }
            DataDirectoryKind::ImportAddressTable => {}
            DataDirectoryKind::ResourceTable => {
                debug!(
                    "resource table at RVA 0x{:08X} skipped",
                    directory.virtual_address
                );
            }
            _ => {
                let unsupported = Unsupported::Directory {
                    kind,
                    rva: directory.virtual_address,
                    size: directory.size,
                };
                if config.fail_on_unsupported_directory {
                    return Err(Error::Unsupported(unsupported));
                }

                warn!("{} has no decoder, skipped", unsupported);
                contents.unsupported.push(unsupported);
            }
        }
    }

    Ok(contents)
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::headers::{SectionFlags, SectionHeader};

    fn empty_space<'a>(data: &'a [u8], sections: &'a [SectionHeader]) -> AddressSpace<'a> {
        AddressSpace::new(data, sections, true)
    }

    fn table_with(index: usize) -> Vec<DataDirectory> {
        let mut table = vec![DataDirectory::default(); DataDirectoryKind::COUNT];
        table[index] = DataDirectory {
            virtual_address: 0x3000,
            size: 0x40,
        };
        table
    }

    #[test]
    fn empty_table_produces_nothing() {
        let table = vec![DataDirectory::default(); 16];
        let contents = decode(
            &empty_space(&[], &[]),
            Magic::Pe32,
            &table,
            &ParseConfig::strict(),
        )
        .unwrap();

        assert!(contents.imports.is_empty());
        assert!(contents.relocations.is_empty());
        assert!(contents.debug.is_empty());
        assert!(contents.unsupported.is_empty());
    }

    #[test]
    fn undecoded_slots_are_unsupported() {
        let decoded = [
            DataDirectoryKind::ImportTable,
            DataDirectoryKind::ResourceTable,
            DataDirectoryKind::BaseRelocationTable,
            DataDirectoryKind::Debug,
            DataDirectoryKind::ImportAddressTable,
        ];

        for kind in DataDirectoryKind::iter().filter(|k| !decoded.contains(k)) {
            let table = table_with(kind as usize);

            match decode(
                &empty_space(&[], &[]),
                Magic::Pe32,
                &table,
                &ParseConfig::strict(),
            ) {
                Err(Error::Unsupported(Unsupported::Directory {
                    kind: reported,
                    rva,
                    size,
                })) => {
                    assert_eq!(reported, kind);
                    assert_eq!(rva, 0x3000);
                    assert_eq!(size, 0x40);
                }
                other => panic!("{}: unexpected result {:?}", kind, other),
            }

            let contents = decode(
                &empty_space(&[], &[]),
                Magic::Pe32,
                &table,
                &ParseConfig::lenient(),
            )
            .unwrap();
            assert_eq!(contents.unsupported.len(), 1);
        }
    }

    #[test]
    fn resource_and_iat_are_skipped() {
        for kind in [
            DataDirectoryKind::ResourceTable,
            DataDirectoryKind::ImportAddressTable,
        ] {
            let table = table_with(kind as usize);
            let contents = decode(
                &empty_space(&[], &[]),
                Magic::Pe32Plus,
                &table,
                &ParseConfig::strict(),
            )
            .unwrap();
            assert!(contents.unsupported.is_empty());
        }
    }

    #[test]
    fn populated_import_slot_needs_mapping() {
        let data = vec![0u8; 0x200];
        let sections = vec![SectionHeader {
            name: ".text".to_string(),
            raw_name: *b".text\0\0\0",
            virtual_size: 0x100,
            virtual_address: 0x1000,
            size_of_raw_data: 0x100,
            pointer_to_raw_data: 0x100,
            pointer_to_relocations: 0,
            pointer_to_linenumbers: 0,
            number_of_relocations: 0,
            number_of_linenumbers: 0,
            characteristics: SectionFlags::CNT_CODE,
        }];
        let table = table_with(DataDirectoryKind::ImportTable as usize);

        assert!(matches!(
            decode(
                &empty_space(&data, &sections),
                Magic::Pe32,
                &table,
                &ParseConfig::default()
            ),
            Err(Error::AddressResolution {
                rva: 0x3000,
                matches: 0,
                ..
            })
        ));
    }
}
