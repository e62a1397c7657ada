//! Integration tests for loading complete images through every entry point.

#[path = "../src/test/builder.rs"]
mod builder;

use builder::sample::*;
use pescope::{prelude::*, Result};
use std::{io::Cursor, path::PathBuf};

fn temp_file(name: &str, data: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("pescope-{}-{}", std::process::id(), name));
    std::fs::write(&path, data).unwrap();
    path
}

fn check_sample(image: &Image, wide: bool) -> Result<()> {
    assert_eq!(image.is_64bit(), wide);
    assert_eq!(image.sections().len(), 3);
    assert!(image.unsupported().is_empty());
    image.ensure_supported()?;

    // Imports
    let imports = image.imports();
    assert_eq!(imports.len(), 2);

    let kernel32 = &imports[0];
    assert_eq!(kernel32.descriptor.name, "KERNEL32.dll");
    let names: Vec<String> = kernel32
        .symbols()
        .iter()
        .map(|thunk| image.hint_name(thunk).map(|hn| hn.unwrap().name))
        .collect::<Result<_>>()?;
    assert_eq!(names, vec!["ExitProcess", "GetLastError"]);
    assert_eq!(
        image.hint_name(&kernel32.address_table[0])?.unwrap().hint,
        0x0120
    );

    let user32 = &imports[1];
    assert_eq!(user32.descriptor.name, "USER32.dll");
    assert!(user32.name_table.is_none());
    assert_eq!(user32.address_table.len(), 1);
    assert_eq!(user32.address_table[0].target, ThunkTarget::Ordinal(30));
    assert_eq!(image.hint_name(&user32.address_table[0])?, None);

    // Relocations
    let relocations = image.relocations();
    assert_eq!(relocations.len(), 2);
    assert_eq!(relocations[0].page_rva, TEXT_RVA);
    assert_eq!(relocations[0].entries.len(), 2);
    let pointer_kind = if wide {
        BaseRelocationType::Dir64
    } else {
        BaseRelocationType::HighLow
    };
    assert_eq!(
        relocations[0].entries[0].relocation_type(),
        Some(pointer_kind)
    );
    assert_eq!(relocations[0].targets().count(), 1);
    assert_eq!(relocations[1].entries.len(), 1);
    assert_eq!(relocations[1].entries[0].rva(relocations[1].page_rva), 0x2180);

    // Debug
    let debug = image.debug();
    assert_eq!(debug.len(), 3);
    match &debug[0] {
        DebugRecord::CodeView {
            info: CodeViewInfo::Pdb70 { guid, age, path, .. },
            ..
        } => {
            assert_eq!(guid.to_bytes(), PDB_GUID);
            assert_eq!(*age, PDB_AGE);
            assert_eq!(path, PDB_PATH);
        }
        other => panic!("unexpected record: {:?}", other),
    }
    match &debug[1] {
        DebugRecord::Fpo { entries, .. } => {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].start_offset, TEXT_RVA);
            assert_eq!(entries[0].frame, FrameType::NonFpo);
        }
        other => panic!("unexpected record: {:?}", other),
    }
    match &debug[2] {
        DebugRecord::Misc { directory, data } => {
            assert_eq!(directory.address_of_raw_data, 0);
            assert_eq!(data.as_slice(), MISC_DATA);
        }
        other => panic!("unexpected record: {:?}", other),
    }

    Ok(())
}

#[test]
fn from_mem_pe32() -> Result<()> {
    let image = Image::from_mem(builder::sample(false).build())?;
    assert_eq!(image.optional_header().magic, Magic::Pe32);
    assert_eq!(image.file_header().machine_type(), Some(Machine::I386));
    assert!(image.optional_header().base_of_data.is_some());
    check_sample(&image, false)
}

#[test]
fn from_mem_pe32_plus() -> Result<()> {
    let image = Image::from_mem(builder::sample(true).build())?;
    assert_eq!(image.optional_header().magic, Magic::Pe32Plus);
    assert_eq!(image.file_header().machine_type(), Some(Machine::Amd64));
    assert!(image.optional_header().base_of_data.is_none());
    check_sample(&image, true)
}

#[test]
fn from_reader() -> Result<()> {
    let data = builder::sample(true).build();
    let image = Image::from_reader(Cursor::new(data))?;
    check_sample(&image, true)
}

#[test]
fn from_file() -> Result<()> {
    let data = builder::sample(false).build();
    let path = temp_file("from_file.exe", &data);

    let image = Image::from_file(&path);
    std::fs::remove_file(&path).unwrap();

    let image = image?;
    assert_eq!(image.data(), data.as_slice());
    check_sample(&image, false)
}

#[test]
fn missing_file() {
    let path = std::env::temp_dir().join("pescope-does-not-exist.exe");
    assert!(matches!(
        Image::from_file(&path),
        Err(Error::FileError(_))
    ));
}

#[test]
fn empty_inputs() {
    assert!(matches!(Image::from_mem(Vec::new()), Err(Error::Empty)));
    assert!(matches!(
        Image::from_reader(Cursor::new(Vec::new())),
        Err(Error::Empty)
    ));
}

#[test]
fn strict_accepts_fully_decoded_image() -> Result<()> {
    let image =
        Image::from_mem_with_config(builder::sample(false).build(), ParseConfig::strict())?;
    assert_eq!(image.config(), &ParseConfig::strict());
    check_sample(&image, false)
}

#[test]
fn unsupported_directory_is_recorded_or_fatal() -> Result<()> {
    // TLS directory pointing into .rdata
    let data = builder::sample(true).directory(9, 0x2480, 0x28).build();

    let image = Image::from_mem(data.clone())?;
    assert_eq!(
        image.unsupported(),
        &[Unsupported::Directory {
            kind: DataDirectoryKind::TlsTable,
            rva: 0x2480,
            size: 0x28,
        }]
    );
    assert!(matches!(
        image.ensure_supported(),
        Err(Error::Unsupported(Unsupported::Directory {
            kind: DataDirectoryKind::TlsTable,
            ..
        }))
    ));
    // Everything decodable is still there
    check_decoded_counts(&image);

    assert!(matches!(
        Image::from_mem_with_config(data, ParseConfig::strict()),
        Err(Error::Unsupported(Unsupported::Directory {
            kind: DataDirectoryKind::TlsTable,
            ..
        }))
    ));
    Ok(())
}

fn check_decoded_counts(image: &Image) {
    assert_eq!(image.imports().len(), 2);
    assert_eq!(image.relocations().len(), 2);
    assert_eq!(image.debug().len(), 3);
}

#[test]
fn address_helpers() -> Result<()> {
    let image = Image::from_mem(builder::sample(false).build())?;

    let rdata = image.section_for_rva(u64::from(RDATA_RVA) + 0x80)?;
    assert_eq!(rdata.name, ".rdata");
    assert_eq!(image.read_cstr_at_rva(0x2080)?, "KERNEL32.dll");

    let offset = image.rva_to_offset(0x2090)?;
    assert_eq!(image.read_at(offset, 6)?, b"USER32");
    assert_eq!(image.offset_to_rva(offset)?, 0x2090);

    let text = &image.sections()[0];
    assert!(image.section_data(text)?.iter().all(|&b| b == 0xCC));
    assert_eq!(
        image.data_directory(DataDirectoryKind::Debug),
        Some(&DataDirectory {
            virtual_address: DEBUG_RVA,
            size: DEBUG_SIZE,
        })
    );
    assert!(image.data_directory(DataDirectoryKind::ExportTable).is_none());

    assert!(matches!(
        image.resolve(0x9000, 4),
        Err(Error::AddressResolution { rva: 0x9000, matches: 0, .. })
    ));
    Ok(())
}

#[test]
fn shared_across_threads() -> Result<()> {
    let image = std::sync::Arc::new(Image::from_mem(builder::sample(true).build())?);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let image = image.clone();
            std::thread::spawn(move || image.imports()[0].descriptor.name.clone())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), "KERNEL32.dll");
    }
    Ok(())
}
