//! Translation between relative virtual addresses and file content.
//!
//! An [`AddressSpace`] pairs the raw file bytes with the decoded section table. It is only
//! constructed once the section table exists, so nothing earlier in the load can attempt
//! an RVA lookup.

use crate::{file::parser::parse_cstr, headers::SectionHeader, Error, Result};

/// Borrowed view over file content and the sections that map it.
///
/// Every RVA must fall inside exactly one section's `[virtual_address, virtual_address +
/// virtual_size)` range, and every returned byte range must fit both inside the file and
/// inside that section's on-disk extent. Nothing is clamped.
#[derive(Debug, Clone, Copy)]
pub struct AddressSpace<'a> {
    data: &'a [u8],
    sections: &'a [SectionHeader],
    check_overlap: bool,
}

impl<'a> AddressSpace<'a> {
    /// Create a translator over `data` using `sections`.
    ///
    /// With `check_overlap` set, every containing section is counted and ambiguous RVAs are
    /// rejected. Otherwise the first containing section in table order wins.
    #[must_use]
    pub fn new(data: &'a [u8], sections: &'a [SectionHeader], check_overlap: bool) -> Self {
        AddressSpace {
            data,
            sections,
            check_overlap,
        }
    }

    /// The complete file content.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The section table used for translation.
    #[must_use]
    pub fn sections(&self) -> &'a [SectionHeader] {
        self.sections
    }

    /// Find the single section whose virtual range contains `rva`.
    ///
    /// # Errors
    /// Returns [`crate::Error::AddressResolution`] if no section, or more than one, contains it.
    pub fn section_for_rva(&self, rva: u64, what: &'static str) -> Result<&'a SectionHeader> {
        let mut containing = self.sections.iter().filter(|s| s.contains_rva(rva));

        let Some(first) = containing.next() else {
            return Err(Error::AddressResolution {
                what,
                rva,
                matches: 0,
            });
        };

        if self.check_overlap {
            let others = containing.count();
            if others > 0 {
                return Err(Error::AddressResolution {
                    what,
                    rva,
                    matches: others + 1,
                });
            }
        }

        Ok(first)
    }

    /// Translate `rva` to a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::AddressResolution`] if `rva` does not map to exactly one section.
    pub fn rva_to_offset(&self, rva: u64, what: &'static str) -> Result<u64> {
        let section = self.section_for_rva(rva, what)?;
        Ok(u64::from(section.pointer_to_raw_data) + (rva - u64::from(section.virtual_address)))
    }

    /// Translate file offset `offset` back to an RVA using the sections' on-disk extents.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section's raw data contains `offset`.
    pub fn offset_to_rva(&self, offset: u64) -> Result<u64> {
        self.sections
            .iter()
            .find(|s| s.contains_offset(offset))
            .map(|s| u64::from(s.virtual_address) + (offset - u64::from(s.pointer_to_raw_data)))
            .ok_or_else(|| malformed_error!("File offset 0x{:X} is not inside any section", offset))
    }

    /// Return the `len` bytes mapped at `rva`.
    ///
    /// # Errors
    /// Returns [`crate::Error::AddressResolution`] if `rva` does not map to exactly one
    /// section, or [`crate::Error::Truncated`] if the range runs past the section's on-disk
    /// data or the end of the file.
    pub fn resolve(&self, rva: u64, len: u64, what: &'static str) -> Result<&'a [u8]> {
        let section = self.section_for_rva(rva, what)?;
        let delta = rva - u64::from(section.virtual_address);
        let offset = u64::from(section.pointer_to_raw_data) + delta;

        let in_section = delta.checked_add(len);
        if in_section.map_or(true, |end| end > u64::from(section.size_of_raw_data)) {
            return Err(truncated_error!(
                what,
                offset,
                len,
                section.size_of_raw_data
            ));
        }

        self.read_at(offset, len, what)
    }

    /// Return the `len` bytes at file offset `offset`, bypassing section mapping.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if the range runs past the end of the file.
    pub fn read_at(&self, offset: u64, len: u64, what: &'static str) -> Result<&'a [u8]> {
        let available = self.data.len() as u64;
        match offset.checked_add(len) {
            Some(end) if end <= available => {
                // Both bounds are within a slice length, so they fit in usize
                Ok(&self.data[offset as usize..end as usize])
            }
            _ => Err(truncated_error!(what, offset, len, available)),
        }
    }

    /// Decode the NUL-terminated string starting at `rva`.
    ///
    /// The string must end before the containing section's on-disk data does.
    ///
    /// # Errors
    /// Returns [`crate::Error::AddressResolution`] if `rva` is unmapped, or
    /// [`crate::Error::Truncated`] if no terminator is found inside the section.
    pub fn read_cstr(&self, rva: u64, what: &'static str) -> Result<String> {
        let section = self.section_for_rva(rva, what)?;
        let delta = rva - u64::from(section.virtual_address);
        let raw_size = u64::from(section.size_of_raw_data);
        let offset = u64::from(section.pointer_to_raw_data) + delta;

        if delta >= raw_size {
            return Err(truncated_error!(what, offset, 1, raw_size));
        }

        let end = (offset + (raw_size - delta)).min(self.data.len() as u64);
        if offset >= end {
            return Err(truncated_error!(what, offset, 1, self.data.len()));
        }

        let bytes = &self.data[offset as usize..end as usize];
        if !bytes.contains(&0) {
            return Err(truncated_error!(what, offset, bytes.len() + 1, bytes.len()));
        }

        Ok(parse_cstr(bytes))
    }
}
