//! Frame pointer omission records (x86 only).

use strum::{Display, FromRepr};

use crate::{file::parser::Parser, Result};

/// Frame type stored in the top two bits of an FPO record's bitfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u8)]
pub enum FrameType {
    /// Frame pointer omitted
    Fpo = 0,
    /// Kernel trap frame
    Trap = 1,
    /// Task state segment frame
    Tss = 2,
    /// Standard EBP-based frame
    NonFpo = 3,
}

impl FrameType {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => FrameType::Fpo,
            1 => FrameType::Trap,
            2 => FrameType::Tss,
            _ => FrameType::NonFpo,
        }
    }
}

/// Stack frame layout of one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FpoData {
    /// Offset of the first byte of the function code
    pub start_offset: u32,
    /// Function size in bytes
    pub function_size: u32,
    /// Size of the local variables in bytes
    pub locals_size: u64,
    /// Size of the parameters in bytes
    pub params_size: u32,
    /// Size of the prolog code in bytes
    pub prolog_size: u8,
    /// Number of saved registers, bits 0-2
    pub saved_registers: u8,
    /// The function uses structured exception handling, bit 3
    pub has_seh: bool,
    /// EBP has been allocated, bit 4
    pub uses_bp: bool,
    /// Bit 5
    pub reserved: u8,
    /// Bits 6-7
    pub frame: FrameType,
}

impl FpoData {
    /// Size of one record on disk.
    pub const SIZE: usize = 16;

    /// Decode one record. Locals and parameters are stored divided by four.
    ///
    /// # Errors
    /// Returns [`crate::Error::Truncated`] if fewer than 16 bytes remain.
    pub fn read(parser: &mut Parser) -> Result<FpoData> {
        let start_offset = parser.read_le::<u32>()?;
        let function_size = parser.read_le::<u32>()?;
        let locals = parser.read_le::<u32>()?;
        let params = parser.read_le::<u16>()?;
        let prolog_size = parser.read_le::<u8>()?;
        let bits = parser.read_le::<u8>()?;

        Ok(FpoData {
            start_offset,
            function_size,
            locals_size: u64::from(locals) * 4,
            params_size: u32::from(params) * 4,
            prolog_size,
            saved_registers: bits & 0b0000_0111,
            has_seh: bits & 0b0000_1000 != 0,
            uses_bp: bits & 0b0001_0000 != 0,
            reserved: (bits & 0b0010_0000) >> 5,
            frame: FrameType::from_bits(bits >> 6),
        })
    }
}

/// Decode records until `data` is exhausted; `data` starts at file offset `base`.
///
/// # Errors
/// Returns [`crate::Error::Truncated`] if a record is cut short.
pub fn parse_entries(data: &[u8], base: u64) -> Result<Vec<FpoData>> {
    let mut parser = Parser::at(data, base, "FPO record");
    let mut entries = Vec::with_capacity(data.len() / FpoData::SIZE);
    while parser.has_more_data() {
        entries.push(FpoData::read(&mut parser)?);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data = [
            0x00, 0x10, 0x00, 0x00, // start_offset
            0x40, 0x00, 0x00, 0x00, // function_size
            0x03, 0x00, 0x00, 0x00, // locals / 4
            0x02, 0x00,             // params / 4
            0x05,                   // prolog
            0b1101_0011,            // bitfield
        ];

        let entries = parse_entries(&data, 0).unwrap();
        assert_eq!(entries.len(), 1);

        let fpo = entries[0];
        assert_eq!(fpo.start_offset, 0x1000);
        assert_eq!(fpo.function_size, 0x40);
        assert_eq!(fpo.locals_size, 12);
        assert_eq!(fpo.params_size, 8);
        assert_eq!(fpo.prolog_size, 5);
        assert_eq!(fpo.saved_registers, 3);
        assert!(!fpo.has_seh);
        assert!(fpo.uses_bp);
        assert_eq!(fpo.reserved, 0);
        assert_eq!(fpo.frame, FrameType::NonFpo);
    }

    #[test]
    fn every_bit_position() {
        let mut record = [0u8; 16];
        record[15] = 0b0110_1101;

        let fpo = FpoData::read(&mut Parser::new(&record)).unwrap();
        assert_eq!(fpo.saved_registers, 5);
        assert!(fpo.has_seh);
        assert!(!fpo.uses_bp);
        assert_eq!(fpo.reserved, 1);
        assert_eq!(fpo.frame, FrameType::Trap);
    }

    #[test]
    fn partial_record() {
        let data = [0u8; 24];
        assert!(matches!(
            parse_entries(&data, 0x800),
            Err(Error::Truncated {
                what: "FPO record",
                offset: 0x818,
                ..
            })
        ));
    }
}
