//! The 24-byte `.solac` header: magic, version, flags, and four section
//! offsets (string pool, main function, classes, enums), in that order.

use crate::codec::bytes::{ByteReader, ByteWriter};
use crate::error::FormatError;

pub const MAGIC: u32 = 0x534F_4C41; // "SOLA"
pub const FORMAT_MAJOR: u8 = 1;
pub const FORMAT_MINOR: u8 = 0;
pub const HEADER_LEN: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub major: u8,
    pub minor: u8,
    pub flags: u16,
    pub string_pool_offset: u32,
    pub main_offset: u32,
    pub classes_offset: u32,
    pub enums_offset: u32,
}

impl Header {
    /// Write a placeholder header (correct magic/version, zeroed offsets)
    /// and return the position each offset field needs patching at.
    pub fn write_placeholder(w: &mut ByteWriter) -> HeaderPatchSlots {
        w.write_u32(MAGIC);
        w.write_u8(FORMAT_MAJOR);
        w.write_u8(FORMAT_MINOR);
        w.write_u16(0); // flags, reserved for future use
        let string_pool = w.position();
        w.write_u32(0);
        let main = w.position();
        w.write_u32(0);
        let classes = w.position();
        w.write_u32(0);
        let enums = w.position();
        w.write_u32(0);
        debug_assert_eq!(w.position(), HEADER_LEN);
        HeaderPatchSlots { string_pool, main, classes, enums }
    }

    pub fn read(r: &mut ByteReader<'_>) -> Result<Header, FormatError> {
        if r.remaining() < HEADER_LEN {
            return Err(FormatError::Truncated {
                at: r.position(),
                needed: HEADER_LEN - r.remaining(),
                found: r.remaining(),
            });
        }
        let magic = r.read_u32()?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic { expected: MAGIC, found: magic });
        }
        let major = r.read_u8()?;
        let minor = r.read_u8()?;
        if major != FORMAT_MAJOR {
            return Err(FormatError::UnsupportedVersion {
                file_major: major,
                file_minor: minor,
                reader_major: FORMAT_MAJOR,
                reader_minor: FORMAT_MINOR,
            });
        }
        let flags = r.read_u16()?;
        let string_pool_offset = r.read_u32()?;
        let main_offset = r.read_u32()?;
        let classes_offset = r.read_u32()?;
        let enums_offset = r.read_u32()?;
        Ok(Header {
            major,
            minor,
            flags,
            string_pool_offset,
            main_offset,
            classes_offset,
            enums_offset,
        })
    }

    pub fn check_offset(self_len: usize, section: &'static str, offset: u32) -> Result<(), FormatError> {
        if offset as usize > self_len {
            return Err(FormatError::SectionOutOfBounds { section, offset, len: self_len });
        }
        Ok(())
    }
}

pub struct HeaderPatchSlots {
    pub string_pool: usize,
    pub main: usize,
    pub classes: usize,
    pub enums: usize,
}

impl HeaderPatchSlots {
    pub fn patch(&self, w: &mut ByteWriter, string_pool: u32, main: u32, classes: u32, enums: u32) {
        w.patch_u32(self.string_pool, string_pool);
        w.patch_u32(self.main, main);
        w.patch_u32(self.classes, classes);
        w.patch_u32(self.enums, enums);
    }
}
