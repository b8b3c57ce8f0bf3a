//! Error taxonomy for the artifact codec. One enum, the way every crate in
//! this workspace keeps its own `thiserror` type rather than sharing one.

use sola_verify::VerifyError;
use thiserror::Error;

/// Everything that can go wrong decoding a `.solac` byte stream. Encoding
/// never fails: a `CompiledFile` built through this crate's types is always
/// representable.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("truncated artifact: need at least {needed} bytes at offset {at}, found {found}")]
    Truncated { at: usize, needed: usize, found: usize },

    #[error("bad magic number: expected {expected:#010x}, found {found:#010x}")]
    BadMagic { expected: u32, found: u32 },

    #[error("unsupported artifact version: file is {file_major}.{file_minor}, this reader supports up to {reader_major}.{reader_minor}")]
    UnsupportedVersion {
        file_major: u8,
        file_minor: u8,
        reader_major: u8,
        reader_minor: u8,
    },

    #[error("{section} section offset {offset} is beyond the artifact's {len} bytes")]
    SectionOutOfBounds {
        section: &'static str,
        offset: u32,
        len: usize,
    },

    #[error("length prefix at offset {at} requires {needed} more bytes but only {remaining} remain")]
    LengthOverrun {
        at: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("offset {at}: unknown value-type tag {tag}")]
    UnknownValueTag { at: usize, tag: u8 },

    #[error("offset {at}: string-pool index {index} is out of bounds ({len} entries)")]
    InvalidStringRef { at: usize, index: u32, len: usize },

    #[error("string-pool entry {index} is not valid UTF-8")]
    InvalidUtf8 { index: u32 },

    #[error("trailing checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { expected: u32, computed: u32 },

    #[error("bytecode verification failed for {context}: {source}")]
    Verification {
        context: String,
        #[source]
        source: VerifyError,
    },
}
