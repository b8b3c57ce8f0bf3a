//! The `.solac` binary codec: a 24-byte header, a deduplicated string pool,
//! and three sections (main function, classes, enums) addressed by the
//! header's offsets. Every multi-byte field is big-endian.

mod bytes;
mod chunk_codec;
mod decl_codec;
mod header;
mod string_pool;
mod value_codec;

pub use header::{FORMAT_MAJOR, FORMAT_MINOR, HEADER_LEN, MAGIC};

use crate::decl::CompiledFile;
use crate::error::FormatError;
use bytes::{ByteReader, ByteWriter};
use header::Header;
use std::rc::Rc;

/// Serialize a `CompiledFile` to its on-disk byte representation.
///
/// Deterministic (P2): the string pool's order is a pure function of the
/// declaration tree (classes, then enums, then the main function, each
/// walked in first-encounter order), so encoding the same `CompiledFile`
/// twice produces byte-identical output.
pub fn serialize(file: &CompiledFile) -> Vec<u8> {
    let pool = decl_codec::collect_all(file);

    let mut w = ByteWriter::new();
    let slots = Header::write_placeholder(&mut w);

    let string_pool_offset = w.position() as u32;
    string_pool::write_pool(&mut w, &pool);

    let main_offset = w.position() as u32;
    decl_codec::write_main(&mut w, &pool, file);

    let classes_offset = w.position() as u32;
    decl_codec::write_classes(&mut w, &pool, &file.classes);

    let enums_offset = w.position() as u32;
    decl_codec::write_enums(&mut w, &pool, &file.enums);

    slots.patch(&mut w, string_pool_offset, main_offset, classes_offset, enums_offset);

    let mut out = w.into_bytes();
    let checksum = crc32fast::hash(&out);
    out.extend_from_slice(&checksum.to_be_bytes());
    out
}

/// Parse and verify a `.solac` byte stream back into a `CompiledFile`.
///
/// The header's magic and major version are checked first and are
/// normative: an incompatible file is rejected before the (non-normative)
/// trailing checksum is even inspected. Every function and method chunk is
/// run through [`sola_verify::verify_chunk`] before this returns, so a
/// caller never receives a `CompiledFile` wrapping malformed bytecode.
pub fn deserialize(data: &[u8]) -> Result<CompiledFile, FormatError> {
    let mut header_reader = ByteReader::new(data);
    let header = Header::read(&mut header_reader)?;

    Header::check_offset(data.len(), "string-pool", header.string_pool_offset)?;
    Header::check_offset(data.len(), "main-function", header.main_offset)?;
    Header::check_offset(data.len(), "classes", header.classes_offset)?;
    Header::check_offset(data.len(), "enums", header.enums_offset)?;

    if data.len() >= 4 {
        let body_len = data.len() - 4;
        let expected = u32::from_be_bytes(data[body_len..].try_into().unwrap());
        let computed = crc32fast::hash(&data[..body_len]);
        if expected != computed {
            return Err(FormatError::ChecksumMismatch { expected, computed });
        }
    }

    let mut r = ByteReader::new(data);
    r.seek(header.string_pool_offset as usize)?;
    let table = string_pool::StringTable::read(&mut r)?;

    r.seek(header.main_offset as usize)?;
    let main = decl_codec::read_main(&mut r, &table)?;

    r.seek(header.classes_offset as usize)?;
    let classes = decl_codec::read_classes(&mut r, &table)?;

    r.seek(header.enums_offset as usize)?;
    let enums = decl_codec::read_enums(&mut r, &table)?;

    verify_function(&main, None, None)?;
    for (_, class) in classes.iter() {
        for method in class.methods.iter() {
            verify_function(&method.function, Some(&class.name), Some(method.name()))?;
        }
    }

    Ok(CompiledFile { main, classes, enums, source_file: None })
}

fn verify_function(f: &crate::decl::Function, class: Option<&Rc<str>>, method: Option<&Rc<str>>) -> Result<(), FormatError> {
    sola_verify::verify_chunk(&f.chunk, f.local_count).map_err(|source| {
        let context = match (class, method) {
            (Some(c), Some(m)) => format!("{}.{}", c, m),
            (None, None) => f.name.to_string(),
            _ => f.name.to_string(),
        };
        FormatError::Verification { context, source }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{Class, CompiledFile, Function, Method, Visibility};
    use sola_bytecode::Opcode;

    fn main_function() -> Function {
        let mut f = Function::new("main", 0);
        f.chunk.write_op(Opcode::Zero, 1);
        f.chunk.write_op(Opcode::Return, 1);
        f
    }

    #[test]
    fn round_trips_a_minimal_file() {
        let file = CompiledFile::new(main_function());
        let bytes = serialize(&file);
        let decoded = deserialize(&bytes).unwrap();
        assert!(decoded.main.struct_eq(&file.main));
    }

    #[test]
    fn encoding_is_deterministic() {
        let file = CompiledFile::new(main_function());
        assert_eq!(serialize(&file), serialize(&file));
    }

    #[test]
    fn round_trips_a_class_with_an_overloaded_method() {
        let mut class = Class::new("Greeter");
        let mut m1 = Function::new("greet", 1);
        m1.chunk.write_op(Opcode::ReturnNull, 3);
        class.methods.add(Method {
            function: m1,
            is_static: false,
            visibility: Visibility::Public,
            annotations: vec![],
        });
        let mut m2 = Function::new("greet", 2);
        m2.chunk.write_op(Opcode::ReturnNull, 4);
        class.methods.add(Method {
            function: m2,
            is_static: false,
            visibility: Visibility::Public,
            annotations: vec![],
        });

        let mut file = CompiledFile::new(main_function());
        file.classes.insert(class.name.clone(), class);

        let bytes = serialize(&file);
        let decoded = deserialize(&bytes).unwrap();
        let greeter = decoded.classes.get("Greeter").unwrap();
        assert_eq!(greeter.methods.overloads("greet").len(), 2);
        assert_eq!(greeter.methods.get_by_arity("greet", 2).unwrap().arity(), 2);
        // No 3-arg overload exists: falls back to the first-declared (arity 1).
        assert_eq!(greeter.methods.get_by_arity("greet", 3).unwrap().arity(), 1);
    }

    #[test]
    fn bad_magic_is_rejected_before_checksum_is_even_checked() {
        let mut bytes = serialize(&CompiledFile::new(main_function()));
        bytes[0] = 0; // corrupt the magic, leave the trailing checksum untouched
        assert!(matches!(deserialize(&bytes), Err(FormatError::BadMagic { .. })));
    }

    #[test]
    fn truncated_file_is_rejected() {
        let bytes = serialize(&CompiledFile::new(main_function()));
        let truncated = &bytes[..bytes.len() - 10];
        assert!(deserialize(truncated).is_err());
    }

    #[test]
    fn corrupted_body_trips_the_checksum() {
        let mut bytes = serialize(&CompiledFile::new(main_function()));
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xff;
        assert!(matches!(deserialize(&bytes), Err(FormatError::ChecksumMismatch { .. })));
    }

    #[test]
    fn malformed_bytecode_is_rejected_by_the_verifier_on_load() {
        let mut f = Function::new("main", 0);
        // PUSH with a dangling constant index: passes the codec, fails verification.
        f.chunk.write_op(Opcode::Push, 1);
        f.chunk.write_u16(99, 1);
        f.chunk.write_op(Opcode::Return, 1);
        let file = CompiledFile::new(f);
        let bytes = serialize(&file);
        assert!(matches!(deserialize(&bytes), Err(FormatError::Verification { .. })));
    }
}
