//! Encoding for the bytecode payload every function and method carries: raw
//! code bytes, the parallel per-byte line table, and the constant pool.

use crate::codec::bytes::{ByteReader, ByteWriter};
use crate::codec::string_pool::StringPoolBuilder;
use crate::codec::value_codec;
use crate::codec::string_pool::StringTable;
use crate::error::FormatError;
use sola_bytecode::{Chunk, Value};

pub fn collect_strings(pool: &mut StringPoolBuilder, chunk: &Chunk) {
    for v in &chunk.constants {
        value_codec::collect(pool, v);
    }
}

pub fn write(w: &mut ByteWriter, chunk: &Chunk, pool: &StringPoolBuilder) {
    w.write_u32(chunk.code.len() as u32);
    w.write_bytes(&chunk.code);

    w.write_u32(chunk.lines.len() as u32);
    for line in &chunk.lines {
        w.write_u32(*line);
    }

    w.write_u32(chunk.constants.len() as u32);
    for v in &chunk.constants {
        value_codec::write(w, v, pool);
    }
}

pub fn read(r: &mut ByteReader<'_>, pool: &StringTable) -> Result<Chunk, FormatError> {
    let code_len = r.read_u32()? as usize;
    let code = r.read_bytes(code_len)?.to_vec();

    let line_count = r.read_u32()? as usize;
    let mut lines = Vec::with_capacity(line_count);
    for _ in 0..line_count {
        lines.push(r.read_u32()?);
    }

    let constant_count = r.read_u32()? as usize;
    let mut constants = Vec::with_capacity(constant_count);
    for _ in 0..constant_count {
        constants.push(value_codec::read(r, pool)?);
    }

    let mut chunk = Chunk::new();
    chunk.code = code;
    chunk.lines = lines;
    chunk.constants = constants;
    Ok(chunk)
}

pub fn values_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
}
