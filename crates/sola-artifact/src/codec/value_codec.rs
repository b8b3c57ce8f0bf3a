//! Primitive-value encoding: `null`(0) / `bool`(1) / `int`(2) / `float`(3) /
//! `string`(4). Any other run-time `Value` variant is not persistable and
//! is written as `null` — containers, objects, and handles only ever exist
//! once a program is running, never inside a compiled artifact.

use crate::codec::bytes::{ByteReader, ByteWriter};
use crate::codec::string_pool::{StringPoolBuilder, StringTable};
use crate::error::FormatError;
use sola_bytecode::Value;

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_STRING: u8 = 4;

/// Visit every string a primitive-representable value carries, interning it
/// into `pool`. A no-op for non-primitive values (they serialize as null).
pub fn collect(pool: &mut StringPoolBuilder, v: &Value) {
    if let Value::String(s) = v {
        pool.intern(s);
    }
}

pub fn write(w: &mut ByteWriter, v: &Value, pool: &StringPoolBuilder) {
    match v {
        Value::Null => w.write_u8(TAG_NULL),
        Value::Bool(b) => {
            w.write_u8(TAG_BOOL);
            w.write_u8(*b as u8);
        }
        Value::Int(i) => {
            w.write_u8(TAG_INT);
            w.write_i64(*i);
        }
        Value::Float(f) => {
            w.write_u8(TAG_FLOAT);
            w.write_f64(*f);
        }
        Value::String(s) => {
            w.write_u8(TAG_STRING);
            w.write_u32(pool.index_of(s));
        }
        _ => w.write_u8(TAG_NULL),
    }
}

pub fn read(r: &mut ByteReader<'_>, pool: &StringTable) -> Result<Value, FormatError> {
    let at = r.position();
    let tag = r.read_u8()?;
    match tag {
        TAG_NULL => Ok(Value::Null),
        TAG_BOOL => Ok(Value::Bool(r.read_u8()? != 0)),
        TAG_INT => Ok(Value::Int(r.read_i64()?)),
        TAG_FLOAT => Ok(Value::Float(r.read_f64()?)),
        TAG_STRING => {
            let index = r.read_u32()?;
            Ok(Value::String(pool.get(at, index)?))
        }
        other => Err(FormatError::UnknownValueTag { at, tag: other }),
    }
}
