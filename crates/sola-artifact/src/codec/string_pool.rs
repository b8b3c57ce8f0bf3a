//! Deduplicated string pool. Write-side interning happens in a dry run that
//! visits classes, then enums, then the main function (spec §5), so pool
//! order — and therefore every byte downstream of it — is a pure function
//! of the declaration tree, not of hash-map iteration.

use crate::error::FormatError;
use rustc_hash::FxHashMap;
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct StringPoolBuilder {
    order: Vec<Rc<str>>,
    index: FxHashMap<Rc<str>, u32>,
}

impl StringPoolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &Rc<str>) -> u32 {
        if let Some(&i) = self.index.get(s) {
            return i;
        }
        let i = self.order.len() as u32;
        self.order.push(s.clone());
        self.index.insert(s.clone(), i);
        i
    }

    /// Index of a string already interned. Panics if it was not visited
    /// during the collection pass — a collection/encode desync bug.
    pub fn index_of(&self, s: &Rc<str>) -> u32 {
        *self
            .index
            .get(s)
            .expect("string referenced during encode was not visited during collection")
    }

    pub fn entries(&self) -> &[Rc<str>] {
        &self.order
    }
}

use crate::codec::bytes::{ByteReader, ByteWriter};

pub fn write_pool(w: &mut ByteWriter, pool: &StringPoolBuilder) {
    w.write_u32(pool.entries().len() as u32);
    for s in pool.entries() {
        w.write_string(s);
    }
}

/// Strings read off the wire, indexable by the `u32` pool index every other
/// section stores.
pub struct StringTable {
    entries: Vec<Rc<str>>,
}

impl StringTable {
    pub fn read(r: &mut ByteReader<'_>) -> Result<StringTable, FormatError> {
        let count = r.read_u32()? as usize;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(Rc::from(r.read_string()?.as_str()));
        }
        Ok(StringTable { entries })
    }

    pub fn get(&self, at: usize, index: u32) -> Result<Rc<str>, FormatError> {
        self.entries
            .get(index as usize)
            .cloned()
            .ok_or(FormatError::InvalidStringRef { at, index, len: self.entries.len() })
    }

    /// Resolve an "optional name" index, where the empty string at that
    /// index means "absent" (the convention this codec uses in place of a
    /// separate presence bit for every optional name field).
    pub fn get_opt(&self, at: usize, index: u32) -> Result<Option<Rc<str>>, FormatError> {
        let s = self.get(at, index)?;
        Ok(if s.is_empty() { None } else { Some(s) })
    }
}

/// Intern `opt`, or the empty string if absent — the write-side half of the
/// optional-name convention `StringTable::get_opt` decodes.
pub fn intern_opt(pool: &mut StringPoolBuilder, opt: &Option<Rc<str>>) -> u32 {
    match opt {
        Some(s) => pool.intern(s),
        None => {
            let empty: Rc<str> = Rc::from("");
            pool.intern(&empty)
        }
    }
}

/// Look up the index `intern_opt` assigned `opt` during collection, without
/// mutating the (by now frozen) pool.
pub fn index_of_opt(pool: &StringPoolBuilder, opt: &Option<Rc<str>>) -> u32 {
    match opt {
        Some(s) => pool.index_of(s),
        None => pool.index_of(&Rc::from("")),
    }
}
