//! Encoding for functions, methods, classes, enums, and the top-level
//! `CompiledFile` they live in.
//!
//! Every multi-entry list uses a `u32` count when it is a top-level,
//! potentially-large collection (classes, enums, methods, constants,
//! statics) and a `u16` count for the small per-declaration lists nested
//! inside one record (interfaces, type parameters, annotations,
//! properties, enum cases) — the convention this codec settles on where
//! the format description left a width unstated.

use crate::codec::bytes::{ByteReader, ByteWriter};
use crate::codec::chunk_codec;
use crate::codec::string_pool::{index_of_opt, intern_opt, StringPoolBuilder, StringTable};
use crate::codec::value_codec;
use crate::decl::{
    Annotation, Class, CompiledFile, DeclMap, EnumDecl, Function, Method, OverloadTable,
    Property, TypeParam, Visibility,
};
use crate::error::FormatError;
use sola_bytecode::Chunk;
use std::rc::Rc;

const VARIADIC_BIT: u8 = 1 << 0;
const BUILTIN_BIT: u8 = 1 << 1;

const STATIC_BIT: u8 = 1 << 0;
const VISIBILITY_MASK: u8 = 0b0000_0110;
const VISIBILITY_SHIFT: u8 = 1;

const ABSTRACT_BIT: u8 = 1 << 0;
const INTERFACE_BIT: u8 = 1 << 1;
const FINAL_BIT: u8 = 1 << 2;
const ATTRIBUTE_BIT: u8 = 1 << 3;

fn visibility_bits(v: Visibility) -> u8 {
    match v {
        Visibility::Public => 0,
        Visibility::Protected => 1,
        Visibility::Private => 2,
    }
}

fn visibility_from_bits(bits: u8) -> Visibility {
    match bits {
        1 => Visibility::Protected,
        2 => Visibility::Private,
        _ => Visibility::Public,
    }
}

// ---------------------------------------------------------------- Annotation

fn collect_annotation(pool: &mut StringPoolBuilder, ann: &Annotation) {
    pool.intern(&ann.name);
    for (k, v) in &ann.args {
        pool.intern(k);
        value_codec::collect(pool, v);
    }
}

fn write_annotation(w: &mut ByteWriter, pool: &StringPoolBuilder, ann: &Annotation) {
    w.write_u32(pool.index_of(&ann.name));
    w.write_u16(ann.args.len() as u16);
    for (k, v) in &ann.args {
        w.write_u32(pool.index_of(k));
        value_codec::write(w, v, pool);
    }
}

fn read_annotation(r: &mut ByteReader<'_>, pool: &StringTable) -> Result<Annotation, FormatError> {
    let at = r.position();
    let name = pool.get(at, r.read_u32()?)?;
    let count = r.read_u16()? as usize;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let at = r.position();
        let key = pool.get(at, r.read_u32()?)?;
        let value = value_codec::read(r, pool)?;
        args.push((key, value));
    }
    Ok(Annotation { name, args })
}

fn write_annotations(w: &mut ByteWriter, pool: &StringPoolBuilder, anns: &[Annotation]) {
    w.write_u16(anns.len() as u16);
    for a in anns {
        write_annotation(w, pool, a);
    }
}

fn read_annotations(r: &mut ByteReader<'_>, pool: &StringTable) -> Result<Vec<Annotation>, FormatError> {
    let count = r.read_u16()? as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(read_annotation(r, pool)?);
    }
    Ok(out)
}

// ---------------------------------------------------------------- TypeParam

fn collect_type_param(pool: &mut StringPoolBuilder, tp: &TypeParam) {
    pool.intern(&tp.name);
    if let Some(c) = &tp.constraint {
        pool.intern(c);
    } else {
        intern_opt(pool, &None);
    }
    for i in &tp.implements {
        pool.intern(i);
    }
}

fn write_type_param(w: &mut ByteWriter, pool: &StringPoolBuilder, tp: &TypeParam) {
    w.write_u32(pool.index_of(&tp.name));
    let constraint_idx = match &tp.constraint {
        Some(c) => pool.index_of(c),
        None => pool.index_of(&Rc::from("")),
    };
    w.write_u32(constraint_idx);
    w.write_u16(tp.implements.len() as u16);
    for i in &tp.implements {
        w.write_u32(pool.index_of(i));
    }
}

fn read_type_param(r: &mut ByteReader<'_>, pool: &StringTable) -> Result<TypeParam, FormatError> {
    let at = r.position();
    let name = pool.get(at, r.read_u32()?)?;
    let at = r.position();
    let constraint = pool.get_opt(at, r.read_u32()?)?;
    let count = r.read_u16()? as usize;
    let mut implements = Vec::with_capacity(count);
    for _ in 0..count {
        let at = r.position();
        implements.push(pool.get(at, r.read_u32()?)?);
    }
    Ok(TypeParam { name, constraint, implements })
}

// ---------------------------------------------------------------- Property

fn collect_property(pool: &mut StringPoolBuilder, p: &Property) {
    pool.intern(&p.name);
    value_codec::collect(pool, &p.default);
    for a in &p.annotations {
        collect_annotation(pool, a);
    }
}

fn write_property(w: &mut ByteWriter, pool: &StringPoolBuilder, p: &Property) {
    w.write_u32(pool.index_of(&p.name));
    value_codec::write(w, &p.default, pool);
    w.write_u8(visibility_bits(p.visibility));
    write_annotations(w, pool, &p.annotations);
}

fn read_property(r: &mut ByteReader<'_>, pool: &StringTable) -> Result<Property, FormatError> {
    let at = r.position();
    let name = pool.get(at, r.read_u32()?)?;
    let default = value_codec::read(r, pool)?;
    let visibility = visibility_from_bits(r.read_u8()?);
    let annotations = read_annotations(r, pool)?;
    Ok(Property { name, default, visibility, annotations })
}

// ---------------------------------------------------------------- Function

fn collect_function(pool: &mut StringPoolBuilder, f: &Function) {
    pool.intern(&f.name);
    chunk_codec::collect_strings(pool, &f.chunk);
    for v in &f.default_values {
        value_codec::collect(pool, v);
    }
    match &f.class_name {
        Some(s) => pool.intern(s),
        None => intern_opt(pool, &None),
    };
    match &f.source_file {
        Some(s) => pool.intern(s),
        None => intern_opt(pool, &None),
    };
}

fn write_function(w: &mut ByteWriter, pool: &StringPoolBuilder, f: &Function) {
    w.write_u32(pool.index_of(&f.name));
    w.write_u16(f.arity);
    w.write_u16(f.min_arity);
    w.write_u16(f.local_count);
    w.write_u16(f.upvalue_count);
    let mut flags = 0u8;
    if f.is_variadic {
        flags |= VARIADIC_BIT;
    }
    if f.is_builtin {
        flags |= BUILTIN_BIT;
    }
    w.write_u8(flags);
    chunk_codec::write(w, &f.chunk, pool);
    w.write_u16(f.default_values.len() as u16);
    for v in &f.default_values {
        value_codec::write(w, v, pool);
    }
    let class_idx = match &f.class_name {
        Some(s) => pool.index_of(s),
        None => pool.index_of(&Rc::from("")),
    };
    w.write_u32(class_idx);
    let source_idx = match &f.source_file {
        Some(s) => pool.index_of(s),
        None => pool.index_of(&Rc::from("")),
    };
    w.write_u32(source_idx);
}

fn read_function(r: &mut ByteReader<'_>, pool: &StringTable) -> Result<Function, FormatError> {
    let at = r.position();
    let name = pool.get(at, r.read_u32()?)?;
    let arity = r.read_u16()?;
    let min_arity = r.read_u16()?;
    let local_count = r.read_u16()?;
    let upvalue_count = r.read_u16()?;
    let flags = r.read_u8()?;
    let is_variadic = flags & VARIADIC_BIT != 0;
    let is_builtin = flags & BUILTIN_BIT != 0;
    let chunk: Chunk = chunk_codec::read(r, pool)?;
    let default_count = r.read_u16()? as usize;
    let mut default_values = Vec::with_capacity(default_count);
    for _ in 0..default_count {
        default_values.push(value_codec::read(r, pool)?);
    }
    let at = r.position();
    let class_name = pool.get_opt(at, r.read_u32()?)?;
    let at = r.position();
    let source_file = pool.get_opt(at, r.read_u32()?)?;

    Ok(Function {
        name,
        arity,
        min_arity,
        local_count,
        upvalue_count,
        is_variadic,
        is_builtin,
        native_body: None,
        chunk,
        default_values,
        class_name,
        source_file,
    })
}

// ---------------------------------------------------------------- Method

fn collect_method(pool: &mut StringPoolBuilder, m: &Method) {
    collect_function(pool, &m.function);
    for a in &m.annotations {
        collect_annotation(pool, a);
    }
}

/// Method records do not carry `upvalue_count` or the variadic/builtin
/// flag byte `write_function` emits for free functions: spec §4.3's method
/// layout ("name, arity/min_arity/local_count (u16 each), flag byte
/// (static, visibility), annotations, code/lines/constants and defaults …
/// class-name-index and source-file-index") has no field for either, since
/// a method is never itself a closure and the codec's own builtin registry
/// only ever attaches to free functions. `read_method` reconstructs the
/// in-memory `Function` with both zeroed/cleared, matching
/// `Function::new`'s own defaults.
fn write_method(w: &mut ByteWriter, pool: &StringPoolBuilder, m: &Method) {
    let f = &m.function;
    w.write_u32(pool.index_of(&f.name));
    w.write_u16(f.arity);
    w.write_u16(f.min_arity);
    w.write_u16(f.local_count);

    let mut flags = if m.is_static { STATIC_BIT } else { 0 };
    flags |= (visibility_bits(m.visibility) << VISIBILITY_SHIFT) & VISIBILITY_MASK;
    w.write_u8(flags);

    write_annotations(w, pool, &m.annotations);

    chunk_codec::write(w, &f.chunk, pool);

    w.write_u16(f.default_values.len() as u16);
    for v in &f.default_values {
        value_codec::write(w, v, pool);
    }

    let class_idx = match &f.class_name {
        Some(s) => pool.index_of(s),
        None => pool.index_of(&Rc::from("")),
    };
    w.write_u32(class_idx);
    let source_idx = match &f.source_file {
        Some(s) => pool.index_of(s),
        None => pool.index_of(&Rc::from("")),
    };
    w.write_u32(source_idx);
}

fn read_method(r: &mut ByteReader<'_>, pool: &StringTable) -> Result<Method, FormatError> {
    let at = r.position();
    let name = pool.get(at, r.read_u32()?)?;
    let arity = r.read_u16()?;
    let min_arity = r.read_u16()?;
    let local_count = r.read_u16()?;

    let flags = r.read_u8()?;
    let is_static = flags & STATIC_BIT != 0;
    let visibility = visibility_from_bits((flags & VISIBILITY_MASK) >> VISIBILITY_SHIFT);

    let annotations = read_annotations(r, pool)?;

    let chunk: Chunk = chunk_codec::read(r, pool)?;

    let default_count = r.read_u16()? as usize;
    let mut default_values = Vec::with_capacity(default_count);
    for _ in 0..default_count {
        default_values.push(value_codec::read(r, pool)?);
    }

    let at = r.position();
    let class_name = pool.get_opt(at, r.read_u32()?)?;
    let at = r.position();
    let source_file = pool.get_opt(at, r.read_u32()?)?;

    let function = Function {
        name,
        arity,
        min_arity,
        local_count,
        upvalue_count: 0,
        is_variadic: false,
        is_builtin: false,
        native_body: None,
        chunk,
        default_values,
        class_name,
        source_file,
    };
    Ok(Method { function, is_static, visibility, annotations })
}

// ---------------------------------------------------------------- Class

fn collect_class(pool: &mut StringPoolBuilder, c: &Class) {
    pool.intern(&c.name);
    match &c.namespace {
        Some(s) => pool.intern(s),
        None => intern_opt(pool, &None),
    };
    match &c.parent_name {
        Some(s) => pool.intern(s),
        None => intern_opt(pool, &None),
    };
    for i in &c.interfaces {
        pool.intern(i);
    }
    for tp in &c.type_params {
        collect_type_param(pool, tp);
    }
    for a in &c.annotations {
        collect_annotation(pool, a);
    }
    for p in &c.properties {
        collect_property(pool, p);
    }
    for (name, v) in &c.constants {
        pool.intern(name);
        value_codec::collect(pool, v);
    }
    for (name, v) in &c.statics {
        pool.intern(name);
        value_codec::collect(pool, v);
    }
    for m in c.methods.iter() {
        collect_method(pool, m);
    }
}

fn write_class(w: &mut ByteWriter, pool: &StringPoolBuilder, c: &Class) {
    w.write_u32(pool.index_of(&c.name));
    let ns_idx = match &c.namespace {
        Some(s) => pool.index_of(s),
        None => pool.index_of(&Rc::from("")),
    };
    w.write_u32(ns_idx);
    let parent_idx = match &c.parent_name {
        Some(s) => pool.index_of(s),
        None => pool.index_of(&Rc::from("")),
    };
    w.write_u32(parent_idx);

    let mut flags = 0u8;
    if c.is_abstract {
        flags |= ABSTRACT_BIT;
    }
    if c.is_interface {
        flags |= INTERFACE_BIT;
    }
    if c.is_final {
        flags |= FINAL_BIT;
    }
    if c.is_attribute {
        flags |= ATTRIBUTE_BIT;
    }
    w.write_u8(flags);

    w.write_u16(c.interfaces.len() as u16);
    for i in &c.interfaces {
        w.write_u32(pool.index_of(i));
    }

    w.write_u16(c.type_params.len() as u16);
    for tp in &c.type_params {
        write_type_param(w, pool, tp);
    }

    write_annotations(w, pool, &c.annotations);

    w.write_u16(c.properties.len() as u16);
    for p in &c.properties {
        write_property(w, pool, p);
    }

    w.write_u32(c.constants.len() as u32);
    for (name, v) in &c.constants {
        w.write_u32(pool.index_of(name));
        value_codec::write(w, v, pool);
    }

    w.write_u32(c.statics.len() as u32);
    for (name, v) in &c.statics {
        w.write_u32(pool.index_of(name));
        value_codec::write(w, v, pool);
    }

    w.write_u32(c.methods.total_len() as u32);
    for m in c.methods.iter() {
        write_method(w, pool, m);
    }
}

fn read_class(r: &mut ByteReader<'_>, pool: &StringTable) -> Result<Class, FormatError> {
    let at = r.position();
    let name = pool.get(at, r.read_u32()?)?;
    let at = r.position();
    let namespace = pool.get_opt(at, r.read_u32()?)?;
    let at = r.position();
    let parent_name = pool.get_opt(at, r.read_u32()?)?;

    let flags = r.read_u8()?;
    let is_abstract = flags & ABSTRACT_BIT != 0;
    let is_interface = flags & INTERFACE_BIT != 0;
    let is_final = flags & FINAL_BIT != 0;
    let is_attribute = flags & ATTRIBUTE_BIT != 0;

    let interface_count = r.read_u16()? as usize;
    let mut interfaces = Vec::with_capacity(interface_count);
    for _ in 0..interface_count {
        let at = r.position();
        interfaces.push(pool.get(at, r.read_u32()?)?);
    }

    let type_param_count = r.read_u16()? as usize;
    let mut type_params = Vec::with_capacity(type_param_count);
    for _ in 0..type_param_count {
        type_params.push(read_type_param(r, pool)?);
    }

    let annotations = read_annotations(r, pool)?;

    let property_count = r.read_u16()? as usize;
    let mut properties = Vec::with_capacity(property_count);
    for _ in 0..property_count {
        properties.push(read_property(r, pool)?);
    }

    let constant_count = r.read_u32()? as usize;
    let mut constants = Vec::with_capacity(constant_count);
    for _ in 0..constant_count {
        let at = r.position();
        let name = pool.get(at, r.read_u32()?)?;
        let value = value_codec::read(r, pool)?;
        constants.push((name, value));
    }

    let static_count = r.read_u32()? as usize;
    let mut statics = Vec::with_capacity(static_count);
    for _ in 0..static_count {
        let at = r.position();
        let name = pool.get(at, r.read_u32()?)?;
        let value = value_codec::read(r, pool)?;
        statics.push((name, value));
    }

    let method_count = r.read_u32()? as usize;
    let mut methods = OverloadTable::new();
    for _ in 0..method_count {
        methods.add(read_method(r, pool)?);
    }

    Ok(Class {
        name,
        namespace,
        parent_name,
        interfaces,
        is_abstract,
        is_interface,
        is_final,
        is_attribute,
        annotations,
        type_params,
        properties,
        constants,
        statics,
        methods,
    })
}

// ---------------------------------------------------------------- EnumDecl

fn collect_enum(pool: &mut StringPoolBuilder, e: &EnumDecl) {
    pool.intern(&e.name);
    for (name, v) in &e.cases {
        pool.intern(name);
        value_codec::collect(pool, v);
    }
}

fn write_enum(w: &mut ByteWriter, pool: &StringPoolBuilder, e: &EnumDecl) {
    w.write_u32(pool.index_of(&e.name));
    w.write_u16(e.cases.len() as u16);
    for (name, v) in &e.cases {
        w.write_u32(pool.index_of(name));
        value_codec::write(w, v, pool);
    }
}

fn read_enum(r: &mut ByteReader<'_>, pool: &StringTable) -> Result<EnumDecl, FormatError> {
    let at = r.position();
    let name = pool.get(at, r.read_u32()?)?;
    let case_count = r.read_u16()? as usize;
    let mut cases = Vec::with_capacity(case_count);
    for _ in 0..case_count {
        let at = r.position();
        let case_name = pool.get(at, r.read_u32()?)?;
        let value = value_codec::read(r, pool)?;
        cases.push((case_name, value));
    }
    Ok(EnumDecl { name, cases })
}

// ---------------------------------------------------------------- CompiledFile

/// Walk the whole declaration tree, collecting strings in the
/// classes-then-enums-then-main-function order the format's determinism
/// (spec §5) is defined against.
pub fn collect_all(file: &CompiledFile) -> StringPoolBuilder {
    let mut pool = StringPoolBuilder::new();
    for (_, class) in file.classes.iter() {
        collect_class(&mut pool, class);
    }
    for (_, e) in file.enums.iter() {
        collect_enum(&mut pool, e);
    }
    collect_function(&mut pool, &file.main);
    pool
}

pub fn write_main(w: &mut ByteWriter, pool: &StringPoolBuilder, file: &CompiledFile) {
    write_function(w, pool, &file.main);
}

pub fn write_classes(w: &mut ByteWriter, pool: &StringPoolBuilder, classes: &DeclMap<Class>) {
    w.write_u32(classes.len() as u32);
    for (_, class) in classes.iter() {
        write_class(w, pool, class);
    }
}

pub fn write_enums(w: &mut ByteWriter, pool: &StringPoolBuilder, enums: &DeclMap<EnumDecl>) {
    w.write_u32(enums.len() as u32);
    for (_, e) in enums.iter() {
        write_enum(w, pool, e);
    }
}

pub fn read_main(r: &mut ByteReader<'_>, pool: &StringTable) -> Result<Function, FormatError> {
    read_function(r, pool)
}

pub fn read_classes(r: &mut ByteReader<'_>, pool: &StringTable) -> Result<DeclMap<Class>, FormatError> {
    let count = r.read_u32()? as usize;
    let mut map = DeclMap::new();
    for _ in 0..count {
        let class = read_class(r, pool)?;
        map.insert(class.name.clone(), class);
    }
    Ok(map)
}

pub fn read_enums(r: &mut ByteReader<'_>, pool: &StringTable) -> Result<DeclMap<EnumDecl>, FormatError> {
    let count = r.read_u32()? as usize;
    let mut map = DeclMap::new();
    for _ in 0..count {
        let e = read_enum(r, pool)?;
        map.insert(e.name.clone(), e);
    }
    Ok(map)
}
