//! Code-bearing declarations: [`Function`], [`Method`], [`Class`], [`EnumDecl`],
//! [`Annotation`], and the top-level [`CompiledFile`] they live in.
//!
//! `DeclMap` is the same insertion-ordered, hash-indexed shape as
//! `sola_bytecode::value::ValueMap` — keys here are declaration names rather
//! than `Value`s, but the reason for the shape is identical: O(1) lookup by
//! name while keeping the first-encounter order the codec's determinism
//! (spec §5) depends on.

use rustc_hash::FxHashMap;
use sola_bytecode::{Chunk, Value};
use std::rc::Rc;

/// Member/property visibility. Encoded as 2 bits in the codec (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// One annotation attached to a class, property, or method: a name plus an
/// ordered list of `(key, value)` arguments.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub name: Rc<str>,
    pub args: Vec<(Rc<str>, Value)>,
}

/// A generic type-parameter definition: a name, an optional single
/// constraint type name, and a list of interfaces the bound type must
/// implement.
#[derive(Debug, Clone)]
pub struct TypeParam {
    pub name: Rc<str>,
    pub constraint: Option<Rc<str>>,
    pub implements: Vec<Rc<str>>,
}

/// One declared property of a class: its default value, visibility, and
/// annotations.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: Rc<str>,
    pub default: Value,
    pub visibility: Visibility,
    pub annotations: Vec<Annotation>,
}

/// A free function or, once wrapped in [`Method`], a class method.
///
/// `native_body` never survives a round trip through the artifact codec —
/// it exists purely so an in-process embedder can attach a Rust closure to
/// a builtin before handing the `Function` to the (out-of-scope)
/// interpreter. The persisted shape only ever carries `is_builtin`.
#[derive(Clone)]
pub struct Function {
    pub name: Rc<str>,
    pub arity: u16,
    pub min_arity: u16,
    pub local_count: u16,
    pub upvalue_count: u16,
    pub is_variadic: bool,
    pub is_builtin: bool,
    pub native_body: Option<Rc<dyn Fn(&[Value]) -> Value>>,
    pub chunk: Chunk,
    pub default_values: Vec<Value>,
    pub class_name: Option<Rc<str>>,
    pub source_file: Option<Rc<str>>,
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("min_arity", &self.min_arity)
            .field("local_count", &self.local_count)
            .field("upvalue_count", &self.upvalue_count)
            .field("is_variadic", &self.is_variadic)
            .field("is_builtin", &self.is_builtin)
            .field("has_native_body", &self.native_body.is_some())
            .field("code_len", &self.chunk.len())
            .field("class_name", &self.class_name)
            .field("source_file", &self.source_file)
            .finish()
    }
}

impl Function {
    pub fn new(name: impl Into<Rc<str>>, arity: u16) -> Self {
        Self {
            name: name.into(),
            arity,
            min_arity: arity,
            local_count: 0,
            upvalue_count: 0,
            is_variadic: false,
            is_builtin: false,
            native_body: None,
            chunk: Chunk::new(),
            default_values: Vec::new(),
            class_name: None,
            source_file: None,
        }
    }

    /// Structural equality ignoring `native_body` (a Rust closure is not
    /// comparable and does not survive the codec anyway).
    pub fn struct_eq(&self, other: &Function) -> bool {
        self.name == other.name
            && self.arity == other.arity
            && self.min_arity == other.min_arity
            && self.local_count == other.local_count
            && self.upvalue_count == other.upvalue_count
            && self.is_variadic == other.is_variadic
            && self.is_builtin == other.is_builtin
            && self.chunk.code == other.chunk.code
            && self.chunk.lines == other.chunk.lines
            && self.chunk.constants.len() == other.chunk.constants.len()
            && self
                .chunk
                .constants
                .iter()
                .zip(other.chunk.constants.iter())
                .all(|(a, b)| a.equals(b))
            && self.default_values.len() == other.default_values.len()
            && self
                .default_values
                .iter()
                .zip(other.default_values.iter())
                .all(|(a, b)| a.equals(b))
            && self.class_name == other.class_name
            && self.source_file == other.source_file
    }
}

/// A class method: a [`Function`] plus the member-only attributes spec §3
/// lists ("like a function plus `is_static`, `visibility`, annotations").
#[derive(Debug, Clone)]
pub struct Method {
    pub function: Function,
    pub is_static: bool,
    pub visibility: Visibility,
    pub annotations: Vec<Annotation>,
}

impl Method {
    pub fn arity(&self) -> u16 {
        self.function.arity
    }

    pub fn name(&self) -> &Rc<str> {
        &self.function.name
    }
}

/// The overload table: methods sharing one name, ordered by declaration,
/// distinguished by arity. Lookup by `(name, arity)` returns an exact match
/// or falls back to the first-declared overload (the owner of any default
/// parameters), per spec §3/P6.
#[derive(Debug, Clone, Default)]
pub struct OverloadTable {
    order: Vec<Rc<str>>,
    entries: FxHashMap<Rc<str>, Vec<Method>>,
}

impl OverloadTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, method: Method) {
        let name = method.name().clone();
        if !self.entries.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.entries.entry(name).or_default().push(method);
    }

    /// P6: exact `(name, arity)` match if present, else the first-declared
    /// overload of that name.
    pub fn get_by_arity(&self, name: &str, arity: u16) -> Option<&Method> {
        let list = self.entries.get(name)?;
        list.iter()
            .find(|m| m.arity() == arity)
            .or_else(|| list.first())
    }

    pub fn overloads(&self, name: &str) -> &[Method] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total method record count across every overload, matching the
    /// codec's "method count (total across overloads)".
    pub fn total_len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate every method, grouped by first-declared name, in
    /// declaration order within each group — the order the codec persists.
    pub fn iter(&self) -> impl Iterator<Item = &Method> {
        self.order
            .iter()
            .flat_map(move |name| self.entries.get(name).into_iter().flatten())
    }
}

/// A declared class.
#[derive(Debug, Clone)]
pub struct Class {
    pub name: Rc<str>,
    pub namespace: Option<Rc<str>>,
    pub parent_name: Option<Rc<str>>,
    pub interfaces: Vec<Rc<str>>,
    pub is_abstract: bool,
    pub is_interface: bool,
    pub is_final: bool,
    pub is_attribute: bool,
    pub annotations: Vec<Annotation>,
    pub type_params: Vec<TypeParam>,
    pub properties: Vec<Property>,
    pub constants: Vec<(Rc<str>, Value)>,
    pub statics: Vec<(Rc<str>, Value)>,
    pub methods: OverloadTable,
}

impl Class {
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            parent_name: None,
            interfaces: Vec::new(),
            is_abstract: false,
            is_interface: false,
            is_final: false,
            is_attribute: false,
            annotations: Vec::new(),
            type_params: Vec::new(),
            properties: Vec::new(),
            constants: Vec::new(),
            statics: Vec::new(),
            methods: OverloadTable::new(),
        }
    }

    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.constants.iter().find(|(n, _)| n.as_ref() == name).map(|(_, v)| v)
    }

    pub fn static_var(&self, name: &str) -> Option<&Value> {
        self.statics.iter().find(|(n, _)| n.as_ref() == name).map(|(_, v)| v)
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name.as_ref() == name)
    }
}

/// A declared enum: an ordered case-name -> [`Value`] mapping.
#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: Rc<str>,
    pub cases: Vec<(Rc<str>, Value)>,
}

impl EnumDecl {
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    pub fn case(&self, name: &str) -> Option<&Value> {
        self.cases.iter().find(|(n, _)| n.as_ref() == name).map(|(_, v)| v)
    }
}

/// An insertion-ordered, name-indexed collection — the shape `CompiledFile`
/// uses for its class and enum tables so both O(1) lookup-by-name and the
/// deterministic first-encounter traversal order (spec §5) are available
/// from the same structure.
#[derive(Debug, Clone, Default)]
pub struct DeclMap<T> {
    order: Vec<Rc<str>>,
    entries: FxHashMap<Rc<str>, T>,
}

impl<T> DeclMap<T> {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            entries: FxHashMap::default(),
        }
    }

    pub fn insert(&mut self, name: Rc<str>, value: T) {
        if !self.entries.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.entries.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &T)> {
        self.order
            .iter()
            .map(move |n| (n, self.entries.get(n).expect("DeclMap order/entries desync")))
    }
}

/// The top-level compiled artifact: a main function plus its classes and
/// enums, and an optional source-file name carried for diagnostics.
#[derive(Debug, Clone)]
pub struct CompiledFile {
    pub main: Function,
    pub classes: DeclMap<Class>,
    pub enums: DeclMap<EnumDecl>,
    pub source_file: Option<Rc<str>>,
}

impl CompiledFile {
    pub fn new(main: Function) -> Self {
        Self {
            main,
            classes: DeclMap::new(),
            enums: DeclMap::new(),
            source_file: None,
        }
    }

    /// Resolve a class's parent by name. Mirrors the design-notes strategy
    /// for a "parent-pointer class graph, circular with v-tables": parent
    /// references are names looked up against this file's class table on
    /// demand, not owned pointers stored on `Class` itself.
    pub fn resolve_parent<'a>(&'a self, class: &Class) -> Option<&'a Class> {
        let parent_name = class.parent_name.as_ref()?;
        self.classes.get(parent_name)
    }
}
