//! The V-Table Builder (C9): for each (implementing class, interface) pair,
//! an ordered table of `(method-index-in-interface, method-name,
//! concrete-method-or-null)` entries, built once and looked up in O(1) by
//! the precomputed index (spec §4.6/P7).
//!
//! Grounded on `raya-core::object::{Class, VTable}` (name -> function-id
//! vector), generalized from "one v-table per class" to "one v-table per
//! (class, interface) pair" with interface-method ordering computed
//! recursively, as the spec requires.

use crate::error::LayoutError;
use rustc_hash::{FxHashMap, FxHashSet};
use sola_artifact::{Class, Method};
use std::cell::RefCell;
use std::rc::Rc;

/// One resolved slot of a v-table: the interface's method index and name,
/// plus the concrete method the implementing class provides for it (or
/// `None` if no ancestor implements it — looked up as a defined
/// "not implemented" condition rather than panicking).
#[derive(Debug, Clone)]
pub struct VTableEntry {
    pub interface_index: usize,
    pub method_name: Rc<str>,
    pub method: Option<Method>,
}

/// The v-table for one (implementing class, interface) pair.
#[derive(Debug, Clone)]
pub struct VTable {
    pub class_name: Rc<str>,
    pub interface_name: Rc<str>,
    pub entries: Vec<VTableEntry>,
}

impl VTable {
    /// O(1) lookup by the interface's precomputed method index.
    pub fn lookup(&self, index: usize) -> Option<&VTableEntry> {
        self.entries.get(index)
    }
}

/// Builds v-tables from a flat namespace of classes and interfaces, both
/// represented as [`sola_artifact::Class`] (an interface is a `Class` with
/// `is_interface = true`).
pub struct VTableBuilder<'a> {
    classes: &'a FxHashMap<Rc<str>, Class>,
}

impl<'a> VTableBuilder<'a> {
    pub fn new(classes: &'a FxHashMap<Rc<str>, Class>) -> Self {
        Self { classes }
    }

    /// Recursively collects `(method-name, arity)` pairs for `interface`:
    /// parent-interface methods first (in the order each is listed, each
    /// recursed into before moving to the next), then the interface's own
    /// methods, deduplicated by name keeping the first occurrence.
    pub fn collect_interface_methods(&self, interface: &Class) -> Result<Vec<(Rc<str>, u16)>, LayoutError> {
        let mut seen = FxHashSet::default();
        let mut ordered = Vec::new();
        self.collect_interface_methods_into(interface, &mut seen, &mut ordered)?;
        Ok(ordered)
    }

    fn collect_interface_methods_into(
        &self,
        interface: &Class,
        seen: &mut FxHashSet<Rc<str>>,
        ordered: &mut Vec<(Rc<str>, u16)>,
    ) -> Result<(), LayoutError> {
        for parent_name in &interface.interfaces {
            let parent = self
                .classes
                .get(parent_name.as_ref())
                .ok_or_else(|| LayoutError::UnknownInterface(parent_name.to_string()))?;
            self.collect_interface_methods_into(parent, seen, ordered)?;
        }
        for method in interface.methods.iter() {
            let name = method.name().clone();
            if seen.insert(name.clone()) {
                ordered.push((name, method.arity()));
            }
        }
        Ok(())
    }

    /// Walks `class` and its ancestors for a method named `name`; an exact
    /// arity match wins, otherwise the first-declared overload of that name
    /// (the spec's own fallback, reused from [`sola_artifact::OverloadTable::get_by_arity`]).
    /// Returns `None` only if no ancestor declares the name at all.
    fn resolve_method(&self, class: &Class, name: &str, arity: u16) -> Option<Method> {
        let mut current = Some(class);
        while let Some(c) = current {
            if let Some(m) = c.methods.get_by_arity(name, arity) {
                return Some(m.clone());
            }
            current = c
                .parent_name
                .as_ref()
                .and_then(|p| self.classes.get(p.as_ref()));
        }
        None
    }

    /// Builds the v-table for `(class, interface_name)`.
    pub fn build(&self, class: &Class, interface_name: &str) -> Result<VTable, LayoutError> {
        let interface = self
            .classes
            .get(interface_name)
            .ok_or_else(|| LayoutError::UnknownInterface(interface_name.to_string()))?;
        let method_order = self.collect_interface_methods(interface)?;
        let entries = method_order
            .into_iter()
            .enumerate()
            .map(|(interface_index, (name, arity))| VTableEntry {
                interface_index,
                method: self.resolve_method(class, &name, arity),
                method_name: name,
            })
            .collect();
        Ok(VTable {
            class_name: class.name.clone(),
            interface_name: interface.name.clone(),
            entries,
        })
    }

    /// Every interface `class` transitively implements: its own
    /// `interfaces` list plus those of every ancestor, deduplicated,
    /// first-seen order preserved.
    pub fn transitive_interfaces(&self, class: &Class) -> Vec<Rc<str>> {
        let mut seen = FxHashSet::default();
        let mut ordered = Vec::new();
        let mut current = Some(class);
        while let Some(c) = current {
            for name in &c.interfaces {
                if seen.insert(name.clone()) {
                    ordered.push(name.clone());
                }
            }
            current = c
                .parent_name
                .as_ref()
                .and_then(|p| self.classes.get(p.as_ref()));
        }
        ordered
    }

    /// Builds every v-table `class` needs: one per transitively implemented
    /// interface.
    pub fn build_all(&self, class: &Class) -> Result<Vec<VTable>, LayoutError> {
        self.transitive_interfaces(class)
            .iter()
            .map(|interface_name| self.build(class, interface_name))
            .collect()
    }
}

/// Lazily-filled cache from `(class name, interface name)` to its built
/// [`VTable`] — the "lazily filled mapping from interface name to its
/// v-table" spec §3 attaches conceptually to each class. Kept as a
/// standalone cache here (rather than a field on `sola_artifact::Class`)
/// since `VTable` is this crate's type and `sola-artifact` does not depend
/// on `sola-layout`.
#[derive(Default)]
pub struct VTableCache {
    entries: RefCell<FxHashMap<(Rc<str>, Rc<str>), Rc<VTable>>>,
}

impl VTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(
        &self,
        builder: &VTableBuilder<'_>,
        class: &Class,
        interface_name: &str,
    ) -> Result<Rc<VTable>, LayoutError> {
        let key = (class.name.clone(), Rc::from(interface_name));
        if let Some(cached) = self.entries.borrow().get(&key) {
            return Ok(cached.clone());
        }
        let vtable = Rc::new(builder.build(class, interface_name)?);
        self.entries.borrow_mut().insert(key, vtable.clone());
        Ok(vtable)
    }
}
