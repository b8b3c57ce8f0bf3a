//! The per-class layout descriptor (spec §4.7): class id, parent id, field
//! descriptors, method descriptors, and the concrete v-table — the frozen
//! artifact a class layout becomes once its owning class is finalized.

use crate::field::{FieldDescriptor, FieldType, MAX_JIT_FIELDS};
use std::rc::Rc;

/// Stand-in for a JIT-emitted code address. This crate has no code
/// generator (spec §1 non-goals), so entries here are the declaration
/// index of the function/method the pointer would eventually resolve to —
/// a future JIT backend replaces this `usize` with an actual machine
/// address without changing any offset this crate publishes.
pub type CodePtr = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Virtual,
    Static,
    Abstract,
}

/// One method of a class layout: its dispatch kind, entry point, and (for
/// virtual methods reachable through an interface) its slot in the
/// concrete v-table.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub name: Rc<str>,
    pub kind: MethodKind,
    pub entry_point: CodePtr,
    pub vtable_slot: Option<usize>,
}

/// The frozen, immutable layout for one class: fields at fixed offsets
/// (spec §4.7), methods, and the concrete v-table array a JIT backend
/// would index directly.
#[derive(Debug, Clone)]
pub struct ClassLayout {
    pub class_id: u32,
    pub parent_id: Option<u32>,
    pub name: Rc<str>,
    pub fields: Vec<FieldDescriptor>,
    pub methods: Vec<MethodDescriptor>,
    pub vtable: Vec<CodePtr>,
    pub jit_enabled: bool,
}

impl ClassLayout {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name.as_ref() == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name.as_ref() == name)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// Builder for a [`ClassLayout`]; mutated freely before being handed to
/// [`crate::registry::ClassLayoutRegistry::register_class`], which freezes
/// it and assigns the monotonic class id. Kept separate from `ClassLayout`
/// itself so a finalized layout is never seen half-built by a concurrent
/// reader of the registry.
#[derive(Debug, Clone)]
pub struct ClassLayoutBuilder {
    pub name: Rc<str>,
    pub parent_name: Option<Rc<str>>,
    fields: Vec<FieldDescriptor>,
    methods: Vec<MethodDescriptor>,
    vtable: Vec<CodePtr>,
}

impl ClassLayoutBuilder {
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            parent_name: None,
            fields: Vec::new(),
            methods: Vec::new(),
            vtable: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent_name: impl Into<Rc<str>>) -> Self {
        self.parent_name = Some(parent_name.into());
        self
    }

    /// Declares one field, returning its index in declaration order — the
    /// index the spec's offset formula (`16 + index * 8`) is keyed on.
    pub fn add_field(
        &mut self,
        name: impl Into<Rc<str>>,
        field_type: FieldType,
        private: bool,
        readonly: bool,
    ) -> usize {
        let index = self.fields.len();
        self.fields
            .push(FieldDescriptor::new(name, index, field_type, private, readonly));
        index
    }

    /// Declares a virtual method, assigning it the next v-table slot.
    pub fn add_virtual_method(&mut self, name: impl Into<Rc<str>>, entry_point: CodePtr) -> usize {
        let slot = self.vtable.len();
        self.vtable.push(entry_point);
        self.methods.push(MethodDescriptor {
            name: name.into(),
            kind: MethodKind::Virtual,
            entry_point,
            vtable_slot: Some(slot),
        });
        slot
    }

    /// Declares a static or abstract method; neither occupies a v-table
    /// slot (static methods are not dispatched virtually; abstract methods
    /// have no entry point to call).
    pub fn add_method(&mut self, name: impl Into<Rc<str>>, kind: MethodKind, entry_point: CodePtr) {
        self.methods.push(MethodDescriptor {
            name: name.into(),
            kind,
            entry_point,
            vtable_slot: None,
        });
    }

    pub(crate) fn build(self, class_id: u32, parent_id: Option<u32>) -> ClassLayout {
        let jit_enabled = self.fields.len() <= MAX_JIT_FIELDS;
        ClassLayout {
            class_id,
            parent_id,
            name: self.name,
            fields: self.fields,
            methods: self.methods,
            vtable: self.vtable,
            jit_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jit_enabled_flips_false_past_64_fields() {
        let mut builder = ClassLayoutBuilder::new("Wide");
        for i in 0..64 {
            builder.add_field(format!("f{i}"), FieldType::Int, false, false);
        }
        let layout = builder.clone().build(1, None);
        assert!(layout.jit_enabled);

        builder.add_field("f64", FieldType::Int, false, false);
        let layout = builder.build(1, None);
        assert!(!layout.jit_enabled);
    }

    #[test]
    fn virtual_methods_get_sequential_vtable_slots() {
        let mut builder = ClassLayoutBuilder::new("Shape");
        let a = builder.add_virtual_method("area", 10);
        let b = builder.add_virtual_method("perimeter", 11);
        assert_eq!((a, b), (0, 1));
        let layout = builder.build(1, None);
        assert_eq!(layout.vtable, vec![10, 11]);
    }
}
