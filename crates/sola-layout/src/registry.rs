//! The process-wide Class Layout Registry (C5): a `parking_lot::RwLock`
//! guarded map from class name/id to [`ClassLayout`], handing out
//! monotonically increasing class ids starting at 1 (0 is reserved).
//!
//! Grounded on `raya-core::types::registry::{TypeRegistry,
//! TypeRegistryBuilder}` — same "immutable entries behind a lock, looked up
//! by key" shape — generalized from `TypeId`-keyed GC metadata to
//! class-id-keyed JIT layout metadata, and from a batch builder to
//! one-at-a-time registration (spec §4.7: ids are assigned as classes are
//! encountered).

use crate::class_layout::{ClassLayout, ClassLayoutBuilder};
use crate::error::LayoutError;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

struct Inner {
    by_id: FxHashMap<u32, Arc<ClassLayout>>,
    by_name: FxHashMap<Rc<str>, u32>,
}

/// Many concurrent readers, exclusive writers for id allocation and
/// insertion (spec §5). Class ids, once assigned, never change; layouts
/// are immutable after registration, so a reader holding an `Arc<ClassLayout>`
/// never observes a partially-built class.
pub struct ClassLayoutRegistry {
    inner: RwLock<Inner>,
    next_id: AtomicU32,
}

impl Default for ClassLayoutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassLayoutRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                by_id: FxHashMap::default(),
                by_name: FxHashMap::default(),
            }),
            // class id 0 is reserved; the first registered class gets 1.
            next_id: AtomicU32::new(1),
        }
    }

    /// Freezes `builder` into a [`ClassLayout`], assigns it the next
    /// monotonic class id, and inserts it. Fails if the name is already
    /// registered or the declared parent name is not yet registered.
    pub fn register_class(&self, builder: ClassLayoutBuilder) -> Result<Arc<ClassLayout>, LayoutError> {
        let mut guard = self.inner.write();
        if guard.by_name.contains_key(builder.name.as_ref()) {
            return Err(LayoutError::DuplicateClass(builder.name.to_string()));
        }

        let parent_id = match &builder.parent_name {
            Some(parent) => {
                let id = guard
                    .by_name
                    .get(parent.as_ref())
                    .copied()
                    .ok_or_else(|| LayoutError::UnknownClass(parent.to_string()))?;
                Some(id)
            }
            None => None,
        };

        let class_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let name = builder.name.clone();
        let layout = Arc::new(builder.build(class_id, parent_id));
        guard.by_id.insert(class_id, layout.clone());
        guard.by_name.insert(name, class_id);
        Ok(layout)
    }

    pub fn get_by_id(&self, class_id: u32) -> Option<Arc<ClassLayout>> {
        self.inner.read().by_id.get(&class_id).cloned()
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<ClassLayout>> {
        let guard = self.inner.read();
        let id = *guard.by_name.get(name)?;
        guard.by_id.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

    #[test]
    fn ids_start_at_one_and_increase_monotonically() {
        let registry = ClassLayoutRegistry::new();
        let a = registry.register_class(ClassLayoutBuilder::new("A")).unwrap();
        let b = registry.register_class(ClassLayoutBuilder::new("B")).unwrap();
        assert_eq!(a.class_id, 1);
        assert_eq!(b.class_id, 2);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let registry = ClassLayoutRegistry::new();
        registry.register_class(ClassLayoutBuilder::new("A")).unwrap();
        let err = registry.register_class(ClassLayoutBuilder::new("A")).unwrap_err();
        assert_eq!(err, LayoutError::DuplicateClass("A".to_string()));
    }

    #[test]
    fn unregistered_parent_is_rejected() {
        let registry = ClassLayoutRegistry::new();
        let err = registry
            .register_class(ClassLayoutBuilder::new("Child").with_parent("Parent"))
            .unwrap_err();
        assert_eq!(err, LayoutError::UnknownClass("Parent".to_string()));
    }

    #[test]
    fn parent_registered_first_resolves_to_its_id() {
        let registry = ClassLayoutRegistry::new();
        let parent = registry.register_class(ClassLayoutBuilder::new("Parent")).unwrap();
        let mut child_builder = ClassLayoutBuilder::new("Child").with_parent("Parent");
        child_builder.add_field("extra", FieldType::Int, false, false);
        let child = registry.register_class(child_builder).unwrap();
        assert_eq!(child.parent_id, Some(parent.class_id));
    }

    #[test]
    fn lookup_by_id_and_name_agree() {
        let registry = ClassLayoutRegistry::new();
        let registered = registry.register_class(ClassLayoutBuilder::new("A")).unwrap();
        let by_id = registry.get_by_id(registered.class_id).unwrap();
        let by_name = registry.get_by_name("A").unwrap();
        assert_eq!(by_id.class_id, by_name.class_id);
    }
}
