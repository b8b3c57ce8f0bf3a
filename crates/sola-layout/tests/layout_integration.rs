//! Integration tests exercising the class registry and v-table builder
//! together, the way a loader would after deserializing a `CompiledFile`.

use rustc_hash::FxHashMap;
use sola_artifact::{Class, Function, Method, Visibility};
use sola_layout::{ClassLayoutBuilder, ClassLayoutRegistry, FieldType, VTableBuilder};
use std::rc::Rc;

fn method(name: &str, arity: u16) -> Method {
    Method {
        function: Function::new(name, arity),
        is_static: false,
        visibility: Visibility::Public,
        annotations: Vec::new(),
    }
}

#[test]
fn registry_assigns_ids_then_vtable_builder_resolves_across_inheritance() {
    let registry = ClassLayoutRegistry::new();

    let mut animal_layout = ClassLayoutBuilder::new("Animal");
    animal_layout.add_field("name", FieldType::String, false, false);
    animal_layout.add_virtual_method("speak", 1);
    let animal = registry.register_class(animal_layout).unwrap();
    assert_eq!(animal.class_id, 1);

    let mut dog_layout = ClassLayoutBuilder::new("Dog").with_parent("Animal");
    dog_layout.add_field("breed", FieldType::String, false, false);
    let dog = registry.register_class(dog_layout).unwrap();
    assert_eq!(dog.class_id, 2);
    assert_eq!(dog.parent_id, Some(animal.class_id));
    assert_eq!(dog.field("breed").unwrap().offset, 16);

    // Now exercise C9 over the matching artifact-level declarations.
    let mut classes: FxHashMap<Rc<str>, Class> = FxHashMap::default();
    let mut speaker_iface = Class::new("Speaker");
    speaker_iface.is_interface = true;
    speaker_iface.methods.add(method("speak", 1));
    classes.insert(speaker_iface.name.clone(), speaker_iface);

    let mut animal_decl = Class::new("Animal");
    animal_decl.methods.add(method("speak", 1));
    classes.insert(animal_decl.name.clone(), animal_decl);

    let mut dog_decl = Class::new("Dog");
    dog_decl.parent_name = Some(Rc::from("Animal"));
    dog_decl.interfaces = vec![Rc::from("Speaker")];
    classes.insert(dog_decl.name.clone(), dog_decl.clone());

    let builder = VTableBuilder::new(&classes);
    let vtable = builder.build(&dog_decl, "Speaker").unwrap();
    assert_eq!(vtable.entries.len(), 1);
    let resolved = vtable.entries[0].method.as_ref().expect("inherited from Animal");
    assert_eq!(resolved.name().as_ref(), "speak");
}

#[test]
fn jit_eligibility_survives_registry_round_trip() {
    let registry = ClassLayoutRegistry::new();
    let mut wide = ClassLayoutBuilder::new("Wide");
    for i in 0..65 {
        wide.add_field(format!("f{i}"), FieldType::Int, false, false);
    }
    let layout = registry.register_class(wide).unwrap();
    assert!(!layout.jit_enabled);

    let fetched = registry.get_by_name("Wide").unwrap();
    assert_eq!(fetched.class_id, layout.class_id);
    assert!(!fetched.jit_enabled);
}
