//! End-to-end `.solac` round trips: build a `CompiledFile` with classes,
//! overloaded methods and an enum, serialize, and verify the decoded file
//! is indistinguishable from the original.

use sola_artifact::{deserialize, serialize, Class, CompiledFile, EnumDecl, Function, FormatError, Method, Visibility};
use sola_bytecode::{Opcode, Value};

fn main_function() -> Function {
    let mut f = Function::new("main", 0);
    f.chunk.write_op(Opcode::Zero, 1);
    f.chunk.write_op(Opcode::Return, 1);
    f
}

fn method_body(name: &str, arity: u16) -> Function {
    let mut f = Function::new(name, arity);
    f.chunk.write_op(Opcode::ReturnNull, 1);
    f
}

#[test]
fn p1_round_trips_a_file_with_classes_enums_and_overloads() {
    let mut animal = Class::new("Animal");
    animal.properties.push(sola_artifact::Property {
        name: "name".into(),
        default: Value::Null,
        visibility: Visibility::Private,
        annotations: vec![],
    });
    animal.methods.add(Method {
        function: method_body("speak", 0),
        is_static: false,
        visibility: Visibility::Public,
        annotations: vec![],
    });
    animal.methods.add(Method {
        function: method_body("speak", 1),
        is_static: false,
        visibility: Visibility::Public,
        annotations: vec![],
    });

    let mut dog = Class::new("Dog");
    dog.parent_name = Some("Animal".into());
    dog.interfaces.push("Comparable".into());
    dog.methods.add(Method {
        function: method_body("bark", 0),
        is_static: true,
        visibility: Visibility::Protected,
        annotations: vec![],
    });

    let seasons = EnumDecl {
        name: "Season".into(),
        cases: vec![
            ("Spring".into(), Value::Int(0)),
            ("Summer".into(), Value::Int(1)),
            ("Fall".into(), Value::Int(2)),
            ("Winter".into(), Value::Int(3)),
        ],
    };

    let mut file = CompiledFile::new(main_function());
    file.classes.insert(animal.name.clone(), animal);
    file.classes.insert(dog.name.clone(), dog);
    file.enums.insert(seasons.name.clone(), seasons);

    let bytes = serialize(&file);
    let decoded = deserialize(&bytes).expect("well-formed file must decode");

    assert_eq!(decoded.classes.len(), 2);
    let dog = decoded.classes.get("Dog").unwrap();
    assert_eq!(dog.parent_name.as_deref(), Some("Animal"));
    assert_eq!(dog.interfaces, vec!["Comparable".into()]);

    let animal = decoded.classes.get("Animal").unwrap();
    assert_eq!(animal.methods.overloads("speak").len(), 2);
    assert_eq!(animal.methods.get_by_arity("speak", 1).unwrap().arity(), 1);

    let season = decoded.enums.get("Season").unwrap();
    assert_eq!(season.cases.len(), 4);
    assert_eq!(season.cases[1].0.as_ref(), "Summer");
}

#[test]
fn p2_serializing_the_same_file_twice_is_byte_identical() {
    let mut file = CompiledFile::new(main_function());
    let mut class = Class::new("Widget");
    class.methods.add(Method {
        function: method_body("render", 0),
        is_static: false,
        visibility: Visibility::Public,
        annotations: vec![],
    });
    file.classes.insert(class.name.clone(), class);

    assert_eq!(serialize(&file), serialize(&file));
}

#[test]
fn p9_every_rejection_precedes_successful_use_of_a_truncated_buffer() {
    let file = CompiledFile::new(main_function());
    let bytes = serialize(&file);

    for cut in [0usize, 4, 12, 23] {
        let err = deserialize(&bytes[..cut]).unwrap_err();
        assert!(matches!(err, FormatError::Truncated { .. }));
    }
}

#[test]
fn a_class_referencing_an_unverifiable_method_is_rejected_whole_file() {
    let mut class = Class::new("Broken");
    let mut bad = Function::new("oops", 0);
    // DUP with nothing on the stack: fails verification.
    bad.chunk.write_op(Opcode::Dup, 1);
    class.methods.add(Method {
        function: bad,
        is_static: false,
        visibility: Visibility::Public,
        annotations: vec![],
    });

    let mut file = CompiledFile::new(main_function());
    file.classes.insert(class.name.clone(), class);

    let bytes = serialize(&file);
    let err = deserialize(&bytes).unwrap_err();
    assert!(matches!(err, FormatError::Verification { .. }));
}

#[test]
fn default_parameter_values_and_annotations_survive_the_round_trip() {
    let mut f = Function::new("greet", 2);
    f.min_arity = 1;
    f.default_values = vec![Value::string("world")];
    f.chunk.write_op(Opcode::ReturnNull, 1);

    let mut class = Class::new("Greeter");
    class.methods.add(Method {
        function: f,
        is_static: false,
        visibility: Visibility::Public,
        annotations: vec![sola_artifact::Annotation {
            name: "deprecated".into(),
            args: vec![("reason".into(), Value::string("use Greeter2"))],
        }],
    });

    let mut file = CompiledFile::new(main_function());
    file.classes.insert(class.name.clone(), class);

    let bytes = serialize(&file);
    let decoded = deserialize(&bytes).unwrap();
    let greeter = decoded.classes.get("Greeter").unwrap();
    let method = greeter.methods.get_by_arity("greet", 2).unwrap();
    assert_eq!(method.function.min_arity, 1);
    assert_eq!(method.function.default_values.len(), 1);
    assert_eq!(method.annotations.len(), 1);
    assert_eq!(method.annotations[0].name.as_ref(), "deprecated");
}

#[test]
fn a_file_with_no_classes_or_enums_still_round_trips() {
    let file = CompiledFile::new(main_function());
    let bytes = serialize(&file);
    let decoded = deserialize(&bytes).unwrap();
    assert!(decoded.classes.is_empty());
    assert!(decoded.enums.is_empty());
    assert!(decoded.main.struct_eq(&file.main));
}
