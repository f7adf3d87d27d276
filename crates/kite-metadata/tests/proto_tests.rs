use super::*;
use crate::stdlib::stdlib_module;
use serde_json::{Value, json};

#[test]
fn test_type_proto_json_shape() {
    let boxed = TypeProto::class(
        4,
        vec![TypeArgumentProto {
            projection: ProjectionProto::Out,
            ty: Some(TypeProto::type_parameter(0, true)),
        }],
        false,
    );
    let json = serde_json::to_value(&boxed).expect("serializable");
    assert_eq!(
        json,
        json!({
            "constructor": { "Class": 4 },
            "arguments": [{
                "projection": "Out",
                "ty": {
                    "constructor": { "TypeParameter": 0 },
                    "arguments": [],
                    "nullable": true,
                    "flexible_type_capabilities_id": null,
                    "flexible_upper_bound": null
                }
            }],
            "nullable": false,
            "flexible_type_capabilities_id": null,
            "flexible_upper_bound": null
        })
    );
}

#[test]
fn test_stdlib_module_dump_names_resolve_through_the_string_table() {
    let module = stdlib_module();
    let json = serde_json::to_value(&module).expect("serializable");
    assert_eq!(json["name"], "kite-stdlib");

    let strings: Vec<&str> = json["strings"]
        .as_array()
        .expect("string table")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(strings.len(), module.strings.len());

    let names = json["qualified_names"].as_array().expect("qualified names");
    let short_name = |entry: &Value| {
        let index = entry["short_name"].as_u64().expect("string index") as usize;
        strings[index]
    };
    assert!(names.iter().any(|entry| short_name(entry) == "Box" && entry["kind"] == "Class"));
    assert!(names.iter().any(|entry| short_name(entry) == "io" && entry["kind"] == "Package"));
    for (index, entry) in names.iter().enumerate() {
        if let Some(parent) = entry["parent"].as_u64() {
            assert!((parent as usize) < index, "parent of entry {index} is not earlier");
        }
    }
}

#[test]
fn test_constants_serialize_by_variant() {
    let constants = [ConstantProto::Int(-1), ConstantProto::Boolean(true), ConstantProto::String(3), ConstantProto::Null];
    let json = serde_json::to_string(&constants).expect("serializable");
    assert_eq!(json, r#"[{"Int":-1},{"Boolean":true},{"String":3},"Null"]"#);
}
