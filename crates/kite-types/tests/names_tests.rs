use super::*;

#[test]
fn test_fq_name_parent_and_short_name() {
    let name = FqName::parse("a.b.c");
    assert_eq!(name.parent(), FqName::parse("a.b"));
    assert_eq!(name.short_name(), Name::identifier("c"));
    assert_eq!(FqName::parse("a").parent(), FqName::root());
    assert!(FqName::root().is_root());
    assert_eq!(FqName::root().child(&Name::identifier("a")), FqName::parse("a"));
}

#[test]
fn test_fq_name_prefix_is_segment_aware() {
    let name = FqName::parse("kite.io.println");
    assert!(name.starts_with(&FqName::parse("kite.io")));
    assert!(name.starts_with(&FqName::root()));
    assert!(!name.starts_with(&FqName::parse("kite.i")));
}

#[test]
fn test_class_id_round_trip() {
    let id = ClassId::new(FqName::parse("p.q"), FqName::parse("Outer.Inner"));
    assert_eq!(id.as_string(), "p/q/Outer.Inner");

    let reparsed = ClassId::from_string(&id.as_string());
    assert_eq!(reparsed.package_fq_name(), &FqName::parse("p.q"));
    assert_eq!(reparsed.relative_class_name(), &FqName::parse("Outer.Inner"));
    assert_eq!(reparsed, id);
    assert_eq!(id.as_single_fq_name(), FqName::parse("p.q.Outer.Inner"));
}

#[test]
fn test_nested_class_ids() {
    let outer = ClassId::from_string("p/Outer");
    let inner = outer.create_nested(&Name::identifier("Inner"));
    assert!(inner.is_nested());
    assert_eq!(inner.outer_class_id(), Some(outer.clone()));
    assert_eq!(outer.outer_class_id(), None);
    assert_eq!(inner.short_class_name().as_str(), "Inner");
}

#[test]
fn test_root_package_class_id() {
    let id = ClassId::from_string("Line1");
    assert!(id.package_fq_name().is_root());
    assert_eq!(id.as_string(), "Line1");
    assert_eq!(ClassId::top_level(&FqName::parse("kite.Int")), standard_class_ids::int());
}
