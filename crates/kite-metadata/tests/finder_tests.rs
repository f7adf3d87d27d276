use super::*;
use crate::stdlib::{box_class_id, stdlib_module};
use kite_types::{BuiltIns, Name, is_subtype_of, standard_class_ids};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts how often class data is requested.
struct CountingSource {
    inner: ModuleClassDataSource,
    requests: Arc<AtomicUsize>,
}

impl ClassDataSource for CountingSource {
    fn class_data(&self, class_id: &ClassId) -> Option<ClassData> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.inner.class_data(class_id)
    }

    fn package_data(&self, package: &FqName) -> Vec<PackageData> {
        self.inner.package_data(package)
    }

    fn top_level_classes(&self, package: &FqName) -> Vec<ClassId> {
        self.inner.top_level_classes(package)
    }

    fn has_package(&self, package: &FqName) -> bool {
        self.inner.has_package(package)
    }
}

fn counting_finder() -> (Arc<DescriptorFinder>, Arc<AtomicUsize>) {
    let mut inner = ModuleClassDataSource::new();
    inner.add_module(stdlib_module()).expect("stdlib is valid");
    let requests = Arc::new(AtomicUsize::new(0));
    let finder = DescriptorFinder::new(CountingSource {
        inner,
        requests: Arc::clone(&requests),
    });
    (finder, requests)
}

#[test]
fn test_find_class_deserializes_once() {
    let (finder, requests) = counting_finder();
    let first = finder.find_class(&standard_class_ids::int()).expect("Int");
    let second = finder.find_class(&standard_class_ids::int()).expect("Int");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(requests.load(Ordering::SeqCst), 1);
}

#[test]
fn test_missing_class_is_none_and_cached() {
    let (finder, requests) = counting_finder();
    let missing = ClassId::from_string("nowhere/Missing");
    assert!(finder.find_class(&missing).is_none());
    assert!(finder.find_class(&missing).is_none());
    assert_eq!(requests.load(Ordering::SeqCst), 1);
}

#[test]
fn test_nested_lookups_share_the_cache() {
    let (finder, _) = counting_finder();
    let int = finder.find_class(&standard_class_ids::int()).expect("Int");
    let comparable = int
        .supertypes()
        .iter()
        .find_map(|ty| ty.class_descriptor().filter(|c| c.class_id == standard_class_ids::comparable()).cloned())
        .expect("Int implements Comparable");
    let direct = finder.find_class(&standard_class_ids::comparable()).expect("Comparable");
    assert!(Arc::ptr_eq(&comparable, &direct));
}

#[test]
fn test_class_members_are_deserialized() {
    let finder = crate::stdlib_finder();
    let int = finder.find_class(&standard_class_ids::int()).expect("Int");
    let plus = int.member_scope().functions(&Name::from("plus"));
    assert_eq!(plus.len(), 1);
    assert!(plus[0].is_operator);
    assert_eq!(plus[0].dispatch_receiver, Some(standard_class_ids::int()));

    let boxed = finder.find_class(&box_class_id()).expect("Box");
    assert_eq!(boxed.type_parameters.len(), 1);
    let value = &boxed.member_scope().properties(&Name::from("value"))[0];
    assert!(value.is_var && value.setter.is_some());
    assert_eq!(boxed.constructors().len(), 1);
    assert!(boxed.constructors()[0].is_primary);
}

#[test]
fn test_builtins_and_subtyping_over_stdlib() {
    let finder = crate::stdlib_finder();
    let builtins = BuiltIns::load(|id| finder.find_class(id)).expect("builtins present");
    let exception = finder
        .find_class(&standard_class_ids::arithmetic_exception())
        .expect("ArithmeticException");
    assert!(is_subtype_of(&exception.default_type(), &builtins.throwable_type()));
    assert!(is_subtype_of(&builtins.int_type(), &builtins.any_type()));
    assert!(!is_subtype_of(&builtins.string_type(), &builtins.int_type()));
}

#[test]
fn test_package_members_and_classifiers() {
    let finder = crate::stdlib_finder();
    let io = finder.find_package_members(&FqName::parse("kite.io")).expect("kite.io");
    assert_eq!(io.scope.functions(&Name::from("println")).len(), 2);
    let read_line = &io.scope.functions(&Name::from("readLine"))[0];
    assert_eq!(read_line.return_type.to_string(), "String!");
    match &read_line.containing {
        ContainingDeclaration::Package { fq_name, facade } => {
            assert_eq!(fq_name.as_str(), "kite.io");
            assert_eq!(facade, &crate::stdlib::facades::io());
        }
        other => panic!("unexpected container {other:?}"),
    }

    let kite = finder.find_package_members(&FqName::parse("kite")).expect("kite");
    assert!(kite.scope.classifier(&Name::from("Int")).is_some());
    let max_int = &kite.scope.properties(&Name::from("MAX_INT"))[0];
    assert_eq!(max_int.constant(), Some(&kite_types::ConstantValue::Int(i32::MAX)));

    assert!(finder.find_package_members(&FqName::parse("kite.nope")).is_none());
}

#[test]
fn test_package_queries() {
    let finder = crate::stdlib_finder();
    assert!(finder.has_package(&FqName::parse("kite")));
    assert!(finder.has_package(&FqName::root()));
    assert!(!finder.has_package(&FqName::parse("kotlin")));
    let children: Vec<String> = finder
        .subpackages(&FqName::parse("kite"))
        .iter()
        .map(|p| p.as_str().to_string())
        .collect();
    assert_eq!(children, vec!["kite.collections".to_string(), "kite.io".to_string()]);
}

#[test]
fn test_add_module_rejects_corrupt_module() {
    let mut module = stdlib_module();
    Arc::make_mut(&mut module.classes[0]).fq_name = u32::MAX;
    let mut source = ModuleClassDataSource::new();
    assert!(matches!(
        source.add_module(module),
        Err(crate::MetadataError::IndexOutOfRange { table: "qualified name", .. })
    ));
}
