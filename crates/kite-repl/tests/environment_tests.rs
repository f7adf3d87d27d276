use super::*;
use kite_bytecode::{AccessFlags, encode_class};
use kite_metadata::encode_module;

#[test]
fn test_stdlib_environment() {
    let environment = Environment::stdlib().expect("standard library environment loads");
    assert!(environment.classes.is_empty());
}

#[test]
fn test_missing_entries_are_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("nowhere");
    match Environment::load(std::slice::from_ref(&missing)) {
        Err(ClasspathError::Missing(path)) => assert_eq!(path, missing),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_classes_and_modules_are_read_from_directories() {
    let dir = tempfile::tempdir().expect("temp dir");
    let nested = dir.path().join("lib");
    fs::create_dir(&nested).expect("create dir");
    let class = ClassFile::new("GreeterKt", Some("kite/Any"), AccessFlags::PUBLIC);
    fs::write(nested.join("GreeterKt.kclass"), encode_class(&class)).expect("write class");
    let mut module = stdlib_module();
    module.name = "copy".to_string();
    fs::write(dir.path().join("copy.kmeta"), encode_module(&module)).expect("write module");
    fs::write(dir.path().join("notes.txt"), "ignored").expect("write notes");

    let environment = Environment::load(&[dir.path().to_path_buf()]).expect("classpath loads");
    assert_eq!(environment.classes.len(), 1);
    assert_eq!(&*environment.classes[0].name, "GreeterKt");
}

#[test]
fn test_single_file_entries() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("Main.kclass");
    let class = ClassFile::new("Main", Some("kite/Any"), AccessFlags::PUBLIC);
    fs::write(&path, encode_class(&class)).expect("write class");
    let environment = Environment::load(&[path]).expect("classpath loads");
    assert_eq!(environment.classes.len(), 1);
}

#[test]
fn test_corrupt_files_name_the_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("broken.kmeta");
    fs::write(&path, b"not metadata").expect("write module");
    match Environment::load(&[dir.path().to_path_buf()]) {
        Err(error @ ClasspathError::Metadata { .. }) => {
            assert!(error.to_string().starts_with(&path.display().to_string()), "{error}");
        }
        other => panic!("unexpected {other:?}"),
    }

    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("broken.kclass"), b"nope").expect("write class");
    assert!(matches!(
        Environment::load(&[dir.path().to_path_buf()]),
        Err(ClasspathError::ClassFormat { .. })
    ));
}
