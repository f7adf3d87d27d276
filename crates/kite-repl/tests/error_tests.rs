use super::*;

fn assert_send_sync<T: Send + Sync + 'static>() {}

#[test]
fn test_repl_error_crosses_threads() {
    assert_send_sync::<ReplError>();
    assert_send_sync::<ClasspathError>();
}

#[test]
fn test_vm_error_is_rendered_into_the_message() {
    let error = ReplError::from(VmError::DuplicateClass("Line1".to_string()));
    assert!(matches!(&error, ReplError::Vm(message) if message == "class Line1 is already defined"));
    assert_eq!(error.to_string(), "internal error: class Line1 is already defined");
}

#[test]
fn test_repl_error_converts_into_anyhow() {
    let result: ReplResult<()> = Err(ReplError::Unavailable("missing classpath".to_string()));
    let error = anyhow::Error::from(result.expect_err("error expected"));
    assert!(error.to_string().contains("missing classpath"));
}
