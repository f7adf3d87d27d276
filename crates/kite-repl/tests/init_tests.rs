use super::*;
use std::sync::mpsc;
use std::time::Duration;

#[test]
fn test_result_is_handed_over_once() {
    let init: BackgroundInit<u32, String> = BackgroundInit::spawn("test-init", || Ok(42)).expect("thread starts");
    assert!(matches!(init.wait(), Some(Ok(Ok(42)))));
    assert!(init.is_finished());
    assert!(init.wait().is_none());
}

#[test]
fn test_wait_blocks_until_the_worker_finishes() {
    let (release, gate) = mpsc::channel::<()>();
    let init: BackgroundInit<&'static str, String> = BackgroundInit::spawn("test-init", move || {
        gate.recv().map_err(|error| error.to_string())?;
        Ok("done")
    })
    .expect("thread starts");
    std::thread::sleep(Duration::from_millis(10));
    assert!(!init.is_finished());
    release.send(()).expect("worker is waiting");
    assert!(matches!(init.wait(), Some(Ok(Ok("done")))));
}

#[test]
fn test_failures_are_returned_to_the_waiting_thread() {
    let init: BackgroundInit<u32, String> =
        BackgroundInit::spawn("test-init", || Err("no classpath".to_string())).expect("thread starts");
    match init.wait() {
        Some(Ok(Err(message))) => assert_eq!(message, "no classpath"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_panics_become_errors() {
    let init: BackgroundInit<u32, String> =
        BackgroundInit::spawn("test-init", || panic!("environment exploded")).expect("thread starts");
    match init.wait() {
        Some(Err(ReplError::InitPanicked(message))) => assert_eq!(message, "environment exploded"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_ready_handles_do_not_block() {
    let init: BackgroundInit<u32, String> = BackgroundInit::ready(Ok(1));
    assert!(init.is_finished());
    assert!(matches!(init.wait(), Some(Ok(Ok(1)))));
}
