use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn test_lazy_value_computes_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let lazy = LazyValue::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        42
    });
    assert!(!lazy.is_computed());
    assert_eq!(*lazy.get(), 42);
    assert_eq!(*lazy.get(), 42);
    assert!(lazy.is_computed());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_ready_lazy_value() {
    let lazy = LazyValue::ready("done");
    assert!(lazy.is_computed());
    assert_eq!(*lazy.get(), "done");
}

#[test]
fn test_memoized_function_caches_absent_results() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let memo = MemoizedFunction::new(move |key: &u32| {
        counter.fetch_add(1, Ordering::SeqCst);
        (key % 2 == 0).then(|| key * 10)
    });

    assert_eq!(memo.invoke(&4), Some(40));
    assert_eq!(memo.invoke(&4), Some(40));
    assert_eq!(memo.invoke(&3), None);
    assert_eq!(memo.invoke(&3), None);
    assert!(memo.is_computed(&3));
    assert!(!memo.is_computed(&5));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(memo.computed_values(), vec![40]);
}

#[test]
fn test_memoized_function_first_writer_wins_under_races() {
    let memo = Arc::new(MemoizedFunction::new(|key: &u32| Some(*key + 1)));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let memo = Arc::clone(&memo);
            std::thread::spawn(move || memo.invoke(&7))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().expect("thread panicked"), Some(8));
    }
    assert_eq!(memo.len(), 1);
}
