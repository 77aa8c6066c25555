use super::*;
use crate::error::TechnicalException;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn test_compiles_once_and_shares_the_unit() {
    let cell = CompileCell::new("app/home");
    let first = cell
        .get_or_compile(|| Ok(CompiledUnit::new("home", 42_u32)))
        .unwrap();
    let second = cell
        .get_or_compile(|| panic!("must not compile twice"))
        .unwrap();
    assert_eq!(first.downcast_ref::<u32>(), Some(&42));
    assert_eq!(second.downcast_ref::<u32>(), Some(&42));
    assert_eq!(cell.compilations(), 1);
    assert_eq!(cell.state().name(), "ready");
}

#[test]
fn test_failure_is_permanent() {
    let cell = CompileCell::new("app/broken");
    let err = cell
        .get_or_compile(|| Err(TechnicalException::new("syntax error at line 3")))
        .unwrap_err();
    assert_eq!(err.message(), "syntax error at line 3");

    let again = cell
        .get_or_compile(|| Ok(CompiledUnit::new("fixed", ())))
        .unwrap_err();
    assert_eq!(again.message(), "syntax error at line 3");
    assert_eq!(cell.compilations(), 1);
    assert_eq!(cell.state().name(), "failed");
}

#[test]
fn test_concurrent_callers_share_one_compilation() {
    let cell = Arc::new(CompileCell::new("app/slow"));
    let runs = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cell = Arc::clone(&cell);
            let runs = Arc::clone(&runs);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cell.get_or_compile(|| {
                    runs.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(50));
                    Ok(CompiledUnit::new("slow", String::from("artifact")))
                })
                .map(|unit| unit.downcast_ref::<String>().cloned())
            })
        })
        .collect();

    for handle in handles {
        let unit = handle.join().unwrap().unwrap();
        assert_eq!(unit.as_deref(), Some("artifact"));
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(cell.compilations(), 1);
}

#[test]
fn test_concurrent_callers_all_see_the_failure() {
    let cell = Arc::new(CompileCell::new("app/bad"));
    let barrier = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cell = Arc::clone(&cell);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cell.get_or_compile(|| {
                    thread::sleep(Duration::from_millis(20));
                    Err(TechnicalException::new("cannot compile"))
                })
                .map(|_| ())
                .map_err(|e| e.message().to_string())
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Err("cannot compile".to_string()));
    }
    assert_eq!(cell.compilations(), 1);
}

#[test]
fn test_panic_during_compilation_marks_the_cell_failed() {
    let cell = Arc::new(CompileCell::new("app/panics"));
    let c = Arc::clone(&cell);
    let joined = thread::spawn(move || {
        let _ = c.get_or_compile(|| panic!("engine bug"));
    })
    .join();
    assert!(joined.is_err());

    let err = cell
        .get_or_compile(|| Ok(CompiledUnit::new("late", ())))
        .unwrap_err();
    assert!(err.message().contains("aborted by a panic"));
}

#[test]
fn test_registry_hands_out_one_cell_per_key() {
    let cache = ArtifactCache::new();
    let a = cache.cell("app/a");
    let a2 = cache.cell("app/a");
    let b = cache.cell("app/b");
    assert!(Arc::ptr_eq(&a, &a2));
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 2);

    a.get_or_compile(|| Ok(CompiledUnit::new("a", ()))).unwrap();
    let _ = b.get_or_compile(|| Err(TechnicalException::new("nope")));
    assert_eq!(
        cache.stats(),
        CacheStats {
            uninitialized: 0,
            in_progress: 0,
            ready: 1,
            failed: 1
        }
    );
}
