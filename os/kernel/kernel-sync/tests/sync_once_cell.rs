use kernel_sync::{SpinMutex, SyncOnceCell};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn empty_until_initialized() {
    let cell = SyncOnceCell::<u32>::new();
    assert_eq!(cell.get(), None);

    assert_eq!(cell.try_init(|| 5), Some(&5));
    assert_eq!(cell.get(), Some(&5));
}

#[test]
fn second_init_is_refused_without_running() {
    let cell = SyncOnceCell::new();
    assert!(cell.try_init(|| 1u32).is_some());
    assert_eq!(cell.try_init(|| unreachable!()), None);
    assert_eq!(cell.get(), Some(&1));
}

#[test]
fn init_closure_sees_the_cell_as_empty() {
    let cell = SyncOnceCell::new();
    let value = cell.try_init(|| {
        // A re-entrant attempt loses to the one in progress.
        assert!(cell.get().is_none());
        assert!(cell.try_init(|| 0u8).is_none());
        9u8
    });
    assert_eq!(value, Some(&9));
}

#[test]
fn exactly_one_racing_initializer_wins() {
    let threads = 8;
    static CELL: SyncOnceCell<SpinMutex<usize>> = SyncOnceCell::new();
    let runs = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let runs = Arc::clone(&runs);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                CELL.try_init(|| {
                    runs.fetch_add(1, Ordering::SeqCst);
                    SpinMutex::new(i)
                })
                .is_some()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|&won| won)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(CELL.get().unwrap().with_lock(|v| *v) < threads);
}
