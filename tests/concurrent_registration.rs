mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use lifeline::test_utils::{TEST_DEADLINE, start_test_registry, wait_until};
use lifeline::{CleanupRegistry, ReaperConfig, RecordId, Tracked};

const THREADS: usize = 8;
const PER_THREAD: usize = 250;

#[test]
fn parallel_registrations_yield_distinct_live_records() {
    common::init_test_logging();
    let registry = CleanupRegistry::manual(ReaperConfig::default());
    let barrier = Arc::new(Barrier::new(THREADS));
    let targets: Vec<_> = (0..THREADS).map(Arc::new).collect();

    let workers: Vec<_> = targets
        .iter()
        .map(|target| {
            let registry = registry.clone();
            let barrier = Arc::clone(&barrier);
            let target = Arc::clone(target);
            thread::spawn(move || {
                barrier.wait();
                (0..PER_THREAD)
                    .map(|_| registry.register_fn(&target, || {}).unwrap().id())
                    .collect::<Vec<RecordId>>()
            })
        })
        .collect();

    let ids: HashSet<RecordId> = workers
        .into_iter()
        .flat_map(|worker| worker.join().unwrap())
        .collect();

    assert_eq!(ids.len(), THREADS * PER_THREAD);
    assert_eq!(registry.len(), THREADS * PER_THREAD);
    assert_eq!(registry.stats().total_registered, THREADS * PER_THREAD);

    drop(targets);
    assert_eq!(registry.collect(), THREADS * PER_THREAD);
    assert_eq!(registry.run_pending(), THREADS * PER_THREAD);
    assert!(registry.is_empty());
}

#[test]
fn every_action_runs_once_under_concurrent_churn() {
    common::init_test_logging();
    let registry = start_test_registry("churn-reaper").unwrap();
    let runs = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..THREADS)
        .map(|worker| {
            let registry = registry.clone();
            let runs = Arc::clone(&runs);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let counter = Arc::clone(&runs);
                    let action = move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    };
                    // Mix hook-driven and census-driven targets.
                    if (worker + i) % 2 == 0 {
                        let target = Tracked::new(i);
                        registry.register_fn(&target, action).unwrap();
                    } else {
                        let target = Arc::new(i);
                        registry.register_fn(&target, action).unwrap();
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let expected = THREADS * PER_THREAD;
    assert!(wait_until(TEST_DEADLINE, || runs.load(Ordering::SeqCst) == expected));
    assert!(wait_until(TEST_DEADLINE, || registry.is_empty()));

    let stats = registry.stats();
    assert_eq!(stats.total_cleaned, expected);
    assert_eq!(stats.total_failed, 0);
    assert_eq!(runs.load(Ordering::SeqCst), expected);
    registry.shutdown().unwrap();
}
