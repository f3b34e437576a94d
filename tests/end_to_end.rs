mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lifeline::test_utils::{TEST_DEADLINE, start_test_registry, wait_until};
use lifeline::{CleanupRegistry, ReaperConfig, Tracked};
use parking_lot::Mutex;

#[test]
fn only_the_unreachable_target_is_cleaned() {
    common::init_test_logging();
    let registry = start_test_registry("e2e-selective").unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let x = Arc::new("x");
    let y = Arc::new("y");
    let x_log = Arc::clone(&log);
    let x_handle = registry
        .register_fn(&x, move || x_log.lock().push(1))
        .unwrap();
    let y_log = Arc::clone(&log);
    let y_handle = registry
        .register_fn(&y, move || y_log.lock().push(2))
        .unwrap();

    drop(x);
    registry.collect();

    assert!(wait_until(TEST_DEADLINE, || *log.lock() == vec![1]));
    assert!(wait_until(TEST_DEADLINE, || !registry.contains(&x_handle)));
    assert!(registry.contains(&y_handle));
    assert_eq!(*log.lock(), vec![1]);

    drop(y);
    registry.shutdown().unwrap();
}

#[test]
fn failing_action_does_not_stop_later_cleanups() {
    common::init_test_logging();
    let registry = start_test_registry("e2e-failure").unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let failures = Arc::new(AtomicUsize::new(0));
    let failure_count = Arc::clone(&failures);
    registry.set_failure_hook(move |_| {
        failure_count.fetch_add(1, Ordering::SeqCst);
    });

    let z = Tracked::new("z");
    let w = Tracked::new("w");
    registry
        .register_fn(&z, || panic!("z refuses to close"))
        .unwrap();
    let w_log = Arc::clone(&log);
    registry
        .register_fn(&w, move || w_log.lock().push(3))
        .unwrap();

    drop(z);
    drop(w);
    registry.collect();

    assert!(wait_until(TEST_DEADLINE, || log.lock().contains(&3)));
    assert!(wait_until(TEST_DEADLINE, || failures.load(Ordering::SeqCst) == 1));
    assert!(wait_until(TEST_DEADLINE, || registry.is_empty()));
    assert!(registry.is_dispatcher_running());
    assert_eq!(registry.stats().dispatcher_restarts, 0);

    registry.shutdown().unwrap();
}

#[test]
fn default_hook_logs_and_keeps_going() {
    common::init_test_logging();
    let registry = CleanupRegistry::manual(ReaperConfig::default());
    let ran = Arc::new(AtomicUsize::new(0));

    let broken = Arc::new(1u8);
    let fine = Arc::new(2u8);
    registry
        .register_fallible(&broken, || anyhow::bail!("descriptor already closed"))
        .unwrap();
    let counter = Arc::clone(&ran);
    registry
        .register_fn(&fine, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    drop(broken);
    drop(fine);
    assert_eq!(registry.collect(), 2);
    assert_eq!(registry.run_pending(), 2);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert_eq!(registry.stats().total_failed, 1);
}

#[test]
fn clear_races_with_the_reaper_but_never_double_runs() {
    common::init_test_logging();
    let registry = start_test_registry("e2e-clear-race").unwrap();
    let runs = Arc::new(AtomicUsize::new(0));
    let mut cleared = 0;

    for _ in 0..200 {
        let target = Tracked::new(());
        let counter = Arc::clone(&runs);
        let handle = registry
            .register_fn(&target, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        drop(target);
        if handle.clear() {
            cleared += 1;
        }
    }

    assert!(wait_until(TEST_DEADLINE, || registry.is_empty()));
    assert_eq!(runs.load(Ordering::SeqCst) + cleared, 200);

    let stats = registry.stats();
    assert_eq!(stats.total_cancelled, cleared);
    assert_eq!(stats.total_cleaned + stats.total_cancelled, 200);
    registry.shutdown().unwrap();
}

#[test]
fn reaper_with_default_census_interval_runs_cleanups() {
    common::init_test_logging();
    let config = ReaperConfig {
        lower_priority: false,
        ..ReaperConfig::default()
    };
    let registry = CleanupRegistry::start(config).unwrap();
    let runs = Arc::new(AtomicUsize::new(0));

    let target = Tracked::new(vec![0u8; 128]);
    let counter = Arc::clone(&runs);
    registry
        .register_fn(&target, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    drop(target);

    assert!(wait_until(TEST_DEADLINE, || runs.load(Ordering::SeqCst) == 1));
    registry.shutdown().unwrap();
}
