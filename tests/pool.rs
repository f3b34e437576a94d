mod common;

use std::thread;

use lifeline::pool::{RecyclableList, Recycler};
use lifeline::test_utils::{TEST_DEADLINE, start_test_registry, wait_until};
use lifeline::{CleanupRegistry, ReaperConfig};

#[test]
fn leaked_lists_return_their_slots_through_the_reaper() {
    common::init_test_logging();
    let registry = start_test_registry("pool-reaper").unwrap();
    let pool = RecyclableList::<u64>::pool(16, &registry);

    for round in 0..32u64 {
        let mut list = pool.acquire().unwrap();
        list.push(round);
        if round % 2 == 0 {
            assert!(pool.release(list));
        }
    }

    assert!(wait_until(TEST_DEADLINE, || pool.outstanding() == 0));
    let stats = pool.stats();
    assert_eq!(stats.total_abandoned, 16);
    assert!(stats.free <= stats.capacity);
    registry.shutdown().unwrap();
}

#[test]
fn threads_share_one_pool() {
    common::init_test_logging();
    let registry = CleanupRegistry::manual(ReaperConfig::default());
    let pool = RecyclableList::<String>::pool(8, &registry);

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let pool = pool.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    let mut list = RecyclableList::acquire_with_capacity(&pool, 4).unwrap();
                    assert!(!list.insert_since_recycled());
                    list.push(format!("{worker}-{i}"));
                    assert!(pool.release(list));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(pool.outstanding(), 0);
    assert!(pool.free_len() <= 8);
    assert!(registry.is_empty());
    assert_eq!(registry.stats().total_cancelled, 400);
}

#[test]
fn custom_recycler_resets_values() {
    let registry = CleanupRegistry::manual(ReaperConfig::default());
    let pool = Recycler::new(2, &registry, || String::with_capacity(32), String::clear);

    let mut text = pool.acquire().unwrap();
    text.push_str("stale request body");
    assert!(pool.release(text));

    let text = pool.acquire().unwrap();
    assert!(text.is_empty());
    assert!(text.capacity() >= 32);
    assert!(registry.contains(text.cleanup_handle()));
}
