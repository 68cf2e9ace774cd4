//! Registry lifecycle integration tests
//!
//! Exercises the registry the way a bridge module uses it:
//! - Concurrent lookups against use-counted objects
//! - Tag based release when an SDK instance goes away
//! - The background cleanup task and service shutdown

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use object_registry::{
    spawn_cleanup_task, ObjectRegistry, PasswordBuffer, RegistryConfig, RegistryError, RegistryService,
    ReleasePolicy, SecureData,
};

fn registry() -> Arc<ObjectRegistry> {
    Arc::new(ObjectRegistry::new(RegistryConfig::default().with_debug(true)))
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_use_counts_every_use_once() {
    const USES: usize = 64;

    let registry = registry();
    let id = registry
        .register(SecureData::new(b"k".to_vec()), None, &[ReleasePolicy::after_use(USES as u32)])
        .unwrap();
    let successes = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let successes = Arc::clone(&successes);
            let id = id.clone();
            thread::spawn(move || {
                for _ in 0..16 {
                    if registry.use_object::<SecureData>(&id).is_some() {
                        successes.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // 128 attempts, exactly the allowed number succeed
    assert_eq!(successes.load(Ordering::SeqCst), USES);
    assert!(!registry.contains(&id));
    assert_eq!(registry.sweep(), 1);
    assert_eq!(registry.sweep(), 0);
}

#[test]
fn test_object_outlives_registry_entry_while_borrowed() {
    let registry = registry();
    let id = registry
        .register(SecureData::new(b"key".to_vec()), None, &[ReleasePolicy::after_use(1)])
        .unwrap();

    let held = registry.use_object::<SecureData>(&id).unwrap();
    assert_eq!(registry.sweep(), 1);
    assert!(registry.find::<SecureData>(&id).is_none());

    // The caller's reference stays valid after the sweep.
    assert_eq!(held.as_bytes(), b"key");
    assert_eq!(Arc::strong_count(&held), 1);
}

#[test]
fn test_concurrent_registration_with_same_id() {
    let registry = registry();
    let handles: Vec<_> = (0..8u32)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.register_with_id(i, "singleton", None, &[ReleasePolicy::Manual]))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, RegistryError::AlreadyRegistered(_))));
    assert_eq!(registry.len(), 1);
}

// =============================================================================
// Tags
// =============================================================================

#[test]
fn test_instance_teardown_by_tag() {
    let registry = registry();
    let mut password = PasswordBuffer::new();
    for ch in "0000".chars() {
        password.add_character(ch as u32).unwrap();
    }
    let pwd = registry
        .register(password, Some("instance-a"), &[ReleasePolicy::keep_alive(5_000)])
        .unwrap();
    let enc = registry
        .register(SecureData::new(vec![1, 2, 3]), Some("instance-a"), &[ReleasePolicy::Manual])
        .unwrap();
    let other = registry
        .register(SecureData::new(vec![4]), Some("instance-b"), &[ReleasePolicy::Manual])
        .unwrap();

    assert_eq!(registry.remove_all_with_tag(Some("instance-a")), 2);
    assert!(!registry.contains(&pwd));
    assert!(!registry.contains(&enc));
    assert!(registry.contains(&other));
    assert_eq!(registry.remove_all_with_tag(Some("instance-a")), 0);
}

// =============================================================================
// Cleanup Task & Service
// =============================================================================

#[tokio::test]
async fn test_keep_alive_object_survives_while_touched() {
    let service = RegistryService::start(RegistryConfig::default().with_cleanup_period_ms(100)).unwrap();
    let registry = Arc::clone(service.registry());
    let id = registry.register(7u64, None, &[ReleasePolicy::keep_alive(300)]).unwrap();

    for _ in 0..8 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(registry.touch::<u64>(&id).is_some());
    }

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(!registry.contains(&id));
    assert_eq!(registry.len(), 0);

    service.shutdown().await;
}

#[tokio::test]
async fn test_period_change_applies_to_running_task() {
    let service = RegistryService::start(RegistryConfig::default().with_cleanup_period_ms(500)).unwrap();
    let registry = Arc::clone(service.registry());

    // Let the task enter its first 500 ms wait before shortening the period.
    tokio::time::sleep(Duration::from_millis(20)).await;
    registry.set_cleanup_period(100).unwrap();
    tokio::time::sleep(Duration::from_millis(550)).await;

    // With the old period the next tick would be ~1000 ms in, after the checks below.
    registry.register(1u8, None, &[ReleasePolicy::expire(50)]).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(registry.len(), 0);
    assert_eq!(registry.stats().evictions, 1);

    service.shutdown().await;
}

#[test]
fn test_service_shutdown_in_blocking_context() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let service = {
        let _guard = runtime.enter();
        RegistryService::start(RegistryConfig::default()).unwrap()
    };
    let registry = Arc::clone(service.registry());
    registry.register(1u8, Some("t"), &[ReleasePolicy::Manual]).unwrap();

    runtime.block_on(service.shutdown());
    assert!(registry.is_empty());
    assert_eq!(registry.stats().removals, 1);
}

#[test]
fn test_cleanup_task_stopped_from_sync_caller() {
    let registry = Arc::new(ObjectRegistry::new(RegistryConfig::default().with_cleanup_period_ms(100)));

    tokio_test::block_on(async {
        let task = spawn_cleanup_task(Arc::clone(&registry));
        let id = tokio_test::assert_ok!(registry.register(1u8, None, &[ReleasePolicy::expire(100)]));
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(!registry.contains(&id));

        task.stop().await;
    });

    // The stopped task no longer holds the registry.
    assert_eq!(Arc::strong_count(&registry), 1);
    assert_eq!(registry.stats().evictions, 1);
}
