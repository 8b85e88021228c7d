//! End-to-end flow over the public API: administer devices, book and mutate
//! reservations, then persist through the snapshot store and carry on in a
//! fresh engine.

use lessor::model::DAY_MS;
use lessor::{ClassTag, Engine, EngineError, SnapshotStore, TermUnit};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

fn tmp_snapshot(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join("lessor_test_flow");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

#[tokio::test]
async fn full_rental_lifecycle_survives_restart() {
    init_tracing();
    let path = tmp_snapshot("lifecycle.snap");
    let store = SnapshotStore::new(&path);

    let day0 = now_ms() + 10 * DAY_MS;

    // Administer a small fleet and take bookings.
    let engine = Engine::from_snapshot(store.load().unwrap());
    engine
        .add_device(1, ClassTag::new('A').unwrap(), 4)
        .await
        .unwrap();
    engine
        .add_device(2, ClassTag::new('F').unwrap(), 16)
        .await
        .unwrap();

    let first = engine.reserve(1, TermUnit::Day, day0, 5, 0.0).await.unwrap();
    assert_eq!(first.reservation_id, 1);
    assert_eq!(first.fee, 140.0);

    let second = engine
        .reserve(2, TermUnit::Week, day0, 1, 0.25)
        .await
        .unwrap();
    assert_eq!(second.reservation_id, 2);

    engine.record_feedback("smooth booking".into()).await.unwrap();

    // Explicit save phase, outside any engine operation.
    store.save(&engine.snapshot().await).unwrap();
    drop(engine);

    // Restart: same state, counter keeps climbing.
    let engine = Engine::from_snapshot(store.load().unwrap());
    assert_eq!(engine.list_devices().await.len(), 2);
    assert_eq!(engine.feedbacks().await, vec!["smooth booking".to_string()]);
    assert_eq!(
        engine.device_schedule(1).await.unwrap(),
        vec![(day0, day0 + 5 * DAY_MS)]
    );

    // Extend the first booking, then move it to the other device; the
    // two-week slot on device 2 is already taken, so the move must wait for
    // a free window.
    let extended = engine.extend_reservation(1, 2, 0.0).await.unwrap();
    assert_eq!(extended.fee, 144.0);

    let blocked = engine.transfer_reservation(1, 2, 0.0).await;
    assert!(matches!(blocked, Err(EngineError::Unavailable(2))));

    let third = engine
        .reserve(1, TermUnit::Day, day0 + 8 * DAY_MS, 1, 0.0)
        .await
        .unwrap();
    assert_eq!(third.reservation_id, 3);

    // Cancellation with plenty of notice frees the slot.
    engine.cancel_reservation(3).await.unwrap();
    assert!(matches!(
        engine.reservation_by_id(3).await,
        Err(EngineError::UnknownReservation(3))
    ));

    // Tear down a device; its reservations go with it.
    engine.remove_device(2).await.unwrap();
    assert!(matches!(
        engine.reservation_by_id(2).await,
        Err(EngineError::UnknownReservation(2))
    ));

    // Final save and a round-trip identity check.
    let final_state = engine.snapshot().await;
    store.save(&final_state).unwrap();
    assert_eq!(store.load().unwrap(), final_state);
    assert_eq!(final_state.next_reservation_id, 4);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn fresh_store_starts_empty() {
    init_tracing();
    let path = tmp_snapshot("fresh.snap");
    let store = SnapshotStore::new(&path);

    let engine = Engine::from_snapshot(store.load().unwrap());
    assert!(engine.list_devices().await.is_empty());

    let invoice = engine
        .reserve(1, TermUnit::Day, now_ms() + DAY_MS, 1, 0.0)
        .await;
    assert!(matches!(invoice, Err(EngineError::UnknownDevice(1))));
}
