use dialtrack::{
    Config, DBBuilder, EntityId, HistoryBackend, ManualClock, MemoryDirectory, SqliteBackend,
    StoredValue, TrackedEntity, UserId,
};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

const MINUTE: Duration = Duration::from_secs(60);
const E: EntityId = EntityId(11);

fn t0() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_699_963_200)
}

#[test]
fn test_history_survives_reopen() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dials.db");

    {
        let db = DBBuilder::new().sqlite_path(&path).build().unwrap();
        db.record_initial_value(E, 1, t0()).unwrap();
        db.record_initial_value(E, 2, t0() + MINUTE).unwrap();
        db.close().unwrap();
    }

    let db = DBBuilder::new().sqlite_path(&path).build().unwrap();
    assert_eq!(db.history_of(E).unwrap(), vec![1, 2]);
    assert_eq!(db.stats().unwrap().snapshot_count, 2);
}

#[test]
fn test_upsert_semantics_match_memory_backend() {
    let dir = TempDir::new().unwrap();
    let mut backend = SqliteBackend::open(dir.path().join("a.db"), true).unwrap();

    backend.upsert(E, 60, 3).unwrap();
    backend.upsert(E, 60, 3).unwrap();
    backend.upsert(E, 60, 4).unwrap();
    backend.upsert(E, 120, 5).unwrap();

    assert_eq!(
        backend.values(E).unwrap(),
        vec![StoredValue::new(60, 4), StoredValue::new(120, 5)]
    );
    assert_eq!(
        backend.values_in_range(E, 60, 120).unwrap(),
        vec![StoredValue::new(60, 4)]
    );
    assert_eq!(backend.value_at_or_before(E, 119).unwrap(), Some(4));
}

#[test]
fn test_uncommitted_work_is_rolled_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rollback.db");
    let db = DBBuilder::new().sqlite_path(&path).build().unwrap();
    db.record_initial_value(E, 1, t0()).unwrap();

    {
        let mut tx = db.begin().unwrap();
        tx.upsert_snapshot(E, t0() + MINUTE, 9).unwrap();
        tx.purge_history(EntityId(99)).unwrap();
    }

    assert_eq!(db.history_of(E).unwrap(), vec![1]);
}

#[test]
fn test_report_over_sqlite_history() {
    let dir = TempDir::new().unwrap();
    let directory = Arc::new(MemoryDirectory::new());
    directory.insert_entity(TrackedEntity::new(EntityId(1), UserId(1), "a", t0()));
    directory.insert_entity(TrackedEntity::new(EntityId(2), UserId(1), "b", t0()));

    let config = Config::default()
        .with_sqlite_path(dir.path().join("report.db"))
        .with_sqlite_wal(false);
    let db = DBBuilder::new()
        .config(config)
        .directory(directory)
        .clock(Arc::new(ManualClock::new(t0() + MINUTE * 10)))
        .build()
        .unwrap();

    db.record_initial_value(EntityId(1), 2, t0() - MINUTE).unwrap();
    db.record_initial_value(EntityId(2), 5, t0() + MINUTE).unwrap();

    let report = db
        .build_report(UserId(1), t0(), t0() + MINUTE * 3, MINUTE)
        .unwrap();
    // slot 0: (2 + 0) / 2 = 1; then (2 + 5) / 2 = 3.5 -> 4
    assert_eq!(report.values(), vec![1, 4, 4]);
}

#[test]
fn test_in_memory_sqlite() {
    let db = DBBuilder::new().sqlite_path(":memory:").build().unwrap();
    db.record_initial_value(E, 7, t0()).unwrap();
    assert_eq!(db.history_of(E).unwrap(), vec![7]);
}
