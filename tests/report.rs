use dialtrack::{
    CancelToken, Config, DBBuilder, DialError, Dialtrack, EntityId, ErrorKind, ManualClock,
    MemoryDirectory, TrackedEntity, UserId,
};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const MINUTE: Duration = Duration::from_secs(60);
const VIEWER: UserId = UserId(1);

fn t0() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_699_963_200)
}

struct Setup {
    db: Dialtrack,
    directory: Arc<MemoryDirectory>,
}

fn setup(config: Config) -> Setup {
    let _ = env_logger::builder().is_test(true).try_init();
    let directory = Arc::new(MemoryDirectory::new());
    let db = DBBuilder::new()
        .config(config)
        .directory(directory.clone())
        .clock(Arc::new(ManualClock::new(t0() + MINUTE * 60)))
        .build()
        .unwrap();
    Setup { db, directory }
}

impl Setup {
    fn entity(&self, id: u64, owner: UserId, history: &[(SystemTime, i64)]) {
        self.directory
            .insert_entity(TrackedEntity::new(EntityId(id), owner, "dial", t0()));
        let mut tx = self.db.begin().unwrap();
        for &(ts, value) in history {
            tx.upsert_snapshot(EntityId(id), ts, value).unwrap();
        }
        tx.commit().unwrap();
    }
}

#[test]
fn test_empty_entity_set_reports_zero_for_every_slot() {
    let s = setup(Config::default());
    let report = s
        .db
        .build_report(VIEWER, t0(), t0() + MINUTE * 5, MINUTE)
        .unwrap();
    assert_eq!(report.values(), vec![0, 0, 0, 0, 0]);
    assert_eq!(report.records[0].timestamp, t0());
    assert_eq!(report.records[4].timestamp, t0() + MINUTE * 4);
}

#[test]
fn test_average_across_visible_entities() {
    let s = setup(Config::default());
    s.entity(1, VIEWER, &[(t0() - MINUTE, 3), (t0() + MINUTE * 2, 10)]);
    s.entity(2, VIEWER, &[(t0(), 4)]);
    // Not visible to the viewer.
    s.entity(3, UserId(2), &[(t0(), 100)]);

    let report = s
        .db
        .build_report(VIEWER, t0(), t0() + MINUTE * 4, MINUTE)
        .unwrap();
    // slot 0/1: (3 + 4) / 2 = 3.5 -> 4; slot 2/3: (10 + 4) / 2 = 7
    assert_eq!(report.values(), vec![4, 4, 7, 7]);
}

#[test]
fn test_membership_makes_entity_visible() {
    let s = setup(Config::default());
    s.entity(1, UserId(2), &[(t0(), 6)]);
    s.directory.add_member(EntityId(1), VIEWER, 0).unwrap();

    let report = s
        .db
        .build_report(VIEWER, t0(), t0() + MINUTE * 2, MINUTE)
        .unwrap();
    assert_eq!(report.values(), vec![6, 6]);
}

#[test]
fn test_report_rounding_matches_recompute() {
    let s = setup(Config::default());
    s.entity(1, VIEWER, &[(t0(), -3)]);
    s.entity(2, VIEWER, &[(t0(), -4)]);
    let report = s
        .db
        .build_report(VIEWER, t0(), t0() + MINUTE, MINUTE)
        .unwrap();
    assert_eq!(report.values(), vec![-4]);
}

#[test]
fn test_hourly_report_aligns_to_hour() {
    let s = setup(Config::default());
    let hour = Duration::from_secs(3600);
    s.entity(1, VIEWER, &[(t0() + MINUTE * 30, 8)]);

    let report = s
        .db
        .build_report(VIEWER, t0() + MINUTE * 20, t0() + hour * 2 + MINUTE, hour)
        .unwrap();
    assert_eq!(report.len(), 2);
    assert_eq!(report.records[0].timestamp, t0());
    assert_eq!(report.values(), vec![8, 8]);
}

#[test]
fn test_invalid_windows() {
    let s = setup(Config::default());
    let err = s
        .db
        .build_report(VIEWER, t0() + MINUTE, t0(), MINUTE)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidWindow);

    let err = s.db.build_report(VIEWER, t0(), t0(), MINUTE).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidWindow);

    let err = s
        .db
        .build_report(VIEWER, t0(), t0() + MINUTE, Duration::ZERO)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidWindow);
}

#[test]
fn test_slot_limit() {
    let s = setup(Config::default().with_max_report_slots(10));
    let err = s
        .db
        .build_report(VIEWER, t0(), t0() + MINUTE * 11, MINUTE)
        .unwrap_err();
    assert!(matches!(err, DialError::InvalidWindow(_)));
}

#[test]
fn test_entity_vanishing_mid_report_aborts() {
    let s = setup(Config::default());
    s.entity(1, VIEWER, &[(t0(), 1)]);
    s.entity(2, VIEWER, &[(t0(), 2)]);

    let tx = s.db.begin_as(VIEWER).unwrap();
    s.directory.remove_entity(EntityId(2));
    let err = tx
        .build_report_for(&[EntityId(1), EntityId(2)], t0(), t0() + MINUTE, MINUTE)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("entity 2"));
}

#[test]
fn test_cancelled_report() {
    let s = setup(Config::default());
    s.entity(1, VIEWER, &[(t0(), 1)]);

    let token = CancelToken::new();
    token.cancel();
    let tx = s.db.begin_as(VIEWER).unwrap().with_cancel(token);
    let err = tx
        .build_report(t0(), t0() + MINUTE, MINUTE)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[test]
fn test_report_reflects_recomputed_values() {
    let s = setup(Config::default());
    s.entity(1, VIEWER, &[(t0(), 0)]);
    s.directory.add_member(EntityId(1), UserId(2), 0).unwrap();

    s.db.set_contribution(UserId(2), EntityId(1), 8).unwrap();
    // now = t0 + 60min; the change lands in the last slot
    let report = s
        .db
        .build_report(VIEWER, t0() + MINUTE * 58, t0() + MINUTE * 61, MINUTE)
        .unwrap();
    assert_eq!(report.values(), vec![0, 0, 4]);
}
