use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use dialtrack::compute::slots::reconstruct;
use dialtrack::{DBBuilder, EntityId, ManualClock, MemoryDirectory, TrackedEntity, UserId, ValueSnapshot, Window};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const MINUTE: Duration = Duration::from_secs(60);

fn t0() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_699_963_200)
}

fn benchmark_reconstruction(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruction");

    for &slots in &[60u32, 1_440, 10_080] {
        let window = Window::new(t0(), t0() + MINUTE * slots, MINUTE).unwrap();
        // One transition every seven minutes.
        let snapshots: Vec<ValueSnapshot> = (0..slots)
            .step_by(7)
            .map(|i| ValueSnapshot::new(EntityId(1), t0() + MINUTE * i, i64::from(i % 10)))
            .collect();

        group.bench_with_input(BenchmarkId::new("dense_slots", slots), &slots, |b, _| {
            b.iter(|| reconstruct(black_box(3), black_box(&snapshots), black_box(&window)))
        });
    }

    group.finish();
}

fn benchmark_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("report");

    for &entities in &[1u64, 10, 50] {
        let directory = Arc::new(MemoryDirectory::new());
        let db = DBBuilder::new()
            .directory(directory.clone())
            .clock(Arc::new(ManualClock::new(t0() + MINUTE * 1_440)))
            .build()
            .unwrap();

        for id in 0..entities {
            directory.insert_entity(TrackedEntity::new(EntityId(id), UserId(1), "bench", t0()));
            let mut tx = db.begin().unwrap();
            for minute in (0..1_440u32).step_by(15) {
                tx.upsert_snapshot(EntityId(id), t0() + MINUTE * minute, (minute % 11) as i64)
                    .unwrap();
            }
            tx.commit().unwrap();
        }

        group.bench_with_input(
            BenchmarkId::new("day_by_minute", entities),
            &entities,
            |b, _| {
                b.iter(|| {
                    db.build_report(
                        UserId(1),
                        black_box(t0()),
                        black_box(t0() + MINUTE * 1_440),
                        MINUTE,
                    )
                    .unwrap()
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_reconstruction, benchmark_report);
criterion_main!(benches);
