use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use portal_core::{Portal, SharedPortal, DEFAULT_TITLE};
use portal_proto::{decode_update_json, Position, PortalUpdate, ResonatorEntries, ResonatorUpdate};

fn full_update(health: i64) -> PortalUpdate {
    PortalUpdate {
        faction: Some(1),
        resonators: Some(
            Position::ALL
                .iter()
                .map(|position| {
                    (
                        position.as_str().to_string(),
                        ResonatorUpdate {
                            level: 8,
                            health,
                            distance: 20,
                            owner: "bench".to_string(),
                        },
                    )
                })
                .collect::<ResonatorEntries>(),
        ),
        ..Default::default()
    }
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_update");

    for slots in [1usize, 4, 8] {
        group.bench_with_input(BenchmarkId::new("resonators", slots), &slots, |b, &slots| {
            let mut update = full_update(75);
            if let Some(entries) = update.resonators.as_mut() {
                entries.0.truncate(slots);
            }
            b.iter_batched(
                || SharedPortal::new(Portal::new(1, DEFAULT_TITLE)),
                |portal| portal.apply_update(&update),
                BatchSize::SmallInput,
            )
        });
    }

    group.bench_function("parse_and_apply", |b| {
        let payload = r#"{"title": "Bench", "faction": 2, "mods": ["FA", "T"],
            "resonators": {"N": {"level": 7, "health": 90, "distance": 3}}}"#;
        b.iter_batched(
            || SharedPortal::new(Portal::new(1, DEFAULT_TITLE)),
            |portal| portal.apply_update_json(payload),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let portal = SharedPortal::new(Portal::new(1, DEFAULT_TITLE));
    let _ = portal.apply_update(&full_update(60));

    let mut group = c.benchmark_group("render");
    group.bench_function("current", |b| b.iter(|| portal.render_current()));
    group.bench_function("legacy", |b| b.iter(|| portal.render_legacy()));
    group.bench_function("decode", |b| {
        b.iter(|| decode_update_json(r#"{"resonators": {"E": {"level": 3}}}"#))
    });
    group.finish();
}

criterion_group!(update_benches, bench_apply, bench_render);
criterion_main!(update_benches);
