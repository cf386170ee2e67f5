use chrono::{Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use potluck_core::codec::{decode_state, encode_state};
use potluck_core::id::SeededIds;
use potluck_core::model::{EventState, NewEvent};

/// (name, items, activities, voters per activity)
const TIERS: [(&str, usize, usize, usize); 3] =
    [("small", 5, 2, 3), ("medium", 30, 8, 10), ("large", 200, 30, 25)];

fn event(items: usize, activities: usize, voters: usize) -> EventState {
    let at = Utc
        .with_ymd_and_hms(2025, 7, 1, 10, 0, 0)
        .single()
        .expect("valid");
    let mut ids = SeededIds::new(0xC0DE, at);
    let dates = vec![at + Duration::days(30), at + Duration::days(37)];
    let mut state = EventState::create(
        NewEvent::new("Sommerfest", at).with_proposed_dates(dates),
        &mut ids,
        Duration::days(365),
    )
    .expect("create");

    for n in 0..items {
        state = state.add_item(&format!("Mitbringsel {n}"), &mut ids).expect("item");
        if n % 2 == 0 {
            let id = state.event_items[n].id.clone();
            state = state
                .assign_item(&id, &format!("Gast {n}"), &mut ids)
                .expect("assign");
        }
    }
    for n in 0..activities {
        state = state
            .add_activity(&format!("Aktivität {n}"), &mut ids)
            .expect("activity");
        let id = state.event_activities[n].id.clone();
        for v in 0..voters {
            state = state.vote_activity(&id, &format!("Gast {v}")).expect("vote");
        }
    }
    let first = state.proposed_dates[0].id.clone();
    for v in 0..voters {
        state = state
            .vote_date(&first, &format!("Gast {v}"), &mut ids)
            .expect("date vote");
    }
    state
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec.tiered");

    for (name, items, activities, voters) in TIERS {
        let state = event(items, activities, voters);
        let token = encode_state(&state);
        group.throughput(Throughput::Bytes(token.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", name), &state, |b, state| {
            b.iter(|| black_box(encode_state(state)));
        });

        group.bench_with_input(BenchmarkId::new("decode", name), &token, |b, token| {
            b.iter(|| black_box(decode_state(token)));
        });

        eprintln!("codec.{name}: token {} bytes", token.len());
    }

    group.finish();
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
