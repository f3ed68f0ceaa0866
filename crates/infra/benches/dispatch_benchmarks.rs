use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::Utc;
use peerfund_core::UserId;
use peerfund_events::{EventEnvelope, InMemoryEventBus};
use peerfund_infra::command_dispatcher::CommandDispatcher;
use peerfund_infra::event_store::InMemoryEventStore;
use peerfund_ledger::{
    IncrementAllotedAmt, LedgerAccount, LedgerCommand, MarkBankDetailsAdded, OpenAccount,
};
use std::sync::Arc;

type BenchDispatcher =
    CommandDispatcher<InMemoryEventStore, Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>>;

const STREAM: &str = "ledger.account";

fn setup() -> (BenchDispatcher, UserId) {
    let store = InMemoryEventStore::new();
    let bus: Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>> =
        Arc::new(InMemoryEventBus::new());
    let dispatcher = CommandDispatcher::new(store, bus);

    let user_id = UserId::new();
    dispatcher
        .dispatch::<LedgerAccount>(
            user_id,
            STREAM,
            LedgerCommand::Open(OpenAccount { user_id, occurred_at: Utc::now() }),
            LedgerAccount::empty,
        )
        .expect("open");
    dispatcher
        .dispatch::<LedgerAccount>(
            user_id,
            STREAM,
            LedgerCommand::MarkBankDetailsAdded(MarkBankDetailsAdded {
                user_id,
                occurred_at: Utc::now(),
            }),
            LedgerAccount::empty,
        )
        .expect("mark bank details");

    (dispatcher, user_id)
}

/// Dispatch latency as the user's stream grows: every command replays the
/// full history, so this tracks the rehydration cost.
fn bench_dispatch_with_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_with_history");

    for history_len in [10u64, 100, 1000] {
        let (dispatcher, user_id) = setup();
        for _ in 0..history_len {
            dispatcher
                .dispatch::<LedgerAccount>(
                    user_id,
                    STREAM,
                    LedgerCommand::IncrementAlloted(IncrementAllotedAmt {
                        user_id,
                        delta: 10,
                        occurred_at: Utc::now(),
                    }),
                    LedgerAccount::empty,
                )
                .expect("seed history");
        }

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(history_len),
            &history_len,
            |b, _| {
                b.iter(|| {
                    let committed = dispatcher
                        .dispatch::<LedgerAccount>(
                            black_box(user_id),
                            STREAM,
                            LedgerCommand::IncrementAlloted(IncrementAllotedAmt {
                                user_id,
                                delta: 1,
                                occurred_at: Utc::now(),
                            }),
                            LedgerAccount::empty,
                        )
                        .expect("dispatch");
                    black_box(committed.len())
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch_with_history);
criterion_main!(benches);
