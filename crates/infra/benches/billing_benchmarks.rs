use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use blockbill_accounts::{AccountId, Address};
use blockbill_core::{AggregateId, FixedClock};
use blockbill_events::{EventEnvelope, InMemoryEventBus};
use blockbill_infra::{
    BillingConfig, BillingEngine, InMemoryEventStore, PaymentRequest, ScriptedGateway,
};
use blockbill_ledger::Currency;
use blockbill_orders::OrderId;

type BenchEngine = BillingEngine<
    InMemoryEventStore,
    InMemoryEventBus<EventEnvelope<serde_json::Value>>,
    Arc<ScriptedGateway>,
    Arc<FixedClock>,
>;

fn bench_engine() -> BenchEngine {
    BillingEngine::new(
        InMemoryEventStore::new(),
        InMemoryEventBus::new(),
        Arc::new(ScriptedGateway::approving()),
        Arc::new(FixedClock::at(Utc::now())),
        BillingConfig::default(),
    )
}

fn usd() -> Currency {
    Currency::new("usd").unwrap()
}

fn bench_address() -> Address {
    Address {
        line1: "1 Ledger Way".into(),
        line2: None,
        city: "Springfield".into(),
        region: None,
        postal_code: "12345".into(),
        country: "US".into(),
    }
}

fn account_with_address(engine: &BenchEngine) -> AccountId {
    let account = engine.create_account(None).unwrap();
    let account_id = account.id_typed();
    engine.assign_address(account_id, bench_address()).unwrap();
    account_id
}

fn approved_order(engine: &BenchEngine, account_id: AccountId, lines: usize) -> OrderId {
    let order = engine.create_order(account_id, None, None).unwrap();
    let order_id = order.id_typed();
    for _ in 0..lines {
        engine
            .add_order_line(order_id, 1000, usd(), Decimal::ONE, None, None)
            .unwrap();
    }
    engine.submit_order(order_id).unwrap();
    engine.approve_order(order_id).unwrap();
    order_id
}

fn bench_order_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_pipeline");

    group.bench_function("create_order_fresh", |b| {
        let engine = bench_engine();
        let account_id = account_with_address(&engine);
        b.iter(|| {
            engine
                .create_order(black_box(account_id), None, None)
                .unwrap();
        });
    });

    for lines in [1usize, 10, 50] {
        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(
            BenchmarkId::new("generate_invoice", lines),
            &lines,
            |b, &lines| {
                let engine = bench_engine();
                let account_id = account_with_address(&engine);
                b.iter_batched(
                    || approved_order(&engine, account_id, lines),
                    |order_id| engine.generate_invoice(black_box(order_id)).unwrap(),
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_payment(c: &mut Criterion) {
    let mut group = c.benchmark_group("payment");

    group.bench_function("pay_invoice_charge", |b| {
        let engine = bench_engine();
        let account_id = account_with_address(&engine);
        b.iter_batched(
            || {
                let order_id = approved_order(&engine, account_id, 1);
                engine.generate_invoice(order_id).unwrap().1.id_typed()
            },
            |invoice_id| {
                engine
                    .pay_invoice(
                        invoice_id,
                        PaymentRequest::Charge {
                            amount: 1000,
                            currency: usd(),
                            token: "tok_bench".into(),
                        },
                    )
                    .unwrap()
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_order_pipeline, bench_payment);
criterion_main!(benches);
