//! Reconciliation loop behavior against the in-memory doubles.
//!
//! Covers the per-message state machine end to end: delta direction per
//! topic, atomicity per event, poison-message handling, requeue on
//! transactional failure, and the zero-effect unknown-topic path.

#![allow(clippy::expect_used)] // Test code uses expect for clear failure messages

use serde_json::json;
use stock_reconciler_core::source::{OrderEventSource, Settlement};
use stock_reconciler_core::{Reconciler, delta};
use stock_reconciler_testing::mocks::{InMemoryStockStore, ScriptedOrderEvents};
use uuid::Uuid;

fn payload(order_id: Uuid, items: &[(Uuid, i32)]) -> Vec<u8> {
    let items: Vec<_> = items
        .iter()
        .map(|(product_id, quantity)| json!({ "product_id": product_id, "quantity": quantity }))
        .collect();
    json!({ "order_id": order_id, "items": items })
        .to_string()
        .into_bytes()
}

async fn run(store: &InMemoryStockStore, source: &ScriptedOrderEvents) {
    let deliveries = source.deliveries().await.expect("stream opens");
    Reconciler::new(store.clone()).run(deliveries).await;
}

#[tokio::test]
async fn created_event_consumes_stock() {
    let product = Uuid::new_v4();
    let store = InMemoryStockStore::new().with_stock(product, 10);
    let source = ScriptedOrderEvents::new();
    source.publish(
        delta::TOPIC_ORDER_CREATED,
        payload(Uuid::new_v4(), &[(product, 2)]),
    );

    run(&store, &source).await;

    assert_eq!(store.stock(product), Some(8));
    assert_eq!(source.settlements(), vec![Settlement::Ack]);
}

#[tokio::test]
async fn cancelled_event_restores_stock() {
    let product = Uuid::new_v4();
    let store = InMemoryStockStore::new().with_stock(product, 10);
    let source = ScriptedOrderEvents::new();
    source.publish(
        delta::TOPIC_ORDER_CANCELLED,
        payload(Uuid::new_v4(), &[(product, 2)]),
    );

    run(&store, &source).await;

    assert_eq!(store.stock(product), Some(12));
    assert_eq!(source.settlements(), vec![Settlement::Ack]);
}

#[tokio::test]
async fn multi_item_event_applies_every_item() {
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let store = InMemoryStockStore::new()
        .with_stock(first, 10)
        .with_stock(second, 5);
    let source = ScriptedOrderEvents::new();
    source.publish(
        delta::TOPIC_ORDER_CREATED,
        payload(Uuid::new_v4(), &[(first, 2), (second, 3)]),
    );

    run(&store, &source).await;

    assert_eq!(store.stock(first), Some(8));
    assert_eq!(store.stock(second), Some(2));
    assert_eq!(source.settlements(), vec![Settlement::Ack]);
}

#[tokio::test]
async fn malformed_payload_is_rejected_without_requeue() {
    let product = Uuid::new_v4();
    let store = InMemoryStockStore::new().with_stock(product, 10);
    let source = ScriptedOrderEvents::new();
    source.publish(delta::TOPIC_ORDER_CREATED, b"definitely not json".to_vec());
    // A valid event behind the poison message proves the loop keeps going.
    source.publish(
        delta::TOPIC_ORDER_CREATED,
        payload(Uuid::new_v4(), &[(product, 2)]),
    );

    run(&store, &source).await;

    assert_eq!(store.stock(product), Some(8));
    assert_eq!(
        source.settlements(),
        vec![Settlement::Reject, Settlement::Ack]
    );
}

#[tokio::test]
async fn failed_item_rolls_back_the_whole_event() {
    let known = Uuid::new_v4();
    let unknown = Uuid::new_v4();
    let store = InMemoryStockStore::new().with_stock(known, 10);
    let source = ScriptedOrderEvents::new();
    // Cap of zero: observe the single failed attempt without redelivery.
    source.publish_with_redelivery_cap(
        delta::TOPIC_ORDER_CREATED,
        payload(Uuid::new_v4(), &[(known, 2), (unknown, 3)]),
        0,
    );

    run(&store, &source).await;

    assert_eq!(store.stock(known), Some(10));
    assert_eq!(source.settlements(), vec![Settlement::Requeue]);
}

#[tokio::test]
async fn unknown_topic_is_a_zero_effect_ack() {
    // Anything matching `order.*` but outside the two lifecycle topics gets
    // a zero multiplier: the event runs through a transaction with
    // zero-effect deltas and is acked. Pinned here as explicit behavior.
    let product = Uuid::new_v4();
    let store = InMemoryStockStore::new().with_stock(product, 10);
    let source = ScriptedOrderEvents::new();
    source.publish("order.shipped", payload(Uuid::new_v4(), &[(product, 2)]));

    run(&store, &source).await;

    assert_eq!(store.stock(product), Some(10));
    assert_eq!(source.settlements(), vec![Settlement::Ack]);
}

#[tokio::test]
async fn unknown_topic_still_fails_on_missing_products() {
    // The zero-effect transaction still touches the rows, so a missing
    // product requeues exactly like a real delta would.
    let unknown = Uuid::new_v4();
    let store = InMemoryStockStore::new();
    let source = ScriptedOrderEvents::new();
    source.publish_with_redelivery_cap(
        "order.shipped",
        payload(Uuid::new_v4(), &[(unknown, 2)]),
        0,
    );

    run(&store, &source).await;

    assert_eq!(source.settlements(), vec![Settlement::Requeue]);
}

#[tokio::test]
async fn transient_failure_retries_without_double_apply() {
    // Attempt 1 hits an injected storage failure and requeues; attempt 2
    // succeeds. The committed effect must be a single application.
    let product = Uuid::new_v4();
    let store = InMemoryStockStore::new().with_stock(product, 10);
    store.fail_next(product, 1);
    let source = ScriptedOrderEvents::new();
    source.publish(
        delta::TOPIC_ORDER_CREATED,
        payload(Uuid::new_v4(), &[(product, 2)]),
    );

    run(&store, &source).await;

    assert_eq!(store.stock(product), Some(8));
    assert_eq!(
        source.settlements(),
        vec![Settlement::Requeue, Settlement::Ack]
    );
}

#[tokio::test]
async fn an_event_with_no_items_is_acked() {
    let store = InMemoryStockStore::new();
    let source = ScriptedOrderEvents::new();
    source.publish(delta::TOPIC_ORDER_CREATED, payload(Uuid::new_v4(), &[]));

    run(&store, &source).await;

    assert_eq!(source.settlements(), vec![Settlement::Ack]);
}
