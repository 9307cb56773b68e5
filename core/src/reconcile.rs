//! The reconciliation loop: order events in, stock deltas out.
//!
//! A single sequential worker pulls one delivery at a time, decodes it,
//! derives the stock multiplier from the routing key, and applies every line
//! item's delta inside one transaction. The delivery is then settled based
//! on the outcome:
//!
//! ```text
//! Received ──▶ Decoding ──failure──▶ Reject (no requeue, terminal)
//!                 │
//!              success
//!                 ▼
//!           Delta computed (created → −1, cancelled → +1, other → 0)
//!                 │
//!                 ▼
//!            Transacting ──any item fails──▶ rollback ──▶ Requeue
//!                 │
//!            all items ok
//!                 ▼
//!              commit ──▶ Ack
//! ```
//!
//! One message is fully settled before the next is pulled, so no two
//! in-flight transactions from this path can race on the same product.
//! Throughput is traded for that simple transactional reasoning.

use crate::delta::stock_multiplier;
use crate::event::OrderEvent;
use crate::source::{DeliveryStream, OrderDelivery, Settlement};
use crate::store::StockStore;
use futures::StreamExt;

/// Sequential reconciliation worker over a stock store.
///
/// # Example
///
/// ```rust,ignore
/// use stock_reconciler_core::Reconciler;
///
/// let reconciler = Reconciler::new(store);
/// let deliveries = source.deliveries().await?;
/// reconciler.run(deliveries).await;
/// ```
pub struct Reconciler<S> {
    store: S,
}

impl<S: StockStore> Reconciler<S> {
    /// Create a reconciler over the given stock store.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Run until the delivery stream closes.
    ///
    /// Delivery semantics are at-least-once: a crash between transaction
    /// commit and ack leaves the message unacked, and the broker's
    /// redelivery will apply the event a second time. There is no
    /// idempotency record guarding against that; retries of a *failed*
    /// attempt are safe because the failed transaction rolled back.
    ///
    /// Failed transactions requeue indefinitely — there is no redelivery
    /// bound and no dead-letter destination. A message referencing a
    /// product that no longer exists will redeliver forever; the
    /// `reconciler.events.requeued` counter is the signal to watch.
    pub async fn run(&self, mut deliveries: DeliveryStream) {
        while let Some(next) = deliveries.next().await {
            match next {
                Ok(delivery) => self.process(delivery).await,
                Err(error) => {
                    tracing::warn!(error = %error, "Delivery stream error");
                }
            }
        }
        tracing::info!("Delivery stream closed, reconciler exiting");
    }

    /// Process and settle a single delivery.
    async fn process(&self, delivery: OrderDelivery) {
        let routing_key = delivery.routing_key().to_owned();

        let event = match OrderEvent::decode(delivery.payload()) {
            Ok(event) => event,
            Err(error) => {
                // Poison message: redelivery cannot make it parse.
                tracing::warn!(
                    routing_key = %routing_key,
                    error = %error,
                    "Dropping undecodable order event"
                );
                metrics::counter!("reconciler.events.dropped").increment(1);
                Self::finish(delivery, Settlement::Reject).await;
                return;
            }
        };

        let multiplier = stock_multiplier(&routing_key);
        let deltas = event.deltas(multiplier);

        match self.store.apply_deltas(&deltas).await {
            Ok(()) => {
                tracing::info!(
                    routing_key = %routing_key,
                    order_id = %event.order_id,
                    items = deltas.len(),
                    redelivered = delivery.redelivered(),
                    "Order event reconciled"
                );
                metrics::counter!("reconciler.events.processed", "topic" => routing_key)
                    .increment(1);
                Self::finish(delivery, Settlement::Ack).await;
            }
            Err(error) => {
                tracing::warn!(
                    routing_key = %routing_key,
                    order_id = %event.order_id,
                    error = %error,
                    "Stock update failed, requeueing order event"
                );
                metrics::counter!("reconciler.events.requeued").increment(1);
                Self::finish(delivery, Settlement::Requeue).await;
            }
        }
    }

    /// Settle a delivery, downgrading settlement failures to a log record:
    /// the broker will redeliver whatever it never saw settled.
    async fn finish(delivery: OrderDelivery, settlement: Settlement) {
        if let Err(error) = delivery.settle(settlement).await {
            tracing::warn!(
                settlement = ?settlement,
                error = %error,
                "Failed to settle delivery, broker may redeliver"
            );
        }
    }
}
