//! # Stock Reconciler Testing
//!
//! In-memory doubles for the reconciler's two seams: the stock store and the
//! order-event delivery source.
//!
//! - [`mocks::InMemoryStockStore`] honors the all-or-nothing contract of
//!   `StockStore` by committing a scratch copy, and can inject storage
//!   failures per product.
//! - [`mocks::ScriptedOrderEvents`] replays scripted messages through a
//!   queue that honors requeue settlements the way a broker does: a
//!   requeued message returns to the queue head, marked redelivered.
//!
//! ## Example
//!
//! ```ignore
//! use stock_reconciler_core::{OrderEventSource, Reconciler};
//! use stock_reconciler_testing::mocks::{InMemoryStockStore, ScriptedOrderEvents};
//!
//! #[tokio::test]
//! async fn consumes_stock() {
//!     let store = InMemoryStockStore::new().with_stock(product, 10);
//!     let source = ScriptedOrderEvents::new();
//!     source.publish("order.created", payload);
//!
//!     let deliveries = source.deliveries().await.expect("stream opens");
//!     Reconciler::new(store.clone()).run(deliveries).await;
//!
//!     assert_eq!(store.stock(product), Some(8));
//! }
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data from a poisoned lock.
///
/// A panicking test thread must not cascade lock failures into every other
/// assertion against the shared double.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory implementations of the reconciler's seams.
pub mod mocks {
    use super::lock;
    use std::collections::{HashMap, VecDeque};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use stock_reconciler_core::delta::StockDelta;
    use stock_reconciler_core::source::{
        DeliveryStream, OrderDelivery, OrderEventSource, Settlement, Settler, SourceError,
    };
    use stock_reconciler_core::store::{StockStore, StockStoreError};
    use uuid::Uuid;

    /// Redelivery bound applied by [`ScriptedOrderEvents::publish`].
    ///
    /// The real broker redelivers without bound; the mock caps redeliveries
    /// so a permanently failing message cannot spin a test forever.
    pub const DEFAULT_REDELIVERY_CAP: u32 = 8;

    /// In-memory stock store with snapshot-commit atomicity and failure
    /// injection.
    ///
    /// Clones share state, so a test can hand one handle to the reconciler
    /// and keep another for assertions.
    #[derive(Debug, Clone, Default)]
    pub struct InMemoryStockStore {
        stocks: Arc<Mutex<HashMap<Uuid, i32>>>,
        // remaining injected storage failures per product
        failures: Arc<Mutex<HashMap<Uuid, u32>>>,
    }

    impl InMemoryStockStore {
        /// Create an empty store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Builder-style helper to seed a product's stock count.
        #[must_use]
        pub fn with_stock(self, product_id: Uuid, stock: i32) -> Self {
            self.set_stock(product_id, stock);
            self
        }

        /// Create or overwrite a product's stock count.
        pub fn set_stock(&self, product_id: Uuid, stock: i32) {
            lock(&self.stocks).insert(product_id, stock);
        }

        /// Current stock count, or `None` if the product does not exist.
        #[must_use]
        pub fn stock(&self, product_id: Uuid) -> Option<i32> {
            lock(&self.stocks).get(&product_id).copied()
        }

        /// Inject `times` storage failures for deltas touching `product_id`.
        ///
        /// Subsequent attempts succeed, which is how tests model a
        /// transient backend outage.
        pub fn fail_next(&self, product_id: Uuid, times: u32) {
            lock(&self.failures).insert(product_id, times);
        }

        fn take_injected_failure(&self, product_id: Uuid) -> bool {
            let mut failures = lock(&self.failures);
            match failures.get_mut(&product_id) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        }
    }

    impl StockStore for InMemoryStockStore {
        fn apply_deltas(
            &self,
            deltas: &[StockDelta],
        ) -> Pin<Box<dyn Future<Output = Result<(), StockStoreError>> + Send + '_>> {
            let deltas = deltas.to_vec();
            Box::pin(async move {
                let mut stocks = lock(&self.stocks);
                // Work on a scratch copy; commit only if every delta lands.
                let mut scratch = stocks.clone();
                for delta in &deltas {
                    if self.take_injected_failure(delta.product_id) {
                        return Err(StockStoreError::Storage(
                            "injected storage failure".to_string(),
                        ));
                    }
                    match scratch.get_mut(&delta.product_id) {
                        Some(stock) => *stock += delta.delta,
                        None => {
                            return Err(StockStoreError::ProductNotFound {
                                product_id: delta.product_id,
                            });
                        }
                    }
                }
                *stocks = scratch;
                Ok(())
            })
        }
    }

    struct QueuedMessage {
        routing_key: String,
        payload: Vec<u8>,
        redelivered: bool,
        redeliveries_left: u32,
    }

    /// Scripted delivery source backed by an in-memory queue.
    ///
    /// Settlements behave like a broker's: `Ack` and `Reject` remove the
    /// message permanently, `Requeue` returns it to the queue head marked
    /// redelivered. The stream ends when the queue drains, so a scripted
    /// run terminates deterministically.
    #[derive(Default)]
    pub struct ScriptedOrderEvents {
        queue: Arc<Mutex<VecDeque<QueuedMessage>>>,
        settlements: Arc<Mutex<Vec<Settlement>>>,
    }

    impl ScriptedOrderEvents {
        /// Create an empty source.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Enqueue a message with the [`DEFAULT_REDELIVERY_CAP`].
        pub fn publish(&self, routing_key: &str, payload: impl Into<Vec<u8>>) {
            self.publish_with_redelivery_cap(routing_key, payload, DEFAULT_REDELIVERY_CAP);
        }

        /// Enqueue a message that will be redelivered at most `cap` times.
        ///
        /// A cap of zero makes the first requeue settlement final, which
        /// lets tests observe a single failed attempt without looping.
        pub fn publish_with_redelivery_cap(
            &self,
            routing_key: &str,
            payload: impl Into<Vec<u8>>,
            cap: u32,
        ) {
            lock(&self.queue).push_back(QueuedMessage {
                routing_key: routing_key.to_string(),
                payload: payload.into(),
                redelivered: false,
                redeliveries_left: cap,
            });
        }

        /// Every settlement reported so far, in order.
        #[must_use]
        pub fn settlements(&self) -> Vec<Settlement> {
            lock(&self.settlements).clone()
        }
    }

    impl OrderEventSource for ScriptedOrderEvents {
        fn deliveries(
            &self,
        ) -> Pin<Box<dyn Future<Output = Result<DeliveryStream, SourceError>> + Send + '_>>
        {
            let queue = Arc::clone(&self.queue);
            let settlements = Arc::clone(&self.settlements);
            Box::pin(async move {
                let stream = async_stream::stream! {
                    loop {
                        let message = lock(&queue).pop_front();
                        let Some(message) = message else { break };
                        let settler = ScriptedSettler {
                            queue: Arc::clone(&queue),
                            settlements: Arc::clone(&settlements),
                            message,
                        };
                        yield Ok(OrderDelivery::new(
                            settler.message.routing_key.clone(),
                            settler.message.payload.clone(),
                            settler.message.redelivered,
                            Box::new(settler),
                        ));
                    }
                };
                Ok(Box::pin(stream) as DeliveryStream)
            })
        }
    }

    struct ScriptedSettler {
        queue: Arc<Mutex<VecDeque<QueuedMessage>>>,
        settlements: Arc<Mutex<Vec<Settlement>>>,
        message: QueuedMessage,
    }

    impl Settler for ScriptedSettler {
        fn settle(
            self: Box<Self>,
            settlement: Settlement,
        ) -> Pin<Box<dyn Future<Output = Result<(), SourceError>> + Send>> {
            Box::pin(async move {
                let this = *self;
                lock(&this.settlements).push(settlement);
                if settlement == Settlement::Requeue && this.message.redeliveries_left > 0 {
                    let mut message = this.message;
                    message.redelivered = true;
                    message.redeliveries_left -= 1;
                    // Back to the queue head, as the broker requeues.
                    lock(&this.queue).push_front(message);
                }
                Ok(())
            })
        }
    }
}

pub use mocks::{DEFAULT_REDELIVERY_CAP, InMemoryStockStore, ScriptedOrderEvents};
