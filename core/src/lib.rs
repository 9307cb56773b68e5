//! # Stock Reconciler Core
//!
//! Domain types and the reconciliation loop for the storefront's
//! inventory-reconciliation consumer.
//!
//! The storefront's order service publishes a lifecycle event to a topic
//! exchange whenever an order is committed or voided. This crate contains
//! everything needed to turn those events back into consistent stock counts:
//!
//! - [`event`] — the `OrderEvent` wire type and its strict JSON decoder
//! - [`delta`] — routing-key dispatch and per-item stock delta computation
//! - [`store`] — the transactional [`StockStore`](store::StockStore) abstraction
//! - [`source`] — the manually-acknowledged delivery-stream abstraction
//! - [`reconcile`] — the sequential worker loop tying the above together
//!
//! # Data Flow
//!
//! ```text
//! ┌──────────────┐
//! │Order Producer│
//! └──────┬───────┘
//!        │ order.created / order.cancelled
//!        ▼
//! ┌──────────────┐     ┌──────────────────────┐
//! │   exchange   │────▶│ product-stock-updates│
//! │   "orders"   │     │       (queue)        │
//! └──────────────┘     └──────────┬───────────┘
//!                                 │ one delivery at a time
//!                                 ▼
//!                       ┌──────────────────┐
//!                       │   Reconciler     │
//!                       └────────┬─────────┘
//!                                │ one transaction per event
//!                                ▼
//!                       ┌──────────────────┐     ack / nack
//!                       │   StockStore     │ ───────────────▶ broker
//!                       └──────────────────┘
//! ```
//!
//! # Delivery Semantics
//!
//! At-least-once with manual acknowledgement:
//! - a delivery is acked only after its transaction commits;
//! - a failed transaction nacks with requeue, so the broker redelivers;
//! - an undecodable payload nacks without requeue (poison-message guard).
//!
//! There is no idempotency record: a crash between commit and ack can
//! double-apply an event on redelivery. See [`reconcile::Reconciler::run`].
//!
//! This crate performs no I/O of its own; the `stock-reconciler-postgres`
//! and `stock-reconciler-amqp` crates implement the abstractions.

pub mod delta;
pub mod event;
pub mod reconcile;
pub mod source;
pub mod store;

pub use delta::{StockDelta, stock_multiplier};
pub use event::{DecodeError, LineItem, OrderEvent};
pub use reconcile::Reconciler;
pub use source::{DeliveryStream, OrderDelivery, OrderEventSource, Settlement, Settler, SourceError};
pub use store::{StockStore, StockStoreError};
