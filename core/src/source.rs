//! Delivery-stream abstraction over the order-events queue.
//!
//! The broker side of the reconciler is modelled as a stream of
//! [`OrderDelivery`] values under manual acknowledgement: every delivery
//! yielded by the stream must be settled exactly once with ack, reject, or
//! requeue. The loop itself decides the outcome per message, so the
//! settlement handle travels with the delivery instead of being committed
//! implicitly by the transport.

use futures::Stream;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors from a delivery source.
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// Failed to open the delivery stream.
    #[error("failed to open delivery stream: {0}")]
    ConnectionFailed(String),

    /// Network or transport error while receiving a delivery.
    #[error("transport error: {0}")]
    Transport(String),

    /// Failed to report a settlement back to the broker.
    #[error("failed to settle delivery: {0}")]
    Settle(String),
}

/// Terminal outcome reported to the broker for one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Processing succeeded; remove the message permanently. Single
    /// message, never a multi-ack batch.
    Ack,
    /// Poison message; drop permanently without redelivery.
    Reject,
    /// Transient failure; return the message to the queue for redelivery.
    Requeue,
}

/// Settles one delivery with the broker.
///
/// One-shot by construction: `settle` consumes the handle, so a delivery
/// cannot be acknowledged twice.
pub trait Settler: Send {
    /// Report the delivery's outcome to the broker.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Settle`] if the broker rejects or loses the
    /// acknowledgement. The message is then left to the broker's
    /// unacked-redelivery behavior.
    fn settle(
        self: Box<Self>,
        settlement: Settlement,
    ) -> Pin<Box<dyn Future<Output = Result<(), SourceError>> + Send>>;
}

/// A single in-flight order-event delivery awaiting settlement.
pub struct OrderDelivery {
    routing_key: String,
    payload: Vec<u8>,
    redelivered: bool,
    settler: Box<dyn Settler>,
}

impl OrderDelivery {
    /// Create a delivery from its wire parts and settlement handle.
    #[must_use]
    pub fn new(
        routing_key: String,
        payload: Vec<u8>,
        redelivered: bool,
        settler: Box<dyn Settler>,
    ) -> Self {
        Self {
            routing_key,
            payload,
            redelivered,
            settler,
        }
    }

    /// Routing key (topic) the producer published the message under.
    #[must_use]
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Raw message payload.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Whether the broker has delivered this message before.
    #[must_use]
    pub const fn redelivered(&self) -> bool {
        self.redelivered
    }

    /// Consume the delivery, reporting its outcome to the broker.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Settle`] if the acknowledgement cannot be
    /// delivered.
    pub async fn settle(self, settlement: Settlement) -> Result<(), SourceError> {
        self.settler.settle(settlement).await
    }
}

impl fmt::Debug for OrderDelivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderDelivery")
            .field("routing_key", &self.routing_key)
            .field("payload_len", &self.payload.len())
            .field("redelivered", &self.redelivered)
            .finish_non_exhaustive()
    }
}

/// Stream of deliveries from the bound queue.
///
/// Each item is a `Result`: transport errors surface in-stream so a blip
/// does not terminate consumption. The stream ends when the underlying
/// consumer is closed.
pub type DeliveryStream = Pin<Box<dyn Stream<Item = Result<OrderDelivery, SourceError>> + Send>>;

/// Source of order-event deliveries (the consumer side of the bound queue).
///
/// Note: returns `Pin<Box<dyn Future>>` instead of `async fn` to stay
/// dyn-compatible (object-safe).
pub trait OrderEventSource: Send + Sync {
    /// Open the delivery stream under manual acknowledgement.
    ///
    /// Every yielded delivery must be settled exactly once; unsettled
    /// deliveries are redelivered by the broker after the consumer goes
    /// away.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::ConnectionFailed`] if consumption cannot be
    /// started.
    fn deliveries(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<DeliveryStream, SourceError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_event_source_is_dyn_compatible() {
        fn assert_dyn(_: Option<&dyn OrderEventSource>) {}
        assert_dyn(None);
    }

    #[test]
    fn delivery_debug_does_not_dump_payloads() {
        struct NoopSettler;
        impl Settler for NoopSettler {
            fn settle(
                self: Box<Self>,
                _settlement: Settlement,
            ) -> Pin<Box<dyn Future<Output = Result<(), SourceError>> + Send>> {
                Box::pin(async { Ok(()) })
            }
        }

        let delivery = OrderDelivery::new(
            "order.created".to_string(),
            vec![0; 1024],
            false,
            Box::new(NoopSettler),
        );
        let rendered = format!("{delivery:?}");
        assert!(rendered.contains("order.created"));
        assert!(rendered.contains("1024"));
    }
}
