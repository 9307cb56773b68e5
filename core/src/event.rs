//! Order lifecycle events consumed from the storefront's message bus.
//!
//! One event is carried per message. The wire format is JSON:
//!
//! ```json
//! {
//!   "order_id": "5e3c5a86-0a6c-4f3a-9a33-7a4f6a2050c1",
//!   "items": [
//!     { "product_id": "d2a7f4b1-9c0e-4b9f-8a1d-3f5aa1c9e2b4", "quantity": 2 }
//!   ]
//! }
//! ```
//!
//! Decoding is strict about structure: a missing field or a type mismatch is
//! a [`DecodeError`], never a partially-filled event. Unknown extra fields
//! are ignored, so producers can evolve the payload additively.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error returned when a message payload cannot be decoded.
///
/// Decode failures are terminal for the delivery that carried them: the
/// reconciliation loop rejects the message without requeue and moves on.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Payload was not valid JSON or did not match the event shape.
    #[error("invalid order event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// One ordered line item within an order event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product the quantity applies to.
    pub product_id: Uuid,
    /// Number of units ordered. Positive by producer contract.
    pub quantity: i32,
}

/// A single order lifecycle event.
///
/// Events are transient: decoded per delivery, reconciled as one
/// transactional unit, and discarded after ack or definitive drop. This
/// consumer never persists them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Identifier of the order the event belongs to.
    pub order_id: Uuid,
    /// Line items, in payload order. All items of one event are applied
    /// together or not at all.
    pub items: Vec<LineItem>,
}

impl OrderEvent {
    /// Decode an event from a raw message payload.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidPayload`] on any structural or type
    /// mismatch. The caller must treat this as a poison message: reject
    /// without requeue, since redelivery cannot make the payload parse.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(payload)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_a_valid_event() {
        let order_id = Uuid::new_v4();
        let product_id = Uuid::new_v4();
        let payload = json!({
            "order_id": order_id,
            "items": [{ "product_id": product_id, "quantity": 2 }],
        });

        let event = OrderEvent::decode(payload.to_string().as_bytes()).unwrap();
        assert_eq!(event.order_id, order_id);
        assert_eq!(
            event.items,
            vec![LineItem {
                product_id,
                quantity: 2
            }]
        );
    }

    #[test]
    fn decodes_an_event_with_no_items() {
        let payload = json!({ "order_id": Uuid::new_v4(), "items": [] });
        let event = OrderEvent::decode(payload.to_string().as_bytes()).unwrap();
        assert!(event.items.is_empty());
    }

    #[test]
    fn ignores_unknown_fields() {
        let payload = json!({
            "order_id": Uuid::new_v4(),
            "items": [],
            "placed_by": "someone",
        });
        assert!(OrderEvent::decode(payload.to_string().as_bytes()).is_ok());
    }

    #[test]
    fn rejects_non_json_payloads() {
        assert!(OrderEvent::decode(b"definitely not json").is_err());
    }

    #[test]
    fn rejects_a_missing_field() {
        let payload = json!({ "items": [] });
        assert!(OrderEvent::decode(payload.to_string().as_bytes()).is_err());
    }

    #[test]
    fn rejects_a_type_mismatch() {
        let payload = json!({
            "order_id": Uuid::new_v4(),
            "items": [{ "product_id": Uuid::new_v4(), "quantity": "two" }],
        });
        assert!(OrderEvent::decode(payload.to_string().as_bytes()).is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // The decoder guards the loop against poison messages; it must
            // fail cleanly on arbitrary bytes, never panic.
            #[test]
            fn decode_never_panics(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
                let _ = OrderEvent::decode(&payload);
            }

            #[test]
            fn decode_roundtrips(
                order_id in any::<u128>(),
                items in proptest::collection::vec((any::<u128>(), any::<i32>()), 0..8),
            ) {
                let event = OrderEvent {
                    order_id: Uuid::from_u128(order_id),
                    items: items
                        .into_iter()
                        .map(|(product_id, quantity)| LineItem {
                            product_id: Uuid::from_u128(product_id),
                            quantity,
                        })
                        .collect(),
                };
                let encoded = serde_json::to_vec(&event).unwrap();
                prop_assert_eq!(OrderEvent::decode(&encoded).unwrap(), event);
            }
        }
    }
}
