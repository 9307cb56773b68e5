//! Stock delta computation from order lifecycle topics.
//!
//! The direction of a stock adjustment is carried by the message's routing
//! key, not by the payload: a committed order consumes stock, a voided order
//! restores it. Any other routing key that matches the `order.*` binding maps
//! to a zero multiplier — the event still flows through a transaction, but
//! with zero-effect deltas.

use crate::event::OrderEvent;
use uuid::Uuid;

/// Routing key published when an order service commits an order.
pub const TOPIC_ORDER_CREATED: &str = "order.created";

/// Routing key published when an order service voids an order.
pub const TOPIC_ORDER_CANCELLED: &str = "order.cancelled";

/// A signed stock adjustment for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDelta {
    /// Product whose stock count is adjusted.
    pub product_id: Uuid,
    /// Signed quantity added to the stock count. Relative deltas commute,
    /// so concurrent writers on other paths stay safe.
    pub delta: i32,
}

/// Multiplier applied to line-item quantities for a routing key.
///
/// - [`TOPIC_ORDER_CREATED`] → `-1` (consume stock)
/// - [`TOPIC_ORDER_CANCELLED`] → `+1` (restore stock)
/// - anything else → `0` (zero-effect no-op, preserved behavior)
#[must_use]
pub const fn stock_multiplier(routing_key: &str) -> i32 {
    match routing_key.as_bytes() {
        b"order.created" => -1,
        b"order.cancelled" => 1,
        _ => 0,
    }
}

impl OrderEvent {
    /// Stock deltas for this event under the given multiplier, one per line
    /// item, in payload order.
    #[must_use]
    pub fn deltas(&self, multiplier: i32) -> Vec<StockDelta> {
        self.items
            .iter()
            .map(|item| StockDelta {
                product_id: item.product_id,
                delta: item.quantity * multiplier,
            })
            .collect()
    }
}
