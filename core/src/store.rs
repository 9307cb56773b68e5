//! Transactional stock-store abstraction.
//!
//! The stock table is shared: administrative product endpoints mutate it
//! directly, concurrently with this consumer. All mutations on this path are
//! relative deltas, which commute under the storage engine's standard
//! isolation, so no cross-path locking is required. A compare-and-set style
//! mutation would reintroduce a race; keep deltas additive.

use crate::delta::StockDelta;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use uuid::Uuid;

/// Errors from stock store operations.
///
/// The reconciliation loop does not distinguish the variants: either one
/// aborts the event's transaction and requeues the delivery.
#[derive(Error, Debug, Clone)]
pub enum StockStoreError {
    /// No stock record exists for the product.
    #[error("product not found: {product_id}")]
    ProductNotFound {
        /// The product the failing delta referred to.
        product_id: Uuid,
    },

    /// The underlying storage failed (connection loss, constraint
    /// violation, transaction error).
    #[error("storage error: {0}")]
    Storage(String),
}

/// Transactional accessor over product stock counts.
///
/// # Atomicity Contract
///
/// `apply_deltas` applies every delta of one event as a single atomic unit:
/// either all deltas are durably committed or none are. Deltas are applied
/// sequentially in slice order and the first failure aborts the remainder.
/// The transaction boundary is the implementation's responsibility; callers
/// never observe a partially-applied event.
///
/// Note: returns `Pin<Box<dyn Future>>` instead of `async fn` to stay
/// dyn-compatible (object-safe).
pub trait StockStore: Send + Sync {
    /// Apply all deltas as one atomic unit.
    ///
    /// A zero delta is still routed through the transaction; it updates no
    /// count but fails if the product is missing.
    ///
    /// # Errors
    ///
    /// Returns the first failing item's error after rolling back. No effect
    /// of earlier items in the slice survives a failure.
    fn apply_deltas(
        &self,
        deltas: &[StockDelta],
    ) -> Pin<Box<dyn Future<Output = Result<(), StockStoreError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_store_is_dyn_compatible() {
        fn assert_dyn(_: Option<&dyn StockStore>) {}
        assert_dyn(None);
    }
}
