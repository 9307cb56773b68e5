//! Transactional delta application over the `products` table.

use sqlx::PgPool;
use std::future::Future;
use std::pin::Pin;
use stock_reconciler_core::delta::StockDelta;
use stock_reconciler_core::store::{StockStore, StockStoreError};

/// `PostgreSQL`-backed stock store.
///
/// All deltas of one order event are applied in a single transaction, in
/// slice order; the first failing item rolls the whole event back, so no
/// partially-applied event ever commits.
///
/// The `products` table is also mutated by administrative product endpoints
/// concurrently with this store. That is safe because every mutation here is
/// a relative `stock = stock + delta`, never a compare-and-set on a
/// previously read value: concurrent writers commute under `PostgreSQL`'s
/// standard isolation.
///
/// No floor is enforced on the stock count; a delta may drive it negative.
pub struct PgStockStore {
    pool: PgPool,
}

impl PgStockStore {
    /// Create a store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database and verify the connection with a ping.
    ///
    /// # Errors
    ///
    /// Returns [`StockStoreError::Storage`] if the pool cannot be created
    /// or the ping fails. Fatal to worker startup.
    pub async fn connect(database_url: &str) -> Result<Self, StockStoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(storage_error)?;
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(storage_error)?;
        Ok(Self::new(pool))
    }

    async fn apply_all(&self, deltas: &[StockDelta]) -> Result<(), StockStoreError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        for delta in deltas {
            let updated: Option<(i32,)> = sqlx::query_as(
                r"
                UPDATE products
                SET stock = stock + $1
                WHERE id = $2
                RETURNING stock
                ",
            )
            .bind(delta.delta)
            .bind(delta.product_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage_error)?;

            let Some((stock,)) = updated else {
                tx.rollback().await.map_err(storage_error)?;
                return Err(StockStoreError::ProductNotFound {
                    product_id: delta.product_id,
                });
            };

            tracing::debug!(
                product_id = %delta.product_id,
                delta = delta.delta,
                stock = stock,
                "Stock delta applied"
            );
        }

        tx.commit().await.map_err(storage_error)?;

        metrics::counter!("stock_store.deltas.committed").increment(deltas.len() as u64);

        Ok(())
    }
}

impl StockStore for PgStockStore {
    fn apply_deltas(
        &self,
        deltas: &[StockDelta],
    ) -> Pin<Box<dyn Future<Output = Result<(), StockStoreError>> + Send + '_>> {
        let deltas = deltas.to_vec();
        Box::pin(async move { self.apply_all(&deltas).await })
    }
}

fn storage_error(e: sqlx::Error) -> StockStoreError {
    StockStoreError::Storage(e.to_string())
}
