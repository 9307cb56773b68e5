//! `PostgreSQL` stock store for the stock reconciler.
//!
//! Implements the `StockStore` trait from `stock-reconciler-core` over a
//! `products` table, applying every delta of an order event inside a single
//! transaction. It uses sqlx with connection pooling.
//!
//! # Example
//!
//! ```ignore
//! use stock_reconciler_postgres::PgStockStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PgStockStore::connect("postgres://localhost/storefront").await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod stock_store;

pub use stock_store::PgStockStore;
