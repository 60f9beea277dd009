//! Backend implementations for the target store.
//!
//! Each backend implements the core traits from [`crate::db`]:
//!
//! - [`SqlExecutor`](crate::db::SqlExecutor) for the client and its transactions
//! - [`Transaction`](crate::db::Transaction) for the transaction struct
//! - [`DbClient`](crate::db::DbClient) for the client struct

pub mod postgres;
