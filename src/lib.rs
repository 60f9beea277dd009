//! Batch migration of legacy BioGraph users and content into the
//! BiographRenaissance Postgres schema.
//!
//! Legacy documents come from MongoDB or a JSONL export of it
//! ([`source`]); records are normalized and deduplicated ([`services`])
//! and written through repositories ([`repositories`]) one batch at a time.

pub mod cli;
pub mod config;
pub mod context;
pub mod db;
pub mod di;
pub mod error;
pub mod migrations;
pub mod models;
pub mod repositories;
pub mod services;
pub mod source;

// Generated `FromContext` impls refer to `crate::FromRef`.
pub use di::FromRef;
