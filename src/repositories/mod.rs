//! Data access layer for the target store.
//!
//! Services depend on the [`UserStore`] and [`ContentStore`] traits.
//! Postgres repositories are resolved from the context with the
//! `FromContext` derive; [`MemoryStore`] backs tests.

mod content;
mod memory;
mod schema;
mod traits;
mod user;

pub use content::ContentRepository;
pub use memory::{MemoryStore, StoredContent};
pub use schema::{SchemaRepository, StoreStats};
pub use traits::{ContentStore, UserStore};
pub use user::UserRepository;
