//! Target schema migrations with version tracking.
//!
//! Migrations are:
//! - **Idempotent**: `IF NOT EXISTS` everywhere - required for safe retries
//! - **Forward-only**: No rollback support - create compensating migrations if needed
//! - **Version-tracked**: Schema version stored in the `schema_version` table
//! - **Transactional**: Each migration commits or rolls back on its own

mod m001_users;
mod m002_content;
mod runner;
mod traits;

pub use m001_users::M001Users;
pub use m002_content::M002Content;
pub use runner::{current_version, run_migrations, MigrationResult};
pub use traits::{Migration, Register};

/// All target schema migrations in version order.
pub fn create_register() -> Register {
    Register::new().register(M001Users).register(M002Content)
}
