//! Compile-time wiring of repositories from the [`Context`](crate::context::Context).
//!
//! `#[derive(Context)]` lets each field of the root be pulled out by type;
//! `#[derive(FromContext)]` builds a struct by pulling each of its fields.
//!
//! ```ignore
//! #[derive(FromContext, Clone)]
//! pub struct UserRepository {
//!     db: AppDb,
//! }
//!
//! let users = UserRepository::from_ref(&ctx);
//! ```

/// Builds `Self` from a borrowed `T`.
pub trait FromRef<T> {
    fn from_ref(input: &T) -> Self;
}

impl<T: Clone> FromRef<T> for T {
    fn from_ref(input: &T) -> Self {
        input.clone()
    }
}

pub use di_macros::{Context, FromContext};
