//! Compile-time dependency injection derives for biograph-migrate.
//!
//! - `#[derive(Context)]` makes every field of a root context extractable
//! - `#[derive(FromContext)]` builds a struct by extracting each field
//!
//! Generated code refers to `crate::FromRef`, so the consuming crate must
//! expose the trait at its root.

use proc_macro::TokenStream;

mod context;
mod fields;
mod from_context;

/// Implements `FromRef<Self>` for the type of every named field.
///
/// ```ignore
/// #[derive(Context, Clone)]
/// pub struct Context {
///     pub db: AppDb,
///     pub config: Arc<Config>,
/// }
///
/// // impl FromRef<Context> for AppDb { ... }
/// // impl FromRef<Context> for Arc<Config> { ... }
/// ```
///
/// Field types must be `Clone` and distinct.
#[proc_macro_derive(Context)]
pub fn derive_context(input: TokenStream) -> TokenStream {
    context::expand(input)
}

/// Implements `FromRef<Context>` by resolving each field from the context.
///
/// ```ignore
/// #[derive(FromContext, Clone)]
/// pub struct UserRepository {
///     db: AppDb,
/// }
///
/// let users = UserRepository::from_ref(&ctx);
/// ```
///
/// The context type defaults to `Context` in scope and can be overridden
/// with `#[from_context(Context = "path::To::Ctx")]`.
#[proc_macro_derive(FromContext, attributes(from_context))]
pub fn derive_from_context(input: TokenStream) -> TokenStream {
    from_context::expand(input)
}
