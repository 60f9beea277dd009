//! Migration pipeline services.
//!
//! Leaves first: [`normalize`] cleans single fields, [`mapper`] turns a
//! legacy document into a creation request, [`guard`] detects records
//! already in the target store, the batch runners in [`users`] and
//! [`content`] drive a page through those steps, and [`report`] renders
//! the outcome.

pub mod content;
pub mod guard;
pub mod mapper;
pub mod normalize;
pub mod report;
pub mod users;

pub use content::ContentMigrationService;
pub use guard::{Duplicate, DuplicateGuard};
pub use mapper::{assemble_fields, map_content, map_user};
pub use normalize::{accept_email, normalize_phone, split_name, NormalizedPhone};
pub use report::{RunReport, SUMMARY_ERROR_LIMIT};
pub use users::{BatchOptions, UserMigrationService};
