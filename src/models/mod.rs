//! Domain models for the migration pipeline.

mod content;
mod legacy;
mod outcome;
mod user;

pub use content::{ContentKind, FieldDefault, FieldMapping, FieldType, NewContent, OwnerField};
pub use legacy::{parse_datetime, plain_value, LegacyDocument, LegacyUserRecord};
pub use outcome::{LogEntry, MigrationOutcome, MigrationRunStats};
pub use user::{generate_ulid, MigratedUser, NewMigratedUser, NewUserProfile, ProfileVisibility};
