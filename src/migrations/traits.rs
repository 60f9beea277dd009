//! The migration contract and the ordered set the runner walks.

use futures::future::BoxFuture;

use crate::db::SqlExecutor;
use crate::error::AppError;

/// A forward-only schema step.
///
/// `up` returns a `BoxFuture` so the executor can be a borrowed
/// transaction rather than a `'static` handle.
pub trait Migration: Send + Sync {
    fn id(&self) -> &'static str;
    fn version(&self) -> u32;
    fn description(&self) -> &'static str;
    fn up<'a>(&'a self, ctx: &'a (dyn SqlExecutor + Sync)) -> BoxFuture<'a, Result<(), AppError>>;
}

/// Migrations kept sorted by version.
#[derive(Default)]
pub struct Register {
    steps: Vec<Box<dyn Migration>>,
}

impl Register {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a step. Versions must be unique; the set stays sorted.
    pub fn register(mut self, migration: impl Migration + 'static) -> Self {
        let at = self
            .steps
            .partition_point(|m| m.version() < migration.version());
        self.steps.insert(at, Box::new(migration));
        self
    }

    /// Steps newer than `applied`, oldest first.
    pub fn pending(&self, applied: u32) -> impl Iterator<Item = &dyn Migration> {
        self.steps
            .iter()
            .map(|m| m.as_ref())
            .filter(move |m| m.version() > applied)
    }

    /// Version the schema reaches once every step has run.
    pub fn latest_version(&self) -> u32 {
        self.steps.last().map(|m| m.version()).unwrap_or(0)
    }
}
