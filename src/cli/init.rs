//! `init`: create or upgrade the target schema.

use color_eyre::Result;

use crate::config::Config;
use crate::context::Context;
use crate::migrations::{run_migrations, MigrationResult};

use super::App;

impl App {
    pub async fn run_init(&self) -> Result<()> {
        let config = Config::load()?;
        let ctx = Context::connect(config).await?;

        let outcome = run_migrations(ctx.db.client()).await;
        ctx.close();
        report(&outcome?);
        Ok(())
    }
}

fn report(result: &MigrationResult) {
    match result.applied_migrations.as_slice() {
        [] => tracing::info!(version = result.current_version, "Schema is up to date"),
        applied => tracing::info!(
            from = result.previous_version,
            to = result.current_version,
            "Applied {} migration(s): {}",
            applied.len(),
            applied.join(", ")
        ),
    }
}
