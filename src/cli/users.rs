//! Users command handler.

use std::io;

use color_eyre::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::di::FromRef;
use crate::repositories::UserRepository;
use crate::services::{RunReport, UserMigrationService};

use super::confirm::confirm_live_run;
use super::session::Session;
use super::{App, RunArgs};

impl App {
    /// Migrate one batch of legacy users.
    pub async fn run_users(&self, args: &RunArgs) -> Result<()> {
        let config = Config::load()?;
        let options = args.batch_options(&config.migration);
        options.validate()?;

        if !options.dry_run
            && !args.yes
            && !confirm_live_run("users", &mut io::stdin().lock(), &mut io::stdout())?
        {
            info!("Migration cancelled");
            return Ok(());
        }

        let session = Session::open(config).await?;
        let migration = &session.ctx.config.migration;
        let users = UserRepository::from_ref(&session.ctx);
        let service = UserMigrationService::new(session.source.as_ref(), &users)
            .with_collection(migration.users_collection.as_str())
            .with_default_country_code(migration.default_country_code.as_str());
        let log_dir = migration.log_dir.clone();

        let outcome = tokio::select! {
            result = service.run(&options) => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        };
        session.close().await;

        let Some(result) = outcome else {
            warn!("Interrupted, summary skipped");
            return Ok(());
        };
        let stats = result?;

        let report = RunReport::new("users", &options, &stats);
        report.print_summary(&mut io::stdout())?;
        let path = report.save_log(&log_dir)?;
        println!("Migration log saved to: {}", path.display());
        Ok(())
    }
}
