//! Content command handler.

use std::io;

use color_eyre::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::di::FromRef;
use crate::repositories::ContentRepository;
use crate::services::{ContentMigrationService, RunReport};

use super::confirm::confirm_live_run;
use super::session::Session;
use super::{App, KindSelection, RunArgs};

impl App {
    /// Migrate one batch of each selected content collection, in order.
    ///
    /// Each collection gets its own summary and run log.
    pub async fn run_content(&self, selection: &KindSelection, args: &RunArgs) -> Result<()> {
        let config = Config::load()?;
        let options = args.batch_options(&config.migration);
        options.validate()?;
        let kinds = selection.kinds();

        let names: Vec<_> = kinds.iter().map(|k| k.as_str()).collect();
        if !options.dry_run
            && !args.yes
            && !confirm_live_run(&names.join(", "), &mut io::stdin().lock(), &mut io::stdout())?
        {
            info!("Migration cancelled");
            return Ok(());
        }

        let session = Session::open(config).await?;
        let log_dir = session.ctx.config.migration.log_dir.clone();
        let content = ContentRepository::from_ref(&session.ctx);
        let service = ContentMigrationService::new(session.source.as_ref(), &content);

        let mut completed = Vec::with_capacity(kinds.len());
        let mut failure = None;
        let mut interrupted = false;
        for kind in kinds {
            let outcome = tokio::select! {
                result = service.run(kind, &options) => Some(result),
                _ = tokio::signal::ctrl_c() => None,
            };
            match outcome {
                Some(Ok(stats)) => completed.push((kind, stats)),
                Some(Err(e)) => {
                    failure = Some(e);
                    break;
                }
                None => {
                    interrupted = true;
                    break;
                }
            }
        }
        session.close().await;

        if interrupted {
            warn!("Interrupted, summary skipped");
            return Ok(());
        }
        for (kind, stats) in &completed {
            let report = RunReport::new(kind.as_str(), &options, stats);
            report.print_summary(&mut io::stdout())?;
            let path = report.save_log(&log_dir)?;
            println!("Migration log saved to: {}", path.display());
        }
        match failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}
