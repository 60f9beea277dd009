//! Connections held for the duration of a batch command.

use tracing::{info, warn};

use crate::config::Config;
use crate::context::Context;
use crate::error::AppError;
use crate::source::{open_source, LegacySource};

/// Legacy source plus target context, opened together and closed together.
pub struct Session {
    pub ctx: Context,
    pub source: Box<dyn LegacySource>,
}

impl Session {
    /// Opens both stores. Either one failing aborts before any work.
    pub async fn open(config: Config) -> Result<Self, AppError> {
        let source = open_source(&config.source).await?;
        info!(source = %source.describe(), "Connected to legacy source");

        let ctx = match Context::connect(config).await {
            Ok(ctx) => ctx,
            Err(e) => {
                if let Err(close_err) = source.close().await {
                    warn!(error = %close_err, "Failed to close legacy source");
                }
                return Err(e);
            }
        };
        info!("Connected to target Postgres");
        Ok(Self { ctx, source })
    }

    /// Releases both connections. Close failures are logged, not returned.
    pub async fn close(self) {
        if let Err(e) = self.source.close().await {
            warn!(error = %e, "Failed to close legacy source");
        }
        self.ctx.close();
        info!("Connections closed");
    }
}
