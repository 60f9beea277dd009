//! Status command handler.

use color_eyre::Result;

use crate::config::Config;
use crate::di::FromRef;
use crate::models::ContentKind;
use crate::repositories::{SchemaRepository, StoreStats};
use crate::source::SourceFilter;

use super::session::Session;
use super::App;

impl App {
    /// Print schema version, target row counts and legacy record counts.
    pub async fn run_status(&self) -> Result<()> {
        let config = Config::load()?;
        let users_collection = config.migration.users_collection.clone();
        let session = Session::open(config).await?;
        let result = collect(&session, &users_collection).await;
        session.close().await;
        let (target, legacy) = result?;

        match target {
            None => println!("Target schema not initialized (run `biograph-migrate init`)"),
            Some(stats) => {
                println!(
                    "Schema version: v{} {:?}",
                    stats.schema_version, stats.applied_migrations
                );
                println!(
                    "Users: {} migrated / {} total",
                    stats.migrated_users, stats.total_users
                );
                for (kind, rows) in &stats.content {
                    println!("{:<16} {}", kind.as_str(), rows);
                }
            }
        }

        println!();
        println!("Legacy source:");
        for (name, count) in legacy {
            println!("{name:<16} {count}");
        }
        Ok(())
    }
}

async fn collect(
    session: &Session,
    users_collection: &str,
) -> Result<(Option<StoreStats>, Vec<(&'static str, u64)>)> {
    let schema = SchemaRepository::from_ref(&session.ctx);
    let target = if schema.is_initialized().await? {
        Some(schema.get_stats().await?)
    } else {
        None
    };

    let mut legacy = vec![(
        "active users",
        session
            .source
            .count(users_collection, &SourceFilter::active())
            .await?,
    )];
    for kind in ContentKind::all() {
        let count = session
            .source
            .count(kind.collection(), &SourceFilter::all())
            .await?;
        legacy.push((kind.as_str(), count));
    }
    Ok((target, legacy))
}
