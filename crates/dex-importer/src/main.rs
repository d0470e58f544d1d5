//! Reference Importer binary: runs one Discovery→Download→Validate→
//! Stage→Normalize pass against the Catalogue-of-Life ChecklistBank corpus.
//!
//! Following `observing-ingester`'s shape: env-driven config, `tracing`
//! init with optional JSON output, connect, migrate, run.

use clap::Parser;
use dex_importer::{ImporterConfig, Result};
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Parser)]
#[command(about = "Imports the Catalogue-of-Life reference taxonomy corpus")]
struct Cli {
    /// Run migrations before importing.
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env().add_directive("dex_importer=info".parse().unwrap());

    if std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false) {
        tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();
    tracing::info!("starting dex-importer");

    let config = ImporterConfig::from_env()?;
    let pool = sqlx::postgres::PgPoolOptions::new().max_connections(5).connect(&config.database_url).await?;

    if cli.migrate {
        dex_db::migrate::migrate(&pool).await?;
    }

    dex_importer::run(&pool, &config).await?;
    Ok(())
}
