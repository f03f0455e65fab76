//! Load a YAML catalog fixture into an empty database.
//!
//! Usage: load-fixture <fixture.yml> [config.yml]

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coursegate::{
    cache::create_cache,
    config::Config,
    db::{
        self,
        repositories::{SqlxCatalogRepository, SqlxQuizRepository, SqlxTariffRepository},
    },
    services::{CatalogFixture, CatalogService, FixtureLoader, FixtureOutcome},
};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "load-fixture")]
#[command(about = "Load a YAML course fixture into an empty catalog")]
struct Cli {
    /// Fixture file (topics, lessons, content, unlock edges, tariffs)
    fixture: PathBuf,

    /// Configuration file; missing files fall back to defaults
    #[arg(default_value = "config.yml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursegate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let fixture_path = cli.fixture;

    let config = Config::load_with_env(&cli.config)?;
    let fixture = CatalogFixture::from_file(&fixture_path)?;

    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    let catalog_repo = SqlxCatalogRepository::boxed(pool.clone());
    let quiz_repo = SqlxQuizRepository::boxed(pool.clone());
    let catalog = Arc::new(CatalogService::new(
        catalog_repo.clone(),
        quiz_repo.clone(),
        create_cache(&config.cache),
        config.media.clone(),
    ));
    let loader = FixtureLoader::new(
        catalog_repo,
        quiz_repo,
        SqlxTariffRepository::boxed(pool.clone()),
        catalog,
    );

    match loader.load_if_empty(&fixture).await? {
        FixtureOutcome::Loaded(summary) => {
            tracing::info!("Loaded {}: {:?}", fixture_path.display(), summary);
        }
        FixtureOutcome::Skipped { existing_topics } => {
            tracing::warn!(
                "Catalog already has {} topic(s); {} was not loaded",
                existing_topics,
                fixture_path.display()
            );
        }
    }

    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_defaults() {
        let cli = Cli::try_parse_from(["load-fixture", "course.yml"]).unwrap();
        assert_eq!(cli.fixture, PathBuf::from("course.yml"));
        assert_eq!(cli.config, PathBuf::from("config.yml"));
    }

    #[test]
    fn test_fixture_is_required() {
        assert!(Cli::try_parse_from(["load-fixture"]).is_err());
        let cli = Cli::try_parse_from(["load-fixture", "a.yml", "prod.yml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("prod.yml"));
    }
}
