//! Tariff repository
//!
//! Tariffs and the starter content each tariff hands out on activation.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ContentSet, CreateTariffInput, Tariff};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::sets::{
    insert_set_mysql, insert_set_sqlite, load_set_mysql, load_set_sqlite, START_AVAILABILITY,
};

#[async_trait]
pub trait TariffRepository: Send + Sync {
    async fn create(&self, input: &CreateTariffInput) -> Result<Tariff>;

    /// All tariffs, oldest first
    async fn list(&self) -> Result<Vec<Tariff>>;

    async fn get_by_id(&self, tariff_id: i64) -> Result<Option<Tariff>>;

    async fn get_by_title(&self, title: &str) -> Result<Option<Tariff>>;

    /// Content granted when the tariff is activated
    async fn start_content(&self, tariff_id: i64) -> Result<ContentSet>;

    async fn add_start_content(&self, tariff_id: i64, items: &ContentSet) -> Result<u64>;
}

pub struct SqlxTariffRepository {
    pool: DynDatabasePool,
}

impl SqlxTariffRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TariffRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TariffRepository for SqlxTariffRepository {
    async fn create(&self, input: &CreateTariffInput) -> Result<Tariff> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_tariff_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_tariff_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn list(&self) -> Result<Vec<Tariff>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_tariffs_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => list_tariffs_mysql(self.pool.mysql()?).await,
        }
    }

    async fn get_by_id(&self, tariff_id: i64) -> Result<Option<Tariff>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tariff_by_id_sqlite(self.pool.sqlite()?, tariff_id).await,
            DatabaseDriver::Mysql => get_tariff_by_id_mysql(self.pool.mysql()?, tariff_id).await,
        }
    }

    async fn get_by_title(&self, title: &str) -> Result<Option<Tariff>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tariff_by_title_sqlite(self.pool.sqlite()?, title).await,
            DatabaseDriver::Mysql => get_tariff_by_title_mysql(self.pool.mysql()?, title).await,
        }
    }

    async fn start_content(&self, tariff_id: i64) -> Result<ContentSet> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                load_set_sqlite(self.pool.sqlite()?, START_AVAILABILITY, tariff_id).await
            }
            DatabaseDriver::Mysql => {
                load_set_mysql(self.pool.mysql()?, START_AVAILABILITY, tariff_id).await
            }
        }
    }

    async fn add_start_content(&self, tariff_id: i64, items: &ContentSet) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                insert_set_sqlite(self.pool.sqlite()?, START_AVAILABILITY, tariff_id, items).await
            }
            DatabaseDriver::Mysql => {
                insert_set_mysql(self.pool.mysql()?, START_AVAILABILITY, tariff_id, items).await
            }
        }
    }
}

const TARIFF_COLUMNS: &str = "tariff_id, title, description, price, status";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tariff_sqlite(pool: &SqlitePool, input: &CreateTariffInput) -> Result<Tariff> {
    let result =
        sqlx::query("INSERT INTO tariffs (title, description, price, status) VALUES (?, ?, ?, ?)")
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.price)
            .bind(input.status.to_string())
            .execute(pool)
            .await
            .context("Failed to create tariff")?;

    Ok(Tariff {
        tariff_id: result.last_insert_rowid(),
        title: input.title.clone(),
        description: input.description.clone(),
        price: input.price,
        status: input.status,
    })
}

async fn list_tariffs_sqlite(pool: &SqlitePool) -> Result<Vec<Tariff>> {
    let sql = format!("SELECT {} FROM tariffs ORDER BY tariff_id", TARIFF_COLUMNS);
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list tariffs")?;

    rows.iter().map(row_to_tariff_sqlite).collect()
}

async fn get_tariff_by_id_sqlite(pool: &SqlitePool, tariff_id: i64) -> Result<Option<Tariff>> {
    let sql = format!("SELECT {} FROM tariffs WHERE tariff_id = ?", TARIFF_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(tariff_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tariff")?;

    row.as_ref().map(row_to_tariff_sqlite).transpose()
}

async fn get_tariff_by_title_sqlite(pool: &SqlitePool, title: &str) -> Result<Option<Tariff>> {
    let sql = format!("SELECT {} FROM tariffs WHERE title = ?", TARIFF_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(title)
        .fetch_optional(pool)
        .await
        .context("Failed to get tariff by title")?;

    row.as_ref().map(row_to_tariff_sqlite).transpose()
}

fn row_to_tariff_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Tariff> {
    let status: String = row.get("status");
    Ok(Tariff {
        tariff_id: row.get("tariff_id"),
        title: row.get("title"),
        description: row.get("description"),
        price: row.get("price"),
        status: status.parse()?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tariff_mysql(pool: &MySqlPool, input: &CreateTariffInput) -> Result<Tariff> {
    let result =
        sqlx::query("INSERT INTO tariffs (title, description, price, status) VALUES (?, ?, ?, ?)")
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.price)
            .bind(input.status.to_string())
            .execute(pool)
            .await
            .context("Failed to create tariff")?;

    Ok(Tariff {
        tariff_id: result.last_insert_id() as i64,
        title: input.title.clone(),
        description: input.description.clone(),
        price: input.price,
        status: input.status,
    })
}

async fn list_tariffs_mysql(pool: &MySqlPool) -> Result<Vec<Tariff>> {
    let sql = format!("SELECT {} FROM tariffs ORDER BY tariff_id", TARIFF_COLUMNS);
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list tariffs")?;

    rows.iter().map(row_to_tariff_mysql).collect()
}

async fn get_tariff_by_id_mysql(pool: &MySqlPool, tariff_id: i64) -> Result<Option<Tariff>> {
    let sql = format!("SELECT {} FROM tariffs WHERE tariff_id = ?", TARIFF_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(tariff_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tariff")?;

    row.as_ref().map(row_to_tariff_mysql).transpose()
}

async fn get_tariff_by_title_mysql(pool: &MySqlPool, title: &str) -> Result<Option<Tariff>> {
    let sql = format!("SELECT {} FROM tariffs WHERE title = ?", TARIFF_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(title)
        .fetch_optional(pool)
        .await
        .context("Failed to get tariff by title")?;

    row.as_ref().map(row_to_tariff_mysql).transpose()
}

fn row_to_tariff_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Tariff> {
    let status: String = row.get("status");
    Ok(Tariff {
        tariff_id: row.get("tariff_id"),
        title: row.get("title"),
        description: row.get("description"),
        price: row.get("price"),
        status: status.parse()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::{ContentRef, TariffStatus};

    async fn setup_test_repo() -> SqlxTariffRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxTariffRepository::new(pool)
    }

    fn input(title: &str, price: i64) -> CreateTariffInput {
        CreateTariffInput {
            title: title.to_string(),
            description: format!("{} access", title),
            price,
            status: TariffStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_create_list_and_lookup() {
        let repo = setup_test_repo().await;
        assert!(repo.list().await.unwrap().is_empty());

        let basic = repo.create(&input("Basic", 1000)).await.unwrap();
        repo.create(&input("Pro", 5000)).await.unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Basic");

        let found = repo.get_by_title("Pro").await.unwrap().expect("tariff");
        assert_eq!(found.price, 5000);
        assert_eq!(repo.get_by_id(basic.tariff_id).await.unwrap(), Some(basic));
        assert!(repo.get_by_title("Gold").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_title_is_unique() {
        let repo = setup_test_repo().await;
        repo.create(&input("Basic", 1000)).await.unwrap();
        assert!(repo.create(&input("Basic", 2000)).await.is_err());
    }

    #[tokio::test]
    async fn test_start_content() {
        let repo = setup_test_repo().await;
        let tariff = repo.create(&input("Basic", 1000)).await.unwrap();

        let items: ContentSet = [ContentRef::topic(1), ContentRef::lesson(1), ContentRef::video(1)]
            .into_iter()
            .collect();
        assert_eq!(repo.add_start_content(tariff.tariff_id, &items).await.unwrap(), 3);
        assert_eq!(repo.add_start_content(tariff.tariff_id, &items).await.unwrap(), 0);

        assert_eq!(repo.start_content(tariff.tariff_id).await.unwrap(), items);
    }
}
