//! Progress repository
//!
//! Per-user unlock state: what is available and what is done. Both sets only
//! ever grow; there is deliberately no removal operation.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ContentSet, UserProgressState};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::sets::{
    insert_set_mysql, insert_set_sqlite, load_set_mysql, load_set_sqlite, USER_AVAILABILITY,
    USER_DONE,
};

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn available(&self, user_id: i64) -> Result<ContentSet>;

    /// Add items to the user's availability; returns how many were new
    async fn grant(&self, user_id: i64, items: &ContentSet) -> Result<u64>;

    async fn done(&self, user_id: i64) -> Result<ContentSet>;

    /// Add items to the user's done set; returns how many were new
    async fn mark_done(&self, user_id: i64, items: &ContentSet) -> Result<u64>;

    /// When the user last finished something
    async fn last_done_at(&self, user_id: i64) -> Result<Option<DateTime<Utc>>>;

    async fn state(&self, user_id: i64) -> Result<UserProgressState> {
        Ok(UserProgressState {
            available: self.available(user_id).await?,
            done: self.done(user_id).await?,
        })
    }
}

pub struct SqlxProgressRepository {
    pool: DynDatabasePool,
}

impl SqlxProgressRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ProgressRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProgressRepository for SqlxProgressRepository {
    async fn available(&self, user_id: i64) -> Result<ContentSet> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                load_set_sqlite(self.pool.sqlite()?, USER_AVAILABILITY, user_id).await
            }
            DatabaseDriver::Mysql => {
                load_set_mysql(self.pool.mysql()?, USER_AVAILABILITY, user_id).await
            }
        }
    }

    async fn grant(&self, user_id: i64, items: &ContentSet) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                insert_set_sqlite(self.pool.sqlite()?, USER_AVAILABILITY, user_id, items).await
            }
            DatabaseDriver::Mysql => {
                insert_set_mysql(self.pool.mysql()?, USER_AVAILABILITY, user_id, items).await
            }
        }
    }

    async fn done(&self, user_id: i64) -> Result<ContentSet> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                load_set_sqlite(self.pool.sqlite()?, USER_DONE, user_id).await
            }
            DatabaseDriver::Mysql => load_set_mysql(self.pool.mysql()?, USER_DONE, user_id).await,
        }
    }

    async fn mark_done(&self, user_id: i64, items: &ContentSet) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                insert_set_sqlite(self.pool.sqlite()?, USER_DONE, user_id, items).await
            }
            DatabaseDriver::Mysql => {
                insert_set_mysql(self.pool.mysql()?, USER_DONE, user_id, items).await
            }
        }
    }

    async fn last_done_at(&self, user_id: i64) -> Result<Option<DateTime<Utc>>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => last_done_at_sqlite(self.pool.sqlite()?, user_id).await,
            DatabaseDriver::Mysql => last_done_at_mysql(self.pool.mysql()?, user_id).await,
        }
    }
}

const LAST_DONE_SQL: &str =
    "SELECT completed_at FROM user_done WHERE user_id = ? ORDER BY completed_at DESC LIMIT 1";

async fn last_done_at_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Option<DateTime<Utc>>> {
    let row = sqlx::query(LAST_DONE_SQL)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to read last completion time")?;
    Ok(row.map(|row| row.get("completed_at")))
}

async fn last_done_at_mysql(pool: &MySqlPool, user_id: i64) -> Result<Option<DateTime<Utc>>> {
    let row = sqlx::query(LAST_DONE_SQL)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to read last completion time")?;
    Ok(row.map(|row| row.get("completed_at")))
}
