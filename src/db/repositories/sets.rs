//! Storage helpers for content sets
//!
//! Availability, done and starter sets share one row shape:
//! `(owner, content_kind, content_id)` with the triple as primary key. Adding
//! a set is an `INSERT ... IGNORE` per item, which makes repeated grants a
//! no-op and lets the affected-row count double as the number of new items.

use anyhow::{Context, Result};
use sqlx::{MySqlPool, Row, SqlitePool};

use crate::models::{ContentKind, ContentSet};

/// A set-shaped table and the column naming its owner.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SetTable {
    pub table: &'static str,
    pub owner_column: &'static str,
}

pub(crate) const USER_AVAILABILITY: SetTable = SetTable {
    table: "user_availability",
    owner_column: "user_id",
};

pub(crate) const USER_DONE: SetTable = SetTable {
    table: "user_done",
    owner_column: "user_id",
};

pub(crate) const START_AVAILABILITY: SetTable = SetTable {
    table: "start_availability",
    owner_column: "tariff_id",
};

impl SetTable {
    fn select_sql(&self) -> String {
        format!(
            "SELECT content_kind, content_id FROM {} WHERE {} = ?",
            self.table, self.owner_column
        )
    }

    fn insert_sql(&self, ignore: &str) -> String {
        format!(
            "INSERT {} INTO {} ({}, content_kind, content_id) VALUES (?, ?, ?)",
            ignore, self.table, self.owner_column
        )
    }
}

fn collect_set(pairs: impl Iterator<Item = (String, i64)>) -> Result<ContentSet> {
    let mut set = ContentSet::new();
    for (kind, id) in pairs {
        let kind: ContentKind = kind.parse()?;
        set.get_mut(kind).insert(id);
    }
    Ok(set)
}

pub(crate) async fn load_set_sqlite(
    pool: &SqlitePool,
    table: SetTable,
    owner: i64,
) -> Result<ContentSet> {
    let rows = sqlx::query(&table.select_sql())
        .bind(owner)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to load {}", table.table))?;

    collect_set(
        rows.iter()
            .map(|row| (row.get::<String, _>("content_kind"), row.get::<i64, _>("content_id"))),
    )
}

pub(crate) async fn insert_set_sqlite(
    pool: &SqlitePool,
    table: SetTable,
    owner: i64,
    items: &ContentSet,
) -> Result<u64> {
    let sql = table.insert_sql("OR IGNORE");
    let mut tx = pool.begin().await?;
    let mut inserted = 0;
    for item in items.iter() {
        let result = sqlx::query(&sql)
            .bind(owner)
            .bind(item.kind.as_str())
            .bind(item.id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to add {} to {}", item, table.table))?;
        inserted += result.rows_affected();
    }
    tx.commit().await?;
    Ok(inserted)
}

pub(crate) async fn load_set_mysql(
    pool: &MySqlPool,
    table: SetTable,
    owner: i64,
) -> Result<ContentSet> {
    let rows = sqlx::query(&table.select_sql())
        .bind(owner)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to load {}", table.table))?;

    collect_set(
        rows.iter()
            .map(|row| (row.get::<String, _>("content_kind"), row.get::<i64, _>("content_id"))),
    )
}

pub(crate) async fn insert_set_mysql(
    pool: &MySqlPool,
    table: SetTable,
    owner: i64,
    items: &ContentSet,
) -> Result<u64> {
    let sql = table.insert_sql("IGNORE");
    let mut tx = pool.begin().await?;
    let mut inserted = 0;
    for item in items.iter() {
        let result = sqlx::query(&sql)
            .bind(owner)
            .bind(item.kind.as_str())
            .bind(item.id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to add {} to {}", item, table.table))?;
        inserted += result.rows_affected();
    }
    tx.commit().await?;
    Ok(inserted)
}
