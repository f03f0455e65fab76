//! User repository
//!
//! Telegram users and their contact details.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{TelegramUser, UserContact, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; `user_id` of the argument is ignored
    async fn create(&self, user: &TelegramUser) -> Result<TelegramUser>;

    async fn get_by_id(&self, user_id: i64) -> Result<Option<TelegramUser>>;

    async fn get_by_tg_id(&self, tg_id: i64) -> Result<Option<TelegramUser>>;

    /// The earliest registered admin
    async fn first_admin(&self) -> Result<Option<TelegramUser>>;

    async fn set_role(&self, user_id: i64, role: UserRole) -> Result<()>;

    /// Insert or replace the contact of `contact.user_id`
    async fn upsert_contact(&self, contact: &UserContact) -> Result<UserContact>;

    async fn get_contact(&self, user_id: i64) -> Result<Option<UserContact>>;
}

/// SQLx-based user repository, SQLite and MySQL.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &TelegramUser) -> Result<TelegramUser> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.sqlite()?, user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.mysql()?, user).await,
        }
    }

    async fn get_by_id(&self, user_id: i64) -> Result<Option<TelegramUser>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_sqlite(self.pool.sqlite()?, "user_id = ?", user_id).await
            }
            DatabaseDriver::Mysql => {
                get_user_mysql(self.pool.mysql()?, "user_id = ?", user_id).await
            }
        }
    }

    async fn get_by_tg_id(&self, tg_id: i64) -> Result<Option<TelegramUser>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_sqlite(self.pool.sqlite()?, "tg_id = ?", tg_id).await
            }
            DatabaseDriver::Mysql => get_user_mysql(self.pool.mysql()?, "tg_id = ?", tg_id).await,
        }
    }

    async fn first_admin(&self) -> Result<Option<TelegramUser>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => first_admin_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => first_admin_mysql(self.pool.mysql()?).await,
        }
    }

    async fn set_role(&self, user_id: i64, role: UserRole) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => set_role_sqlite(self.pool.sqlite()?, user_id, role).await,
            DatabaseDriver::Mysql => set_role_mysql(self.pool.mysql()?, user_id, role).await,
        }
    }

    async fn upsert_contact(&self, contact: &UserContact) -> Result<UserContact> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => upsert_contact_sqlite(self.pool.sqlite()?, contact).await,
            DatabaseDriver::Mysql => upsert_contact_mysql(self.pool.mysql()?, contact).await,
        }
    }

    async fn get_contact(&self, user_id: i64) -> Result<Option<UserContact>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_contact_sqlite(self.pool.sqlite()?, user_id).await,
            DatabaseDriver::Mysql => get_contact_mysql(self.pool.mysql()?, user_id).await,
        }
    }
}

const USER_COLUMNS: &str = "user_id, tg_name, tg_id, role, created_at";
const CONTACT_COLUMNS: &str = "user_id, firstname, secondname, email, city, phonenumber";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &TelegramUser) -> Result<TelegramUser> {
    let result = sqlx::query(
        "INSERT INTO telegram_users (tg_name, tg_id, role, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&user.tg_name)
    .bind(user.tg_id)
    .bind(user.role.to_string())
    .bind(user.created_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(TelegramUser {
        user_id: result.last_insert_rowid(),
        ..user.clone()
    })
}

async fn get_user_sqlite(
    pool: &SqlitePool,
    filter: &str,
    value: i64,
) -> Result<Option<TelegramUser>> {
    let sql = format!("SELECT {} FROM telegram_users WHERE {}", USER_COLUMNS, filter);
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .context("Failed to get user")?;

    row.map(|row| row_to_user_sqlite(&row)).transpose()
}

async fn first_admin_sqlite(pool: &SqlitePool) -> Result<Option<TelegramUser>> {
    let sql = format!(
        "SELECT {} FROM telegram_users WHERE role = 'admin' ORDER BY user_id LIMIT 1",
        USER_COLUMNS
    );
    let row = sqlx::query(&sql)
        .fetch_optional(pool)
        .await
        .context("Failed to get admin")?;

    row.map(|row| row_to_user_sqlite(&row)).transpose()
}

async fn set_role_sqlite(pool: &SqlitePool, user_id: i64, role: UserRole) -> Result<()> {
    sqlx::query("UPDATE telegram_users SET role = ? WHERE user_id = ?")
        .bind(role.to_string())
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to update user role")?;
    Ok(())
}

async fn upsert_contact_sqlite(pool: &SqlitePool, contact: &UserContact) -> Result<UserContact> {
    sqlx::query(
        r#"
        INSERT INTO user_contacts (user_id, firstname, secondname, email, city, phonenumber)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            firstname = excluded.firstname,
            secondname = excluded.secondname,
            email = excluded.email,
            city = excluded.city,
            phonenumber = excluded.phonenumber
        "#,
    )
    .bind(contact.user_id)
    .bind(&contact.firstname)
    .bind(&contact.secondname)
    .bind(&contact.email)
    .bind(&contact.city)
    .bind(&contact.phonenumber)
    .execute(pool)
    .await
    .context("Failed to save contact")?;

    Ok(contact.clone())
}

async fn get_contact_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Option<UserContact>> {
    let sql = format!("SELECT {} FROM user_contacts WHERE user_id = ?", CONTACT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get contact")?;

    Ok(row.map(|row| UserContact {
        user_id: row.get("user_id"),
        firstname: row.get("firstname"),
        secondname: row.get("secondname"),
        email: row.get("email"),
        city: row.get("city"),
        phonenumber: row.get("phonenumber"),
    }))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<TelegramUser> {
    let role: String = row.get("role");
    Ok(TelegramUser {
        user_id: row.get("user_id"),
        tg_name: row.get("tg_name"),
        tg_id: row.get("tg_id"),
        role: role.parse()?,
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &TelegramUser) -> Result<TelegramUser> {
    let result = sqlx::query(
        "INSERT INTO telegram_users (tg_name, tg_id, role, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&user.tg_name)
    .bind(user.tg_id)
    .bind(user.role.to_string())
    .bind(user.created_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(TelegramUser {
        user_id: result.last_insert_id() as i64,
        ..user.clone()
    })
}

async fn get_user_mysql(
    pool: &MySqlPool,
    filter: &str,
    value: i64,
) -> Result<Option<TelegramUser>> {
    let sql = format!("SELECT {} FROM telegram_users WHERE {}", USER_COLUMNS, filter);
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .context("Failed to get user")?;

    row.map(|row| row_to_user_mysql(&row)).transpose()
}

async fn first_admin_mysql(pool: &MySqlPool) -> Result<Option<TelegramUser>> {
    let sql = format!(
        "SELECT {} FROM telegram_users WHERE role = 'admin' ORDER BY user_id LIMIT 1",
        USER_COLUMNS
    );
    let row = sqlx::query(&sql)
        .fetch_optional(pool)
        .await
        .context("Failed to get admin")?;

    row.map(|row| row_to_user_mysql(&row)).transpose()
}

async fn set_role_mysql(pool: &MySqlPool, user_id: i64, role: UserRole) -> Result<()> {
    sqlx::query("UPDATE telegram_users SET role = ? WHERE user_id = ?")
        .bind(role.to_string())
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to update user role")?;
    Ok(())
}

async fn upsert_contact_mysql(pool: &MySqlPool, contact: &UserContact) -> Result<UserContact> {
    sqlx::query(
        r#"
        INSERT INTO user_contacts (user_id, firstname, secondname, email, city, phonenumber)
        VALUES (?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            firstname = VALUES(firstname),
            secondname = VALUES(secondname),
            email = VALUES(email),
            city = VALUES(city),
            phonenumber = VALUES(phonenumber)
        "#,
    )
    .bind(contact.user_id)
    .bind(&contact.firstname)
    .bind(&contact.secondname)
    .bind(&contact.email)
    .bind(&contact.city)
    .bind(&contact.phonenumber)
    .execute(pool)
    .await
    .context("Failed to save contact")?;

    Ok(contact.clone())
}

async fn get_contact_mysql(pool: &MySqlPool, user_id: i64) -> Result<Option<UserContact>> {
    let sql = format!("SELECT {} FROM user_contacts WHERE user_id = ?", CONTACT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get contact")?;

    Ok(row.map(|row| UserContact {
        user_id: row.get("user_id"),
        firstname: row.get("firstname"),
        secondname: row.get("secondname"),
        email: row.get("email"),
        city: row.get("city"),
        phonenumber: row.get("phonenumber"),
    }))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<TelegramUser> {
    let role: String = row.get("role");
    Ok(TelegramUser {
        user_id: row.get("user_id"),
        tg_name: row.get("tg_name"),
        tg_id: row.get("tg_id"),
        role: role.parse()?,
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_lookup_user() {
        let repo = setup_test_repo().await;
        let created = repo
            .create(&TelegramUser::new("anna".to_string(), 5001))
            .await
            .expect("Failed to create user");

        assert!(created.user_id > 0);
        assert_eq!(created.role, UserRole::User);

        let by_tg = repo.get_by_tg_id(5001).await.unwrap().expect("by tg id");
        assert_eq!(by_tg.user_id, created.user_id);
        let by_id = repo.get_by_id(created.user_id).await.unwrap().expect("by id");
        assert_eq!(by_id.tg_name, "anna");
        assert!(repo.get_by_tg_id(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_tg_id_fails() {
        let repo = setup_test_repo().await;
        repo.create(&TelegramUser::new("a".to_string(), 7)).await.unwrap();
        assert!(repo.create(&TelegramUser::new("b".to_string(), 7)).await.is_err());
    }

    #[tokio::test]
    async fn test_first_admin_and_role_change() {
        let repo = setup_test_repo().await;
        assert!(repo.first_admin().await.unwrap().is_none());

        let u1 = repo.create(&TelegramUser::new("u1".to_string(), 1)).await.unwrap();
        let u2 = repo.create(&TelegramUser::new("u2".to_string(), 2)).await.unwrap();
        repo.set_role(u2.user_id, UserRole::Admin).await.unwrap();
        repo.set_role(u1.user_id, UserRole::Admin).await.unwrap();

        let admin = repo.first_admin().await.unwrap().expect("admin");
        assert_eq!(admin.user_id, u1.user_id);
    }

    #[tokio::test]
    async fn test_contact_upsert_replaces() {
        let repo = setup_test_repo().await;
        let user = repo.create(&TelegramUser::new("c".to_string(), 3)).await.unwrap();

        let mut contact = UserContact {
            user_id: user.user_id,
            firstname: Some("Anna".to_string()),
            secondname: None,
            email: None,
            city: Some("Kazan".to_string()),
            phonenumber: "+79001234567".to_string(),
        };
        repo.upsert_contact(&contact).await.unwrap();

        contact.city = Some("Perm".to_string());
        repo.upsert_contact(&contact).await.unwrap();

        let stored = repo.get_contact(user.user_id).await.unwrap().expect("contact");
        assert_eq!(stored, contact);
    }
}
