//! Payment repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Payment;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Record a payment; `payment_id` of the argument is ignored
    async fn create(&self, payment: &Payment) -> Result<Payment>;

    /// Payments of a user, oldest first
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Payment>>;
}

pub struct SqlxPaymentRepository {
    pool: DynDatabasePool,
}

impl SqlxPaymentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PaymentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PaymentRepository for SqlxPaymentRepository {
    async fn create(&self, payment: &Payment) -> Result<Payment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_payment_sqlite(self.pool.sqlite()?, payment).await,
            DatabaseDriver::Mysql => create_payment_mysql(self.pool.mysql()?, payment).await,
        }
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Payment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_payments_sqlite(self.pool.sqlite()?, user_id).await,
            DatabaseDriver::Mysql => list_payments_mysql(self.pool.mysql()?, user_id).await,
        }
    }
}

const INSERT_PAYMENT_SQL: &str = r#"
    INSERT INTO payments (payment_date, amount, user_id, access_date_start, access_date_finish,
                          tariff_id, status, service_description)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;

const LIST_PAYMENTS_SQL: &str = r#"
    SELECT payment_id, payment_date, amount, user_id, access_date_start, access_date_finish,
           tariff_id, status, service_description
    FROM payments WHERE user_id = ? ORDER BY payment_id
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_payment_sqlite(pool: &SqlitePool, payment: &Payment) -> Result<Payment> {
    let result = sqlx::query(INSERT_PAYMENT_SQL)
        .bind(payment.payment_date)
        .bind(payment.amount)
        .bind(payment.user_id)
        .bind(payment.access_date_start)
        .bind(payment.access_date_finish)
        .bind(payment.tariff_id)
        .bind(&payment.status)
        .bind(&payment.service_description)
        .execute(pool)
        .await
        .context("Failed to record payment")?;

    Ok(Payment {
        payment_id: result.last_insert_rowid(),
        ..payment.clone()
    })
}

async fn list_payments_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Vec<Payment>> {
    let rows = sqlx::query(LIST_PAYMENTS_SQL)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list payments")?;

    Ok(rows.iter().map(row_to_payment_sqlite).collect())
}

fn row_to_payment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Payment {
    Payment {
        payment_id: row.get("payment_id"),
        payment_date: row.get("payment_date"),
        amount: row.get("amount"),
        user_id: row.get("user_id"),
        access_date_start: row.get("access_date_start"),
        access_date_finish: row.get("access_date_finish"),
        tariff_id: row.get("tariff_id"),
        status: row.get("status"),
        service_description: row.get("service_description"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_payment_mysql(pool: &MySqlPool, payment: &Payment) -> Result<Payment> {
    let result = sqlx::query(INSERT_PAYMENT_SQL)
        .bind(payment.payment_date)
        .bind(payment.amount)
        .bind(payment.user_id)
        .bind(payment.access_date_start)
        .bind(payment.access_date_finish)
        .bind(payment.tariff_id)
        .bind(&payment.status)
        .bind(&payment.service_description)
        .execute(pool)
        .await
        .context("Failed to record payment")?;

    Ok(Payment {
        payment_id: result.last_insert_id() as i64,
        ..payment.clone()
    })
}

async fn list_payments_mysql(pool: &MySqlPool, user_id: i64) -> Result<Vec<Payment>> {
    let rows = sqlx::query(LIST_PAYMENTS_SQL)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list payments")?;

    Ok(rows.iter().map(row_to_payment_mysql).collect())
}

fn row_to_payment_mysql(row: &sqlx::mysql::MySqlRow) -> Payment {
    Payment {
        payment_id: row.get("payment_id"),
        payment_date: row.get("payment_date"),
        amount: row.get("amount"),
        user_id: row.get("user_id"),
        access_date_start: row.get("access_date_start"),
        access_date_finish: row.get("access_date_finish"),
        tariff_id: row.get("tariff_id"),
        status: row.get("status"),
        service_description: row.get("service_description"),
    }
}
