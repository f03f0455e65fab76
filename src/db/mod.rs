//! Database layer
//!
//! Storage for the course catalog, learners, payments and progress. Two
//! backends are supported behind the [`DatabasePool`] trait:
//! - SQLite (default, a single file next to the binary)
//! - MySQL (for shared deployments)
//!
//! # Usage
//!
//! ```ignore
//! use coursegate::config::DatabaseConfig;
//! use coursegate::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
