//! Database migrations
//!
//! Schema changes are embedded as SQL strings, one flavour per backend, and
//! applied in version order. Applied versions are recorded in `_migrations`
//! so that running the list again is a no-op.
//!
//! ```ignore
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    pub name: &'static str,
    pub up_sqlite: &'static str,
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All schema migrations, oldest first.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_telegram_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS telegram_users (
                user_id INTEGER PRIMARY KEY AUTOINCREMENT,
                tg_name VARCHAR(100) NOT NULL,
                tg_id BIGINT NOT NULL UNIQUE,
                role VARCHAR(10) NOT NULL DEFAULT 'user'
                    CHECK (role IN ('admin', 'client', 'user')),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS user_contacts (
                user_id INTEGER PRIMARY KEY,
                firstname VARCHAR(255),
                secondname VARCHAR(255),
                email VARCHAR(255),
                city VARCHAR(255),
                phonenumber VARCHAR(32) NOT NULL,
                FOREIGN KEY (user_id) REFERENCES telegram_users(user_id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_telegram_users_role ON telegram_users(role);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS telegram_users (
                user_id BIGINT PRIMARY KEY AUTO_INCREMENT,
                tg_name VARCHAR(100) NOT NULL,
                tg_id BIGINT NOT NULL UNIQUE,
                role VARCHAR(10) NOT NULL DEFAULT 'user'
                    CHECK (role IN ('admin', 'client', 'user')),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS user_contacts (
                user_id BIGINT PRIMARY KEY,
                firstname VARCHAR(255),
                secondname VARCHAR(255),
                email VARCHAR(255),
                city VARCHAR(255),
                phonenumber VARCHAR(32) NOT NULL,
                FOREIGN KEY (user_id) REFERENCES telegram_users(user_id) ON DELETE CASCADE
            );
            CREATE INDEX idx_telegram_users_role ON telegram_users(role);
        "#,
    },
    Migration {
        version: 2,
        name: "create_tariffs_and_payments",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS tariffs (
                tariff_id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL UNIQUE,
                description TEXT NOT NULL,
                price BIGINT NOT NULL DEFAULT 0,
                status VARCHAR(10) NOT NULL DEFAULT 'active'
                    CHECK (status IN ('active', 'archive'))
            );
            CREATE TABLE IF NOT EXISTS payments (
                payment_id INTEGER PRIMARY KEY AUTOINCREMENT,
                payment_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                amount BIGINT NOT NULL,
                user_id INTEGER NOT NULL,
                access_date_start DATE NOT NULL,
                access_date_finish DATE NOT NULL,
                tariff_id INTEGER,
                status VARCHAR(50),
                service_description VARCHAR(255),
                FOREIGN KEY (user_id) REFERENCES telegram_users(user_id) ON DELETE CASCADE,
                FOREIGN KEY (tariff_id) REFERENCES tariffs(tariff_id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_payments_user_id ON payments(user_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS tariffs (
                tariff_id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL UNIQUE,
                description TEXT NOT NULL,
                price BIGINT NOT NULL DEFAULT 0,
                status VARCHAR(10) NOT NULL DEFAULT 'active'
                    CHECK (status IN ('active', 'archive'))
            );
            CREATE TABLE IF NOT EXISTS payments (
                payment_id BIGINT PRIMARY KEY AUTO_INCREMENT,
                payment_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                amount BIGINT NOT NULL,
                user_id BIGINT NOT NULL,
                access_date_start DATE NOT NULL,
                access_date_finish DATE NOT NULL,
                tariff_id BIGINT,
                status VARCHAR(50),
                service_description VARCHAR(255),
                FOREIGN KEY (user_id) REFERENCES telegram_users(user_id) ON DELETE CASCADE,
                FOREIGN KEY (tariff_id) REFERENCES tariffs(tariff_id) ON DELETE SET NULL
            );
            CREATE INDEX idx_payments_user_id ON payments(user_id);
        "#,
    },
    Migration {
        version: 3,
        name: "create_catalog",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS topics (
                topic_id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                description TEXT NOT NULL,
                serial_number INTEGER NOT NULL DEFAULT 0,
                picture VARCHAR(255)
            );
            CREATE TABLE IF NOT EXISTS lessons (
                lesson_id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic_id INTEGER NOT NULL,
                title VARCHAR(255) NOT NULL,
                description TEXT NOT NULL,
                serial_number INTEGER NOT NULL DEFAULT 0,
                picture VARCHAR(255),
                FOREIGN KEY (topic_id) REFERENCES topics(topic_id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS videos (
                video_id INTEGER PRIMARY KEY AUTOINCREMENT,
                lesson_id INTEGER NOT NULL,
                title VARCHAR(255) NOT NULL,
                serial_number INTEGER NOT NULL DEFAULT 0,
                video_link VARCHAR(500) NOT NULL,
                FOREIGN KEY (lesson_id) REFERENCES lessons(lesson_id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS video_summaries (
                summary_id INTEGER PRIMARY KEY AUTOINCREMENT,
                video_id INTEGER NOT NULL,
                title VARCHAR(255),
                description TEXT NOT NULL,
                picture VARCHAR(255),
                FOREIGN KEY (video_id) REFERENCES videos(video_id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS tests (
                test_id INTEGER PRIMARY KEY AUTOINCREMENT,
                lesson_id INTEGER NOT NULL,
                title VARCHAR(255),
                description TEXT NOT NULL,
                show_right_answer BOOLEAN NOT NULL DEFAULT 0,
                FOREIGN KEY (lesson_id) REFERENCES lessons(lesson_id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS practices (
                practice_id INTEGER PRIMARY KEY AUTOINCREMENT,
                lesson_id INTEGER NOT NULL,
                title VARCHAR(255),
                description TEXT NOT NULL,
                exercise VARCHAR(255),
                FOREIGN KEY (lesson_id) REFERENCES lessons(lesson_id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_lessons_topic_id ON lessons(topic_id);
            CREATE INDEX IF NOT EXISTS idx_videos_lesson_id ON videos(lesson_id);
            CREATE INDEX IF NOT EXISTS idx_tests_lesson_id ON tests(lesson_id);
            CREATE INDEX IF NOT EXISTS idx_practices_lesson_id ON practices(lesson_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS topics (
                topic_id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL,
                description TEXT NOT NULL,
                serial_number INT NOT NULL DEFAULT 0,
                picture VARCHAR(255)
            );
            CREATE TABLE IF NOT EXISTS lessons (
                lesson_id BIGINT PRIMARY KEY AUTO_INCREMENT,
                topic_id BIGINT NOT NULL,
                title VARCHAR(255) NOT NULL,
                description TEXT NOT NULL,
                serial_number INT NOT NULL DEFAULT 0,
                picture VARCHAR(255),
                FOREIGN KEY (topic_id) REFERENCES topics(topic_id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS videos (
                video_id BIGINT PRIMARY KEY AUTO_INCREMENT,
                lesson_id BIGINT NOT NULL,
                title VARCHAR(255) NOT NULL,
                serial_number INT NOT NULL DEFAULT 0,
                video_link VARCHAR(500) NOT NULL,
                FOREIGN KEY (lesson_id) REFERENCES lessons(lesson_id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS video_summaries (
                summary_id BIGINT PRIMARY KEY AUTO_INCREMENT,
                video_id BIGINT NOT NULL,
                title VARCHAR(255),
                description TEXT NOT NULL,
                picture VARCHAR(255),
                FOREIGN KEY (video_id) REFERENCES videos(video_id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS tests (
                test_id BIGINT PRIMARY KEY AUTO_INCREMENT,
                lesson_id BIGINT NOT NULL,
                title VARCHAR(255),
                description TEXT NOT NULL,
                show_right_answer BOOLEAN NOT NULL DEFAULT FALSE,
                FOREIGN KEY (lesson_id) REFERENCES lessons(lesson_id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS practices (
                practice_id BIGINT PRIMARY KEY AUTO_INCREMENT,
                lesson_id BIGINT NOT NULL,
                title VARCHAR(255),
                description TEXT NOT NULL,
                exercise VARCHAR(255),
                FOREIGN KEY (lesson_id) REFERENCES lessons(lesson_id) ON DELETE CASCADE
            );
            CREATE INDEX idx_lessons_topic_id ON lessons(topic_id);
            CREATE INDEX idx_videos_lesson_id ON videos(lesson_id);
            CREATE INDEX idx_tests_lesson_id ON tests(lesson_id);
            CREATE INDEX idx_practices_lesson_id ON practices(lesson_id);
        "#,
    },
    // A question hangs off a test or a video, never both.
    // MySQL refuses CHECK constraints on columns with referential actions,
    // so the owner foreign keys there are plain RESTRICT.
    Migration {
        version: 4,
        name: "create_questions_and_answers",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS questions (
                question_id INTEGER PRIMARY KEY AUTOINCREMENT,
                test_id INTEGER,
                video_id INTEGER,
                description TEXT NOT NULL,
                serial_number INTEGER NOT NULL DEFAULT 0,
                picture VARCHAR(255),
                CHECK ((test_id IS NULL) <> (video_id IS NULL)),
                FOREIGN KEY (test_id) REFERENCES tests(test_id) ON DELETE CASCADE,
                FOREIGN KEY (video_id) REFERENCES videos(video_id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS answers (
                answer_id INTEGER PRIMARY KEY AUTOINCREMENT,
                question_id INTEGER NOT NULL,
                description TEXT NOT NULL,
                serial_number INTEGER NOT NULL,
                is_right BOOLEAN NOT NULL DEFAULT 0,
                FOREIGN KEY (question_id) REFERENCES questions(question_id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_questions_test_id ON questions(test_id);
            CREATE INDEX IF NOT EXISTS idx_questions_video_id ON questions(video_id);
            CREATE INDEX IF NOT EXISTS idx_answers_question_id ON answers(question_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS questions (
                question_id BIGINT PRIMARY KEY AUTO_INCREMENT,
                test_id BIGINT,
                video_id BIGINT,
                description TEXT NOT NULL,
                serial_number INT NOT NULL DEFAULT 0,
                picture VARCHAR(255),
                CONSTRAINT chk_question_owner CHECK ((test_id IS NULL) <> (video_id IS NULL)),
                FOREIGN KEY (test_id) REFERENCES tests(test_id),
                FOREIGN KEY (video_id) REFERENCES videos(video_id)
            );
            CREATE TABLE IF NOT EXISTS answers (
                answer_id BIGINT PRIMARY KEY AUTO_INCREMENT,
                question_id BIGINT NOT NULL,
                description TEXT NOT NULL,
                serial_number INT NOT NULL,
                is_right BOOLEAN NOT NULL DEFAULT FALSE,
                FOREIGN KEY (question_id) REFERENCES questions(question_id) ON DELETE CASCADE
            );
            CREATE INDEX idx_answers_question_id ON answers(question_id);
        "#,
    },
    Migration {
        version: 5,
        name: "create_unlock_edges",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS unlock_edges (
                source_kind VARCHAR(10) NOT NULL
                    CHECK (source_kind IN ('topic', 'lesson', 'video', 'test', 'practice')),
                source_id BIGINT NOT NULL,
                target_kind VARCHAR(10) NOT NULL
                    CHECK (target_kind IN ('topic', 'lesson', 'video', 'test', 'practice')),
                target_id BIGINT NOT NULL,
                PRIMARY KEY (source_kind, source_id, target_kind, target_id)
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS unlock_edges (
                source_kind VARCHAR(10) NOT NULL
                    CHECK (source_kind IN ('topic', 'lesson', 'video', 'test', 'practice')),
                source_id BIGINT NOT NULL,
                target_kind VARCHAR(10) NOT NULL
                    CHECK (target_kind IN ('topic', 'lesson', 'video', 'test', 'practice')),
                target_id BIGINT NOT NULL,
                PRIMARY KEY (source_kind, source_id, target_kind, target_id)
            );
        "#,
    },
    Migration {
        version: 6,
        name: "create_progress_sets",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS user_availability (
                user_id INTEGER NOT NULL,
                content_kind VARCHAR(10) NOT NULL
                    CHECK (content_kind IN ('topic', 'lesson', 'video', 'test', 'practice')),
                content_id BIGINT NOT NULL,
                granted_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, content_kind, content_id),
                FOREIGN KEY (user_id) REFERENCES telegram_users(user_id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS start_availability (
                tariff_id INTEGER NOT NULL,
                content_kind VARCHAR(10) NOT NULL
                    CHECK (content_kind IN ('topic', 'lesson', 'video', 'test', 'practice')),
                content_id BIGINT NOT NULL,
                PRIMARY KEY (tariff_id, content_kind, content_id),
                FOREIGN KEY (tariff_id) REFERENCES tariffs(tariff_id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS user_done (
                user_id INTEGER NOT NULL,
                content_kind VARCHAR(10) NOT NULL
                    CHECK (content_kind IN ('topic', 'lesson', 'video', 'test', 'practice')),
                content_id BIGINT NOT NULL,
                completed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, content_kind, content_id),
                FOREIGN KEY (user_id) REFERENCES telegram_users(user_id) ON DELETE CASCADE
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS user_availability (
                user_id BIGINT NOT NULL,
                content_kind VARCHAR(10) NOT NULL
                    CHECK (content_kind IN ('topic', 'lesson', 'video', 'test', 'practice')),
                content_id BIGINT NOT NULL,
                granted_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, content_kind, content_id),
                FOREIGN KEY (user_id) REFERENCES telegram_users(user_id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS start_availability (
                tariff_id BIGINT NOT NULL,
                content_kind VARCHAR(10) NOT NULL
                    CHECK (content_kind IN ('topic', 'lesson', 'video', 'test', 'practice')),
                content_id BIGINT NOT NULL,
                PRIMARY KEY (tariff_id, content_kind, content_id),
                FOREIGN KEY (tariff_id) REFERENCES tariffs(tariff_id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS user_done (
                user_id BIGINT NOT NULL,
                content_kind VARCHAR(10) NOT NULL
                    CHECK (content_kind IN ('topic', 'lesson', 'video', 'test', 'practice')),
                content_id BIGINT NOT NULL,
                completed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, content_kind, content_id),
                FOREIGN KEY (user_id) REFERENCES telegram_users(user_id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 7,
        name: "create_catalog_revision",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS catalog_revision (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                revision BIGINT NOT NULL DEFAULT 0
            );
            INSERT INTO catalog_revision (id, revision) VALUES (1, 0);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS catalog_revision (
                id INT PRIMARY KEY CHECK (id = 1),
                revision BIGINT NOT NULL DEFAULT 0
            );
            INSERT INTO catalog_revision (id, revision) VALUES (1, 0);
        "#,
    },
];

/// Run all pending migrations.
///
/// Returns the number of migrations applied by this call.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i64> = applied.iter().map(|m| m.version).collect();

    let mut count = 0;
    for migration in MIGRATIONS {
        if applied_versions.contains(&i64::from(migration.version)) {
            continue;
        }
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        apply_migration(pool, migration)
            .await
            .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
        count += 1;
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    match pool.driver() {
        DatabaseDriver::Sqlite => get_applied_migrations_sqlite(pool.sqlite()?).await,
        DatabaseDriver::Mysql => get_applied_migrations_mysql(pool.mysql()?).await,
    }
}

async fn get_applied_migrations_sqlite(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn get_applied_migrations_mysql(pool: &MySqlPool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Sqlite => apply_migration_sqlite(pool.sqlite()?, migration).await,
        DatabaseDriver::Mysql => apply_migration_mysql(pool.mysql()?, migration).await,
    }
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    let mut tx = pool.begin().await?;
    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(i64::from(migration.version))
        .bind(migration.name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

// MySQL commits DDL implicitly, so there is nothing to gain from a
// transaction here.
async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(i64::from(migration.version))
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, dropping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Number of migrations not yet applied
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;
    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}
