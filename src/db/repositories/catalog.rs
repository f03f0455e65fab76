//! Catalog repository
//!
//! Topics, lessons, videos with their summaries, tests, practices and the
//! unlock edges between them. The catalog is written by the fixture loader and
//! read by everything else, so listing is the hot path: every list is returned
//! in display order.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{
    ContentRef, CreateLessonInput, CreatePracticeInput, CreateTestInput, CreateTopicInput,
    CreateVideoInput, CreateVideoSummaryInput, Lesson, Practice, Test, Topic, UnlockEdge, Video,
    VideoSummary,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn count_topics(&self) -> Result<i64>;

    /// Counter bumped after every catalog write, shared by all processes
    async fn revision(&self) -> Result<i64>;
    async fn bump_revision(&self) -> Result<i64>;

    async fn create_topic(&self, input: &CreateTopicInput) -> Result<Topic>;
    async fn list_topics(&self) -> Result<Vec<Topic>>;
    async fn get_topic_by_title(&self, title: &str) -> Result<Option<Topic>>;

    async fn create_lesson(&self, input: &CreateLessonInput) -> Result<Lesson>;
    async fn list_lessons(&self) -> Result<Vec<Lesson>>;
    async fn list_lessons_by_topic(&self, topic_id: i64) -> Result<Vec<Lesson>>;

    async fn create_video(&self, input: &CreateVideoInput) -> Result<Video>;
    async fn list_videos(&self) -> Result<Vec<Video>>;
    async fn list_videos_by_lesson(&self, lesson_id: i64) -> Result<Vec<Video>>;
    async fn get_video(&self, video_id: i64) -> Result<Option<Video>>;

    async fn create_summary(&self, input: &CreateVideoSummaryInput) -> Result<VideoSummary>;
    async fn list_summaries(&self) -> Result<Vec<VideoSummary>>;
    async fn list_summaries_by_video(&self, video_id: i64) -> Result<Vec<VideoSummary>>;

    async fn create_test(&self, input: &CreateTestInput) -> Result<Test>;
    async fn list_tests(&self) -> Result<Vec<Test>>;
    async fn list_tests_by_lesson(&self, lesson_id: i64) -> Result<Vec<Test>>;
    async fn get_test(&self, test_id: i64) -> Result<Option<Test>>;
    async fn get_test_by_title(&self, title: &str) -> Result<Option<Test>>;

    async fn create_practice(&self, input: &CreatePracticeInput) -> Result<Practice>;
    async fn list_practices(&self) -> Result<Vec<Practice>>;
    async fn list_practices_by_lesson(&self, lesson_id: i64) -> Result<Vec<Practice>>;
    async fn get_practice(&self, practice_id: i64) -> Result<Option<Practice>>;

    /// Add an unlock edge; returns false if it already existed
    async fn add_edge(&self, edge: &UnlockEdge) -> Result<bool>;
    async fn list_edges(&self) -> Result<Vec<UnlockEdge>>;
}

pub struct SqlxCatalogRepository {
    pool: DynDatabasePool,
}

impl SqlxCatalogRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CatalogRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_sqlite(&self, listing: Listing, filter: Filter<'_>) -> Result<Vec<SqliteRow>> {
        let sql = listing.select_sql(&filter);
        filter
            .bind_sqlite(sqlx::query(&sql))
            .fetch_all(self.pool.sqlite()?)
            .await
            .with_context(|| format!("Failed to read {}", listing.table))
    }

    async fn fetch_mysql(&self, listing: Listing, filter: Filter<'_>) -> Result<Vec<MySqlRow>> {
        let sql = listing.select_sql(&filter);
        filter
            .bind_mysql(sqlx::query(&sql))
            .fetch_all(self.pool.mysql()?)
            .await
            .with_context(|| format!("Failed to read {}", listing.table))
    }

    async fn topics(&self, filter: Filter<'_>) -> Result<Vec<Topic>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => Ok(self
                .fetch_sqlite(TOPICS, filter)
                .await?
                .iter()
                .map(row_to_topic_sqlite)
                .collect()),
            DatabaseDriver::Mysql => Ok(self
                .fetch_mysql(TOPICS, filter)
                .await?
                .iter()
                .map(row_to_topic_mysql)
                .collect()),
        }
    }

    async fn lessons(&self, filter: Filter<'_>) -> Result<Vec<Lesson>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => Ok(self
                .fetch_sqlite(LESSONS, filter)
                .await?
                .iter()
                .map(row_to_lesson_sqlite)
                .collect()),
            DatabaseDriver::Mysql => Ok(self
                .fetch_mysql(LESSONS, filter)
                .await?
                .iter()
                .map(row_to_lesson_mysql)
                .collect()),
        }
    }

    async fn videos(&self, filter: Filter<'_>) -> Result<Vec<Video>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => Ok(self
                .fetch_sqlite(VIDEOS, filter)
                .await?
                .iter()
                .map(row_to_video_sqlite)
                .collect()),
            DatabaseDriver::Mysql => Ok(self
                .fetch_mysql(VIDEOS, filter)
                .await?
                .iter()
                .map(row_to_video_mysql)
                .collect()),
        }
    }

    async fn summaries(&self, filter: Filter<'_>) -> Result<Vec<VideoSummary>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => Ok(self
                .fetch_sqlite(SUMMARIES, filter)
                .await?
                .iter()
                .map(row_to_summary_sqlite)
                .collect()),
            DatabaseDriver::Mysql => Ok(self
                .fetch_mysql(SUMMARIES, filter)
                .await?
                .iter()
                .map(row_to_summary_mysql)
                .collect()),
        }
    }

    async fn tests(&self, filter: Filter<'_>) -> Result<Vec<Test>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => Ok(self
                .fetch_sqlite(TESTS, filter)
                .await?
                .iter()
                .map(row_to_test_sqlite)
                .collect()),
            DatabaseDriver::Mysql => Ok(self
                .fetch_mysql(TESTS, filter)
                .await?
                .iter()
                .map(row_to_test_mysql)
                .collect()),
        }
    }

    async fn practices(&self, filter: Filter<'_>) -> Result<Vec<Practice>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => Ok(self
                .fetch_sqlite(PRACTICES, filter)
                .await?
                .iter()
                .map(row_to_practice_sqlite)
                .collect()),
            DatabaseDriver::Mysql => Ok(self
                .fetch_mysql(PRACTICES, filter)
                .await?
                .iter()
                .map(row_to_practice_mysql)
                .collect()),
        }
    }

    /// Run an INSERT and return the new row id
    async fn insert(&self, sql: &str, values: Vec<Value>) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(sql);
                for value in values {
                    query = value.bind_sqlite(query);
                }
                let result = query.execute(self.pool.sqlite()?).await?;
                Ok(result.last_insert_rowid())
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(sql);
                for value in values {
                    query = value.bind_mysql(query);
                }
                let result = query.execute(self.pool.mysql()?).await?;
                Ok(result.last_insert_id() as i64)
            }
        }
    }
}

#[async_trait]
impl CatalogRepository for SqlxCatalogRepository {
    async fn count_topics(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM topics";
        let count: std::result::Result<i64, sqlx::Error> = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .fetch_one(self.pool.sqlite()?)
                .await
                .map(|row| row.get("count")),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .fetch_one(self.pool.mysql()?)
                .await
                .map(|row| row.get("count")),
        };
        count.context("Failed to count topics")
    }

    async fn revision(&self) -> Result<i64> {
        let sql = "SELECT revision FROM catalog_revision WHERE id = 1";
        let revision: std::result::Result<Option<i64>, sqlx::Error> = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .map(|row| row.map(|row| row.get("revision"))),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .fetch_optional(self.pool.mysql()?)
                .await
                .map(|row| row.map(|row| row.get("revision"))),
        };
        Ok(revision.context("Failed to read catalog revision")?.unwrap_or(0))
    }

    async fn bump_revision(&self) -> Result<i64> {
        let sql = "UPDATE catalog_revision SET revision = revision + 1 WHERE id = 1";
        let updated: std::result::Result<u64, sqlx::Error> = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .execute(self.pool.sqlite()?)
                .await
                .map(|done| done.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .execute(self.pool.mysql()?)
                .await
                .map(|done| done.rows_affected()),
        };
        updated.context("Failed to bump catalog revision")?;
        self.revision().await
    }

    async fn create_topic(&self, input: &CreateTopicInput) -> Result<Topic> {
        let topic_id = self
            .insert(
                "INSERT INTO topics (title, description, serial_number, picture) \
                 VALUES (?, ?, ?, ?)",
                vec![
                    Value::Text(input.title.clone()),
                    Value::Text(input.description.clone()),
                    Value::Int(input.serial_number),
                    Value::OptText(input.picture.clone()),
                ],
            )
            .await
            .context("Failed to create topic")?;

        Ok(Topic {
            topic_id,
            title: input.title.clone(),
            description: input.description.clone(),
            serial_number: input.serial_number,
            picture: input.picture.clone(),
        })
    }

    async fn list_topics(&self) -> Result<Vec<Topic>> {
        self.topics(Filter::All).await
    }

    async fn get_topic_by_title(&self, title: &str) -> Result<Option<Topic>> {
        Ok(self
            .topics(Filter::Text("title", title))
            .await?
            .into_iter()
            .next())
    }

    async fn create_lesson(&self, input: &CreateLessonInput) -> Result<Lesson> {
        let lesson_id = self
            .insert(
                "INSERT INTO lessons (topic_id, title, description, serial_number, picture) \
                 VALUES (?, ?, ?, ?, ?)",
                vec![
                    Value::Id(input.topic_id),
                    Value::Text(input.title.clone()),
                    Value::Text(input.description.clone()),
                    Value::Int(input.serial_number),
                    Value::OptText(input.picture.clone()),
                ],
            )
            .await
            .context("Failed to create lesson")?;

        Ok(Lesson {
            lesson_id,
            topic_id: input.topic_id,
            title: input.title.clone(),
            description: input.description.clone(),
            serial_number: input.serial_number,
            picture: input.picture.clone(),
        })
    }

    async fn list_lessons(&self) -> Result<Vec<Lesson>> {
        self.lessons(Filter::All).await
    }

    async fn list_lessons_by_topic(&self, topic_id: i64) -> Result<Vec<Lesson>> {
        self.lessons(Filter::Id("topic_id", topic_id)).await
    }

    async fn create_video(&self, input: &CreateVideoInput) -> Result<Video> {
        let video_id = self
            .insert(
                "INSERT INTO videos (lesson_id, title, serial_number, video_link) \
                 VALUES (?, ?, ?, ?)",
                vec![
                    Value::Id(input.lesson_id),
                    Value::Text(input.title.clone()),
                    Value::Int(input.serial_number),
                    Value::Text(input.video_link.clone()),
                ],
            )
            .await
            .context("Failed to create video")?;

        Ok(Video {
            video_id,
            lesson_id: input.lesson_id,
            title: input.title.clone(),
            serial_number: input.serial_number,
            video_link: input.video_link.clone(),
        })
    }

    async fn list_videos(&self) -> Result<Vec<Video>> {
        self.videos(Filter::All).await
    }

    async fn list_videos_by_lesson(&self, lesson_id: i64) -> Result<Vec<Video>> {
        self.videos(Filter::Id("lesson_id", lesson_id)).await
    }

    async fn get_video(&self, video_id: i64) -> Result<Option<Video>> {
        Ok(self
            .videos(Filter::Id("video_id", video_id))
            .await?
            .into_iter()
            .next())
    }

    async fn create_summary(&self, input: &CreateVideoSummaryInput) -> Result<VideoSummary> {
        let summary_id = self
            .insert(
                "INSERT INTO video_summaries (video_id, title, description, picture) \
                 VALUES (?, ?, ?, ?)",
                vec![
                    Value::Id(input.video_id),
                    Value::OptText(input.title.clone()),
                    Value::Text(input.description.clone()),
                    Value::OptText(input.picture.clone()),
                ],
            )
            .await
            .context("Failed to create video summary")?;

        Ok(VideoSummary {
            summary_id,
            video_id: input.video_id,
            title: input.title.clone(),
            description: input.description.clone(),
            picture: input.picture.clone(),
        })
    }

    async fn list_summaries(&self) -> Result<Vec<VideoSummary>> {
        self.summaries(Filter::All).await
    }

    async fn list_summaries_by_video(&self, video_id: i64) -> Result<Vec<VideoSummary>> {
        self.summaries(Filter::Id("video_id", video_id)).await
    }

    async fn create_test(&self, input: &CreateTestInput) -> Result<Test> {
        let test_id = self
            .insert(
                "INSERT INTO tests (lesson_id, title, description, show_right_answer) \
                 VALUES (?, ?, ?, ?)",
                vec![
                    Value::Id(input.lesson_id),
                    Value::OptText(input.title.clone()),
                    Value::Text(input.description.clone()),
                    Value::Flag(input.show_right_answer),
                ],
            )
            .await
            .context("Failed to create test")?;

        Ok(Test {
            test_id,
            lesson_id: input.lesson_id,
            title: input.title.clone(),
            description: input.description.clone(),
            show_right_answer: input.show_right_answer,
        })
    }

    async fn list_tests(&self) -> Result<Vec<Test>> {
        self.tests(Filter::All).await
    }

    async fn list_tests_by_lesson(&self, lesson_id: i64) -> Result<Vec<Test>> {
        self.tests(Filter::Id("lesson_id", lesson_id)).await
    }

    async fn get_test(&self, test_id: i64) -> Result<Option<Test>> {
        Ok(self
            .tests(Filter::Id("test_id", test_id))
            .await?
            .into_iter()
            .next())
    }

    async fn get_test_by_title(&self, title: &str) -> Result<Option<Test>> {
        Ok(self
            .tests(Filter::Text("title", title))
            .await?
            .into_iter()
            .next())
    }

    async fn create_practice(&self, input: &CreatePracticeInput) -> Result<Practice> {
        let practice_id = self
            .insert(
                "INSERT INTO practices (lesson_id, title, description, exercise) \
                 VALUES (?, ?, ?, ?)",
                vec![
                    Value::Id(input.lesson_id),
                    Value::OptText(input.title.clone()),
                    Value::Text(input.description.clone()),
                    Value::OptText(input.exercise.clone()),
                ],
            )
            .await
            .context("Failed to create practice")?;

        Ok(Practice {
            practice_id,
            lesson_id: input.lesson_id,
            title: input.title.clone(),
            description: input.description.clone(),
            exercise: input.exercise.clone(),
        })
    }

    async fn list_practices(&self) -> Result<Vec<Practice>> {
        self.practices(Filter::All).await
    }

    async fn list_practices_by_lesson(&self, lesson_id: i64) -> Result<Vec<Practice>> {
        self.practices(Filter::Id("lesson_id", lesson_id)).await
    }

    async fn get_practice(&self, practice_id: i64) -> Result<Option<Practice>> {
        Ok(self
            .practices(Filter::Id("practice_id", practice_id))
            .await?
            .into_iter()
            .next())
    }

    async fn add_edge(&self, edge: &UnlockEdge) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => add_edge_sqlite(self.pool.sqlite()?, edge).await,
            DatabaseDriver::Mysql => add_edge_mysql(self.pool.mysql()?, edge).await,
        }
    }

    async fn list_edges(&self) -> Result<Vec<UnlockEdge>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_edges_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => list_edges_mysql(self.pool.mysql()?).await,
        }
    }
}

// ============================================================================
// Query building
// ============================================================================

/// A catalog table and the order its rows are listed in.
#[derive(Debug, Clone, Copy)]
struct Listing {
    table: &'static str,
    columns: &'static str,
    order: &'static str,
}

const TOPICS: Listing = Listing {
    table: "topics",
    columns: "topic_id, title, description, serial_number, picture",
    order: "serial_number, topic_id",
};

const LESSONS: Listing = Listing {
    table: "lessons",
    columns: "lesson_id, topic_id, title, description, serial_number, picture",
    order: "serial_number, lesson_id",
};

const VIDEOS: Listing = Listing {
    table: "videos",
    columns: "video_id, lesson_id, title, serial_number, video_link",
    order: "serial_number, video_id",
};

const SUMMARIES: Listing = Listing {
    table: "video_summaries",
    columns: "summary_id, video_id, title, description, picture",
    order: "summary_id",
};

const TESTS: Listing = Listing {
    table: "tests",
    columns: "test_id, lesson_id, title, description, show_right_answer",
    order: "test_id",
};

const PRACTICES: Listing = Listing {
    table: "practices",
    columns: "practice_id, lesson_id, title, description, exercise",
    order: "practice_id",
};

impl Listing {
    fn select_sql(&self, filter: &Filter<'_>) -> String {
        let condition = match filter {
            Filter::All => String::new(),
            Filter::Id(column, _) | Filter::Text(column, _) => format!(" WHERE {} = ?", column),
        };
        format!(
            "SELECT {} FROM {}{} ORDER BY {}",
            self.columns, self.table, condition, self.order
        )
    }
}

/// Single-column equality filter for catalog reads.
enum Filter<'a> {
    All,
    Id(&'static str, i64),
    Text(&'static str, &'a str),
}

impl Filter<'_> {
    fn bind_sqlite<'q>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            Filter::All => query,
            Filter::Id(_, id) => query.bind(*id),
            Filter::Text(_, text) => query.bind(text.to_string()),
        }
    }

    fn bind_mysql<'q>(
        &self,
        query: Query<'q, MySql, MySqlArguments>,
    ) -> Query<'q, MySql, MySqlArguments> {
        match self {
            Filter::All => query,
            Filter::Id(_, id) => query.bind(*id),
            Filter::Text(_, text) => query.bind(text.to_string()),
        }
    }
}

/// Column value for catalog inserts.
enum Value {
    Id(i64),
    Int(i32),
    Flag(bool),
    Text(String),
    OptText(Option<String>),
}

impl Value {
    fn bind_sqlite<'q>(
        self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            Value::Id(v) => query.bind(v),
            Value::Int(v) => query.bind(v),
            Value::Flag(v) => query.bind(v),
            Value::Text(v) => query.bind(v),
            Value::OptText(v) => query.bind(v),
        }
    }

    fn bind_mysql<'q>(
        self,
        query: Query<'q, MySql, MySqlArguments>,
    ) -> Query<'q, MySql, MySqlArguments> {
        match self {
            Value::Id(v) => query.bind(v),
            Value::Int(v) => query.bind(v),
            Value::Flag(v) => query.bind(v),
            Value::Text(v) => query.bind(v),
            Value::OptText(v) => query.bind(v),
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

fn row_to_topic_sqlite(row: &SqliteRow) -> Topic {
    Topic {
        topic_id: row.get("topic_id"),
        title: row.get("title"),
        description: row.get("description"),
        serial_number: row.get("serial_number"),
        picture: row.get("picture"),
    }
}

fn row_to_lesson_sqlite(row: &SqliteRow) -> Lesson {
    Lesson {
        lesson_id: row.get("lesson_id"),
        topic_id: row.get("topic_id"),
        title: row.get("title"),
        description: row.get("description"),
        serial_number: row.get("serial_number"),
        picture: row.get("picture"),
    }
}

fn row_to_video_sqlite(row: &SqliteRow) -> Video {
    Video {
        video_id: row.get("video_id"),
        lesson_id: row.get("lesson_id"),
        title: row.get("title"),
        serial_number: row.get("serial_number"),
        video_link: row.get("video_link"),
    }
}

fn row_to_summary_sqlite(row: &SqliteRow) -> VideoSummary {
    VideoSummary {
        summary_id: row.get("summary_id"),
        video_id: row.get("video_id"),
        title: row.get("title"),
        description: row.get("description"),
        picture: row.get("picture"),
    }
}

fn row_to_test_sqlite(row: &SqliteRow) -> Test {
    Test {
        test_id: row.get("test_id"),
        lesson_id: row.get("lesson_id"),
        title: row.get("title"),
        description: row.get("description"),
        show_right_answer: row.get("show_right_answer"),
    }
}

fn row_to_practice_sqlite(row: &SqliteRow) -> Practice {
    Practice {
        practice_id: row.get("practice_id"),
        lesson_id: row.get("lesson_id"),
        title: row.get("title"),
        description: row.get("description"),
        exercise: row.get("exercise"),
    }
}

async fn add_edge_sqlite(pool: &SqlitePool, edge: &UnlockEdge) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO unlock_edges (source_kind, source_id, target_kind, target_id) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(edge.source.kind.as_str())
    .bind(edge.source.id)
    .bind(edge.target.kind.as_str())
    .bind(edge.target.id)
    .execute(pool)
    .await
    .context("Failed to add unlock edge")?;

    Ok(result.rows_affected() > 0)
}

const LIST_EDGES_SQL: &str = r#"
    SELECT source_kind, source_id, target_kind, target_id FROM unlock_edges
    ORDER BY source_kind, source_id, target_kind, target_id
"#;

async fn list_edges_sqlite(pool: &SqlitePool) -> Result<Vec<UnlockEdge>> {
    let rows = sqlx::query(LIST_EDGES_SQL)
        .fetch_all(pool)
        .await
        .context("Failed to list unlock edges")?;

    rows.iter()
        .map(|row| {
            edge_from_columns(
                row.get("source_kind"),
                row.get("source_id"),
                row.get("target_kind"),
                row.get("target_id"),
            )
        })
        .collect()
}

fn edge_from_columns(
    source_kind: String,
    source_id: i64,
    target_kind: String,
    target_id: i64,
) -> Result<UnlockEdge> {
    Ok(UnlockEdge {
        source: ContentRef::new(source_kind.parse()?, source_id),
        target: ContentRef::new(target_kind.parse()?, target_id),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

fn row_to_topic_mysql(row: &MySqlRow) -> Topic {
    Topic {
        topic_id: row.get("topic_id"),
        title: row.get("title"),
        description: row.get("description"),
        serial_number: row.get("serial_number"),
        picture: row.get("picture"),
    }
}

fn row_to_lesson_mysql(row: &MySqlRow) -> Lesson {
    Lesson {
        lesson_id: row.get("lesson_id"),
        topic_id: row.get("topic_id"),
        title: row.get("title"),
        description: row.get("description"),
        serial_number: row.get("serial_number"),
        picture: row.get("picture"),
    }
}

fn row_to_video_mysql(row: &MySqlRow) -> Video {
    Video {
        video_id: row.get("video_id"),
        lesson_id: row.get("lesson_id"),
        title: row.get("title"),
        serial_number: row.get("serial_number"),
        video_link: row.get("video_link"),
    }
}

fn row_to_summary_mysql(row: &MySqlRow) -> VideoSummary {
    VideoSummary {
        summary_id: row.get("summary_id"),
        video_id: row.get("video_id"),
        title: row.get("title"),
        description: row.get("description"),
        picture: row.get("picture"),
    }
}

fn row_to_test_mysql(row: &MySqlRow) -> Test {
    Test {
        test_id: row.get("test_id"),
        lesson_id: row.get("lesson_id"),
        title: row.get("title"),
        description: row.get("description"),
        show_right_answer: row.get("show_right_answer"),
    }
}

fn row_to_practice_mysql(row: &MySqlRow) -> Practice {
    Practice {
        practice_id: row.get("practice_id"),
        lesson_id: row.get("lesson_id"),
        title: row.get("title"),
        description: row.get("description"),
        exercise: row.get("exercise"),
    }
}

async fn add_edge_mysql(pool: &MySqlPool, edge: &UnlockEdge) -> Result<bool> {
    let result = sqlx::query(
        "INSERT IGNORE INTO unlock_edges (source_kind, source_id, target_kind, target_id) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(edge.source.kind.as_str())
    .bind(edge.source.id)
    .bind(edge.target.kind.as_str())
    .bind(edge.target.id)
    .execute(pool)
    .await
    .context("Failed to add unlock edge")?;

    Ok(result.rows_affected() > 0)
}

async fn list_edges_mysql(pool: &MySqlPool) -> Result<Vec<UnlockEdge>> {
    let rows = sqlx::query(LIST_EDGES_SQL)
        .fetch_all(pool)
        .await
        .context("Failed to list unlock edges")?;

    rows.iter()
        .map(|row| {
            edge_from_columns(
                row.get("source_kind"),
                row.get("source_id"),
                row.get("target_kind"),
                row.get("target_id"),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxCatalogRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxCatalogRepository::new(pool)
    }

    fn topic(title: &str, serial_number: i32) -> CreateTopicInput {
        CreateTopicInput {
            title: title.to_string(),
            description: format!("About {}", title),
            serial_number,
            picture: None,
        }
    }

    fn lesson(topic_id: i64, title: &str, serial_number: i32) -> CreateLessonInput {
        CreateLessonInput {
            topic_id,
            title: title.to_string(),
            description: String::new(),
            serial_number,
            picture: Some("lessons/cover.png".to_string()),
        }
    }

    fn video(lesson_id: i64, title: &str, serial_number: i32) -> CreateVideoInput {
        CreateVideoInput {
            lesson_id,
            title: title.to_string(),
            serial_number,
            video_link: format!("https://video.example/{}", serial_number),
        }
    }

    #[tokio::test]
    async fn test_revision_is_shared_between_repositories() {
        let repo = setup_test_repo().await;
        let other = SqlxCatalogRepository::new(repo.pool.clone());

        assert_eq!(repo.revision().await.unwrap(), 0);
        assert_eq!(repo.bump_revision().await.unwrap(), 1);
        assert_eq!(other.revision().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_topics_listed_by_serial_number() {
        let repo = setup_test_repo().await;
        assert_eq!(repo.count_topics().await.unwrap(), 0);

        repo.create_topic(&topic("Second", 2)).await.unwrap();
        repo.create_topic(&topic("First", 1)).await.unwrap();

        let titles: Vec<_> = repo
            .list_topics()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["First", "Second"]);
        assert_eq!(repo.count_topics().await.unwrap(), 2);

        let found = repo.get_topic_by_title("Second").await.unwrap().expect("topic");
        assert_eq!(found.serial_number, 2);
        assert!(repo.get_topic_by_title("Third").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lessons_and_videos_filtered_by_parent() {
        let repo = setup_test_repo().await;
        let t1 = repo.create_topic(&topic("T1", 1)).await.unwrap();
        let t2 = repo.create_topic(&topic("T2", 2)).await.unwrap();
        let l1 = repo.create_lesson(&lesson(t1.topic_id, "L1", 1)).await.unwrap();
        repo.create_lesson(&lesson(t2.topic_id, "L2", 1)).await.unwrap();

        let in_t1 = repo.list_lessons_by_topic(t1.topic_id).await.unwrap();
        assert_eq!(in_t1, vec![l1.clone()]);
        assert_eq!(repo.list_lessons().await.unwrap().len(), 2);

        repo.create_video(&video(l1.lesson_id, "B", 2)).await.unwrap();
        let a = repo.create_video(&video(l1.lesson_id, "A", 1)).await.unwrap();

        let videos = repo.list_videos_by_lesson(l1.lesson_id).await.unwrap();
        assert_eq!(videos[0].title, "A");
        assert_eq!(repo.get_video(a.video_id).await.unwrap(), Some(a));
        assert!(repo.get_video(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_units_roundtrip() {
        let repo = setup_test_repo().await;
        let t = repo.create_topic(&topic("T", 1)).await.unwrap();
        let l = repo.create_lesson(&lesson(t.topic_id, "L", 1)).await.unwrap();
        let v = repo.create_video(&video(l.lesson_id, "V", 1)).await.unwrap();

        let summary = repo
            .create_summary(&CreateVideoSummaryInput {
                video_id: v.video_id,
                title: None,
                description: "Recap".to_string(),
                picture: None,
            })
            .await
            .unwrap();
        assert_eq!(repo.list_summaries_by_video(v.video_id).await.unwrap(), vec![summary]);

        let test = repo
            .create_test(&CreateTestInput {
                lesson_id: l.lesson_id,
                title: Some("Check".to_string()),
                description: "Quiz".to_string(),
                show_right_answer: true,
            })
            .await
            .unwrap();
        assert_eq!(repo.get_test(test.test_id).await.unwrap(), Some(test.clone()));
        assert_eq!(repo.get_test_by_title("Check").await.unwrap(), Some(test));

        let practice = repo
            .create_practice(&CreatePracticeInput {
                lesson_id: l.lesson_id,
                title: None,
                description: "Homework".to_string(),
                exercise: Some("Write a loop".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(
            repo.list_practices_by_lesson(l.lesson_id).await.unwrap(),
            vec![practice.clone()]
        );
        assert_eq!(repo.get_practice(practice.practice_id).await.unwrap(), Some(practice));
    }

    #[tokio::test]
    async fn test_lesson_requires_topic() {
        let repo = setup_test_repo().await;
        assert!(repo.create_lesson(&lesson(404, "Orphan", 1)).await.is_err());
    }

    #[tokio::test]
    async fn test_edges_are_deduplicated() {
        let repo = setup_test_repo().await;
        let edge = UnlockEdge {
            source: ContentRef::video(1),
            target: ContentRef::test(2),
        };

        assert!(repo.add_edge(&edge).await.unwrap());
        assert!(!repo.add_edge(&edge).await.unwrap());
        assert_eq!(repo.list_edges().await.unwrap(), vec![edge]);
    }
}
