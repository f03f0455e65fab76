//! Quiz repository
//!
//! Questions belong to a test or to a video; answers belong to a question and
//! are addressed by their serial number within it.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{
    Answer, CreateAnswerInput, CreateQuestionInput, Question, QuestionOwner, QuestionWithAnswers,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn create_question(&self, input: &CreateQuestionInput) -> Result<Question>;

    /// Questions of an owner ordered by serial number
    async fn list_questions(&self, owner: QuestionOwner) -> Result<Vec<Question>>;

    /// Add an answer option. Without an explicit serial number the answer is
    /// appended after the existing ones.
    async fn create_answer(&self, input: &CreateAnswerInput) -> Result<Answer>;

    async fn list_answers(&self, question_id: i64) -> Result<Vec<Answer>>;

    async fn questions_with_answers(
        &self,
        owner: QuestionOwner,
    ) -> Result<Vec<QuestionWithAnswers>> {
        let mut result = Vec::new();
        for question in self.list_questions(owner).await? {
            let answers = self.list_answers(question.question_id).await?;
            result.push(QuestionWithAnswers { question, answers });
        }
        Ok(result)
    }
}

pub struct SqlxQuizRepository {
    pool: DynDatabasePool,
}

impl SqlxQuizRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn QuizRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl QuizRepository for SqlxQuizRepository {
    async fn create_question(&self, input: &CreateQuestionInput) -> Result<Question> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_question_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_question_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn list_questions(&self, owner: QuestionOwner) -> Result<Vec<Question>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_questions_sqlite(self.pool.sqlite()?, owner).await,
            DatabaseDriver::Mysql => list_questions_mysql(self.pool.mysql()?, owner).await,
        }
    }

    async fn create_answer(&self, input: &CreateAnswerInput) -> Result<Answer> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_answer_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_answer_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn list_answers(&self, question_id: i64) -> Result<Vec<Answer>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_answers_sqlite(self.pool.sqlite()?, question_id).await,
            DatabaseDriver::Mysql => list_answers_mysql(self.pool.mysql()?, question_id).await,
        }
    }
}

const INSERT_QUESTION_SQL: &str =
    "INSERT INTO questions (test_id, video_id, description, serial_number, picture) \
     VALUES (?, ?, ?, ?, ?)";
const INSERT_ANSWER_SQL: &str =
    "INSERT INTO answers (question_id, description, serial_number, is_right) VALUES (?, ?, ?, ?)";
const NEXT_ANSWER_SERIAL_SQL: &str =
    "SELECT MAX(serial_number) AS last FROM answers WHERE question_id = ?";
const LIST_ANSWERS_SQL: &str = r#"
    SELECT answer_id, question_id, description, serial_number, is_right
    FROM answers WHERE question_id = ? ORDER BY serial_number, answer_id
"#;

fn list_questions_sql(owner: QuestionOwner) -> &'static str {
    match owner {
        QuestionOwner::Test(_) => r#"
            SELECT question_id, test_id, video_id, description, serial_number, picture
            FROM questions WHERE test_id = ? ORDER BY serial_number, question_id
        "#,
        QuestionOwner::Video(_) => r#"
            SELECT question_id, test_id, video_id, description, serial_number, picture
            FROM questions WHERE video_id = ? ORDER BY serial_number, question_id
        "#,
    }
}

fn owner_id(owner: QuestionOwner) -> i64 {
    match owner {
        QuestionOwner::Test(id) | QuestionOwner::Video(id) => id,
    }
}

fn question_from_input(question_id: i64, input: &CreateQuestionInput) -> Question {
    Question {
        question_id,
        owner: input.owner,
        description: input.description.clone(),
        serial_number: input.serial_number,
        picture: input.picture.clone(),
    }
}

fn answer_from_input(answer_id: i64, serial_number: i32, input: &CreateAnswerInput) -> Answer {
    Answer {
        answer_id,
        question_id: input.question_id,
        description: input.description.clone(),
        serial_number,
        right: input.right,
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_question_sqlite(
    pool: &SqlitePool,
    input: &CreateQuestionInput,
) -> Result<Question> {
    let (test_id, video_id) = input.owner.to_columns();
    let result = sqlx::query(INSERT_QUESTION_SQL)
        .bind(test_id)
        .bind(video_id)
        .bind(&input.description)
        .bind(input.serial_number)
        .bind(&input.picture)
        .execute(pool)
        .await
        .context("Failed to create question")?;

    Ok(question_from_input(result.last_insert_rowid(), input))
}

async fn list_questions_sqlite(pool: &SqlitePool, owner: QuestionOwner) -> Result<Vec<Question>> {
    let rows = sqlx::query(list_questions_sql(owner))
        .bind(owner_id(owner))
        .fetch_all(pool)
        .await
        .context("Failed to list questions")?;

    rows.iter()
        .map(|row| {
            Ok(Question {
                question_id: row.get("question_id"),
                owner: QuestionOwner::from_columns(row.get("test_id"), row.get("video_id"))?,
                description: row.get("description"),
                serial_number: row.get("serial_number"),
                picture: row.get("picture"),
            })
        })
        .collect()
}

async fn create_answer_sqlite(pool: &SqlitePool, input: &CreateAnswerInput) -> Result<Answer> {
    let serial_number = match input.serial_number {
        Some(serial) => serial,
        None => {
            let last: Option<i32> = sqlx::query(NEXT_ANSWER_SERIAL_SQL)
                .bind(input.question_id)
                .fetch_one(pool)
                .await
                .context("Failed to number answer")?
                .get("last");
            last.map_or(1, |n| n + 1)
        }
    };

    let result = sqlx::query(INSERT_ANSWER_SQL)
        .bind(input.question_id)
        .bind(&input.description)
        .bind(serial_number)
        .bind(input.right)
        .execute(pool)
        .await
        .context("Failed to create answer")?;

    Ok(answer_from_input(result.last_insert_rowid(), serial_number, input))
}

async fn list_answers_sqlite(pool: &SqlitePool, question_id: i64) -> Result<Vec<Answer>> {
    let rows = sqlx::query(LIST_ANSWERS_SQL)
        .bind(question_id)
        .fetch_all(pool)
        .await
        .context("Failed to list answers")?;

    Ok(rows
        .iter()
        .map(|row| Answer {
            answer_id: row.get("answer_id"),
            question_id: row.get("question_id"),
            description: row.get("description"),
            serial_number: row.get("serial_number"),
            right: row.get("is_right"),
        })
        .collect())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_question_mysql(pool: &MySqlPool, input: &CreateQuestionInput) -> Result<Question> {
    let (test_id, video_id) = input.owner.to_columns();
    let result = sqlx::query(INSERT_QUESTION_SQL)
        .bind(test_id)
        .bind(video_id)
        .bind(&input.description)
        .bind(input.serial_number)
        .bind(&input.picture)
        .execute(pool)
        .await
        .context("Failed to create question")?;

    Ok(question_from_input(result.last_insert_id() as i64, input))
}

async fn list_questions_mysql(pool: &MySqlPool, owner: QuestionOwner) -> Result<Vec<Question>> {
    let rows = sqlx::query(list_questions_sql(owner))
        .bind(owner_id(owner))
        .fetch_all(pool)
        .await
        .context("Failed to list questions")?;

    rows.iter()
        .map(|row| {
            Ok(Question {
                question_id: row.get("question_id"),
                owner: QuestionOwner::from_columns(row.get("test_id"), row.get("video_id"))?,
                description: row.get("description"),
                serial_number: row.get("serial_number"),
                picture: row.get("picture"),
            })
        })
        .collect()
}

async fn create_answer_mysql(pool: &MySqlPool, input: &CreateAnswerInput) -> Result<Answer> {
    let serial_number = match input.serial_number {
        Some(serial) => serial,
        None => {
            let last: Option<i32> = sqlx::query(NEXT_ANSWER_SERIAL_SQL)
                .bind(input.question_id)
                .fetch_one(pool)
                .await
                .context("Failed to number answer")?
                .get("last");
            last.map_or(1, |n| n + 1)
        }
    };

    let result = sqlx::query(INSERT_ANSWER_SQL)
        .bind(input.question_id)
        .bind(&input.description)
        .bind(serial_number)
        .bind(input.right)
        .execute(pool)
        .await
        .context("Failed to create answer")?;

    Ok(answer_from_input(result.last_insert_id() as i64, serial_number, input))
}

async fn list_answers_mysql(pool: &MySqlPool, question_id: i64) -> Result<Vec<Answer>> {
    let rows = sqlx::query(LIST_ANSWERS_SQL)
        .bind(question_id)
        .fetch_all(pool)
        .await
        .context("Failed to list answers")?;

    Ok(rows
        .iter()
        .map(|row| Answer {
            answer_id: row.get("answer_id"),
            question_id: row.get("question_id"),
            description: row.get("description"),
            serial_number: row.get("serial_number"),
            right: row.get("is_right"),
        })
        .collect())
}
