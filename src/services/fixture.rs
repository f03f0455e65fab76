//! Catalog fixtures
//!
//! A fixture is a YAML description of a whole course: the topic tree with
//! its videos, tests and practices, the unlock edges between items, and the
//! tariffs with their starter content. Items are addressed by kind and title,
//! so a fixture never mentions database ids.
//!
//! ```yaml
//! topics:
//!   - title: Basics
//!     serial_number: 1
//!     lessons:
//!       - title: Variables
//!         videos:
//!           - { title: Intro, serial_number: 1, video_link: "https://..." }
//! edges:
//!   - source: { kind: video, title: Intro }
//!     target: { kind: lesson, title: Loops }
//! tariffs:
//!   - title: Base
//!     start: [{ kind: topic, title: Basics }]
//! ```
//!
//! Loading only happens into an empty catalog.

use crate::db::repositories::{CatalogRepository, QuizRepository, TariffRepository};
use crate::models::{
    ContentKind, ContentRef, ContentSet, CreateAnswerInput, CreateLessonInput, CreatePracticeInput,
    CreateQuestionInput, CreateTariffInput, CreateTestInput, CreateTopicInput, CreateVideoInput,
    CreateVideoSummaryInput, PerKind, QuestionOwner, TariffStatus, UnlockEdge,
};
use crate::services::catalog::CatalogService;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFixture {
    #[serde(default)]
    pub topics: Vec<TopicFixture>,
    #[serde(default)]
    pub edges: Vec<EdgeFixture>,
    #[serde(default)]
    pub tariffs: Vec<TariffFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicFixture {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub serial_number: i32,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub lessons: Vec<LessonFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LessonFixture {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub serial_number: i32,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub videos: Vec<VideoFixture>,
    #[serde(default)]
    pub tests: Vec<TestFixture>,
    #[serde(default)]
    pub practices: Vec<PracticeFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoFixture {
    pub title: String,
    #[serde(default)]
    pub serial_number: i32,
    pub video_link: String,
    #[serde(default)]
    pub summaries: Vec<SummaryFixture>,
    /// Control question asked after watching
    #[serde(default)]
    pub question: Option<QuestionFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryFixture {
    #[serde(default)]
    pub title: Option<String>,
    pub description: String,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestFixture {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub show_right_answer: bool,
    #[serde(default)]
    pub questions: Vec<QuestionFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionFixture {
    pub description: String,
    #[serde(default)]
    pub picture: Option<String>,
    pub answers: Vec<AnswerFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerFixture {
    pub description: String,
    #[serde(default)]
    pub right: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PracticeFixture {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub exercise: Option<String>,
}

/// An item addressed by kind and title
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct ItemFixture {
    pub kind: ContentKind,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EdgeFixture {
    pub source: ItemFixture,
    pub target: ItemFixture,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TariffFixture {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub status: TariffStatus,
    #[serde(default)]
    pub start: Vec<ItemFixture>,
}

impl CatalogFixture {
    pub fn from_yaml(source: &str) -> Result<Self> {
        serde_yaml::from_str(source).map_err(|e| match e.location() {
            Some(loc) => anyhow!(
                "Invalid fixture at line {}, column {}: {}",
                loc.line(),
                loc.column(),
                e
            ),
            None => anyhow!("Invalid fixture: {}", e),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        Self::from_yaml(&source)
    }
}

/// What a load created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FixtureSummary {
    pub items: PerKind<usize>,
    pub questions: usize,
    pub edges: usize,
    pub tariffs: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureOutcome {
    Loaded(FixtureSummary),
    /// The catalog already had content
    Skipped { existing_topics: i64 },
}

pub struct FixtureLoader {
    catalog_repo: Arc<dyn CatalogRepository>,
    quiz_repo: Arc<dyn QuizRepository>,
    tariffs: Arc<dyn TariffRepository>,
    catalog: Arc<CatalogService>,
}

impl FixtureLoader {
    pub fn new(
        catalog_repo: Arc<dyn CatalogRepository>,
        quiz_repo: Arc<dyn QuizRepository>,
        tariffs: Arc<dyn TariffRepository>,
        catalog: Arc<CatalogService>,
    ) -> Self {
        Self {
            catalog_repo,
            quiz_repo,
            tariffs,
            catalog,
        }
    }

    /// Load `fixture` unless the catalog already has topics.
    pub async fn load_if_empty(&self, fixture: &CatalogFixture) -> Result<FixtureOutcome> {
        let existing_topics = self
            .catalog_repo
            .count_topics()
            .await
            .context("Failed to count topics")?;
        if existing_topics > 0 {
            tracing::info!(existing_topics, "Catalog is not empty, skipping fixture load");
            return Ok(FixtureOutcome::Skipped { existing_topics });
        }

        let summary = self.load(fixture).await?;
        self.catalog.mark_changed().await?;
        tracing::info!(
            topics = summary.items.topics,
            lessons = summary.items.lessons,
            videos = summary.items.videos,
            tests = summary.items.tests,
            practices = summary.items.practices,
            edges = summary.edges,
            tariffs = summary.tariffs,
            "Fixture loaded"
        );
        Ok(FixtureOutcome::Loaded(summary))
    }

    async fn load(&self, fixture: &CatalogFixture) -> Result<FixtureSummary> {
        let mut summary = FixtureSummary::default();
        let mut index = TitleIndex::default();

        for topic in &fixture.topics {
            let created = self
                .catalog_repo
                .create_topic(&CreateTopicInput {
                    title: topic.title.clone(),
                    description: topic.description.clone(),
                    serial_number: topic.serial_number,
                    picture: topic.picture.clone(),
                })
                .await
                .with_context(|| format!("Failed to create topic '{}'", topic.title))?;
            index.add(ContentRef::topic(created.topic_id), &topic.title);
            summary.items.topics += 1;

            for lesson in &topic.lessons {
                self.load_lesson(created.topic_id, lesson, &mut index, &mut summary)
                    .await?;
            }
        }

        for edge in &fixture.edges {
            let source = index.resolve(&edge.source)?;
            let target = index.resolve(&edge.target)?;
            if self
                .catalog_repo
                .add_edge(&UnlockEdge { source, target })
                .await
                .context("Failed to add unlock edge")?
            {
                summary.edges += 1;
            }
        }

        for tariff in &fixture.tariffs {
            let created = self
                .tariffs
                .create(&CreateTariffInput {
                    title: tariff.title.clone(),
                    description: tariff.description.clone(),
                    price: tariff.price,
                    status: tariff.status,
                })
                .await
                .with_context(|| format!("Failed to create tariff '{}'", tariff.title))?;
            let start = tariff
                .start
                .iter()
                .map(|item| index.resolve(item))
                .collect::<Result<ContentSet>>()?;
            self.tariffs
                .add_start_content(created.tariff_id, &start)
                .await
                .context("Failed to add starter content")?;
            summary.tariffs += 1;
        }

        Ok(summary)
    }

    async fn load_lesson(
        &self,
        topic_id: i64,
        lesson: &LessonFixture,
        index: &mut TitleIndex,
        summary: &mut FixtureSummary,
    ) -> Result<()> {
        let lesson_id = self
            .catalog_repo
            .create_lesson(&CreateLessonInput {
                topic_id,
                title: lesson.title.clone(),
                description: lesson.description.clone(),
                serial_number: lesson.serial_number,
                picture: lesson.picture.clone(),
            })
            .await
            .with_context(|| format!("Failed to create lesson '{}'", lesson.title))?
            .lesson_id;
        index.add(ContentRef::lesson(lesson_id), &lesson.title);
        summary.items.lessons += 1;

        for video in &lesson.videos {
            let video_id = self
                .catalog_repo
                .create_video(&CreateVideoInput {
                    lesson_id,
                    title: video.title.clone(),
                    serial_number: video.serial_number,
                    video_link: video.video_link.clone(),
                })
                .await
                .with_context(|| format!("Failed to create video '{}'", video.title))?
                .video_id;
            index.add(ContentRef::video(video_id), &video.title);
            summary.items.videos += 1;

            for s in &video.summaries {
                self.catalog_repo
                    .create_summary(&CreateVideoSummaryInput {
                        video_id,
                        title: s.title.clone(),
                        description: s.description.clone(),
                        picture: s.picture.clone(),
                    })
                    .await
                    .context("Failed to create video summary")?;
            }
            if let Some(question) = &video.question {
                self.load_question(QuestionOwner::Video(video_id), 1, question).await?;
                summary.questions += 1;
            }
        }

        for test in &lesson.tests {
            let test_id = self
                .catalog_repo
                .create_test(&CreateTestInput {
                    lesson_id,
                    title: Some(test.title.clone()),
                    description: test.description.clone(),
                    show_right_answer: test.show_right_answer,
                })
                .await
                .with_context(|| format!("Failed to create test '{}'", test.title))?
                .test_id;
            index.add(ContentRef::test(test_id), &test.title);
            summary.items.tests += 1;

            for (i, question) in test.questions.iter().enumerate() {
                self.load_question(QuestionOwner::Test(test_id), i as i32 + 1, question)
                    .await?;
                summary.questions += 1;
            }
        }

        for practice in &lesson.practices {
            let practice_id = self
                .catalog_repo
                .create_practice(&CreatePracticeInput {
                    lesson_id,
                    title: Some(practice.title.clone()),
                    description: practice.description.clone(),
                    exercise: practice.exercise.clone(),
                })
                .await
                .with_context(|| format!("Failed to create practice '{}'", practice.title))?
                .practice_id;
            index.add(ContentRef::practice(practice_id), &practice.title);
            summary.items.practices += 1;
        }

        Ok(())
    }

    async fn load_question(
        &self,
        owner: QuestionOwner,
        serial_number: i32,
        question: &QuestionFixture,
    ) -> Result<()> {
        if !question.answers.iter().any(|a| a.right) {
            bail!("Question '{}' has no right answer", question.description);
        }

        let created = self
            .quiz_repo
            .create_question(&CreateQuestionInput {
                owner,
                description: question.description.clone(),
                serial_number,
                picture: question.picture.clone(),
            })
            .await
            .context("Failed to create question")?;
        for answer in &question.answers {
            self.quiz_repo
                .create_answer(&CreateAnswerInput {
                    question_id: created.question_id,
                    description: answer.description.clone(),
                    serial_number: None,
                    right: answer.right,
                })
                .await
                .context("Failed to create answer")?;
        }
        Ok(())
    }
}

/// Titles seen so far, for resolving edges and starter content.
#[derive(Default)]
struct TitleIndex {
    items: HashMap<(ContentKind, String), Vec<ContentRef>>,
}

impl TitleIndex {
    fn add(&mut self, item: ContentRef, title: &str) {
        self.items
            .entry((item.kind, title.to_string()))
            .or_default()
            .push(item);
    }

    fn resolve(&self, item: &ItemFixture) -> Result<ContentRef> {
        match self.items.get(&(item.kind, item.title.clone())).map(Vec::as_slice) {
            Some([only]) => Ok(*only),
            Some([]) | None => bail!("Unknown {} '{}'", item.kind, item.title),
            Some(_) => bail!("Ambiguous {} title '{}'", item.kind, item.title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::{CacheConfig, MediaConfig};
    use crate::db::repositories::{SqlxCatalogRepository, SqlxQuizRepository, SqlxTariffRepository};
    use crate::services::test_support::empty_pool;
    use std::io::Write;

    const FIXTURE: &str = r#"
topics:
  - title: Basics
    description: "<p>Start here</p>"
    serial_number: 1
    lessons:
      - title: Variables
        serial_number: 1
        videos:
          - title: Intro
            serial_number: 1
            video_link: "https://video.example/intro"
            summaries:
              - description: "Bindings are immutable"
            question:
              description: "Immutable by default?"
              answers:
                - { description: "Yes", right: true }
                - { description: "No" }
          - { title: Let, serial_number: 2, video_link: "https://video.example/let" }
        tests:
          - title: Variables quiz
            show_right_answer: true
            questions:
              - description: "Pick mut"
                answers:
                  - { description: "let", right: false }
                  - { description: "let mut", right: true }
        practices:
          - { title: Homework, exercise: practice/homework.pdf }
      - title: Loops
        serial_number: 2
edges:
  - source: { kind: video, title: Intro }
    target: { kind: video, title: Let }
  - source: { kind: video, title: Let }
    target: { kind: test, title: Variables quiz }
  - source: { kind: practice, title: Homework }
    target: { kind: lesson, title: Loops }
tariffs:
  - title: Base
    price: 4900
    start:
      - { kind: topic, title: Basics }
      - { kind: lesson, title: Variables }
      - { kind: video, title: Intro }
"#;

    async fn loader() -> (FixtureLoader, Arc<CatalogService>, Arc<dyn TariffRepository>) {
        let pool = empty_pool().await;
        let catalog_repo = SqlxCatalogRepository::boxed(pool.clone());
        let quiz_repo = SqlxQuizRepository::boxed(pool.clone());
        let tariffs = SqlxTariffRepository::boxed(pool);
        let catalog = Arc::new(CatalogService::new(
            catalog_repo.clone(),
            quiz_repo.clone(),
            create_cache(&CacheConfig::default()),
            MediaConfig::default(),
        ));
        let loader = FixtureLoader::new(catalog_repo, quiz_repo, tariffs.clone(), catalog.clone());
        (loader, catalog, tariffs)
    }

    #[tokio::test]
    async fn test_load_into_empty_catalog() {
        let (loader, catalog, tariffs) = loader().await;
        let fixture = CatalogFixture::from_yaml(FIXTURE).unwrap();

        let outcome = loader.load_if_empty(&fixture).await.unwrap();
        let summary = match outcome {
            FixtureOutcome::Loaded(summary) => summary,
            other => panic!("expected a load, got {:?}", other),
        };
        assert_eq!(summary.items.topics, 1);
        assert_eq!(summary.items.lessons, 2);
        assert_eq!(summary.items.videos, 2);
        assert_eq!(summary.questions, 2);
        assert_eq!(summary.edges, 3);
        assert_eq!(summary.tariffs, 1);

        let outline = catalog.outline().await.unwrap();
        let intro = catalog.video("Variables", "Intro").await.unwrap();
        let let_video = catalog.video("Variables", "Let").await.unwrap();
        assert!(outline
            .successors(ContentRef::video(intro.video.video_id))
            .contains(ContentRef::video(let_video.video.video_id)));
        assert_eq!(intro.question.unwrap().answers.len(), 2);

        let quiz = catalog.test("Variables quiz").await.unwrap();
        assert_eq!(quiz.questions.len(), 1);
        assert_eq!(quiz.questions[0].right_serials().into_iter().collect::<Vec<_>>(), vec![2]);

        let base = tariffs.get_by_title("Base").await.unwrap().unwrap();
        let start = tariffs.start_content(base.tariff_id).await.unwrap();
        assert_eq!(start.len(), 3);
    }

    #[tokio::test]
    async fn test_second_load_is_skipped() {
        let (loader, _, _) = loader().await;
        let fixture = CatalogFixture::from_yaml(FIXTURE).unwrap();

        loader.load_if_empty(&fixture).await.unwrap();
        let outcome = loader.load_if_empty(&fixture).await.unwrap();
        assert_eq!(outcome, FixtureOutcome::Skipped { existing_topics: 1 });
    }

    #[tokio::test]
    async fn test_unknown_edge_title_fails() {
        let (loader, _, _) = loader().await;
        let fixture = CatalogFixture::from_yaml(
            r#"
topics:
  - title: Only
edges:
  - source: { kind: topic, title: Only }
    target: { kind: video, title: Missing }
"#,
        )
        .unwrap();

        let err = loader.load_if_empty(&fixture).await.unwrap_err();
        assert!(err.to_string().contains("Unknown video 'Missing'"));
    }

    #[tokio::test]
    async fn test_question_without_right_answer_fails() {
        let (loader, _, _) = loader().await;
        let fixture = CatalogFixture::from_yaml(
            r#"
topics:
  - title: Only
    lessons:
      - title: L
        tests:
          - title: T
            questions:
              - description: "?"
                answers: [{ description: "a" }]
"#,
        )
        .unwrap();
        assert!(loader.load_if_empty(&fixture).await.is_err());
    }

    #[tokio::test]
    async fn test_running_server_sees_loaded_catalog() {
        let pool = empty_pool().await;
        let service = |pool: crate::db::DynDatabasePool| {
            Arc::new(CatalogService::new(
                SqlxCatalogRepository::boxed(pool.clone()),
                SqlxQuizRepository::boxed(pool),
                create_cache(&CacheConfig::default()),
                MediaConfig::default(),
            ))
        };
        let server = service(pool.clone());
        assert_eq!(server.outline().await.unwrap().totals().videos, 0);

        let loader = FixtureLoader::new(
            SqlxCatalogRepository::boxed(pool.clone()),
            SqlxQuizRepository::boxed(pool.clone()),
            SqlxTariffRepository::boxed(pool.clone()),
            service(pool),
        );
        let fixture = CatalogFixture::from_yaml(FIXTURE).unwrap();
        loader.load_if_empty(&fixture).await.unwrap();

        assert_eq!(server.outline().await.unwrap().totals().videos, 2);
        assert_eq!(server.topics().await.unwrap()[0].title, "Basics");
    }

    #[tokio::test]
    async fn test_bundled_sample_course_loads() {
        let (loader, _, _) = loader().await;
        let fixture =
            CatalogFixture::from_yaml(include_str!("../../fixtures/catalog.yml")).unwrap();

        let summary = match loader.load_if_empty(&fixture).await.unwrap() {
            FixtureOutcome::Loaded(summary) => summary,
            other => panic!("expected a load, got {:?}", other),
        };
        assert_eq!(summary.items.topics, 2);
        assert_eq!(summary.items.lessons, 3);
        assert_eq!(summary.items.videos, 4);
        assert_eq!(summary.questions, 3);
        assert_eq!(summary.edges, 8);
    }

    #[test]
    fn test_ambiguous_titles_are_rejected() {
        let mut index = TitleIndex::default();
        index.add(ContentRef::video(1), "Intro");
        index.add(ContentRef::video(2), "Intro");
        index.add(ContentRef::lesson(3), "Intro");

        let video = ItemFixture {
            kind: ContentKind::Video,
            title: "Intro".to_string(),
        };
        assert!(index.resolve(&video).is_err());
        let lesson = ItemFixture {
            kind: ContentKind::Lesson,
            title: "Intro".to_string(),
        };
        assert_eq!(index.resolve(&lesson).unwrap(), ContentRef::lesson(3));
    }

    #[test]
    fn test_invalid_yaml_reports_location() {
        let err = CatalogFixture::from_yaml("topics:\n  - title: [unclosed\n").unwrap_err();
        assert!(err.to_string().contains("line"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();
        let fixture = CatalogFixture::from_file(file.path()).unwrap();
        assert_eq!(fixture.topics.len(), 1);
        assert_eq!(fixture.tariffs[0].start.len(), 3);

        assert!(CatalogFixture::from_file(Path::new("/nonexistent/catalog.yml")).is_err());
    }
}
