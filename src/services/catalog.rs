//! Catalog service
//!
//! Read side of the course catalog:
//! - Listings and title lookups mirroring the bot's screens
//! - Video and test details with summaries, questions and answers
//! - The cached [`CourseOutline`] the unlock engine walks
//! - Full records of a learner's available content
//!
//! Everything returned here is ready for display: descriptions are plain
//! text and media paths are absolute URLs.
//!
//! Cached values are keyed by the catalog revision stored in the database, so
//! a write from another process (the fixture loader) is seen on the next read.

use crate::cache::{Cache, CacheLayer};
use crate::config::MediaConfig;
use crate::db::repositories::{CatalogRepository, QuizRepository};
use crate::models::{
    AvailableContent, ContentKind, ContentRef, ContentSet, CourseOutline, Lesson, OutlineNode,
    Practice, QuestionOwner, QuestionWithAnswers, Test, TestDetail, Topic, Video, VideoDetail,
    VideoSummary,
};
use crate::services::text::{clean_html, media_url};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

const CACHE_KEY_OUTLINE: &str = "catalog:outline";
const CACHE_KEY_TOPICS: &str = "catalog:topics";
const CACHE_PATTERN_ALL: &str = "catalog:*";

#[derive(Debug, thiserror::Error)]
pub enum CatalogServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CatalogService {
    repo: Arc<dyn CatalogRepository>,
    quiz: Arc<dyn QuizRepository>,
    cache: Arc<Cache>,
    media: MediaConfig,
    cache_ttl: Duration,
}

impl CatalogService {
    pub fn new(
        repo: Arc<dyn CatalogRepository>,
        quiz: Arc<dyn QuizRepository>,
        cache: Arc<Cache>,
        media: MediaConfig,
    ) -> Self {
        let cache_ttl = cache.default_ttl();
        Self {
            repo,
            quiz,
            cache,
            media,
            cache_ttl,
        }
    }

    /// Drop every cached catalog value held by this process.
    pub async fn invalidate(&self) {
        let _ = self.cache.delete_pattern(CACHE_PATTERN_ALL).await;
    }

    /// Record a catalog write for every process sharing the database, then
    /// drop the local cache.
    pub async fn mark_changed(&self) -> Result<i64, CatalogServiceError> {
        let revision = self
            .repo
            .bump_revision()
            .await
            .context("Failed to bump catalog revision")?;
        self.invalidate().await;
        tracing::info!(revision, "Catalog changed");
        Ok(revision)
    }

    async fn cache_key(&self, base: &str) -> Result<String, CatalogServiceError> {
        let revision = self
            .repo
            .revision()
            .await
            .context("Failed to read catalog revision")?;
        Ok(format!("{}:{}", base, revision))
    }

    /// The whole catalog as an unlock graph
    pub async fn outline(&self) -> Result<CourseOutline, CatalogServiceError> {
        let key = self.cache_key(CACHE_KEY_OUTLINE).await?;
        if let Some(outline) = self.cache.get::<CourseOutline>(&key).await.ok().flatten() {
            return Ok(outline);
        }

        let outline = self.build_outline().await?;
        let _ = self.cache.set(&key, &outline, self.cache_ttl).await;
        Ok(outline)
    }

    async fn build_outline(&self) -> Result<CourseOutline> {
        let mut outline = CourseOutline::new();
        let mut add = |kind, id, parent, serial_number, title: Option<String>| {
            outline.insert(OutlineNode {
                id,
                kind,
                parent,
                serial_number,
                title,
                next: ContentSet::new(),
            })
        };

        for t in self.repo.list_topics().await.context("Failed to load topics")? {
            add(ContentKind::Topic, t.topic_id, None, t.serial_number, Some(t.title));
        }
        for l in self.repo.list_lessons().await.context("Failed to load lessons")? {
            add(ContentKind::Lesson, l.lesson_id, Some(l.topic_id), l.serial_number, Some(l.title));
        }
        for v in self.repo.list_videos().await.context("Failed to load videos")? {
            add(ContentKind::Video, v.video_id, Some(v.lesson_id), v.serial_number, Some(v.title));
        }
        for t in self.repo.list_tests().await.context("Failed to load tests")? {
            add(ContentKind::Test, t.test_id, Some(t.lesson_id), 0, t.title);
        }
        for p in self.repo.list_practices().await.context("Failed to load practices")? {
            add(ContentKind::Practice, p.practice_id, Some(p.lesson_id), 0, p.title);
        }

        let mut dangling = 0usize;
        for edge in self.repo.list_edges().await.context("Failed to load unlock edges")? {
            if !outline.link(edge.source, edge.target) {
                dangling += 1;
            }
        }
        if dangling > 0 {
            tracing::warn!(dangling, "Unlock edges from unknown content ignored");
        }

        let totals = outline.totals();
        tracing::debug!(
            topics = totals.topics,
            lessons = totals.lessons,
            videos = totals.videos,
            "Course outline built"
        );
        Ok(outline)
    }

    // ------------------------------------------------------------------
    // Topics and lessons
    // ------------------------------------------------------------------

    pub async fn topics(&self) -> Result<Vec<Topic>, CatalogServiceError> {
        let key = self.cache_key(CACHE_KEY_TOPICS).await?;
        if let Some(topics) = self.cache.get::<Vec<Topic>>(&key).await.ok().flatten() {
            return Ok(topics);
        }

        let topics: Vec<Topic> = self
            .repo
            .list_topics()
            .await
            .context("Failed to list topics")?
            .into_iter()
            .map(|t| self.present_topic(t))
            .collect();
        let _ = self.cache.set(&key, &topics, self.cache_ttl).await;
        Ok(topics)
    }

    pub async fn topic(&self, title: &str) -> Result<Topic, CatalogServiceError> {
        let topic = self
            .repo
            .get_topic_by_title(title)
            .await
            .context("Failed to get topic")?
            .ok_or_else(|| CatalogServiceError::NotFound(format!("Topic '{}'", title)))?;
        Ok(self.present_topic(topic))
    }

    pub async fn topic_lessons(
        &self,
        topic_title: &str,
    ) -> Result<Vec<Lesson>, CatalogServiceError> {
        let topic = self.topic(topic_title).await?;
        let lessons = self
            .repo
            .list_lessons_by_topic(topic.topic_id)
            .await
            .context("Failed to list lessons")?;
        Ok(lessons.into_iter().map(|l| self.present_lesson(l)).collect())
    }

    /// A lesson addressed by its topic and its own title
    pub async fn lesson(
        &self,
        topic_title: &str,
        lesson_title: &str,
    ) -> Result<Lesson, CatalogServiceError> {
        self.topic_lessons(topic_title)
            .await?
            .into_iter()
            .find(|l| l.title == lesson_title)
            .ok_or_else(|| {
                CatalogServiceError::NotFound(format!(
                    "Lesson '{}' in topic '{}'",
                    lesson_title, topic_title
                ))
            })
    }

    pub async fn lessons(&self) -> Result<Vec<Lesson>, CatalogServiceError> {
        let lessons = self.repo.list_lessons().await.context("Failed to list lessons")?;
        Ok(lessons.into_iter().map(|l| self.present_lesson(l)).collect())
    }

    /// First lesson with this title in course order. Lesson titles are only
    /// unique within a topic.
    async fn lesson_by_title(&self, lesson_title: &str) -> Result<Lesson, CatalogServiceError> {
        let lessons = self.repo.list_lessons().await.context("Failed to list lessons")?;
        let outline = self.outline().await?;
        lessons
            .into_iter()
            .filter(|l| l.title == lesson_title)
            .min_by_key(|l| outline.position(ContentRef::lesson(l.lesson_id)))
            .ok_or_else(|| CatalogServiceError::NotFound(format!("Lesson '{}'", lesson_title)))
    }

    // ------------------------------------------------------------------
    // Videos
    // ------------------------------------------------------------------

    pub async fn lesson_videos(
        &self,
        topic_title: &str,
        lesson_title: &str,
    ) -> Result<Vec<Video>, CatalogServiceError> {
        let lesson = self.lesson(topic_title, lesson_title).await?;
        Ok(self
            .repo
            .list_videos_by_lesson(lesson.lesson_id)
            .await
            .context("Failed to list videos")?)
    }

    pub async fn videos(&self) -> Result<Vec<Video>, CatalogServiceError> {
        Ok(self.repo.list_videos().await.context("Failed to list videos")?)
    }

    /// A video with its summaries and control question
    pub async fn video(
        &self,
        lesson_title: &str,
        video_title: &str,
    ) -> Result<VideoDetail, CatalogServiceError> {
        let lesson = self.lesson_by_title(lesson_title).await?;
        let video = self
            .repo
            .list_videos_by_lesson(lesson.lesson_id)
            .await
            .context("Failed to list videos")?
            .into_iter()
            .find(|v| v.title == video_title)
            .ok_or_else(|| {
                CatalogServiceError::NotFound(format!(
                    "Video '{}' in lesson '{}'",
                    video_title, lesson_title
                ))
            })?;
        self.video_detail_of(video).await
    }

    pub async fn video_detail(&self, video_id: i64) -> Result<VideoDetail, CatalogServiceError> {
        let video = self
            .repo
            .get_video(video_id)
            .await
            .context("Failed to get video")?
            .ok_or_else(|| CatalogServiceError::NotFound(format!("Video {}", video_id)))?;
        self.video_detail_of(video).await
    }

    async fn video_detail_of(&self, video: Video) -> Result<VideoDetail, CatalogServiceError> {
        let summaries = self
            .repo
            .list_summaries_by_video(video.video_id)
            .await
            .context("Failed to list video summaries")?
            .into_iter()
            .map(|s| self.present_summary(s))
            .collect();
        let question = self.control_question(video.video_id).await?;
        Ok(VideoDetail {
            video,
            summaries,
            question,
        })
    }

    async fn control_question(
        &self,
        video_id: i64,
    ) -> Result<Option<QuestionWithAnswers>, CatalogServiceError> {
        let questions = self
            .quiz
            .questions_with_answers(QuestionOwner::Video(video_id))
            .await
            .context("Failed to load control question")?;
        Ok(questions.into_iter().next().map(|q| self.present_question(q)))
    }

    pub async fn video_question(
        &self,
        video_id: i64,
    ) -> Result<QuestionWithAnswers, CatalogServiceError> {
        self.control_question(video_id)
            .await?
            .ok_or_else(|| {
                CatalogServiceError::NotFound(format!("Question for video {}", video_id))
            })
    }

    // ------------------------------------------------------------------
    // Tests and practices
    // ------------------------------------------------------------------

    pub async fn lesson_tests(
        &self,
        topic_title: &str,
        lesson_title: &str,
    ) -> Result<Vec<Test>, CatalogServiceError> {
        let lesson = self.lesson(topic_title, lesson_title).await?;
        let tests = self
            .repo
            .list_tests_by_lesson(lesson.lesson_id)
            .await
            .context("Failed to list tests")?;
        Ok(tests.into_iter().map(|t| self.present_test(t)).collect())
    }

    pub async fn tests(&self) -> Result<Vec<Test>, CatalogServiceError> {
        let tests = self.repo.list_tests().await.context("Failed to list tests")?;
        Ok(tests.into_iter().map(|t| self.present_test(t)).collect())
    }

    /// A test with its questions, addressed by title
    pub async fn test(&self, title: &str) -> Result<TestDetail, CatalogServiceError> {
        let test = self
            .repo
            .get_test_by_title(title)
            .await
            .context("Failed to get test")?
            .ok_or_else(|| CatalogServiceError::NotFound(format!("Test '{}'", title)))?;
        self.test_detail_of(test).await
    }

    pub async fn test_detail(&self, test_id: i64) -> Result<TestDetail, CatalogServiceError> {
        let test = self
            .repo
            .get_test(test_id)
            .await
            .context("Failed to get test")?
            .ok_or_else(|| CatalogServiceError::NotFound(format!("Test {}", test_id)))?;
        self.test_detail_of(test).await
    }

    async fn test_detail_of(&self, test: Test) -> Result<TestDetail, CatalogServiceError> {
        let questions = self
            .quiz
            .questions_with_answers(QuestionOwner::Test(test.test_id))
            .await
            .context("Failed to load test questions")?
            .into_iter()
            .map(|q| self.present_question(q))
            .collect();
        Ok(TestDetail {
            test: self.present_test(test),
            questions,
        })
    }

    pub async fn lesson_practices(
        &self,
        topic_title: &str,
        lesson_title: &str,
    ) -> Result<Vec<Practice>, CatalogServiceError> {
        let lesson = self.lesson(topic_title, lesson_title).await?;
        let practices = self
            .repo
            .list_practices_by_lesson(lesson.lesson_id)
            .await
            .context("Failed to list practices")?;
        Ok(practices.into_iter().map(|p| self.present_practice(p)).collect())
    }

    pub async fn practice(
        &self,
        lesson_title: &str,
        practice_title: &str,
    ) -> Result<Practice, CatalogServiceError> {
        let lesson = self.lesson_by_title(lesson_title).await?;
        self.repo
            .list_practices_by_lesson(lesson.lesson_id)
            .await
            .context("Failed to list practices")?
            .into_iter()
            .find(|p| p.title.as_deref() == Some(practice_title))
            .map(|p| self.present_practice(p))
            .ok_or_else(|| {
                CatalogServiceError::NotFound(format!(
                    "Practice '{}' in lesson '{}'",
                    practice_title, lesson_title
                ))
            })
    }

    pub async fn practices(&self) -> Result<Vec<Practice>, CatalogServiceError> {
        let practices = self.repo.list_practices().await.context("Failed to list practices")?;
        Ok(practices.into_iter().map(|p| self.present_practice(p)).collect())
    }

    /// Full records of the items in `set`, in display order. Ids missing
    /// from the catalog are skipped.
    pub async fn available_content(
        &self,
        set: &ContentSet,
    ) -> Result<AvailableContent, CatalogServiceError> {
        let mut content = AvailableContent::default();

        content.topics = self
            .topics()
            .await?
            .into_iter()
            .filter(|t| set.topics.contains(&t.topic_id))
            .collect();
        content.lessons = self
            .lessons()
            .await?
            .into_iter()
            .filter(|l| set.lessons.contains(&l.lesson_id))
            .collect();
        for video in self.videos().await? {
            if set.videos.contains(&video.video_id) {
                content.videos.push(self.video_detail_of(video).await?);
            }
        }
        for test in self.repo.list_tests().await.context("Failed to list tests")? {
            if set.tests.contains(&test.test_id) {
                content.tests.push(self.test_detail_of(test).await?);
            }
        }
        content.practices = self
            .practices()
            .await?
            .into_iter()
            .filter(|p| set.practices.contains(&p.practice_id))
            .collect();

        Ok(content)
    }

    // ------------------------------------------------------------------
    // Presentation
    // ------------------------------------------------------------------

    fn url(&self, path: Option<String>) -> Option<String> {
        media_url(&self.media.base_url, &self.media.prefix, path.as_deref())
    }

    fn present_topic(&self, topic: Topic) -> Topic {
        Topic {
            description: clean_html(&topic.description),
            picture: self.url(topic.picture),
            ..topic
        }
    }

    fn present_lesson(&self, lesson: Lesson) -> Lesson {
        Lesson {
            description: clean_html(&lesson.description),
            picture: self.url(lesson.picture),
            ..lesson
        }
    }

    fn present_summary(&self, summary: VideoSummary) -> VideoSummary {
        VideoSummary {
            description: clean_html(&summary.description),
            picture: self.url(summary.picture),
            ..summary
        }
    }

    fn present_test(&self, test: Test) -> Test {
        Test {
            description: clean_html(&test.description),
            ..test
        }
    }

    fn present_practice(&self, practice: Practice) -> Practice {
        Practice {
            description: clean_html(&practice.description),
            exercise: self.url(practice.exercise),
            ..practice
        }
    }

    fn present_question(&self, mut question: QuestionWithAnswers) -> QuestionWithAnswers {
        question.question.description = clean_html(&question.question.description);
        question.question.picture = self.url(question.question.picture.take());
        question
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{SqlxCatalogRepository, SqlxQuizRepository};
    use crate::models::{CreateTopicInput, UnlockEdge};
    use crate::services::test_support::{empty_pool, seed_course, SeededCourse};

    async fn setup() -> (CatalogService, SeededCourse) {
        let course = seed_course().await;
        let service = CatalogService::new(
            SqlxCatalogRepository::boxed(course.pool.clone()),
            SqlxQuizRepository::boxed(course.pool.clone()),
            create_cache(&CacheConfig::default()),
            MediaConfig::default(),
        );
        (service, course)
    }

    #[tokio::test]
    async fn test_topics_are_presented() {
        let (service, _) = setup().await;
        let topics = service.topics().await.unwrap();

        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].title, "Basics");
        assert_eq!(topics[0].description, "Basics topic");
        assert_eq!(
            topics[0].picture.as_deref(),
            Some("http://127.0.0.1:8000/media/topics/basics.png")
        );
    }

    #[tokio::test]
    async fn test_lookup_by_titles() {
        let (service, course) = setup().await;

        let lesson = service.lesson("Basics", "Loops").await.unwrap();
        assert_eq!(lesson.lesson_id, course.loops);
        assert!(matches!(
            service.lesson("Advanced", "Loops").await,
            Err(CatalogServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.topic("Missing").await,
            Err(CatalogServiceError::NotFound(_))
        ));

        let videos = service.lesson_videos("Basics", "Variables").await.unwrap();
        let titles: Vec<_> = videos.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles, vec!["Intro", "Let"]);

        let practice = service.practice("Variables", "Homework").await.unwrap();
        assert_eq!(
            practice.exercise.as_deref(),
            Some("http://127.0.0.1:8000/media/practice/homework.pdf")
        );
    }

    #[tokio::test]
    async fn test_video_detail_includes_summary_and_question() {
        let (service, course) = setup().await;

        let detail = service.video("Variables", "Intro").await.unwrap();
        assert_eq!(detail.video.video_id, course.intro);
        assert_eq!(detail.summaries.len(), 1);
        assert_eq!(detail.summaries[0].description, "Bindings");
        assert_eq!(
            detail.summaries[0].picture.as_deref(),
            Some("http://127.0.0.1:8000/media/summaries/intro.png")
        );
        let question = detail.question.expect("control question");
        assert_eq!(question.answers.len(), 2);

        assert!(service.video_detail(course.let_video).await.unwrap().question.is_none());
        assert!(matches!(
            service.video_question(course.let_video).await,
            Err(CatalogServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_test_detail() {
        let (service, course) = setup().await;

        let detail = service.test("Variables quiz").await.unwrap();
        assert_eq!(detail.test.test_id, course.quiz);
        assert_eq!(detail.test.description, "Check yourself");
        assert_eq!(detail.questions.len(), 2);
        assert_eq!(detail.questions[1].answers.len(), 3);
        assert_eq!(detail.questions[1].answers[2].serial_number, 3);
    }

    #[tokio::test]
    async fn test_outline_reflects_catalog() {
        let (service, course) = setup().await;
        let outline = service.outline().await.unwrap();

        assert!(outline.contains(ContentRef::practice(course.homework)));
        assert_eq!(
            outline.parent(ContentRef::lesson(course.traits)),
            Some(ContentRef::topic(course.advanced))
        );
        let next = outline.successors(ContentRef::video(course.for_video));
        assert_eq!(next.len(), 3);
    }

    #[tokio::test]
    async fn test_outline_is_cached_until_invalidated() {
        let pool = empty_pool().await;
        let repo = SqlxCatalogRepository::boxed(pool.clone());
        let service = CatalogService::new(
            repo.clone(),
            SqlxQuizRepository::boxed(pool),
            create_cache(&CacheConfig::default()),
            MediaConfig::default(),
        );

        let first = repo
            .create_topic(&CreateTopicInput {
                title: "One".to_string(),
                description: String::new(),
                serial_number: 1,
                picture: None,
            })
            .await
            .unwrap();
        assert_eq!(service.outline().await.unwrap().totals().topics, 1);

        let second = repo
            .create_topic(&CreateTopicInput {
                title: "Two".to_string(),
                description: String::new(),
                serial_number: 2,
                picture: None,
            })
            .await
            .unwrap();
        repo.add_edge(&UnlockEdge {
            source: ContentRef::topic(first.topic_id),
            target: ContentRef::topic(second.topic_id),
        })
        .await
        .unwrap();
        assert_eq!(service.outline().await.unwrap().totals().topics, 1);

        service.invalidate().await;
        let outline = service.outline().await.unwrap();
        assert_eq!(outline.totals().topics, 2);
        assert!(outline
            .successors(ContentRef::topic(first.topic_id))
            .contains(ContentRef::topic(second.topic_id)));
    }

    #[tokio::test]
    async fn test_other_process_sees_marked_change() {
        let pool = empty_pool().await;
        let service = |pool: crate::db::DynDatabasePool| {
            CatalogService::new(
                SqlxCatalogRepository::boxed(pool.clone()),
                SqlxQuizRepository::boxed(pool),
                create_cache(&CacheConfig::default()),
                MediaConfig::default(),
            )
        };
        let server = service(pool.clone());
        let writer = service(pool.clone());

        assert!(server.topics().await.unwrap().is_empty());
        assert_eq!(server.outline().await.unwrap().totals().topics, 0);

        SqlxCatalogRepository::new(pool)
            .create_topic(&CreateTopicInput {
                title: "One".to_string(),
                description: String::new(),
                serial_number: 1,
                picture: None,
            })
            .await
            .unwrap();
        assert_eq!(writer.mark_changed().await.unwrap(), 1);

        assert_eq!(server.topics().await.unwrap().len(), 1);
        assert_eq!(server.outline().await.unwrap().totals().topics, 1);
    }

    #[tokio::test]
    async fn test_available_content_follows_the_set() {
        let (service, course) = setup().await;
        let set: ContentSet = [
            ContentRef::topic(course.basics),
            ContentRef::video(course.intro),
            ContentRef::test(course.quiz),
            ContentRef::video(9999),
        ]
        .into_iter()
        .collect();

        let content = service.available_content(&set).await.unwrap();
        assert_eq!(content.topics.len(), 1);
        assert!(content.lessons.is_empty());
        assert_eq!(content.videos.len(), 1);
        assert!(content.videos[0].question.is_some());
        assert_eq!(content.tests.len(), 1);
        assert_eq!(content.tests[0].questions.len(), 2);
        assert!(content.practices.is_empty());
    }
}
