//! Catalog content
//!
//! Topics contain lessons; lessons contain videos, tests and practices.
//! Every item can point at any other item through unlock edges, so content is
//! also addressed generically by [`ContentRef`] and grouped into
//! [`ContentSet`]s.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// The five kinds of unlockable content.
///
/// Declaration order is the navigation priority: broader containers first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Topic,
    Lesson,
    Video,
    Test,
    Practice,
}

impl ContentKind {
    pub const ALL: [ContentKind; 5] = [
        ContentKind::Topic,
        ContentKind::Lesson,
        ContentKind::Video,
        ContentKind::Test,
        ContentKind::Practice,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Topic => "topic",
            ContentKind::Lesson => "lesson",
            ContentKind::Video => "video",
            ContentKind::Test => "test",
            ContentKind::Practice => "practice",
        }
    }

    /// Only leaf units can be finished by a learner; topics and lessons are
    /// finished through their children.
    pub fn is_completable(self) -> bool {
        matches!(
            self,
            ContentKind::Video | ContentKind::Test | ContentKind::Practice
        )
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "topic" => Ok(ContentKind::Topic),
            "lesson" => Ok(ContentKind::Lesson),
            "video" => Ok(ContentKind::Video),
            "test" => Ok(ContentKind::Test),
            "practice" => Ok(ContentKind::Practice),
            _ => Err(anyhow::anyhow!("Invalid content kind: {}", s)),
        }
    }
}

/// Address of a single content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentRef {
    pub kind: ContentKind,
    pub id: i64,
}

impl ContentRef {
    pub fn new(kind: ContentKind, id: i64) -> Self {
        Self { kind, id }
    }

    pub fn topic(id: i64) -> Self {
        Self::new(ContentKind::Topic, id)
    }

    pub fn lesson(id: i64) -> Self {
        Self::new(ContentKind::Lesson, id)
    }

    pub fn video(id: i64) -> Self {
        Self::new(ContentKind::Video, id)
    }

    pub fn test(id: i64) -> Self {
        Self::new(ContentKind::Test, id)
    }

    pub fn practice(id: i64) -> Self {
        Self::new(ContentKind::Practice, id)
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// One value per content kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerKind<T> {
    #[serde(default)]
    pub topics: T,
    #[serde(default)]
    pub lessons: T,
    #[serde(default)]
    pub videos: T,
    #[serde(default)]
    pub tests: T,
    #[serde(default)]
    pub practices: T,
}

impl<T> PerKind<T> {
    pub fn from_fn(mut f: impl FnMut(ContentKind) -> T) -> Self {
        Self {
            topics: f(ContentKind::Topic),
            lessons: f(ContentKind::Lesson),
            videos: f(ContentKind::Video),
            tests: f(ContentKind::Test),
            practices: f(ContentKind::Practice),
        }
    }

    pub fn get(&self, kind: ContentKind) -> &T {
        match kind {
            ContentKind::Topic => &self.topics,
            ContentKind::Lesson => &self.lessons,
            ContentKind::Video => &self.videos,
            ContentKind::Test => &self.tests,
            ContentKind::Practice => &self.practices,
        }
    }

    pub fn get_mut(&mut self, kind: ContentKind) -> &mut T {
        match kind {
            ContentKind::Topic => &mut self.topics,
            ContentKind::Lesson => &mut self.lessons,
            ContentKind::Video => &mut self.videos,
            ContentKind::Test => &mut self.tests,
            ContentKind::Practice => &mut self.practices,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(ContentKind, &T) -> U) -> PerKind<U> {
        PerKind::from_fn(|kind| f(kind, self.get(kind)))
    }
}

/// A set of content items, kept per kind in id order.
pub type ContentSet = PerKind<BTreeSet<i64>>;

impl PerKind<BTreeSet<i64>> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item; false when it was already present.
    pub fn insert(&mut self, item: ContentRef) -> bool {
        self.get_mut(item.kind).insert(item.id)
    }

    pub fn contains(&self, item: ContentRef) -> bool {
        self.get(item.kind).contains(&item.id)
    }

    /// In-place union.
    pub fn absorb(&mut self, other: &ContentSet) {
        for kind in ContentKind::ALL {
            self.get_mut(kind).extend(other.get(kind).iter().copied());
        }
    }

    pub fn union(&self, other: &ContentSet) -> ContentSet {
        let mut merged = self.clone();
        merged.absorb(other);
        merged
    }

    /// Items of `self` that are not in `other`.
    pub fn difference(&self, other: &ContentSet) -> ContentSet {
        PerKind::from_fn(|kind| {
            self.get(kind)
                .difference(other.get(kind))
                .copied()
                .collect()
        })
    }

    pub fn is_empty(&self) -> bool {
        ContentKind::ALL.iter().all(|&kind| self.get(kind).is_empty())
    }

    pub fn len(&self) -> usize {
        ContentKind::ALL.iter().map(|&kind| self.get(kind).len()).sum()
    }

    /// Items in kind order, then id order.
    pub fn iter(&self) -> impl Iterator<Item = ContentRef> + '_ {
        ContentKind::ALL.into_iter().flat_map(move |kind| {
            self.get(kind)
                .iter()
                .map(move |&id| ContentRef::new(kind, id))
        })
    }

    pub fn counts(&self) -> PerKind<usize> {
        self.map(|_, ids| ids.len())
    }
}

impl FromIterator<ContentRef> for ContentSet {
    fn from_iter<I: IntoIterator<Item = ContentRef>>(iter: I) -> Self {
        let mut set = ContentSet::new();
        set.extend(iter);
        set
    }
}

impl Extend<ContentRef> for ContentSet {
    fn extend<I: IntoIterator<Item = ContentRef>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}

/// Top level of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub topic_id: i64,
    pub title: String,
    pub description: String,
    pub serial_number: i32,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub lesson_id: i64,
    pub topic_id: i64,
    pub title: String,
    pub description: String,
    pub serial_number: i32,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub video_id: i64,
    pub lesson_id: i64,
    pub title: String,
    pub serial_number: i32,
    pub video_link: String,
}

/// Key points of a video, shown after watching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub summary_id: i64,
    pub video_id: i64,
    pub title: Option<String>,
    pub description: String,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub test_id: i64,
    pub lesson_id: i64,
    pub title: Option<String>,
    pub description: String,
    /// Reveal right answers after a wrong pick
    pub show_right_answer: bool,
}

/// Homework reviewed by an admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Practice {
    pub practice_id: i64,
    pub lesson_id: i64,
    pub title: Option<String>,
    pub description: String,
    /// Path of the attached exercise file
    pub exercise: Option<String>,
}

/// An unlock edge: finishing `source` opens `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockEdge {
    pub source: ContentRef,
    pub target: ContentRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTopicInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub serial_number: i32,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLessonInput {
    pub topic_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub serial_number: i32,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVideoInput {
    pub lesson_id: i64,
    pub title: String,
    #[serde(default)]
    pub serial_number: i32,
    pub video_link: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVideoSummaryInput {
    pub video_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub description: String,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTestInput {
    pub lesson_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub show_right_answer: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePracticeInput {
    pub lesson_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub exercise: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[ContentRef]) -> ContentSet {
        items.iter().copied().collect()
    }

    #[test]
    fn test_kind_order_puts_containers_first() {
        let mut kinds = vec![
            ContentKind::Practice,
            ContentKind::Video,
            ContentKind::Topic,
            ContentKind::Test,
            ContentKind::Lesson,
        ];
        kinds.sort();
        assert_eq!(kinds, ContentKind::ALL.to_vec());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("Video".parse::<ContentKind>().unwrap(), ContentKind::Video);
        assert!("chapter".parse::<ContentKind>().is_err());
        assert!(ContentKind::Test.is_completable());
        assert!(!ContentKind::Lesson.is_completable());
    }

    #[test]
    fn test_insert_reports_novelty() {
        let mut s = ContentSet::new();
        assert!(s.insert(ContentRef::video(1)));
        assert!(!s.insert(ContentRef::video(1)));
        assert!(s.insert(ContentRef::test(1)));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_difference_is_per_kind() {
        let a = set(&[ContentRef::video(1), ContentRef::test(1), ContentRef::lesson(2)]);
        let b = set(&[ContentRef::video(1), ContentRef::lesson(3)]);

        let diff = a.difference(&b);
        assert_eq!(
            diff.iter().collect::<Vec<_>>(),
            vec![ContentRef::lesson(2), ContentRef::test(1)]
        );
    }

    #[test]
    fn test_union_and_counts() {
        let a = set(&[ContentRef::topic(1), ContentRef::video(4)]);
        let b = set(&[ContentRef::video(4), ContentRef::video(5)]);

        let u = a.union(&b);
        let counts = u.counts();
        assert_eq!(counts.topics, 1);
        assert_eq!(counts.videos, 2);
        assert_eq!(counts.practices, 0);
        assert!(!u.is_empty());
        assert!(ContentSet::new().is_empty());
    }

    #[test]
    fn test_content_set_json_shape() {
        let s = set(&[ContentRef::lesson(7), ContentRef::lesson(3)]);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["lessons"], serde_json::json!([3, 7]));
        assert_eq!(json["videos"], serde_json::json!([]));

        let back: ContentSet = serde_json::from_value(serde_json::json!({"tests": [2]})).unwrap();
        assert!(back.contains(ContentRef::test(2)));
    }
}
