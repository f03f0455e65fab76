//! Progress and navigation types
//!
//! [`CourseOutline`] is a compact snapshot of the whole catalog: every item's
//! parent, position, title and outgoing unlock edges. It is what the unlock
//! engine walks. The remaining types describe what a learner has and what the
//! engine decided.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    ContentKind, ContentRef, ContentSet, Lesson, PerKind, Practice, TestDetail, TestGrade, Topic,
    VideoDetail,
};

/// One catalog item as seen by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub id: i64,
    pub kind: ContentKind,
    /// Topic of a lesson, lesson of a video/test/practice
    pub parent: Option<i64>,
    pub serial_number: i32,
    pub title: Option<String>,
    /// Items unlocked by finishing this one
    #[serde(default)]
    pub next: ContentSet,
}

/// Placeholder for untitled tests and practices.
pub const UNTITLED: &str = "Untitled";

/// Where an item sits in the course: topic serial, lesson serial, video
/// serial, kind, id. Compares in reading order.
pub type OutlinePosition = (i32, i32, i32, ContentKind, i64);

/// The catalog as a graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseOutline {
    pub nodes: PerKind<BTreeMap<i64, OutlineNode>>,
}

impl CourseOutline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: OutlineNode) {
        self.nodes.get_mut(node.kind).insert(node.id, node);
    }

    /// Record an unlock edge. Edges from unknown sources are dropped.
    pub fn link(&mut self, source: ContentRef, target: ContentRef) -> bool {
        match self.nodes.get_mut(source.kind).get_mut(&source.id) {
            Some(node) => {
                node.next.insert(target);
                true
            }
            None => false,
        }
    }

    pub fn node(&self, item: ContentRef) -> Option<&OutlineNode> {
        self.nodes.get(item.kind).get(&item.id)
    }

    pub fn contains(&self, item: ContentRef) -> bool {
        self.node(item).is_some()
    }

    /// Direct unlock targets of `item`
    pub fn successors(&self, item: ContentRef) -> ContentSet {
        self.node(item)
            .map(|node| node.next.clone())
            .unwrap_or_default()
    }

    /// Containing item: the topic of a lesson, the lesson of a unit.
    pub fn parent(&self, item: ContentRef) -> Option<ContentRef> {
        let parent_id = self.node(item)?.parent?;
        match item.kind {
            ContentKind::Topic => None,
            ContentKind::Lesson => Some(ContentRef::topic(parent_id)),
            _ => Some(ContentRef::lesson(parent_id)),
        }
    }

    /// Items directly inside a topic or lesson, in outline order.
    pub fn children(&self, container: ContentRef) -> Vec<ContentRef> {
        let kinds: &[ContentKind] = match container.kind {
            ContentKind::Topic => &[ContentKind::Lesson],
            ContentKind::Lesson => &[ContentKind::Video, ContentKind::Test, ContentKind::Practice],
            _ => &[],
        };
        let mut children: Vec<ContentRef> = kinds
            .iter()
            .flat_map(|&kind| {
                self.nodes
                    .get(kind)
                    .values()
                    .filter(|node| node.parent == Some(container.id))
                    .map(move |node| ContentRef::new(kind, node.id))
            })
            .collect();
        children.sort_by_key(|&child| self.position(child));
        children
    }

    /// Sort key placing an item in the course: topic serial, lesson serial,
    /// video serial, then kind and id.
    ///
    /// Tests and practices have no serial number of their own and sort after
    /// the videos of their lesson.
    pub fn position(&self, item: ContentRef) -> OutlinePosition {
        let serial = |item: ContentRef| {
            self.node(item).map(|n| n.serial_number).unwrap_or(i32::MAX)
        };
        let (topic, lesson, unit) = match item.kind {
            ContentKind::Topic => (serial(item), i32::MIN, i32::MIN),
            ContentKind::Lesson => {
                let topic = self.parent(item).map(serial).unwrap_or(i32::MAX);
                (topic, serial(item), i32::MIN)
            }
            ContentKind::Video | ContentKind::Test | ContentKind::Practice => {
                let lesson = self.parent(item);
                let topic = lesson
                    .and_then(|lesson| self.parent(lesson))
                    .map(serial)
                    .unwrap_or(i32::MAX);
                let lesson_serial = lesson.map(serial).unwrap_or(i32::MAX);
                let unit = if item.kind == ContentKind::Video {
                    serial(item)
                } else {
                    i32::MAX
                };
                (topic, lesson_serial, unit)
            }
        };
        (topic, lesson, unit, item.kind, item.id)
    }

    /// Display title, with a placeholder for untitled items
    pub fn title(&self, item: ContentRef) -> String {
        self.node(item)
            .and_then(|node| node.title.clone())
            .unwrap_or_else(|| UNTITLED.to_string())
    }

    /// Number of items of each kind
    pub fn totals(&self) -> PerKind<usize> {
        self.nodes.map(|_, nodes| nodes.len())
    }

    /// Titles of the items in `set`, in outline order. Unknown ids are skipped.
    pub fn names(&self, set: &ContentSet) -> PerKind<Vec<String>> {
        set.map(|kind, ids| {
            let mut items: Vec<ContentRef> = ids
                .iter()
                .map(|&id| ContentRef::new(kind, id))
                .filter(|&item| self.contains(item))
                .collect();
            items.sort_by_key(|&item| self.position(item));
            items.into_iter().map(|item| self.title(item)).collect()
        })
    }
}

/// Snapshot of one learner's unlock state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgressState {
    pub available: ContentSet,
    pub done: ContentSet,
}

/// Titles the bot needs to render the next screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextStepParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practice_title: Option<String>,
}

/// Where the learner should go after a completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextStep {
    pub target: ContentRef,
    pub params: NextStepParams,
}

/// Result of applying one completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockOutcome {
    /// Items that became available
    pub unlocked: ContentSet,
    /// Items that became done, including backfill and rollups
    pub completed: ContentSet,
    /// `None` means the course is finished along this path
    pub next_step: Option<NextStep>,
}

/// A graded test attempt; the outcome is present only when it passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestSubmission {
    pub grade: TestGrade,
    pub outcome: Option<UnlockOutcome>,
}

/// An answer to a video's control question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoAnswer {
    pub correct: bool,
    pub outcome: Option<UnlockOutcome>,
}

/// Aggregate progress of one learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressReport {
    pub names_done: PerKind<Vec<String>>,
    pub quantity_done: PerKind<usize>,
    pub quantity_all: PerKind<usize>,
    /// Whole-number percent per kind, 0 when the catalog has none of a kind
    pub percent_done: PerKind<u8>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Full records of everything a learner may open.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AvailableContent {
    pub topics: Vec<Topic>,
    pub lessons: Vec<Lesson>,
    pub videos: Vec<VideoDetail>,
    pub tests: Vec<TestDetail>,
    pub practices: Vec<Practice>,
}
