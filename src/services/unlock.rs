//! Unlock engine
//!
//! Pure functions deciding what a learner gets after finishing a unit. The
//! engine reads the catalog through [`ContentGraph`] and the learner through a
//! [`UserProgressState`] snapshot; it never writes. Persisting the outcome is
//! the job of the progression service.
//!
//! Rules:
//! - finishing a unit makes its direct unlock targets available, minus what
//!   the learner already has;
//! - finishing a video also marks the earlier videos of its lesson as done;
//! - a lesson is done once all of its units are, a topic once all of its
//!   lessons are;
//! - the next step is the broadest newly unlocked item (topic before lesson
//!   before video before test before practice), earliest in the course.

use crate::models::{
    ContentKind, ContentRef, ContentSet, CourseOutline, NextStep, NextStepParams, OutlinePosition,
    UnlockOutcome, UserProgressState,
};

/// Read access to the catalog graph.
pub trait ContentGraph {
    fn contains(&self, item: ContentRef) -> bool;

    /// Direct unlock targets of `item`
    fn successors(&self, item: ContentRef) -> ContentSet;

    fn parent(&self, item: ContentRef) -> Option<ContentRef>;

    /// Items directly inside a topic or lesson, in course order
    fn children(&self, container: ContentRef) -> Vec<ContentRef>;

    fn position(&self, item: ContentRef) -> OutlinePosition;

    fn title(&self, item: ContentRef) -> String;
}

impl ContentGraph for CourseOutline {
    fn contains(&self, item: ContentRef) -> bool {
        CourseOutline::contains(self, item)
    }

    fn successors(&self, item: ContentRef) -> ContentSet {
        CourseOutline::successors(self, item)
    }

    fn parent(&self, item: ContentRef) -> Option<ContentRef> {
        CourseOutline::parent(self, item)
    }

    fn children(&self, container: ContentRef) -> Vec<ContentRef> {
        CourseOutline::children(self, container)
    }

    fn position(&self, item: ContentRef) -> OutlinePosition {
        CourseOutline::position(self, item)
    }

    fn title(&self, item: ContentRef) -> String {
        CourseOutline::title(self, item)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UnlockError {
    #[error("Unknown content: {0}")]
    UnknownUnit(ContentRef),

    #[error("Content cannot be completed directly: {0}")]
    NotCompletable(ContentRef),
}

/// Starter items the learner does not have yet.
pub fn grant(start: &ContentSet, available: &ContentSet) -> ContentSet {
    start.difference(available)
}

/// Apply the completion of `completed` to a learner's state.
///
/// Successors missing from the graph are still unlocked but never chosen as
/// the next step.
pub fn unlock_after<G: ContentGraph + ?Sized>(
    graph: &G,
    completed: ContentRef,
    state: &UserProgressState,
) -> Result<UnlockOutcome, UnlockError> {
    if !graph.contains(completed) {
        return Err(UnlockError::UnknownUnit(completed));
    }
    if !completed.kind.is_completable() {
        return Err(UnlockError::NotCompletable(completed));
    }

    let successors = graph.successors(completed);
    let unlocked = successors.difference(&state.available);
    let newly_done = done_delta(graph, completed, &state.done);

    // Nothing new to open: keep the learner moving through what the
    // completion points at but they have not finished yet.
    let target = best_candidate(graph, &unlocked).or_else(|| {
        let done = state.done.union(&newly_done);
        best_candidate(graph, &successors.difference(&done))
    });

    Ok(UnlockOutcome {
        unlocked,
        completed: newly_done,
        next_step: target.map(|target| NextStep {
            target,
            params: next_step_params(graph, target),
        }),
    })
}

/// Everything that becomes done with `completed`, excluding what already is.
fn done_delta<G: ContentGraph + ?Sized>(
    graph: &G,
    completed: ContentRef,
    done: &ContentSet,
) -> ContentSet {
    let mut delta = ContentSet::new();
    delta.insert(completed);

    let lesson = graph.parent(completed);

    if completed.kind == ContentKind::Video {
        if let Some(lesson) = lesson {
            let (_, _, serial, _, _) = graph.position(completed);
            delta.extend(
                graph
                    .children(lesson)
                    .into_iter()
                    .filter(|child| child.kind == ContentKind::Video)
                    .filter(|&child| graph.position(child).2 < serial),
            );
        }
    }

    let mut all_done = done.union(&delta);
    if let Some(lesson) = lesson {
        if is_rolled_up(graph, lesson, &all_done) {
            delta.insert(lesson);
            all_done.insert(lesson);
            if let Some(topic) = graph.parent(lesson) {
                if is_rolled_up(graph, topic, &all_done) {
                    delta.insert(topic);
                }
            }
        }
    }

    delta.difference(done)
}

fn is_rolled_up<G: ContentGraph + ?Sized>(
    graph: &G,
    container: ContentRef,
    done: &ContentSet,
) -> bool {
    let children = graph.children(container);
    !children.is_empty() && children.iter().all(|&child| done.contains(child))
}

/// Highest-priority item of `candidates` that exists in the graph.
fn best_candidate<G: ContentGraph + ?Sized>(
    graph: &G,
    candidates: &ContentSet,
) -> Option<ContentRef> {
    candidates
        .iter()
        .filter(|&item| graph.contains(item))
        .min_by_key(|&item| (item.kind, graph.position(item)))
}

/// Titles needed to render `target`.
pub fn next_step_params<G: ContentGraph + ?Sized>(graph: &G, target: ContentRef) -> NextStepParams {
    let title = Some(graph.title(target));
    let parent_title = graph.parent(target).map(|parent| graph.title(parent));

    match target.kind {
        ContentKind::Topic => NextStepParams {
            topic_title: title,
            ..Default::default()
        },
        ContentKind::Lesson => NextStepParams {
            topic_title: parent_title,
            lesson_title: title,
            ..Default::default()
        },
        ContentKind::Video => NextStepParams {
            video_title: title,
            lesson_title: parent_title,
            ..Default::default()
        },
        ContentKind::Test => NextStepParams {
            test_title: title,
            lesson_title: parent_title,
            ..Default::default()
        },
        ContentKind::Practice => NextStepParams {
            practice_title: title,
            lesson_title: parent_title,
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutlineNode;
    use proptest::prelude::*;
    use proptest::sample::Index;

    fn node(
        kind: ContentKind,
        id: i64,
        parent: Option<i64>,
        serial: i32,
        title: Option<&str>,
    ) -> OutlineNode {
        OutlineNode {
            id,
            kind,
            parent,
            serial_number: serial,
            title: title.map(str::to_string),
            next: ContentSet::new(),
        }
    }

    /// Two topics. Topic 1 has lesson 10 (videos 100, 101, 102, test 7,
    /// practice 9) and lesson 11 (video 110). Topic 2 has lesson 20
    /// (video 200).
    fn course() -> CourseOutline {
        let mut outline = CourseOutline::new();
        outline.insert(node(ContentKind::Topic, 1, None, 1, Some("Basics")));
        outline.insert(node(ContentKind::Topic, 2, None, 2, Some("Advanced")));
        outline.insert(node(ContentKind::Lesson, 10, Some(1), 1, Some("Variables")));
        outline.insert(node(ContentKind::Lesson, 11, Some(1), 2, Some("Loops")));
        outline.insert(node(ContentKind::Lesson, 20, Some(2), 1, Some("Traits")));
        outline.insert(node(ContentKind::Video, 100, Some(10), 1, Some("Intro")));
        outline.insert(node(ContentKind::Video, 101, Some(10), 2, Some("Let")));
        outline.insert(node(ContentKind::Video, 102, Some(10), 3, Some("Mut")));
        outline.insert(node(ContentKind::Test, 7, Some(10), 0, Some("Quiz")));
        outline.insert(node(ContentKind::Practice, 9, Some(10), 0, None));
        outline.insert(node(ContentKind::Video, 110, Some(11), 1, Some("For")));
        outline.insert(node(ContentKind::Video, 200, Some(20), 1, Some("Impl")));
        outline
    }

    fn set(items: &[ContentRef]) -> ContentSet {
        items.iter().copied().collect()
    }

    fn state(available: &[ContentRef], done: &[ContentRef]) -> UserProgressState {
        UserProgressState {
            available: set(available),
            done: set(done),
        }
    }

    /// Completion by a user who has nothing yet.
    fn complete_fresh(outline: &CourseOutline, unit: ContentRef) -> UnlockOutcome {
        unlock_after(outline, unit, &UserProgressState::default()).unwrap()
    }

    #[test]
    fn test_grant_is_set_difference() {
        let start = set(&[ContentRef::topic(1), ContentRef::lesson(10), ContentRef::video(100)]);
        let available = set(&[ContentRef::topic(1)]);
        assert_eq!(
            grant(&start, &available),
            set(&[ContentRef::lesson(10), ContentRef::video(100)])
        );
        assert!(grant(&start, &start).is_empty());
    }

    #[test]
    fn test_unlocks_successors_not_yet_available() {
        let mut outline = course();
        outline.link(ContentRef::video(100), ContentRef::video(101));
        outline.link(ContentRef::video(100), ContentRef::test(7));

        let before = state(&[ContentRef::video(100), ContentRef::test(7)], &[]);
        let outcome = unlock_after(&outline, ContentRef::video(100), &before).unwrap();

        assert_eq!(outcome.unlocked, set(&[ContentRef::video(101)]));
        assert_eq!(outcome.completed, set(&[ContentRef::video(100)]));
        let next = outcome.next_step.expect("next step");
        assert_eq!(next.target, ContentRef::video(101));
        assert_eq!(next.params.video_title.as_deref(), Some("Let"));
        assert_eq!(next.params.lesson_title.as_deref(), Some("Variables"));
    }

    #[test]
    fn test_broadest_kind_wins() {
        let mut outline = course();
        for target in [
            ContentRef::practice(9),
            ContentRef::video(110),
            ContentRef::lesson(11),
            ContentRef::test(7),
        ] {
            outline.link(ContentRef::video(102), target);
        }

        let outcome = complete_fresh(&outline, ContentRef::video(102));
        let next = outcome.next_step.expect("next step");
        assert_eq!(next.target, ContentRef::lesson(11));
        assert_eq!(next.params.topic_title.as_deref(), Some("Basics"));
        assert_eq!(next.params.lesson_title.as_deref(), Some("Loops"));
        assert_eq!(next.params.video_title, None);
    }

    #[test]
    fn test_ties_break_by_course_position() {
        let mut outline = course();
        // Video 200 has the same serial as 110 but sits in a later topic.
        outline.link(ContentRef::test(7), ContentRef::video(200));
        outline.link(ContentRef::test(7), ContentRef::video(110));

        let outcome = complete_fresh(&outline, ContentRef::test(7));
        assert_eq!(outcome.next_step.unwrap().target, ContentRef::video(110));

        let mut outline = course();
        outline.link(ContentRef::test(7), ContentRef::topic(2));
        outline.link(ContentRef::test(7), ContentRef::topic(1));
        let outcome = complete_fresh(&outline, ContentRef::test(7));
        let next = outcome.next_step.unwrap();
        assert_eq!(next.target, ContentRef::topic(1));
        assert_eq!(next.params.topic_title.as_deref(), Some("Basics"));
    }

    #[test]
    fn test_backfills_earlier_videos_of_the_lesson() {
        let outline = course();
        let done = state(&[], &[ContentRef::video(100)]);
        let outcome = unlock_after(&outline, ContentRef::video(102), &done).unwrap();
        assert_eq!(
            outcome.completed,
            set(&[ContentRef::video(101), ContentRef::video(102)])
        );
    }

    #[test]
    fn test_rolls_up_lesson_and_topic() {
        let outline = course();
        let done = [
            ContentRef::video(100),
            ContentRef::video(101),
            ContentRef::video(102),
            ContentRef::test(7),
            ContentRef::lesson(11),
            ContentRef::video(110),
        ];
        let outcome = unlock_after(&outline, ContentRef::practice(9), &state(&[], &done)).unwrap();
        assert_eq!(
            outcome.completed,
            set(&[ContentRef::practice(9), ContentRef::lesson(10), ContentRef::topic(1)])
        );
    }

    #[test]
    fn test_lesson_not_rolled_up_while_units_remain() {
        let outline = course();
        let outcome = complete_fresh(&outline, ContentRef::video(102));
        assert!(!outcome.completed.contains(ContentRef::lesson(10)));

        // Lesson 20 has a single video, so finishing it closes lesson and topic.
        let outcome = complete_fresh(&outline, ContentRef::video(200));
        assert!(outcome.completed.contains(ContentRef::lesson(20)));
        assert!(outcome.completed.contains(ContentRef::topic(2)));
    }

    #[test]
    fn test_repeat_completion_navigates_without_unlocking() {
        let mut outline = course();
        outline.link(ContentRef::video(100), ContentRef::video(101));

        let first = complete_fresh(&outline, ContentRef::video(100));
        let after = UserProgressState {
            available: first.unlocked.clone(),
            done: first.completed.clone(),
        };
        let again = unlock_after(&outline, ContentRef::video(100), &after).unwrap();

        assert!(again.unlocked.is_empty());
        assert!(again.completed.is_empty());
        assert_eq!(again.next_step.unwrap().target, ContentRef::video(101));
    }

    #[test]
    fn test_finish_when_nothing_is_left() {
        let mut outline = course();
        outline.link(ContentRef::video(110), ContentRef::video(100));

        let seen = state(&[ContentRef::video(100)], &[ContentRef::video(100)]);
        let outcome = unlock_after(&outline, ContentRef::video(110), &seen).unwrap();
        assert!(outcome.unlocked.is_empty());
        assert!(outcome.next_step.is_none());
        assert!(outcome.completed.contains(ContentRef::video(110)));

        let outcome = complete_fresh(&outline, ContentRef::practice(9));
        assert!(outcome.next_step.is_none());
        assert_eq!(outcome.completed, set(&[ContentRef::practice(9)]));
    }

    #[test]
    fn test_cycles_are_harmless() {
        let mut outline = course();
        outline.link(ContentRef::video(110), ContentRef::video(200));
        outline.link(ContentRef::video(200), ContentRef::video(110));

        let available = state(&[ContentRef::video(110)], &[]);
        let outcome = unlock_after(&outline, ContentRef::video(200), &available).unwrap();
        assert!(outcome.unlocked.is_empty());
        assert_eq!(outcome.next_step.unwrap().target, ContentRef::video(110));

        let done = state(&[], &[ContentRef::video(200)]);
        let outcome = unlock_after(&outline, ContentRef::video(110), &done).unwrap();
        assert_eq!(outcome.unlocked, set(&[ContentRef::video(200)]));
    }

    #[test]
    fn test_missing_successor_is_unlocked_but_not_chosen() {
        let mut outline = course();
        outline.link(ContentRef::test(7), ContentRef::topic(99));
        outline.link(ContentRef::test(7), ContentRef::practice(9));

        let outcome = complete_fresh(&outline, ContentRef::test(7));
        assert!(outcome.unlocked.contains(ContentRef::topic(99)));
        let next = outcome.next_step.unwrap();
        assert_eq!(next.target, ContentRef::practice(9));
        assert_eq!(next.params.practice_title.as_deref(), Some(crate::models::UNTITLED));
    }

    #[test]
    fn test_rejects_unknown_and_container_units() {
        let outline = course();
        let empty = UserProgressState::default();
        assert_eq!(
            unlock_after(&outline, ContentRef::video(999), &empty),
            Err(UnlockError::UnknownUnit(ContentRef::video(999)))
        );
        assert_eq!(
            unlock_after(&outline, ContentRef::lesson(10), &empty),
            Err(UnlockError::NotCompletable(ContentRef::lesson(10)))
        );
    }

    // ========================================================================
    // Property tests
    // ========================================================================

    /// A generated course plus a learner and the unit they just finished.
    #[derive(Debug, Clone)]
    struct Scenario {
        outline: CourseOutline,
        state: UserProgressState,
        completed: ContentRef,
    }

    fn build_scenario(
        lessons: Vec<(usize, u8, bool, bool)>,
        edges: Vec<(Index, Index)>,
        available: Vec<Index>,
        done: Vec<Index>,
        pick: Index,
    ) -> Scenario {
        let mut outline = CourseOutline::new();
        let mut nodes = Vec::new();
        let mut units = Vec::new();

        for topic_id in 1..=3 {
            outline.insert(node(ContentKind::Topic, topic_id, None, topic_id as i32, Some("t")));
            nodes.push(ContentRef::topic(topic_id));
        }

        let mut next_id = 1;
        for (i, (topic, videos, has_test, has_practice)) in lessons.into_iter().enumerate() {
            let lesson_id = i as i64 + 1;
            let topic_id = Some(topic as i64 + 1);
            outline.insert(node(ContentKind::Lesson, lesson_id, topic_id, i as i32, Some("l")));
            nodes.push(ContentRef::lesson(lesson_id));

            let mut lesson_units = Vec::new();
            for serial in 0..videos {
                lesson_units.push((ContentKind::Video, serial as i32));
            }
            if has_test {
                lesson_units.push((ContentKind::Test, 0));
            }
            if has_practice {
                lesson_units.push((ContentKind::Practice, 0));
            }
            for (kind, serial) in lesson_units {
                outline.insert(node(kind, next_id, Some(lesson_id), serial, Some("u")));
                let item = ContentRef::new(kind, next_id);
                nodes.push(item);
                units.push(item);
                next_id += 1;
            }
        }

        for (source, target) in edges {
            let source = nodes[source.index(nodes.len())];
            let target = nodes[target.index(nodes.len())];
            outline.link(source, target);
        }

        let state = UserProgressState {
            available: available.iter().map(|i| nodes[i.index(nodes.len())]).collect(),
            done: done.iter().map(|i| nodes[i.index(nodes.len())]).collect(),
        };
        let completed = units[pick.index(units.len())];

        Scenario {
            outline,
            state,
            completed,
        }
    }

    fn scenario() -> impl Strategy<Value = Scenario> {
        (
            prop::collection::vec((0usize..3, 1u8..4, any::<bool>(), any::<bool>()), 1..5),
            prop::collection::vec((any::<Index>(), any::<Index>()), 0..24),
            prop::collection::vec(any::<Index>(), 0..12),
            prop::collection::vec(any::<Index>(), 0..12),
            any::<Index>(),
        )
            .prop_map(|(lessons, edges, available, done, pick)| {
                build_scenario(lessons, edges, available, done, pick)
            })
    }

    proptest! {
        #[test]
        fn unlocked_is_new_and_reachable(s in scenario()) {
            let outcome = unlock_after(&s.outline, s.completed, &s.state).unwrap();
            let successors = s.outline.successors(s.completed);

            prop_assert!(outcome.unlocked.difference(&successors).is_empty());
            prop_assert!(outcome.unlocked.difference(&s.state.available) == outcome.unlocked);
            prop_assert!(outcome.completed.difference(&s.state.done) == outcome.completed);
            prop_assert!(
                s.state.done.contains(s.completed) || outcome.completed.contains(s.completed)
            );
        }

        #[test]
        fn applying_twice_changes_nothing(s in scenario()) {
            let first = unlock_after(&s.outline, s.completed, &s.state).unwrap();
            let after = UserProgressState {
                available: s.state.available.union(&first.unlocked),
                done: s.state.done.union(&first.completed),
            };
            let second = unlock_after(&s.outline, s.completed, &after).unwrap();

            prop_assert!(second.unlocked.is_empty());
            prop_assert!(second.completed.is_empty());
        }

        #[test]
        fn next_step_prefers_new_content(s in scenario()) {
            let outcome = unlock_after(&s.outline, s.completed, &s.state).unwrap();
            let known_unlocked = outcome.unlocked.iter().any(|item| s.outline.contains(item));

            match &outcome.next_step {
                Some(step) => {
                    prop_assert!(s.outline.successors(s.completed).contains(step.target));
                    prop_assert_eq!(known_unlocked, outcome.unlocked.contains(step.target));
                    for item in outcome.unlocked.iter().filter(|&i| s.outline.contains(i)) {
                        prop_assert!(step.target.kind <= item.kind);
                    }
                }
                None => prop_assert!(!known_unlocked),
            }
        }
    }
}
