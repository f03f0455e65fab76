//! Shared course used by the service tests
//!
//! Basics (serial 1)
//!   Variables: videos Intro, Let; test "Variables quiz"; practice Homework
//!   Loops: video For
//! Advanced (serial 2)
//!   Traits: video Impl
//!
//! Edges: Intro -> Let -> quiz -> Homework -> {Loops, For};
//! For -> {Advanced, Traits, Impl}. Tariff "Base" starts with Basics,
//! Variables and Intro.

use crate::db::repositories::*;
use crate::db::{create_test_pool, migrations, DynDatabasePool};
use crate::models::*;

pub struct SeededCourse {
    pub pool: DynDatabasePool,
    pub basics: i64,
    pub advanced: i64,
    pub variables: i64,
    pub loops: i64,
    pub traits: i64,
    pub intro: i64,
    pub let_video: i64,
    pub for_video: i64,
    pub impl_video: i64,
    pub quiz: i64,
    pub homework: i64,
    pub tariff: i64,
}

pub async fn empty_pool() -> DynDatabasePool {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

fn topic(title: &str, serial_number: i32) -> CreateTopicInput {
    CreateTopicInput {
        title: title.to_string(),
        description: format!("<p>{}&nbsp;topic</p>", title),
        serial_number,
        picture: Some(format!("topics/{}.png", title.to_lowercase())),
    }
}

fn lesson(topic_id: i64, title: &str, serial_number: i32) -> CreateLessonInput {
    CreateLessonInput {
        topic_id,
        title: title.to_string(),
        description: format!("{} lesson", title),
        serial_number,
        picture: None,
    }
}

fn video(lesson_id: i64, title: &str, serial_number: i32) -> CreateVideoInput {
    CreateVideoInput {
        lesson_id,
        title: title.to_string(),
        serial_number,
        video_link: format!("https://video.example/{}", title.to_lowercase()),
    }
}

pub async fn seed_course() -> SeededCourse {
    let pool = empty_pool().await;
    let catalog = SqlxCatalogRepository::new(pool.clone());
    let quiz_repo = SqlxQuizRepository::new(pool.clone());
    let tariffs = SqlxTariffRepository::new(pool.clone());

    let basics = catalog.create_topic(&topic("Basics", 1)).await.unwrap().topic_id;
    let advanced = catalog.create_topic(&topic("Advanced", 2)).await.unwrap().topic_id;

    let variables = catalog.create_lesson(&lesson(basics, "Variables", 1)).await.unwrap().lesson_id;
    let loops = catalog.create_lesson(&lesson(basics, "Loops", 2)).await.unwrap().lesson_id;
    let traits = catalog.create_lesson(&lesson(advanced, "Traits", 1)).await.unwrap().lesson_id;

    let intro = catalog.create_video(&video(variables, "Intro", 1)).await.unwrap().video_id;
    let let_video = catalog.create_video(&video(variables, "Let", 2)).await.unwrap().video_id;
    let for_video = catalog.create_video(&video(loops, "For", 1)).await.unwrap().video_id;
    let impl_video = catalog.create_video(&video(traits, "Impl", 1)).await.unwrap().video_id;

    catalog
        .create_summary(&CreateVideoSummaryInput {
            video_id: intro,
            title: Some("Key points".to_string()),
            description: "<ul><li>Bindings</li></ul>".to_string(),
            picture: Some("/media/summaries/intro.png".to_string()),
        })
        .await
        .unwrap();

    let control = quiz_repo
        .create_question(&CreateQuestionInput {
            owner: QuestionOwner::Video(intro),
            description: "Are bindings immutable by default?".to_string(),
            serial_number: 1,
            picture: None,
        })
        .await
        .unwrap();
    for (description, right) in [("Yes", true), ("No", false)] {
        quiz_repo
            .create_answer(&CreateAnswerInput {
                question_id: control.question_id,
                description: description.to_string(),
                serial_number: None,
                right,
            })
            .await
            .unwrap();
    }

    let quiz = catalog
        .create_test(&CreateTestInput {
            lesson_id: variables,
            title: Some("Variables quiz".to_string()),
            description: "Check <b>yourself</b>".to_string(),
            show_right_answer: true,
        })
        .await
        .unwrap()
        .test_id;
    for (serial, right) in [(1, vec![1]), (2, vec![2, 3])] {
        let question = quiz_repo
            .create_question(&CreateQuestionInput {
                owner: QuestionOwner::Test(quiz),
                description: format!("Question {}", serial),
                serial_number: serial,
                picture: None,
            })
            .await
            .unwrap();
        for option in 1..=3 {
            quiz_repo
                .create_answer(&CreateAnswerInput {
                    question_id: question.question_id,
                    description: format!("Option {}", option),
                    serial_number: None,
                    right: right.contains(&option),
                })
                .await
                .unwrap();
        }
    }

    let homework = catalog
        .create_practice(&CreatePracticeInput {
            lesson_id: variables,
            title: Some("Homework".to_string()),
            description: "Write a program".to_string(),
            exercise: Some("practice/homework.pdf".to_string()),
        })
        .await
        .unwrap()
        .practice_id;

    let edges = [
        (ContentRef::video(intro), ContentRef::video(let_video)),
        (ContentRef::video(let_video), ContentRef::test(quiz)),
        (ContentRef::test(quiz), ContentRef::practice(homework)),
        (ContentRef::practice(homework), ContentRef::lesson(loops)),
        (ContentRef::practice(homework), ContentRef::video(for_video)),
        (ContentRef::video(for_video), ContentRef::topic(advanced)),
        (ContentRef::video(for_video), ContentRef::lesson(traits)),
        (ContentRef::video(for_video), ContentRef::video(impl_video)),
    ];
    for (source, target) in edges {
        catalog.add_edge(&UnlockEdge { source, target }).await.unwrap();
    }

    let tariff = tariffs
        .create(&CreateTariffInput {
            title: "Base".to_string(),
            description: "Starter course".to_string(),
            price: 4900,
            status: TariffStatus::Active,
        })
        .await
        .unwrap()
        .tariff_id;
    let start: ContentSet = [
        ContentRef::topic(basics),
        ContentRef::lesson(variables),
        ContentRef::video(intro),
    ]
    .into_iter()
    .collect();
    tariffs.add_start_content(tariff, &start).await.unwrap();

    SeededCourse {
        pool,
        basics,
        advanced,
        variables,
        loops,
        traits,
        intro,
        let_video,
        for_video,
        impl_video,
        quiz,
        homework,
        tariff,
    }
}
