use cardak_core::model::{
    Answer, AnswerSheet, OptionDraft, OptionId, PhotoDraft, PostDraft, QuestionDraft, QuestionId,
    QuestionKind, Response, TestDraft, TestId, TestResult,
};
use cardak_core::scoring::{Score, grade};
use cardak_core::time::fixed_now;
use chrono::Duration;
use storage::repository::{
    AssetStore, ForumRepository, PhotoRepository, ResultRepository, TestRepository,
};
use storage::sqlite::SqliteRepository;
use storage::{Storage, StorageError};
use url::Url;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn general_culture() -> TestDraft {
    TestDraft::new("General Culture", "Ten quick questions", "admin")
        .with_question(QuestionDraft::multiple_choice(
            1,
            "Capital of Türkiye?",
            vec![
                OptionDraft::new(1, "Istanbul", false),
                OptionDraft::new(2, "Ankara", true),
                OptionDraft::new(3, "Izmir", false),
            ],
        ))
        .with_question(QuestionDraft::image_based(
            2,
            "Which animal is shown?",
            "https://images.example/fox.jpg",
            vec![OptionDraft::new(1, "Wolf", false), OptionDraft::new(2, "Fox", true)],
        ))
        .with_question(QuestionDraft::open_ended(3, "Einstein's best known theory?"))
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_question_order_and_options() {
    let repo = connect("memdb_tests_roundtrip").await;
    let validated = general_culture().validate(fixed_now()).unwrap();
    let id = repo.insert_test(&validated).await.unwrap();

    let test = repo.get_test(id).await.unwrap();
    assert_eq!(test.title(), "General Culture");
    assert_eq!(test.created_at(), fixed_now());
    let kinds: Vec<_> = test.questions().iter().map(|q| q.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            QuestionKind::MultipleChoice,
            QuestionKind::ImageBased,
            QuestionKind::OpenEnded
        ]
    );
    let first = &test.questions()[0];
    assert_eq!(first.options().len(), 3);
    assert_eq!(first.correct_option().unwrap().text(), "Ankara");
    assert!(test.questions()[1].image_url().is_some());
    assert!(test.questions()[2].options().is_empty());

    let listed = repo.list_tests(10).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].question_count, 3);

    assert!(matches!(
        repo.get_test(TestId::new(404)).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_results_keep_not_applicable_scores() {
    let repo = connect("memdb_results").await;
    let essay = TestDraft::new("Essay", "", "admin")
        .with_question(QuestionDraft::open_ended(1, "Why?"))
        .validate(fixed_now())
        .unwrap();
    let essay_id = repo.insert_test(&essay).await.unwrap();
    let essay = repo.get_test(essay_id).await.unwrap();

    let mut sheet = AnswerSheet::new();
    let q = QuestionId::new(1);
    sheet.insert(q, Answer::new(q, Response::Text("because".into())));
    let report = grade(&essay, &sheet);
    let result = TestResult::from_report(
        essay_id,
        &report,
        &sheet,
        fixed_now(),
        fixed_now() + Duration::minutes(3),
    )
    .unwrap();

    let result_id = repo.append_result(&result).await.unwrap();
    let stored = repo.get_result(result_id).await.unwrap();
    assert_eq!(stored.score(), Score::NotApplicable);
    assert_eq!(
        stored.answers()[0].response,
        Some(Response::Text("because".into()))
    );

    let rows = repo.list_results(essay_id, 5).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, result_id);
}

#[tokio::test]
async fn sqlite_scored_results_list_newest_first() {
    let repo = connect("memdb_results_order").await;
    let id = repo
        .insert_test(&general_culture().validate(fixed_now()).unwrap())
        .await
        .unwrap();
    let test = repo.get_test(id).await.unwrap();

    let mut sheet = AnswerSheet::new();
    let q1 = QuestionId::new(1);
    sheet.insert(q1, Answer::new(q1, Response::Choice(OptionId::new(2))));
    let report = grade(&test, &sheet);
    assert_eq!(report.score, Score::Percent(50));

    for minutes in [5, 10] {
        let result = TestResult::from_report(
            id,
            &report,
            &sheet,
            fixed_now(),
            fixed_now() + Duration::minutes(minutes),
        )
        .unwrap();
        repo.append_result(&result).await.unwrap();
    }

    let rows = repo.list_results(id, 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].result.completed_at() > rows[1].result.completed_at());
    assert_eq!(rows[0].result.score(), Score::Percent(50));
}

#[tokio::test]
async fn sqlite_photos_forum_and_assets() {
    let repo = connect("memdb_community")
        .await
        .with_asset_base(Url::parse("https://cdn.example/storage").unwrap());

    let url = repo
        .upload_asset("photos", "1700000000000-sea.jpg", b"jpeg-bytes")
        .await
        .unwrap();
    assert_eq!(
        url.as_str(),
        "https://cdn.example/storage/photos/1700000000000-sea.jpg"
    );
    assert!(matches!(
        repo.upload_asset("photos", "1700000000000-sea.jpg", b"again")
            .await,
        Err(StorageError::Conflict)
    ));
    assert_eq!(
        repo.fetch_asset("photos", "1700000000000-sea.jpg")
            .await
            .unwrap(),
        b"jpeg-bytes".to_vec()
    );

    let photo = PhotoDraft::new("Sea view", "sailor")
        .validate(url, fixed_now())
        .unwrap();
    let photo_id = repo.insert_photo(&photo).await.unwrap();
    assert_eq!(repo.like_photo(photo_id).await.unwrap(), 1);
    let listed = repo.list_photos(10).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].likes, 1);

    for (minutes, text) in [(0, "first"), (5, "second")] {
        let post = PostDraft::new("hiker", text)
            .validate(fixed_now() + Duration::minutes(minutes))
            .unwrap();
        repo.insert_post(&post).await.unwrap();
    }
    let posts = repo.list_posts(50).await.unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].content, "second");
}

#[tokio::test]
async fn storage_sqlite_builds_gateway_handles() {
    let storage = Storage::sqlite(
        "sqlite:file:memdb_storage?mode=memory&cache=shared",
        Url::parse("https://cdn.example/").unwrap(),
    )
    .await
    .expect("storage");

    let id = storage
        .tests
        .insert_test(&general_culture().validate(fixed_now()).unwrap())
        .await
        .unwrap();
    assert_eq!(storage.tests.get_test(id).await.unwrap().questions().len(), 3);
}
