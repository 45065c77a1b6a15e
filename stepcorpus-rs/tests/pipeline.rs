//! End-to-end behavior of the dedup pipeline with fake collaborators.

mod helpers;

use helpers::{FakeExtractor, TableEmbedder, TempCorpus};
use serde_json::json;
use stepcorpus_rs::corpus::{CorpusStore, LoadStatus};
use stepcorpus_rs::errors::ErrorKind;
use stepcorpus_rs::validate::validate_batch;
use stepcorpus_rs::{SimilarityMatcher, StepPipeline, StepRecord};

const SCENARIO: &str = "Scenario: login\n  Given the user enters username\n  When the user clicks on login button on the login page";

/// Vectors chosen so that:
/// - "type in the username" vs "enter username" has cosine 0.97
/// - "click login button" vs "enter username" has cosine 0.10
fn login_embedder() -> TableEmbedder {
    TableEmbedder::new(vec![
        ("enter username", vec![1.0, 0.0, 0.0]),
        ("type in the username", vec![0.97, 0.243_104, 0.0]),
        ("click login button", vec![0.1, 0.994_987, 0.0]),
        ("enter password", vec![0.0, 0.0, 1.0]),
        ("type password", vec![0.0, 0.2, 0.98]),
    ])
}

fn pipeline(
    reply: serde_json::Value,
    embedder: TableEmbedder,
) -> StepPipeline<FakeExtractor, TableEmbedder> {
    StepPipeline::new(
        FakeExtractor::returning(reply),
        embedder,
        SimilarityMatcher::default(),
    )
}

#[tokio::test]
async fn scenario_example_accepts_one_rejects_one() {
    let corpus = TempCorpus::new();
    corpus.write(r#"{"steps":[{"step":"enter username","capture":true}]}"#);

    let report = pipeline(
        json!({"steps": [
            {"step": "type in the username", "capture": true},
            {"step": "click login button", "page": "LoginPage", "capture": true},
        ]}),
        login_embedder(),
    )
    .run(SCENARIO, &corpus.path)
    .await
    .expect("run succeeds");

    assert_eq!(report.accepted, 1);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.rejected_steps, vec![StepRecord::new("type in the username", true)]);
    assert_eq!(report.corpus_size, 2);
    assert_eq!(report.load_status, LoadStatus::Loaded { records: 1 });
    assert_eq!(
        corpus.read_json(),
        json!({"steps": [
            {"step": "enter username", "capture": true},
            {"step": "click login button", "page": "LoginPage", "capture": true},
        ]})
    );
}

#[tokio::test]
async fn paraphrase_is_rejected_by_similarity() {
    let corpus = TempCorpus::new();
    corpus.write(r#"{"steps":[{"step":"enter username","capture":true}]}"#);

    let report = pipeline(
        json!({"steps": [{"step": "type in the username", "capture": true}]}),
        login_embedder(),
    )
    .run(SCENARIO, &corpus.path)
    .await
    .unwrap();

    assert_eq!(report.accepted, 0);
    assert_eq!(report.rejected_steps, vec![StepRecord::new("type in the username", true)]);
    assert_eq!(corpus.actions(), ["enter username"]);
}

#[tokio::test]
async fn near_duplicates_within_one_batch_admit_only_the_first() {
    let corpus = TempCorpus::new();

    let report = pipeline(
        json!({"steps": [
            {"step": "enter password", "capture": true},
            {"step": "type password", "capture": true},
        ]}),
        login_embedder(),
    )
    .run(SCENARIO, &corpus.path)
    .await
    .unwrap();

    assert_eq!(report.load_status, LoadStatus::Missing);
    assert_eq!(report.accepted, 1);
    assert_eq!(report.rejected, 1);
    assert_eq!(corpus.actions(), ["enter password"]);
}

#[tokio::test]
async fn verbatim_repeat_within_batch_is_rejected() {
    let corpus = TempCorpus::new();

    let report = pipeline(
        json!({"steps": [
            {"step": "enter password", "capture": true},
            {"step": "enter password", "capture": false},
        ]}),
        login_embedder(),
    )
    .run(SCENARIO, &corpus.path)
    .await
    .unwrap();

    assert_eq!(report.accepted, 1);
    assert_eq!(corpus.actions(), ["enter password"]);
}

#[tokio::test]
async fn accepted_steps_append_in_batch_order_after_existing() {
    let corpus = TempCorpus::new();
    corpus.write(r#"{"steps":[{"step":"a","capture":true},{"step":"b","capture":false}]}"#);

    let embedder = TableEmbedder::new(vec![
        ("a", vec![1.0, 0.0, 0.0, 0.0, 0.0]),
        ("b", vec![0.0, 1.0, 0.0, 0.0, 0.0]),
        ("c", vec![0.0, 0.0, 1.0, 0.0, 0.0]),
        ("d", vec![0.0, 0.0, 0.0, 1.0, 0.0]),
        ("e", vec![0.0, 0.0, 0.0, 0.0, 1.0]),
    ]);
    let report = pipeline(
        json!({"steps": [
            {"step": "e", "capture": true},
            {"step": "c", "capture": true},
            {"step": "d", "capture": true},
        ]}),
        embedder,
    )
    .run(SCENARIO, &corpus.path)
    .await
    .unwrap();

    assert_eq!(report.accepted, 3);
    assert_eq!(corpus.actions(), ["a", "b", "e", "c", "d"]);
}

#[tokio::test]
async fn rerunning_the_same_batch_is_idempotent() {
    let corpus = TempCorpus::new();
    corpus.write(r#"{"steps":[{"step":"enter username","capture":true}]}"#);
    let reply = json!({"steps": [
        {"step": "click login button", "page": "LoginPage", "capture": true},
        {"step": "enter password", "capture": true},
    ]});

    let first = pipeline(reply.clone(), login_embedder())
        .run(SCENARIO, &corpus.path)
        .await
        .unwrap();
    let after_first = corpus.read();

    let second = pipeline(reply, login_embedder())
        .run(SCENARIO, &corpus.path)
        .await
        .unwrap();

    assert_eq!(first.accepted, 2);
    assert_eq!(second.accepted, 0);
    assert_eq!(second.rejected, 2);
    assert_eq!(corpus.read(), after_first);
}

#[tokio::test]
async fn score_exactly_at_threshold_is_rejected() {
    let corpus = TempCorpus::new();
    corpus.write(r#"{"steps":[{"step":"open menu","capture":false}]}"#);

    let embedder = TableEmbedder::new(vec![
        ("open menu", vec![4.0, 3.0]),
        ("show the menu", vec![3.0, 4.0]), // cosine 24/25
    ]);
    let report = StepPipeline::new(
        FakeExtractor::returning(json!({"steps": [{"step": "show the menu", "capture": false}]})),
        embedder,
        SimilarityMatcher::new(0.96),
    )
    .run(SCENARIO, &corpus.path)
    .await
    .unwrap();

    assert_eq!(report.rejected, 1);
    assert_eq!(corpus.actions(), ["open menu"]);
}

#[tokio::test]
async fn rejected_duplicate_is_dropped_not_merged() {
    let corpus = TempCorpus::new();
    corpus.write(r#"{"steps":[{"step":"click login button","capture":true}]}"#);

    pipeline(
        json!({"steps": [{"step": "click login button", "page": "LoginPage", "capture": true}]}),
        login_embedder(),
    )
    .run(SCENARIO, &corpus.path)
    .await
    .unwrap();

    assert_eq!(
        corpus.read_json(),
        json!({"steps": [{"step": "click login button", "capture": true}]})
    );
}

#[tokio::test]
async fn corrupt_corpus_is_recovered_and_replaced_on_save() {
    let corpus = TempCorpus::new();
    corpus.write("{\"steps\": [ oops");

    let report = pipeline(
        json!({"steps": [{"step": "enter username", "capture": true}]}),
        login_embedder(),
    )
    .run(SCENARIO, &corpus.path)
    .await
    .expect("run succeeds despite corrupt corpus");

    assert!(matches!(report.load_status, LoadStatus::Recovered { .. }));
    assert_eq!(report.accepted, 1);
    assert_eq!(corpus.actions(), ["enter username"]);
}

#[tokio::test]
async fn corrupt_corpus_survives_a_failed_run() {
    let corpus = TempCorpus::new();
    corpus.write("not json at all");

    let err = pipeline(json!({"items": []}), login_embedder())
        .run(SCENARIO, &corpus.path)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Schema);
    assert_eq!(corpus.read(), "not json at all");
}

#[tokio::test]
async fn missing_steps_key_is_schema_error_and_corpus_unchanged() {
    let corpus = TempCorpus::new();
    let original = r#"{"steps":[{"step":"enter username","capture":true}]}"#;
    corpus.write(original);

    let err = pipeline(json!({"result": []}), login_embedder())
        .run(SCENARIO, &corpus.path)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Schema);
    assert_eq!(corpus.read(), original);
}

#[tokio::test]
async fn one_bad_candidate_aborts_the_whole_batch() {
    let corpus = TempCorpus::new();
    let embedder = login_embedder();

    let err = StepPipeline::new(
        FakeExtractor::returning(json!({"steps": [
            {"step": "enter username", "capture": true},
            {"step": "click login button", "page": 42, "capture": true},
        ]})),
        embedder,
        SimilarityMatcher::default(),
    )
    .run(SCENARIO, &corpus.path)
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(!corpus.path.exists());
}

#[tokio::test]
async fn extraction_failure_is_provider_error() {
    let corpus = TempCorpus::new();

    let err = StepPipeline::new(
        FakeExtractor::failing(),
        login_embedder(),
        SimilarityMatcher::default(),
    )
    .run(SCENARIO, &corpus.path)
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Provider);
    assert!(!corpus.path.exists());
}

#[tokio::test]
async fn embedding_failure_is_provider_error_and_corpus_unchanged() {
    let corpus = TempCorpus::new();
    let original = r#"{"steps":[{"step":"enter username","capture":true}]}"#;
    corpus.write(original);

    let err = pipeline(
        json!({"steps": [{"step": "click login button", "capture": true}]}),
        TableEmbedder::unreachable(),
    )
    .run(SCENARIO, &corpus.path)
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Provider);
    assert_eq!(corpus.read(), original);
}

#[tokio::test]
async fn dimension_mismatch_is_provider_error() {
    let corpus = TempCorpus::new();
    corpus.write(r#"{"steps":[{"step":"enter username","capture":true}]}"#);

    let embedder = TableEmbedder::new(vec![
        ("enter username", vec![1.0, 0.0, 0.0]),
        ("click login button", vec![0.0, 1.0]),
    ]);
    let err = pipeline(
        json!({"steps": [{"step": "click login button", "capture": true}]}),
        embedder,
    )
    .run(SCENARIO, &corpus.path)
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Provider);
}

#[tokio::test]
async fn unreadable_corpus_path_is_fatal() {
    let corpus = TempCorpus::new();
    // Starting empty here could later overwrite data that was never read.
    std::fs::create_dir(&corpus.path).unwrap();

    let err = pipeline(
        json!({"steps": [{"step": "enter username", "capture": true}]}),
        login_embedder(),
    )
    .run(SCENARIO, &corpus.path)
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(corpus.path.is_dir());
}

#[tokio::test]
async fn empty_batch_saves_unchanged_corpus() {
    let corpus = TempCorpus::new();
    corpus.write(r#"{"steps":[{"step":"enter username","capture":true}]}"#);
    let embedder = login_embedder();

    let report = pipeline(json!({"steps": []}), embedder)
        .run(SCENARIO, &corpus.path)
        .await
        .unwrap();

    assert_eq!((report.accepted, report.rejected), (0, 0));
    assert_eq!(corpus.actions(), ["enter username"]);
}

#[tokio::test]
async fn ingest_updates_store_without_saving() {
    let corpus = TempCorpus::new();
    let pipeline = pipeline(json!({"steps": []}), login_embedder());
    let candidates = validate_batch(&json!({"steps": [
        {"step": "enter username", "capture": true},
        {"step": "type in the username", "capture": true},
        {"step": "click login button", "page": "LoginPage", "capture": false},
    ]}))
    .unwrap();

    let mut store = CorpusStore::load(&corpus.path).await.unwrap();
    let outcome = pipeline.ingest(candidates, &mut store).await.unwrap();

    assert_eq!(outcome.accepted.len(), 2);
    assert_eq!(outcome.rejected, vec![StepRecord::new("type in the username", true)]);
    assert_eq!(store.len(), 2);
    assert_eq!(store.cached_embeddings().len(), 2);
    assert!(!corpus.path.exists());
}

#[tokio::test]
async fn corpus_embeddings_use_one_provider_call() {
    let corpus = TempCorpus::new();
    corpus.write(
        r#"{"steps":[{"step":"enter username","capture":true},{"step":"enter password","capture":true}]}"#,
    );
    let pipeline = pipeline(json!({"steps": []}), login_embedder());
    let candidates = validate_batch(&json!({"steps": [
        {"step": "click login button", "capture": true},
        {"step": "type password", "capture": true},
    ]}))
    .unwrap();

    let mut store = CorpusStore::load(&corpus.path).await.unwrap();
    pipeline.ingest(candidates, &mut store).await.unwrap();

    // One call for the corpus, one for the candidates.
    assert_eq!(pipeline.embedder().calls(), 2);
    assert_eq!(store.len(), 3);
}
