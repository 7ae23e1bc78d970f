/*!
 * Batch controller workflow tests: error isolation, fatal aborts, manifest
 * resume and skip-already-done behavior.
 */

use std::path::PathBuf;
use std::sync::Arc;

use booktrans::errors::TranslationError;
use booktrans::progress::{BatchProgressStore, DocumentStatus};
use booktrans::providers::mock::MockClient;

use crate::common::{
    create_temp_dir, create_test_file, default_batch_options, make_batch_controller, memory_ctx,
    sample_document,
};

const MAX_CHARS: usize = 120;
const MARKER: &str = "POISONMARKER";

/// Three documents; the second carries the failure marker
fn make_documents(dir: &std::path::Path) -> Vec<PathBuf> {
    let doc1 = create_test_file(dir, "alpha.txt", &sample_document(2)).unwrap();
    let doc2 = create_test_file(
        dir,
        "bravo.txt",
        &format!("A paragraph mentioning {} inside enough text to count.\n", MARKER),
    )
    .unwrap();
    let doc3 = create_test_file(dir, "charlie.txt", &sample_document(2)).unwrap();
    vec![doc1, doc2, doc3]
}

#[tokio::test]
async fn test_run_withFailingMiddleDocument_shouldIsolateTheFailure() {
    crate::common::init_test_logging();
    let dir = create_temp_dir().unwrap();
    let state = dir.path().join("state");
    let documents = make_documents(dir.path());

    let client = MockClient::working().with_failure_marker(MARKER);
    let (ctx, _log) = memory_ctx();
    let controller = make_batch_controller(
        Arc::new(client),
        &state,
        MAX_CHARS,
        2,
        default_batch_options(true, 1),
        ctx,
    )
    .unwrap();

    let result = controller
        .run(documents.clone(), |_, _, _| {})
        .await
        .unwrap();

    // Every document's outcome is enumerated
    assert_eq!(result.outcomes.len(), 3);
    assert_eq!(result.outcomes[0].status, DocumentStatus::Succeeded);
    assert!(matches!(
        result.outcomes[1].status,
        DocumentStatus::Failed { .. }
    ));
    assert_eq!(result.outcomes[2].status, DocumentStatus::Succeeded);
    assert!(!result.halted_early);

    // The failure names its concrete cause
    if let DocumentStatus::Failed { error } = &result.outcomes[1].status {
        assert!(error.contains("Simulated failure"), "error was: {}", error);
    }

    // Successful outputs exist, the failed one does not
    assert!(dir.path().join("alpha.en.txt").exists());
    assert!(!dir.path().join("bravo.en.txt").exists());
    assert!(dir.path().join("charlie.en.txt").exists());
}

#[tokio::test]
async fn test_run_withHaltOnError_shouldLeaveLaterDocumentsUntouched() {
    let dir = create_temp_dir().unwrap();
    let state = dir.path().join("state");

    // The FIRST document fails this time
    let doc1 = create_test_file(
        dir.path(),
        "alpha.txt",
        &format!("A paragraph mentioning {} inside enough text to count.\n", MARKER),
    )
    .unwrap();
    let doc2 = create_test_file(dir.path(), "bravo.txt", &sample_document(2)).unwrap();
    let doc3 = create_test_file(dir.path(), "charlie.txt", &sample_document(2)).unwrap();

    let client = MockClient::working().with_failure_marker(MARKER);
    let (ctx, _log) = memory_ctx();
    let controller = make_batch_controller(
        Arc::new(client.clone()),
        &state,
        MAX_CHARS,
        2,
        default_batch_options(false, 1),
        ctx,
    )
    .unwrap();

    let result = controller
        .run(vec![doc1, doc2.clone(), doc3.clone()], |_, _, _| {})
        .await
        .unwrap();

    assert!(result.halted_early);
    assert_eq!(result.outcomes.len(), 1);
    assert!(matches!(
        result.outcomes[0].status,
        DocumentStatus::Failed { .. }
    ));

    // Later documents were never started
    assert!(!dir.path().join("bravo.en.txt").exists());
    assert!(!dir.path().join("charlie.en.txt").exists());
    assert_eq!(client.calls(), 2, "only the failing document's attempts");
}

#[tokio::test]
async fn test_run_withFatalOnFirstChunk_shouldAbortWholeBatch() {
    let dir = create_temp_dir().unwrap();
    let state = dir.path().join("state");
    let documents = make_documents(dir.path());

    let client = MockClient::fatal_auth();
    let (ctx, _log) = memory_ctx();
    let controller = make_batch_controller(
        Arc::new(client.clone()),
        &state,
        MAX_CHARS,
        7,
        default_batch_options(true, 1),
        ctx,
    )
    .unwrap();

    let result = controller.run(documents, |_, _, _| {}).await;

    assert!(matches!(result, Err(TranslationError::Fatal(_))));
    // One call total: the very first chunk of the very first document
    assert_eq!(client.calls(), 1);

    // No outputs anywhere; later documents are untouched
    assert!(!dir.path().join("alpha.en.txt").exists());
    assert!(!dir.path().join("bravo.en.txt").exists());
    assert!(!dir.path().join("charlie.en.txt").exists());
}

#[tokio::test]
async fn test_run_afterFullSuccess_shouldSkipOnRerunAndRetireManifest() {
    let dir = create_temp_dir().unwrap();
    let state = dir.path().join("state");
    let doc1 = create_test_file(dir.path(), "alpha.txt", &sample_document(2)).unwrap();
    let doc2 = create_test_file(dir.path(), "bravo.txt", &sample_document(2)).unwrap();
    let documents = vec![doc1, doc2];

    {
        let (ctx, _log) = memory_ctx();
        let controller = make_batch_controller(
            Arc::new(MockClient::working()),
            &state,
            MAX_CHARS,
            3,
            default_batch_options(true, 2),
            ctx,
        )
        .unwrap();
        let result = controller.run(documents.clone(), |_, _, _| {}).await.unwrap();
        assert!(result.is_fully_successful());
    }

    // A clean sweep retires the manifest
    let manifest_store = BatchProgressStore::new(&state).unwrap();
    assert!(manifest_store.load().unwrap().is_none());

    // Re-running skips everything without touching the provider
    let second_client = MockClient::working();
    let (ctx, _log) = memory_ctx();
    let controller = make_batch_controller(
        Arc::new(second_client.clone()),
        &state,
        MAX_CHARS,
        3,
        default_batch_options(true, 2),
        ctx,
    )
    .unwrap();
    let result = controller.run(documents, |_, _, _| {}).await.unwrap();

    assert_eq!(result.outcomes.len(), 2);
    assert!(result
        .outcomes
        .iter()
        .all(|o| o.status == DocumentStatus::Skipped));
    assert_eq!(second_client.calls(), 0);
}

#[tokio::test]
async fn test_run_afterPartialFailure_shouldResumeFromManifest() {
    let dir = create_temp_dir().unwrap();
    let state = dir.path().join("state");
    let documents = make_documents(dir.path());

    // First run: the marked document fails, the manifest records all three
    {
        let client = MockClient::working().with_failure_marker(MARKER);
        let (ctx, _log) = memory_ctx();
        let controller = make_batch_controller(
            Arc::new(client),
            &state,
            MAX_CHARS,
            2,
            default_batch_options(true, 1),
            ctx,
        )
        .unwrap();
        let result = controller.run(documents.clone(), |_, _, _| {}).await.unwrap();
        assert_eq!(result.failures().len(), 1);
    }

    let manifest_store = BatchProgressStore::new(&state).unwrap();
    assert_eq!(manifest_store.load().unwrap().unwrap().outcomes.len(), 3);

    // Re-run without force: settled outcomes (success AND failure) are
    // reused, the provider is never called
    {
        let client = MockClient::working();
        let (ctx, _log) = memory_ctx();
        let controller = make_batch_controller(
            Arc::new(client.clone()),
            &state,
            MAX_CHARS,
            3,
            default_batch_options(true, 1),
            ctx,
        )
        .unwrap();
        let result = controller.run(documents.clone(), |_, _, _| {}).await.unwrap();
        assert_eq!(result.outcomes.len(), 3);
        assert_eq!(result.failures().len(), 1);
        assert_eq!(client.calls(), 0);
    }

    // Force rerun: the failed document is retried (resuming its checkpoint)
    // and now succeeds; completed documents are skipped via their outputs
    {
        let client = MockClient::working();
        let (ctx, _log) = memory_ctx();
        let mut options = default_batch_options(true, 1);
        options.force_rerun = true;
        let controller = make_batch_controller(
            Arc::new(client.clone()),
            &state,
            MAX_CHARS,
            3,
            options,
            ctx,
        )
        .unwrap();
        let result = controller.run(documents, |_, _, _| {}).await.unwrap();

        assert!(result.failures().is_empty());
        assert!(dir.path().join("bravo.en.txt").exists());
        assert_eq!(client.calls(), 1, "only the previously failed chunk is sent");
    }
}

#[tokio::test]
async fn test_run_withConcurrentWorkers_shouldSettleEveryDocument() {
    let dir = create_temp_dir().unwrap();
    let state = dir.path().join("state");

    let documents: Vec<PathBuf> = (0..6)
        .map(|i| {
            create_test_file(
                dir.path(),
                &format!("doc{}.txt", i),
                &sample_document(3),
            )
            .unwrap()
        })
        .collect();

    let client = MockClient::working();
    let (ctx, _log) = memory_ctx();
    let controller = make_batch_controller(
        Arc::new(client.clone()),
        &state,
        MAX_CHARS,
        3,
        default_batch_options(true, 3),
        ctx,
    )
    .unwrap();

    let result = controller.run(documents.clone(), |_, _, _| {}).await.unwrap();

    assert_eq!(result.outcomes.len(), 6);
    assert!(result.is_fully_successful());
    assert_eq!(client.calls(), 18, "3 chunks per document, no retries");
    for i in 0..6 {
        assert!(dir.path().join(format!("doc{}.en.txt", i)).exists());
    }
}
