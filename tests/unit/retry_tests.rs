/*!
 * Tests for the retry orchestrator: attempt budgets, failure
 * classification, validation gating and attempt records.
 */

use std::sync::Arc;

use booktrans::app_config::ValidationConfig;
use booktrans::document_processor::Chunk;
use booktrans::errors::TranslationError;
use booktrans::providers::mock::MockClient;
use booktrans::translation::{AttemptOutcome, ChunkOutcome, OutputValidator, RetryOrchestrator};

use crate::common::{fast_policy, latin_validator, make_orchestrator, memory_ctx, test_settings};

fn chunk(text: &str) -> Chunk {
    Chunk::pending(0, text.to_string(), false)
}

const SOURCE: &str = "Une phrase source suffisamment longue pour être validée proprement.";

#[tokio::test]
async fn test_translateChunk_withWorkingClient_shouldSucceedFirstAttempt() {
    let client = MockClient::working();
    let (ctx, log) = memory_ctx();
    let orchestrator = make_orchestrator(Arc::new(client.clone()), 7, ctx);

    let outcome = orchestrator.translate_chunk("doc", &chunk(SOURCE)).await.unwrap();

    match outcome {
        ChunkOutcome::Done { text, attempts } => {
            assert!(text.contains("[translated]"));
            assert_eq!(attempts, 1);
        }
        other => panic!("expected Done, got {:?}", other),
    }
    assert_eq!(client.calls(), 1);

    let records = log.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, AttemptOutcome::Success);
    assert!(records[0].prompt_tokens.is_some());
}

#[tokio::test]
async fn test_translateChunk_withAlwaysRetryableClient_shouldExhaustExactBudget() {
    let client = MockClient::always_retryable();
    let (ctx, log) = memory_ctx();
    let orchestrator = make_orchestrator(Arc::new(client.clone()), 7, ctx);

    let outcome = orchestrator.translate_chunk("doc", &chunk(SOURCE)).await.unwrap();

    match outcome {
        ChunkOutcome::Failed { error, attempts } => {
            assert_eq!(attempts, 7, "budget must be consumed exactly");
            assert!(error.contains("Simulated server failure"));
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(client.calls(), 7);

    let records = log.records();
    assert_eq!(records.len(), 7);
    assert!(records
        .iter()
        .all(|r| matches!(r.outcome, AttemptOutcome::RetryableFailure(_))));
    // Attempt numbers are dense from 1
    let numbers: Vec<u32> = records.iter().map(|r| r.attempt).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6, 7]);
}

#[tokio::test]
async fn test_translateChunk_withFatalClient_shouldAbortWithoutConsumingBudget() {
    let client = MockClient::fatal_auth();
    let (ctx, log) = memory_ctx();
    let orchestrator = make_orchestrator(Arc::new(client.clone()), 7, ctx);

    let result = orchestrator.translate_chunk("doc", &chunk(SOURCE)).await;

    match result {
        Err(TranslationError::Fatal(provider_error)) => {
            assert!(!provider_error.is_retryable());
        }
        other => panic!("expected Fatal, got {:?}", other),
    }
    // Exactly one call: fatal errors never retry
    assert_eq!(client.calls(), 1);
    assert_eq!(log.len(), 1);
    assert!(matches!(
        log.records()[0].outcome,
        AttemptOutcome::FatalFailure(_)
    ));
}

#[tokio::test]
async fn test_translateChunk_withRecoveringClient_shouldSucceedWithinBudget() {
    let client = MockClient::succeed_after(3);
    let (ctx, log) = memory_ctx();
    let orchestrator = make_orchestrator(Arc::new(client.clone()), 7, ctx);

    let outcome = orchestrator.translate_chunk("doc", &chunk(SOURCE)).await.unwrap();

    match outcome {
        ChunkOutcome::Done { attempts, .. } => assert_eq!(attempts, 4),
        other => panic!("expected Done, got {:?}", other),
    }
    assert_eq!(client.calls(), 4);
    assert_eq!(log.len(), 4);
    assert_eq!(log.records()[3].outcome, AttemptOutcome::Success);
}

#[tokio::test]
async fn test_translateChunk_withResidualSourceScript_shouldRejectAndFail() {
    // The client echoes Japanese back instead of translating it
    let client = MockClient::source_echo();
    let (ctx, log) = memory_ctx();
    let validator = OutputValidator::new(ValidationConfig::default(), "ja", "en");
    let orchestrator = RetryOrchestrator::new(
        Arc::new(client.clone()),
        validator,
        fast_policy(3),
        test_settings(),
        ctx,
    );

    let source = "これは翻訳されるべき日本語の文章です。内容は十分に長いものです。";
    let outcome = orchestrator.translate_chunk("doc", &chunk(source)).await.unwrap();

    match outcome {
        ChunkOutcome::Failed { error, attempts } => {
            assert_eq!(attempts, 3);
            assert!(error.contains("source script"), "error was: {}", error);
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    // Never silently Done: every response was rejected by the gate
    assert_eq!(client.calls(), 3);
    assert!(log
        .records()
        .iter()
        .all(|r| matches!(r.outcome, AttemptOutcome::ValidationRejected(_))));
}

#[tokio::test]
async fn test_translateChunk_withTruncatedOutput_shouldRejectAsTooShort() {
    let client = MockClient::truncated();
    let (ctx, _log) = memory_ctx();
    let orchestrator = make_orchestrator(Arc::new(client), 2, ctx);

    let outcome = orchestrator.translate_chunk("doc", &chunk(SOURCE)).await.unwrap();

    match outcome {
        ChunkOutcome::Failed { error, .. } => {
            assert!(error.contains("too short"), "error was: {}", error);
        }
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_translateChunk_withRepetitiveOutput_shouldReject() {
    let client = MockClient::repetitive();
    let (ctx, _log) = memory_ctx();
    let orchestrator = make_orchestrator(Arc::new(client), 2, ctx);

    let outcome = orchestrator.translate_chunk("doc", &chunk(SOURCE)).await.unwrap();

    assert!(matches!(outcome, ChunkOutcome::Failed { .. }));
}

#[test]
fn test_translateChunk_withBlankChunk_shouldPassThroughWithoutApiCall() {
    let client = MockClient::working();
    let (ctx, log) = memory_ctx();
    let orchestrator = make_orchestrator(Arc::new(client.clone()), 7, ctx);

    let blank = Chunk::pending(0, "  \n\n".to_string(), false);
    let outcome = tokio_test::block_on(orchestrator.translate_chunk("doc", &blank)).unwrap();

    match outcome {
        ChunkOutcome::Done { text, attempts } => {
            assert_eq!(text, "  \n\n");
            assert_eq!(attempts, 0);
        }
        other => panic!("expected Done, got {:?}", other),
    }
    assert_eq!(client.calls(), 0, "blank chunks must not hit the provider");
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_translateChunk_withShutdownMidRetry_shouldAbandonNotFail() {
    let client = MockClient::always_retryable();
    let (ctx, log) = memory_ctx();
    // Shutdown already requested: the current attempt still runs, further
    // retries are abandoned without marking the chunk failed
    ctx.shutdown.request();
    let orchestrator = make_orchestrator(Arc::new(client.clone()), 7, ctx);

    let outcome = orchestrator.translate_chunk("doc", &chunk(SOURCE)).await.unwrap();

    assert_eq!(outcome, ChunkOutcome::Abandoned);
    assert_eq!(client.calls(), 1);
    assert_eq!(log.len(), 1);
}

#[tokio::test]
async fn test_translateChunk_withValidationFailures_shouldShareAttemptBudget() {
    // Rejections and transport errors draw from the same budget
    let client = MockClient::truncated();
    let (ctx, log) = memory_ctx();
    let orchestrator = RetryOrchestrator::new(
        Arc::new(client.clone()),
        latin_validator(),
        fast_policy(5),
        test_settings(),
        ctx,
    );

    let outcome = orchestrator.translate_chunk("doc", &chunk(SOURCE)).await.unwrap();

    assert!(matches!(outcome, ChunkOutcome::Failed { attempts: 5, .. }));
    assert_eq!(client.calls(), 5);
    assert_eq!(log.len(), 5);
}
