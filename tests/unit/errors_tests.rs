/*!
 * Tests for error classification: the retry/abort decision hangs entirely
 * on `ProviderError::is_retryable`.
 */

use std::time::Duration;

use booktrans::errors::{AppError, ProviderError, TranslationError};

#[test]
fn test_isRetryable_withTransientFailures_shouldBeTrue() {
    let retryable = [
        ProviderError::RateLimited {
            message: "slow down".to_string(),
            retry_after: None,
        },
        ProviderError::Timeout("deadline".to_string()),
        ProviderError::Connection("refused".to_string()),
        ProviderError::ServerError {
            status_code: 503,
            message: "unavailable".to_string(),
        },
    ];
    for error in retryable {
        assert!(error.is_retryable(), "{} must be retryable", error);
    }
}

#[test]
fn test_isRetryable_withSystemicFailures_shouldBeFalse() {
    let fatal = [
        ProviderError::AuthFailed("bad key".to_string()),
        ProviderError::InvalidRequest("malformed".to_string()),
        ProviderError::Parse("unexpected body".to_string()),
    ];
    for error in fatal {
        assert!(!error.is_retryable(), "{} must be fatal", error);
    }
}

#[test]
fn test_retryHint_shouldSurfaceOnlyFromRateLimits() {
    let limited = ProviderError::RateLimited {
        message: "slow down".to_string(),
        retry_after: Some(Duration::from_secs(30)),
    };
    assert_eq!(limited.retry_hint(), Some(Duration::from_secs(30)));

    let timeout = ProviderError::Timeout("deadline".to_string());
    assert_eq!(timeout.retry_hint(), None);
}

#[test]
fn test_exhaustedRetries_shouldNameChunkAndCause() {
    let error = TranslationError::ExhaustedRetries {
        chunk_index: 4,
        attempts: 7,
        last_error: "Server error (503): unavailable".to_string(),
    };
    let message = error.to_string();
    assert!(message.contains("Chunk 4"));
    assert!(message.contains("7 attempts"));
    assert!(message.contains("503"));
}

#[test]
fn test_appError_shouldWrapLowerLayers() {
    let provider = ProviderError::AuthFailed("bad key".to_string());
    let app: AppError = provider.into();
    assert!(app.to_string().contains("bad key"));

    let translation = TranslationError::Fatal(ProviderError::InvalidRequest("oops".to_string()));
    let app: AppError = translation.into();
    assert!(app.to_string().contains("oops"));
}
