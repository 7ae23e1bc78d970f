/*!
 * Tests for configuration loading, defaults, validation and accessors.
 */

use std::str::FromStr;

use booktrans::app_config::{
    Config, PipelineConfig, SplitMode, TranslationProvider,
};

#[test]
fn test_defaultConfig_shouldValidate() {
    let config = Config::default();
    assert!(config.validate().is_ok());
}

#[test]
fn test_defaultConfig_shouldCarryAllProviders() {
    let config = Config::default();
    assert_eq!(config.translation.available_providers.len(), 4);
    for provider in [
        TranslationProvider::Ollama,
        TranslationProvider::OpenAI,
        TranslationProvider::Anthropic,
        TranslationProvider::LMStudio,
    ] {
        assert!(config.translation.get_provider_config(&provider).is_some());
    }
}

#[test]
fn test_validate_withInvalidLanguage_shouldFail() {
    let mut config = Config::default();
    config.source_language = "xx".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withMissingApiKey_shouldFailForCloudProviders() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Anthropic;
    assert!(config.validate().is_err());

    // Supplying a key makes it valid again
    for provider in config.translation.available_providers.iter_mut() {
        if provider.provider_type == "anthropic" {
            provider.api_key = "test-key".to_string();
        }
    }
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withZeroChunkSize_shouldFail() {
    let mut config = Config::default();
    for provider in config.translation.available_providers.iter_mut() {
        if provider.provider_type == "ollama" {
            provider.max_chars_per_request = 0;
        }
    }
    let error = config.validate().unwrap_err().to_string();
    assert!(error.contains("max_chars_per_request"));
}

#[test]
fn test_validate_withZeroRetryCount_shouldFail() {
    let mut config = Config::default();
    config.translation.common.retry_count = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_retryDefaults_shouldMatchPolicy() {
    let config = Config::default();
    assert_eq!(config.translation.common.retry_count, 7);
    assert_eq!(config.translation.common.retry_backoff_ms, 1000);
    assert!(config.translation.common.retry_backoff_max_ms >= config.translation.common.retry_backoff_ms);
}

#[test]
fn test_serdeRoundtrip_shouldPreserveConfig() {
    let config = Config::default();
    let json = serde_json::to_string_pretty(&config).unwrap();
    let parsed: Config = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.source_language, config.source_language);
    assert_eq!(parsed.translation.provider, config.translation.provider);
    assert_eq!(
        parsed.translation.get_max_chars_per_request(),
        config.translation.get_max_chars_per_request()
    );
    assert_eq!(parsed.pipeline.split_mode, config.pipeline.split_mode);
}

#[test]
fn test_minimalJson_shouldFillDefaults() {
    let json = r#"{
        "source_language": "ja",
        "target_language": "en",
        "translation": {}
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert_eq!(config.translation.common.retry_count, 7);
    assert_eq!(config.pipeline.split_mode, SplitMode::Paragraphs);
    assert!(config.pipeline.continue_on_error);
    assert!(!config.pipeline.double_pass);
    assert!((config.validation.min_length_ratio - 0.3).abs() < 1e-9);
}

#[test]
fn test_providerFromStr_shouldParseKnownNames() {
    assert_eq!(
        TranslationProvider::from_str("anthropic").unwrap(),
        TranslationProvider::Anthropic
    );
    assert_eq!(
        TranslationProvider::from_str("OpenAI").unwrap(),
        TranslationProvider::OpenAI
    );
    assert!(TranslationProvider::from_str("nonexistent").is_err());
}

#[test]
fn test_providerDisplay_shouldRoundtripLowercase() {
    for provider in [
        TranslationProvider::Ollama,
        TranslationProvider::OpenAI,
        TranslationProvider::Anthropic,
        TranslationProvider::LMStudio,
    ] {
        let parsed = TranslationProvider::from_str(&provider.to_string()).unwrap();
        assert_eq!(parsed, provider);
    }
}

#[test]
fn test_effectiveWorkers_withExplicitValue_shouldHonorIt() {
    let pipeline = PipelineConfig {
        workers: 3,
        ..PipelineConfig::default()
    };
    assert_eq!(pipeline.effective_workers(), 3);
}

#[test]
fn test_effectiveWorkers_withAuto_shouldStaySmallAndPositive() {
    let pipeline = PipelineConfig::default();
    let workers = pipeline.effective_workers();
    assert!(workers >= 1);
    assert!(workers <= 4);
}

#[test]
fn test_getModel_withEmptyProviderModel_shouldFallBackToDefault() {
    let mut config = Config::default();
    for provider in config.translation.available_providers.iter_mut() {
        provider.model = String::new();
    }
    assert!(!config.translation.get_model().is_empty());
}
