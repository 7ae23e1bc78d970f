/*!
 * Tests for the output validation gate's configurable thresholds.
 *
 * The structural behavior is covered next to the implementation; these
 * tests pin down that the thresholds are policy parameters that actually
 * move the gate.
 */

use booktrans::app_config::ValidationConfig;
use booktrans::translation::{OutputValidator, ValidationIssue};

const SOURCE: &str = "Une phrase source suffisamment longue pour mesurer le ratio de longueur.";

#[test]
fn test_check_withStrictLengthRatio_shouldRejectWhatDefaultsAccept() {
    let translated = "A short but plausible translation.";

    let default_gate = OutputValidator::new(ValidationConfig::default(), "fr", "en");
    assert!(default_gate.check(SOURCE, translated).is_ok());

    let strict = ValidationConfig {
        min_length_ratio: 0.9,
        ..ValidationConfig::default()
    };
    let strict_gate = OutputValidator::new(strict, "fr", "en");
    assert!(matches!(
        strict_gate.check(SOURCE, translated),
        Err(ValidationIssue::TranslationTooShort { .. })
    ));
}

#[test]
fn test_check_withLooseScriptRatio_shouldAcceptMixedOutput() {
    let source = "これは翻訳対象の日本語の文章です。十分な長さを持っています。";
    // Half-translated output: a sizable Japanese fragment remains
    let mixed = "Translated text but 日本語の断片がまだ残っている here.";

    let default_gate = OutputValidator::new(ValidationConfig::default(), "ja", "en");
    let strict_result = default_gate.check(source, mixed);

    let loose = ValidationConfig {
        max_source_script_ratio: 0.5,
        ..ValidationConfig::default()
    };
    let loose_gate = OutputValidator::new(loose, "ja", "en");
    let loose_result = loose_gate.check(source, mixed);

    // The same output flips from rejected to accepted purely on config
    assert!(matches!(
        strict_result,
        Err(ValidationIssue::ResidualSourceScript { .. })
    ));
    assert!(loose_result.is_ok());
}

#[test]
fn test_check_withTightRepetitionLimit_shouldRejectShortRuns() {
    let translated = "The bell rang again and again and again and again tonight.";

    let default_gate = OutputValidator::new(ValidationConfig::default(), "fr", "en");
    assert!(default_gate.check(SOURCE, translated).is_ok());

    let tight = ValidationConfig {
        repetition_limit: 1,
        ..ValidationConfig::default()
    };
    let tight_gate = OutputValidator::new(tight, "fr", "en");
    assert!(matches!(
        tight_gate.check(SOURCE, translated),
        Err(ValidationIssue::ExcessiveRepetition { .. })
    ));
}

#[test]
fn test_check_withLongCharacterRun_shouldReject() {
    let gate = OutputValidator::new(ValidationConfig::default(), "fr", "en");
    let translated = format!("A translation that degenerates {}", "!".repeat(40));
    assert!(matches!(
        gate.check(SOURCE, &translated),
        Err(ValidationIssue::ExcessiveRepetition { .. })
    ));
}

#[test]
fn test_issueDisplay_shouldNameConcreteCause() {
    let issue = ValidationIssue::TranslationTooShort {
        ratio: 0.1,
        min_ratio: 0.3,
        source_len: 100,
        translated_len: 10,
    };
    let message = issue.to_string();
    assert!(message.contains("0.10"));
    assert!(message.contains("100"));
}
