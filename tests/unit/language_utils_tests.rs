/*!
 * Tests for language code handling and script classification.
 */

use booktrans::language_utils::{
    get_language_name, language_codes_match, residual_scripts, script_ratio, Script,
};

#[test]
fn test_getLanguageName_withValidCodes_shouldReturnNames() {
    assert_eq!(get_language_name("en").unwrap(), "English");
    assert_eq!(get_language_name("ja").unwrap(), "Japanese");
    assert_eq!(get_language_name("fra").unwrap(), "French");
}

#[test]
fn test_getLanguageName_withInvalidCode_shouldFail() {
    assert!(get_language_name("xx").is_err());
    assert!(get_language_name("").is_err());
    assert!(get_language_name("english").is_err());
}

#[test]
fn test_languageCodesMatch_shouldBridgeTwoAndThreeLetterCodes() {
    assert!(language_codes_match("en", "eng"));
    assert!(language_codes_match("ja", "jpn"));
    assert!(language_codes_match("de", "deu"));
    assert!(!language_codes_match("en", "fr"));
    assert!(!language_codes_match("en", "zz"));
}

#[test]
fn test_scriptRatio_withPureEnglish_shouldBeZeroForJapaneseScripts() {
    let text = "A perfectly ordinary English sentence with no foreign letters.";
    let scripts = [Script::Hiragana, Script::Katakana, Script::Han];
    assert_eq!(script_ratio(text, &scripts), 0.0);
}

#[test]
fn test_scriptRatio_withPureJapanese_shouldBeNearOne() {
    let text = "これは完全に日本語だけで書かれた文章です。";
    let scripts = [Script::Hiragana, Script::Katakana, Script::Han];
    assert!(script_ratio(text, &scripts) > 0.95);
}

#[test]
fn test_scriptRatio_withNoLetters_shouldBeZero() {
    assert_eq!(script_ratio("1234 ... !!!", &[Script::Latin]), 0.0);
}

#[test]
fn test_residualScripts_withCyrillicToEnglish_shouldBeCyrillic() {
    assert_eq!(residual_scripts("ru", "en"), vec![Script::Cyrillic]);
}

#[test]
fn test_residualScripts_shouldAcceptThreeLetterCodes() {
    assert_eq!(residual_scripts("jpn", "en").len(), 3);
}
