use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling and script detection
///
/// This module provides functions for validating ISO 639-1 (2-letter) and
/// ISO 639-3 (3-letter) language codes, and for classifying text by Unicode
/// script. Script classification backs the residual-source-language check in
/// the output validation gate: after translating e.g. Japanese to English,
/// the share of characters still in Japanese scripts should be small.

/// Unicode script families relevant to translation validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Latin,
    Cyrillic,
    Greek,
    Arabic,
    Hebrew,
    Devanagari,
    Han,
    Hiragana,
    Katakana,
    Hangul,
    Thai,
}

/// Validate a language code and return its English display name
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = code.trim().to_lowercase();

    let language = if normalized.len() == 2 {
        Language::from_639_1(&normalized)
    } else if normalized.len() == 3 {
        Language::from_639_3(&normalized)
    } else {
        None
    };

    language
        .map(|l| l.to_name().to_string())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Check whether two language codes refer to the same language,
/// regardless of whether they are 2-letter or 3-letter codes
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    let lookup = |code: &str| {
        let normalized = code.trim().to_lowercase();
        if normalized.len() == 2 {
            Language::from_639_1(&normalized)
        } else {
            Language::from_639_3(&normalized)
        }
    };

    match (lookup(code1), lookup(code2)) {
        (Some(l1), Some(l2)) => l1 == l2,
        _ => false,
    }
}

/// Classify a character by Unicode script
///
/// Only letters are classified; digits, punctuation and whitespace return
/// None so they never count toward script ratios.
pub fn script_of_char(c: char) -> Option<Script> {
    match c as u32 {
        0x0041..=0x005A | 0x0061..=0x007A | 0x00C0..=0x024F | 0x1E00..=0x1EFF => Some(Script::Latin),
        0x0400..=0x04FF | 0x0500..=0x052F => Some(Script::Cyrillic),
        0x0370..=0x03FF | 0x1F00..=0x1FFF => Some(Script::Greek),
        0x0600..=0x06FF | 0x0750..=0x077F => Some(Script::Arabic),
        0x0590..=0x05FF => Some(Script::Hebrew),
        0x0900..=0x097F => Some(Script::Devanagari),
        0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF => Some(Script::Han),
        0x3040..=0x309F => Some(Script::Hiragana),
        0x30A0..=0x30FF | 0x31F0..=0x31FF => Some(Script::Katakana),
        0x1100..=0x11FF | 0xAC00..=0xD7AF => Some(Script::Hangul),
        0x0E00..=0x0E7F => Some(Script::Thai),
        _ => None,
    }
}

/// Scripts a language is written in
///
/// Japanese legitimately mixes three scripts; everything not listed here is
/// assumed Latin, which is the safe default for the residual-script check
/// (a Latin-to-Latin pair disables it entirely).
pub fn scripts_for_language(code: &str) -> &'static [Script] {
    let normalized = code.trim().to_lowercase();
    match normalized.as_str() {
        "ja" | "jpn" => &[Script::Hiragana, Script::Katakana, Script::Han],
        "zh" | "zho" | "chi" => &[Script::Han],
        "ko" | "kor" => &[Script::Hangul, Script::Han],
        "ru" | "rus" | "uk" | "ukr" | "bg" | "bul" | "sr" | "srp" | "mk" | "mkd" => &[Script::Cyrillic],
        "el" | "ell" | "gre" => &[Script::Greek],
        "ar" | "ara" | "fa" | "fas" | "per" | "ur" | "urd" => &[Script::Arabic],
        "he" | "heb" | "yi" | "yid" => &[Script::Hebrew],
        "hi" | "hin" | "mr" | "mar" | "ne" | "nep" => &[Script::Devanagari],
        "th" | "tha" => &[Script::Thai],
        _ => &[Script::Latin],
    }
}

/// Fraction of letters in `text` belonging to any of the given scripts.
///
/// Returns 0.0 for text with no letters at all, so punctuation-only output
/// is judged by the other gate checks instead.
pub fn script_ratio(text: &str, scripts: &[Script]) -> f64 {
    let mut letters = 0usize;
    let mut matching = 0usize;

    for c in text.chars() {
        if let Some(script) = script_of_char(c) {
            letters += 1;
            if scripts.contains(&script) {
                matching += 1;
            }
        }
    }

    if letters == 0 {
        0.0
    } else {
        matching as f64 / letters as f64
    }
}

/// The scripts that identify leftover source text in a translation:
/// the source language's scripts minus any the target language shares.
///
/// An empty result means the pair is script-indistinguishable (e.g. French
/// to English) and the residual check cannot apply.
pub fn residual_scripts(source_language: &str, target_language: &str) -> Vec<Script> {
    let source = scripts_for_language(source_language);
    let target = scripts_for_language(target_language);

    source
        .iter()
        .filter(|s| !target.contains(s))
        .copied()
        .collect()
}
