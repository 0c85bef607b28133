/*!
 * ISO 639 language code handling.
 *
 * Accepts ISO 639-1 (`ko`), ISO 639-2/T (`kor`) and the ISO 639-2/B variants
 * (`fre`, `ger`, ...). The special source code `auto` asks the provider to
 * detect the language.
 */

use anyhow::{Result, anyhow};
use isolang::Language;

use crate::errors::ConfigurationError;

/// Source language value meaning "let the provider detect it"
pub const AUTO_DETECT: &str = "auto";

/// ISO 639-2/B codes that differ from their 639-2/T form
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("dut", "nld"),
    ("fre", "fra"),
    ("geo", "kat"),
    ("ger", "deu"),
    ("gre", "ell"),
    ("ice", "isl"),
    ("mac", "mkd"),
    ("may", "msa"),
    ("per", "fas"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

pub fn is_auto_detect(code: &str) -> bool {
    code.trim().eq_ignore_ascii_case(AUTO_DETECT)
}

fn terminology_code(code: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES.iter().find(|(b, _)| *b == code).map(|(_, t)| *t)
}

fn lookup(code: &str) -> Option<(Language, LanguageCodeType)> {
    let code = code.trim().to_lowercase();
    match code.len() {
        2 => Language::from_639_1(&code).map(|l| (l, LanguageCodeType::Part1)),
        3 => Language::from_639_3(&code)
            .map(|l| (l, LanguageCodeType::Part2T))
            .or_else(|| terminology_code(&code).and_then(Language::from_639_3).map(|l| (l, LanguageCodeType::Part2B))),
        _ => None,
    }
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    lookup(code)
        .map(|(_, kind)| kind)
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    lookup(code)
        .map(|(lang, _)| lang.to_639_3().to_string())
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Normalize to ISO 639-1 when the language has a 2-letter code, otherwise ISO 639-2/T
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let (lang, _) = lookup(code).ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;
    Ok(lang
        .to_639_1()
        .map(|c| c.to_string())
        .unwrap_or_else(|| lang.to_639_3().to_string()))
}

/// Check if two language codes represent the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// English name of a language, e.g. `Korean` for `ko`
pub fn get_language_name(code: &str) -> Result<String> {
    let (lang, _) = lookup(code).ok_or_else(|| anyhow!("Failed to get language from code: {}", code))?;
    Ok(lang.to_name().to_string())
}

/// Name used in prompts and progress output; `auto` stays as a hint
pub fn display_name(code: &str) -> String {
    if is_auto_detect(code) {
        return "the detected source language".to_string();
    }
    get_language_name(code).unwrap_or_else(|_| code.to_string())
}

/// Validate the language pair of a batch before any job starts
pub fn check_language_pair(source_language: &str, target_language: &str) -> Result<(), ConfigurationError> {
    if is_auto_detect(target_language) || validate_language_code(target_language).is_err() {
        return Err(ConfigurationError::InvalidLanguage(target_language.to_string()));
    }

    if is_auto_detect(source_language) {
        return Ok(());
    }

    if validate_language_code(source_language).is_err() {
        return Err(ConfigurationError::InvalidLanguage(source_language.to_string()));
    }

    if language_codes_match(source_language, target_language) {
        return Err(ConfigurationError::UnsupportedLanguagePair {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validateLanguageCode_shouldClassifyCodes() {
        assert_eq!(validate_language_code("ko").unwrap(), LanguageCodeType::Part1);
        assert_eq!(validate_language_code("kor").unwrap(), LanguageCodeType::Part2T);
        assert_eq!(validate_language_code("fre").unwrap(), LanguageCodeType::Part2B);
        assert!(validate_language_code("xx").is_err());
        assert!(validate_language_code("english").is_err());
    }

    #[test]
    fn test_normalize_shouldMapBibliographicCodes() {
        assert_eq!(normalize_to_part2t("ger").unwrap(), "deu");
        assert_eq!(normalize_to_part1_or_part2t("ger").unwrap(), "de");
        assert_eq!(normalize_to_part1_or_part2t("KOR").unwrap(), "ko");
    }

    #[test]
    fn test_languageCodesMatch_shouldCompareAcrossFormats() {
        assert!(language_codes_match("fr", "fre"));
        assert!(language_codes_match("en", "eng"));
        assert!(!language_codes_match("en", "ko"));
        assert!(!language_codes_match("en", "??"));
    }

    #[test]
    fn test_getLanguageName_shouldReturnEnglishName() {
        assert_eq!(get_language_name("ko").unwrap(), "Korean");
        assert_eq!(display_name("auto"), "the detected source language");
    }

    #[test]
    fn test_checkLanguagePair_shouldRejectSameLanguage() {
        assert!(check_language_pair("ko", "en").is_ok());
        assert!(check_language_pair("auto", "en").is_ok());
        assert!(matches!(
            check_language_pair("en", "eng"),
            Err(ConfigurationError::UnsupportedLanguagePair { .. })
        ));
        assert!(matches!(
            check_language_pair("en", "auto"),
            Err(ConfigurationError::InvalidLanguage(_))
        ));
        assert!(matches!(
            check_language_pair("zz", "en"),
            Err(ConfigurationError::InvalidLanguage(_))
        ));
    }
}
