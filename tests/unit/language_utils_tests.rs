/*!
 * Tests for language utility functions
 */

use notewai::language_utils::{display_name, file_code, get_language_name, lookup_code, same_language};

#[test]
fn test_lookupCode_withPart1AndPart2Codes_shouldResolve() {
    assert!(lookup_code("ja").is_some());
    assert!(lookup_code("jpn").is_some());
    assert!(lookup_code("fre").is_some());
    assert!(lookup_code("Japanese").is_none());
    assert!(lookup_code("").is_none());
}

#[test]
fn test_getLanguageName_withValidCodes_shouldReturnEnglishNames() {
    assert_eq!(get_language_name("en").unwrap(), "English");
    assert_eq!(get_language_name("deu").unwrap(), "German");
    assert_eq!(get_language_name("ger").unwrap(), "German");
    assert!(get_language_name("zz").is_err());
}

#[test]
fn test_displayName_withMixedTags_shouldOnlyExpandCodes() {
    assert_eq!(display_name("ko"), "Korean");
    assert_eq!(display_name("Traditional Chinese"), "Traditional Chinese");
}

#[test]
fn test_fileCode_withNamesAndCodes_shouldBeShort() {
    assert_eq!(file_code("Japanese"), "ja");
    assert_eq!(file_code("fra"), "fr");
}

#[test]
fn test_sameLanguage_withEquivalentTags_shouldMatch() {
    assert!(same_language("ja", "jpn"));
    assert!(same_language("Japanese", "ja"));
    assert!(!same_language("Japanese", "Korean"));
}
