/*!
 * Tests for language utility functions
 */

use txtsum::language_utils::{get_language_name, is_english, language_display_name, normalize_language_tag};

#[test]
fn test_get_language_name_withIsoCodes_shouldReturnEnglishName() {
    assert_eq!(get_language_name("en").unwrap(), "English");
    assert_eq!(get_language_name("fr").unwrap(), "French");
    assert_eq!(get_language_name("deu").unwrap(), "German");
    assert_eq!(get_language_name(" ES ").unwrap(), "Spanish");
}

#[test]
fn test_get_language_name_withRegionalChinese_shouldNameScript() {
    assert_eq!(get_language_name("zh-TW").unwrap(), "Traditional Chinese");
    assert_eq!(get_language_name("zh_cn").unwrap(), "Simplified Chinese");
    assert_eq!(get_language_name("zh").unwrap(), "Chinese");
}

#[test]
fn test_get_language_name_withRegionSubtag_shouldUsePrimary() {
    assert_eq!(get_language_name("pt-BR").unwrap(), "Portuguese");
}

#[test]
fn test_get_language_name_withInvalidCode_shouldFail() {
    assert!(get_language_name("xx").is_err());
    assert!(get_language_name("").is_err());
    assert!(get_language_name("english").is_err());
}

#[test]
fn test_language_display_name_withUnknownCode_shouldKeepInput() {
    assert_eq!(language_display_name("ja"), "Japanese");
    assert_eq!(language_display_name(" Klingon "), "Klingon");
}

#[test]
fn test_is_english_shouldAcceptCodesAndVariants() {
    assert!(is_english("en"));
    assert!(is_english("EN-us"));
    assert!(is_english("eng"));
    assert!(!is_english("fr"));
    assert!(!is_english("zh-tw"));
}

#[test]
fn test_normalize_language_tag_shouldLowercaseAndUseHyphen() {
    assert_eq!(normalize_language_tag(" pt_BR "), "pt-br");
}
