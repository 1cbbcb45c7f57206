use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for prompt rendering
///
/// Language tags in the configuration may be ISO 639-1 / 639-2 codes ("ja", "jpn")
/// or plain names ("Japanese"). Providers get better results with names, so codes
/// are expanded before they reach a prompt.

/// ISO 639-2/B codes that differ from their 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Resolve an ISO 639 code to a language, if it is one
pub fn lookup_code(code: &str) -> Option<Language> {
    let normalized = code.trim().to_lowercase();
    match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => {
            let part2t = BIBLIOGRAPHIC_CODES
                .iter()
                .find(|(b, _)| *b == normalized)
                .map(|(_, t)| t.to_string())
                .unwrap_or(normalized);
            Language::from_639_3(&part2t)
        }
        _ => None,
    }
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    lookup_code(code)
        .map(|lang| lang.to_name().to_string())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Name to show a provider: codes become names, anything else is kept verbatim
pub fn display_name(tag: &str) -> String {
    let trimmed = tag.trim();
    lookup_code(trimmed)
        .map(|lang| lang.to_name().to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Short code for file names: ISO 639-1 when one exists, else 639-3
///
/// Tags that are neither a code nor an English language name are lowercased
/// with whitespace replaced by '-'.
pub fn file_code(tag: &str) -> String {
    let trimmed = tag.trim();
    let language = lookup_code(trimmed).or_else(|| Language::from_name(trimmed));
    match language {
        Some(lang) => lang
            .to_639_1()
            .unwrap_or_else(|| lang.to_639_3())
            .to_string(),
        None => trimmed
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
            .to_lowercase(),
    }
}

/// Check if two tags refer to the same language
pub fn same_language(tag1: &str, tag2: &str) -> bool {
    display_name(tag1).eq_ignore_ascii_case(&display_name(tag2))
}
