//! Text-level helpers: whitespace normalization, similarity, entity
//! unescaping, and URL-shaped string detection.

use crate::constants::REGEXPS;
use once_cell::sync::Lazy;
use regex::Regex;

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_spaces(text: &str) -> String {
    REGEXPS.normalize.replace_all(text.trim(), " ").to_string()
}

/// Number of whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Number of comma characters, counting the Unicode variants used across
/// scripts (Arabic, CJK, vertical forms).
pub fn comma_count(text: &str) -> usize {
    REGEXPS.commas.find_iter(text).count()
}

/// Compare two texts by token overlap.
///
/// Both inputs are lowercased and split on non-word characters. The result
/// is `1 - distance`, where distance is the combined length of the tokens of
/// `b` missing from `a`, relative to the combined length of all tokens of
/// `b`. Returns 0.0 when either side has no tokens.
pub fn text_similarity(text_a: &str, text_b: &str) -> f64 {
    let a_lower = text_a.to_lowercase();
    let b_lower = text_b.to_lowercase();
    let tokens_a: Vec<&str> = REGEXPS
        .tokenize
        .split(&a_lower)
        .filter(|t| !t.is_empty())
        .collect();
    let tokens_b: Vec<&str> = REGEXPS
        .tokenize
        .split(&b_lower)
        .filter(|t| !t.is_empty())
        .collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let uniq_tokens_b: Vec<&str> = tokens_b
        .iter()
        .filter(|token| !tokens_a.contains(*token))
        .copied()
        .collect();

    let distance_b = uniq_tokens_b.join(" ").len() as f64 / tokens_b.join(" ").len() as f64;
    1.0 - distance_b
}

static NAMED_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(quot|amp|apos|lt|gt);").unwrap());
static NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)&#(?:x([0-9a-f]{1,4})|([0-9]{1,4}));").unwrap());

/// Decode the few named entities metadata strings commonly carry, plus
/// numeric character references. Invalid code points map to U+FFFD.
pub fn unescape_html_entities(text: &str) -> String {
    let named = NAMED_ENTITY.replace_all(text, |caps: &regex::Captures| {
        match &caps[1] {
            "quot" => "\"",
            "amp" => "&",
            "apos" => "'",
            "lt" => "<",
            "gt" => ">",
            _ => unreachable!(),
        }
        .to_string()
    });

    NUMERIC_ENTITY
        .replace_all(&named, |caps: &regex::Captures| {
            let num = caps
                .get(1)
                .and_then(|hex| u32::from_str_radix(hex.as_str(), 16).ok())
                .or_else(|| caps.get(2).and_then(|dec| dec.as_str().parse().ok()))
                .unwrap_or(0);
            let num = if num == 0 || num > 0x0010_FFFF || (0xD800..=0xDFFF).contains(&num) {
                0xFFFD
            } else {
                num
            };
            char::from_u32(num).unwrap_or('\u{FFFD}').to_string()
        })
        .to_string()
}

/// Whether a string parses as an absolute URL with a host.
///
/// Used to reject `article:author` values that point at a profile page
/// instead of naming a person.
pub fn is_url(value: &str) -> bool {
    url::Url::parse(value.trim())
        .map(|u| u.has_host())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_spaces() {
        assert_eq!(normalize_spaces("  a   b \n c  "), "a b c");
    }

    #[test]
    fn test_comma_count_unicode() {
        assert_eq!(comma_count("a, b\u{FF0C} c\u{060C} d"), 3);
        assert_eq!(comma_count("no commas here"), 0);
    }

    #[test]
    fn test_text_similarity_identical() {
        assert!((text_similarity("Hello World", "hello world") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_text_similarity_disjoint() {
        assert!(text_similarity("alpha beta", "gamma delta") < 0.01);
    }

    #[test]
    fn test_text_similarity_partial() {
        let sim = text_similarity("The Quick Brown Fox", "quick brown fox jumps");
        assert!(sim > 0.5 && sim < 1.0);
    }

    #[test]
    fn test_unescape_named_entities() {
        assert_eq!(
            unescape_html_entities("Tom &amp; Jerry &quot;forever&quot;"),
            "Tom & Jerry \"forever\""
        );
    }

    #[test]
    fn test_unescape_numeric_entities() {
        assert_eq!(unescape_html_entities("caf&#233;"), "café");
        assert_eq!(unescape_html_entities("&#x41;BC"), "ABC");
    }

    #[test]
    fn test_unescape_invalid_codepoint() {
        assert_eq!(unescape_html_entities("&#0;"), "\u{FFFD}");
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/author/jane"));
        assert!(!is_url("Jane Doe"));
        assert!(!is_url("mailto-ish text"));
    }
}
