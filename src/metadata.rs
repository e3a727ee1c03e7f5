//! Metadata extraction from HTML documents (JSON-LD, meta tags, title
//! heuristics).
//!
//! Runs over the raw parse, before any mutating pipeline stage, so
//! `<script type="application/ld+json">` payloads are still present.

use crate::constants::REGEXPS;
use crate::text;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::HashMap;

/// Metadata extracted from the document
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub excerpt: Option<String>,
    pub site_name: Option<String>,
    pub published_time: Option<String>,
    pub lang: Option<String>,
}

static JSON_LD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static META_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("meta").unwrap());
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static H1_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, h2").unwrap());
static HTML_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("html").unwrap());

fn is_article_type(value: &Value) -> bool {
    value
        .get("@type")
        .and_then(|t| t.as_str())
        .map(|t| REGEXPS.json_ld_article_types.is_match(t))
        .unwrap_or(false)
}

/// Extract structured article metadata from JSON-LD script blocks.
///
/// Only Schema.org article types are considered; anything that fails to
/// parse or validate is skipped silently and the scan moves to the next
/// script element.
pub fn get_json_ld(document: &Html) -> Metadata {
    let mut metadata = Metadata::default();

    for script in document.select(&JSON_LD_SELECTOR) {
        let raw = script.text().collect::<String>();
        let content = raw
            .trim()
            .trim_start_matches("<![CDATA[")
            .trim_end_matches("]]>")
            .trim();

        let Ok(mut parsed) = serde_json::from_str::<Value>(content) else {
            continue;
        };

        if parsed.is_array() {
            let article = parsed
                .as_array()
                .and_then(|arr| arr.iter().find(|item| is_article_type(item)).cloned());
            match article {
                Some(article) => parsed = article,
                None => continue,
            }
        }

        let has_schema_context = match parsed.get("@context") {
            Some(Value::String(ctx)) => REGEXPS.schema_dot_org.is_match(ctx),
            Some(Value::Object(ctx)) => ctx
                .get("@vocab")
                .and_then(|v| v.as_str())
                .map(|v| REGEXPS.schema_dot_org.is_match(v))
                .unwrap_or(false),
            _ => false,
        };
        if !has_schema_context {
            continue;
        }

        if parsed.get("@type").is_none() {
            let article = parsed
                .get("@graph")
                .and_then(|g| g.as_array())
                .and_then(|graph| graph.iter().find(|item| is_article_type(item)).cloned());
            if let Some(article) = article {
                parsed = article;
            }
        }

        if !is_article_type(&parsed) {
            continue;
        }

        let name = parsed.get("name").and_then(|v| v.as_str());
        let headline = parsed.get("headline").and_then(|v| v.as_str());

        if metadata.title.is_none() {
            metadata.title = match (name, headline) {
                (Some(name), Some(headline)) if name != headline => {
                    // Both present and different: pick whichever resembles
                    // the document title.
                    let doc_title = get_article_title(document).unwrap_or_default();
                    let name_matches = text::text_similarity(name, &doc_title) > 0.75;
                    let headline_matches = text::text_similarity(headline, &doc_title) > 0.75;
                    if headline_matches && !name_matches {
                        Some(headline.trim().to_string())
                    } else {
                        Some(name.trim().to_string())
                    }
                }
                (Some(name), _) => Some(name.trim().to_string()),
                (None, Some(headline)) => Some(headline.trim().to_string()),
                (None, None) => None,
            };
        }

        if metadata.byline.is_none() {
            if let Some(author) = parsed.get("author") {
                if let Some(author_name) = author.get("name").and_then(|v| v.as_str()) {
                    metadata.byline = Some(author_name.trim().to_string());
                } else if let Some(authors) = author.as_array() {
                    let names: Vec<String> = authors
                        .iter()
                        .filter_map(|a| a.get("name").and_then(|n| n.as_str()))
                        .map(|n| n.trim().to_string())
                        .collect();
                    if !names.is_empty() {
                        metadata.byline = Some(names.join(", "));
                    }
                }
            }
        }

        if metadata.excerpt.is_none() {
            if let Some(description) = parsed.get("description").and_then(|v| v.as_str()) {
                metadata.excerpt = Some(description.trim().to_string());
            }
        }

        if metadata.site_name.is_none() {
            if let Some(pub_name) = parsed
                .get("publisher")
                .and_then(|p| p.get("name"))
                .and_then(|v| v.as_str())
            {
                metadata.site_name = Some(pub_name.trim().to_string());
            }
        }

        if metadata.published_time.is_none() {
            if let Some(date) = parsed.get("datePublished").and_then(|v| v.as_str()) {
                metadata.published_time = Some(date.trim().to_string());
            }
        }
    }

    metadata
}

static PROPERTY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*(article|dc|dcterm|og|twitter)\s*:\s*(author|creator|description|published_time|title|site_name)\s*",
    )
    .unwrap()
});
static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(dc|dcterm|og|twitter|parsely|weibo:(article|webpage))\s*[-\.:]\s*)?(author|creator|pub-date|description|title|site_name)\s*$",
    )
    .unwrap()
});

/// Harvest `<meta>` values and merge them with JSON-LD results.
///
/// Composition is per-field, first non-empty source wins; JSON-LD occupies
/// the highest-priority slot in every chain (empty when disabled).
pub fn get_article_metadata(document: &Html, json_ld: Metadata) -> Metadata {
    let mut values: HashMap<String, String> = HashMap::new();

    for meta in document.select(&META_SELECTOR) {
        let element_name = meta.value().attr("name");
        let element_property = meta.value().attr("property");
        let Some(content) = meta.value().attr("content").filter(|c| !c.is_empty()) else {
            continue;
        };

        let mut property_matched = false;
        if let Some(property) = element_property {
            // A property attribute can hold several space-separated keys
            for prop in property.split_whitespace() {
                if let Some(mat) = PROPERTY_PATTERN.find(prop) {
                    let key = mat
                        .as_str()
                        .to_lowercase()
                        .replace(char::is_whitespace, "");
                    values.insert(key, content.trim().to_string());
                    property_matched = true;
                }
            }
        }

        if !property_matched {
            if let Some(name) = element_name {
                if NAME_PATTERN.is_match(name) {
                    let key = name
                        .to_lowercase()
                        .replace(char::is_whitespace, "")
                        .replace('.', ":");
                    values.insert(key, content.trim().to_string());
                }
            }
        }
    }

    let mut metadata = Metadata::default();

    metadata.title = json_ld.title.or_else(|| {
        values
            .get("dc:title")
            .or_else(|| values.get("dcterm:title"))
            .or_else(|| values.get("og:title"))
            .or_else(|| values.get("weibo:article:title"))
            .or_else(|| values.get("weibo:webpage:title"))
            .or_else(|| values.get("title"))
            .or_else(|| values.get("twitter:title"))
            .or_else(|| values.get("parsely-title"))
            .cloned()
    });
    if metadata.title.is_none() {
        metadata.title = get_article_title(document);
    }

    // article:author frequently carries a profile URL rather than a name
    let article_author = values
        .get("article:author")
        .filter(|v| !text::is_url(v))
        .cloned();

    metadata.byline = json_ld.byline.or_else(|| {
        values
            .get("dc:creator")
            .or_else(|| values.get("dcterm:creator"))
            .or_else(|| values.get("author"))
            .or_else(|| values.get("parsely-author"))
            .or(article_author.as_ref())
            .cloned()
    });

    metadata.excerpt = json_ld.excerpt.or_else(|| {
        values
            .get("dc:description")
            .or_else(|| values.get("dcterm:description"))
            .or_else(|| values.get("og:description"))
            .or_else(|| values.get("weibo:article:description"))
            .or_else(|| values.get("weibo:webpage:description"))
            .or_else(|| values.get("description"))
            .or_else(|| values.get("twitter:description"))
            .cloned()
    });

    metadata.site_name = json_ld
        .site_name
        .or_else(|| values.get("og:site_name").cloned());

    metadata.published_time = json_ld.published_time.or_else(|| {
        values
            .get("article:published_time")
            .or_else(|| values.get("parsely-pub-date"))
            .cloned()
    });

    metadata.lang = extract_language(document);

    metadata.title = metadata.title.map(|t| text::unescape_html_entities(&t));
    metadata.byline = metadata.byline.map(|b| text::unescape_html_entities(&b));
    metadata.excerpt = metadata.excerpt.map(|e| text::unescape_html_entities(&e));
    metadata.site_name = metadata
        .site_name
        .map(|s| text::unescape_html_entities(&s));
    metadata.published_time = metadata
        .published_time
        .map(|p| text::unescape_html_entities(&p));

    metadata
}

/// Language from `<html lang>` or a Content-Language meta tag.
fn extract_language(document: &Html) -> Option<String> {
    if let Some(html) = document.select(&HTML_SELECTOR).next() {
        if let Some(lang) = html.value().attr("lang") {
            let lang = lang.trim();
            if !lang.is_empty() {
                return Some(lang.to_string());
            }
        }
    }

    static CONTENT_LANGUAGE: Lazy<Selector> =
        Lazy::new(|| Selector::parse(r#"meta[http-equiv="Content-Language" i]"#).unwrap());
    for meta in document.select(&CONTENT_LANGUAGE) {
        if let Some(content) = meta.value().attr("content") {
            let lang = content.trim();
            if !lang.is_empty() {
                return Some(lang.to_string());
            }
        }
    }

    None
}

// All separators: | - – — \ / > » ; hierarchical subset: \ / > »
static TITLE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s[|\-–—\\/>»]\s").unwrap());
static HIERARCHICAL_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s[\\/>»]\s").unwrap());
static FIRST_SEPARATOR_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^|\-–—\\/>»]*[|\-–—\\/>»]").unwrap());
static ANY_SEPARATOR_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[|\-–—\\/>»]+").unwrap());

/// Derive the article title from the document's `<title>` element.
///
/// Strips trailing site names after separator characters, resolves
/// colon-prefixed titles against headings, and falls back to a lone `<h1>`
/// for degenerate title lengths. A reduction that loses more than one word
/// (or any shortening without a separator to justify it) reverts to the
/// original title.
pub fn get_article_title(document: &Html) -> Option<String> {
    let title_elem = document.select(&TITLE_SELECTOR).next()?;
    let orig_title = text::normalize_spaces(&title_elem.text().collect::<String>());
    if orig_title.is_empty() {
        return None;
    }

    let mut cur_title = orig_title.clone();
    let mut title_had_separators = false;
    let mut title_had_hierarchical_separators = false;

    if TITLE_SEPARATOR.is_match(&cur_title) {
        title_had_separators = true;
        title_had_hierarchical_separators = HIERARCHICAL_SEPARATOR.is_match(&cur_title);

        // Keep everything before the last separator (usually the site name)
        if let Some(last) = TITLE_SEPARATOR.find_iter(&orig_title).last() {
            cur_title = orig_title[..last.start()].to_string();
        }

        // Too little left: strip the leading segment instead, provided the
        // trailing segment actually holds the longer name
        if text::word_count(&cur_title) < 3 {
            let after_first = FIRST_SEPARATOR_PREFIX
                .replace(&orig_title, "")
                .trim()
                .to_string();
            if text::word_count(&after_first) >= 3 {
                cur_title = after_first;
            }
        }
    } else if cur_title.contains(": ") {
        let trimmed_title = cur_title.trim().to_string();
        let heading_matches = document
            .select(&HEADING_SELECTOR)
            .any(|h| h.text().collect::<String>().trim() == trimmed_title);

        if !heading_matches {
            if let Some(last_colon) = orig_title.rfind(':') {
                cur_title = orig_title[last_colon + 1..].trim().to_string();

                if text::word_count(&cur_title) < 3 {
                    if let Some(first_colon) = orig_title.find(':') {
                        cur_title = orig_title[first_colon + 1..].trim().to_string();
                    }
                } else if let Some(first_colon) = orig_title.find(':') {
                    if text::word_count(&orig_title[..first_colon]) > 5 {
                        cur_title = orig_title.clone();
                    }
                }
            }
        }
    } else if cur_title.len() > 150 || cur_title.len() < 15 {
        let h1s: Vec<_> = document.select(&H1_SELECTOR).collect();
        if h1s.len() == 1 {
            cur_title = text::normalize_spaces(&h1s[0].text().collect::<String>());
        }
    }

    cur_title = text::normalize_spaces(&cur_title);

    let cur_word_count = text::word_count(&cur_title);
    if cur_word_count <= 4 {
        let stripped = ANY_SEPARATOR_RUN.replace_all(&orig_title, " ");
        let orig_word_count = text::word_count(&stripped);
        let reduction = orig_word_count.saturating_sub(cur_word_count);
        if !title_had_separators
            || (title_had_hierarchical_separators && reduction != 1)
            || reduction > 1
        {
            cur_title = orig_title;
        }
    }

    Some(cur_title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_ld_extraction() {
        let html = r#"
            <html>
                <head>
                    <script type="application/ld+json">
                    {
                        "@context": "https://schema.org",
                        "@type": "Article",
                        "headline": "Test Article",
                        "author": {"name": "John Doe"},
                        "description": "Test description"
                    }
                    </script>
                </head>
            </html>
        "#;

        let document = Html::parse_document(html);
        let metadata = get_json_ld(&document);

        assert_eq!(metadata.title, Some("Test Article".to_string()));
        assert_eq!(metadata.byline, Some("John Doe".to_string()));
        assert_eq!(metadata.excerpt, Some("Test description".to_string()));
    }

    #[test]
    fn test_json_ld_requires_schema_context() {
        let html = r#"
            <html><head>
                <script type="application/ld+json">
                {"@context": "https://example.org", "@type": "Article", "headline": "X"}
                </script>
            </head></html>
        "#;
        let document = Html::parse_document(html);
        assert!(get_json_ld(&document).title.is_none());
    }

    #[test]
    fn test_json_ld_vocab_context_and_graph() {
        let html = r#"
            <html><head>
                <script type="application/ld+json">
                {
                    "@context": {"@vocab": "http://schema.org/"},
                    "@graph": [
                        {"@type": "WebSite", "name": "Site"},
                        {"@type": "NewsArticle", "headline": "Graph Article",
                         "datePublished": "2024-01-02"}
                    ]
                }
                </script>
            </head></html>
        "#;
        let document = Html::parse_document(html);
        let metadata = get_json_ld(&document);
        assert_eq!(metadata.title, Some("Graph Article".to_string()));
        assert_eq!(metadata.published_time, Some("2024-01-02".to_string()));
    }

    #[test]
    fn test_json_ld_author_array() {
        let html = r#"
            <html><head>
                <script type="application/ld+json">
                {"@context": "https://schema.org", "@type": "Article",
                 "headline": "X",
                 "author": [{"name": "Jane Roe"}, {"name": "John Doe"}]}
                </script>
            </head></html>
        "#;
        let document = Html::parse_document(html);
        let metadata = get_json_ld(&document);
        assert_eq!(metadata.byline, Some("Jane Roe, John Doe".to_string()));
    }

    #[test]
    fn test_json_ld_malformed_is_skipped() {
        let html = r#"
            <html><head>
                <script type="application/ld+json">{not json at all</script>
                <script type="application/ld+json">
                {"@context": "https://schema.org", "@type": "Article", "headline": "Recovered"}
                </script>
            </head></html>
        "#;
        let document = Html::parse_document(html);
        assert_eq!(get_json_ld(&document).title, Some("Recovered".to_string()));
    }

    #[test]
    fn test_meta_tag_extraction() {
        let html = r#"
            <html>
                <head>
                    <meta property="og:title" content="OG Title" />
                    <meta name="author" content="Jane Smith" />
                    <meta property="og:description" content="OG Description" />
                </head>
            </html>
        "#;

        let document = Html::parse_document(html);
        let metadata = get_article_metadata(&document, Metadata::default());

        assert_eq!(metadata.title, Some("OG Title".to_string()));
        assert_eq!(metadata.byline, Some("Jane Smith".to_string()));
        assert_eq!(metadata.excerpt, Some("OG Description".to_string()));
    }

    #[test]
    fn test_article_author_url_is_rejected() {
        let html = r#"
            <html><head>
                <meta property="article:author" content="https://example.com/authors/jane" />
            </head></html>
        "#;
        let document = Html::parse_document(html);
        let metadata = get_article_metadata(&document, Metadata::default());
        assert!(metadata.byline.is_none());
    }

    #[test]
    fn test_article_author_name_is_accepted() {
        let html = r#"
            <html><head>
                <meta property="article:author" content="Jane Doe" />
            </head></html>
        "#;
        let document = Html::parse_document(html);
        let metadata = get_article_metadata(&document, Metadata::default());
        assert_eq!(metadata.byline, Some("Jane Doe".to_string()));
    }

    #[test]
    fn test_json_ld_takes_priority_over_meta() {
        let html = r#"
            <html><head>
                <meta property="og:title" content="Meta Title" />
            </head></html>
        "#;
        let document = Html::parse_document(html);
        let json_ld = Metadata {
            title: Some("JSON-LD Title".to_string()),
            ..Metadata::default()
        };
        let metadata = get_article_metadata(&document, json_ld);
        assert_eq!(metadata.title, Some("JSON-LD Title".to_string()));
    }

    #[test]
    fn test_entities_are_unescaped() {
        let html = r#"
            <html><head>
                <meta property="og:title" content="Tom &amp; Jerry" />
            </head></html>
        "#;
        let document = Html::parse_document(html);
        let metadata = get_article_metadata(&document, Metadata::default());
        assert_eq!(metadata.title, Some("Tom & Jerry".to_string()));
    }

    #[test]
    fn test_weibo_and_parsely_names() {
        let html = r#"
            <html><head>
                <meta name="weibo:article:title" content="Weibo Title" />
                <meta name="parsely-author" content="Parsely Author" />
                <meta name="parsely-pub-date" content="2020-02-02" />
            </head></html>
        "#;
        let document = Html::parse_document(html);
        let metadata = get_article_metadata(&document, Metadata::default());
        assert_eq!(metadata.title, Some("Weibo Title".to_string()));
        assert_eq!(metadata.byline, Some("Parsely Author".to_string()));
        assert_eq!(metadata.published_time, Some("2020-02-02".to_string()));
    }

    #[test]
    fn test_title_separator_strips_site_name() {
        let html = "<html><head><title>Foo - Example</title></head><body></body></html>";
        let document = Html::parse_document(html);
        assert_eq!(get_article_title(&document), Some("Foo".to_string()));
    }

    #[test]
    fn test_title_short_lead_keeps_trailing_segment() {
        let html = "<html><head><title>News - The Daily Planet Online Edition</title></head><body></body></html>";
        let document = Html::parse_document(html);
        assert_eq!(
            get_article_title(&document),
            Some("The Daily Planet Online Edition".to_string())
        );
    }

    #[test]
    fn test_title_short_h1_reverts_to_original() {
        // A four-word heading replacing an unseparated title gets reverted
        let html = r#"
            <html>
                <head><title>Stub</title></head>
                <body><h1>A Four Word Title</h1></body>
            </html>
        "#;
        let document = Html::parse_document(html);
        assert_eq!(get_article_title(&document), Some("Stub".to_string()));
    }

    #[test]
    fn test_title_colon_keeps_heading_match() {
        let html = r#"
            <html>
                <head><title>Series: The Finale</title></head>
                <body><h1>Series: The Finale</h1></body>
            </html>
        "#;
        let document = Html::parse_document(html);
        assert_eq!(
            get_article_title(&document),
            Some("Series: The Finale".to_string())
        );
    }

    #[test]
    fn test_title_short_uses_single_h1() {
        let html = r#"
            <html>
                <head><title>x</title></head>
                <body><h1>The Actual Headline Of This Piece</h1></body>
            </html>
        "#;
        let document = Html::parse_document(html);
        assert_eq!(
            get_article_title(&document),
            Some("The Actual Headline Of This Piece".to_string())
        );
    }

    #[test]
    fn test_language_from_html_attribute() {
        let html = r#"<html lang="fr"><head><title>t</title></head><body></body></html>"#;
        let document = Html::parse_document(html);
        let metadata = get_article_metadata(&document, Metadata::default());
        assert_eq!(metadata.lang, Some("fr".to_string()));
    }
}
