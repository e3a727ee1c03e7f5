//! Quick readability check without full parsing.
//!
//! [`is_probably_readerable`] is a fast pre-flight predicate: it looks for
//! visible, plausibly-content paragraphs and accumulates a square-root
//! length score, without running any of the extraction pipeline.
//!
//! ```rust
//! use unclutter::{is_probably_readerable, ReaderView};
//!
//! let html = "<html>...</html>";
//!
//! if is_probably_readerable(html, None) {
//!     let reader = ReaderView::new(html, None, None).unwrap();
//!     if let Ok(Some(article)) = reader.parse() {
//!         println!("Article extracted!");
//!     }
//! }
//! ```

use crate::constants::REGEXPS;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

/// Options for the readability pre-flight check.
#[derive(Debug, Clone)]
pub struct ReaderableOptions {
    /// Paragraphs shorter than this are ignored.
    ///
    /// Default: `140`
    pub min_content_length: usize,

    /// Accumulated score above which the page counts as readerable.
    ///
    /// Default: `20.0`
    pub min_score: f64,
}

impl Default for ReaderableOptions {
    fn default() -> Self {
        Self {
            min_content_length: 140,
            min_score: 20.0,
        }
    }
}

static CANDIDATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p, pre, article, div > p").unwrap());

fn is_probably_visible(node: &ElementRef) -> bool {
    if let Some(style) = node.value().attr("style") {
        let style = style.to_lowercase();
        if style.contains("display:none")
            || style.contains("display: none")
            || style.contains("visibility:hidden")
            || style.contains("visibility: hidden")
        {
            return false;
        }
    }
    if node.value().attr("hidden").is_some() {
        return false;
    }
    if node.value().attr("aria-hidden") == Some("true") {
        let class = node.value().attr("class").unwrap_or("");
        if !class.contains("fallback-image") {
            return false;
        }
    }
    true
}

/// Quick check to determine if a document likely holds extractable article
/// content.
///
/// Finds visible `<p>`, `<pre>`, and `<article>` nodes that don't look
/// like chrome, ignores ones shorter than `min_content_length`, and sums
/// `sqrt(length − min_content_length)` until `min_score` is cleared.
///
/// ```rust
/// use unclutter::is_probably_readerable;
///
/// let article_html = r#"
///     <html><body><article>
///         <p>This is a substantial paragraph with enough content to indicate
///         that this page likely contains article text that can be extracted
///         by the full pipeline without wasting work on chrome-only pages,
///         and it keeps going for a while to make that unambiguous.</p>
///         <p>Here is another paragraph with more content to raise the score
///         past the default threshold used by the pre-flight computation,
///         because two long paragraphs together clear the bar comfortably.</p>
///     </article></body></html>
/// "#;
/// assert!(is_probably_readerable(article_html, None));
///
/// let non_article = "<html><body><p>Short</p></body></html>";
/// assert!(!is_probably_readerable(non_article, None));
/// ```
pub fn is_probably_readerable(html: &str, options: Option<ReaderableOptions>) -> bool {
    let options = options.unwrap_or_default();
    let document = Html::parse_document(html);

    let mut score = 0.0;

    for node in document.select(&CANDIDATE_SELECTOR) {
        if !is_probably_visible(&node) {
            continue;
        }

        let class = node.value().attr("class").unwrap_or("");
        let id = node.value().attr("id").unwrap_or("");
        let match_string = format!("{} {}", class, id);
        if REGEXPS.unlikely_candidates.is_match(&match_string)
            && !REGEXPS.ok_maybe_its_a_candidate.is_match(&match_string)
        {
            continue;
        }

        // List items posing as paragraphs don't count
        let inside_li = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| ancestor.value().name() == "li");
        if inside_li && node.value().name() == "p" {
            continue;
        }

        let text = node.text().collect::<String>();
        let text_len = text.trim().chars().count();
        if text_len < options.min_content_length {
            continue;
        }

        score += ((text_len - options.min_content_length) as f64).sqrt();
        if score > options.min_score {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_probably_readerable() {
        let html = r#"
            <html>
                <body>
                    <article>
                        <p>This is a long enough paragraph that should make the content readerable.
                        It has sufficient content to pass the minimum threshold check. Adding more text here to ensure
                        we definitely exceed the 140 character minimum requirement for each paragraph element.</p>
                        <p>Another paragraph with more content to increase the score. This paragraph also needs to be
                        long enough to contribute to the overall readability score calculation and help us pass the test.</p>
                    </article>
                </body>
            </html>
        "#;

        assert!(is_probably_readerable(html, None));
    }

    #[test]
    fn test_not_readerable() {
        let html = r#"
            <html>
                <body>
                    <p>Short</p>
                </body>
            </html>
        "#;

        assert!(!is_probably_readerable(html, None));
    }

    #[test]
    fn test_hidden_content_ignored() {
        let html = r#"
            <html><body>
                <div style="display: none">
                    <p style="display: none">This paragraph is long enough to count toward the score but it is
                    hidden from view, and hidden content must never make a page look readerable. Padding padding
                    padding padding padding padding.</p>
                </div>
            </body></html>
        "#;
        assert!(!is_probably_readerable(html, None));
    }

    #[test]
    fn test_unlikely_containers_ignored() {
        let html = r#"
            <html><body>
                <p class="comment">This comment paragraph is plenty long to pass the one-hundred-forty
                character minimum, but its class marks it as discussion chrome rather than article
                content, so it contributes nothing at all.</p>
            </body></html>
        "#;
        assert!(!is_probably_readerable(html, None));
    }

    #[test]
    fn test_custom_thresholds() {
        let html = r#"
            <html><body><article>
                <p>A medium paragraph that sits above a small custom threshold but far below the default
                one hundred forty characters... well, actually above it too.</p>
            </article></body></html>
        "#;
        let strict = ReaderableOptions {
            min_content_length: 500,
            min_score: 20.0,
        };
        assert!(!is_probably_readerable(html, Some(strict)));
    }
}
