//! Article data structure representing the parsed output.
//!
//! This module defines the [`Article`] struct, which contains all extracted
//! content and metadata from a successfully parsed web page.
//!
//! ## Example
//!
//! ```rust,no_run
//! use unclutter::ReaderView;
//!
//! let html = r#"<html><body><article><h1>My Article</h1><p>Content...</p></article></body></html>"#;
//! let reader = ReaderView::new(html, Some("https://example.com"), None).unwrap();
//!
//! if let Ok(Some(article)) = reader.parse() {
//!     println!("Title: {:?}", article.title);
//!     println!("Length: {} characters", article.length);
//!     if let Some(content) = article.content {
//!         println!("HTML: {}", content);
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// A successfully parsed article with extracted content and metadata.
///
/// All fields except `length` are optional because not every page carries
/// every piece of metadata. Implements `Serialize`/`Deserialize` so results
/// can be persisted as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Article {
    /// The article title, resolved from JSON-LD, meta tags, or the
    /// document's `<title>` heuristics, in that order.
    pub title: Option<String>,

    /// Cleaned HTML content of the article.
    ///
    /// Ads and navigation removed, relative URLs made absolute, and
    /// presentational markup stripped.
    pub content: Option<String>,

    /// Plain text content with all HTML tags removed.
    pub text_content: Option<String>,

    /// Character count of the plain text content.
    pub length: usize,

    /// Article description or short excerpt.
    ///
    /// Taken from metadata when available, otherwise the first paragraph
    /// of the extracted content.
    pub excerpt: Option<String>,

    /// Author name(s), comma-separated when multiple.
    pub byline: Option<String>,

    /// Text direction hint: "ltr" or "rtl".
    pub dir: Option<String>,

    /// Name of the website or publication.
    pub site_name: Option<String>,

    /// Language code of the content (e.g., "en", "fr").
    pub lang: Option<String>,

    /// Publication timestamp, typically ISO 8601.
    pub published_time: Option<String>,
}

impl Article {
    pub fn new() -> Self {
        Self::default()
    }
}
