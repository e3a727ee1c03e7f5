//! # unclutter
//!
//! Reader-view article extraction for Rust: given a noisy HTML page,
//! produce the main article as a clean HTML fragment plus derived metadata
//! (title, byline, excerpt, site name, published time, language,
//! direction).
//!
//! ## Overview
//!
//! The extractor removes navigation, advertising, comments, sidebars, and
//! related chrome by scoring content containers against a large set of
//! mutually reinforcing heuristics, then cleaning and normalizing the
//! winning subtree. Metadata comes from JSON-LD structured data, meta tags,
//! and document-title heuristics, merged with fixed precedence.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use unclutter::{ReaderView, ReaderOptions};
//!
//! let html = r#"<html><body><article><h1>Title</h1><p>Content...</p></article></body></html>"#;
//! let url = "https://example.com/article";
//!
//! let reader = ReaderView::new(html, Some(url), None).unwrap();
//!
//! if let Ok(Some(article)) = reader.parse() {
//!     println!("Title: {:?}", article.title);
//!     println!("Content: {:?}", article.content);
//!     println!("Author: {:?}", article.byline);
//! }
//! ```
//!
//! ## Custom Options
//!
//! ```rust,no_run
//! use unclutter::{ReaderView, ReaderOptions};
//!
//! let html = "<html>...</html>";
//!
//! let options = ReaderOptions::builder()
//!     .char_threshold(300)
//!     .nb_top_candidates(10)
//!     .keep_classes(true)
//!     .build();
//!
//! let reader = ReaderView::new(html, None, Some(options)).unwrap();
//! let article = reader.parse();
//! ```
//!
//! ## Pre-flight Check
//!
//! Use [`is_probably_readerable`] to cheaply filter pages before running
//! the full pipeline:
//!
//! ```rust,no_run
//! use unclutter::is_probably_readerable;
//!
//! let html = "<html>...</html>";
//!
//! if is_probably_readerable(html, None) {
//!     // Proceed with full parsing
//! }
//! ```
//!
//! ## Algorithm
//!
//! Extraction runs in phases. Metadata is resolved first, while script
//! elements are still present. The document is then normalized: noscript
//! image fallbacks unwrapped, scripts and styles dropped, `<br>` runs
//! converted to paragraphs. Candidate containers are scored from their
//! text (commas, length, class naming) with scores propagated to
//! ancestors, the best candidate is refined and merged with qualifying
//! siblings, and the assembled content is cleaned of forms, embeds, share
//! widgets, and junk tables. If the result is too short, extraction
//! re-runs with one filtering flag relaxed per attempt, keeping the
//! longest outcome.

mod article;
mod constants;
mod dom;
mod error;
mod extractor;
mod metadata;
mod options;
mod postprocess;
mod prep;
mod preprocess;
mod reader;
mod readerable;
mod scoring;
mod text;

// Public exports
pub use article::Article;
pub use error::{ReaderError, Result};
pub use options::{ReaderOptions, ReaderOptionsBuilder, Serializer};
pub use reader::ReaderView;
pub use readerable::{is_probably_readerable, ReaderableOptions};
