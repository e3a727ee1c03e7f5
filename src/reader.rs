//! Main ReaderView struct and parse implementation.
//!
//! This module contains the primary [`ReaderView`] struct which sequences
//! the entire pipeline: metadata resolution, document normalization, the
//! scored extraction loop, and final post-processing.
//!
//! ## Example
//!
//! ```rust,no_run
//! use unclutter::{ReaderView, ReaderOptions};
//!
//! let html = std::fs::read_to_string("article.html").unwrap();
//! let url = "https://example.com/article";
//!
//! let reader = ReaderView::new(&html, Some(url), None)?;
//!
//! if let Some(article) = reader.parse()? {
//!     println!("Title: {:?}", article.title);
//!     println!("Author: {:?}", article.byline);
//!     println!("Content length: {} chars", article.length);
//! }
//! # Ok::<(), unclutter::ReaderError>(())
//! ```

use crate::{
    article::Article,
    dom::{self, NodeExt},
    error::{ReaderError, Result},
    extractor::Extractor,
    metadata::{get_article_metadata, get_json_ld, Metadata},
    options::ReaderOptions,
    preprocess,
    postprocess,
};
use kuchikikiki::iter::NodeIterator;
use kuchikikiki::traits::TendrilSink;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

static BASE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("base[href]").unwrap());
static HTML_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("html").unwrap());

/// The article extraction parser.
///
/// Construct with [`ReaderView::new`], then call
/// [`parse`](ReaderView::parse) to run the pipeline. Parsing consumes the
/// instance: the extraction mutates its working copy of the document
/// in place and is not repeatable on the same instance.
///
/// ```rust
/// use unclutter::ReaderView;
///
/// let html = r#"
///     <html>
///     <head><title>Article Title</title></head>
///     <body>
///         <article>
///             <h1>Article Title</h1>
///             <p>First paragraph of content...</p>
///         </article>
///     </body>
///     </html>
/// "#;
///
/// let reader = ReaderView::new(html, None, None)?;
/// match reader.parse()? {
///     Some(article) => println!("Extracted {} characters", article.length),
///     None => println!("Could not extract article content"),
/// }
/// # Ok::<(), unclutter::ReaderError>(())
/// ```
pub struct ReaderView {
    /// Original HTML string (the extraction works on a fresh parse of it)
    html: String,

    /// Read-only parse used for metadata extraction
    document: Html,

    /// Document URI for resolving relative links
    document_uri: Option<String>,

    /// Configuration options
    options: ReaderOptions,
}

impl ReaderView {
    /// Create a new ReaderView instance
    ///
    /// # Arguments
    /// * `html` - The HTML content to parse
    /// * `url` - Optional document URL for resolving relative links
    /// * `options` - Optional configuration options
    pub fn new(html: &str, url: Option<&str>, options: Option<ReaderOptions>) -> Result<Self> {
        let document = Html::parse_document(html);

        let document_uri = url
            .map(|u| {
                Url::parse(u)
                    .ok()
                    .filter(|parsed| parsed.has_host())
                    .map(|_| u.to_string())
                    .ok_or_else(|| ReaderError::InvalidUrl(u.to_string()))
            })
            .transpose()?;

        Ok(Self {
            html: html.to_string(),
            document,
            document_uri,
            options: options.unwrap_or_default(),
        })
    }

    /// Parse the document and extract the article.
    ///
    /// Returns `Ok(None)` when no usable content is found. Metadata-level
    /// problems never fail the parse; only structural errors (such as the
    /// element limit being exceeded) surface as `Err`.
    pub fn parse(self) -> Result<Option<Article>> {
        let doc = kuchikikiki::parse_html().one(self.html.as_str());

        if self.options.max_elems_to_parse > 0 {
            let num_elements = doc.descendants().elements().count();
            if num_elements > self.options.max_elems_to_parse {
                return Err(ReaderError::MaxElementsExceeded(num_elements));
            }
        }

        // Metadata first: the JSON-LD pass needs the script elements that
        // preprocessing is about to remove
        let json_ld = if self.options.disable_json_ld {
            Metadata::default()
        } else {
            get_json_ld(&self.document)
        };
        let metadata = get_article_metadata(&self.document, json_ld);

        preprocess::unwrap_noscript_images(&doc);
        preprocess::remove_scripts(&doc);
        preprocess::prep_document(&doc);

        let article_title = metadata.title.clone().unwrap_or_default();
        let extractor = Extractor::new(&self.options, &article_title, metadata.byline.is_some());
        let Some(extraction) = extractor.run(&doc) else {
            return Ok(None);
        };

        let (base_uri, document_uri) = self.resolve_base_uri();
        postprocess::post_process_content(
            &extraction.article_content,
            base_uri.as_deref(),
            document_uri.as_deref(),
            &self.options,
        );

        let text_content = extraction.article_content.inner_text(true);
        let length = text_content.chars().count();

        let content = match self.options.serializer {
            Some(serializer) => serializer(&extraction.article_content),
            None => dom::inner_html(&extraction.article_content),
        };

        // First real paragraph stands in when no description was found
        let excerpt = metadata.excerpt.clone().or_else(|| {
            extraction
                .article_content
                .nodes_with_tag(&["p"])
                .first()
                .map(|p| p.inner_text(false))
                .filter(|text| !text.is_empty())
        });

        let dir = extraction.dir.or_else(|| self.document_dir());

        Ok(Some(Article {
            title: metadata.title,
            content: Some(content),
            text_content: Some(text_content),
            length,
            excerpt,
            byline: metadata.byline.or(extraction.byline),
            dir,
            site_name: metadata.site_name,
            lang: metadata.lang,
            published_time: metadata.published_time,
        }))
    }

    /// The resolution base is `<base href>` against the document URI when
    /// present, otherwise the document URI itself.
    fn resolve_base_uri(&self) -> (Option<String>, Option<String>) {
        let document_uri = self.document_uri.clone();
        let base_href = self
            .document
            .select(&BASE_SELECTOR)
            .next()
            .and_then(|base| base.value().attr("href").map(str::to_string));

        let base_uri = match (&base_href, &document_uri) {
            (Some(href), Some(doc_uri)) => Url::parse(doc_uri)
                .and_then(|doc_url| doc_url.join(href))
                .map(|joined| joined.to_string())
                .ok()
                .or_else(|| document_uri.clone()),
            (Some(href), None) => Url::parse(href).ok().map(|parsed| parsed.to_string()),
            (None, _) => document_uri.clone(),
        };

        (base_uri, document_uri)
    }

    fn document_dir(&self) -> Option<String> {
        self.document
            .select(&HTML_SELECTOR)
            .next()
            .and_then(|html| html.value().attr("dir"))
            .map(str::to_string)
            .filter(|dir| !dir.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_html(paragraphs: usize) -> String {
        let body: String = (0..paragraphs)
            .map(|i| {
                format!(
                    "<p>Paragraph number {i} carries plenty of weight, with commas, clauses, \
                     and a length comfortably past one hundred characters, so that scoring \
                     treats it as genuine article prose rather than page chrome.</p>"
                )
            })
            .collect();
        format!(
            "<html><head><title>Testing - Example</title></head><body><article>{}</article></body></html>",
            body
        )
    }

    #[test]
    fn test_new_reader() {
        let html = r#"<html><body><p>Test</p></body></html>"#;
        assert!(ReaderView::new(html, None, None).is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let html = r#"<html><body><p>Test</p></body></html>"#;
        let result = ReaderView::new(html, Some("not a url"), None);
        assert!(matches!(result, Err(ReaderError::InvalidUrl(_))));
    }

    #[test]
    fn test_parse_extracts_content() {
        let reader = ReaderView::new(&article_html(5), None, None).unwrap();
        let article = reader.parse().unwrap().expect("article expected");
        assert_eq!(article.title.as_deref(), Some("Testing"));
        assert!(article.length >= 500);
        assert!(article.content.unwrap().contains("Paragraph number 0"));
    }

    #[test]
    fn test_max_elems_exceeded() {
        let options = ReaderOptions::builder().max_elems_to_parse(3).build();
        let reader = ReaderView::new(&article_html(5), None, Some(options)).unwrap();
        assert!(matches!(
            reader.parse(),
            Err(ReaderError::MaxElementsExceeded(_))
        ));
    }

    #[test]
    fn test_excerpt_falls_back_to_first_paragraph() {
        let reader = ReaderView::new(&article_html(5), None, None).unwrap();
        let article = reader.parse().unwrap().unwrap();
        assert!(article.excerpt.unwrap().starts_with("Paragraph number 0"));
    }

    #[test]
    fn test_custom_serializer() {
        fn outer(node: &kuchikikiki::NodeRef) -> String {
            crate::dom::outer_html(node)
        }
        let options = ReaderOptions::builder().serializer(outer).build();
        let reader = ReaderView::new(&article_html(5), None, Some(options)).unwrap();
        let article = reader.parse().unwrap().unwrap();
        // The custom serializer includes the container element itself
        assert!(article.content.unwrap().starts_with("<div"));
    }

    #[test]
    fn test_lang_and_dir_from_document() {
        let html = article_html(5)
            .replace("<html>", r#"<html lang="en" dir="ltr">"#);
        let reader = ReaderView::new(&html, None, None).unwrap();
        let article = reader.parse().unwrap().unwrap();
        assert_eq!(article.lang.as_deref(), Some("en"));
        assert_eq!(article.dir.as_deref(), Some("ltr"));
    }
}
