//! Configuration options for article extraction.
//!
//! This module provides [`ReaderOptions`] and [`ReaderOptionsBuilder`]
//! for configuring the behavior of the content extraction algorithm.
//!
//! ## Example
//!
//! ```rust
//! use unclutter::{ReaderView, ReaderOptions};
//!
//! let html = "<html><body><article><p>Content...</p></article></body></html>";
//!
//! // Using default options
//! let reader = ReaderView::new(html, None, None).unwrap();
//!
//! // Using builder for custom options
//! let options = ReaderOptions::builder()
//!     .char_threshold(300)
//!     .nb_top_candidates(10)
//!     .keep_classes(true)
//!     .build();
//!
//! let reader = ReaderView::new(html, None, Some(options)).unwrap();
//! ```

use crate::constants::{CLASSES_TO_PRESERVE, DEFAULT_CHAR_THRESHOLD, DEFAULT_N_TOP_CANDIDATES};
use kuchikikiki::NodeRef;
use regex::Regex;

/// Function mapping the assembled article element to the output string.
pub type Serializer = fn(&NodeRef) -> String;

/// Configuration options for the extraction pipeline.
///
/// Controls scoring thresholds, element limits, output cleanup, and metadata
/// extraction behavior. Construct with [`ReaderOptions::default`] or through
/// the builder:
///
/// ```rust
/// use unclutter::ReaderOptions;
///
/// let options = ReaderOptions::builder()
///     .char_threshold(300)
///     .debug(true)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Enable debug logging to stderr.
    ///
    /// Default: `false`
    pub debug: bool,

    /// Maximum number of elements to parse.
    ///
    /// A safety limit against pathological documents. When the document
    /// exceeds this count, parsing aborts with an error. Set to 0 to
    /// disable the limit.
    ///
    /// Default: `0` (no limit)
    pub max_elems_to_parse: usize,

    /// Number of top candidates retained while ranking content containers.
    ///
    /// Default: `5`
    pub nb_top_candidates: usize,

    /// Minimum number of characters required for extracted content.
    ///
    /// Attempts yielding less text than this re-run the extraction with one
    /// filtering flag relaxed, until all flags are exhausted.
    ///
    /// Default: `500`
    pub char_threshold: usize,

    /// CSS classes preserved when class stripping is active.
    ///
    /// Default: `vec!["page"]`
    pub classes_to_preserve: Vec<String>,

    /// Keep all CSS classes in the output HTML.
    ///
    /// Default: `false`
    pub keep_classes: bool,

    /// Disable JSON-LD metadata extraction.
    ///
    /// When `true` the JSON-LD slot in every metadata priority chain is
    /// simply empty and meta-tag values win in their documented order.
    ///
    /// Default: `false`
    pub disable_json_ld: bool,

    /// Custom serializer for the extracted content element.
    ///
    /// Defaults to the inner HTML of the assembled article container.
    pub serializer: Option<Serializer>,

    /// Custom regex for allowed video URLs.
    ///
    /// Overrides the built-in video host detection used when cleaning
    /// `<object>`, `<embed>`, and `<iframe>` elements.
    ///
    /// Default: `None` (uses built-in regex)
    pub allowed_video_regex: Option<Regex>,

    /// Additive adjustment to the link-density thresholds used by
    /// conditional cleaning. Positive values tolerate more links.
    ///
    /// Default: `0.0`
    pub link_density_modifier: f64,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            debug: false,
            max_elems_to_parse: 0,
            nb_top_candidates: DEFAULT_N_TOP_CANDIDATES,
            char_threshold: DEFAULT_CHAR_THRESHOLD,
            classes_to_preserve: CLASSES_TO_PRESERVE.iter().map(|s| s.to_string()).collect(),
            keep_classes: false,
            disable_json_ld: false,
            serializer: None,
            allowed_video_regex: None,
            link_density_modifier: 0.0,
        }
    }
}

impl ReaderOptions {
    /// Creates a new builder for ReaderOptions
    pub fn builder() -> ReaderOptionsBuilder {
        ReaderOptionsBuilder::default()
    }
}

/// Builder for [`ReaderOptions`].
#[derive(Default)]
pub struct ReaderOptionsBuilder {
    debug: Option<bool>,
    max_elems_to_parse: Option<usize>,
    nb_top_candidates: Option<usize>,
    char_threshold: Option<usize>,
    classes_to_preserve: Option<Vec<String>>,
    keep_classes: Option<bool>,
    disable_json_ld: Option<bool>,
    serializer: Option<Serializer>,
    allowed_video_regex: Option<Regex>,
    link_density_modifier: Option<f64>,
}

impl ReaderOptionsBuilder {
    /// Enable or disable debug logging
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Set maximum number of elements to parse
    pub fn max_elems_to_parse(mut self, max: usize) -> Self {
        self.max_elems_to_parse = Some(max);
        self
    }

    /// Set number of top candidates to consider
    pub fn nb_top_candidates(mut self, nb: usize) -> Self {
        self.nb_top_candidates = Some(nb);
        self
    }

    /// Set character threshold
    pub fn char_threshold(mut self, threshold: usize) -> Self {
        self.char_threshold = Some(threshold);
        self
    }

    /// Set classes to preserve
    pub fn classes_to_preserve(mut self, classes: Vec<String>) -> Self {
        self.classes_to_preserve = Some(classes);
        self
    }

    /// Keep all CSS classes
    pub fn keep_classes(mut self, keep: bool) -> Self {
        self.keep_classes = Some(keep);
        self
    }

    /// Disable JSON-LD extraction
    pub fn disable_json_ld(mut self, disable: bool) -> Self {
        self.disable_json_ld = Some(disable);
        self
    }

    /// Set a custom content serializer
    pub fn serializer(mut self, serializer: Serializer) -> Self {
        self.serializer = Some(serializer);
        self
    }

    /// Set allowed video regex
    pub fn allowed_video_regex(mut self, regex: Regex) -> Self {
        self.allowed_video_regex = Some(regex);
        self
    }

    /// Set link density modifier
    pub fn link_density_modifier(mut self, modifier: f64) -> Self {
        self.link_density_modifier = Some(modifier);
        self
    }

    /// Build the ReaderOptions
    pub fn build(self) -> ReaderOptions {
        let defaults = ReaderOptions::default();
        ReaderOptions {
            debug: self.debug.unwrap_or(defaults.debug),
            max_elems_to_parse: self
                .max_elems_to_parse
                .unwrap_or(defaults.max_elems_to_parse),
            nb_top_candidates: self.nb_top_candidates.unwrap_or(defaults.nb_top_candidates),
            char_threshold: self.char_threshold.unwrap_or(defaults.char_threshold),
            classes_to_preserve: self
                .classes_to_preserve
                .unwrap_or(defaults.classes_to_preserve),
            keep_classes: self.keep_classes.unwrap_or(defaults.keep_classes),
            disable_json_ld: self.disable_json_ld.unwrap_or(defaults.disable_json_ld),
            serializer: self.serializer.or(defaults.serializer),
            allowed_video_regex: self.allowed_video_regex.or(defaults.allowed_video_regex),
            link_density_modifier: self
                .link_density_modifier
                .unwrap_or(defaults.link_density_modifier),
        }
    }
}
