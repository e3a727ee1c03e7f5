//! Constants, regular expressions, and static data used throughout the library.

use once_cell::sync::Lazy;
use regex::Regex;

// Flags relaxed one at a time by the extraction retry loop
bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ParseFlags: u32 {
        const STRIP_UNLIKELYS = 0x1;
        const WEIGHT_CLASSES = 0x2;
        const CLEAN_CONDITIONALLY = 0x4;
    }
}

/// Default number of top candidates tracked during scoring
pub const DEFAULT_N_TOP_CANDIDATES: usize = 5;

/// Default minimum text length for a successful extraction
pub const DEFAULT_CHAR_THRESHOLD: usize = 500;

/// Ancestors receiving a scored element's propagated score
pub const SCORE_PROPAGATION_DEPTH: usize = 5;

/// Share widgets longer than this survive the share-element sweep
pub const SHARE_ELEMENT_THRESHOLD: usize = 500;

// Element tags whose text content feeds the scoring engine
pub const DEFAULT_TAGS_TO_SCORE: &[&str] =
    &["section", "h2", "h3", "h4", "h5", "h6", "p", "td", "pre"];

// Block elements that stop a DIV from collapsing into a P
pub const DIV_TO_P_ELEMS: &[&str] = &[
    "blockquote",
    "dl",
    "div",
    "img",
    "ol",
    "p",
    "pre",
    "table",
    "ul",
];

// Sibling tags kept as-is during assembly; everything else becomes a DIV
pub const ALTER_TO_DIV_EXCEPTIONS: &[&str] = &["div", "article", "section", "p", "ol", "ul"];

// Phrasing (inline) elements
pub const PHRASING_ELEMS: &[&str] = &[
    "abbr", "audio", "b", "bdo", "br", "button", "cite", "code", "data", "datalist", "dfn", "em",
    "embed", "i", "img", "input", "kbd", "label", "mark", "math", "meter", "noscript", "object",
    "output", "progress", "q", "ruby", "samp", "script", "select", "small", "span", "strong",
    "sub", "sup", "textarea", "time", "var", "wbr",
];

// Stripped everywhere during style cleaning
pub const PRESENTATIONAL_ATTRIBUTES: &[&str] = &[
    "align",
    "background",
    "bgcolor",
    "border",
    "cellpadding",
    "cellspacing",
    "frame",
    "hspace",
    "rules",
    "style",
    "valign",
    "vspace",
];

// Additionally lose width/height during style cleaning
pub const DEPRECATED_SIZE_ATTRIBUTE_ELEMS: &[&str] = &["table", "th", "td", "hr", "pre"];

// ARIA roles that mark an element as chrome rather than content
pub const UNLIKELY_ROLES: &[&str] = &[
    "menu",
    "menubar",
    "complementary",
    "navigation",
    "alert",
    "alertdialog",
    "dialog",
];

// Classes kept by default when class stripping is enabled
pub const CLASSES_TO_PRESERVE: &[&str] = &["page"];

// Regular expressions (compiled once)
pub static REGEXPS: Lazy<RegexPatterns> = Lazy::new(RegexPatterns::new);

pub struct RegexPatterns {
    pub unlikely_candidates: Regex,
    pub ok_maybe_its_a_candidate: Regex,
    pub positive: Regex,
    pub negative: Regex,
    pub byline: Regex,
    pub normalize: Regex,
    pub videos: Regex,
    pub share_elements: Regex,
    pub hash_url: Regex,
    pub commas: Regex,
    pub json_ld_article_types: Regex,
    pub schema_dot_org: Regex,
    pub srcset_url: Regex,
    pub b64_data_url: Regex,
    pub tokenize: Regex,
    pub whitespace: Regex,
    pub has_content: Regex,
    pub next_sentence: Regex,
    pub lazy_srcset: Regex,
    pub lazy_src: Regex,
    pub image_ext: Regex,
}

impl RegexPatterns {
    fn new() -> Self {
        Self {
            unlikely_candidates: Regex::new(
                r"(?i)-ad-|ai2html|banner|breadcrumbs|combx|comment|community|cover-wrap|disqus|extra|footer|gdpr|header|legends|menu|related|remark|replies|rss|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|ad-break|agegate|pagination|pager|popup|yom-remote"
            ).unwrap(),
            ok_maybe_its_a_candidate: Regex::new(
                r"(?i)and|article|body|column|content|main|mathjax|shadow"
            ).unwrap(),
            positive: Regex::new(
                r"(?i)article|body|content|entry|hentry|h-entry|main|page|pagination|post|text|blog|story"
            ).unwrap(),
            negative: Regex::new(
                r"(?i)-ad-|hidden|^hid$| hid$| hid |^hid |banner|combx|comment|com-|contact|footer|gdpr|masthead|media|meta|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|widget"
            ).unwrap(),
            byline: Regex::new(
                r"(?i)byline|author|dateline|writtenby|p-author"
            ).unwrap(),
            normalize: Regex::new(
                r"\s{2,}"
            ).unwrap(),
            videos: Regex::new(
                r"(?i)//(www\.)?((dailymotion|youtube|youtube-nocookie|player\.vimeo|v\.qq)\.com|(archive|upload\.wikimedia)\.org|player\.twitch\.tv)"
            ).unwrap(),
            share_elements: Regex::new(
                r"(?i)(\b|_)(share|sharedaddy)(\b|_)"
            ).unwrap(),
            hash_url: Regex::new(
                r"^#.+"
            ).unwrap(),
            commas: Regex::new(
                "[\u{002C}\u{060C}\u{FE50}\u{FE10}\u{FE11}\u{2E41}\u{2E34}\u{2E32}\u{FF0C}]"
            ).unwrap(),
            json_ld_article_types: Regex::new(
                r"^(Article|AdvertiserContentArticle|NewsArticle|AnalysisNewsArticle|AskPublicNewsArticle|BackgroundNewsArticle|OpinionNewsArticle|ReportageNewsArticle|ReviewNewsArticle|Report|SatiricalArticle|ScholarlyArticle|MedicalScholarlyArticle|SocialMediaPosting|BlogPosting|LiveBlogPosting|DiscussionForumPosting|TechArticle|APIReference)$"
            ).unwrap(),
            schema_dot_org: Regex::new(
                r"^https?://schema\.org/?$"
            ).unwrap(),
            srcset_url: Regex::new(
                r"(\S+)(\s+[\d.]+[xw])?(\s*(?:,|$))"
            ).unwrap(),
            b64_data_url: Regex::new(
                r"(?i)^data:\s*([^\s;,]+)\s*;\s*base64\s*,"
            ).unwrap(),
            tokenize: Regex::new(
                r"\W+"
            ).unwrap(),
            whitespace: Regex::new(
                r"^\s*$"
            ).unwrap(),
            has_content: Regex::new(
                r"\S"
            ).unwrap(),
            next_sentence: Regex::new(
                r"\.( |$)"
            ).unwrap(),
            lazy_srcset: Regex::new(
                r"(?i)\.(jpg|jpeg|png|webp)\s+\d"
            ).unwrap(),
            lazy_src: Regex::new(
                r"(?i)^\s*\S+\.(jpg|jpeg|png|webp)\S*\s*$"
            ).unwrap(),
            image_ext: Regex::new(
                r"(?i)\.(jpg|jpeg|png|webp)"
            ).unwrap(),
        }
    }
}
