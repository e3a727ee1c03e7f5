//! Content score bookkeeping.
//!
//! Scores are transient per-parse state. Rather than hanging fields off the
//! host DOM, they live in a [`ScoreMap`] side table keyed by node identity
//! (the `Rc` pointer backing each [`NodeRef`]); the map holds a clone of
//! every scored node so a key can never be reused by a reallocation. The
//! table is dropped with the extractor when the parse ends.

use crate::constants::{ParseFlags, REGEXPS};
use crate::dom::NodeExt;
use kuchikikiki::{Node, NodeRef};
use std::collections::HashMap;

struct Entry {
    // Keeps the Rc alive for as long as the key is in use
    _node: NodeRef,
    content_score: f64,
}

#[derive(Default)]
pub struct ScoreMap {
    entries: HashMap<usize, Entry>,
}

fn key_of(node: &NodeRef) -> usize {
    let ptr: *const Node = &**node;
    ptr as usize
}

impl ScoreMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_initialized(&self, node: &NodeRef) -> bool {
        self.entries.contains_key(&key_of(node))
    }

    pub fn get(&self, node: &NodeRef) -> Option<f64> {
        self.entries.get(&key_of(node)).map(|e| e.content_score)
    }

    pub fn set(&mut self, node: &NodeRef, score: f64) {
        self.entries
            .entry(key_of(node))
            .or_insert_with(|| Entry {
                _node: node.clone(),
                content_score: 0.0,
            })
            .content_score = score;
    }

    pub fn add(&mut self, node: &NodeRef, delta: f64) {
        if let Some(entry) = self.entries.get_mut(&key_of(node)) {
            entry.content_score += delta;
        }
    }

    /// Carry a score across a retag: the replacement node inherits the
    /// original's annotation.
    pub fn transfer(&mut self, from: &NodeRef, to: &NodeRef) {
        if let Some(entry) = self.entries.remove(&key_of(from)) {
            self.set(to, entry.content_score);
        }
    }

    /// Attach the initial annotation: base score by tag plus class weight.
    pub fn initialize_node(&mut self, node: &NodeRef, flags: ParseFlags) {
        let mut score = match node.tag_name().as_deref() {
            Some("div") => 5.0,
            Some("pre") | Some("td") | Some("blockquote") => 3.0,
            Some("address") | Some("ol") | Some("ul") | Some("dl") | Some("dd") | Some("dt")
            | Some("li") | Some("form") => -3.0,
            Some("h1") | Some("h2") | Some("h3") | Some("h4") | Some("h5") | Some("h6")
            | Some("th") => -5.0,
            _ => 0.0,
        };
        score += f64::from(get_class_weight(node, flags));
        self.set(node, score);
    }
}

/// Class/id weight: ±25 per matching attribute, 0 when the weight-classes
/// flag has been relaxed.
pub fn get_class_weight(node: &NodeRef, flags: ParseFlags) -> i32 {
    if !flags.contains(ParseFlags::WEIGHT_CLASSES) {
        return 0;
    }

    let mut weight = 0;

    let class_name = node.class_name();
    if !class_name.is_empty() {
        if REGEXPS.negative.is_match(&class_name) {
            weight -= 25;
        }
        if REGEXPS.positive.is_match(&class_name) {
            weight += 25;
        }
    }

    let id = node.id_attr();
    if !id.is_empty() {
        if REGEXPS.negative.is_match(&id) {
            weight -= 25;
        }
        if REGEXPS.positive.is_match(&id) {
            weight += 25;
        }
    }

    weight
}

/// Ratio of anchor text to total text, with same-page hash links weighted
/// at 0.3. Always within [0, 1] for sane inputs; 0 for empty elements.
pub fn get_link_density(node: &NodeRef) -> f64 {
    let text_length = node.inner_text(true).chars().count();
    if text_length == 0 {
        return 0.0;
    }

    let mut link_length = 0.0;
    for link in node.nodes_with_tag(&["a"]) {
        let coefficient = match link.attr("href") {
            Some(href) if REGEXPS.hash_url.is_match(&href) => 0.3,
            _ => 1.0,
        };
        link_length += link.inner_text(true).chars().count() as f64 * coefficient;
    }

    link_length / text_length as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchikikiki::traits::TendrilSink;

    fn parse(html: &str) -> NodeRef {
        kuchikikiki::parse_html().one(html)
    }

    fn select(doc: &NodeRef, sel: &str) -> NodeRef {
        doc.select_first(sel).unwrap().as_node().clone()
    }

    #[test]
    fn test_initialize_node_base_scores() {
        let doc = parse("<html><body><div id='d'></div><pre id='p'></pre><ul id='u'></ul><h2 id='h'></h2><span id='s'></span></body></html>");
        let mut scores = ScoreMap::new();
        let flags = ParseFlags::empty();
        for (sel, expected) in [
            ("#d", 5.0),
            ("#p", 3.0),
            ("#u", -3.0),
            ("#h", -5.0),
            ("#s", 0.0),
        ] {
            let node = select(&doc, sel);
            scores.initialize_node(&node, flags);
            assert_eq!(scores.get(&node), Some(expected), "selector {}", sel);
        }
    }

    #[test]
    fn test_class_weight_positive_and_negative() {
        let doc = parse(r#"<html><body><div id="a" class="article-body"></div><div id="b" class="sidebar"></div><div id="c" class="sidebar article"></div></body></html>"#);
        let flags = ParseFlags::all();
        assert_eq!(get_class_weight(&select(&doc, "#a"), flags), 25);
        assert_eq!(get_class_weight(&select(&doc, "#b"), flags), -25);
        assert_eq!(get_class_weight(&select(&doc, "#c"), flags), 0);
    }

    #[test]
    fn test_class_weight_disabled_by_flag() {
        let doc = parse(r#"<html><body><div class="sidebar"></div></body></html>"#);
        let node = select(&doc, "div");
        assert_eq!(get_class_weight(&node, ParseFlags::empty()), 0);
    }

    #[test]
    fn test_link_density_bounds() {
        let doc = parse(r#"<html><body><div id="all"><a href="/x">everything linked</a></div><div id="none">plain text only here</div><div id="empty"></div></body></html>"#);
        let all = get_link_density(&select(&doc, "#all"));
        assert!((all - 1.0).abs() < 0.01);
        assert_eq!(get_link_density(&select(&doc, "#none")), 0.0);
        assert_eq!(get_link_density(&select(&doc, "#empty")), 0.0);
    }

    #[test]
    fn test_link_density_hash_links_weighted() {
        let doc = parse(r##"<html><body><div><a href="#section">0123456789</a></div></body></html>"##);
        let div = select(&doc, "div");
        let density = get_link_density(&div);
        assert!((density - 0.3).abs() < 0.01);
    }

    #[test]
    fn test_score_transfer_on_retag() {
        let doc = parse("<html><body><div>text</div></body></html>");
        let div = select(&doc, "div");
        let mut scores = ScoreMap::new();
        scores.set(&div, 42.0);
        let p = div.set_node_tag("p");
        scores.transfer(&div, &p);
        assert_eq!(scores.get(&p), Some(42.0));
        assert!(scores.get(&div).is_none());
    }
}
