//! DOM access layer over `kuchikikiki`.
//!
//! Every mutating pipeline stage works through [`NodeExt`], an extension
//! trait on [`NodeRef`] that provides element-oriented traversal, attribute
//! access, and retagging. Traversals that mutate always snapshot child lists
//! into `Vec`s first; nothing here iterates a live sibling chain while
//! rearranging it.

use crate::constants::{DIV_TO_P_ELEMS, PHRASING_ELEMS, REGEXPS};
use crate::text;
use html5ever::{namespace_url, ns, LocalName, QualName};
use kuchikikiki::iter::NodeIterator;
use kuchikikiki::NodeRef;
use once_cell::sync::Lazy;
use regex::Regex;

static DISPLAY_NONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)display\s*:\s*none").unwrap());
static VISIBILITY_HIDDEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)visibility\s*:\s*hidden").unwrap());

/// Build an HTML-namespaced qualified name for element creation.
pub fn qual_name(tag: &str) -> QualName {
    QualName::new(None, ns!(html), LocalName::from(tag))
}

/// Create a detached element with no attributes.
pub fn create_element(tag: &str) -> NodeRef {
    NodeRef::new_element(qual_name(tag), std::iter::empty())
}

/// Serialize a node including its own tag.
pub fn outer_html(node: &NodeRef) -> String {
    let mut buffer = Vec::new();
    if node.serialize(&mut buffer).is_err() {
        return node.text_contents();
    }
    String::from_utf8(buffer).unwrap_or_else(|_| node.text_contents())
}

/// Serialize a node's children only.
pub fn inner_html(node: &NodeRef) -> String {
    let mut buffer = Vec::new();
    for child in node.children() {
        if child.serialize(&mut buffer).is_err() {
            return node.text_contents();
        }
    }
    String::from_utf8(buffer).unwrap_or_else(|_| node.text_contents())
}

/// Skip forward over whitespace-only non-element nodes, starting at `start`.
///
/// Mirrors the sibling-walking used by `<br>` chain collapsing: given a node
/// (possibly a text node), returns the first node from there on that is an
/// element or carries non-whitespace text.
pub fn next_skipping_whitespace(start: Option<NodeRef>) -> Option<NodeRef> {
    let mut current = start;
    while let Some(node) = current {
        if node.as_element().is_some() || !REGEXPS.whitespace.is_match(&node.text_contents()) {
            return Some(node);
        }
        current = node.next_sibling();
    }
    None
}

/// Depth-first successor among elements.
///
/// With `ignore_self_and_kids` the subtree below `node` is skipped, which is
/// what removal wants: the next element after a deleted node is its next
/// sibling or an ancestor's.
pub fn next_in_tree(node: &NodeRef, ignore_self_and_kids: bool) -> Option<NodeRef> {
    if !ignore_self_and_kids {
        if let Some(child) = node.first_element_child() {
            return Some(child);
        }
    }
    if let Some(sibling) = node.next_element_sibling() {
        return Some(sibling);
    }
    let mut parent = node.parent();
    while let Some(p) = parent {
        if p.as_element().is_none() {
            break;
        }
        if let Some(sibling) = p.next_element_sibling() {
            return Some(sibling);
        }
        parent = p.parent();
    }
    None
}

/// Detach `node` and return the element that traversal should visit next.
pub fn remove_and_get_next(node: NodeRef) -> Option<NodeRef> {
    let next = next_in_tree(&node, true);
    node.detach();
    next
}

pub trait NodeExt {
    fn node(&self) -> &NodeRef;

    fn is_element(&self) -> bool {
        self.node().as_element().is_some()
    }

    /// Lowercase local tag name, `None` for non-elements.
    fn tag_name(&self) -> Option<String> {
        self.node()
            .as_element()
            .map(|e| e.name.local.as_ref().to_string())
    }

    fn has_tag(&self, tag: &str) -> bool {
        self.node()
            .as_element()
            .map(|e| e.name.local.as_ref().eq_ignore_ascii_case(tag))
            .unwrap_or(false)
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.node()
            .as_element()
            .and_then(|e| e.attributes.borrow().get(name).map(|v| v.to_string()))
    }

    fn has_attr(&self, name: &str) -> bool {
        self.node()
            .as_element()
            .map(|e| e.attributes.borrow().contains(name))
            .unwrap_or(false)
    }

    fn set_attr(&self, name: &str, value: &str) {
        if let Some(e) = self.node().as_element() {
            e.attributes.borrow_mut().insert(name, value.to_string());
        }
    }

    fn remove_attr(&self, name: &str) {
        if let Some(e) = self.node().as_element() {
            e.attributes.borrow_mut().remove(name);
        }
    }

    fn class_name(&self) -> String {
        self.attr("class").unwrap_or_default()
    }

    fn id_attr(&self) -> String {
        self.attr("id").unwrap_or_default()
    }

    /// `class + " " + id`, the string every class/id heuristic matches on.
    fn match_string(&self) -> String {
        format!("{} {}", self.class_name(), self.id_attr())
    }

    /// Static snapshot of all child nodes (elements and text).
    fn child_nodes(&self) -> Vec<NodeRef> {
        self.node().children().collect()
    }

    /// Static snapshot of element children.
    fn element_children(&self) -> Vec<NodeRef> {
        self.node()
            .children()
            .filter(|c| c.as_element().is_some())
            .collect()
    }

    fn first_element_child(&self) -> Option<NodeRef> {
        self.node().children().find(|c| c.as_element().is_some())
    }

    fn next_element_sibling(&self) -> Option<NodeRef> {
        let mut current = self.node().next_sibling();
        while let Some(node) = current {
            if node.as_element().is_some() {
                return Some(node);
            }
            current = node.next_sibling();
        }
        None
    }

    fn previous_element_sibling(&self) -> Option<NodeRef> {
        let mut current = self.node().previous_sibling();
        while let Some(node) = current {
            if node.as_element().is_some() {
                return Some(node);
            }
            current = node.previous_sibling();
        }
        None
    }

    fn parent_element(&self) -> Option<NodeRef> {
        self.node().parent().filter(|p| p.as_element().is_some())
    }

    /// Element ancestors nearest-first, at most `max_depth` levels
    /// (0 = unbounded).
    fn element_ancestors(&self, max_depth: usize) -> Vec<NodeRef> {
        let mut ancestors = Vec::new();
        let mut current = self.parent_element();
        while let Some(node) = current {
            current = node.parent_element();
            ancestors.push(node);
            if max_depth > 0 && ancestors.len() == max_depth {
                break;
            }
        }
        ancestors
    }

    /// Whether an ancestor within `max_depth` levels (negative = unbounded)
    /// has the given tag and passes `filter`.
    fn has_ancestor_tag(
        &self,
        tag: &str,
        max_depth: i32,
        filter: Option<&dyn Fn(&NodeRef) -> bool>,
    ) -> bool {
        let mut depth = 0;
        let mut current = self.node().parent();
        while let Some(parent) = current {
            if max_depth > 0 && depth > max_depth {
                return false;
            }
            if parent.has_tag(tag) && filter.map(|f| f(&parent)).unwrap_or(true) {
                return true;
            }
            current = parent.parent();
            depth += 1;
        }
        false
    }

    /// Concatenated descendant text, trimmed; whitespace runs collapsed when
    /// `normalize` is set.
    fn inner_text(&self, normalize: bool) -> String {
        let content = self.node().text_contents();
        let trimmed = content.trim();
        if normalize {
            text::normalize_spaces(trimmed)
        } else {
            trimmed.to_string()
        }
    }

    /// Static snapshot, in tree order, of descendant elements matching any
    /// of `tags`.
    fn nodes_with_tag(&self, tags: &[&str]) -> Vec<NodeRef> {
        self.node()
            .descendants()
            .elements()
            .filter(|e| tags.iter().any(|t| e.name.local.as_ref().eq_ignore_ascii_case(t)))
            .map(|e| e.as_node().clone())
            .collect()
    }

    /// Whitespace-only text node, or a `<br>`.
    fn is_whitespace_node(&self) -> bool {
        if let Some(text) = self.node().as_text() {
            return text.borrow().trim().is_empty();
        }
        self.has_tag("br")
    }

    /// Text nodes, the phrasing element set, and `<a>`/`<del>`/`<ins>`
    /// whose children are all phrasing content.
    fn is_phrasing_content(&self) -> bool {
        if self.node().as_text().is_some() {
            return true;
        }
        let Some(tag) = self.tag_name() else {
            return false;
        };
        if PHRASING_ELEMS.contains(&tag.as_str()) {
            return true;
        }
        (tag == "a" || tag == "del" || tag == "ins")
            && self
                .node()
                .children()
                .all(|child| child.is_phrasing_content())
    }

    /// No text and no children beyond `<br>`/`<hr>`.
    fn is_element_without_content(&self) -> bool {
        if !self.is_element() {
            return false;
        }
        if !self.node().text_contents().trim().is_empty() {
            return false;
        }
        let children = self.element_children();
        children.is_empty()
            || children.len()
                == self.nodes_with_tag(&["br"]).len() + self.nodes_with_tag(&["hr"]).len()
    }

    /// Exactly one element child with the given tag, and no text content
    /// alongside it.
    fn has_single_tag_inside(&self, tag: &str) -> bool {
        let children = self.element_children();
        if children.len() != 1 || !children[0].has_tag(tag) {
            return false;
        }
        !self.node().children().any(|node| {
            node.as_text()
                .map(|t| REGEXPS.has_content.is_match(&t.borrow()))
                .unwrap_or(false)
        })
    }

    /// Any descendant from the block set that stops div→p collapsing.
    fn has_child_block_element(&self) -> bool {
        self.node().children().any(|child| {
            child
                .tag_name()
                .map(|t| DIV_TO_P_ELEMS.contains(&t.as_str()))
                .unwrap_or(false)
                || child.has_child_block_element()
        })
    }

    /// Inline-style and attribute visibility check.
    ///
    /// `aria-hidden="true"` is overridden by a `fallback-image` class so
    /// math fallback renderings survive.
    fn is_probably_visible(&self) -> bool {
        if let Some(style) = self.attr("style") {
            if DISPLAY_NONE.is_match(&style) || VISIBILITY_HIDDEN.is_match(&style) {
                return false;
            }
        }
        if self.has_attr("hidden") {
            return false;
        }
        if self.attr("aria-hidden").as_deref() == Some("true")
            && !self.class_name().contains("fallback-image")
        {
            return false;
        }
        true
    }

    /// Swap in a replacement node at this node's position.
    fn replace_with(&self, replacement: &NodeRef) {
        self.node().insert_before(replacement.clone());
        self.node().detach();
    }

    /// Rebuild this element under a new tag, carrying over attributes and
    /// children, and return the replacement.
    fn set_node_tag(&self, tag: &str) -> NodeRef {
        let node = self.node();
        let Some(elem) = node.as_element() else {
            return node.clone();
        };
        let attributes = elem.attributes.borrow();
        let replacement = NodeRef::new_element(qual_name(tag), attributes.map.clone());
        drop(attributes);
        for child in node.children().collect::<Vec<_>>() {
            replacement.append(child);
        }
        node.replace_with(&replacement);
        replacement
    }
}

impl NodeExt for NodeRef {
    #[inline]
    fn node(&self) -> &NodeRef {
        self
    }
}
