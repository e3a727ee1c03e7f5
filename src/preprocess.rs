//! Document normalization ahead of extraction.
//!
//! Runs once per parse, in this order: unwrap `<noscript>` image fallbacks
//! (while scripts are still in the tree), drop `<script>`/`<noscript>`,
//! then `prep_document` (style removal, `<br>`-run conversion,
//! `<font>`→`<span>`). Reordering the first two steps would lose the
//! lazy-image fallbacks, so don't.

use crate::constants::REGEXPS;
use crate::dom::{self, NodeExt};
use kuchikikiki::traits::TendrilSink;
use kuchikikiki::NodeRef;

/// Replace low-quality lazy-load `<img>` placeholders with the real images
/// kept inside a neighboring `<noscript>` fallback.
pub fn unwrap_noscript_images(doc: &NodeRef) {
    // Placeholder imgs carrying no usable source at all contribute nothing
    for img in doc.nodes_with_tag(&["img"]) {
        let keep = img
            .node()
            .as_element()
            .map(|e| {
                e.attributes.borrow().map.iter().any(|(name, attr)| {
                    matches!(
                        name.local.as_ref(),
                        "src" | "srcset" | "data-src" | "data-srcset"
                    ) || REGEXPS.image_ext.is_match(&attr.value)
                })
            })
            .unwrap_or(false);
        if !keep {
            img.detach();
        }
    }

    for noscript in doc.nodes_with_tag(&["noscript"]) {
        // The parser treats noscript content as raw text, so materialize it
        // the way a scriptless browser would before inspecting it
        let inner_markup = if noscript.element_children().is_empty() {
            noscript.text_contents()
        } else {
            dom::inner_html(&noscript)
        };
        let tmp = kuchikikiki::parse_html()
            .one(format!("<html><body>{}</body></html>", inner_markup));
        let Ok(tmp_body) = tmp.select_first("body") else {
            continue;
        };
        let tmp_body = tmp_body.as_node().clone();

        if !is_single_image(&tmp_body) {
            continue;
        }
        let Some(prev) = noscript.previous_element_sibling() else {
            continue;
        };
        if !is_single_image(&prev) {
            continue;
        }

        let prev_img = if prev.has_tag("img") {
            prev.clone()
        } else {
            match prev.nodes_with_tag(&["img"]).into_iter().next() {
                Some(img) => img,
                None => continue,
            }
        };
        let Some(new_img) = tmp_body.nodes_with_tag(&["img"]).into_iter().next() else {
            continue;
        };

        // Carry the placeholder's source-bearing attributes over, renaming
        // them when the fallback image already uses the slot
        if let Some(prev_elem) = prev_img.node().as_element() {
            let prev_attrs: Vec<(String, String)> = prev_elem
                .attributes
                .borrow()
                .map
                .iter()
                .map(|(name, attr)| (name.local.as_ref().to_string(), attr.value.clone()))
                .collect();
            for (name, value) in prev_attrs {
                if value.is_empty() {
                    continue;
                }
                if name != "src" && name != "srcset" && !REGEXPS.image_ext.is_match(&value) {
                    continue;
                }
                if new_img.attr(&name).as_deref() == Some(value.as_str()) {
                    continue;
                }
                let attr_name = if new_img.has_attr(&name) {
                    format!("data-old-{}", name)
                } else {
                    name
                };
                new_img.set_attr(&attr_name, &value);
            }
        }

        if let Some(replacement) = tmp_body.first_element_child() {
            prev.replace_with(&replacement);
        }
    }
}

/// Drop every `<script>` and `<noscript>` in the document.
pub fn remove_scripts(doc: &NodeRef) {
    for node in doc.nodes_with_tag(&["script", "noscript"]) {
        node.detach();
    }
}

/// Prepare the document for extraction: remove styles, convert `<br>` runs
/// into paragraphs, and retag deprecated `<font>` elements.
pub fn prep_document(doc: &NodeRef) {
    for style in doc.nodes_with_tag(&["style"]) {
        style.detach();
    }

    if let Ok(body) = doc.select_first("body") {
        replace_brs(body.as_node());
    }

    for font in doc.nodes_with_tag(&["font"]) {
        font.set_node_tag("span");
    }
}

/// Collapse runs of two or more `<br>` elements into paragraph breaks.
///
/// The first `<br>` of a run becomes a `<p>` that absorbs the following
/// phrasing content, stopping at block elements or the next `<br>` run.
pub fn replace_brs(elem: &NodeRef) {
    for br in elem.nodes_with_tag(&["br"]) {
        if br.parent().is_none() {
            // consumed by an earlier run
            continue;
        }

        let mut replaced = false;
        let mut next = dom::next_skipping_whitespace(br.next_sibling());
        while let Some(node) = next {
            if !node.has_tag("br") {
                break;
            }
            replaced = true;
            let br_sibling = node.next_sibling();
            node.detach();
            next = dom::next_skipping_whitespace(br_sibling);
        }

        if !replaced {
            continue;
        }

        let p = dom::create_element("p");
        br.replace_with(&p);

        let mut next = p.next_sibling();
        while let Some(node) = next {
            // A second consecutive <br> seeds the next paragraph
            if node.has_tag("br") {
                if let Some(after) = dom::next_skipping_whitespace(node.next_sibling()) {
                    if after.has_tag("br") {
                        break;
                    }
                }
            }
            if !node.is_phrasing_content() {
                break;
            }
            let sibling = node.next_sibling();
            p.append(node);
            next = sibling;
        }

        while let Some(last) = p.last_child() {
            if !last.is_whitespace_node() {
                break;
            }
            last.detach();
        }

        if let Some(parent) = p.parent() {
            if parent.has_tag("p") {
                parent.set_node_tag("div");
            }
        }
    }
}

fn is_single_image(node: &NodeRef) -> bool {
    if node.has_tag("img") {
        return true;
    }
    let children = node.element_children();
    if children.len() != 1 || !node.text_contents().trim().is_empty() {
        return false;
    }
    is_single_image(&children[0])
}
