//! Final polishing of extracted content before serialization.
//!
//! Three passes, in order: relative→absolute URI rewriting, nested-wrapper
//! simplification, and class stripping. All three are idempotent; URI
//! resolution failures keep the original string rather than erroring.

use crate::constants::REGEXPS;
use crate::dom::{self, NodeExt};
use crate::options::ReaderOptions;
use kuchikikiki::NodeRef;
use url::Url;

/// Run the post-processing passes over the assembled article.
///
/// `base_uri` is the resolution base (the document's `<base href>` when
/// present, otherwise its URI); `document_uri` is the page's own address.
/// When no base is known, URI rewriting is skipped.
pub fn post_process_content(
    article_content: &NodeRef,
    base_uri: Option<&str>,
    document_uri: Option<&str>,
    options: &ReaderOptions,
) {
    if let Some(base) = base_uri {
        fix_relative_uris(article_content, base, document_uri.unwrap_or(base));
    }

    simplify_nested_elements(article_content);

    if !options.keep_classes {
        clean_classes(article_content, &options.classes_to_preserve);
    }
}

fn to_absolute_uri(uri: &str, base_uri: &str, document_uri: &str) -> String {
    // Same-page hash links stay as written when no <base> redirects them
    if base_uri == document_uri && uri.starts_with('#') {
        return uri.to_string();
    }

    match Url::parse(base_uri).and_then(|base| base.join(uri)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => uri.to_string(),
    }
}

/// Rewrite `href`, `src`, `poster`, and `srcset` attributes to absolute
/// URIs. Links with `javascript:` targets are replaced by their text.
fn fix_relative_uris(article_content: &NodeRef, base_uri: &str, document_uri: &str) {
    for link in article_content.nodes_with_tag(&["a"]) {
        let Some(href) = link.attr("href") else { continue };

        if href.starts_with("javascript:") {
            // The link does nothing without scripts; keep its content only
            let children = link.child_nodes();
            if children.len() == 1 && children[0].as_text().is_some() {
                let text = NodeRef::new_text(link.text_contents());
                link.replace_with(&text);
            } else {
                let container = dom::create_element("span");
                for child in children {
                    container.append(child);
                }
                link.replace_with(&container);
            }
        } else {
            link.set_attr("href", &to_absolute_uri(&href, base_uri, document_uri));
        }
    }

    for media in article_content.nodes_with_tag(&["img", "picture", "figure", "video", "audio", "source"])
    {
        if let Some(src) = media.attr("src") {
            media.set_attr("src", &to_absolute_uri(&src, base_uri, document_uri));
        }
        if let Some(poster) = media.attr("poster") {
            media.set_attr("poster", &to_absolute_uri(&poster, base_uri, document_uri));
        }
        if let Some(srcset) = media.attr("srcset") {
            let new_srcset = REGEXPS.srcset_url.replace_all(&srcset, |caps: &regex::Captures| {
                format!(
                    "{}{}{}",
                    to_absolute_uri(&caps[1], base_uri, document_uri),
                    caps.get(2).map(|m| m.as_str()).unwrap_or(""),
                    &caps[3]
                )
            });
            media.set_attr("srcset", &new_srcset);
        }
    }
}

/// Collapse pointless `<div>`/`<section>` nesting.
///
/// Wrappers generated by the extractor (ids starting with `readability`)
/// are left alone; empty wrappers are removed, and a wrapper whose only
/// content is another wrapper is replaced by the child, inheriting the
/// parent's attributes.
fn simplify_nested_elements(article_content: &NodeRef) {
    let mut node_opt = Some(article_content.clone());
    while let Some(node) = node_opt {
        let is_wrapper = node.has_tag("div") || node.has_tag("section");
        if node.parent_element().is_some()
            && is_wrapper
            && !node.id_attr().starts_with("readability")
        {
            if node.is_element_without_content() {
                node_opt = dom::remove_and_get_next(node);
                continue;
            }
            if node.has_single_tag_inside("div") || node.has_single_tag_inside("section") {
                let child = node.element_children().remove(0);
                if let (Some(parent_elem), Some(child_elem)) =
                    (node.node().as_element(), child.as_element())
                {
                    let parent_attrs = parent_elem.attributes.borrow();
                    let mut child_attrs = child_elem.attributes.borrow_mut();
                    for (name, attr) in parent_attrs.map.iter() {
                        child_attrs
                            .map
                            .insert(name.clone(), attr.clone());
                    }
                }
                node.replace_with(&child);
                node_opt = Some(child);
                continue;
            }
        }
        node_opt = dom::next_in_tree(&node, false);
    }
}

/// Drop every class token not in `classes_to_preserve`; remove the
/// attribute entirely when nothing remains.
fn clean_classes(node: &NodeRef, classes_to_preserve: &[String]) {
    if node.is_element() {
        let class_name = node.class_name();
        let kept: Vec<&str> = class_name
            .split_whitespace()
            .filter(|cls| classes_to_preserve.iter().any(|keep| keep == cls))
            .collect();
        if kept.is_empty() {
            node.remove_attr("class");
        } else {
            node.set_attr("class", &kept.join(" "));
        }
    }

    let mut cur = node.first_element_child();
    while let Some(child) = cur {
        clean_classes(&child, classes_to_preserve);
        cur = child.next_element_sibling();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::inner_html;
    use kuchikikiki::traits::TendrilSink;

    fn parse_body(html: &str) -> NodeRef {
        let doc = kuchikikiki::parse_html().one(format!("<html><body>{}</body></html>", html));
        doc.select_first("body").unwrap().as_node().clone()
    }

    fn post(html: &str, base: Option<&str>) -> String {
        let body = parse_body(html);
        let options = ReaderOptions::default();
        post_process_content(&body, base, base, &options);
        inner_html(&body)
    }

    #[test]
    fn test_relative_href_resolved() {
        let out = post(
            r#"<p><a href="/about">about</a></p>"#,
            Some("http://x.test/a/"),
        );
        assert!(out.contains(r#"href="http://x.test/about""#), "{}", out);
    }

    #[test]
    fn test_img_src_resolved() {
        let out = post(r#"<p><img src="pic.jpg"></p>"#, Some("http://x.test/a/"));
        assert!(out.contains(r#"src="http://x.test/a/pic.jpg""#), "{}", out);
    }

    #[test]
    fn test_srcset_urls_resolved() {
        let out = post(
            r#"<p><img srcset="a.jpg 1x, b.jpg 2x"></p>"#,
            Some("http://x.test/dir/"),
        );
        assert!(
            out.contains("http://x.test/dir/a.jpg 1x") && out.contains("http://x.test/dir/b.jpg 2x"),
            "{}",
            out
        );
    }

    #[test]
    fn test_hash_link_preserved_when_base_matches() {
        let out = post(r##"<p><a href="#note">note</a></p>"##, Some("http://x.test/p"));
        assert!(out.contains(r##"href="#note""##), "{}", out);
    }

    #[test]
    fn test_unresolvable_uri_kept() {
        let out = post(r#"<p><a href="http://[bad">x</a></p>"#, Some("http://x.test/"));
        assert!(out.contains("http://[bad"), "{}", out);
    }

    #[test]
    fn test_javascript_link_single_text_becomes_text() {
        let out = post(
            r#"<p><a href="javascript:foo()">click</a></p>"#,
            Some("http://x.test/"),
        );
        assert!(!out.contains("<a"), "{}", out);
        assert!(out.contains("click"), "{}", out);
    }

    #[test]
    fn test_javascript_link_rich_content_becomes_span() {
        let out = post(
            r#"<p><a href="javascript:void(0)"><em>go</em> now</a></p>"#,
            Some("http://x.test/"),
        );
        assert!(!out.contains("<a"), "{}", out);
        assert!(out.contains("<span><em>go</em> now</span>"), "{}", out);
    }

    #[test]
    fn test_no_base_skips_rewriting() {
        let out = post(r#"<p><a href="/rel">x</a></p>"#, None);
        assert!(out.contains(r#"href="/rel""#), "{}", out);
    }

    #[test]
    fn test_empty_wrapper_removed() {
        let out = post("<div><p>text</p></div><div><br><hr></div>", Some("http://x.test/"));
        assert!(out.contains("<p>text</p>"), "{}", out);
        assert!(!out.contains("<br>"), "{}", out);
    }

    #[test]
    fn test_nested_wrapper_collapsed_with_attributes() {
        let out = post(
            r#"<div data-outer="1"><div data-inner="2"><p>deep</p></div></div>"#,
            Some("http://x.test/"),
        );
        assert!(out.contains(r#"data-outer="1""#), "{}", out);
        assert!(out.contains(r#"data-inner="2""#), "{}", out);
        assert_eq!(out.matches("<div").count(), 1, "{}", out);
    }

    #[test]
    fn test_readability_wrapper_untouched() {
        let out = post(
            r#"<div id="readability-page-1" class="page"><div><p>x</p></div></div>"#,
            Some("http://x.test/"),
        );
        assert!(out.contains("readability-page-1"), "{}", out);
    }

    #[test]
    fn test_classes_stripped_except_preserved() {
        let out = post(
            r#"<div class="page"><p class="lede intro">x</p></div>"#,
            Some("http://x.test/"),
        );
        assert!(out.contains(r#"class="page""#), "{}", out);
        assert!(!out.contains("lede"), "{}", out);
    }

    #[test]
    fn test_keep_classes_option() {
        let body = parse_body(r#"<p class="fancy">x</p>"#);
        let options = ReaderOptions::builder().keep_classes(true).build();
        post_process_content(&body, None, None, &options);
        assert!(inner_html(&body).contains("fancy"));
    }

    #[test]
    fn test_post_processing_is_idempotent() {
        let body = parse_body(
            r#"<div><div><p><a href="/x">x</a> and <img src="i.jpg" srcset="a.jpg 1x"></p></div></div>"#,
        );
        let options = ReaderOptions::default();
        post_process_content(&body, Some("http://x.test/"), Some("http://x.test/"), &options);
        let once = inner_html(&body);
        post_process_content(&body, Some("http://x.test/"), Some("http://x.test/"), &options);
        let twice = inner_html(&body);
        assert_eq!(once, twice);
    }
}
