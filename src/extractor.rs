//! The extraction engine: traversal, scoring, candidate election, sibling
//! assembly, and the retry loop.
//!
//! One [`Extractor`] lives for the duration of a single parse. Each attempt
//! walks the document, filters unlikely candidates, promotes div content to
//! paragraphs, scores text-bearing elements into a per-attempt [`ScoreMap`],
//! elects a top candidate, and assembles its qualifying siblings into a
//! fresh container. Attempts that yield too little text restore the
//! document from a cached snapshot and relax one filtering flag; when all
//! flags are spent the longest attempt wins.

use crate::constants::{
    ParseFlags, ALTER_TO_DIV_EXCEPTIONS, DEFAULT_TAGS_TO_SCORE, REGEXPS,
    SCORE_PROPAGATION_DEPTH, UNLIKELY_ROLES,
};
use crate::dom::{self, NodeExt};
use crate::options::ReaderOptions;
use crate::prep;
use crate::scoring::{self, ScoreMap};
use crate::text;
use kuchikikiki::traits::TendrilSink;
use kuchikikiki::NodeRef;

const MINIMUM_TOP_CANDIDATES: usize = 3;

/// Outcome of a successful grab.
pub struct Extraction {
    pub article_content: NodeRef,
    pub byline: Option<String>,
    pub dir: Option<String>,
}

struct Attempt {
    article_content: NodeRef,
    text_length: usize,
}

pub struct Extractor<'a> {
    options: &'a ReaderOptions,
    flags: ParseFlags,
    article_title: String,
    metadata_has_byline: bool,
    byline: Option<String>,
    attempts: Vec<Attempt>,
}

impl<'a> Extractor<'a> {
    pub fn new(options: &'a ReaderOptions, article_title: &str, metadata_has_byline: bool) -> Self {
        Self {
            options,
            flags: ParseFlags::all(),
            article_title: article_title.to_string(),
            metadata_has_byline,
            byline: None,
            attempts: Vec::new(),
        }
    }

    fn log(&self, message: &str) {
        if self.options.debug {
            eprintln!("Reader: (Extractor) {}", message);
        }
    }

    /// Run the full grab loop against `doc`, mutating it in place.
    pub fn run(mut self, doc: &NodeRef) -> Option<Extraction> {
        // Snapshot for retries: every pass starts from a pristine tree
        let cache_html = dom::outer_html(doc);
        let mut doc = doc.clone();
        let mut should_remove_title_header = true;

        loop {
            let mut scores = ScoreMap::new();
            let Ok(page) = doc.select_first("body") else {
                return None;
            };
            let page = page.as_node().clone();

            let elements_to_score =
                self.collect_candidates(&doc, &mut should_remove_title_header);
            let candidates = self.score_elements(&elements_to_score, &mut scores);

            let mut top_candidates: Vec<NodeRef> = Vec::new();
            for candidate in candidates {
                let link_density = scoring::get_link_density(&candidate);
                let adjusted = scores.get(&candidate).unwrap_or(0.0) * (1.0 - link_density);
                scores.set(&candidate, adjusted);

                for slot in 0..self.options.nb_top_candidates {
                    let slot_score = top_candidates
                        .get(slot)
                        .map(|existing| scores.get(existing).unwrap_or(0.0));
                    match slot_score {
                        None => {
                            top_candidates.push(candidate.clone());
                            break;
                        }
                        Some(existing_score) if adjusted > existing_score => {
                            top_candidates.insert(slot, candidate.clone());
                            if top_candidates.len() > self.options.nb_top_candidates {
                                top_candidates.pop();
                            }
                            break;
                        }
                        Some(_) => {}
                    }
                }
            }

            let (top_candidate, needed_to_create) =
                self.select_top_candidate(top_candidates, &page, &mut scores);

            let parent_of_top = top_candidate
                .parent_element()
                .unwrap_or_else(|| page.clone());
            let article_content =
                self.assemble_siblings(&top_candidate, &parent_of_top, &mut scores);

            prep::prep_article(&article_content, self.options, self.flags, &scores);

            if needed_to_create {
                // The fabricated container doubles as the page wrapper
                top_candidate.set_attr("id", "readability-page-1");
                top_candidate.set_attr("class", "page");
            } else {
                let div = dom::create_element("div");
                div.set_attr("id", "readability-page-1");
                div.set_attr("class", "page");
                for child in article_content.child_nodes() {
                    div.append(child);
                }
                article_content.append(div);
            }

            let text_length = article_content.inner_text(true).chars().count();
            if text_length >= self.options.char_threshold {
                let dir = find_article_dir(&parent_of_top, &top_candidate);
                return Some(Extraction {
                    article_content,
                    byline: self.byline,
                    dir,
                });
            }

            self.log(&format!(
                "attempt yielded {} chars (threshold {})",
                text_length, self.options.char_threshold
            ));
            self.attempts.push(Attempt {
                article_content,
                text_length,
            });

            if self.flags.contains(ParseFlags::STRIP_UNLIKELYS) {
                self.flags.remove(ParseFlags::STRIP_UNLIKELYS);
            } else if self.flags.contains(ParseFlags::WEIGHT_CLASSES) {
                self.flags.remove(ParseFlags::WEIGHT_CLASSES);
            } else if self.flags.contains(ParseFlags::CLEAN_CONDITIONALLY) {
                self.flags.remove(ParseFlags::CLEAN_CONDITIONALLY);
            } else {
                // Out of relaxations: the longest attempt is the answer
                self.attempts
                    .sort_by(|a, b| b.text_length.cmp(&a.text_length));
                let best = self.attempts.swap_remove(0);
                if best.text_length == 0 {
                    return None;
                }
                let dir = find_article_dir(&parent_of_top, &top_candidate);
                return Some(Extraction {
                    article_content: best.article_content,
                    byline: self.byline,
                    dir,
                });
            }

            doc = kuchikikiki::parse_html().one(cache_html.as_str());
        }
    }

    /// The C5 traversal: strip invisible/unlikely nodes, detect bylines,
    /// drop empty containers, promote div content, and gather scorables.
    fn collect_candidates(
        &mut self,
        doc: &NodeRef,
        should_remove_title_header: &mut bool,
    ) -> Vec<NodeRef> {
        let strip_unlikelys = self.flags.contains(ParseFlags::STRIP_UNLIKELYS);
        let mut elements_to_score: Vec<NodeRef> = Vec::new();

        let mut node_opt = doc
            .select_first("html")
            .ok()
            .map(|n| n.as_node().clone());

        while let Some(node) = node_opt {
            let match_string = node.match_string();

            if !node.is_probably_visible() {
                node_opt = dom::remove_and_get_next(node);
                continue;
            }

            if self.check_byline(&node, &match_string) {
                node_opt = dom::remove_and_get_next(node);
                continue;
            }

            if *should_remove_title_header && self.header_duplicates_title(&node) {
                *should_remove_title_header = false;
                node_opt = dom::remove_and_get_next(node);
                continue;
            }

            if strip_unlikelys {
                if REGEXPS.unlikely_candidates.is_match(&match_string)
                    && !REGEXPS.ok_maybe_its_a_candidate.is_match(&match_string)
                    && !node.has_ancestor_tag("table", 3, None)
                    && !node.has_ancestor_tag("code", 3, None)
                    && !node.has_tag("body")
                    && !node.has_tag("a")
                {
                    self.log(&format!("removing unlikely candidate: {}", match_string));
                    node_opt = dom::remove_and_get_next(node);
                    continue;
                }

                if let Some(role) = node.attr("role") {
                    if UNLIKELY_ROLES.contains(&role.as_str()) {
                        node_opt = dom::remove_and_get_next(node);
                        continue;
                    }
                }
            }

            let tag = node.tag_name().unwrap_or_default();

            if matches!(
                tag.as_str(),
                "div" | "section" | "header" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
            ) && node.is_element_without_content()
            {
                node_opt = dom::remove_and_get_next(node);
                continue;
            }

            if DEFAULT_TAGS_TO_SCORE.contains(&tag.as_str()) {
                elements_to_score.push(node.clone());
            }

            if tag == "div" {
                // Wrap stray runs of phrasing content into paragraphs
                let mut p: Option<NodeRef> = None;
                for child in node.child_nodes() {
                    if child.is_phrasing_content() {
                        if let Some(ref para) = p {
                            para.append(child);
                        } else if !child.is_whitespace_node() {
                            let para = dom::create_element("p");
                            child.replace_with(&para);
                            para.append(child);
                            p = Some(para);
                        }
                    } else if let Some(para) = p.take() {
                        while let Some(last) = para.last_child() {
                            if !last.is_whitespace_node() {
                                break;
                            }
                            last.detach();
                        }
                    }
                }

                // A div wrapping a single low-link paragraph IS that
                // paragraph; a div with no block children becomes one
                let single_p = node
                    .has_single_tag_inside("p")
                    .then(|| node.first_element_child())
                    .flatten();
                if let Some(new_node) = single_p.filter(|_| scoring::get_link_density(&node) < 0.25)
                {
                    node.replace_with(&new_node);
                    elements_to_score.push(new_node.clone());
                    node_opt = dom::next_in_tree(&new_node, false);
                    continue;
                } else if !node.has_child_block_element() {
                    let new_node = node.set_node_tag("p");
                    elements_to_score.push(new_node.clone());
                    node_opt = dom::next_in_tree(&new_node, false);
                    continue;
                }
            }

            node_opt = dom::next_in_tree(&node, false);
        }

        elements_to_score
    }

    /// The C6 scoring pass: rate each collected element and propagate into
    /// its ancestors with distance decay.
    fn score_elements(&self, elements_to_score: &[NodeRef], scores: &mut ScoreMap) -> Vec<NodeRef> {
        let mut candidates: Vec<NodeRef> = Vec::new();

        for element in elements_to_score {
            if element.parent_element().is_none() {
                continue;
            }

            let inner_text = element.inner_text(true);
            if inner_text.chars().count() < 25 {
                continue;
            }

            let ancestors = element.element_ancestors(SCORE_PROPAGATION_DEPTH);
            if ancestors.is_empty() {
                continue;
            }

            let mut content_score = 1.0;
            content_score += text::comma_count(&inner_text) as f64;
            content_score += (inner_text.chars().count() / 100).min(3) as f64;

            for (level, ancestor) in ancestors.iter().enumerate() {
                if ancestor.parent_element().is_none() {
                    continue;
                }
                if !scores.is_initialized(ancestor) {
                    scores.initialize_node(ancestor, self.flags);
                    candidates.push(ancestor.clone());
                }
                let divider = match level {
                    0 => 1.0,
                    1 => 2.0,
                    level => (level * 3) as f64,
                };
                scores.add(ancestor, content_score / divider);
            }
        }

        candidates
    }

    /// The C7 refinement: fabricate a container when nothing won, then
    /// promote shared ancestors, climb scoring parents, and skip
    /// single-child shells.
    fn select_top_candidate(
        &mut self,
        top_candidates: Vec<NodeRef>,
        page: &NodeRef,
        scores: &mut ScoreMap,
    ) -> (NodeRef, bool) {
        let best = top_candidates
            .first()
            .filter(|tc| !tc.has_tag("body"))
            .cloned();

        let Some(mut top_candidate) = best else {
            // Nothing usable: wrap everything the body holds and score that
            let new_top = dom::create_element("div");
            for child in page.child_nodes() {
                new_top.append(child);
            }
            page.append(new_top.clone());
            scores.initialize_node(&new_top, self.flags);
            return (new_top, true);
        };

        // An ancestor shared by enough strong alternates is a better root
        let top_score = scores.get(&top_candidate).unwrap_or(0.0);
        let mut alternative_candidate_ancestors: Vec<Vec<NodeRef>> = Vec::new();
        for other in top_candidates.iter().skip(1) {
            if scores.get(other).unwrap_or(0.0) / top_score >= 0.75 {
                alternative_candidate_ancestors.push(other.element_ancestors(0));
            }
        }
        if alternative_candidate_ancestors.len() >= MINIMUM_TOP_CANDIDATES {
            let mut parent = top_candidate.parent_element();
            while let Some(p) = parent {
                if p.has_tag("body") {
                    break;
                }
                let lists_containing = alternative_candidate_ancestors
                    .iter()
                    .filter(|ancestors| ancestors.iter().any(|a| a == &p))
                    .count();
                if lists_containing >= MINIMUM_TOP_CANDIDATES {
                    top_candidate = p;
                    break;
                }
                parent = p.parent_element();
            }
        }

        if !scores.is_initialized(&top_candidate) {
            scores.initialize_node(&top_candidate, self.flags);
        }

        // Content split across siblings leaves the real container's score
        // rising behind the winner; climb while that holds
        let mut last_score = scores.get(&top_candidate).unwrap_or(0.0);
        let score_threshold = last_score / 3.0;
        let mut parent = top_candidate.parent_element();
        while let Some(p) = parent {
            if p.has_tag("body") {
                break;
            }
            let Some(parent_score) = scores.get(&p) else {
                parent = p.parent_element();
                continue;
            };
            if parent_score < score_threshold {
                break;
            }
            if parent_score > last_score {
                top_candidate = p;
                break;
            }
            last_score = parent_score;
            parent = p.parent_element();
        }

        // An only child tells us nothing; its parent is the same content
        let mut parent = top_candidate.parent_element();
        while let Some(p) = parent {
            if p.has_tag("body") || p.element_children().len() != 1 {
                break;
            }
            top_candidate = p;
            parent = top_candidate.parent_element();
        }

        if !scores.is_initialized(&top_candidate) {
            scores.initialize_node(&top_candidate, self.flags);
        }

        (top_candidate, false)
    }

    /// The C8 assembly: collect the top candidate and any sibling that
    /// clears the score threshold or reads like article prose.
    fn assemble_siblings(
        &self,
        top_candidate: &NodeRef,
        parent_of_top: &NodeRef,
        scores: &mut ScoreMap,
    ) -> NodeRef {
        let article_content = dom::create_element("div");

        let top_score = scores.get(top_candidate).unwrap_or(0.0);
        let sibling_score_threshold = 10.0_f64.max(top_score * 0.2);
        let top_class = top_candidate.class_name();

        for sibling in parent_of_top.element_children() {
            let mut append = false;

            if &sibling == top_candidate {
                append = true;
            } else {
                let mut content_bonus = 0.0;
                if !top_class.is_empty() && sibling.class_name() == top_class {
                    content_bonus = top_score * 0.2;
                }

                if let Some(sibling_score) = scores.get(&sibling) {
                    if sibling_score + content_bonus >= sibling_score_threshold {
                        append = true;
                    }
                }

                if !append && sibling.has_tag("p") {
                    let link_density = scoring::get_link_density(&sibling);
                    let node_content = sibling.inner_text(true);
                    let node_length = node_content.chars().count();

                    if node_length > 80 && link_density < 0.25 {
                        append = true;
                    } else if node_length < 80
                        && node_length > 0
                        && link_density == 0.0
                        && REGEXPS.next_sentence.is_match(&node_content)
                    {
                        append = true;
                    }
                }
            }

            if append {
                let mut sibling = sibling;
                let tag = sibling.tag_name().unwrap_or_default();
                if !ALTER_TO_DIV_EXCEPTIONS.contains(&tag.as_str()) {
                    let replacement = sibling.set_node_tag("div");
                    scores.transfer(&sibling, &replacement);
                    sibling = replacement;
                }
                article_content.append(sibling);
            }
        }

        article_content
    }

    /// A byline is an element advertising authorship (rel, itemprop, or
    /// class/id naming) whose text is plausibly short.
    fn check_byline(&mut self, node: &NodeRef, match_string: &str) -> bool {
        if self.metadata_has_byline || self.byline.is_some() {
            return false;
        }

        let rel_author = node.attr("rel").as_deref() == Some("author");
        let itemprop_author = node
            .attr("itemprop")
            .map(|v| v.contains("author"))
            .unwrap_or(false);

        if rel_author || itemprop_author || REGEXPS.byline.is_match(match_string) {
            let byline = node.inner_text(false);
            let length = byline.chars().count();
            if length > 0 && length < 100 {
                self.byline = Some(text::normalize_spaces(&byline));
                return true;
            }
        }

        false
    }

    /// A heading restating the resolved title adds nothing; one is removed.
    fn header_duplicates_title(&self, node: &NodeRef) -> bool {
        if !(node.has_tag("h1") || node.has_tag("h2")) {
            return false;
        }
        if self.article_title.is_empty() {
            return false;
        }
        text::text_similarity(&self.article_title, &node.inner_text(false)) > 0.75
    }
}

/// First `dir` attribute among the parent, the candidate, and their
/// ancestor chain.
fn find_article_dir(parent_of_top: &NodeRef, top_candidate: &NodeRef) -> Option<String> {
    let mut nodes = vec![parent_of_top.clone(), top_candidate.clone()];
    nodes.extend(parent_of_top.element_ancestors(0));
    for node in nodes {
        if let Some(dir) = node.attr("dir") {
            if !dir.is_empty() {
                return Some(dir);
            }
        }
    }
    None
}
