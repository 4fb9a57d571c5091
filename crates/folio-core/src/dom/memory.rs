//! In-memory document for tests and headless simulation.
//!
//! `MemoryPage` keeps a flat arena of nodes with document-space rectangles.
//! Bounding boxes are derived from the scroll position unless a node is
//! marked fixed (like the navbar), and include a pixel `translate(..)`
//! transform the way `getBoundingClientRect` does. Every text and style write is recorded so
//! tests can assert on intermediate frames, not only on the final state.
//!
//! Media playback is simulated: `play` either starts immediately or queues an
//! autoplay rejection, depending on [`MemoryPage::set_autoplay_allowed`]. The
//! resulting [`MediaEvent`]s are drained by the test and forwarded to the
//! site, matching the asynchronous delivery of the browser.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use super::selector::{Compound, ElementTree, Selector};
use super::{MediaBackend, NodeId, Page};
use crate::geometry::Rect;

#[derive(Debug, Clone, Default)]
struct MemoryNode {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    text: String,
    value: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Document-space rectangle.
    rect: Rect,
    fixed: bool,
    attached: bool,
}

#[derive(Debug, Clone)]
struct MediaState {
    paused: bool,
    ended: bool,
    muted: bool,
    bins: Option<usize>,
    frequencies: Vec<u8>,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            paused: true,
            ended: false,
            muted: false,
            bins: None,
            frequencies: Vec::new(),
        }
    }
}

/// Asynchronous media notifications produced by the simulated backend.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    Played(NodeId),
    Paused(NodeId),
    AutoplayRejected(NodeId, String),
}

#[derive(Debug)]
pub struct MemoryPage {
    nodes: Vec<MemoryNode>,
    root: NodeId,
    viewport_width: f64,
    viewport_height: f64,
    scroll_y: f64,
    autoplay_allowed: bool,
    media: HashMap<NodeId, MediaState>,
    media_events: Vec<MediaEvent>,
    text_log: Vec<(NodeId, String)>,
    style_log: Vec<(NodeId, String, String)>,
    scrolled_into_view: Vec<NodeId>,
    focused: Option<NodeId>,
    navigations: Vec<String>,
    alerts: Vec<String>,
    audio_resumes: usize,
    analyser_connects: usize,
    analyser_available: bool,
    blurred: Vec<NodeId>,
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

impl MemoryPage {
    /// Empty document with a `body` root and the given viewport size.
    pub fn new(viewport_width: f64, viewport_height: f64) -> Self {
        let body = MemoryNode {
            tag: "body".to_string(),
            attached: true,
            ..Default::default()
        };
        Self {
            nodes: vec![body],
            root: NodeId(0),
            viewport_width,
            viewport_height,
            scroll_y: 0.0,
            autoplay_allowed: true,
            media: HashMap::new(),
            media_events: Vec::new(),
            text_log: Vec::new(),
            style_log: Vec::new(),
            scrolled_into_view: Vec::new(),
            focused: None,
            navigations: Vec::new(),
            alerts: Vec::new(),
            audio_resumes: 0,
            analyser_connects: 0,
            analyser_available: true,
            blurred: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Add an element described by a compound selector, e.g.
    /// `"section#intro.services-section"`, under `parent` (the body when `None`).
    ///
    /// # Panics
    /// Panics on an invalid description; this is a fixture-building API.
    pub fn add(&mut self, parent: Option<NodeId>, description: &str) -> NodeId {
        let compound = Compound::parse(description)
            .unwrap_or_else(|e| panic!("invalid element description: {e}"));
        let mut node = MemoryNode {
            tag: compound.tag.unwrap_or_else(|| "div".to_string()),
            classes: compound.classes,
            attached: true,
            ..Default::default()
        };
        if let Some(id) = compound.id {
            node.attributes.insert("id".to_string(), id);
        }
        for (name, value) in compound.attributes {
            node.attributes.insert(name, value.unwrap_or_default());
        }
        if node.tag == "video" {
            let id = NodeId(self.nodes.len() as u32);
            self.media.insert(id, MediaState::default());
        }
        self.insert(parent.unwrap_or(self.root), node)
    }

    fn insert(&mut self, parent: NodeId, mut node: MemoryNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.parent = Some(parent);
        self.nodes.push(node);
        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }
        id
    }

    /// Place `node` in document coordinates.
    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        if let Some(n) = self.node_mut(node) {
            n.rect = rect;
        }
    }

    /// Fixed nodes keep their rectangle regardless of scroll position.
    pub fn set_fixed(&mut self, node: NodeId, fixed: bool) {
        if let Some(n) = self.node_mut(node) {
            n.fixed = fixed;
        }
    }

    /// Set text without recording it as a write.
    pub fn seed_text(&mut self, node: NodeId, text: &str) {
        if let Some(n) = self.node_mut(node) {
            n.text = text.to_string();
        }
    }

    pub fn set_value(&mut self, node: NodeId, value: &str) {
        if let Some(n) = self.node_mut(node) {
            n.value = value.to_string();
        }
    }

    pub fn set_scroll_y(&mut self, scroll_y: f64) {
        self.scroll_y = scroll_y;
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    pub fn set_autoplay_allowed(&mut self, allowed: bool) {
        self.autoplay_allowed = allowed;
    }

    /// Mark a media element as played to the end (and paused).
    pub fn set_ended(&mut self, media: NodeId, ended: bool) {
        if let Some(state) = self.media.get_mut(&media) {
            state.ended = ended;
            if ended {
                state.paused = true;
            }
        }
    }

    /// Frequency magnitudes returned by subsequent samples.
    /// Make the next analyser connection fail, as a browser without Web
    /// Audio would.
    pub fn set_analyser_available(&mut self, available: bool) {
        self.analyser_available = available;
    }

    pub fn set_frequencies(&mut self, media: NodeId, data: Vec<u8>) {
        if let Some(state) = self.media.get_mut(&media) {
            state.frequencies = data;
        }
    }

    pub fn take_media_events(&mut self) -> Vec<MediaEvent> {
        std::mem::take(&mut self.media_events)
    }

    /// Every recorded text write for `node`, oldest first.
    pub fn text_history(&self, node: NodeId) -> Vec<String> {
        self.text_log
            .iter()
            .filter(|(n, _)| *n == node)
            .map(|(_, t)| t.clone())
            .collect()
    }

    /// Number of `set_style` calls for `node` and `property`.
    pub fn style_writes(&self, node: NodeId, property: &str) -> usize {
        self.style_log
            .iter()
            .filter(|(n, p, _)| *n == node && p == property)
            .count()
    }

    /// Total number of recorded mutations of any kind.
    pub fn mutation_count(&self) -> usize {
        self.text_log.len() + self.style_log.len()
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        self.node(node).is_some_and(|n| n.attached)
    }

    pub fn scrolled_into_view(&self) -> &[NodeId] {
        &self.scrolled_into_view
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Elements that lost focus since the last call, oldest first.
    pub fn take_blurs(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.blurred)
    }

    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn audio_resumes(&self) -> usize {
        self.audio_resumes
    }

    pub fn analyser_connects(&self) -> usize {
        self.analyser_connects
    }

    fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id.0 as usize)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut MemoryNode> {
        self.nodes.get_mut(id.0 as usize)
    }

    /// Attached descendants of `root` in document (pre-)order, excluding `root`.
    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self
            .node(root)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            if !node.attached {
                continue;
            }
            out.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    fn matching(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        match Selector::parse(selector) {
            Ok(selector) => self
                .descendants(root)
                .into_iter()
                .filter(|&n| selector.matches(self, n))
                .collect(),
            Err(e) => {
                warn!(error = %e, "selector rejected");
                Vec::new()
            }
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let Some(node) = self.node(id) {
            out.push_str(&node.text);
            for &child in &node.children {
                self.collect_text(child, out);
            }
        }
    }
}

impl ElementTree for MemoryPage {
    fn tag_name(&self, node: NodeId) -> &str {
        self.node(node).map(|n| n.tag.as_str()).unwrap_or("")
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.node(node)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    fn attribute_value(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)?.attributes.get(name).map(String::as_str)
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }
}

impl Page for MemoryPage {
    fn query(&mut self, selector: &str) -> Option<NodeId> {
        self.matching(self.root, selector).into_iter().next()
    }

    fn query_all(&mut self, selector: &str) -> Vec<NodeId> {
        self.matching(self.root, selector)
    }

    fn query_within(&mut self, root: NodeId, selector: &str) -> Vec<NodeId> {
        self.matching(root, selector)
    }

    fn closest(&mut self, node: NodeId, selector: &str) -> Option<NodeId> {
        let parsed = Selector::parse(selector).ok()?;
        let mut current = Some(node);
        while let Some(id) = current {
            if parsed.matches(self, id) {
                return Some(id);
            }
            current = self.parent_of(id);
        }
        None
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        let Some(n) = self.node(node) else {
            return Rect::default();
        };
        let (dx, dy) = n
            .styles
            .get("transform")
            .and_then(|t| pixel_translation(t))
            .unwrap_or((0.0, 0.0));
        let scroll = if n.fixed { 0.0 } else { self.scroll_y };
        n.rect.translated(dx, dy - scroll)
    }

    fn viewport(&self) -> Rect {
        Rect::new(0.0, 0.0, self.viewport_width, self.viewport_height)
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        ElementTree::has_class(self, node, class)
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(n) = self.node_mut(node)
            && !n.classes.iter().any(|c| c == class)
        {
            n.classes.push(class.to_string());
        }
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(n) = self.node_mut(node) {
            n.classes.retain(|c| c != class);
        }
    }

    fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.node(node)?.styles.get(property).cloned()
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(n) = self.node_mut(node) {
            n.styles.insert(property.to_string(), value.to_string());
            self.style_log
                .push((node, property.to_string(), value.to_string()));
        }
    }

    fn text(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        let Some(n) = self.node_mut(node) else { return };
        n.text = text.to_string();
        let children = std::mem::take(&mut n.children);
        for child in children {
            if let Some(c) = self.node_mut(child) {
                c.attached = false;
                c.parent = None;
            }
        }
        self.text_log.push((node, text.to_string()));
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.attribute_value(node, name).map(str::to_string)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.node_mut(node) {
            n.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(n) = self.node_mut(node) {
            n.attributes.remove(name);
        }
    }

    fn append_element(&mut self, parent: NodeId, tag: &str, class: &str) -> NodeId {
        let node = MemoryNode {
            tag: tag.to_ascii_lowercase(),
            classes: class.split_whitespace().map(str::to_string).collect(),
            attached: self.is_attached(parent),
            ..Default::default()
        };
        self.insert(parent, node)
    }

    fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.node(node).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|&c| c != node);
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = None;
            n.attached = false;
        }
    }

    fn scroll_into_view(&mut self, node: NodeId) {
        let top = self.node(node).map(|n| n.rect.top);
        if let Some(top) = top {
            self.scroll_y = top.max(0.0);
            self.scrolled_into_view.push(node);
        }
    }

    fn focus(&mut self, node: NodeId) {
        if let Some(previous) = self.focused.replace(node)
            && previous != node
        {
            self.blurred.push(previous);
        }
    }

    fn value(&self, node: NodeId) -> String {
        self.node(node).map(|n| n.value.clone()).unwrap_or_default()
    }

    fn navigate(&mut self, url: &str) {
        self.navigations.push(url.to_string());
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}

/// `(x, y)` of a `translate(<x>px, <y>px)` transform. Percentages and any
/// other transform function yield `None`.
fn pixel_translation(transform: &str) -> Option<(f64, f64)> {
    let args = transform.trim().strip_prefix("translate(")?.strip_suffix(')')?;
    let (x, y) = args.split_once(',')?;
    let length = |v: &str| {
        let v = v.trim();
        v.strip_suffix("px").unwrap_or(v).parse::<f64>().ok()
    };
    Some((length(x)?, length(y)?))
}

impl MediaBackend for MemoryPage {
    fn is_paused(&self, media: NodeId) -> bool {
        self.media.get(&media).is_none_or(|m| m.paused)
    }

    fn has_ended(&self, media: NodeId) -> bool {
        self.media.get(&media).is_some_and(|m| m.ended)
    }

    fn is_muted(&self, media: NodeId) -> bool {
        self.media.get(&media).is_some_and(|m| m.muted)
    }

    fn set_muted(&mut self, media: NodeId, muted: bool) {
        if let Some(state) = self.media.get_mut(&media) {
            state.muted = muted;
        }
    }

    fn play(&mut self, media: NodeId) {
        let allowed = self.autoplay_allowed;
        let Some(state) = self.media.get_mut(&media) else {
            return;
        };
        if allowed {
            state.paused = false;
            state.ended = false;
            self.media_events.push(MediaEvent::Played(media));
        } else {
            self.media_events.push(MediaEvent::AutoplayRejected(
                media,
                "NotAllowedError: play() requires a user gesture".to_string(),
            ));
        }
    }

    fn pause(&mut self, media: NodeId) {
        if let Some(state) = self.media.get_mut(&media)
            && !state.paused
        {
            state.paused = true;
            self.media_events.push(MediaEvent::Paused(media));
        }
    }

    /// Counts every attempt to build the pipeline, failed ones included.
    fn connect_analyser(&mut self, media: NodeId, fft_size: u32) -> Option<usize> {
        let state = self.media.get_mut(&media)?;
        if state.bins.is_none() {
            self.analyser_connects += 1;
            if !self.analyser_available {
                return None;
            }
            state.bins = Some(fft_size as usize / 2);
        }
        state.bins
    }

    fn resume_audio(&mut self) {
        self.audio_resumes += 1;
    }

    fn sample_frequencies(&mut self, media: NodeId, out: &mut [u8]) -> bool {
        let Some(state) = self.media.get(&media) else {
            return false;
        };
        if state.bins.is_none() {
            return false;
        }
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = state.frequencies.get(i).copied().unwrap_or(0);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_order_and_descendants() {
        let mut page = MemoryPage::default();
        let list = page.add(None, "ul.services-list");
        let a = page.add(Some(list), "button.first");
        let b = page.add(Some(list), "button.second");
        let outside = page.add(None, "button.outside");

        assert_eq!(page.query_all(".services-list button"), vec![a, b]);
        assert_eq!(page.query("button"), Some(a));
        assert_eq!(page.query_within(list, "button"), vec![a, b]);
        assert_eq!(page.closest(b, ".services-list"), Some(list));
        assert_eq!(page.closest(outside, ".services-list"), None);
    }

    #[test]
    fn test_id_and_attribute_queries() {
        let mut page = MemoryPage::default();
        let link = page.add(None, "a[href=\"#project-table\"]");
        let table = page.add(None, "section#project-table");
        assert_eq!(page.query("a[href=\"#project-table\"]"), Some(link));
        assert_eq!(page.query("#project-table"), Some(table));
        assert_eq!(page.query("#missing"), None);
    }

    #[test]
    fn test_bounding_rect_follows_scroll_unless_fixed() {
        let mut page = MemoryPage::default();
        let nav = page.add(None, "nav.navbar");
        let section = page.add(None, "section");
        page.set_fixed(nav, true);
        page.set_rect(nav, Rect::new(0.0, 0.0, 1280.0, 60.0));
        page.set_rect(section, Rect::new(0.0, 900.0, 1280.0, 400.0));
        page.set_scroll_y(300.0);

        assert_eq!(page.bounding_rect(nav).top, 0.0);
        assert_eq!(page.bounding_rect(section).top, 600.0);
    }

    #[test]
    fn test_bounding_rect_includes_translation() {
        let mut page = MemoryPage::default();
        let button = page.add(None, "button");
        page.set_rect(button, Rect::new(100.0, 50.0, 40.0, 20.0));

        page.set_style(button, "transform", "translate(-75px, 10px)");
        assert_eq!(page.bounding_rect(button), Rect::new(25.0, 60.0, 40.0, 20.0));
        page.set_style(button, "transform", "translate(0, 0)");
        assert_eq!(page.bounding_rect(button), Rect::new(100.0, 50.0, 40.0, 20.0));
        page.set_style(button, "transform", "translate(-50%, -50%)");
        assert_eq!(page.bounding_rect(button).left, 100.0);
        page.set_style(button, "transform", "rotate(30deg)");
        assert_eq!(page.bounding_rect(button).left, 100.0);
    }

    #[test]
    fn test_set_text_replaces_children() {
        let mut page = MemoryPage::default();
        let heading = page.add(None, "h2");
        let span = page.append_element(heading, "span", "letter");
        page.seed_text(span, "A");
        assert_eq!(page.text(heading), "A");

        page.set_text(heading, "Hello");
        assert_eq!(page.text(heading), "Hello");
        assert!(!page.is_attached(span));
        assert!(page.query_all(".letter").is_empty());
        assert_eq!(page.text_history(heading), vec!["Hello"]);
    }

    #[test]
    fn test_remove_detaches() {
        let mut page = MemoryPage::default();
        let container = page.add(None, "div.video-container");
        let button = page.append_element(container, "button", "play-btn");
        assert_eq!(page.query(".play-btn"), Some(button));
        page.remove(button);
        assert_eq!(page.query(".play-btn"), None);
    }

    #[test]
    fn test_media_simulation() {
        let mut page = MemoryPage::default();
        let video = page.add(None, "video#myVideo");
        assert!(page.is_paused(video));

        page.set_autoplay_allowed(false);
        page.play(video);
        assert!(page.is_paused(video));
        assert!(matches!(
            page.take_media_events().as_slice(),
            [MediaEvent::AutoplayRejected(v, _)] if *v == video
        ));

        page.set_autoplay_allowed(true);
        page.play(video);
        page.pause(video);
        assert_eq!(
            page.take_media_events(),
            vec![MediaEvent::Played(video), MediaEvent::Paused(video)]
        );

        assert_eq!(page.connect_analyser(video, 256), Some(128));
        assert_eq!(page.connect_analyser(video, 256), Some(128));
        assert_eq!(page.analyser_connects(), 1);
    }
}
