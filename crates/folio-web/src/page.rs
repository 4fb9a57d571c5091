//! `Page` and `MediaBackend` over the browser DOM.
//!
//! Elements are interned on first sight: each gets a `data-folio-node`
//! attribute holding its index into the arena, so translating an event
//! target back into a `NodeId` is a single attribute read.

use std::cell::RefCell;
use std::rc::Rc;

use folio_core::{MediaBackend, MediaEvent, NodeId, Page, Rect};
use tracing::{debug, warn};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{
    AnalyserNode, AudioContext, AudioContextState, Document, Element, HtmlElement,
    HtmlInputElement, HtmlMediaElement, HtmlOptionElement, HtmlSelectElement,
    HtmlTextAreaElement, ScrollBehavior, ScrollIntoViewOptions, ScrollLogicalPosition, Window,
};

const NODE_ATTRIBUTE: &str = "data-folio-node";

/// Receiver for media notifications that complete after the call that
/// caused them. Filled in once the site exists.
pub type MediaHook = Rc<RefCell<Option<Box<dyn Fn(MediaEvent)>>>>;

/// Readable text for a rejected promise or thrown value.
pub fn describe(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

struct AudioGraph {
    context: AudioContext,
    analyser: AnalyserNode,
    media: NodeId,
}

/// A media element can feed only one `createMediaElementSource`, so a
/// failed build is final.
enum Audio {
    Unbuilt,
    Ready(AudioGraph),
    Failed,
}

pub struct WebPage {
    window: Window,
    document: Document,
    elements: Vec<Element>,
    audio: Audio,
    media_hook: MediaHook,
}

impl WebPage {
    pub fn new(window: Window, document: Document, media_hook: MediaHook) -> Self {
        Self {
            window,
            document,
            elements: Vec::new(),
            audio: Audio::Unbuilt,
            media_hook,
        }
    }

    /// Id of `element`, assigning one if it has none yet.
    pub fn intern(&mut self, element: &Element) -> NodeId {
        if let Some(index) = element
            .get_attribute(NODE_ATTRIBUTE)
            .and_then(|v| v.parse::<u32>().ok())
            && self
                .elements
                .get(index as usize)
                .is_some_and(|known| known == element)
        {
            return NodeId(index);
        }
        let id = NodeId(self.elements.len() as u32);
        if let Err(err) = element.set_attribute(NODE_ATTRIBUTE, &id.0.to_string()) {
            warn!(error = %describe(&err), "could not tag element");
        }
        self.elements.push(element.clone());
        id
    }

    /// Id of the element behind an event target, if it is an element.
    pub fn intern_target(&mut self, target: Option<web_sys::EventTarget>) -> Option<NodeId> {
        let element = target?.dyn_into::<Element>().ok()?;
        Some(self.intern(&element))
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        self.elements.get(node.0 as usize)
    }

    fn html(&self, node: NodeId) -> Option<&HtmlElement> {
        self.element(node)?.dyn_ref::<HtmlElement>()
    }

    fn media(&self, node: NodeId) -> Option<&HtmlMediaElement> {
        self.element(node)?.dyn_ref::<HtmlMediaElement>()
    }

    fn collect(&mut self, list: Result<web_sys::NodeList, JsValue>, selector: &str) -> Vec<NodeId> {
        let list = match list {
            Ok(list) => list,
            Err(err) => {
                warn!(selector, error = %describe(&err), "selector rejected");
                return Vec::new();
            }
        };
        let elements: Vec<Element> = (0..list.length())
            .filter_map(|i| list.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect();
        elements.iter().map(|e| self.intern(e)).collect()
    }

    fn build_audio_graph(&self, media: NodeId, fft_size: u32) -> Result<AudioGraph, JsValue> {
        let element = self
            .media(media)
            .ok_or_else(|| JsValue::from_str("not a media element"))?;
        let context = AudioContext::new()?;
        let analyser = context.create_analyser()?;
        let source = context.create_media_element_source(element)?;
        source.connect_with_audio_node(&analyser)?;
        analyser.connect_with_audio_node(&context.destination())?;
        analyser.set_fft_size(fft_size);
        Ok(AudioGraph {
            context,
            analyser,
            media,
        })
    }
}

/// Log a failed DOM call without interrupting the caller.
fn check<T>(result: Result<T, JsValue>, what: &str) {
    if let Err(err) = result {
        debug!(what, error = %describe(&err), "DOM call failed");
    }
}

impl Page for WebPage {
    fn query(&mut self, selector: &str) -> Option<NodeId> {
        match self.document.query_selector(selector) {
            Ok(found) => found.map(|e| self.intern(&e)),
            Err(err) => {
                warn!(selector, error = %describe(&err), "selector rejected");
                None
            }
        }
    }

    fn query_all(&mut self, selector: &str) -> Vec<NodeId> {
        let list = self.document.query_selector_all(selector);
        self.collect(list, selector)
    }

    fn query_within(&mut self, root: NodeId, selector: &str) -> Vec<NodeId> {
        let Some(list) = self.element(root).map(|e| e.query_selector_all(selector)) else {
            return Vec::new();
        };
        self.collect(list, selector)
    }

    fn closest(&mut self, node: NodeId, selector: &str) -> Option<NodeId> {
        let found = self.element(node)?.closest(selector).ok().flatten()?;
        Some(self.intern(&found))
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        self.element(node)
            .map(|e| {
                let r = e.get_bounding_client_rect();
                Rect::new(r.x(), r.y(), r.width(), r.height())
            })
            .unwrap_or_default()
    }

    fn viewport(&self) -> Rect {
        let width = self
            .window
            .inner_width()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let height = self
            .window
            .inner_height()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        Rect::new(0.0, 0.0, width, height)
    }

    fn scroll_y(&self) -> f64 {
        self.window.scroll_y().unwrap_or(0.0)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node)
            .is_some_and(|e| e.class_list().contains(class))
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(e) = self.element(node) {
            check(e.class_list().add_1(class), "classList.add");
        }
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(e) = self.element(node) {
            check(e.class_list().remove_1(class), "classList.remove");
        }
    }

    fn style(&self, node: NodeId, property: &str) -> Option<String> {
        let value = self.html(node)?.style().get_property_value(property).ok()?;
        (!value.is_empty()).then_some(value)
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(e) = self.html(node) {
            check(e.style().set_property(property, value), "style.setProperty");
        }
    }

    fn text(&self, node: NodeId) -> String {
        self.element(node)
            .and_then(|e| e.text_content())
            .unwrap_or_default()
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(e) = self.element(node) {
            e.set_text_content(Some(text));
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)?.get_attribute(name)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(e) = self.element(node) {
            check(e.set_attribute(name, value), "setAttribute");
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(e) = self.element(node) {
            check(e.remove_attribute(name), "removeAttribute");
        }
    }

    fn append_element(&mut self, parent: NodeId, tag: &str, class: &str) -> NodeId {
        let created = match self.document.create_element(tag) {
            Ok(element) => element,
            Err(err) => {
                warn!(tag, error = %describe(&err), "createElement failed");
                // Detached placeholder; writes to it are harmless
                return NodeId(u32::MAX);
            }
        };
        created.set_class_name(class);
        if let Some(parent) = self.element(parent) {
            check(parent.append_child(&created), "appendChild");
        }
        self.intern(&created)
    }

    fn remove(&mut self, node: NodeId) {
        if let Some(e) = self.element(node) {
            e.remove();
        }
    }

    fn scroll_into_view(&mut self, node: NodeId) {
        if let Some(e) = self.element(node) {
            let options = ScrollIntoViewOptions::new();
            options.set_behavior(ScrollBehavior::Smooth);
            options.set_block(ScrollLogicalPosition::Start);
            e.scroll_into_view_with_scroll_into_view_options(&options);
        }
    }

    fn focus(&mut self, node: NodeId) {
        if let Some(e) = self.html(node) {
            check(e.focus(), "focus");
        }
    }

    fn value(&self, node: NodeId) -> String {
        let Some(e) = self.element(node) else {
            return String::new();
        };
        if let Some(input) = e.dyn_ref::<HtmlInputElement>() {
            input.value()
        } else if let Some(select) = e.dyn_ref::<HtmlSelectElement>() {
            select.value()
        } else if let Some(area) = e.dyn_ref::<HtmlTextAreaElement>() {
            area.value()
        } else if let Some(option) = e.dyn_ref::<HtmlOptionElement>() {
            option.value()
        } else {
            String::new()
        }
    }

    fn navigate(&mut self, url: &str) {
        check(self.window.location().set_href(url), "location.href");
    }

    fn alert(&mut self, message: &str) {
        check(self.window.alert_with_message(message), "alert");
    }
}

impl MediaBackend for WebPage {
    fn is_paused(&self, media: NodeId) -> bool {
        self.media(media).is_none_or(|m| m.paused())
    }

    fn has_ended(&self, media: NodeId) -> bool {
        self.media(media).is_some_and(|m| m.ended())
    }

    fn is_muted(&self, media: NodeId) -> bool {
        self.media(media).is_some_and(|m| m.muted())
    }

    fn set_muted(&mut self, media: NodeId, muted: bool) {
        if let Some(m) = self.media(media) {
            m.set_muted(muted);
        }
    }

    /// Resolution of the play promise is reported through the media hook
    /// from a separate task.
    fn play(&mut self, media: NodeId) {
        let Some(element) = self.media(media) else {
            return;
        };
        let hook = self.media_hook.clone();
        let started = element.play();
        spawn_local(async move {
            let outcome = match started {
                Ok(promise) => JsFuture::from(promise).await.map(|_| ()),
                Err(err) => Err(err),
            };
            if let Err(err) = outcome
                && let Some(notify) = hook.borrow().as_ref()
            {
                notify(MediaEvent::AutoplayRejected(media, describe(&err)));
            }
        });
    }

    fn pause(&mut self, media: NodeId) {
        if let Some(m) = self.media(media) {
            check(m.pause(), "media.pause");
        }
    }

    fn connect_analyser(&mut self, media: NodeId, fft_size: u32) -> Option<usize> {
        match &self.audio {
            Audio::Ready(graph) => {
                return (graph.media == media)
                    .then(|| graph.analyser.frequency_bin_count() as usize);
            }
            Audio::Failed => return None,
            Audio::Unbuilt => {}
        }
        match self.build_audio_graph(media, fft_size) {
            Ok(graph) => {
                let bins = graph.analyser.frequency_bin_count() as usize;
                self.audio = Audio::Ready(graph);
                Some(bins)
            }
            Err(err) => {
                warn!(error = %describe(&err), "audio analyser unavailable");
                self.audio = Audio::Failed;
                None
            }
        }
    }

    fn resume_audio(&mut self) {
        if let Audio::Ready(graph) = &self.audio
            && graph.context.state() == AudioContextState::Suspended
        {
            check(graph.context.resume(), "audioContext.resume");
        }
    }

    fn sample_frequencies(&mut self, media: NodeId, out: &mut [u8]) -> bool {
        match &self.audio {
            Audio::Ready(graph) if graph.media == media => {
                graph.analyser.get_byte_frequency_data(out);
                true
            }
            _ => false,
        }
    }
}
