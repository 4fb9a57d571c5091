//! Browser event wiring.
//!
//! [`App`] owns the [`Site`] and forwards every DOM event to it. Handlers
//! borrow the site for the length of one call; an event that arrives while
//! the site is borrowed is dropped with a debug log. Calls that make the
//! browser dispatch synchronously, like `focus()`, run after the borrow is
//! released.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use anyhow::anyhow;
use folio_core::{FolioConfig, MediaEvent, NodeId, Point, Site, SubmitOutcome};
use tracing::{debug, info, trace, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    Document, Element, Event, EventTarget, HtmlElement, IntersectionObserver,
    IntersectionObserverEntry, IntersectionObserverInit, KeyboardEvent, MouseEvent, Window,
};

use crate::page::{MediaHook, WebPage, describe};
use crate::submit;

type FrameCallback = RefCell<Option<Closure<dyn FnMut(f64)>>>;

fn js_error(context: &str, err: JsValue) -> anyhow::Error {
    anyhow!("{context}: {}", describe(&err))
}

/// Register `handler` for `event` on `target` for the life of the page.
fn listen<F>(target: &EventTarget, event: &str, handler: F) -> anyhow::Result<()>
where
    F: FnMut(Event) + 'static,
{
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    target
        .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        .map_err(|err| js_error(event, err))?;
    closure.forget();
    Ok(())
}

fn pointer_of(event: &Event) -> Option<Point> {
    let mouse = event.dyn_ref::<MouseEvent>()?;
    Some(Point::new(mouse.client_x() as f64, mouse.client_y() as f64))
}

pub struct App {
    window: Window,
    document: Document,
    site: RefCell<Site<WebPage>>,
    animation_frame: FrameCallback,
    animating: Cell<bool>,
    last_frame: Cell<Option<f64>>,
    visualizer_frame: FrameCallback,
    visualizer_request: Cell<Option<i32>>,
    pointer_frame: FrameCallback,
    pending_pointer: Cell<Option<Point>>,
    observers: RefCell<Vec<IntersectionObserver>>,
}

impl App {
    /// Attach to the current document and install every listener.
    pub fn install(config: &FolioConfig) -> anyhow::Result<Rc<Self>> {
        let window = web_sys::window().ok_or_else(|| anyhow!("no window"))?;
        let document = window.document().ok_or_else(|| anyhow!("no document"))?;

        let hook: MediaHook = Rc::new(RefCell::new(None));
        let page = WebPage::new(window.clone(), document.clone(), hook.clone());
        let site = Site::new(page, config);
        debug!(?site, "site built");

        let app = Rc::new(Self {
            window,
            document,
            site: RefCell::new(site),
            animation_frame: RefCell::new(None),
            animating: Cell::new(false),
            last_frame: Cell::new(None),
            visualizer_frame: RefCell::new(None),
            visualizer_request: Cell::new(None),
            pointer_frame: RefCell::new(None),
            pending_pointer: Cell::new(None),
            observers: RefCell::new(Vec::new()),
        });

        let weak = Rc::downgrade(&app);
        *hook.borrow_mut() = Some(Box::new(move |event| {
            if let Some(app) = weak.upgrade() {
                app.on_media_event(event);
            }
        }));

        app.install_frame_callbacks();
        app.install_document_listeners()?;
        app.install_element_listeners()?;
        app.install_observers()?;

        // Media listeners are in place, so the autoplay started here is seen
        let effects = app.with_site(|site| site.on_load());
        trace!(?effects, "initial scroll effects");
        app.start_animation();
        info!("portfolio interactions ready");
        Ok(app)
    }

    fn with_site<R>(&self, f: impl FnOnce(&mut Site<WebPage>) -> R) -> Option<R> {
        match self.site.try_borrow_mut() {
            Ok(mut site) => Some(f(&mut site)),
            Err(_) => {
                debug!("event skipped while the site is busy");
                None
            }
        }
    }

    fn target_node(&self, site: &mut Site<WebPage>, event: &Event) -> Option<NodeId> {
        site.page_mut().intern_target(event.target())
    }

    fn request_frame(&self, callback: &FrameCallback) -> Option<i32> {
        let callback = callback.borrow();
        let callback = callback.as_ref()?;
        match self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())
        {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(error = %describe(&err), "requestAnimationFrame failed");
                None
            }
        }
    }

    fn install_frame_callbacks(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        *self.animation_frame.borrow_mut() = Some(Closure::wrap(Box::new(move |now: f64| {
            if let Some(app) = weak.upgrade() {
                app.animation_step(now);
            }
        }) as Box<dyn FnMut(f64)>));

        let weak = Rc::downgrade(self);
        *self.visualizer_frame.borrow_mut() = Some(Closure::wrap(Box::new(move |_now: f64| {
            if let Some(app) = weak.upgrade() {
                app.visualizer_step();
            }
        }) as Box<dyn FnMut(f64)>));

        let weak = Rc::downgrade(self);
        *self.pointer_frame.borrow_mut() = Some(Closure::wrap(Box::new(move |_now: f64| {
            if let Some(app) = weak.upgrade()
                && let Some(pointer) = app.pending_pointer.take()
            {
                app.with_site(|site| site.on_pointer_move(pointer));
            }
        }) as Box<dyn FnMut(f64)>));
    }

    /// Run the reveal loop until no animation is left.
    fn start_animation(&self) {
        let needed = self
            .with_site(|site| site.needs_animation_frame())
            .unwrap_or(false);
        if !needed || self.animating.replace(true) {
            return;
        }
        self.last_frame.set(None);
        if self.request_frame(&self.animation_frame).is_none() {
            self.animating.set(false);
        }
    }

    fn animation_step(&self, now: f64) {
        let delta = self.last_frame.replace(Some(now)).map_or(0.0, |last| now - last);
        let more = self
            .with_site(|site| {
                let more = site.tick(delta);
                for event in site.drain_animation_events() {
                    trace!(?event, "animation");
                }
                more
            })
            .unwrap_or(true);
        if !more || self.request_frame(&self.animation_frame).is_none() {
            self.animating.set(false);
        }
    }

    fn start_visualizer(&self) {
        if self.visualizer_request.get().is_none() {
            self.visualizer_request
                .set(self.request_frame(&self.visualizer_frame));
        }
    }

    fn stop_visualizer(&self) {
        if let Some(id) = self.visualizer_request.take()
            && let Err(err) = self.window.cancel_animation_frame(id)
        {
            debug!(error = %describe(&err), "cancelAnimationFrame failed");
        }
    }

    fn visualizer_step(&self) {
        self.visualizer_request.set(None);
        let more = self
            .with_site(|site| site.on_visualizer_frame())
            .unwrap_or(false);
        if more {
            self.start_visualizer();
        }
    }

    fn on_media_event(&self, event: MediaEvent) {
        let paused = matches!(event, MediaEvent::Paused(_));
        let sampling = self
            .with_site(|site| site.on_media_event(event))
            .unwrap_or(false);
        if sampling {
            self.start_visualizer();
        } else if paused {
            self.stop_visualizer();
        }
    }

    fn install_document_listeners(self: &Rc<Self>) -> anyhow::Result<()> {
        let document: &EventTarget = self.document.as_ref();

        let app = Rc::clone(self);
        listen(document, "click", move |event| {
            let handled = app.with_site(|site| {
                let outcome = app
                    .target_node(site, &event)
                    .map(|target| site.on_click(target))
                    .unwrap_or_default();
                let focus = outcome.focus.and_then(|node| app.element(site, node));
                (outcome.prevent_default, focus)
            });
            let Some((prevent, focus)) = handled else {
                return;
            };
            if prevent {
                event.prevent_default();
            }
            // The previous field's focusout lands in a free site
            if let Some(element) = focus
                && let Some(html) = element.dyn_ref::<HtmlElement>()
                && let Err(err) = html.focus()
            {
                debug!(error = %describe(&err), "focus failed");
            }
        })?;

        let app = Rc::clone(self);
        listen(document, "keypress", move |event| {
            let Some(key) = event.dyn_ref::<KeyboardEvent>().map(|k| k.key()) else {
                return;
            };
            let prevent = app.with_site(|site| {
                app.target_node(site, &event)
                    .is_some_and(|target| site.on_key(target, &key))
            });
            if prevent == Some(true) {
                event.prevent_default();
            }
        })?;

        let app = Rc::clone(self);
        listen(document, "submit", move |event| app.on_submit(&event))?;

        let app = Rc::clone(self);
        listen(document, "focusout", move |event| {
            app.with_site(|site| {
                if let Some(target) = app.target_node(site, &event) {
                    site.on_blur(target);
                }
            });
        })?;

        let app = Rc::clone(self);
        listen(document, "change", move |event| {
            app.with_site(|site| {
                if let Some(target) = app.target_node(site, &event) {
                    site.on_change(target);
                }
            });
        })?;

        let app = Rc::clone(self);
        listen(document, "mousemove", move |event| {
            let Some(pointer) = pointer_of(&event) else {
                return;
            };
            // One evader pass per frame, with the latest position
            if app.pending_pointer.replace(Some(pointer)).is_none() {
                app.request_frame(&app.pointer_frame);
            }
        })?;

        let app = Rc::clone(self);
        listen(self.window.as_ref(), "scroll", move |_| {
            app.with_site(|site| site.on_scroll());
        })?;
        Ok(())
    }

    fn element(&self, site: &Site<WebPage>, node: NodeId) -> Option<Element> {
        site.page().element(node).cloned()
    }

    fn install_element_listeners(self: &Rc<Self>) -> anyhow::Result<()> {
        let site = self.site.borrow();

        for button in site.evader().buttons() {
            let Some(element) = self.element(&site, button) else {
                continue;
            };
            let app = Rc::clone(self);
            listen(element.as_ref(), "mouseleave", move |_| {
                app.with_site(|site| site.on_pointer_leave(button));
            })?;
        }

        if let Some(carousel) = site
            .follower()
            .and_then(|f| self.element(&site, f.carousel()))
        {
            let target: &EventTarget = carousel.as_ref();
            let app = Rc::clone(self);
            listen(target, "mouseenter", move |_| {
                app.with_site(|site| site.on_carousel_enter());
            })?;
            let app = Rc::clone(self);
            listen(target, "mouseleave", move |_| {
                app.with_site(|site| site.on_carousel_leave());
            })?;
            let app = Rc::clone(self);
            listen(target, "mousemove", move |event| {
                if let Some(pointer) = pointer_of(&event) {
                    app.with_site(|site| site.on_carousel_move(pointer));
                }
            })?;
        }

        let options = site
            .contact()
            .map(|c| c.reason_options().to_vec())
            .unwrap_or_default();
        for option in options {
            let Some(element) = self.element(&site, option) else {
                continue;
            };
            let target: &EventTarget = element.as_ref();
            let app = Rc::clone(self);
            listen(target, "mouseenter", move |_| {
                app.with_site(|site| site.on_option_hover(option, true));
            })?;
            let app = Rc::clone(self);
            listen(target, "mouseleave", move |_| {
                app.with_site(|site| site.on_option_hover(option, false));
            })?;
        }

        if let Some(video) = site.media().map(|m| m.video())
            && let Some(element) = self.element(&site, video)
        {
            let target: &EventTarget = element.as_ref();
            let app = Rc::clone(self);
            listen(target, "play", move |_| app.on_media_event(MediaEvent::Played(video)))?;
            let app = Rc::clone(self);
            listen(target, "pause", move |_| app.on_media_event(MediaEvent::Paused(video)))?;
        }
        Ok(())
    }

    /// One native observer per distinct threshold.
    fn install_observers(self: &Rc<Self>) -> anyhow::Result<()> {
        let thresholds = self.site.borrow().triggers().thresholds();
        for threshold in thresholds {
            let weak = Rc::downgrade(self);
            let callback = Closure::wrap(Box::new(
                move |entries: js_sys::Array, observer: IntersectionObserver| {
                    if let Some(app) = weak.upgrade() {
                        app.on_intersections(threshold, &entries, &observer);
                    }
                },
            )
                as Box<dyn FnMut(js_sys::Array, IntersectionObserver)>);

            let init = IntersectionObserverInit::new();
            init.set_threshold(&JsValue::from_f64(threshold));
            let observer =
                IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)
                    .map_err(|err| js_error("IntersectionObserver", err))?;
            callback.forget();

            let site = self.site.borrow();
            for node in site.triggers().observed_nodes(threshold) {
                if let Some(element) = self.element(&site, node) {
                    observer.observe(&element);
                }
            }
            drop(site);
            self.observers.borrow_mut().push(observer);
        }
        debug!(observers = self.observers.borrow().len(), "viewport observers installed");
        Ok(())
    }

    fn on_intersections(&self, threshold: f64, entries: &js_sys::Array, observer: &IntersectionObserver) {
        self.with_site(|site| {
            for entry in entries.iter() {
                let entry: IntersectionObserverEntry = entry.unchecked_into();
                let element = entry.target();
                let node = site.page_mut().intern(&element);
                site.on_intersection(node, entry.intersection_ratio(), entry.is_intersecting());
                if site.triggers().is_detached(node, threshold) {
                    observer.unobserve(&element);
                }
            }
        });
        self.start_animation();
    }

    fn on_submit(self: &Rc<Self>, event: &Event) {
        let prepared = self.with_site(|site| {
            let target = self.target_node(site, event)?;
            if site.contact().is_none_or(|c| c.form() != target) {
                return None;
            }
            let form = self.element(site, target)?;
            let request = site.on_submit();
            Some((form, request))
        });
        let Some(Some((form, request))) = prepared else {
            return;
        };
        event.prevent_default();
        let Some(request) = request else {
            return;
        };

        let body = match submit::form_data(&form) {
            Ok(body) => body,
            Err(err) => {
                self.with_site(|site| {
                    site.on_submit_result(SubmitOutcome::NetworkError(format!("{err:#}")))
                });
                return;
            }
        };
        let weak: Weak<Self> = Rc::downgrade(self);
        spawn_local(async move {
            let outcome = submit::send(request, body).await;
            if let Some(app) = weak.upgrade() {
                app.with_site(|site| site.on_submit_result(outcome));
            }
        });
    }
}
