//! Site: every component wired to one page.
//!
//! The embedder owns the event sources and calls one `Site` method per
//! browser event. The site itself never schedules anything; it reports
//! whether the animation loop or the visualizer loop needs another frame.
//!
//! Trigger callbacks receive the [`Stage`] (page plus animator) rather than
//! the whole site, so a callback can start a reveal while the trigger
//! registry is being iterated.

use folio_config::{ClassRevealRule, FolioConfig, ScrambleConfig, StaggerRevealRule};
use tracing::{debug, trace, warn};

use crate::animator::{AnimationHandle, Animator};
use crate::contact::{ContactForm, SubmitOutcome, SubmitRequest};
use crate::dom::{MediaBackend, MediaEvent, NodeId, Page};
use crate::error::FolioError;
use crate::evader::PointerEvader;
use crate::events::AnimationEvent;
use crate::geometry::Point;
use crate::media::MediaController;
use crate::nav::{CursorFollower, ProjectRows, ScrollLinks};
use crate::reveal::{prepare_letter_reveal, prepare_stagger_reveal};
use crate::scroll::{ScrollEffects, ScrollStyler};
use crate::selectors;
use crate::trigger::ViewportTriggers;

/// What the embedder must do after a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClickOutcome {
    pub prevent_default: bool,
    /// Element to focus once the site is no longer borrowed.
    pub focus: Option<NodeId>,
}

/// State visible to trigger callbacks.
#[derive(Debug)]
pub struct Stage<P> {
    pub page: P,
    pub animator: Animator,
    handles: Vec<AnimationHandle>,
}

impl<P> Stage<P> {
    fn track(&mut self, started: crate::error::Result<AnimationHandle>, what: &str) {
        match started {
            Ok(handle) => self.handles.push(handle),
            Err(
                err @ (FolioError::AlreadyAnimated { .. } | FolioError::MissingElement { .. }),
            ) => debug!(%err, what, "reveal skipped"),
            Err(err) => warn!(%err, what, "reveal failed"),
        }
    }
}

fn reveal_letters<P: Page>(stage: &mut Stage<P>, node: NodeId, step_ms: f64) {
    let started = prepare_letter_reveal(&mut stage.page, node, step_ms)
        .map(|seq| stage.animator.start_sequence(seq));
    stage.track(started, "letters");
}

fn reveal_stagger<P: Page>(stage: &mut Stage<P>, node: NodeId, rule: &StaggerRevealRule) {
    let started = prepare_stagger_reveal(&mut stage.page, node, rule)
        .map(|seq| stage.animator.start_sequence(seq));
    stage.track(started, "stagger");
}

fn reveal_class<P: Page>(stage: &mut Stage<P>, node: NodeId, rule: &ClassRevealRule) {
    stage.page.add_class(node, &rule.class);
    for companion in &rule.companions {
        if let Some(other) = stage.page.query(companion) {
            stage.page.add_class(other, &rule.class);
        }
    }
}

fn reveal_scramble<P: Page>(stage: &mut Stage<P>, node: NodeId, config: &ScrambleConfig) {
    let started = stage.animator.start_scramble(&mut stage.page, node, config);
    stage.track(started, "scramble");
}

pub struct Site<P: Page + MediaBackend + 'static> {
    stage: Stage<P>,
    triggers: ViewportTriggers<Stage<P>>,
    scroll: ScrollStyler,
    media: Option<MediaController>,
    evader: PointerEvader,
    links: ScrollLinks,
    rows: ProjectRows,
    follower: Option<CursorFollower>,
    contact: Option<ContactForm>,
}

impl<P: Page + MediaBackend + 'static> std::fmt::Debug for Site<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("triggers", &self.triggers)
            .field("active_animations", &self.stage.animator.active_count())
            .field("media", &self.media.is_some())
            .field("contact", &self.contact.is_some())
            .finish_non_exhaustive()
    }
}

impl<P: Page + MediaBackend + 'static> Site<P> {
    pub fn new(page: P, config: &FolioConfig) -> Self {
        Self::with_animator(page, config, Animator::new())
    }

    /// Build with a specific animator, e.g. one with a fixed seed.
    pub fn with_animator(mut page: P, config: &FolioConfig, animator: Animator) -> Self {
        let scroll = ScrollStyler::attach(&mut page, &config.scroll);
        let media = MediaController::attach(&mut page, &config.media);
        let evader = PointerEvader::attach(&mut page, &config.evader);
        let links = ScrollLinks::attach(&mut page);
        let rows = ProjectRows::attach(&mut page, &config.navigation);
        let follower = CursorFollower::attach(&mut page);
        let contact = ContactForm::attach(&mut page, &config.contact);

        let mut triggers = ViewportTriggers::new();
        register_reveals(&mut triggers, &mut page, config);

        debug!(
            triggers = triggers.len(),
            media = media.is_some(),
            contact = contact.is_some(),
            "site attached"
        );
        Self {
            stage: Stage {
                page,
                animator,
                handles: Vec::new(),
            },
            triggers,
            scroll,
            media,
            evader,
            links,
            rows,
            follower,
            contact,
        }
    }

    pub fn page(&self) -> &P {
        &self.stage.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.stage.page
    }

    pub fn animator(&self) -> &Animator {
        &self.stage.animator
    }

    pub fn triggers(&self) -> &ViewportTriggers<Stage<P>> {
        &self.triggers
    }

    pub fn media(&self) -> Option<&MediaController> {
        self.media.as_ref()
    }

    pub fn evader(&self) -> &PointerEvader {
        &self.evader
    }

    pub fn follower(&self) -> Option<&CursorFollower> {
        self.follower.as_ref()
    }

    pub fn contact(&self) -> Option<&ContactForm> {
        self.contact.as_ref()
    }

    /// Handles of every reveal started so far.
    pub fn handles(&self) -> &[AnimationHandle] {
        &self.stage.handles
    }

    /// Initial pass: fire triggers already in view and apply scroll styling.
    pub fn on_load(&mut self) -> ScrollEffects {
        let reports = self.triggers.measure(&self.stage.page);
        for (node, ratio, intersecting) in reports {
            self.triggers
                .handle_intersection(&mut self.stage, node, ratio, intersecting);
        }
        self.on_scroll()
    }

    pub fn on_scroll(&mut self) -> ScrollEffects {
        let effects = self.scroll.on_scroll(&mut self.stage.page);
        if let (Some(media), Some(in_view)) = (&self.media, effects.video_in_view) {
            let action = media.on_visibility(&mut self.stage.page, in_view);
            trace!(?action, in_view, "video visibility");
        }
        effects
    }

    /// An intersection report from the browser. Returns the number of
    /// triggers fired.
    pub fn on_intersection(&mut self, node: NodeId, ratio: f64, is_intersecting: bool) -> usize {
        self.triggers
            .handle_intersection(&mut self.stage, node, ratio, is_intersecting)
    }

    /// Advance every running reveal. Returns whether another frame is needed.
    pub fn tick(&mut self, delta_ms: f64) -> bool {
        let Stage { page, animator, .. } = &mut self.stage;
        animator.update(page, delta_ms);
        animator.has_active()
    }

    pub fn needs_animation_frame(&self) -> bool {
        self.stage.animator.has_active()
    }

    /// Lifecycle events since the last call; handles of finished or
    /// cancelled animations are released.
    pub fn drain_animation_events(&mut self) -> Vec<AnimationEvent> {
        let events = self.stage.animator.drain_events();
        let animator = &self.stage.animator;
        self.stage.handles.retain(|h| animator.is_active(h.id()));
        events
    }

    /// Cancel every running reveal.
    pub fn cancel_all(&mut self) {
        for handle in self.stage.handles.drain(..) {
            handle.cancel();
        }
    }

    /// A media notification. Returns whether the visualizer loop must run.
    pub fn on_media_event(&mut self, event: MediaEvent) -> bool {
        let Some(media) = self.media.as_mut() else {
            return false;
        };
        match event {
            MediaEvent::Played(_) => media.on_play(&mut self.stage.page),
            MediaEvent::Paused(_) => {
                media.on_pause();
                false
            }
            MediaEvent::AutoplayRejected(_, reason) => {
                media.on_autoplay_rejected(&mut self.stage.page, &reason);
                false
            }
        }
    }

    /// One visualizer frame. Returns whether to keep sampling.
    pub fn on_visualizer_frame(&mut self) -> bool {
        self.media
            .as_mut()
            .is_some_and(|media| media.on_frame(&mut self.stage.page))
    }

    pub fn on_pointer_move(&mut self, pointer: Point) -> usize {
        self.evader.on_pointer_move(&mut self.stage.page, pointer)
    }

    pub fn on_pointer_leave(&mut self, button: NodeId) {
        self.evader.on_pointer_leave(&mut self.stage.page, button);
    }

    pub fn on_carousel_enter(&mut self) {
        if let Some(follower) = &self.follower {
            follower.on_enter(&mut self.stage.page);
        }
    }

    pub fn on_carousel_leave(&mut self) {
        if let Some(follower) = &self.follower {
            follower.on_leave(&mut self.stage.page);
        }
    }

    pub fn on_carousel_move(&mut self, pointer: Point) {
        if let Some(follower) = &self.follower {
            follower.on_move(&mut self.stage.page, pointer);
        }
    }

    /// A click anywhere on the page.
    ///
    /// Nothing is focused while the click is handled; the embedder focuses
    /// [`ClickOutcome::focus`] afterwards, when the resulting blur can be
    /// delivered to [`Site::on_blur`].
    pub fn on_click(&mut self, target: NodeId) -> ClickOutcome {
        let page = &mut self.stage.page;
        if self.links.on_click(page, target) {
            return ClickOutcome {
                prevent_default: true,
                focus: None,
            };
        }
        if let Some(media) = self.media.as_mut() {
            if page
                .closest(target, selectors::MUTE_BUTTON)
                .is_some_and(|n| media.is_mute_button(n))
            {
                media.toggle_mute(page);
                return ClickOutcome::default();
            }
            if page
                .closest(target, selectors::PLAY_BUTTON)
                .is_some_and(|n| media.is_play_button(n))
            {
                media.on_play_button(page);
                return ClickOutcome::default();
            }
        }
        if self.rows.on_click(page, target).is_some() {
            return ClickOutcome::default();
        }
        ClickOutcome {
            prevent_default: false,
            focus: self
                .contact
                .as_ref()
                .and_then(|contact| contact.on_label_click(page, target)),
        }
    }

    /// A key press. Returns `true` when the default action must be prevented.
    pub fn on_key(&mut self, target: NodeId, key: &str) -> bool {
        self.rows.on_key(&mut self.stage.page, target, key)
    }

    /// The contact form was submitted. Returns the request to send, if any.
    pub fn on_submit(&mut self) -> Option<SubmitRequest> {
        self.contact
            .as_mut()?
            .begin_submit(&mut self.stage.page)
    }

    pub fn on_submit_result(&mut self, outcome: SubmitOutcome) {
        if let Some(contact) = self.contact.as_mut() {
            contact.finish(&mut self.stage.page, outcome);
        }
    }

    pub fn on_blur(&mut self, target: NodeId) {
        if let Some(contact) = &self.contact {
            contact.on_field_blur(&mut self.stage.page, target);
        }
    }

    pub fn on_option_hover(&mut self, option: NodeId, entering: bool) {
        if let Some(contact) = &self.contact {
            contact.on_option_hover(&mut self.stage.page, option, entering);
        }
    }

    pub fn on_change(&mut self, target: NodeId) {
        if let Some(contact) = &self.contact
            && contact.is_reason(target)
        {
            contact.on_reason_change(&mut self.stage.page);
        }
    }
}

fn register_reveals<P: Page + 'static>(
    triggers: &mut ViewportTriggers<Stage<P>>,
    page: &mut P,
    config: &FolioConfig,
) {
    for rule in &config.reveal.letters {
        let step_ms = rule.step_ms;
        for node in page.query_all(&rule.selector) {
            triggers.observe(Some(node), rule.threshold, move |stage: &mut Stage<P>, n| {
                reveal_letters(stage, n, step_ms)
            });
        }
    }
    for rule in &config.reveal.staggers {
        for node in page.query_all(&rule.trigger) {
            let rule = rule.clone();
            triggers.observe(Some(node), rule.threshold, move |stage: &mut Stage<P>, n| {
                reveal_stagger(stage, n, &rule)
            });
        }
    }
    for rule in &config.reveal.classes {
        for node in page.query_all(&rule.selector) {
            let rule = rule.clone();
            triggers.observe(Some(node), rule.threshold, move |stage: &mut Stage<P>, n| {
                reveal_class(stage, n, &rule)
            });
        }
    }
    for node in page.query_all(&config.scramble.selector) {
        let scramble = config.scramble.clone();
        triggers.observe(Some(node), scramble.threshold, move |stage: &mut Stage<P>, n| {
            reveal_scramble(stage, n, &scramble)
        });
    }
}
