//! Video playback tied to viewport visibility, plus the audio visualizer.
//!
//! The controller never polls. The embedder forwards four kinds of events:
//! scroll verdicts ([`MediaController::on_visibility`]), media `play`/`pause`
//! notifications, one animation frame at a time while sampling, and autoplay
//! rejections.

use folio_config::MediaConfig;
use tracing::{debug, info, warn};

use crate::dom::{MediaBackend, NodeId, Page};
use crate::selectors;

/// What a visibility change asked the backend to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAction {
    Play,
    Pause,
    Nothing,
}

/// Scale for each of `bar_count` bars: bar `i` reads bin
/// `i * floor(len / bar_count)` and maps `0..=255` onto `0..=max_scale`.
pub fn bar_scales(data: &[u8], bar_count: usize, max_scale: f64) -> Vec<f64> {
    if bar_count == 0 {
        return Vec::new();
    }
    let stride = data.len() / bar_count;
    (0..bar_count)
        .map(|i| {
            let value = data.get(i * stride).copied().unwrap_or(0);
            f64::from(value) / 255.0 * max_scale
        })
        .collect()
}

/// Audio analysis pipeline, built on first playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Analyser {
    Pending,
    Ready,
    /// The backend could not build it; not retried.
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct MediaController {
    container: NodeId,
    video: NodeId,
    visualizer: Option<NodeId>,
    mute_button: Option<NodeId>,
    play_button: Option<NodeId>,
    config: MediaConfig,
    analyser: Analyser,
    buffer: Vec<u8>,
    bars: Vec<NodeId>,
    sampling: bool,
}

impl MediaController {
    /// Needs `.video-container` and `#myVideo`; the visualizer and mute
    /// button are optional. The video starts muted.
    pub fn attach<D>(doc: &mut D, config: &MediaConfig) -> Option<Self>
    where
        D: Page + MediaBackend + ?Sized,
    {
        let Some(container) = doc.query(selectors::VIDEO_CONTAINER) else {
            debug!("no video container, media controller inactive");
            return None;
        };
        let Some(video) = doc.query(selectors::VIDEO) else {
            debug!("no video element, media controller inactive");
            return None;
        };
        let controller = Self {
            container,
            video,
            visualizer: doc.query(selectors::VISUALIZER),
            mute_button: doc.query(selectors::MUTE_BUTTON),
            play_button: None,
            config: config.clone(),
            analyser: Analyser::Pending,
            buffer: Vec::new(),
            bars: Vec::new(),
            sampling: false,
        };
        doc.set_muted(video, true);
        controller.sync_mute_button(doc);
        Some(controller)
    }

    pub fn video(&self) -> NodeId {
        self.video
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn bars(&self) -> &[NodeId] {
        &self.bars
    }

    pub fn is_sampling(&self) -> bool {
        self.sampling
    }

    pub fn is_mute_button(&self, node: NodeId) -> bool {
        self.mute_button == Some(node)
    }

    pub fn is_play_button(&self, node: NodeId) -> bool {
        self.play_button == Some(node)
    }

    /// Pause when scrolled off, resume when scrolled back on. Media that
    /// played to the end stays paused.
    pub fn on_visibility(&self, backend: &mut dyn MediaBackend, in_view: bool) -> MediaAction {
        let paused = backend.is_paused(self.video);
        if !in_view && !paused {
            backend.pause(self.video);
            MediaAction::Pause
        } else if in_view && paused && !backend.has_ended(self.video) {
            backend.play(self.video);
            MediaAction::Play
        } else {
            MediaAction::Nothing
        }
    }

    /// Playback started. Builds the analyser and bars on first call and
    /// returns whether the frame loop should run.
    pub fn on_play<D>(&mut self, doc: &mut D) -> bool
    where
        D: Page + MediaBackend + ?Sized,
    {
        doc.resume_audio();
        if self.analyser == Analyser::Pending {
            self.analyser = match doc.connect_analyser(self.video, self.config.fft_size) {
                Some(bins) => {
                    self.buffer = vec![0; bins];
                    if let Some(visualizer) = self.visualizer {
                        self.bars = (0..self.config.bar_count)
                            .map(|_| doc.append_element(visualizer, "div", selectors::BAR))
                            .collect();
                    }
                    debug!(bins, bars = self.bars.len(), "audio visualizer ready");
                    Analyser::Ready
                }
                None => {
                    warn!("audio analyser unavailable, visualizer disabled");
                    Analyser::Unavailable
                }
            };
        }
        self.sampling = self.analyser == Analyser::Ready;
        self.sampling
    }

    /// Playback paused. Returns `true` if a frame loop was running.
    pub fn on_pause(&mut self) -> bool {
        std::mem::replace(&mut self.sampling, false)
    }

    /// One visualizer frame. Returns `false` once sampling has stopped.
    pub fn on_frame<D>(&mut self, doc: &mut D) -> bool
    where
        D: Page + MediaBackend + ?Sized,
    {
        if !self.sampling {
            return false;
        }
        if !doc.sample_frequencies(self.video, &mut self.buffer) {
            return false;
        }
        let scales = bar_scales(&self.buffer, self.bars.len(), self.config.max_scale);
        for (&bar, scale) in self.bars.iter().zip(scales) {
            doc.set_style(bar, "transform", &format!("scaleY({scale})"));
        }
        true
    }

    /// Autoplay was refused. Shows a centered manual play button, once.
    pub fn on_autoplay_rejected(&mut self, page: &mut dyn Page, reason: &str) {
        info!(%reason, "autoplay prevented by browser");
        if self.play_button.is_some() || page.query(selectors::PLAY_BUTTON).is_some() {
            return;
        }
        let button = page.append_element(self.container, "button", "play-btn");
        page.set_attribute(button, "aria-label", "Play video");
        page.set_style(button, "position", "absolute");
        page.set_style(button, "top", "50%");
        page.set_style(button, "left", "50%");
        page.set_style(button, "transform", "translate(-50%, -50%)");
        self.play_button = Some(button);
    }

    pub fn on_play_button<D>(&mut self, doc: &mut D)
    where
        D: Page + MediaBackend + ?Sized,
    {
        doc.play(self.video);
        if let Some(button) = self.play_button.take() {
            doc.remove(button);
        }
    }

    /// Flip mute. Returns whether the video is now muted.
    pub fn toggle_mute<D>(&self, doc: &mut D) -> bool
    where
        D: Page + MediaBackend + ?Sized,
    {
        let muted = !doc.is_muted(self.video);
        doc.set_muted(self.video, muted);
        self.sync_mute_button(doc);
        muted
    }

    fn sync_mute_button<D>(&self, doc: &mut D)
    where
        D: Page + MediaBackend + ?Sized,
    {
        if let Some(button) = self.mute_button {
            let muted = doc.is_muted(self.video);
            doc.set_class(button, selectors::MUTED, muted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MediaEvent, MemoryPage};

    fn page() -> (MemoryPage, NodeId, NodeId) {
        let mut page = MemoryPage::default();
        let container = page.add(None, "div.video-container");
        let video = page.add(Some(container), "video#myVideo");
        page.add(Some(container), "div#visualizer");
        page.add(None, "button#muteBtn");
        (page, container, video)
    }

    #[test]
    fn test_bar_scales() {
        let mut data = vec![0u8; 128];
        data[0] = 255;
        data[6] = 51;
        let scales = bar_scales(&data, 20, 5.0);
        assert_eq!(scales.len(), 20);
        assert_eq!(scales[0], 5.0);
        // Stride is floor(128 / 20) = 6
        assert!((scales[1] - 1.0).abs() < 1e-9);
        assert_eq!(scales[2], 0.0);
        assert_eq!(bar_scales(&data, 0, 5.0), Vec::<f64>::new());
        assert_eq!(bar_scales(&[], 3, 5.0), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_attach_requires_video() {
        let mut page = MemoryPage::default();
        page.add(None, "div.video-container");
        assert!(MediaController::attach(&mut page, &MediaConfig::default()).is_none());
    }

    #[test]
    fn test_starts_muted_and_toggles() {
        let (mut page, _, video) = page();
        let controller = MediaController::attach(&mut page, &MediaConfig::default()).unwrap();
        let mute = page.query("#muteBtn").unwrap();
        assert!(page.is_muted(video));
        assert!(page.has_class(mute, "muted"));

        assert!(!controller.toggle_mute(&mut page));
        assert!(!page.has_class(mute, "muted"));
        assert!(controller.toggle_mute(&mut page));
        assert!(page.has_class(mute, "muted"));
    }

    #[test]
    fn test_visibility_drives_playback() {
        let (mut page, _, video) = page();
        let controller = MediaController::attach(&mut page, &MediaConfig::default()).unwrap();

        assert_eq!(controller.on_visibility(&mut page, true), MediaAction::Play);
        assert!(!page.is_paused(video));
        assert_eq!(controller.on_visibility(&mut page, true), MediaAction::Nothing);
        assert_eq!(controller.on_visibility(&mut page, false), MediaAction::Pause);
        assert_eq!(controller.on_visibility(&mut page, false), MediaAction::Nothing);

        page.set_ended(video, true);
        assert_eq!(controller.on_visibility(&mut page, true), MediaAction::Nothing);
    }

    #[test]
    fn test_visualizer_built_once() {
        let (mut page, _, video) = page();
        let mut controller = MediaController::attach(&mut page, &MediaConfig::default()).unwrap();
        assert!(!controller.is_sampling());
        assert!(controller.on_play(&mut page));
        assert!(controller.is_sampling());
        assert!(controller.on_pause());
        assert!(!controller.on_pause());
        assert!(controller.on_play(&mut page));

        assert_eq!(page.query_all(".bar").len(), 20);
        assert_eq!(page.analyser_connects(), 1);
        assert_eq!(page.audio_resumes(), 2);

        let mut data = vec![0u8; 128];
        data[6] = 255;
        page.set_frequencies(video, data);
        assert!(controller.on_frame(&mut page));
        let bars = controller.bars().to_vec();
        assert_eq!(page.style(bars[0], "transform").as_deref(), Some("scaleY(0)"));
        assert_eq!(page.style(bars[1], "transform").as_deref(), Some("scaleY(5)"));

        controller.on_pause();
        assert!(!controller.on_frame(&mut page));
    }

    #[test]
    fn test_failed_analyser_is_not_rebuilt() {
        let (mut page, _, _) = page();
        page.set_analyser_available(false);
        let mut controller = MediaController::attach(&mut page, &MediaConfig::default()).unwrap();

        for _ in 0..3 {
            assert!(!controller.on_play(&mut page));
            controller.on_pause();
        }
        assert_eq!(page.analyser_connects(), 1);
        assert!(page.query_all(".bar").is_empty());
        assert!(!controller.on_frame(&mut page));

        // A later recovery of the backend does not revive the visualizer
        page.set_analyser_available(true);
        assert!(!controller.on_play(&mut page));
        assert_eq!(page.analyser_connects(), 1);
    }

    #[test]
    fn test_autoplay_fallback_button() {
        let (mut page, container, video) = page();
        let mut controller = MediaController::attach(&mut page, &MediaConfig::default()).unwrap();
        assert_eq!(controller.container(), container);
        page.set_autoplay_allowed(false);
        controller.on_visibility(&mut page, true);
        let rejected: Vec<_> = page
            .take_media_events()
            .into_iter()
            .filter_map(|e| match e {
                MediaEvent::AutoplayRejected(_, reason) => Some(reason),
                _ => None,
            })
            .collect();
        assert_eq!(rejected.len(), 1);

        controller.on_autoplay_rejected(&mut page, &rejected[0]);
        controller.on_autoplay_rejected(&mut page, &rejected[0]);
        let buttons = page.query_all(".play-btn");
        assert_eq!(buttons.len(), 1);
        assert_eq!(page.children(container).last(), Some(&buttons[0]));
        assert_eq!(page.style(buttons[0], "transform").as_deref(), Some("translate(-50%, -50%)"));
        assert!(controller.is_play_button(buttons[0]));

        page.set_autoplay_allowed(true);
        controller.on_play_button(&mut page);
        assert!(!page.is_paused(video));
        assert!(page.query(".play-btn").is_none());
    }
}
