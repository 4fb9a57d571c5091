//! Scramble-to-reveal text effect.
//!
//! Characters are revealed one at a time. Each character first shows
//! `scramble_count` flicker frames (the committed prefix plus one random
//! character) at `scramble_speed_ms` intervals; the real character is
//! committed on the last flicker tick, then the effect waits `speed_ms`
//! before starting the next character.
//!
//! ```text
//! Idle ──► Flickering(0) ──tick──► Flickering(n) ──tick (n+1 == count)──► Committed
//!                 ▲                                                         │
//!                 └──────────────────────── tick (more chars) ◄─────────────┘
//!                                           Done ◄── commit of the last char
//! ```
//!
//! The machine is clock-free: [`ScrambleReveal::step`] returns the frames to
//! render now and the delay until it must be stepped again. The
//! [`Animator`](crate::animator::Animator) owns the clock.

use folio_config::ScrambleConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ScramblePhase {
    Idle,
    Flickering { count: u32 },
    Committed,
    Done,
}

/// One text write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrambleFrame {
    /// Committed prefix followed by one random character.
    Flicker(String),
    /// Committed prefix, just extended by the real character.
    Commit(String),
}

impl ScrambleFrame {
    pub fn text(&self) -> &str {
        match self {
            Self::Flicker(text) | Self::Commit(text) => text,
        }
    }
}

/// Result of one [`ScrambleReveal::step`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScrambleStep {
    pub frames: Vec<ScrambleFrame>,
    /// Delay before the next step, `None` once done.
    pub next_in_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrambleTimings {
    pub speed_ms: f64,
    pub scramble_speed_ms: f64,
    pub scramble_count: u32,
}

impl From<&ScrambleConfig> for ScrambleTimings {
    fn from(config: &ScrambleConfig) -> Self {
        Self {
            speed_ms: config.speed_ms,
            scramble_speed_ms: config.scramble_speed_ms,
            scramble_count: config.scramble_count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrambleReveal {
    target: Vec<char>,
    charset: Vec<char>,
    committed: String,
    index: usize,
    phase: ScramblePhase,
    timings: ScrambleTimings,
    flicker_frames: usize,
}

impl ScrambleReveal {
    /// An empty charset falls back to `?` for flicker frames.
    pub fn new(text: &str, charset: &str, timings: ScrambleTimings) -> Self {
        let mut charset: Vec<char> = charset.chars().collect();
        if charset.is_empty() {
            charset.push('?');
        }
        Self {
            target: text.chars().collect(),
            charset,
            committed: String::new(),
            index: 0,
            phase: ScramblePhase::Idle,
            timings,
            flicker_frames: 0,
        }
    }

    pub fn from_config(text: &str, config: &ScrambleConfig) -> Self {
        Self::new(text, &config.charset, ScrambleTimings::from(config))
    }

    pub fn phase(&self) -> ScramblePhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == ScramblePhase::Done
    }

    /// Text committed so far.
    pub fn committed(&self) -> &str {
        &self.committed
    }

    /// Index of the character being revealed.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Flicker frames rendered so far.
    pub fn flicker_frames(&self) -> usize {
        self.flicker_frames
    }

    pub fn step(&mut self, rng: &mut impl Rng) -> ScrambleStep {
        match self.phase {
            ScramblePhase::Idle => {
                if self.target.is_empty() {
                    self.phase = ScramblePhase::Done;
                    return ScrambleStep::default();
                }
                self.phase = ScramblePhase::Flickering { count: 0 };
                ScrambleStep {
                    frames: Vec::new(),
                    next_in_ms: Some(self.timings.scramble_speed_ms),
                }
            }
            ScramblePhase::Flickering { count } => {
                let mut frames = Vec::with_capacity(2);
                let count = count + 1;
                if self.timings.scramble_count > 0 {
                    let noise = self.charset[rng.gen_range(0..self.charset.len())];
                    frames.push(ScrambleFrame::Flicker(format!("{}{noise}", self.committed)));
                    self.flicker_frames += 1;
                }
                if count < self.timings.scramble_count {
                    self.phase = ScramblePhase::Flickering { count };
                    return ScrambleStep {
                        frames,
                        next_in_ms: Some(self.timings.scramble_speed_ms),
                    };
                }
                self.committed.push(self.target[self.index]);
                self.index += 1;
                frames.push(ScrambleFrame::Commit(self.committed.clone()));
                if self.index >= self.target.len() {
                    self.phase = ScramblePhase::Done;
                    ScrambleStep {
                        frames,
                        next_in_ms: None,
                    }
                } else {
                    self.phase = ScramblePhase::Committed;
                    ScrambleStep {
                        frames,
                        next_in_ms: Some(self.timings.speed_ms),
                    }
                }
            }
            ScramblePhase::Committed => {
                self.phase = ScramblePhase::Flickering { count: 0 };
                ScrambleStep {
                    frames: Vec::new(),
                    next_in_ms: Some(self.timings.scramble_speed_ms),
                }
            }
            ScramblePhase::Done => ScrambleStep::default(),
        }
    }
}
