//! Folio configuration system
//!
//! This crate holds every tunable constant of the page interaction layer:
//! scroll thresholds, reveal timings, scramble parameters, visualizer and
//! evader settings. Values are loaded from `folio.toml`; the browser build
//! embeds that file at compile time and parses it with [`FolioConfig::from_toml_str`].

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors produced while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FolioConfig {
    /// Console logging settings
    pub log: LogConfig,
    /// Scroll-derived styling (navbar, rotating icons)
    pub scroll: ScrollConfig,
    /// Viewport-triggered reveals
    pub reveal: RevealConfig,
    /// Scramble-to-reveal text effect
    pub scramble: ScrambleConfig,
    /// Video visualizer
    pub media: MediaConfig,
    /// Hover-evasive buttons
    pub evader: EvaderConfig,
    /// Contact form behavior
    pub contact: ContactConfig,
    /// Navigation affordances
    pub navigation: NavigationConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum level forwarded to the browser console (error, warn, info, debug, trace)
    pub level: String,
}

/// Scroll styling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// The navbar becomes visible once `scrollY` is strictly greater than this
    pub navbar_threshold_px: f64,
    /// Sections that invert the navbar colors while it overlaps them
    pub landmarks: Vec<String>,
    /// Elements rotated proportionally to the scroll position
    pub rotations: Vec<RotationRule>,
}

/// One scroll-driven rotation: `angle = scrollY * factor` degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationRule {
    pub selector: String,
    pub factor: f64,
}

/// Reveal configuration, one entry per call site
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Headings revealed letter by letter
    pub letters: Vec<LetterRevealRule>,
    /// Groups of children popped in one after another
    pub staggers: Vec<StaggerRevealRule>,
    /// Elements that receive a class once, on first intersection
    pub classes: Vec<ClassRevealRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetterRevealRule {
    pub selector: String,
    pub threshold: f64,
    pub step_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaggerRevealRule {
    /// Element whose intersection starts the reveal; it also carries the `animated` marker
    pub trigger: String,
    /// Children revealed in document order
    pub items: String,
    /// Optional element revealed before the items
    #[serde(default)]
    pub lead: Option<String>,
    pub threshold: f64,
    #[serde(default)]
    pub lead_delay_ms: f64,
    #[serde(default)]
    pub base_delay_ms: f64,
    pub step_ms: f64,
    #[serde(default = "default_reveal_class")]
    pub class: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRevealRule {
    pub selector: String,
    pub threshold: f64,
    #[serde(default = "default_reveal_class")]
    pub class: String,
    /// Elements that receive the same class at the same moment
    #[serde(default)]
    pub companions: Vec<String>,
}

fn default_reveal_class() -> String {
    "visible".to_string()
}

/// Scramble effect configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrambleConfig {
    pub selector: String,
    pub threshold: f64,
    /// Pause after a character is committed, in milliseconds
    pub speed_ms: f64,
    /// Interval between flicker frames, in milliseconds
    pub scramble_speed_ms: f64,
    /// Flicker frames rendered per character
    pub scramble_count: u32,
    /// Characters drawn for flicker frames
    pub charset: String,
}

/// Audio visualizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub bar_count: usize,
    pub fft_size: u32,
    /// `scaleY` applied to a bar at full magnitude
    pub max_scale: f64,
}

/// Evasive button configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaderConfig {
    pub selector: String,
    /// Bounding container, matched with `closest`
    pub container: String,
    pub max_move: f64,
    pub trigger_distance: f64,
    /// Offsets closer than this to the last applied one are not written
    pub min_delta: f64,
}

/// Contact form configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactConfig {
    pub success_url: String,
    pub failure_message: String,
    pub sending_label: String,
}

/// Navigation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Project rows toggle `expanded` on click at or below this viewport width
    pub expand_max_width: f64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            navbar_threshold_px: 50.0,
            landmarks: vec![
                ".services-section".to_string(),
                ".sworks-section".to_string(),
                ".contact-section".to_string(),
            ],
            rotations: vec![
                RotationRule {
                    selector: ".rotating-icon".to_string(),
                    factor: 1.0 / 3.0,
                },
                RotationRule {
                    selector: ".rotating-icon-fast".to_string(),
                    factor: 1.5,
                },
            ],
        }
    }
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            letters: vec![LetterRevealRule {
                selector: ".services-section h2".to_string(),
                threshold: 0.3,
                step_ms: 50.0,
            }],
            staggers: vec![
                StaggerRevealRule {
                    trigger: ".services-section".to_string(),
                    items: ".service-item".to_string(),
                    lead: Some(".services-sticker".to_string()),
                    threshold: 0.2,
                    lead_delay_ms: 100.0,
                    base_delay_ms: 300.0,
                    step_ms: 150.0,
                    class: default_reveal_class(),
                },
                StaggerRevealRule {
                    trigger: ".sworks-section".to_string(),
                    items: ".project-row".to_string(),
                    lead: None,
                    threshold: 0.5,
                    lead_delay_ms: 0.0,
                    base_delay_ms: 0.0,
                    step_ms: 100.0,
                    class: default_reveal_class(),
                },
            ],
            classes: vec![
                ClassRevealRule {
                    selector: ".hero-text".to_string(),
                    threshold: 0.0,
                    class: default_reveal_class(),
                    companions: vec![".stickers-container".to_string()],
                },
                ClassRevealRule {
                    selector: ".intro-text".to_string(),
                    threshold: 0.1,
                    class: default_reveal_class(),
                    companions: Vec::new(),
                },
                ClassRevealRule {
                    selector: ".background-text".to_string(),
                    threshold: 0.8,
                    class: default_reveal_class(),
                    companions: Vec::new(),
                },
                ClassRevealRule {
                    selector: ".currently-text".to_string(),
                    threshold: 0.8,
                    class: default_reveal_class(),
                    companions: Vec::new(),
                },
            ],
        }
    }
}

impl Default for ScrambleConfig {
    fn default() -> Self {
        Self {
            selector: ".codify-text".to_string(),
            threshold: 0.5,
            speed_ms: 25.0,
            scramble_speed_ms: 15.0,
            scramble_count: 1,
            charset: "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()"
                .to_string(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            bar_count: 20,
            fft_size: 256,
            max_scale: 5.0,
        }
    }
}

impl Default for EvaderConfig {
    fn default() -> Self {
        Self {
            selector: ".services-list button".to_string(),
            container: ".services-list".to_string(),
            max_move: 150.0,
            trigger_distance: 100.0,
            min_delta: 0.5,
        }
    }
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            success_url: "thankyou.html".to_string(),
            failure_message: "There was a problem with your submission. Please try again."
                .to_string(),
            sending_label: "Sending...".to_string(),
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            expand_max_width: 430.0,
        }
    }
}

impl FolioConfig {
    /// Parse configuration from TOML text. Missing sections and keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from `folio.toml` in the current directory,
    /// or return the default configuration if it is absent or invalid
    pub fn load_or_default() -> Self {
        Self::load_from_file("folio.toml").unwrap_or_default()
    }
}
