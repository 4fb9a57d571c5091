//! Page structure contract: selectors and marker classes the markup must use.

pub const NAVBAR: &str = ".navbar";
pub const VIDEO_CONTAINER: &str = ".video-container";
pub const VIDEO: &str = "#myVideo";
pub const MUTE_BUTTON: &str = "#muteBtn";
pub const VISUALIZER: &str = "#visualizer";
pub const PLAY_BUTTON: &str = ".play-btn";

pub const SCROLL_BUTTON: &str = "#scrollBtn";
pub const INTRO_SECTION: &str = "#intro-section";
pub const PROJECT_LINK: &str = "a[href=\"#project-table\"]";
pub const PROJECT_TABLE: &str = "#project-table";
pub const PROJECT_ROW: &str = ".project-row";
pub const PROJECT_NAME: &str = ".project-name";

pub const CAROUSEL: &str = ".carousel";
pub const CURSOR_FOLLOWER: &str = ".cursor-follower";

pub const CONTACT_FORM: &str = "#contact-form";
pub const SEND_BUTTON: &str = "#send-button";
pub const REASON: &str = "#reason";
pub const REASON_OPTION: &str = "#reason option";
pub const INPUT_LABEL: &str = ".input-label";
pub const INPUT_FIELD: &str = ".input-field";

// Marker and state classes
pub const VISIBLE: &str = "visible";
pub const INVERTED: &str = "inverted";
pub const SCROLLED: &str = "scrolled";
pub const MUTED: &str = "muted";
pub const ANIMATED: &str = "animated";
pub const CODIFIED: &str = "codified";
pub const EXPANDED: &str = "expanded";
pub const LETTER: &str = "letter";
pub const BAR: &str = "bar";
