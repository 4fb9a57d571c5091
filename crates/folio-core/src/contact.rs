//! Contact form: submit state machine and field shims.
//!
//! The form is posted by the embedder. [`ContactForm::begin_submit`] flips
//! the UI into its sending state and describes the request;
//! [`ContactForm::finish`] receives the outcome.

use folio_config::ContactConfig;
use tracing::{debug, info, warn};

use crate::dom::{NodeId, Page};
use crate::selectors;

/// Header value sent with the submission.
pub const ACCEPT_JSON: &str = "application/json";

/// How the POST ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The server answered with this HTTP status.
    Status(u16),
    /// No response at all.
    NetworkError(String),
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Status(status) if (200..300).contains(status))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Sending {
        original_label: String,
    },
}

/// What the embedder must send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub form: NodeId,
    pub action: String,
    pub accept: &'static str,
}

#[derive(Debug, Clone)]
pub struct ContactForm {
    form: NodeId,
    button: Option<NodeId>,
    reason: Option<NodeId>,
    options: Vec<NodeId>,
    labels: Vec<NodeId>,
    fields: Vec<NodeId>,
    state: SubmissionState,
    config: ContactConfig,
}

impl ContactForm {
    /// Needs `#contact-form`. Everything else is optional.
    pub fn attach(page: &mut dyn Page, config: &ContactConfig) -> Option<Self> {
        let form = page.query(selectors::CONTACT_FORM)?;
        Some(Self {
            form,
            button: page.query(selectors::SEND_BUTTON),
            reason: page.query(selectors::REASON),
            options: page.query_all(selectors::REASON_OPTION),
            labels: page.query_all(selectors::INPUT_LABEL),
            fields: page.query_all(selectors::INPUT_FIELD),
            state: SubmissionState::Idle,
            config: config.clone(),
        })
    }

    pub fn form(&self) -> NodeId {
        self.form
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn is_sending(&self) -> bool {
        matches!(self.state, SubmissionState::Sending { .. })
    }

    pub fn is_label(&self, node: NodeId) -> bool {
        self.labels.contains(&node)
    }

    pub fn is_field(&self, node: NodeId) -> bool {
        self.fields.contains(&node)
    }

    pub fn is_reason(&self, node: NodeId) -> bool {
        self.reason == Some(node)
    }

    pub fn reason_options(&self) -> &[NodeId] {
        &self.options
    }

    pub fn is_reason_option(&self, node: NodeId) -> bool {
        self.options.contains(&node)
    }

    /// Enter the sending state. Returns `None` while a submission is already
    /// in flight.
    pub fn begin_submit(&mut self, page: &mut dyn Page) -> Option<SubmitRequest> {
        if self.is_sending() {
            debug!("submit ignored, already sending");
            return None;
        }
        let original_label = self.button.map(|b| page.text(b)).unwrap_or_default();
        if let Some(button) = self.button {
            page.set_text(button, &self.config.sending_label);
            page.set_attribute(button, "disabled", "");
        }
        self.state = SubmissionState::Sending { original_label };
        Some(SubmitRequest {
            form: self.form,
            action: page.attribute(self.form, "action").unwrap_or_default(),
            accept: ACCEPT_JSON,
        })
    }

    /// Any 2xx navigates to the success page. Everything else restores the
    /// button and shows the failure alert.
    pub fn finish(&mut self, page: &mut dyn Page, outcome: SubmitOutcome) {
        let SubmissionState::Sending { original_label } = std::mem::take(&mut self.state) else {
            debug!(?outcome, "submission outcome without a pending submit");
            return;
        };
        if outcome.is_success() {
            info!("contact form sent");
            page.navigate(&self.config.success_url);
            return;
        }
        warn!(?outcome, "contact form submission failed");
        if let Some(button) = self.button {
            page.set_text(button, &original_label);
            page.remove_attribute(button, "disabled");
        }
        page.alert(&self.config.failure_message);
    }

    /// The input a clicked label points at through its `for` attribute.
    ///
    /// Focusing is left to the caller: in a browser it raises `focusout` on
    /// the previous field synchronously, and that blur must reach
    /// [`ContactForm::on_field_blur`].
    pub fn on_label_click(&self, page: &mut dyn Page, target: NodeId) -> Option<NodeId> {
        let label = page
            .closest(target, selectors::INPUT_LABEL)
            .filter(|&l| self.is_label(l))?;
        let target = page.attribute(label, "for")?;
        page.query(&format!("#{target}"))
    }

    /// An empty field shows its label again when it loses focus.
    pub fn on_field_blur(&self, page: &mut dyn Page, field: NodeId) {
        if !self.is_field(field) || !page.value(field).is_empty() {
            return;
        }
        let Some(id) = page.attribute(field, "id") else {
            return;
        };
        if let Some(label) = page.query(&format!("label[for=\"{id}\"]")) {
            page.set_style(label, "display", "block");
        }
    }

    /// A chosen reason switches the select from placeholder grey to text color.
    pub fn on_reason_change(&self, page: &mut dyn Page) {
        if let Some(reason) = self.reason
            && !page.value(reason).is_empty()
        {
            page.set_style(reason, "color", "#333");
        }
    }

    /// Hover colouring for the reason dropdown's options. Leaving keeps the
    /// hover colours on the selected option.
    pub fn on_option_hover(&self, page: &mut dyn Page, option: NodeId, entering: bool) {
        if !self.is_reason_option(option) {
            return;
        }
        if entering {
            page.set_style(option, "background-color", "#333");
            page.set_style(option, "color", "white");
            return;
        }
        let selected = self
            .reason
            .is_some_and(|reason| page.value(reason) == page.value(option));
        if !selected {
            page.set_style(option, "background-color", "white");
            page.set_style(option, "color", "#333");
        }
    }
}
