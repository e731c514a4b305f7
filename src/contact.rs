//! Contact form submission through an external message relay.

use crate::error::{RevealError, RevealResult};

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactForm {
    /// All fields are required; the email needs an `@` with text on both sides.
    pub fn validate(&self) -> RevealResult<()> {
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("message", &self.message),
        ] {
            if value.trim().is_empty() {
                return Err(RevealError::validation(format!("{field} is required")));
            }
        }
        match self.email.trim().split_once('@') {
            Some((user, domain)) if !user.is_empty() && !domain.is_empty() => Ok(()),
            _ => Err(RevealError::validation(format!(
                "'{}' is not an email address",
                self.email
            ))),
        }
    }
}

/// Credentials identifying the relay account and message template.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RelayConfig {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
}

impl RelayConfig {
    pub fn validate(&self) -> RevealResult<()> {
        for (field, value) in [
            ("service_id", &self.service_id),
            ("template_id", &self.template_id),
            ("public_key", &self.public_key),
        ] {
            if value.trim().is_empty() {
                return Err(RevealError::validation(format!(
                    "relay {field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("relay rejected the message: {0}")]
    Rejected(String),

    #[error("relay unreachable: {0}")]
    Unreachable(String),
}

pub trait MessageRelay {
    fn send(&self, config: &RelayConfig, form: &ContactForm) -> Result<(), RelayError>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Sent,
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Name,
    Email,
    Message,
}

/// Form fields plus the status of the last submission.
#[derive(Clone, Debug, Default)]
pub struct ContactFormState {
    form: ContactForm,
    status: SubmissionStatus,
}

impl ContactFormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Name => self.form.name = value,
            Field::Email => self.form.email = value,
            Field::Message => self.form.message = value,
        }
    }

    pub fn form(&self) -> &ContactForm {
        &self.form
    }

    pub fn status(&self) -> &SubmissionStatus {
        &self.status
    }

    /// Sends the form once. Fields are cleared only on success; failures are
    /// reported in the status and not retried.
    pub fn submit(&mut self, relay: &dyn MessageRelay, config: &RelayConfig) -> &SubmissionStatus {
        if let Err(e) = config.validate().and_then(|_| self.form.validate()) {
            self.status = SubmissionStatus::Failed(e.to_string());
            return &self.status;
        }

        self.status = match relay.send(config, &self.form) {
            Ok(()) => {
                tracing::info!("contact message sent");
                self.form = ContactForm::default();
                SubmissionStatus::Sent
            }
            Err(e) => {
                tracing::warn!(error = %e, "contact message failed");
                SubmissionStatus::Failed(e.to_string())
            }
        };
        &self.status
    }
}
