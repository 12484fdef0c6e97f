use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ContactPayload;

use super::validation::is_valid_contact;

/// Recoverable problems shown to the visitor. Each one leaves the form in a
/// stage where they can try again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(rename_all = "camelCase")]
pub enum ContactError {
    #[error("please enter a message")]
    EmptyMessage,
    #[error("please enter a valid email address or phone number")]
    InvalidContact,
    #[error("the message could not be sent, please try again")]
    DeliveryFailed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ContactStage {
    #[default]
    Message,
    Contact,
}

/// Two-step contact form: message first, then an email or phone number.
///
/// Errors stay in `last_error` until the next transition (submit, back, open,
/// close); editing the text does not clear them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub stage: ContactStage,
    pub message_text: String,
    pub contact_value: String,
    pub last_error: Option<ContactError>,
    pub is_submitting: bool,
    pub is_success: bool,
    pub is_open: bool,
    /// Bumped whenever the form is opened, closed or reset so late delivery
    /// results can tell the form they were started from is gone.
    #[serde(skip)]
    pub generation: u64,
}

impl ContactSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_message_text(&mut self, text: impl Into<String>) {
        self.message_text = text.into();
    }

    pub fn set_contact_value(&mut self, value: impl Into<String>) {
        self.contact_value = value.into();
    }

    /// Moves from the message stage to the contact stage. Outside the message
    /// stage this does nothing.
    pub fn submit_message(&mut self) -> Result<(), ContactError> {
        if self.stage != ContactStage::Message || self.is_success {
            return Ok(());
        }

        if self.message_text.trim().is_empty() {
            self.last_error = Some(ContactError::EmptyMessage);
            return Err(ContactError::EmptyMessage);
        }

        self.last_error = None;
        self.stage = ContactStage::Contact;
        Ok(())
    }

    /// Validates the contact value and, if it passes, marks the form as
    /// submitting and returns the payload to hand to the notifier.
    ///
    /// `Ok(None)` means there is nothing to send right now: wrong stage, a
    /// delivery already in flight, or a success still on display.
    pub fn begin_delivery(&mut self) -> Result<Option<ContactPayload>, ContactError> {
        if self.stage != ContactStage::Contact || self.is_submitting || self.is_success {
            return Ok(None);
        }

        if !is_valid_contact(&self.contact_value) {
            self.last_error = Some(ContactError::InvalidContact);
            return Err(ContactError::InvalidContact);
        }

        self.last_error = None;
        self.is_submitting = true;
        Ok(Some(ContactPayload::new(
            self.contact_value.clone(),
            self.message_text.clone(),
        )))
    }

    pub fn complete_delivery(&mut self) {
        self.is_submitting = false;
        self.is_success = true;
    }

    pub fn fail_delivery(&mut self) {
        self.is_submitting = false;
        self.last_error = Some(ContactError::DeliveryFailed);
    }

    /// Clears an in-flight marker without recording an outcome.
    pub fn abandon_delivery(&mut self) {
        self.is_submitting = false;
    }

    /// Contact stage back to message stage, keeping the message text.
    pub fn back(&mut self) {
        if self.stage != ContactStage::Contact || self.is_submitting || self.is_success {
            return;
        }
        self.stage = ContactStage::Message;
        self.last_error = None;
    }

    pub fn open(&mut self) {
        self.restart(true);
    }

    pub fn close(&mut self) {
        self.restart(false);
    }

    fn restart(&mut self, is_open: bool) {
        *self = Self {
            is_open,
            generation: self.generation.wrapping_add(1),
            ..Self::new()
        };
    }
}
