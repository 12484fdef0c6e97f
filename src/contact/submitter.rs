use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use serde::Serialize;
use tokio::{task::JoinHandle, time};

use crate::{
    celebration::{CelebrationCause, CelebrationController},
    flags::{PersistentFlags, HAS_SHOWN_FIRST_CHAT},
};

use super::{ContactError, ContactStage, ContactSubmission, Notifier};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SubmitOutcome {
    Delivered,
    /// Nothing was sent: wrong stage, a send already in flight, or the form
    /// was closed while the notifier was busy.
    Ignored,
}

/// Drives a [`ContactSubmission`] through the notifier and schedules the
/// post-success reset.
pub struct ContactRequestSubmitter<N: Notifier> {
    form: Arc<Mutex<ContactSubmission>>,
    notifier: Arc<N>,
    celebration: CelebrationController,
    flags: PersistentFlags,
    reset_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    success_display: Duration,
}

impl<N: Notifier> Clone for ContactRequestSubmitter<N> {
    fn clone(&self) -> Self {
        Self {
            form: self.form.clone(),
            notifier: self.notifier.clone(),
            celebration: self.celebration.clone(),
            flags: self.flags.clone(),
            reset_task: self.reset_task.clone(),
            success_display: self.success_display,
        }
    }
}

/// Clears `is_submitting` if the submit future is dropped mid-send.
struct InFlight<'a> {
    form: &'a Mutex<ContactSubmission>,
    generation: u64,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut form = lock(self.form);
        if form.generation == self.generation {
            form.abandon_delivery();
        }
    }
}

impl<N: Notifier> ContactRequestSubmitter<N> {
    pub fn new(
        notifier: N,
        celebration: CelebrationController,
        flags: PersistentFlags,
        success_display: Duration,
    ) -> Self {
        Self {
            form: Arc::new(Mutex::new(ContactSubmission::new())),
            notifier: Arc::new(notifier),
            celebration,
            flags,
            reset_task: Arc::new(Mutex::new(None)),
            success_display,
        }
    }

    pub fn snapshot(&self) -> ContactSubmission {
        lock(&self.form).clone()
    }

    /// Opens the form fresh.
    pub fn open(&self) {
        self.cancel_reset();
        lock(&self.form).open();
    }

    /// Closes the form, dropping any text and any pending reset.
    pub fn close(&self) {
        self.cancel_reset();
        lock(&self.form).close();
    }

    pub fn set_message_text(&self, text: impl Into<String>) {
        lock(&self.form).set_message_text(text);
    }

    pub fn set_contact_value(&self, value: impl Into<String>) {
        lock(&self.form).set_contact_value(value);
    }

    /// Returns the stage the form is in afterwards.
    pub fn submit_message(&self) -> Result<ContactStage, ContactError> {
        let mut form = lock(&self.form);
        form.submit_message()?;
        Ok(form.stage)
    }

    pub fn back(&self) {
        lock(&self.form).back();
    }

    pub async fn submit_contact(&self) -> Result<SubmitOutcome, ContactError> {
        let (payload, generation) = {
            let mut form = lock(&self.form);
            match form.begin_delivery()? {
                Some(payload) => (payload, form.generation),
                None => return Ok(SubmitOutcome::Ignored),
            }
        };

        let mut in_flight = InFlight {
            form: &self.form,
            generation,
            armed: true,
        };
        let result = self.notifier.send(payload).await;
        in_flight.armed = false;

        let mut form = lock(&self.form);
        if form.generation != generation {
            log_warn!("contact form closed during delivery; dropping result");
            return Ok(SubmitOutcome::Ignored);
        }

        match result {
            Ok(()) => {
                form.complete_delivery();
                drop(form);
                log_info!("contact request delivered");

                self.celebration.trigger_once(
                    &self.flags,
                    HAS_SHOWN_FIRST_CHAT,
                    CelebrationCause::FirstChatMessage,
                );
                self.schedule_reset(generation);
                Ok(SubmitOutcome::Delivered)
            }
            Err(err) => {
                form.fail_delivery();
                log_error!("contact request delivery failed: {err:#}");
                Err(ContactError::DeliveryFailed)
            }
        }
    }

    /// Cancels pending timers. Call when the owning view is torn down.
    pub fn shutdown(&self) {
        self.cancel_reset();
    }

    fn schedule_reset(&self, generation: u64) {
        let mut task = lock(&self.reset_task);
        if let Some(handle) = task.take() {
            handle.abort();
        }

        let form = self.form.clone();
        let delay = self.success_display;
        *task = Some(tokio::spawn(async move {
            time::sleep(delay).await;
            let mut form = lock(&form);
            if form.generation == generation {
                form.close();
            }
        }));
    }

    fn cancel_reset(&self) {
        if let Some(handle) = lock(&self.reset_task).take() {
            handle.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
