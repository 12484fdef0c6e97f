use std::future::Future;

use thiserror::Error;

use crate::{
    db::{Database, OutboxMessage},
    models::ContactPayload,
};

const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("notification rejected: {0}")]
    Rejected(String),
    #[error("notification transport unavailable")]
    Unavailable(#[from] anyhow::Error),
}

/// Outbound "someone wants to get in touch" capability. The form only cares
/// whether the call succeeded.
pub trait Notifier: Send + Sync + 'static {
    fn send(
        &self,
        payload: ContactPayload,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Queues contact requests in the local database; a relay process forwards
/// them to the mailbox.
#[derive(Clone)]
pub struct OutboxNotifier {
    db: Database,
}

impl OutboxNotifier {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl Notifier for OutboxNotifier {
    async fn send(&self, payload: ContactPayload) -> Result<(), DeliveryError> {
        if payload.message_text.trim().is_empty() {
            return Err(DeliveryError::Rejected("empty message".into()));
        }

        let message = OutboxMessage::new(payload);
        self.db.insert_outbox_message(&message).await?;
        log_info!("queued contact request {} in outbox", message.id);
        Ok(())
    }
}
