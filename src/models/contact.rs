use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the notification capability receives for one contact request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPayload {
    pub contact_value: String,
    pub message_text: String,
    pub submitted_at: DateTime<Utc>,
}

impl ContactPayload {
    pub fn new(contact_value: String, message_text: String) -> Self {
        Self {
            contact_value,
            message_text,
            submitted_at: Utc::now(),
        }
    }
}
