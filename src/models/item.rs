use serde::{Deserialize, Serialize};

/// Anything a visitor can claim a one-time reward for: an achievement card,
/// a skill category, a project, the profile photo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockableItem {
    pub key: String,
    pub reward_amount: u64,
}

impl UnlockableItem {
    pub fn new(key: impl Into<String>, reward_amount: u64) -> Self {
        Self {
            key: key.into(),
            reward_amount,
        }
    }
}
