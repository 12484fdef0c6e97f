use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

const POINTS_PER_LEVEL: u64 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSnapshot {
    pub total: u64,
    pub level: u64,
}

/// Session-wide discovery score. Only ever grows; a reload starts a new store.
///
/// Cloning is cheap and every clone shares the same total, so the store can be
/// handed to each component that awards or displays points.
#[derive(Clone)]
pub struct ScoreStore {
    total: Arc<watch::Sender<u64>>,
}

impl Default for ScoreStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { total: Arc::new(tx) }
    }

    /// Adds `amount` and returns the new total.
    pub fn increment(&self, amount: u64) -> u64 {
        let mut new_total = 0;
        self.total.send_modify(|total| {
            *total = total.saturating_add(amount);
            new_total = *total;
        });
        new_total
    }

    pub fn total(&self) -> u64 {
        *self.total.borrow()
    }

    pub fn level(&self) -> u64 {
        level_for(self.total())
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        let total = self.total();
        ScoreSnapshot {
            total,
            level: level_for(total),
        }
    }

    /// Receiver that always holds the latest total, for score displays.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.total.subscribe()
    }
}

pub fn level_for(total: u64) -> u64 {
    total / POINTS_PER_LEVEL + 1
}
