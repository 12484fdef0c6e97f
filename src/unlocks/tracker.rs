use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{models::UnlockableItem, score::ScoreStore};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Keys whose reward has already been paid out this session.
#[derive(Clone)]
pub struct UnlockTracker {
    consumed: Arc<Mutex<HashSet<String>>>,
    score: ScoreStore,
}

impl UnlockTracker {
    pub fn new(score: ScoreStore) -> Self {
        Self {
            consumed: Arc::new(Mutex::new(HashSet::new())),
            score,
        }
    }

    /// Records `item.key` and credits its reward, unless the key was already
    /// consumed. Returns whether the reward was paid.
    pub fn try_unlock(&self, item: &UnlockableItem) -> bool {
        // The membership write happens under the same guard as the check.
        let inserted = self
            .consumed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(item.key.clone());

        if !inserted {
            log_debug!("{} already unlocked; ignoring", item.key);
            return false;
        }

        let total = self.score.increment(item.reward_amount);
        log_info!(
            "unlocked {} (+{}), discovery score now {}",
            item.key,
            item.reward_amount,
            total
        );
        true
    }

    /// Marks `key` as consumed without paying anything. Used when a persisted
    /// flag says the reward was claimed before a reload.
    pub fn mark_consumed(&self, key: &str) -> bool {
        self.consumed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string())
    }

    pub fn is_unlocked(&self, key: &str) -> bool {
        self.consumed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    pub fn unlocked_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .consumed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_unlocks_credit_once() {
        let score = ScoreStore::new();
        let tracker = UnlockTracker::new(score.clone());
        let education = UnlockableItem::new("education", 20);

        assert!(tracker.try_unlock(&education));
        for _ in 0..50 {
            assert!(!tracker.try_unlock(&education));
        }
        assert_eq!(score.total(), 20);
    }

    #[test]
    fn distinct_items_sum_and_stay_put() {
        let score = ScoreStore::new();
        let tracker = UnlockTracker::new(score.clone());
        let events = UnlockableItem::new("events", 15);
        let education = UnlockableItem::new("education", 20);

        assert!(tracker.try_unlock(&events));
        assert!(tracker.try_unlock(&education));
        assert_eq!(score.total(), 35);

        assert!(!tracker.try_unlock(&events));
        assert!(!tracker.try_unlock(&education));
        assert_eq!(score.total(), 35);
        assert_eq!(tracker.unlocked_keys(), vec!["education", "events"]);
    }

    #[test]
    fn never_unlocked_key_contributes_nothing() {
        let score = ScoreStore::new();
        let tracker = UnlockTracker::new(score.clone());
        tracker.try_unlock(&UnlockableItem::new("hobbies", 10));
        assert!(!tracker.is_unlocked("volunteer"));
        assert_eq!(score.total(), 10);
    }

    #[test]
    fn seeded_keys_are_not_rewarded() {
        let score = ScoreStore::new();
        let tracker = UnlockTracker::new(score.clone());
        assert!(tracker.mark_consumed("hero-avatar"));

        assert!(!tracker.try_unlock(&UnlockableItem::new("hero-avatar", 5)));
        assert_eq!(score.total(), 0);
        assert!(tracker.is_unlocked("hero-avatar"));
    }
}
