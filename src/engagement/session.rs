use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::{
    catalog::RewardCatalog,
    celebration::{CelebrationCause, CelebrationController, CelebrationState},
    contact::{ContactRequestSubmitter, ContactSubmission, Notifier},
    flags::{PersistentFlags, HAS_OPENED_FIRST_PROJECT, HAS_USED_HAMBURGER},
    models::UnlockableItem,
    score::{LevelUpAnnouncer, LevelUpNotice, ScoreSnapshot, ScoreStore},
    settings::EngagementSettings,
    unlocks::UnlockTracker,
};

const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementSnapshot {
    pub score: ScoreSnapshot,
    pub unlocked: Vec<String>,
    pub level_up: Option<LevelUpNotice>,
    pub celebration: CelebrationState,
    pub contact: ContactSubmission,
}

/// One visitor session: the score, what has been unlocked, the shared
/// celebration burst and the contact form, wired together.
pub struct EngagementSession<N: Notifier> {
    score: ScoreStore,
    unlocks: UnlockTracker,
    levels: LevelUpAnnouncer,
    flags: PersistentFlags,
    celebration: CelebrationController,
    contact: ContactRequestSubmitter<N>,
    catalog: RewardCatalog,
}

impl<N: Notifier> EngagementSession<N> {
    pub fn new(flags: PersistentFlags, notifier: N, settings: &EngagementSettings) -> Self {
        Self::with_catalog(flags, notifier, settings, RewardCatalog::builtin())
    }

    pub fn with_catalog(
        flags: PersistentFlags,
        notifier: N,
        settings: &EngagementSettings,
        catalog: RewardCatalog,
    ) -> Self {
        let score = ScoreStore::new();
        let unlocks = UnlockTracker::new(score.clone());

        let mut restored = 0;
        for (entry, flag) in catalog.persisted() {
            if flags.read(flag) && unlocks.mark_consumed(&entry.item.key) {
                restored += 1;
            }
        }
        if restored > 0 {
            log_info!("restored {} claimed interaction(s) from storage", restored);
        }

        let celebration = CelebrationController::new(
            score.clone(),
            settings.milestone_policy,
            settings.celebration_timing(),
        );
        let contact = ContactRequestSubmitter::new(
            notifier,
            celebration.clone(),
            flags.clone(),
            settings.success_display(),
        );

        Self {
            score,
            unlocks,
            levels: LevelUpAnnouncer::new(settings.level_up_display()),
            flags,
            celebration,
            contact,
            catalog,
        }
    }

    pub fn score(&self) -> &ScoreStore {
        &self.score
    }

    pub fn unlocks(&self) -> &UnlockTracker {
        &self.unlocks
    }

    pub fn levels(&self) -> &LevelUpAnnouncer {
        &self.levels
    }

    pub fn flags(&self) -> &PersistentFlags {
        &self.flags
    }

    pub fn celebration(&self) -> &CelebrationController {
        &self.celebration
    }

    pub fn contact(&self) -> &ContactRequestSubmitter<N> {
        &self.contact
    }

    pub fn catalog(&self) -> &RewardCatalog {
        &self.catalog
    }

    /// Claims `item` and lets the level and milestone checks see the new
    /// total.
    pub fn unlock(&self, item: &UnlockableItem) -> bool {
        if !self.unlocks.try_unlock(item) {
            return false;
        }
        self.levels.observe(self.score.total());
        self.celebration.check_milestone();
        true
    }

    /// Claims a catalog item by key, persisting the claim when the item is
    /// one of the reload-proof interactions.
    pub fn unlock_key(&self, key: &str) -> Result<bool> {
        let entry = self
            .catalog
            .get(key)
            .ok_or_else(|| anyhow!("unknown unlockable item '{key}'"))?;

        let unlocked = self.unlock(&entry.item);
        if unlocked {
            if let Some(flag) = entry.persisted_as {
                self.flags.set_once(flag);
            }
        }
        Ok(unlocked)
    }

    /// First use of the navigation menu earns a one-time burst.
    pub fn use_menu(&self) -> bool {
        self.celebration.trigger_once(
            &self.flags,
            HAS_USED_HAMBURGER,
            CelebrationCause::FirstMenuUse,
        )
    }

    /// Opens a project's details: unlocks its reward, and the very first
    /// project opened gets its own burst.
    pub fn open_project(&self, key: &str) -> Result<bool> {
        let unlocked = self.unlock_key(key)?;
        self.celebration.trigger_once(
            &self.flags,
            HAS_OPENED_FIRST_PROJECT,
            CelebrationCause::FirstProjectOpen,
        );
        Ok(unlocked)
    }

    pub fn snapshot(&self) -> EngagementSnapshot {
        EngagementSnapshot {
            score: self.score.snapshot(),
            unlocked: self.unlocks.unlocked_keys(),
            level_up: self.levels.notice(),
            celebration: self.celebration.state(),
            contact: self.contact.snapshot(),
        }
    }

    /// Cancels every pending timer. Call when the session's view goes away.
    pub fn shutdown(&self) {
        self.celebration.shutdown();
        self.levels.shutdown();
        self.contact.shutdown();
    }
}

impl<N: Notifier> Drop for EngagementSession<N> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        celebration::CelebrationStatus,
        contact::{DeliveryError, OutboxNotifier},
        db::Database,
        flags::{KeyValueStore, MemoryStore, HAS_INTERACTED_PROFILE},
        models::ContactPayload,
    };
    use std::{sync::Arc, time::Duration};
    use tokio::time;

    struct NullNotifier;

    impl Notifier for NullNotifier {
        async fn send(&self, _payload: ContactPayload) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    fn session(store: Arc<dyn KeyValueStore>) -> EngagementSession<NullNotifier> {
        EngagementSession::new(
            PersistentFlags::new(store),
            NullNotifier,
            &EngagementSettings::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn two_items_total_thirty_five_and_stay_there() {
        let session = session(Arc::new(MemoryStore::new()));

        assert!(session.unlock(&UnlockableItem::new("events", 15)));
        assert!(session.unlock(&UnlockableItem::new("education", 20)));
        assert_eq!(session.score().total(), 35);

        assert!(!session.unlock(&UnlockableItem::new("events", 15)));
        assert!(!session.unlock(&UnlockableItem::new("education", 20)));
        assert_eq!(session.score().total(), 35);
    }

    #[tokio::test(start_paused = true)]
    async fn crossing_twenty_starts_a_milestone_burst() {
        let session = session(Arc::new(MemoryStore::new()));

        session.unlock_key("hobbies").unwrap();
        assert!(!session.celebration().is_celebrating());

        session.unlock_key("hero-avatar").unwrap();
        session.unlock_key("hero-title").unwrap();
        let state = session.celebration().state();
        assert_eq!(state.status, CelebrationStatus::Celebrating);
        assert_eq!(state.cause, Some(CelebrationCause::Milestone { score: 20 }));
        assert!(state.score_revealed);
    }

    #[tokio::test(start_paused = true)]
    async fn profile_reward_is_not_paid_again_after_reload() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let first = session(store.clone());
        assert!(first.unlock_key("hero-avatar").unwrap());
        assert_eq!(first.score().total(), 5);
        first.shutdown();

        let reloaded = session(store.clone());
        assert!(reloaded.flags().read(HAS_INTERACTED_PROFILE));
        assert!(reloaded.unlocks().is_unlocked("hero-avatar"));
        assert!(!reloaded.unlock_key("hero-avatar").unwrap());
        assert_eq!(reloaded.score().total(), 0);

        // Non-persisted items start over.
        assert!(reloaded.unlock_key("education").unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_key_is_an_error() {
        let session = session(Arc::new(MemoryStore::new()));
        assert!(session.unlock_key("nope").is_err());
        assert_eq!(session.score().total(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn menu_and_first_project_share_one_burst() {
        let session = session(Arc::new(MemoryStore::new()));

        assert!(session.use_menu());
        assert!(!session.use_menu());

        time::sleep(Duration::from_millis(1000)).await;
        assert!(session.open_project("cyberpong").unwrap());

        // Reaching 100 cut the menu burst to idle. The project trigger lands
        // in the reset gap and only decides what the restart shows.
        let state = session.celebration().state();
        assert_eq!(state.status, CelebrationStatus::Idle);
        assert_eq!(state.last_celebrated_threshold, Some(100));
        assert_eq!(state.bursts, 1);

        time::sleep(Duration::from_millis(60)).await;
        let state = session.celebration().state();
        assert!(state.is_celebrating());
        assert_eq!(state.cause, Some(CelebrationCause::FirstProjectOpen));
        assert_eq!(state.bursts, 2);

        time::sleep(Duration::from_millis(4000)).await;
        assert!(!session.celebration().is_celebrating());

        assert!(session.open_project("location-finder").unwrap());
        assert_eq!(session.score().total(), 200);
    }

    #[tokio::test(start_paused = true)]
    async fn ninety_nine_to_one_hundred_shows_a_level_up_notice() {
        let session = session(Arc::new(MemoryStore::new()));

        assert!(session.unlock(&UnlockableItem::new("warm-up", 99)));
        assert_eq!(session.snapshot().level_up, None);
        assert_eq!(session.score().level(), 1);

        assert!(session.unlock(&UnlockableItem::new("last-point", 1)));
        let notice = session.snapshot().level_up.unwrap();
        assert_eq!(notice.level, 2);
        assert_eq!(notice.message, "Level Up! You're now level 2");

        time::sleep(Duration::from_millis(2990)).await;
        assert!(session.snapshot().level_up.is_some());

        time::sleep(Duration::from_millis(20)).await;
        assert_eq!(session.snapshot().level_up, None);
        assert_eq!(session.snapshot().score.level, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_session_cancels_its_timers() {
        let session = session(Arc::new(MemoryStore::new()));
        let celebration = session.celebration().clone();
        let levels = session.levels().clone();

        session.open_project("cyberpong").unwrap();
        time::sleep(Duration::from_millis(60)).await;
        assert!(celebration.is_celebrating());
        assert!(levels.notice().is_some());

        drop(session);
        assert!(!celebration.is_celebrating());
        assert_eq!(levels.notice(), None);

        time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(celebration.state().bursts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_every_timer() {
        let session = session(Arc::new(MemoryStore::new()));
        session.use_menu();
        session.shutdown();
        assert!(!session.celebration().is_celebrating());
    }

    #[tokio::test]
    async fn works_against_sqlite_storage_and_outbox() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("discovery.sqlite3")).unwrap();
        let session = EngagementSession::new(
            PersistentFlags::new(Arc::new(db.clone())),
            OutboxNotifier::new(db.clone()),
            &EngagementSettings::default(),
        );

        session.unlock_key("hero-social").unwrap();
        assert_eq!(db.get("hasInteractedSocial").unwrap().as_deref(), Some("true"));

        let contact = session.contact();
        contact.open();
        contact.set_message_text("Hello");
        contact.submit_message().unwrap();
        contact.set_contact_value("user@example.com");
        contact.submit_contact().await.unwrap();
        assert_eq!(db.count_outbox_messages().await.unwrap(), 1);

        session.shutdown();
    }
}
