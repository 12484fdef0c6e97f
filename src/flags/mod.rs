//! One-time interaction flags that outlive a reload.
//!
//! Flags are read from a [`KeyValueStore`] and written back the first time they
//! flip to `true`. When the store fails, the flags quietly fall back to memory
//! for the rest of the session: a flag then reads `false` until it is set again.

mod store;

pub use store::{KeyValueStore, MemoryStore};

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

const TRUE_VALUE: &str = "true";

pub const HAS_INTERACTED_PROFILE: &str = "hasInteractedProfile";
pub const HAS_INTERACTED_TITLE: &str = "hasInteractedTitle";
pub const HAS_INTERACTED_SOCIAL: &str = "hasInteractedSocial";
pub const HAS_USED_HAMBURGER: &str = "hasUsedHamburger";
pub const HAS_SHOWN_FIRST_CHAT: &str = "hasShownFirstChat";
pub const HAS_OPENED_FIRST_PROJECT: &str = "hasOpenedFirstProject";

#[derive(Default)]
struct FlagsInner {
    set: HashSet<String>,
    degraded: bool,
}

#[derive(Clone)]
pub struct PersistentFlags {
    storage: Option<Arc<dyn KeyValueStore>>,
    inner: Arc<Mutex<FlagsInner>>,
}

impl PersistentFlags {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage: Some(storage),
            inner: Arc::new(Mutex::new(FlagsInner::default())),
        }
    }

    /// Flags with no durable backing at all.
    pub fn in_memory() -> Self {
        Self {
            storage: None,
            inner: Arc::new(Mutex::new(FlagsInner::default())),
        }
    }

    pub fn read(&self, name: &str) -> bool {
        let mut inner = self.lock();
        self.load(&mut inner, name)
    }

    /// Sets `name` to `true`. Setting an already-true flag changes nothing.
    pub fn set_once(&self, name: &str) {
        self.claim(name);
    }

    /// Flips `name` from `false` to `true`, returning whether this call did
    /// the flip. Exactly one caller per flag ever sees `true`.
    pub fn claim(&self, name: &str) -> bool {
        let mut inner = self.lock();
        if self.load(&mut inner, name) {
            return false;
        }

        inner.set.insert(name.to_string());
        if let (Some(storage), false) = (&self.storage, inner.degraded) {
            if let Err(err) = storage.set(name, TRUE_VALUE) {
                degrade(&mut inner, &err);
            }
        }
        log_debug!("flag {} set", name);
        true
    }

    pub fn is_degraded(&self) -> bool {
        self.lock().degraded
    }

    fn load(&self, inner: &mut FlagsInner, name: &str) -> bool {
        if inner.set.contains(name) {
            return true;
        }

        let storage = match (&self.storage, inner.degraded) {
            (Some(storage), false) => storage,
            _ => return false,
        };

        match storage.get(name) {
            Ok(Some(value)) if value == TRUE_VALUE => {
                inner.set.insert(name.to_string());
                true
            }
            Ok(_) => false,
            Err(err) => {
                degrade(inner, &err);
                false
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FlagsInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn degrade(inner: &mut FlagsInner, err: &anyhow::Error) {
    if !inner.degraded {
        log_warn!("flag storage unavailable, keeping flags in memory: {err:#}");
        inner.degraded = true;
    }
}
