use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use serde::Serialize;
use tokio::{task::JoinHandle, time};

use super::level_for;

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Short-lived "you levelled up" banner.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LevelUpNotice {
    pub level: u64,
    pub message: String,
}

impl LevelUpNotice {
    fn new(level: u64) -> Self {
        Self {
            level,
            message: format!("Level Up! You're now level {level}"),
        }
    }
}

struct Announced {
    level: u64,
    notice: Option<LevelUpNotice>,
}

/// Watches score totals for level changes and keeps the current notice on
/// display for a fixed time.
#[derive(Clone)]
pub struct LevelUpAnnouncer {
    announced: Arc<Mutex<Announced>>,
    clear_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    display: Duration,
}

impl LevelUpAnnouncer {
    pub fn new(display: Duration) -> Self {
        Self {
            announced: Arc::new(Mutex::new(Announced {
                level: level_for(0),
                notice: None,
            })),
            clear_task: Arc::new(Mutex::new(None)),
            display,
        }
    }

    pub fn level(&self) -> u64 {
        lock(&self.announced).level
    }

    pub fn notice(&self) -> Option<LevelUpNotice> {
        lock(&self.announced).notice.clone()
    }

    /// Compares `total` against the last level seen. Returns the new level
    /// when it went up, after putting its notice on display.
    pub fn observe(&self, total: u64) -> Option<u64> {
        let level = level_for(total);
        {
            let mut announced = lock(&self.announced);
            if level <= announced.level {
                return None;
            }
            announced.level = level;
            announced.notice = Some(LevelUpNotice::new(level));
        }

        log_info!("level up: now level {}", level);
        self.schedule_clear();
        Some(level)
    }

    /// Drops the notice and its timer.
    pub fn shutdown(&self) {
        if let Some(handle) = lock(&self.clear_task).take() {
            handle.abort();
        }
        lock(&self.announced).notice = None;
    }

    fn schedule_clear(&self) {
        let mut task = lock(&self.clear_task);
        if let Some(handle) = task.take() {
            handle.abort();
        }

        let announced = self.announced.clone();
        let display = self.display;
        *task = Some(tokio::spawn(async move {
            time::sleep(display).await;
            lock(&announced).notice = None;
        }));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
