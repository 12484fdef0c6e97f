use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{sync::watch, task::JoinHandle, time};

use crate::{flags::PersistentFlags, score::ScoreStore};

use super::{CelebrationCause, CelebrationState, Intensity, MilestonePolicy};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, Copy)]
struct PendingBurst {
    cause: CelebrationCause,
    intensity: Intensity,
}

/// The running burst timer, plus what to show once an interrupted burst's
/// reset gap is over.
#[derive(Default)]
struct BurstTimer {
    timer: Option<JoinHandle<()>>,
    pending: Option<PendingBurst>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CelebrationTiming {
    /// How long a burst stays on screen.
    pub duration: Duration,
    /// Idle gap forced between an interrupted burst and its restart.
    pub reset_gap: Duration,
}

impl Default for CelebrationTiming {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(4000),
            reset_gap: Duration::from_millis(50),
        }
    }
}

/// Owner of the single shared burst. Score milestones and the one-shot
/// triggers all go through [`CelebrationController::trigger`], so two causes
/// never produce overlapping bursts.
///
/// Timers run as tokio tasks; triggering needs a runtime.
#[derive(Clone)]
pub struct CelebrationController {
    state: Arc<Mutex<CelebrationState>>,
    events: Arc<watch::Sender<CelebrationState>>,
    burst: Arc<Mutex<BurstTimer>>,
    score: ScoreStore,
    policy: MilestonePolicy,
    timing: CelebrationTiming,
}

impl CelebrationController {
    pub fn new(score: ScoreStore, policy: MilestonePolicy, timing: CelebrationTiming) -> Self {
        let (events, _rx) = watch::channel(CelebrationState::new());
        Self {
            state: Arc::new(Mutex::new(CelebrationState::new())),
            events: Arc::new(events),
            burst: Arc::new(Mutex::new(BurstTimer::default())),
            score,
            policy,
            timing,
        }
    }

    pub fn policy(&self) -> MilestonePolicy {
        self.policy
    }

    pub fn state(&self) -> CelebrationState {
        lock(&self.state).clone()
    }

    pub fn is_celebrating(&self) -> bool {
        lock(&self.state).is_celebrating()
    }

    pub fn subscribe(&self) -> watch::Receiver<CelebrationState> {
        self.events.subscribe()
    }

    /// Looks at the current score and fires a burst if it crossed a milestone
    /// that has not been celebrated yet.
    pub fn check_milestone(&self) -> bool {
        let score = self.score.total();
        {
            let mut state = lock(&self.state);
            if !self
                .policy
                .should_celebrate(score, state.last_celebrated_threshold)
            {
                return false;
            }
            state.last_celebrated_threshold = Some(score);
        }

        log_info!("milestone reached at score {}", score);
        self.trigger(CelebrationCause::Milestone { score });
        true
    }

    /// Fires `cause` only the first time `flag` is claimed.
    pub fn trigger_once(
        &self,
        flags: &PersistentFlags,
        flag: &str,
        cause: CelebrationCause,
    ) -> bool {
        if !flags.claim(flag) {
            return false;
        }
        self.trigger(cause);
        true
    }

    /// Starts a burst. If one is already running it is cut to `Idle` first
    /// and restarted after the reset gap, so the renderer sees a new burst.
    /// Triggers that land inside that gap only replace what the restart will
    /// show; the gap itself always runs out in full.
    pub fn trigger(&self, cause: CelebrationCause) {
        let intensity = Intensity::for_score(self.score.total());
        let mut burst = lock(&self.burst);

        if let Some(pending) = burst.pending.as_mut() {
            *pending = PendingBurst { cause, intensity };
            log_debug!("burst restart pending; now showing {:?}", cause);
            return;
        }

        if let Some(handle) = burst.timer.take() {
            handle.abort();
        }

        let restart = {
            let mut state = lock(&self.state);
            let restart = state.is_celebrating();
            if restart {
                state.finish();
            } else {
                state.begin(cause, intensity);
            }
            restart
        };
        if restart {
            burst.pending = Some(PendingBurst { cause, intensity });
        }
        self.publish();
        log_debug!("burst triggered by {:?} (restart: {})", cause, restart);

        let shared = self.burst.clone();
        let state = self.state.clone();
        let events = self.events.clone();
        let timing = self.timing;

        let handle = tokio::spawn(async move {
            if restart {
                time::sleep(timing.reset_gap).await;
                {
                    let mut burst = lock(&shared);
                    if let Some(next) = burst.pending.take() {
                        lock(&state).begin(next.cause, next.intensity);
                    }
                }
                publish(&state, &events);
            }

            time::sleep(timing.duration).await;
            lock(&state).finish();
            publish(&state, &events);
        });

        burst.timer = Some(handle);
    }

    /// Cancels any pending burst timer and drops back to `Idle`. Call when the
    /// owning view goes away.
    pub fn shutdown(&self) {
        {
            let mut burst = lock(&self.burst);
            burst.pending = None;
            if let Some(handle) = burst.timer.take() {
                handle.abort();
            }
        }
        let was_celebrating = {
            let mut state = lock(&self.state);
            let was = state.is_celebrating();
            state.finish();
            was
        };
        if was_celebrating {
            self.publish();
        }
    }

    fn publish(&self) {
        publish(&self.state, &self.events);
    }
}

fn publish(state: &Mutex<CelebrationState>, events: &watch::Sender<CelebrationState>) {
    let snapshot = lock(state).clone();
    events.send_replace(snapshot);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
