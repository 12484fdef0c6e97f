use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum CelebrationStatus {
    #[default]
    Idle,
    Celebrating,
}

/// Hint for the particle renderer, picked from the score at trigger time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Intensity {
    #[default]
    Low,
    Medium,
    High,
}

impl Intensity {
    pub fn for_score(score: u64) -> Self {
        match score {
            s if s >= 1000 => Intensity::High,
            s if s >= 500 => Intensity::Medium,
            _ => Intensity::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CelebrationCause {
    Milestone { score: u64 },
    FirstMenuUse,
    FirstChatMessage,
    FirstProjectOpen,
}

/// Rule deciding which score totals deserve a burst.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MilestonePolicy {
    /// First burst at `threshold`, then again each time the score has grown
    /// by at least `step` since the previous milestone burst.
    ThresholdStep { threshold: u64, step: u64 },
    /// Burst on every positive multiple of `every`, once per value.
    Modulo { every: u64 },
}

impl Default for MilestonePolicy {
    fn default() -> Self {
        MilestonePolicy::ThresholdStep {
            threshold: 20,
            step: 20,
        }
    }
}

impl MilestonePolicy {
    pub fn should_celebrate(&self, score: u64, last_celebrated: Option<u64>) -> bool {
        match *self {
            MilestonePolicy::ThresholdStep { threshold, step } => {
                score >= threshold
                    && last_celebrated.map_or(true, |last| score.saturating_sub(last) >= step)
            }
            MilestonePolicy::Modulo { every } => {
                every > 0 && score > 0 && score % every == 0 && last_celebrated != Some(score)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CelebrationState {
    pub status: CelebrationStatus,
    pub last_celebrated_threshold: Option<u64>,
    pub intensity: Intensity,
    pub cause: Option<CelebrationCause>,
    /// Set by the first burst; the score counter stays hidden until then.
    pub score_revealed: bool,
    pub bursts: u64,
}

impl CelebrationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_celebrating(&self) -> bool {
        self.status == CelebrationStatus::Celebrating
    }

    pub fn begin(&mut self, cause: CelebrationCause, intensity: Intensity) {
        self.status = CelebrationStatus::Celebrating;
        self.cause = Some(cause);
        self.intensity = intensity;
        self.score_revealed = true;
        self.bursts = self.bursts.saturating_add(1);
    }

    pub fn finish(&mut self) {
        self.status = CelebrationStatus::Idle;
        self.cause = None;
    }
}
