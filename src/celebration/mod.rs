pub mod controller;
pub mod state;

pub use controller::{CelebrationController, CelebrationTiming};
pub use state::{CelebrationCause, CelebrationState, CelebrationStatus, Intensity, MilestonePolicy};
