mod tracker;

pub use tracker::UnlockTracker;
