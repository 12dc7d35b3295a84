//! Trailing debouncer for file change bursts.
//!
//! Pure timing and deduplication: a batch becomes ready once no event has
//! arrived for the whole window. Callers pass `now` so tests need no sleeps.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;

/// Upper bound for a wait when nothing is pending.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

pub struct Debouncer {
    window: Duration,
    /// Changed paths (dedup is free via set uniqueness)
    changes: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            changes: FxHashSet::default(),
            last_event: None,
        }
    }

    /// Record a changed path; restarts the window.
    pub fn add(&mut self, path: &Path, now: Instant) {
        self.changes.insert(path.to_path_buf());
        self.last_event = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn is_ready(&self, now: Instant) -> bool {
        match self.last_event {
            Some(last) => self.is_pending() && now.saturating_duration_since(last) >= self.window,
            None => false,
        }
    }

    /// Take the batch once the window has passed quietly.
    pub fn take_if_ready(&mut self, now: Instant) -> Option<FxHashSet<PathBuf>> {
        if !self.is_ready(now) {
            return None;
        }
        self.last_event = None;
        Some(std::mem::take(&mut self.changes))
    }

    /// Time until the pending batch can be taken.
    pub fn sleep_duration(&self, now: Instant) -> Duration {
        let Some(last) = self.last_event else {
            return IDLE_WAIT;
        };
        self.window
            .saturating_sub(now.saturating_duration_since(last))
            .max(Duration::from_millis(1))
    }
}
