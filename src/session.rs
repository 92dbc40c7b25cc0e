use chrono::Local;
use std::time::Duration;

use crate::model::{Collection, ScaffoldingLevel};
use crate::stats::GameLog;

/// Star counter with its reward modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewards {
    stars: u32,
    required: u32,
    showing: bool,
}

impl Rewards {
    pub fn new(required: u32) -> Self {
        Self {
            stars: 0,
            required: required.max(1),
            showing: false,
        }
    }

    pub fn stars(&self) -> u32 {
        self.stars
    }

    pub fn required(&self) -> u32 {
        self.required
    }

    /// Adds one star. Returns true when this star lands on a multiple of
    /// the required count.
    pub fn award(&mut self) -> bool {
        self.stars += 1;
        self.stars % self.required == 0
    }

    pub fn reveal(&mut self) {
        self.showing = true;
    }

    pub fn dismiss(&mut self) {
        self.showing = false;
    }

    pub fn is_showing(&self) -> bool {
        self.showing
    }
}

/// Everything a session accumulates between start and completion.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Engine clock reading at session start
    pub started_at: Duration,
    pub mistakes: u32,
    pub max_scaffold_used: ScaffoldingLevel,
    pub rewards: Rewards,
}

impl SessionContext {
    pub fn new(started_at: Duration, required_stars: u32) -> Self {
        Self {
            started_at,
            mistakes: 0,
            max_scaffold_used: ScaffoldingLevel::None,
            rewards: Rewards::new(required_stars),
        }
    }

    pub fn record_mistake(&mut self) {
        self.mistakes += 1;
    }

    /// High-water mark; lower readings are ignored.
    pub fn observe_scaffold(&mut self, level: ScaffoldingLevel) {
        self.max_scaffold_used = self.max_scaffold_used.max(level);
    }

    pub fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.started_at)
    }

    pub fn build_log(&self, collection: &Collection, completed: usize, now: Duration) -> GameLog {
        let finished = Local::now();
        let total = collection.items.len();
        let elapsed = self.elapsed(now).as_secs_f64();
        GameLog {
            id: finished.timestamp_millis().to_string(),
            timestamp: finished,
            student_name: None,
            collection_name: collection.name.clone(),
            total_items: total as u32,
            completed_items: completed as u32,
            mistakes: self.mistakes,
            average_time_per_item: if total > 0 { elapsed / total as f64 } else { 0.0 },
            most_used_scaffold: self.max_scaffold_used,
        }
    }
}
