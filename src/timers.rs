use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Owned handle to one pending timer. Not `Copy`: whoever holds it is the
/// single party that may cancel it.
#[derive(Debug, PartialEq, Eq)]
pub struct TimerHandle {
    id: TimerId,
}

impl TimerHandle {
    pub fn id(&self) -> TimerId {
        self.id
    }
}

/// A timer that came due. `generation` is whatever the scheduler stamped it
/// with, so the owner can discard callbacks meant for a superseded state.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<K> {
    pub id: TimerId,
    pub due: Duration,
    pub generation: u64,
    pub kind: K,
}

#[derive(Debug, Clone)]
struct Entry<K> {
    id: TimerId,
    due: Duration,
    generation: u64,
    kind: K,
}

/// Cooperative timer queue on a caller-driven clock.
///
/// Nothing fires by itself: the owner moves the clock forward and pulls due
/// timers one at a time, in due order (ties in scheduling order). While a
/// timer is being handled the clock reads its due time, so a repeating timer
/// rescheduled from its own callback does not drift.
#[derive(Debug, Clone)]
pub struct TimerQueue<K> {
    now: Duration,
    next_id: u64,
    pending: Vec<Entry<K>>,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> TimerQueue<K> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            pending: Vec::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, delay: Duration, generation: u64, kind: K) -> TimerHandle {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push(Entry {
            id,
            due: self.now + delay,
            generation,
            kind,
        });
        TimerHandle { id }
    }

    /// Returns false if the timer already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|e| e.id != handle.id);
        self.pending.len() != before
    }

    pub fn is_pending(&self, handle: &TimerHandle) -> bool {
        self.pending.iter().any(|e| e.id == handle.id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Removes and returns the earliest timer due at or before `until`,
    /// moving the clock to its due time.
    pub fn pop_due(&mut self, until: Duration) -> Option<Fired<K>> {
        let (pos, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= until)
            .min_by_key(|(_, e)| (e.due, e.id))?;
        let entry = self.pending.remove(pos);
        self.now = self.now.max(entry.due);
        Some(Fired {
            id: entry.id,
            due: entry.due,
            generation: entry.generation,
            kind: entry.kind,
        })
    }

    /// Moves the clock forward. The clock never runs backwards.
    pub fn advance_clock(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }
}
