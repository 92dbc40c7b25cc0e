use crate::config::Settings;
use crate::model::ScaffoldingLevel;

/// Seconds of active (post impulse-lock) time at which each tier begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaffoldDelays {
    pub flash: u32,
    pub hint: u32,
    pub guide: u32,
}

impl From<&Settings> for ScaffoldDelays {
    fn from(s: &Settings) -> Self {
        Self {
            flash: s.delay_flash,
            hint: s.delay_hint,
            guide: s.delay_guide,
        }
    }
}

impl ScaffoldDelays {
    /// Tier reached after `elapsed` active seconds, regardless of what the
    /// trial currently displays.
    pub fn implied_level(&self, elapsed: u32) -> ScaffoldingLevel {
        if elapsed >= self.guide {
            ScaffoldingLevel::Guide
        } else if elapsed >= self.hint {
            ScaffoldingLevel::Audio
        } else if elapsed >= self.flash {
            ScaffoldingLevel::Visual
        } else {
            ScaffoldingLevel::None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    ImpulseLocked,
    Active {
        level: ScaffoldingLevel,
        elapsed_secs: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub level: ScaffoldingLevel,
    pub escalated: bool,
    /// The audio hint delay was hit on this tick
    pub play_hint: bool,
    pub implied_level: ScaffoldingLevel,
    pub elapsed_secs: u32,
}

/// Per-trial help escalation. Driven by one-second ticks from the owner.
#[derive(Debug, Clone)]
pub struct ScaffoldingTimer {
    delays: ScaffoldDelays,
    phase: TrialPhase,
}

impl ScaffoldingTimer {
    pub fn new(delays: ScaffoldDelays) -> Self {
        Self {
            delays,
            phase: TrialPhase::ImpulseLocked,
        }
    }

    pub fn delays(&self) -> ScaffoldDelays {
        self.delays
    }

    pub fn phase(&self) -> TrialPhase {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = TrialPhase::ImpulseLocked;
    }

    /// Impulse lock elapsed. Has no effect on an already active trial.
    pub fn release(&mut self) {
        if self.phase == TrialPhase::ImpulseLocked {
            self.phase = TrialPhase::Active {
                level: ScaffoldingLevel::None,
                elapsed_secs: 0,
            };
        }
    }

    pub fn is_locked(&self) -> bool {
        self.phase == TrialPhase::ImpulseLocked
    }

    pub fn level(&self) -> ScaffoldingLevel {
        match self.phase {
            TrialPhase::ImpulseLocked => ScaffoldingLevel::None,
            TrialPhase::Active { level, .. } => level,
        }
    }

    /// One second of active time passed. Returns `None` while locked.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        let TrialPhase::Active {
            level,
            elapsed_secs,
        } = self.phase
        else {
            return None;
        };

        let t = elapsed_secs + 1;
        let mut next = level;
        if t == self.delays.flash {
            next = next.max(ScaffoldingLevel::Visual);
        }
        if t == self.delays.hint {
            next = next.max(ScaffoldingLevel::Audio);
        }
        if t == self.delays.guide {
            next = next.max(ScaffoldingLevel::Guide);
        }

        self.phase = TrialPhase::Active {
            level: next,
            elapsed_secs: t,
        };

        Some(TickOutcome {
            level: next,
            escalated: next > level,
            play_hint: t == self.delays.hint,
            implied_level: self.delays.implied_level(t),
            elapsed_secs: t,
        })
    }
}
