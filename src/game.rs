use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::char_bank::generate_char_bank;
use crate::config::Settings;
use crate::drop_policy::{policy_for, DropEvent, DropOutcome, DropPolicy};
use crate::error::Result;
use crate::library::validate_collection;
use crate::model::{Collection, FillState, GameChar, Item, ScaffoldingLevel};
use crate::scaffolding::{ScaffoldDelays, ScaffoldingTimer};
use crate::session::SessionContext;
use crate::speech::{play_item_audio, Speech};
use crate::stats::{GameLog, LogStore};
use crate::timers::{Fired, TimerHandle, TimerQueue};
use crate::view::{Feedback, GameView, GuideHint, ItemView, TileView};

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const FEEDBACK_DISPLAY: Duration = Duration::from_millis(1500);
pub const COMPLETION_ANNOUNCE_DELAY: Duration = Duration::from_millis(800);
pub const REWARD_REVEAL_DELAY: Duration = Duration::from_millis(1500);
pub const PACING_STEP_DELAY: Duration = Duration::from_millis(1000);
pub const SINGLE_ADVANCE_DELAY: Duration = Duration::from_millis(2000);
pub const MULTI_FINISH_DELAY: Duration = Duration::from_millis(1500);

pub const RESTART_PHRASE: &str = "重新開始";
pub const FAILURE_PHRASE: &str = "不對喔，再試試看";
pub const FINISH_PHRASE: &str = "太棒了，全部完成了！";

pub fn success_phrase(ch: char) -> String {
    format!("答對了，這是{ch}")
}

pub fn completion_phrase(name: &str) -> String {
    format!("{name}，完成！")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GamePhase {
    TrialActive,
    /// Waiting out the pacing delay after an item was spelled
    ItemComplete { item_id: String },
    SessionComplete,
    Exited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum GameTimer {
    ImpulseRelease,
    ScaffoldTick,
    FeedbackDismiss,
    AnnounceCompletion { item_id: String },
    RevealReward,
    PacingStep { item_id: String },
    AdvanceItem,
    FinishSession,
}

impl GameTimer {
    fn is_trial_scoped(&self) -> bool {
        matches!(self, GameTimer::ImpulseRelease | GameTimer::ScaffoldTick)
    }
}

/// Timers tied to the current trial plus the session-wide ones.
#[derive(Debug, Default)]
struct TimerHandles {
    impulse: Option<TimerHandle>,
    tick: Option<TimerHandle>,
    feedback: Option<TimerHandle>,
    session: Vec<TimerHandle>,
}

/// One play-through of a collection: trial sequencing, drop handling,
/// scaffolding, rewards and the final log.
///
/// The engine runs on its own clock. Callers feed it time with
/// [`Game::advance_to`] and user intents with the `handle_*`/`request_*`
/// methods; everything else happens in timer callbacks.
#[derive(Debug)]
pub struct Game<S: Speech, L: LogStore> {
    collection: Collection,
    settings: Settings,
    policy: Box<dyn DropPolicy>,
    speech: S,
    store: L,
    rng: StdRng,
    student_name: Option<String>,

    fill: FillState,
    completed: HashSet<String>,
    current_index: usize,
    phase: GamePhase,
    feedback: Option<Feedback>,
    persistence_warning: Option<String>,
    last_log: Option<GameLog>,
    session: SessionContext,

    scaffolding: ScaffoldingTimer,
    timers: TimerQueue<GameTimer>,
    handles: TimerHandles,
    session_generation: u64,
    trial_generation: u64,
    trial_key: Option<(String, u64)>,

    char_bank: Vec<GameChar>,
    bank_generation: u64,
}

impl<S: Speech, L: LogStore> Game<S, L> {
    /// Validates the collection and settings and starts the first session.
    pub fn new(collection: Collection, settings: Settings, speech: S, store: L) -> Result<Self> {
        validate_collection(&collection)?;
        settings.validate()?;

        let fill = FillState::new(&collection.items);
        let mut game = Self {
            policy: policy_for(&settings),
            scaffolding: ScaffoldingTimer::new(ScaffoldDelays::from(&settings)),
            session: SessionContext::new(Duration::ZERO, settings.required_stars),
            collection,
            settings,
            speech,
            store,
            rng: StdRng::from_entropy(),
            student_name: None,
            fill,
            completed: HashSet::new(),
            current_index: 0,
            phase: GamePhase::TrialActive,
            feedback: None,
            persistence_warning: None,
            last_log: None,
            timers: TimerQueue::new(),
            handles: TimerHandles::default(),
            session_generation: 0,
            trial_generation: 0,
            trial_key: None,
            char_bank: Vec::new(),
            bank_generation: 0,
        };
        game.speech.unlock_audio();
        game.initialize();
        Ok(game)
    }

    /// Reseeds the tile shuffle, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self.rebuild_bank();
        self
    }

    /// Name recorded on every log this game writes.
    pub fn with_student_name(mut self, name: Option<String>) -> Self {
        self.student_name = name.filter(|n| !n.trim().is_empty());
        self
    }

    // ---------------------------------------------------------------------
    // Session lifecycle
    // ---------------------------------------------------------------------

    fn initialize(&mut self) {
        self.cancel_all_timers();
        self.session_generation += 1;
        self.fill = FillState::new(&self.collection.items);
        self.completed.clear();
        self.current_index = 0;
        self.phase = GamePhase::TrialActive;
        self.feedback = None;
        self.persistence_warning = None;
        self.last_log = None;
        self.session = SessionContext::new(self.timers.now(), self.settings.required_stars);
        self.trial_key = None;

        info!(
            collection = %self.collection.name,
            items = self.collection.items.len(),
            mode = %self.settings.display_mode,
            policy = self.policy.name(),
            generation = self.session_generation,
            "session started"
        );

        self.rebuild_bank();
        self.sync_trial();
    }

    pub fn restart(&mut self) {
        self.speech.unlock_audio();
        self.speech.speak(RESTART_PHRASE);
        self.initialize();
    }

    /// Stops everything. The engine ignores input afterwards.
    pub fn request_exit(&mut self) {
        info!("exit requested");
        self.cancel_all_timers();
        self.phase = GamePhase::Exited;
    }

    fn finish(&mut self) {
        if matches!(self.phase, GamePhase::SessionComplete | GamePhase::Exited) {
            return;
        }
        self.phase = GamePhase::SessionComplete;
        self.cancel_trial_timers();
        self.trial_key = None;
        self.speech.speak(FINISH_PHRASE);

        let now = self.timers.now();
        let mut log = self
            .session
            .build_log(&self.collection, self.completed.len(), now);
        log.student_name = self.student_name.clone();
        info!(
            mistakes = log.mistakes,
            avg_secs = log.average_time_per_item,
            scaffold = %log.most_used_scaffold,
            "session complete"
        );
        if let Err(e) = self.store.append_game_log(&log) {
            warn!(error = %e, "could not save session log");
            self.persistence_warning = Some(format!("練習紀錄無法儲存：{e}"));
        }
        self.last_log = Some(log);
    }

    // ---------------------------------------------------------------------
    // Clock
    // ---------------------------------------------------------------------

    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    /// Runs every timer due up to `now`, in order, then moves the clock.
    pub fn advance_to(&mut self, now: Duration) {
        while let Some(fired) = self.timers.pop_due(now) {
            self.on_timer(fired);
        }
        self.timers.advance_clock(now);
    }

    pub fn advance_by(&mut self, dt: Duration) {
        let target = self.timers.now() + dt;
        self.advance_to(target);
    }

    fn schedule_session(&mut self, delay: Duration, kind: GameTimer) {
        let handle = self.timers.schedule(delay, self.session_generation, kind);
        self.handles.session.retain(|h| self.timers.is_pending(h));
        self.handles.session.push(handle);
    }

    fn cancel_trial_timers(&mut self) {
        if let Some(h) = self.handles.impulse.take() {
            self.timers.cancel(h);
        }
        if let Some(h) = self.handles.tick.take() {
            self.timers.cancel(h);
        }
    }

    fn cancel_all_timers(&mut self) {
        self.cancel_trial_timers();
        if let Some(h) = self.handles.feedback.take() {
            self.timers.cancel(h);
        }
        for h in self.handles.session.drain(..) {
            self.timers.cancel(h);
        }
    }

    fn on_timer(&mut self, fired: Fired<GameTimer>) {
        let current = if fired.kind.is_trial_scoped() {
            self.trial_generation
        } else {
            self.session_generation
        };
        if fired.generation != current {
            debug!(kind = ?fired.kind, generation = fired.generation, current, "discarding stale timer");
            return;
        }

        match fired.kind {
            GameTimer::ImpulseRelease => {
                self.handles.impulse = None;
                self.scaffolding.release();
                debug!(trial = self.trial_generation, "impulse lock released");
                self.handles.tick = Some(self.timers.schedule(
                    TICK_INTERVAL,
                    self.trial_generation,
                    GameTimer::ScaffoldTick,
                ));
            }
            GameTimer::ScaffoldTick => {
                self.handles.tick = Some(self.timers.schedule(
                    TICK_INTERVAL,
                    self.trial_generation,
                    GameTimer::ScaffoldTick,
                ));
                self.on_scaffold_tick();
            }
            GameTimer::FeedbackDismiss => {
                self.handles.feedback = None;
                self.feedback = None;
            }
            GameTimer::AnnounceCompletion { item_id } => {
                if let Some(item) = self.collection.item(&item_id) {
                    let phrase = completion_phrase(&item.name);
                    play_item_audio(&mut self.speech, item, &phrase);
                }
            }
            GameTimer::RevealReward => {
                info!(stars = self.session.rewards.stars(), "reward earned");
                self.session.rewards.reveal();
            }
            GameTimer::PacingStep { item_id } => self.on_pacing_step(&item_id),
            GameTimer::AdvanceItem => self.advance_item(),
            GameTimer::FinishSession => self.finish(),
        }
    }

    // ---------------------------------------------------------------------
    // Trials
    // ---------------------------------------------------------------------

    /// Starts a fresh trial whenever the focus item (or the session) changed.
    fn sync_trial(&mut self) {
        if matches!(self.phase, GamePhase::SessionComplete | GamePhase::Exited) {
            self.cancel_trial_timers();
            return;
        }
        let key = self
            .focus_item()
            .map(|item| (item.id.clone(), self.session_generation));
        if key == self.trial_key {
            return;
        }
        self.trial_key = key.clone();
        match key {
            Some((item_id, _)) => self.reset_trial(&item_id),
            None => self.cancel_trial_timers(),
        }
    }

    fn reset_trial(&mut self, item_id: &str) {
        self.cancel_trial_timers();
        self.trial_generation += 1;
        self.scaffolding.reset();
        let impulse = self.settings.impulse_duration();
        self.handles.impulse = Some(self.timers.schedule(
            impulse,
            self.trial_generation,
            GameTimer::ImpulseRelease,
        ));
        debug!(item = item_id, trial = self.trial_generation, "trial started");
    }

    fn on_scaffold_tick(&mut self) {
        let Some(outcome) = self.scaffolding.tick() else {
            return;
        };
        self.session.observe_scaffold(outcome.implied_level);
        if outcome.escalated {
            info!(level = %outcome.level, elapsed = outcome.elapsed_secs, "scaffolding escalated");
        }
        if outcome.play_hint {
            if let Some(item) = self.focus_item().cloned() {
                play_item_audio(&mut self.speech, &item, &item.hint);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Input
    // ---------------------------------------------------------------------

    fn accepts_input(&self) -> bool {
        !matches!(self.phase, GamePhase::SessionComplete | GamePhase::Exited)
            && !self.scaffolding.is_locked()
    }

    /// Resolves a drop against the session's policy and applies it.
    pub fn handle_drop(&mut self, event: &DropEvent) -> DropOutcome {
        if !self.accepts_input() {
            return DropOutcome::Ignored;
        }
        let Some(tile) = self.char_bank.iter().find(|t| t.id == event.tile_id).cloned() else {
            debug!(tile = %event.tile_id, "drop of unknown tile");
            return DropOutcome::Ignored;
        };

        let outcome = self.policy.resolve(&tile, &event.hits);
        debug!(tile = %tile.id, x = event.x, y = event.y, outcome = ?outcome, "drop resolved");
        match &outcome {
            DropOutcome::Success { item_id, tile } => self.on_success(item_id, tile),
            DropOutcome::Failure => self.on_failure(),
            DropOutcome::Ignored => {}
        }
        outcome
    }

    fn on_success(&mut self, item_id: &str, tile: &GameChar) {
        let Some(idx) = tile.target_index else {
            return;
        };
        if !self.fill.commit(item_id, idx, tile.ch) {
            return;
        }
        self.speech.speak(&success_phrase(tile.ch));
        self.show_feedback(Feedback::success());

        if self.session.rewards.award() {
            self.schedule_session(REWARD_REVEAL_DELAY, GameTimer::RevealReward);
        }

        if self.fill.is_full(item_id) && self.completed.insert(item_id.to_string()) {
            self.on_item_complete(item_id);
        }

        self.rebuild_bank();
        self.sync_trial();
    }

    fn on_failure(&mut self) {
        self.session.record_mistake();
        self.speech.speak(FAILURE_PHRASE);
        self.show_feedback(Feedback::error());
    }

    fn show_feedback(&mut self, feedback: Feedback) {
        if let Some(h) = self.handles.feedback.take() {
            self.timers.cancel(h);
        }
        self.feedback = Some(feedback);
        self.handles.feedback = Some(self.timers.schedule(
            FEEDBACK_DISPLAY,
            self.session_generation,
            GameTimer::FeedbackDismiss,
        ));
    }

    fn on_item_complete(&mut self, item_id: &str) {
        info!(item = item_id, completed = self.completed.len(), "item complete");
        self.schedule_session(
            COMPLETION_ANNOUNCE_DELAY,
            GameTimer::AnnounceCompletion {
                item_id: item_id.to_string(),
            },
        );
        self.schedule_session(
            PACING_STEP_DELAY,
            GameTimer::PacingStep {
                item_id: item_id.to_string(),
            },
        );

        if !self.settings.is_multi() || self.all_complete() {
            self.phase = GamePhase::ItemComplete {
                item_id: item_id.to_string(),
            };
            // Nothing left to help with on screen.
            self.cancel_trial_timers();
        }
    }

    fn on_pacing_step(&mut self, item_id: &str) {
        debug!(item = item_id, "pacing step");
        if self.settings.is_multi() {
            if self.all_complete() {
                self.schedule_session(MULTI_FINISH_DELAY, GameTimer::FinishSession);
            }
        } else {
            self.schedule_session(SINGLE_ADVANCE_DELAY, GameTimer::AdvanceItem);
        }
    }

    fn advance_item(&mut self) {
        if self.current_index + 1 < self.collection.items.len() {
            self.current_index += 1;
            self.phase = GamePhase::TrialActive;
            self.rebuild_bank();
            self.sync_trial();
        } else {
            self.finish();
        }
    }

    pub fn dismiss_reward(&mut self) {
        self.session.rewards.dismiss();
    }

    /// Replays the focus item's hint. Only offered once audio help is on.
    pub fn request_hint(&mut self) -> bool {
        if !self.hint_available() {
            return false;
        }
        match self.focus_item().cloned() {
            Some(item) => {
                play_item_audio(&mut self.speech, &item, &item.hint);
                true
            }
            None => false,
        }
    }

    /// Says a visible item's name, as when the child taps its picture.
    pub fn play_item_name(&mut self, item_id: &str) -> bool {
        let Some(item) = self.visible_items().into_iter().find(|i| i.id == item_id).cloned() else {
            return false;
        };
        play_item_audio(&mut self.speech, &item, &item.name);
        true
    }

    // ---------------------------------------------------------------------
    // Derived state
    // ---------------------------------------------------------------------

    fn rebuild_bank(&mut self) {
        self.bank_generation += 1;
        let visible: Vec<&Item> =
            visible_slice(&self.collection.items, self.settings.is_multi(), self.current_index)
                .iter()
                .collect();
        let bank = generate_char_bank(
            &visible,
            &self.fill,
            &self.completed,
            &self.settings,
            self.bank_generation,
            &mut self.rng,
        );
        self.char_bank = bank;
    }

    pub fn visible_items(&self) -> Vec<&Item> {
        visible_slice(&self.collection.items, self.settings.is_multi(), self.current_index)
            .iter()
            .collect()
    }

    /// The item scaffolding targets: the shown item in single mode, the
    /// first incomplete one in multi mode.
    pub fn focus_item(&self) -> Option<&Item> {
        if self.settings.is_multi() {
            self.collection
                .items
                .iter()
                .find(|i| !self.completed.contains(&i.id))
        } else {
            self.collection.items.get(self.current_index)
        }
    }

    fn all_complete(&self) -> bool {
        self.collection
            .items
            .iter()
            .all(|i| self.completed.contains(&i.id))
    }

    fn hint_available(&self) -> bool {
        self.scaffolding.level() >= ScaffoldingLevel::Audio && self.focus_item().is_some()
    }

    fn guide_hint(&self) -> Option<GuideHint> {
        if self.scaffolding.level() < ScaffoldingLevel::Guide {
            return None;
        }
        let focus = self.focus_item()?;
        let slot = self.fill.first_empty(&focus.id)?;
        let tile = self.char_bank.iter().find(|t| {
            t.belongs_to_item_id.as_deref() == Some(focus.id.as_str()) && t.target_index == Some(slot)
        })?;
        Some(GuideHint {
            tile_id: tile.id.clone(),
            item_id: focus.id.clone(),
            slot_index: slot,
        })
    }

    pub fn view(&self) -> GameView {
        let focus_id = self.focus_item().map(|i| i.id.clone());
        let level = self.scaffolding.level();
        let locked = self.scaffolding.is_locked();
        let guide = self.guide_hint();

        let items = self
            .visible_items()
            .into_iter()
            .map(|item| {
                let completed = self.completed.contains(&item.id);
                let is_focus = focus_id.as_deref() == Some(item.id.as_str());
                let flash_slot = if is_focus && !completed && level >= ScaffoldingLevel::Visual {
                    self.fill.first_empty(&item.id)
                } else {
                    None
                };
                ItemView {
                    id: item.id.clone(),
                    name: item.name.clone(),
                    image: item.image.clone(),
                    hint: item.hint.clone(),
                    slots: self.fill.slots(&item.id).to_vec(),
                    completed,
                    is_focus,
                    flash_slot,
                }
            })
            .collect();

        let tiles = if locked || self.is_complete() {
            Vec::new()
        } else {
            self.char_bank
                .iter()
                .map(|tile| TileView {
                    guided: guide.as_ref().is_some_and(|g| g.tile_id == tile.id),
                    tile: tile.clone(),
                })
                .collect()
        };

        GameView {
            collection_name: self.collection.name.clone(),
            items,
            focus_item_id: focus_id,
            level,
            impulse_locked: locked,
            tiles,
            guide,
            feedback: self.feedback.clone(),
            show_reward: self.session.rewards.is_showing(),
            is_complete: self.is_complete(),
            stars: self.session.rewards.stars(),
            required_stars: self.session.rewards.required(),
            hint_available: self.hint_available(),
            multi_mode: self.settings.is_multi(),
            current_index: self.current_index,
            total_items: self.collection.items.len(),
            persistence_warning: self.persistence_warning.clone(),
            summary: self.last_log.clone(),
        }
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn phase(&self) -> &GamePhase {
        &self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == GamePhase::SessionComplete
    }

    pub fn is_exited(&self) -> bool {
        self.phase == GamePhase::Exited
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn fill(&self) -> &FillState {
        &self.fill
    }

    pub fn completed(&self) -> &HashSet<String> {
        &self.completed
    }

    pub fn char_bank(&self) -> &[GameChar] {
        &self.char_bank
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn level(&self) -> ScaffoldingLevel {
        self.scaffolding.level()
    }

    pub fn is_impulse_locked(&self) -> bool {
        self.scaffolding.is_locked()
    }

    pub fn stars(&self) -> u32 {
        self.session.rewards.stars()
    }

    pub fn mistakes(&self) -> u32 {
        self.session.mistakes
    }

    pub fn max_scaffold_used(&self) -> ScaffoldingLevel {
        self.session.max_scaffold_used
    }

    pub fn session_generation(&self) -> u64 {
        self.session_generation
    }

    pub fn last_log(&self) -> Option<&GameLog> {
        self.last_log.as_ref()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn speech(&self) -> &S {
        &self.speech
    }

    pub fn speech_mut(&mut self) -> &mut S {
        &mut self.speech
    }

    pub fn store(&self) -> &L {
        &self.store
    }
}

/// Single mode shows one item at a time, multi mode shows them all.
fn visible_slice(items: &[Item], multi: bool, index: usize) -> &[Item] {
    if multi {
        items
    } else {
        items.get(index..=index).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drop_policy::HitElement;
    use crate::error::MatchError;
    use crate::model::DisplayMode;
    use crate::speech::RecordingSpeech;
    use crate::stats::SqliteLogStore;
    use assert_matches::assert_matches;

    type TestGame = Game<RecordingSpeech, SqliteLogStore>;

    fn secs(s: f64) -> Duration {
        Duration::from_millis((s * 1000.0).round() as u64)
    }

    fn collection(names: &[&str]) -> Collection {
        Collection {
            id: "c".into(),
            name: "班上".into(),
            items: names
                .iter()
                .enumerate()
                .map(|(i, n)| Item::new((i + 1).to_string(), *n, format!("hint-{n}")))
                .collect(),
        }
    }

    fn game(names: &[&str], settings: Settings) -> TestGame {
        Game::new(
            collection(names),
            settings,
            RecordingSpeech::default(),
            SqliteLogStore::open_in_memory().unwrap(),
        )
        .unwrap()
        .with_seed(7)
    }

    fn strict_drop(item: &str, idx: usize, on_item: &str, on_slot: usize) -> DropEvent {
        DropEvent {
            tile_id: format!("{item}-char-{idx}"),
            x: 0.0,
            y: 0.0,
            hits: vec![HitElement::slot(on_item, on_slot), HitElement::container(on_item)],
        }
    }

    fn unlocked(names: &[&str], settings: Settings) -> TestGame {
        let mut g = game(names, settings);
        g.advance_by(secs(1.5));
        assert!(!g.is_impulse_locked());
        g
    }

    #[test]
    fn construction_rejects_misconfiguration() {
        let bad = Game::new(
            collection(&["小明", ""]),
            Settings::default(),
            RecordingSpeech::default(),
            SqliteLogStore::open_in_memory().unwrap(),
        );
        assert_matches!(bad, Err(MatchError::InvalidCollection(_)));

        let bad = Game::new(
            collection(&["小明"]),
            Settings {
                required_stars: 0,
                ..Settings::default()
            },
            RecordingSpeech::default(),
            SqliteLogStore::open_in_memory().unwrap(),
        );
        assert_matches!(bad, Err(MatchError::InvalidSettings(_)));

        // An impulse lock too large for a Duration is an error, not a panic.
        let bad = Game::new(
            collection(&["小明"]),
            Settings {
                impulse_time: 1e20,
                ..Settings::default()
            },
            RecordingSpeech::default(),
            SqliteLogStore::open_in_memory().unwrap(),
        );
        assert_matches!(bad, Err(MatchError::InvalidSettings(_)));
    }

    #[test]
    fn new_session_is_impulse_locked_with_hidden_tiles() {
        let g = game(&["小明"], Settings::default());
        assert!(g.is_impulse_locked());
        assert_eq!(g.speech().calls.first(), Some(&crate::speech::SpeechCall::Unlock));
        let view = g.view();
        assert!(view.impulse_locked);
        assert!(view.tiles.is_empty());
        assert_eq!(g.char_bank().len(), 2);
    }

    #[test]
    fn drops_are_ignored_while_locked() {
        let mut g = game(&["小明"], Settings::default());
        assert_eq!(g.handle_drop(&strict_drop("1", 0, "1", 0)), DropOutcome::Ignored);
        assert!(g.fill().is_all_empty());
    }

    #[test]
    fn strict_success_fills_slot_and_awards_star() {
        let mut g = unlocked(&["小明"], Settings::default());
        let out = g.handle_drop(&strict_drop("1", 1, "1", 1));
        assert_matches!(out, DropOutcome::Success { .. });
        assert_eq!(g.fill().slots("1"), &[None, Some('明')]);
        assert_eq!(g.stars(), 1);
        assert_eq!(g.view().feedback, Some(Feedback::success()));
        assert!(g.speech().spoken().contains(&"答對了，這是明"));
        assert!(g.char_bank().iter().all(|t| t.id != "1-char-1"));
        // Half filled is not complete.
        assert!(g.completed().is_empty());
        assert_eq!(g.phase(), &GamePhase::TrialActive);
    }

    fn assert_fill_invariants(g: &TestGame) {
        for item in &g.collection().items {
            let filled = g.fill().filled_count(&item.id);
            assert!(filled <= item.slot_count(), "item {} overfilled", item.id);
            assert_eq!(
                g.completed().contains(&item.id),
                filled == item.slot_count(),
                "completion of item {} disagrees with its slots",
                item.id
            );
        }
    }

    #[test]
    fn mixed_drops_keep_completion_in_step_with_slots() {
        let mut g = unlocked(
            &["小明", "美美", "阿豪"],
            Settings {
                display_mode: DisplayMode::Multi,
                show_distractors: true,
                ..Settings::default()
            },
        );
        let drops = [
            strict_drop("1", 0, "1", 1),
            strict_drop("1", 0, "1", 0),
            strict_drop("1", 0, "1", 0),
            strict_drop("2", 1, "1", 1),
            strict_drop("3", 1, "3", 1),
            strict_drop("1", 1, "1", 1),
            strict_drop("2", 0, "2", 0),
            strict_drop("3", 0, "2", 1),
            strict_drop("2", 1, "2", 1),
            strict_drop("3", 0, "3", 0),
        ];
        for drop in &drops {
            g.handle_drop(drop);
            assert_fill_invariants(&g);
            // Focus changes re-lock the next trial.
            g.advance_by(secs(1.5));
            assert_fill_invariants(&g);
        }
        assert_eq!(g.completed().len(), 3);
        assert_eq!(g.mistakes(), 3);
        assert_eq!(g.stars(), 6);
    }

    #[test]
    fn strict_mismatch_counts_one_mistake_and_changes_nothing() {
        let mut g = unlocked(&["小明"], Settings::default());
        let before = g.fill().clone();
        assert_eq!(g.handle_drop(&strict_drop("1", 1, "1", 0)), DropOutcome::Failure);
        assert_eq!(g.mistakes(), 1);
        assert_eq!(g.fill(), &before);
        assert_eq!(g.stars(), 0);
        assert_eq!(g.view().feedback, Some(Feedback::error()));
        assert!(g.speech().spoken().contains(&FAILURE_PHRASE));
    }

    #[test]
    fn background_drop_is_silent() {
        let mut g = unlocked(&["小明"], Settings::default());
        let event = DropEvent {
            tile_id: "1-char-0".into(),
            x: 5.0,
            y: 5.0,
            hits: vec![HitElement::container("1")],
        };
        assert_eq!(g.handle_drop(&event), DropOutcome::Ignored);
        assert_eq!(g.mistakes(), 0);
        assert!(g.view().feedback.is_none());
    }

    #[test]
    fn feedback_dismisses_after_display_window() {
        let mut g = unlocked(&["小明"], Settings::default());
        g.handle_drop(&strict_drop("1", 1, "1", 0));
        g.advance_by(secs(1.4));
        assert!(g.view().feedback.is_some());
        g.advance_by(secs(0.1));
        assert!(g.view().feedback.is_none());
    }

    #[test]
    fn renewed_feedback_restarts_window() {
        let mut g = unlocked(&["小明"], Settings::default());
        g.handle_drop(&strict_drop("1", 1, "1", 0));
        g.advance_by(secs(1.0));
        g.handle_drop(&strict_drop("1", 1, "1", 0));
        g.advance_by(secs(1.0));
        assert!(g.view().feedback.is_some());
        g.advance_by(secs(0.5));
        assert!(g.view().feedback.is_none());
    }

    #[test]
    fn scaffolding_timeline() {
        let settings = Settings {
            delay_flash: 5,
            delay_hint: 10,
            delay_guide: 15,
            impulse_time: 1.5,
            ..Settings::default()
        };
        let mut g = game(&["小明"], settings);
        assert!(g.is_impulse_locked());

        g.advance_to(secs(1.4));
        assert!(g.is_impulse_locked());
        g.advance_to(secs(1.5));
        assert!(!g.is_impulse_locked());
        assert_eq!(g.level(), ScaffoldingLevel::None);

        g.advance_to(secs(6.4));
        assert_eq!(g.level(), ScaffoldingLevel::None);
        g.advance_to(secs(6.5));
        assert_eq!(g.level(), ScaffoldingLevel::Visual);
        assert_eq!(g.view().items[0].flash_slot, Some(0));

        g.advance_to(secs(11.5));
        assert_eq!(g.level(), ScaffoldingLevel::Audio);
        assert_eq!(g.speech().spoken(), vec!["hint-小明"]);
        assert!(g.view().hint_available);

        g.advance_to(secs(16.5));
        assert_eq!(g.level(), ScaffoldingLevel::Guide);
        let guide = g.view().guide.unwrap();
        assert_eq!(guide.item_id, "1");
        assert_eq!(guide.slot_index, 0);
        assert_eq!(guide.tile_id, "1-char-0");
        assert!(g.view().tile("1-char-0").unwrap().guided);

        g.advance_to(secs(40.0));
        assert_eq!(g.speech().spoken(), vec!["hint-小明"]);
        assert_eq!(g.max_scaffold_used(), ScaffoldingLevel::Guide);
    }

    #[test]
    fn hint_prefers_recorded_clip() {
        let mut c = collection(&["小明"]);
        c.items[0].audio = Some("clip-1".into());
        let mut g = Game::new(
            c,
            Settings::default(),
            RecordingSpeech::default(),
            SqliteLogStore::open_in_memory().unwrap(),
        )
        .unwrap();
        assert!(!g.request_hint());
        g.advance_to(secs(11.5));
        assert_eq!(g.speech().clips(), vec!["clip-1"]);
        assert!(g.request_hint());
        assert_eq!(g.speech().clips(), vec!["clip-1", "clip-1"]);
    }

    #[test]
    fn tapping_picture_says_name() {
        let mut g = game(&["小明", "美美"], Settings::default());
        assert!(g.play_item_name("1"));
        assert!(!g.play_item_name("2"));
        assert_eq!(g.speech().spoken().last(), Some(&"小明"));
    }

    #[test]
    fn single_mode_advances_after_pacing_delay() {
        let mut g = unlocked(&["小", "美"], Settings::default());
        g.handle_drop(&strict_drop("1", 0, "1", 0));
        assert!(g.completed().contains("1"));
        assert_eq!(
            g.phase(),
            &GamePhase::ItemComplete {
                item_id: "1".into()
            }
        );
        assert!(g.char_bank().is_empty());

        g.advance_by(secs(0.8));
        assert!(g.speech().spoken().contains(&"小，完成！"));
        g.advance_by(secs(2.1));
        assert_eq!(g.current_index(), 0);
        g.advance_by(secs(0.1));
        assert_eq!(g.current_index(), 1);
        assert_eq!(g.phase(), &GamePhase::TrialActive);
        assert!(g.is_impulse_locked());
        assert_eq!(g.char_bank().len(), 1);
    }

    #[test]
    fn scaffolding_pauses_once_item_is_spelled() {
        let settings = Settings {
            delay_flash: 1,
            delay_hint: 2,
            delay_guide: 3,
            ..Settings::default()
        };
        let mut g = unlocked(&["小", "美"], settings);
        g.handle_drop(&strict_drop("1", 0, "1", 0));
        g.advance_by(secs(2.9));
        assert_eq!(g.level(), ScaffoldingLevel::None);
        assert_eq!(g.max_scaffold_used(), ScaffoldingLevel::None);
    }

    #[test]
    fn single_mode_session_completes_and_logs() {
        let mut g = unlocked(&["小", "美", "阿"], Settings::default());
        for (n, id) in ["1", "2", "3"].iter().enumerate() {
            let out = g.handle_drop(&strict_drop(id, 0, id, 0));
            assert_matches!(out, DropOutcome::Success { .. });
            g.advance_by(secs(3.0));
            if n < 2 {
                g.advance_by(secs(1.5));
            }
        }
        assert!(g.is_complete());
        assert_eq!(g.stars(), 3);
        assert_eq!(g.completed().len(), 3);

        let log = g.last_log().unwrap().clone();
        let total = g.now().as_secs_f64();
        assert_eq!(log.total_items, 3);
        assert_eq!(log.completed_items, 3);
        assert!((log.average_time_per_item - total / 3.0).abs() < 1e-9);
        assert_eq!(g.store().game_logs().unwrap(), vec![log]);
        assert!(g.speech().spoken().contains(&FINISH_PHRASE));
        assert!(g.view().summary.is_some());
    }

    #[test]
    fn input_is_frozen_after_completion() {
        let mut g = unlocked(&["小"], Settings::default());
        g.handle_drop(&strict_drop("1", 0, "1", 0));
        g.advance_by(secs(3.0));
        assert!(g.is_complete());
        assert_eq!(g.handle_drop(&strict_drop("1", 0, "1", 0)), DropOutcome::Ignored);
        assert!(g.view().tiles.is_empty());
        assert_eq!(g.pending_timers(), 0);
    }

    #[test]
    fn multi_mode_focus_moves_to_next_incomplete() {
        let settings = Settings {
            display_mode: DisplayMode::Multi,
            ..Settings::default()
        };
        let mut g = unlocked(&["小", "美"], settings);
        assert_eq!(g.view().items.len(), 2);
        assert_eq!(g.focus_item().unwrap().id, "1");

        g.handle_drop(&strict_drop("1", 0, "1", 0));
        assert_eq!(g.phase(), &GamePhase::TrialActive);
        assert_eq!(g.focus_item().unwrap().id, "2");
        assert!(g.is_impulse_locked());

        g.advance_by(secs(1.5));
        g.handle_drop(&strict_drop("2", 0, "2", 0));
        assert_matches!(g.phase(), GamePhase::ItemComplete { .. });
        g.advance_by(secs(2.4));
        assert!(!g.is_complete());
        g.advance_by(secs(0.1));
        assert!(g.is_complete());
    }

    #[test]
    fn multi_mode_completing_non_focus_item_keeps_trial() {
        let settings = Settings {
            display_mode: DisplayMode::Multi,
            ..Settings::default()
        };
        let mut g = unlocked(&["小明", "美"], settings);
        g.advance_by(secs(5.0));
        assert_eq!(g.level(), ScaffoldingLevel::Visual);
        g.handle_drop(&strict_drop("2", 0, "2", 0));
        assert!(g.completed().contains("2"));
        assert_eq!(g.focus_item().unwrap().id, "1");
        assert_eq!(g.level(), ScaffoldingLevel::Visual);
    }

    #[test]
    fn errorless_drop_on_own_container_fills_target_slot() {
        let settings = Settings {
            errorless_mode: true,
            display_mode: DisplayMode::Multi,
            ..Settings::default()
        };
        let mut g = unlocked(&["小明", "美美"], settings);
        let anywhere = DropEvent {
            tile_id: "1-char-0".into(),
            x: 1.0,
            y: 1.0,
            hits: vec![HitElement::slot("1", 1), HitElement::container("1")],
        };
        assert_matches!(g.handle_drop(&anywhere), DropOutcome::Success { .. });
        assert_eq!(g.fill().slots("1"), &[Some('小'), None]);

        let elsewhere = DropEvent {
            tile_id: "1-char-1".into(),
            x: 1.0,
            y: 1.0,
            hits: vec![HitElement::container("2")],
        };
        assert_eq!(g.handle_drop(&elsewhere), DropOutcome::Ignored);
        assert_eq!(g.mistakes(), 0);
    }

    #[test]
    fn reward_reveals_on_multiple_and_waits_for_dismissal() {
        let settings = Settings {
            required_stars: 2,
            ..Settings::default()
        };
        let mut g = unlocked(&["小明"], settings);
        g.handle_drop(&strict_drop("1", 0, "1", 0));
        g.advance_by(secs(2.0));
        assert!(!g.view().show_reward);
        g.handle_drop(&strict_drop("1", 1, "1", 1));
        g.advance_by(secs(1.5));
        assert!(g.view().show_reward);
        g.advance_by(secs(10.0));
        assert!(g.view().show_reward);
        g.dismiss_reward();
        assert!(!g.view().show_reward);
    }

    #[test]
    fn restart_resets_everything() {
        let mut g = unlocked(&["小", "美"], Settings::default());
        g.handle_drop(&strict_drop("1", 0, "1", 0));
        g.handle_drop(&strict_drop("1", 0, "1", 0));
        let generation = g.session_generation();

        g.restart();
        assert_eq!(g.session_generation(), generation + 1);
        assert_eq!(g.stars(), 0);
        assert_eq!(g.mistakes(), 0);
        assert!(g.completed().is_empty());
        assert!(g.fill().is_all_empty());
        assert_eq!(g.current_index(), 0);
        assert!(g.is_impulse_locked());
        assert_eq!(g.max_scaffold_used(), ScaffoldingLevel::None);
        assert!(g.speech().spoken().contains(&RESTART_PHRASE));

        g.advance_by(secs(10.0));
        assert_eq!(g.current_index(), 0);
        assert!(g.completed().is_empty());
    }

    #[test]
    fn restart_mid_trial_restarts_scaffolding_on_same_item() {
        let mut g = unlocked(&["小明"], Settings::default());
        g.advance_by(secs(6.0));
        assert_eq!(g.level(), ScaffoldingLevel::Visual);
        g.restart();
        assert!(g.is_impulse_locked());
        g.advance_by(secs(1.5));
        assert_eq!(g.level(), ScaffoldingLevel::None);
        g.advance_by(secs(5.0));
        assert_eq!(g.level(), ScaffoldingLevel::Visual);
    }

    #[test]
    fn student_name_is_logged() {
        let mut g = game(&["小"], Settings::default()).with_student_name(Some("小華".into()));
        g.advance_by(secs(1.5));
        g.handle_drop(&strict_drop("1", 0, "1", 0));
        g.advance_by(secs(3.0));
        assert_eq!(g.last_log().unwrap().student_name.as_deref(), Some("小華"));
    }

    #[test]
    fn exit_cancels_timers_and_freezes() {
        let mut g = unlocked(&["小明"], Settings::default());
        g.request_exit();
        assert!(g.is_exited());
        assert_eq!(g.pending_timers(), 0);
        g.advance_by(secs(30.0));
        assert_eq!(g.level(), ScaffoldingLevel::None);
    }
}
