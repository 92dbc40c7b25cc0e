use itertools::Itertools;

use crate::model::{GameChar, ScaffoldingLevel};
use crate::stats::GameLog;

pub const SUCCESS_MESSAGE: &str = "⭕ 答對了！";
pub const ERROR_MESSAGE: &str = "❌ 再試試看";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Success,
    Error,
}

/// Transient banner, auto-dismissed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub message: String,
}

impl Feedback {
    pub fn success() -> Self {
        Self {
            kind: FeedbackKind::Success,
            message: SUCCESS_MESSAGE.to_string(),
        }
    }

    pub fn error() -> Self {
        Self {
            kind: FeedbackKind::Error,
            message: ERROR_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemView {
    pub id: String,
    pub name: String,
    pub image: String,
    /// Describes the picture; terminal front ends show it in place of the image
    pub hint: String,
    pub slots: Vec<Option<char>>,
    pub completed: bool,
    pub is_focus: bool,
    /// Empty slot currently pulsing as a visual prompt
    pub flash_slot: Option<usize>,
}

impl ItemView {
    /// Slots as text, `_` for empty: `小_`.
    pub fn slot_text(&self) -> String {
        self.slots
            .iter()
            .map(|s| s.map_or_else(|| "_".to_string(), |c| c.to_string()))
            .join("")
    }
}

/// The tile the guide gesture should animate, and where it should go. The
/// renderer turns this into an on-screen vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideHint {
    pub tile_id: String,
    pub item_id: String,
    pub slot_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileView {
    pub tile: GameChar,
    pub guided: bool,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct GameView {
    pub collection_name: String,
    pub items: Vec<ItemView>,
    pub focus_item_id: Option<String>,
    pub level: ScaffoldingLevel,
    pub impulse_locked: bool,
    /// Empty while impulse-locked
    pub tiles: Vec<TileView>,
    pub guide: Option<GuideHint>,
    pub feedback: Option<Feedback>,
    pub show_reward: bool,
    pub is_complete: bool,
    pub stars: u32,
    pub required_stars: u32,
    pub hint_available: bool,
    pub multi_mode: bool,
    /// Zero-based index of the shown item in single mode
    pub current_index: usize,
    pub total_items: usize,
    pub persistence_warning: Option<String>,
    pub summary: Option<GameLog>,
}

impl GameView {
    pub fn item(&self, id: &str) -> Option<&ItemView> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn tile(&self, id: &str) -> Option<&TileView> {
        self.tiles.iter().find(|t| t.tile.id == id)
    }

    pub fn progress_label(&self) -> String {
        if self.multi_mode {
            "配對挑戰".to_string()
        } else {
            format!("第 {} / {} 題", self.current_index + 1, self.total_items)
        }
    }
}
