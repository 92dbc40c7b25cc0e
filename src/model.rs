use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single target: a person's name with its picture and hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    /// URL or base64 data URI, passed through to the renderer untouched
    pub image: String,
    /// Recorded base64 clip preferred over synthesized speech
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default)]
    pub hint: String,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image: String::new(),
            audio: None,
            hint: hint.into(),
        }
    }

    pub fn with_audio(mut self, clip: impl Into<String>) -> Self {
        self.audio = Some(clip.into());
        self
    }

    /// Number of ordered slots, one per character of the name.
    pub fn slot_count(&self) -> usize {
        self.name.chars().count()
    }

    pub fn char_at(&self, idx: usize) -> Option<char> {
        self.name.chars().nth(idx)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub items: Vec<Item>,
}

impl Collection {
    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }
}

/// Progressive help tiers. Ordering is meaningful: a trial only ever moves up.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[repr(u8)]
pub enum ScaffoldingLevel {
    #[default]
    None = 0,
    Visual = 1,
    Audio = 2,
    Guide = 3,
}

impl ScaffoldingLevel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Values above `Guide` saturate.
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => ScaffoldingLevel::None,
            1 => ScaffoldingLevel::Visual,
            2 => ScaffoldingLevel::Audio,
            _ => ScaffoldingLevel::Guide,
        }
    }

    /// Caregiver-facing label used by the log board.
    pub fn label(self) -> &'static str {
        match self {
            ScaffoldingLevel::None => "independent",
            ScaffoldingLevel::Visual => "visual prompt",
            ScaffoldingLevel::Audio => "audio prompt",
            ScaffoldingLevel::Guide => "guided gesture",
        }
    }
}

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Single,
    Multi,
}

/// A draggable character tile. Regenerated on every bank derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameChar {
    pub id: String,
    pub ch: char,
    /// `None` for distractors
    pub belongs_to_item_id: Option<String>,
    /// `None` for distractors
    pub target_index: Option<usize>,
    pub is_distractor: bool,
}

impl GameChar {
    pub fn for_slot(item_id: &str, idx: usize, ch: char) -> Self {
        Self {
            id: format!("{item_id}-char-{idx}"),
            ch,
            belongs_to_item_id: Some(item_id.to_string()),
            target_index: Some(idx),
            is_distractor: false,
        }
    }

    pub fn distractor(id: String, ch: char) -> Self {
        Self {
            id,
            ch,
            belongs_to_item_id: None,
            target_index: None,
            is_distractor: true,
        }
    }
}

/// Committed characters per item, one entry per slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillState {
    slots: HashMap<String, Vec<Option<char>>>,
}

impl FillState {
    /// All slots of every item start empty.
    pub fn new(items: &[Item]) -> Self {
        let slots = items
            .iter()
            .map(|item| (item.id.clone(), vec![None; item.slot_count()]))
            .collect();
        Self { slots }
    }

    pub fn slots(&self, item_id: &str) -> &[Option<char>] {
        self.slots.get(item_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Writes `ch` into an empty slot. Returns false when the slot is out of
    /// range or already holds a character.
    pub fn commit(&mut self, item_id: &str, idx: usize, ch: char) -> bool {
        match self.slots.get_mut(item_id).and_then(|s| s.get_mut(idx)) {
            Some(slot @ None) => {
                *slot = Some(ch);
                true
            }
            _ => false,
        }
    }

    pub fn first_empty(&self, item_id: &str) -> Option<usize> {
        self.slots(item_id).iter().position(Option::is_none)
    }

    pub fn filled_count(&self, item_id: &str) -> usize {
        self.slots(item_id).iter().filter(|s| s.is_some()).count()
    }

    pub fn is_full(&self, item_id: &str) -> bool {
        let slots = self.slots(item_id);
        !slots.is_empty() && slots.iter().all(Option::is_some)
    }

    pub fn is_all_empty(&self) -> bool {
        self.slots.values().flatten().all(Option::is_none)
    }
}
