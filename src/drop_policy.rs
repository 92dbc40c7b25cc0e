use std::fmt::Debug;

use crate::config::Settings;
use crate::model::GameChar;

/// A strict drop target: one ordered slot of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRef {
    pub item_id: String,
    pub index: usize,
}

/// One element under the pointer, as reported by the renderer's hit test.
/// Slots sit inside their item container, so a slot hit usually arrives
/// together with its container further down the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HitElement {
    pub item_container_id: Option<String>,
    pub slot: Option<SlotRef>,
}

impl HitElement {
    pub fn container(item_id: impl Into<String>) -> Self {
        Self {
            item_container_id: Some(item_id.into()),
            slot: None,
        }
    }

    pub fn slot(item_id: impl Into<String>, index: usize) -> Self {
        Self {
            item_container_id: None,
            slot: Some(SlotRef {
                item_id: item_id.into(),
                index,
            }),
        }
    }
}

/// Pointer release of a tile, with the hit test taken at that point.
#[derive(Debug, Clone, PartialEq)]
pub struct DropEvent {
    pub tile_id: String,
    pub x: f64,
    pub y: f64,
    /// Topmost element first
    pub hits: Vec<HitElement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Success { item_id: String, tile: GameChar },
    /// Counted mistake with feedback
    Failure,
    /// Tile snaps back, nothing is recorded
    Ignored,
}

/// Decides whether a drop fills a slot. Chosen once per session.
pub trait DropPolicy: Debug + Send {
    fn resolve(&self, tile: &GameChar, hits: &[HitElement]) -> DropOutcome;
    fn name(&self) -> &'static str;
}

/// The tile must land on exactly its own slot. Any other slot is a mistake;
/// background is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictPolicy;

impl DropPolicy for StrictPolicy {
    fn resolve(&self, tile: &GameChar, hits: &[HitElement]) -> DropOutcome {
        let Some(slot) = hits.iter().find_map(|h| h.slot.as_ref()) else {
            return DropOutcome::Ignored;
        };

        let matches = tile.belongs_to_item_id.as_deref() == Some(slot.item_id.as_str())
            && tile.target_index == Some(slot.index);

        if matches && !tile.is_distractor {
            DropOutcome::Success {
                item_id: slot.item_id.clone(),
                tile: tile.clone(),
            }
        } else {
            DropOutcome::Failure
        }
    }

    fn name(&self) -> &'static str {
        "strict"
    }
}

/// Anywhere inside the owning item's container counts. Everything else is
/// silently ignored so no mistake can ever be recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorlessPolicy;

impl DropPolicy for ErrorlessPolicy {
    fn resolve(&self, tile: &GameChar, hits: &[HitElement]) -> DropOutcome {
        let Some(container) = hits.iter().find_map(|h| h.item_container_id.as_deref()) else {
            return DropOutcome::Ignored;
        };

        match tile.belongs_to_item_id.as_deref() {
            Some(owner) if owner == container && !tile.is_distractor => DropOutcome::Success {
                item_id: owner.to_string(),
                tile: tile.clone(),
            },
            _ => DropOutcome::Ignored,
        }
    }

    fn name(&self) -> &'static str {
        "errorless"
    }
}

pub fn policy_for(settings: &Settings) -> Box<dyn DropPolicy> {
    if settings.errorless_mode {
        Box::new(ErrorlessPolicy)
    } else {
        Box::new(StrictPolicy)
    }
}
