use std::ops::Range;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::drop_policy::{DropEvent, HitElement};
use crate::view::GameView;

/// What the front end should do with a key press
#[derive(Debug, Clone, PartialEq)]
pub enum ControlAction {
    None,
    Drop(DropEvent),
    Restart,
    Exit,
    Hint,
    PlayName(String),
    DismissReward,
    ShowLogs,
}

/// Tiles addressable by a letter at once. Larger banks are paged.
pub const TILES_PER_PAGE: usize = 26;

/// Keyboard stand-in for dragging.
///
/// A letter picks up a tile (tiles are labelled `a`, `b`, ... on each page;
/// Tab and Shift-Tab flip pages). A number then drops it on that slot of the
/// shown item, Enter on the item card itself and Space on the background.
/// With several items on screen, the first number picks the item and the
/// second one the slot.
///
/// Numbers may have several digits. A number is taken as soon as no further
/// digit could still name something on screen; otherwise Enter confirms it.
#[derive(Debug, Default, Clone)]
pub struct Controls {
    selected: Option<String>,
    target_item: Option<String>,
    pending: Option<usize>,
    page: usize,
}

pub fn tile_label(index: usize) -> Option<char> {
    (index < TILES_PER_PAGE).then(|| (b'a' + index as u8) as char)
}

fn tile_index(c: char) -> Option<usize> {
    c.is_ascii_lowercase().then(|| (c as u8 - b'a') as usize)
}

pub fn page_count(view: &GameView) -> usize {
    view.tiles.len().div_ceil(TILES_PER_PAGE).max(1)
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_tile(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn target_item(&self) -> Option<&str> {
        self.target_item.as_deref()
    }

    /// Digits typed so far for a number that is not settled yet.
    pub fn pending_number(&self) -> Option<usize> {
        self.pending
    }

    /// Current tile page, clamped to the bank as it is now.
    pub fn page(&self, view: &GameView) -> usize {
        self.page.min(page_count(view) - 1)
    }

    /// Bank positions shown on the current page.
    pub fn page_range(&self, view: &GameView) -> Range<usize> {
        let start = self.page(view) * TILES_PER_PAGE;
        start..(start + TILES_PER_PAGE).min(view.tiles.len())
    }

    /// Page holding the tile at bank position `index`.
    pub fn page_of(index: usize) -> usize {
        index / TILES_PER_PAGE
    }

    pub fn reset(&mut self) {
        self.selected = None;
        self.target_item = None;
        self.pending = None;
    }

    pub fn handle_key(&mut self, key: KeyEvent, view: &GameView) -> ControlAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => ControlAction::Exit,
                KeyCode::Char('r') => {
                    self.reset();
                    self.page = 0;
                    ControlAction::Restart
                }
                _ => ControlAction::None,
            };
        }

        if view.is_complete {
            self.reset();
            return match key.code {
                KeyCode::Char('r') => ControlAction::Restart,
                KeyCode::Char('l') => ControlAction::ShowLogs,
                KeyCode::Char('q') | KeyCode::Esc => ControlAction::Exit,
                _ => ControlAction::None,
            };
        }

        if view.show_reward {
            return match key.code {
                KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Esc => ControlAction::DismissReward,
                _ => ControlAction::None,
            };
        }

        // A tile that vanished from the bank can no longer be held.
        if let Some(id) = &self.selected {
            if view.tile(id).is_none() {
                self.reset();
            }
        }

        match key.code {
            KeyCode::Esc if self.selected.is_some() || self.pending.is_some() => {
                self.reset();
                ControlAction::None
            }
            KeyCode::Esc => ControlAction::Exit,
            KeyCode::Char('?') => ControlAction::Hint,
            KeyCode::Char('.') => view
                .focus_item_id
                .clone()
                .map_or(ControlAction::None, ControlAction::PlayName),
            KeyCode::Tab => {
                self.page = (self.page(view) + 1) % page_count(view);
                ControlAction::None
            }
            KeyCode::BackTab => {
                let pages = page_count(view);
                self.page = (self.page(view) + pages - 1) % pages;
                ControlAction::None
            }
            KeyCode::Char(c) if tile_index(c).is_some() => {
                let range = self.page_range(view);
                let pos = tile_index(c)
                    .map(|i| range.start + i)
                    .filter(|pos| range.contains(pos));
                if let Some(tile) = pos.and_then(|pos| view.tiles.get(pos)) {
                    self.selected = Some(tile.tile.id.clone());
                    self.target_item = None;
                    self.pending = None;
                }
                ControlAction::None
            }
            KeyCode::Char(c) if c.is_ascii_digit() => self.on_digit(c, view),
            KeyCode::Enter => match self.pending.take() {
                Some(n) => self.settle_number(n, view),
                None => match self.item_for_drop(view) {
                    Some(item_id) => self.release(view, vec![HitElement::container(item_id)]),
                    None => ControlAction::None,
                },
            },
            KeyCode::Char(' ') => self.release(view, Vec::new()),
            _ => ControlAction::None,
        }
    }

    fn item_for_drop(&self, view: &GameView) -> Option<String> {
        if view.multi_mode {
            self.target_item.clone()
        } else {
            view.items.first().map(|i| i.id.clone())
        }
    }

    fn choosing_item(&self, view: &GameView) -> bool {
        view.multi_mode && self.target_item.is_none()
    }

    /// How many things the next number can name: items or slots.
    fn number_limit(&self, view: &GameView) -> usize {
        if self.choosing_item(view) {
            view.items.len()
        } else {
            self.item_for_drop(view)
                .and_then(|id| view.item(&id))
                .map_or(0, |i| i.slots.len())
        }
    }

    fn on_digit(&mut self, c: char, view: &GameView) -> ControlAction {
        if self.selected.is_none() {
            return ControlAction::None;
        }
        let Some(d) = c.to_digit(10) else {
            return ControlAction::None;
        };
        let n = self.pending.take().unwrap_or(0) * 10 + d as usize;
        if n == 0 {
            return ControlAction::None;
        }
        if n * 10 <= self.number_limit(view) {
            // Another digit could still name something.
            self.pending = Some(n);
            return ControlAction::None;
        }
        self.settle_number(n, view)
    }

    fn settle_number(&mut self, n: usize, view: &GameView) -> ControlAction {
        let pos = n - 1;
        if self.choosing_item(view) {
            if let Some(item) = view.items.get(pos) {
                self.target_item = Some(item.id.clone());
            }
            return ControlAction::None;
        }

        let Some(item_id) = self.item_for_drop(view) else {
            return ControlAction::None;
        };
        let slots = view.item(&item_id).map_or(0, |i| i.slots.len());
        let hits = if pos < slots {
            vec![
                HitElement::slot(item_id.clone(), pos),
                HitElement::container(item_id),
            ]
        } else {
            vec![HitElement::container(item_id)]
        };
        self.release(view, hits)
    }

    fn release(&mut self, view: &GameView, hits: Vec<HitElement>) -> ControlAction {
        let Some(tile_id) = self.selected.take() else {
            return ControlAction::None;
        };
        self.target_item = None;
        self.pending = None;

        let (x, y) = match hits.first() {
            Some(HitElement {
                slot: Some(slot), ..
            }) => (
                slot.index as f64,
                view.items.iter().position(|i| i.id == slot.item_id).unwrap_or(0) as f64,
            ),
            _ => (0.0, 0.0),
        };
        ControlAction::Drop(DropEvent { tile_id, x, y, hits })
    }
}
