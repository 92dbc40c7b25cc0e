use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::config::Settings;
use crate::model::{FillState, GameChar, Item};

/// Decoy characters, common in the names children meet first.
pub const DISTRACTOR_POOL: [char; 10] = ['大', '小', '美', '阿', '華', '莉', '老', '師', '爸', '媽'];

pub const SINGLE_MODE_DISTRACTORS: usize = 2;
pub const MULTI_MODE_DISTRACTORS: usize = 4;

/// Derives the shuffled tile set for the visible items.
///
/// One tile per still-empty slot of every visible, incomplete item, plus
/// decoys when distractors are on and errorless mode is off. The order is
/// reshuffled on every call so a learner cannot memorize tile positions.
/// `generation` keeps decoy ids unique across regenerations.
pub fn generate_char_bank<R: Rng + ?Sized>(
    visible: &[&Item],
    fill: &FillState,
    completed: &HashSet<String>,
    settings: &Settings,
    generation: u64,
    rng: &mut R,
) -> Vec<GameChar> {
    let mut tiles: Vec<GameChar> = visible
        .iter()
        .filter(|item| !completed.contains(&item.id))
        .flat_map(|item| {
            let slots = fill.slots(&item.id);
            item.name
                .chars()
                .enumerate()
                .filter(move |(idx, _)| slots.get(*idx).map_or(true, Option::is_none))
                .map(move |(idx, ch)| GameChar::for_slot(&item.id, idx, ch))
        })
        .collect();

    if settings.show_distractors && !settings.errorless_mode {
        let count = if settings.is_multi() {
            MULTI_MODE_DISTRACTORS
        } else {
            SINGLE_MODE_DISTRACTORS
        };
        for i in 0..count {
            let ch = *DISTRACTOR_POOL.choose(rng).unwrap_or(&DISTRACTOR_POOL[0]);
            tiles.push(GameChar::distractor(format!("distractor-{i}-{generation}"), ch));
        }
    }

    tiles.shuffle(rng);
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DisplayMode;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn items() -> Vec<Item> {
        vec![
            Item::new("1", "小明", ""),
            Item::new("2", "美美", ""),
            Item::new("3", "阿豪", ""),
        ]
    }

    fn ids(tiles: &[GameChar]) -> Vec<String> {
        let mut ids: Vec<String> = tiles.iter().map(|t| t.id.clone()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn one_tile_per_empty_slot() {
        let items = items();
        let visible: Vec<&Item> = vec![&items[0]];
        let fill = FillState::new(&items);
        let mut rng = StdRng::seed_from_u64(7);
        let tiles = generate_char_bank(
            &visible,
            &fill,
            &HashSet::new(),
            &Settings::default(),
            1,
            &mut rng,
        );
        assert_eq!(ids(&tiles), vec!["1-char-0", "1-char-1"]);
        let ming = tiles.iter().find(|t| t.id == "1-char-1").unwrap();
        assert_eq!(ming.ch, '明');
        assert_eq!(ming.belongs_to_item_id.as_deref(), Some("1"));
        assert_eq!(ming.target_index, Some(1));
    }

    #[test]
    fn filled_slots_and_completed_items_drop_out() {
        let items = items();
        let visible: Vec<&Item> = items.iter().collect();
        let mut fill = FillState::new(&items);
        fill.commit("1", 0, '小');
        fill.commit("2", 0, '美');
        fill.commit("2", 1, '美');
        let completed: HashSet<String> = ["2".to_string()].into();
        let mut rng = StdRng::seed_from_u64(1);
        let tiles =
            generate_char_bank(&visible, &fill, &completed, &Settings::default(), 1, &mut rng);
        assert_eq!(ids(&tiles), vec!["1-char-1", "3-char-0", "3-char-1"]);
    }

    #[test]
    fn distractor_counts_follow_display_mode() {
        let items = items();
        let fill = FillState::new(&items);
        let mut rng = StdRng::seed_from_u64(3);

        let single = Settings {
            show_distractors: true,
            ..Settings::default()
        };
        let tiles = generate_char_bank(&[&items[0]], &fill, &HashSet::new(), &single, 4, &mut rng);
        let decoys: Vec<_> = tiles.iter().filter(|t| t.is_distractor).collect();
        assert_eq!(decoys.len(), SINGLE_MODE_DISTRACTORS);
        for d in decoys {
            assert!(DISTRACTOR_POOL.contains(&d.ch));
            assert!(d.belongs_to_item_id.is_none());
            assert!(d.target_index.is_none());
            assert!(d.id.ends_with("-4"));
        }

        let multi = Settings {
            show_distractors: true,
            display_mode: DisplayMode::Multi,
            ..Settings::default()
        };
        let visible: Vec<&Item> = items.iter().collect();
        let tiles = generate_char_bank(&visible, &fill, &HashSet::new(), &multi, 5, &mut rng);
        assert_eq!(
            tiles.iter().filter(|t| t.is_distractor).count(),
            MULTI_MODE_DISTRACTORS
        );
        assert_eq!(tiles.len(), 6 + MULTI_MODE_DISTRACTORS);
    }

    #[test]
    fn errorless_mode_suppresses_distractors() {
        let items = items();
        let fill = FillState::new(&items);
        let settings = Settings {
            show_distractors: true,
            errorless_mode: true,
            display_mode: DisplayMode::Multi,
            ..Settings::default()
        };
        let visible: Vec<&Item> = items.iter().collect();
        let mut rng = StdRng::seed_from_u64(11);
        for generation in 0..20 {
            let tiles =
                generate_char_bank(&visible, &fill, &HashSet::new(), &settings, generation, &mut rng);
            assert!(tiles.iter().all(|t| !t.is_distractor));
        }
    }

    #[test]
    fn order_is_reshuffled_between_generations() {
        let items = vec![Item::new("x", "一二三四五六七八", "")];
        let fill = FillState::new(&items);
        let mut rng = StdRng::seed_from_u64(42);
        let orders: HashSet<Vec<String>> = (0..10)
            .map(|g| {
                generate_char_bank(&[&items[0]], &fill, &HashSet::new(), &Settings::default(), g, &mut rng)
                    .into_iter()
                    .map(|t| t.id)
                    .collect()
            })
            .collect();
        assert!(orders.len() > 1);
    }
}
