use std::sync::mpsc::{self, Sender};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use matchking::controls::{tile_label, ControlAction, Controls};
use matchking::runtime::{AppEvent, FixedTicker, ManualClock, Runner, TestEventSource};
use matchking::stats::LogStore;
use matchking::{
    config::Settings, game::Game, library::default_collection, speech::RecordingSpeech,
    stats::SqliteLogStore,
};

type TestRunner = Runner<TestEventSource, FixedTicker, ManualClock>;
type TestGame = Game<RecordingSpeech, SqliteLogStore>;

fn key(c: char) -> AppEvent {
    AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

// One turn of a headless front end loop: pull an event, move the engine's
// clock, apply whatever the key meant.
fn pump(runner: &TestRunner, game: &mut TestGame, controls: &mut Controls) {
    let step = runner.step();
    game.advance_to(step.now);
    if let AppEvent::Key(k) = step.event {
        match controls.handle_key(k, &game.view()) {
            ControlAction::Drop(ev) => {
                game.handle_drop(&ev);
            }
            ControlAction::Restart => game.restart(),
            ControlAction::Exit => game.request_exit(),
            ControlAction::Hint => {
                game.request_hint();
            }
            ControlAction::PlayName(id) => {
                game.play_item_name(&id);
            }
            ControlAction::DismissReward => game.dismiss_reward(),
            ControlAction::ShowLogs | ControlAction::None => {}
        }
    }
}

fn type_slot(
    tx: &Sender<AppEvent>,
    runner: &TestRunner,
    game: &mut TestGame,
    controls: &mut Controls,
    slot: usize,
) {
    let view = game.view();
    let pos = view
        .tiles
        .iter()
        .position(|t| t.tile.target_index == Some(slot))
        .expect("tile for slot");
    tx.send(key(tile_label(pos).unwrap())).unwrap();
    tx.send(key(char::from_digit(slot as u32 + 1, 10).unwrap()))
        .unwrap();
    pump(runner, game, controls);
    pump(runner, game, controls);
}

#[test]
fn headless_session_spells_every_name() {
    let (tx, rx) = mpsc::channel();
    let clock = ManualClock::new();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(1)),
        clock.clone(),
    );
    let mut game = Game::new(
        default_collection(),
        Settings::default(),
        RecordingSpeech::default(),
        SqliteLogStore::open_in_memory().unwrap(),
    )
    .unwrap()
    .with_seed(42);
    let mut controls = Controls::new();

    for index in 0..3 {
        assert_eq!(game.current_index(), index);
        clock.advance(Duration::from_millis(1500));
        pump(&runner, &mut game, &mut controls);
        assert!(!game.is_impulse_locked());

        for slot in 0..2 {
            type_slot(&tx, &runner, &mut game, &mut controls, slot);
        }
        let id = game.collection().items[index].id.clone();
        assert!(game.completed().contains(&id));

        clock.advance(Duration::from_millis(3000));
        pump(&runner, &mut game, &mut controls);
    }

    assert!(game.is_complete());
    assert_eq!(game.stars(), 6);
    assert_eq!(game.mistakes(), 0);
    let logs = game.store().game_logs().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].completed_items, 3);
    assert_eq!(logs[0].collection_name, "認識班上同學");
    assert!(game
        .speech()
        .spoken()
        .contains(&"太棒了，全部完成了！"));
}

#[test]
fn headless_wrong_slot_then_escape_quits() {
    let (tx, rx) = mpsc::channel();
    let clock = ManualClock::new();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(1)),
        clock.clone(),
    );
    let mut game = Game::new(
        default_collection(),
        Settings::default(),
        RecordingSpeech::default(),
        SqliteLogStore::open_in_memory().unwrap(),
    )
    .unwrap()
    .with_seed(7);
    let mut controls = Controls::new();

    clock.advance(Duration::from_millis(1500));
    pump(&runner, &mut game, &mut controls);

    // 明 dropped on the first slot.
    let view = game.view();
    let pos = view
        .tiles
        .iter()
        .position(|t| t.tile.target_index == Some(1))
        .unwrap();
    tx.send(key(tile_label(pos).unwrap())).unwrap();
    tx.send(key('1')).unwrap();
    pump(&runner, &mut game, &mut controls);
    pump(&runner, &mut game, &mut controls);
    assert_eq!(game.mistakes(), 1);
    assert!(game.fill().is_all_empty());
    assert!(game.speech().spoken().contains(&"不對喔，再試試看"));

    tx.send(AppEvent::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)))
        .unwrap();
    pump(&runner, &mut game, &mut controls);
    assert!(game.is_exited());
}

#[test]
fn headless_ticks_drive_scaffolding() {
    let (_tx, rx) = mpsc::channel();
    let clock = ManualClock::new();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(1)),
        clock.clone(),
    );
    let mut game = Game::new(
        default_collection(),
        Settings::default(),
        RecordingSpeech::default(),
        SqliteLogStore::open_in_memory().unwrap(),
    )
    .unwrap();
    let mut controls = Controls::new();

    // 100 ms frames, like the terminal loop.
    for _ in 0..120 {
        clock.advance(Duration::from_millis(100));
        pump(&runner, &mut game, &mut controls);
    }
    assert_eq!(game.now(), Duration::from_secs(12));
    assert_eq!(
        game.level(),
        matchking::model::ScaffoldingLevel::Audio
    );
    assert_eq!(game.speech().spoken(), vec!["戴著藍色眼鏡的男生"]);
}
