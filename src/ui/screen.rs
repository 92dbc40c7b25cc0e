use ratatui::Frame;

use crate::{ui::log_board::render_log_board, App, AppState};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
}

/// Trial screen - item cards, tiles and feedback via the App widget
pub struct GameScreen;

impl Screen for GameScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

/// Session summary - the App widget switches layout once the game is complete
pub struct CompletionScreen;

impl Screen for CompletionScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

/// Caregiver log table
pub struct LogBoardScreen;

impl Screen for LogBoardScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_log_board(app, f);
    }
}

pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Playing => Box::new(GameScreen),
        AppState::Complete => Box::new(CompletionScreen),
        AppState::LogBoard => Box::new(LogBoardScreen),
    }
}
