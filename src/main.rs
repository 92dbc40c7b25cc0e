mod ui;

use clap::{error::ErrorKind, Args, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{KeyCode, KeyEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use matchking::{
    app_dirs::AppDirs,
    celebration::RewardBurst,
    config::{FileSettingsStore, Settings, SettingsStore},
    controls::{ControlAction, Controls},
    game::Game,
    library::{CollectionStore, FileCollectionStore},
    model::DisplayMode,
    runtime::{AppEvent, Clock, CrosstermEventSource, EventSource, FixedTicker, MonotonicClock, Runner, Ticker},
    speech::CaptionSpeech,
    stats::{export_csv, GameLog, LogStore, SqliteLogStore},
    MatchError,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, File, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TICK_RATE_MS: u64 = 100;

/// scaffolded name-matching trainer
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Spell a classmate's name from character tiles. Help escalates on a timer (flashing slot, spoken hint, guided tile) and every session is logged for caregivers."
)]
pub struct Cli {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// play a session (the default)
    Play(PlayArgs),
    /// show saved session logs
    Logs {
        /// export as CSV to this path (`-` for stdout)
        #[clap(long)]
        csv: Option<PathBuf>,
    },
    /// delete all saved session logs
    ClearLogs,
    /// list, import or select collections
    Collections {
        /// import a collection from a JSON file
        #[clap(long)]
        import: Option<PathBuf>,
        /// make this collection the one played by default
        #[clap(long)]
        select: Option<String>,
    },
    /// show the effective settings, optionally saving overrides
    Settings {
        #[clap(flatten)]
        overrides: SettingsOverrides,
        /// persist the merged settings
        #[clap(long)]
        save: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct PlayArgs {
    /// collection id to play instead of the active one
    #[clap(short = 'c', long)]
    collection: Option<String>,

    /// learner name recorded on the session log
    #[clap(long)]
    student: Option<String>,

    #[clap(flatten)]
    overrides: SettingsOverrides,
}

/// One-run overrides layered over the stored settings
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    /// show every item at once
    #[clap(long, conflicts_with = "mode")]
    multi: bool,

    /// display mode
    #[clap(long, value_enum)]
    mode: Option<DisplayMode>,

    /// only accept tiles on their own item; never count mistakes
    #[clap(long, num_args = 0..=1, default_missing_value = "true")]
    errorless: Option<bool>,

    /// mix decoy characters into the tiles
    #[clap(long, num_args = 0..=1, default_missing_value = "true")]
    distractors: Option<bool>,

    /// stars needed for each reward
    #[clap(long)]
    required_stars: Option<u32>,

    /// seconds the tiles stay hidden at the start of each trial
    #[clap(long)]
    impulse: Option<f64>,

    /// seconds before the next slot flashes
    #[clap(long)]
    delay_flash: Option<u32>,

    /// seconds before the hint is spoken
    #[clap(long)]
    delay_hint: Option<u32>,

    /// seconds before the guided tile shows
    #[clap(long)]
    delay_guide: Option<u32>,
}

impl SettingsOverrides {
    fn apply(&self, mut settings: Settings) -> Settings {
        if self.multi {
            settings.display_mode = DisplayMode::Multi;
        }
        if let Some(mode) = self.mode {
            settings.display_mode = mode;
        }
        if let Some(v) = self.errorless {
            settings.errorless_mode = v;
        }
        if let Some(v) = self.distractors {
            settings.show_distractors = v;
        }
        if let Some(v) = self.required_stars {
            settings.required_stars = v;
        }
        if let Some(v) = self.impulse {
            settings.impulse_time = v;
        }
        if let Some(v) = self.delay_flash {
            settings.delay_flash = v;
        }
        if let Some(v) = self.delay_hint {
            settings.delay_hint = v;
        }
        if let Some(v) = self.delay_guide {
            settings.delay_guide = v;
        }
        settings
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Playing,
    Complete,
    LogBoard,
}

#[derive(Debug, Default)]
pub struct LogBoardState {
    pub logs: Vec<GameLog>,
    pub scroll_offset: usize,
    pub error: Option<String>,
}

pub type TuiGame = Game<CaptionSpeech, SqliteLogStore>;

#[derive(Debug)]
pub struct App {
    pub game: TuiGame,
    pub state: AppState,
    pub controls: Controls,
    pub burst: RewardBurst,
    pub log_board: LogBoardState,
}

impl App {
    pub fn new(game: TuiGame) -> Self {
        Self {
            game,
            state: AppState::Playing,
            controls: Controls::new(),
            burst: RewardBurst::new(),
            log_board: LogBoardState::default(),
        }
    }

    /// Applies a key press. Returns false once the app should quit.
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        if self.state == AppState::LogBoard {
            return self.on_log_board_key(key);
        }

        let view = self.game.view();
        match self.controls.handle_key(key, &view) {
            ControlAction::None => {}
            ControlAction::Drop(ev) => {
                self.game.handle_drop(&ev);
            }
            ControlAction::Restart => self.game.restart(),
            ControlAction::Exit => self.game.request_exit(),
            ControlAction::Hint => {
                self.game.request_hint();
            }
            ControlAction::PlayName(id) => {
                self.game.play_item_name(&id);
            }
            ControlAction::DismissReward => self.game.dismiss_reward(),
            ControlAction::ShowLogs => self.open_log_board(),
        }
        !self.game.is_exited()
    }

    fn on_log_board_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => {
                self.game.request_exit();
                return false;
            }
            KeyCode::Char('r') => {
                self.game.restart();
                self.state = AppState::Playing;
            }
            KeyCode::Char('b') | KeyCode::Backspace | KeyCode::Esc => {
                self.state = AppState::Complete;
            }
            KeyCode::Up => {
                self.log_board.scroll_offset = self.log_board.scroll_offset.saturating_sub(1);
            }
            KeyCode::Down => self.log_board.scroll_offset += 1,
            KeyCode::PageUp => {
                self.log_board.scroll_offset = self.log_board.scroll_offset.saturating_sub(10);
            }
            KeyCode::PageDown => self.log_board.scroll_offset += 10,
            KeyCode::Home => self.log_board.scroll_offset = 0,
            _ => {}
        }
        true
    }

    fn open_log_board(&mut self) {
        self.log_board = match self.game.store().game_logs() {
            Ok(logs) => LogBoardState {
                logs,
                ..LogBoardState::default()
            },
            Err(e) => {
                warn!(error = %e, "could not read session logs");
                LogBoardState {
                    error: Some(e.to_string()),
                    ..LogBoardState::default()
                }
            }
        };
        self.state = AppState::LogBoard;
    }

    /// Moves the clock and keeps screen state in line with the engine.
    pub fn tick(&mut self, now: Duration, width: u16, height: u16) {
        self.game.advance_to(now);

        match (self.state, self.game.is_complete()) {
            (AppState::Playing, true) => self.state = AppState::Complete,
            (AppState::Complete, false) => self.state = AppState::Playing,
            _ => {}
        }

        let showing = self.game.view().show_reward;
        if showing && !self.burst.is_active() {
            self.burst.start(width, height, &mut rand::thread_rng());
        } else if !showing && self.burst.is_active() {
            self.burst.stop();
        }
        self.burst.update(now);
    }
}

fn init_tracing() {
    let Some(path) = AppDirs::trace_log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("matchking=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command.unwrap_or_else(|| Command::Play(PlayArgs::default())) {
        Command::Play(args) => play(args),
        Command::Logs { csv } => show_logs(csv),
        Command::ClearLogs => {
            SqliteLogStore::new()?.clear_game_logs()?;
            println!("session logs cleared");
            Ok(())
        }
        Command::Collections { import, select } => collections(import, select),
        Command::Settings { overrides, save } => settings(overrides, save),
    }
}

fn play(args: PlayArgs) -> Result<(), Box<dyn Error>> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let settings = args.overrides.apply(FileSettingsStore::new().load());
    let library = FileCollectionStore::new();
    let collection = match &args.collection {
        Some(id) => library
            .load_collections()
            .into_iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| MatchError::UnknownCollection(id.clone()))?,
        None => library.active_collection()?,
    };
    let store = SqliteLogStore::new().or_else(|e| {
        warn!(error = %e, "log database unavailable, logs will not persist");
        SqliteLogStore::open_in_memory()
    })?;

    let game = Game::new(collection, settings, CaptionSpeech::default(), store)?
        .with_student_name(args.student);
    info!(collection = %game.collection().id, "starting terminal session");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(game);
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
        MonotonicClock::new(),
    );
    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: EventSource, T: Ticker, C: Clock>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T, C>,
) -> Result<(), Box<dyn Error>> {
    loop {
        let size = terminal.size()?;
        app.tick(runner.now(), size.width, size.height);
        terminal.draw(|f| ui::draw(app, f))?;

        let step = runner.step();
        app.tick(step.now, size.width, size.height);
        match step.event {
            AppEvent::Tick | AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if !app.on_key(key) {
                    break;
                }
            }
        }
        if app.game.is_exited() {
            break;
        }
    }
    info!("terminal session ended");
    Ok(())
}

fn show_logs(csv: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let logs = SqliteLogStore::new()?.game_logs()?;
    match csv {
        Some(path) if path.as_os_str() == "-" => export_csv(&logs, io::stdout())?,
        Some(path) => {
            export_csv(&logs, File::create(&path)?)?;
            println!("wrote {} sessions to {}", logs.len(), path.display());
        }
        None if logs.is_empty() => println!("no sessions recorded yet"),
        None => {
            for log in &logs {
                println!("{}", format_log_line(log));
            }
        }
    }
    Ok(())
}

fn format_log_line(log: &GameLog) -> String {
    format!(
        "{}  {}{}  {}/{}  mistakes {}  {:.1}s/item  {}",
        log.timestamp.format("%Y-%m-%d %H:%M"),
        log.student_name
            .as_deref()
            .map(|n| format!("{n} · "))
            .unwrap_or_default(),
        log.collection_name,
        log.completed_items,
        log.total_items,
        log.mistakes,
        log.average_time_per_item,
        log.most_used_scaffold.label(),
    )
}

fn collections(import: Option<PathBuf>, select: Option<String>) -> Result<(), Box<dyn Error>> {
    let store = FileCollectionStore::new();
    if let Some(path) = import {
        let imported = store.import(&path)?;
        println!("imported '{}' ({} items)", imported.name, imported.items.len());
    }
    if let Some(id) = select {
        if !store.load_collections().iter().any(|c| c.id == id) {
            return Err(MatchError::UnknownCollection(id).into());
        }
        store.set_active_collection_id(&id)?;
    }

    let active = store.active_collection_id();
    for c in store.load_collections() {
        let marker = if c.id == active { "*" } else { " " };
        println!("{marker} {}  {}  ({} items)", c.id, c.name, c.items.len());
    }
    Ok(())
}

fn settings(overrides: SettingsOverrides, save: bool) -> Result<(), Box<dyn Error>> {
    let store = FileSettingsStore::new();
    let merged = overrides.apply(store.load());
    merged.validate()?;
    if save {
        store.save(&merged)?;
        info!("settings saved");
    }
    println!("{}", serde_json::to_string_pretty(&merged)?);
    Ok(())
}
