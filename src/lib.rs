// Library surface for the binary and for headless integration tests.
// Terminal rendering lives in the binary (src/ui.rs).
pub mod app_dirs;
pub mod celebration;
pub mod char_bank;
pub mod config;
pub mod controls;
pub mod drop_policy;
pub mod error;
pub mod game;
pub mod library;
pub mod model;
pub mod runtime;
pub mod scaffolding;
pub mod session;
pub mod speech;
pub mod stats;
pub mod timers;
pub mod view;

pub use error::{MatchError, Result};
pub use game::Game;
