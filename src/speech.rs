use tracing::{debug, warn};

use crate::error::{MatchError, Result};
use crate::model::Item;

/// Audio side of the game. Every call is fire-and-forget from the engine's
/// point of view; a failing clip is the only error it reacts to.
pub trait Speech {
    /// Speaks `text`, cancelling any utterance already in flight.
    fn speak(&mut self, text: &str);
    /// Starts a recorded base64 clip. Errors if playback cannot start.
    fn play_audio(&mut self, clip: &str) -> Result<()>;
    /// Primes the audio subsystem from a user gesture.
    fn unlock_audio(&mut self);
}

/// Prefers the item's recorded clip, falling back to speaking `fallback`
/// when there is no clip or it fails to play.
pub fn play_item_audio<S: Speech + ?Sized>(speech: &mut S, item: &Item, fallback: &str) {
    if let Some(clip) = item.audio.as_deref() {
        match speech.play_audio(clip) {
            Ok(()) => return,
            Err(e) => warn!(item = %item.id, error = %e, "recorded clip failed, speaking instead"),
        }
    }
    speech.speak(fallback);
}

/// Drops everything. Used when audio is unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSpeech;

impl Speech for SilentSpeech {
    fn speak(&mut self, _text: &str) {}

    fn play_audio(&mut self, _clip: &str) -> Result<()> {
        Err(MatchError::Audio("audio output unavailable".into()))
    }

    fn unlock_audio(&mut self) {}
}

/// Shows speech as a caption line instead of sound. Terminals cannot play
/// recorded clips, so those always fall back to the caption.
#[derive(Debug, Default, Clone)]
pub struct CaptionSpeech {
    caption: Option<String>,
}

impl CaptionSpeech {
    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }
}

impl Speech for CaptionSpeech {
    fn speak(&mut self, text: &str) {
        debug!(text, "speak");
        self.caption = Some(text.to_string());
    }

    fn play_audio(&mut self, _clip: &str) -> Result<()> {
        Err(MatchError::Audio("recorded clips are not playable here".into()))
    }

    fn unlock_audio(&mut self) {
        self.caption = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechCall {
    Speak(String),
    Clip(String),
    Unlock,
}

/// Records every call. Clips succeed unless `failing_clips` is set.
#[derive(Debug, Default, Clone)]
pub struct RecordingSpeech {
    pub calls: Vec<SpeechCall>,
    pub failing_clips: bool,
}

impl RecordingSpeech {
    pub fn failing_clips() -> Self {
        Self {
            calls: Vec::new(),
            failing_clips: true,
        }
    }

    pub fn spoken(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SpeechCall::Speak(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn clips(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SpeechCall::Clip(clip) => Some(clip.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Speech for RecordingSpeech {
    fn speak(&mut self, text: &str) {
        self.calls.push(SpeechCall::Speak(text.to_string()));
    }

    fn play_audio(&mut self, clip: &str) -> Result<()> {
        if self.failing_clips {
            return Err(MatchError::Audio("playback failed".into()));
        }
        self.calls.push(SpeechCall::Clip(clip.to_string()));
        Ok(())
    }

    fn unlock_audio(&mut self) {
        self.calls.push(SpeechCall::Unlock);
    }
}
