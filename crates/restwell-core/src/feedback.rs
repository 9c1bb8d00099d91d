//! Audible and haptic cues around the rest countdown.
//!
//! Cues are best effort. Every failure is logged and swallowed so a broken
//! speaker or vibration motor never interrupts a session.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundMode {
    #[default]
    Beep,
    /// Speak the remaining seconds.
    Voice,
    Silent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HapticPattern {
    #[default]
    Heavy,
    Medium,
    Light,
    Dual,
    Triple,
}

impl HapticPattern {
    /// Plain vibration (on/off milliseconds) used when the patterned haptic
    /// is unavailable.
    pub fn fallback_vibration(self) -> &'static [u64] {
        match self {
            HapticPattern::Heavy => &[100],
            HapticPattern::Medium => &[40],
            HapticPattern::Light => &[20],
            HapticPattern::Dual => &[50, 50, 50],
            HapticPattern::Triple => &[50, 30, 50, 30, 50],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackConfig {
    #[serde(default)]
    pub sound: SoundMode,
    #[serde(default)]
    pub haptic: HapticPattern,
    /// Cue on each of the last N seconds of a running countdown.
    #[serde(default = "default_countdown_cues")]
    pub countdown_cues: u64,
}

fn default_countdown_cues() -> u64 {
    3
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            sound: SoundMode::default(),
            haptic: HapticPattern::default(),
            countdown_cues: default_countdown_cues(),
        }
    }
}

/// Device output for cues.
pub trait Feedback {
    fn beep(&self) -> Result<()>;
    fn speak(&self, text: &str) -> Result<()>;
    fn haptic(&self, pattern: HapticPattern) -> Result<()>;
    fn vibrate(&self, pattern_ms: &[u64]) -> Result<()>;
}

/// Feedback that does nothing. Used headless and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentFeedback;

impl Feedback for SilentFeedback {
    fn beep(&self) -> Result<()> {
        Ok(())
    }

    fn speak(&self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn haptic(&self, _pattern: HapticPattern) -> Result<()> {
        Ok(())
    }

    fn vibrate(&self, _pattern_ms: &[u64]) -> Result<()> {
        Ok(())
    }
}

/// Play the short cue for a countdown at `remaining_secs`, if it falls in
/// the cue window. Returns whether a cue was attempted.
pub fn countdown_cue(feedback: &dyn Feedback, config: &FeedbackConfig, remaining_secs: u64) -> bool {
    if remaining_secs == 0 || remaining_secs > config.countdown_cues {
        return false;
    }
    let outcome = match config.sound {
        SoundMode::Beep => feedback.beep(),
        SoundMode::Voice => feedback.speak(&remaining_secs.to_string()),
        SoundMode::Silent => return false,
    };
    if let Err(e) = outcome {
        warn!(error = %e, remaining_secs, "countdown cue failed");
    }
    true
}

/// Rest is over: alarm plus the configured haptic.
pub fn finish_alarm(feedback: &dyn Feedback, config: &FeedbackConfig) {
    let sound = match config.sound {
        SoundMode::Beep => feedback.beep(),
        SoundMode::Voice => feedback.speak("Rest over"),
        SoundMode::Silent => Ok(()),
    };
    if let Err(e) = sound {
        warn!(error = %e, "finish alarm failed");
    }

    if let Err(e) = feedback.haptic(config.haptic) {
        debug!(error = %e, pattern = ?config.haptic, "haptic unavailable, vibrating instead");
        if let Err(e) = feedback.vibrate(config.haptic.fallback_vibration()) {
            warn!(error = %e, "fallback vibration failed");
        }
    }
}
